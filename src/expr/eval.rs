//! Numeric evaluation of the expression DAG.

use super::{Expr, Op};
use crate::math;
use crate::param::Param;

/// Below this magnitude a denominator is replaced by 1 so that Newton steps
/// crossing a singular point keep producing finite numbers. A robustness
/// policy, not a mathematical identity.
pub(crate) const DIV_EPSILON: f64 = 1e-10;

fn eval_child(c: &Option<Expr>) -> f64 {
    c.as_ref().map_or(0.0, Expr::eval)
}

impl Expr {
    /// Evaluate the DAG at the parameters' current values.
    pub fn eval(&self) -> f64 {
        let n = self.0.borrow();
        match n.op {
            Op::Const => n.value,
            Op::Param => n.param.as_ref().map_or(0.0, Param::value),
            Op::Add => eval_child(&n.a) + eval_child(&n.b),
            Op::Sub | Op::Drag => eval_child(&n.a) - eval_child(&n.b),
            Op::Mul => eval_child(&n.a) * eval_child(&n.b),
            Op::Div => {
                let mut bv = eval_child(&n.b);
                if bv.abs() < DIV_EPSILON {
                    bv = 1.0;
                }
                eval_child(&n.a) / bv
            }
            Op::Neg => -eval_child(&n.a),
            Op::Sin => eval_child(&n.a).sin(),
            Op::Cos => eval_child(&n.a).cos(),
            Op::ASin => eval_child(&n.a).asin(),
            Op::ACos => eval_child(&n.a).acos(),
            Op::Sqrt => eval_child(&n.a).sqrt(),
            Op::Sqr => {
                let av = eval_child(&n.a);
                av * av
            }
            Op::Abs => eval_child(&n.a).abs(),
            Op::Sign => math::sign(eval_child(&n.a)),
            Op::Atan2 => eval_child(&n.a).atan2(eval_child(&n.b)),
            Op::Exp => eval_child(&n.a).exp(),
            Op::Sinh => eval_child(&n.a).sinh(),
            Op::Cosh => eval_child(&n.a).cosh(),
            Op::SFres => math::fresnel_s(eval_child(&n.a)),
            Op::CFres => math::fresnel_c(eval_child(&n.a)),
        }
    }
}
