//! Symbolic differentiation.
//!
//! Derivatives are fresh expressions that share subtrees with the original;
//! the combinators fold out the zero and unit factors produced by the chain
//! rule, so `d sin(p*q) / dp` comes back as `q * cos(p*q)` rather than a
//! tower of `1 * ... + 0`.

use std::f64::consts::PI;

use super::{Expr, Op};
use crate::param::Param;

fn child(c: &Option<Expr>) -> Expr {
    c.as_ref().cloned().unwrap_or_else(|| Expr::constant(0.0))
}

impl Expr {
    /// Partial derivative with respect to `p`.
    pub fn derivative(&self, p: &Param) -> Expr {
        self.d(p)
    }

    /// Short form of [`Expr::derivative`].
    pub fn d(&self, p: &Param) -> Expr {
        let n = self.0.borrow();
        match n.op {
            Op::Const | Op::Sign => Expr::constant(0.0),
            Op::Param => {
                if n.param.as_ref() == Some(p) {
                    Expr::constant(1.0)
                } else {
                    Expr::constant(0.0)
                }
            }
            Op::Add => {
                let (a, b) = (child(&n.a), child(&n.b));
                a.d(p) + b.d(p)
            }
            // a drag differentiates exactly like the subtraction it is
            Op::Sub | Op::Drag => {
                let (a, b) = (child(&n.a), child(&n.b));
                a.d(p) - b.d(p)
            }
            Op::Mul => {
                let (a, b) = (child(&n.a), child(&n.b));
                a.d(p) * &b + &a * b.d(p)
            }
            Op::Div => {
                let (a, b) = (child(&n.a), child(&n.b));
                (a.d(p) * &b - &a * b.d(p)) / b.sqr()
            }
            Op::Neg => -child(&n.a).d(p),
            Op::Sin => {
                let a = child(&n.a);
                a.d(p) * a.cos()
            }
            Op::Cos => {
                let a = child(&n.a);
                a.d(p) * -a.sin()
            }
            Op::ASin => {
                let a = child(&n.a);
                a.d(p) / (Expr::constant(1.0) - a.sqr()).sqrt()
            }
            Op::ACos => {
                let a = child(&n.a);
                -(a.d(p) / (Expr::constant(1.0) - a.sqr()).sqrt())
            }
            Op::Sqrt => {
                let a = child(&n.a);
                a.d(p) / (Expr::constant(2.0) * a.sqrt())
            }
            Op::Sqr => {
                let a = child(&n.a);
                a.d(p) * Expr::constant(2.0) * &a
            }
            Op::Abs => {
                let a = child(&n.a);
                a.d(p) * a.sign()
            }
            Op::Atan2 => {
                let (y, x) = (child(&n.a), child(&n.b));
                (&x * y.d(p) - &y * x.d(p)) / (y.sqr() + x.sqr())
            }
            Op::Exp => {
                let a = child(&n.a);
                a.d(p) * a.exp()
            }
            Op::Sinh => {
                let a = child(&n.a);
                a.d(p) * a.cosh()
            }
            Op::Cosh => {
                let a = child(&n.a);
                a.d(p) * a.sinh()
            }
            Op::SFres => {
                let a = child(&n.a);
                a.d(p) * (Expr::constant(PI) * a.sqr() / Expr::constant(2.0)).sin()
            }
            Op::CFres => {
                let a = child(&n.a);
                a.d(p) * (Expr::constant(PI) * a.sqr() / Expr::constant(2.0)).cos()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use crate::expr::{expr, Expr, Op};
    use crate::param::Param;

    #[test]
    fn constant_derivative_is_zero() {
        let p = Param::new("p", 1.0);
        for c in [0.0, 1.0, -2.5, 1e10] {
            let d = expr(c).d(&p);
            assert!(d.is_zero_const());
        }
    }

    #[test]
    fn param_derivative_is_kronecker() {
        let p = Param::new("p", 1.0);
        let q = Param::new("q", 2.0);
        assert_eq!(p.expr().d(&p).eval(), 1.0);
        assert_eq!(p.expr().d(&q).eval(), 0.0);
    }

    #[test]
    fn chain_rule_sin_matches_closed_form() {
        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            let p = Param::new("p", rng.gen_range(-2.0..2.0));
            let q = Param::new("q", rng.gen_range(-2.0..2.0));
            let e = (&p.expr() * &q.expr()).sin();
            let d = e.d(&p);
            let expected = q.value() * (p.value() * q.value()).cos();
            assert!((d.eval() - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn chain_rule_sin_matches_finite_differences() {
        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            let p = Param::new("p", rng.gen_range(0.1..1.5));
            let q = Param::new("q", rng.gen_range(0.1..1.5));
            let e = (&p.expr() * &q.expr()).sin();
            let d = e.d(&p).eval();

            let h = 1e-6;
            let x = p.value();
            p.set_value(x + h);
            let hi = e.eval();
            p.set_value(x - h);
            let lo = e.eval();
            p.set_value(x);
            let fd = (hi - lo) / (2.0 * h);
            assert!((d - fd).abs() < 1e-6);
        }
    }

    #[test]
    fn quotient_rule_squares_denominator() {
        let p = Param::new("p", 3.0);
        let q = Param::new("q", 2.0);
        let e = &p.expr() / &q.expr();
        // d(p/q)/dq = -p / q^2
        let d = e.d(&q);
        assert!((d.eval() - (-3.0 / 4.0)).abs() < 1e-15);
    }

    #[test]
    fn atan2_derivative() {
        // angle = atan2(y, x); d/dx = -y / (x^2 + y^2)
        let x = Param::new("x", 2.0);
        let y = Param::new("y", 1.0);
        let e = y.expr().atan2(&x.expr());
        let d = e.d(&x);
        assert!((d.eval() - (-1.0 / 5.0)).abs() < 1e-15);
    }

    #[test]
    fn sign_and_abs() {
        let p = Param::new("p", -4.0);
        assert!(p.expr().sign().d(&p).is_zero_const());
        // d|p|/dp = sign(p)
        assert_eq!(p.expr().abs().d(&p).eval(), -1.0);
    }

    #[test]
    fn fresnel_derivatives_are_integrands() {
        let p = Param::new("p", 0.7);
        let ds = p.expr().sfres().d(&p);
        let dc = p.expr().cfres().d(&p);
        let u = std::f64::consts::PI * 0.7 * 0.7 / 2.0;
        assert!((ds.eval() - u.sin()).abs() < 1e-12);
        assert!((dc.eval() - u.cos()).abs() < 1e-12);
    }

    #[test]
    fn drag_differentiates_as_sub() {
        let p = Param::new("p", 1.0);
        let e = p.expr().drag(&Expr::constant(9.0));
        assert_eq!(e.op(), Op::Drag);
        assert_eq!(e.d(&p).eval(), 1.0);
    }
}
