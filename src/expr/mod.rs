//! Expression DAG over parameters and constants.
//!
//! Nodes are held behind shared handles; derivatives and the algebraic
//! combinators freely share subtrees. The combinators fold the cheap
//! identities (`a + 0`, `1 * a`, constant arithmetic, double negation) at
//! construction time so the solver never walks dead structure.
//!
//! Nodes are logically immutable after construction with one exception: the
//! in-place substitution used by the equation system to eliminate trivial
//! equalities. Substitution rewrites a parameter-reference node under its
//! existing handle, so every equation sharing that node sees the rewrite.

mod derivative;
mod display;
mod eval;

use std::cell::RefCell;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::rc::Rc;

use crate::param::Param;

/// Operator tag of an expression node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    /// Immediate constant; carries a value, no children.
    Const,
    /// Reference to a [`Param`]; no children.
    Param,
    Add,
    Sub,
    Mul,
    Div,
    Neg,
    Sin,
    Cos,
    ASin,
    ACos,
    Sqrt,
    /// Squaring, kept as its own tag so derivatives stay compact.
    Sqr,
    Abs,
    Sign,
    /// Two-argument arctangent; operands are (y, x).
    Atan2,
    Exp,
    Sinh,
    Cosh,
    /// Fresnel sine integral S.
    SFres,
    /// Fresnel cosine integral C.
    CFres,
    /// Arithmetically a subtraction, but flagged so the solver can fade the
    /// equation out after the drag steps.
    Drag,
}

#[derive(Clone)]
pub(crate) struct Node {
    pub(crate) op: Op,
    pub(crate) a: Option<Expr>,
    pub(crate) b: Option<Expr>,
    pub(crate) param: Option<Param>,
    pub(crate) value: f64,
}

/// Shared handle to an expression node.
#[derive(Clone)]
pub struct Expr(pub(crate) Rc<RefCell<Node>>);

/// Shorthand for a constant expression.
pub fn expr(value: f64) -> Expr {
    Expr::constant(value)
}

impl Expr {
    fn new(node: Node) -> Self {
        Expr(Rc::new(RefCell::new(node)))
    }

    /// A constant node.
    pub fn constant(value: f64) -> Self {
        Expr::new(Node {
            op: Op::Const,
            a: None,
            b: None,
            param: None,
            value,
        })
    }

    pub(crate) fn param_ref(p: Param) -> Self {
        Expr::new(Node {
            op: Op::Param,
            a: None,
            b: None,
            param: Some(p),
            value: 0.0,
        })
    }

    fn unary(op: Op, a: Expr) -> Self {
        Expr::new(Node {
            op,
            a: Some(a),
            b: None,
            param: None,
            value: 0.0,
        })
    }

    fn binary(op: Op, a: Expr, b: Expr) -> Self {
        Expr::new(Node {
            op,
            a: Some(a),
            b: Some(b),
            param: None,
            value: 0.0,
        })
    }

    // -------------------------------------------------------------------
    // Structural queries
    // -------------------------------------------------------------------

    /// Operator tag of the root node.
    pub fn op(&self) -> Op {
        self.0.borrow().op
    }

    /// Whether two handles refer to the same node. The combinators preserve
    /// sharing for the trivial identities, which this makes observable.
    pub fn ptr_eq(&self, other: &Expr) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// The referenced parameter, for parameter-reference nodes.
    pub fn param(&self) -> Option<Param> {
        self.0.borrow().param.clone()
    }

    pub fn is_const(&self) -> bool {
        self.0.borrow().op == Op::Const
    }

    pub fn is_zero_const(&self) -> bool {
        let n = self.0.borrow();
        n.op == Op::Const && n.value == 0.0
    }

    pub fn is_one_const(&self) -> bool {
        let n = self.0.borrow();
        n.op == Op::Const && n.value == 1.0
    }

    pub fn is_minus_one_const(&self) -> bool {
        let n = self.0.borrow();
        n.op == Op::Const && n.value == -1.0
    }

    /// Whether the root is a drag (soft) equation.
    pub fn is_drag(&self) -> bool {
        self.0.borrow().op == Op::Drag
    }

    pub(crate) fn operand_a(&self) -> Option<Expr> {
        self.0.borrow().a.clone()
    }

    fn const_value(&self) -> f64 {
        self.0.borrow().value
    }

    /// Whether any parameter-reference node below (or at) this handle refers
    /// to `p`.
    pub fn depends_on(&self, p: &Param) -> bool {
        let n = self.0.borrow();
        match n.op {
            Op::Param => n.param.as_ref() == Some(p),
            _ => {
                n.a.as_ref().map_or(false, |a| a.depends_on(p))
                    || n.b.as_ref().map_or(false, |b| b.depends_on(p))
            }
        }
    }

    /// An equation is in substitution form iff it is a subtraction of two
    /// bare parameter references.
    pub fn is_substitution_form(&self) -> bool {
        self.substitution_params().is_some()
    }

    /// The two parameters of a substitution-form equation.
    pub fn substitution_params(&self) -> Option<(Param, Param)> {
        let n = self.0.borrow();
        if n.op != Op::Sub {
            return None;
        }
        let pa = n.a.as_ref()?.param()?;
        let pb = n.b.as_ref()?.param()?;
        Some((pa, pb))
    }

    // -------------------------------------------------------------------
    // In-place substitution
    // -------------------------------------------------------------------

    /// Rewrite every reference to `from` below this handle to refer to `to`.
    pub fn substitute_param(&self, from: &Param, to: &Param) {
        let mut n = self.0.borrow_mut();
        if n.op == Op::Param {
            if n.param.as_ref() == Some(from) {
                n.param = Some(to.clone());
            }
            return;
        }
        if let Some(a) = &n.a {
            a.substitute_param(from, to);
        }
        if let Some(b) = &n.b {
            b.substitute_param(from, to);
        }
    }

    /// Replace every reference to `p` below this handle with a copy of the
    /// top level of `e`, in place. The replacement is snapshotted up front,
    /// so `e` may share structure with the tree being rewritten.
    pub fn substitute_expr(&self, p: &Param, e: &Expr) {
        let replacement = e.0.borrow().clone();
        self.substitute_with_node(p, &replacement);
    }

    fn substitute_with_node(&self, p: &Param, replacement: &Node) {
        let mut n = self.0.borrow_mut();
        if n.op == Op::Param {
            if n.param.as_ref() == Some(p) {
                *n = replacement.clone();
            }
            return;
        }
        if let Some(a) = &n.a {
            a.substitute_with_node(p, replacement);
        }
        if let Some(b) = &n.b {
            b.substitute_with_node(p, replacement);
        }
    }

    // -------------------------------------------------------------------
    // Combinators
    // -------------------------------------------------------------------

    fn add_impl(a: &Expr, b: &Expr) -> Expr {
        if a.is_zero_const() {
            return b.clone();
        }
        if b.is_zero_const() {
            return a.clone();
        }
        if b.op() == Op::Neg {
            if let Some(inner) = b.operand_a() {
                return Expr::sub_impl(a, &inner);
            }
        }
        Expr::binary(Op::Add, a.clone(), b.clone())
    }

    fn sub_impl(a: &Expr, b: &Expr) -> Expr {
        if a.is_zero_const() {
            return Expr::neg_impl(b);
        }
        if b.is_zero_const() {
            return a.clone();
        }
        Expr::binary(Op::Sub, a.clone(), b.clone())
    }

    fn mul_impl(a: &Expr, b: &Expr) -> Expr {
        if a.is_zero_const() || b.is_zero_const() {
            return Expr::constant(0.0);
        }
        if a.is_one_const() {
            return b.clone();
        }
        if b.is_one_const() {
            return a.clone();
        }
        if a.is_minus_one_const() {
            return Expr::neg_impl(b);
        }
        if b.is_minus_one_const() {
            return Expr::neg_impl(a);
        }
        if a.is_const() && b.is_const() {
            return Expr::constant(a.const_value() * b.const_value());
        }
        Expr::binary(Op::Mul, a.clone(), b.clone())
    }

    fn div_impl(a: &Expr, b: &Expr) -> Expr {
        if b.is_one_const() {
            return a.clone();
        }
        if a.is_zero_const() {
            return Expr::constant(0.0);
        }
        if b.is_minus_one_const() {
            return Expr::neg_impl(a);
        }
        Expr::binary(Op::Div, a.clone(), b.clone())
    }

    fn neg_impl(a: &Expr) -> Expr {
        if a.is_zero_const() {
            return a.clone();
        }
        if a.is_const() {
            return Expr::constant(-a.const_value());
        }
        if a.op() == Op::Neg {
            if let Some(inner) = a.operand_a() {
                return inner;
            }
        }
        Expr::unary(Op::Neg, a.clone())
    }

    // -------------------------------------------------------------------
    // Transcendental constructors
    // -------------------------------------------------------------------

    pub fn sin(&self) -> Expr {
        Expr::unary(Op::Sin, self.clone())
    }

    pub fn cos(&self) -> Expr {
        Expr::unary(Op::Cos, self.clone())
    }

    pub fn asin(&self) -> Expr {
        Expr::unary(Op::ASin, self.clone())
    }

    pub fn acos(&self) -> Expr {
        Expr::unary(Op::ACos, self.clone())
    }

    pub fn sqrt(&self) -> Expr {
        Expr::unary(Op::Sqrt, self.clone())
    }

    pub fn sqr(&self) -> Expr {
        Expr::unary(Op::Sqr, self.clone())
    }

    pub fn abs(&self) -> Expr {
        Expr::unary(Op::Abs, self.clone())
    }

    pub fn sign(&self) -> Expr {
        Expr::unary(Op::Sign, self.clone())
    }

    pub fn exp(&self) -> Expr {
        Expr::unary(Op::Exp, self.clone())
    }

    pub fn sinh(&self) -> Expr {
        Expr::unary(Op::Sinh, self.clone())
    }

    pub fn cosh(&self) -> Expr {
        Expr::unary(Op::Cosh, self.clone())
    }

    /// Fresnel sine integral of this expression.
    pub fn sfres(&self) -> Expr {
        Expr::unary(Op::SFres, self.clone())
    }

    /// Fresnel cosine integral of this expression.
    pub fn cfres(&self) -> Expr {
        Expr::unary(Op::CFres, self.clone())
    }

    /// atan2 with `self` as y and `x` as x.
    pub fn atan2(&self, x: &Expr) -> Expr {
        Expr::binary(Op::Atan2, self.clone(), x.clone())
    }

    /// A soft equation pulling `self` toward `to`; behaves like `self - to`
    /// but is faded out by the solver after the drag steps.
    pub fn drag(&self, to: &Expr) -> Expr {
        Expr::binary(Op::Drag, self.clone(), to.clone())
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::constant(value)
    }
}

impl From<&Param> for Expr {
    fn from(p: &Param) -> Self {
        p.expr()
    }
}

// ---------------------------------------------------------------------------
// Operator overloading
// ---------------------------------------------------------------------------

macro_rules! impl_expr_binops {
    ($lhs:ty, $rhs:ty, $to_lhs:expr, $to_rhs:expr) => {
        impl Add<$rhs> for $lhs {
            type Output = Expr;
            fn add(self, rhs: $rhs) -> Expr {
                Expr::add_impl(&$to_lhs(self), &$to_rhs(rhs))
            }
        }
        impl Sub<$rhs> for $lhs {
            type Output = Expr;
            fn sub(self, rhs: $rhs) -> Expr {
                Expr::sub_impl(&$to_lhs(self), &$to_rhs(rhs))
            }
        }
        impl Mul<$rhs> for $lhs {
            type Output = Expr;
            fn mul(self, rhs: $rhs) -> Expr {
                Expr::mul_impl(&$to_lhs(self), &$to_rhs(rhs))
            }
        }
        impl Div<$rhs> for $lhs {
            type Output = Expr;
            fn div(self, rhs: $rhs) -> Expr {
                Expr::div_impl(&$to_lhs(self), &$to_rhs(rhs))
            }
        }
    };
}

impl_expr_binops!(Expr, Expr, |e: Expr| e, |r: Expr| r);
impl_expr_binops!(Expr, &Expr, |e: Expr| e, |r: &Expr| r.clone());
impl_expr_binops!(&Expr, Expr, |e: &Expr| e.clone(), |r: Expr| r);
impl_expr_binops!(&Expr, &Expr, |e: &Expr| e.clone(), |r: &Expr| r.clone());
impl_expr_binops!(Expr, f64, |e: Expr| e, |r: f64| Expr::constant(r));
impl_expr_binops!(&Expr, f64, |e: &Expr| e.clone(), |r: f64| Expr::constant(r));
impl_expr_binops!(f64, Expr, |v: f64| Expr::constant(v), |r: Expr| r);
impl_expr_binops!(f64, &Expr, |v: f64| Expr::constant(v), |r: &Expr| r.clone());

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::neg_impl(&self)
    }
}

impl Neg for &Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::neg_impl(self)
    }
}
