//! Debug rendering of expressions.

use std::fmt;

use super::{Expr, Op};

impl Expr {
    fn is_atom(&self) -> bool {
        !matches!(
            self.op(),
            Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Drag | Op::Atan2
        )
    }

    fn is_additive(&self) -> bool {
        matches!(self.op(), Op::Add | Op::Sub | Op::Drag)
    }

    fn quoted(&self) -> String {
        if self.is_atom() {
            self.to_string()
        } else {
            format!("({self})")
        }
    }

    fn quoted_add(&self) -> String {
        if self.is_additive() {
            format!("({self})")
        } else {
            self.to_string()
        }
    }
}

fn func_name(op: Op) -> &'static str {
    match op {
        Op::Sin => "sin",
        Op::Cos => "cos",
        Op::ASin => "asin",
        Op::ACos => "acos",
        Op::Sqrt => "sqrt",
        Op::Abs => "abs",
        Op::Sign => "sign",
        Op::Exp => "exp",
        Op::Sinh => "sinh",
        Op::Cosh => "cosh",
        Op::SFres => "sfres",
        Op::CFres => "cfres",
        _ => "?",
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.0.borrow();
        let a = |c: &Option<Expr>| c.clone().unwrap_or_else(|| Expr::constant(0.0));
        match n.op {
            Op::Const => write!(f, "{}", n.value),
            Op::Param => match &n.param {
                Some(p) => write!(f, "{}", p.name()),
                None => write!(f, "?"),
            },
            Op::Add => write!(f, "{} + {}", a(&n.a), a(&n.b)),
            Op::Sub => write!(f, "{} - {}", a(&n.a), a(&n.b).quoted_add()),
            Op::Mul => write!(f, "{} * {}", a(&n.a).quoted_add(), a(&n.b).quoted_add()),
            Op::Div => write!(f, "{} / {}", a(&n.a).quoted_add(), a(&n.b).quoted()),
            Op::Neg => write!(f, "-{}", a(&n.a).quoted()),
            Op::Sqr => write!(f, "{} ^ 2", a(&n.a).quoted()),
            Op::Atan2 => write!(f, "atan2({}, {})", a(&n.a), a(&n.b)),
            Op::Drag => write!(f, "{} ~ {}", a(&n.a), a(&n.b).quoted_add()),
            op => write!(f, "{}({})", func_name(op), a(&n.a)),
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use crate::expr::expr;
    use crate::param::Param;

    #[test]
    fn renders_with_precedence() {
        let p = Param::new("p", 1.0);
        let q = Param::new("q", 2.0);
        let e = &(&p.expr() + &q.expr()) * &p.expr();
        assert_eq!(e.to_string(), "(p + q) * p");

        let e = &p.expr() - &(&q.expr() + &expr(1.0));
        assert_eq!(e.to_string(), "p - (q + 1)");

        let e = &p.expr() / &(&q.expr() * &p.expr());
        assert_eq!(e.to_string(), "p / (q * p)");
    }

    #[test]
    fn renders_functions() {
        let p = Param::new("p", 1.0);
        assert_eq!(p.expr().sin().to_string(), "sin(p)");
        assert_eq!(p.expr().sqr().to_string(), "p ^ 2");
        assert_eq!((-&(&p.expr() + &expr(2.0))).to_string(), "-(p + 2)");
        assert_eq!(p.expr().drag(&expr(3.0)).to_string(), "p ~ 3");
    }
}
