//! Vector expressions over 3-space.
//!
//! A triple of expression nodes with componentwise arithmetic. Purely 2D
//! callers keep z at the zero constant; magnitudes and cross products then
//! collapse to their planar forms under the constructor simplifications.

use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::expr::{expr, Expr};

/// A triple of expressions treated as a vector.
#[derive(Clone, Debug)]
pub struct ExprVector {
    pub x: Expr,
    pub y: Expr,
    pub z: Expr,
}

impl ExprVector {
    pub fn new(x: Expr, y: Expr, z: Expr) -> Self {
        ExprVector { x, y, z }
    }

    /// A constant vector.
    pub fn from_values(v: [f64; 3]) -> Self {
        ExprVector::new(expr(v[0]), expr(v[1]), expr(v[2]))
    }

    /// Euclidean norm expression.
    pub fn magnitude(&self) -> Expr {
        (self.x.sqr() + self.y.sqr() + self.z.sqr()).sqrt()
    }

    pub fn normalized(&self) -> ExprVector {
        self / &self.magnitude()
    }

    /// Evaluate all three components.
    pub fn eval(&self) -> [f64; 3] {
        [self.x.eval(), self.y.eval(), self.z.eval()]
    }

    /// Componentwise numeric comparison within `eps`.
    pub fn values_equal(&self, other: &ExprVector, eps: f64) -> bool {
        (self.x.eval() - other.x.eval()).abs() < eps
            && (self.y.eval() - other.y.eval()).abs() < eps
            && (self.z.eval() - other.z.eval()).abs() < eps
    }

    fn add_vec(a: &ExprVector, b: &ExprVector) -> ExprVector {
        ExprVector::new(&a.x + &b.x, &a.y + &b.y, &a.z + &b.z)
    }

    fn sub_vec(a: &ExprVector, b: &ExprVector) -> ExprVector {
        ExprVector::new(&a.x - &b.x, &a.y - &b.y, &a.z - &b.z)
    }

    fn mul_vec(a: &ExprVector, b: &ExprVector) -> ExprVector {
        ExprVector::new(&a.x * &b.x, &a.y * &b.y, &a.z * &b.z)
    }

    fn div_vec(a: &ExprVector, b: &ExprVector) -> ExprVector {
        ExprVector::new(&a.x / &b.x, &a.y / &b.y, &a.z / &b.z)
    }

    fn scale(&self, s: &Expr) -> ExprVector {
        ExprVector::new(&self.x * s, &self.y * s, &self.z * s)
    }

    fn scale_div(&self, s: &Expr) -> ExprVector {
        ExprVector::new(&self.x / s, &self.y / s, &self.z / s)
    }
}

/// Scalar product a·b.
pub fn dot(a: &ExprVector, b: &ExprVector) -> Expr {
    &a.x * &b.x + &a.y * &b.y + &a.z * &b.z
}

/// Vector product a×b.
pub fn cross(a: &ExprVector, b: &ExprVector) -> ExprVector {
    ExprVector::new(
        &a.y * &b.z - &b.y * &a.z,
        &a.z * &b.x - &b.z * &a.x,
        &a.x * &b.y - &b.x * &a.y,
    )
}

/// Distance from `point` to the infinite line through `l0` and `l1`.
pub fn point_line_distance(point: &ExprVector, l0: &ExprVector, l1: &ExprVector) -> Expr {
    let d = l0 - l1;
    cross(&d, &(l0 - point)).magnitude() / d.magnitude()
}

/// Orthogonal projection of `p` onto the line through `l0` and `l1`.
pub fn project_point_to_line(p: &ExprVector, l0: &ExprVector, l1: &ExprVector) -> ExprVector {
    let d = l1 - l0;
    let t = dot(&d, &(p - l0)) / dot(&d, &d);
    l0 + &d.scale(&t)
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

macro_rules! impl_vec_vec_op {
    ($trait:ident, $method:ident, $impl_fn:ident) => {
        impl $trait<&ExprVector> for &ExprVector {
            type Output = ExprVector;
            fn $method(self, rhs: &ExprVector) -> ExprVector {
                ExprVector::$impl_fn(self, rhs)
            }
        }
        impl $trait<ExprVector> for ExprVector {
            type Output = ExprVector;
            fn $method(self, rhs: ExprVector) -> ExprVector {
                ExprVector::$impl_fn(&self, &rhs)
            }
        }
        impl $trait<&ExprVector> for ExprVector {
            type Output = ExprVector;
            fn $method(self, rhs: &ExprVector) -> ExprVector {
                ExprVector::$impl_fn(&self, rhs)
            }
        }
        impl $trait<ExprVector> for &ExprVector {
            type Output = ExprVector;
            fn $method(self, rhs: ExprVector) -> ExprVector {
                ExprVector::$impl_fn(self, &rhs)
            }
        }
    };
}

impl_vec_vec_op!(Add, add, add_vec);
impl_vec_vec_op!(Sub, sub, sub_vec);
impl_vec_vec_op!(Mul, mul, mul_vec);
impl_vec_vec_op!(Div, div, div_vec);

macro_rules! impl_vec_scalar_op {
    ($trait:ident, $method:ident, $impl_fn:ident) => {
        impl $trait<&Expr> for &ExprVector {
            type Output = ExprVector;
            fn $method(self, rhs: &Expr) -> ExprVector {
                self.$impl_fn(rhs)
            }
        }
        impl $trait<Expr> for &ExprVector {
            type Output = ExprVector;
            fn $method(self, rhs: Expr) -> ExprVector {
                self.$impl_fn(&rhs)
            }
        }
        impl $trait<&Expr> for ExprVector {
            type Output = ExprVector;
            fn $method(self, rhs: &Expr) -> ExprVector {
                self.$impl_fn(rhs)
            }
        }
        impl $trait<Expr> for ExprVector {
            type Output = ExprVector;
            fn $method(self, rhs: Expr) -> ExprVector {
                self.$impl_fn(&rhs)
            }
        }
    };
}

impl_vec_scalar_op!(Mul, mul, scale);
impl_vec_scalar_op!(Div, div, scale_div);

impl Mul<&ExprVector> for &Expr {
    type Output = ExprVector;
    fn mul(self, rhs: &ExprVector) -> ExprVector {
        rhs.scale(self)
    }
}

impl Mul<ExprVector> for Expr {
    type Output = ExprVector;
    fn mul(self, rhs: ExprVector) -> ExprVector {
        rhs.scale(&self)
    }
}

impl Neg for &ExprVector {
    type Output = ExprVector;
    fn neg(self) -> ExprVector {
        ExprVector::new(-&self.x, -&self.y, -&self.z)
    }
}

impl Neg for ExprVector {
    type Output = ExprVector;
    fn neg(self) -> ExprVector {
        -&self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magnitude_and_dot() {
        let a = ExprVector::from_values([3.0, 4.0, 0.0]);
        let b = ExprVector::from_values([1.0, 2.0, 3.0]);
        assert_eq!(a.magnitude().eval(), 5.0);
        assert_eq!(dot(&a, &b).eval(), 11.0);
    }

    #[test]
    fn cross_of_plane_vectors_points_along_z() {
        let a = ExprVector::from_values([1.0, 0.0, 0.0]);
        let b = ExprVector::from_values([0.0, 1.0, 0.0]);
        assert_eq!(cross(&a, &b).eval(), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn componentwise_arithmetic() {
        let a = ExprVector::from_values([1.0, 2.0, 3.0]);
        let b = ExprVector::from_values([4.0, 5.0, 6.0]);
        assert_eq!((&a + &b).eval(), [5.0, 7.0, 9.0]);
        assert_eq!((&b - &a).eval(), [3.0, 3.0, 3.0]);
        assert_eq!((&a * &expr(2.0)).eval(), [2.0, 4.0, 6.0]);
        assert_eq!((-&a).eval(), [-1.0, -2.0, -3.0]);
    }

    #[test]
    fn point_to_line_helpers() {
        let l0 = ExprVector::from_values([0.0, 0.0, 0.0]);
        let l1 = ExprVector::from_values([10.0, 0.0, 0.0]);
        let p = ExprVector::from_values([4.0, 3.0, 0.0]);
        assert!((point_line_distance(&p, &l0, &l1).eval() - 3.0).abs() < 1e-12);
        let proj = project_point_to_line(&p, &l0, &l1);
        assert!(proj.values_equal(&ExprVector::from_values([4.0, 0.0, 0.0]), 1e-12));
    }

    #[test]
    fn normalized_has_unit_length() {
        let a = ExprVector::from_values([3.0, 4.0, 12.0]);
        assert!((a.normalized().magnitude().eval() - 1.0).abs() < 1e-12);
    }
}
