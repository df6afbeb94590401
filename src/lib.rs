#![forbid(unsafe_code)]
//! 2D geometric constraint solver for parametric sketching.
//!
//! Entities (points, lines, circles) expose their coordinates as free
//! parameters, constraints (coincidence, distance, horizontal/vertical,
//! parallelism, point-on-curve, length, angle, diameter, tangency) turn
//! into zero-target equations over those parameters, and the solver finds
//! values satisfying all of them simultaneously — or reports that it
//! cannot.
//!
//! Three layers:
//! - a symbolic expression algebra with automatic differentiation
//!   ([`Expr`], [`Param`]),
//! - an equation system that eliminates trivial equalities, builds a
//!   symbolic Jacobian and iterates Newton steps over a normal-equation
//!   least-squares solve ([`EquationSystem`]),
//! - a sketch layer that owns entities and constraints, tracks what
//!   changed and drives the solver ([`Sketch`]).
//!
//! # Expressions
//!
//! ```
//! use parasketch::Param;
//!
//! let p = Param::new("p", 2.0);
//! let q = Param::new("q", 3.0);
//! let e = (p.expr() * q.expr()).sin();
//! // d sin(p*q) / dp = q * cos(p*q)
//! let d = e.derivative(&p);
//! assert!((d.eval() - 3.0 * 6.0_f64.cos()).abs() < 1e-12);
//! ```
//!
//! # Sketching
//!
//! ```
//! use parasketch::{Hv, HvOrientation, Length, Line, Param, Point, Sketch, SolveResult};
//!
//! let p1 = Point::new(
//!     Param::new("p1_x", 3.0),
//!     Param::new("p1_y", 1.0),
//!     Param::new("p1_z", 0.0),
//! );
//! let p2 = Point::new(
//!     Param::new("p2_x", 4.0),
//!     Param::new("p2_y", 2.0),
//!     Param::new("p2_z", 0.0),
//! );
//! let line = Line::new(p1.clone(), p2.clone());
//!
//! let mut sketch = Sketch::new();
//! sketch.add_entity(line.clone());
//! sketch.add_constraint(Length::new(line.clone(), 15.0).unwrap());
//! sketch.add_constraint(Hv::line(&line, HvOrientation::Ox));
//!
//! assert_eq!(sketch.update(), SolveResult::Okay);
//! assert!((p1.y.value() - p2.y.value()).abs() < 1e-8);
//! assert!(((p2.x.value() - p1.x.value()).abs() - 15.0).abs() < 1e-8);
//! ```

mod constraint;
mod entity;
mod error;
mod expr;
pub mod linalg;
mod math;
mod param;
mod sketch;
mod system;
mod vector;

#[cfg(test)]
mod tests;

pub use constraint::{
    angle2d, Angle, Constraint, ConstraintValue, Diameter, Hv, HvOrientation, Length, Parallel,
    ParallelOption, PointOn, PointsCoincident, PointsDistance, Tangent,
};
pub use entity::{Circle, Entity, Line, Point};
pub use error::Error;
pub use expr::{expr, Expr, Op};
pub use math::{fresnel_c, fresnel_s};
pub use param::Param;
pub use sketch::{ConstraintKey, DirtyFlags, EntityKey, Sketch};
pub use system::{EquationSystem, SolveResult};
pub use vector::{cross, dot, point_line_distance, project_point_to_line, ExprVector};
