//! Geometric entities.
//!
//! Entities own the coordinate parameters the solver works on and expose
//! their geometry as expressions: `point_on(t)` parameterizes the entity
//! over t ∈ [0, 1], `tangent_at(t)` gives a direction where one exists.
//! Points carry a z parameter as data, but in this 2D core only x and y
//! are contributed to the solver.

use std::f64::consts::TAU;
use std::fmt;

use crate::expr::{expr, Expr};
use crate::param::Param;
use crate::vector::ExprVector;

/// A point with one parameter per coordinate.
#[derive(Clone, PartialEq, Eq)]
pub struct Point {
    pub x: Param,
    pub y: Param,
    pub z: Param,
}

impl Point {
    pub fn new(x: Param, y: Param, z: Param) -> Self {
        Point { x, y, z }
    }

    /// Position as a vector expression.
    pub fn expr(&self) -> ExprVector {
        ExprVector::new(self.x.expr(), self.y.expr(), self.z.expr())
    }

    /// Current planar coordinates.
    pub fn eval(&self) -> [f64; 2] {
        [self.x.value(), self.y.value()]
    }

    pub fn is_changed(&self) -> bool {
        self.x.is_changed() || self.y.is_changed() || self.z.is_changed()
    }

    /// The coordinates exposed to the solver.
    pub fn parameters(&self) -> Vec<Param> {
        vec![self.x.clone(), self.y.clone()]
    }

    /// Shift the point by a planar delta, as interactive dragging does.
    pub fn move_by(&self, delta: [f64; 2]) {
        self.x.set_value(self.x.value() + delta[0]);
        self.y.set_value(self.y.value() + delta[1]);
    }

    /// Soft equations pulling the point toward a target position; feed them
    /// to the equation system while a drag gesture is active.
    pub fn drag_to(&self, x: f64, y: f64) -> [Expr; 2] {
        [
            self.x.expr().drag(&expr(x)),
            self.y.expr().drag(&expr(y)),
        ]
    }

    pub fn point_on(&self, _t: &Expr) -> ExprVector {
        self.expr()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Point({}, {}, {})", self.x, self.y, self.z)
    }
}

/// A segment between two points.
#[derive(Clone, PartialEq, Eq)]
pub struct Line {
    pub p0: Point,
    pub p1: Point,
}

impl Line {
    pub fn new(p0: Point, p1: Point) -> Self {
        Line { p0, p1 }
    }

    pub fn source(&self) -> &Point {
        &self.p0
    }

    pub fn target(&self) -> &Point {
        &self.p1
    }

    pub fn parameters(&self) -> Vec<Param> {
        let mut params = self.p0.parameters();
        params.extend(self.p1.parameters());
        params
    }

    pub fn is_changed(&self) -> bool {
        self.p0.is_changed() || self.p1.is_changed()
    }

    /// Linear interpolation between the endpoints.
    pub fn point_on(&self, t: &Expr) -> ExprVector {
        self.p0.expr() + (self.p1.expr() - self.p0.expr()) * t
    }

    pub fn tangent_at(&self, _t: &Expr) -> ExprVector {
        self.p1.expr() - self.p0.expr()
    }

    pub fn length(&self) -> Expr {
        (self.p1.expr() - self.p0.expr()).magnitude()
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line({} -> {})", self.p0, self.p1)
    }
}

/// A circle around a center point.
#[derive(Clone, PartialEq, Eq)]
pub struct Circle {
    pub center: Point,
    pub radius: Param,
}

impl Circle {
    pub fn new(center: Point, radius: Param) -> Self {
        Circle { center, radius }
    }

    pub fn parameters(&self) -> Vec<Param> {
        let mut params = self.center.parameters();
        params.push(self.radius.clone());
        params
    }

    pub fn is_changed(&self) -> bool {
        self.center.is_changed() || self.radius.is_changed()
    }

    /// The radius expression; the parameter may go negative during solving,
    /// the geometry uses its magnitude.
    pub fn radius_expr(&self) -> Expr {
        self.radius.expr().abs()
    }

    /// Circumference.
    pub fn length(&self) -> Expr {
        expr(TAU) * self.radius_expr()
    }

    pub fn point_on(&self, t: &Expr) -> ExprVector {
        let angle = t * expr(TAU);
        self.center.expr()
            + ExprVector::new(angle.cos(), angle.sin(), expr(0.0)) * self.radius_expr()
    }

    pub fn tangent_at(&self, t: &Expr) -> ExprVector {
        let angle = t * expr(TAU);
        ExprVector::new(-angle.sin(), angle.cos(), expr(0.0))
    }
}

impl fmt::Display for Circle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Circle({}, {})", self.center, self.radius)
    }
}

/// Any entity a sketch can own.
#[derive(Clone)]
pub enum Entity {
    Point(Point),
    Line(Line),
    Circle(Circle),
}

impl Entity {
    pub fn parameters(&self) -> Vec<Param> {
        match self {
            Entity::Point(p) => p.parameters(),
            Entity::Line(l) => l.parameters(),
            Entity::Circle(c) => c.parameters(),
        }
    }

    /// Position at curve parameter t ∈ [0, 1]; a point ignores t.
    pub fn point_on(&self, t: &Expr) -> ExprVector {
        match self {
            Entity::Point(p) => p.point_on(t),
            Entity::Line(l) => l.point_on(t),
            Entity::Circle(c) => c.point_on(t),
        }
    }

    /// Direction at curve parameter t; a point has none.
    pub fn tangent_at(&self, t: &Expr) -> Option<ExprVector> {
        match self {
            Entity::Point(_) => None,
            Entity::Line(l) => Some(l.tangent_at(t)),
            Entity::Circle(c) => Some(c.tangent_at(t)),
        }
    }

    pub fn length(&self) -> Option<Expr> {
        match self {
            Entity::Point(_) => None,
            Entity::Line(l) => Some(l.length()),
            Entity::Circle(c) => Some(c.length()),
        }
    }

    pub fn radius(&self) -> Option<Expr> {
        match self {
            Entity::Circle(c) => Some(c.radius_expr()),
            Entity::Point(_) | Entity::Line(_) => None,
        }
    }

    pub fn is_changed(&self) -> bool {
        match self {
            Entity::Point(p) => p.is_changed(),
            Entity::Line(l) => l.is_changed(),
            Entity::Circle(c) => c.is_changed(),
        }
    }
}

impl From<Point> for Entity {
    fn from(p: Point) -> Self {
        Entity::Point(p)
    }
}

impl From<Line> for Entity {
    fn from(l: Line) -> Self {
        Entity::Line(l)
    }
}

impl From<Circle> for Entity {
    fn from(c: Circle) -> Self {
        Entity::Circle(c)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Point(p) => p.fmt(f),
            Entity::Line(l) => l.fmt(f),
            Entity::Circle(c) => c.fmt(f),
        }
    }
}
