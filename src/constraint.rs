//! Geometric constraints.
//!
//! Every constraint produces a list of expressions that must evaluate to
//! zero, plus any auxiliary parameters it introduces. Value-carrying
//! constraints (length, distance, angle, diameter, point-on) embed a
//! [`ConstraintValue`]: when the constraint is *referential* the value is
//! handed to the solver as an unknown, otherwise it is user-fixed and only
//! appears inside the equations.
//!
//! Constraints that can start in a bad Newton basin seed themselves at
//! construction: point-on sweeps its curve parameter, parallel picks the
//! cheaper of the two orientations.

use std::f64::consts::PI;
use std::fmt;

use tracing::{debug, trace};

use crate::entity::{Circle, Entity, Line, Point};
use crate::error::Error;
use crate::expr::{expr, Expr};
use crate::math;
use crate::param::Param;
use crate::system::EquationSystem;
use crate::vector::ExprVector;

/// Planar angle between two direction vectors, as atan2(cross, dot).
pub fn angle2d(d0: &ExprVector, d1: &ExprVector) -> Expr {
    let nu = &d1.x * &d0.x + &d1.y * &d0.y;
    let nv = &d0.x * &d1.y - &d0.y * &d1.x;
    nv.atan2(&nu)
}

/// Axis a segment is constrained to run along.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HvOrientation {
    /// Horizontal: the y coordinates agree.
    Ox,
    /// Vertical: the x coordinates agree.
    Oy,
}

/// Orientation a parallel constraint settled on at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParallelOption {
    Codirected,
    Antidirected,
}

/// The magnitude slot shared by value constraints.
#[derive(Clone)]
pub struct ConstraintValue {
    value: Param,
    reference: bool,
}

impl ConstraintValue {
    fn new(value: f64, reference: bool) -> Self {
        ConstraintValue {
            value: Param::new("value", value),
            reference,
        }
    }

    pub fn value(&self) -> f64 {
        self.value.value()
    }

    pub fn set_value(&self, value: f64) {
        self.value.set_value(value);
    }

    pub fn is_reference(&self) -> bool {
        self.reference
    }

    pub fn set_reference(&mut self, reference: bool) {
        self.reference = reference;
    }

    pub fn param(&self) -> &Param {
        &self.value
    }

    fn parameters(&self) -> Vec<Param> {
        if self.reference {
            vec![self.value.clone()]
        } else {
            Vec::new()
        }
    }
}

macro_rules! impl_value_accessors {
    ($ty:ty) => {
        impl $ty {
            /// Current magnitude.
            pub fn value(&self) -> f64 {
                self.value.value()
            }

            /// Set the magnitude.
            pub fn set_value(&self, value: f64) {
                self.value.set_value(value);
            }

            /// Whether the magnitude is solved for instead of user-fixed.
            pub fn is_reference(&self) -> bool {
                self.value.is_reference()
            }

            pub fn set_reference(&mut self, reference: bool) {
                self.value.set_reference(reference);
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Point on curve
// ---------------------------------------------------------------------------

/// Pins a point onto a curve; the curve parameter t is a referential value.
#[derive(Clone)]
pub struct PointOn {
    point: Point,
    on: Entity,
    value: ConstraintValue,
}

impl PointOn {
    pub fn new(point: Point, on: impl Into<Entity>) -> Self {
        let constraint = PointOn {
            point,
            on: on.into(),
            value: ConstraintValue::new(0.51, true),
        };
        constraint.seed();
        constraint
    }

    pub fn parameters(&self) -> Vec<Param> {
        self.value.parameters()
    }

    pub fn equations(&self) -> Vec<Expr> {
        let diff = self.on.point_on(&self.value.param().expr()) - self.point.expr();
        vec![diff.x, diff.y]
    }

    /// Sweep t over [0, 1], solving a private system at each seed, and lock
    /// in the t with the smallest residual. Keeps Newton out of the wrong
    /// basin on closed curves.
    fn seed(&self) {
        let mut sys = EquationSystem::new();
        sys.add_parameters(self.parameters());
        let eqs = self.equations();
        sys.add_equations(eqs.iter().cloned());

        let mut best_t = 0.0;
        let mut best: Option<f64> = None;
        for i in 0..=8 {
            self.value.set_value(f64::from(i) * 0.125);
            let _ = sys.solve();
            let residual: f64 = eqs.iter().map(|e| e.eval().abs()).sum();
            if best.map_or(true, |m| residual <= m) {
                best = Some(residual);
                best_t = self.value.value();
            }
        }
        debug!("seeded curve parameter at t = {best_t}");
        self.value.set_value(best_t);
    }
}

impl_value_accessors!(PointOn);

// ---------------------------------------------------------------------------
// Coincidence
// ---------------------------------------------------------------------------

/// Fuses two points. Produces the substitution-form pair the equation
/// system eliminates before iterating.
#[derive(Clone)]
pub struct PointsCoincident {
    p0: Point,
    p1: Point,
}

impl PointsCoincident {
    pub fn new(p0: Point, p1: Point) -> Self {
        PointsCoincident { p0, p1 }
    }

    pub fn parameters(&self) -> Vec<Param> {
        Vec::new()
    }

    pub fn equations(&self) -> Vec<Expr> {
        vec![
            self.p0.x.expr() - self.p1.x.expr(),
            self.p0.y.expr() - self.p1.y.expr(),
        ]
    }

    /// The partner of `p`, for loop analysis over fused points.
    pub fn other_point(&self, p: &Point) -> &Point {
        if self.p0 == *p {
            &self.p1
        } else {
            &self.p0
        }
    }
}

// ---------------------------------------------------------------------------
// Distance
// ---------------------------------------------------------------------------

#[derive(Clone)]
enum DistanceEnds {
    Points(Point, Point),
    Line(Line),
}

/// Fixes the distance between two points, or a line's endpoint distance.
#[derive(Clone)]
pub struct PointsDistance {
    ends: DistanceEnds,
    value: ConstraintValue,
}

impl PointsDistance {
    pub fn between(p0: Point, p1: Point, distance: f64) -> Self {
        PointsDistance {
            ends: DistanceEnds::Points(p0, p1),
            value: ConstraintValue::new(distance, false),
        }
    }

    pub fn along(line: Line, distance: f64) -> Self {
        PointsDistance {
            ends: DistanceEnds::Line(line),
            value: ConstraintValue::new(distance, false),
        }
    }

    pub fn parameters(&self) -> Vec<Param> {
        self.value.parameters()
    }

    pub fn equations(&self) -> Vec<Expr> {
        let (from, to) = match &self.ends {
            DistanceEnds::Points(p0, p1) => (p0.expr(), p1.expr()),
            DistanceEnds::Line(line) => (line.source().expr(), line.target().expr()),
        };
        vec![(to - from).magnitude() - self.value.param().expr()]
    }
}

impl_value_accessors!(PointsDistance);

// ---------------------------------------------------------------------------
// Horizontal / vertical
// ---------------------------------------------------------------------------

/// Aligns a point pair (or a line) with a coordinate axis.
#[derive(Clone)]
pub struct Hv {
    p0: Point,
    p1: Point,
    orientation: HvOrientation,
}

impl Hv {
    pub fn points(p0: Point, p1: Point, orientation: HvOrientation) -> Self {
        Hv {
            p0,
            p1,
            orientation,
        }
    }

    pub fn line(line: &Line, orientation: HvOrientation) -> Self {
        Hv::points(line.source().clone(), line.target().clone(), orientation)
    }

    pub fn orientation(&self) -> HvOrientation {
        self.orientation
    }

    pub fn parameters(&self) -> Vec<Param> {
        Vec::new()
    }

    pub fn equations(&self) -> Vec<Expr> {
        let eq = match self.orientation {
            // a horizontal segment has equal y coordinates, a vertical one
            // equal x coordinates
            HvOrientation::Ox => self.p0.y.expr() - self.p1.y.expr(),
            HvOrientation::Oy => self.p0.x.expr() - self.p1.x.expr(),
        };
        vec![eq]
    }
}

// ---------------------------------------------------------------------------
// Parallel
// ---------------------------------------------------------------------------

/// Makes two lines parallel. Whether they point the same or opposite way is
/// decided once, at construction, from the current geometry.
#[derive(Clone)]
pub struct Parallel {
    l0: Line,
    l1: Line,
    option: ParallelOption,
}

impl Parallel {
    pub fn new(l0: Line, l1: Line) -> Self {
        let mut constraint = Parallel {
            l0,
            l1,
            option: ParallelOption::Codirected,
        };
        constraint.choose_best_option();
        constraint
    }

    pub fn option(&self) -> ParallelOption {
        self.option
    }

    pub fn parameters(&self) -> Vec<Param> {
        Vec::new()
    }

    pub fn equations(&self) -> Vec<Expr> {
        let d0 = self.l0.point_on(&expr(0.0)) - self.l0.point_on(&expr(1.0));
        let d1 = self.l1.point_on(&expr(0.0)) - self.l1.point_on(&expr(1.0));
        let angle = angle2d(&d0, &d1);
        match self.option {
            ParallelOption::Codirected => vec![angle],
            ParallelOption::Antidirected => vec![angle.abs() - expr(PI)],
        }
    }

    fn choose_best_option(&mut self) {
        let mut best = ParallelOption::Codirected;
        let mut min: Option<f64> = None;
        for option in [ParallelOption::Codirected, ParallelOption::Antidirected] {
            self.option = option;
            let residual: f64 = self.equations().iter().map(|e| e.eval().abs()).sum();
            trace!("parallel option {option:?} residual {residual}");
            if min.map_or(true, |m| residual < m) {
                min = Some(residual);
                best = option;
            }
        }
        self.option = best;
    }
}

// ---------------------------------------------------------------------------
// Length
// ---------------------------------------------------------------------------

/// Fixes an entity's length (segment length, circle circumference).
#[derive(Clone)]
pub struct Length {
    entity: Entity,
    value: ConstraintValue,
}

impl Length {
    pub fn new(entity: impl Into<Entity>, length: f64) -> Result<Self, Error> {
        let entity = entity.into();
        if entity.length().is_none() {
            return Err(Error::NoLength(entity.to_string()));
        }
        Ok(Length {
            entity,
            value: ConstraintValue::new(length, false),
        })
    }

    pub fn parameters(&self) -> Vec<Param> {
        self.value.parameters()
    }

    pub fn equations(&self) -> Vec<Expr> {
        match self.entity.length() {
            Some(length) => vec![length - self.value.param().expr()],
            None => Vec::new(),
        }
    }
}

impl_value_accessors!(Length);

// ---------------------------------------------------------------------------
// Angle
// ---------------------------------------------------------------------------

/// Fixes the signed angle between two lines.
#[derive(Clone)]
pub struct Angle {
    l0: Line,
    l1: Line,
    supplementary: bool,
    value: ConstraintValue,
}

impl Angle {
    pub fn new(l0: Line, l1: Line, angle: f64) -> Self {
        Angle {
            l0,
            l1,
            supplementary: false,
            value: ConstraintValue::new(angle, false),
        }
    }

    pub fn is_supplementary(&self) -> bool {
        self.supplementary
    }

    /// Switch between the angle and its supplement, adjusting the stored
    /// value so the constrained geometry stays put.
    pub fn set_supplementary(&mut self, supplementary: bool) {
        if supplementary == self.supplementary {
            return;
        }
        self.supplementary = supplementary;
        let v = self.value.value();
        self.value.set_value(-math::sign(v) * PI - v);
    }

    pub fn parameters(&self) -> Vec<Param> {
        self.value.parameters()
    }

    pub fn equations(&self) -> Vec<Expr> {
        let (s1, t1) = if self.supplementary {
            (self.l1.target(), self.l1.source())
        } else {
            (self.l1.source(), self.l1.target())
        };
        let d0 = self.l0.source().expr() - self.l0.target().expr();
        let d1 = t1.expr() - s1.expr();
        vec![angle2d(&d0, &d1) - self.value.param().expr()]
    }
}

impl_value_accessors!(Angle);

// ---------------------------------------------------------------------------
// Diameter
// ---------------------------------------------------------------------------

/// Fixes a circle's diameter.
#[derive(Clone)]
pub struct Diameter {
    circle: Circle,
    value: ConstraintValue,
}

impl Diameter {
    pub fn new(circle: Circle, diameter: f64) -> Self {
        Diameter {
            circle,
            value: ConstraintValue::new(diameter, false),
        }
    }

    /// Constrain to the circle's current diameter.
    pub fn with_current(circle: Circle) -> Self {
        let diameter = 2.0 * circle.radius.value().abs();
        Diameter::new(circle, diameter)
    }

    pub fn parameters(&self) -> Vec<Param> {
        self.value.parameters()
    }

    pub fn equations(&self) -> Vec<Expr> {
        vec![self.circle.radius_expr() * expr(2.0) - self.value.param().expr()]
    }
}

impl_value_accessors!(Diameter);

// ---------------------------------------------------------------------------
// Tangency
// ---------------------------------------------------------------------------

/// Makes two curves tangent: they share a point and their tangent
/// directions there are parallel. Introduces one curve parameter per
/// entity, solved for as unknowns.
#[derive(Clone)]
pub struct Tangent {
    e0: Entity,
    e1: Entity,
    t0: Param,
    t1: Param,
    reference: bool,
}

impl Tangent {
    pub fn new(e0: impl Into<Entity>, e1: impl Into<Entity>) -> Result<Self, Error> {
        let e0 = e0.into();
        let e1 = e1.into();
        let t0 = Param::new("t0", 0.0);
        let t1 = Param::new("t1", 0.0);
        if e0.tangent_at(&t0.expr()).is_none() {
            return Err(Error::NoTangent(e0.to_string()));
        }
        if e1.tangent_at(&t1.expr()).is_none() {
            return Err(Error::NoTangent(e1.to_string()));
        }
        let constraint = Tangent {
            e0,
            e1,
            t0,
            t1,
            reference: true,
        };
        constraint.seed();
        Ok(constraint)
    }

    /// Grid-search both curve parameters for the seed with the smallest
    /// residual, so Newton starts near the touching configuration.
    fn seed(&self) {
        let eqs = self.equations();
        let mut best = (0.0, 0.0);
        let mut min: Option<f64> = None;
        for i in 0..=8 {
            self.t0.set_value(f64::from(i) * 0.125);
            for j in 0..=8 {
                self.t1.set_value(f64::from(j) * 0.125);
                let residual: f64 = eqs.iter().map(|e| e.eval().abs()).sum();
                if min.map_or(true, |m| residual < m) {
                    min = Some(residual);
                    best = (self.t0.value(), self.t1.value());
                }
            }
        }
        debug!("seeded tangency parameters at t0 = {}, t1 = {}", best.0, best.1);
        self.t0.set_value(best.0);
        self.t1.set_value(best.1);
    }

    pub fn is_reference(&self) -> bool {
        self.reference
    }

    pub fn set_reference(&mut self, reference: bool) {
        self.reference = reference;
    }

    pub fn parameters(&self) -> Vec<Param> {
        if self.reference {
            vec![self.t0.clone(), self.t1.clone()]
        } else {
            Vec::new()
        }
    }

    pub fn equations(&self) -> Vec<Expr> {
        let at0 = self.t0.expr();
        let at1 = self.t1.expr();
        let touch = self.e0.point_on(&at0) - self.e1.point_on(&at1);
        let mut eqs = vec![touch.x, touch.y];
        if let (Some(g0), Some(g1)) = (self.e0.tangent_at(&at0), self.e1.tangent_at(&at1)) {
            eqs.push(&g0.x * &g1.y - &g0.y * &g1.x);
        }
        eqs
    }
}

// ---------------------------------------------------------------------------
// The constraint sum type
// ---------------------------------------------------------------------------

/// Any constraint a sketch can own.
#[derive(Clone)]
pub enum Constraint {
    PointOn(PointOn),
    PointsCoincident(PointsCoincident),
    PointsDistance(PointsDistance),
    Hv(Hv),
    Parallel(Parallel),
    Length(Length),
    Angle(Angle),
    Diameter(Diameter),
    Tangent(Tangent),
}

impl Constraint {
    /// Auxiliary parameters contributed to the solver.
    pub fn parameters(&self) -> Vec<Param> {
        match self {
            Constraint::PointOn(c) => c.parameters(),
            Constraint::PointsCoincident(c) => c.parameters(),
            Constraint::PointsDistance(c) => c.parameters(),
            Constraint::Hv(c) => c.parameters(),
            Constraint::Parallel(c) => c.parameters(),
            Constraint::Length(c) => c.parameters(),
            Constraint::Angle(c) => c.parameters(),
            Constraint::Diameter(c) => c.parameters(),
            Constraint::Tangent(c) => c.parameters(),
        }
    }

    /// The zero-target equations.
    pub fn equations(&self) -> Vec<Expr> {
        match self {
            Constraint::PointOn(c) => c.equations(),
            Constraint::PointsCoincident(c) => c.equations(),
            Constraint::PointsDistance(c) => c.equations(),
            Constraint::Hv(c) => c.equations(),
            Constraint::Parallel(c) => c.equations(),
            Constraint::Length(c) => c.equations(),
            Constraint::Angle(c) => c.equations(),
            Constraint::Diameter(c) => c.equations(),
            Constraint::Tangent(c) => c.equations(),
        }
    }

    /// Whether this constraint fuses two points, which changes the sketch
    /// topology for downstream loop analysis.
    pub fn fuses_points(&self) -> bool {
        matches!(self, Constraint::PointsCoincident(_))
    }
}

macro_rules! impl_constraint_from {
    ($($variant:ident),+ $(,)?) => {
        $(
            impl From<$variant> for Constraint {
                fn from(c: $variant) -> Self {
                    Constraint::$variant(c)
                }
            }
        )+
    };
}

impl_constraint_from!(
    PointOn,
    PointsCoincident,
    PointsDistance,
    Hv,
    Parallel,
    Length,
    Angle,
    Diameter,
    Tangent,
);

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Constraint::PointOn(_) => "PointOn",
            Constraint::PointsCoincident(_) => "PointsCoincident",
            Constraint::PointsDistance(_) => "PointsDistance",
            Constraint::Hv(_) => "HV",
            Constraint::Parallel(_) => "Parallel",
            Constraint::Length(_) => "Length",
            Constraint::Angle(_) => "Angle",
            Constraint::Diameter(_) => "Diameter",
            Constraint::Tangent(_) => "Tangent",
        };
        f.write_str(name)
    }
}
