//! Sketch: the aggregate that owns entities and constraints.
//!
//! The sketch tracks what kind of change happened since the last update and
//! decides how much work the next update needs: a topology change rebuilds
//! the equation set, anything else re-solves in place. After a failed solve
//! the sketch stops re-solving until entities or constraints change again,
//! except while a drag equation is present.

use slotmap::{new_key_type, SlotMap};
use tracing::trace;

use crate::constraint::Constraint;
use crate::entity::Entity;
use crate::system::{EquationSystem, SolveResult};

new_key_type! {
    /// Stable key of an entity owned by a sketch.
    pub struct EntityKey;
}

new_key_type! {
    /// Stable key of a constraint owned by a sketch.
    pub struct ConstraintKey;
}

/// One-shot change flags, set on mutation and consumed by `update`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirtyFlags {
    /// Entities or point fusions appeared; the equation set must be rebuilt.
    pub topology: bool,
    /// The constraint graph changed shape.
    pub constraints_topology: bool,
    /// Constraint values or members changed.
    pub constraints: bool,
    /// Entity data changed.
    pub entities: bool,
    /// Closed-loop structure changed.
    pub loops: bool,
}

impl DirtyFlags {
    pub fn any(&self) -> bool {
        self.topology
            || self.constraints_topology
            || self.constraints
            || self.entities
            || self.loops
    }

    fn clear(&mut self) {
        *self = DirtyFlags::default();
    }
}

/// A set of entities and constraints with an owned equation system.
#[derive(Default)]
pub struct Sketch {
    entities: SlotMap<EntityKey, Entity>,
    constraints: SlotMap<ConstraintKey, Constraint>,
    /// The underlying equation system, exposed for diagnostics such as
    /// [`EquationSystem::test_rank`].
    pub system: EquationSystem,
    dirty: DirtyFlags,
    suppress_solve: bool,
}

impl Sketch {
    pub fn new() -> Self {
        Sketch::default()
    }

    /// Take ownership of an entity; its parameters join the solver on the
    /// next update.
    pub fn add_entity(&mut self, entity: impl Into<Entity>) -> EntityKey {
        let entity = entity.into();
        trace!("adding entity {entity}");
        self.dirty.topology = true;
        self.dirty.entities = true;
        self.entities.insert(entity)
    }

    /// Take ownership of a constraint. A point fusion also changes the
    /// topology for downstream loop analysis.
    pub fn add_constraint(&mut self, constraint: impl Into<Constraint>) -> ConstraintKey {
        let constraint = constraint.into();
        trace!("adding constraint {constraint}");
        if constraint.fuses_points() {
            self.dirty.topology = true;
        }
        self.dirty.constraints = true;
        self.dirty.constraints_topology = true;
        self.constraints.insert(constraint)
    }

    pub fn entity(&self, key: EntityKey) -> Option<&Entity> {
        self.entities.get(key)
    }

    pub fn constraint(&self, key: ConstraintKey) -> Option<&Constraint> {
        self.constraints.get(key)
    }

    /// Mutable access to a constraint (e.g. to change a dimension value);
    /// marks the constraints dirty so the next update re-solves.
    pub fn constraint_mut(&mut self, key: ConstraintKey) -> Option<&mut Constraint> {
        let constraint = self.constraints.get_mut(key)?;
        self.dirty.constraints = true;
        Some(constraint)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.values()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.any()
    }

    pub fn dirty_flags(&self) -> DirtyFlags {
        self.dirty
    }

    /// Consume the dirty flags: regenerate the equation set if anything
    /// changed, then solve unless suppressed by an earlier failure. A
    /// pending drag always forces a solve.
    pub fn update(&mut self) -> SolveResult {
        if self.dirty.constraints || self.dirty.entities {
            self.suppress_solve = false;
        }
        if self.dirty.any() {
            self.system.clear();
            self.generate_equations();
        }
        let result = if !self.suppress_solve || self.system.has_dragged() {
            self.system.solve()
        } else {
            SolveResult::DidntConverge
        };
        if result == SolveResult::DidntConverge {
            self.suppress_solve = true;
        }
        self.dirty.clear();
        result
    }

    fn generate_equations(&mut self) {
        for entity in self.entities.values() {
            self.system.add_parameters(entity.parameters());
        }
        for constraint in self.constraints.values() {
            self.system.add_parameters(constraint.parameters());
            self.system.add_equations(constraint.equations());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{PointsCoincident, PointsDistance};
    use crate::entity::Point;
    use crate::param::Param;

    fn point(name: &str, x: f64, y: f64) -> Point {
        Point::new(
            Param::new(format!("{name}_x"), x),
            Param::new(format!("{name}_y"), y),
            Param::new(format!("{name}_z"), 0.0),
        )
    }

    #[test]
    fn add_entity_marks_topology_and_entities() {
        let mut sketch = Sketch::new();
        assert!(!sketch.is_dirty());
        sketch.add_entity(point("p", 0.0, 0.0));
        let flags = sketch.dirty_flags();
        assert!(flags.topology && flags.entities);
        assert!(!flags.constraints);
    }

    #[test]
    fn coincidence_marks_topology() {
        let mut sketch = Sketch::new();
        let a = point("a", 0.0, 0.0);
        let b = point("b", 0.0, 0.0);
        sketch.add_constraint(PointsCoincident::new(a, b));
        let flags = sketch.dirty_flags();
        assert!(flags.topology && flags.constraints && flags.constraints_topology);
    }

    #[test]
    fn distance_does_not_mark_topology() {
        let mut sketch = Sketch::new();
        let a = point("a", 0.0, 0.0);
        let b = point("b", 1.0, 0.0);
        sketch.add_constraint(PointsDistance::between(a, b, 1.0));
        assert!(!sketch.dirty_flags().topology);
    }

    #[test]
    fn update_clears_flags_and_solves() {
        let mut sketch = Sketch::new();
        let a = point("a", 0.0, 0.0);
        let b = point("b", 1.0, 1.0);
        sketch.add_entity(a.clone());
        sketch.add_entity(b.clone());
        sketch.add_constraint(PointsDistance::between(a.clone(), b.clone(), 5.0));
        assert_eq!(sketch.update(), SolveResult::Okay);
        assert!(!sketch.is_dirty());

        let dx = b.x.value() - a.x.value();
        let dy = b.y.value() - a.y.value();
        assert!((dx.hypot(dy) - 5.0).abs() < 1e-8);
    }

    #[test]
    fn failed_solve_suppresses_until_changed() {
        let mut sketch = Sketch::new();
        let a = point("a", 0.0, 0.0);
        let b = point("b", 3.0, 0.0);
        sketch.add_entity(a.clone());
        sketch.add_entity(b.clone());
        sketch.add_constraint(PointsDistance::between(a.clone(), b.clone(), 1.0));
        let key = sketch.add_constraint(PointsDistance::between(a.clone(), b.clone(), 2.0));
        assert_eq!(sketch.update(), SolveResult::DidntConverge);

        // nothing changed: the sketch does not retry
        assert_eq!(sketch.update(), SolveResult::DidntConverge);

        // touching a constraint lifts the suppression
        if let Some(Constraint::PointsDistance(d)) = sketch.constraint_mut(key) {
            d.set_value(1.0);
        }
        assert_eq!(sketch.update(), SolveResult::Okay);
    }
}
