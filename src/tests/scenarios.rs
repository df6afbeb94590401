use super::point;
use crate::constraint::{
    Hv, HvOrientation, Length, Parallel, ParallelOption, PointOn, PointsCoincident,
    PointsDistance, Tangent,
};
use crate::entity::{Circle, Line};
use crate::param::Param;
use crate::sketch::Sketch;
use crate::system::SolveResult;

#[test]
fn length_of_horizontal_segment() {
    let p1 = point("p1", 3.0, 1.0);
    let p2 = point("p2", 4.0, 2.0);
    let line = Line::new(p1.clone(), p2.clone());

    let mut sketch = Sketch::new();
    sketch.add_entity(line.clone());
    sketch.add_constraint(Length::new(line.clone(), 15.0).expect("lines have a length"));
    sketch.add_constraint(Hv::line(&line, HvOrientation::Ox));

    assert_eq!(sketch.update(), SolveResult::Okay);
    assert!((p1.y.value() - p2.y.value()).abs() < 1e-8);
    assert!(((p2.x.value() - p1.x.value()).abs() - 15.0).abs() < 1e-8);

    // the segment can still translate freely
    let (well_posed, dof) = sketch.system.test_rank();
    assert!(well_posed);
    assert_eq!(dof, 2);
}

#[test]
fn point_on_line() {
    let p1 = point("p1", 0.0, 0.0);
    let p2 = point("p2", 10.0, 0.0);
    let p3 = point("p3", 5.0, 3.0);
    let line = Line::new(p1, p2);

    let mut sketch = Sketch::new();
    sketch.add_entity(p3.clone());
    sketch.add_constraint(PointOn::new(p3.clone(), line));

    assert_eq!(sketch.update(), SolveResult::Okay);
    assert!(p3.y.value().abs() < 1e-8);
    assert!(p3.x.value() >= 0.0 && p3.x.value() <= 10.0);
}

#[test]
fn point_on_circle() {
    let center = point("c", 0.0, 0.0);
    let circle = Circle::new(center, Param::new("r", 2.0));
    let p = point("p", 3.0, 0.5);

    let mut sketch = Sketch::new();
    sketch.add_entity(p.clone());
    sketch.add_constraint(PointOn::new(p.clone(), circle));

    assert_eq!(sketch.update(), SolveResult::Okay);
    let r = p.x.value().hypot(p.y.value());
    assert!((r - 2.0).abs() < 1e-8);
}

#[test]
fn coincident_points_are_substituted() {
    let p1 = point("p1", 1.0, 1.0);
    let p2 = point("p2", 1.0 + 5e-11, 1.0 + 5e-11);

    let mut sketch = Sketch::new();
    sketch.add_entity(p1.clone());
    sketch.add_entity(p2.clone());
    sketch.add_constraint(PointsCoincident::new(p1.clone(), p2.clone()));

    assert_eq!(sketch.update(), SolveResult::Okay);

    // both component equations were eliminated before iterating
    assert_eq!(sketch.system.source_equations().len(), 2);
    assert_eq!(sketch.system.equations().len(), 0);
    let subs = sketch.system.substitution_map();
    assert_eq!(subs.get(&p2.x), Some(&p1.x));
    assert_eq!(subs.get(&p2.y), Some(&p1.y));

    // back substitution copies the kept value exactly
    assert_eq!(p2.x.value(), p1.x.value());
    assert_eq!(p2.y.value(), p1.y.value());
}

#[test]
fn parallel_chooses_antidirected_orientation() {
    let l0 = Line::new(point("a", 0.0, 0.0), point("b", 10.0, 0.0));
    let l1 = Line::new(point("c", 10.0, 1.0), point("d", 0.0, 1.2));
    let constraint = Parallel::new(l0.clone(), l1.clone());
    assert_eq!(constraint.option(), ParallelOption::Antidirected);

    let mut sketch = Sketch::new();
    sketch.add_entity(l0.clone());
    sketch.add_entity(l1.clone());
    sketch.add_constraint(constraint);

    assert_eq!(sketch.update(), SolveResult::Okay);

    // directions are now exactly opposed
    let d0x = l0.p0.x.value() - l0.p1.x.value();
    let d0y = l0.p0.y.value() - l0.p1.y.value();
    let d1x = l1.p0.x.value() - l1.p1.x.value();
    let d1y = l1.p0.y.value() - l1.p1.y.value();
    let cross = d0x * d1y - d0y * d1x;
    let dot = d0x * d1x + d0y * d1y;
    assert!(cross.abs() < 1e-6);
    assert!(dot < 0.0);
}

#[test]
fn over_constrained_coincidences_are_redundant_not_singular() {
    let p1 = point("p1", 2.0, 3.0);
    let p2 = point("p2", 2.0, 3.0);
    let p3 = point("p3", 2.0, 3.0);

    let mut sketch = Sketch::new();
    sketch.add_entity(p1.clone());
    sketch.add_entity(p2.clone());
    sketch.add_entity(p3.clone());
    sketch.add_constraint(PointsCoincident::new(p1.clone(), p2.clone()));
    sketch.add_constraint(PointsCoincident::new(p2.clone(), p3.clone()));
    sketch.add_constraint(PointsCoincident::new(p1.clone(), p3.clone()));

    assert_eq!(sketch.update(), SolveResult::Okay);

    // six raw equations collapse entirely; the third pair was tautological
    assert_eq!(sketch.system.source_equations().len(), 6);
    assert!(sketch.system.equations().len() < 6);
    assert_eq!(sketch.system.equations().len(), 0);
    assert_eq!(sketch.system.redundant_count(), 2);

    let (well_posed, _dof) = sketch.system.test_rank();
    assert!(well_posed);
}

#[test]
fn incompatible_distances_revert_parameters() {
    let p = point("p", 0.0, 0.0);
    let q = point("q", 3.0, 0.0);

    let mut sketch = Sketch::new();
    sketch.add_entity(p.clone());
    sketch.add_entity(q.clone());
    sketch.add_constraint(PointsDistance::between(p.clone(), q.clone(), 1.0));
    sketch.add_constraint(PointsDistance::between(p.clone(), q.clone(), 2.0));

    assert_eq!(sketch.update(), SolveResult::DidntConverge);

    // the snapshot came back exactly
    assert_eq!(p.x.value(), 0.0);
    assert_eq!(p.y.value(), 0.0);
    assert_eq!(q.x.value(), 3.0);
    assert_eq!(q.y.value(), 0.0);
}

#[test]
fn line_distance_constraint() {
    let line = Line::new(point("a", 0.0, 0.0), point("b", 1.0, 1.0));

    let mut sketch = Sketch::new();
    sketch.add_entity(line.clone());
    sketch.add_constraint(PointsDistance::along(line.clone(), 4.0));

    assert_eq!(sketch.update(), SolveResult::Okay);
    let dx = line.p1.x.value() - line.p0.x.value();
    let dy = line.p1.y.value() - line.p0.y.value();
    assert!((dx.hypot(dy) - 4.0).abs() < 1e-8);
}

#[test]
fn dragging_a_point_moves_the_sketch() {
    let p = point("p", 0.0, 0.0);
    let q = point("q", 1.0, 0.0);

    let mut sketch = Sketch::new();
    sketch.add_entity(p.clone());
    sketch.add_entity(q.clone());
    sketch.add_constraint(PointsDistance::between(p.clone(), q.clone(), 1.0));
    assert_eq!(sketch.update(), SolveResult::Okay);

    // pull q toward (4, 3); the soft equations fade, the distance holds
    for eq in q.drag_to(4.0, 3.0) {
        sketch.system.add_equation(eq);
    }
    assert!(sketch.system.has_dragged());
    assert_eq!(sketch.update(), SolveResult::Okay);

    let dx = q.x.value() - p.x.value();
    let dy = q.y.value() - p.y.value();
    assert!((dx.hypot(dy) - 1.0).abs() < 1e-8);
    // and q actually moved toward the target
    assert!(q.x.value() > 0.5);
}

#[test]
fn tangent_line_to_circle() {
    let line = Line::new(point("a", -5.0, 0.8), point("b", 5.0, 1.2));
    let circle = Circle::new(point("c", 0.0, 0.0), Param::new("r", 1.0));

    let mut sketch = Sketch::new();
    sketch.add_entity(line.clone());
    sketch.add_constraint(
        Tangent::new(line.clone(), circle.clone()).expect("curves have tangents"),
    );

    assert_eq!(sketch.update(), SolveResult::Okay);

    // the line now sits at distance r from the center
    let [ax, ay] = line.p0.eval();
    let [bx, by] = line.p1.eval();
    let (dx, dy) = (bx - ax, by - ay);
    let len = dx.hypot(dy);
    let dist = ((ax * by - ay * bx) / len).abs();
    assert!((dist - 1.0).abs() < 1e-6);
}

#[test]
fn changing_a_dimension_resolves() {
    let p = point("p", 0.0, 0.0);
    let q = point("q", 2.0, 0.0);

    let mut sketch = Sketch::new();
    sketch.add_entity(p.clone());
    sketch.add_entity(q.clone());
    let key = sketch.add_constraint(PointsDistance::between(p.clone(), q.clone(), 2.0));
    assert_eq!(sketch.update(), SolveResult::Okay);

    if let Some(crate::constraint::Constraint::PointsDistance(d)) = sketch.constraint_mut(key) {
        d.set_value(6.0);
    }
    assert_eq!(sketch.update(), SolveResult::Okay);

    let dx = q.x.value() - p.x.value();
    let dy = q.y.value() - p.y.value();
    assert!((dx.hypot(dy) - 6.0).abs() < 1e-8);
}

#[test]
fn suppressed_sketch_still_solves_while_dragged() {
    let p = point("p", 0.0, 0.0);
    let q = point("q", 3.0, 0.0);

    let mut sketch = Sketch::new();
    sketch.add_entity(p.clone());
    sketch.add_entity(q.clone());
    sketch.add_constraint(PointsDistance::between(p.clone(), q.clone(), 1.0));
    sketch.add_constraint(PointsDistance::between(p.clone(), q.clone(), 2.0));
    assert_eq!(sketch.update(), SolveResult::DidntConverge);

    // the next update is suppressed, but a drag forces the solve attempt
    for eq in q.drag_to(5.0, 0.0) {
        sketch.system.add_equation(eq);
    }
    assert_eq!(sketch.update(), SolveResult::DidntConverge);
    // still infeasible, but the solver did run: parameters were stored and
    // reverted rather than skipped
    assert_eq!(q.x.value(), 3.0);
}
