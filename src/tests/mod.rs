//! End-to-end scenarios over the full entity/constraint/solver stack.

mod scenarios;

use crate::entity::Point;
use crate::param::Param;

pub(crate) fn point(name: &str, x: f64, y: f64) -> Point {
    Point::new(
        Param::new(format!("{name}_x"), x),
        Param::new(format!("{name}_y"), y),
        Param::new(format!("{name}_z"), 0.0),
    )
}
