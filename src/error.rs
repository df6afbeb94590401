//! Crate error type.
//!
//! Only misuse surfaces as an error; numeric hazards inside a solve are
//! swallowed by design and reported through [`crate::SolveResult`] instead.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The equation handle is not registered in the system.
    #[error("equation is not registered in the system")]
    UnknownEquation,

    /// The parameter is not registered in the system.
    #[error("parameter `{0}` is not registered in the system")]
    UnknownParameter(String),

    /// The entity has no length to constrain (e.g. a point).
    #[error("entity `{0}` has no length to constrain")]
    NoLength(String),

    /// The entity has no tangent direction (e.g. a point).
    #[error("entity `{0}` has no tangent direction")]
    NoTangent(String),
}
