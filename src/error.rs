use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the collision engine.
///
/// Every variant is raised by the call that introduces the bad value; the
/// integration loop itself never produces one for validated input.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid user or API parameter.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// A new body or barrier would interpenetrate existing geometry.
    #[error("overlap: {0}")]
    Overlap(String),

    /// Lookup by an id the engine never issued.
    #[error("unknown body id {0}")]
    UnknownBody(u64),

    /// Numerical or geometric issue (e.g., degenerate contact normal).
    #[error("numerical error: {0}")]
    MathError(String),
}
