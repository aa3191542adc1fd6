//! Error types for the flocking core.
//!
//! Every fallible operation on [`Flock`](crate::Flock) returns
//! [`FlockResult<T>`]. A failed call leaves the flock exactly as it was.

use thiserror::Error;

/// Unified error type for the simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlockError {
    /// A configuration value is out of its valid range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The frame clock handed us a timestep we cannot integrate.
    #[error("Invalid timestep: {0}")]
    InvalidTimestep(f32),

    /// An inspection query named a boid that does not exist.
    #[error("Boid index {index} out of range for flock of {count}")]
    IndexOutOfRange { index: usize, count: usize },

    /// A JS value could not be converted to or from a Rust type.
    #[error("JS conversion error: {0}")]
    Js(String),
}

/// Convenience alias for `Result<T, FlockError>`.
pub type FlockResult<T> = Result<T, FlockError>;

impl FlockError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}
