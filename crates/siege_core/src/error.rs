//! Error types for the siege simulation.

use thiserror::Error;

use crate::math::Fixed;

/// Result type alias using [`SiegeError`].
pub type Result<T> = std::result::Result<T, SiegeError>;

/// Top-level error type for all simulation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SiegeError {
    /// A caller passed an argument the simulation cannot accept.
    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] InvalidArgument),

    /// Battle configuration failed validation.
    #[error("Invalid battle configuration: {0}")]
    InvalidConfig(String),

    /// Invalid simulation state (serialization round trips).
    #[error("Invalid simulation state: {0}")]
    InvalidState(String),
}

/// Arguments rejected at the simulation boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidArgument {
    /// Time never runs backwards.
    #[error("time step must be non-negative, got {0}")]
    NegativeDelta(Fixed),

    /// Upgrade key not in the upgrade table.
    #[error("unknown upgrade key '{0}'")]
    UnknownUpgrade(String),

    /// Side name other than "player" or "enemy".
    #[error("unknown side '{0}'")]
    UnknownSide(String),

    /// Unit stats that would create a unit born dead or frozen in place.
    #[error("invalid unit stats: {0}")]
    InvalidStats(String),
}

impl SiegeError {
    /// Whether this error was caused by a bad caller argument.
    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}
