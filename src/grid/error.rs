//! Grid Errors
//!
//! Only conditions that would corrupt the occupancy invariants are errors.
//! Harmless misuse (moving while moving, teleporting mid-step) is a no-op.

use crate::core::direction::{Direction, NumberOfDirections};

/// Errors reported by the grid engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridError {
    /// A character with this id is already registered.
    #[error("character already registered: {0}")]
    AlreadyRegistered(String),

    /// No character with this id is registered.
    #[error("unknown character: {0}")]
    UnknownCharacter(String),

    /// The direction is not available in this world.
    #[error("direction {direction} not supported with {allowed} directions")]
    UnsupportedDirection {
        /// Requested direction
        direction: Direction,
        /// Configured direction count
        allowed: NumberOfDirections,
    },

    /// Map data could not be interpreted.
    #[error("invalid map: {0}")]
    InvalidMap(String),

    /// Configuration could not be parsed.
    #[error("invalid config: {0}")]
    Config(String),
}

/// Result alias for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;
