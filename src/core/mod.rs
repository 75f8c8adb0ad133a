//! Core geometry primitives.
//!
//! Stateless building blocks shared by the collision model and the motion
//! state machine.

pub mod vec2;
pub mod direction;
pub mod rng;

// Re-export core types
pub use vec2::Vec2;
pub use direction::{Direction, NumberOfDirections, isometric_to_pixel, isometric_from_pixel};
pub use rng::DeterministicRng;
