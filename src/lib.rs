//! # Gridwalk
//!
//! Tile-grid character movement: a motion state machine per character, a
//! layered collision model and an incremental occupancy cache.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         GRIDWALK                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/              - Geometry primitives                    │
//! │  ├── vec2.rs        - 2D pixel vector                        │
//! │  ├── direction.rs   - Directions and isometric rotation      │
//! │  └── rng.rs         - Seeded PRNG for scripted walkers       │
//! │                                                              │
//! │  grid/              - Movement engine                        │
//! │  ├── tilemap.rs     - Map data access                        │
//! │  ├── grid_tilemap.rs- Collision, depths, transitions         │
//! │  ├── block_cache.rs - Tile occupancy by characters           │
//! │  ├── character.rs   - Motion state machine                   │
//! │  ├── animation.rs   - Walking frames                         │
//! │  ├── events.rs      - Observable event streams               │
//! │  └── world.rs       - Per-frame driver                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Occupancy Guarantee
//!
//! Every registered character occupies exactly its current tile while idle
//! and at most its current and next tile while moving. No two characters
//! sharing a collision group ever occupy the same tile on the same layer.
//!
//! The engine is single-threaded. Characters are updated in ascending id
//! order so identical inputs give identical results.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod grid;

// Re-export commonly used types
pub use core::direction::{Direction, NumberOfDirections};
pub use core::vec2::Vec2;
pub use core::rng::DeterministicRng;
pub use grid::{
    CharacterConfig, CollisionStrategy, GridCharacter, GridConfig, GridError, GridTilemap,
    GridWorld, LayerPosition, TickResult, TilemapData,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Frame length used by the demo driver (ms)
pub const FRAME_MS: f64 = 1000.0 / 60.0;
