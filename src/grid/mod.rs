//! Grid Movement Module
//!
//! Characters stepping tile by tile over a layered map.
//!
//! ## Module Structure
//!
//! - `config`: Shared configuration and map property keys
//! - `error`: Error type for fallible operations
//! - `position`: Tile and layer position keys
//! - `events`: Per-character event streams
//! - `tilemap`: Map data access and an in-memory map
//! - `grid_tilemap`: Collision model, depths and layer transitions
//! - `block_cache`: Incremental tile occupancy
//! - `animation`: Walking frame selection
//! - `character`: Motion state machine
//! - `world`: Owner of the map and all characters

pub mod config;
pub mod error;
pub mod position;
pub mod events;
pub mod tilemap;
pub mod grid_tilemap;
pub mod block_cache;
pub mod animation;
pub mod character;
pub mod world;

// Re-export key types
pub use config::{CollisionStrategy, GridConfig, TilePropertyNames};
pub use error::{GridError, Result};
pub use position::{CharId, CharLayer, LayerPosition, PositionChange, TilePos};
pub use events::{CharacterEvent, CharacterEvents, Subject, SubscriptionId};
pub use tilemap::{Orientation, TileData, TileLayerData, Tilemap, TilemapData};
pub use grid_tilemap::GridTilemap;
pub use block_cache::CharBlockCache;
pub use animation::{Foot, FrameState, WalkingAnimation};
pub use character::{CharacterBody, CharacterConfig, GridCharacter, SpriteBody};
pub use world::{GridWorld, TickResult, WorldEvent};
