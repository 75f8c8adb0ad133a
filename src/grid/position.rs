//! Tile Positions
//!
//! Value-type keys for tiles on character layers. The block cache and the
//! transition table hash these directly.

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::core::direction::Direction;
use crate::core::vec2::Vec2;

/// Name of a character layer.
pub type CharLayer = String;

/// Character identifier.
pub type CharId = String;

/// Integer tile coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TilePos {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
}

impl TilePos {
    /// Create a tile coordinate.
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Neighbouring tile in a direction.
    #[inline]
    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.step();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// As a `Vec2`.
    #[inline]
    pub fn to_vec2(self) -> Vec2 {
        Vec2::from_ints(self.x, self.y)
    }
}

impl fmt::Display for TilePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Tile coordinate on a character layer.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct LayerPosition {
    /// Tile coordinate
    pub position: TilePos,
    /// Character layer (`None` when the map declares no character layers)
    pub layer: Option<CharLayer>,
}

impl LayerPosition {
    /// Create a position on a layer.
    pub fn new(x: i32, y: i32, layer: Option<&str>) -> Self {
        Self {
            position: TilePos::new(x, y),
            layer: layer.map(str::to_string),
        }
    }

    /// Create a position without a character layer.
    pub fn unlayered(x: i32, y: i32) -> Self {
        Self::new(x, y, None)
    }

    /// Same position on another layer.
    pub fn with_layer(&self, layer: Option<CharLayer>) -> Self {
        Self {
            position: self.position,
            layer,
        }
    }

    /// Layer as `Option<&str>`.
    #[inline]
    pub fn layer(&self) -> Option<&str> {
        self.layer.as_deref()
    }
}

impl fmt::Display for LayerPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.layer {
            Some(layer) => write!(f, "{}@{}", self.position, layer),
            None => write!(f, "{}", self.position),
        }
    }
}

/// Payload of the position-change events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionChange {
    /// Tile being left
    pub exit_tile: LayerPosition,
    /// Tile being entered
    pub enter_tile: LayerPosition,
}
