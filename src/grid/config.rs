//! Grid Configuration
//!
//! One explicit configuration value, built once and handed to the tilemap,
//! the block cache and every character. Nothing reads ambient global state.

use serde::{Serialize, Deserialize};

use crate::core::direction::{Direction, NumberOfDirections};
use crate::grid::error::{GridError, Result};

/// When a moving character releases the tile it is leaving.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum CollisionStrategy {
    /// Occupy both the exit and the enter tile until the move finishes.
    #[default]
    BlockTwoTiles,
    /// Release the exit tile as soon as the move starts.
    BlockOneTileAhead,
}

/// Tile and layer property keys read from map data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TilePropertyNames {
    /// Generic collision flag on a tile.
    pub collision: String,
    /// Blocks entering the tile through its left edge.
    pub collision_left: String,
    /// Blocks entering the tile through its right edge.
    pub collision_right: String,
    /// Blocks entering the tile through its top edge.
    pub collision_up: String,
    /// Blocks entering the tile through its bottom edge.
    pub collision_down: String,
    /// Layer property declaring a character layer (value = layer name).
    pub char_layer: String,
    /// Legacy layer property: render above everything else.
    pub always_top: String,
    /// Layer property: fan the layer out into one slice per row.
    pub height_shift: String,
    /// Layer property marking a transition layer (value = source char layer).
    pub transition_from: String,
    /// Tile property on a transition layer (value = target char layer).
    pub transition_to: String,
}

impl Default for TilePropertyNames {
    fn default() -> Self {
        Self {
            collision: "ge_collide".to_string(),
            collision_left: "ge_collide_left".to_string(),
            collision_right: "ge_collide_right".to_string(),
            collision_up: "ge_collide_up".to_string(),
            collision_down: "ge_collide_down".to_string(),
            char_layer: "ge_charLayer".to_string(),
            always_top: "ge_alwaysTop".to_string(),
            height_shift: "ge_heightShift".to_string(),
            transition_from: "ge_layerTransitionFrom".to_string(),
            transition_to: "ge_layerTransitionTo".to_string(),
        }
    }
}

impl TilePropertyNames {
    /// Directional collision key for a cardinal direction.
    ///
    /// Diagonals and `None` have no directional key.
    pub fn directional(&self, direction: Direction) -> Option<&str> {
        match direction {
            Direction::Left => Some(&self.collision_left),
            Direction::Right => Some(&self.collision_right),
            Direction::Up => Some(&self.collision_up),
            Direction::Down => Some(&self.collision_down),
            _ => None,
        }
    }
}

/// Configuration shared by all grid components.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Directions characters may move in.
    pub number_of_directions: NumberOfDirections,
    /// When the exit tile is released from the block cache.
    pub character_collision_strategy: CollisionStrategy,
    /// Map property keys.
    pub properties: TilePropertyNames,
    /// Collision group given to characters that do not name any.
    pub default_collision_group: String,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            number_of_directions: NumberOfDirections::Four,
            character_collision_strategy: CollisionStrategy::BlockTwoTiles,
            properties: TilePropertyNames::default(),
            default_collision_group: "geDefault".to_string(),
        }
    }
}

impl GridConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| GridError::Config(e.to_string()))
    }

    /// Builder-style setter for the direction count.
    pub fn with_directions(mut self, number_of_directions: NumberOfDirections) -> Self {
        self.number_of_directions = number_of_directions;
        self
    }

    /// Builder-style setter for the collision strategy.
    pub fn with_collision_strategy(mut self, strategy: CollisionStrategy) -> Self {
        self.character_collision_strategy = strategy;
        self
    }

    /// Builder-style setter for the generic collision property key.
    pub fn with_collision_property(mut self, name: impl Into<String>) -> Self {
        self.properties.collision = name.into();
        self
    }
}
