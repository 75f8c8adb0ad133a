//! Tilemap Data
//!
//! The host-facing seam for map data. [`Tilemap`] is what the collision
//! model reads; [`TilemapData`] is a plain serde implementation that can be
//! loaded from JSON or built in code.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};
use serde_json::Value;

use crate::grid::error::{GridError, Result};

/// Map projection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum Orientation {
    /// Square grid, tile `(x, y)` at pixel `(x * w, y * h)`
    #[default]
    Orthogonal,
    /// Diamond grid
    Isometric,
}

/// Read-only view of layered tile data.
///
/// Layers are addressed by their index in declaration order.
pub trait Tilemap {
    /// Map width in tiles.
    fn width(&self) -> u32;

    /// Map height in tiles.
    fn height(&self) -> u32;

    /// Unscaled tile width in pixels.
    fn tile_width(&self) -> f64;

    /// Unscaled tile height in pixels.
    fn tile_height(&self) -> f64;

    /// Map projection.
    fn orientation(&self) -> Orientation;

    /// Number of raw layers.
    fn layer_count(&self) -> usize;

    /// Name of a layer.
    fn layer_name(&self, layer: usize) -> &str;

    /// Render scale of a layer.
    fn layer_scale(&self, layer: usize) -> f64;

    /// Layer property value.
    fn layer_property(&self, layer: usize, name: &str) -> Option<&Value>;

    /// Whether a tile exists at a position. Out-of-range positions have none.
    fn has_tile(&self, layer: usize, x: i32, y: i32) -> bool;

    /// Property of the tile at a position.
    fn tile_property(&self, layer: usize, x: i32, y: i32, name: &str) -> Option<&Value>;
}

/// Truthiness of a property value.
///
/// `true`, non-zero numbers and non-empty strings are truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
        Value::Null => false,
    }
}

// =============================================================================
// SERDE DATA MODEL
// =============================================================================

/// A single tile.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TileData {
    /// Tile properties
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

impl TileData {
    /// Tile with no properties.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style property setter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

fn default_scale() -> f64 {
    1.0
}

/// One layer: properties plus a row-major tile array (`None` = no tile).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileLayerData {
    /// Layer name
    pub name: String,
    /// Layer properties
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
    /// Render scale
    #[serde(default = "default_scale")]
    pub scale: f64,
    /// `width * height` tiles, row-major
    pub tiles: Vec<Option<TileData>>,
}

impl TileLayerData {
    /// Layer completely filled with property-less tiles.
    pub fn filled(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
            scale: 1.0,
            tiles: vec![Some(TileData::new()); (width * height) as usize],
        }
    }

    /// Layer without any tiles.
    pub fn empty(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
            scale: 1.0,
            tiles: vec![None; (width * height) as usize],
        }
    }

    /// Builder-style layer property setter.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Builder-style scale setter.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }
}

/// Complete map description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TilemapData {
    /// Width in tiles
    pub width: u32,
    /// Height in tiles
    pub height: u32,
    /// Unscaled tile width
    pub tile_width: f64,
    /// Unscaled tile height
    pub tile_height: f64,
    /// Projection
    #[serde(default)]
    pub orientation: Orientation,
    /// Layers in declaration order (bottom first)
    #[serde(default)]
    pub layers: Vec<TileLayerData>,
}

impl TilemapData {
    /// Empty orthogonal map.
    pub fn new(width: u32, height: u32, tile_width: f64, tile_height: f64) -> Self {
        Self {
            width,
            height,
            tile_width,
            tile_height,
            orientation: Orientation::Orthogonal,
            layers: Vec::new(),
        }
    }

    /// Builder-style orientation setter.
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Builder-style layer append.
    pub fn with_layer(mut self, layer: TileLayerData) -> Self {
        self.layers.push(layer);
        self
    }

    /// Parse and validate a map from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let data: TilemapData =
            serde_json::from_str(json).map_err(|e| GridError::InvalidMap(e.to_string()))?;
        data.validate()?;
        Ok(data)
    }

    /// Check that every layer holds exactly `width * height` tiles.
    pub fn validate(&self) -> Result<()> {
        let expected = self.width as usize * self.height as usize;
        for layer in &self.layers {
            if layer.tiles.len() != expected {
                return Err(GridError::InvalidMap(format!(
                    "layer '{}' has {} tiles, expected {}",
                    layer.name,
                    layer.tiles.len(),
                    expected
                )));
            }
        }
        if self.tile_width <= 0.0 || self.tile_height <= 0.0 {
            return Err(GridError::InvalidMap(format!(
                "tile size must be positive, got {}x{}",
                self.tile_width, self.tile_height
            )));
        }
        Ok(())
    }

    /// Replace the tile at a position. Out-of-range writes are ignored.
    pub fn set_tile(&mut self, layer: usize, x: i32, y: i32, tile: Option<TileData>) {
        if let Some(index) = self.index_of(x, y) {
            if let Some(slot) = self.layers.get_mut(layer).and_then(|l| l.tiles.get_mut(index)) {
                *slot = tile;
            }
        }
    }

    fn index_of(&self, x: i32, y: i32) -> Option<usize> {
        let x = u32::try_from(x).ok()?;
        let y = u32::try_from(y).ok()?;
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y * self.width + x) as usize)
    }

    fn tile(&self, layer: usize, x: i32, y: i32) -> Option<&TileData> {
        let index = self.index_of(x, y)?;
        self.layers.get(layer)?.tiles.get(index)?.as_ref()
    }
}

impl Tilemap for TilemapData {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn tile_width(&self) -> f64 {
        self.tile_width
    }

    fn tile_height(&self) -> f64 {
        self.tile_height
    }

    fn orientation(&self) -> Orientation {
        self.orientation
    }

    fn layer_count(&self) -> usize {
        self.layers.len()
    }

    fn layer_name(&self, layer: usize) -> &str {
        self.layers.get(layer).map(|l| l.name.as_str()).unwrap_or("")
    }

    fn layer_scale(&self, layer: usize) -> f64 {
        self.layers.get(layer).map(|l| l.scale).unwrap_or(1.0)
    }

    fn layer_property(&self, layer: usize, name: &str) -> Option<&Value> {
        self.layers.get(layer)?.properties.get(name)
    }

    fn has_tile(&self, layer: usize, x: i32, y: i32) -> bool {
        self.tile(layer, x, y).is_some()
    }

    fn tile_property(&self, layer: usize, x: i32, y: i32, name: &str) -> Option<&Value> {
        self.tile(layer, x, y)?.properties.get(name)
    }
}
