//! Grid Tilemap
//!
//! The collision model. Wraps a [`Tilemap`] and interprets its layers:
//!
//! - layers carrying the char-layer property declare character layers and
//!   own every raw layer since the previous declaration;
//! - transition layers register layer transitions and are otherwise ignored;
//! - every layer gets a render depth, height-shift layers are fanned out
//!   into per-row slices.
//!
//! Character occupancy is answered by the embedded [`CharBlockCache`].

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::Value;
use tracing::{debug, warn};

use crate::core::direction::{isometric_from_pixel, isometric_to_pixel, Direction};
use crate::core::vec2::Vec2;
use crate::grid::block_cache::CharBlockCache;
use crate::grid::character::GridCharacter;
use crate::grid::config::GridConfig;
use crate::grid::error::{GridError, Result};
use crate::grid::position::{CharId, CharLayer, LayerPosition, TilePos};
use crate::grid::tilemap::{is_truthy, Orientation, Tilemap};

/// Digits used to pack a sub-layer offset into a depth value.
pub const DEPTH_PAD_DIGITS: i32 = 7;

/// Shift a value `digits` decimal places to the right.
///
/// Used to order sprites inside a layer without crossing into the next one.
#[inline]
pub fn shift_pad(value: f64, digits: i32) -> f64 {
    value / 10f64.powi(digits)
}

/// Tolerance for float error when converting pixels back to tiles.
const TILE_EPSILON: f64 = 1e-9;

fn floor_tile(value: f64) -> i32 {
    (value + TILE_EPSILON).floor() as i32
}

/// Render depth of a raw layer.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerDepth {
    /// Layer name
    pub name: String,
    /// Depth
    pub depth: f64,
}

/// One row of a height-shift layer.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerSlice {
    /// Slice name, `<layer>#<row>`
    pub name: String,
    /// Layer the slice was cut from
    pub source_layer: String,
    /// Tile row
    pub row: u32,
    /// Depth
    pub depth: f64,
}

/// Transition table: `(position, from layer) -> to layer`.
pub type Transitions = BTreeMap<(TilePos, CharLayer), CharLayer>;

/// Layered collision model over a [`Tilemap`].
pub struct GridTilemap {
    tilemap: Box<dyn Tilemap>,
    config: GridConfig,
    char_layers: Vec<CharLayer>,
    collision_layers: HashMap<Option<CharLayer>, Vec<usize>>,
    layer_depths: Vec<LayerDepth>,
    height_shift_slices: Vec<LayerSlice>,
    char_layer_depths: HashMap<CharLayer, f64>,
    default_depth: f64,
    transitions: RefCell<Transitions>,
    block_cache: CharBlockCache,
}

impl std::fmt::Debug for GridTilemap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridTilemap")
            .field("char_layers", &self.char_layers)
            .field("layer_depths", &self.layer_depths)
            .field("transitions", &self.transitions.borrow().len())
            .finish()
    }
}

/// Layer/tile property as a layer name.
fn property_name(value: &Value, what: &str) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(GridError::InvalidMap(format!(
            "{what} must be a string, got {other}"
        ))),
    }
}

impl GridTilemap {
    /// Interpret a tilemap.
    pub fn new(tilemap: Box<dyn Tilemap>, config: GridConfig) -> Result<Self> {
        let props = config.properties.clone();

        // ---------------------------------------------------------------------
        // Character layers and transitions
        // ---------------------------------------------------------------------
        let mut char_layers = Vec::new();
        let mut collision_layers: HashMap<Option<CharLayer>, Vec<usize>> = HashMap::new();
        let mut transitions = Transitions::new();
        let mut pending = Vec::new();

        for layer in 0..tilemap.layer_count() {
            if let Some(from) = tilemap.layer_property(layer, &props.transition_from) {
                let from = property_name(from, &props.transition_from)?;
                for y in 0..tilemap.height() as i32 {
                    for x in 0..tilemap.width() as i32 {
                        if let Some(to) = tilemap.tile_property(layer, x, y, &props.transition_to) {
                            let to = property_name(to, &props.transition_to)?;
                            transitions.insert((TilePos::new(x, y), from.clone()), to);
                        }
                    }
                }
                continue;
            }

            pending.push(layer);
            if let Some(name) = tilemap.layer_property(layer, &props.char_layer) {
                let name = property_name(name, &props.char_layer)?;
                if !char_layers.contains(&name) {
                    char_layers.push(name.clone());
                }
                collision_layers
                    .entry(Some(name))
                    .or_default()
                    .append(&mut pending);
            }
        }
        collision_layers.insert(None, pending);

        // ---------------------------------------------------------------------
        // Depths
        // ---------------------------------------------------------------------
        let mut layer_depths = Vec::new();
        let mut height_shift_slices = Vec::new();
        let mut char_layer_depths = HashMap::new();
        let mut always_top = Vec::new();
        let mut offset = -1.0;

        for layer in 0..tilemap.layer_count() {
            let name = tilemap.layer_name(layer).to_string();
            if tilemap
                .layer_property(layer, &props.always_top)
                .is_some_and(is_truthy)
            {
                always_top.push(name);
                continue;
            }

            if let Some(shift) = tilemap.layer_property(layer, &props.height_shift) {
                let shift = shift.as_i64().ok_or_else(|| {
                    GridError::InvalidMap(format!(
                        "{} on layer '{}' must be an integer, got {}",
                        props.height_shift, name, shift
                    ))
                })?;
                let scaled_tile_height = tilemap.tile_height() * tilemap.layer_scale(layer);
                for row in 0..tilemap.height() {
                    let shifted = (f64::from(row) + shift as f64) * scaled_tile_height + 1.0;
                    height_shift_slices.push(LayerSlice {
                        name: format!("{name}#{row}"),
                        source_layer: name.clone(),
                        row,
                        depth: offset + shift_pad(shifted, DEPTH_PAD_DIGITS),
                    });
                }
            } else {
                offset += 1.0;
                layer_depths.push(LayerDepth {
                    name: name.clone(),
                    depth: offset,
                });
            }

            if let Some(char_layer) = tilemap.layer_property(layer, &props.char_layer) {
                char_layer_depths.insert(property_name(char_layer, &props.char_layer)?, offset);
            }
        }

        let default_depth = offset;
        for (index, name) in always_top.into_iter().enumerate() {
            layer_depths.push(LayerDepth {
                name,
                depth: offset + 1.0 + index as f64,
            });
        }

        if char_layers.is_empty() && tilemap.layer_count() > 0 {
            warn!("map declares no character layers, all layers collide on the default layer");
        }
        debug!(
            layers = tilemap.layer_count(),
            char_layers = char_layers.len(),
            transitions = transitions.len(),
            isometric = tilemap.orientation() == Orientation::Isometric,
            "grid tilemap created"
        );

        Ok(Self {
            block_cache: CharBlockCache::new(config.character_collision_strategy),
            tilemap,
            config,
            char_layers,
            collision_layers,
            layer_depths,
            height_shift_slices,
            char_layer_depths,
            default_depth,
            transitions: RefCell::new(transitions),
        })
    }

    /// Configuration this map was built with.
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// The occupancy index.
    pub fn block_cache(&self) -> &CharBlockCache {
        &self.block_cache
    }

    // =========================================================================
    // CHARACTERS
    // =========================================================================

    /// Register a character with the block cache.
    ///
    /// A character without a layer is first moved onto the lowest
    /// character layer.
    pub fn add_character(&self, character: &mut GridCharacter) -> Result<()> {
        if self.block_cache.is_registered(character.id()) {
            return Err(GridError::AlreadyRegistered(character.id().to_string()));
        }
        let pos = character.tile_pos();
        if pos.layer.is_none() {
            if let Some(lowest) = self.lowest_char_layer() {
                character.set_tile_position(pos.with_layer(Some(lowest.to_string())));
            }
        }
        self.block_cache.add_character(character)
    }

    /// Unregister a character.
    pub fn remove_character(&self, character: &mut GridCharacter) -> Result<()> {
        self.block_cache.remove_character(character)
    }

    /// Whether a colliding character (not in `exclude`) blocks a tile.
    pub fn has_blocking_char(
        &self,
        pos: &LayerPosition,
        groups: Option<&BTreeSet<String>>,
        exclude: &[&str],
    ) -> bool {
        self.block_cache.is_char_blocking_at(pos, groups, exclude)
    }

    /// Ids of the characters occupying a tile.
    pub fn characters_at(&self, pos: &LayerPosition) -> Vec<CharId> {
        self.block_cache.characters_at(pos)
    }

    // =========================================================================
    // LAYERS
    // =========================================================================

    /// Declared character layers, bottom first.
    pub fn char_layers(&self) -> &[CharLayer] {
        &self.char_layers
    }

    /// First declared character layer.
    pub fn lowest_char_layer(&self) -> Option<&str> {
        self.char_layers.first().map(String::as_str)
    }

    /// Depth characters on a layer are drawn at.
    ///
    /// `None` (and undeclared layers) use the highest regular layer depth.
    pub fn char_layer_depth(&self, layer: Option<&str>) -> f64 {
        layer
            .and_then(|l| self.char_layer_depths.get(l))
            .copied()
            .unwrap_or(self.default_depth)
    }

    /// Depth of a raw layer. Height-shift layers have none, see
    /// [`GridTilemap::height_shift_slices`].
    pub fn layer_depth(&self, name: &str) -> Option<f64> {
        self.layer_depths
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.depth)
    }

    /// Depths of all raw layers.
    pub fn layer_depths(&self) -> &[LayerDepth] {
        &self.layer_depths
    }

    /// Row slices of the height-shift layers.
    pub fn height_shift_slices(&self) -> &[LayerSlice] {
        &self.height_shift_slices
    }

    fn collision_layers(&self, layer: Option<&str>) -> &[usize] {
        self.collision_layers
            .get(&layer.map(str::to_string))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    // =========================================================================
    // TILE COLLISION
    // =========================================================================

    /// Whether no raw layer of the position's character layer has a tile there.
    pub fn has_no_tile(&self, pos: &LayerPosition) -> bool {
        let TilePos { x, y } = pos.position;
        !self
            .collision_layers(pos.layer())
            .iter()
            .any(|&layer| self.tilemap.has_tile(layer, x, y))
    }

    /// Whether a tile blocks entry. Missing tiles block.
    ///
    /// `direction` names the tile edge to test for one-way collision;
    /// `Direction::None` checks only the generic collision property.
    pub fn has_blocking_tile(&self, pos: &LayerPosition, direction: Direction) -> bool {
        self.has_blocking_tile_or(pos, direction, true)
    }

    /// Like [`GridTilemap::has_blocking_tile`] with an explicit answer for
    /// positions without any tile.
    pub fn has_blocking_tile_or(
        &self,
        pos: &LayerPosition,
        direction: Direction,
        missing_tile_is_blocking: bool,
    ) -> bool {
        if self.has_no_tile(pos) {
            return missing_tile_is_blocking;
        }

        let props = &self.config.properties;
        let directional = props.directional(direction);
        let TilePos { x, y } = pos.position;
        let flag = |layer: usize, name: &str| {
            self.tilemap
                .tile_property(layer, x, y, name)
                .is_some_and(is_truthy)
        };

        self.collision_layers(pos.layer())
            .iter()
            .filter(|&&layer| self.tilemap.has_tile(layer, x, y))
            .any(|&layer| {
                flag(layer, &props.collision) || directional.is_some_and(|key| flag(layer, key))
            })
    }

    // =========================================================================
    // TRANSITIONS
    // =========================================================================

    /// Register a layer transition.
    pub fn set_transition(&self, pos: TilePos, from: &str, to: &str) {
        self.transitions
            .borrow_mut()
            .insert((pos, from.to_string()), to.to_string());
    }

    /// Target layer when stepping onto `pos` from `from`.
    pub fn get_transition(&self, pos: TilePos, from: &str) -> Option<CharLayer> {
        self.transitions
            .borrow()
            .get(&(pos, from.to_string()))
            .cloned()
    }

    /// All registered transitions.
    pub fn transitions(&self) -> Transitions {
        self.transitions.borrow().clone()
    }

    /// Neighbouring layered tile in a map direction, transition applied.
    pub fn get_tile_pos_in_direction(&self, pos: &LayerPosition, direction: Direction) -> LayerPosition {
        let position = pos.position.step(direction);
        let layer = match pos.layer() {
            Some(from) => self.get_transition(position, from).or_else(|| pos.layer.clone()),
            None => None,
        };
        LayerPosition { position, layer }
    }

    // =========================================================================
    // GEOMETRY
    // =========================================================================

    /// Map width in tiles.
    pub fn width(&self) -> u32 {
        self.tilemap.width()
    }

    /// Map height in tiles.
    pub fn height(&self) -> u32 {
        self.tilemap.height()
    }

    fn scale(&self) -> f64 {
        if self.tilemap.layer_count() == 0 {
            1.0
        } else {
            self.tilemap.layer_scale(0)
        }
    }

    /// Scaled tile width.
    pub fn tile_width(&self) -> f64 {
        self.tilemap.tile_width() * self.scale()
    }

    /// Scaled tile height.
    pub fn tile_height(&self) -> f64 {
        self.tilemap.tile_height() * self.scale()
    }

    /// Scaled tile size.
    pub fn tile_size(&self) -> Vec2 {
        Vec2::new(self.tile_width(), self.tile_height())
    }

    /// Whether the map is isometric.
    pub fn is_isometric(&self) -> bool {
        self.tilemap.orientation() == Orientation::Isometric
    }

    /// Pixel position of a tile's origin.
    pub fn tile_pos_to_pixel_pos(&self, pos: TilePos) -> Vec2 {
        if self.is_isometric() {
            isometric_to_pixel(pos.to_vec2(), self.tile_size())
        } else {
            pos.to_vec2().mul(self.tile_size())
        }
    }

    /// Tile containing a pixel position.
    ///
    /// Tile origins map back onto their own tile even when the scaled tile
    /// size is not exactly representable.
    pub fn pixel_pos_to_tile_pos(&self, pixel: Vec2) -> TilePos {
        let tile = if self.is_isometric() {
            isometric_from_pixel(pixel, self.tile_size())
        } else {
            Vec2::new(pixel.x / self.tile_width(), pixel.y / self.tile_height())
        };
        TilePos::new(floor_tile(tile.x), floor_tile(tile.y))
    }

    /// Pixels walked per axis for one tile step in a screen direction.
    ///
    /// Screen diagonals on isometric maps walk a single map axis and cover
    /// half a tile.
    pub fn tile_distance(&self, direction: Direction) -> Vec2 {
        if self.is_isometric() && direction.is_diagonal() {
            self.tile_size().scale(0.5)
        } else {
            self.tile_size()
        }
    }

    /// Screen direction to map direction.
    pub fn to_map_direction(&self, direction: Direction) -> Direction {
        if self.is_isometric() {
            direction.to_isometric_map()
        } else {
            direction
        }
    }

    /// Map direction to screen direction.
    pub fn from_map_direction(&self, direction: Direction) -> Direction {
        if self.is_isometric() {
            direction.from_isometric_map()
        } else {
            direction
        }
    }

    /// Whether a tile lies inside the map.
    pub fn is_in_range(&self, pos: TilePos) -> bool {
        pos.x >= 0
            && pos.y >= 0
            && (pos.x as u32) < self.tilemap.width()
            && (pos.y as u32) < self.tilemap.height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use crate::grid::tilemap::{TileData, TileLayerData, TilemapData};

    fn build(map: TilemapData) -> GridTilemap {
        GridTilemap::new(Box::new(map), GridConfig::default()).unwrap()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    /// `layer1` always-top, `layer2` declares `charLayer1`, `layer3` plain,
    /// `layer4` declares `charLayer2`.
    fn char_layer_map() -> TilemapData {
        TilemapData::new(10, 10, 16.0, 16.0)
            .with_layer(TileLayerData::filled("layer1", 10, 10).with_property("ge_alwaysTop", true))
            .with_layer(TileLayerData::filled("layer2", 10, 10).with_property("ge_charLayer", "charLayer1"))
            .with_layer(TileLayerData::filled("layer3", 10, 10))
            .with_layer(TileLayerData::filled("layer4", 10, 10).with_property("ge_charLayer", "charLayer2"))
    }

    #[test]
    fn test_layer_depths() {
        let tilemap = build(
            TilemapData::new(4, 4, 16.0, 16.0)
                .with_layer(TileLayerData::filled("layer1", 4, 4))
                .with_layer(TileLayerData::filled("layer2", 4, 4)),
        );
        assert_eq!(tilemap.layer_depth("layer1"), Some(0.0));
        assert_eq!(tilemap.layer_depth("layer2"), Some(1.0));
    }

    #[test]
    fn test_always_top_layers_come_last() {
        let tilemap = build(
            TilemapData::new(4, 4, 16.0, 16.0)
                .with_layer(TileLayerData::filled("layer1", 4, 4))
                .with_layer(TileLayerData::filled("layer2", 4, 4).with_property("ge_alwaysTop", true))
                .with_layer(TileLayerData::filled("layer3", 4, 4)),
        );
        assert_eq!(tilemap.layer_depth("layer1"), Some(0.0));
        assert_eq!(tilemap.layer_depth("layer2"), Some(2.0));
        assert_eq!(tilemap.layer_depth("layer3"), Some(1.0));
        assert_eq!(tilemap.char_layer_depth(None), 1.0);
    }

    #[test]
    fn test_char_layer_depths() {
        let tilemap = build(char_layer_map());
        assert_eq!(tilemap.layer_depth("layer1"), Some(3.0));
        assert_eq!(tilemap.layer_depth("layer2"), Some(0.0));
        assert_eq!(tilemap.layer_depth("layer3"), Some(1.0));
        assert_eq!(tilemap.layer_depth("layer4"), Some(2.0));
        assert_eq!(tilemap.char_layer_depth(Some("charLayer1")), 0.0);
        assert_eq!(tilemap.char_layer_depth(Some("charLayer2")), 2.0);
        assert_eq!(tilemap.char_layers(), ["charLayer1", "charLayer2"]);
        assert_eq!(tilemap.lowest_char_layer(), Some("charLayer1"));
    }

    #[test]
    fn test_height_shift_slices() {
        let tilemap = build(
            TilemapData::new(2, 2, 16.0, 16.0)
                .with_layer(TileLayerData::filled("layer1", 2, 2).with_scale(3.0))
                .with_layer(
                    TileLayerData::filled("layer2", 2, 2)
                        .with_scale(3.0)
                        .with_property("ge_heightShift", 1),
                ),
        );

        assert_eq!(tilemap.layer_depth("layer1"), Some(0.0));
        assert_eq!(tilemap.layer_depth("layer2"), None);

        let slices = tilemap.height_shift_slices();
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].name, "layer2#0");
        assert_eq!(slices[1].name, "layer2#1");
        assert!(approx(slices[0].depth, 0.0000049));
        assert!(approx(slices[1].depth, 0.0000097));
    }

    #[test]
    fn test_non_integer_height_shift_is_invalid() {
        let map = TilemapData::new(2, 2, 16.0, 16.0)
            .with_layer(TileLayerData::filled("layer1", 2, 2).with_property("ge_heightShift", "tall"));
        let err = GridTilemap::new(Box::new(map), GridConfig::default()).unwrap_err();
        assert!(matches!(err, GridError::InvalidMap(_)));
    }

    #[test]
    fn test_blocking_tile_first_hit_wins() {
        let mut map = TilemapData::new(10, 10, 16.0, 16.0)
            .with_layer(TileLayerData::filled("layer1", 10, 10))
            .with_layer(TileLayerData::filled("layer2", 10, 10));
        map.set_tile(0, 3, 4, Some(TileData::new().with("ge_collide", true)));
        map.set_tile(1, 5, 5, Some(TileData::new().with("ge_collide", true)));
        let tilemap = build(map);

        assert!(tilemap.has_blocking_tile(&LayerPosition::unlayered(3, 4), Direction::None));
        assert!(tilemap.has_blocking_tile(&LayerPosition::unlayered(5, 5), Direction::None));
        assert!(!tilemap.has_blocking_tile(&LayerPosition::unlayered(1, 1), Direction::None));
    }

    #[test]
    fn test_missing_tiles() {
        let tilemap = build(
            TilemapData::new(4, 4, 16.0, 16.0).with_layer(TileLayerData::empty("layer1", 4, 4)),
        );
        let pos = LayerPosition::unlayered(3, 3);

        assert!(tilemap.has_no_tile(&pos));
        assert!(tilemap.has_blocking_tile(&pos, Direction::None));
        assert!(!tilemap.has_blocking_tile_or(&pos, Direction::None, false));
        // Outside the map counts as missing.
        assert!(tilemap.has_blocking_tile(&LayerPosition::unlayered(-1, 0), Direction::Up));
    }

    #[test]
    fn test_custom_collision_property() {
        let mut map = TilemapData::new(4, 4, 16.0, 16.0).with_layer(TileLayerData::filled("layer1", 4, 4));
        map.set_tile(0, 3, 3, Some(TileData::new().with("custom_collides_prop", true)));
        let config = GridConfig::default().with_collision_property("custom_collides_prop");
        let tilemap = GridTilemap::new(Box::new(map), config).unwrap();

        assert!(tilemap.has_blocking_tile(&LayerPosition::unlayered(3, 3), Direction::None));
    }

    #[test]
    fn test_one_way_tiles() {
        let cases = [
            ("ge_collide_left", Direction::Left),
            ("ge_collide_right", Direction::Right),
            ("ge_collide_up", Direction::Up),
            ("ge_collide_down", Direction::Down),
        ];

        for (key, blocked) in cases {
            let mut map = TilemapData::new(5, 5, 16.0, 16.0).with_layer(TileLayerData::filled("layer1", 5, 5));
            map.set_tile(0, 3, 4, Some(TileData::new().with(key, true)));
            let tilemap = build(map);
            let pos = LayerPosition::unlayered(3, 4);

            for dir in Direction::CARDINAL {
                assert_eq!(tilemap.has_blocking_tile(&pos, dir), dir == blocked, "{key} / {dir}");
            }
            assert!(!tilemap.has_blocking_tile(&pos, Direction::None));
        }
    }

    #[test]
    fn test_only_tiles_on_char_layer_collide() {
        let mut map = char_layer_map()
            .with_layer(TileLayerData::empty("transitions", 10, 10).with_property("ge_layerTransitionFrom", "charLayer1"));
        for layer in 1..4 {
            map.set_tile(layer, 3, 4, Some(TileData::new().with("ge_collide", false)));
        }
        map.set_tile(0, 3, 4, Some(TileData::new().with("ge_collide", true)));
        let tilemap = build(map);

        assert!(tilemap.has_blocking_tile(&LayerPosition::new(3, 4, Some("charLayer1")), Direction::None));
        assert!(!tilemap.has_blocking_tile(&LayerPosition::new(3, 4, Some("charLayer2")), Direction::None));
    }

    #[test]
    fn test_has_no_tile_on_char_layer() {
        let mut map = TilemapData::new(5, 5, 16.0, 16.0)
            .with_layer(TileLayerData::empty("layer1", 5, 5))
            .with_layer(TileLayerData::empty("layer2", 5, 5).with_property("ge_charLayer", "charLayer1"))
            .with_layer(TileLayerData::filled("layer3", 5, 5))
            .with_layer(TileLayerData::empty("layer4", 5, 5).with_property("ge_charLayer", "charLayer2"));
        let tilemap = build(map.clone());
        assert!(tilemap.has_no_tile(&LayerPosition::new(3, 4, Some("charLayer1"))));
        assert!(!tilemap.has_no_tile(&LayerPosition::new(3, 4, Some("charLayer2"))));

        map.set_tile(1, 3, 4, Some(TileData::new()));
        let tilemap = build(map);
        assert!(!tilemap.has_no_tile(&LayerPosition::new(3, 4, Some("charLayer1"))));
    }

    #[test]
    fn test_layers_above_last_char_layer_belong_to_none() {
        let mut map = TilemapData::new(5, 5, 16.0, 16.0)
            .with_layer(TileLayerData::filled("ground", 5, 5).with_property("ge_charLayer", "ground"))
            .with_layer(TileLayerData::empty("roof", 5, 5));
        map.set_tile(1, 2, 2, Some(TileData::new().with("ge_collide", true)));
        let tilemap = build(map);

        assert!(!tilemap.has_blocking_tile(&LayerPosition::new(2, 2, Some("ground")), Direction::None));
        assert!(tilemap.has_blocking_tile(&LayerPosition::unlayered(2, 2), Direction::None));
        assert!(tilemap.has_no_tile(&LayerPosition::unlayered(1, 1)));
    }

    #[test]
    fn test_transitions() {
        let tilemap = build(char_layer_map());
        tilemap.set_transition(TilePos::new(4, 5), "charLayer2", "charLayer1");
        tilemap.set_transition(TilePos::new(3, 5), "charLayer2", "charLayer1");

        assert_eq!(tilemap.get_transition(TilePos::new(4, 5), "charLayer2").as_deref(), Some("charLayer1"));
        assert_eq!(tilemap.get_transition(TilePos::new(3, 5), "charLayer2").as_deref(), Some("charLayer1"));
        assert_eq!(tilemap.get_transition(TilePos::new(7, 5), "charLayer2"), None);
        assert_eq!(tilemap.get_transition(TilePos::new(4, 5), "charLayer1"), None);
        assert_eq!(tilemap.transitions().len(), 2);
    }

    #[test]
    fn test_transitions_from_map_layer() {
        let mut map = char_layer_map()
            .with_layer(TileLayerData::empty("transitions", 10, 10).with_property("ge_layerTransitionFrom", "charLayer1"));
        map.set_tile(4, 6, 5, Some(TileData::new().with("ge_layerTransitionTo", "charLayer2")));
        let tilemap = build(map);

        assert_eq!(tilemap.get_transition(TilePos::new(6, 5), "charLayer1").as_deref(), Some("charLayer2"));
        assert_eq!(tilemap.transitions().len(), 1);
    }

    #[test]
    fn test_tile_pos_in_direction() {
        let tilemap = build(char_layer_map());
        tilemap.set_transition(TilePos::new(6, 5), "charLayer1", "charLayer2");
        let pos = LayerPosition::new(5, 5, Some("charLayer1"));

        assert_eq!(tilemap.get_tile_pos_in_direction(&pos, Direction::Down), LayerPosition::new(5, 6, Some("charLayer1")));
        assert_eq!(tilemap.get_tile_pos_in_direction(&pos, Direction::UpLeft), LayerPosition::new(4, 4, Some("charLayer1")));
        assert_eq!(tilemap.get_tile_pos_in_direction(&pos, Direction::Right), LayerPosition::new(6, 5, Some("charLayer2")));
    }

    #[test]
    fn test_scaled_geometry() {
        let tilemap = build(
            TilemapData::new(20, 30, 16.0, 16.0).with_layer(TileLayerData::filled("layer1", 20, 30).with_scale(3.0)),
        );

        assert_eq!(tilemap.tile_width(), 48.0);
        assert_eq!(tilemap.tile_height(), 48.0);
        assert_eq!(tilemap.tile_size(), Vec2::new(48.0, 48.0));
        assert_eq!(tilemap.tile_pos_to_pixel_pos(TilePos::new(2, 3)), Vec2::new(96.0, 144.0));
        assert_eq!(tilemap.pixel_pos_to_tile_pos(Vec2::new(100.0, 150.0)), TilePos::new(2, 3));
        assert_eq!(tilemap.tile_distance(Direction::Down), Vec2::new(48.0, 48.0));
        assert_eq!(tilemap.to_map_direction(Direction::Down), Direction::Down);
        assert_eq!(tilemap.from_map_direction(Direction::Down), Direction::Down);
        assert!(!tilemap.is_isometric());
    }

    #[test]
    fn test_isometric_geometry() {
        let tilemap = build(
            TilemapData::new(20, 30, 16.0, 16.0)
                .with_orientation(Orientation::Isometric)
                .with_layer(TileLayerData::filled("layer1", 20, 30).with_scale(3.0)),
        );

        assert!(tilemap.is_isometric());
        assert_eq!(tilemap.tile_pos_to_pixel_pos(TilePos::new(2, 3)), Vec2::new(-24.0, 120.0));
        assert_eq!(tilemap.pixel_pos_to_tile_pos(Vec2::new(-24.0, 120.0)), TilePos::new(2, 3));
        assert_eq!(tilemap.tile_distance(Direction::Down), Vec2::new(48.0, 48.0));
        assert_eq!(tilemap.tile_distance(Direction::DownLeft), Vec2::new(24.0, 24.0));
        assert_eq!(tilemap.to_map_direction(Direction::Down), Direction::DownRight);
        assert_eq!(tilemap.from_map_direction(Direction::DownRight), Direction::Down);
    }

    #[test]
    fn test_pixel_round_trip_with_fractional_scale() {
        for orientation in [Orientation::Orthogonal, Orientation::Isometric] {
            let tilemap = build(
                TilemapData::new(20, 20, 32.0, 24.0)
                    .with_orientation(orientation)
                    .with_layer(TileLayerData::filled("layer1", 20, 20).with_scale(1.1)),
            );
            for y in 0..20 {
                for x in 0..20 {
                    let pos = TilePos::new(x, y);
                    let back = tilemap.pixel_pos_to_tile_pos(tilemap.tile_pos_to_pixel_pos(pos));
                    assert_eq!(back, pos, "{orientation:?}");
                }
            }
        }
    }

    proptest! {
        #[test]
        fn prop_pixel_round_trip(
            x in -200i32..200,
            y in -200i32..200,
            scale in 0.1f64..5.0,
            isometric in any::<bool>(),
        ) {
            let orientation = if isometric { Orientation::Isometric } else { Orientation::Orthogonal };
            let tilemap = build(
                TilemapData::new(4, 4, 32.0, 24.0)
                    .with_orientation(orientation)
                    .with_layer(TileLayerData::filled("layer1", 4, 4).with_scale(scale)),
            );
            let pos = TilePos::new(x, y);
            prop_assert_eq!(tilemap.pixel_pos_to_tile_pos(tilemap.tile_pos_to_pixel_pos(pos)), pos);
        }
    }

    #[test]
    fn test_is_in_range() {
        let tilemap = build(TilemapData::new(20, 30, 16.0, 16.0));
        assert!(tilemap.is_in_range(TilePos::new(0, 0)));
        assert!(tilemap.is_in_range(TilePos::new(19, 29)));
        assert!(!tilemap.is_in_range(TilePos::new(20, 29)));
        assert!(!tilemap.is_in_range(TilePos::new(-1, 3)));
    }

    #[test]
    fn test_invalid_char_layer_name() {
        let map = TilemapData::new(2, 2, 16.0, 16.0)
            .with_layer(TileLayerData::filled("layer1", 2, 2).with_property("ge_charLayer", 5));
        let err = GridTilemap::new(Box::new(map), GridConfig::default()).unwrap_err();
        assert!(matches!(err, GridError::InvalidMap(_)));
    }
}
