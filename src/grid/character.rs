//! Grid Character
//!
//! The per-character motion state machine. A directional impulse becomes
//! continuous sub-tile pixel motion plus discrete tile position changes.
//!
//! ```text
//!            move_in(d), not blocked
//!   ┌──────┐ ───────────────────────► ┌───────────┐
//!   │ Idle │                          │ Moving(d) │ ◄─┐ border crossed,
//!   └──────┘ ◄─────────────────────── └───────────┘ ──┘ impulse == d, free
//!            border crossed otherwise
//! ```
//!
//! While moving, `tile_pos` is the tile being left and `next_tile_pos` the
//! tile being entered. Both are occupied until the move finishes.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use serde::{Serialize, Deserialize};
use tracing::{debug, warn};
#[cfg(feature = "debug-tracing")]
use tracing::trace;

use crate::core::direction::Direction;
use crate::core::vec2::Vec2;
use crate::grid::animation::{CharacterAnimation, FrameState, WalkingAnimation};
use crate::grid::block_cache::CollisionProfile;
use crate::grid::error::{GridError, Result};
use crate::grid::events::CharacterEvents;
use crate::grid::grid_tilemap::{shift_pad, GridTilemap, DEPTH_PAD_DIGITS};
use crate::grid::position::{CharId, LayerPosition, PositionChange};

// =============================================================================
// RENDER SEAM
// =============================================================================

/// What the motion state machine needs from the host's visual.
pub trait CharacterBody {
    /// Top-left pixel position.
    fn position(&self) -> Vec2;

    /// Move to a pixel position.
    fn set_position(&mut self, position: Vec2);

    /// Set the draw depth.
    fn set_depth(&mut self, depth: f64);

    /// Unscaled width.
    fn width(&self) -> f64;

    /// Unscaled height.
    fn height(&self) -> f64;

    /// Render scale.
    fn scale(&self) -> f64 {
        1.0
    }
}

/// Plain-value body for hosts that read positions back instead of
/// receiving them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpriteBody {
    /// Top-left pixel position
    pub position: Vec2,
    /// Draw depth
    pub depth: f64,
    /// Unscaled width
    pub width: f64,
    /// Unscaled height
    pub height: f64,
    /// Render scale
    pub scale: f64,
}

impl SpriteBody {
    /// Body of the given sprite size at the origin.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            position: Vec2::ZERO,
            depth: 0.0,
            width,
            height,
            scale: 1.0,
        }
    }

    /// Builder-style scale setter.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }
}

impl Default for SpriteBody {
    fn default() -> Self {
        Self::new(16.0, 16.0)
    }
}

impl CharacterBody for SpriteBody {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    fn set_depth(&mut self, depth: f64) {
        self.depth = depth;
    }

    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn scale(&self) -> f64 {
        self.scale
    }
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Everything needed to create a character.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterConfig {
    /// Unique id
    pub id: CharId,
    /// Starting tile. Without a layer the lowest character layer is used.
    pub start: LayerPosition,
    /// Tiles per second
    pub speed: f64,
    /// Initial facing direction
    pub facing_direction: Direction,
    /// Collision groups. `None` uses the configured default group.
    pub collision_groups: Option<Vec<String>>,
    /// Whether tiles can block this character
    pub collides_with_tiles: bool,
    /// Extra pixel offset applied on top of the centring offset
    pub offset: Vec2,
    /// Default body
    pub sprite: SpriteBody,
    /// Frame source for the walk cycle
    pub walking_animation: Option<WalkingAnimation>,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            start: LayerPosition::default(),
            speed: 4.0,
            facing_direction: Direction::Down,
            collision_groups: None,
            collides_with_tiles: true,
            offset: Vec2::ZERO,
            sprite: SpriteBody::default(),
            walking_animation: None,
        }
    }
}

impl CharacterConfig {
    /// Defaults with the given id.
    pub fn new(id: impl Into<CharId>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Starting tile.
    pub fn at(mut self, start: LayerPosition) -> Self {
        self.start = start;
        self
    }

    /// Speed in tiles per second.
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    /// Initial facing direction.
    pub fn facing(mut self, direction: Direction) -> Self {
        self.facing_direction = direction;
        self
    }

    /// Collision groups.
    pub fn with_collision_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collision_groups = Some(groups.into_iter().map(Into::into).collect());
        self
    }

    /// Whether tiles block this character.
    pub fn with_tile_collision(mut self, collides: bool) -> Self {
        self.collides_with_tiles = collides;
        self
    }

    /// Extra pixel offset.
    pub fn with_offset(mut self, x: f64, y: f64) -> Self {
        self.offset = Vec2::new(x, y);
        self
    }

    /// Default body.
    pub fn with_sprite(mut self, sprite: SpriteBody) -> Self {
        self.sprite = sprite;
        self
    }

    /// Walk-cycle frames.
    pub fn with_walking_animation(mut self, animation: WalkingAnimation) -> Self {
        self.walking_animation = Some(animation);
        self
    }
}

// =============================================================================
// CHARACTER
// =============================================================================

/// A character moving tile by tile.
pub struct GridCharacter {
    id: CharId,
    tilemap: Rc<GridTilemap>,
    body: Box<dyn CharacterBody>,
    speed: f64,
    tile_pos: LayerPosition,
    next_tile_pos: LayerPosition,
    movement_direction: Direction,
    facing_direction: Direction,
    last_movement_impulse: Direction,
    tile_pixels_walked: Vec2,
    collision: Rc<RefCell<CollisionProfile>>,
    collides_with_tiles: bool,
    custom_offset: Vec2,
    depth: f64,
    animation: CharacterAnimation,
    events: CharacterEvents,
}

impl fmt::Debug for GridCharacter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridCharacter")
            .field("id", &self.id)
            .field("tile_pos", &self.tile_pos)
            .field("next_tile_pos", &self.next_tile_pos)
            .field("movement_direction", &self.movement_direction)
            .field("facing_direction", &self.facing_direction)
            .field("position", &self.body.position())
            .finish()
    }
}

impl Drop for GridCharacter {
    fn drop(&mut self) {
        let tilemap = Rc::clone(&self.tilemap);
        let cache = tilemap.block_cache();
        if cache.is_tracking(&self.id, &self.collision) && cache.remove_character(self).is_ok() {
            warn!(char_id = %self.id, "character dropped while registered, tiles released");
        }
    }
}

impl GridCharacter {
    /// Create a character using the config's [`SpriteBody`].
    pub fn new(tilemap: Rc<GridTilemap>, config: CharacterConfig) -> Self {
        let body = Box::new(config.sprite.clone());
        Self::with_body(tilemap, config, body)
    }

    /// Create a character driving a host-provided body.
    ///
    /// The body is snapped onto the starting tile.
    pub fn with_body(
        tilemap: Rc<GridTilemap>,
        config: CharacterConfig,
        body: Box<dyn CharacterBody>,
    ) -> Self {
        let groups = config
            .collision_groups
            .unwrap_or_else(|| vec![tilemap.config().default_collision_group.clone()]);

        let mut character = Self {
            id: config.id,
            body,
            speed: config.speed,
            tile_pos: config.start.clone(),
            next_tile_pos: config.start,
            movement_direction: Direction::None,
            facing_direction: config.facing_direction,
            last_movement_impulse: Direction::None,
            tile_pixels_walked: Vec2::ZERO,
            collision: Rc::new(RefCell::new(CollisionProfile::new(groups))),
            collides_with_tiles: config.collides_with_tiles,
            custom_offset: config.offset,
            depth: 0.0,
            animation: CharacterAnimation::new(
                config.walking_animation.as_ref(),
                config.facing_direction,
            ),
            events: CharacterEvents::default(),
            tilemap,
        };
        character.snap_to_tile();
        character
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Character id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Speed in tiles per second.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Change the speed. Takes effect on the next update.
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
    }

    /// Current tile; the tile being left while moving.
    pub fn tile_pos(&self) -> LayerPosition {
        self.tile_pos.clone()
    }

    /// Destination tile while moving, else the current tile.
    pub fn next_tile_pos(&self) -> LayerPosition {
        self.next_tile_pos.clone()
    }

    /// Direction of the current move, `None` when idle.
    pub fn movement_direction(&self) -> Direction {
        self.movement_direction
    }

    /// Direction the character looks at.
    pub fn facing_direction(&self) -> Direction {
        self.facing_direction
    }

    /// Whether a move is in progress.
    pub fn is_moving(&self) -> bool {
        self.movement_direction != Direction::None
    }

    /// Collision groups.
    pub fn collision_groups(&self) -> BTreeSet<String> {
        self.collision.borrow().groups.clone()
    }

    /// Replace the collision groups. An empty set disables collisions.
    pub fn set_collision_groups<I, S>(&mut self, groups: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collision.borrow_mut().groups = groups.into_iter().map(Into::into).collect();
    }

    /// Whether this character can block others.
    pub fn is_colliding(&self) -> bool {
        self.collision.borrow().is_colliding()
    }

    /// Whether tiles can block this character.
    pub fn collides_with_tiles(&self) -> bool {
        self.collides_with_tiles
    }

    /// Shared collision profile, read by the block cache.
    pub(crate) fn collision_profile(&self) -> Rc<RefCell<CollisionProfile>> {
        Rc::clone(&self.collision)
    }

    /// Pixel position of the body.
    pub fn pixel_position(&self) -> Vec2 {
        self.body.position()
    }

    /// Last depth given to the body.
    pub fn depth(&self) -> f64 {
        self.depth
    }

    /// The body.
    pub fn body(&self) -> &dyn CharacterBody {
        self.body.as_ref()
    }

    /// Logical animation frame.
    pub fn frame_state(&self) -> FrameState {
        self.animation.frame_state()
    }

    /// Sheet frame, if a walking animation is configured.
    pub fn frame(&self) -> Option<u32> {
        self.animation.frame()
    }

    /// Replace the walking animation frames.
    pub fn set_walking_animation(&mut self, animation: Option<WalkingAnimation>) {
        self.animation.set_walking_animation(animation.as_ref());
    }

    /// Event streams.
    pub fn events_mut(&mut self) -> &mut CharacterEvents {
        &mut self.events
    }

    // =========================================================================
    // COMMANDS
    // =========================================================================

    /// Request a move. The impulse is latched for the current frame.
    ///
    /// Directions the world does not allow are rejected, moving or not.
    /// Otherwise ignored for `Direction::None` and while moving. A blocked
    /// direction only turns the character.
    pub fn move_in(&mut self, direction: Direction) -> Result<()> {
        let allowed = self.tilemap.config().number_of_directions;
        let map_direction = self.tilemap.to_map_direction(direction);
        if !allowed.allows(map_direction) {
            return Err(GridError::UnsupportedDirection { direction, allowed });
        }

        self.last_movement_impulse = direction;
        if direction == Direction::None || self.is_moving() {
            return Ok(());
        }

        if self.is_blocking_direction(direction) {
            debug!(char_id = %self.id, %direction, tile = %self.tile_pos, "move blocked");
            self.facing_direction = direction;
            self.animation.set_standing(direction);
            self.events.direction_changed.emit(&direction);
        } else {
            self.start_moving(direction);
        }
        Ok(())
    }

    /// Advance by `delta_ms` milliseconds.
    pub fn update(&mut self, delta_ms: f64) {
        if self.is_moving() {
            self.update_character_position(delta_ms);
        }
        self.last_movement_impulse = Direction::None;
    }

    /// Face a direction without moving. Ignored while moving.
    pub fn turn_towards(&mut self, direction: Direction) {
        if self.is_moving() || direction == Direction::None {
            return;
        }
        self.facing_direction = direction;
        self.animation.set_standing(direction);
        self.events.direction_changed.emit(&direction);
    }

    /// Teleport onto a tile. Ignored while moving.
    pub fn set_tile_position(&mut self, pos: LayerPosition) {
        if self.is_moving() {
            return;
        }
        let change = PositionChange {
            exit_tile: self.tile_pos.clone(),
            enter_tile: pos.clone(),
        };
        self.events.tile_position_set.emit(&pos);
        self.events.position_change_started.emit(&change);
        self.events.position_change_finished.emit(&change);

        self.tile_pos = pos.clone();
        self.next_tile_pos = pos;
        self.tile_pixels_walked = Vec2::ZERO;
        self.snap_to_tile();
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Whether the character occupies a tile.
    pub fn is_blocking_tile(&self, pos: &LayerPosition) -> bool {
        self.tile_pos == *pos || self.next_tile_pos == *pos
    }

    /// Whether the tile after the destination in a direction is blocked,
    /// by another character sharing a collision group or by the map.
    pub fn is_blocking_direction(&self, direction: Direction) -> bool {
        if direction == Direction::None {
            return false;
        }
        let map_direction = self.tilemap.to_map_direction(direction);
        let dest = self
            .tilemap
            .get_tile_pos_in_direction(&self.next_tile_pos, map_direction);

        let blocked_by_char = {
            let profile = self.collision.borrow();
            self.tilemap
                .has_blocking_char(&dest, Some(&profile.groups), &[self.id.as_str()])
        };

        blocked_by_char
            || (self.collides_with_tiles
                && self
                    .tilemap
                    .has_blocking_tile(&dest, map_direction.opposite()))
    }

    // =========================================================================
    // MOTION
    // =========================================================================

    fn start_moving(&mut self, direction: Direction) {
        // The impulse that starts a step does not ask for the next one.
        self.last_movement_impulse = Direction::None;
        self.events.movement_started.emit(&direction);
        self.movement_direction = direction;
        self.facing_direction = direction;

        let map_direction = self.tilemap.to_map_direction(direction);
        self.next_tile_pos = self
            .tilemap
            .get_tile_pos_in_direction(&self.tile_pos, map_direction);
        self.events.position_change_started.emit(&PositionChange {
            exit_tile: self.tile_pos.clone(),
            enter_tile: self.next_tile_pos.clone(),
        });
    }

    fn update_character_position(&mut self, delta_ms: f64) {
        let direction = self.movement_direction;
        let tile_distance = self.tilemap.tile_distance(direction);
        let unit = direction.vector();
        let pixels = tile_distance
            .mul(unit)
            .scale(self.speed * delta_ms / 1000.0);

        #[cfg(feature = "debug-tracing")]
        trace!(char_id = %self.id, %direction, delta_ms, ?pixels, walked = ?self.tile_pixels_walked, "update");

        if !self.will_cross_tile_border(pixels, tile_distance, unit) {
            self.move_sprite(pixels, tile_distance);
        } else if self.should_continue_moving() {
            self.move_sprite(pixels, tile_distance);
            self.tile_pixels_walked = Vec2::new(
                self.tile_pixels_walked.x % tile_distance.x,
                self.tile_pixels_walked.y % tile_distance.y,
            );
            self.advance_tile();
        } else {
            let rest = tile_distance.sub(self.tile_pixels_walked).mul(unit);
            self.move_sprite(rest, tile_distance);
            self.tile_pixels_walked = Vec2::ZERO;
            self.stop_moving();
        }
    }

    fn will_cross_tile_border(&self, pixels: Vec2, tile_distance: Vec2, unit: Vec2) -> bool {
        let walked = self.tile_pixels_walked;
        (unit.x != 0.0 && walked.x + pixels.x.abs() >= tile_distance.x)
            || (unit.y != 0.0 && walked.y + pixels.y.abs() >= tile_distance.y)
    }

    fn should_continue_moving(&self) -> bool {
        self.last_movement_impulse == self.movement_direction
            && !self.is_blocking_direction(self.last_movement_impulse)
    }

    fn advance_tile(&mut self) {
        let map_direction = self.tilemap.to_map_direction(self.movement_direction);
        let previous = std::mem::replace(&mut self.tile_pos, self.next_tile_pos.clone());
        self.next_tile_pos = self
            .tilemap
            .get_tile_pos_in_direction(&self.tile_pos, map_direction);

        // Claim the new tile before releasing the old one.
        self.events.position_change_started.emit(&PositionChange {
            exit_tile: self.tile_pos.clone(),
            enter_tile: self.next_tile_pos.clone(),
        });
        self.events.position_change_finished.emit(&PositionChange {
            exit_tile: previous,
            enter_tile: self.tile_pos.clone(),
        });
    }

    fn stop_moving(&mut self) {
        let direction = self.movement_direction;
        self.events.movement_stopped.emit(&direction);
        self.movement_direction = Direction::None;
        self.animation.set_standing(direction);

        self.events.position_change_finished.emit(&PositionChange {
            exit_tile: self.tile_pos.clone(),
            enter_tile: self.next_tile_pos.clone(),
        });
        self.tile_pos = self.next_tile_pos.clone();
    }

    fn move_sprite(&mut self, pixels: Vec2, tile_distance: Vec2) {
        let position = self.body.position() + pixels;
        self.body.set_position(position);
        self.tile_pixels_walked = self.tile_pixels_walked + pixels.abs();

        let walked = self.tile_pixels_walked;
        let half = tile_distance.scale(0.5);
        self.animation
            .update_walking(self.movement_direction, walked.x > half.x || walked.y > half.y);
        self.update_depth();
    }

    // =========================================================================
    // PLACEMENT
    // =========================================================================

    /// Centring offset of the body inside a tile.
    fn offset(&self) -> Vec2 {
        let scale = self.body.scale();
        Vec2::new(
            self.tilemap.tile_width() / 2.0 - (self.body.width() * scale / 2.0).floor(),
            self.tilemap.tile_height() - self.body.height() * scale,
        )
    }

    fn snap_to_tile(&mut self) {
        let position = self.tilemap.tile_pos_to_pixel_pos(self.tile_pos.position)
            + self.offset()
            + self.custom_offset;
        self.body.set_position(position);
        self.update_depth();
    }

    fn update_depth(&mut self) {
        let bottom = self.body.position().y + self.body.height() * self.body.scale();
        self.depth = self.tilemap.char_layer_depth(self.next_tile_pos.layer())
            + shift_pad(bottom, DEPTH_PAD_DIGITS);
        self.body.set_depth(self.depth);
    }
}
