//! Grid World
//!
//! Owns the collision model and every character, and drives them once per
//! frame. Characters are updated in ascending id order so that the same
//! inputs always produce the same occupancy.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use serde::{Serialize, Deserialize};
use tracing::info;

use crate::core::direction::Direction;
use crate::grid::character::{CharacterBody, CharacterConfig, GridCharacter};
use crate::grid::config::GridConfig;
use crate::grid::error::{GridError, Result};
use crate::grid::events::{AllSubscriptions, CharacterEvent};
use crate::grid::grid_tilemap::GridTilemap;
use crate::grid::position::{CharId, CharLayer, LayerPosition, TilePos};
use crate::grid::tilemap::Tilemap;

/// A character event tagged with its source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldEvent {
    /// Character that emitted the event
    pub char_id: CharId,
    /// The event
    pub event: CharacterEvent,
}

/// Result of a world update.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events emitted since the previous update, in emission order
    pub events: Vec<WorldEvent>,
}

/// Characters on a grid.
pub struct GridWorld {
    tilemap: Rc<GridTilemap>,
    characters: BTreeMap<CharId, GridCharacter>,
    recorders: HashMap<CharId, AllSubscriptions>,
    pending_events: Rc<RefCell<Vec<WorldEvent>>>,
}

impl std::fmt::Debug for GridWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridWorld")
            .field("tilemap", &self.tilemap)
            .field("characters", &self.characters.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Drop for GridWorld {
    fn drop(&mut self) {
        for (_, mut character) in std::mem::take(&mut self.characters) {
            let _ = self.tilemap.remove_character(&mut character);
        }
    }
}

impl GridWorld {
    /// Create a world over a map.
    pub fn new<T: Tilemap + 'static>(tilemap: T, config: GridConfig) -> Result<Self> {
        let tilemap = GridTilemap::new(Box::new(tilemap), config)?;
        Ok(Self {
            tilemap: Rc::new(tilemap),
            characters: BTreeMap::new(),
            recorders: HashMap::new(),
            pending_events: Rc::new(RefCell::new(Vec::new())),
        })
    }

    /// The collision model.
    pub fn tilemap(&self) -> &GridTilemap {
        &self.tilemap
    }

    /// Add a character with the config's sprite body.
    pub fn add_character(&mut self, config: CharacterConfig) -> Result<()> {
        if self.characters.contains_key(&config.id) {
            return Err(GridError::AlreadyRegistered(config.id));
        }
        let character = GridCharacter::new(Rc::clone(&self.tilemap), config);
        self.register(character)
    }

    /// Add a character driving a host-provided body.
    pub fn add_character_with_body(
        &mut self,
        config: CharacterConfig,
        body: Box<dyn CharacterBody>,
    ) -> Result<()> {
        if self.characters.contains_key(&config.id) {
            return Err(GridError::AlreadyRegistered(config.id));
        }
        let character = GridCharacter::with_body(Rc::clone(&self.tilemap), config, body);
        self.register(character)
    }

    fn register(&mut self, mut character: GridCharacter) -> Result<()> {
        self.tilemap.add_character(&mut character)?;

        let id = character.id().to_string();
        let sink = Rc::clone(&self.pending_events);
        let char_id = id.clone();
        let subs = character.events_mut().subscribe_all(move |event| {
            sink.borrow_mut().push(WorldEvent {
                char_id: char_id.clone(),
                event,
            });
        });

        info!(char_id = %id, tile = %character.tile_pos(), "character added");
        self.recorders.insert(id.clone(), subs);
        self.characters.insert(id, character);
        Ok(())
    }

    /// Remove a character and release its tiles.
    pub fn remove_character(&mut self, id: &str) -> Result<()> {
        let mut character = self
            .characters
            .remove(id)
            .ok_or_else(|| GridError::UnknownCharacter(id.to_string()))?;
        self.tilemap.remove_character(&mut character)?;
        if let Some(subs) = self.recorders.remove(id) {
            character.events_mut().unsubscribe_all(subs);
        }
        info!(char_id = %id, "character removed");
        Ok(())
    }

    /// Look up a character.
    pub fn character(&self, id: &str) -> Result<&GridCharacter> {
        self.characters
            .get(id)
            .ok_or_else(|| GridError::UnknownCharacter(id.to_string()))
    }

    /// Look up a character mutably.
    pub fn character_mut(&mut self, id: &str) -> Result<&mut GridCharacter> {
        self.characters
            .get_mut(id)
            .ok_or_else(|| GridError::UnknownCharacter(id.to_string()))
    }

    /// Ids of all characters, ascending.
    pub fn character_ids(&self) -> impl Iterator<Item = &str> {
        self.characters.keys().map(String::as_str)
    }

    /// Whether a character exists.
    pub fn has_character(&self, id: &str) -> bool {
        self.characters.contains_key(id)
    }

    /// Request a move.
    pub fn move_char(&mut self, id: &str, direction: Direction) -> Result<()> {
        self.character_mut(id)?.move_in(direction)
    }

    /// Turn a character without moving.
    pub fn turn_towards(&mut self, id: &str, direction: Direction) -> Result<()> {
        self.character_mut(id)?.turn_towards(direction);
        Ok(())
    }

    /// Teleport a character.
    pub fn set_position(&mut self, id: &str, pos: LayerPosition) -> Result<()> {
        self.character_mut(id)?.set_tile_position(pos);
        Ok(())
    }

    /// Whether a character is moving.
    pub fn is_moving(&self, id: &str) -> Result<bool> {
        Ok(self.character(id)?.is_moving())
    }

    /// Current tile of a character.
    pub fn position(&self, id: &str) -> Result<LayerPosition> {
        Ok(self.character(id)?.tile_pos())
    }

    /// Facing direction of a character.
    pub fn facing_direction(&self, id: &str) -> Result<Direction> {
        Ok(self.character(id)?.facing_direction())
    }

    /// Whether a character would be blocked moving in a direction.
    pub fn is_blocked(&self, id: &str, direction: Direction) -> Result<bool> {
        Ok(self.character(id)?.is_blocking_direction(direction))
    }

    /// Ids of the characters occupying a tile.
    pub fn characters_at(&self, pos: &LayerPosition) -> Vec<CharId> {
        self.tilemap.characters_at(pos)
    }

    /// Register a layer transition.
    pub fn set_transition(&self, pos: TilePos, from: &str, to: &str) {
        self.tilemap.set_transition(pos, from, to);
    }

    /// Target layer of a transition.
    pub fn get_transition(&self, pos: TilePos, from: &str) -> Option<CharLayer> {
        self.tilemap.get_transition(pos, from)
    }

    /// Advance every character by `delta_ms` milliseconds, ascending by id.
    pub fn update(&mut self, delta_ms: f64) -> TickResult {
        for character in self.characters.values_mut() {
            character.update(delta_ms);
        }
        TickResult {
            events: std::mem::take(&mut *self.pending_events.borrow_mut()),
        }
    }
}
