//! Character Block Cache
//!
//! Incrementally maintained occupancy index: which characters occupy, or
//! are about to occupy, each layered tile. The cache never polls; it is
//! driven entirely by the position events of the characters registered
//! with it.
//!
//! # Invariants
//!
//! - An idle character occupies exactly one tile, a moving one exactly two
//!   (one under [`CollisionStrategy::BlockOneTileAhead`]).
//! - Empty tile entries are removed.
//! - After `remove_character` nothing refers to the character.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use tracing::debug;

use crate::grid::config::CollisionStrategy;
use crate::grid::error::{GridError, Result};
use crate::grid::events::SubscriptionId;
use crate::grid::character::GridCharacter;
use crate::grid::position::{CharId, LayerPosition};

/// Collision groups of an occupant, shared between a character and the cache.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollisionProfile {
    /// Groups the character collides with. Empty means it never blocks.
    pub groups: BTreeSet<String>,
}

impl CollisionProfile {
    /// Profile with the given groups.
    pub fn new<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            groups: groups.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the character takes part in collisions at all.
    #[inline]
    pub fn is_colliding(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Whether any group is shared with `groups`.
    pub fn shares_group(&self, groups: &BTreeSet<String>) -> bool {
        self.groups.iter().any(|g| groups.contains(g))
    }
}

// =============================================================================
// OCCUPANCY INDEX
// =============================================================================

#[derive(Debug, Default)]
struct OccupancyIndex {
    tiles: HashMap<LayerPosition, BTreeSet<CharId>>,
    tracked: HashMap<CharId, BTreeSet<LayerPosition>>,
}

impl OccupancyIndex {
    fn insert(&mut self, pos: &LayerPosition, id: &str) {
        self.tiles
            .entry(pos.clone())
            .or_default()
            .insert(id.to_string());
        self.tracked
            .entry(id.to_string())
            .or_default()
            .insert(pos.clone());
    }

    fn remove(&mut self, pos: &LayerPosition, id: &str) {
        if let Some(occupants) = self.tiles.get_mut(pos) {
            occupants.remove(id);
            if occupants.is_empty() {
                self.tiles.remove(pos);
            }
        }
        if let Some(positions) = self.tracked.get_mut(id) {
            positions.remove(pos);
            if positions.is_empty() {
                self.tracked.remove(id);
            }
        }
    }

    fn remove_all(&mut self, id: &str) {
        let positions = self.tracked.remove(id).unwrap_or_default();
        for pos in positions {
            if let Some(occupants) = self.tiles.get_mut(&pos) {
                occupants.remove(id);
                if occupants.is_empty() {
                    self.tiles.remove(&pos);
                }
            }
        }
    }
}

// =============================================================================
// CACHE
// =============================================================================

#[derive(Debug)]
struct Registration {
    profile: Rc<RefCell<CollisionProfile>>,
    started: SubscriptionId,
    finished: SubscriptionId,
    tile_set: SubscriptionId,
}

/// Occupancy index keyed by [`LayerPosition`].
#[derive(Debug)]
pub struct CharBlockCache {
    strategy: CollisionStrategy,
    index: Rc<RefCell<OccupancyIndex>>,
    registrations: RefCell<HashMap<CharId, Registration>>,
}

impl CharBlockCache {
    /// Create an empty cache.
    pub fn new(strategy: CollisionStrategy) -> Self {
        Self {
            strategy,
            index: Rc::new(RefCell::new(OccupancyIndex::default())),
            registrations: RefCell::new(HashMap::new()),
        }
    }

    /// Collision strategy in effect.
    pub fn strategy(&self) -> CollisionStrategy {
        self.strategy
    }

    /// Start tracking a character.
    pub fn add_character(&self, character: &mut GridCharacter) -> Result<()> {
        let id = character.id().to_string();
        if self.registrations.borrow().contains_key(&id) {
            return Err(GridError::AlreadyRegistered(id));
        }

        {
            let mut index = self.index.borrow_mut();
            index.insert(&character.tile_pos(), &id);
            index.insert(&character.next_tile_pos(), &id);
        }

        let strategy = self.strategy;
        let events = character.events_mut();

        let index = Rc::clone(&self.index);
        let char_id = id.clone();
        let started = events.position_change_started.subscribe(move |change| {
            let mut index = index.borrow_mut();
            if strategy == CollisionStrategy::BlockOneTileAhead {
                index.remove(&change.exit_tile, &char_id);
            }
            index.insert(&change.enter_tile, &char_id);
        });

        let index = Rc::clone(&self.index);
        let char_id = id.clone();
        let finished = events.position_change_finished.subscribe(move |change| {
            // A teleport onto the current tile enters and exits the same tile.
            if change.exit_tile != change.enter_tile {
                index.borrow_mut().remove(&change.exit_tile, &char_id);
            }
        });

        let index = Rc::clone(&self.index);
        let char_id = id.clone();
        let tile_set = events.tile_position_set.subscribe(move |_| {
            index.borrow_mut().remove_all(&char_id);
        });

        debug!(char_id = %id, tile = %character.tile_pos(), "character added to block cache");

        self.registrations.borrow_mut().insert(
            id,
            Registration {
                profile: character.collision_profile(),
                started,
                finished,
                tile_set,
            },
        );
        Ok(())
    }

    /// Stop tracking a character and erase all of its entries.
    ///
    /// A registered character that is dropped unregisters itself.
    pub fn remove_character(&self, character: &mut GridCharacter) -> Result<()> {
        let id = character.id().to_string();
        let registration = self
            .registrations
            .borrow_mut()
            .remove(&id)
            .ok_or_else(|| GridError::UnknownCharacter(id.clone()))?;

        let events = character.events_mut();
        events.position_change_started.unsubscribe(registration.started);
        events.position_change_finished.unsubscribe(registration.finished);
        events.tile_position_set.unsubscribe(registration.tile_set);

        self.index.borrow_mut().remove_all(&id);

        debug!(char_id = %id, "character removed from block cache");
        Ok(())
    }

    /// Whether this exact character, identified by its shared profile, is
    /// the one registered under `id`.
    pub(crate) fn is_tracking(&self, id: &str, profile: &Rc<RefCell<CollisionProfile>>) -> bool {
        self.registrations
            .borrow()
            .get(id)
            .is_some_and(|reg| Rc::ptr_eq(&reg.profile, profile))
    }

    /// Whether a character id is registered.
    pub fn is_registered(&self, id: &str) -> bool {
        self.registrations.borrow().contains_key(id)
    }

    /// Check whether a colliding character blocks a tile.
    ///
    /// Occupants listed in `exclude` are ignored. When `groups` is given an
    /// occupant only blocks if it shares at least one group.
    pub fn is_char_blocking_at(
        &self,
        pos: &LayerPosition,
        groups: Option<&BTreeSet<String>>,
        exclude: &[&str],
    ) -> bool {
        let index = self.index.borrow();
        let Some(occupants) = index.tiles.get(pos) else {
            return false;
        };
        let registrations = self.registrations.borrow();

        occupants
            .iter()
            .filter(|id| !exclude.contains(&id.as_str()))
            .filter_map(|id| registrations.get(id))
            .any(|reg| {
                let profile = reg.profile.borrow();
                profile.is_colliding() && groups.map_or(true, |g| profile.shares_group(g))
            })
    }

    /// Ids of the characters occupying a tile, in ascending order.
    pub fn characters_at(&self, pos: &LayerPosition) -> Vec<CharId> {
        self.index
            .borrow()
            .tiles
            .get(pos)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every tile currently occupied by a character.
    pub fn tiles_of(&self, id: &str) -> Vec<LayerPosition> {
        self.index
            .borrow()
            .tracked
            .get(id)
            .map(|tiles| tiles.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of tiles with at least one occupant.
    pub fn occupied_tile_count(&self) -> usize {
        self.index.borrow().tiles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use crate::core::direction::Direction;
    use crate::grid::character::CharacterConfig;
    use crate::grid::config::GridConfig;
    use crate::grid::grid_tilemap::GridTilemap;
    use crate::grid::tilemap::{TileLayerData, TilemapData};

    fn open_tilemap(strategy: CollisionStrategy) -> Rc<GridTilemap> {
        let map = TilemapData::new(10, 10, 16.0, 16.0)
            .with_layer(TileLayerData::filled("ground", 10, 10));
        let config = GridConfig::default().with_collision_strategy(strategy);
        Rc::new(GridTilemap::new(Box::new(map), config).unwrap())
    }

    fn character(tilemap: &Rc<GridTilemap>, id: &str, x: i32, y: i32) -> GridCharacter {
        let config = CharacterConfig::new(id).at(LayerPosition::unlayered(x, y));
        GridCharacter::new(Rc::clone(tilemap), config)
    }

    #[test]
    fn test_occupancy_two_tiles_while_moving() {
        let tilemap = open_tilemap(CollisionStrategy::BlockTwoTiles);
        let cache = tilemap.block_cache();
        let mut a = character(&tilemap, "a", 5, 6);
        cache.add_character(&mut a).unwrap();

        let start = LayerPosition::unlayered(5, 6);
        let ahead = LayerPosition::unlayered(5, 5);
        assert!(cache.is_char_blocking_at(&start, None, &[]));
        assert!(!cache.is_char_blocking_at(&ahead, None, &[]));

        a.move_in(Direction::Up).unwrap();
        assert!(cache.is_char_blocking_at(&start, None, &[]));
        assert!(cache.is_char_blocking_at(&ahead, None, &[]));

        a.update(1000.0);
        assert!(!a.is_moving());
        assert!(!cache.is_char_blocking_at(&start, None, &[]));
        assert!(cache.is_char_blocking_at(&ahead, None, &[]));
        assert_eq!(cache.occupied_tile_count(), 1);
    }

    #[test]
    fn test_one_tile_ahead_releases_exit_at_start() {
        let tilemap = open_tilemap(CollisionStrategy::BlockOneTileAhead);
        let cache = tilemap.block_cache();
        let mut a = character(&tilemap, "a", 5, 6);
        cache.add_character(&mut a).unwrap();

        a.move_in(Direction::Up).unwrap();
        assert!(!cache.is_char_blocking_at(&LayerPosition::unlayered(5, 6), None, &[]));
        assert!(cache.is_char_blocking_at(&LayerPosition::unlayered(5, 5), None, &[]));
    }

    #[test]
    fn test_double_registration_fails() {
        let tilemap = open_tilemap(CollisionStrategy::BlockTwoTiles);
        let cache = tilemap.block_cache();
        let mut a = character(&tilemap, "a", 1, 1);
        let mut a2 = character(&tilemap, "a", 2, 2);

        cache.add_character(&mut a).unwrap();
        let err = cache.add_character(&mut a2).unwrap_err();
        assert_eq!(err, GridError::AlreadyRegistered("a".to_string()));
        assert!(!cache.is_char_blocking_at(&LayerPosition::unlayered(2, 2), None, &[]));

        // Dropping the rejected namesake leaves the registered one alone.
        drop(a2);
        assert!(cache.is_registered("a"));
        assert_eq!(cache.tiles_of("a"), vec![LayerPosition::unlayered(1, 1)]);
    }

    #[test]
    fn test_dropped_character_releases_tiles() {
        let tilemap = open_tilemap(CollisionStrategy::BlockTwoTiles);
        let cache = tilemap.block_cache();
        {
            let mut a = character(&tilemap, "a", 5, 6);
            cache.add_character(&mut a).unwrap();
            a.move_in(Direction::Up).unwrap();
            assert_eq!(cache.occupied_tile_count(), 2);
        }

        assert!(!cache.is_registered("a"));
        assert_eq!(cache.occupied_tile_count(), 0);
        assert!(!cache.is_char_blocking_at(&LayerPosition::unlayered(5, 6), None, &[]));
    }

    #[test]
    fn test_remove_erases_everything() {
        let tilemap = open_tilemap(CollisionStrategy::BlockTwoTiles);
        let cache = tilemap.block_cache();
        let mut a = character(&tilemap, "a", 3, 3);
        cache.add_character(&mut a).unwrap();
        a.move_in(Direction::Right).unwrap();

        cache.remove_character(&mut a).unwrap();
        assert_eq!(cache.occupied_tile_count(), 0);
        assert!(!cache.is_registered("a"));
        assert_eq!(a.events_mut().position_change_started.subscriber_count(), 0);

        // Further motion leaves the cache untouched.
        a.update(1000.0);
        assert_eq!(cache.occupied_tile_count(), 0);

        let err = cache.remove_character(&mut a).unwrap_err();
        assert_eq!(err, GridError::UnknownCharacter("a".to_string()));
    }

    #[test]
    fn test_teleport_moves_entry() {
        let tilemap = open_tilemap(CollisionStrategy::BlockTwoTiles);
        let cache = tilemap.block_cache();
        let mut a = character(&tilemap, "a", 1, 1);
        cache.add_character(&mut a).unwrap();

        a.set_tile_position(LayerPosition::unlayered(7, 2));
        assert_eq!(cache.tiles_of("a"), vec![LayerPosition::unlayered(7, 2)]);

        a.set_tile_position(LayerPosition::unlayered(7, 2));
        assert_eq!(cache.tiles_of("a"), vec![LayerPosition::unlayered(7, 2)]);
    }

    #[test]
    fn test_groups_and_exclusion() {
        let tilemap = open_tilemap(CollisionStrategy::BlockTwoTiles);
        let cache = tilemap.block_cache();
        let mut a = character(&tilemap, "a", 4, 4);
        a.set_collision_groups(["team-a"]);
        let mut ghost = character(&tilemap, "ghost", 4, 4);
        ghost.set_collision_groups(Vec::<String>::new());
        cache.add_character(&mut a).unwrap();
        cache.add_character(&mut ghost).unwrap();

        let pos = LayerPosition::unlayered(4, 4);
        let team_a: BTreeSet<String> = ["team-a".to_string()].into();
        let team_b: BTreeSet<String> = ["team-b".to_string()].into();

        assert!(cache.is_char_blocking_at(&pos, Some(&team_a), &[]));
        assert!(!cache.is_char_blocking_at(&pos, Some(&team_b), &[]));
        assert!(!cache.is_char_blocking_at(&pos, None, &["a"]));
        assert_eq!(cache.characters_at(&pos), vec!["a".to_string(), "ghost".to_string()]);
    }

    #[test]
    fn test_layers_are_separate_keys() {
        let tilemap = open_tilemap(CollisionStrategy::BlockTwoTiles);
        let cache = tilemap.block_cache();
        let config = CharacterConfig::new("a").at(LayerPosition::new(2, 2, Some("bridge")));
        let mut a = GridCharacter::new(Rc::clone(&tilemap), config);
        cache.add_character(&mut a).unwrap();

        assert!(cache.is_char_blocking_at(&LayerPosition::new(2, 2, Some("bridge")), None, &[]));
        assert!(!cache.is_char_blocking_at(&LayerPosition::unlayered(2, 2), None, &[]));
    }
}
