//! Directions and Grid Geometry
//!
//! Pure lookup tables: step vectors for 4- and 8-way movement, opposite
//! directions and the 45° rotation between screen directions and isometric
//! map directions.

use std::fmt;
use serde::{Serialize, Deserialize};

use super::vec2::Vec2;

// =============================================================================
// DIRECTION
// =============================================================================

/// Movement / facing direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[derive(Default)]
pub enum Direction {
    /// No direction (idle)
    #[default]
    None,
    /// Screen/map up (-Y)
    Up,
    /// Screen/map down (+Y)
    Down,
    /// Screen/map left (-X)
    Left,
    /// Screen/map right (+X)
    Right,
    /// Up and left
    UpLeft,
    /// Up and right
    UpRight,
    /// Down and left
    DownLeft,
    /// Down and right
    DownRight,
}

impl Direction {
    /// The four cardinal directions.
    pub const CARDINAL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    /// All eight concrete directions.
    pub const ALL: [Direction; 8] = [
        Direction::Up,
        Direction::UpRight,
        Direction::Right,
        Direction::DownRight,
        Direction::Down,
        Direction::DownLeft,
        Direction::Left,
        Direction::UpLeft,
    ];

    /// Integer tile step for this direction.
    #[inline]
    pub const fn step(self) -> (i32, i32) {
        match self {
            Direction::None => (0, 0),
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::UpLeft => (-1, -1),
            Direction::UpRight => (1, -1),
            Direction::DownLeft => (-1, 1),
            Direction::DownRight => (1, 1),
        }
    }

    /// Step vector (`step` as a `Vec2`).
    #[inline]
    pub fn vector(self) -> Vec2 {
        let (x, y) = self.step();
        Vec2::from_ints(x, y)
    }

    /// Opposite direction (`None` stays `None`).
    pub const fn opposite(self) -> Direction {
        match self {
            Direction::None => Direction::None,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::UpLeft => Direction::DownRight,
            Direction::UpRight => Direction::DownLeft,
            Direction::DownLeft => Direction::UpRight,
            Direction::DownRight => Direction::UpLeft,
        }
    }

    /// Check if this is one of the four diagonals.
    #[inline]
    pub const fn is_diagonal(self) -> bool {
        matches!(
            self,
            Direction::UpLeft | Direction::UpRight | Direction::DownLeft | Direction::DownRight
        )
    }

    /// Rotate a screen direction into the isometric map direction.
    ///
    /// Screen down on an isometric board walks the map's down-right diagonal.
    pub const fn to_isometric_map(self) -> Direction {
        match self {
            Direction::None => Direction::None,
            Direction::Up => Direction::UpLeft,
            Direction::UpRight => Direction::Up,
            Direction::Right => Direction::UpRight,
            Direction::DownRight => Direction::Right,
            Direction::Down => Direction::DownRight,
            Direction::DownLeft => Direction::Down,
            Direction::Left => Direction::DownLeft,
            Direction::UpLeft => Direction::Left,
        }
    }

    /// Inverse of [`Direction::to_isometric_map`].
    pub const fn from_isometric_map(self) -> Direction {
        match self {
            Direction::None => Direction::None,
            Direction::UpLeft => Direction::Up,
            Direction::Up => Direction::UpRight,
            Direction::UpRight => Direction::Right,
            Direction::Right => Direction::DownRight,
            Direction::DownRight => Direction::Down,
            Direction::Down => Direction::DownLeft,
            Direction::DownLeft => Direction::Left,
            Direction::Left => Direction::UpLeft,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::None => "none",
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::UpLeft => "up-left",
            Direction::UpRight => "up-right",
            Direction::DownLeft => "down-left",
            Direction::DownRight => "down-right",
        };
        f.write_str(name)
    }
}

// =============================================================================
// NUMBER OF DIRECTIONS
// =============================================================================

/// How many directions a world allows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum NumberOfDirections {
    /// Cardinal directions only
    #[default]
    Four,
    /// Cardinal and diagonal directions
    Eight,
}

impl NumberOfDirections {
    /// Check whether a map direction is allowed.
    ///
    /// `Direction::None` is always allowed (it never moves).
    #[inline]
    pub fn allows(self, direction: Direction) -> bool {
        match self {
            NumberOfDirections::Four => !direction.is_diagonal(),
            NumberOfDirections::Eight => true,
        }
    }

    /// All concrete directions of this world.
    pub fn directions(self) -> &'static [Direction] {
        match self {
            NumberOfDirections::Four => &Direction::CARDINAL,
            NumberOfDirections::Eight => &Direction::ALL,
        }
    }
}

impl fmt::Display for NumberOfDirections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberOfDirections::Four => f.write_str("4"),
            NumberOfDirections::Eight => f.write_str("8"),
        }
    }
}

// =============================================================================
// ISOMETRIC PROJECTION
// =============================================================================

/// Project a tile coordinate onto isometric screen pixels.
///
/// `screen_x = (x - y) * tile_width / 2`, `screen_y = (x + y) * tile_height / 2`.
#[inline]
pub fn isometric_to_pixel(tile: Vec2, tile_size: Vec2) -> Vec2 {
    Vec2::new(
        (tile.x - tile.y) * tile_size.x / 2.0,
        (tile.x + tile.y) * tile_size.y / 2.0,
    )
}

/// Inverse of [`isometric_to_pixel`].
#[inline]
pub fn isometric_from_pixel(pixel: Vec2, tile_size: Vec2) -> Vec2 {
    let a = pixel.x / (tile_size.x / 2.0);
    let b = pixel.y / (tile_size.y / 2.0);
    Vec2::new((a + b) / 2.0, (b - a) / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_opposites_are_involutive() {
        for dir in Direction::ALL {
            assert_ne!(dir.opposite(), dir);
            assert_eq!(dir.opposite().opposite(), dir);
        }
        assert_eq!(Direction::None.opposite(), Direction::None);
    }

    #[test]
    fn test_opposite_step_cancels() {
        for dir in Direction::ALL {
            let (x, y) = dir.step();
            let (ox, oy) = dir.opposite().step();
            assert_eq!((x + ox, y + oy), (0, 0));
        }
    }

    #[test]
    fn test_isometric_map_rotation() {
        assert_eq!(Direction::Down.to_isometric_map(), Direction::DownRight);
        assert_eq!(Direction::DownRight.from_isometric_map(), Direction::Down);
        assert_eq!(Direction::UpRight.to_isometric_map(), Direction::Up);

        for dir in Direction::ALL {
            assert_eq!(dir.to_isometric_map().from_isometric_map(), dir);
        }
    }

    #[test]
    fn test_isometric_screen_direction_matches_projection() {
        // Walking the map direction must move the sprite along the screen direction.
        let tile_size = Vec2::new(32.0, 24.0);
        for dir in Direction::ALL {
            let map_step = dir.to_isometric_map().vector();
            let pixel = isometric_to_pixel(map_step, tile_size);
            let sign = |v: f64| if v == 0.0 { 0.0 } else { v.signum() };
            assert_eq!(Vec2::new(sign(pixel.x), sign(pixel.y)), dir.vector(), "direction {dir}");
        }
    }

    #[test]
    fn test_number_of_directions() {
        assert!(NumberOfDirections::Four.allows(Direction::Up));
        assert!(!NumberOfDirections::Four.allows(Direction::UpLeft));
        assert!(NumberOfDirections::Eight.allows(Direction::UpLeft));
        assert_eq!(NumberOfDirections::Four.directions().len(), 4);
        assert_eq!(NumberOfDirections::Eight.directions().len(), 8);
    }

    #[test]
    fn test_direction_serde_names() {
        let json = serde_json::to_string(&Direction::UpLeft).unwrap();
        assert_eq!(json, "\"up-left\"");
        let parsed: Direction = serde_json::from_str("\"down-right\"").unwrap();
        assert_eq!(parsed, Direction::DownRight);
    }

    proptest! {
        #[test]
        fn prop_isometric_round_trip(x in -500i32..500, y in -500i32..500, tw in 1u32..128, th in 1u32..128) {
            let tile_size = Vec2::new(f64::from(tw), f64::from(th));
            let tile = Vec2::from_ints(x, y);
            let back = isometric_from_pixel(isometric_to_pixel(tile, tile_size), tile_size);
            prop_assert_eq!(Vec2::new(back.x.round(), back.y.round()), tile);
        }
    }
}
