//! Walking Animation
//!
//! Logical frame selection only: which frame of a character sheet should be
//! shown. Drawing it is up to the host.
//!
//! A character sheet is laid out in blocks of 3 columns (right foot,
//! standing, left foot) by 4 rows (down, left, right, up) per character.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

use crate::core::direction::Direction;

/// Frame columns per character block.
pub const FRAMES_PER_CHAR_ROW: u32 = 3;
/// Frame rows per character block.
pub const FRAMES_PER_CHAR_COL: u32 = 4;

/// The three frames of one walking direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRow {
    /// Left foot forward
    pub left_foot: u32,
    /// Standing still
    pub standing: u32,
    /// Right foot forward
    pub right_foot: u32,
}

fn default_chars_per_row() -> u32 {
    4
}

/// How a character's frames are located.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkingAnimation {
    /// Position of the character on a standard sheet.
    ByIndex {
        /// Character index, row-major over the sheet
        index: u32,
        /// Characters per sheet row
        #[serde(default = "default_chars_per_row")]
        chars_per_row: u32,
    },
    /// Explicit frames per direction.
    ByMapping(BTreeMap<Direction, FrameRow>),
}

impl WalkingAnimation {
    /// Resolve into a lookup table.
    pub fn resolve(&self) -> FrameTable {
        match self {
            WalkingAnimation::ByIndex { index, chars_per_row } => {
                FrameTable::from_char_index(*index, *chars_per_row)
            }
            WalkingAnimation::ByMapping(rows) => FrameTable { rows: rows.clone() },
        }
    }
}

/// Frames per direction.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameTable {
    rows: BTreeMap<Direction, FrameRow>,
}

impl FrameTable {
    /// Frames of the character at `index` on a standard sheet.
    ///
    /// Diagonals reuse the vertical rows.
    pub fn from_char_index(index: u32, chars_per_row: u32) -> Self {
        let chars_per_row = chars_per_row.max(1);
        let char_row = index / chars_per_row;
        let char_col = index % chars_per_row;
        let frames_in_row = chars_per_row * FRAMES_PER_CHAR_ROW;
        let frames_before = FRAMES_PER_CHAR_ROW * char_col;

        let row_for = |direction_row: u32| {
            let row = direction_row + char_row * FRAMES_PER_CHAR_COL;
            let start = frames_before + row * frames_in_row;
            FrameRow {
                right_foot: start,
                standing: start + 1,
                left_foot: start + 2,
            }
        };

        let rows = Direction::ALL
            .iter()
            .map(|&dir| {
                let direction_row = match dir {
                    Direction::Left => 1,
                    Direction::Right => 2,
                    Direction::Up | Direction::UpLeft | Direction::UpRight => 3,
                    _ => 0,
                };
                (dir, row_for(direction_row))
            })
            .collect();

        Self { rows }
    }

    /// Frames of a direction.
    pub fn frames(&self, direction: Direction) -> Option<&FrameRow> {
        self.rows.get(&direction)
    }
}

/// Which foot is forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Foot {
    /// Feet together
    Standing,
    /// Left foot forward
    LeftFoot,
    /// Right foot forward
    RightFoot,
}

/// Logical frame of a character.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameState {
    /// Direction shown
    pub direction: Direction,
    /// Foot pose
    pub foot: Foot,
}

/// Per-character animation state.
#[derive(Clone, Debug)]
pub struct CharacterAnimation {
    table: Option<FrameTable>,
    state: FrameState,
    last_foot_left: bool,
}

impl CharacterAnimation {
    /// Standing, facing `direction`.
    pub fn new(animation: Option<&WalkingAnimation>, direction: Direction) -> Self {
        Self {
            table: animation.map(WalkingAnimation::resolve),
            state: FrameState {
                direction,
                foot: Foot::Standing,
            },
            last_foot_left: false,
        }
    }

    /// Replace the frame source.
    pub fn set_walking_animation(&mut self, animation: Option<&WalkingAnimation>) {
        self.table = animation.map(WalkingAnimation::resolve);
    }

    /// Switch to the standing pose.
    pub fn set_standing(&mut self, direction: Direction) {
        if self.state.foot != Foot::Standing {
            self.last_foot_left = !self.last_foot_left;
        }
        self.state = FrameState {
            direction,
            foot: Foot::Standing,
        };
    }

    /// Advance the walk cycle. Feet alternate between tiles; the second
    /// half of every tile is drawn standing.
    pub fn update_walking(&mut self, direction: Direction, walked_half_tile: bool) {
        if walked_half_tile {
            self.set_standing(direction);
        } else {
            self.state = FrameState {
                direction,
                foot: if self.last_foot_left {
                    Foot::RightFoot
                } else {
                    Foot::LeftFoot
                },
            };
        }
    }

    /// Current logical frame.
    pub fn frame_state(&self) -> FrameState {
        self.state
    }

    /// Sheet frame for the current state, if frames are configured.
    pub fn frame(&self) -> Option<u32> {
        let row = self.table.as_ref()?.frames(self.state.direction)?;
        Some(match self.state.foot {
            Foot::Standing => row.standing,
            Foot::LeftFoot => row.left_foot,
            Foot::RightFoot => row.right_foot,
        })
    }
}
