use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EngineResult};

pub const TILE_KINDS: usize = 34;

/// Tile values: 0-8 man, 9-17 pin, 18-26 sou, 27-30 winds (ESWN), 31-33 dragons.
pub const WIND_EAST: u8 = 27;
pub const WIND_NORTH: u8 = 30;
pub const DRAGON_WHITE: u8 = 31;
pub const DRAGON_RED: u8 = 33;

/// A single physical tile. `value` identifies the kind (0-33), `red` marks
/// the red five of its suit. Identity for shape analysis ignores `red`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tile {
    value: u8,
    red: bool,
}

impl Tile {
    pub fn new(value: u8) -> EngineResult<Self> {
        if value as usize >= TILE_KINDS {
            return Err(EngineError::InvalidState(format!(
                "tile value out of range: {value}"
            )));
        }
        Ok(Tile { value, red: false })
    }

    pub fn new_red(value: u8) -> EngineResult<Self> {
        if !matches!(value, 4 | 13 | 22) {
            return Err(EngineError::InvalidState(format!(
                "red tile must be a five, got value {value}"
            )));
        }
        Ok(Tile { value, red: true })
    }

    /// Infallible constructor for known-good values; out-of-range input
    /// falls back to the 1-man.
    pub fn from_value(value: u8) -> Self {
        Tile::new(value).unwrap_or(Tile { value: 0, red: false })
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn is_red(&self) -> bool {
        self.red
    }

    /// Suit index 0/1/2 for man/pin/sou, 3 for honors.
    pub fn suit(&self) -> u8 {
        self.value / 9
    }

    /// Rank 1-9 within a suit. Honors report their offset + 1.
    pub fn rank(&self) -> u8 {
        self.value % 9 + 1
    }

    pub fn is_honor(&self) -> bool {
        self.value >= WIND_EAST
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_honor() && matches!(self.rank(), 1 | 9)
    }

    pub fn is_terminal_or_honor(&self) -> bool {
        self.is_honor() || self.is_terminal()
    }

    /// The tile value indicated as dora by this indicator: 9 wraps to 1
    /// within each number suit, winds cycle E-S-W-N, dragons Wh-Gr-Rd.
    pub fn next_dora_value(&self) -> u8 {
        next_dora_value(self.value)
    }
}

pub fn next_dora_value(value: u8) -> u8 {
    match value {
        0..=26 => {
            if value % 9 == 8 {
                value - 8
            } else {
                value + 1
            }
        }
        27..=30 => {
            if value == WIND_NORTH {
                WIND_EAST
            } else {
                value + 1
            }
        }
        _ => {
            if value == DRAGON_RED {
                DRAGON_WHITE
            } else {
                value + 1
            }
        }
    }
}

pub fn is_terminal_or_honor_value(value: u8) -> bool {
    value >= WIND_EAST || matches!(value % 9, 0 | 8)
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_honor() {
            return write!(f, "{}z", self.value - WIND_EAST + 1);
        }
        let suit = ['m', 'p', 's'][self.suit() as usize];
        if self.red {
            write!(f, "{}{}r", self.rank(), suit)
        } else {
            write!(f, "{}{}", self.rank(), suit)
        }
    }
}

/// Histogram of tile kinds, the working representation for shape analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCounts {
    pub counts: [u8; TILE_KINDS],
}

impl TileCounts {
    pub fn new() -> Self {
        TileCounts {
            counts: [0; TILE_KINDS],
        }
    }

    pub fn from_tiles<'a, I: IntoIterator<Item = &'a Tile>>(tiles: I) -> Self {
        let mut h = TileCounts::new();
        for t in tiles {
            h.add(t.value());
        }
        h
    }

    pub fn add(&mut self, value: u8) {
        if (value as usize) < TILE_KINDS {
            self.counts[value as usize] += 1;
        }
    }

    pub fn remove(&mut self, value: u8) {
        if (value as usize) < TILE_KINDS && self.counts[value as usize] > 0 {
            self.counts[value as usize] -= 1;
        }
    }

    pub fn get(&self, value: u8) -> u8 {
        self.counts[value as usize]
    }

    pub fn total(&self) -> u8 {
        self.counts.iter().sum()
    }
}

impl Default for TileCounts {
    fn default() -> Self {
        TileCounts::new()
    }
}
