use std::collections::VecDeque;

use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::{EngineError, EngineResult};
use crate::tile::Tile;

pub const DEAD_WALL_SIZE: usize = 14;
pub const MAX_REPLACEMENT_DRAWS: u8 = 4;
pub const MAX_DORA_INDICATORS: usize = 5;

/// The shuffled wall, split into a live draw queue and a 14-tile dead
/// wall. Dead wall layout: slots 0-3 are replacement tiles, 4/6/8/10/12
/// dora indicators, 5/7/9/11/13 their ura counterparts. Each replacement
/// draw moves the last live tile into the dead wall so it always holds
/// fourteen unseen tiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WallState {
    live: VecDeque<Tile>,
    dead: Vec<Tile>,
    replacement_draws: u8,
    revealed_dora: usize,
    pub wall_digest: String,
    pub salt: String,
    pub seed: Option<u64>,
    pub hand_index: u64,
}

impl WallState {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            live: VecDeque::new(),
            dead: Vec::new(),
            replacement_draws: 0,
            revealed_dora: 0,
            wall_digest: String::new(),
            salt: String::new(),
            seed,
            hand_index: 0,
        }
    }

    /// Builds and shuffles a fresh 136-tile wall, committing to its order
    /// with a salted digest before any tile is revealed.
    pub fn shuffle_and_setup(&mut self, red_fives_per_suit: u8) -> EngineResult<()> {
        let mut tiles = full_tile_set(red_fives_per_suit);

        let mut rng = if let Some(episode_seed) = self.seed {
            let hand_seed = splitmix64(episode_seed.wrapping_add(self.hand_index));
            self.hand_index = self.hand_index.wrapping_add(1);
            StdRng::seed_from_u64(hand_seed)
        } else {
            self.hand_index = self.hand_index.wrapping_add(1);
            StdRng::from_entropy()
        };

        tiles.shuffle(&mut rng);
        self.salt = format!("{:016x}", rng.next_u64());

        let mut hasher = Sha256::new();
        hasher.update(self.salt.as_bytes());
        for t in &tiles {
            hasher.update([t.value(), t.is_red() as u8]);
        }
        self.wall_digest = format!("{:x}", hasher.finalize());

        if tiles.len() < DEAD_WALL_SIZE {
            return Err(EngineError::Setup(format!(
                "wall too short for dead wall: {}",
                tiles.len()
            )));
        }
        self.dead = tiles.split_off(tiles.len() - DEAD_WALL_SIZE);
        self.live = tiles.into();
        self.replacement_draws = 0;
        self.revealed_dora = 1;
        Ok(())
    }

    /// `None` means the live wall is exhausted (exhaustive draw).
    pub fn draw_tile(&mut self) -> Option<Tile> {
        self.live.pop_front()
    }

    /// Replacement tile after a kan. `None` once all four are gone.
    pub fn draw_replacement_tile(&mut self) -> Option<Tile> {
        if self.replacement_draws >= MAX_REPLACEMENT_DRAWS {
            return None;
        }
        let idx = self.replacement_draws as usize;
        let tile = self.dead.get(idx).copied()?;
        self.replacement_draws += 1;
        // The dead wall is replenished from the tail of the live wall.
        if let Some(t) = self.live.pop_back() {
            self.dead.push(t);
        }
        Some(tile)
    }

    /// Flips the next kan dora indicator. Past the fifth this is a no-op.
    pub fn reveal_new_dora(&mut self) {
        if self.revealed_dora < MAX_DORA_INDICATORS {
            self.revealed_dora += 1;
        }
    }

    pub fn dora_indicators(&self) -> Vec<Tile> {
        (0..self.revealed_dora)
            .filter_map(|n| self.dead.get(4 + 2 * n).copied())
            .collect()
    }

    pub fn ura_indicators(&self) -> Vec<Tile> {
        (0..self.revealed_dora)
            .filter_map(|n| self.dead.get(5 + 2 * n).copied())
            .collect()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn replacement_draws(&self) -> u8 {
        self.replacement_draws
    }

    /// Tiles still face-down anywhere in the wall.
    pub fn undealt_count(&self) -> usize {
        self.live.len() + self.dead.len() - self.replacement_draws as usize
    }
}

/// 4 copies of every kind, with red fives substituted per the rule.
fn full_tile_set(red_fives_per_suit: u8) -> Vec<Tile> {
    let mut tiles = Vec::with_capacity(136);
    for value in 0u8..34 {
        let reds = if matches!(value, 4 | 13 | 22) {
            red_fives_per_suit.min(4)
        } else {
            0
        };
        for copy in 0..4u8 {
            if copy < reds {
                // Values are fives here, construction cannot fail.
                if let Ok(t) = Tile::new_red(value) {
                    tiles.push(t);
                }
            } else if let Ok(t) = Tile::new(value) {
                tiles.push(t);
            }
        }
    }
    tiles
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E3779B97F4A7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
