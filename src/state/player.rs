use serde::{Deserialize, Serialize};

use crate::meld::Meld;
use crate::tile::{Tile, TileCounts};

/// Per-seat hand state. `hand` stays sorted; the drawn tile lives in its
/// own slot until the discard resolves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    pub hand: Vec<Tile>,
    pub drawn_tile: Option<Tile>,
    pub melds: Vec<Meld>,
    pub discards: Vec<Tile>,
    pub discard_is_riichi: Vec<bool>,
    pub riichi_declaration_index: Option<usize>,
    pub score: i32,
    pub riichi_declared: bool,
    /// Riichi announced but the declaring discard has not yet passed.
    pub riichi_pending: bool,
    pub double_riichi_declared: bool,
    /// Ippatsu window: set on riichi acceptance, cleared by the next own
    /// discard or any call.
    pub ippatsu_cycle: bool,
    /// Passed on a winning tile this go-around.
    pub temporary_furiten: bool,
    /// Passed on a winning tile after declaring riichi.
    pub permanent_furiten: bool,
    /// Values this seat may not discard right after calling.
    pub forbidden_discards: Vec<u8>,
}

impl PlayerState {
    pub fn new(starting_score: i32) -> Self {
        Self {
            hand: Vec::new(),
            drawn_tile: None,
            melds: Vec::new(),
            discards: Vec::new(),
            discard_is_riichi: Vec::new(),
            riichi_declaration_index: None,
            score: starting_score,
            riichi_declared: false,
            riichi_pending: false,
            double_riichi_declared: false,
            ippatsu_cycle: false,
            temporary_furiten: false,
            permanent_furiten: false,
            forbidden_discards: Vec::new(),
        }
    }

    pub fn reset_hand(&mut self) {
        self.hand.clear();
        self.drawn_tile = None;
        self.melds.clear();
        self.discards.clear();
        self.discard_is_riichi.clear();
        self.riichi_declaration_index = None;
        self.riichi_declared = false;
        self.riichi_pending = false;
        self.double_riichi_declared = false;
        self.ippatsu_cycle = false;
        self.temporary_furiten = false;
        self.permanent_furiten = false;
        self.forbidden_discards.clear();
    }

    pub fn sort_hand(&mut self) {
        self.hand.sort_unstable();
    }

    pub fn is_menzen(&self) -> bool {
        self.melds.iter().all(|m| m.is_concealed())
    }

    /// Concealed tiles including the drawn tile, as a histogram.
    pub fn concealed_counts(&self) -> TileCounts {
        let mut counts = TileCounts::from_tiles(&self.hand);
        if let Some(t) = self.drawn_tile {
            counts.add(t.value());
        }
        counts
    }

    /// Histogram of the 13-tile hand only.
    pub fn hand_counts(&self) -> TileCounts {
        TileCounts::from_tiles(&self.hand)
    }

    /// Removes one tile matching `tile` exactly (value and red flag) from
    /// the drawn slot or the hand. Returns whether a tile was removed.
    pub fn remove_tile(&mut self, tile: Tile) -> bool {
        if self.drawn_tile == Some(tile) {
            self.drawn_tile = None;
            return true;
        }
        if let Some(pos) = self.hand.iter().position(|&t| t == tile) {
            self.hand.remove(pos);
            return true;
        }
        false
    }

    /// Folds the drawn tile into the hand, if any.
    pub fn merge_drawn_tile(&mut self) {
        if let Some(t) = self.drawn_tile.take() {
            self.hand.push(t);
            self.sort_hand();
        }
    }

    pub fn count_in_hand(&self, value: u8) -> usize {
        self.hand.iter().filter(|t| t.value() == value).count()
    }
}
