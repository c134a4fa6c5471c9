use serde::{Deserialize, Serialize};

use crate::tile::Tile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeldKind {
    Chi,
    Pon,
    /// Concealed kan.
    Ankan,
    /// Pon upgraded with the fourth tile.
    Kakan,
    /// Open kan claimed from a discard.
    Daiminkan,
}

/// An exposed (or concealed-kan) set. `tiles` holds all member tiles
/// including any claimed discard, lowest value first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meld {
    pub kind: MeldKind,
    pub tiles: Vec<Tile>,
    /// Seat the claimed tile came from; the owner itself for closed kans.
    pub called_from: u8,
}

impl Meld {
    pub fn is_kan(&self) -> bool {
        matches!(
            self.kind,
            MeldKind::Ankan | MeldKind::Kakan | MeldKind::Daiminkan
        )
    }

    /// Triplet-like for yaku purposes (everything except chi).
    pub fn is_triplet(&self) -> bool {
        self.kind != MeldKind::Chi
    }

    pub fn is_concealed(&self) -> bool {
        self.kind == MeldKind::Ankan
    }

    /// Representative tile value of the set (lowest for chi).
    pub fn base_value(&self) -> u8 {
        self.tiles.first().map(|t| t.value()).unwrap_or(0)
    }
}
