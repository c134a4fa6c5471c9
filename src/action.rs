use serde::{Deserialize, Serialize};

use crate::tile::Tile;

/// Kan variants. Closed uses four concealed tiles, Added upgrades an
/// existing pon, Open claims a discard with three concealed tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KanKind {
    Closed,
    Added,
    Open,
}

/// Everything a seat can legally submit to the engine.
///
/// Call actions name the tiles taken from the actor's own hand;
/// the claimed discard is tracked by the game state, not the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Discard { tile: Tile },
    /// Declare riichi and discard `discard` in the same step.
    Riichi { discard: Tile },
    /// The two hand tiles completing a run with the claimed discard.
    Chi { tiles: [Tile; 2] },
    /// One representative hand tile of the claimed pair.
    Pon { tile: Tile },
    Kan { kind: KanKind, tile: Tile },
    Tsumo,
    Ron,
    Pass,
    /// Nine-terminals abortive draw declaration on the first draw.
    AbortiveDraw,
}

impl Action {
    /// Claim priority when responding to a discard. Higher wins; ties break
    /// by seat order from the discarder.
    pub fn claim_priority(&self) -> u8 {
        match self {
            Action::Ron => 3,
            Action::Kan { .. } | Action::Pon { .. } => 2,
            Action::Chi { .. } => 1,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    GameStart,
    Dealing,
    PlayerDraw,
    PlayerDiscard,
    WaitingForResponse,
    ActionProcessing,
    HandOverScores,
    GameOver,
}
