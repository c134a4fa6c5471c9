//! Four-player riichi mahjong rules engine: tile and action model, wall,
//! hand analysis, yaku and scoring, call validation, and the phase state
//! machine driving a full game.

pub mod action;
pub mod agari;
pub mod errors;
pub mod meld;
pub mod rule;
pub mod score;
pub mod state;
pub mod tile;
pub mod win;
pub mod yaku;

mod tests;

pub use action::{Action, KanKind, Phase};
pub use errors::{EngineError, EngineResult};
pub use meld::{Meld, MeldKind};
pub use rule::{GameLength, GameRule, KanDoraTiming};
pub use state::{
    AbortiveReason, ApplyResult, GameState, HandEndKind, HandOutcome, NextHandParams,
};
pub use tile::{Tile, TileCounts};
pub use win::WinDetails;
pub use yaku::{WinContext, Yaku};
