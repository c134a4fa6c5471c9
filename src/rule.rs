use serde::{Deserialize, Serialize};

/// When a kan's dora indicator flips relative to the replacement draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KanDoraTiming {
    BeforeReplacementDraw,
    AfterReplacementDraw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameLength {
    /// East round only.
    Tonpuusen,
    /// East and South rounds.
    Hanchan,
}

impl GameLength {
    /// Last round wind played under this length (0 = East).
    pub fn max_round_wind(&self) -> u8 {
        match self {
            GameLength::Tonpuusen => 0,
            GameLength::Hanchan => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameRule {
    pub game_length: GameLength,
    pub starting_score: i32,
    /// Red fives per number suit, 0 or 1.
    pub red_fives_per_suit: u8,
    /// Closed kans conventionally flip before the replacement draw,
    /// added/open kans after the following discard settles.
    pub closed_kan_dora_timing: KanDoraTiming,
    pub open_kan_dora_timing: KanDoraTiming,
    /// Forbid discarding a tile interchangeable with the one just called.
    pub kuikae: bool,
    /// Allow ron on a closed kan for a kokushi musou wait.
    pub allows_ron_on_ankan_for_kokushi_musou: bool,
}

impl Default for GameRule {
    fn default() -> Self {
        Self::default_hanchan()
    }
}

impl GameRule {
    pub fn default_hanchan() -> Self {
        Self {
            game_length: GameLength::Hanchan,
            starting_score: 25000,
            red_fives_per_suit: 1,
            closed_kan_dora_timing: KanDoraTiming::BeforeReplacementDraw,
            open_kan_dora_timing: KanDoraTiming::AfterReplacementDraw,
            kuikae: true,
            allows_ron_on_ankan_for_kokushi_musou: false,
        }
    }

    pub fn default_tonpuusen() -> Self {
        Self {
            game_length: GameLength::Tonpuusen,
            ..Self::default_hanchan()
        }
    }
}
