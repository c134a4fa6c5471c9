//! Win evaluation: combines shape analysis, dora counting, and yaku
//! scoring for a single seat's completed hand.

use crate::agari;
use crate::meld::Meld;
use crate::tile::{next_dora_value, Tile, TileCounts};
use crate::yaku::{self, WinContext, Yaku};

/// Scored win for one seat.
#[derive(Debug, Clone)]
pub struct WinDetails {
    pub winning_tile: Tile,
    pub han: u8,
    pub fu: u8,
    pub yaku: Vec<(Yaku, u8)>,
    pub yakuman: bool,
}

/// Whether the concealed tiles (including the winning tile) plus melds
/// form a completed hand, ignoring yaku.
pub fn has_winning_shape(concealed: &TileCounts, melds: &[Meld]) -> bool {
    if melds.is_empty() {
        agari::is_agari(concealed)
    } else {
        agari::is_standard_agari(concealed)
    }
}

/// Evaluates a win candidate. `concealed` includes the winning tile;
/// `aka_count` covers red fives across the hand, melds, and the winning
/// tile. Returns `None` when the shape is incomplete or no yaku exists.
pub fn evaluate_win(
    concealed: &TileCounts,
    melds: &[Meld],
    aka_count: u8,
    win_tile: Tile,
    dora_indicators: &[Tile],
    ura_indicators: &[Tile],
    mut ctx: WinContext,
) -> Option<WinDetails> {
    if !has_winning_shape(concealed, melds) {
        return None;
    }

    let mut all = *concealed;
    for m in melds {
        for t in &m.tiles {
            all.add(t.value());
        }
    }

    ctx.dora_count = count_dora(&all, dora_indicators);
    ctx.ura_dora_count = count_dora(&all, ura_indicators);
    ctx.aka_dora_count = aka_count;

    let result = yaku::evaluate(concealed, melds, &ctx, win_tile.value());
    if result.han == 0 {
        return None;
    }
    Some(WinDetails {
        winning_tile: win_tile,
        han: result.han,
        fu: result.fu,
        yaku: result.yaku,
        yakuman: result.yakuman,
    })
}

fn count_dora(all: &TileCounts, indicators: &[Tile]) -> u8 {
    let mut count = 0u8;
    for ind in indicators {
        count += all.get(next_dora_value(ind.value()));
    }
    count
}
