//! Yaku and fu evaluation. `evaluate` searches every division of the
//! concealed tiles and every placement of the winning tile, keeping the
//! highest (han, fu) result.

use crate::agari::{self, Division, Group};
use crate::meld::{Meld, MeldKind};
use crate::tile::{TileCounts, DRAGON_WHITE, WIND_EAST};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Yaku {
    Riichi,
    DoubleRiichi,
    Ippatsu,
    MenzenTsumo,
    Pinfu,
    Tanyao,
    Yakuhai,
    Haitei,
    Houtei,
    Rinshan,
    Chankan,
    Chiitoitsu,
    Iipeikou,
    Ryanpeikou,
    SanshokuDoujun,
    SanshokuDoukou,
    Ittsuu,
    Chanta,
    Junchan,
    Toitoi,
    Sanankou,
    Sankantsu,
    Shousangen,
    Honroutou,
    Honitsu,
    Chinitsu,
    Dora,
    AkaDora,
    UraDora,
    // Yakuman
    KokushiMusou,
    Suuankou,
    Daisangen,
    Shousuushii,
    Daisuushii,
    Tsuuiisou,
    Chinroutou,
    Ryuuiisou,
    ChuurenPoutou,
    Suukantsu,
    Tenhou,
    Chiihou,
}

impl Yaku {
    pub fn name(&self) -> &'static str {
        match self {
            Yaku::Riichi => "riichi",
            Yaku::DoubleRiichi => "double riichi",
            Yaku::Ippatsu => "ippatsu",
            Yaku::MenzenTsumo => "menzen tsumo",
            Yaku::Pinfu => "pinfu",
            Yaku::Tanyao => "tanyao",
            Yaku::Yakuhai => "yakuhai",
            Yaku::Haitei => "haitei raoyue",
            Yaku::Houtei => "houtei raoyui",
            Yaku::Rinshan => "rinshan kaihou",
            Yaku::Chankan => "chankan",
            Yaku::Chiitoitsu => "chiitoitsu",
            Yaku::Iipeikou => "iipeikou",
            Yaku::Ryanpeikou => "ryanpeikou",
            Yaku::SanshokuDoujun => "sanshoku doujun",
            Yaku::SanshokuDoukou => "sanshoku doukou",
            Yaku::Ittsuu => "ittsuu",
            Yaku::Chanta => "chanta",
            Yaku::Junchan => "junchan",
            Yaku::Toitoi => "toitoi",
            Yaku::Sanankou => "sanankou",
            Yaku::Sankantsu => "sankantsu",
            Yaku::Shousangen => "shousangen",
            Yaku::Honroutou => "honroutou",
            Yaku::Honitsu => "honitsu",
            Yaku::Chinitsu => "chinitsu",
            Yaku::Dora => "dora",
            Yaku::AkaDora => "aka dora",
            Yaku::UraDora => "ura dora",
            Yaku::KokushiMusou => "kokushi musou",
            Yaku::Suuankou => "suuankou",
            Yaku::Daisangen => "daisangen",
            Yaku::Shousuushii => "shousuushii",
            Yaku::Daisuushii => "daisuushii",
            Yaku::Tsuuiisou => "tsuuiisou",
            Yaku::Chinroutou => "chinroutou",
            Yaku::Ryuuiisou => "ryuuiisou",
            Yaku::ChuurenPoutou => "chuuren poutou",
            Yaku::Suukantsu => "suukantsu",
            Yaku::Tenhou => "tenhou",
            Yaku::Chiihou => "chiihou",
        }
    }
}

/// Win circumstances feeding yaku evaluation. Winds use tile values
/// (27 = East).
#[derive(Debug, Clone)]
pub struct WinContext {
    pub is_menzen: bool,
    pub is_tsumo: bool,
    pub is_riichi: bool,
    pub is_double_riichi: bool,
    pub is_ippatsu: bool,
    pub is_haitei: bool,
    pub is_houtei: bool,
    pub is_rinshan: bool,
    pub is_chankan: bool,
    /// Dealer's untouched first draw (tenhou) or a non-dealer's (chiihou).
    pub is_first_turn_tsumo: bool,
    pub round_wind: u8,
    pub seat_wind: u8,
    pub dora_count: u8,
    pub aka_dora_count: u8,
    pub ura_dora_count: u8,
}

impl Default for WinContext {
    fn default() -> Self {
        Self {
            is_menzen: true,
            is_tsumo: false,
            is_riichi: false,
            is_double_riichi: false,
            is_ippatsu: false,
            is_haitei: false,
            is_houtei: false,
            is_rinshan: false,
            is_chankan: false,
            is_first_turn_tsumo: false,
            round_wind: WIND_EAST,
            seat_wind: WIND_EAST,
            dora_count: 0,
            aka_dora_count: 0,
            ura_dora_count: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct YakuResult {
    pub han: u8,
    pub fu: u8,
    pub yaku: Vec<(Yaku, u8)>,
    pub yakuman: bool,
}

impl YakuResult {
    fn yakuman(yaku: Yaku, han: u8) -> Self {
        YakuResult {
            han,
            fu: 0,
            yaku: vec![(yaku, han)],
            yakuman: true,
        }
    }

    fn better_than(&self, other: &YakuResult) -> bool {
        self.han > other.han || (self.han == other.han && self.fu > other.fu)
    }
}

/// Evaluates the best yaku/fu for a winning hand. `concealed` covers the
/// concealed tiles including the winning tile; melds are passed alongside.
/// Returns `han == 0` when no yaku exists (dora never satisfies the
/// one-han minimum on its own).
pub fn evaluate(
    concealed: &TileCounts,
    melds: &[Meld],
    ctx: &WinContext,
    win_tile: u8,
) -> YakuResult {
    if let Some(res) = check_yakuman(concealed, melds, ctx, win_tile) {
        return res;
    }

    let divisions = agari::find_divisions(concealed);
    let mut best = YakuResult::default();

    if divisions.is_empty() {
        if agari::is_chiitoitsu(concealed) {
            let mut res = YakuResult {
                han: 2,
                fu: 25,
                yaku: vec![(Yaku::Chiitoitsu, 2)],
                yakuman: false,
            };
            if is_tanyao(concealed, melds) {
                push(&mut res, Yaku::Tanyao, 1);
            }
            if is_chinitsu(concealed, melds) {
                push(&mut res, Yaku::Chinitsu, 6);
            } else if is_honitsu(concealed, melds) {
                push(&mut res, Yaku::Honitsu, 3);
            }
            if is_honroutou(concealed, melds) {
                push(&mut res, Yaku::Honroutou, 2);
            }
            apply_context_yaku(&mut res, ctx);
            apply_dora(&mut res, ctx);
            return res;
        }
        return best;
    }

    for div in &divisions {
        for wg in winning_group_placements(div, win_tile) {
            let res = evaluate_division(concealed, melds, ctx, div, wg, win_tile);
            if res.better_than(&best) {
                best = res;
            }
        }
    }
    best
}

/// Positions the winning tile could occupy: the pair (`None`) or a group
/// index.
fn winning_group_placements(div: &Division, win_tile: u8) -> Vec<Option<usize>> {
    let mut placements = Vec::new();
    if div.pair == win_tile {
        placements.push(None);
    }
    for (idx, g) in div.groups.iter().enumerate() {
        let hit = match g {
            Group::Triplet(t) => *t == win_tile,
            Group::Run(t) => win_tile >= *t && win_tile <= *t + 2,
        };
        if hit {
            placements.push(Some(idx));
        }
    }
    placements
}

fn push(res: &mut YakuResult, yaku: Yaku, han: u8) {
    res.han += han;
    res.yaku.push((yaku, han));
}

fn evaluate_division(
    concealed: &TileCounts,
    melds: &[Meld],
    ctx: &WinContext,
    div: &Division,
    wg_idx: Option<usize>,
    win_tile: u8,
) -> YakuResult {
    let mut res = YakuResult::default();

    // Suuankou: every group a concealed triplet. Ron into the fourth
    // triplet opens it, so it only counts on tsumo or a tanki wait.
    let closed_triplets = count_closed_triplets(div, melds, ctx, wg_idx);
    if closed_triplets == 4 {
        return YakuResult::yakuman(Yaku::Suuankou, 13);
    }

    apply_context_yaku(&mut res, ctx);
    if is_tanyao(concealed, melds) {
        push(&mut res, Yaku::Tanyao, 1);
    }

    if check_pinfu(div, melds, ctx, wg_idx, win_tile) {
        push(&mut res, Yaku::Pinfu, 1);
        res.fu = if ctx.is_tsumo { 20 } else { 30 };
    } else {
        res.fu = calculate_fu(div, melds, ctx, wg_idx, win_tile);
    }

    // Yakuhai triplets; double winds count twice.
    for value in [ctx.round_wind, ctx.seat_wind, 31, 32, 33] {
        if has_triplet_of(div, melds, value) {
            push(&mut res, Yaku::Yakuhai, 1);
        }
    }

    let dragon_triplets = (31..=33).filter(|&v| has_triplet_of(div, melds, v)).count();
    if dragon_triplets == 3 {
        return YakuResult::yakuman(Yaku::Daisangen, 13);
    }
    if dragon_triplets == 2 && (31..=33).contains(&div.pair) {
        push(&mut res, Yaku::Shousangen, 2);
    }

    let wind_triplets = (27..=30).filter(|&v| has_triplet_of(div, melds, v)).count();
    if wind_triplets == 4 {
        return YakuResult::yakuman(Yaku::Daisuushii, 26);
    }
    if wind_triplets == 3 && (27..=30).contains(&div.pair) {
        return YakuResult::yakuman(Yaku::Shousuushii, 13);
    }

    let triplet_total = div
        .groups
        .iter()
        .filter(|g| matches!(g, Group::Triplet(_)))
        .count()
        + melds.iter().filter(|m| m.is_triplet()).count();
    if triplet_total == 4 {
        push(&mut res, Yaku::Toitoi, 2);
    }
    if closed_triplets == 3 {
        push(&mut res, Yaku::Sanankou, 2);
    }

    let kan_count = melds.iter().filter(|m| m.is_kan()).count();
    if kan_count == 3 {
        push(&mut res, Yaku::Sankantsu, 2);
    }

    if ctx.is_menzen {
        match identical_run_pairs(div) {
            2 => push(&mut res, Yaku::Ryanpeikou, 3),
            1 => push(&mut res, Yaku::Iipeikou, 1),
            _ => {}
        }
    }

    if check_ittsuu(div, melds) {
        push(&mut res, Yaku::Ittsuu, if ctx.is_menzen { 2 } else { 1 });
    }
    if check_sanshoku_doujun(div, melds) {
        push(&mut res, Yaku::SanshokuDoujun, if ctx.is_menzen { 2 } else { 1 });
    }
    if check_sanshoku_doukou(div, melds) {
        push(&mut res, Yaku::SanshokuDoukou, 2);
    }

    if is_chinitsu(concealed, melds) {
        push(&mut res, Yaku::Chinitsu, if ctx.is_menzen { 6 } else { 5 });
    } else if is_honitsu(concealed, melds) {
        push(&mut res, Yaku::Honitsu, if ctx.is_menzen { 3 } else { 2 });
    }

    if is_honroutou(concealed, melds) {
        push(&mut res, Yaku::Honroutou, 2);
    } else if check_junchan(div, melds) {
        push(&mut res, Yaku::Junchan, if ctx.is_menzen { 3 } else { 2 });
    } else if check_chanta(div, melds) {
        push(&mut res, Yaku::Chanta, if ctx.is_menzen { 2 } else { 1 });
    }

    apply_dora(&mut res, ctx);
    res
}

fn apply_context_yaku(res: &mut YakuResult, ctx: &WinContext) {
    if ctx.is_double_riichi {
        push(res, Yaku::DoubleRiichi, 2);
    } else if ctx.is_riichi {
        push(res, Yaku::Riichi, 1);
    }
    if ctx.is_ippatsu {
        push(res, Yaku::Ippatsu, 1);
    }
    if ctx.is_menzen && ctx.is_tsumo {
        push(res, Yaku::MenzenTsumo, 1);
    }
    if ctx.is_haitei {
        push(res, Yaku::Haitei, 1);
    }
    if ctx.is_houtei {
        push(res, Yaku::Houtei, 1);
    }
    if ctx.is_rinshan {
        push(res, Yaku::Rinshan, 1);
    }
    if ctx.is_chankan {
        push(res, Yaku::Chankan, 1);
    }
}

fn apply_dora(res: &mut YakuResult, ctx: &WinContext) {
    // Dora never stands alone.
    if res.yaku.is_empty() {
        res.han = 0;
        return;
    }
    if ctx.dora_count > 0 {
        push(res, Yaku::Dora, ctx.dora_count);
    }
    if ctx.aka_dora_count > 0 {
        push(res, Yaku::AkaDora, ctx.aka_dora_count);
    }
    if ctx.ura_dora_count > 0 {
        push(res, Yaku::UraDora, ctx.ura_dora_count);
    }
}

fn check_yakuman(
    concealed: &TileCounts,
    melds: &[Meld],
    ctx: &WinContext,
    win_tile: u8,
) -> Option<YakuResult> {
    if melds.is_empty() && agari::is_kokushi(concealed) {
        // Thirteen-sided wait pays double.
        let han = if concealed.get(win_tile) == 2 { 26 } else { 13 };
        return Some(YakuResult::yakuman(Yaku::KokushiMusou, han));
    }

    if ctx.is_first_turn_tsumo && melds.is_empty() {
        let yaku = if ctx.seat_wind == WIND_EAST {
            Yaku::Tenhou
        } else {
            Yaku::Chiihou
        };
        return Some(YakuResult::yakuman(yaku, 13));
    }

    let all_tiles = full_counts(concealed, melds);

    // All four wind triplets outrank the plain all-honors yakuman.
    if (27..=30u8).all(|v| all_tiles.get(v) >= 3) {
        return Some(YakuResult::yakuman(Yaku::Daisuushii, 26));
    }

    if all_tiles
        .counts
        .iter()
        .enumerate()
        .all(|(i, &c)| c == 0 || i >= 27)
    {
        return Some(YakuResult::yakuman(Yaku::Tsuuiisou, 13));
    }

    if all_tiles
        .counts
        .iter()
        .enumerate()
        .all(|(i, &c)| c == 0 || (i < 27 && matches!(i % 9, 0 | 8)))
    {
        return Some(YakuResult::yakuman(Yaku::Chinroutou, 13));
    }

    // Greens: 2,3,4,6,8 sou and hatsu.
    const GREENS: [usize; 6] = [19, 20, 21, 23, 25, 32];
    if all_tiles
        .counts
        .iter()
        .enumerate()
        .all(|(i, &c)| c == 0 || GREENS.contains(&i))
    {
        return Some(YakuResult::yakuman(Yaku::Ryuuiisou, 13));
    }

    if melds.len() == 4 && melds.iter().all(|m| m.is_kan()) {
        return Some(YakuResult::yakuman(Yaku::Suukantsu, 13));
    }

    if melds.is_empty() && check_chuuren(concealed) {
        return Some(YakuResult::yakuman(Yaku::ChuurenPoutou, 13));
    }

    None
}

fn full_counts(concealed: &TileCounts, melds: &[Meld]) -> TileCounts {
    let mut all = *concealed;
    for m in melds {
        for t in &m.tiles {
            all.add(t.value());
        }
    }
    all
}

/// 1112345678999 + one extra tile, all one suit, fully concealed.
fn check_chuuren(concealed: &TileCounts) -> bool {
    for suit in 0..3usize {
        let base = suit * 9;
        let in_suit: u8 = (0..9).map(|r| concealed.counts[base + r]).sum();
        if in_suit != concealed.total() {
            continue;
        }
        let mut extra = 0;
        let mut ok = true;
        for r in 0..9 {
            let need = if r == 0 || r == 8 { 3 } else { 1 };
            let c = concealed.counts[base + r];
            if c < need {
                ok = false;
                break;
            }
            extra += c - need;
        }
        if ok && extra == 1 {
            return true;
        }
    }
    false
}

fn count_closed_triplets(
    div: &Division,
    melds: &[Meld],
    ctx: &WinContext,
    wg_idx: Option<usize>,
) -> usize {
    let mut count = 0;
    for (idx, g) in div.groups.iter().enumerate() {
        if let Group::Triplet(_) = g {
            // A triplet completed by ron counts as open.
            if !ctx.is_tsumo && Some(idx) == wg_idx {
                continue;
            }
            count += 1;
        }
    }
    count + melds.iter().filter(|m| m.is_concealed()).count()
}

fn has_triplet_of(div: &Division, melds: &[Meld], value: u8) -> bool {
    div.groups
        .iter()
        .any(|g| matches!(g, Group::Triplet(t) if *t == value))
        || melds
            .iter()
            .any(|m| m.is_triplet() && m.base_value() == value)
}

fn identical_run_pairs(div: &Division) -> usize {
    let mut runs: Vec<u8> = div
        .groups
        .iter()
        .filter_map(|g| match g {
            Group::Run(t) => Some(*t),
            _ => None,
        })
        .collect();
    runs.sort_unstable();
    let mut pairs = 0;
    let mut i = 0;
    while i + 1 < runs.len() {
        if runs[i] == runs[i + 1] {
            pairs += 1;
            i += 2;
        } else {
            i += 1;
        }
    }
    pairs
}

fn calculate_fu(
    div: &Division,
    melds: &[Meld],
    ctx: &WinContext,
    wg_idx: Option<usize>,
    win_tile: u8,
) -> u8 {
    let mut fu = 20u8;
    if ctx.is_tsumo {
        fu += 2;
    } else if ctx.is_menzen {
        fu += 10;
    }

    if div.pair == ctx.round_wind {
        fu += 2;
    }
    if div.pair == ctx.seat_wind {
        fu += 2;
    }
    if div.pair >= DRAGON_WHITE {
        fu += 2;
    }

    match wg_idx {
        None => fu += 2, // tanki
        Some(idx) => {
            if let Group::Run(t) = div.groups[idx] {
                let kanchan = win_tile == t + 1;
                let penchan = (win_tile == t + 2 && t % 9 == 0) || (win_tile == t && t % 9 == 6);
                if kanchan || penchan {
                    fu += 2;
                }
            }
        }
    }

    for (idx, g) in div.groups.iter().enumerate() {
        if let Group::Triplet(t) = g {
            // Ron into a triplet makes it open.
            let mut f = if !ctx.is_tsumo && Some(idx) == wg_idx { 2 } else { 4 };
            if crate::tile::is_terminal_or_honor_value(*t) {
                f *= 2;
            }
            fu += f;
        }
    }
    for m in melds {
        if !m.is_triplet() {
            continue;
        }
        let mut f = if m.is_concealed() { 4 } else { 2 };
        if crate::tile::is_terminal_or_honor_value(m.base_value()) {
            f *= 2;
        }
        if m.is_kan() {
            f *= 4;
        }
        fu += f;
    }

    // Open ron floor.
    if fu == 20 && !ctx.is_tsumo {
        fu = 30;
    }

    fu.div_ceil(10) * 10
}

fn check_pinfu(
    div: &Division,
    melds: &[Meld],
    ctx: &WinContext,
    wg_idx: Option<usize>,
    win_tile: u8,
) -> bool {
    if !ctx.is_menzen || !melds.is_empty() {
        return false;
    }
    if div.groups.iter().any(|g| matches!(g, Group::Triplet(_))) {
        return false;
    }
    if div.pair >= DRAGON_WHITE || div.pair == ctx.round_wind || div.pair == ctx.seat_wind {
        return false;
    }
    // Two-sided wait only.
    if let Some(idx) = wg_idx {
        if let Group::Run(t) = div.groups[idx] {
            if win_tile == t {
                return t % 9 != 6;
            }
            if win_tile == t + 2 {
                return t % 9 != 0;
            }
        }
    }
    false
}

fn is_tanyao(concealed: &TileCounts, melds: &[Meld]) -> bool {
    let all = full_counts(concealed, melds);
    all.counts
        .iter()
        .enumerate()
        .all(|(i, &c)| c == 0 || !crate::tile::is_terminal_or_honor_value(i as u8))
}

fn is_honroutou(concealed: &TileCounts, melds: &[Meld]) -> bool {
    let all = full_counts(concealed, melds);
    all.counts
        .iter()
        .enumerate()
        .all(|(i, &c)| c == 0 || crate::tile::is_terminal_or_honor_value(i as u8))
}

fn suits_used(concealed: &TileCounts, melds: &[Meld]) -> ([bool; 3], bool) {
    let all = full_counts(concealed, melds);
    let mut suits = [false; 3];
    let mut honors = false;
    for (i, &c) in all.counts.iter().enumerate() {
        if c == 0 {
            continue;
        }
        if i >= 27 {
            honors = true;
        } else {
            suits[i / 9] = true;
        }
    }
    (suits, honors)
}

fn is_honitsu(concealed: &TileCounts, melds: &[Meld]) -> bool {
    let (suits, honors) = suits_used(concealed, melds);
    honors && suits.iter().filter(|&&b| b).count() == 1
}

fn is_chinitsu(concealed: &TileCounts, melds: &[Meld]) -> bool {
    let (suits, honors) = suits_used(concealed, melds);
    !honors && suits.iter().filter(|&&b| b).count() == 1
}

fn number_terminal(value: u8) -> bool {
    value < 27 && matches!(value % 9, 0 | 8)
}

fn group_has_terminal(g: &Group) -> bool {
    match g {
        Group::Triplet(t) => number_terminal(*t),
        Group::Run(t) => number_terminal(*t) || number_terminal(t + 2),
    }
}

fn check_junchan(div: &Division, melds: &[Meld]) -> bool {
    if !number_terminal(div.pair) {
        return false;
    }
    if !div.groups.iter().all(group_has_terminal) {
        return false;
    }
    melds
        .iter()
        .all(|m| m.tiles.iter().any(|t| number_terminal(t.value())))
}

fn check_chanta(div: &Division, melds: &[Meld]) -> bool {
    if !crate::tile::is_terminal_or_honor_value(div.pair) {
        return false;
    }
    let mut has_honor = div.pair >= 27;
    for g in div.groups.iter() {
        match g {
            Group::Triplet(t) => {
                if !crate::tile::is_terminal_or_honor_value(*t) {
                    return false;
                }
                if *t >= 27 {
                    has_honor = true;
                }
            }
            Group::Run(_) => {
                if !group_has_terminal(g) {
                    return false;
                }
            }
        }
    }
    for m in melds {
        if !m
            .tiles
            .iter()
            .any(|t| crate::tile::is_terminal_or_honor_value(t.value()))
        {
            return false;
        }
        if m.tiles.iter().any(|t| t.value() >= 27) {
            has_honor = true;
        }
    }
    has_honor
}

fn check_ittsuu(div: &Division, melds: &[Meld]) -> bool {
    for offset in [0u8, 9, 18] {
        let mut parts = [false; 3];
        for g in &div.groups {
            if let Group::Run(t) = g {
                for (k, &start) in [offset, offset + 3, offset + 6].iter().enumerate() {
                    if *t == start {
                        parts[k] = true;
                    }
                }
            }
        }
        for m in melds {
            if m.kind == MeldKind::Chi {
                for (k, &start) in [offset, offset + 3, offset + 6].iter().enumerate() {
                    if m.base_value() == start {
                        parts[k] = true;
                    }
                }
            }
        }
        if parts.iter().all(|&b| b) {
            return true;
        }
    }
    false
}

fn check_sanshoku_doujun(div: &Division, melds: &[Meld]) -> bool {
    for i in 0u8..7 {
        let mut suits = [false; 3];
        for g in &div.groups {
            if let Group::Run(t) = g {
                for s in 0..3 {
                    if *t == i + 9 * s as u8 {
                        suits[s] = true;
                    }
                }
            }
        }
        for m in melds {
            if m.kind == MeldKind::Chi {
                for s in 0..3 {
                    if m.base_value() == i + 9 * s as u8 {
                        suits[s] = true;
                    }
                }
            }
        }
        if suits.iter().all(|&b| b) {
            return true;
        }
    }
    false
}

fn check_sanshoku_doukou(div: &Division, melds: &[Meld]) -> bool {
    for i in 0u8..9 {
        let mut suits = [false; 3];
        for g in &div.groups {
            if let Group::Triplet(t) = g {
                for s in 0..3 {
                    if *t == i + 9 * s as u8 {
                        suits[s] = true;
                    }
                }
            }
        }
        for m in melds {
            if m.is_triplet() {
                for s in 0..3 {
                    if m.base_value() == i + 9 * s as u8 {
                        suits[s] = true;
                    }
                }
            }
        }
        if suits.iter().all(|&b| b) {
            return true;
        }
    }
    false
}
