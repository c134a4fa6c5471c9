use crate::action::{Action, KanKind};
use crate::agari;
use crate::meld::MeldKind;
use crate::state::GameState;
use crate::tile::{Tile, TILE_KINDS};
use crate::win;

/// Legal-move enumeration for both decision points: a seat holding its
/// drawn tile, and seats responding to a discard or kan.
pub trait GameStateLegalActions {
    fn turn_actions(&self, seat: u8) -> Vec<Action>;
    /// Claims available to `seat` against `tile` discarded by `discarder`.
    /// The second value reports a winning shape that failed the yaku or
    /// furiten gate, which still triggers temporary furiten.
    fn claim_actions_for(&self, seat: u8, discarder: u8, tile: Tile) -> (Vec<Action>, bool);
    /// Seats that may rob the kan, in order from the kan declarer's right.
    fn chankan_claimants(&self, kan_seat: u8, tile: Tile, closed: bool) -> Vec<u8>;
}

impl GameStateLegalActions for GameState {
    fn turn_actions(&self, seat: u8) -> Vec<Action> {
        let mut legals = Vec::new();
        let p = &self.players[seat as usize];
        let Some(drawn) = p.drawn_tile else {
            // After a chi or pon the only move is a discard.
            for t in distinct_tiles(&p.hand, None) {
                if !p.forbidden_discards.contains(&t.value()) {
                    legals.push(Action::Discard { tile: t });
                }
            }
            return legals;
        };

        // Tsumo
        let concealed = p.concealed_counts();
        let ctx = self.win_context(seat, true, false);
        if win::evaluate_win(
            &concealed,
            &p.melds,
            self.aka_count(seat, None),
            drawn,
            &self.wall.dora_indicators(),
            &[],
            ctx,
        )
        .is_some()
        {
            legals.push(Action::Tsumo);
        }

        // Discards
        if p.riichi_declared {
            legals.push(Action::Discard { tile: drawn });
        } else {
            for t in distinct_tiles(&p.hand, Some(drawn)) {
                if !p.forbidden_discards.contains(&t.value()) {
                    legals.push(Action::Discard { tile: t });
                }
            }

            // Riichi, one action per discard that keeps tenpai
            if p.is_menzen() && p.score >= 1000 && self.wall.live_count() >= 4 {
                for t in distinct_tiles(&p.hand, Some(drawn)) {
                    let mut counts = concealed;
                    counts.remove(t.value());
                    if agari::is_tenpai(&counts) {
                        legals.push(Action::Riichi { discard: t });
                    }
                }
            }
        }

        // Kans need a live tile for the turn after and a replacement left
        let kan_possible = self.wall.live_count() > 0
            && self.wall.replacement_draws() < crate::state::wall::MAX_REPLACEMENT_DRAWS;
        if kan_possible {
            if p.riichi_declared {
                self.push_riichi_ankan(&mut legals, seat, drawn);
            } else {
                for value in 0..TILE_KINDS as u8 {
                    if concealed.get(value) == 4 {
                        legals.push(Action::Kan {
                            kind: KanKind::Closed,
                            tile: Tile::from_value(value),
                        });
                    }
                }
                for m in &p.melds {
                    if m.kind != MeldKind::Pon {
                        continue;
                    }
                    let value = m.base_value();
                    if let Some(t) = find_tile(p, value) {
                        legals.push(Action::Kan {
                            kind: KanKind::Added,
                            tile: t,
                        });
                    }
                }
            }
        }

        // Nine distinct terminals on an untouched first draw
        if self.is_first_turn
            && self.players.iter().all(|q| q.melds.is_empty())
            && p.discards.is_empty()
        {
            let distinct = (0..TILE_KINDS as u8)
                .filter(|&v| {
                    crate::tile::is_terminal_or_honor_value(v) && concealed.get(v) > 0
                })
                .count();
            if distinct >= 9 {
                legals.push(Action::AbortiveDraw);
            }
        }

        legals
    }

    fn claim_actions_for(&self, seat: u8, discarder: u8, tile: Tile) -> (Vec<Action>, bool) {
        let mut legals = Vec::new();
        let mut missed_shape = false;
        let p = &self.players[seat as usize];
        let value = tile.value();

        // Ron
        let waits = agari::wait_tiles(&p.hand_counts());
        let discard_furiten = waits
            .iter()
            .any(|&w| p.discards.iter().any(|d| d.value() == w));
        let furiten = discard_furiten || p.temporary_furiten || p.permanent_furiten;
        if !furiten && waits.contains(&value) {
            let mut concealed = p.hand_counts();
            concealed.add(value);
            let ctx = self.win_context(seat, false, false);
            if win::evaluate_win(
                &concealed,
                &p.melds,
                self.aka_count(seat, Some(tile)),
                tile,
                &self.wall.dora_indicators(),
                &[],
                ctx,
            )
            .is_some()
            {
                legals.push(Action::Ron);
            } else {
                // Complete shape without yaku still burns the go-around.
                missed_shape = true;
            }
        } else if waits.contains(&value) {
            missed_shape = true;
        }

        let calls_open = !p.riichi_declared && self.wall.live_count() > 0;

        // Pon / open kan
        if calls_open {
            let matching = p.count_in_hand(value);
            if matching >= 2 && self.has_discard_after_call(p, value, &[value]) {
                legals.push(Action::Pon { tile });
            }
            if matching >= 3
                && self.wall.replacement_draws() < crate::state::wall::MAX_REPLACEMENT_DRAWS
            {
                legals.push(Action::Kan {
                    kind: KanKind::Open,
                    tile,
                });
            }
        }

        // Chi, next seat only
        if calls_open && seat == (discarder + 1) % 4 && value < 27 {
            let rank = value % 9;
            let mut patterns: Vec<[u8; 2]> = Vec::new();
            if rank >= 2 {
                patterns.push([value - 2, value - 1]);
            }
            if (1..=7).contains(&rank) {
                patterns.push([value - 1, value + 1]);
            }
            if rank <= 6 {
                patterns.push([value + 1, value + 2]);
            }
            for pat in patterns {
                let forbidden = self.chi_forbidden_values(value, pat);
                for pair in tile_pairs(p, pat[0], pat[1]) {
                    if self.has_discard_after_chi(p, &pair, &forbidden) {
                        legals.push(Action::Chi { tiles: pair });
                    }
                }
            }
        }

        (legals, missed_shape)
    }

    fn chankan_claimants(&self, kan_seat: u8, tile: Tile, closed: bool) -> Vec<u8> {
        let mut claimants = Vec::new();
        for offset in 1..4u8 {
            let seat = (kan_seat + offset) % 4;
            let p = &self.players[seat as usize];
            let mut concealed = p.hand_counts();
            concealed.add(tile.value());

            if closed {
                // Only a kokushi wait can rob a closed kan.
                if !self.rule.allows_ron_on_ankan_for_kokushi_musou
                    || !p.melds.is_empty()
                    || !agari::is_kokushi(&concealed)
                {
                    continue;
                }
            }

            let waits = agari::wait_tiles(&p.hand_counts());
            let discard_furiten = waits
                .iter()
                .any(|&w| p.discards.iter().any(|d| d.value() == w));
            if discard_furiten || p.temporary_furiten || p.permanent_furiten {
                continue;
            }

            let mut ctx = self.win_context(seat, false, true);
            ctx.is_chankan = true;
            if win::evaluate_win(
                &concealed,
                &p.melds,
                self.aka_count(seat, Some(tile)),
                tile,
                &self.wall.dora_indicators(),
                &[],
                ctx,
            )
            .is_some()
            {
                claimants.push(seat);
            }
        }
        claimants
    }
}

impl GameState {
    /// Riichi players may only kan the drawn tile, and only when the kan
    /// leaves their waits untouched.
    fn push_riichi_ankan(&self, legals: &mut Vec<Action>, seat: u8, drawn: Tile) {
        let p = &self.players[seat as usize];
        let value = drawn.value();
        if p.concealed_counts().get(value) != 4 {
            return;
        }
        let waits_pre = agari::wait_tiles(&p.hand_counts());
        let mut counts_post = p.hand_counts();
        while counts_post.get(value) > 0 {
            counts_post.remove(value);
        }
        let waits_post = agari::wait_tiles(&counts_post);
        if !waits_pre.is_empty() && waits_pre == waits_post {
            legals.push(Action::Kan {
                kind: KanKind::Closed,
                tile: Tile::from_value(value),
            });
        }
    }

    /// A pon must leave at least one discardable tile behind.
    fn has_discard_after_call(
        &self,
        p: &crate::state::player::PlayerState,
        called_value: u8,
        forbidden: &[u8],
    ) -> bool {
        let mut consumed = 0;
        for t in &p.hand {
            if consumed < 2 && t.value() == called_value {
                consumed += 1;
                continue;
            }
            if !self.rule.kuikae || !forbidden.contains(&t.value()) {
                return true;
            }
        }
        false
    }

    fn has_discard_after_chi(
        &self,
        p: &crate::state::player::PlayerState,
        consumed: &[Tile; 2],
        forbidden: &[u8],
    ) -> bool {
        let mut used = [false; 2];
        for t in &p.hand {
            let mut eaten = false;
            for (i, c) in consumed.iter().enumerate() {
                if !used[i] && *t == *c {
                    used[i] = true;
                    eaten = true;
                    break;
                }
            }
            if eaten {
                continue;
            }
            if !self.rule.kuikae || !forbidden.contains(&t.value()) {
                return true;
            }
        }
        false
    }

    /// Values locked after a chi: the claimed value, plus the far flank
    /// of an open-ended run.
    pub(crate) fn chi_forbidden_values(&self, claimed: u8, consumed: [u8; 2]) -> Vec<u8> {
        if !self.rule.kuikae {
            return Vec::new();
        }
        let mut forbidden = vec![claimed];
        let rank = claimed % 9;
        if consumed == [claimed + 1, claimed + 2] && rank <= 5 {
            forbidden.push(claimed + 3);
        } else if rank >= 3 && consumed == [claimed - 2, claimed - 1] {
            forbidden.push(claimed - 3);
        }
        forbidden
    }
}

/// Distinct discard candidates: hand tiles plus the drawn tile, deduped
/// on value and red flag.
fn distinct_tiles(hand: &[Tile], drawn: Option<Tile>) -> Vec<Tile> {
    let mut tiles: Vec<Tile> = hand.to_vec();
    if let Some(t) = drawn {
        tiles.push(t);
    }
    tiles.sort_unstable();
    tiles.dedup();
    tiles
}

fn find_tile(p: &crate::state::player::PlayerState, value: u8) -> Option<Tile> {
    if let Some(t) = p.drawn_tile {
        if t.value() == value {
            return Some(t);
        }
    }
    p.hand.iter().copied().find(|t| t.value() == value)
}

/// Pairs of hand tiles with the given values, distinct per red flag.
fn tile_pairs(p: &crate::state::player::PlayerState, v1: u8, v2: u8) -> Vec<[Tile; 2]> {
    let mut firsts: Vec<Tile> = p.hand.iter().copied().filter(|t| t.value() == v1).collect();
    let mut seconds: Vec<Tile> = p.hand.iter().copied().filter(|t| t.value() == v2).collect();
    firsts.dedup();
    seconds.dedup();
    let mut pairs = Vec::new();
    for &a in &firsts {
        for &b in &seconds {
            pairs.push([a, b]);
        }
    }
    pairs
}
