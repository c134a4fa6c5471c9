//! Game state controller. `GameState` is the single owner of all mutable
//! hand and match state; callers drive it through `legal_actions` and
//! `apply`, and the controller advances every automatic step (deals,
//! draws, replacement draws, settlement) on its own.

use ahash::AHashMap;
use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::action::{Action, KanKind, Phase};
use crate::agari;
use crate::errors::{EngineError, EngineResult};
use crate::meld::{Meld, MeldKind};
use crate::rule::{GameRule, KanDoraTiming};
use crate::score;
use crate::tile::{Tile, WIND_EAST};
use crate::win::{self, WinDetails};
use crate::yaku::WinContext;

pub mod legal_actions;
pub mod player;
pub mod wall;

use legal_actions::GameStateLegalActions;
use player::PlayerState;
use wall::WallState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbortiveReason {
    NineTerminals,
    FourWinds,
    FourRiichi,
    FourKans,
    ReplacementExhaustion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandEndKind {
    Tsumo { winner: u8 },
    Ron { winner: u8, loser: u8 },
    ExhaustiveDraw,
    Abortive(AbortiveReason),
}

/// Final record of a hand, available once the phase reaches
/// `HandOverScores`. Score deltas exclude carried-over riichi sticks on
/// draws but include them on wins.
#[derive(Debug, Clone)]
pub struct HandOutcome {
    pub kind: HandEndKind,
    pub score_deltas: [i32; 4],
    pub win: Option<WinDetails>,
    pub tenpai: [bool; 4],
}

/// Parameters the next hand would start with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextHandParams {
    pub dealer: u8,
    pub round_wind: u8,
    pub honba: u32,
    pub game_over: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyResult {
    pub phase: Phase,
    pub hand_finished: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Discard,
    AddedKan,
    ClosedKan,
}

/// Payload of the `WaitingForResponse` phase: who may still respond to
/// what, and what they have declared so far.
#[derive(Debug, Clone)]
pub struct ResponseState {
    pub kind: ResponseKind,
    pub from_seat: u8,
    pub tile: Tile,
    /// Responding seats, counter-clockwise from the acting seat.
    pub order: Vec<u8>,
    pub options: AHashMap<u8, Vec<Action>>,
    pub declarations: AHashMap<u8, Action>,
}

/// A declared kan held back while the robbery window is open. The tiles
/// stay in the declarer's hand until every responder passes.
#[derive(Debug, Clone, Copy)]
pub struct PendingKan {
    pub seat: u8,
    pub kind: KanKind,
    pub tile: Tile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    StartHand { dealer: u8, round_wind: u8, honba: u32 },
    Draw { seat: u8 },
    Discard { seat: u8, tile: Tile, riichi: bool },
    Call { seat: u8, from: u8, kind: MeldKind, tile: Tile },
    RiichiAccepted { seat: u8 },
    DoraRevealed { indicator: Tile },
    Win { seat: u8, from: Option<u8>, han: u8, fu: u8 },
    HandDrawn { exhaustive: bool },
}

#[derive(Debug, Clone)]
pub struct GameState {
    pub rule: GameRule,
    pub wall: WallState,
    pub players: [PlayerState; 4],

    pub phase: Phase,
    pub current_player: u8,
    pub dealer: u8,
    pub round_wind: u8,
    pub honba: u32,
    pub riichi_sticks: u32,

    pub last_discard: Option<(u8, Tile)>,
    pub response: Option<ResponseState>,
    pub pending_kan: Option<PendingKan>,

    pub is_rinshan_flag: bool,
    pub is_first_turn: bool,

    pub outcome: Option<HandOutcome>,
    pub events: Vec<GameEvent>,

    deferred_kan_dora: u8,
    seed: Option<u64>,
}

impl GameState {
    pub fn new(rule: GameRule) -> Self {
        let starting = rule.starting_score;
        Self {
            rule,
            wall: WallState::new(None),
            players: [
                PlayerState::new(starting),
                PlayerState::new(starting),
                PlayerState::new(starting),
                PlayerState::new(starting),
            ],
            phase: Phase::GameStart,
            current_player: 0,
            dealer: 0,
            round_wind: 0,
            honba: 0,
            riichi_sticks: 0,
            last_discard: None,
            response: None,
            pending_kan: None,
            is_rinshan_flag: false,
            is_first_turn: true,
            outcome: None,
            events: Vec::new(),
            deferred_kan_dora: 0,
            seed: None,
        }
    }

    /// Resets scores and round markers and deals the first hand.
    pub fn reset_game(&mut self, seed: Option<u64>) -> EngineResult<()> {
        self.seed = seed;
        self.wall = WallState::new(seed);
        for p in self.players.iter_mut() {
            p.reset_hand();
            p.score = self.rule.starting_score;
        }
        self.dealer = 0;
        self.round_wind = 0;
        self.honba = 0;
        self.riichi_sticks = 0;
        self.events.clear();
        self.outcome = None;
        self.phase = Phase::GameStart;
        self.start_new_hand()
    }

    /// Advances past `HandOverScores` into the next hand, or `GameOver`.
    pub fn reset_new_hand(&mut self) -> EngineResult<()> {
        if self.phase != Phase::HandOverScores {
            return Err(EngineError::IllegalAction(
                "no finished hand to advance from".into(),
            ));
        }
        let params = self.next_hand_parameters().ok_or_else(|| {
            EngineError::InternalInvariant("finished hand without outcome".into())
        })?;
        if params.game_over {
            self.phase = Phase::GameOver;
            return Ok(());
        }
        self.dealer = params.dealer;
        self.round_wind = params.round_wind;
        self.honba = params.honba;
        self.start_new_hand()
    }

    pub fn hand_outcome(&self) -> Option<&HandOutcome> {
        self.outcome.as_ref()
    }

    /// Serializes the event log as a JSON array.
    pub fn events_json(&self) -> EngineResult<String> {
        serde_json::to_string(&self.events)
            .map_err(|e| EngineError::InternalInvariant(format!("event serialization: {e}")))
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    /// Dealer repeats on a dealer win or a dealer-tenpai draw; the honba
    /// counter grows on repeats and draws and clears on a non-dealer win.
    /// Crossing seat zero advances the round wind.
    pub fn next_hand_parameters(&self) -> Option<NextHandParams> {
        let outcome = self.outcome.as_ref()?;
        let dealer_repeats = match outcome.kind {
            HandEndKind::Tsumo { winner } | HandEndKind::Ron { winner, .. } => {
                winner == self.dealer
            }
            HandEndKind::ExhaustiveDraw => outcome.tenpai[self.dealer as usize],
            HandEndKind::Abortive(_) => true,
        };
        let honba = match outcome.kind {
            HandEndKind::Tsumo { winner } | HandEndKind::Ron { winner, .. } => {
                if winner == self.dealer {
                    self.honba + 1
                } else {
                    0
                }
            }
            _ => self.honba + 1,
        };
        let (dealer, round_wind) = if dealer_repeats {
            (self.dealer, self.round_wind)
        } else {
            let next = (self.dealer + 1) % 4;
            let wind = if next == 0 {
                self.round_wind + 1
            } else {
                self.round_wind
            };
            (next, wind)
        };
        let busted = self.players.iter().any(|p| p.score < 0);
        let game_over =
            busted || round_wind > self.rule.game_length.max_round_wind();
        Some(NextHandParams {
            dealer,
            round_wind,
            honba,
            game_over,
        })
    }

    /// Legal actions for a seat in the current phase. Empty when the seat
    /// has no decision to make.
    pub fn legal_actions(&self, seat: u8) -> Vec<Action> {
        match self.phase {
            Phase::PlayerDiscard if seat == self.current_player => self.turn_actions(seat),
            Phase::WaitingForResponse => match &self.response {
                Some(resp)
                    if resp.order.contains(&seat)
                        && !resp.declarations.contains_key(&seat) =>
                {
                    let mut acts = resp.options.get(&seat).cloned().unwrap_or_default();
                    acts.push(Action::Pass);
                    acts
                }
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    /// Validates and executes one action. Illegal actions are rejected
    /// without touching any state.
    pub fn apply(&mut self, seat: u8, action: Action) -> EngineResult<ApplyResult> {
        if !self.legal_actions(seat).contains(&action) {
            return Err(EngineError::IllegalAction(format!(
                "seat {seat} cannot play {action:?} in {:?}",
                self.phase
            )));
        }
        debug!("seat {seat} plays {action:?}");
        match self.phase {
            Phase::PlayerDiscard => self.apply_turn_action(seat, action)?,
            Phase::WaitingForResponse => self.apply_response(seat, action)?,
            _ => {
                return Err(EngineError::IllegalAction(format!(
                    "phase {:?} accepts no actions",
                    self.phase
                )))
            }
        }
        Ok(ApplyResult {
            phase: self.phase,
            hand_finished: self.outcome.is_some(),
        })
    }

    // ----- hand setup -----

    fn start_new_hand(&mut self) -> EngineResult<()> {
        for p in self.players.iter_mut() {
            p.reset_hand();
        }
        self.outcome = None;
        self.response = None;
        self.pending_kan = None;
        self.last_discard = None;
        self.is_rinshan_flag = false;
        self.is_first_turn = true;
        self.deferred_kan_dora = 0;

        self.phase = Phase::Dealing;
        self.wall.shuffle_and_setup(self.rule.red_fives_per_suit)?;
        self.events.push(GameEvent::StartHand {
            dealer: self.dealer,
            round_wind: self.round_wind,
            honba: self.honba,
        });

        // Four tiles per seat three times, then one each, dealer first.
        for _ in 0..3 {
            for s in 0..4u8 {
                let seat = (self.dealer + s) % 4;
                for _ in 0..4 {
                    let t = self.must_draw()?;
                    self.players[seat as usize].hand.push(t);
                }
            }
        }
        for s in 0..4u8 {
            let seat = (self.dealer + s) % 4;
            let t = self.must_draw()?;
            self.players[seat as usize].hand.push(t);
        }
        for p in self.players.iter_mut() {
            p.sort_hand();
        }

        // Dealer's fourteenth tile.
        let t = self.must_draw()?;
        self.players[self.dealer as usize].drawn_tile = Some(t);
        self.current_player = self.dealer;
        self.phase = Phase::PlayerDiscard;
        self.events.push(GameEvent::Draw { seat: self.dealer });
        Ok(())
    }

    fn must_draw(&mut self) -> EngineResult<Tile> {
        self.wall.draw_tile().ok_or_else(|| {
            error!("wall exhausted during dealing");
            EngineError::InternalInvariant("wall exhausted during dealing".into())
        })
    }

    // ----- turn actions -----

    fn apply_turn_action(&mut self, seat: u8, action: Action) -> EngineResult<()> {
        match action {
            Action::Discard { tile } => self.do_discard(seat, tile, false),
            Action::Riichi { discard } => {
                let first_go = self.is_first_turn
                    && self.players[seat as usize].discards.is_empty()
                    && self.players.iter().all(|p| p.melds.is_empty());
                let p = &mut self.players[seat as usize];
                p.riichi_pending = true;
                p.double_riichi_declared = first_go;
                self.do_discard(seat, discard, true)
            }
            Action::Tsumo => self.finish_tsumo(seat),
            Action::Kan { kind: KanKind::Closed, tile } => self.do_closed_kan(seat, tile),
            Action::Kan { kind: KanKind::Added, tile } => self.do_added_kan(seat, tile),
            Action::AbortiveDraw => {
                self.finish_abortive(AbortiveReason::NineTerminals)
            }
            _ => Err(EngineError::InternalInvariant(format!(
                "validated turn action {action:?} has no handler"
            ))),
        }
    }

    fn do_discard(&mut self, seat: u8, tile: Tile, declared_riichi: bool) -> EngineResult<()> {
        {
            let p = &mut self.players[seat as usize];
            if !p.remove_tile(tile) {
                return Err(EngineError::InternalInvariant(format!(
                    "discard {tile} not in seat {seat}'s tiles"
                )));
            }
            p.merge_drawn_tile();
            p.discards.push(tile);
            p.discard_is_riichi.push(declared_riichi);
            if declared_riichi {
                p.riichi_declaration_index = Some(p.discards.len() - 1);
            }
            p.forbidden_discards.clear();
            p.ippatsu_cycle = false;
            p.temporary_furiten = false;
        }
        self.last_discard = Some((seat, tile));
        self.events.push(GameEvent::Discard {
            seat,
            tile,
            riichi: declared_riichi,
        });

        let mut options = AHashMap::new();
        let mut order = Vec::new();
        for offset in 1..4u8 {
            let s = (seat + offset) % 4;
            let (acts, missed_shape) = self.claim_actions_for(s, seat, tile);
            if missed_shape {
                self.mark_passed_win(s);
            }
            if !acts.is_empty() {
                options.insert(s, acts);
                order.push(s);
            }
        }

        if order.is_empty() {
            self.finalize_discard(seat)
        } else {
            self.response = Some(ResponseState {
                kind: ResponseKind::Discard,
                from_seat: seat,
                tile,
                order,
                options,
                declarations: AHashMap::new(),
            });
            self.phase = Phase::WaitingForResponse;
            Ok(())
        }
    }

    /// Accepts a pending riichi once its declaring discard has survived
    /// the ron window, whether the tile passes or gets called. Returns
    /// true when every seat is now in riichi.
    fn accept_pending_riichi(&mut self, seat: u8) -> bool {
        let p = &mut self.players[seat as usize];
        if !p.riichi_pending {
            return false;
        }
        p.riichi_pending = false;
        p.riichi_declared = true;
        p.ippatsu_cycle = true;
        p.score -= score::RIICHI_STAKE;
        self.riichi_sticks += 1;
        self.events.push(GameEvent::RiichiAccepted { seat });
        self.players.iter().all(|q| q.riichi_declared)
    }

    /// A seat let a winning tile pass: furiten until its next discard,
    /// permanently under riichi.
    fn mark_passed_win(&mut self, seat: u8) {
        let p = &mut self.players[seat as usize];
        p.temporary_furiten = true;
        if p.riichi_declared {
            p.permanent_furiten = true;
        }
    }

    /// Runs once the discard stands unclaimed: riichi stakes, deferred
    /// kan dora, abortive checks, then the next seat's draw.
    fn finalize_discard(&mut self, discarder: u8) -> EngineResult<()> {
        self.response = None;
        if self.accept_pending_riichi(discarder) {
            return self.finish_abortive(AbortiveReason::FourRiichi);
        }

        self.flush_deferred_dora();

        // Four identical wind discards in the opening go-around.
        if self.is_first_turn && self.players.iter().all(|p| p.discards.len() == 1) {
            let first = self.players[0].discards[0].value();
            if first >= WIND_EAST
                && first <= crate::tile::WIND_NORTH
                && self
                    .players
                    .iter()
                    .all(|p| p.discards[0].value() == first)
            {
                return self.finish_abortive(AbortiveReason::FourWinds);
            }
        }
        if self.players.iter().all(|p| !p.discards.is_empty()) {
            self.is_first_turn = false;
        }

        // Four kans split between players end the hand once the fourth
        // kan's discard passes.
        let kan_owners: Vec<usize> = self
            .players
            .iter()
            .enumerate()
            .filter(|(_, p)| p.melds.iter().any(|m| m.is_kan()))
            .map(|(i, _)| i)
            .collect();
        let total_kans: usize = self
            .players
            .iter()
            .map(|p| p.melds.iter().filter(|m| m.is_kan()).count())
            .sum();
        if total_kans == 4 && kan_owners.len() > 1 {
            return self.finish_abortive(AbortiveReason::FourKans);
        }

        self.current_player = (discarder + 1) % 4;
        self.draw_for_current()
    }

    fn flush_deferred_dora(&mut self) {
        while self.deferred_kan_dora > 0 {
            self.deferred_kan_dora -= 1;
            self.wall.reveal_new_dora();
            if let Some(ind) = self.wall.dora_indicators().last().copied() {
                self.events.push(GameEvent::DoraRevealed { indicator: ind });
            }
        }
    }

    fn draw_for_current(&mut self) -> EngineResult<()> {
        self.is_rinshan_flag = false;
        self.phase = Phase::PlayerDraw;
        match self.wall.draw_tile() {
            None => self.finish_exhaustive(),
            Some(t) => {
                let seat = self.current_player;
                self.players[seat as usize].drawn_tile = Some(t);
                self.phase = Phase::PlayerDiscard;
                self.events.push(GameEvent::Draw { seat });
                Ok(())
            }
        }
    }

    // ----- kans -----

    fn do_closed_kan(&mut self, seat: u8, tile: Tile) -> EngineResult<()> {
        self.break_ippatsu();
        self.is_first_turn = false;
        let claimants = self.chankan_claimants(seat, tile, true);
        if claimants.is_empty() {
            self.complete_closed_kan(seat, tile)
        } else {
            self.open_chankan_window(ResponseKind::ClosedKan, seat, KanKind::Closed, tile, claimants)
        }
    }

    fn do_added_kan(&mut self, seat: u8, tile: Tile) -> EngineResult<()> {
        self.break_ippatsu();
        self.is_first_turn = false;
        let claimants = self.chankan_claimants(seat, tile, false);
        if claimants.is_empty() {
            self.complete_added_kan(seat, tile)
        } else {
            self.open_chankan_window(ResponseKind::AddedKan, seat, KanKind::Added, tile, claimants)
        }
    }

    fn open_chankan_window(
        &mut self,
        kind: ResponseKind,
        seat: u8,
        kan_kind: KanKind,
        tile: Tile,
        claimants: Vec<u8>,
    ) -> EngineResult<()> {
        let mut options = AHashMap::new();
        for &s in &claimants {
            options.insert(s, vec![Action::Ron]);
        }
        self.pending_kan = Some(PendingKan {
            seat,
            kind: kan_kind,
            tile,
        });
        self.response = Some(ResponseState {
            kind,
            from_seat: seat,
            tile,
            order: claimants,
            options,
            declarations: AHashMap::new(),
        });
        self.phase = Phase::WaitingForResponse;
        Ok(())
    }

    fn complete_closed_kan(&mut self, seat: u8, tile: Tile) -> EngineResult<()> {
        let value = tile.value();
        let mut taken = Vec::new();
        {
            let p = &mut self.players[seat as usize];
            if let Some(t) = p.drawn_tile {
                if t.value() == value {
                    p.drawn_tile = None;
                    taken.push(t);
                }
            }
            while let Some(pos) = p.hand.iter().position(|t| t.value() == value) {
                taken.push(p.hand.remove(pos));
            }
            if taken.len() != 4 {
                return Err(EngineError::InternalInvariant(format!(
                    "closed kan on {tile} found {} copies",
                    taken.len()
                )));
            }
            taken.sort_unstable();
            p.melds.push(Meld {
                kind: MeldKind::Ankan,
                tiles: taken,
                called_from: seat,
            });
            p.merge_drawn_tile();
        }
        self.events.push(GameEvent::Call {
            seat,
            from: seat,
            kind: MeldKind::Ankan,
            tile,
        });
        self.after_kan(seat, self.rule.closed_kan_dora_timing)
    }

    fn complete_added_kan(&mut self, seat: u8, tile: Tile) -> EngineResult<()> {
        {
            let p = &mut self.players[seat as usize];
            if !p.remove_tile(tile) {
                return Err(EngineError::InternalInvariant(format!(
                    "added kan tile {tile} not held by seat {seat}"
                )));
            }
            let meld = p
                .melds
                .iter_mut()
                .find(|m| m.kind == MeldKind::Pon && m.base_value() == tile.value())
                .ok_or_else(|| {
                    EngineError::InternalInvariant(format!(
                        "added kan on {tile} without matching pon"
                    ))
                })?;
            meld.kind = MeldKind::Kakan;
            meld.tiles.push(tile);
            meld.tiles.sort_unstable();
            p.merge_drawn_tile();
        }
        self.events.push(GameEvent::Call {
            seat,
            from: seat,
            kind: MeldKind::Kakan,
            tile,
        });
        self.after_kan(seat, self.rule.open_kan_dora_timing)
    }

    /// Dora reveal per timing, then the replacement draw. Running out of
    /// replacement tiles aborts the hand.
    fn after_kan(&mut self, seat: u8, timing: KanDoraTiming) -> EngineResult<()> {
        match timing {
            KanDoraTiming::BeforeReplacementDraw => {
                self.wall.reveal_new_dora();
                if let Some(ind) = self.wall.dora_indicators().last().copied() {
                    self.events.push(GameEvent::DoraRevealed { indicator: ind });
                }
            }
            KanDoraTiming::AfterReplacementDraw => {
                self.deferred_kan_dora += 1;
            }
        }
        match self.wall.draw_replacement_tile() {
            None => self.finish_abortive(AbortiveReason::ReplacementExhaustion),
            Some(t) => {
                self.players[seat as usize].drawn_tile = Some(t);
                self.is_rinshan_flag = true;
                self.current_player = seat;
                self.phase = Phase::PlayerDiscard;
                self.events.push(GameEvent::Draw { seat });
                Ok(())
            }
        }
    }

    fn break_ippatsu(&mut self) {
        for p in self.players.iter_mut() {
            p.ippatsu_cycle = false;
        }
    }

    // ----- responses -----

    fn apply_response(&mut self, seat: u8, action: Action) -> EngineResult<()> {
        let done = {
            let resp = self.response.as_mut().ok_or_else(|| {
                EngineError::InternalInvariant("response phase without payload".into())
            })?;
            resp.declarations.insert(seat, action);
            resp.declarations.len() == resp.order.len()
        };
        if !done {
            return Ok(());
        }
        let resp = self.response.take().ok_or_else(|| {
            EngineError::InternalInvariant("response payload vanished".into())
        })?;
        self.phase = Phase::ActionProcessing;
        match resp.kind {
            ResponseKind::Discard => self.resolve_discard_claims(resp),
            ResponseKind::AddedKan | ResponseKind::ClosedKan => self.resolve_chankan(resp),
        }
    }

    /// Ron beats pon and kan, which beat chi; ties go to the seat closest
    /// to the discarder's right.
    fn resolve_discard_claims(&mut self, resp: ResponseState) -> EngineResult<()> {
        let mut best: Option<(u8, Action)> = None;
        for &s in &resp.order {
            let Some(&action) = resp.declarations.get(&s) else {
                continue;
            };
            let priority = action.claim_priority();
            if priority == 0 {
                continue;
            }
            if best.map_or(true, |(bp, _)| priority > bp) {
                best = Some((priority, action));
                if priority == 3 {
                    break;
                }
            }
        }

        let winner_seat = best.and_then(|(p, _)| {
            if p == 3 {
                resp.order
                    .iter()
                    .copied()
                    .find(|s| resp.declarations.get(s) == Some(&Action::Ron))
            } else {
                None
            }
        });

        // Declined or losing ron options burn the go-around.
        for &s in &resp.order {
            if Some(s) == winner_seat {
                continue;
            }
            let had_ron = resp
                .options
                .get(&s)
                .is_some_and(|acts| acts.contains(&Action::Ron));
            if had_ron {
                self.mark_passed_win(s);
            }
        }

        match best {
            None => self.finalize_discard(resp.from_seat),
            Some((3, _)) => {
                let winner = winner_seat.ok_or_else(|| {
                    EngineError::InternalInvariant("ron priority without claimant".into())
                })?;
                self.finish_ron(winner, resp.from_seat, resp.tile, false)
            }
            Some((priority, _)) => {
                let caller = resp
                    .order
                    .iter()
                    .copied()
                    .find(|s| {
                        resp.declarations
                            .get(s)
                            .is_some_and(|a| a.claim_priority() == priority)
                    })
                    .ok_or_else(|| {
                        EngineError::InternalInvariant("claim priority without claimant".into())
                    })?;
                let action = resp.declarations[&caller];
                self.perform_call(caller, resp.from_seat, resp.tile, action)
            }
        }
    }

    fn perform_call(
        &mut self,
        caller: u8,
        discarder: u8,
        tile: Tile,
        action: Action,
    ) -> EngineResult<()> {
        // A claimed riichi discard still locks in the riichi. Four riichi
        // cannot complete here, the caller is never a riichi player.
        self.accept_pending_riichi(discarder);
        self.break_ippatsu();
        self.is_first_turn = false;

        // The discard row is append-only: the claimed tile joins the meld
        // but stays on the row, keeping furiten history intact.
        match action {
            Action::Pon { .. } => {
                let taken = self.take_matching(caller, tile.value(), 2)?;
                let mut tiles = taken;
                tiles.push(tile);
                tiles.sort_unstable();
                self.players[caller as usize].melds.push(Meld {
                    kind: MeldKind::Pon,
                    tiles,
                    called_from: discarder,
                });
                self.players[caller as usize].forbidden_discards =
                    if self.rule.kuikae { vec![tile.value()] } else { Vec::new() };
                self.events.push(GameEvent::Call {
                    seat: caller,
                    from: discarder,
                    kind: MeldKind::Pon,
                    tile,
                });
                self.current_player = caller;
                self.phase = Phase::PlayerDiscard;
                Ok(())
            }
            Action::Chi { tiles: consumed } => {
                {
                    let p = &mut self.players[caller as usize];
                    for c in consumed {
                        if !p.remove_tile(c) {
                            return Err(EngineError::InternalInvariant(format!(
                                "chi tile {c} not in seat {caller}'s hand"
                            )));
                        }
                    }
                }
                let mut tiles = vec![tile, consumed[0], consumed[1]];
                tiles.sort_unstable();
                let mut values = [consumed[0].value(), consumed[1].value()];
                values.sort_unstable();
                self.players[caller as usize].forbidden_discards =
                    self.chi_forbidden_values(tile.value(), values);
                self.players[caller as usize].melds.push(Meld {
                    kind: MeldKind::Chi,
                    tiles,
                    called_from: discarder,
                });
                self.events.push(GameEvent::Call {
                    seat: caller,
                    from: discarder,
                    kind: MeldKind::Chi,
                    tile,
                });
                self.current_player = caller;
                self.phase = Phase::PlayerDiscard;
                Ok(())
            }
            Action::Kan { kind: KanKind::Open, .. } => {
                let taken = self.take_matching(caller, tile.value(), 3)?;
                let mut tiles = taken;
                tiles.push(tile);
                tiles.sort_unstable();
                self.players[caller as usize].melds.push(Meld {
                    kind: MeldKind::Daiminkan,
                    tiles,
                    called_from: discarder,
                });
                self.events.push(GameEvent::Call {
                    seat: caller,
                    from: discarder,
                    kind: MeldKind::Daiminkan,
                    tile,
                });
                self.after_kan(caller, self.rule.open_kan_dora_timing)
            }
            _ => Err(EngineError::InternalInvariant(format!(
                "unexpected winning claim {action:?}"
            ))),
        }
    }

    /// Removes `count` hand tiles of the given value, spending plain
    /// copies before red ones.
    fn take_matching(&mut self, seat: u8, value: u8, count: usize) -> EngineResult<Vec<Tile>> {
        let p = &mut self.players[seat as usize];
        let mut matching: Vec<Tile> = p
            .hand
            .iter()
            .copied()
            .filter(|t| t.value() == value)
            .collect();
        matching.sort_by_key(|t| t.is_red());
        if matching.len() < count {
            return Err(EngineError::InternalInvariant(format!(
                "call needs {count} copies of value {value}, found {}",
                matching.len()
            )));
        }
        let taken: Vec<Tile> = matching.into_iter().take(count).collect();
        for t in &taken {
            if let Some(pos) = p.hand.iter().position(|h| h == t) {
                p.hand.remove(pos);
            }
        }
        Ok(taken)
    }

    fn resolve_chankan(&mut self, resp: ResponseState) -> EngineResult<()> {
        let pending = self.pending_kan.take().ok_or_else(|| {
            EngineError::InternalInvariant("chankan window without pending kan".into())
        })?;
        let winner = resp
            .order
            .iter()
            .copied()
            .find(|s| resp.declarations.get(s) == Some(&Action::Ron));

        for &s in &resp.order {
            if Some(s) != winner {
                self.mark_passed_win(s);
            }
        }

        match winner {
            Some(w) => {
                // The robbed tile moves from the kan declarer to the winner.
                if resp.kind == ResponseKind::AddedKan
                    && !self.players[pending.seat as usize].remove_tile(pending.tile)
                {
                    return Err(EngineError::InternalInvariant(
                        "robbed kan tile missing from declarer's hand".into(),
                    ));
                }
                self.finish_ron(w, pending.seat, pending.tile, true)
            }
            None => match pending.kind {
                KanKind::Closed => self.complete_closed_kan(pending.seat, pending.tile),
                KanKind::Added => self.complete_added_kan(pending.seat, pending.tile),
                KanKind::Open => Err(EngineError::InternalInvariant(
                    "open kan cannot be robbed".into(),
                )),
            },
        }
    }

    // ----- hand endings -----

    fn finish_tsumo(&mut self, seat: u8) -> EngineResult<()> {
        let p = &self.players[seat as usize];
        let win_tile = p.drawn_tile.ok_or_else(|| {
            EngineError::InternalInvariant("tsumo without a drawn tile".into())
        })?;
        let ura = if p.riichi_declared {
            self.wall.ura_indicators()
        } else {
            Vec::new()
        };
        let ctx = self.win_context(seat, true, false);
        let details = win::evaluate_win(
            &p.concealed_counts(),
            &p.melds,
            self.aka_count(seat, None),
            win_tile,
            &self.wall.dora_indicators(),
            &ura,
            ctx,
        )
        .ok_or_else(|| {
            error!("validated tsumo for seat {seat} failed evaluation");
            EngineError::InternalInvariant("tsumo evaluation failed after validation".into())
        })?;

        let is_oya = seat == self.dealer;
        let s = score::calculate_score(details.han, details.fu, is_oya, true, self.honba);
        let mut deltas = [0i32; 4];
        for other in 0..4u8 {
            if other == seat {
                continue;
            }
            let pay = if other == self.dealer {
                s.pay_tsumo_oya
            } else {
                s.pay_tsumo_ko
            };
            deltas[other as usize] -= pay as i32;
        }
        deltas[seat as usize] =
            s.total as i32 + self.riichi_sticks as i32 * score::RIICHI_STAKE;
        self.settle_win(HandEndKind::Tsumo { winner: seat }, deltas, details, seat, None)
    }

    fn finish_ron(
        &mut self,
        winner: u8,
        loser: u8,
        tile: Tile,
        chankan: bool,
    ) -> EngineResult<()> {
        self.response = None;
        let p = &self.players[winner as usize];
        let mut concealed = p.hand_counts();
        concealed.add(tile.value());
        let ura = if p.riichi_declared {
            self.wall.ura_indicators()
        } else {
            Vec::new()
        };
        let mut ctx = self.win_context(winner, false, chankan);
        ctx.is_chankan = chankan;
        let details = win::evaluate_win(
            &concealed,
            &p.melds,
            self.aka_count(winner, Some(tile)),
            tile,
            &self.wall.dora_indicators(),
            &ura,
            ctx,
        )
        .ok_or_else(|| {
            error!("validated ron for seat {winner} failed evaluation");
            EngineError::InternalInvariant("ron evaluation failed after validation".into())
        })?;

        let is_oya = winner == self.dealer;
        let s = score::calculate_score(details.han, details.fu, is_oya, false, self.honba);
        let mut deltas = [0i32; 4];
        deltas[loser as usize] = -(s.pay_ron as i32);
        deltas[winner as usize] =
            s.total as i32 + self.riichi_sticks as i32 * score::RIICHI_STAKE;
        self.settle_win(
            HandEndKind::Ron { winner, loser },
            deltas,
            details,
            winner,
            Some(loser),
        )
    }

    fn settle_win(
        &mut self,
        kind: HandEndKind,
        deltas: [i32; 4],
        details: WinDetails,
        winner: u8,
        loser: Option<u8>,
    ) -> EngineResult<()> {
        for (i, d) in deltas.iter().enumerate() {
            self.players[i].score += d;
        }
        self.riichi_sticks = 0;
        self.events.push(GameEvent::Win {
            seat: winner,
            from: loser,
            han: details.han,
            fu: details.fu,
        });
        let tenpai = self.tenpai_flags();
        self.outcome = Some(HandOutcome {
            kind,
            score_deltas: deltas,
            win: Some(details),
            tenpai,
        });
        self.phase = Phase::HandOverScores;
        Ok(())
    }

    fn finish_exhaustive(&mut self) -> EngineResult<()> {
        let tenpai = self.tenpai_flags();
        let deltas = score::noten_penalty_deltas(tenpai);
        for (i, d) in deltas.iter().enumerate() {
            self.players[i].score += d;
        }
        self.events.push(GameEvent::HandDrawn { exhaustive: true });
        self.outcome = Some(HandOutcome {
            kind: HandEndKind::ExhaustiveDraw,
            score_deltas: deltas,
            win: None,
            tenpai,
        });
        self.phase = Phase::HandOverScores;
        Ok(())
    }

    fn finish_abortive(&mut self, reason: AbortiveReason) -> EngineResult<()> {
        self.response = None;
        self.pending_kan = None;
        self.events.push(GameEvent::HandDrawn { exhaustive: false });
        let tenpai = self.tenpai_flags();
        self.outcome = Some(HandOutcome {
            kind: HandEndKind::Abortive(reason),
            score_deltas: [0; 4],
            win: None,
            tenpai,
        });
        self.phase = Phase::HandOverScores;
        Ok(())
    }

    fn tenpai_flags(&self) -> [bool; 4] {
        let mut flags = [false; 4];
        for (i, p) in self.players.iter().enumerate() {
            flags[i] = agari::is_tenpai(&p.hand_counts());
        }
        flags
    }

    // ----- shared context -----

    pub(crate) fn win_context(&self, seat: u8, is_tsumo: bool, is_chankan: bool) -> WinContext {
        let p = &self.players[seat as usize];
        WinContext {
            is_menzen: p.is_menzen(),
            is_tsumo,
            is_riichi: p.riichi_declared,
            is_double_riichi: p.double_riichi_declared,
            is_ippatsu: p.ippatsu_cycle,
            is_haitei: is_tsumo && self.wall.live_count() == 0 && !self.is_rinshan_flag,
            is_houtei: !is_tsumo && !is_chankan && self.wall.live_count() == 0,
            is_rinshan: is_tsumo && self.is_rinshan_flag,
            is_chankan: false,
            is_first_turn_tsumo: is_tsumo
                && self.is_first_turn
                && p.discards.is_empty()
                && self.players.iter().all(|q| q.melds.is_empty()),
            round_wind: WIND_EAST + self.round_wind,
            seat_wind: WIND_EAST + (seat + 4 - self.dealer) % 4,
            dora_count: 0,
            aka_dora_count: 0,
            ura_dora_count: 0,
        }
    }

    /// Red fives across the seat's hand, drawn tile, melds, and an
    /// incoming claimed tile.
    pub(crate) fn aka_count(&self, seat: u8, extra: Option<Tile>) -> u8 {
        let p = &self.players[seat as usize];
        let mut count = p.hand.iter().filter(|t| t.is_red()).count() as u8;
        if p.drawn_tile.is_some_and(|t| t.is_red()) {
            count += 1;
        }
        for m in &p.melds {
            count += m.tiles.iter().filter(|t| t.is_red()).count() as u8;
        }
        if extra.is_some_and(|t| t.is_red()) {
            count += 1;
        }
        count
    }
}
