#[cfg(test)]
mod unit_tests {
    use crate::action::{Action, KanKind, Phase};
    use crate::agari::{find_divisions, is_agari, is_chiitoitsu, is_kokushi, is_tenpai, wait_tiles};
    use crate::meld::MeldKind;
    use crate::rule::GameRule;
    use crate::score::{calculate_score, noten_penalty_deltas};
    use crate::state::legal_actions::GameStateLegalActions;
    use crate::state::{GameState, HandEndKind};
    use crate::tile::{next_dora_value, Tile, TileCounts};
    use crate::yaku::{self, WinContext, Yaku};

    fn t(value: u8) -> Tile {
        Tile::from_value(value)
    }

    fn counts(values: &[u8]) -> TileCounts {
        let mut c = TileCounts::new();
        for &v in values {
            c.add(v);
        }
        c
    }

    fn hand(values: &[u8]) -> Vec<Tile> {
        let mut h: Vec<Tile> = values.iter().map(|&v| t(v)).collect();
        h.sort_unstable();
        h
    }

    // Thirteen scattered tiles with no pair and no adjacent numbers.
    const JUNK: [u8; 13] = [0, 3, 6, 11, 14, 17, 20, 23, 26, 27, 28, 29, 30];

    #[test]
    fn test_agari_standard() {
        // 123m 456m 789m 123p 11s
        let c = counts(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 18, 18]);
        assert!(is_agari(&c), "four runs and a pair should win");
    }

    #[test]
    fn test_not_agari() {
        let mut v = JUNK.to_vec();
        v.push(33);
        assert!(!is_agari(&counts(&v)));
    }

    #[test]
    fn test_chiitoitsu() {
        let mut c = TileCounts::new();
        for &v in &[0, 2, 4, 6, 8, 10, 12] {
            c.add(v);
            c.add(v);
        }
        assert!(is_chiitoitsu(&c));
        assert!(is_agari(&c));
    }

    #[test]
    fn test_kokushi() {
        let mut c = counts(&[0, 8, 9, 17, 18, 26, 27, 28, 29, 30, 31, 32, 33]);
        c.add(0);
        assert!(is_kokushi(&c));
        assert!(is_agari(&c));
    }

    #[test]
    fn test_decomposition_soundness() {
        // 222333444m can split as three triplets or three runs.
        let c = counts(&[1, 1, 1, 2, 2, 2, 3, 3, 3, 13, 14, 15, 25, 25]);
        let divisions = find_divisions(&c);
        assert!(divisions.len() >= 2, "expected multiple divisions");
        for div in &divisions {
            assert_eq!(div.groups.len(), 4);
            // Re-summing pair plus groups must reproduce the hand.
            let mut rebuilt = TileCounts::new();
            rebuilt.add(div.pair);
            rebuilt.add(div.pair);
            for g in &div.groups {
                match g {
                    crate::agari::Group::Triplet(v) => {
                        for _ in 0..3 {
                            rebuilt.add(*v);
                        }
                    }
                    crate::agari::Group::Run(v) => {
                        rebuilt.add(*v);
                        rebuilt.add(v + 1);
                        rebuilt.add(v + 2);
                    }
                }
            }
            assert_eq!(rebuilt, c);
        }
    }

    #[test]
    fn test_waits_two_sided_with_pair_overlap() {
        // 34455m 456p 789s 11z waits on 3m and 6m.
        let c = counts(&[2, 3, 3, 4, 4, 12, 13, 14, 24, 25, 26, 27, 27]);
        assert!(is_tenpai(&c));
        assert_eq!(wait_tiles(&c), vec![2, 5]);
    }

    #[test]
    fn test_tenpai_rejects_noten() {
        assert!(!is_tenpai(&counts(&JUNK)));
    }

    #[test]
    fn test_dora_cycle() {
        assert_eq!(next_dora_value(8), 0); // 9m -> 1m
        assert_eq!(next_dora_value(30), 27); // north -> east
        assert_eq!(next_dora_value(33), 31); // red -> white
        assert_eq!(next_dora_value(4), 5);
    }

    #[test]
    fn test_tile_display() {
        assert_eq!(t(0).to_string(), "1m");
        assert_eq!(t(27).to_string(), "1z");
        assert_eq!(Tile::new_red(13).unwrap().to_string(), "5pr");
    }

    #[test]
    fn test_score_calculation() {
        // 4 han 30 fu, non-dealer tsumo: base 1920.
        let score = calculate_score(4, 30, false, true, 0);
        assert_eq!(score.pay_tsumo_oya, 3900);
        assert_eq!(score.pay_tsumo_ko, 2000);
        assert_eq!(score.total, 7900);
    }

    #[test]
    fn test_score_limits() {
        // 1 han 30 fu non-dealer ron.
        assert_eq!(calculate_score(1, 30, false, false, 0).pay_ron, 1000);
        // Mangan cap: 4 han 40 fu would exceed 2000 base.
        assert_eq!(calculate_score(4, 40, false, false, 0).pay_ron, 8000);
        assert_eq!(calculate_score(5, 30, true, false, 0).pay_ron, 12000);
        // Yakuman.
        assert_eq!(calculate_score(13, 0, false, false, 0).pay_ron, 32000);
        // Honba adds 300 to a ron.
        assert_eq!(calculate_score(1, 30, false, false, 2).pay_ron, 1600);
    }

    #[test]
    fn test_noten_penalty_split() {
        assert_eq!(noten_penalty_deltas([true, true, false, false]), [1500, 1500, -1500, -1500]);
        assert_eq!(noten_penalty_deltas([true, false, false, false]), [3000, -1000, -1000, -1000]);
        assert_eq!(noten_penalty_deltas([true, true, true, true]), [0; 4]);
        assert_eq!(noten_penalty_deltas([false; 4]), [0; 4]);
    }

    #[test]
    fn test_one_han_minimum() {
        // Open hand with no yaku: dora alone must not make it scoreable.
        let concealed = counts(&[3, 4, 5, 15, 16, 17, 24, 25, 26, 28, 28]);
        let melds = vec![crate::meld::Meld {
            kind: MeldKind::Chi,
            tiles: vec![t(0), t(1), t(2)],
            called_from: 3,
        }];
        let ctx = WinContext {
            is_menzen: false,
            dora_count: 3,
            ..WinContext::default()
        };
        let res = yaku::evaluate(&concealed, &melds, &ctx, 3);
        assert_eq!(res.han, 0, "dora never satisfies the yaku minimum");
    }

    #[test]
    fn test_pinfu_fu() {
        // 234m 567m 678p 345s 44s, ron on 3s (two-sided).
        let concealed = counts(&[1, 2, 3, 4, 5, 6, 14, 15, 16, 20, 21, 22, 21, 21]);
        let ctx = WinContext::default();
        let res = yaku::evaluate(&concealed, &[], &ctx, 20);
        assert!(res.yaku.iter().any(|(y, _)| *y == Yaku::Pinfu));
        assert_eq!(res.fu, 30);
    }

    #[test]
    fn test_kanchan_fu() {
        // 135m -> win on 2m is a closed wait: 20 + 10 menzen + 2 = 40 after rounding.
        // Hand: 123m(win 2) 456m 789p 234s 99s
        let concealed = counts(&[0, 1, 2, 3, 4, 5, 14, 15, 16, 19, 20, 21, 26, 26]);
        let ctx = WinContext {
            is_riichi: true,
            ..WinContext::default()
        };
        let res = yaku::evaluate(&concealed, &[], &ctx, 1);
        assert_eq!(res.fu, 40, "kanchan ron should round to 40 fu");
    }

    #[test]
    fn test_chiitoitsu_fu_fixed() {
        let mut c = TileCounts::new();
        for &v in &[0, 2, 4, 6, 8, 10, 12] {
            c.add(v);
            c.add(v);
        }
        let res = yaku::evaluate(&c, &[], &WinContext::default(), 12);
        assert_eq!(res.fu, 25);
        assert!(res.yaku.iter().any(|(y, _)| *y == Yaku::Chiitoitsu));
    }

    #[test]
    fn test_daisangen() {
        // 555z 666z 777z 123m 99m
        let c = counts(&[31, 31, 31, 32, 32, 32, 33, 33, 33, 0, 1, 2, 8, 8]);
        let res = yaku::evaluate(&c, &[], &WinContext::default(), 33);
        assert!(res.yakuman);
        assert!(res.yaku.iter().any(|(y, _)| *y == Yaku::Daisangen));
    }

    #[test]
    fn test_tsuuiisou() {
        // 111z 222z 555z 666z 77z
        let c = counts(&[27, 27, 27, 28, 28, 28, 31, 31, 31, 32, 32, 32, 33, 33]);
        let res = yaku::evaluate(&c, &[], &WinContext::default(), 33);
        assert!(res.yakuman);
        assert!(res.yaku.iter().any(|(y, _)| *y == Yaku::Tsuuiisou));
    }

    // ----- wall -----

    #[test]
    fn test_wall_seeded_determinism() {
        let mut a = crate::state::wall::WallState::new(Some(42));
        let mut b = crate::state::wall::WallState::new(Some(42));
        a.shuffle_and_setup(1).unwrap();
        b.shuffle_and_setup(1).unwrap();
        assert_eq!(a.wall_digest, b.wall_digest);
        assert_eq!(a.dora_indicators(), b.dora_indicators());
        for _ in 0..20 {
            assert_eq!(a.draw_tile(), b.draw_tile());
        }
    }

    #[test]
    fn test_wall_accounting() {
        let mut w = crate::state::wall::WallState::new(Some(1));
        w.shuffle_and_setup(1).unwrap();
        assert_eq!(w.live_count(), 122);
        assert_eq!(w.undealt_count(), 136);
        assert_eq!(w.dora_indicators().len(), 1);

        let drawn = w.draw_tile();
        assert!(drawn.is_some());
        assert_eq!(w.undealt_count(), 135);

        // Replacement draws refill the dead wall from the live tail.
        for i in 0..4 {
            assert!(w.draw_replacement_tile().is_some(), "replacement {i}");
        }
        assert!(w.draw_replacement_tile().is_none());
        assert_eq!(w.undealt_count(), 131);
    }

    #[test]
    fn test_wall_red_five_count() {
        let mut w = crate::state::wall::WallState::new(Some(3));
        w.shuffle_and_setup(1).unwrap();
        let mut reds = 0;
        while let Some(tile) = w.draw_tile() {
            if tile.is_red() {
                reds += 1;
            }
        }
        assert!(reds <= 3);
    }

    // ----- controller -----

    fn fresh_game(seed: u64) -> GameState {
        let mut state = GameState::new(GameRule::default_hanchan());
        state.reset_game(Some(seed)).unwrap();
        state
    }

    /// Replaces dealt hands so claim scenarios are deterministic.
    fn rig_hands(state: &mut GameState, hands: [&[u8]; 4]) {
        for (i, values) in hands.iter().enumerate() {
            state.players[i].hand = hand(values);
            state.players[i].drawn_tile = None;
        }
    }

    #[test]
    fn test_deal_shape() {
        let state = fresh_game(11);
        assert_eq!(state.phase, Phase::PlayerDiscard);
        assert_eq!(state.current_player, 0);
        assert_eq!(state.players[0].hand.len(), 13);
        assert!(state.players[0].drawn_tile.is_some());
        for i in 1..4 {
            assert_eq!(state.players[i].hand.len(), 13);
            assert!(state.players[i].drawn_tile.is_none());
        }
        assert_eq!(state.wall.live_count(), 122 - 53);
    }

    #[test]
    fn test_event_log_serializes() {
        let state = fresh_game(30);
        let json = state.events_json().unwrap();
        assert!(json.contains("\"start_hand\""));
        assert!(json.contains("\"draw\""));
    }

    #[test]
    fn test_illegal_action_rejected_without_mutation() {
        let mut state = fresh_game(12);
        let before = state.players[1].score;
        let err = state.apply(1, Action::Tsumo).unwrap_err();
        assert!(matches!(err, crate::errors::EngineError::IllegalAction(_)));
        assert_eq!(state.players[1].score, before);
        assert_eq!(state.phase, Phase::PlayerDiscard);
    }

    #[test]
    fn test_ron_beats_pon() {
        let mut state = fresh_game(21);
        // Seat 1 can pon the white dragon, seat 2 rons it with yakuhai.
        rig_hands(
            &mut state,
            [
                &JUNK,
                &[31, 31, 0, 3, 6, 11, 14, 17, 20, 23, 26, 27, 29],
                &[0, 1, 2, 3, 4, 5, 6, 7, 8, 10, 10, 31, 31],
                &JUNK,
            ],
        );
        state.players[0].drawn_tile = Some(t(31));

        state.apply(0, Action::Discard { tile: t(31) }).unwrap();
        assert_eq!(state.phase, Phase::WaitingForResponse);
        assert!(state
            .legal_actions(1)
            .contains(&Action::Pon { tile: t(31) }));
        assert!(state.legal_actions(2).contains(&Action::Ron));

        state.apply(1, Action::Pon { tile: t(31) }).unwrap();
        // Still waiting on seat 2.
        assert_eq!(state.phase, Phase::WaitingForResponse);
        state.apply(2, Action::Ron).unwrap();

        let outcome = state.hand_outcome().expect("hand should be over");
        assert_eq!(outcome.kind, HandEndKind::Ron { winner: 2, loser: 0 });
        assert!(outcome.score_deltas[2] > 0);
        assert!(outcome.score_deltas[0] < 0);
        assert!(state.players[1].melds.is_empty(), "pon must lose to ron");
    }

    #[test]
    fn test_furiten_blocks_ron() {
        let mut state = fresh_game(22);
        rig_hands(
            &mut state,
            [
                &JUNK,
                &JUNK,
                &[0, 1, 2, 3, 4, 5, 6, 7, 8, 10, 10, 31, 31],
                &JUNK,
            ],
        );
        // Seat 2 waits on 2p and 5z but has discarded 2p.
        state.players[2].discards.push(t(10));
        state.players[2].discard_is_riichi.push(false);

        let (acts, missed) = state.claim_actions_for(2, 0, t(31));
        assert!(!acts.contains(&Action::Ron));
        assert!(missed, "complete shape in furiten still burns the turn");
    }

    #[test]
    fn test_dealer_tsumo_keeps_dealer_and_adds_honba() {
        let mut state = fresh_game(23);
        rig_hands(
            &mut state,
            [
                &[0, 1, 2, 3, 4, 5, 6, 7, 8, 10, 10, 31, 31],
                &JUNK,
                &JUNK,
                &JUNK,
            ],
        );
        // A prior discard keeps this an ordinary tsumo rather than tenhou.
        state.players[0].discards.push(t(33));
        state.players[0].discard_is_riichi.push(false);
        state.players[0].drawn_tile = Some(t(31));

        let legal = state.legal_actions(0);
        assert!(legal.contains(&Action::Tsumo));
        state.apply(0, Action::Tsumo).unwrap();

        let outcome = state.hand_outcome().unwrap();
        assert_eq!(outcome.kind, HandEndKind::Tsumo { winner: 0 });
        assert_eq!(outcome.score_deltas.iter().sum::<i32>(), 0);
        let details = outcome.win.as_ref().unwrap();
        assert!(details.yaku.iter().any(|(y, _)| *y == Yaku::Yakuhai));
        assert!(details.yaku.iter().any(|(y, _)| *y == Yaku::MenzenTsumo));

        let params = state.next_hand_parameters().unwrap();
        assert_eq!(params.dealer, 0);
        assert_eq!(params.honba, 1);
        assert!(!params.game_over);

        state.reset_new_hand().unwrap();
        assert_eq!(state.dealer, 0);
        assert_eq!(state.honba, 1);
        assert_eq!(state.phase, Phase::PlayerDiscard);
    }

    #[test]
    fn test_riichi_declaration_flow() {
        let mut state = fresh_game(24);
        rig_hands(
            &mut state,
            [
                &[0, 1, 2, 3, 4, 5, 6, 7, 8, 10, 10, 31, 31],
                &JUNK,
                &JUNK,
                &JUNK,
            ],
        );
        state.players[0].drawn_tile = Some(t(22));

        let legal = state.legal_actions(0);
        assert!(legal.contains(&Action::Riichi { discard: t(22) }));
        state.apply(0, Action::Riichi { discard: t(22) }).unwrap();

        let p = &state.players[0];
        assert!(p.riichi_declared);
        assert!(p.double_riichi_declared, "first untouched discard");
        assert!(p.ippatsu_cycle);
        assert_eq!(p.score, 24000);
        assert_eq!(state.riichi_sticks, 1);
        assert_eq!(state.current_player, 1);
        assert_eq!(state.phase, Phase::PlayerDiscard);

        // Locked hand: only the drawn tile may go.
        let drawn = state.players[1].drawn_tile;
        assert!(drawn.is_some());
        state.apply(1, Action::Discard { tile: drawn.unwrap() }).ok();
        // Whatever happened downstream, seat 0 must still be in riichi.
        assert!(state.players[0].riichi_declared);
    }

    #[test]
    fn test_riichi_stands_when_declaring_discard_is_called() {
        let mut state = fresh_game(31);
        rig_hands(
            &mut state,
            [
                &[0, 1, 2, 3, 4, 5, 6, 7, 8, 10, 10, 31, 31],
                &[32, 32, 0, 3, 6, 11, 14, 17, 20, 23, 26, 27, 29],
                &JUNK,
                &JUNK,
            ],
        );
        state.players[0].drawn_tile = Some(t(32));

        state.apply(0, Action::Riichi { discard: t(32) }).unwrap();
        assert_eq!(state.phase, Phase::WaitingForResponse);
        state.apply(1, Action::Pon { tile: t(32) }).unwrap();

        let p = &state.players[0];
        assert!(p.riichi_declared, "riichi must stand when its discard is called");
        assert!(!p.riichi_pending);
        assert!(!p.ippatsu_cycle, "the call breaks ippatsu");
        assert_eq!(p.score, 24000);
        assert_eq!(state.riichi_sticks, 1);
        // Append-only discard row: the called tile stays put.
        assert_eq!(p.discards, vec![t(32)]);
        assert_eq!(state.players[1].melds.len(), 1);
        assert_eq!(state.players[1].melds[0].kind, MeldKind::Pon);
        assert_eq!(state.current_player, 1);
        assert_eq!(state.phase, Phase::PlayerDiscard);
    }

    #[test]
    fn test_furiten_covers_claimed_discard() {
        let mut state = fresh_game(32);
        rig_hands(
            &mut state,
            [
                &JUNK,
                &[31, 31, 0, 3, 6, 11, 14, 17, 20, 23, 26, 27, 29],
                &JUNK,
                &JUNK,
            ],
        );
        state.players[0].drawn_tile = Some(t(31));
        state.apply(0, Action::Discard { tile: t(31) }).unwrap();
        state.apply(1, Action::Pon { tile: t(31) }).unwrap();
        assert_eq!(
            state.players[0].discards,
            vec![t(31)],
            "claimed tiles must stay on the discard row"
        );

        // Seat 0 later ends up waiting on the called-away value.
        state.players[0].hand = hand(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 10, 10, 10, 31]);
        let (acts, missed) = state.claim_actions_for(0, 1, t(31));
        assert!(!acts.contains(&Action::Ron), "own discard row forbids the ron");
        assert!(missed, "the blocked win still burns the go-around");
    }

    #[test]
    fn test_closed_kan_reveals_dora_and_draws_replacement() {
        let mut state = fresh_game(25);
        rig_hands(
            &mut state,
            [
                &[0, 0, 0, 0, 3, 4, 5, 6, 7, 8, 10, 10, 31],
                &JUNK,
                &JUNK,
                &JUNK,
            ],
        );
        state.players[0].drawn_tile = Some(t(31));

        let kan = Action::Kan {
            kind: KanKind::Closed,
            tile: t(0),
        };
        assert!(state.legal_actions(0).contains(&kan));
        state.apply(0, kan).unwrap();

        let p = &state.players[0];
        assert_eq!(p.melds.len(), 1);
        assert_eq!(p.melds[0].kind, MeldKind::Ankan);
        assert_eq!(p.hand.len(), 10);
        assert!(p.drawn_tile.is_some(), "replacement tile drawn");
        assert_eq!(state.wall.dora_indicators().len(), 2);
        assert_eq!(state.wall.replacement_draws(), 1);
        assert_eq!(state.current_player, 0);
        assert_eq!(state.phase, Phase::PlayerDiscard);
    }

    #[test]
    fn test_chi_only_from_left_and_kuikae() {
        let state = fresh_game(26);
        // Basic flank lock: calling 4m onto 56m forbids 4m and 7m.
        assert_eq!(state.chi_forbidden_values(3, [4, 5]), vec![3, 6]);
        // Kanchan call locks only the claimed value.
        assert_eq!(state.chi_forbidden_values(4, [3, 5]), vec![4]);
    }

    #[test]
    fn test_exhaustive_draw_by_tsumogiri() {
        let mut state = fresh_game(27);
        let mut steps = 0;
        while state.hand_outcome().is_none() {
            steps += 1;
            assert!(steps < 1000, "hand did not terminate");
            match state.phase {
                Phase::PlayerDiscard => {
                    let seat = state.current_player;
                    let tile = state.players[seat as usize]
                        .drawn_tile
                        .expect("turn seat should hold a drawn tile");
                    state.apply(seat, Action::Discard { tile }).unwrap();
                }
                Phase::WaitingForResponse => {
                    for seat in 0..4 {
                        if !state.legal_actions(seat).is_empty() {
                            state.apply(seat, Action::Pass).unwrap();
                            break;
                        }
                    }
                }
                other => panic!("unexpected phase {other:?}"),
            }
        }
        let outcome = state.hand_outcome().unwrap();
        assert_eq!(outcome.kind, HandEndKind::ExhaustiveDraw);
        assert_eq!(outcome.score_deltas.iter().sum::<i32>(), 0);
        // All 70 post-deal draws ended up in the discard rows.
        let discards: usize = state.players.iter().map(|p| p.discards.len()).sum();
        assert_eq!(discards, 70);
        assert_eq!(state.wall.live_count(), 0);
    }

    #[test]
    fn test_exhaustive_draw_two_tenpai_split() {
        let mut state = fresh_game(28);
        rig_hands(
            &mut state,
            [
                // Two tenpai hands, two noten.
                &[0, 1, 2, 3, 4, 5, 6, 7, 8, 10, 10, 31, 31],
                &[9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 24],
                &JUNK,
                &JUNK,
            ],
        );
        let before: Vec<i32> = state.players.iter().map(|p| p.score).collect();
        // Drain the live wall, then let the last discard settle.
        while state.wall.draw_tile().is_some() {}
        state.players[0].drawn_tile = Some(t(33));
        state.apply(0, Action::Discard { tile: t(33) }).unwrap();

        let outcome = state.hand_outcome().unwrap();
        assert_eq!(outcome.kind, HandEndKind::ExhaustiveDraw);
        assert_eq!(outcome.tenpai, [true, true, false, false]);
        assert_eq!(outcome.score_deltas, [1500, 1500, -1500, -1500]);
        assert_eq!(state.players[0].score, before[0] + 1500);
        assert_eq!(state.players[3].score, before[3] - 1500);
        let params = state.next_hand_parameters().unwrap();
        assert_eq!(params.dealer, 0, "tenpai dealer keeps the deal");
    }

    #[test]
    fn test_nine_terminals_abort() {
        let mut state = fresh_game(29);
        rig_hands(
            &mut state,
            [
                &[0, 8, 9, 17, 18, 26, 27, 28, 29, 1, 2, 3, 4],
                &JUNK,
                &JUNK,
                &JUNK,
            ],
        );
        state.players[0].drawn_tile = Some(t(30));

        assert!(state.legal_actions(0).contains(&Action::AbortiveDraw));
        state.apply(0, Action::AbortiveDraw).unwrap();
        let outcome = state.hand_outcome().unwrap();
        assert_eq!(
            outcome.kind,
            HandEndKind::Abortive(crate::state::AbortiveReason::NineTerminals)
        );
        assert_eq!(outcome.score_deltas, [0; 4]);
    }
}
