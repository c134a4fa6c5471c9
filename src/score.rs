use serde::{Deserialize, Serialize};

pub const RIICHI_STAKE: i32 = 1000;
pub const NOTEN_PENALTY_TOTAL: i32 = 3000;

/// Payment breakdown for a single winner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub total: u32,
    pub pay_ron: u32,
    pub pay_tsumo_oya: u32,
    pub pay_tsumo_ko: u32,
}

/// Base points from han and fu: `fu * 2^(2+han)` capped at mangan, with
/// the fixed limit table above four han.
pub fn base_points(han: u8, fu: u8) -> u32 {
    if han >= 5 {
        return match han {
            5 => 2000,
            6 | 7 => 3000,
            8..=10 => 4000,
            11 | 12 => 6000,
            _ => 8000 * (han as u32 / 13),
        };
    }
    let fu = round_up_fu(fu);
    let bp = (fu as u32) * 2u32.pow(2 + han as u32);
    bp.min(2000)
}

pub fn calculate_score(han: u8, fu: u8, is_oya: bool, is_tsumo: bool, honba: u32) -> Score {
    let mut s = make_score_result(base_points(han, fu), is_oya, is_tsumo);
    if is_tsumo {
        s.pay_tsumo_oya += honba * 100;
        s.pay_tsumo_ko += honba * 100;
        s.total += honba * 300;
    } else {
        s.pay_ron += honba * 300;
        s.total += honba * 300;
    }
    s
}

fn make_score_result(base_points: u32, is_oya: bool, is_tsumo: bool) -> Score {
    let total_ron = if is_oya {
        ceil_100(base_points * 6)
    } else {
        ceil_100(base_points * 4)
    };

    let (pay_oya, pay_ko) = if is_oya {
        (0, ceil_100(base_points * 2))
    } else {
        (ceil_100(base_points * 2), ceil_100(base_points))
    };

    let total_tsumo = if is_oya {
        pay_ko * 3
    } else {
        pay_oya + pay_ko * 2
    };

    if is_tsumo {
        Score {
            total: total_tsumo,
            pay_ron: 0,
            pay_tsumo_oya: pay_oya,
            pay_tsumo_ko: pay_ko,
        }
    } else {
        Score {
            total: total_ron,
            pay_ron: total_ron,
            pay_tsumo_oya: 0,
            pay_tsumo_ko: 0,
        }
    }
}

fn round_up_fu(fu: u8) -> u8 {
    if fu == 25 {
        return 25; // chiitoitsu fixed
    }
    fu.div_ceil(10) * 10
}

fn ceil_100(val: u32) -> u32 {
    val.div_ceil(100) * 100
}

/// Exhaustive-draw settlement: 3000 points flow from noten seats to
/// tenpai seats. All-tenpai and all-noten exchange nothing.
pub fn noten_penalty_deltas(tenpai: [bool; 4]) -> [i32; 4] {
    let tenpai_count = tenpai.iter().filter(|&&t| t).count() as i32;
    let mut deltas = [0i32; 4];
    if tenpai_count == 0 || tenpai_count == 4 {
        return deltas;
    }
    let gain = NOTEN_PENALTY_TOTAL / tenpai_count;
    let loss = NOTEN_PENALTY_TOTAL / (4 - tenpai_count);
    for (i, &t) in tenpai.iter().enumerate() {
        deltas[i] = if t { gain } else { -loss };
    }
    deltas
}
