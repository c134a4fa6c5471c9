//! Hand shape analysis over tile-count histograms. All functions here are
//! pure and total: an impossible shape yields `false` or an empty vector.

use crate::tile::{TileCounts, TILE_KINDS};

/// A completed group in a standard decomposition, identified by its lowest
/// tile value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    Triplet(u8),
    Run(u8),
}

/// One way to arrange a hand as a pair plus four groups.
#[derive(Debug, Clone)]
pub struct Division {
    pub pair: u8,
    pub groups: Vec<Group>,
}

const KOKUSHI_VALUES: [usize; 13] = [0, 8, 9, 17, 18, 26, 27, 28, 29, 30, 31, 32, 33];

/// 14-tile completion check: standard shape, seven pairs, or kokushi.
/// Callers holding melds should use `is_standard_agari` on the concealed
/// part instead, since the special shapes require a full concealed hand.
pub fn is_agari(counts: &TileCounts) -> bool {
    if is_kokushi(counts) || is_chiitoitsu(counts) {
        return true;
    }
    is_standard_agari(counts)
}

pub fn is_kokushi(counts: &TileCounts) -> bool {
    let mut pair_found = false;
    for &idx in &KOKUSHI_VALUES {
        match counts.counts[idx] {
            0 => return false,
            1 => {}
            2 => {
                if pair_found {
                    return false;
                }
                pair_found = true;
            }
            _ => return false,
        }
    }
    pair_found
}

pub fn is_chiitoitsu(counts: &TileCounts) -> bool {
    let mut pairs = 0;
    for &c in counts.counts.iter() {
        if c == 2 {
            pairs += 1;
        } else if c != 0 {
            return false;
        }
    }
    pairs == 7
}

pub fn is_standard_agari(counts: &TileCounts) -> bool {
    let mut work = *counts;
    for i in 0..TILE_KINDS {
        if work.counts[i] >= 2 {
            work.counts[i] -= 2;
            if consume_groups(&mut work, 0) {
                return true;
            }
            work.counts[i] += 2;
        }
    }
    false
}

fn run_can_start(i: usize) -> bool {
    matches!(i, 0..=6 | 9..=15 | 18..=24)
}

fn consume_groups(counts: &mut TileCounts, start: usize) -> bool {
    let mut i = start;
    while i < TILE_KINDS && counts.counts[i] == 0 {
        i += 1;
    }
    if i == TILE_KINDS {
        return true;
    }

    if counts.counts[i] >= 3 {
        counts.counts[i] -= 3;
        if consume_groups(counts, i) {
            counts.counts[i] += 3;
            return true;
        }
        counts.counts[i] += 3;
    }

    if run_can_start(i) && counts.counts[i + 1] > 0 && counts.counts[i + 2] > 0 {
        counts.counts[i] -= 1;
        counts.counts[i + 1] -= 1;
        counts.counts[i + 2] -= 1;
        if consume_groups(counts, i) {
            counts.counts[i] += 1;
            counts.counts[i + 1] += 1;
            counts.counts[i + 2] += 1;
            return true;
        }
        counts.counts[i] += 1;
        counts.counts[i + 1] += 1;
        counts.counts[i + 2] += 1;
    }

    false
}

/// Every pair-plus-groups division of the given counts. Melded groups are
/// not included; the caller appends them for scoring.
pub fn find_divisions(counts: &TileCounts) -> Vec<Division> {
    let mut divisions = Vec::new();
    for i in 0..TILE_KINDS {
        if counts.counts[i] >= 2 {
            let mut work = *counts;
            work.counts[i] -= 2;
            let mut current = Vec::new();
            collect_groups(&mut work, 0, &mut current, &mut |groups| {
                divisions.push(Division {
                    pair: i as u8,
                    groups: groups.to_vec(),
                });
            });
        }
    }
    divisions
}

fn collect_groups(
    counts: &mut TileCounts,
    start: usize,
    current: &mut Vec<Group>,
    emit: &mut impl FnMut(&[Group]),
) {
    let mut i = start;
    while i < TILE_KINDS && counts.counts[i] == 0 {
        i += 1;
    }
    if i == TILE_KINDS {
        emit(current);
        return;
    }

    if counts.counts[i] >= 3 {
        counts.counts[i] -= 3;
        current.push(Group::Triplet(i as u8));
        collect_groups(counts, i, current, emit);
        current.pop();
        counts.counts[i] += 3;
    }

    if run_can_start(i) && counts.counts[i + 1] > 0 && counts.counts[i + 2] > 0 {
        counts.counts[i] -= 1;
        counts.counts[i + 1] -= 1;
        counts.counts[i + 2] -= 1;
        current.push(Group::Run(i as u8));
        collect_groups(counts, i, current, emit);
        current.pop();
        counts.counts[i] += 1;
        counts.counts[i + 1] += 1;
        counts.counts[i + 2] += 1;
    }
}

/// 13-tile tenpai check: some 14th tile completes the hand.
pub fn is_tenpai(counts: &TileCounts) -> bool {
    let mut work = *counts;
    for i in 0..TILE_KINDS {
        if work.counts[i] >= 4 {
            continue;
        }
        work.counts[i] += 1;

        if is_kokushi(&work) || is_chiitoitsu(&work) {
            work.counts[i] -= 1;
            return true;
        }

        // The added tile must touch something to complete a standard hand.
        let c = work.counts[i];
        let touches = if i >= 27 {
            c >= 2
        } else {
            let prev = i % 9 > 0 && work.counts[i - 1] > 0;
            let next = i % 9 < 8 && work.counts[i + 1] > 0;
            c >= 2 || prev || next
        };
        if touches && is_standard_agari(&work) {
            work.counts[i] -= 1;
            return true;
        }

        work.counts[i] -= 1;
    }
    false
}

/// Tile values completing a 13-tile hand. Values the hand already holds
/// four of are excluded (they cannot be drawn or discarded by anyone).
pub fn wait_tiles(counts: &TileCounts) -> Vec<u8> {
    let mut waits = Vec::new();
    let mut work = *counts;
    for i in 0..TILE_KINDS {
        if work.counts[i] >= 4 {
            continue;
        }
        work.counts[i] += 1;
        if is_agari(&work) {
            waits.push(i as u8);
        }
        work.counts[i] -= 1;
    }
    waits
}
