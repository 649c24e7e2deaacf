//! # Key Progression Module
//!
//! Musical-key state for the mixing session: the current key bucket, the
//! direction the session walks the key wheel, and the static compatibility
//! table used to score transitions between keys.
//!
//! ## The key wheel
//!
//! Keys are buckets `1..=12` arranged on a wheel; [`KeyProgression::next`]
//! steps one bucket per transition, wrapping 12↔1. Adjacent buckets are
//! mixed-in-key neighbours, so a session that only ever steps the wheel stays
//! harmonically smooth.
//!
//! ## The compatibility table
//!
//! A 12×12 symmetric table assigns every key pair a score in `1..=10`:
//!
//! - identical key: 10
//! - relative major/minor partner (buckets 7 apart): 9
//! - wheel neighbours (circle-of-fifths adjacency, wraparound included): 8
//! - tritone opposite (buckets 5 apart): 1, the harshest clash
//! - everything else falls off with wheel distance
//!
//! The table is built once at first use and never changes, so scores are
//! stable for the lifetime of the process.

use crate::track::KEY_COUNT;
use log::trace;
use serde::{Deserialize, Serialize};

const KEYS: usize = KEY_COUNT as usize;

/// Direction the session walks the key wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }
}

lazy_static::lazy_static! {
    /// 12×12 key compatibility table, indexed `[key - 1][other - 1]`.
    static ref COMPATIBILITY: [[u8; KEYS]; KEYS] = build_table();
}

/// Build the compatibility table from the harmonic relationships above.
///
/// Symmetry holds by construction: every rule depends only on the unordered
/// pair. The special pairs (relative partner at plain distance 7, tritone at
/// plain distance 5) are exactly the pairs at wheel distance 5, so the
/// distance fall-off below never needs a value for distance 5.
fn build_table() -> [[u8; KEYS]; KEYS] {
    let mut table = [[0u8; KEYS]; KEYS];
    for a in 1..=KEYS as u8 {
        for b in 1..=KEYS as u8 {
            table[a as usize - 1][b as usize - 1] = score_pair(a, b);
        }
    }
    table
}

fn score_pair(a: u8, b: u8) -> u8 {
    if a == b {
        return 10;
    }
    let plain = a.abs_diff(b);
    if plain == 7 {
        return 9; // relative major/minor partner
    }
    if plain == 5 {
        return 1; // tritone opposite
    }
    let wheel = plain.min(KEY_COUNT - plain);
    match wheel {
        1 => 8,
        2 => 6,
        3 => 5,
        4 => 4,
        _ => 2, // distance 6, the far side of the wheel
    }
}

/// Current key/direction state plus pure compatibility queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyProgression {
    current_key: u8,
    direction: Direction,
}

impl Default for KeyProgression {
    fn default() -> Self {
        Self::new(1, Direction::Forward)
    }
}

impl KeyProgression {
    /// Keys outside `1..=12` are a caller contract violation; they are
    /// rejected by track validation before they can reach this module.
    #[must_use]
    pub fn new(key: u8, direction: Direction) -> Self {
        debug_assert!((1..=KEY_COUNT).contains(&key));
        Self {
            current_key: key,
            direction,
        }
    }

    #[must_use]
    pub fn current_key(&self) -> u8 {
        self.current_key
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Advance one step on the wheel and return the new current key.
    pub fn next(&mut self) -> u8 {
        self.current_key = self.peek_next();
        trace!("Key progression advanced to {}", self.current_key);
        self.current_key
    }

    /// The key [`next`](Self::next) would move to, without mutating.
    #[must_use]
    pub fn peek_next(&self) -> u8 {
        step(self.current_key, self.direction)
    }

    pub fn set_key(&mut self, key: u8) {
        debug_assert!((1..=KEY_COUNT).contains(&key));
        self.current_key = key;
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub fn toggle_direction(&mut self) {
        self.direction = self.direction.toggled();
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Compatibility score between two keys, `1..=10`. Pure table lookup,
    /// deterministic for the process lifetime.
    #[must_use]
    pub fn score_compatibility(a: u8, b: u8) -> u8 {
        debug_assert!((1..=KEY_COUNT).contains(&a) && (1..=KEY_COUNT).contains(&b));
        COMPATIBILITY[a as usize - 1][b as usize - 1]
    }

    /// Score of `b` against the current key.
    #[must_use]
    pub fn score_from_current(&self, b: u8) -> u8 {
        Self::score_compatibility(self.current_key, b)
    }

    /// All 12 keys sorted by descending score against `from`, ties broken by
    /// ascending key number. `from` itself is always first (score 10).
    #[must_use]
    pub fn compatible_keys(from: u8) -> Vec<u8> {
        let mut keys: Vec<u8> = (1..=KEY_COUNT).collect();
        keys.sort_by_key(|&k| (std::cmp::Reverse(Self::score_compatibility(from, k)), k));
        keys
    }

    #[must_use]
    pub fn is_highly_compatible(a: u8, b: u8) -> bool {
        Self::score_compatibility(a, b) >= 8
    }

    /// Number of [`next`](Self::next) steps to travel from `from` to `to` in
    /// the given direction (current direction when `None`), with wraparound.
    /// Zero iff the keys are equal.
    #[must_use]
    pub fn distance(&self, from: u8, to: u8, direction: Option<Direction>) -> u8 {
        let direction = direction.unwrap_or(self.direction);
        let diff = match direction {
            Direction::Forward => i16::from(to) - i16::from(from),
            Direction::Reverse => i16::from(from) - i16::from(to),
        };
        diff.rem_euclid(i16::from(KEY_COUNT)) as u8
    }
}

fn step(key: u8, direction: Direction) -> u8 {
    match direction {
        Direction::Forward => {
            if key == KEY_COUNT {
                1
            } else {
                key + 1
            }
        }
        Direction::Reverse => {
            if key == 1 {
                KEY_COUNT
            } else {
                key - 1
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_symmetric_and_in_range() {
        for a in 1..=12u8 {
            for b in 1..=12u8 {
                let ab = KeyProgression::score_compatibility(a, b);
                let ba = KeyProgression::score_compatibility(b, a);
                assert_eq!(ab, ba, "table asymmetric at ({a},{b})");
                assert!((1..=10).contains(&ab), "score {ab} out of range at ({a},{b})");
            }
        }
    }

    #[test]
    fn identical_keys_score_ten() {
        for k in 1..=12u8 {
            assert_eq!(KeyProgression::score_compatibility(k, k), 10);
        }
    }

    #[test]
    fn relative_partner_and_tritone_spot_checks() {
        assert_eq!(KeyProgression::score_compatibility(1, 8), 9);
        assert_eq!(KeyProgression::score_compatibility(8, 1), 9);
        assert_eq!(KeyProgression::score_compatibility(1, 6), 1);
        assert_eq!(KeyProgression::score_compatibility(6, 1), 1);
    }

    #[test]
    fn wheel_neighbours_score_high() {
        assert_eq!(KeyProgression::score_compatibility(3, 4), 8);
        assert_eq!(KeyProgression::score_compatibility(12, 1), 8);
        assert!(KeyProgression::is_highly_compatible(12, 1));
        assert!(!KeyProgression::is_highly_compatible(1, 6));
    }

    #[test]
    fn next_wraps_both_directions() {
        let mut forward = KeyProgression::new(12, Direction::Forward);
        assert_eq!(forward.next(), 1);

        let mut reverse = KeyProgression::new(1, Direction::Reverse);
        assert_eq!(reverse.next(), 12);
    }

    #[test]
    fn twelve_steps_return_to_start() {
        for start in 1..=12u8 {
            for direction in [Direction::Forward, Direction::Reverse] {
                let mut progression = KeyProgression::new(start, direction);
                for _ in 0..12 {
                    progression.next();
                }
                assert_eq!(progression.current_key(), start);
            }
        }
    }

    #[test]
    fn peek_does_not_mutate() {
        let progression = KeyProgression::new(5, Direction::Forward);
        assert_eq!(progression.peek_next(), 6);
        assert_eq!(progression.current_key(), 5);
    }

    #[test]
    fn compatible_keys_sorted_with_self_first() {
        for from in 1..=12u8 {
            let keys = KeyProgression::compatible_keys(from);
            assert_eq!(keys.len(), 12);
            assert_eq!(keys[0], from);

            for pair in keys.windows(2) {
                let a = KeyProgression::score_compatibility(from, pair[0]);
                let b = KeyProgression::score_compatibility(from, pair[1]);
                assert!(a > b || (a == b && pair[0] < pair[1]));
            }
        }
    }

    #[test]
    fn distance_zero_iff_same_key() {
        let progression = KeyProgression::default();
        for k in 1..=12u8 {
            assert_eq!(progression.distance(k, k, Some(Direction::Forward)), 0);
            assert_eq!(progression.distance(k, k, Some(Direction::Reverse)), 0);
        }
        assert_eq!(progression.distance(1, 2, Some(Direction::Forward)), 1);
        assert_eq!(progression.distance(1, 2, Some(Direction::Reverse)), 11);
        assert_eq!(progression.distance(12, 1, Some(Direction::Forward)), 1);
    }

    #[test]
    fn distance_uses_current_direction_by_default() {
        let mut progression = KeyProgression::default();
        assert_eq!(progression.distance(1, 4, None), 3);
        progression.toggle_direction();
        assert_eq!(progression.distance(1, 4, None), 9);
    }

    #[test]
    fn reset_restores_defaults() {
        let mut progression = KeyProgression::new(7, Direction::Reverse);
        progression.reset();
        assert_eq!(progression.current_key(), 1);
        assert_eq!(progression.direction(), Direction::Forward);
    }
}
