/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Hyperperiod of a task set, in ticks.
//!
//! The hyperperiod is the LCM of all task periods: the smallest window after
//! which the release pattern repeats.  Offline simulation uses it as the
//! default horizon, and the final report prints it.
//!
//! Every failure case is a distinct variant rather than a `0` sentinel, and
//! the LCM fold is overflow-checked.

use tracing::{debug, warn};

use crate::task::Tick;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Default upper limit on a hyperperiod worth simulating.
pub const DEFAULT_HYPERPERIOD_LIMIT: Tick = 1_000_000;

// ── Error type ────────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
pub enum HyperperiodError {
    /// The period list was empty or only held zeros.
    NoValidPeriods,

    /// `lcm(a, b)` does not fit in a `Tick`.
    Overflow { a: Tick, b: Tick },

    /// The hyperperiod is above the caller's limit.
    TooLarge { value: Tick, limit: Tick },
}

impl std::fmt::Display for HyperperiodError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HyperperiodError::NoValidPeriods => {
                write!(f, "no tasks with a valid (non-zero) period")
            }
            HyperperiodError::Overflow { a, b } => {
                write!(f, "LCM overflow computing lcm({a}, {b})")
            }
            HyperperiodError::TooLarge { value, limit } => {
                write!(f, "hyperperiod of {value} ticks exceeds limit of {limit} ticks")
            }
        }
    }
}

impl std::error::Error for HyperperiodError {}

// ── Arithmetic ────────────────────────────────────────────────────────────────

/// Euclid, iteratively.  `gcd(0, 0) == 0`.
pub fn gcd(a: Tick, b: Tick) -> Tick {
    let (mut x, mut y) = (a, b);
    while y != 0 {
        (x, y) = (y, x % y);
    }
    x
}

/// Overflow-checked LCM; `0` if either side is `0`.
pub fn lcm(a: Tick, b: Tick) -> Result<Tick, HyperperiodError> {
    if a == 0 || b == 0 {
        return Ok(0);
    }
    (a / gcd(a, b))
        .checked_mul(b)
        .ok_or(HyperperiodError::Overflow { a, b })
}

// ── HyperperiodInfo ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HyperperiodInfo {
    pub hyperperiod: Tick,
    /// Sorted, deduplicated.
    pub unique_periods: Vec<Tick>,
    /// Number of non-zero periods that contributed.
    pub task_count: usize,
}

/// LCM of `periods`, ignoring zeros, rejected if above `limit`.
pub fn calculate(periods: &[Tick], limit: Tick) -> Result<HyperperiodInfo, HyperperiodError> {
    let mut unique: Vec<Tick> = periods.iter().copied().filter(|&p| p > 0).collect();
    let task_count = unique.len();
    if unique.is_empty() {
        return Err(HyperperiodError::NoValidPeriods);
    }
    unique.sort_unstable();
    unique.dedup();

    let hyperperiod = unique.iter().try_fold(1, |acc, &p| lcm(acc, p))?;

    if hyperperiod > limit {
        warn!(hyperperiod, limit, "hyperperiod exceeds configured limit");
        return Err(HyperperiodError::TooLarge {
            value: hyperperiod,
            limit,
        });
    }

    debug!(hyperperiod, periods = ?unique, "calculated hyperperiod");
    Ok(HyperperiodInfo {
        hyperperiod,
        unique_periods: unique,
        task_count,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gcd_basic_cases() {
        assert_eq!(gcd(12, 8), 4);
        assert_eq!(gcd(17, 13), 1);
        assert_eq!(gcd(0, 5), 5);
        assert_eq!(gcd(0, 0), 0);
    }

    #[test]
    fn lcm_basic_cases() {
        assert_eq!(lcm(4, 6).unwrap(), 12);
        assert_eq!(lcm(4, 5).unwrap(), 20);
        assert_eq!(lcm(0, 5).unwrap(), 0);
    }

    #[test]
    fn lcm_overflow_is_reported() {
        let a = u64::MAX / 2 + 1;
        let b = u64::MAX / 2 + 3;
        assert!(matches!(lcm(a, b), Err(HyperperiodError::Overflow { .. })));
    }

    #[test]
    fn hyperperiod_of_classic_pair() {
        let info = calculate(&[4, 5], DEFAULT_HYPERPERIOD_LIMIT).unwrap();
        assert_eq!(info.hyperperiod, 20);
        assert_eq!(info.unique_periods, vec![4, 5]);
        assert_eq!(info.task_count, 2);
    }

    #[test]
    fn duplicates_and_zeros_are_ignored() {
        let info = calculate(&[6, 0, 4, 6], DEFAULT_HYPERPERIOD_LIMIT).unwrap();
        assert_eq!(info.hyperperiod, 12);
        assert_eq!(info.unique_periods, vec![4, 6]);
        assert_eq!(info.task_count, 3);
    }

    #[test]
    fn empty_or_all_zero_is_an_error() {
        assert_eq!(calculate(&[], 100), Err(HyperperiodError::NoValidPeriods));
        assert_eq!(calculate(&[0, 0], 100), Err(HyperperiodError::NoValidPeriods));
    }

    #[test]
    fn limit_is_inclusive() {
        assert_eq!(calculate(&[7, 3], 21).unwrap().hyperperiod, 21);
        assert_eq!(
            calculate(&[7, 3], 20),
            Err(HyperperiodError::TooLarge { value: 21, limit: 20 })
        );
    }
}
