/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Scheduling policies and their priority functions.
//!
//! | Algorithm | Priority key (smaller = higher priority) |
//! |---|---|
//! | RM  | `period` (static) |
//! | EDF | `release_time + deadline` of the current instance (dynamic) |
//!
//! Equal keys are broken by [`TaskId`](crate::task::TaskId), i.e. insertion
//! order: the task added first wins.  Preemption only ever happens on a
//! *strictly* smaller key, so the tie-break decides selection but never causes
//! a preemption by itself.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::scheduler::error::SchedulerError;
use crate::task::{Task, Tick};

// ── Algorithm ─────────────────────────────────────────────────────────────────

/// Scheduling discipline, fixed when the scheduler is constructed.
///
/// Parsing is the only way to obtain one from text, so an unknown name is
/// rejected before any engine exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Algorithm {
    /// Rate-Monotonic: shorter period → higher priority.
    #[default]
    RateMonotonic,
    /// Earliest-Deadline-First: nearer absolute deadline → higher priority.
    EarliestDeadlineFirst,
}

impl Algorithm {
    /// Short name used on the wire and in logs (`"RM"` / `"EDF"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::RateMonotonic => "RM",
            Algorithm::EarliestDeadlineFirst => "EDF",
        }
    }

    /// Priority key of `task`'s current instance; smaller runs first.
    pub fn priority_key(self, task: &Task) -> Tick {
        match self {
            Algorithm::RateMonotonic => task.period,
            Algorithm::EarliestDeadlineFirst => task.absolute_deadline(),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RM" | "RATE_MONOTONIC" => Ok(Algorithm::RateMonotonic),
            "EDF" | "EARLIEST_DEADLINE_FIRST" => Ok(Algorithm::EarliestDeadlineFirst),
            _ => Err(SchedulerError::UnknownAlgorithm(s.to_string())),
        }
    }
}

impl TryFrom<String> for Algorithm {
    type Error = SchedulerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Algorithm> for String {
    fn from(a: Algorithm) -> Self {
        a.as_str().to_string()
    }
}

// ── MissPolicy ────────────────────────────────────────────────────────────────

/// How an unfinished instance is detected as late.
///
/// Two behaviours exist for a task whose previous instance is still running
/// when the next release is due:
///
/// * `ReleaseAndSweep` flags the superseded instance inside the release itself
///   and additionally runs the per-tick deadline sweep.
/// * `DeadlineSweepOnly` leaves the release alone and relies on the sweep
///   alone, which only ever sees the current instance's absolute deadline.
///   With `deadline == period` the sweep never gets a chance to see an overrun
///   because the re-release overwrites `release_time` first.
///
/// Both record a given instance at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissPolicy {
    #[default]
    ReleaseAndSweep,
    DeadlineSweepOnly,
}

impl MissPolicy {
    pub fn flags_overrun_on_release(self) -> bool {
        matches!(self, MissPolicy::ReleaseAndSweep)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_names_case_insensitively() {
        assert_eq!("RM".parse::<Algorithm>().unwrap(), Algorithm::RateMonotonic);
        assert_eq!("rm".parse::<Algorithm>().unwrap(), Algorithm::RateMonotonic);
        assert_eq!(
            " edf ".parse::<Algorithm>().unwrap(),
            Algorithm::EarliestDeadlineFirst
        );
    }

    #[test]
    fn unknown_name_is_a_configuration_error() {
        assert_eq!(
            "FIFO".parse::<Algorithm>().unwrap_err(),
            SchedulerError::UnknownAlgorithm("FIFO".into())
        );
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for a in [Algorithm::RateMonotonic, Algorithm::EarliestDeadlineFirst] {
            assert_eq!(a.to_string().parse::<Algorithm>().unwrap(), a);
        }
    }

    #[test]
    fn rm_key_is_period() {
        let mut t = Task::new("t", 7, 1, Some(3)).unwrap();
        t.release(14, true);
        assert_eq!(Algorithm::RateMonotonic.priority_key(&t), 7);
    }

    #[test]
    fn edf_key_is_absolute_deadline() {
        let mut t = Task::new("t", 7, 1, Some(3)).unwrap();
        t.release(14, true);
        assert_eq!(Algorithm::EarliestDeadlineFirst.priority_key(&t), 17);
    }

    #[test]
    fn serde_uses_short_names() {
        let json = serde_json::to_string(&Algorithm::EarliestDeadlineFirst).unwrap();
        assert_eq!(json, "\"EDF\"");
        let back: Algorithm = serde_json::from_str("\"rm\"").unwrap();
        assert_eq!(back, Algorithm::RateMonotonic);
        assert!(serde_json::from_str::<Algorithm>("\"LLF\"").is_err());
    }

    #[test]
    fn default_miss_policy_flags_on_release() {
        assert!(MissPolicy::default().flags_overrun_on_release());
        assert!(!MissPolicy::DeadlineSweepOnly.flags_overrun_on_release());
    }
}
