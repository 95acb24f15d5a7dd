/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Periodic task model and its per-instance state machine.
//!
//! ```text
//!            release(t)                      consume_tick() → 0
//!   Idle ─────────────────►  Active  ──────────────────────────►  Idle
//!  (remaining == 0)     (remaining > 0)
//!                          │      ▲
//!                          └──────┘ release(t) while still active
//!                                   = overrun, previous instance flagged
//! ```
//!
//! # Ownership model
//! Every `Task` is **owned** by the [`Scheduler`](crate::scheduler::Scheduler)
//! arena for the lifetime of the process.  Nothing outside the engine holds a
//! mutable reference; callers only ever see [`TaskSnapshot`] copies.

use serde::{Deserialize, Serialize};

use crate::scheduler::SchedulerError;

/// Simulated time, in ticks.
pub type Tick = u64;

// ── TaskId ────────────────────────────────────────────────────────────────────

/// Stable arena index of a task inside the scheduler.
///
/// Ids are handed out in insertion order and never reused, so ordering by
/// `TaskId` is the deterministic tie-break between equal-priority tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub usize);

impl TaskId {
    pub fn index(self) -> usize {
        self.0
    }
}

// ── Deadline miss record ──────────────────────────────────────────────────────

/// One instance that did not complete before its absolute deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlineMiss {
    /// Instance index (1-based, the value of `Task::instance` when the miss
    /// happened).
    pub instance: u64,

    /// Absolute deadline of that instance: `release_time + deadline`.
    pub deadline_tick: Tick,

    /// Tick at which the engine noticed the miss.
    pub detected_at: Tick,
}

// ── Task ──────────────────────────────────────────────────────────────────────

/// A periodic job plus the execution state of its current instance.
#[derive(Debug, Clone)]
pub struct Task {
    // ── Identity & timing parameters ──────────────────────────────────────────
    pub name: String,

    /// Ticks between successive releases.
    pub period: Tick,

    /// Ticks of work per instance.
    pub execution_time: Tick,

    /// Relative deadline (ticks after release).
    pub deadline: Tick,

    // ── Current instance state ────────────────────────────────────────────────
    /// Work left on the current instance; `0` when idle.
    pub remaining_time: Tick,

    /// Absolute tick at which the current instance was released.
    pub release_time: Tick,

    /// Absolute tick of the next release.
    pub next_release: Tick,

    /// Number of releases so far.
    pub instance: u64,

    /// Instances that missed their deadline, in detection order.
    pub deadline_misses: Vec<DeadlineMiss>,

    /// Number of instances that ran to completion.
    pub completions: u64,

    /// Tick at which this task (under these parameters) was added.  Earlier
    /// history in the same slot belongs to a task it overwrote.
    pub added_at: Tick,
}

impl Task {
    /// Build a task, validating every timing parameter.
    ///
    /// `deadline` defaults to `period` when `None`.
    ///
    /// # Errors
    /// [`SchedulerError::EmptyName`] or [`SchedulerError::InvalidParameter`]
    /// when any of `period`, `execution_time` or `deadline` is zero.
    pub fn new(
        name: impl Into<String>,
        period: Tick,
        execution_time: Tick,
        deadline: Option<Tick>,
    ) -> Result<Self, SchedulerError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SchedulerError::EmptyName);
        }
        let deadline = deadline.unwrap_or(period);

        for (field, value) in [
            ("period", period),
            ("execution_time", execution_time),
            ("deadline", deadline),
        ] {
            if value == 0 {
                return Err(SchedulerError::InvalidParameter { field, value: 0 });
            }
        }

        Ok(Self {
            name,
            period,
            execution_time,
            deadline,
            remaining_time: 0,
            release_time: 0,
            next_release: 0,
            instance: 0,
            deadline_misses: Vec::new(),
            completions: 0,
            added_at: 0,
        })
    }

    /// Absolute deadline of the current instance.
    pub fn absolute_deadline(&self) -> Tick {
        self.release_time.saturating_add(self.deadline)
    }

    /// `true` while the current instance still has work left.
    pub fn is_active(&self) -> bool {
        self.remaining_time > 0
    }

    /// `execution_time / period`.
    pub fn utilization(&self) -> f64 {
        self.execution_time as f64 / self.period as f64
    }

    /// `true` if a release at `tick` is due.
    pub fn is_due(&self, tick: Tick) -> bool {
        tick >= self.next_release
    }

    /// `true` if `instance` has already been recorded as a miss.
    pub fn has_missed(&self, instance: u64) -> bool {
        self.deadline_misses.iter().any(|m| m.instance == instance)
    }

    /// Release a new instance at `tick`.
    ///
    /// When `flag_overrun` is set and the previous instance is still active,
    /// that instance is recorded as missed (once) before the counters move on.
    /// The new instance is released regardless.
    ///
    /// Returns the miss recorded by this call, if any.
    pub fn release(&mut self, tick: Tick, flag_overrun: bool) -> Option<DeadlineMiss> {
        let overrun = if flag_overrun && self.is_active() {
            self.record_miss(tick)
        } else {
            None
        };

        self.release_time = tick;
        self.remaining_time = self.execution_time;
        self.next_release = tick.saturating_add(self.period);
        self.instance += 1;

        debug_assert_eq!(self.next_release, self.release_time + self.period);
        overrun
    }

    /// Deadline sweep for the current instance.
    ///
    /// Records a miss when the instance is still active and `tick` is past its
    /// absolute deadline.  Never records the same instance twice.
    pub fn check_deadline(&mut self, tick: Tick) -> Option<DeadlineMiss> {
        if self.instance == 0 || !self.is_active() || tick <= self.absolute_deadline() {
            return None;
        }
        self.record_miss(tick)
    }

    /// Spend one tick of work on the current instance.
    ///
    /// Returns `true` when the instance just completed.
    pub fn consume_tick(&mut self) -> bool {
        debug_assert!(self.remaining_time > 0, "task '{}' executed while idle", self.name);
        self.remaining_time = self.remaining_time.saturating_sub(1);
        if self.remaining_time == 0 {
            self.completions += 1;
            true
        } else {
            false
        }
    }

    /// Copy of the externally visible fields.
    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            name: self.name.clone(),
            period: self.period,
            execution_time: self.execution_time,
            deadline: self.deadline,
            remaining_time: self.remaining_time,
            instance: self.instance,
            next_release: self.next_release,
        }
    }

    fn record_miss(&mut self, detected_at: Tick) -> Option<DeadlineMiss> {
        if self.has_missed(self.instance) {
            return None;
        }
        let miss = DeadlineMiss {
            instance: self.instance,
            deadline_tick: self.absolute_deadline(),
            detected_at,
        };
        self.deadline_misses.push(miss);
        Some(miss)
    }
}

// ── Snapshots (read-only copies handed to callers) ────────────────────────────

/// Per-task view returned by `list_tasks` / `add_task`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub name: String,
    pub period: Tick,
    pub execution_time: Tick,
    pub deadline: Tick,
    pub remaining_time: Tick,
    pub instance: u64,
    pub next_release: Tick,
}

/// One entry of `get_deadline_misses`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissSnapshot {
    pub task_name: String,
    pub instance: u64,
    pub scheduled_deadline_tick: Tick,
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn task(period: Tick, execution_time: Tick) -> Task {
        Task::new("t", period, execution_time, None).unwrap()
    }

    // ── construction ──────────────────────────────────────────────────────────

    #[test]
    fn deadline_defaults_to_period() {
        let t = task(7, 2);
        assert_eq!(t.deadline, 7);
        assert_eq!(t.instance, 0);
        assert_eq!(t.next_release, 0);
        assert!(!t.is_active());
    }

    #[test]
    fn zero_parameters_are_rejected() {
        assert_eq!(
            Task::new("t", 0, 1, None).unwrap_err(),
            SchedulerError::InvalidParameter { field: "period", value: 0 }
        );
        assert_eq!(
            Task::new("t", 4, 0, None).unwrap_err(),
            SchedulerError::InvalidParameter { field: "execution_time", value: 0 }
        );
        assert_eq!(
            Task::new("t", 4, 1, Some(0)).unwrap_err(),
            SchedulerError::InvalidParameter { field: "deadline", value: 0 }
        );
    }

    #[test]
    fn blank_name_is_rejected() {
        assert_eq!(Task::new("  ", 4, 1, None).unwrap_err(), SchedulerError::EmptyName);
    }

    #[test]
    fn utilization_is_exec_over_period() {
        assert!((task(5, 2).utilization() - 0.4).abs() < 1e-12);
    }

    // ── release ───────────────────────────────────────────────────────────────

    #[test]
    fn release_sets_instance_state() {
        let mut t = task(5, 2);
        assert!(t.release(10, true).is_none());
        assert_eq!(t.release_time, 10);
        assert_eq!(t.remaining_time, 2);
        assert_eq!(t.next_release, 15);
        assert_eq!(t.instance, 1);
        assert_eq!(t.absolute_deadline(), 15);
    }

    #[test]
    fn instance_increases_by_one_per_release() {
        let mut t = task(3, 1);
        for expected in 1..=5 {
            t.release(t.next_release, true);
            assert_eq!(t.instance, expected);
            assert_eq!(t.next_release, t.release_time + t.period);
        }
    }

    #[test]
    fn overrun_flags_the_superseded_instance() {
        let mut t = task(4, 3);
        t.release(0, true);
        t.consume_tick();

        let miss = t.release(4, true).expect("unfinished instance must be flagged");
        assert_eq!(miss.instance, 1);
        assert_eq!(miss.deadline_tick, 4);
        assert_eq!(miss.detected_at, 4);
        // new instance is released regardless
        assert_eq!(t.instance, 2);
        assert_eq!(t.remaining_time, 3);
    }

    #[test]
    fn overrun_not_flagged_when_disabled() {
        let mut t = task(4, 3);
        t.release(0, false);
        assert!(t.release(4, false).is_none());
        assert!(t.deadline_misses.is_empty());
    }

    // ── deadline sweep ────────────────────────────────────────────────────────

    #[test]
    fn sweep_flags_only_after_absolute_deadline() {
        let mut t = Task::new("t", 10, 5, Some(3)).unwrap();
        t.release(0, true);
        assert!(t.check_deadline(3).is_none(), "deadline tick itself is not late");
        let miss = t.check_deadline(4).unwrap();
        assert_eq!(miss.instance, 1);
        assert_eq!(miss.deadline_tick, 3);
    }

    #[test]
    fn miss_is_recorded_once_per_instance() {
        let mut t = Task::new("t", 10, 5, Some(3)).unwrap();
        t.release(0, true);
        assert!(t.check_deadline(4).is_some());
        assert!(t.check_deadline(5).is_none());
        // overrun at the next release must not duplicate instance 1
        assert!(t.release(10, true).is_none());
        assert_eq!(t.deadline_misses.len(), 1);
    }

    #[test]
    fn sweep_ignores_unreleased_and_idle_tasks() {
        let mut t = task(4, 1);
        assert!(t.check_deadline(100).is_none());
        t.release(0, true);
        t.consume_tick();
        assert!(t.check_deadline(100).is_none());
    }

    // ── execution ─────────────────────────────────────────────────────────────

    #[test]
    fn consume_tick_reports_completion() {
        let mut t = task(4, 2);
        t.release(0, true);
        assert!(!t.consume_tick());
        assert_eq!(t.remaining_time, 1);
        assert!(t.consume_tick());
        assert_eq!(t.remaining_time, 0);
        assert_eq!(t.completions, 1);
    }

    #[test]
    fn snapshot_copies_public_fields() {
        let mut t = Task::new("cam", 6, 3, Some(5)).unwrap();
        t.release(0, true);
        let s = t.snapshot();
        assert_eq!(
            s,
            TaskSnapshot {
                name: "cam".into(),
                period: 6,
                execution_time: 3,
                deadline: 5,
                remaining_time: 3,
                instance: 1,
                next_release: 6,
            }
        );
    }
}
