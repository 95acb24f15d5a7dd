/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Observability records produced by the tick loop.
//!
//! * [`SchedEvent`]: human-readable happenings (release, miss, preemption…)
//!   kept in a bounded [`RingBuffer`].
//! * [`TickMark`] / [`TickRecord`]: the per-tick symbolic state of every task,
//!   consumed by the Gantt renderer.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::task::{TaskId, Tick};

// ── RingBuffer ────────────────────────────────────────────────────────────────

/// Fixed-capacity FIFO: pushing into a full buffer evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    buf: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// A capacity of `0` is bumped to `1` so the buffer always keeps the
    /// latest entry.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, item: T) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn iter(&self) -> std::collections::vec_deque::Iter<'_, T> {
        self.buf.iter()
    }
}

impl<T: Clone> RingBuffer<T> {
    /// The newest `n` entries, oldest first.
    pub fn latest(&self, n: usize) -> Vec<T> {
        let skip = self.buf.len().saturating_sub(n);
        self.buf.iter().skip(skip).cloned().collect()
    }
}

// ── SchedEvent ────────────────────────────────────────────────────────────────

/// Something worth telling an operator about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchedEvent {
    TaskAdded {
        tick: Tick,
        task: String,
    },
    TaskReplaced {
        tick: Tick,
        task: String,
    },
    Released {
        tick: Tick,
        task: String,
        instance: u64,
    },
    DeadlineMissed {
        tick: Tick,
        task: String,
        instance: u64,
        deadline_tick: Tick,
    },
    Preempted {
        tick: Tick,
        task: String,
        by: String,
    },
    Completed {
        tick: Tick,
        task: String,
        instance: u64,
    },
}

impl fmt::Display for SchedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedEvent::TaskAdded { tick, task } => write!(f, "[t={tick}] {task} added"),
            SchedEvent::TaskReplaced { tick, task } => {
                write!(f, "[t={tick}] {task} replaced with new parameters")
            }
            SchedEvent::Released { tick, task, instance } => {
                write!(f, "[t={tick}] {task}#{instance} released")
            }
            SchedEvent::DeadlineMissed {
                tick,
                task,
                instance,
                deadline_tick,
            } => write!(
                f,
                "[t={tick}] {task}#{instance} MISSED deadline (due t={deadline_tick})"
            ),
            SchedEvent::Preempted { tick, task, by } => {
                write!(f, "[t={tick}] {task} preempted by {by}")
            }
            SchedEvent::Completed { tick, task, instance } => {
                write!(f, "[t={tick}] {task}#{instance} completed")
            }
        }
    }
}

// ── Per-tick symbolic state ───────────────────────────────────────────────────

/// What one task was doing during one tick.
///
/// When several apply, the most significant wins:
/// `DeadlineHit > Running > Released > Ready > Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickMark {
    #[default]
    Idle,
    Ready,
    Released,
    Running,
    DeadlineHit,
}

impl TickMark {
    pub fn symbol(self) -> char {
        match self {
            TickMark::Idle => '·',
            TickMark::Ready => '░',
            TickMark::Released => '↑',
            TickMark::Running => '█',
            TickMark::DeadlineHit => '✗',
        }
    }
}

/// Symbolic state of every task for one executed tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickRecord {
    pub tick: Tick,
    /// Task that received this tick, `None` when idle.
    pub executed: Option<TaskId>,
    /// Indexed by `TaskId`; tasks added after this tick are absent and read
    /// as [`TickMark::Idle`].
    pub marks: Vec<TickMark>,
}

impl TickRecord {
    pub fn mark(&self, id: TaskId) -> TickMark {
        self.marks.get(id.index()).copied().unwrap_or_default()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
