//! Tick-driven uniprocessor scheduler for periodic real-time tasks.
//!
//! [`Scheduler`] owns every [`Task`] in an append-only arena, advances
//! simulated time one [`tick`](Scheduler::tick) at a time and records what ran.
//! It is a plain synchronous state machine: the async runtime around it lives
//! in [`crate::engine`].
//!
//! # One tick
//!
//! ```text
//!  ┌─ release ─┐  ┌─ deadline sweep ─┐  ┌─ select / preempt ─┐  ┌─ execute ─┐  ┌─ record ─┐
//!  │ t ≥ next  │→ │ t > rel + D and  │→ │ RM: min period     │→ │ remaining │→ │ history  │→ t += 1
//!  │ release   │  │ still active     │  │ EDF: min abs. dl.  │  │   -= 1    │  │ + marks  │
//!  └───────────┘  └──────────────────┘  └────────────────────┘  └───────────┘  └──────────┘
//! ```
//!
//! # Design decisions
//!
//! | Topic | Choice |
//! |---|---|
//! | Task identity | [`TaskId`] arena index; ready set and running task are ids, never references |
//! | Ready set | `BTreeSet<TaskId>`, iteration in insertion order, deterministic |
//! | Tie-break | lower `TaskId` (added earlier) wins among equal priority keys |
//! | Preemption | only on a strictly smaller priority key; progress is kept |
//! | Running task | always a member of the ready set until it completes |
//! | Overrun | see [`MissPolicy`] |
//! | Failure | a tick cannot fail; bad input is rejected in `add_task` |
//!
//! # Example
//! ```rust
//! use ticksched::scheduler::{Algorithm, Scheduler};
//!
//! let mut s = Scheduler::new(Algorithm::RateMonotonic);
//! s.add_task("T1", 4, 1, None).unwrap();
//! s.add_task("T2", 5, 2, None).unwrap();
//! s.run_for(4);
//! assert_eq!(s.timeline(), vec!["T1", "T2", "T2", "idle"]);
//! ```

pub mod error;
pub mod events;
pub mod feasibility;
pub mod policy;
pub mod report;

pub use error::{Diagnostic, SchedulerError};
pub use events::{RingBuffer, SchedEvent, TickMark, TickRecord};
pub use policy::{Algorithm, MissPolicy};
pub use report::Report;

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::task::{DeadlineMiss, MissSnapshot, Task, TaskId, TaskSnapshot, Tick};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Default number of [`SchedEvent`]s retained.
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 50;

/// Default number of [`TickRecord`]s retained for the visualiser.
pub const DEFAULT_TRACE_CAPACITY: usize = 64;

/// Label used for "nothing ran" in timelines and status.
pub const IDLE_LABEL: &str = "idle";

// ── Façade result types ───────────────────────────────────────────────────────

/// Answer to `get_status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub current_tick: Tick,
    /// Name of the running task, or [`IDLE_LABEL`].
    pub running_task: String,
    /// Released-but-unfinished tasks (running one included), highest priority
    /// first.
    pub ready_queue: Vec<String>,
    pub total_tasks: usize,
}

/// Answer to `add_task`.
#[derive(Debug, Clone)]
pub struct AddOutcome {
    pub task: TaskSnapshot,
    /// `true` when an existing task with the same name was overwritten.
    pub replaced: bool,
    pub warnings: Vec<Diagnostic>,
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

/// The scheduling engine.
///
/// Sole owner of all tasks.  Entries are never removed; re-adding a name
/// overwrites the task in its original slot.
#[derive(Debug, Clone)]
pub struct Scheduler {
    algorithm: Algorithm,
    miss_policy: MissPolicy,

    tasks: Vec<Task>,
    index: HashMap<String, TaskId>,

    ready_queue: BTreeSet<TaskId>,
    running: Option<TaskId>,
    current_tick: Tick,

    history: Vec<Option<TaskId>>,
    events: RingBuffer<SchedEvent>,
    trace: RingBuffer<TickRecord>,

    /// Last `T<n>` suffix handed out by [`add_unnamed_task`](Self::add_unnamed_task).
    auto_named: u64,
}

impl Scheduler {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            miss_policy: MissPolicy::default(),
            tasks: Vec::new(),
            index: HashMap::new(),
            ready_queue: BTreeSet::new(),
            running: None,
            current_tick: 0,
            history: Vec::new(),
            events: RingBuffer::with_capacity(DEFAULT_EVENT_LOG_CAPACITY),
            trace: RingBuffer::with_capacity(DEFAULT_TRACE_CAPACITY),
            auto_named: 0,
        }
    }

    pub fn with_event_log_capacity(mut self, capacity: usize) -> Self {
        self.events = RingBuffer::with_capacity(capacity);
        self
    }

    pub fn with_trace_capacity(mut self, capacity: usize) -> Self {
        self.trace = RingBuffer::with_capacity(capacity);
        self
    }

    pub fn with_miss_policy(mut self, miss_policy: MissPolicy) -> Self {
        self.miss_policy = miss_policy;
        self
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn miss_policy(&self) -> MissPolicy {
        self.miss_policy
    }

    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    /// All tasks in insertion order; `tasks()[id.index()]` is the task `id`.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task_id(&self, name: &str) -> Option<TaskId> {
        self.index.get(name).copied()
    }

    pub fn task_by_name(&self, name: &str) -> Option<&Task> {
        self.task_id(name).map(|id| &self.tasks[id.index()])
    }

    pub fn running_task(&self) -> Option<TaskId> {
        self.running
    }

    pub fn is_ready(&self, id: TaskId) -> bool {
        self.ready_queue.contains(&id)
    }

    /// Unique-or-not task periods, for hyperperiod calculation.
    pub fn periods(&self) -> Vec<Tick> {
        self.tasks.iter().map(|t| t.period).collect()
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    /// Add (or overwrite) a periodic task.
    ///
    /// The task becomes eligible for release at the next tick boundary.  When
    /// `name` already exists the old task's state and miss history are
    /// discarded and it leaves the ready set; its position in insertion order
    /// is kept.
    ///
    /// # Errors
    /// [`SchedulerError`] when a parameter is zero or the name is blank.  The
    /// scheduler is not modified in that case.
    pub fn add_task(
        &mut self,
        name: impl Into<String>,
        period: Tick,
        execution_time: Tick,
        deadline: Option<Tick>,
    ) -> Result<AddOutcome, SchedulerError> {
        let mut task = Task::new(name, period, execution_time, deadline)?;
        task.next_release = self.current_tick;
        task.added_at = self.current_tick;
        let name = task.name.clone();

        let (id, replaced) = match self.index.get(&name).copied() {
            Some(id) => {
                self.ready_queue.remove(&id);
                if self.running == Some(id) {
                    self.running = None;
                }
                self.tasks[id.index()] = task;
                self.events.push(SchedEvent::TaskReplaced {
                    tick: self.current_tick,
                    task: name.clone(),
                });
                (id, true)
            }
            None => {
                let id = TaskId(self.tasks.len());
                self.tasks.push(task);
                self.index.insert(name.clone(), id);
                self.events.push(SchedEvent::TaskAdded {
                    tick: self.current_tick,
                    task: name.clone(),
                });
                (id, false)
            }
        };

        let added = &self.tasks[id.index()];
        info!(
            task           = %name,
            period         = added.period,
            execution_time = added.execution_time,
            deadline       = added.deadline,
            replaced,
            tick           = self.current_tick,
            "task added"
        );

        let mut warnings: Vec<Diagnostic> = Vec::new();
        warnings.extend(feasibility::check_task(added));
        warnings.extend(feasibility::check_task_set(self.algorithm, &self.tasks));
        for w in &warnings {
            warn!(task = %name, "{w}");
        }

        Ok(AddOutcome {
            task: added.snapshot(),
            replaced,
            warnings,
        })
    }

    /// Add a task under the first free `T<n>` name.
    ///
    /// Names already taken (by a caller or an earlier auto-name) are skipped,
    /// so an unnamed add never overwrites an existing task.  The counter only
    /// advances when the task is accepted.
    ///
    /// # Errors
    /// Same as [`add_task`](Self::add_task).
    pub fn add_unnamed_task(
        &mut self,
        period: Tick,
        execution_time: Tick,
        deadline: Option<Tick>,
    ) -> Result<AddOutcome, SchedulerError> {
        let mut n = self.auto_named;
        let name = loop {
            n += 1;
            let candidate = format!("T{n}");
            if !self.index.contains_key(&candidate) {
                break candidate;
            }
        };
        let outcome = self.add_task(name, period, execution_time, deadline)?;
        self.auto_named = n;
        Ok(outcome)
    }

    /// Run exactly one tick.  Returns the task that received it.
    pub fn tick(&mut self) -> Option<TaskId> {
        let now = self.current_tick;
        let n = self.tasks.len();
        let mut released = vec![false; n];
        let mut missed = vec![false; n];
        let flag_overrun = self.miss_policy.flags_overrun_on_release();

        // ── 1. Release pass ───────────────────────────────────────────────────
        for (i, task) in self.tasks.iter_mut().enumerate() {
            if !task.is_due(now) {
                continue;
            }
            if let Some(miss) = task.release(now, flag_overrun) {
                missed[i] = true;
                Self::log_miss(&mut self.events, &task.name, miss, "overrun at release");
            }
            released[i] = true;
            self.ready_queue.insert(TaskId(i));

            debug!(
                tick     = now,
                task     = %task.name,
                instance = task.instance,
                abs_deadline = task.absolute_deadline(),
                "released"
            );
            self.events.push(SchedEvent::Released {
                tick: now,
                task: task.name.clone(),
                instance: task.instance,
            });
        }

        // ── 2. Deadline sweep ─────────────────────────────────────────────────
        for (i, task) in self.tasks.iter_mut().enumerate() {
            if let Some(miss) = task.check_deadline(now) {
                missed[i] = true;
                Self::log_miss(&mut self.events, &task.name, miss, "deadline passed");
            }
        }

        // ── 3. Selection / preemption ─────────────────────────────────────────
        let selected = self.select(now);

        // ── 4. Execution ──────────────────────────────────────────────────────
        if let Some(id) = selected {
            let task = &mut self.tasks[id.index()];
            if task.consume_tick() {
                self.ready_queue.remove(&id);
                self.running = None;
                debug!(tick = now, task = %task.name, instance = task.instance, "completed");
                self.events.push(SchedEvent::Completed {
                    tick: now,
                    task: task.name.clone(),
                    instance: task.instance,
                });
            }
        }

        // ── 5. Record ─────────────────────────────────────────────────────────
        self.history.push(selected);
        let marks = (0..n)
            .map(|i| {
                let id = TaskId(i);
                if missed[i] {
                    TickMark::DeadlineHit
                } else if selected == Some(id) {
                    TickMark::Running
                } else if released[i] {
                    TickMark::Released
                } else if self.ready_queue.contains(&id) {
                    TickMark::Ready
                } else {
                    TickMark::Idle
                }
            })
            .collect();
        self.trace.push(TickRecord {
            tick: now,
            executed: selected,
            marks,
        });

        debug_assert!(self.running.map_or(true, |id| self.ready_queue.contains(&id)));

        // ── 6. Advance ────────────────────────────────────────────────────────
        self.current_tick += 1;
        selected
    }

    /// Run `ticks` consecutive ticks.
    pub fn run_for(&mut self, ticks: Tick) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn get_status(&self) -> StatusSnapshot {
        StatusSnapshot {
            current_tick: self.current_tick,
            running_task: self
                .running
                .map(|id| self.tasks[id.index()].name.clone())
                .unwrap_or_else(|| IDLE_LABEL.to_string()),
            ready_queue: self
                .ready_by_priority()
                .into_iter()
                .map(|id| self.tasks[id.index()].name.clone())
                .collect(),
            total_tasks: self.tasks.len(),
        }
    }

    /// Snapshot of every task, in insertion order.
    pub fn list_tasks(&self) -> Vec<TaskSnapshot> {
        self.tasks.iter().map(Task::snapshot).collect()
    }

    /// All recorded misses, ordered by detection tick, then task insertion
    /// order.
    pub fn get_deadline_misses(&self) -> Vec<MissSnapshot> {
        let mut all: Vec<(Tick, usize, MissSnapshot)> = self
            .tasks
            .iter()
            .enumerate()
            .flat_map(|(i, t)| {
                t.deadline_misses.iter().map(move |m| {
                    (
                        m.detected_at,
                        i,
                        MissSnapshot {
                            task_name: t.name.clone(),
                            instance: m.instance,
                            scheduled_deadline_tick: m.deadline_tick,
                        },
                    )
                })
            })
            .collect();
        all.sort_by_key(|(at, i, m)| (*at, *i, m.instance));
        all.into_iter().map(|(_, _, m)| m).collect()
    }

    pub fn total_misses(&self) -> usize {
        self.tasks.iter().map(|t| t.deadline_misses.len()).sum()
    }

    /// Full execution history as task names / [`IDLE_LABEL`].
    pub fn timeline(&self) -> Vec<String> {
        self.history
            .iter()
            .map(|slot| match slot {
                Some(id) => self.tasks[id.index()].name.clone(),
                None => IDLE_LABEL.to_string(),
            })
            .collect()
    }

    /// Raw execution history; `None` entries are idle ticks.
    pub fn history(&self) -> &[Option<TaskId>] {
        &self.history
    }

    pub fn events(&self) -> &RingBuffer<SchedEvent> {
        &self.events
    }

    pub fn recent_events(&self, n: usize) -> Vec<SchedEvent> {
        self.events.latest(n)
    }

    pub fn recent_trace(&self, n: usize) -> Vec<TickRecord> {
        self.trace.latest(n)
    }

    /// How many [`TickRecord`]s are kept for the Gantt view.
    pub fn trace_capacity(&self) -> usize {
        self.trace.capacity()
    }

    pub fn report(&self) -> Report {
        Report::from_scheduler(self)
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn priority_key(&self, id: TaskId) -> Tick {
        self.algorithm.priority_key(&self.tasks[id.index()])
    }

    fn highest_priority_ready(&self) -> Option<TaskId> {
        self.ready_queue
            .iter()
            .copied()
            .min_by_key(|&id| (self.priority_key(id), id))
    }

    fn ready_by_priority(&self) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self.ready_queue.iter().copied().collect();
        ids.sort_by_key(|&id| (self.priority_key(id), id));
        ids
    }

    fn select(&mut self, now: Tick) -> Option<TaskId> {
        let Some(best) = self.highest_priority_ready() else {
            self.running = None;
            return None;
        };

        match self.running {
            Some(current) if self.ready_queue.contains(&current) => {
                if self.priority_key(best) < self.priority_key(current) {
                    let task = self.tasks[current.index()].name.clone();
                    let by = self.tasks[best.index()].name.clone();
                    debug!(
                        tick = now,
                        task = %task,
                        by = %by,
                        remaining = self.tasks[current.index()].remaining_time,
                        "preempted"
                    );
                    self.events.push(SchedEvent::Preempted { tick: now, task, by });
                    self.running = Some(best);
                }
            }
            _ => self.running = Some(best),
        }
        self.running
    }

    fn log_miss(events: &mut RingBuffer<SchedEvent>, task: &str, miss: DeadlineMiss, why: &str) {
        warn!(
            tick          = miss.detected_at,
            task          = %task,
            instance      = miss.instance,
            deadline_tick = miss.deadline_tick,
            "deadline miss ({why})"
        );
        events.push(SchedEvent::DeadlineMissed {
            tick: miss.detected_at,
            task: task.to_string(),
            instance: miss.instance,
            deadline_tick: miss.deadline_tick,
        });
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
