/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Real-time driver around the [`Scheduler`].
//!
//! ```text
//!  EngineHandle ──Command + oneshot──►┐
//!  EngineHandle ──Command + oneshot──►├─ mpsc ─►  engine task (sole owner of Scheduler)
//!  Engine::start/stop ──watch──────────┘           select! { interval.tick() → scheduler.tick()
//!                                                           command        → answer from state }
//! ```
//!
//! The engine task is the only code that touches the [`Scheduler`].  Commands
//! are answered between ticks, so a caller always sees a fully pre-tick or
//! fully post-tick state, never a partial one.  No lock is involved.
//!
//! # Lifecycle
//! * [`Engine::new`] spawns the task immediately; it answers queries but does
//!   not tick yet.  Must be called inside a tokio runtime.
//! * [`Engine::start`] begins ticking at the configured cadence.  Idempotent.
//! * [`Engine::stop`] asks the task to exit between ticks and waits for it.
//!   The [`Scheduler`] is handed back so a final report can be produced.
//!   Idempotent.

pub mod error;

pub use error::EngineError;

use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::scheduler::{AddOutcome, Report, SchedEvent, Scheduler, SchedulerError, StatusSnapshot, TickRecord};
use crate::task::{MissSnapshot, TaskSnapshot, Tick};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Default wall-clock duration of one tick.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1_000);

/// Capacity of the command channel.
const COMMAND_BUFFER: usize = 64;

// ── Commands ──────────────────────────────────────────────────────────────────

type Reply<T> = oneshot::Sender<T>;

/// Request to the engine task.  Each carries its own reply channel.
#[derive(Debug)]
enum Command {
    AddTask {
        /// `None` picks the first free `T<n>` inside the engine task.
        name: Option<String>,
        period: Tick,
        execution_time: Tick,
        deadline: Option<Tick>,
        reply: Reply<Result<AddOutcome, SchedulerError>>,
    },
    Status(Reply<StatusSnapshot>),
    ListTasks(Reply<Vec<TaskSnapshot>>),
    DeadlineMisses(Reply<Vec<MissSnapshot>>),
    Events {
        limit: usize,
        reply: Reply<Vec<SchedEvent>>,
    },
    Trace {
        limit: usize,
        reply: Reply<(Vec<TaskSnapshot>, Vec<TickRecord>)>,
    },
    Report(Reply<Report>),
}

/// Run state published by [`Engine`] to the engine task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Paused,
    Running,
    Stopping,
}

// ── EngineHandle ──────────────────────────────────────────────────────────────

/// Cloneable façade onto a running engine.
///
/// Every method is one round trip to the engine task.  Once the engine has
/// stopped they fail with [`EngineError::Stopped`].
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Command>,
}

impl EngineHandle {
    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| EngineError::Stopped)?;
        rx.await.map_err(|_| EngineError::Stopped)
    }

    /// Add or overwrite a task; it is released at the next tick boundary.
    pub async fn add_task(
        &self,
        name: impl Into<String>,
        period: Tick,
        execution_time: Tick,
        deadline: Option<Tick>,
    ) -> Result<AddOutcome, EngineError> {
        self.submit(Some(name.into()), period, execution_time, deadline)
            .await
    }

    /// Add a task under the first `T<n>` name not already in use.
    pub async fn add_unnamed_task(
        &self,
        period: Tick,
        execution_time: Tick,
        deadline: Option<Tick>,
    ) -> Result<AddOutcome, EngineError> {
        self.submit(None, period, execution_time, deadline).await
    }

    async fn submit(
        &self,
        name: Option<String>,
        period: Tick,
        execution_time: Tick,
        deadline: Option<Tick>,
    ) -> Result<AddOutcome, EngineError> {
        let outcome = self
            .request(|reply| Command::AddTask {
                name,
                period,
                execution_time,
                deadline,
                reply,
            })
            .await?;
        Ok(outcome?)
    }

    pub async fn get_status(&self) -> Result<StatusSnapshot, EngineError> {
        self.request(Command::Status).await
    }

    pub async fn list_tasks(&self) -> Result<Vec<TaskSnapshot>, EngineError> {
        self.request(Command::ListTasks).await
    }

    pub async fn get_deadline_misses(&self) -> Result<Vec<MissSnapshot>, EngineError> {
        self.request(Command::DeadlineMisses).await
    }

    /// Newest `limit` events, oldest first.
    pub async fn recent_events(&self, limit: usize) -> Result<Vec<SchedEvent>, EngineError> {
        self.request(|reply| Command::Events { limit, reply }).await
    }

    /// Task list plus the newest `limit` tick records, taken atomically so the
    /// two always agree.
    pub async fn trace(
        &self,
        limit: usize,
    ) -> Result<(Vec<TaskSnapshot>, Vec<TickRecord>), EngineError> {
        self.request(|reply| Command::Trace { limit, reply }).await
    }

    pub async fn report(&self) -> Result<Report, EngineError> {
        self.request(Command::Report).await
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

enum Lifecycle {
    Live(JoinHandle<Scheduler>),
    Finished(Scheduler),
    /// The engine task panicked; nothing left to hand back.
    Lost,
}

/// Owner of the engine task's lifecycle.
pub struct Engine {
    handle: EngineHandle,
    control: watch::Sender<RunState>,
    lifecycle: Lifecycle,
    tick_interval: Duration,
}

impl Engine {
    /// Spawn the engine task around `scheduler`.
    ///
    /// # Panics
    /// When called outside a tokio runtime.
    pub fn new(scheduler: Scheduler, tick_interval: Duration) -> Self {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let (control, control_rx) = watch::channel(RunState::Paused);

        info!(
            algorithm = %scheduler.algorithm(),
            tick_ms   = tick_interval.as_millis() as u64,
            tasks     = scheduler.tasks().len(),
            "engine created"
        );

        let join = tokio::spawn(run_engine(scheduler, rx, control_rx, tick_interval));

        Self {
            handle: EngineHandle { tx },
            control,
            lifecycle: Lifecycle::Live(join),
            tick_interval,
        }
    }

    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn is_running(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Live(_)) && *self.control.borrow() == RunState::Running
    }

    /// Begin ticking.  No-op when already running or after [`stop`](Self::stop).
    pub fn start(&self) {
        if !matches!(self.lifecycle, Lifecycle::Live(_)) {
            warn!("start() ignored: engine already stopped");
            return;
        }
        let changed = self.control.send_if_modified(|state| {
            if *state == RunState::Paused {
                *state = RunState::Running;
                true
            } else {
                false
            }
        });
        if changed {
            info!("engine started");
        } else {
            debug!("start() ignored: engine already running");
        }
    }

    /// Stop after the current tick and wait for the engine task to exit.
    ///
    /// Second and later calls return `Ok(())` without doing anything.
    ///
    /// # Errors
    /// [`EngineError::Join`] when the engine task panicked.
    pub async fn stop(&mut self) -> Result<(), EngineError> {
        let join = match std::mem::replace(&mut self.lifecycle, Lifecycle::Lost) {
            Lifecycle::Live(join) => join,
            done => {
                self.lifecycle = done;
                debug!("stop() ignored: engine already stopped");
                return Ok(());
            }
        };

        self.control.send_replace(RunState::Stopping);
        match join.await {
            Ok(scheduler) => {
                info!(tick = scheduler.current_tick(), "engine stopped");
                self.lifecycle = Lifecycle::Finished(scheduler);
                Ok(())
            }
            Err(e) => Err(EngineError::Join(e.to_string())),
        }
    }

    /// The scheduler, once the engine has stopped.
    pub fn scheduler(&self) -> Option<&Scheduler> {
        match &self.lifecycle {
            Lifecycle::Finished(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_scheduler(self) -> Option<Scheduler> {
        match self.lifecycle {
            Lifecycle::Finished(s) => Some(s),
            _ => None,
        }
    }
}

// ── Engine task ───────────────────────────────────────────────────────────────

async fn run_engine(
    mut scheduler: Scheduler,
    mut rx: mpsc::Receiver<Command>,
    mut control: watch::Receiver<RunState>,
    tick_interval: Duration,
) -> Scheduler {
    let mut ticker: Option<Interval> = None;

    loop {
        let state = *control.borrow_and_update();
        match state {
            RunState::Stopping => break,
            RunState::Running if ticker.is_none() => {
                let mut iv = time::interval(tick_interval);
                iv.set_missed_tick_behavior(MissedTickBehavior::Delay);
                ticker = Some(iv);
            }
            _ => {}
        }

        tokio::select! {
            biased;

            changed = control.changed() => {
                if changed.is_err() {
                    // Engine dropped without stop(): exit quietly.
                    break;
                }
            }

            _ = next_tick(&mut ticker) => {
                let ran = scheduler.tick();
                debug!(
                    tick = scheduler.current_tick() - 1,
                    ran = ?ran.map(|id| scheduler.tasks()[id.index()].name.as_str()),
                    "tick"
                );
            }

            cmd = rx.recv() => match cmd {
                Some(cmd) => handle_command(&mut scheduler, cmd),
                None => break,
            },
        }
    }

    scheduler
}

/// Resolves on the next interval tick, or never while paused.
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(iv) => {
            iv.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn handle_command(scheduler: &mut Scheduler, cmd: Command) {
    // A dropped receiver only means the caller gave up waiting.
    match cmd {
        Command::AddTask {
            name,
            period,
            execution_time,
            deadline,
            reply,
        } => {
            let outcome = match name {
                Some(name) => scheduler.add_task(name, period, execution_time, deadline),
                None => scheduler.add_unnamed_task(period, execution_time, deadline),
            };
            let _ = reply.send(outcome);
        }
        Command::Status(reply) => {
            let _ = reply.send(scheduler.get_status());
        }
        Command::ListTasks(reply) => {
            let _ = reply.send(scheduler.list_tasks());
        }
        Command::DeadlineMisses(reply) => {
            let _ = reply.send(scheduler.get_deadline_misses());
        }
        Command::Events { limit, reply } => {
            let _ = reply.send(scheduler.recent_events(limit));
        }
        Command::Trace { limit, reply } => {
            let _ = reply.send((scheduler.list_tasks(), scheduler.recent_trace(limit)));
        }
        Command::Report(reply) => {
            let _ = reply.send(scheduler.report());
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
