/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! End-of-run summary printed when the server stops or a simulation ends.

use std::fmt;

use crate::hyperperiod::{self, DEFAULT_HYPERPERIOD_LIMIT};
use crate::scheduler::feasibility::{total_utilization, utilization_bound};
use crate::scheduler::{Algorithm, Scheduler};
use crate::task::{MissSnapshot, Tick};

/// Per-task line of the report.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskReport {
    pub name: String,
    pub period: Tick,
    pub execution_time: Tick,
    pub deadline: Tick,
    pub utilization: f64,
    pub releases: u64,
    pub completions: u64,
    pub misses: usize,
    /// Ticks this task actually ran since it was (last) added.
    pub cpu_ticks: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub algorithm: Algorithm,
    pub ticks: Tick,
    pub busy_ticks: Tick,
    pub utilization: f64,
    pub bound: f64,
    /// `None` when there are no tasks or the LCM is out of range.
    pub hyperperiod: Option<Tick>,
    pub tasks: Vec<TaskReport>,
    pub misses: Vec<MissSnapshot>,
}

impl Report {
    pub fn from_scheduler(s: &Scheduler) -> Self {
        // Ticks spent by an overwritten predecessor in the same slot are not
        // credited to its replacement.
        let mut cpu_ticks = vec![0u64; s.tasks().len()];
        for (tick, slot) in s.history().iter().enumerate() {
            if let Some(id) = slot {
                if tick as Tick >= s.tasks()[id.index()].added_at {
                    cpu_ticks[id.index()] += 1;
                }
            }
        }

        let tasks = s
            .tasks()
            .iter()
            .zip(cpu_ticks)
            .map(|(t, cpu_ticks)| TaskReport {
                name: t.name.clone(),
                period: t.period,
                execution_time: t.execution_time,
                deadline: t.deadline,
                utilization: t.utilization(),
                releases: t.instance,
                completions: t.completions,
                misses: t.deadline_misses.len(),
                cpu_ticks,
            })
            .collect();

        Report {
            algorithm: s.algorithm(),
            ticks: s.current_tick(),
            busy_ticks: s.history().iter().filter(|slot| slot.is_some()).count() as Tick,
            utilization: total_utilization(s.tasks()),
            bound: utilization_bound(s.algorithm(), s.tasks().len()),
            hyperperiod: hyperperiod::calculate(&s.periods(), DEFAULT_HYPERPERIOD_LIMIT)
                .ok()
                .map(|info| info.hyperperiod),
            tasks,
            misses: s.get_deadline_misses(),
        }
    }

    pub fn idle_ticks(&self) -> Tick {
        self.ticks - self.busy_ticks
    }

    /// Fraction of simulated ticks spent executing, `0.0` before the first tick.
    pub fn cpu_busy_ratio(&self) -> f64 {
        if self.ticks == 0 {
            0.0
        } else {
            self.busy_ticks as f64 / self.ticks as f64
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "═══ Final report ({}) ═══", self.algorithm)?;
        writeln!(
            f,
            "Ticks simulated: {}  busy: {}  idle: {}  ({:.1}% CPU)",
            self.ticks,
            self.busy_ticks,
            self.idle_ticks(),
            self.cpu_busy_ratio() * 100.0
        )?;
        writeln!(
            f,
            "Utilization: {:.3}  bound: {:.3}{}",
            self.utilization,
            self.bound,
            if self.utilization > self.bound { "  (above bound)" } else { "" }
        )?;
        match self.hyperperiod {
            Some(h) => writeln!(f, "Hyperperiod: {h} ticks")?,
            None => writeln!(f, "Hyperperiod: n/a")?,
        }

        if self.tasks.is_empty() {
            return writeln!(f, "No tasks were added.");
        }

        writeln!(
            f,
            "{:<8} {:>6} {:>5} {:>8} {:>6} {:>8} {:>5} {:>6} {:>4}",
            "Task", "Period", "Exec", "Deadline", "U", "Released", "Done", "Misses", "CPU"
        )?;
        for t in &self.tasks {
            writeln!(
                f,
                "{:<8} {:>6} {:>5} {:>8} {:>6.3} {:>8} {:>5} {:>6} {:>4}",
                t.name,
                t.period,
                t.execution_time,
                t.deadline,
                t.utilization,
                t.releases,
                t.completions,
                t.misses,
                t.cpu_ticks
            )?;
        }

        if self.misses.is_empty() {
            writeln!(f, "No deadline misses.")
        } else {
            writeln!(f, "Deadline misses ({}):", self.misses.len())?;
            for m in &self.misses {
                writeln!(
                    f,
                    "  {}[{}] missed deadline at t={}",
                    m.task_name, m.instance, m.scheduled_deadline_tick
                )?;
            }
            Ok(())
        }
    }
}
