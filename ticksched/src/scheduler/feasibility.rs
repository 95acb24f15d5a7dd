/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Schedulability analysis run when a task is added.
//!
//! Nothing here ever rejects a task.  Results are turned into
//! [`Diagnostic`]s, logged with `warn!` and handed back to the caller.
//!
//! # Theory
//! **Liu & Layland (1973)**: under Rate Monotonic scheduling a set of `n`
//! independent periodic tasks with `D = P` is **guaranteed** schedulable on
//! one CPU if
//!
//! $$U = \sum_{i=1}^{n} \frac{C_i}{T_i} \leq n \left(2^{1/n} - 1\right)$$
//!
//! | n | Bound |
//! |---|---|
//! | 1 | 1.000 |
//! | 2 | 0.828 |
//! | 3 | 0.780 |
//! | ∞ | ln(2) ≈ 0.693 |
//!
//! Under EDF the exact bound for `D = P` is `U ≤ 1`.
//!
//! Between the RM bound and `1.0` a task set **may or may not** be
//! schedulable; the simulation itself is the ground truth.

use crate::scheduler::error::Diagnostic;
use crate::scheduler::policy::Algorithm;
use crate::task::Task;

/// `U_bound(n) = n × (2^(1/n) − 1)`, `0.0` for `n = 0`.
pub fn liu_layland_bound(n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let nf = n as f64;
    nf * (2.0_f64.powf(1.0 / nf) - 1.0)
}

/// Utilisation guarantee bound of `algorithm` for `n` tasks.
pub fn utilization_bound(algorithm: Algorithm, n: usize) -> f64 {
    match algorithm {
        Algorithm::RateMonotonic => liu_layland_bound(n),
        Algorithm::EarliestDeadlineFirst => {
            if n == 0 {
                0.0
            } else {
                1.0
            }
        }
    }
}

/// `Σ C_i / T_i` over `tasks`.
pub fn total_utilization<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> f64 {
    tasks.into_iter().map(Task::utilization).sum()
}

/// `Some` when `task` can never meet its deadline.
pub fn check_task(task: &Task) -> Option<Diagnostic> {
    (task.execution_time > task.deadline).then(|| Diagnostic::ExecutionExceedsDeadline {
        task: task.name.clone(),
        execution_time: task.execution_time,
        deadline: task.deadline,
    })
}

/// `Some` when the whole set is above the guarantee bound of `algorithm`.
///
/// Exactly at the bound is still feasible (`≤`, not `<`).
pub fn check_task_set(algorithm: Algorithm, tasks: &[Task]) -> Option<Diagnostic> {
    if tasks.is_empty() {
        return None;
    }
    let utilization = total_utilization(tasks);
    let bound = utilization_bound(algorithm, tasks.len());

    (utilization > bound).then_some(Diagnostic::UtilizationExceedsBound {
        algorithm,
        utilization,
        bound,
        task_count: tasks.len(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
