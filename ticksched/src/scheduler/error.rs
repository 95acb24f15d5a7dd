/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error and diagnostic types for the tick scheduler.
//!
//! Two layers are modelled separately:
//!
//! * [`SchedulerError`]: configuration errors.  Returned eagerly from
//!   `add_task` / algorithm parsing; the engine state is never touched when one
//!   of these is produced.
//! * [`Diagnostic`]: schedulability warnings.  The task is accepted anyway;
//!   the diagnostic is logged and handed back to the caller.
//!
//! A deadline miss is neither: it is recorded data, see
//! [`DeadlineMiss`](crate::task::DeadlineMiss).

use thiserror::Error;

use crate::scheduler::policy::Algorithm;
use crate::task::Tick;

// ── Configuration errors ──────────────────────────────────────────────────────

/// Rejected input.
///
/// | Variant | Wire response |
/// |---|---|
/// | `InvalidParameter` | `error` – "Invalid parameters: …" |
/// | `UnknownAlgorithm` | startup failure |
/// | `EmptyName` | `error` – "Invalid parameters: …" |
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// A timing parameter was zero or negative.
    #[error("{field} must be a positive number of ticks (got {value})")]
    InvalidParameter { field: &'static str, value: i64 },

    /// The algorithm name is not one of the supported policies.
    #[error("unknown scheduling algorithm: '{0}' (valid: RM, EDF)")]
    UnknownAlgorithm(String),

    /// A caller-supplied task name was blank.
    #[error("task name must not be empty")]
    EmptyName,
}

impl SchedulerError {
    /// Convert a signed wire value into ticks, rejecting `<= 0`.
    pub fn positive_ticks(field: &'static str, value: i64) -> Result<Tick, SchedulerError> {
        if value <= 0 {
            return Err(SchedulerError::InvalidParameter { field, value });
        }
        Ok(value as Tick)
    }
}

// ── Schedulability diagnostics ────────────────────────────────────────────────

/// Non-fatal warning produced when a task is added.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// `execution_time > deadline`: every instance of this task will miss.
    ExecutionExceedsDeadline {
        task: String,
        execution_time: Tick,
        deadline: Tick,
    },

    /// Total utilisation of the task set is above the guarantee bound of the
    /// active algorithm (Liu & Layland for RM, `1.0` for EDF).
    UtilizationExceedsBound {
        algorithm: Algorithm,
        utilization: f64,
        bound: f64,
        task_count: usize,
    },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::ExecutionExceedsDeadline {
                task,
                execution_time,
                deadline,
            } => write!(
                f,
                "task '{}' needs {} ticks but its deadline is {} ticks; every instance will miss",
                task, execution_time, deadline
            ),

            Diagnostic::UtilizationExceedsBound {
                algorithm,
                utilization,
                bound,
                task_count,
            } => write!(
                f,
                "{} task(s) use {:.1}% of the CPU, above the {} bound of {:.1}%; deadline misses are possible",
                task_count,
                utilization * 100.0,
                algorithm,
                bound * 100.0,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_ticks_accepts_positive_values() {
        assert_eq!(SchedulerError::positive_ticks("period", 4), Ok(4));
    }

    #[test]
    fn positive_ticks_rejects_zero_and_negative() {
        assert_eq!(
            SchedulerError::positive_ticks("period", 0),
            Err(SchedulerError::InvalidParameter { field: "period", value: 0 })
        );
        assert_eq!(
            SchedulerError::positive_ticks("deadline", -3),
            Err(SchedulerError::InvalidParameter { field: "deadline", value: -3 })
        );
    }

    #[test]
    fn error_messages_name_the_field() {
        let e = SchedulerError::InvalidParameter { field: "execution_time", value: -1 };
        assert_eq!(
            e.to_string(),
            "execution_time must be a positive number of ticks (got -1)"
        );
    }

    #[test]
    fn diagnostic_display_mentions_task_and_values() {
        let d = Diagnostic::ExecutionExceedsDeadline {
            task: "T3".into(),
            execution_time: 5,
            deadline: 4,
        };
        let s = d.to_string();
        assert!(s.contains("T3"));
        assert!(s.contains("5 ticks"));
        assert!(s.contains("4 ticks"));
    }
}
