/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use thiserror::Error;

use crate::scheduler::SchedulerError;

/// Failure of a request routed through an [`EngineHandle`](super::EngineHandle).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine rejected the request's input.  State is unchanged.
    #[error(transparent)]
    Rejected(#[from] SchedulerError),

    /// The engine task has exited; no further requests are served.
    #[error("scheduler engine is stopped")]
    Stopped,

    /// The engine task panicked.
    #[error("scheduler engine task failed: {0}")]
    Join(String),
}
