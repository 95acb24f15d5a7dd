/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! ticksched – tick-driven periodic task scheduler with deadline-miss detection
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── task          – periodic task model, snapshots, miss records
//! ├── scheduler/    – RM / EDF tick loop, event log, feasibility, report
//! ├── hyperperiod/  – LCM / GCD helpers
//! ├── engine/       – tokio actor that owns the scheduler and ticks it
//! ├── protocol/     – line-delimited JSON request / response types
//! ├── server/       – TCP front-end over the engine
//! ├── gantt/        – terminal Gantt chart
//! └── config/       – YAML server configuration
//! ```

pub mod config;
pub mod engine;
pub mod gantt;
pub mod hyperperiod;
pub mod protocol;
pub mod scheduler;
pub mod server;
pub mod task;
