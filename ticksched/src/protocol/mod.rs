/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Line-delimited JSON wire format shared by the server and the CLI client.
//!
//! Every message is one JSON object terminated by `\n`, tagged by `"type"`:
//!
//! ```text
//! client → server   {"type":"add_task","period":4,"execution_time":1}
//! server → client   {"type":"success","message":"Task T1 added successfully","task":{…}}
//! ```
//!
//! Timing fields are signed on the wire so that `0` and negative values reach
//! the engine's validation and come back as a typed `error` response instead
//! of a JSON type error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::scheduler::{Algorithm, SchedEvent, StatusSnapshot};
use crate::task::{MissSnapshot, TaskSnapshot};

/// Every `"type"` value a client may send.
pub const KNOWN_COMMANDS: &[&str] = &[
    "add_task",
    "get_status",
    "list_tasks",
    "get_deadline_misses",
    "get_events",
];

/// Longest request line accepted, excluding the terminating `\n`.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

// ── Requests ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    AddTask {
        /// Server assigns `T<n>` when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        period: i64,
        execution_time: i64,
        /// Defaults to `period`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        deadline: Option<i64>,
    },
    GetStatus,
    ListTasks,
    GetDeadlineMisses,
    GetEvents,
}

// ── Responses ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Welcome {
        message: String,
        algorithm: Algorithm,
    },
    Success {
        message: String,
        task: TaskSnapshot,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        warnings: Vec<String>,
    },
    Status {
        data: StatusSnapshot,
    },
    TaskList {
        data: Vec<TaskSnapshot>,
    },
    DeadlineMisses {
        data: Vec<MissSnapshot>,
    },
    Events {
        data: Vec<SchedEvent>,
    },
    Error {
        message: String,
    },
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            message: message.into(),
        }
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Why a line could not be turned into a [`Request`] / a [`Response`] into a
/// line.  Never affects engine state.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Invalid JSON command")]
    MalformedJson(#[source] serde_json::Error),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(#[source] serde_json::Error),

    #[error("Request line exceeds {0} bytes")]
    LineTooLong(usize),

    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

// ── Codec ─────────────────────────────────────────────────────────────────────

/// Parse one request line.
///
/// The `"type"` tag is checked first so an unknown command is reported as
/// such rather than as a generic deserialisation failure.
pub fn decode_request(line: &str) -> Result<Request, ProtocolError> {
    let value: Value = serde_json::from_str(line.trim()).map_err(ProtocolError::MalformedJson)?;

    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if !KNOWN_COMMANDS.contains(&kind) {
        return Err(ProtocolError::UnknownCommand(kind.to_string()));
    }

    serde_json::from_value(value).map_err(ProtocolError::InvalidParameters)
}

/// Parse one response line (client side).
pub fn decode_response(line: &str) -> Result<Response, ProtocolError> {
    serde_json::from_str(line.trim()).map_err(ProtocolError::MalformedJson)
}

/// Serialise `msg` as a single `\n`-terminated line.
pub fn encode_line<T: Serialize>(msg: &T) -> Result<String, ProtocolError> {
    let mut line = serde_json::to_string(msg).map_err(ProtocolError::Encode)?;
    line.push('\n');
    Ok(line)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_task_with_defaults() {
        let req = decode_request(r#"{"type":"add_task","period":4,"execution_time":2}"#).unwrap();
        assert_eq!(
            req,
            Request::AddTask {
                name: None,
                period: 4,
                execution_time: 2,
                deadline: None
            }
        );
    }

    #[test]
    fn add_task_with_name_and_deadline() {
        let req = decode_request(
            r#"{"type":"add_task","name":"cam","period":6,"execution_time":3,"deadline":5}"#,
        )
        .unwrap();
        assert!(matches!(
            req,
            Request::AddTask { name: Some(ref n), deadline: Some(5), .. } if n == "cam"
        ));
    }

    #[test]
    fn negative_values_survive_decoding() {
        let req = decode_request(r#"{"type":"add_task","period":-4,"execution_time":1}"#).unwrap();
        assert!(matches!(req, Request::AddTask { period: -4, .. }));
    }

    #[test]
    fn unit_commands_decode() {
        assert_eq!(decode_request(r#"{"type":"get_status"}"#).unwrap(), Request::GetStatus);
        assert_eq!(decode_request(r#"{"type":"list_tasks"}"#).unwrap(), Request::ListTasks);
        assert_eq!(
            decode_request(r#"{"type":"get_deadline_misses"}"#).unwrap(),
            Request::GetDeadlineMisses
        );
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = decode_request("{not json").unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedJson(_)));
        assert_eq!(err.to_string(), "Invalid JSON command");
    }

    #[test]
    fn unknown_or_missing_type_is_reported() {
        let err = decode_request(r#"{"type":"remove_task"}"#).unwrap_err();
        assert_eq!(err.to_string(), "Unknown command: remove_task");
        assert!(matches!(
            decode_request(r#"{"period":4}"#),
            Err(ProtocolError::UnknownCommand(ref k)) if k.is_empty()
        ));
    }

    #[test]
    fn missing_fields_are_invalid_parameters() {
        let err = decode_request(r#"{"type":"add_task","period":4}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidParameters(_)));
    }

    #[test]
    fn responses_are_single_tagged_lines() {
        let line = encode_line(&Response::Status {
            data: StatusSnapshot {
                current_tick: 3,
                running_task: "T1".into(),
                ready_queue: vec!["T1".into(), "T2".into()],
                total_tasks: 2,
            },
        })
        .unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        let v: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(v["type"], "status");
        assert_eq!(v["data"]["running_task"], "T1");
        assert_eq!(v["data"]["ready_queue"][1], "T2");
    }

    #[test]
    fn welcome_carries_algorithm_name() {
        let line = encode_line(&Response::Welcome {
            message: "hi".into(),
            algorithm: Algorithm::EarliestDeadlineFirst,
        })
        .unwrap();
        assert!(line.contains(r#""algorithm":"EDF""#));
        assert_eq!(
            decode_response(&line).unwrap(),
            Response::Welcome {
                message: "hi".into(),
                algorithm: Algorithm::EarliestDeadlineFirst
            }
        );
    }

    #[test]
    fn miss_fields_use_contract_names() {
        let line = encode_line(&Response::DeadlineMisses {
            data: vec![MissSnapshot {
                task_name: "T2".into(),
                instance: 1,
                scheduled_deadline_tick: 5,
            }],
        })
        .unwrap();
        let v: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(v["data"][0]["task_name"], "T2");
        assert_eq!(v["data"][0]["scheduled_deadline_tick"], 5);
    }
}
