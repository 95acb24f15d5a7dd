/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! TCP front-end: line-delimited JSON requests in, JSON responses out.
//!
//! One tokio task per connection.  Every request becomes exactly one
//! [`EngineHandle`] call; the server holds no scheduler state of its own.
//! Request lines longer than [`MAX_LINE_BYTES`] are answered with an `error`
//! and skipped.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::engine::{EngineError, EngineHandle};
use crate::protocol::{
    decode_request, encode_line, ProtocolError, Request, Response, MAX_LINE_BYTES,
};
use crate::scheduler::{Algorithm, SchedulerError};

/// How many events a `get_events` request returns at most.
pub const EVENTS_PER_REQUEST: usize = 20;

/// Pause after a failed `accept`, so a persistent error (e.g. out of file
/// descriptors) does not turn the loop into a busy spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

// ── Listener abstraction ──────────────────────────────────────────────────────

/// Source of incoming connections.  Implemented for [`TcpListener`].
pub trait Accept: Send {
    fn local_addr(&self) -> io::Result<SocketAddr>;

    fn accept(&mut self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send + '_;
}

impl Accept for TcpListener {
    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpListener::local_addr(self)
    }

    fn accept(&mut self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send + '_ {
        TcpListener::accept(self)
    }
}

// ── Server ────────────────────────────────────────────────────────────────────

/// Request dispatcher shared by all connections.
#[derive(Debug, Clone)]
pub struct Server {
    engine: EngineHandle,
    algorithm: Algorithm,
}

impl Server {
    pub fn new(engine: EngineHandle, algorithm: Algorithm) -> Self {
        Self { engine, algorithm }
    }

    pub fn welcome(&self) -> Response {
        Response::Welcome {
            message: "Connected to ticksched real-time scheduler".to_string(),
            algorithm: self.algorithm,
        }
    }

    /// Accept connections on `listener` until `shutdown` flips to `true`.
    ///
    /// A failed `accept` only affects that one connection attempt: it is
    /// logged and the loop carries on.
    pub async fn serve<L: Accept>(
        self,
        mut listener: L,
        mut shutdown: watch::Receiver<bool>,
    ) -> io::Result<()> {
        info!(addr = %listener.local_addr()?, algorithm = %self.algorithm, "server listening");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let server = self.clone();
                        let conn_shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = server.handle_connection(stream, peer, conn_shutdown).await {
                                warn!(%peer, error = %e, "connection error");
                            }
                        });
                    }
                    Err(e) => {
                        warn!(error = %e, "accept failed, retrying");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }

        info!("server stopped accepting connections");
        Ok(())
    }

    async fn handle_connection(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        mut shutdown: watch::Receiver<bool>,
    ) -> io::Result<()> {
        info!(%peer, "client connected");
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        write_response(&mut writer, &self.welcome()).await?;

        loop {
            let line = tokio::select! {
                _ = shutdown.changed() => break,
                line = read_line_bounded(&mut reader, MAX_LINE_BYTES) => line?,
            };
            let response = match line {
                Line::Eof => break,
                Line::TooLong => {
                    warn!(%peer, limit = MAX_LINE_BYTES, "oversized request line dropped");
                    Response::error(ProtocolError::LineTooLong(MAX_LINE_BYTES).to_string())
                }
                Line::Text(text) if text.trim().is_empty() => continue,
                Line::Text(text) => self.process_line(&text).await,
            };
            write_response(&mut writer, &response).await?;
        }

        info!(%peer, "client disconnected");
        Ok(())
    }

    /// Decode one line and answer it.  Never fails: every problem becomes an
    /// `error` response.
    pub async fn process_line(&self, line: &str) -> Response {
        match decode_request(line) {
            Ok(req) => self.process(req).await,
            Err(e) => {
                debug!(error = %e, "rejected request line");
                Response::error(e.to_string())
            }
        }
    }

    pub async fn process(&self, req: Request) -> Response {
        let result = match req {
            Request::AddTask {
                name,
                period,
                execution_time,
                deadline,
            } => return self.add_task(name, period, execution_time, deadline).await,
            Request::GetStatus => self
                .engine
                .get_status()
                .await
                .map(|data| Response::Status { data }),
            Request::ListTasks => self
                .engine
                .list_tasks()
                .await
                .map(|data| Response::TaskList { data }),
            Request::GetDeadlineMisses => self
                .engine
                .get_deadline_misses()
                .await
                .map(|data| Response::DeadlineMisses { data }),
            Request::GetEvents => self
                .engine
                .recent_events(EVENTS_PER_REQUEST)
                .await
                .map(|data| Response::Events { data }),
        };
        result.unwrap_or_else(|e| Response::error(format!("Command error: {e}")))
    }

    async fn add_task(
        &self,
        name: Option<String>,
        period: i64,
        execution_time: i64,
        deadline: Option<i64>,
    ) -> Response {
        let params = (|| -> Result<_, SchedulerError> {
            let period = SchedulerError::positive_ticks("period", period)?;
            let execution_time = SchedulerError::positive_ticks("execution_time", execution_time)?;
            let deadline = deadline
                .map(|d| SchedulerError::positive_ticks("deadline", d))
                .transpose()?;
            Ok((period, execution_time, deadline))
        })();
        let (period, execution_time, deadline) = match params {
            Ok(p) => p,
            Err(e) => return Response::error(format!("Invalid parameters: {e}")),
        };

        // Unnamed tasks are named inside the engine so the pick cannot race
        // with another connection adding the same `T<n>`.
        let added = match name {
            Some(name) => {
                self.engine
                    .add_task(name, period, execution_time, deadline)
                    .await
            }
            None => {
                self.engine
                    .add_unnamed_task(period, execution_time, deadline)
                    .await
            }
        };

        match added {
            Ok(outcome) => Response::Success {
                message: if outcome.replaced {
                    format!("Task {} replaced successfully", outcome.task.name)
                } else {
                    format!("Task {} added successfully", outcome.task.name)
                },
                task: outcome.task,
                warnings: outcome.warnings.iter().map(ToString::to_string).collect(),
            },
            Err(EngineError::Rejected(e)) => Response::error(format!("Invalid parameters: {e}")),
            Err(e) => Response::error(format!("Command error: {e}")),
        }
    }
}

// ── Line framing ──────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
enum Line {
    Text(String),
    /// Longer than the limit; the rest of it has been discarded.
    TooLong,
    Eof,
}

/// Read one `\n`-terminated line of at most `max` bytes.
///
/// Never buffers more than `max + 1` bytes: an oversized line is skipped up
/// to and including its newline.
async fn read_line_bounded<R>(reader: &mut R, max: usize) -> io::Result<Line>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let n = (&mut *reader)
        .take(max as u64 + 1)
        .read_until(b'\n', &mut buf)
        .await?;
    if n == 0 {
        return Ok(Line::Eof);
    }

    let terminated = buf.last() == Some(&b'\n');
    if terminated || buf.len() <= max {
        if terminated {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        return Ok(Line::Text(String::from_utf8_lossy(&buf).into_owned()));
    }

    loop {
        let (used, done) = {
            let chunk = reader.fill_buf().await?;
            match chunk.iter().position(|&b| b == b'\n') {
                Some(pos) => (pos + 1, true),
                None => (chunk.len(), chunk.is_empty()),
            }
        };
        reader.consume(used);
        if done {
            break;
        }
    }
    Ok(Line::TooLong)
}

async fn write_response<W>(writer: &mut W, response: &Response) -> io::Result<()>
where
    W: AsyncWriteExt + Unpin,
{
    let line = encode_line(response).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}

// ── Tests ─────────────────────────────────────────────────────────────────────
