/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! `ticksched-cli` – talks to a running `ticksched` server.
//!
//! With a subcommand it sends one request and exits; without one it opens an
//! interactive prompt accepting the same commands plus `quit`.

use std::process;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::debug;

use ticksched::protocol::{decode_response, encode_line, Request, Response};
use ticksched::scheduler::StatusSnapshot;
use ticksched::task::{MissSnapshot, TaskSnapshot};

// ── CLI argument definition ───────────────────────────────────────────────────

/// Client for the ticksched scheduler server.
///
/// Example:
///   ticksched-cli add 4 2
///   ticksched-cli add 6 3 5 --name camera
///   ticksched-cli -p 9000 status
#[derive(Debug, Parser)]
#[command(name = "ticksched-cli", about = "ticksched client", long_about = None)]
struct Cli {
    /// Server host.
    #[arg(short = 'H', long = "host", default_value = "localhost")]
    host: String,

    /// Server port.
    #[arg(short = 'p', long = "port", default_value_t = 8888)]
    port: u16,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
enum Command {
    /// Add a periodic task (deadline defaults to the period).
    #[command(allow_negative_numbers = true)]
    Add {
        period: i64,
        execution_time: i64,
        deadline: Option<i64>,
        /// Task name; the server picks `T<n>` when omitted.
        #[arg(long)]
        name: Option<String>,
    },
    /// Current tick, running task and ready queue.
    Status,
    /// Every task with its live state.
    List,
    /// Recorded deadline misses.
    Misses,
    /// Recent scheduler events.
    Events,
}

impl Command {
    fn into_request(self) -> Request {
        match self {
            Command::Add {
                period,
                execution_time,
                deadline,
                name,
            } => Request::AddTask {
                name,
                period,
                execution_time,
                deadline,
            },
            Command::Status => Request::GetStatus,
            Command::List => Request::ListTasks,
            Command::Misses => Request::GetDeadlineMisses,
            Command::Events => Request::GetEvents,
        }
    }
}

/// One line typed at the interactive prompt.
#[derive(Debug, Parser)]
#[command(no_binary_name = true, disable_help_flag = true)]
struct ReplLine {
    #[command(subcommand)]
    command: Command,
}

const REPL_HELP: &str = "\
Commands:
  add <period> <exec> [deadline] [--name N]   add a periodic task
  status                                      show current status
  list                                        list all tasks
  misses                                      list deadline misses
  events                                      show recent events
  quit                                        exit";

// ── Connection ────────────────────────────────────────────────────────────────

struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    /// Connect and consume the welcome message.
    async fn connect(host: &str, port: u16) -> Result<(Self, Response)> {
        let stream = TcpStream::connect((host, port))
            .await
            .with_context(|| format!("Cannot connect to server at {host}:{port}"))?;
        let (reader, writer) = stream.into_split();
        let mut client = Client {
            lines: BufReader::new(reader).lines(),
            writer,
        };
        let welcome = client.read_response().await?;
        Ok((client, welcome))
    }

    async fn read_response(&mut self) -> Result<Response> {
        let line = self
            .lines
            .next_line()
            .await
            .context("Connection error")?
            .context("Server closed the connection")?;
        debug!(%line, "received");
        Ok(decode_response(&line)?)
    }

    async fn send(&mut self, req: &Request) -> Result<Response> {
        let line = encode_line(req)?;
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        self.read_response().await
    }
}

// ── Output ────────────────────────────────────────────────────────────────────

fn format_response(resp: &Response) -> String {
    match resp {
        Response::Welcome { message, algorithm } => {
            format!("{message}\nAlgorithm: {algorithm}")
        }
        Response::Success {
            message,
            task,
            warnings,
        } => {
            let mut out = format!(
                "{message}\n   Period: {} ticks\n   Execution: {} ticks\n   Deadline: {} ticks",
                task.period, task.execution_time, task.deadline
            );
            for w in warnings {
                out.push_str(&format!("\n   warning: {w}"));
            }
            out
        }
        Response::Status { data } => format_status(data),
        Response::TaskList { data } => format_tasks(data),
        Response::DeadlineMisses { data } => format_misses(data),
        Response::Events { data } => {
            if data.is_empty() {
                return "No events yet".to_string();
            }
            data.iter()
                .map(|e| format!("   {e}"))
                .collect::<Vec<_>>()
                .join("\n")
        }
        Response::Error { message } => format!("error: {message}"),
    }
}

fn format_status(st: &StatusSnapshot) -> String {
    format!(
        "Status (tick {}):\n   Running: {}\n   Ready: [{}]\n   Total tasks: {}",
        st.current_tick,
        st.running_task,
        st.ready_queue.join(", "),
        st.total_tasks
    )
}

fn format_tasks(tasks: &[TaskSnapshot]) -> String {
    if tasks.is_empty() {
        return "No tasks in the system".to_string();
    }
    let mut out = format!(
        "Tasks ({} total):\n   {:<8} {:>6} {:>5} {:>8} {:>9} {:>8} {:>5}\n   {}",
        tasks.len(),
        "Name",
        "Period",
        "Exec",
        "Deadline",
        "Remaining",
        "Instance",
        "Next",
        "-".repeat(55)
    );
    for t in tasks {
        out.push_str(&format!(
            "\n   {:<8} {:>6} {:>5} {:>8} {:>9} {:>8} {:>5}",
            t.name, t.period, t.execution_time, t.deadline, t.remaining_time, t.instance, t.next_release
        ));
    }
    out
}

fn format_misses(misses: &[MissSnapshot]) -> String {
    if misses.is_empty() {
        return "No deadline misses".to_string();
    }
    let mut out = format!("Deadline misses ({}):", misses.len());
    for m in misses {
        out.push_str(&format!(
            "\n   {}[{}] missed deadline at t={}",
            m.task_name, m.instance, m.scheduled_deadline_tick
        ));
    }
    out
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("error: {:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let (mut client, welcome) = Client::connect(&cli.host, cli.port).await?;
    println!("{}", format_response(&welcome));

    match cli.command {
        Some(cmd) => {
            let resp = client.send(&cmd.into_request()).await?;
            println!("{}", format_response(&resp));
            if matches!(resp, Response::Error { .. }) {
                bail!("request rejected");
            }
            Ok(())
        }
        None => repl(&mut client).await,
    }
}

async fn repl(client: &mut Client) -> Result<()> {
    println!("\n{REPL_HELP}\n\nExample: add 4 2");
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\nclient> ");
        std::io::Write::flush(&mut std::io::stdout())?;

        let Some(line) = stdin.next_line().await? else { break };
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.first().copied() {
            None => continue,
            Some("quit" | "exit") => break,
            Some("help") => {
                println!("{REPL_HELP}");
                continue;
            }
            Some(_) => {}
        }

        match ReplLine::try_parse_from(words.iter().copied()) {
            Ok(parsed) => {
                let resp = client.send(&parsed.command.into_request()).await?;
                println!("{}", format_response(&resp));
            }
            Err(e) => println!("{}", e.render()),
        }
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
