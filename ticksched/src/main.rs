/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

use ticksched::config::ServerConfig;
use ticksched::engine::{Engine, EngineHandle};
use ticksched::gantt;
use ticksched::hyperperiod::{self, DEFAULT_HYPERPERIOD_LIMIT};
use ticksched::scheduler::{Algorithm, Scheduler};
use ticksched::server::Server;

/// Events shown under the live Gantt chart.
const GANTT_EVENTS: usize = 8;

/// Fallback horizon for `--simulate` when no hyperperiod can be computed.
const FALLBACK_HORIZON: u64 = 100;

// ── CLI argument definition ───────────────────────────────────────────────────

/// Tick-driven RM / EDF scheduler with deadline-miss detection.
///
/// Example:
///   ticksched -a EDF -p 8888 --tick-ms 500 --gantt
///   ticksched -c tasks.yaml --simulate --horizon 40
#[derive(Debug, Parser)]
#[command(
    name = "ticksched",
    about = "Tick-driven periodic task scheduler (RM / EDF)",
    long_about = None,
)]
struct Cli {
    /// Path to a YAML server configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Scheduling algorithm: RM or EDF.
    #[arg(short = 'a', long = "algorithm")]
    algorithm: Option<Algorithm>,

    /// Address to bind the TCP server to.
    #[arg(short = 'H', long = "host")]
    host: Option<String>,

    /// Port to bind the TCP server to.
    #[arg(short = 'p', long = "port")]
    port: Option<u16>,

    /// Wall-clock length of one tick, in milliseconds.
    #[arg(long = "tick-ms", value_parser = clap::value_parser!(u64).range(1..))]
    tick_ms: Option<u64>,

    /// Print a Gantt chart of recent ticks once per second.
    #[arg(long = "gantt", default_value_t = false)]
    gantt: bool,

    /// Run the configured task set offline and exit.
    #[arg(long = "simulate", default_value_t = false)]
    simulate: bool,

    /// Ticks to simulate (default: the task set's hyperperiod).
    #[arg(long = "horizon", requires = "simulate")]
    horizon: Option<u64>,
}

impl Cli {
    fn apply_overrides(&self, config: &mut ServerConfig) {
        if let Some(algorithm) = self.algorithm {
            config.algorithm = algorithm;
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(ms) = self.tick_ms {
            config.tick_interval_ms = ms;
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load_from_file(path)?,
        None => {
            info!("No configuration file provided, using defaults");
            ServerConfig::default()
        }
    };
    cli.apply_overrides(&mut config);

    info!(
        algorithm = %config.algorithm,
        tick_ms   = config.tick_interval_ms,
        bind      = %config.bind_addr(),
        tasks     = config.tasks.len(),
        "Configuration"
    );

    let scheduler = config.build_scheduler()?;

    if cli.simulate {
        simulate(scheduler, cli.horizon);
        return Ok(());
    }

    serve(config, scheduler, cli.gantt).await
}

// ── Offline simulation ────────────────────────────────────────────────────────

fn simulate(mut scheduler: Scheduler, horizon: Option<u64>) {
    let horizon = horizon.unwrap_or_else(|| {
        match hyperperiod::calculate(&scheduler.periods(), DEFAULT_HYPERPERIOD_LIMIT) {
            Ok(info) => info.hyperperiod,
            Err(e) => {
                warn!("{e}; simulating {FALLBACK_HORIZON} ticks");
                FALLBACK_HORIZON
            }
        }
    });

    info!(horizon, algorithm = %scheduler.algorithm(), "simulating");
    scheduler.run_for(horizon);

    println!("Timeline: {}", scheduler.timeline().join(" "));
    println!();
    let window = (horizon as usize).min(scheduler.trace_capacity());
    print!(
        "{}",
        gantt::render(&scheduler.list_tasks(), &scheduler.recent_trace(window))
    );
    println!();
    print!("{}", scheduler.report());
}

// ── Live server ───────────────────────────────────────────────────────────────

async fn serve(config: ServerConfig, scheduler: Scheduler, show_gantt: bool) -> Result<()> {
    let listener = TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("Cannot bind {}", config.bind_addr()))?;

    let mut engine = Engine::new(scheduler, config.tick_interval());
    let server = Server::new(engine.handle(), config.algorithm);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut server_task = tokio::spawn(server.serve(listener, shutdown_rx.clone()));
    let gantt_task = show_gantt.then(|| {
        tokio::spawn(print_gantt_loop(
            engine.handle(),
            config.trace_capacity,
            shutdown_rx,
        ))
    });

    engine.start();
    info!("Press Ctrl-C to stop");

    // The server only returns on its own if something went wrong.
    let server_failure = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            info!("Shutting down");
            None
        }
        joined = &mut server_task => Some(match joined {
            Ok(Ok(())) => "server stopped unexpectedly".to_string(),
            Ok(Err(e)) => format!("server exited with error: {e}"),
            Err(e) => format!("server task failed: {e}"),
        }),
    };

    let _ = shutdown_tx.send(true);
    engine.stop().await?;

    if server_failure.is_none() {
        match server_task.await {
            Ok(Err(e)) => warn!("server exited with error: {e}"),
            Err(e) => warn!("server task failed: {e}"),
            Ok(Ok(())) => {}
        }
    }
    if let Some(task) = gantt_task {
        let _ = task.await;
    }

    if let Some(scheduler) = engine.scheduler() {
        println!();
        print!("{}", scheduler.report());
    }
    if let Some(reason) = server_failure {
        bail!(reason);
    }
    Ok(())
}

async fn print_gantt_loop(
    engine: EngineHandle,
    window: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut every = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = every.tick() => {}
        }
        let (tasks, trace) = match engine.trace(window).await {
            Ok(t) => t,
            Err(_) => break,
        };
        let events = engine.recent_events(GANTT_EVENTS).await.unwrap_or_default();
        println!("{}{}", gantt::render(&tasks, &trace), gantt::render_events(&events));
    }
}
