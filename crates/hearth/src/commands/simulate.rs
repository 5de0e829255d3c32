//! Simulate command - drives a provider with concurrent clients.
//!
//! Each simulated client keeps one live session and, every round, reads it,
//! bumps a hit counter and occasionally rotates its id or logs out. Some
//! rounds also open a session that is never touched again, which the
//! background sweeper should reclaim once it has been idle for the lifetime.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context as _, Result, bail};
use clap::Args;
use console::Style;
use hearth_session::{ProviderRegistry, SessionProvider, spawn_sweeper};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::Context;

/// Arguments for the simulate command.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Number of concurrent clients
    #[arg(long, default_value_t = 8)]
    pub clients: usize,

    /// Rounds each client runs
    #[arg(long, default_value_t = 100)]
    pub rounds: usize,

    /// Pause between rounds, in milliseconds
    #[arg(long, default_value_t = 5)]
    pub pause_ms: u64,

    /// Session lifetime in seconds (default: from config)
    #[arg(long)]
    pub lifetime_secs: Option<u64>,

    /// Sweep interval in milliseconds (default: from config)
    #[arg(long)]
    pub sweep_interval_ms: Option<u64>,

    /// Rotate the session id every N rounds (0 disables)
    #[arg(long, default_value_t = 10)]
    pub rotate_every: usize,

    /// Log out and start a new session every N rounds (0 disables)
    #[arg(long, default_value_t = 50)]
    pub logout_every: usize,

    /// Open an abandoned session every N rounds (0 disables)
    #[arg(long, default_value_t = 20)]
    pub abandon_every: usize,
}

/// Outcome of a simulation run.
#[derive(Debug, Default, Serialize)]
struct Report {
    clients: usize,
    rounds: usize,
    sessions_created: usize,
    rotations: usize,
    logouts: usize,
    failed_logouts: usize,
    abandoned: usize,
    evicted: u64,
    live_sessions: usize,
    elapsed_ms: u64,
}

/// Per-client counters.
#[derive(Debug, Default)]
struct ClientStats {
    created: usize,
    rotations: usize,
    logouts: usize,
    failed_logouts: usize,
    abandoned: usize,
}

fn every(round: usize, n: usize) -> bool {
    n > 0 && round > 0 && round % n == 0
}

fn new_session_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Run one client's rounds against the provider.
async fn run_client(
    client: usize,
    provider: Arc<dyn SessionProvider>,
    args: Arc<SimulateArgs>,
) -> ClientStats {
    let mut stats = ClientStats::default();
    let mut session_id = new_session_id();
    stats.created += 1;

    for round in 0..args.rounds {
        let session = provider.read(&session_id);
        let hits = session.get("hits").and_then(|v| v.as_u64()).unwrap_or(0);
        session.set("hits".to_string(), Value::from(hits + 1));
        session.set("client".to_string(), Value::from(client));

        if every(round, args.rotate_every) {
            let rotated = new_session_id();
            provider.regenerate(&session_id, &rotated);
            debug!(client, old = %session_id, new = %rotated, "Client rotated session");
            session_id = rotated;
            stats.rotations += 1;
        }

        if every(round, args.logout_every) {
            if let Err(e) = provider.destroy(&session_id) {
                warn!(client, session_id = %session_id, error = %e, "Logout failed");
                stats.failed_logouts += 1;
            }
            session_id = new_session_id();
            stats.logouts += 1;
            stats.created += 1;
        }

        if every(round, args.abandon_every) {
            provider
                .read(&new_session_id())
                .set("abandoned".to_string(), Value::Bool(true));
            stats.abandoned += 1;
            stats.created += 1;
        }

        if args.pause_ms > 0 {
            tokio::time::sleep(Duration::from_millis(args.pause_ms)).await;
        }
    }

    stats
}

/// Run the simulate command.
pub async fn run(args: SimulateArgs, ctx: &Context) -> Result<()> {
    if args.clients == 0 {
        bail!("--clients must be at least 1");
    }

    let session = ctx.config.config.session();
    let lifetime = Duration::from_secs(args.lifetime_secs.unwrap_or(session.lifetime_secs));
    let interval = args
        .sweep_interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| session.sweep_interval());

    let provider = session
        .build_provider(&ProviderRegistry::with_defaults())
        .context("building session provider")?;

    info!(
        provider = provider.name(),
        clients = args.clients,
        rounds = args.rounds,
        lifetime_secs = lifetime.as_secs(),
        "Starting simulation"
    );

    let started = Instant::now();
    let sweeper = spawn_sweeper(Arc::clone(&provider), lifetime, interval);

    let args = Arc::new(args);
    let mut tasks = Vec::with_capacity(args.clients);
    for client in 0..args.clients {
        tasks.push(tokio::spawn(run_client(
            client,
            Arc::clone(&provider),
            Arc::clone(&args),
        )));
    }

    let mut report = Report {
        clients: args.clients,
        rounds: args.rounds,
        ..Default::default()
    };
    for task in tasks {
        let stats = task.await.context("simulated client panicked")?;
        report.sessions_created += stats.created;
        report.rotations += stats.rotations;
        report.logouts += stats.logouts;
        report.failed_logouts += stats.failed_logouts;
        report.abandoned += stats.abandoned;
    }

    report.evicted = sweeper.shutdown().await;
    report.live_sessions = provider.count();
    report.elapsed_ms = started.elapsed().as_millis() as u64;

    info!(
        evicted = report.evicted,
        live = report.live_sessions,
        "Simulation finished"
    );

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, ctx.verbose);
    }

    Ok(())
}

fn print_report(report: &Report, verbose: bool) {
    let bold = Style::new().bold();
    let dim = Style::new().dim();

    println!("{}", bold.apply_to("Simulation complete"));
    println!();
    println!("  {:<18} {}", "clients", report.clients);
    println!("  {:<18} {}", "rounds", report.rounds);
    println!("  {:<18} {}", "sessions created", report.sessions_created);
    println!("  {:<18} {}", "rotations", report.rotations);
    println!("  {:<18} {}", "logouts", report.logouts);
    if report.failed_logouts > 0 {
        println!("  {:<18} {}", "failed logouts", report.failed_logouts);
    }
    println!("  {:<18} {}", "abandoned", report.abandoned);
    println!("  {:<18} {}", "evicted", report.evicted);
    println!("  {:<18} {}", "live sessions", report.live_sessions);
    if verbose {
        println!();
        println!("  {}", dim.apply_to(format!("{} ms", report.elapsed_ms)));
    }
}
