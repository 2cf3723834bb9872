//! Authring simulator CLI
//!
//! Spins up a pool of nodes that take turns producing blocks, one per
//! synchronized cycle, until the configured duration elapses or ctrl-c.
//!
//! # Example
//!
//! ```bash
//! # Three nodes, one round per second, for 30 seconds
//! authring-sim --nodes 3 --duration 30
//!
//! # Faster rounds, longer eviction cooldown, run until ctrl-c
//! authring-sim -n 5 --cycle-ms 250 --cooldown-ms 1000 -d 0
//! ```

use authring_core::CoordinatorConfig;
use authring_simulation::{Simulation, SimulationConfig};
use clap::Parser;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Authring pool simulator
///
/// Runs a simulated proof-of-authority pool: synchronized rounds,
/// hash-based leader election, eviction of failing winners and cooldown
/// rejoin.
#[derive(Parser, Debug)]
#[command(name = "authring-sim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of nodes in the pool
    #[arg(short = 'n', long, default_value = "3")]
    nodes: usize,

    /// Round duration in milliseconds
    #[arg(long, default_value = "1000")]
    cycle_ms: u64,

    /// Eviction cooldown in milliseconds
    #[arg(long, default_value = "2000")]
    cooldown_ms: u64,

    /// How long to run, in seconds (0 = until ctrl-c)
    #[arg(short = 'd', long, default_value = "30")]
    duration: u64,

    /// Seed for the simulation RNG
    #[arg(long, default_value = "42")]
    seed: u64,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    info!(
        nodes = args.nodes,
        cycle_ms = args.cycle_ms,
        cooldown_ms = args.cooldown_ms,
        duration_secs = args.duration,
        seed = args.seed,
        "Starting simulation"
    );

    let config = SimulationConfig::new(args.nodes).with_coordinator(
        CoordinatorConfig::with_cycle_duration(Duration::from_millis(args.cycle_ms))
            .with_rejoin_cooldown(Duration::from_millis(args.cooldown_ms))
            .with_seed(args.seed),
    );

    let sim = match Simulation::start(config) {
        Ok(sim) => sim,
        Err(err) => {
            eprintln!("failed to start simulation: {err}");
            std::process::exit(1);
        }
    };

    if args.duration == 0 {
        let _ = tokio::signal::ctrl_c().await;
        info!("Interrupted, shutting down");
    } else {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(args.duration)) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
            }
        }
    }

    sim.shutdown().await;
}
