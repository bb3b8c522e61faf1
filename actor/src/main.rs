//! Actor - Self-play game runner for Cartridge2
//!
//! A process that:
//! 1. Starts a batching evaluator service shared by all workers
//! 2. Runs MCTS self-play games on a pool of worker threads
//! 3. Collects the resulting training samples in a bounded replay buffer
//! 4. Stops cleanly on Ctrl+C, abandoning in-flight games

use anyhow::{anyhow, Result};
use clap::Parser;
use engine_core::GameRules;
use games_othello::Othello;
use games_tictactoe::TicTacToe;
use mcts::{StopSignal, UniformEvaluator};
use tokio::signal;
use tracing::{error, info};

mod actor;
mod config;
mod game_config;
mod replay;
mod stats;
mod worker;

use crate::actor::{Actor, RunSummary};
use crate::config::Config;
use crate::game_config::GameKind;

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init()
        .map_err(|e| anyhow!("failed to initialize tracing: {}", e))?;

    Ok(())
}

/// Self-play with the uniform evaluator standing in for a trained network.
fn play<G: GameRules + Clone>(config: Config, rules: G, stop: StopSignal) -> Result<RunSummary> {
    let evaluator = UniformEvaluator::new(rules.action_space());
    Actor::new(config, rules, evaluator, stop)?.run()
}

fn run_actor(config: Config, stop: StopSignal) -> Result<RunSummary> {
    match config.game_kind()? {
        GameKind::TicTacToe => play(config, TicTacToe, stop),
        GameKind::Othello => play(config, Othello, stop),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    eprintln!("Actor service starting...");

    // Parse configuration
    let config = Config::parse();

    // Validate configuration
    config.validate()?;

    // Initialize tracing
    init_tracing(&config.log_level)?;
    info!(log_level = %config.log_level, "Tracing initialized");

    let games_description = match config.games_limit() {
        Some(n) => n.to_string(),
        None => "unlimited".to_string(),
    };
    info!(
        "Starting actor {} for environment {} ({} games per worker, {} workers)",
        config.actor_id, config.env_id, games_description, config.num_workers
    );

    // Setup graceful shutdown
    let stop = StopSignal::new();
    let shutdown_stop = stop.clone();
    let shutdown_handle = tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received, stopping actor...");
                shutdown_stop.stop();
            }
            Err(e) => error!("Failed to listen for ctrl+c: {}", e),
        }
    });

    // Workers are OS threads; keep them off the async runtime
    let run_result = tokio::task::spawn_blocking(move || run_actor(config, stop))
        .await
        .map_err(|e| anyhow!("actor task failed: {}", e))
        .and_then(|r| r);

    shutdown_handle.abort();

    match run_result {
        Ok(summary) => {
            info!(
                games = summary.stats.games_completed,
                failed = summary.stats.games_failed,
                samples = summary.replay.len(),
                eval_batches = summary.service.batches,
                "Actor completed successfully"
            );
            Ok(())
        }
        Err(e) => {
            error!("Actor failed: {:#}", e);
            Err(e)
        }
    }
}
