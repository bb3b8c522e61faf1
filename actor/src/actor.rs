//! Self-play coordinator
//!
//! Starts the evaluator service and one worker thread per configured worker,
//! then drains finished games into the replay buffer until every worker is
//! done or the stop signal is raised.

use anyhow::{anyhow, Result};
use engine_core::GameRules;
use indicatif::{ProgressBar, ProgressStyle};
use mcts::{Evaluator, EvaluatorService, ServiceHandle, ServiceStats, StopSignal};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::replay::ReplayBuffer;
use crate::stats::{SelfPlaySnapshot, SelfPlayStats};
use crate::worker::{run_worker, WorkerEvent, WorkerSettings};

/// What a finished run hands back to the caller.
#[derive(Debug)]
pub struct RunSummary {
    pub stats: SelfPlaySnapshot,
    pub replay: ReplayBuffer,
    pub service: ServiceStats,
}

/// Worker `i` gets `seed + i`; a zero seed means seeding from entropy.
fn worker_seed(config: &Config, worker: usize) -> Option<u64> {
    match config.seed {
        0 => None,
        seed => Some(seed.wrapping_add(worker as u64)),
    }
}

/// Progress bar for bounded runs, only when stderr is a TTY.
fn progress_bar(config: &Config) -> Option<ProgressBar> {
    let total = config.games_limit()? * config.num_workers as u64;
    if total == 0 || !std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        return None;
    }
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} games ({eta})")
        .ok()?
        .progress_chars("#>-");
    pb.set_style(style);
    Some(pb)
}

/// Stop and join whatever was started before startup failed.
fn abort_startup(stop: &StopSignal, workers: Vec<JoinHandle<()>>, service: ServiceHandle) {
    stop.stop();
    for (worker, handle) in workers.into_iter().enumerate() {
        if handle.join().is_err() {
            error!(worker, "Worker thread panicked during shutdown");
        }
    }
    if let Err(e) = service.join() {
        warn!("Evaluator service did not shut down cleanly: {}", e);
    }
}

/// Self-play actor for one game variant and one evaluator.
pub struct Actor<G, E> {
    config: Config,
    rules: G,
    evaluator: E,
    stop: StopSignal,
}

impl<G, E> Actor<G, E>
where
    G: GameRules + Clone,
    E: Evaluator + 'static,
{
    pub fn new(config: Config, rules: G, evaluator: E, stop: StopSignal) -> Result<Self> {
        config.validate()?;
        info!(
            actor_id = %config.actor_id,
            game = rules.name(),
            workers = config.num_workers,
            simulations = config.num_simulations,
            "Actor created"
        );
        Ok(Self {
            config,
            rules,
            evaluator,
            stop,
        })
    }

    /// Run self-play to completion. Blocks the calling thread.
    pub fn run(self) -> Result<RunSummary> {
        let Actor {
            config,
            rules,
            evaluator,
            stop,
        } = self;
        let mcts = config.mcts_config()?;
        let games = config.games_limit();

        info!(
            actor_id = %config.actor_id,
            games_per_worker = ?games,
            workers = config.num_workers,
            "Actor starting self-play"
        );

        let mut service = EvaluatorService::spawn(
            evaluator,
            config.service_config(),
            stop.clone(),
        )
        .map_err(|e| anyhow!("failed to start evaluator service: {}", e))?;

        let (events_tx, events_rx) = mpsc::channel();
        let mut workers: Vec<JoinHandle<()>> = Vec::with_capacity(config.num_workers);

        for worker in 0..config.num_workers {
            let client = match service.client(worker) {
                Ok(client) => client,
                Err(e) => {
                    abort_startup(&stop, workers, service);
                    return Err(anyhow!("failed to create evaluator client: {}", e));
                }
            };
            let settings = WorkerSettings {
                worker,
                games,
                max_plies: config.max_plies,
                mcts: mcts.clone(),
                seed: worker_seed(&config, worker),
            };
            let rules = rules.clone();
            let events = events_tx.clone();
            let worker_stop = stop.clone();

            let spawned = thread::Builder::new()
                .name(format!("selfplay-{}", worker))
                .spawn(move || run_worker(rules, client, settings, events, worker_stop));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    abort_startup(&stop, workers, service);
                    return Err(anyhow!("failed to spawn worker {}: {}", worker, e));
                }
            }
        }

        // Workers hold the only remaining senders and clients.
        drop(events_tx);
        service.close();

        let mut stats = SelfPlayStats::new(&config.env_id);
        let mut replay = ReplayBuffer::new(config.replay_capacity);
        let progress = progress_bar(&config);

        for event in events_rx {
            match event {
                WorkerEvent::Completed(record) => {
                    debug!(
                        game_id = record.game_id,
                        worker = record.worker,
                        plies = record.plies,
                        winner = ?record.winner,
                        duration_ms = record.duration.as_millis() as u64,
                        "Game completed"
                    );
                    stats.record_game(&record);
                    replay.extend(record.samples);

                    if let Some(ref pb) = progress {
                        pb.inc(1);
                    }

                    let done = stats.games_completed();
                    if config.log_interval > 0 && done % u64::from(config.log_interval) == 0 {
                        // Suspend progress bar while logging to avoid visual glitches
                        match progress {
                            Some(ref pb) => pb.suspend(|| stats.log_progress()),
                            None => stats.log_progress(),
                        }
                    }
                }
                WorkerEvent::Failed {
                    worker,
                    game_id,
                    error,
                } => {
                    stats.record_failure();
                    error!(worker, game_id, "Game failed: {}", error);
                    if let Some(ref pb) = progress {
                        pb.inc(1);
                    }
                }
            }
        }

        if let Some(pb) = progress {
            pb.finish_with_message("done");
        }

        let mut panicked = 0;
        for (worker, handle) in workers.into_iter().enumerate() {
            if handle.join().is_err() {
                error!(worker, "Worker thread panicked");
                panicked += 1;
            }
        }

        let service_stats = service.join().unwrap_or_else(|e| {
            warn!("Evaluator service did not shut down cleanly: {}", e);
            ServiceStats::default()
        });

        if stop.is_stopped() {
            info!("Self-play interrupted by stop signal");
        }
        stats.log_summary(&service_stats);
        if !replay.is_empty() {
            info!(
                samples = replay.len(),
                capacity = replay.capacity(),
                total_samples = replay.total_added(),
                evicted = replay.evicted(),
                "Replay buffer"
            );
        }

        if panicked > 0 {
            return Err(anyhow!("{} worker thread(s) panicked", panicked));
        }

        Ok(RunSummary {
            stats: stats.snapshot(),
            replay,
            service: service_stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::base_config;
    use games_othello::Othello;
    use games_tictactoe::TicTacToe;
    use mcts::{EvalResult, EvaluatorError, MctsConfig, ServiceConfig, UniformEvaluator};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Returns a policy one entry short, so every search fails.
    struct TruncatedEvaluator;

    impl Evaluator for TruncatedEvaluator {
        fn evaluate_batch(&self, inputs: &[Vec<f32>]) -> Result<Vec<EvalResult>, EvaluatorError> {
            Ok(inputs
                .iter()
                .map(|_| EvalResult {
                    policy: vec![0.125; 8],
                    value: 0.0,
                })
                .collect())
        }
    }

    fn test_config() -> Config {
        let mut config = base_config();
        config.num_simulations = 8;
        config.noise_base = 0.0;
        config.noise_fraction = 0.0;
        config
    }

    #[test]
    fn test_actor_rejects_invalid_config() {
        let mut config = test_config();
        config.num_workers = 0;
        let result = Actor::new(
            config,
            TicTacToe,
            UniformEvaluator::new(9),
            StopSignal::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_actor_runs_all_games() {
        let mut config = test_config();
        config.num_workers = 2;
        config.games_per_worker = 2;
        config.log_interval = 1;

        let actor = Actor::new(config, TicTacToe, UniformEvaluator::new(9), StopSignal::new())
            .unwrap();
        let summary = actor.run().unwrap();

        assert_eq!(summary.stats.games_completed, 4);
        assert_eq!(summary.stats.games_failed, 0);
        assert_eq!(
            summary.stats.first_wins + summary.stats.second_wins + summary.stats.draws,
            4
        );
        assert_eq!(summary.replay.len() as u64, summary.stats.total_plies);
        assert!(summary.service.requests > 0);
        assert!(summary.service.largest_batch <= 2);
    }

    #[test]
    fn test_actor_samples_carry_outcomes() {
        let mut config = test_config();
        config.num_workers = 1;
        config.games_per_worker = 1;

        let actor = Actor::new(config, TicTacToe, UniformEvaluator::new(9), StopSignal::new())
            .unwrap();
        let summary = actor.run().unwrap();

        let samples: Vec<_> = summary.replay.iter().collect();
        assert!(!samples.is_empty());
        let draw = summary.stats.draws == 1;
        for sample in samples {
            if draw {
                assert_eq!(sample.outcome, 0.0);
            } else {
                assert!(sample.outcome == 1.0 || sample.outcome == -1.0);
            }
        }
    }

    #[test]
    fn test_actor_replay_capacity_bounds_samples() {
        let mut config = test_config();
        config.num_workers = 1;
        config.games_per_worker = 3;
        config.replay_capacity = 4;

        let actor = Actor::new(config, TicTacToe, UniformEvaluator::new(9), StopSignal::new())
            .unwrap();
        let summary = actor.run().unwrap();

        assert_eq!(summary.replay.len(), 4);
        assert_eq!(summary.replay.total_added(), summary.stats.total_plies);
        assert!(summary.replay.evicted() > 0);
    }

    #[test]
    fn test_actor_stopped_before_start_plays_nothing() {
        let mut config = test_config();
        config.games_per_worker = -1;
        let stop = StopSignal::new();
        stop.stop();

        let actor = Actor::new(config, TicTacToe, UniformEvaluator::new(9), stop).unwrap();
        let summary = actor.run().unwrap();

        assert_eq!(summary.stats.games_completed, 0);
        assert!(summary.replay.is_empty());
    }

    #[test]
    fn test_actor_unlimited_run_stops_on_signal() {
        let mut config = test_config();
        config.games_per_worker = -1;
        let stop = StopSignal::new();

        let stopper = stop.clone();
        let timer = thread::spawn(move || {
            thread::sleep(std::time::Duration::from_millis(200));
            stopper.stop();
        });

        let actor = Actor::new(config, TicTacToe, UniformEvaluator::new(9), stop).unwrap();
        let summary = actor.run().unwrap();
        timer.join().unwrap();

        assert_eq!(summary.stats.games_failed, 0);
        assert_eq!(summary.replay.total_added(), summary.stats.total_plies);
    }

    #[test]
    fn test_actor_counts_failed_games() {
        let mut config = test_config();
        config.num_workers = 2;
        config.games_per_worker = 2;

        let actor =
            Actor::new(config, TicTacToe, TruncatedEvaluator, StopSignal::new()).unwrap();
        let summary = actor.run().unwrap();

        assert_eq!(summary.stats.games_completed, 0);
        assert_eq!(summary.stats.games_failed, 4);
        assert!(summary.replay.is_empty());
    }

    #[test]
    fn test_actor_plays_othello() {
        let mut config = test_config();
        config.env_id = "othello".into();
        config.num_workers = 2;
        config.games_per_worker = 1;
        config.num_simulations = 2;
        config.eval_batch_size = 4;

        let actor = Actor::new(
            config,
            Othello,
            UniformEvaluator::new(Othello.action_space()),
            StopSignal::new(),
        )
        .unwrap();
        let summary = actor.run().unwrap();

        assert_eq!(summary.stats.games_completed, 2);
        assert!(summary.stats.avg_game_length > 0.0);
    }

    #[test]
    fn test_abort_startup_joins_started_threads() {
        let stop = StopSignal::new();
        let service = EvaluatorService::spawn(
            UniformEvaluator::new(9),
            ServiceConfig::default(),
            stop.clone(),
        )
        .unwrap();
        let (events_tx, events_rx) = mpsc::channel();
        let exited = Arc::new(AtomicUsize::new(0));

        let mut workers = Vec::new();
        for worker in 0..2 {
            let client = service.client(worker).unwrap();
            let settings = WorkerSettings {
                worker,
                games: None,
                max_plies: 100,
                mcts: MctsConfig::for_testing().with_simulations(8),
                seed: Some(worker as u64),
            };
            let events = events_tx.clone();
            let worker_stop = stop.clone();
            let exited = Arc::clone(&exited);
            workers.push(thread::spawn(move || {
                run_worker(TicTacToe, client, settings, events, worker_stop);
                exited.fetch_add(1, Ordering::SeqCst);
            }));
        }

        // Unlimited workers only return once stopped and joined.
        abort_startup(&stop, workers, service);

        assert!(stop.is_stopped());
        assert_eq!(exited.load(Ordering::SeqCst), 2);
        drop(events_tx);
        assert!(events_rx.iter().all(|e| matches!(e, WorkerEvent::Completed(_))));
    }
}
