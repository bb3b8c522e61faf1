//! Self-play worker
//!
//! Each worker owns a game loop on its own OS thread. It runs one MCTS search
//! per ply through its evaluator client, records a training sample for every
//! position, and reports finished games to the coordinator over a channel.

use anyhow::{anyhow, bail, Result};
use engine_core::{GameRules, Player};
use mcts::{Evaluator, EvaluatorError, MctsConfig, MctsSearch, SearchError, SearchStats, StopSignal};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::replay::TrainingSample;

/// Aggregated MCTS stats for one game.
#[derive(Debug, Default, Clone)]
pub struct GameSearchStats {
    /// Number of MCTS searches performed
    pub searches: u32,
    /// Sum of the per-search counters
    pub totals: SearchStats,
}

impl GameSearchStats {
    /// Add stats from a single MCTS search.
    pub fn add(&mut self, stats: &SearchStats) {
        self.searches += 1;
        self.totals.merge(stats);
    }

    /// Log a summary of the game's search stats.
    pub fn log_summary(&self, game_id: u64) {
        let total_us = self.totals.total_time_us;
        if self.searches == 0 || total_us == 0 {
            return;
        }

        let pct = |part: u64| format!("{:.1}%", part as f64 / total_us as f64 * 100.0);
        debug!(
            game_id,
            searches = self.searches,
            total_ms = format!("{:.1}", total_us as f64 / 1000.0),
            inference_pct = pct(self.totals.inference_time_us),
            expansion_pct = pct(self.totals.expansion_time_us),
            selection_pct = pct(self.totals.selection_time_us),
            backprop_pct = pct(self.totals.backprop_time_us),
            evals = self.totals.total_evals,
            terminal_hits = self.totals.terminal_hits,
            max_depth = self.totals.max_depth,
            "MCTS game stats"
        );
    }
}

/// A finished self-play game.
#[derive(Debug, Clone)]
pub struct GameRecord {
    pub game_id: u64,
    pub worker: usize,
    pub samples: Vec<TrainingSample>,
    pub plies: u32,
    /// `None` for a draw
    pub winner: Option<Player>,
    pub search: GameSearchStats,
    pub duration: Duration,
}

/// Messages sent from workers to the coordinator.
#[derive(Debug)]
pub enum WorkerEvent {
    Completed(GameRecord),
    Failed {
        worker: usize,
        game_id: u64,
        error: String,
    },
}

/// Per-worker settings derived from the actor configuration.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub worker: usize,
    /// Games to play, or `None` to play until stopped
    pub games: Option<u64>,
    pub max_plies: u32,
    pub mcts: MctsConfig,
    /// RNG seed, or `None` to seed from entropy
    pub seed: Option<u64>,
}

/// Game id unique across workers.
fn game_id(worker: usize, index: u64) -> u64 {
    ((worker as u64) << 32) | (index & 0xFFFF_FFFF)
}

fn search_error(err: &anyhow::Error) -> Option<&SearchError> {
    err.downcast_ref::<SearchError>()
}

/// Play one complete game with MCTS choosing every move.
pub fn play_game<G, E>(
    rules: &G,
    evaluator: &E,
    config: &MctsConfig,
    max_plies: u32,
    game_id: u64,
    rng: &mut ChaCha20Rng,
    stop: &StopSignal,
) -> Result<GameRecord>
where
    G: GameRules,
    E: Evaluator + ?Sized,
{
    let start = Instant::now();
    let mut state = rules.initial_state();
    let mut samples = Vec::new();
    let mut search_stats = GameSearchStats::default();
    let mut ply: u32 = 0;

    while !rules.terminal_test(&state) {
        if ply >= max_plies {
            bail!("game {} exceeded {} plies without ending", game_id, max_plies);
        }

        let player = rules.player_to_move(&state);
        let encoded = rules.encode(&state);

        let mut search = MctsSearch::new(rules, evaluator, config.clone(), state)?
            .with_stop_signal(stop.clone());
        let result = search.run(ply, rng)?;
        search_stats.add(&result.stats);

        let action = result
            .action
            .ok_or_else(|| anyhow!("search returned no move at ply {}", ply))?;

        samples.push(TrainingSample {
            game_id,
            ply,
            player,
            encoded,
            policy: rules.map_visits(&result.policy),
            action: rules.action_index(action),
            mcts_value: result.value,
            outcome: 0.0,
        });

        state = result.state;
        ply += 1;
    }

    // Backfill outcomes from each mover's own perspective. Players need not
    // alternate (Othello passes), so this keys off identity rather than parity.
    for sample in &mut samples {
        sample.outcome = rules.utility(&state, sample.player);
    }

    let first = rules.utility(&state, Player::First);
    let winner = if first > 0.0 {
        Some(Player::First)
    } else if first < 0.0 {
        Some(Player::Second)
    } else {
        None
    };

    Ok(GameRecord {
        game_id,
        worker: 0,
        samples,
        plies: ply,
        winner,
        search: search_stats,
        duration: start.elapsed(),
    })
}

/// Worker thread body: play games until the quota is met, the stop signal
/// is raised, the evaluator stops answering, or the coordinator goes away.
pub fn run_worker<G, E>(
    rules: G,
    evaluator: E,
    settings: WorkerSettings,
    events: Sender<WorkerEvent>,
    stop: StopSignal,
) where
    G: GameRules,
    E: Evaluator,
{
    let worker = settings.worker;
    let mut rng = match settings.seed {
        Some(seed) => ChaCha20Rng::seed_from_u64(seed),
        None => ChaCha20Rng::from_entropy(),
    };
    let mut played: u64 = 0;

    debug!(worker, games = ?settings.games, "Worker started");

    loop {
        if stop.is_stopped() {
            debug!(worker, "Stop requested, worker exiting");
            break;
        }
        if settings.games.is_some_and(|limit| played >= limit) {
            break;
        }

        let id = game_id(worker, played);
        played += 1;

        match play_game(
            &rules,
            &evaluator,
            &settings.mcts,
            settings.max_plies,
            id,
            &mut rng,
            &stop,
        ) {
            Ok(mut record) => {
                record.worker = worker;
                record.search.log_summary(id);
                if events.send(WorkerEvent::Completed(record)).is_err() {
                    debug!(worker, "Coordinator gone, worker exiting");
                    break;
                }
            }
            Err(e) => {
                if matches!(search_error(&e), Some(SearchError::Cancelled)) || stop.is_stopped() {
                    debug!(worker, game_id = id, "Game cancelled");
                    break;
                }

                warn!(worker, game_id = id, error = %e, "Game failed");
                // A closed or hung evaluator will fail every later game too.
                let evaluator_down = matches!(
                    search_error(&e),
                    Some(SearchError::Evaluator(
                        EvaluatorError::Unavailable(_) | EvaluatorError::Timeout(_)
                    ))
                );
                let event = WorkerEvent::Failed {
                    worker,
                    game_id: id,
                    error: format!("{:#}", e),
                };
                if events.send(event).is_err() || evaluator_down {
                    break;
                }
            }
        }
    }

    debug!(worker, games = played, "Worker finished");
}
