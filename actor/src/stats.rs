//! Self-play statistics tracking.
//!
//! This module provides statistics tracking for the actor, including:
//! - Game counts and outcomes
//! - MCTS performance metrics
//! - Throughput over the run

use engine_core::Player;
use mcts::{SearchStats, ServiceStats};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

use crate::worker::GameRecord;

/// Aggregated statistics for a self-play run. Owned by the coordinator.
#[derive(Debug)]
pub struct SelfPlayStats {
    env_id: String,
    /// Number of games completed
    games_completed: u64,
    /// Games abandoned because of an error
    games_failed: u64,
    /// Total plies across all completed games
    total_plies: u64,
    /// Wins by player to move first
    first_wins: u64,
    /// Wins by the replying player
    second_wins: u64,
    draws: u64,
    /// MCTS searches performed
    searches: u64,
    /// Summed per-search counters
    search: SearchStats,
    /// Start time for rate calculations
    start_time: Instant,
}

/// Serializable stats for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfPlaySnapshot {
    pub env_id: String,
    pub games_completed: u64,
    pub games_failed: u64,
    pub total_plies: u64,
    pub first_wins: u64,
    pub second_wins: u64,
    pub draws: u64,
    pub avg_game_length: f64,
    pub games_per_second: f64,
    pub runtime_seconds: f64,
    pub mcts_avg_inference_us: f64,
}

impl SelfPlayStats {
    pub fn new(env_id: &str) -> Self {
        Self {
            env_id: env_id.to_string(),
            games_completed: 0,
            games_failed: 0,
            total_plies: 0,
            first_wins: 0,
            second_wins: 0,
            draws: 0,
            searches: 0,
            search: SearchStats::default(),
            start_time: Instant::now(),
        }
    }

    /// Record a finished game.
    pub fn record_game(&mut self, record: &GameRecord) {
        self.games_completed += 1;
        self.total_plies += u64::from(record.plies);
        match record.winner {
            Some(Player::First) => self.first_wins += 1,
            Some(Player::Second) => self.second_wins += 1,
            None => self.draws += 1,
        }
        self.searches += u64::from(record.search.searches);
        self.search.merge(&record.search.totals);
    }

    pub fn record_failure(&mut self) {
        self.games_failed += 1;
    }

    pub fn games_completed(&self) -> u64 {
        self.games_completed
    }

    /// Get a snapshot of current stats.
    pub fn snapshot(&self) -> SelfPlaySnapshot {
        let runtime = self.start_time.elapsed().as_secs_f64();
        let games = self.games_completed;

        SelfPlaySnapshot {
            env_id: self.env_id.clone(),
            games_completed: games,
            games_failed: self.games_failed,
            total_plies: self.total_plies,
            first_wins: self.first_wins,
            second_wins: self.second_wins,
            draws: self.draws,
            avg_game_length: if games > 0 {
                self.total_plies as f64 / games as f64
            } else {
                0.0
            },
            games_per_second: if runtime > 0.0 {
                games as f64 / runtime
            } else {
                0.0
            },
            runtime_seconds: runtime,
            mcts_avg_inference_us: if self.searches > 0 {
                self.search.inference_time_us as f64 / self.searches as f64
            } else {
                0.0
            },
        }
    }

    /// Periodic progress line.
    pub fn log_progress(&self) {
        let snap = self.snapshot();
        info!(
            games = snap.games_completed,
            failed = snap.games_failed,
            games_per_sec = format!("{:.2}", snap.games_per_second),
            avg_length = format!("{:.1}", snap.avg_game_length),
            "Self-play progress"
        );
    }

    /// Final summary with outcome split and time breakdown.
    pub fn log_summary(&self, service: &ServiceStats) {
        let snap = self.snapshot();
        let games = snap.games_completed.max(1) as f64;
        let total_us = self.search.total_time_us.max(1) as f64;
        let pct = |part: u64| format!("{:.1}%", part as f64 / total_us * 100.0);

        info!(
            env_id = %snap.env_id,
            games = snap.games_completed,
            failed = snap.games_failed,
            first_win_pct = format!("{:.1}%", snap.first_wins as f64 / games * 100.0),
            second_win_pct = format!("{:.1}%", snap.second_wins as f64 / games * 100.0),
            draw_pct = format!("{:.1}%", snap.draws as f64 / games * 100.0),
            avg_length = format!("{:.1}", snap.avg_game_length),
            runtime_s = format!("{:.1}", snap.runtime_seconds),
            "Self-play summary"
        );
        info!(
            searches = self.searches,
            evals = self.search.total_evals,
            terminal_hits = self.search.terminal_hits,
            inference_pct = pct(self.search.inference_time_us),
            expansion_pct = pct(self.search.expansion_time_us),
            selection_pct = pct(self.search.selection_time_us),
            backprop_pct = pct(self.search.backprop_time_us),
            batches = service.batches,
            avg_batch_size = format!("{:.2}", service.avg_batch_size()),
            largest_batch = service.largest_batch,
            "MCTS summary"
        );
    }
}
