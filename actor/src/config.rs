//! Configuration for the Actor service
//!
//! Configuration is loaded from config.toml with environment variable overrides.
//! CLI arguments take highest priority, followed by env vars, then config.toml.

use anyhow::{anyhow, Result};
use clap::Parser;
use engine_config::{load_config, CentralConfig};
use mcts::{MctsConfig, ServiceConfig};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::level_filters::LevelFilter;

use crate::game_config::GameKind;

// Load central config once at startup
static CENTRAL_CONFIG: Lazy<CentralConfig> = Lazy::new(load_config);

/// Read `ACTOR_<NAME>` from the environment, falling back to the central config.
fn env_or<T: FromStr>(key: &str, fallback: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(fallback)
}

// Default value functions that read from central config
fn default_actor_id() -> String {
    env_or("ACTOR_ACTOR_ID", CENTRAL_CONFIG.selfplay.actor_id.clone())
}

fn default_env_id() -> String {
    env_or("ACTOR_ENV_ID", CENTRAL_CONFIG.common.env_id.clone())
}

fn default_log_level() -> String {
    env_or("ACTOR_LOG_LEVEL", CENTRAL_CONFIG.common.log_level.clone())
}

fn default_num_workers() -> usize {
    env_or("ACTOR_NUM_WORKERS", CENTRAL_CONFIG.selfplay.num_workers)
}

fn default_games_per_worker() -> i64 {
    env_or(
        "ACTOR_GAMES_PER_WORKER",
        CENTRAL_CONFIG.selfplay.games_per_worker,
    )
}

fn default_num_simulations() -> u32 {
    env_or(
        "ACTOR_NUM_SIMULATIONS",
        CENTRAL_CONFIG.mcts.num_simulations,
    )
}

fn default_exploration() -> String {
    env_or("ACTOR_EXPLORATION", CENTRAL_CONFIG.mcts.exploration.clone())
}

fn default_c_puct() -> f32 {
    env_or("ACTOR_C_PUCT", CENTRAL_CONFIG.mcts.c_puct as f32)
}

fn default_c_puct_base() -> f32 {
    env_or("ACTOR_C_PUCT_BASE", CENTRAL_CONFIG.mcts.c_puct_base as f32)
}

fn default_c_puct_init() -> f32 {
    env_or("ACTOR_C_PUCT_INIT", CENTRAL_CONFIG.mcts.c_puct_init as f32)
}

fn default_noise_base() -> f32 {
    env_or("ACTOR_NOISE_BASE", CENTRAL_CONFIG.mcts.noise_base as f32)
}

fn default_noise_fraction() -> f32 {
    env_or(
        "ACTOR_NOISE_FRACTION",
        CENTRAL_CONFIG.mcts.noise_fraction as f32,
    )
}

fn default_temp_threshold() -> u32 {
    env_or("ACTOR_TEMP_THRESHOLD", CENTRAL_CONFIG.mcts.temp_threshold)
}

fn default_temperature() -> f32 {
    env_or("ACTOR_TEMPERATURE", CENTRAL_CONFIG.mcts.temperature as f32)
}

fn default_eval_batch_size() -> usize {
    env_or(
        "ACTOR_EVAL_BATCH_SIZE",
        CENTRAL_CONFIG.selfplay.eval_batch_size,
    )
}

fn default_eval_batch_wait_us() -> u64 {
    env_or(
        "ACTOR_EVAL_BATCH_WAIT_US",
        CENTRAL_CONFIG.selfplay.eval_batch_wait_us,
    )
}

fn default_eval_timeout_ms() -> u64 {
    env_or(
        "ACTOR_EVAL_TIMEOUT_MS",
        CENTRAL_CONFIG.selfplay.eval_timeout_ms,
    )
}

fn default_max_plies() -> u32 {
    env_or("ACTOR_MAX_PLIES", CENTRAL_CONFIG.selfplay.max_plies)
}

fn default_replay_capacity() -> usize {
    env_or(
        "ACTOR_REPLAY_CAPACITY",
        CENTRAL_CONFIG.selfplay.replay_capacity,
    )
}

fn default_log_interval() -> u32 {
    env_or("ACTOR_LOG_INTERVAL", CENTRAL_CONFIG.selfplay.log_interval)
}

fn default_seed() -> u64 {
    env_or("ACTOR_SEED", CENTRAL_CONFIG.selfplay.seed)
}

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(name = "actor")]
#[command(about = "Cartridge2 Actor - Self-play game runner")]
#[command(
    long_about = "Actor that plays self-play games with Monte Carlo Tree Search on a pool
of worker threads sharing one batching evaluator, and collects training samples.

Configuration is loaded from config.toml with environment variable overrides.
CLI arguments take highest priority."
)]
pub struct Config {
    /// Unique actor identifier
    #[arg(long, default_value_t = default_actor_id())]
    pub actor_id: String,

    /// Game to play (tictactoe, othello)
    #[arg(long, default_value_t = default_env_id())]
    pub env_id: String,

    /// Number of self-play worker threads
    #[arg(long, default_value_t = default_num_workers())]
    pub num_workers: usize,

    /// Games per worker (-1 to run until interrupted)
    #[arg(long, default_value_t = default_games_per_worker(), allow_negative_numbers = true)]
    pub games_per_worker: i64,

    /// Number of MCTS simulations per move
    #[arg(long, default_value_t = default_num_simulations())]
    pub num_simulations: u32,

    /// Exploration constant policy (fixed, schedule)
    #[arg(long, default_value_t = default_exploration())]
    pub exploration: String,

    /// Fixed exploration constant
    #[arg(long, default_value_t = default_c_puct())]
    pub c_puct: f32,

    /// Base of the exploration schedule
    #[arg(long, default_value_t = default_c_puct_base())]
    pub c_puct_base: f32,

    /// Offset of the exploration schedule
    #[arg(long, default_value_t = default_c_puct_init())]
    pub c_puct_init: f32,

    /// Gamma concentration for root noise (0 to disable)
    #[arg(long, default_value_t = default_noise_base())]
    pub noise_base: f32,

    /// Fraction of the root prior replaced by noise
    #[arg(long, default_value_t = default_noise_fraction())]
    pub noise_fraction: f32,

    /// Plies played by softmax sampling before switching to the most visited move
    #[arg(long, default_value_t = default_temp_threshold())]
    pub temp_threshold: u32,

    /// Scale applied to visit fractions in the sampling softmax
    #[arg(long, default_value_t = default_temperature())]
    pub temperature: f32,

    /// Largest batch the evaluator service runs at once
    #[arg(long, default_value_t = default_eval_batch_size())]
    pub eval_batch_size: usize,

    /// Microseconds the evaluator waits to fill a batch
    #[arg(long, default_value_t = default_eval_batch_wait_us())]
    pub eval_batch_wait_us: u64,

    /// Milliseconds a worker waits for an evaluation before failing
    #[arg(long, default_value_t = default_eval_timeout_ms())]
    pub eval_timeout_ms: u64,

    /// Abandon a game that runs longer than this many plies
    #[arg(long, default_value_t = default_max_plies())]
    pub max_plies: u32,

    /// Number of training samples kept in memory
    #[arg(long, default_value_t = default_replay_capacity())]
    pub replay_capacity: usize,

    /// Base RNG seed; worker i uses seed + i (0 for a random seed)
    #[arg(long, default_value_t = default_seed())]
    pub seed: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value_t = default_log_level())]
    pub log_level: String,

    /// Log progress every N games (0 to disable)
    #[arg(long, default_value_t = default_log_interval())]
    pub log_interval: u32,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.actor_id.is_empty() {
            return Err(anyhow!("actor_id cannot be empty"));
        }

        if self.env_id.is_empty() {
            return Err(anyhow!("env_id cannot be empty"));
        }
        self.game_kind()?;

        if self.num_workers == 0 {
            return Err(anyhow!("num_workers must be greater than 0"));
        }

        if self.games_per_worker < -1 {
            return Err(anyhow!(
                "games_per_worker must be -1 (unlimited) or non-negative, got {}",
                self.games_per_worker
            ));
        }

        if self.eval_batch_size == 0 {
            return Err(anyhow!("eval_batch_size must be greater than 0"));
        }

        if self.eval_timeout_ms == 0 {
            return Err(anyhow!("eval_timeout_ms must be greater than 0"));
        }

        if self.max_plies == 0 {
            return Err(anyhow!("max_plies must be greater than 0"));
        }

        if self.replay_capacity == 0 {
            return Err(anyhow!("replay_capacity must be greater than 0"));
        }

        if self.log_level.parse::<LevelFilter>().is_err() {
            return Err(anyhow!(
                "invalid log level '{}', expected one of trace, debug, info, warn, error",
                self.log_level
            ));
        }

        self.mcts_config()?
            .validate()
            .map_err(|e| anyhow!("invalid MCTS settings: {}", e))?;

        Ok(())
    }

    pub fn game_kind(&self) -> Result<GameKind> {
        self.env_id.parse()
    }

    /// Games each worker plays, or `None` to play until interrupted.
    pub fn games_limit(&self) -> Option<u64> {
        u64::try_from(self.games_per_worker).ok()
    }

    /// Immutable search configuration shared by every worker.
    pub fn mcts_config(&self) -> Result<MctsConfig> {
        let config = MctsConfig::for_training()
            .with_simulations(self.num_simulations)
            .with_noise(self.noise_base, self.noise_fraction)
            .with_sampling_threshold(self.temp_threshold)
            .with_temperature(self.temperature);

        match self.exploration.as_str() {
            "fixed" => Ok(config.with_c_puct(self.c_puct)),
            "schedule" => Ok(config.with_schedule(self.c_puct_base, self.c_puct_init)),
            other => Err(anyhow!(
                "unknown exploration policy '{}', expected fixed or schedule",
                other
            )),
        }
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            max_batch: self.eval_batch_size,
            batch_wait: Duration::from_micros(self.eval_batch_wait_us),
            request_timeout: self.eval_timeout(),
            ..ServiceConfig::default()
        }
    }

    pub fn eval_timeout(&self) -> Duration {
        Duration::from_millis(self.eval_timeout_ms)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use mcts::Exploration;

    pub(crate) fn base_config() -> Config {
        Config {
            actor_id: "actor".into(),
            env_id: "tictactoe".into(),
            num_workers: 2,
            games_per_worker: 1,
            num_simulations: 16,
            exploration: "fixed".into(),
            c_puct: 1.25,
            c_puct_base: 19652.0,
            c_puct_init: 1.25,
            noise_base: 0.3,
            noise_fraction: 0.25,
            temp_threshold: 4,
            temperature: 10.0,
            eval_batch_size: 2,
            eval_batch_wait_us: 100,
            eval_timeout_ms: 5000,
            max_plies: 100,
            replay_capacity: 1000,
            seed: 7,
            log_level: "info".into(),
            log_interval: 0,
        }
    }

    #[test]
    fn validate_accepts_valid_configuration() {
        let cfg = base_config();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_actor_id() {
        let mut cfg = base_config();
        cfg.actor_id.clear();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("actor_id"));
    }

    #[test]
    fn validate_rejects_empty_env_id() {
        let mut cfg = base_config();
        cfg.env_id.clear();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("env_id"));
    }

    #[test]
    fn validate_rejects_unknown_game() {
        let mut cfg = base_config();
        cfg.env_id = "chess".into();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("Unknown game"));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut cfg = base_config();
        cfg.log_level = "nope".into();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("invalid log level"));
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let mut cfg = base_config();
        cfg.num_workers = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("num_workers"));
    }

    #[test]
    fn validate_rejects_zero_eval_batch_size() {
        let mut cfg = base_config();
        cfg.eval_batch_size = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("eval_batch_size"));
    }

    #[test]
    fn validate_rejects_bad_games_per_worker() {
        let mut cfg = base_config();
        cfg.games_per_worker = -5;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("games_per_worker"));
    }

    #[test]
    fn validate_accepts_unlimited_games() {
        let mut cfg = base_config();
        cfg.games_per_worker = -1; // Unlimited mode
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.games_limit(), None);
    }

    #[test]
    fn validate_rejects_bad_mcts_settings() {
        let mut cfg = base_config();
        cfg.noise_fraction = 2.0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("invalid MCTS settings"));

        let mut cfg = base_config();
        cfg.num_simulations = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_exploration() {
        let mut cfg = base_config();
        cfg.exploration = "adaptive".into();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("exploration"));
    }

    #[test]
    fn mcts_config_maps_fields() {
        let cfg = base_config();
        let mcts = cfg.mcts_config().unwrap();
        assert_eq!(mcts.num_simulations, 16);
        assert_eq!(mcts.exploration, Exploration::Fixed { c_puct: 1.25 });
        assert_eq!(mcts.sampling_threshold, 4);
        assert!((mcts.noise_base - 0.3).abs() < 1e-6);

        let mut cfg = base_config();
        cfg.exploration = "schedule".into();
        let mcts = cfg.mcts_config().unwrap();
        assert_eq!(
            mcts.exploration,
            Exploration::Schedule {
                base: 19652.0,
                init: 1.25
            }
        );
    }

    #[test]
    fn service_config_maps_fields() {
        let cfg = base_config();
        let service = cfg.service_config();
        assert_eq!(service.max_batch, 2);
        assert_eq!(service.batch_wait, Duration::from_micros(100));
        assert_eq!(service.request_timeout, Duration::from_millis(5000));
    }

    #[test]
    fn games_limit_for_bounded_runs() {
        let cfg = base_config();
        assert_eq!(cfg.games_limit(), Some(1));
    }
}
