//! Default configuration values loaded from config.defaults.toml.
//!
//! The defaults file is embedded at compile time so every binary agrees on
//! the same baseline without shipping extra files.

use once_cell::sync::Lazy;
use serde::Deserialize;

/// The embedded defaults TOML file (loaded at compile time)
const DEFAULTS_TOML: &str = include_str!("../../../config.defaults.toml");

/// Parsed defaults structure (parsed once at first use)
static DEFAULTS: Lazy<DefaultsConfig> = Lazy::new(|| {
    toml::from_str(DEFAULTS_TOML).expect("config.defaults.toml should be valid TOML")
});

// ============================================================================
// Internal structs for parsing config.defaults.toml
// ============================================================================

#[derive(Debug, Deserialize)]
struct DefaultsConfig {
    common: CommonDefaults,
    mcts: MctsDefaults,
    selfplay: SelfPlayDefaults,
}

#[derive(Debug, Deserialize)]
struct CommonDefaults {
    env_id: String,
    log_level: String,
}

#[derive(Debug, Deserialize)]
struct MctsDefaults {
    num_simulations: u32,
    c_puct: f64,
    exploration: String,
    c_puct_base: f64,
    c_puct_init: f64,
    noise_base: f64,
    noise_fraction: f64,
    temp_threshold: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct SelfPlayDefaults {
    actor_id: String,
    num_workers: usize,
    games_per_worker: i64,
    eval_batch_size: usize,
    eval_batch_wait_us: u64,
    eval_timeout_ms: u64,
    max_plies: u32,
    replay_capacity: usize,
    log_interval: u32,
    seed: u64,
}

// ============================================================================
// Public accessor functions
// ============================================================================

// Common
pub fn env_id() -> &'static str {
    &DEFAULTS.common.env_id
}
pub fn log_level() -> &'static str {
    &DEFAULTS.common.log_level
}

// MCTS
pub fn num_simulations() -> u32 {
    DEFAULTS.mcts.num_simulations
}
pub fn c_puct() -> f64 {
    DEFAULTS.mcts.c_puct
}
pub fn exploration() -> &'static str {
    &DEFAULTS.mcts.exploration
}
pub fn c_puct_base() -> f64 {
    DEFAULTS.mcts.c_puct_base
}
pub fn c_puct_init() -> f64 {
    DEFAULTS.mcts.c_puct_init
}
pub fn noise_base() -> f64 {
    DEFAULTS.mcts.noise_base
}
pub fn noise_fraction() -> f64 {
    DEFAULTS.mcts.noise_fraction
}
pub fn temp_threshold() -> u32 {
    DEFAULTS.mcts.temp_threshold
}
pub fn temperature() -> f64 {
    DEFAULTS.mcts.temperature
}

// Self-play
pub fn actor_id() -> &'static str {
    &DEFAULTS.selfplay.actor_id
}
pub fn num_workers() -> usize {
    DEFAULTS.selfplay.num_workers
}
pub fn games_per_worker() -> i64 {
    DEFAULTS.selfplay.games_per_worker
}
pub fn eval_batch_size() -> usize {
    DEFAULTS.selfplay.eval_batch_size
}
pub fn eval_batch_wait_us() -> u64 {
    DEFAULTS.selfplay.eval_batch_wait_us
}
pub fn eval_timeout_ms() -> u64 {
    DEFAULTS.selfplay.eval_timeout_ms
}
pub fn max_plies() -> u32 {
    DEFAULTS.selfplay.max_plies
}
pub fn replay_capacity() -> usize {
    DEFAULTS.selfplay.replay_capacity
}
pub fn log_interval() -> u32 {
    DEFAULTS.selfplay.log_interval
}
pub fn seed() -> u64 {
    DEFAULTS.selfplay.seed
}
