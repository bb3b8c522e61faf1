//! Configuration struct definitions.
//!
//! All config structs with serde deserialization support and default values.

use crate::defaults;
use serde::Deserialize;

// ============================================================================
// Serde default functions (required for #[serde(default = "...")])
// ============================================================================

fn d_env_id() -> String {
    defaults::env_id().into()
}
fn d_log_level() -> String {
    defaults::log_level().into()
}
fn d_num_sims() -> u32 {
    defaults::num_simulations()
}
fn d_c_puct() -> f64 {
    defaults::c_puct()
}
fn d_exploration() -> String {
    defaults::exploration().into()
}
fn d_c_puct_base() -> f64 {
    defaults::c_puct_base()
}
fn d_c_puct_init() -> f64 {
    defaults::c_puct_init()
}
fn d_noise_base() -> f64 {
    defaults::noise_base()
}
fn d_noise_fraction() -> f64 {
    defaults::noise_fraction()
}
fn d_temp_threshold() -> u32 {
    defaults::temp_threshold()
}
fn d_temperature() -> f64 {
    defaults::temperature()
}
fn d_actor_id() -> String {
    defaults::actor_id().into()
}
fn d_num_workers() -> usize {
    defaults::num_workers()
}
fn d_games_per_worker() -> i64 {
    defaults::games_per_worker()
}
fn d_eval_batch_size() -> usize {
    defaults::eval_batch_size()
}
fn d_eval_batch_wait_us() -> u64 {
    defaults::eval_batch_wait_us()
}
fn d_eval_timeout_ms() -> u64 {
    defaults::eval_timeout_ms()
}
fn d_max_plies() -> u32 {
    defaults::max_plies()
}
fn d_replay_capacity() -> usize {
    defaults::replay_capacity()
}
fn d_log_interval() -> u32 {
    defaults::log_interval()
}
fn d_seed() -> u64 {
    defaults::seed()
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Root configuration structure matching config.toml
#[derive(Debug, Deserialize, Default, Clone)]
pub struct CentralConfig {
    #[serde(default)]
    pub common: CommonConfig,
    #[serde(default)]
    pub mcts: MctsConfig,
    #[serde(default)]
    pub selfplay: SelfPlayConfig,
}

/// Common configuration shared by all components
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CommonConfig {
    #[serde(default = "d_env_id")]
    pub env_id: String,
    #[serde(default = "d_log_level")]
    pub log_level: String,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            env_id: defaults::env_id().into(),
            log_level: defaults::log_level().into(),
        }
    }
}

/// MCTS (Monte Carlo Tree Search) configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MctsConfig {
    #[serde(default = "d_num_sims")]
    pub num_simulations: u32,
    /// Fixed exploration constant, used when `exploration = "fixed"`
    #[serde(default = "d_c_puct")]
    pub c_puct: f64,
    /// `"fixed"` or `"schedule"`
    #[serde(default = "d_exploration")]
    pub exploration: String,
    #[serde(default = "d_c_puct_base")]
    pub c_puct_base: f64,
    #[serde(default = "d_c_puct_init")]
    pub c_puct_init: f64,
    /// Gamma concentration for root noise; 0 disables noise
    #[serde(default = "d_noise_base")]
    pub noise_base: f64,
    #[serde(default = "d_noise_fraction")]
    pub noise_fraction: f64,
    /// Plies played with softmax sampling before switching to argmax
    #[serde(default = "d_temp_threshold")]
    pub temp_threshold: u32,
    #[serde(default = "d_temperature")]
    pub temperature: f64,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            num_simulations: defaults::num_simulations(),
            c_puct: defaults::c_puct(),
            exploration: defaults::exploration().into(),
            c_puct_base: defaults::c_puct_base(),
            c_puct_init: defaults::c_puct_init(),
            noise_base: defaults::noise_base(),
            noise_fraction: defaults::noise_fraction(),
            temp_threshold: defaults::temp_threshold(),
            temperature: defaults::temperature(),
        }
    }
}

/// Self-play orchestration configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SelfPlayConfig {
    #[serde(default = "d_actor_id")]
    pub actor_id: String,
    /// Number of worker threads, each owning one search tree
    #[serde(default = "d_num_workers")]
    pub num_workers: usize,
    /// Games each worker plays (-1 = until stopped)
    #[serde(default = "d_games_per_worker")]
    pub games_per_worker: i64,
    /// Largest batch the evaluator service assembles
    #[serde(default = "d_eval_batch_size")]
    pub eval_batch_size: usize,
    /// How long the evaluator service waits for stragglers (microseconds)
    #[serde(default = "d_eval_batch_wait_us")]
    pub eval_batch_wait_us: u64,
    /// How long a worker waits for an evaluation (milliseconds)
    #[serde(default = "d_eval_timeout_ms")]
    pub eval_timeout_ms: u64,
    /// Games longer than this are abandoned
    #[serde(default = "d_max_plies")]
    pub max_plies: u32,
    /// Training samples kept by the coordinator
    #[serde(default = "d_replay_capacity")]
    pub replay_capacity: usize,
    #[serde(default = "d_log_interval")]
    pub log_interval: u32,
    #[serde(default = "d_seed")]
    pub seed: u64,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        Self {
            actor_id: defaults::actor_id().into(),
            num_workers: defaults::num_workers(),
            games_per_worker: defaults::games_per_worker(),
            eval_batch_size: defaults::eval_batch_size(),
            eval_batch_wait_us: defaults::eval_batch_wait_us(),
            eval_timeout_ms: defaults::eval_timeout_ms(),
            max_plies: defaults::max_plies(),
            replay_capacity: defaults::replay_capacity(),
            log_interval: defaults::log_interval(),
            seed: defaults::seed(),
        }
    }
}
