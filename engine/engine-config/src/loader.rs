//! Configuration loading logic.
//!
//! Finds a config file, deserializes it over the built-in defaults and then
//! applies `CARTRIDGE_<SECTION>_<KEY>` environment overrides.

use crate::CentralConfig;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "CARTRIDGE_CONFIG";

/// Standard locations to search for config.toml
pub const CONFIG_SEARCH_PATHS: &[&str] = &[
    "config.toml",      // Current directory
    "../config.toml",   // Parent directory (when running from subdirectory)
    "/app/config.toml", // Docker container
];

/// First config file that exists: `CARTRIDGE_CONFIG`, then
/// [`CONFIG_SEARCH_PATHS`] in order.
pub fn find_config_path() -> Option<PathBuf> {
    if let Ok(explicit) = std::env::var(CONFIG_ENV_VAR) {
        let path = PathBuf::from(&explicit);
        if path.exists() {
            return Some(path);
        }
        warn!(path = %explicit, "{} points at a missing file, searching defaults", CONFIG_ENV_VAR);
    }

    CONFIG_SEARCH_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}

/// Load the central configuration.
///
/// Falls back to the built-in defaults when no file is found. Environment
/// overrides are applied either way.
pub fn load_config() -> CentralConfig {
    match find_config_path() {
        Some(path) => {
            info!(path = %path.display(), "Loading config");
            load_from_path(&path)
        }
        None => {
            debug!("No config.toml found, using built-in defaults");
            apply_env_overrides(CentralConfig::default())
        }
    }
}

/// Load configuration from a specific path.
///
/// Unreadable or unparsable files fall back to the built-in defaults.
pub fn load_from_path(path: &Path) -> CentralConfig {
    let parsed = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|content| toml::from_str::<CentralConfig>(&content).map_err(|e| e.to_string()));

    match parsed {
        Ok(config) => apply_env_overrides(config),
        Err(e) => {
            warn!(path = %path.display(), "Unusable config file, using defaults: {}", e);
            apply_env_overrides(CentralConfig::default())
        }
    }
}

/// Parse an environment override, ignoring (and reporting) bad values.
fn env_value<T>(key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, value = %raw, "Ignoring invalid override: {}", e);
            None
        }
    }
}

/// Assign each `field` of `config.section` from `CARTRIDGE_<KEY>` when set.
macro_rules! env_override {
    ($config:ident . $section:ident, { $($field:ident => $key:literal),+ $(,)? }) => {
        $(
            if let Some(value) = env_value(concat!("CARTRIDGE_", $key)) {
                $config.$section.$field = value;
            }
        )+
    };
}

/// Apply environment variable overrides to a configuration.
///
/// Environment variables follow the pattern: CARTRIDGE_<SECTION>_<KEY>
pub fn apply_env_overrides(mut config: CentralConfig) -> CentralConfig {
    env_override!(config.common, {
        env_id => "COMMON_ENV_ID",
        log_level => "COMMON_LOG_LEVEL",
    });

    env_override!(config.mcts, {
        num_simulations => "MCTS_NUM_SIMULATIONS",
        c_puct => "MCTS_C_PUCT",
        exploration => "MCTS_EXPLORATION",
        c_puct_base => "MCTS_C_PUCT_BASE",
        c_puct_init => "MCTS_C_PUCT_INIT",
        noise_base => "MCTS_NOISE_BASE",
        noise_fraction => "MCTS_NOISE_FRACTION",
        temp_threshold => "MCTS_TEMP_THRESHOLD",
        temperature => "MCTS_TEMPERATURE",
    });

    env_override!(config.selfplay, {
        actor_id => "SELFPLAY_ACTOR_ID",
        num_workers => "SELFPLAY_NUM_WORKERS",
        games_per_worker => "SELFPLAY_GAMES_PER_WORKER",
        eval_batch_size => "SELFPLAY_EVAL_BATCH_SIZE",
        eval_batch_wait_us => "SELFPLAY_EVAL_BATCH_WAIT_US",
        eval_timeout_ms => "SELFPLAY_EVAL_TIMEOUT_MS",
        max_plies => "SELFPLAY_MAX_PLIES",
        replay_capacity => "SELFPLAY_REPLAY_CAPACITY",
        log_interval => "SELFPLAY_LOG_INTERVAL",
        seed => "SELFPLAY_SEED",
    });

    config
}
