//! Centralized configuration loading from config.toml.
//!
//! This crate provides the configuration structs and loading logic shared
//! by the Rust components (search engine presets and the self-play actor).
//!
//! # Configuration Priority
//!
//! Settings are loaded with the following priority (highest to lowest):
//! 1. Environment variables (`CARTRIDGE_<SECTION>_<KEY>`)
//! 2. config.toml file
//! 3. Built-in defaults (`config.defaults.toml`, embedded at compile time)
//!
//! # Environment Variable Override Pattern
//!
//! ```text
//! CARTRIDGE_<SECTION>_<KEY>=value
//!
//! Examples:
//!     CARTRIDGE_COMMON_ENV_ID=othello
//!     CARTRIDGE_MCTS_NUM_SIMULATIONS=200
//!     CARTRIDGE_MCTS_EXPLORATION=schedule
//!     CARTRIDGE_SELFPLAY_NUM_WORKERS=8
//! ```

mod defaults;
mod loader;
mod structs;

pub use defaults::*;
pub use loader::{
    apply_env_overrides, find_config_path, load_config, load_from_path, CONFIG_ENV_VAR,
    CONFIG_SEARCH_PATHS,
};
pub use structs::*;
