//! Core traits and types for the Cartridge game engine
//!
//! This crate provides the contract between the search engine and concrete
//! game variants:
//! - `GameRules`: capability trait every game variant implements
//! - `Player`: two-player identity used for value perspectives
//! - `RulesError`: failures raised by rule implementations
//! - `policy`: helpers that map raw evaluator output onto legal actions

pub mod player;
pub mod policy;
pub mod rules;

// Re-export main types for convenience
pub use player::Player;
pub use policy::{normalize_over_legal, visits_to_dense};
pub use rules::{GameRules, RulesError};
