//! Monte Carlo Tree Search (MCTS) implementation for AlphaZero-style game playing.
//!
//! This crate provides a game-agnostic MCTS implementation that works with any
//! game implementing the `engine-core` [`GameRules`](engine_core::GameRules) trait.
//!
//! # Overview
//!
//! MCTS is a search algorithm that builds a search tree by running simulations.
//! Each simulation consists of four phases:
//!
//! 1. **Selection**: Traverse the tree using PUCT to balance exploration and
//!    exploitation
//! 2. **Evaluation**: Score the leaf, either with the game's terminal utility
//!    or with an [`Evaluator`]
//! 3. **Expansion**: Add one child per legal action, with priors taken from
//!    the evaluator's policy normalised over the legal actions
//! 4. **Backpropagation**: Update visit counts and value estimates along the
//!    path from leaf to root, flipping sign between players
//!
//! # Usage
//!
//! ```rust,ignore
//! use engine_core::GameRules;
//! use games_tictactoe::TicTacToe;
//! use mcts::{run_mcts, MctsConfig, UniformEvaluator};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha20Rng;
//!
//! let rules = TicTacToe::new();
//! let evaluator = UniformEvaluator::new(rules.action_space());
//! let config = MctsConfig::for_testing();
//!
//! let mut rng = ChaCha20Rng::seed_from_u64(42);
//! let result = run_mcts(&rules, &evaluator, config, rules.initial_state(), 0, &mut rng)?;
//!
//! println!("Best action: {:?}", result.action);
//! println!("Policy: {:?}", result.policy);
//! println!("Value: {}", result.value);
//! ```
//!
//! # Configuration
//!
//! The [`MctsConfig`] struct controls search behavior:
//!
//! - `num_simulations`: Number of simulations per search (default: 800)
//! - `exploration`: Fixed `c_puct` (default 1.25) or a visit-count schedule
//! - `noise_base` / `noise_fraction`: Gamma noise on root priors (default: 0.3 / 0.25)
//! - `sampling_threshold` / `temperature`: Softmax sampling for the first plies,
//!   then the most visited child
//!
//! # Evaluators
//!
//! - [`UniformEvaluator`]: Returns uniform policy (for testing)
//! - [`EvaluatorClient`]: Forwards requests to a batching [`EvaluatorService`]
//!   shared by many self-play workers
//!
//! # Architecture
//!
//! ```text
//!  worker 0 ── MctsSearch ── EvaluatorClient ──┐
//!  worker 1 ── MctsSearch ── EvaluatorClient ──┼── EvaluatorService ── Evaluator
//!  worker N ── MctsSearch ── EvaluatorClient ──┘     (one thread, batches)
//!
//!  MctsSearch = MctsTree (arena) + GameRules + policy::{puct, noise, choice}
//! ```

pub mod cancel;
pub mod config;
pub mod evaluator;
pub mod node;
pub mod policy;
pub mod search;
pub mod service;
pub mod tree;

// Re-export main types
pub use cancel::StopSignal;
pub use config::{Exploration, MctsConfig};
pub use evaluator::{EvalResult, Evaluator, EvaluatorError, UniformEvaluator};
pub use node::{MctsNode, NodeId};
pub use search::{run_mcts, MctsSearch, SearchError, SearchResult, SearchStats};
pub use service::{
    EvaluatorClient, EvaluatorService, RequestToken, ServiceConfig, ServiceHandle, ServiceStats,
};
pub use tree::{MctsTree, Node, TreeStats};
