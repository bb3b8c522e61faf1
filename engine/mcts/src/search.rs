//! MCTS search implementation.
//!
//! Implements the core MCTS algorithm:
//! 1. Selection: Traverse tree using PUCT to find a leaf
//! 2. Evaluation: Terminal utility, or a value estimate from the evaluator
//! 3. Expansion: Add children to the leaf using the normalised policy
//! 4. Backpropagation: Update statistics along the path
//!
//! Each search is single-threaded. The evaluator call is the only point at
//! which a search may block.

use std::time::Instant;

use engine_core::{GameRules, RulesError};
use rand_chacha::ChaCha20Rng;
use thiserror::Error;
use tracing::{debug, trace};

use crate::cancel::StopSignal;
use crate::config::MctsConfig;
use crate::evaluator::{Evaluator, EvaluatorError};
use crate::node::NodeId;
use crate::policy::choose_index;
use crate::tree::MctsTree;

/// Errors that can occur during MCTS search.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The rules refused an action the search produced from `actions`.
    #[error("Rules error: {0}")]
    Rules(#[from] RulesError),

    #[error("Evaluator error: {0}")]
    Evaluator(#[from] EvaluatorError),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Search cancelled")]
    Cancelled,

    #[error("Evaluator returned {actual} policy entries, expected {expected}")]
    MalformedPolicy { expected: usize, actual: usize },
}

/// Statistics from a single MCTS search for profiling.
#[derive(Debug, Clone, Default)]
pub struct SearchStats {
    /// Total time spent in search (microseconds)
    pub total_time_us: u64,
    /// Time spent descending the tree (microseconds)
    pub selection_time_us: u64,
    /// Time spent waiting on the evaluator (microseconds)
    pub inference_time_us: u64,
    /// Time spent expanding nodes (microseconds)
    pub expansion_time_us: u64,
    /// Time spent in backpropagation (microseconds)
    pub backprop_time_us: u64,
    /// Number of evaluator calls
    pub total_evals: u32,
    /// Number of `GameRules::result` calls made while expanding
    pub game_steps: u32,
    /// Number of simulations that ended on a terminal node
    pub terminal_hits: u32,
    /// Deepest leaf reached by selection
    pub max_depth: u32,
}

impl SearchStats {
    /// Fold another search's stats into this one.
    pub fn merge(&mut self, other: &SearchStats) {
        self.total_time_us += other.total_time_us;
        self.selection_time_us += other.selection_time_us;
        self.inference_time_us += other.inference_time_us;
        self.expansion_time_us += other.expansion_time_us;
        self.backprop_time_us += other.backprop_time_us;
        self.total_evals += other.total_evals;
        self.game_steps += other.game_steps;
        self.terminal_hits += other.terminal_hits;
        self.max_depth = self.max_depth.max(other.max_depth);
    }
}

/// Result of an MCTS search.
#[derive(Debug, Clone)]
pub struct SearchResult<S, A> {
    /// Chosen action, or `None` when the root was terminal
    pub action: Option<A>,

    /// State after the chosen action (the root state itself when `action` is `None`)
    pub state: S,

    /// Normalised root visit counts per child, in insertion order
    pub policy: Vec<(A, f32)>,

    /// Value estimate at root, for the player to move there
    pub value: f32,

    /// Number of simulations performed
    pub simulations: u32,

    /// Profiling counters
    pub stats: SearchStats,
}

/// MCTS search state.
pub struct MctsSearch<'a, G: GameRules, E: Evaluator + ?Sized> {
    tree: MctsTree<G>,
    rules: &'a G,
    evaluator: &'a E,
    config: MctsConfig,
    stop: Option<StopSignal>,
    stats: SearchStats,
}

impl<'a, G: GameRules, E: Evaluator + ?Sized> MctsSearch<'a, G, E> {
    /// Create a new MCTS search from the given game state.
    pub fn new(
        rules: &'a G,
        evaluator: &'a E,
        config: MctsConfig,
        state: G::State,
    ) -> Result<Self, SearchError> {
        config.validate()?;
        Ok(Self {
            tree: MctsTree::new(rules, state),
            rules,
            evaluator,
            config,
            stop: None,
            stats: SearchStats::default(),
        })
    }

    /// Abort the search with [`SearchError::Cancelled`] once `stop` is raised.
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Run the search and choose a move.
    ///
    /// `ply` is the number of plies already played in the game; it decides
    /// between sampling and greedy selection.
    pub fn run(
        &mut self,
        ply: u32,
        rng: &mut ChaCha20Rng,
    ) -> Result<SearchResult<G::State, G::Action>, SearchError> {
        let start = Instant::now();
        let root_id = self.tree.root();

        if self.tree.get(root_id).terminal {
            let root = self.tree.get(root_id);
            debug!(game = self.rules.name(), "Search root is terminal");
            return Ok(SearchResult {
                action: None,
                state: root.state.clone(),
                policy: Vec::new(),
                value: self.rules.utility(&root.state, root.player),
                simulations: 0,
                stats: SearchStats::default(),
            });
        }

        // Expand the root up front so noise can reach its children
        self.check_stop()?;
        if !self.tree.get(root_id).is_expanded() {
            self.evaluate_and_expand(root_id)?;
        }

        if self.config.noise_enabled() {
            self.tree
                .add_root_noise(self.config.noise_base, self.config.noise_fraction, rng)?;
        }

        for _ in 0..self.config.num_simulations {
            self.check_stop()?;
            self.simulate()?;
        }

        let visits = self.tree.root_visits();
        let counts: Vec<u32> = visits.iter().map(|(_, v)| *v).collect();
        let chosen = choose_index(
            &counts,
            ply,
            self.config.sampling_threshold,
            self.config.temperature,
            rng,
        );

        let root = self.tree.get(root_id);
        let (action, state) = match chosen.map(|i| root.children[i]) {
            Some((action, child_id)) => (Some(action), self.tree.get(child_id).state.clone()),
            None => (None, root.state.clone()),
        };

        self.stats.total_time_us = start.elapsed().as_micros() as u64;
        let tree_stats = self.tree.stats();
        debug!(
            game = self.rules.name(),
            ply,
            simulations = root.visits,
            nodes = tree_stats.total_nodes,
            max_depth = tree_stats.max_depth,
            root_value = root.q_value,
            chosen = ?action,
            total_us = self.stats.total_time_us,
            "MCTS search complete"
        );

        Ok(SearchResult {
            action,
            state,
            policy: self.tree.root_policy(),
            value: root.q_value,
            simulations: root.visits,
            stats: self.stats.clone(),
        })
    }

    /// Run a single simulation (select -> evaluate -> expand -> backpropagate).
    fn simulate(&mut self) -> Result<(), SearchError> {
        let select_start = Instant::now();
        let (leaf_id, depth) = self.tree.select_leaf(&self.config.exploration);
        self.stats.selection_time_us += select_start.elapsed().as_micros() as u64;
        self.stats.max_depth = self.stats.max_depth.max(depth);

        let leaf = self.tree.get(leaf_id);
        let value = if leaf.terminal {
            self.stats.terminal_hits += 1;
            self.rules.utility(&leaf.state, leaf.player)
        } else {
            self.evaluate_and_expand(leaf_id)?
        };

        let backprop_start = Instant::now();
        self.tree.backpropagate(leaf_id, value);
        self.stats.backprop_time_us += backprop_start.elapsed().as_micros() as u64;

        trace!(leaf = leaf_id.0, depth, value, "MCTS simulation complete");

        Ok(())
    }

    /// Evaluate a non-terminal node and expand it with the normalised policy.
    /// Returns the evaluator's value estimate for backpropagation.
    fn evaluate_and_expand(&mut self, node_id: NodeId) -> Result<f32, SearchError> {
        let node = self.tree.get(node_id);
        let encoded = self.rules.encode(&node.state);
        let actions = self.rules.actions(&node.state);

        let eval_start = Instant::now();
        let eval = match self.evaluator.evaluate(&encoded) {
            Ok(eval) => eval,
            // Evaluator shutdown is expected once a stop was requested
            Err(_) if self.is_stopped() => return Err(SearchError::Cancelled),
            Err(e) => return Err(e.into()),
        };
        self.stats.inference_time_us += eval_start.elapsed().as_micros() as u64;
        self.stats.total_evals += 1;

        let expected = self.rules.action_space();
        if eval.policy.len() != expected {
            return Err(SearchError::MalformedPolicy {
                expected,
                actual: eval.policy.len(),
            });
        }

        let expand_start = Instant::now();
        let priors = self.rules.map_policy(&actions, &eval.policy);
        let created = self.tree.expand(self.rules, node_id, &priors)?;
        self.stats.game_steps += created as u32;
        self.stats.expansion_time_us += expand_start.elapsed().as_micros() as u64;

        Ok(eval.value)
    }

    fn is_stopped(&self) -> bool {
        self.stop.as_ref().is_some_and(StopSignal::is_stopped)
    }

    fn check_stop(&self) -> Result<(), SearchError> {
        if self.is_stopped() {
            Err(SearchError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Get the search tree (for inspection/debugging).
    pub fn tree(&self) -> &MctsTree<G> {
        &self.tree
    }

    /// Consume the search and keep its tree.
    pub fn into_tree(self) -> MctsTree<G> {
        self.tree
    }

    /// Get the search configuration.
    pub fn config(&self) -> &MctsConfig {
        &self.config
    }
}

/// Convenience function to run a single MCTS search.
pub fn run_mcts<G: GameRules, E: Evaluator + ?Sized>(
    rules: &G,
    evaluator: &E,
    config: MctsConfig,
    state: G::State,
    ply: u32,
    rng: &mut ChaCha20Rng,
) -> Result<SearchResult<G::State, G::Action>, SearchError> {
    let mut search = MctsSearch::new(rules, evaluator, config, state)?;
    search.run(ply, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{EvalResult, UniformEvaluator};
    use games_othello::Othello;
    use games_tictactoe::{Action, State, TicTacToe};
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Uniform evaluator that counts calls and can raise a stop signal.
    struct CountingEvaluator {
        inner: UniformEvaluator,
        calls: AtomicUsize,
        stop_after: Option<(usize, StopSignal)>,
    }

    impl CountingEvaluator {
        fn new(action_space: usize) -> Self {
            Self {
                inner: UniformEvaluator::new(action_space),
                calls: AtomicUsize::new(0),
                stop_after: None,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Evaluator for CountingEvaluator {
        fn evaluate_batch(&self, inputs: &[Vec<f32>]) -> Result<Vec<EvalResult>, EvaluatorError> {
            let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some((limit, stop)) = &self.stop_after {
                if calls >= *limit {
                    stop.stop();
                    return Err(EvaluatorError::Unavailable("shutting down".into()));
                }
            }
            self.inner.evaluate_batch(inputs)
        }
    }

    struct FixedEvaluator {
        policy: Vec<f32>,
        result: Result<f32, EvaluatorError>,
    }

    impl Evaluator for FixedEvaluator {
        fn evaluate_batch(&self, inputs: &[Vec<f32>]) -> Result<Vec<EvalResult>, EvaluatorError> {
            let value = self.result.clone()?;
            Ok(inputs
                .iter()
                .map(|_| EvalResult {
                    policy: self.policy.clone(),
                    value,
                })
                .collect())
        }
    }

    fn tictactoe_uniform() -> (TicTacToe, UniformEvaluator) {
        let rules = TicTacToe::new();
        let evaluator = UniformEvaluator::new(rules.action_space());
        (rules, evaluator)
    }

    #[test]
    fn test_mcts_basic_search() {
        let (rules, evaluator) = tictactoe_uniform();
        let config = MctsConfig::for_testing();

        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let result = run_mcts(
            &rules,
            &evaluator,
            config,
            rules.initial_state(),
            0,
            &mut rng,
        )
        .unwrap();

        let action = result.action.unwrap();
        assert!(rules.actions(&rules.initial_state()).contains(&action));
        assert_eq!(result.state, rules.result(&rules.initial_state(), action).unwrap());

        // Policy should sum to ~1.0
        assert_eq!(result.policy.len(), 9);
        let sum: f32 = result.policy.iter().map(|(_, p)| p).sum();
        assert!((sum - 1.0).abs() < 1e-4);

        assert_eq!(result.simulations, 50);
    }

    #[test]
    fn test_root_visits_equal_simulations() {
        let (rules, evaluator) = tictactoe_uniform();
        for sims in [1, 7, 120] {
            let config = MctsConfig::for_testing().with_simulations(sims);
            let mut search =
                MctsSearch::new(&rules, &evaluator, config, rules.initial_state()).unwrap();
            let mut rng = ChaCha20Rng::seed_from_u64(1);
            let result = search.run(0, &mut rng).unwrap();

            let tree = search.tree();
            assert_eq!(tree.get(tree.root()).visits, sims);
            assert_eq!(result.simulations, sims);
        }
    }

    #[test]
    fn test_every_simulation_evaluates_or_hits_terminal() {
        let (rules, evaluator) = tictactoe_uniform();
        let config = MctsConfig::for_testing().with_simulations(400);
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let result = run_mcts(&rules, &evaluator, config, rules.initial_state(), 0, &mut rng)
            .unwrap();

        // One extra evaluation for the root expansion
        assert_eq!(
            result.stats.total_evals + result.stats.terminal_hits,
            400 + 1
        );
        assert!(result.stats.game_steps >= 9);
        assert!(result.stats.max_depth >= 2);
    }

    #[test]
    fn test_mcts_winning_move_has_positive_value() {
        // Board setup where X can win immediately:
        // X | X | _
        // O | O | _
        // _ | _ | _
        let (rules, evaluator) = tictactoe_uniform();
        let state = State::from_board("XX.OO....").unwrap();
        let config = MctsConfig::for_testing().with_simulations(800);

        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let mut search = MctsSearch::new(&rules, &evaluator, config, state).unwrap();
        let result = search.run(0, &mut rng).unwrap();

        let tree = search.tree();
        let root = tree.get(tree.root());
        let winning_child_id = root
            .children
            .iter()
            .find(|(action, _)| *action == Action::Place(2))
            .map(|(_, id)| *id)
            .expect("Child for action 2 should exist");
        let winning_child = tree.get(winning_child_id);

        assert!(winning_child.terminal, "Position 2 should end the game");
        // Stored from O's point of view, who has just lost
        assert!((winning_child.q_value + 1.0).abs() < 1e-6);

        assert_eq!(result.action, Some(Action::Place(2)));
        assert!(
            result.value > 0.0,
            "Root value should be positive when winning move exists, got {}",
            result.value
        );

        let p2 = result
            .policy
            .iter()
            .find(|(a, _)| *a == Action::Place(2))
            .map(|(_, p)| *p)
            .unwrap();
        assert!(p2 > 0.5, "Policy should favor winning move, got {}", p2);
    }

    #[test]
    fn test_terminal_root_skips_evaluator() {
        let rules = TicTacToe::new();
        let evaluator = CountingEvaluator::new(rules.action_space());
        let state = State::from_board("XXXOO....").unwrap();

        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let result = run_mcts(
            &rules,
            &evaluator,
            MctsConfig::for_training(),
            state,
            0,
            &mut rng,
        )
        .unwrap();

        assert!(result.action.is_none());
        assert_eq!(result.state, state);
        assert!(result.policy.is_empty());
        assert_eq!(result.simulations, 0);
        // O is to move and has lost
        assert!((result.value + 1.0).abs() < 1e-6);
        assert_eq!(evaluator.calls(), 0);
    }

    #[test]
    fn test_forced_pass_is_searched() {
        let rules = Othello::new();
        let evaluator = UniformEvaluator::new(rules.action_space());
        let mut top = vec!["BW......"];
        top.extend(std::iter::repeat("........").take(7));
        let state = games_othello::State::from_rows(&top, engine_core::Player::Second).unwrap();

        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let result = run_mcts(
            &rules,
            &evaluator,
            MctsConfig::for_testing().with_simulations(20),
            state,
            0,
            &mut rng,
        )
        .unwrap();

        assert_eq!(result.action, Some(games_othello::Action::Pass));
        assert_eq!(result.policy, vec![(games_othello::Action::Pass, 1.0)]);
        assert_eq!(result.simulations, 20);
    }

    #[test]
    fn test_no_noise_is_deterministic_across_seeds() {
        let (rules, evaluator) = tictactoe_uniform();
        let config = MctsConfig::for_evaluation().with_simulations(200);

        let mut rng_a = ChaCha20Rng::seed_from_u64(1);
        let mut rng_b = ChaCha20Rng::seed_from_u64(2);
        let a = run_mcts(&rules, &evaluator, config.clone(), rules.initial_state(), 40, &mut rng_a)
            .unwrap();
        let b = run_mcts(&rules, &evaluator, config, rules.initial_state(), 40, &mut rng_b)
            .unwrap();

        assert_eq!(a.action, b.action);
        assert_eq!(a.policy, b.policy);
    }

    #[test]
    fn test_search_with_noise_and_sampling() {
        let (rules, evaluator) = tictactoe_uniform();
        let config = MctsConfig::for_training().with_simulations(100);

        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let result = run_mcts(&rules, &evaluator, config, rules.initial_state(), 0, &mut rng)
            .unwrap();

        assert!(result.action.is_some());
        let sum: f32 = result.policy.iter().map(|(_, p)| p).sum();
        assert!((sum - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_schedule_exploration_runs() {
        let (rules, evaluator) = tictactoe_uniform();
        let config = MctsConfig::for_testing().with_schedule(19652.0, 1.25);

        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let result = run_mcts(&rules, &evaluator, config, rules.initial_state(), 0, &mut rng)
            .unwrap();
        assert_eq!(result.simulations, 50);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let (rules, evaluator) = tictactoe_uniform();
        let config = MctsConfig::for_testing().with_simulations(0);
        let err = MctsSearch::new(&rules, &evaluator, config, rules.initial_state())
            .err()
            .unwrap();
        assert!(matches!(err, SearchError::InvalidConfig(_)));
    }

    #[test]
    fn test_stopped_before_start() {
        let (rules, evaluator) = tictactoe_uniform();
        let stop = StopSignal::new();
        stop.stop();

        let mut search =
            MctsSearch::new(&rules, &evaluator, MctsConfig::for_testing(), rules.initial_state())
                .unwrap()
                .with_stop_signal(stop);
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        assert!(matches!(search.run(0, &mut rng), Err(SearchError::Cancelled)));
    }

    #[test]
    fn test_stop_during_search_cancels() {
        let rules = TicTacToe::new();
        let stop = StopSignal::new();
        let evaluator = CountingEvaluator {
            stop_after: Some((10, stop.clone())),
            ..CountingEvaluator::new(rules.action_space())
        };

        let mut search = MctsSearch::new(
            &rules,
            &evaluator,
            MctsConfig::for_testing().with_simulations(500),
            rules.initial_state(),
        )
        .unwrap()
        .with_stop_signal(stop);
        let mut rng = ChaCha20Rng::seed_from_u64(42);

        assert!(matches!(search.run(0, &mut rng), Err(SearchError::Cancelled)));
        assert_eq!(evaluator.calls(), 10);
    }

    #[test]
    fn test_evaluator_failure_propagates() {
        let rules = TicTacToe::new();
        let evaluator = FixedEvaluator {
            policy: vec![0.1; 10],
            result: Err(EvaluatorError::Unavailable("channel closed".into())),
        };
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let err = run_mcts(
            &rules,
            &evaluator,
            MctsConfig::for_testing(),
            rules.initial_state(),
            0,
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SearchError::Evaluator(EvaluatorError::Unavailable(_))
        ));
    }

    #[test]
    fn test_malformed_policy_is_rejected() {
        let rules = TicTacToe::new();
        let evaluator = FixedEvaluator {
            policy: vec![0.5; 3],
            result: Ok(0.0),
        };
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let err = run_mcts(
            &rules,
            &evaluator,
            MctsConfig::for_testing(),
            rules.initial_state(),
            0,
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SearchError::MalformedPolicy {
                expected: 10,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_zero_mass_policy_falls_back_to_uniform_priors() {
        let rules = TicTacToe::new();
        let evaluator = FixedEvaluator {
            policy: vec![0.0; 10],
            result: Ok(0.0),
        };
        let config = MctsConfig::for_testing().with_simulations(1);
        let mut search = MctsSearch::new(&rules, &evaluator, config, rules.initial_state()).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        search.run(0, &mut rng).unwrap();

        let tree = search.tree();
        for (_, id) in &tree.get(tree.root()).children {
            assert!((tree.get(*id).prior - 1.0 / 9.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_stats_merge() {
        let mut total = SearchStats::default();
        let one = SearchStats {
            total_time_us: 10,
            total_evals: 3,
            max_depth: 4,
            ..SearchStats::default()
        };
        let two = SearchStats {
            total_time_us: 5,
            total_evals: 1,
            max_depth: 2,
            ..SearchStats::default()
        };
        total.merge(&one);
        total.merge(&two);
        assert_eq!(total.total_time_us, 15);
        assert_eq!(total.total_evals, 4);
        assert_eq!(total.max_depth, 4);
    }
}
