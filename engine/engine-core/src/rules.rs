//! The `GameRules` capability trait.
//!
//! Every game variant the search can play implements this trait. The search
//! engine treats states and actions as opaque values and only ever talks to
//! the game through these operations. Variants are chosen at composition
//! time through generics; nothing downcasts or inspects concrete types.

use std::fmt::Debug;
use std::hash::Hash;

use crate::player::Player;
use crate::policy::{normalize_over_legal, visits_to_dense};

/// Errors raised by rule implementations.
#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    /// `result` was asked to apply an action outside `actions(state)`.
    /// This means the caller and the rules disagree about the position.
    #[error("Illegal action: {action}")]
    IllegalAction { action: String },

    /// A dense index does not correspond to any action of this game.
    #[error("Unknown action index: {0}")]
    UnknownAction(usize),
}

impl RulesError {
    /// Build an `IllegalAction` error from any debuggable action.
    pub fn illegal<A: Debug>(action: A) -> Self {
        RulesError::IllegalAction {
            action: format!("{:?}", action),
        }
    }
}

/// Rules of a two-player, alternating, zero-sum game.
///
/// # Contract
///
/// * `actions` never returns an empty list for a non-terminal state. When the
///   side to move has no move it returns `[Self::PASS]`, which keeps "must
///   pass" distinct from a malformed state.
/// * `result` is pure and deterministic and rejects anything not in
///   `actions(state)` with [`RulesError::IllegalAction`].
/// * `utility` is only meaningful when `terminal_test` holds and returns
///   -1.0, 0.0 or 1.0 from the point of view of `player`.
/// * `action_index` maps every action (including `PASS`) into
///   `0..action_space()`, and `index_action` inverts it.
pub trait GameRules: Send + Sync + Debug + 'static {
    /// Game state, owned exclusively by the search node that holds it.
    type State: Clone + Send + Debug + 'static;

    /// A move. Small and copyable so it can key the child lists.
    type Action: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    /// Sentinel "no move" action.
    const PASS: Self::Action;

    /// Short identifier, e.g. `"tictactoe"`.
    fn name(&self) -> &'static str;

    /// Size of the dense action space (policy tensor length).
    fn action_space(&self) -> usize;

    /// Length of the vector returned by [`GameRules::encode`].
    fn encoded_size(&self) -> usize;

    /// Starting position.
    fn initial_state(&self) -> Self::State;

    /// Side to move in `state`.
    fn player_to_move(&self, state: &Self::State) -> Player;

    /// Legal actions in `state`.
    fn actions(&self, state: &Self::State) -> Vec<Self::Action>;

    /// Successor of `state` after `action`.
    fn result(&self, state: &Self::State, action: Self::Action) -> Result<Self::State, RulesError>;

    /// Whether the game is over.
    fn terminal_test(&self, state: &Self::State) -> bool;

    /// Final outcome for `player`: 1.0 win, 0.0 draw, -1.0 loss.
    fn utility(&self, state: &Self::State, player: Player) -> f32;

    /// Fixed-shape numeric encoding of `state` for the evaluator.
    fn encode(&self, state: &Self::State) -> Vec<f32>;

    /// Dense index of `action`.
    fn action_index(&self, action: Self::Action) -> usize;

    /// Action at dense index `index`, if any.
    fn index_action(&self, index: usize) -> Option<Self::Action>;

    /// Normalise raw evaluator output over `actions`.
    ///
    /// Sums to 1 whenever `actions` is non-empty; falls back to a uniform
    /// distribution when the legal entries carry no usable mass.
    fn map_policy(&self, actions: &[Self::Action], raw: &[f32]) -> Vec<(Self::Action, f32)> {
        normalize_over_legal(actions, raw, |a| self.action_index(a))
    }

    /// Dense training target for a per-action distribution.
    fn map_visits(&self, distribution: &[(Self::Action, f32)]) -> Vec<f32> {
        visits_to_dense(distribution, self.action_space(), |a| self.action_index(a))
    }
}
