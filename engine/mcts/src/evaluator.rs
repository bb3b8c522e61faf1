//! Evaluator trait for position evaluation.
//!
//! The evaluator provides policy (action probabilities) and value estimates
//! for encoded game states. In production this is a neural network running
//! behind the batching [`crate::service`]; for testing we provide a uniform
//! evaluator that returns equal priors.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during evaluation.
#[derive(Debug, Clone, Error)]
pub enum EvaluatorError {
    /// The evaluator went away: its channel is closed or it was told to stop.
    #[error("Evaluator unavailable: {0}")]
    Unavailable(String),

    #[error("Evaluator did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result of evaluating a game state.
#[derive(Debug, Clone)]
pub struct EvalResult {
    /// Raw policy over the dense action space.
    /// Index i corresponds to action index i; the search normalises it over
    /// the legal actions, so it need not sum to 1.
    pub policy: Vec<f32>,

    /// Value estimate for the player to move.
    /// Range: -1.0 (certain loss) to +1.0 (certain win).
    pub value: f32,
}

/// Trait for position evaluators.
///
/// Implementations could be:
/// - UniformEvaluator: Returns uniform policy (for testing)
/// - EvaluatorClient: Forwards to a batching evaluator service
/// - A neural network wrapper (outside this crate)
pub trait Evaluator: Send + Sync {
    /// Evaluate a batch of encoded states, one result per input in order.
    fn evaluate_batch(&self, inputs: &[Vec<f32>]) -> Result<Vec<EvalResult>, EvaluatorError>;

    /// Evaluate a single encoded state.
    /// Default implementation wraps it in a batch of one.
    fn evaluate(&self, input: &[f32]) -> Result<EvalResult, EvaluatorError> {
        let mut results = self.evaluate_batch(&[input.to_vec()])?;
        match (results.pop(), results.is_empty()) {
            (Some(result), true) => Ok(result),
            _ => Err(EvaluatorError::EvaluationFailed(
                "batch of one did not yield exactly one result".into(),
            )),
        }
    }
}

/// Uniform evaluator that assigns equal raw mass to every action.
/// Value is always 0.0 (neutral). Useful for testing MCTS without a model.
#[derive(Debug, Clone)]
pub struct UniformEvaluator {
    action_space: usize,
}

impl UniformEvaluator {
    pub fn new(action_space: usize) -> Self {
        Self { action_space }
    }
}

impl Evaluator for UniformEvaluator {
    fn evaluate_batch(&self, inputs: &[Vec<f32>]) -> Result<Vec<EvalResult>, EvaluatorError> {
        if self.action_space == 0 {
            return Err(EvaluatorError::InvalidInput("empty action space".into()));
        }
        let prob = 1.0 / self.action_space as f32;
        Ok(inputs
            .iter()
            .map(|_| EvalResult {
                policy: vec![prob; self.action_space],
                value: 0.0,
            })
            .collect())
    }
}
