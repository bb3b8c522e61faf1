//! MCTS configuration parameters.
//!
//! A config is built once, validated, and then handed to each search by
//! value. Nothing mutates it while a search is running, so concurrent
//! workers can each hold their own copy.

use crate::search::SearchError;

/// How the exploration constant `C` of the PUCT formula is obtained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Exploration {
    /// A fixed constant.
    Fixed { c_puct: f32 },

    /// Grows slowly with the parent's visit count:
    /// `C = ln((1 + N + base) / base) + init`.
    Schedule { base: f32, init: f32 },
}

impl Default for Exploration {
    fn default() -> Self {
        Exploration::Fixed { c_puct: 1.25 }
    }
}

/// Configuration for Monte Carlo Tree Search.
#[derive(Debug, Clone)]
pub struct MctsConfig {
    /// Number of simulations to run per search.
    pub num_simulations: u32,

    /// Exploration constant policy for the PUCT formula.
    pub exploration: Exploration,

    /// Gamma concentration for root noise. Each root child draws its own
    /// Gamma(noise_base, 1) sample. Set to 0.0 to disable noise entirely.
    pub noise_base: f32,

    /// Fraction of the root prior replaced by noise.
    /// 0.25 means 75% prior + 25% noise.
    pub noise_fraction: f32,

    /// Plies before which the move is sampled instead of taken greedily.
    /// 0 means always take the most visited child.
    pub sampling_threshold: u32,

    /// Scale applied to visit fractions before the softmax used for sampling.
    /// Larger values concentrate the choice on the most visited children.
    pub temperature: f32,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            num_simulations: 800,
            exploration: Exploration::default(),
            noise_base: 0.3,
            noise_fraction: 0.25,
            sampling_threshold: 30,
            temperature: 10.0,
        }
    }
}

impl MctsConfig {
    /// Create config for training (with exploration noise).
    pub fn for_training() -> Self {
        Self::default()
    }

    /// Create config for evaluation/inference (no noise, greedy selection).
    pub fn for_evaluation() -> Self {
        Self {
            noise_base: 0.0, // No noise
            noise_fraction: 0.0,
            sampling_threshold: 0, // Greedy
            ..Self::default()
        }
    }

    /// Create a fast config for testing.
    pub fn for_testing() -> Self {
        Self {
            num_simulations: 50,
            exploration: Exploration::default(),
            noise_base: 0.0,
            noise_fraction: 0.0,
            sampling_threshold: 0,
            temperature: 1.0,
        }
    }

    /// Builder pattern: set number of simulations.
    pub fn with_simulations(mut self, n: u32) -> Self {
        self.num_simulations = n;
        self
    }

    /// Builder pattern: use a fixed exploration constant.
    pub fn with_c_puct(mut self, c: f32) -> Self {
        self.exploration = Exploration::Fixed { c_puct: c };
        self
    }

    /// Builder pattern: use the visit-count schedule for the exploration constant.
    pub fn with_schedule(mut self, base: f32, init: f32) -> Self {
        self.exploration = Exploration::Schedule { base, init };
        self
    }

    /// Builder pattern: set root noise concentration and mixing fraction.
    pub fn with_noise(mut self, base: f32, fraction: f32) -> Self {
        self.noise_base = base;
        self.noise_fraction = fraction;
        self
    }

    /// Builder pattern: set the ply count below which moves are sampled.
    pub fn with_sampling_threshold(mut self, plies: u32) -> Self {
        self.sampling_threshold = plies;
        self
    }

    /// Builder pattern: set temperature.
    pub fn with_temperature(mut self, t: f32) -> Self {
        self.temperature = t;
        self
    }

    /// Whether root noise will be injected.
    pub fn noise_enabled(&self) -> bool {
        self.noise_base > 0.0 && self.noise_fraction > 0.0
    }

    /// Reject parameter combinations the search cannot run with.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.num_simulations == 0 {
            return Err(SearchError::InvalidConfig(
                "num_simulations must be at least 1".into(),
            ));
        }
        match self.exploration {
            Exploration::Fixed { c_puct } if !c_puct.is_finite() || c_puct < 0.0 => {
                return Err(SearchError::InvalidConfig(format!(
                    "c_puct must be a non-negative number, got {}",
                    c_puct
                )));
            }
            Exploration::Schedule { base, init }
                if !base.is_finite() || base <= 0.0 || !init.is_finite() =>
            {
                return Err(SearchError::InvalidConfig(format!(
                    "schedule needs base > 0 and a finite init, got base={} init={}",
                    base, init
                )));
            }
            _ => {}
        }
        if !self.noise_base.is_finite() || self.noise_base < 0.0 {
            return Err(SearchError::InvalidConfig(format!(
                "noise_base must be >= 0, got {}",
                self.noise_base
            )));
        }
        if !(0.0..=1.0).contains(&self.noise_fraction) {
            return Err(SearchError::InvalidConfig(format!(
                "noise_fraction must be within [0, 1], got {}",
                self.noise_fraction
            )));
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(SearchError::InvalidConfig(format!(
                "temperature must be >= 0, got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}
