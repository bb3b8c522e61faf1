//! In-memory replay buffer for self-play samples
//!
//! Holds the most recent training samples produced by the workers. Each
//! sample pairs an encoded position with the search's visit distribution and
//! the final game outcome from the mover's perspective. When the buffer is
//! full the oldest samples are evicted first.

use engine_core::Player;
use std::collections::VecDeque;

/// A single training position recorded during self-play
#[derive(Debug, Clone, PartialEq)]
#[allow(dead_code)] // Fields are read by training consumers, not the actor itself
pub struct TrainingSample {
    /// Game this position was recorded in (unique per run)
    pub game_id: u64,
    /// Ply at which the position occurred
    pub ply: u32,
    /// Player to move in this position
    pub player: Player,
    /// Encoded position, as produced by the game's `encode`
    pub encoded: Vec<f32>,
    /// Dense visit distribution over the action space
    pub policy: Vec<f32>,
    /// Action index that was actually played
    pub action: usize,
    /// MCTS value estimate from root
    pub mcts_value: f32,
    /// Final game outcome from this player's perspective (+1 win, -1 loss, 0 draw)
    /// This is backfilled after the game ends
    pub outcome: f32,
}

/// Bounded FIFO of training samples
#[derive(Debug)]
pub struct ReplayBuffer {
    samples: VecDeque<TrainingSample>,
    capacity: usize,
    total_added: u64,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.min(1 << 16)),
            capacity,
            total_added: 0,
        }
    }

    /// Store a batch of samples, evicting the oldest ones past capacity.
    pub fn extend<I>(&mut self, samples: I)
    where
        I: IntoIterator<Item = TrainingSample>,
    {
        for sample in samples {
            if self.capacity == 0 {
                self.total_added += 1;
                continue;
            }
            if self.samples.len() == self.capacity {
                self.samples.pop_front();
            }
            self.samples.push_back(sample);
            self.total_added += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples ever stored, including evicted ones.
    pub fn total_added(&self) -> u64 {
        self.total_added
    }

    pub fn evicted(&self) -> u64 {
        self.total_added - self.samples.len() as u64
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &TrainingSample> {
        self.samples.iter()
    }
}
