//! Game selection for the actor
//!
//! Maps the configured `env_id` onto one of the game variants compiled into
//! the binary.

use anyhow::{anyhow, Result};
use std::fmt;
use std::str::FromStr;

/// Game variants the actor can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameKind {
    TicTacToe,
    Othello,
}

impl GameKind {
    pub const ALL: [GameKind; 2] = [GameKind::TicTacToe, GameKind::Othello];

    /// Canonical environment id.
    pub fn env_id(self) -> &'static str {
        match self {
            GameKind::TicTacToe => "tictactoe",
            GameKind::Othello => "othello",
        }
    }
}

impl FromStr for GameKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "tictactoe" => Ok(GameKind::TicTacToe),
            "othello" | "reversi" => Ok(GameKind::Othello),
            _ => {
                let known: Vec<&str> = GameKind::ALL.iter().map(|g| g.env_id()).collect();
                Err(anyhow!(
                    "Unknown game '{}'. Supported games: {}",
                    s,
                    known.join(", ")
                ))
            }
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.env_id())
    }
}
