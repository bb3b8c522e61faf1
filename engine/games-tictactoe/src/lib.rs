//! TicTacToe rules for the Cartridge engine
//!
//! This crate is the reference implementation of [`GameRules`]. TicTacToe
//! always has a move until the game ends, so the `Pass` sentinel exists only
//! to satisfy the contract and is never legal.
//!
//! # Usage
//!
//! ```rust
//! use engine_core::GameRules;
//! use games_tictactoe::{Action, TicTacToe};
//!
//! let game = TicTacToe::new();
//! let state = game.initial_state();
//! let next = game.result(&state, Action::Place(4)).unwrap();
//! assert_eq!(game.actions(&next).len(), 8);
//! ```

use engine_core::{GameRules, Player, RulesError};

/// Number of board cells.
pub const CELLS: usize = 9;

/// Length of the encoded state: own stones, opponent stones, legal moves, side to move.
pub const ENCODED_SIZE: usize = CELLS * 3 + 2;

/// Winning lines (rows, columns, diagonals)
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8], // rows
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8], // columns
    [0, 4, 8],
    [2, 4, 6], // diagonals
];

/// Final result of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win(Player),
    Draw,
}

/// TicTacToe game state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct State {
    /// Board cells: `None` = empty
    board: [Option<Player>; CELLS],
    /// Side to move
    to_move: Player,
    /// Set once the game has ended
    outcome: Option<Outcome>,
}

impl State {
    /// Empty board with X (`Player::First`) to move.
    pub fn new() -> Self {
        Self {
            board: [None; CELLS],
            to_move: Player::First,
            outcome: None,
        }
    }

    /// Build a position from a board string such as `"XX.OO...."`.
    ///
    /// `X` is the first player, `O` the second, anything else is empty. The
    /// side to move is derived from the stone counts. Returns `None` for
    /// strings that are not exactly nine cells long.
    pub fn from_board(cells: &str) -> Option<Self> {
        let chars: Vec<char> = cells.chars().collect();
        if chars.len() != CELLS {
            return None;
        }

        let mut board = [None; CELLS];
        for (slot, c) in board.iter_mut().zip(chars) {
            *slot = match c {
                'X' | 'x' => Some(Player::First),
                'O' | 'o' => Some(Player::Second),
                _ => None,
            };
        }

        let xs = board.iter().filter(|c| **c == Some(Player::First)).count();
        let os = board.iter().filter(|c| **c == Some(Player::Second)).count();
        let to_move = if xs > os {
            Player::Second
        } else {
            Player::First
        };

        Some(Self {
            board,
            to_move,
            outcome: Self::check_outcome(&board),
        })
    }

    /// Check if the game is over
    pub fn is_done(&self) -> bool {
        self.outcome.is_some()
    }

    /// Final result, if the game has ended
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Side to move
    pub fn to_move(&self) -> Player {
        self.to_move
    }

    /// Contents of a cell
    pub fn cell(&self, position: usize) -> Option<Player> {
        self.board.get(position).copied().flatten()
    }

    /// Empty positions, in ascending order
    pub fn empty_cells(&self) -> Vec<u8> {
        (0..CELLS as u8)
            .filter(|&pos| self.board[pos as usize].is_none())
            .collect()
    }

    fn check_outcome(board: &[Option<Player>; CELLS]) -> Option<Outcome> {
        for line in &LINES {
            let [a, b, c] = *line;
            if let Some(player) = board[a] {
                if board[b] == Some(player) && board[c] == Some(player) {
                    return Some(Outcome::Win(player));
                }
            }
        }

        if board.iter().all(Option::is_some) {
            return Some(Outcome::Draw);
        }

        None
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

/// TicTacToe action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Place a piece at the given position (0-8)
    Place(u8),
    /// No-move sentinel; never legal in TicTacToe
    Pass,
}

/// TicTacToe rules
#[derive(Debug, Clone, Copy, Default)]
pub struct TicTacToe;

impl TicTacToe {
    /// Create a new TicTacToe rule set
    pub fn new() -> Self {
        Self
    }
}

impl GameRules for TicTacToe {
    type State = State;
    type Action = Action;

    const PASS: Action = Action::Pass;

    fn name(&self) -> &'static str {
        "tictactoe"
    }

    fn action_space(&self) -> usize {
        CELLS + 1
    }

    fn encoded_size(&self) -> usize {
        ENCODED_SIZE
    }

    fn initial_state(&self) -> State {
        State::new()
    }

    fn player_to_move(&self, state: &State) -> Player {
        state.to_move
    }

    fn actions(&self, state: &State) -> Vec<Action> {
        if state.is_done() {
            return Vec::new();
        }
        let moves: Vec<Action> = state.empty_cells().into_iter().map(Action::Place).collect();
        if moves.is_empty() {
            vec![Action::Pass]
        } else {
            moves
        }
    }

    fn result(&self, state: &State, action: Action) -> Result<State, RulesError> {
        let position = match action {
            Action::Place(pos) if (pos as usize) < CELLS => pos as usize,
            _ => return Err(RulesError::illegal(action)),
        };
        if state.is_done() || state.board[position].is_some() {
            return Err(RulesError::illegal(action));
        }

        let mut next = *state;
        next.board[position] = Some(state.to_move);
        next.outcome = State::check_outcome(&next.board);
        next.to_move = state.to_move.opponent();
        Ok(next)
    }

    fn terminal_test(&self, state: &State) -> bool {
        state.is_done()
    }

    fn utility(&self, state: &State, player: Player) -> f32 {
        match state.outcome {
            Some(Outcome::Win(winner)) if winner == player => 1.0,
            Some(Outcome::Win(_)) => -1.0,
            _ => 0.0,
        }
    }

    /// Planes are relative to the side to move so one network serves both players.
    fn encode(&self, state: &State) -> Vec<f32> {
        let mut out = vec![0.0; ENCODED_SIZE];
        let me = state.to_move;

        for (i, cell) in state.board.iter().enumerate() {
            match cell {
                Some(p) if *p == me => out[i] = 1.0,
                Some(_) => out[CELLS + i] = 1.0,
                None if !state.is_done() => out[2 * CELLS + i] = 1.0,
                None => {}
            }
        }

        out[3 * CELLS + me.index()] = 1.0;
        out
    }

    fn action_index(&self, action: Action) -> usize {
        match action {
            Action::Place(pos) => pos as usize,
            Action::Pass => CELLS,
        }
    }

    fn index_action(&self, index: usize) -> Option<Action> {
        match index {
            i if i < CELLS => Some(Action::Place(i as u8)),
            CELLS => Some(Action::Pass),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests;
