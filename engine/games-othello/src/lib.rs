//! Othello (Reversi) rules for the Cartridge engine
//!
//! Standard 8x8 Othello. Black (`Player::First`) moves first. A player with
//! no flipping placement must pass, which surfaces through the contract as
//! `actions == [Action::Pass]`. The game ends when neither side can place a
//! disc; the side with more discs wins.

use engine_core::{GameRules, Player, RulesError};

/// Board side length.
pub const SIZE: usize = 8;

/// Number of squares.
pub const SQUARES: usize = SIZE * SIZE;

/// Length of the encoded state: own discs, opponent discs, legal moves.
pub const ENCODED_SIZE: usize = SQUARES * 3;

const DIRECTIONS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Othello position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct State {
    board: [Option<Player>; SQUARES],
    to_move: Player,
}

impl State {
    /// Standard opening: four discs in the centre, Black to move.
    pub fn new() -> Self {
        let mut board = [None; SQUARES];
        board[index(3, 3)] = Some(Player::Second);
        board[index(4, 4)] = Some(Player::Second);
        board[index(3, 4)] = Some(Player::First);
        board[index(4, 3)] = Some(Player::First);
        Self {
            board,
            to_move: Player::First,
        }
    }

    /// Build a position from eight rows of eight characters.
    ///
    /// `B`/`X` is Black (first player), `W`/`O` is White, anything else is
    /// empty. Returns `None` if the shape is wrong.
    pub fn from_rows(rows: &[&str], to_move: Player) -> Option<Self> {
        if rows.len() != SIZE {
            return None;
        }
        let mut board = [None; SQUARES];
        for (r, row) in rows.iter().enumerate() {
            let cells: Vec<char> = row.chars().collect();
            if cells.len() != SIZE {
                return None;
            }
            for (c, ch) in cells.into_iter().enumerate() {
                board[index(r, c)] = match ch {
                    'B' | 'X' => Some(Player::First),
                    'W' | 'O' => Some(Player::Second),
                    _ => None,
                };
            }
        }
        Some(Self { board, to_move })
    }

    /// Side to move
    pub fn to_move(&self) -> Player {
        self.to_move
    }

    /// Contents of a square
    pub fn square(&self, row: usize, col: usize) -> Option<Player> {
        if row < SIZE && col < SIZE {
            self.board[index(row, col)]
        } else {
            None
        }
    }

    /// Number of discs owned by `player`
    pub fn count(&self, player: Player) -> usize {
        self.board.iter().filter(|s| **s == Some(player)).count()
    }

    /// Squares where `player` could place a disc, ascending.
    pub fn placements(&self, player: Player) -> Vec<u8> {
        (0..SQUARES)
            .filter(|&sq| self.board[sq].is_none() && !self.flips(sq, player).is_empty())
            .map(|sq| sq as u8)
            .collect()
    }

    fn has_placement(&self, player: Player) -> bool {
        (0..SQUARES).any(|sq| self.board[sq].is_none() && !self.flips(sq, player).is_empty())
    }

    /// Whether neither side can place a disc.
    pub fn is_over(&self) -> bool {
        !self.has_placement(self.to_move) && !self.has_placement(self.to_move.opponent())
    }

    /// Opponent discs flipped by `player` placing on `square`.
    fn flips(&self, square: usize, player: Player) -> Vec<usize> {
        let row = (square / SIZE) as isize;
        let col = (square % SIZE) as isize;
        let mut flipped = Vec::new();

        for (dr, dc) in DIRECTIONS {
            let mut run = Vec::new();
            let (mut r, mut c) = (row + dr, col + dc);
            while on_board(r, c) {
                match self.board[index(r as usize, c as usize)] {
                    Some(p) if p != player => run.push(index(r as usize, c as usize)),
                    Some(_) => {
                        flipped.extend_from_slice(&run);
                        break;
                    }
                    None => break,
                }
                r += dr;
                c += dc;
            }
        }

        flipped
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn index(row: usize, col: usize) -> usize {
    row * SIZE + col
}

#[inline]
fn on_board(row: isize, col: isize) -> bool {
    (0..SIZE as isize).contains(&row) && (0..SIZE as isize).contains(&col)
}

/// Othello action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Place a disc on a square (row-major, 0-63)
    Place(u8),
    /// Forced pass when no placement flips anything
    Pass,
}

/// Othello rules
#[derive(Debug, Clone, Copy, Default)]
pub struct Othello;

impl Othello {
    pub fn new() -> Self {
        Self
    }
}

impl GameRules for Othello {
    type State = State;
    type Action = Action;

    const PASS: Action = Action::Pass;

    fn name(&self) -> &'static str {
        "othello"
    }

    fn action_space(&self) -> usize {
        SQUARES + 1
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
        let placements = state.placements(state.to_move);
        if !placements.is_empty() {
            return placements.into_iter().map(Action::Place).collect();
        }
        if state.has_placement(state.to_move.opponent()) {
            vec![Action::Pass]
        } else {
            Vec::new()
        }
    }

    fn result(&self, state: &State, action: Action) -> Result<State, RulesError> {
        let mut next = *state;
        match action {
            Action::Pass => {
                if state.has_placement(state.to_move) || state.is_over() {
                    return Err(RulesError::illegal(action));
                }
            }
            Action::Place(sq) => {
                let sq = sq as usize;
                if sq >= SQUARES || state.board[sq].is_some() {
                    return Err(RulesError::illegal(action));
                }
                let flipped = state.flips(sq, state.to_move);
                if flipped.is_empty() {
                    return Err(RulesError::illegal(action));
                }
                next.board[sq] = Some(state.to_move);
                for f in flipped {
                    next.board[f] = Some(state.to_move);
                }
            }
        }
        next.to_move = state.to_move.opponent();
        Ok(next)
    }

    fn terminal_test(&self, state: &State) -> bool {
        state.is_over()
    }

    fn utility(&self, state: &State, player: Player) -> f32 {
        let mine = state.count(player);
        let theirs = state.count(player.opponent());
        match mine.cmp(&theirs) {
            std::cmp::Ordering::Greater => 1.0,
            std::cmp::Ordering::Less => -1.0,
            std::cmp::Ordering::Equal => 0.0,
        }
    }

    fn encode(&self, state: &State) -> Vec<f32> {
        let mut out = vec![0.0; ENCODED_SIZE];
        let me = state.to_move;
        for (sq, disc) in state.board.iter().enumerate() {
            match disc {
                Some(p) if *p == me => out[sq] = 1.0,
                Some(_) => out[SQUARES + sq] = 1.0,
                None => {}
            }
        }
        for sq in state.placements(me) {
            out[2 * SQUARES + sq as usize] = 1.0;
        }
        out
    }

    fn action_index(&self, action: Action) -> usize {
        match action {
            Action::Place(sq) => sq as usize,
            Action::Pass => SQUARES,
        }
    }

    fn index_action(&self, index: usize) -> Option<Action> {
        match index {
            i if i < SQUARES => Some(Action::Place(i as u8)),
            SQUARES => Some(Action::Pass),
            _ => None,
        }
    }
}
