use super::*;

fn play(game: &TicTacToe, moves: &[u8]) -> State {
    moves.iter().fold(game.initial_state(), |state, &m| {
        game.result(&state, Action::Place(m)).unwrap()
    })
}

#[test]
fn test_initial_state() {
    let game = TicTacToe::new();
    let state = game.initial_state();
    assert_eq!(state.to_move(), Player::First);
    assert!(!state.is_done());
    assert_eq!(game.actions(&state).len(), 9);
}

#[test]
fn test_legal_moves_shrink() {
    let game = TicTacToe::new();
    let state = play(&game, &[4]);
    let legal = game.actions(&state);
    assert_eq!(legal.len(), 8);
    assert!(!legal.contains(&Action::Place(4)));
    assert_eq!(game.player_to_move(&state), Player::Second);
}

#[test]
fn test_occupied_cell_is_illegal() {
    let game = TicTacToe::new();
    let state = play(&game, &[4]);
    let err = game.result(&state, Action::Place(4)).unwrap_err();
    assert!(matches!(err, RulesError::IllegalAction { .. }));
}

#[test]
fn test_pass_and_out_of_range_are_illegal() {
    let game = TicTacToe::new();
    let state = game.initial_state();
    assert!(game.result(&state, Action::Pass).is_err());
    assert!(game.result(&state, Action::Place(9)).is_err());
}

#[test]
fn test_winning_game() {
    let game = TicTacToe::new();
    // X takes the top row
    let state = play(&game, &[0, 3, 1, 4, 2]);

    assert!(game.terminal_test(&state));
    assert_eq!(state.outcome(), Some(Outcome::Win(Player::First)));
    assert_eq!(game.utility(&state, Player::First), 1.0);
    assert_eq!(game.utility(&state, Player::Second), -1.0);
    assert!(game.actions(&state).is_empty());
    assert!(game.result(&state, Action::Place(5)).is_err());
}

#[test]
fn test_draw_game() {
    let game = TicTacToe::new();
    // X O X / X O O / O X X
    let state = play(&game, &[0, 1, 2, 4, 3, 5, 7, 6, 8]);

    assert!(game.terminal_test(&state));
    assert_eq!(state.outcome(), Some(Outcome::Draw));
    assert_eq!(game.utility(&state, Player::First), 0.0);
    assert_eq!(game.utility(&state, Player::Second), 0.0);
}

#[test]
fn test_from_board() {
    let state = State::from_board("XX.OO....").unwrap();
    assert_eq!(state.to_move(), Player::First);
    assert_eq!(state.cell(0), Some(Player::First));
    assert_eq!(state.cell(3), Some(Player::Second));
    assert_eq!(state.cell(2), None);
    assert!(!state.is_done());

    assert!(State::from_board("XX").is_none());
}

#[test]
fn test_encoding_is_relative_to_side_to_move() {
    let game = TicTacToe::new();
    let state = play(&game, &[4]);
    let encoded = game.encode(&state);

    assert_eq!(encoded.len(), ENCODED_SIZE);
    assert_eq!(encoded.len(), game.encoded_size());
    // O to move: X's centre stone is an opponent stone
    assert_eq!(encoded[4], 0.0);
    assert_eq!(encoded[CELLS + 4], 1.0);
    // Legal-move plane excludes the centre
    assert_eq!(encoded[2 * CELLS + 4], 0.0);
    assert_eq!(encoded[2 * CELLS], 1.0);
    // Side-to-move flags
    assert_eq!(encoded[3 * CELLS], 0.0);
    assert_eq!(encoded[3 * CELLS + 1], 1.0);
}

#[test]
fn test_action_index_round_trip() {
    let game = TicTacToe::new();
    for i in 0..game.action_space() {
        let action = game.index_action(i).unwrap();
        assert_eq!(game.action_index(action), i);
    }
    assert_eq!(game.index_action(game.action_space()), None);
    assert_eq!(game.action_index(Action::Pass), CELLS);
}

#[test]
fn test_map_policy_over_legal_moves() {
    let game = TicTacToe::new();
    let state = play(&game, &[0, 1, 2, 3, 4, 5]);
    let legal = game.actions(&state);
    assert_eq!(legal.len(), 3);

    let raw = vec![1.0; game.action_space()];
    let mapped = game.map_policy(&legal, &raw);
    let sum: f32 = mapped.iter().map(|(_, p)| p).sum();
    assert!((sum - 1.0).abs() < 1e-6);

    let dense = game.map_visits(&mapped);
    assert_eq!(dense.len(), game.action_space());
    for (i, p) in dense.iter().enumerate() {
        let is_legal = legal.contains(&game.index_action(i).unwrap());
        assert_eq!(*p > 0.0, is_legal, "index {}", i);
    }
}
