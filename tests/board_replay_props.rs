//! Property tests: server-confirmed moves replayed through the session
//! machine land exactly where sequential board updates put them.

use std::env;

use connect_four_client::error::ConnectionError;
use connect_four_client::game::{Board, Cell, Player, COLS, ROWS};
use connect_four_client::protocol::{ClientMessage, GameStart, MoveMade, ServerMessage};
use connect_four_client::session::{
    submit_move, MessageSink, MoveOutcome, SessionEvent, SessionMachine, SessionState,
};
use proptest::prelude::*;

fn proptest_config() -> ProptestConfig {
    let cases = env::var("PROPTEST_CASES")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(64);

    ProptestConfig {
        cases,
        ..ProptestConfig::default()
    }
}

/// Turn column picks into the moves a server would confirm: gravity decides
/// the row, full columns are skipped, seats alternate.
fn confirmed_moves(columns: &[usize]) -> Vec<MoveMade> {
    let mut board = Board::new();
    let mut player = Player::One;
    let mut moves = Vec::new();
    for &col in columns {
        let Some(row) = board.find_lowest_empty_row(col) else {
            continue;
        };
        board.apply_move(row, col, player).unwrap();
        moves.push(MoveMade {
            player,
            col,
            row,
            next_turn: player.other(),
        });
        player = player.other();
    }
    moves
}

fn started_machine(player_number: Player) -> SessionMachine {
    let mut machine = SessionMachine::new();
    machine.handle(SessionEvent::PlayRequested);
    machine.handle(SessionEvent::TransportOpened);
    machine.handle(SessionEvent::Message(ServerMessage::GameStart(GameStart {
        game_id: "prop".to_string(),
        board: vec![vec![Cell::Empty; COLS]; ROWS],
        player_number,
        starting_player: Player::One,
        player1_name: "p1".to_string(),
        player2_name: "p2".to_string(),
    })));
    machine
}

struct CountingSink(usize);

impl MessageSink for CountingSink {
    fn send(&mut self, _message: &ClientMessage) -> Result<(), ConnectionError> {
        self.0 += 1;
        Ok(())
    }
}

proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn replay_matches_sequential_apply(columns in prop::collection::vec(0..COLS, 0..60)) {
        let moves = confirmed_moves(&columns);

        let mut expected = Board::new();
        for m in &moves {
            expected.apply_move(m.row, m.col, m.player).unwrap();
        }

        let mut machine = started_machine(Player::One);
        for m in &moves {
            let t = machine.handle(SessionEvent::Message(ServerMessage::Move(*m)));
            prop_assert!(t.anomaly.is_none());
        }

        prop_assert_eq!(machine.board(), &expected);
        prop_assert_eq!(machine.board().disc_count(), moves.len());
        if let Some(last) = moves.last() {
            prop_assert_eq!(machine.turn(), Some(last.next_turn));
        }
    }

    #[test]
    fn columns_stay_contiguous_from_bottom(columns in prop::collection::vec(0..COLS, 0..60)) {
        let mut board = Board::new();
        for m in confirmed_moves(&columns) {
            board.apply_move(m.row, m.col, m.player).unwrap();
        }

        for col in 0..COLS {
            let filled: Vec<bool> = (0..ROWS)
                .map(|row| board.get(row, col) != Some(Cell::Empty))
                .collect();
            let first = filled.iter().position(|&f| f).unwrap_or(ROWS);
            prop_assert!(filled[first..].iter().all(|&f| f));
            prop_assert_eq!(
                board.find_lowest_empty_row(col),
                first.checked_sub(1)
            );
        }
        prop_assert_eq!(Board::from_rows(&board.to_rows()).unwrap(), board);
    }

    #[test]
    fn game_over_blocks_every_column(columns in prop::collection::vec(0..COLS, 0..30)) {
        let mut machine = started_machine(Player::One);
        for m in confirmed_moves(&columns) {
            machine.handle(SessionEvent::Message(ServerMessage::Move(m)));
        }
        machine.handle(SessionEvent::Message(ServerMessage::GameOver {
            message: "done".to_string(),
            reason: None,
        }));
        prop_assert_eq!(machine.state(), SessionState::EndedNormally);

        let mut sink = CountingSink(0);
        for col in 0..COLS + 2 {
            prop_assert!(matches!(
                submit_move(&machine, &mut sink, col),
                MoveOutcome::Inactive
            ));
        }
        prop_assert_eq!(sink.0, 0);
    }
}
