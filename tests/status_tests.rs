//! Draw and game-end detection over real move sequences.

use sable::board::Board;
use sable::moves::types::Move;
use sable::status::{GameStatus, position_status};

fn play(board: &mut Board, moves: &[&str]) {
    for m in moves {
        let mv: Move = m.parse().unwrap();
        board.make(mv);
    }
}

#[test]
fn fools_mate_is_checkmate() {
    let mut board = Board::new();
    play(&mut board, &["f2f3", "e7e5", "g2g4", "d8h4"]);
    assert_eq!(position_status(&board), GameStatus::Checkmate);
    assert!(board.is_checkmate());
    assert!(!board.is_stalemate());
}

#[test]
fn queen_smother_stalemate() {
    let board = Board::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
    assert_eq!(position_status(&board), GameStatus::Stalemate);
}

#[test]
fn shuffling_reaches_threefold_then_fivefold() {
    let mut board = Board::new();
    let cycle = ["b1c3", "b8c6", "c3b1", "c6b8"];

    play(&mut board, &cycle);
    assert_eq!(position_status(&board), GameStatus::InPlay);
    assert!(board.is_repetition(2));

    play(&mut board, &cycle);
    assert_eq!(position_status(&board), GameStatus::DrawThreefold);

    play(&mut board, &cycle);
    play(&mut board, &cycle);
    assert_eq!(position_status(&board), GameStatus::DrawFivefold);
    assert!(board.is_repetition(5));
}

#[test]
fn pawn_move_resets_the_repetition_window() {
    let mut board = Board::new();
    let cycle = ["b1c3", "b8c6", "c3b1", "c6b8"];
    play(&mut board, &cycle);
    play(&mut board, &["e2e4", "e7e5"]);
    play(&mut board, &cycle);
    // Only two occurrences of the new structure so far.
    assert_eq!(position_status(&board), GameStatus::InPlay);
    assert!(!board.is_repetition(3));
}

#[test]
fn clock_draws_respect_fide_priority() {
    let fifty = Board::from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 100 70").unwrap();
    assert_eq!(position_status(&fifty), GameStatus::DrawFiftyMove);

    let seventy_five = Board::from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 150 95").unwrap();
    assert_eq!(position_status(&seventy_five), GameStatus::DrawSeventyFiveMove);
}

#[test]
fn dead_positions_by_material_class() {
    let dead = [
        "4k3/8/8/8/8/8/8/4K3 w - - 0 1",
        "4k3/8/8/8/8/2B5/8/4K3 w - - 0 1",
        "4k3/8/8/3n4/8/8/8/4K3 w - - 0 1",
        "4k3/8/8/8/8/8/8/1N2KN2 b - - 0 1",
        "2b1k3/8/8/8/8/2B5/8/4K3 w - - 0 1",
    ];
    for f in dead {
        let board = Board::from_fen(f).unwrap();
        assert!(board.is_insufficient_material(), "{}", f);
        assert_eq!(position_status(&board), GameStatus::DrawDeadPosition, "{}", f);
    }

    let alive = [
        "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1",
        "4k3/8/8/8/8/8/8/2BB1K2 w - - 0 1",
        "4k3/8/8/8/8/8/8/1NB1K3 w - - 0 1",
        "4k3/8/8/8/8/8/8/R3K3 w - - 0 1",
    ];
    for f in alive {
        let board = Board::from_fen(f).unwrap();
        assert!(!board.is_insufficient_material(), "{}", f);
    }
}
