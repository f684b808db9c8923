//! The staged generator and the search-side ordering wrapper.

use sable::board::Board;
use sable::moves::movegen::{legal_moves, tactical_moves};
use sable::moves::types::{Move, MoveKind};
use sable::search::context::HistoryTable;
use sable::search::ordering::OrderedMoves;
use std::collections::HashSet;

const FENS: &[&str] = &[
    sable::board::START_FEN,
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "n1n5/PPPk4/8/8/8/8/4Kppp/5N1N b - - 0 1",
    "4k3/8/8/8/8/8/8/K3R3 b - - 0 1",
];

fn fen(f: &str) -> Board {
    Board::from_fen(f).expect("valid FEN")
}

#[test]
fn kinds_come_out_in_stage_order_when_not_in_check() {
    let board = fen(FENS[1]);
    let rank = |k: MoveKind| match k {
        MoveKind::Capture | MoveKind::Promotion => 0,
        MoveKind::Check => 1,
        MoveKind::Other => 2,
        MoveKind::Custom => unreachable!("generator never yields Custom"),
    };
    let kinds: Vec<MoveKind> = legal_moves(&board).map(|(_, k)| k).collect();
    let mut last = 0;
    for k in kinds {
        let r = rank(k);
        assert!(r >= last, "stage order violated at {:?}", k);
        last = r;
    }
}

#[test]
fn wrapper_covers_the_generator_for_every_position() {
    let history: HistoryTable = [[[0; 64]; 64]; 2];
    for f in FENS {
        let board = fen(f);
        let expected: HashSet<Move> = legal_moves(&board).map(|(m, _)| m).collect();

        let mut ordered = OrderedMoves::new(&board, None, None, [None, None]);
        let mut seen = HashSet::new();
        while let Some((mv, _)) = ordered.next(&board, &history) {
            assert!(seen.insert(mv), "{} yielded twice in {}", mv, f);
        }
        assert_eq!(seen, expected, "coverage mismatch in {}", f);
    }
}

#[test]
fn injected_moves_lead_and_are_not_repeated() {
    let history: HistoryTable = [[[0; 64]; 64]; 2];
    let board = fen(FENS[1]);

    let tt_move: Move = "e5g6".parse().unwrap();
    let pv_move: Move = "d5e6".parse().unwrap();
    let killer: Move = "a2a3".parse().unwrap();

    let mut ordered = OrderedMoves::new(&board, Some(tt_move), Some(pv_move), [Some(killer), None]);
    let mut picked = Vec::new();
    while let Some(item) = ordered.next(&board, &history) {
        picked.push(item);
    }

    assert_eq!(picked[0], (tt_move, MoveKind::Custom));
    assert_eq!(picked[1], (pv_move, MoveKind::Custom));
    assert_eq!(picked[2], (killer, MoveKind::Custom));

    let mut counts = std::collections::HashMap::new();
    for (mv, _) in &picked {
        *counts.entry(*mv).or_insert(0) += 1;
    }
    assert!(counts.values().all(|&c| c == 1));
}

#[test]
fn tactical_stream_matches_the_tagged_subset() {
    for f in FENS {
        let board = fen(f);
        let in_check = board.is_check();
        let full: Vec<(Move, MoveKind)> = legal_moves(&board).collect();
        let tactical: HashSet<Move> = tactical_moves(&board).map(|(m, _)| m).collect();

        for (mv, kind) in full {
            let expected = in_check || kind != MoveKind::Other;
            assert_eq!(
                tactical.contains(&mv),
                expected,
                "{} ({:?}) in {}",
                mv,
                kind,
                f
            );
        }
    }
}
