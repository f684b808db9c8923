//! Transposition table contract: keyed probes, depth-preferred
//! replacement, bound round trips.

use sable::board::Board;
use sable::moves::types::Move;
use sable::search::tt::{Bound, TranspositionTable};

fn mv(s: &str) -> Move {
    s.parse().unwrap()
}

#[test]
fn real_position_keys_round_trip() {
    let mut tt = TranspositionTable::new(4);
    let board = Board::new();
    let key = board.zobrist();

    tt.save(key, Some(mv("e2e4")), 31, 6, Bound::Exact);
    let entry = tt.probe(key).expect("entry stored");
    assert_eq!(entry.best_move, Some(mv("e2e4")));
    assert_eq!(entry.score, 31);
    assert_eq!(entry.bound, Bound::Exact);

    // A different position must not alias onto the same entry.
    let mut other = board.clone();
    other.make(mv("e2e4"));
    assert!(tt.probe(other.zobrist()).is_none());
}

#[test]
fn replacement_prefers_depth_and_clear_resets() {
    let mut tt = TranspositionTable::new(1);
    let key = 0x1234_5678_9ABC_DEF0;

    tt.save(key, Some(mv("g1f3")), 10, 8, Bound::Lower);
    tt.save(key, Some(mv("b1c3")), 99, 4, Bound::Exact);
    assert_eq!(tt.probe(key).unwrap().best_move, Some(mv("g1f3")));

    tt.save(key, Some(mv("b1c3")), 99, 8, Bound::Exact);
    assert_eq!(tt.probe(key).unwrap().best_move, Some(mv("b1c3")));

    tt.clear();
    assert!(tt.probe(key).is_none());
}

#[test]
fn all_bounds_survive_storage() {
    let mut tt = TranspositionTable::new(1);
    for (i, bound) in [Bound::Exact, Bound::Lower, Bound::Upper].into_iter().enumerate() {
        let key = 0x9999_0000 + ((i as u64) << 40);
        tt.save(key, None, -250 + i as i32, 3, bound);
        assert_eq!(tt.probe(key).unwrap().bound, bound);
    }
}
