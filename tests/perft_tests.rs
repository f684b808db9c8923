//! Legal move generation correctness via perft node counts.

use sable::board::Board;
use sable::moves::perft::{PerftCounters, perft, perft_count_with_breakdown};

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
const ENDGAME: &str = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1";

fn run(fen: &str, depth: u32, expected: u64) {
    let mut board = Board::from_fen(fen).expect("valid FEN");
    let nodes = perft(&mut board, depth);
    assert_eq!(
        nodes, expected,
        "perft({}) mismatch for {}: got {}, expected {}",
        depth, fen, nodes, expected
    );
}

#[test]
fn perft_startpos_d1() {
    run(sable::board::START_FEN, 1, 20);
}

#[test]
fn perft_startpos_d2() {
    run(sable::board::START_FEN, 2, 400);
}

#[test]
fn perft_startpos_d3() {
    run(sable::board::START_FEN, 3, 8_902);
}

#[test]
fn perft_startpos_d4() {
    run(sable::board::START_FEN, 4, 197_281);
}

#[test]
#[ignore]
fn perft_startpos_d5() {
    run(sable::board::START_FEN, 5, 4_865_609);
}

#[test]
#[ignore]
fn perft_startpos_d6() {
    run(sable::board::START_FEN, 6, 119_060_324);
}

#[test]
fn perft_kiwipete_d1() {
    run(KIWIPETE, 1, 48);
}

#[test]
fn perft_kiwipete_d2() {
    run(KIWIPETE, 2, 2_039);
}

#[test]
fn perft_kiwipete_d3() {
    run(KIWIPETE, 3, 97_862);
}

#[test]
#[ignore]
fn perft_kiwipete_d4() {
    run(KIWIPETE, 4, 4_085_603);
}

#[test]
fn perft_endgame_d1() {
    run(ENDGAME, 1, 14);
}

#[test]
fn perft_endgame_d2() {
    run(ENDGAME, 2, 191);
}

#[test]
fn perft_endgame_d3() {
    run(ENDGAME, 3, 2_812);
}

#[test]
fn perft_endgame_d4() {
    run(ENDGAME, 4, 43_238);
}

#[test]
#[ignore]
fn perft_endgame_d5() {
    run(ENDGAME, 5, 674_624);
}

// Positions exercising specific generator corners.

#[test]
fn perft_ep_discovered_pin_position() {
    // The EP capture would clear the whole fourth rank and expose the
    // king to the h4 queen, so only the push and king moves remain.
    run("8/8/8/8/k2Pp2Q/8/8/3K4 b - d3 0 1", 1, 6);
}

#[test]
fn perft_promotion_heavy_position() {
    run("n1n5/PPPk4/8/8/8/8/4Kppp/5N1N b - - 0 1", 1, 24);
    run("n1n5/PPPk4/8/8/8/8/4Kppp/5N1N b - - 0 1", 2, 496);
    run("n1n5/PPPk4/8/8/8/8/4Kppp/5N1N b - - 0 1", 3, 9_483);
}

#[test]
fn perft_castling_rights_position() {
    // Position 4 from the CPW perft suite: promotions plus castling traps.
    run(
        "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
        3,
        9_467,
    );
}

#[test]
fn breakdown_agrees_with_plain_perft() {
    let mut board = Board::from_fen(KIWIPETE).expect("valid FEN");
    let mut counters = PerftCounters::zero();
    perft_count_with_breakdown(&mut board, 2, &mut counters);
    assert_eq!(counters.nodes, 2_039);
    // Known breakdown for Kiwipete depth 2, edge-tagged cumulatively.
    assert_eq!(counters.castles, 2 + 91);
    assert_eq!(counters.ep_captures, 1);
}
