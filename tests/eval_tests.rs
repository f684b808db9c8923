//! Evaluation invariants: symmetry, material ordering, terminal scores.

use sable::board::Board;
use sable::search::eval::{MATE_VALUE, evaluate, pesto_eval};

fn fen(f: &str) -> Board {
    Board::from_fen(f).expect("valid FEN")
}

/// Flip a FEN vertically and swap colors: the mover-relative score must
/// be identical.
fn color_mirror(fen_str: &str) -> String {
    let fields: Vec<&str> = fen_str.split_whitespace().collect();
    let placement: Vec<String> = fields[0]
        .split('/')
        .rev()
        .map(|rank| {
            rank.chars()
                .map(|c| {
                    if c.is_ascii_alphabetic() {
                        if c.is_ascii_uppercase() {
                            c.to_ascii_lowercase()
                        } else {
                            c.to_ascii_uppercase()
                        }
                    } else {
                        c
                    }
                })
                .collect()
        })
        .collect();
    let side = if fields[1] == "w" { "b" } else { "w" };
    let castling: String = if fields[2] == "-" {
        "-".to_string()
    } else {
        let mut flipped: Vec<char> = fields[2]
            .chars()
            .map(|c| {
                if c.is_ascii_uppercase() {
                    c.to_ascii_lowercase()
                } else {
                    c.to_ascii_uppercase()
                }
            })
            .collect();
        flipped.sort_by_key(|&c| match c {
            'K' => 0,
            'Q' => 1,
            'k' => 2,
            'q' => 3,
            _ => 4,
        });
        flipped.into_iter().collect()
    };
    format!(
        "{} {} {} - {} {}",
        placement.join("/"),
        side,
        castling,
        fields[4],
        fields[5]
    )
}

#[test]
fn mirrored_positions_score_identically() {
    let fens = [
        sable::board::START_FEN,
        "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 0 1",
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1",
    ];
    for f in fens {
        let original = fen(f);
        let mirrored = fen(&color_mirror(f));
        assert_eq!(
            evaluate(&original, 0),
            evaluate(&mirrored, 0),
            "eval asymmetry for {}",
            f
        );
    }
}

#[test]
fn startpos_is_exactly_balanced() {
    assert_eq!(pesto_eval(&Board::new()), 0);
}

#[test]
fn material_order_is_respected() {
    // White side has one extra piece in each position; mover-relative
    // scores must rank queen > rook > bishop, knight > pawn.
    let up = |piece_fen: &str| {
        let f = format!("4k3/8/8/8/8/8/8/{}3K3 w - - 0 1", piece_fen);
        evaluate(&fen(&f), 0)
    };
    let q = up("Q");
    let r = up("R");
    let b = up("B");
    let n = up("N");
    assert!(q > r && r > b && b > 100 && n > 100, "{q} {r} {b} {n}");
}

#[test]
fn score_magnitudes_stay_under_mate() {
    // A grotesque material edge still scores beneath the mate band.
    let b = fen("QQQQQQ1k/8/8/8/8/8/8/QQQQQQ1K w - - 0 1");
    let score = evaluate(&b, 0);
    assert!(score > 0 && score < MATE_VALUE - 1000, "{}", score);
}

#[test]
fn tempo_free_evaluation_negates_with_the_mover() {
    let w = fen("r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 0 1");
    let b = fen("r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R b KQkq - 0 1");
    assert_eq!(evaluate(&w, 0), -evaluate(&b, 0));
}
