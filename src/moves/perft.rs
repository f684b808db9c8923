//! Perft: exhaustive legal-move tree counts for generator validation.

use crate::board::Board;
use crate::moves::movegen::{collect_legal, legal_moves};
use crate::moves::square_control::in_check;
use crate::moves::types::{Move, MoveKind};
use tracing::{debug, instrument};

const MAX_PERFT_DEPTH: usize = 20;

pub struct PerftCounters {
    pub nodes: u64,
    pub captures: u64,
    pub ep_captures: u64,
    pub castles: u64,
    pub promotions: u64,
    pub checks: u64,
    pub checkmates: u64,
}

impl PerftCounters {
    pub fn zero() -> Self {
        Self {
            nodes: 0,
            captures: 0,
            ep_captures: 0,
            castles: 0,
            promotions: 0,
            checks: 0,
            checkmates: 0,
        }
    }

    pub fn add(&mut self, o: &PerftCounters) {
        self.nodes += o.nodes;
        self.captures += o.captures;
        self.ep_captures += o.ep_captures;
        self.castles += o.castles;
        self.promotions += o.promotions;
        self.checks += o.checks;
        self.checkmates += o.checkmates;
    }
}

fn create_move_buffers() -> [Vec<Move>; MAX_PERFT_DEPTH] {
    std::array::from_fn(|_| Vec::with_capacity(64))
}

fn perft_recursive(
    board: &mut Board,
    depth: u32,
    ply: usize,
    buffers: &mut [Vec<Move>],
) -> u64 {
    if depth == 0 {
        return 1;
    }
    if depth == 1 {
        return legal_moves(board).count() as u64;
    }

    {
        let moves = &mut buffers[ply];
        collect_legal(board, moves);
    }

    let move_count = buffers[ply].len();
    let mut nodes = 0;

    for i in 0..move_count {
        let mv = buffers[ply][i];

        #[cfg(debug_assertions)]
        let z0 = board.zobrist;

        board.make(mv);
        nodes += perft_recursive(board, depth - 1, ply + 1, buffers);
        board.unmake();

        #[cfg(debug_assertions)]
        debug_assert_eq!(board.zobrist, z0, "zobrist changed across make/unmake");
    }

    nodes
}

#[instrument(skip(board), fields(depth))]
pub fn perft(board: &mut Board, depth: u32) -> u64 {
    assert!(
        depth as usize <= MAX_PERFT_DEPTH,
        "depth {} exceeds MAX_PERFT_DEPTH {}",
        depth,
        MAX_PERFT_DEPTH
    );

    let mut buffers = create_move_buffers();
    perft_recursive(board, depth, 0, &mut buffers)
}

/// Per-root-move node counts, printed in the usual `divide` format.
#[instrument(skip(board), fields(depth))]
pub fn perft_divide(board: &mut Board, depth: u32) -> u64 {
    assert!(depth >= 1 && depth as usize <= MAX_PERFT_DEPTH);

    let mut buffers = create_move_buffers();
    let mut roots = Vec::with_capacity(64);
    collect_legal(board, &mut roots);

    let mut total = 0;
    for mv in roots {
        board.make(mv);
        let count = perft_recursive(board, depth - 1, 1, &mut buffers);
        board.unmake();

        debug!(%mv, nodes = count, "divide: root child total");
        println!("{}: {}", mv, count);
        total += count;
    }

    println!("Total: {}", total);
    total
}

fn perft_count_recursive(board: &mut Board, depth: u32, out: &mut PerftCounters) {
    if depth == 0 {
        out.nodes += 1;
        if in_check(board, board.side_to_move) {
            out.checks += 1;
            if !crate::moves::movegen::has_legal_move(board) {
                out.checkmates += 1;
            }
        }
        return;
    }

    let moves: Vec<(Move, MoveKind)> = legal_moves(board).collect();
    for (mv, kind) in moves {
        match kind {
            MoveKind::Capture => out.captures += 1,
            MoveKind::Promotion => out.promotions += 1,
            _ => {}
        }
        if board.en_passant == Some(mv.to) && board.pieces(crate::board::Piece::Pawn, board.side_to_move) & mv.from.bb() != 0 {
            out.ep_captures += 1;
        }
        if board.kings & mv.from.bb() != 0 && (mv.to.file() as i16 - mv.from.file() as i16).abs() == 2 {
            out.castles += 1;
        }

        board.make(mv);
        perft_count_recursive(board, depth - 1, out);
        board.unmake();
    }
}

/// Perft with a breakdown of move classes along the way.
pub fn perft_count_with_breakdown(board: &mut Board, depth: u32, out: &mut PerftCounters) {
    assert!(depth as usize <= MAX_PERFT_DEPTH);
    perft_count_recursive(board, depth, out);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_shallow_counts() {
        let mut board = Board::new();
        assert_eq!(perft(&mut board, 1), 20);
        assert_eq!(perft(&mut board, 2), 400);
    }

    #[test]
    fn breakdown_counts_startpos_depth_three() {
        let mut board = Board::new();
        let mut counters = PerftCounters::zero();
        perft_count_with_breakdown(&mut board, 3, &mut counters);
        assert_eq!(counters.nodes, 8_902);
        assert_eq!(counters.captures, 34);
        assert_eq!(counters.checks, 12);
        assert_eq!(counters.checkmates, 0);
    }
}
