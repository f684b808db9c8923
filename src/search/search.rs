//! Iterative deepening, principal-variation search, and quiescence.
//!
//! The driver deepens one ply at a time and reports each completed depth
//! through the caller's info sink. Cancellation and time limits are
//! observed only between iterations: depth 1 always completes, so a best
//! move always exists for any position with a legal reply.

use crate::board::{Board, Color};
use crate::moves::types::{Move, MoveKind};
use crate::search::context::{MAX_PLY, PvTable, SearchTables};
use crate::search::eval::{MATE_VALUE, evaluate};
use crate::search::ordering::OrderedMoves;
use crate::search::tt::{Bound, TranspositionTable};
use crate::moves::square_control::in_check;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

pub const INF: i32 = MATE_VALUE + MAX_PLY as i32 + 1;
/// Scores beyond this are mate-in-N; they get ply-adjusted through the TT.
pub const MATE_THRESHOLD: i32 = MATE_VALUE - 1000;

// Tuning knobs. Numeric changes only; the shape of the search is fixed.
const NMP_DEPTH: i32 = 3;
const NMP_REDUCTION: i32 = 2;
const LMR_DEPTH: i32 = 3;
const MAX_Q_DEPTH: u32 = 100;
const DEFAULT_TT_MB: usize = 64;

// Delta pruning in quiescence; compiled out by default.
const DELTA_PRUNING: bool = false;
const DELTA_MARGIN: i32 = 200;

/// Mate scores are stored relative to the probing node, not the root.
fn score_to_tt(score: i32, ply: i32) -> i32 {
    if score >= MATE_THRESHOLD {
        score + ply
    } else if score <= -MATE_THRESHOLD {
        score - ply
    } else {
        score
    }
}

fn score_from_tt(score: i32, ply: i32) -> i32 {
    if score >= MATE_THRESHOLD {
        score - ply
    } else if score <= -MATE_THRESHOLD {
        score + ply
    } else {
        score
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchLimits {
    /// Deepening stops after this many plies (clamped to the PV table).
    pub max_depth: u32,
    /// Wall-clock budget; checked at iteration boundaries.
    pub max_movetime: Option<Duration>,
    /// When low on time, skip a depth predicted to blow the budget.
    pub strict_time: bool,
}

impl SearchLimits {
    pub fn depth(depth: u32) -> Self {
        SearchLimits {
            max_depth: depth,
            max_movetime: None,
            strict_time: false,
        }
    }

    pub fn movetime(budget: Duration, strict: bool) -> Self {
        SearchLimits {
            max_depth: 64,
            max_movetime: Some(budget),
            strict_time: strict,
        }
    }
}

/// One record per completed deepening iteration.
#[derive(Debug, Clone)]
pub struct SearchInfo {
    pub depth: u32,
    /// Centipawns, white-positive regardless of the side to move.
    pub score_cp: i32,
    pub nodes: u64,
    pub nps: u64,
    pub time_ms: u64,
    pub pv: Vec<Move>,
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Side-to-move perspective, as the recursion produced it.
    pub score: i32,
    pub best_move: Option<Move>,
}

pub struct Searcher {
    tt: TranspositionTable,
    tables: SearchTables,
    pv: PvTable,
    prev_pv: Vec<Move>,
    /// Piece-layout keys of externally reached positions; searching into
    /// one of them scores as a draw.
    pos_history: HashSet<u64>,
    cancel: Arc<AtomicBool>,
    nodes: u64,
    qnodes: u64,
}

impl Default for Searcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Searcher {
    pub fn new() -> Self {
        Self::with_cancel(Arc::new(AtomicBool::new(false)))
    }

    pub fn with_cancel(cancel: Arc<AtomicBool>) -> Self {
        Searcher {
            tt: TranspositionTable::new(DEFAULT_TT_MB),
            tables: SearchTables::new(),
            pv: PvTable::new(),
            prev_pv: Vec::new(),
            pos_history: HashSet::new(),
            cancel,
            nodes: 0,
            qnodes: 0,
        }
    }

    /// Shared flag the UCI layer flips to stop the search; observed only
    /// between deepening iterations.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Replaces the externally seeded repetition-avoidance set.
    pub fn set_position_history(&mut self, keys: HashSet<u64>) {
        self.pos_history = keys;
    }

    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    /// Iterative-deepening driver. Emits one info record per completed
    /// depth and returns the last completed depth's score and move.
    pub fn search(
        &mut self,
        board: &mut Board,
        limits: &SearchLimits,
        on_depth: &mut dyn FnMut(SearchInfo),
    ) -> SearchResult {
        let start = Instant::now();
        let max_depth = limits.max_depth.clamp(1, 64);

        self.nodes = 0;
        self.qnodes = 0;
        self.prev_pv.clear();
        self.pos_history.insert(board.piece_state_key());

        let mut result = SearchResult {
            score: 0,
            best_move: None,
        };

        for depth in 1..=max_depth {
            let depth_start = Instant::now();
            let prev_pv = std::mem::take(&mut self.prev_pv);

            let score = self.pvs(board, depth as i32, -INF, INF, true, 0, true, &prev_pv);

            let depth_time = depth_start.elapsed();
            let elapsed = start.elapsed();

            let pv_line = self.pv.line();
            if let Some(&first) = pv_line.first() {
                result.best_move = Some(first);
            }
            result.score = score;
            self.prev_pv = pv_line.clone();

            let time_ms = elapsed.as_millis() as u64;
            let white_score = match board.side_to_move {
                Color::White => score,
                Color::Black => -score,
            };
            on_depth(SearchInfo {
                depth,
                score_cp: white_score,
                nodes: self.nodes,
                nps: self.nodes * 1000 / time_ms.max(1),
                time_ms,
                pv: pv_line,
            });

            // Stop conditions, iteration boundary only.
            if self.cancel.load(Ordering::Relaxed) {
                break;
            }
            if let Some(budget) = limits.max_movetime {
                if elapsed >= budget {
                    break;
                }
                if limits.strict_time && elapsed + depth_time > budget {
                    break;
                }
            }
            if score.abs() >= MATE_THRESHOLD {
                break;
            }
        }

        result
    }

    #[allow(clippy::too_many_arguments)]
    fn pvs(
        &mut self,
        board: &mut Board,
        depth: i32,
        mut alpha: i32,
        mut beta: i32,
        can_null: bool,
        ply: usize,
        update_pv: bool,
        prev_pv: &[Move],
    ) -> i32 {
        self.nodes += 1;
        self.pv.enter(ply);

        if ply >= MAX_PLY - 1 {
            return evaluate(board, ply as i32);
        }

        let root = ply == 0;
        let pv_node = alpha != beta - 1;
        let checked = in_check(board, board.side_to_move);
        let alpha_orig = alpha;

        // Mate-distance pruning: a shorter mate is already known.
        if !root {
            beta = beta.min(MATE_VALUE - ply as i32 - 1);
            alpha = alpha.max(ply as i32 - MATE_VALUE);
            if alpha >= beta {
                return alpha;
            }
        }

        if depth <= 0 {
            return self.quiesce(board, alpha, beta, ply, 0);
        }

        // Positions the game already visited read as draws.
        if !root && self.pos_history.contains(&board.piece_state_key()) {
            return 0;
        }

        // Transposition table.
        let hash = board.zobrist();
        let mut tt_move: Option<Move> = None;
        if let Some(entry) = self.tt.probe(hash).copied() {
            tt_move = entry.best_move;
            if !root && entry.depth as i32 >= depth {
                let score = score_from_tt(entry.score as i32, ply as i32);
                match entry.bound {
                    Bound::Exact => {
                        if update_pv && let Some(mv) = entry.best_move {
                            self.pv.set(ply, mv);
                        }
                        return score;
                    }
                    Bound::Lower => alpha = alpha.max(score),
                    Bound::Upper => beta = beta.min(score),
                }
                if alpha >= beta {
                    return score;
                }
            }
        }

        // Null-move pruning. Never when in check (a forced reply would be
        // missed) and never without real pieces (zugzwang).
        if !root
            && depth >= NMP_DEPTH
            && can_null
            && !checked
            && !pv_node
            && board.has_nonpawn_material(board.side_to_move)
        {
            board.push_null();
            let score = -self.pvs(
                board,
                depth - 1 - NMP_REDUCTION,
                -beta,
                -beta + 1,
                false,
                ply + 1,
                false,
                &[],
            );
            board.pop_null();

            if score >= beta {
                self.tt.save(
                    hash,
                    None,
                    score_to_tt(score, ply as i32),
                    depth as u8,
                    Bound::Lower,
                );
                return score;
            }
        }

        let pv_move = prev_pv.first().copied();
        let killers = self.tables.killers[ply];
        let mut ordered = OrderedMoves::new(board, tt_move, pv_move, killers);

        let mut best = -INF;
        let mut best_move: Option<Move> = None;
        let mut found_pv = false;
        let mut moves_tried = 0u32;
        let mut any_move = false;

        while let Some((mv, kind)) = ordered.next(board, &self.tables.history) {
            any_move = true;

            let quiet = mv.promotion.is_none()
                && board.occupied() & mv.to.bb() == 0
                && board.en_passant != Some(mv.to);
            let child_pv: &[Move] = match prev_pv.first() {
                Some(&head) if head == mv => &prev_pv[1..],
                _ => &[],
            };

            board.make(mv);

            let mut score;
            if found_pv {
                // Zero-window probe; re-search on a fail-high inside the
                // window.
                score = -self.pvs(
                    board,
                    depth - 1,
                    -alpha - 1,
                    -alpha,
                    can_null,
                    ply + 1,
                    false,
                    child_pv,
                );
                if score > alpha && score < beta {
                    score = -self.pvs(
                        board,
                        depth - 1,
                        -beta,
                        -alpha,
                        can_null,
                        ply + 1,
                        update_pv,
                        child_pv,
                    );
                }
            } else {
                let mut reduction = 0;
                if depth >= LMR_DEPTH && !checked && !root {
                    let soft = 0.5
                        * (((depth - 1) as f64).sqrt() + (moves_tried as f64).sqrt());
                    reduction = (soft as i32).min(depth - 1);
                }

                score = -self.pvs(
                    board,
                    depth - 1 - reduction,
                    -beta,
                    -alpha,
                    can_null,
                    ply + 1,
                    update_pv && reduction == 0,
                    child_pv,
                );
                if reduction > 0 && score > alpha {
                    score = -self.pvs(
                        board,
                        depth - 1,
                        -beta,
                        -alpha,
                        can_null,
                        ply + 1,
                        update_pv,
                        child_pv,
                    );
                }
            }

            board.unmake();
            moves_tried += 1;

            if score > best {
                best = score;
                best_move = Some(mv);
            }
            if score > alpha {
                alpha = score;
                found_pv = true;
                if update_pv {
                    self.pv.update(ply, mv);
                }
                if alpha >= beta {
                    if quiet && kind != MoveKind::Promotion {
                        self.tables.update_killer(ply, mv);
                    }
                    break;
                }
                if quiet {
                    self.tables
                        .update_history(board.side_to_move, mv, depth);
                }
            }
        }

        if !any_move {
            return if checked { -MATE_VALUE + ply as i32 } else { 0 };
        }

        let bound = if best >= beta {
            Bound::Lower
        } else if best <= alpha_orig {
            Bound::Upper
        } else {
            Bound::Exact
        };
        self.tt.save(
            hash,
            best_move,
            score_to_tt(best, ply as i32),
            depth as u8,
            bound,
        );

        best
    }

    fn quiesce(&mut self, board: &mut Board, mut alpha: i32, beta: i32, ply: usize, qdepth: u32) -> i32 {
        self.nodes += 1;
        self.qnodes += 1;

        let stand_pat = evaluate(board, ply as i32);
        if stand_pat >= beta {
            return stand_pat;
        }
        alpha = alpha.max(stand_pat);

        if qdepth >= MAX_Q_DEPTH || ply >= MAX_PLY - 1 {
            return alpha;
        }

        let mut stream = crate::moves::movegen::MoveStream::tactical(board);
        while let Some((mv, kind)) = stream.next(board) {
            if DELTA_PRUNING && kind == MoveKind::Capture {
                let victim = board
                    .piece_type_at(mv.to)
                    .map_or(crate::board::Piece::Pawn.value(), |p| p.value());
                if stand_pat + victim + DELTA_MARGIN < alpha {
                    continue;
                }
            }

            board.make(mv);
            let score = -self.quiesce(board, -beta, -alpha, ply + 1, qdepth + 1);
            board.unmake();

            if score >= beta {
                return score;
            }
            alpha = alpha.max(score);
        }

        alpha
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fen(f: &str) -> Board {
        Board::from_fen(f).expect("valid FEN")
    }

    fn search_depth(board: &mut Board, depth: u32) -> SearchResult {
        let mut searcher = Searcher::new();
        searcher.search(board, &SearchLimits::depth(depth), &mut |_| {})
    }

    #[test]
    fn depth_one_finds_a_move_from_the_start() {
        let mut board = Board::new();
        let result = search_depth(&mut board, 1);
        assert!(result.best_move.is_some());
        assert!(result.score.abs() <= MATE_VALUE);
    }

    #[test]
    fn stalemate_scores_zero() {
        let mut board = fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1");
        let result = search_depth(&mut board, 3);
        assert_eq!(result.score, 0);
        assert!(result.best_move.is_none());
    }

    #[test]
    fn free_queen_gets_taken() {
        // The White queen on d3 is attacked by the f5 bishop.
        let mut board =
            fen("rn1qkbnr/ppp1pppp/8/3p1b2/3P4/P2Q4/1PP1PPPP/RNB1KBNR b KQkq - 0 3");
        let result = search_depth(&mut board, 3);
        assert_eq!(result.best_move.unwrap().to_uci(), "f5d3");
        assert!(result.score >= 400, "queen swing expected, got {}", result.score);
    }

    #[test]
    fn quiescence_is_deterministic() {
        let mut board =
            fen("r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4");
        let mut searcher = Searcher::new();
        let a = searcher.quiesce(&mut board, -INF, INF, 0, 0);
        let b = searcher.quiesce(&mut board, -INF, INF, 0, 0);
        assert_eq!(a, b);
    }

    #[test]
    fn cancel_before_start_still_completes_depth_one() {
        let mut board = Board::new();
        let mut searcher = Searcher::new();
        searcher.cancel_handle().store(true, Ordering::Relaxed);

        let mut depths = Vec::new();
        let result = searcher.search(&mut board, &SearchLimits::depth(30), &mut |info| {
            depths.push(info.depth)
        });
        assert_eq!(depths, vec![1]);
        assert!(result.best_move.is_some());
    }

    #[test]
    fn info_stream_reports_depths_in_order() {
        let mut board = Board::new();
        let mut searcher = Searcher::new();
        let mut depths = Vec::new();
        searcher.search(&mut board, &SearchLimits::depth(4), &mut |info| {
            depths.push(info.depth)
        });
        assert_eq!(depths, vec![1, 2, 3, 4]);
    }
}
