//! Move ordering for the main search: a duplicate-suppressing wrapper over
//! the staged generator.
//!
//! Priority: transposition-table move, principal-variation move from the
//! previous deepening iteration, the two killer slots, then generator
//! output (captures and promotions in MVV-LVA order, checking quiets,
//! remaining quiets by history counter). Injected moves are tagged
//! `MoveKind::Custom` and legality-probed before use; anything already
//! yielded is suppressed when the generator produces it again.

use crate::board::Board;
use crate::moves::movegen::{MoveStream, is_legal};
use crate::moves::types::{Move, MoveKind};
use crate::search::context::HistoryTable;
use arrayvec::ArrayVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OrderStage {
    TtMove,
    PvMove,
    Killer1,
    Killer2,
    Generated,
    QuietsByHistory,
    Done,
}

pub struct OrderedMoves {
    stage: OrderStage,
    stream: MoveStream,
    tt_move: Option<Move>,
    pv_move: Option<Move>,
    killers: [Option<Move>; 2],
    /// Injected moves already handed out; generator duplicates are skipped.
    yielded: ArrayVec<Move, 4>,
    /// Non-checking quiets buffered for history ordering.
    quiets: ArrayVec<(Move, i32), 256>,
    quiet_idx: usize,
}

/// A move is quiet here iff it captures nothing (en passant included) and
/// does not promote.
fn is_quiet(board: &Board, mv: Move) -> bool {
    mv.promotion.is_none()
        && board.occupied() & mv.to.bb() == 0
        && board.en_passant != Some(mv.to)
}

impl OrderedMoves {
    pub fn new(
        board: &Board,
        tt_move: Option<Move>,
        pv_move: Option<Move>,
        killers: [Option<Move>; 2],
    ) -> Self {
        OrderedMoves {
            stage: OrderStage::TtMove,
            stream: MoveStream::new(board),
            tt_move,
            pv_move,
            killers,
            yielded: ArrayVec::new(),
            quiets: ArrayVec::new(),
            quiet_idx: 0,
        }
    }

    fn try_inject(&mut self, board: &Board, candidate: Option<Move>, quiet_only: bool) -> Option<Move> {
        let mv = candidate?;
        if mv.is_null() || self.yielded.contains(&mv) {
            return None;
        }
        if quiet_only && !is_quiet(board, mv) {
            return None;
        }
        if !is_legal(board, mv) {
            return None;
        }
        self.yielded.push(mv);
        Some(mv)
    }

    /// Best remaining quiet by history counter, selection-sort style.
    fn pick_best_quiet(&mut self) -> Option<Move> {
        if self.quiet_idx >= self.quiets.len() {
            return None;
        }
        let mut best = self.quiet_idx;
        for i in (self.quiet_idx + 1)..self.quiets.len() {
            if self.quiets[i].1 > self.quiets[best].1 {
                best = i;
            }
        }
        self.quiets.swap(self.quiet_idx, best);
        let mv = self.quiets[self.quiet_idx].0;
        self.quiet_idx += 1;
        Some(mv)
    }

    pub fn next(&mut self, board: &Board, history: &HistoryTable) -> Option<(Move, MoveKind)> {
        loop {
            match self.stage {
                OrderStage::TtMove => {
                    self.stage = OrderStage::PvMove;
                    if let Some(mv) = self.try_inject(board, self.tt_move, false) {
                        return Some((mv, MoveKind::Custom));
                    }
                }
                OrderStage::PvMove => {
                    self.stage = OrderStage::Killer1;
                    if let Some(mv) = self.try_inject(board, self.pv_move, false) {
                        return Some((mv, MoveKind::Custom));
                    }
                }
                OrderStage::Killer1 => {
                    self.stage = OrderStage::Killer2;
                    if let Some(mv) = self.try_inject(board, self.killers[0], true) {
                        return Some((mv, MoveKind::Custom));
                    }
                }
                OrderStage::Killer2 => {
                    self.stage = OrderStage::Generated;
                    if let Some(mv) = self.try_inject(board, self.killers[1], true) {
                        return Some((mv, MoveKind::Custom));
                    }
                }
                OrderStage::Generated => match self.stream.next(board) {
                    Some((mv, kind)) => {
                        if self.yielded.contains(&mv) {
                            continue;
                        }
                        if kind == MoveKind::Other {
                            let color = board.side_to_move;
                            let score = history[color as usize][mv.from.index() as usize]
                                [mv.to.index() as usize];
                            self.quiets.push((mv, score));
                            continue;
                        }
                        return Some((mv, kind));
                    }
                    None => self.stage = OrderStage::QuietsByHistory,
                },
                OrderStage::QuietsByHistory => match self.pick_best_quiet() {
                    Some(mv) => return Some((mv, MoveKind::Other)),
                    None => self.stage = OrderStage::Done,
                },
                OrderStage::Done => return None,
            }
        }
    }
}
