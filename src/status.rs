use crate::board::Board;
use crate::moves::movegen::has_legal_move;
use crate::moves::square_control::in_check;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    InPlay,
    DrawFivefold,
    DrawSeventyFiveMove,
    DrawThreefold,
    DrawFiftyMove,
    DrawDeadPosition,
    Stalemate,
    Checkmate,
}

impl Board {
    #[inline]
    pub fn is_check(&self) -> bool {
        in_check(self, self.side_to_move)
    }

    pub fn is_checkmate(&self) -> bool {
        self.is_check() && !has_legal_move(self)
    }

    pub fn is_stalemate(&self) -> bool {
        !self.is_check() && !has_legal_move(self)
    }
}

/// Status of the current position, highest-priority rule first: the
/// automatic draws (fivefold, 75-move), dead position, then the claimable
/// draws, then the move-based outcomes.
pub fn position_status(board: &Board) -> GameStatus {
    if board.is_repetition(5) {
        return GameStatus::DrawFivefold;
    }
    if board.is_seventyfive_moves() {
        return GameStatus::DrawSeventyFiveMove;
    }
    if board.is_insufficient_material() {
        return GameStatus::DrawDeadPosition;
    }
    if board.is_repetition(3) {
        return GameStatus::DrawThreefold;
    }
    if board.is_fifty_moves() {
        return GameStatus::DrawFiftyMove;
    }

    if !has_legal_move(board) {
        if board.is_check() {
            GameStatus::Checkmate
        } else {
            GameStatus::Stalemate
        }
    } else {
        GameStatus::InPlay
    }
}
