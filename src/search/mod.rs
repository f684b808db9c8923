pub mod context;
pub mod eval;
pub mod ordering;
pub mod pesto;
#[allow(clippy::module_inception)]
pub mod search;
pub mod tt;

use crate::board::Board;
use crate::moves::types::Move;

/// Hook for opening books and endgame tablebases: a probe returning a move
/// answers `go` without entering the search. Implementations live outside
/// the engine core; only the interface is fixed here.
pub trait MoveProbe {
    fn probe(&self, board: &Board) -> Option<Move>;
}
