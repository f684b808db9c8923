//! Staged pseudo-legal move generation with pin-aware legality filtering.
//!
//! Moves come out in ordered batches: pawn captures (promotions expanded),
//! piece captures most-valuable-victim first, en passant, promotion pushes,
//! quiet moves that give check, then the remaining quiets in piece order.
//! Each move carries a `MoveKind` tag for the search; when the side to move
//! is in check the stream switches to check evasions.
//!
//! `MoveStream` is an explicit state machine that takes the board by
//! argument on every pull, so the search can make/unmake between pulls; it
//! is restarted only by rebuilding it from the position. `legal_moves` and
//! `tactical_moves` wrap it in a plain borrowing iterator.

use crate::bitboard::{BitIter, BitboardExt, RANK_1, RANK_2, RANK_3, RANK_6, RANK_7, RANK_8};
use crate::board::{Board, CASTLE_BK, CASTLE_BQ, CASTLE_WK, CASTLE_WQ, Color, Piece};
use crate::moves::magic::{bishop_attacks, rook_attacks};
use crate::moves::square_control::{
    attackers_mask, attacks_from, castling_path_safe, checkers_mask, ep_exposes_king,
    slider_blockers,
};
use crate::moves::tables::{KING_ATTACKS, KNIGHT_ATTACKS, between, pawn_attacks, ray};
use crate::moves::types::{Move, MoveBuffer, MoveKind};
use crate::square::Square;
use arrayvec::ArrayVec;

const PROMOS: [Piece; 4] = [Piece::Queen, Piece::Rook, Piece::Bishop, Piece::Knight];

/// Victims from most valuable down; pawn captures have their own stage.
const VICTIMS: [Piece; 5] = [
    Piece::Queen,
    Piece::Rook,
    Piece::Bishop,
    Piece::Knight,
    Piece::Pawn,
];

/// Attackers least valuable first (pawns are stage one).
const ATTACKERS: [Piece; 5] = [
    Piece::Knight,
    Piece::Bishop,
    Piece::Rook,
    Piece::Queen,
    Piece::King,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Start,
    PawnCaptures,
    PieceCaptures,
    EnPassant,
    PromoPushes,
    Quiets,
    QuietRest,
    Evasions,
    Done,
}

/// Resumable staged generator. Holds no board borrow; the position passed
/// to `next` must be the one the stream was built from.
pub struct MoveStream {
    us: Color,
    king: Square,
    blockers: u64,
    checkers: u64,
    /// Tactical mode keeps captures, promotions, and checks only.
    tactical: bool,
    stage: Stage,
    batch: ArrayVec<(Move, MoveKind), 256>,
    batch_idx: usize,
    quiet_rest: ArrayVec<(Move, MoveKind), 256>,
}

impl MoveStream {
    pub fn new(board: &Board) -> Self {
        Self::with_mode(board, false)
    }

    pub fn tactical(board: &Board) -> Self {
        Self::with_mode(board, true)
    }

    fn with_mode(board: &Board, tactical: bool) -> Self {
        let us = board.side_to_move;
        let king = board.king_square(us);
        MoveStream {
            us,
            king,
            blockers: slider_blockers(board, us, king),
            checkers: checkers_mask(board, us),
            tactical,
            stage: Stage::Start,
            batch: ArrayVec::new(),
            batch_idx: 0,
            quiet_rest: ArrayVec::new(),
        }
    }

    pub fn next(&mut self, board: &Board) -> Option<(Move, MoveKind)> {
        loop {
            if self.batch_idx < self.batch.len() {
                let item = self.batch[self.batch_idx];
                self.batch_idx += 1;
                return Some(item);
            }
            if self.stage == Stage::Done {
                return None;
            }
            self.advance_stage(board);
        }
    }

    fn advance_stage(&mut self, board: &Board) {
        self.batch.clear();
        self.batch_idx = 0;
        self.stage = match self.stage {
            Stage::Start => {
                if self.checkers != 0 {
                    self.fill_evasions(board);
                    Stage::Evasions
                } else {
                    self.fill_pawn_captures(board);
                    Stage::PawnCaptures
                }
            }
            Stage::Evasions => Stage::Done,
            Stage::PawnCaptures => {
                self.fill_piece_captures(board);
                Stage::PieceCaptures
            }
            Stage::PieceCaptures => {
                self.fill_en_passant(board);
                Stage::EnPassant
            }
            Stage::EnPassant => {
                self.fill_promo_pushes(board);
                Stage::PromoPushes
            }
            Stage::PromoPushes => {
                self.fill_quiets(board);
                Stage::Quiets
            }
            Stage::Quiets => {
                std::mem::swap(&mut self.batch, &mut self.quiet_rest);
                Stage::QuietRest
            }
            Stage::QuietRest | Stage::Done => Stage::Done,
        };
    }

    /// A non-king move keeps the king safe iff the mover is not a shield
    /// piece, or it stays on the pin line.
    #[inline(always)]
    fn pin_safe(&self, from: Square, to: Square) -> bool {
        self.blockers & from.bb() == 0 || ray(from, self.king) & to.bb() != 0
    }

    /// King-step safety with the king lifted off the board, so sliders see
    /// through its current square.
    #[inline(always)]
    fn king_step_safe(&self, board: &Board, to: Square) -> bool {
        let occ_without_king = board.occupied() ^ self.king.bb();
        attackers_mask(board, self.us.opposite(), to, occ_without_king) == 0
    }

    fn fill_pawn_captures(&mut self, board: &Board) {
        let them = self.us.opposite();
        let targets_all = board.opponent_occupancy(self.us) & !board.pieces(Piece::King, them);
        let promo_rank = match self.us {
            Color::White => RANK_8,
            Color::Black => RANK_1,
        };

        for from_idx in BitIter(board.pieces(Piece::Pawn, self.us)) {
            let from = Square::from_index(from_idx);
            for to_idx in BitIter(pawn_attacks(from_idx, self.us) & targets_all) {
                let to = Square::from_index(to_idx);
                if !self.pin_safe(from, to) {
                    continue;
                }
                if to.bb() & promo_rank != 0 {
                    for promo in PROMOS {
                        self.batch
                            .push((Move::promotion(from, to, promo), MoveKind::Promotion));
                    }
                } else {
                    self.batch.push((Move::new(from, to), MoveKind::Capture));
                }
            }
        }
    }

    fn fill_piece_captures(&mut self, board: &Board) {
        let them = self.us.opposite();
        let occ = board.occupied();

        for victim in VICTIMS {
            let victims = board.pieces(victim, them);
            if victims == 0 {
                continue;
            }
            for attacker in ATTACKERS {
                for from_idx in BitIter(board.pieces(attacker, self.us)) {
                    let from = Square::from_index(from_idx);
                    let hits = attacks_from(attacker, self.us, from_idx, occ) & victims;
                    for to_idx in BitIter(hits) {
                        let to = Square::from_index(to_idx);
                        let safe = if attacker == Piece::King {
                            self.king_step_safe(board, to)
                        } else {
                            self.pin_safe(from, to)
                        };
                        if safe {
                            self.batch.push((Move::new(from, to), MoveKind::Capture));
                        }
                    }
                }
            }
        }
    }

    fn fill_en_passant(&mut self, board: &Board) {
        let Some(ep) = board.en_passant else { return };
        let them = self.us.opposite();

        let sources = pawn_attacks(ep.index(), them) & board.pieces(Piece::Pawn, self.us);
        for from_idx in BitIter(sources) {
            let from = Square::from_index(from_idx);
            if !ep_exposes_king(board, self.us, from, ep) {
                self.batch.push((Move::new(from, ep), MoveKind::Capture));
            }
        }
    }

    fn fill_promo_pushes(&mut self, board: &Board) {
        let empty = !board.occupied();
        let pawns = board.pieces(Piece::Pawn, self.us);

        let pushes = match self.us {
            Color::White => ((pawns & RANK_7) << 8) & empty,
            Color::Black => ((pawns & RANK_2) >> 8) & empty,
        };
        for to_idx in BitIter(pushes) {
            let from_idx = match self.us {
                Color::White => to_idx - 8,
                Color::Black => to_idx + 8,
            };
            let from = Square::from_index(from_idx);
            let to = Square::from_index(to_idx);
            if !self.pin_safe(from, to) {
                continue;
            }
            for promo in PROMOS {
                self.batch
                    .push((Move::promotion(from, to, promo), MoveKind::Promotion));
            }
        }
    }

    /// Quiet moves, checks first. Non-checking quiets go to `quiet_rest`
    /// in piece order (pawn through king, castling last) and are dropped
    /// entirely in tactical mode.
    fn fill_quiets(&mut self, board: &Board) {
        let us = self.us;
        let them = us.opposite();
        let occ = board.occupied();
        let empty = !occ;
        let ek = board.king_square(them);

        // Squares from which each piece type would give check.
        let pawn_check = pawn_attacks(ek.index(), them);
        let knight_check = KNIGHT_ATTACKS[ek.index() as usize];
        let bishop_check = bishop_attacks(ek.index(), occ);
        let rook_check = rook_attacks(ek.index(), occ);
        let queen_check = bishop_check | rook_check;

        let mut quiet = |stream: &mut Self, from: Square, to: Square, check_mask: u64| {
            if !stream.pin_safe(from, to) {
                return;
            }
            let mv = Move::new(from, to);
            if to.bb() & check_mask != 0 {
                stream.batch.push((mv, MoveKind::Check));
            } else if !stream.tactical {
                stream.quiet_rest.push((mv, MoveKind::Other));
            }
        };

        // Pawn pushes (promotions were their own stage).
        let pawns = board.pieces(Piece::Pawn, us);
        let (single, double) = match us {
            Color::White => {
                let single = (pawns << 8) & empty & !RANK_8;
                let double = ((single & RANK_3) << 8) & empty;
                (single, double)
            }
            Color::Black => {
                let single = (pawns >> 8) & empty & !RANK_1;
                let double = ((single & RANK_6) >> 8) & empty;
                (single, double)
            }
        };
        for to_idx in BitIter(single) {
            let from_idx = if us == Color::White {
                to_idx - 8
            } else {
                to_idx + 8
            };
            quiet(
                self,
                Square::from_index(from_idx),
                Square::from_index(to_idx),
                pawn_check,
            );
        }
        for to_idx in BitIter(double) {
            let from_idx = if us == Color::White {
                to_idx - 16
            } else {
                to_idx + 16
            };
            quiet(
                self,
                Square::from_index(from_idx),
                Square::from_index(to_idx),
                pawn_check,
            );
        }

        for (piece, check_mask) in [
            (Piece::Knight, knight_check),
            (Piece::Bishop, bishop_check),
            (Piece::Rook, rook_check),
            (Piece::Queen, queen_check),
        ] {
            for from_idx in BitIter(board.pieces(piece, us)) {
                let from = Square::from_index(from_idx);
                let targets = attacks_from(piece, us, from_idx, occ) & empty;
                for to_idx in BitIter(targets) {
                    quiet(self, from, Square::from_index(to_idx), check_mask);
                }
            }
        }

        // King steps never show up in the fast check masks.
        if !self.tactical {
            for to_idx in BitIter(KING_ATTACKS[self.king.index() as usize] & empty) {
                let to = Square::from_index(to_idx);
                if self.king_step_safe(board, to) {
                    self.quiet_rest
                        .push((Move::new(self.king, to), MoveKind::Other));
                }
            }
            self.fill_castling(board);
        }
    }

    fn fill_castling(&mut self, board: &Board) {
        let occ = board.occupied();

        let (ks_flag, qs_flag, ks_between, qs_between, ks_to, qs_to) = match self.us {
            Color::White => (
                CASTLE_WK,
                CASTLE_WQ,
                0x0000_0000_0000_0060u64, // f1, g1
                0x0000_0000_0000_000Eu64, // b1, c1, d1
                Square::G1,
                Square::C1,
            ),
            Color::Black => (
                CASTLE_BK,
                CASTLE_BQ,
                0x6000_0000_0000_0000u64, // f8, g8
                0x0E00_0000_0000_0000u64, // b8, c8, d8
                Square::G8,
                Square::C8,
            ),
        };

        if board.castling_rights & ks_flag != 0
            && occ & ks_between == 0
            && castling_path_safe(board, self.us, ks_to)
        {
            self.quiet_rest
                .push((Move::new(self.king, ks_to), MoveKind::Other));
        }
        if board.castling_rights & qs_flag != 0
            && occ & qs_between == 0
            && castling_path_safe(board, self.us, qs_to)
        {
            self.quiet_rest
                .push((Move::new(self.king, qs_to), MoveKind::Other));
        }
    }

    /// Check evasions. Double check allows king steps only; single check
    /// adds captures of the checker, interpositions, and en passant when
    /// the full-board simulation resolves the check.
    fn fill_evasions(&mut self, board: &Board) {
        let us = self.us;
        let them = us.opposite();
        let occ = board.occupied();
        let own = board.occupancy(us);
        let enemy_king = board.pieces(Piece::King, them);

        for to_idx in BitIter(KING_ATTACKS[self.king.index() as usize] & !own & !enemy_king) {
            let to = Square::from_index(to_idx);
            if self.king_step_safe(board, to) {
                let kind = if occ & to.bb() != 0 {
                    MoveKind::Capture
                } else {
                    MoveKind::Other
                };
                self.batch.push((Move::new(self.king, to), kind));
            }
        }

        if self.checkers.count_ones() == 1 {
            let checker = Square::from_index(self.checkers.lsb());
            let promo_rank = match us {
                Color::White => RANK_8,
                Color::Black => RANK_1,
            };

            // Capture the checker with anything but the king.
            let capturers =
                attackers_mask(board, us, checker, occ) & !board.pieces(Piece::King, us);
            for from_idx in BitIter(capturers) {
                let from = Square::from_index(from_idx);
                if !self.pin_safe(from, checker) {
                    continue;
                }
                let is_pawn = board.pieces(Piece::Pawn, us) & from.bb() != 0;
                if is_pawn && checker.bb() & promo_rank != 0 {
                    for promo in PROMOS {
                        self.batch
                            .push((Move::promotion(from, checker, promo), MoveKind::Promotion));
                    }
                } else {
                    self.batch
                        .push((Move::new(from, checker), MoveKind::Capture));
                }
            }

            // Interpose on the open interval; those squares are empty.
            for to_idx in BitIter(between(self.king, checker)) {
                let to = Square::from_index(to_idx);

                let (single_from, double_from, start_rank) = match us {
                    Color::White => (to_idx.wrapping_sub(8), to_idx.wrapping_sub(16), RANK_2),
                    Color::Black => (to_idx.wrapping_add(8), to_idx.wrapping_add(16), RANK_7),
                };
                let pawns = board.pieces(Piece::Pawn, us);
                if single_from < 64 && pawns & (1u64 << single_from) != 0 {
                    let from = Square::from_index(single_from);
                    if self.pin_safe(from, to) {
                        if to.bb() & promo_rank != 0 {
                            for promo in PROMOS {
                                self.batch
                                    .push((Move::promotion(from, to, promo), MoveKind::Promotion));
                            }
                        } else {
                            self.batch.push((Move::new(from, to), MoveKind::Other));
                        }
                    }
                } else if double_from < 64
                    && pawns & (1u64 << double_from) & start_rank != 0
                    && single_from < 64
                    && occ & (1u64 << single_from) == 0
                {
                    let from = Square::from_index(double_from);
                    if self.pin_safe(from, to) {
                        self.batch.push((Move::new(from, to), MoveKind::Other));
                    }
                }

                let mut blockers_to =
                    KNIGHT_ATTACKS[to_idx as usize] & board.pieces(Piece::Knight, us);
                blockers_to |= bishop_attacks(to_idx, occ)
                    & (board.pieces(Piece::Bishop, us) | board.pieces(Piece::Queen, us));
                blockers_to |= rook_attacks(to_idx, occ)
                    & (board.pieces(Piece::Rook, us) | board.pieces(Piece::Queen, us));
                for from_idx in BitIter(blockers_to) {
                    let from = Square::from_index(from_idx);
                    if self.pin_safe(from, to) {
                        self.batch.push((Move::new(from, to), MoveKind::Other));
                    }
                }
            }
        }

        // En passant can capture a double-pushed checker (or, rarely,
        // interpose); the simulation covers both. Double check included:
        // it never survives the simulation there.
        if let Some(ep) = board.en_passant {
            let sources = pawn_attacks(ep.index(), them) & board.pieces(Piece::Pawn, us);
            for from_idx in BitIter(sources) {
                let from = Square::from_index(from_idx);
                if !ep_exposes_king(board, us, from, ep) {
                    self.batch.push((Move::new(from, ep), MoveKind::Capture));
                }
            }
        }
    }
}

/// Borrowing iterator over the legal moves, evasions first when in check.
pub struct LegalMoves<'a> {
    board: &'a Board,
    stream: MoveStream,
}

impl Iterator for LegalMoves<'_> {
    type Item = (Move, MoveKind);

    fn next(&mut self) -> Option<Self::Item> {
        self.stream.next(self.board)
    }
}

pub fn legal_moves(board: &Board) -> LegalMoves<'_> {
    LegalMoves {
        board,
        stream: MoveStream::new(board),
    }
}

/// Captures, promotions, and checking moves only; full evasions when in
/// check. This is the quiescence stream.
pub fn tactical_moves(board: &Board) -> LegalMoves<'_> {
    LegalMoves {
        board,
        stream: MoveStream::tactical(board),
    }
}

/// First-legal-move early exit.
pub fn has_legal_move(board: &Board) -> bool {
    legal_moves(board).next().is_some()
}

/// Collects the legal moves into a buffer, dropping the kind tags.
pub fn collect_legal(board: &Board, buf: &mut impl MoveBuffer) {
    buf.clear();
    for (mv, _) in legal_moves(board) {
        buf.push(mv);
    }
}

/// Full legality test for a single externally supplied move (TT, killer,
/// or UCI input): geometry first, then king safety.
pub fn is_legal(board: &Board, mv: Move) -> bool {
    if mv.is_null() {
        return false;
    }
    let us = board.side_to_move;
    let them = us.opposite();
    let Some((color, piece)) = board.piece_at(mv.from) else {
        return false;
    };
    if color != us {
        return false;
    }
    if board.occupancy(us) & mv.to.bb() != 0 {
        return false;
    }
    if board.pieces(Piece::King, them) & mv.to.bb() != 0 {
        return false;
    }
    if mv.promotion.is_some() && piece != Piece::Pawn {
        return false;
    }
    if let Some(p) = mv.promotion
        && (p == Piece::Pawn || p == Piece::King)
    {
        return false;
    }

    let occ = board.occupied();
    let mut is_ep = false;
    let mut is_castle = false;

    match piece {
        Piece::Pawn => {
            let promo_rank = match us {
                Color::White => RANK_8,
                Color::Black => RANK_1,
            };
            if (mv.to.bb() & promo_rank != 0) != mv.promotion.is_some() {
                return false;
            }
            if pawn_attacks(mv.from.index(), us) & mv.to.bb() != 0 {
                if board.en_passant == Some(mv.to) {
                    is_ep = true;
                } else if board.opponent_occupancy(us) & mv.to.bb() == 0 {
                    return false;
                }
            } else {
                let up: i16 = if us == Color::White { 8 } else { -8 };
                let delta = mv.to.index() as i16 - mv.from.index() as i16;
                if delta == up {
                    if occ & mv.to.bb() != 0 {
                        return false;
                    }
                } else if delta == 2 * up {
                    let start_rank = if us == Color::White { RANK_2 } else { RANK_7 };
                    let mid = 1u64 << (mv.from.index() as i16 + up);
                    if mv.from.bb() & start_rank == 0 || occ & (mid | mv.to.bb()) != 0 {
                        return false;
                    }
                } else {
                    return false;
                }
            }
        }
        Piece::King => {
            let file_delta = mv.to.file() as i16 - mv.from.file() as i16;
            if file_delta.abs() == 2 && mv.from.rank() == mv.to.rank() {
                is_castle = true;
                let (flag, between_mask) = match (us, mv.to.index()) {
                    (Color::White, 6) => (CASTLE_WK, 0x0000_0000_0000_0060u64),
                    (Color::White, 2) => (CASTLE_WQ, 0x0000_0000_0000_000Eu64),
                    (Color::Black, 62) => (CASTLE_BK, 0x6000_0000_0000_0000u64),
                    (Color::Black, 58) => (CASTLE_BQ, 0x0E00_0000_0000_0000u64),
                    _ => return false,
                };
                if board.castling_rights & flag == 0 || occ & between_mask != 0 {
                    return false;
                }
                if !castling_path_safe(board, us, mv.to) {
                    return false;
                }
            } else if KING_ATTACKS[mv.from.index() as usize] & mv.to.bb() == 0 {
                return false;
            }
        }
        _ => {
            if attacks_from(piece, us, mv.from.index(), occ) & mv.to.bb() == 0 {
                return false;
            }
        }
    }

    // King safety.
    let king = board.king_square(us);
    if is_ep {
        return !ep_exposes_king(board, us, mv.from, mv.to);
    }
    if piece == Piece::King {
        if is_castle {
            return true; // path already verified, start square included
        }
        let occ_without_king = occ ^ king.bb();
        return attackers_mask(board, them, mv.to, occ_without_king) == 0;
    }

    let checkers = checkers_mask(board, us);
    let pin_ok = {
        let blockers = slider_blockers(board, us, king);
        blockers & mv.from.bb() == 0 || ray(mv.from, king) & mv.to.bb() != 0
    };
    match checkers.count_ones() {
        0 => pin_ok,
        1 => {
            let checker = Square::from_index(checkers.lsb());
            pin_ok && (mv.to == checker || between(king, checker) & mv.to.bb() != 0)
        }
        _ => false,
    }
}
