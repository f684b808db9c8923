//! Making and unmaking moves. Every make pushes a full snapshot onto the
//! board's undo stack, so unmake is a plain O(1) restore; null moves go
//! through the same stack.

use crate::board::{Board, CASTLE_BLACK, CASTLE_WHITE, Color, Piece, Undo};
use crate::hash::zobrist::{ep_file_to_hash, xor_castling_rights_delta, zobrist_keys};
use crate::moves::types::Move;
use crate::square::Square;

fn snapshot(board: &Board) -> Undo {
    Undo {
        pawns: board.pawns,
        knights: board.knights,
        bishops: board.bishops,
        rooks: board.rooks,
        queens: board.queens,
        kings: board.kings,
        occ_co: board.occ_co,
        occupied: board.occupied,
        promoted: board.promoted,
        side_to_move: board.side_to_move,
        castling_rights: board.castling_rights,
        en_passant: board.en_passant,
        halfmove_clock: board.halfmove_clock,
        fullmove_number: board.fullmove_number,
        zobrist: board.zobrist,
        piece_hash: board.piece_hash,
        prev_history: None,
    }
}

/// Rook relocation for a castling king, keyed by the king's destination.
#[inline(always)]
fn rook_castle_squares(king_to: u8) -> Option<(Square, Square)> {
    match king_to {
        6 => Some((Square::from_index(7), Square::from_index(5))), // White O-O
        2 => Some((Square::from_index(0), Square::from_index(3))), // White O-O-O
        62 => Some((Square::from_index(63), Square::from_index(61))), // Black O-O
        58 => Some((Square::from_index(56), Square::from_index(59))), // Black O-O-O
        _ => None,
    }
}

impl Board {
    /// Applies a legal (or at least pseudo-legal) move. The caller is
    /// responsible for legality; feeding garbage is a programming error.
    pub fn make(&mut self, mv: Move) {
        let mut undo = snapshot(self);
        let start_zobrist = self.zobrist;
        let keys = zobrist_keys();

        let (color, piece) = self
            .piece_at(mv.from)
            .expect("make() from an empty square");
        debug_assert_eq!(color, self.side_to_move);

        let prev_ep = self.en_passant;

        // EP leaves the hash before anything else changes.
        if let Some(f) = ep_file_to_hash(self) {
            self.zobrist ^= keys.ep_file[f as usize];
        }
        self.en_passant = None;

        // Capture, including the EP-captured pawn behind the target.
        let is_ep = piece == Piece::Pawn && prev_ep == Some(mv.to);
        let captured = if is_ep {
            let behind = match color {
                Color::White => Square::from_index(mv.to.index() - 8),
                Color::Black => Square::from_index(mv.to.index() + 8),
            };
            self.remove_piece(behind)
        } else {
            self.remove_piece(mv.to)
        };
        debug_assert!(captured.map_or(true, |(c, _)| c != color));

        // Move the piece, promoting if asked.
        let was_promoted = self.promoted & mv.from.bb() != 0;
        self.remove_piece(mv.from);
        if let Some(promo) = mv.promotion {
            debug_assert_eq!(piece, Piece::Pawn);
            self.put_piece(mv.to, color, promo);
            self.promoted |= mv.to.bb();
        } else {
            self.put_piece(mv.to, color, piece);
            if was_promoted {
                self.promoted |= mv.to.bb();
            }
        }

        // Castling moves the rook as well.
        let is_castle =
            piece == Piece::King && (mv.to.file() as i16 - mv.from.file() as i16).abs() == 2;
        if is_castle
            && let Some((rook_from, rook_to)) = rook_castle_squares(mv.to.index())
        {
            self.remove_piece(rook_from);
            self.put_piece(rook_to, color, Piece::Rook);
        }

        // Rights live on rook home squares: touching either end of the move
        // clears them, and a king move clears the whole back rank pair.
        let old_rights = self.castling_rights;
        let mut new_rights = old_rights & !(mv.from.bb() | mv.to.bb());
        if piece == Piece::King {
            new_rights &= match color {
                Color::White => !CASTLE_WHITE,
                Color::Black => !CASTLE_BLACK,
            };
        }
        if new_rights != old_rights {
            self.castling_rights = new_rights;
            xor_castling_rights_delta(&mut self.zobrist, keys, old_rights, new_rights);
        }

        // New EP target on a double push.
        if piece == Piece::Pawn {
            let from_rank = mv.from.rank();
            let to_rank = mv.to.rank();
            if (color == Color::White && from_rank == 1 && to_rank == 3)
                || (color == Color::Black && from_rank == 6 && to_rank == 4)
            {
                let ep = match color {
                    Color::White => Square::from_index(mv.from.index() + 8),
                    Color::Black => Square::from_index(mv.from.index() - 8),
                };
                // EP target sits on rank 3 after a White push, rank 6
                // after a Black push.
                debug_assert!(
                    (color == Color::White && ep.rank() == 2)
                        || (color == Color::Black && ep.rank() == 5),
                    "EP square on wrong rank: {} after {:?} push",
                    ep,
                    color
                );
                self.en_passant = Some(ep);
            }
        }

        // Clocks.
        if captured.is_some() || piece == Piece::Pawn {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }
        if color == Color::Black {
            self.fullmove_number += 1;
        }

        // Flip the turn, then account for the new EP file (its hash
        // contribution depends on the side now to move).
        self.side_to_move = color.opposite();
        self.zobrist ^= keys.side_to_move;
        if let Some(f) = ep_file_to_hash(self) {
            self.zobrist ^= keys.ep_file[f as usize];
        }

        // Repetition window: irreversible moves start a fresh one.
        let irreversible = captured.is_some() || piece == Piece::Pawn;
        if irreversible {
            undo.prev_history = Some(std::mem::take(&mut self.history));
        }
        self.history.push(start_zobrist);

        self.undo_stack.push(undo);

        #[cfg(debug_assertions)]
        self.assert_hash();
    }

    /// Restores the position before the last `make`/`push_null`.
    /// Popping an empty stack is a programming error.
    pub fn unmake(&mut self) {
        let undo = self
            .undo_stack
            .pop()
            .expect("unmake() with an empty undo stack");

        self.history.pop();
        if let Some(prev) = undo.prev_history {
            self.history = prev;
        }

        self.pawns = undo.pawns;
        self.knights = undo.knights;
        self.bishops = undo.bishops;
        self.rooks = undo.rooks;
        self.queens = undo.queens;
        self.kings = undo.kings;
        self.occ_co = undo.occ_co;
        self.occupied = undo.occupied;
        self.promoted = undo.promoted;
        self.side_to_move = undo.side_to_move;
        self.castling_rights = undo.castling_rights;
        self.en_passant = undo.en_passant;
        self.halfmove_clock = undo.halfmove_clock;
        self.fullmove_number = undo.fullmove_number;
        self.zobrist = undo.zobrist;
        self.piece_hash = undo.piece_hash;

        #[cfg(debug_assertions)]
        self.assert_hash();
    }

    /// Passes the move: flips the turn, clears the EP target, bumps the
    /// halfmove clock. Only the turn and EP hash components change.
    pub fn push_null(&mut self) {
        let undo = snapshot(self);
        let keys = zobrist_keys();

        self.history.push(self.zobrist);

        if let Some(f) = ep_file_to_hash(self) {
            self.zobrist ^= keys.ep_file[f as usize];
        }
        self.en_passant = None;

        self.side_to_move = self.side_to_move.opposite();
        self.zobrist ^= keys.side_to_move;
        self.halfmove_clock += 1;

        self.undo_stack.push(undo);

        #[cfg(debug_assertions)]
        self.assert_hash();
    }

    pub fn pop_null(&mut self) {
        self.unmake();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::movegen::legal_moves;

    fn fen(f: &str) -> Board {
        Board::from_fen(f).expect("valid FEN")
    }

    fn mv(s: &str) -> Move {
        s.parse().unwrap()
    }

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    #[test]
    fn make_unmake_is_identity_everywhere() {
        let fens = [
            crate::board::START_FEN,
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3",
            "4k3/P7/8/8/8/8/8/4K3 w - - 0 1",
        ];
        for f in fens {
            let mut board = fen(f);
            let before = board.clone();
            let moves: Vec<Move> = legal_moves(&board).map(|(m, _)| m).collect();
            for m in moves {
                board.make(m);
                board.unmake();
                assert_eq!(board, before, "round trip broke on {} in {}", m, f);
            }
        }
    }

    #[test]
    fn castling_moves_both_pieces_and_clears_rights() {
        let mut b = fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        b.make(mv("e1g1"));
        assert_eq!(b.piece_type_at(sq("f1")), Some(Piece::Rook));
        assert_eq!(b.piece_type_at(sq("g1")), Some(Piece::King));
        assert!(!b.has_kingside_castle(Color::White));
        assert!(!b.has_queenside_castle(Color::White));
        assert!(b.has_kingside_castle(Color::Black));
        b.unmake();
        assert!(b.has_kingside_castle(Color::White));
    }

    #[test]
    fn capturing_a_rook_on_its_home_square_clears_that_right() {
        let mut b = fen("r3k2r/8/8/8/8/8/6B1/R3K2R w KQkq - 0 1");
        // Bg2 takes the a8 rook along the long diagonal.
        b.make(mv("g2a8"));
        assert!(!b.has_queenside_castle(Color::Black));
        assert!(b.has_kingside_castle(Color::Black));
    }

    #[test]
    fn en_passant_removes_the_bypassed_pawn() {
        let mut b = fen("rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3");
        b.make(mv("e5d6"));
        assert_eq!(b.piece_type_at(sq("d5")), None, "captured pawn gone");
        assert_eq!(b.piece_type_at(sq("d6")), Some(Piece::Pawn));
        b.unmake();
        assert_eq!(b.piece_type_at(sq("d5")), Some(Piece::Pawn));
    }

    #[test]
    fn promotion_swaps_the_pawn_and_marks_the_square() {
        let mut b = fen("4k3/P7/8/8/8/8/8/4K3 w - - 0 1");
        b.make(mv("a7a8q"));
        assert_eq!(b.piece_type_at(sq("a8")), Some(Piece::Queen));
        assert_ne!(b.promoted & sq("a8").bb(), 0);
        b.unmake();
        assert_eq!(b.piece_type_at(sq("a7")), Some(Piece::Pawn));
        assert_eq!(b.promoted, 0);
    }

    #[test]
    fn halfmove_clock_resets_on_pawn_moves_and_captures() {
        let mut b = Board::new();
        b.make(mv("g1f3"));
        assert_eq!(b.halfmove_clock, 1);
        b.make(mv("e7e5"));
        assert_eq!(b.halfmove_clock, 0);
        assert_eq!(b.fullmove_number, 2);
    }

    #[test]
    fn null_move_round_trip_touches_turn_and_ep_only() {
        let mut b = fen("rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3");
        let before = b.clone();
        b.push_null();
        assert_eq!(b.side_to_move, Color::Black);
        assert_eq!(b.en_passant, None);
        assert_eq!(b.halfmove_clock, before.halfmove_clock + 1);
        b.pop_null();
        assert_eq!(b, before);
    }
}
