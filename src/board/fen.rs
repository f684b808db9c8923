//! FEN parsing and writing. The loader validates each field and rejects
//! positions the engine must never be entered on.

use super::fen_tables::{CHAR_TO_PC, glyph};
use super::{Board, CASTLE_BK, CASTLE_BQ, CASTLE_WK, CASTLE_WQ, Color, Piece};
use crate::bitboard::{RANK_1, RANK_8};
use crate::square::Square;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FenError {
    /// Not exactly six whitespace-separated fields.
    FieldCount(usize),
    Placement(String),
    PieceCount(String),
    SideToMove(String),
    Castling(String),
    EnPassant(String),
    Clock(String),
}

impl fmt::Display for FenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FenError::FieldCount(n) => write!(f, "expected 6 FEN fields, got {}", n),
            FenError::Placement(s) => write!(f, "bad piece placement: {}", s),
            FenError::PieceCount(s) => write!(f, "impossible piece counts: {}", s),
            FenError::SideToMove(s) => write!(f, "bad side-to-move field: {}", s),
            FenError::Castling(s) => write!(f, "bad castling field: {}", s),
            FenError::EnPassant(s) => write!(f, "bad en-passant field: {}", s),
            FenError::Clock(s) => write!(f, "bad clock field: {}", s),
        }
    }
}

impl std::error::Error for FenError {}

impl Board {
    /// Replaces the position with the one described by `fen`.
    /// On error the board is left untouched.
    pub fn set_fen(&mut self, fen: &str) -> Result<(), FenError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(FenError::FieldCount(fields.len()));
        }

        let mut b = Board::new_empty();

        parse_placement(&mut b, fields[0])?;
        validate_piece_counts(&b)?;

        b.side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(FenError::SideToMove(other.to_string())),
        };

        b.castling_rights = parse_castling(&b, fields[2])?;
        b.en_passant = parse_en_passant(&b, fields[3])?;

        b.halfmove_clock = fields[4]
            .parse()
            .map_err(|_| FenError::Clock(fields[4].to_string()))?;
        b.fullmove_number = fields[5]
            .parse()
            .map_err(|_| FenError::Clock(fields[5].to_string()))?;

        b.piece_hash = b.compute_piece_hash_full();
        b.zobrist = b.compute_zobrist_full();
        b.undo_stack.clear();
        b.history.clear();

        *self = b;
        Ok(())
    }

    pub fn to_fen(&self) -> String {
        let mut out = String::with_capacity(90);

        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                let sq = Square::from_coords(rank, file);
                match self.piece_at(sq) {
                    Some((color, piece)) => {
                        if empty > 0 {
                            out.push((b'0' + empty) as char);
                            empty = 0;
                        }
                        out.push(glyph(piece, color));
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                out.push((b'0' + empty) as char);
            }
            if rank > 0 {
                out.push('/');
            }
        }

        out.push(' ');
        out.push(match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        });

        out.push(' ');
        if self.castling_rights == 0 {
            out.push('-');
        } else {
            for (flag, ch) in [
                (CASTLE_WK, 'K'),
                (CASTLE_WQ, 'Q'),
                (CASTLE_BK, 'k'),
                (CASTLE_BQ, 'q'),
            ] {
                if self.castling_rights & flag != 0 {
                    out.push(ch);
                }
            }
        }

        out.push(' ');
        match self.en_passant {
            Some(sq) => out.push_str(&sq.to_string()),
            None => out.push('-'),
        }

        out.push_str(&format!(" {} {}", self.halfmove_clock, self.fullmove_number));
        out
    }
}

fn parse_placement(b: &mut Board, field: &str) -> Result<(), FenError> {
    let ranks: Vec<&str> = field.split('/').collect();
    if ranks.len() != 8 {
        return Err(FenError::Placement(format!(
            "expected 8 ranks, got {}",
            ranks.len()
        )));
    }

    for (i, rank_str) in ranks.iter().enumerate() {
        let rank = 7 - i as u8;
        let mut file = 0u8;
        for ch in rank_str.chars() {
            if let Some(skip) = ch.to_digit(10) {
                if !(1..=8).contains(&skip) {
                    return Err(FenError::Placement(format!("bad skip digit {}", ch)));
                }
                file += skip as u8;
            } else {
                let entry = if (ch as usize) < 128 {
                    CHAR_TO_PC[ch as usize]
                } else {
                    None
                };
                let (piece, color) =
                    entry.ok_or_else(|| FenError::Placement(format!("unknown glyph {}", ch)))?;
                if file >= 8 {
                    return Err(FenError::Placement(format!("rank {} overflows", rank + 1)));
                }
                b.put_piece(Square::from_coords(rank, file), color, piece);
                file += 1;
            }
        }
        if file != 8 {
            return Err(FenError::Placement(format!(
                "rank {} has {} files",
                rank + 1,
                file
            )));
        }
    }
    Ok(())
}

fn validate_piece_counts(b: &Board) -> Result<(), FenError> {
    for color in [Color::White, Color::Black] {
        let kings = b.pieces(Piece::King, color).count_ones();
        if kings != 1 {
            return Err(FenError::PieceCount(format!(
                "{:?} has {} kings",
                color, kings
            )));
        }
        if b.pieces(Piece::Pawn, color).count_ones() > 8 {
            return Err(FenError::PieceCount(format!("{:?} has too many pawns", color)));
        }
        if b.occupancy(color).count_ones() > 16 {
            return Err(FenError::PieceCount(format!("{:?} has too many pieces", color)));
        }
    }
    if b.pawns & (RANK_1 | RANK_8) != 0 {
        return Err(FenError::PieceCount("pawn on a back rank".to_string()));
    }
    Ok(())
}

fn parse_castling(b: &Board, field: &str) -> Result<u64, FenError> {
    if field == "-" {
        return Ok(0);
    }

    let mut rights = 0u64;
    for ch in field.chars() {
        let (flag, king_home, rook_home, color) = match ch {
            'K' => (CASTLE_WK, Square::E1, Square::H1, Color::White),
            'Q' => (CASTLE_WQ, Square::E1, Square::A1, Color::White),
            'k' => (CASTLE_BK, Square::E8, Square::H8, Color::Black),
            'q' => (CASTLE_BQ, Square::E8, Square::A8, Color::Black),
            _ => return Err(FenError::Castling(format!("unknown flag {}", ch))),
        };
        if rights & flag != 0 {
            return Err(FenError::Castling(format!("duplicate flag {}", ch)));
        }
        if b.pieces(Piece::King, color) & king_home.bb() == 0 {
            return Err(FenError::Castling(format!(
                "{} set but the king is not on {}",
                ch, king_home
            )));
        }
        if b.pieces(Piece::Rook, color) & rook_home.bb() == 0 {
            return Err(FenError::Castling(format!(
                "{} set but no rook on {}",
                ch, rook_home
            )));
        }
        rights |= flag;
    }
    Ok(rights)
}

fn parse_en_passant(b: &Board, field: &str) -> Result<Option<Square>, FenError> {
    if field == "-" {
        return Ok(None);
    }

    let sq: Square = field
        .parse()
        .map_err(|_| FenError::EnPassant(field.to_string()))?;

    let (expected_rank, pusher_offset) = match b.side_to_move {
        // White to move: Black just double-pushed, EP target on rank 6.
        Color::White => (5, -8i8),
        Color::Black => (2, 8i8),
    };
    if sq.rank() != expected_rank {
        return Err(FenError::EnPassant(format!(
            "{} on the wrong rank for the side to move",
            sq
        )));
    }
    if b.occupied() & sq.bb() != 0 {
        return Err(FenError::EnPassant(format!("{} is occupied", sq)));
    }

    let pusher = Square::from_index((sq.index() as i8 + pusher_offset) as u8);
    if b.pieces(Piece::Pawn, b.side_to_move.opposite()) & pusher.bb() == 0 {
        return Err(FenError::EnPassant(format!(
            "no pawn behind the target on {}",
            pusher
        )));
    }

    Ok(Some(sq))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::START_FEN;

    #[test]
    fn start_position_round_trips() {
        let b = Board::from_fen(START_FEN).unwrap();
        assert_eq!(b.to_fen(), START_FEN);
        assert!(b.validate().is_ok());
    }

    #[test]
    fn error_leaves_board_untouched() {
        let mut b = Board::from_fen(START_FEN).unwrap();
        let before = b.clone();
        assert!(b.set_fen("this is not fen").is_err());
        assert_eq!(b, before);
    }

    #[test]
    fn rejects_missing_king() {
        let err = Board::from_fen("8/8/8/8/8/8/8/8 w - - 0 1").unwrap_err();
        assert!(matches!(err, FenError::PieceCount(_)));
    }

    #[test]
    fn rejects_castling_without_rook() {
        let err =
            Board::from_fen("rnbqkbn1/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap_err();
        assert!(matches!(err, FenError::Castling(_)));
    }

    #[test]
    fn rejects_ep_without_pusher() {
        let err =
            Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq d6 0 1").unwrap_err();
        assert!(matches!(err, FenError::EnPassant(_)));
    }

    #[test]
    fn accepts_valid_ep() {
        let b = Board::from_fen("rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3")
            .unwrap();
        assert_eq!(b.en_passant.unwrap().to_string(), "d6");
    }
}
