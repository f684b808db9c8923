use crate::board::Piece;
use crate::square::Square;
use arrayvec::ArrayVec;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

/// A move is just the two squares plus an optional promotion piece.
/// Castling is the two-square king move; en passant is the pawn move onto
/// the EP target square. What kind of move it is in context is the
/// generator's business (`MoveKind`), not the move's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Piece>,
}

impl Move {
    #[inline(always)]
    pub const fn new(from: Square, to: Square) -> Self {
        Move {
            from,
            to,
            promotion: None,
        }
    }

    #[inline(always)]
    pub const fn promotion(from: Square, to: Square, piece: Piece) -> Self {
        Move {
            from,
            to,
            promotion: Some(piece),
        }
    }

    /// The null move: a pass, distinct from every legal move.
    #[inline(always)]
    pub const fn null() -> Self {
        Move {
            from: Square::A1,
            to: Square::A1,
            promotion: None,
        }
    }

    #[inline(always)]
    pub fn is_null(self) -> bool {
        self.from == self.to
    }

    /// Long-algebraic form, e.g. `e2e4`, `e7e8q`.
    pub fn to_uci(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(promo) = self.promotion {
            let c = match promo {
                Piece::Knight => 'n',
                Piece::Bishop => 'b',
                Piece::Rook => 'r',
                Piece::Queen => 'q',
                _ => '?',
            };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

impl FromStr for Move {
    type Err = ();

    /// Parses coordinate notation without consulting a position; the caller
    /// still has to match the result against the legal moves.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.is_ascii() || !(4..=5).contains(&s.len()) {
            return Err(());
        }
        let from: Square = s[0..2].parse()?;
        let to: Square = s[2..4].parse()?;
        let promotion = match s.as_bytes().get(4) {
            None => None,
            Some(b'n') => Some(Piece::Knight),
            Some(b'b') => Some(Piece::Bishop),
            Some(b'r') => Some(Piece::Rook),
            Some(b'q') => Some(Piece::Queen),
            Some(_) => return Err(()),
        };
        Ok(Move {
            from,
            to,
            promotion,
        })
    }
}

/// Tag the generator attaches to each move it yields. Consumed by the
/// search for ordering and pruning decisions, never stored anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    /// Injected by the ordering layer (TT, PV, killer moves).
    Custom,
    Capture,
    Promotion,
    Check,
    Other,
}

/// Growable move sink; lets generation fill either a heap `Vec` or a
/// stack `ArrayVec` without generic noise at every call site.
pub trait MoveBuffer: Deref<Target = [Move]> + DerefMut {
    fn push(&mut self, mv: Move);
    fn clear(&mut self);
}

impl MoveBuffer for Vec<Move> {
    fn push(&mut self, mv: Move) {
        Vec::push(self, mv);
    }
    fn clear(&mut self) {
        Vec::clear(self);
    }
}

impl<const N: usize> MoveBuffer for ArrayVec<Move, N> {
    fn push(&mut self, mv: Move) {
        ArrayVec::push(self, mv);
    }
    fn clear(&mut self) {
        ArrayVec::clear(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uci_round_trip() {
        for s in ["e2e4", "a7a8q", "h7h8n", "e1g1"] {
            let mv: Move = s.parse().unwrap();
            assert_eq!(mv.to_uci(), s);
        }
    }

    #[test]
    fn null_move_is_distinct() {
        let null = Move::null();
        assert!(null.is_null());
        let real: Move = "e2e4".parse().unwrap();
        assert!(!real.is_null());
        assert_ne!(null, real);
    }

    #[test]
    fn rejects_garbage() {
        assert!("e2".parse::<Move>().is_err());
        assert!("e2e9".parse::<Move>().is_err());
        assert!("e7e8k".parse::<Move>().is_err());
    }
}
