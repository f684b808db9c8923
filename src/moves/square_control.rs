//! Attack queries: who attacks a square, check detection, pin detection,
//! and the castling-path and en-passant safety tests.

use crate::board::{Board, Color, Piece};
use crate::moves::magic::{bishop_attacks, queen_attacks, rook_attacks};
use crate::moves::tables::{KING_ATTACKS, KNIGHT_ATTACKS, between, pawn_attacks};
use crate::square::Square;

/// Squares `piece` of `color` attacks from `square` given `blockers`.
pub fn attacks_from(piece: Piece, color: Color, square: u8, blockers: u64) -> u64 {
    let sq = square as usize;
    match piece {
        Piece::Pawn => pawn_attacks(square, color),
        Piece::Knight => KNIGHT_ATTACKS[sq],
        Piece::King => KING_ATTACKS[sq],
        Piece::Bishop => bishop_attacks(square, blockers),
        Piece::Rook => rook_attacks(square, blockers),
        Piece::Queen => queen_attacks(square, blockers),
    }
}

/// All pieces of `attacker` that attack `sq` under the given occupancy.
/// Passing a modified occupancy lets callers ask "would this square be
/// attacked if the king stepped away".
pub fn attackers_mask(board: &Board, attacker: Color, sq: Square, occupied: u64) -> u64 {
    let index = sq.index();

    // A pawn of `attacker` hits `sq` iff it stands where a defender-colored
    // pawn on `sq` would capture.
    let pawn_sources = pawn_attacks(index, attacker.opposite());

    let mut attackers = pawn_sources & board.pieces(Piece::Pawn, attacker);
    attackers |= KNIGHT_ATTACKS[index as usize] & board.pieces(Piece::Knight, attacker);
    attackers |= KING_ATTACKS[index as usize] & board.pieces(Piece::King, attacker);

    let rook_rays = rook_attacks(index, occupied);
    let bishop_rays = bishop_attacks(index, occupied);
    let queens = board.pieces(Piece::Queen, attacker);
    attackers |= rook_rays & (board.pieces(Piece::Rook, attacker) | queens);
    attackers |= bishop_rays & (board.pieces(Piece::Bishop, attacker) | queens);

    attackers
}

#[inline(always)]
pub fn is_square_attacked(board: &Board, sq: Square, attacker: Color) -> bool {
    attackers_mask(board, attacker, sq, board.occupied()) != 0
}

#[inline(always)]
pub fn in_check(board: &Board, side: Color) -> bool {
    is_square_attacked(board, board.king_square(side), side.opposite())
}

/// Enemy pieces currently giving check to `side`'s king.
#[inline(always)]
pub fn checkers_mask(board: &Board, side: Color) -> u64 {
    attackers_mask(
        board,
        side.opposite(),
        board.king_square(side),
        board.occupied(),
    )
}

/// Own pieces that are the sole shield between the king and an enemy
/// slider: moving one off its ray exposes the king.
pub fn slider_blockers(board: &Board, side: Color, king: Square) -> u64 {
    let enemy = side.opposite();
    let enemy_queens = board.pieces(Piece::Queen, enemy);
    let snipers = (rook_attacks(king.index(), 0) & (board.pieces(Piece::Rook, enemy) | enemy_queens))
        | (bishop_attacks(king.index(), 0)
            & (board.pieces(Piece::Bishop, enemy) | enemy_queens));

    let mut blockers = 0u64;
    let mut rest = snipers;
    while rest != 0 {
        let sniper = Square::from_index(crate::utils::pop_lsb(&mut rest));
        let shield = between(king, sniper) & board.occupied();
        if shield.count_ones() == 1 {
            blockers |= shield;
        }
    }
    blockers & board.occupancy(side)
}

/// Castling is legal only if the king's start, transit, and landing
/// squares are all unattacked (the rook path may be attacked).
pub fn castling_path_safe(board: &Board, color: Color, king_to: Square) -> bool {
    let opp = color.opposite();
    let path: [u8; 3] = match (color, king_to.index()) {
        (Color::White, 6) => [4, 5, 6],     // e1-f1-g1
        (Color::White, 2) => [4, 3, 2],     // e1-d1-c1
        (Color::Black, 62) => [60, 61, 62], // e8-f8-g8
        (Color::Black, 58) => [60, 59, 58], // e8-d8-c8
        _ => return false,
    };
    path.iter()
        .all(|&sq| !is_square_attacked(board, Square::from_index(sq), opp))
}

/// Would the king be attacked after this en-passant capture? Both the
/// moving pawn and the captured pawn leave their squares, which can open
/// a rank skewer no other move can.
pub fn ep_exposes_king(board: &Board, side: Color, from: Square, to: Square) -> bool {
    let captured = match side {
        Color::White => Square::from_index(to.index() - 8),
        Color::Black => Square::from_index(to.index() + 8),
    };
    let occupied_after = (board.occupied() ^ from.bb() ^ captured.bb()) | to.bb();

    let king = board.king_square(side);
    let enemy = side.opposite();
    let enemy_queens = board.pieces(Piece::Queen, enemy);

    let rook_hit = rook_attacks(king.index(), occupied_after)
        & (board.pieces(Piece::Rook, enemy) | enemy_queens);
    let bishop_hit = bishop_attacks(king.index(), occupied_after)
        & (board.pieces(Piece::Bishop, enemy) | enemy_queens);
    if (rook_hit | bishop_hit) != 0 {
        return true;
    }

    // Non-sliders: same as before except the captured pawn is gone.
    let pawn_sources = pawn_attacks(king.index(), side);
    if pawn_sources & (board.pieces(Piece::Pawn, enemy) & !captured.bb() & !to.bb()) != 0 {
        return true;
    }
    if KNIGHT_ATTACKS[king.index() as usize] & board.pieces(Piece::Knight, enemy) != 0 {
        return true;
    }
    KING_ATTACKS[king.index() as usize] & board.pieces(Piece::King, enemy) != 0
}
