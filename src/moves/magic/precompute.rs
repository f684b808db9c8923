//! Builds the magic tables: per square, enumerate every blocker subset of
//! the edge-excluded vision mask (carry-rippler), generate the reference
//! attack set for each, then search for a magic multiplier that indexes
//! them collision-free.

use crate::bitboard::{FILE_A, FILE_H, RANK_1, RANK_8};
use crate::moves::magic::attacks::{bishop_attacks_per_square, rook_attacks_per_square};
use crate::moves::magic::search::find_magic_number_for_square;
use crate::moves::magic::structs::{MagicEntry, MagicTable, SliderTables};
use rand::{RngCore, SeedableRng, rngs::StdRng};

#[derive(Debug, Clone, Copy)]
pub enum MagicSeed {
    Fixed(u64),
    Random,
}

fn make_rng(seed: MagicSeed) -> StdRng {
    match seed {
        MagicSeed::Fixed(s) => StdRng::seed_from_u64(s),
        MagicSeed::Random => {
            let mut bytes = [0u8; 32];
            rand::rng().fill_bytes(&mut bytes);
            StdRng::from_seed(bytes)
        }
    }
}

/// Squares whose occupancy never changes the attack set: the final square
/// of each ray. Edge ranks/files are stripped unless the piece sits on them.
fn edge_exclusion(square: usize) -> u64 {
    let rank_bb = 0xFFu64 << (square & !7);
    let file_bb = FILE_A << (square % 8);
    ((RANK_1 | RANK_8) & !rank_bb) | ((FILE_A | FILE_H) & !file_bb)
}

/// Carry-rippler enumeration of every subset of `mask`, the empty set first.
fn blocker_subsets(mask: u64) -> Vec<u64> {
    let mut subsets = Vec::with_capacity(1usize << mask.count_ones());
    let mut subset = 0u64;
    loop {
        subsets.push(subset);
        subset = subset.wrapping_sub(mask) & mask;
        if subset == 0 {
            break;
        }
    }
    subsets
}

fn build_entry<R: RngCore>(
    square: usize,
    mask: u64,
    reference: impl Fn(usize, u64) -> u64,
    rng: &mut R,
) -> Result<MagicEntry, String> {
    let blockers = blocker_subsets(mask);
    let attacks: Vec<u64> = blockers.iter().map(|&b| reference(square, b)).collect();
    let shift = 64 - mask.count_ones();

    let magic = find_magic_number_for_square(&blockers, &attacks, shift, rng)?;

    let mut table = vec![0u64; 1usize << mask.count_ones()];
    for (&blocker, &attack) in blockers.iter().zip(attacks.iter()) {
        let index = (blocker.wrapping_mul(magic) >> shift) as usize;
        table[index] = attack;
    }

    Ok(MagicEntry {
        magic,
        shift,
        mask,
        table: table.into_boxed_slice(),
    })
}

pub fn generate_slider_tables(seed: MagicSeed) -> Result<SliderTables, String> {
    let mut rng = make_rng(seed);

    let mut rook_entries = Vec::with_capacity(64);
    let mut bishop_entries = Vec::with_capacity(64);

    for square in 0..64 {
        let rook_mask = rook_attacks_per_square(square, 0) & !edge_exclusion(square);
        rook_entries.push(build_entry(
            square,
            rook_mask,
            rook_attacks_per_square,
            &mut rng,
        )?);

        let bishop_mask = bishop_attacks_per_square(square, 0) & !edge_exclusion(square);
        bishop_entries.push(build_entry(
            square,
            bishop_mask,
            bishop_attacks_per_square,
            &mut rng,
        )?);
    }

    Ok(SliderTables {
        rook: MagicTable {
            entries: rook_entries,
        },
        bishop: MagicTable {
            entries: bishop_entries,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rook_mask_excludes_edges_from_d4() {
        let mask = rook_attacks_per_square(27, 0) & !edge_exclusion(27);
        // d2..d7 + b4..g4, 10 relevant squares
        assert_eq!(mask.count_ones(), 10);
        assert_eq!(mask & (1 << 3), 0); // d1 gone
        assert_eq!(mask & (1 << 59), 0); // d8 gone
        assert_eq!(mask & (1 << 24), 0); // a4 gone
    }

    #[test]
    fn corner_rook_mask_keeps_own_lines() {
        let mask = rook_attacks_per_square(0, 0) & !edge_exclusion(0);
        // b1..g1 + a2..a7
        assert_eq!(mask.count_ones(), 12);
    }

    #[test]
    fn subset_count_matches_mask_bits() {
        let mask = 0b1011u64;
        let subsets = blocker_subsets(mask);
        assert_eq!(subsets.len(), 8);
        assert!(subsets.contains(&0));
        assert!(subsets.contains(&mask));
    }

    #[test]
    fn generated_tables_match_scan_reference() {
        let tables = generate_slider_tables(MagicSeed::Fixed(0x45)).expect("magic search");
        let probes = [
            (27usize, (1u64 << 19) | (1u64 << 35) | (1u64 << 41)),
            (0, (1u64 << 8) | (1u64 << 1)),
            (63, 1u64 << 54),
        ];
        for (sq, blockers) in probes {
            assert_eq!(
                tables.rook.attacks(sq, blockers),
                rook_attacks_per_square(sq, blockers),
                "rook mismatch on square {sq}"
            );
            assert_eq!(
                tables.bishop.attacks(sq, blockers),
                bishop_attacks_per_square(sq, blockers),
                "bishop mismatch on square {sq}"
            );
        }
    }
}
