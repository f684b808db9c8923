pub mod attacks;
pub mod precompute;
pub mod search;
pub mod structs;

use once_cell::sync::OnceCell;
pub use structs::{MagicEntry, MagicTable, SliderTables};

use precompute::{MagicSeed, generate_slider_tables};

#[cfg(feature = "deterministic_magic")]
const MAGIC_SEED: MagicSeed = MagicSeed::Fixed(0x45);
#[cfg(not(feature = "deterministic_magic"))]
const MAGIC_SEED: MagicSeed = MagicSeed::Random;

#[cfg(feature = "load_magic")]
const MAGIC_TABLE_PATH: &str = "magic.bin";

#[cfg(feature = "load_magic")]
fn load_or_generate() -> SliderTables {
    if let Ok(bytes) = std::fs::read(MAGIC_TABLE_PATH)
        && let Ok(tables) = bincode::deserialize::<SliderTables>(&bytes)
    {
        return tables;
    }
    tracing::debug!("no magic table file, regenerating");
    let tables = generate_slider_tables(MAGIC_SEED).expect("magic table generation");
    if let Ok(bytes) = bincode::serialize(&tables) {
        let _ = std::fs::write(MAGIC_TABLE_PATH, bytes);
    }
    tables
}

/// Process-wide slider tables, built on first use and immutable after.
pub fn slider_tables() -> &'static SliderTables {
    static TABLES: OnceCell<SliderTables> = OnceCell::new();
    TABLES.get_or_init(|| {
        #[cfg(feature = "load_magic")]
        {
            load_or_generate()
        }
        #[cfg(not(feature = "load_magic"))]
        {
            generate_slider_tables(MAGIC_SEED).expect("magic table generation")
        }
    })
}

#[inline(always)]
pub fn rook_attacks(square: u8, blockers: u64) -> u64 {
    slider_tables().rook.attacks(square as usize, blockers)
}

#[inline(always)]
pub fn bishop_attacks(square: u8, blockers: u64) -> u64 {
    slider_tables().bishop.attacks(square as usize, blockers)
}

#[inline(always)]
pub fn queen_attacks(square: u8, blockers: u64) -> u64 {
    slider_tables().queen(square as usize, blockers)
}
