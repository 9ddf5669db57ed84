//! Seeded random source for optimization runs
//!
//! Every random decision of a run goes through these helpers so the sequence
//! of draws depends only on the seed and on the order of decisions.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

/// Generator used by [`crate::run_optimization`].
pub type EngineRng = Xoshiro256PlusPlus;

/// Seed the engine generator from a signed seed (bit pattern preserved).
pub fn seeded(seed: i64) -> EngineRng {
    Xoshiro256PlusPlus::seed_from_u64(seed as u64)
}

/// Uniform draw in `[0, upper)`.
pub fn draw_below<R: Rng>(rng: &mut R, upper: f64) -> f64 {
    rng.random::<f64>() * upper
}

/// Draw in `[0, constant)` and report whether it fell below 1.
///
/// With `constant >= 1` this happens with probability `1 / constant`; with
/// smaller constants it always happens.
pub fn draw_hits<R: Rng>(rng: &mut R, constant: f64) -> bool {
    draw_below(rng, constant) < 1.0
}

/// Uniform index in `0..len`. `len` must be non-zero.
pub fn pick_index<R: Rng>(rng: &mut R, len: usize) -> usize {
    debug_assert!(len > 0);
    rng.random_range(0..len)
}
