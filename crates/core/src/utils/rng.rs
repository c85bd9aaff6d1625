//! Seed derivation for reproducible parallel sampling.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Mixes a base seed with a stream index (SplitMix64 finalizer).
///
/// Each Monte Carlo path and optimizer restart draws from its own stream, so
/// results do not depend on how rayon schedules the work.
pub fn derive_seed(seed: u64, stream: u64) -> u64 {
    let mut z = seed ^ stream.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

pub fn stream_rng(seed: u64, stream: u64) -> StdRng {
    StdRng::seed_from_u64(derive_seed(seed, stream))
}
