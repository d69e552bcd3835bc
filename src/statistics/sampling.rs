//! Random sampling helpers.
//!
//! All randomness flows through caller-supplied generators so that runs can
//! be reproduced from a seed.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

/// Counter-based RNG seed generation using SplitMix64.
///
/// This is a stateless PRF that generates deterministic, well-distributed
/// seeds from a base seed and counter, so iteration `i` gets the same stream
/// whether it runs serially or on a worker thread.
#[inline]
pub fn counter_rng_seed(base_seed: u64, counter: u64) -> u64 {
    // SplitMix64, see https://xoshiro.di.unimi.it/splitmix64.c
    let mut z = base_seed.wrapping_add(counter.wrapping_mul(0x9e3779b97f4a7c15));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

/// Generator seeded from `seed`, or from the thread RNG when unset.
pub fn rng_from_seed(seed: Option<u64>) -> Xoshiro256PlusPlus {
    Xoshiro256PlusPlus::seed_from_u64(seed.unwrap_or_else(rand::random))
}

/// Draw `amount` distinct indices from `0..len`, uniformly at random.
///
/// Returns `None` if `amount > len`.
pub fn sample_without_replacement<R: Rng + ?Sized>(
    rng: &mut R,
    len: usize,
    amount: usize,
) -> Option<Vec<usize>> {
    (amount <= len).then(|| rand::seq::index::sample(rng, len, amount).into_vec())
}
