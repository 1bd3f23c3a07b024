//! Random test data shared by the unit tests.

use rand::{distributions::Uniform, prelude::Distribution, rngs::StdRng, Rng, SeedableRng};

use crate::width::low_mask;
use crate::BLOCK_LEN;

/// fixed seed, so that failures can be reproduced
pub(crate) fn rng() -> StdRng {
    StdRng::seed_from_u64(0x5EED_B10C)
}

/// A block whose widest difference (against `seed`) needs exactly `bits` bits.
///
/// * `bits == 0`: every value equals `seed`
/// * `bits == 32`: arbitrary values, the differences don't matter
/// * otherwise: random differences below `2^bits`, one of them at the maximum
pub(crate) fn random_block(rng: &mut StdRng, seed: u32, bits: u8) -> [u32; BLOCK_LEN] {
    match bits {
        0 => [seed; BLOCK_LEN],
        32 => {
            let mut values: [u32; BLOCK_LEN] = std::array::from_fn(|_| rng.gen());
            // make sure some difference really needs the top bit
            values[BLOCK_LEN / 2] = values[BLOCK_LEN / 2 - 1].wrapping_add(1 << 31);
            values
        }
        _ => {
            let deltas = random_deltas(rng, bits);
            let mut prev = seed;
            deltas.map(|d| {
                prev = prev.wrapping_add(d);
                prev
            })
        }
    }
}

/// Sorted block (no wraparound) whose widest difference needs exactly `bits` bits, `bits` in `1..32`.
pub(crate) fn sorted_block(rng: &mut StdRng, seed: u32, bits: u8) -> [u32; BLOCK_LEN] {
    let max_delta = low_mask(bits as u32);
    // keep the sum of all differences below 2^32 - seed
    let cap = max_delta.min(((u32::MAX - seed) - max_delta) / BLOCK_LEN as u32);
    let dist = Uniform::from(0..=cap);
    let big = rng.gen_range(0..BLOCK_LEN);
    let mut prev = seed;
    std::array::from_fn(|i| {
        let d = if i == big { max_delta } else { dist.sample(rng) };
        prev += d;
        prev
    })
}

/// differences below `2^bits`, one of them equal to `2^bits - 1`
fn random_deltas(rng: &mut StdRng, bits: u8) -> [u32; BLOCK_LEN] {
    let max_delta = low_mask(bits as u32);
    let dist = Uniform::from(0..=max_delta);
    let mut deltas: [u32; BLOCK_LEN] = std::array::from_fn(|_| dist.sample(rng));
    deltas[rng.gen_range(0..BLOCK_LEN)] = max_delta;
    deltas
}
