//! Forward differences ("integrated" coding) and their inverse, the running sum.
//!
//! Both work on whole 4-lane vectors: the difference of a vector is taken against itself
//! shifted by one lane, with lane 0 borrowing the last lane of the previous vector
//! (or the seed, for the first vector of a block). Reconstruction does a 2-step
//! doubling scan inside the vector and adds the previous vector's last lane.
//!
//! # Example
//! ```rust
//! use simdpack::{delta::{delta_encode, prefix_sum}, BLOCK_LEN};
//! let values: [u32; BLOCK_LEN] = std::array::from_fn(|i| 100 + 3 * i as u32);
//! let mut deltas = [0; BLOCK_LEN];
//! let chain = delta_encode(100, &values, &mut deltas);
//! assert_eq!(deltas[0], 0);
//! assert!(deltas[1..].iter().all(|&d| d == 3));
//!
//! assert_eq!(prefix_sum(100, &mut deltas), chain);
//! assert_eq!(deltas, values);
//! ```

use crate::vector::{U32x4, LANES};
use crate::{ChainState, BLOCK_LEN};

/// Turns consecutive vectors of absolute values into vectors of differences.
/// Remembers the last vector it saw.
pub(crate) struct DeltaEncoder {
    previous: U32x4,
}

impl DeltaEncoder {
    pub(crate) fn new(seed: ChainState) -> Self {
        DeltaEncoder { previous: U32x4::splat(seed) }
    }

    #[inline(always)]
    pub(crate) fn transform(&mut self, current: U32x4) -> U32x4 {
        let delta = current - current.borrow_last_lane(self.previous);
        self.previous = current;
        delta
    }
}

/// Inverse of [`DeltaEncoder`]: accumulates difference vectors into absolute values.
pub(crate) struct PrefixSum {
    // last absolute value, broadcast into all lanes
    running: U32x4,
}

impl PrefixSum {
    pub(crate) fn new(seed: ChainState) -> Self {
        PrefixSum { running: U32x4::splat(seed) }
    }

    #[inline(always)]
    pub(crate) fn integrate(&mut self, delta: U32x4) -> U32x4 {
        let values = delta.prefix_sum() + self.running;
        self.running = values.broadcast_last();
        values
    }

    /// the last absolute value produced so far (the seed if nothing was integrated)
    pub(crate) fn chain_state(&self) -> ChainState {
        self.running.last_lane()
    }
}

/// Computes the forward differences of a block: `deltas[0] = values[0] - seed` and
/// `deltas[i] = values[i] - values[i-1]`, all modulo 2^32.
///
/// Returns the chain state for the next block, i.e. `values[127]`.
pub fn delta_encode(seed: ChainState, values: &[u32; BLOCK_LEN], deltas: &mut [u32; BLOCK_LEN]) -> ChainState {
    let mut encoder = DeltaEncoder::new(seed);
    for (src, dst) in values.chunks_exact(LANES).zip(deltas.chunks_exact_mut(LANES)) {
        encoder.transform(U32x4::load(src)).store(dst);
    }
    values[BLOCK_LEN - 1]
}

/// Turns a block of differences back into absolute values (in place), starting from `seed`.
/// Exact inverse of [`delta_encode`].
///
/// Returns the chain state for the next block, i.e. the last absolute value.
pub fn prefix_sum(seed: ChainState, values: &mut [u32; BLOCK_LEN]) -> ChainState {
    let mut sum = PrefixSum::new(seed);
    for chunk in values.chunks_exact_mut(LANES) {
        sum.integrate(U32x4::load(chunk)).store(chunk);
    }
    sum.chain_state()
}
