//! Crate implementing integrated (delta) bit packing of blocks of 128 `u32`, using 128-bit
//! vector instructions (4 lanes of 32 bits).
//!
//! See [Decoding billions of integers per second through vectorization](https://arxiv.org/abs/1209.2137)
//! for the SIMD-BP128 scheme this follows.
//!
//! # Overview
//! The input is split into blocks of [`BLOCK_LEN`] = 128 values.
//! For each block, we store the differences between consecutive values, each using the
//! same number of bits `b` (0..=32). The first difference is taken against the last value
//! of the previous block, the "chain state", so sorted sequences (e.g. document ids) need
//! only a few bits per value.
//!
//! * `b = 0`: all values equal the chain state, nothing is stored
//! * `b = 1..=31`: the differences, `b` bits each, packed into `b` 128-bit words
//! * `b = 32`: the values themselves, no differences
//!
//! The packed block has no header: the width and the chain state have to be stored
//! (or recomputed) by the caller. [`PackedBlock`] and [`sequence`] do that bookkeeping.
//!
//! # Note
//! * The chain state is the only state: encode returns it, the caller passes it into the
//!   next block and into decoding. Blocks of one sequence have to be decoded in order;
//!   different sequences are completely independent.
//! * [`pack()`] truncates differences that don't fit; [`pack_without_mask`] skips that and
//!   requires them to fit, which [`max_bits`] guarantees.
//!
//! # Example
//! ```rust
//! use simdpack::{max_bits, pack_without_mask, unpack, BLOCK_LEN};
//! let ids: Vec<u32> = (0..256).map(|i| 1000 + 7 * i).collect();
//!
//! let mut chain = 0;
//! let mut stored = Vec::new();
//! for block in ids.chunks_exact(BLOCK_LEN) {
//!     let block: &[u32; BLOCK_LEN] = block.try_into().unwrap();
//!     let width = max_bits(chain, block);
//!     let mut packed = vec![0; width.word_count()];
//!     let next = pack_without_mask(chain, block, &mut packed, width.get()).unwrap();
//!     stored.push((chain, width, packed));
//!     chain = next;
//! }
//!
//! let mut decoded = [0; BLOCK_LEN];
//! let (seed, width, packed) = &stored[1];
//! unpack(*seed, packed, &mut decoded, width.get()).unwrap();
//! assert_eq!(decoded[..], ids[BLOCK_LEN..]);
//! ```
//!
//! # Memory layout
//! A block packed with `b` bits is exactly `4*b` u32 words. The block is read as 32
//! vectors of 4 consecutive values; lane `l` of every vector goes into the bitstream of
//! lane `l`, least significant bit first, and packed word `4*k + l` is word `k` of that
//! bitstream:
//! ```bash,no_run
//! element:  0  1  2  3 | 4  5  6  7 | 8 ...     (b bits each)
//! lane:     0  1  2  3 | 0  1  2  3 | 0 ...
//! ```
//! A code that doesn't fit into the rest of its word continues at the bottom of the same
//! lane in the next vector-word. This is the layout of SIMD-BP128's integrated packing;
//! serialized little-endian it matches the `bitpacking` crate's
//! `BitPacker4x::compress_sorted` byte for byte.
//!
//! # Performance
//! The packers are const-generic over the width, so each of the 33 widths (times masked /
//! unmasked) is its own function with a fixed shift schedule; a table maps the runtime
//! width to it. On `x86_64` the vectors are SSE2 registers, elsewhere (or with the
//! `portable` feature) arrays of 4 `u32` that the compiler vectorizes.
//!
//! Run `cargo run --release` for a rough throughput measurement, `cargo bench` for more.
#![deny(missing_docs)]
pub mod delta;
pub mod error;
pub mod sequence;
pub mod width;
mod access;
mod block;
mod pack;
mod vector;

#[cfg(test)]
mod test_utils;

pub use access::{code_at, select, set_code};
pub use block::PackedBlock;
pub use error::PackError;
pub use pack::{pack, pack_without_mask, unpack, MaskPolicy};
pub use width::{max_bits, max_bits_raw, BitWidth};

/// Number of values in a block.
pub const BLOCK_LEN: usize = 128;

/// The last value of the previous block of a sequence (0 before the first block).
pub type ChainState = u32;
