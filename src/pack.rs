//! Packing and unpacking of one 128-element block, and the dispatch from a runtime width
//! to the kernel specialized for it.
//!
//! # Layout
//! The block is read as 32 vectors of 4 consecutive values. Each of the 4 lanes owns its
//! own bitstream (lane `l` holds elements `l, l+4, l+8, ...`), filled least significant
//! bit first; packed vector-word `k` holds word `k` of each lane's bitstream:
//! ```bash,no_run
//! element:  0  1  2  3 | 4  5  6  7 | ...       (b bits each, differences)
//! lane:     0  1  2  3 | 0  1  2  3 | ...
//! word k of lane l  ->  packed[4*k + l]
//! ```
//! A field that doesn't fit in the rest of a word spills its high bits into the same lane
//! of the next vector-word. Widths dividing 32 never spill.
//!
//! Width 0 stores nothing (constant blocks), width 32 stores the values as they are,
//! *without* taking differences first (a difference of two u32 may need 33 bits).
//!
//! Each width is a separate instantiation of the const-generic kernels below, so the
//! shift schedule is known at compile time; the dispatch tables just list all 33 of them.

use crate::delta::{DeltaEncoder, PrefixSum};
use crate::error::PackError;
use crate::vector::{U32x4, LANES};
use crate::width::{low_mask, BitWidth};
use crate::{ChainState, BLOCK_LEN};

/// vectors in a block
const VECTORS: usize = BLOCK_LEN / LANES;

/// What to do with differences wider than the block's bit width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaskPolicy {
    /// Truncate each difference to the bit width before packing.
    #[default]
    Masked,
    /// Trust the caller that every difference fits (e.g. the width came from
    /// [`crate::max_bits`]). Faster; a difference that doesn't fit corrupts its neighbours.
    Unmasked,
}

pub(crate) type PackFn = fn(ChainState, &[u32; BLOCK_LEN], &mut [u32]) -> ChainState;
pub(crate) type UnpackFn = fn(ChainState, &[u32], &mut [u32; BLOCK_LEN]) -> ChainState;

/// Packs the block with `B` bits per value into `output[..4*B]`.
/// Returns the outgoing chain state, the last value of the block.
#[inline(always)]
fn pack_block<const B: u32, const MASKED: bool>(
    seed: ChainState,
    input: &[u32; BLOCK_LEN],
    output: &mut [u32],
) -> ChainState {
    match B {
        0 => {}
        32 => output[..BLOCK_LEN].copy_from_slice(input),
        _ => pack_deltas::<B, MASKED>(seed, input, &mut output[..B as usize * LANES]),
    }
    input[BLOCK_LEN - 1]
}

#[inline(always)]
fn pack_deltas<const B: u32, const MASKED: bool>(seed: ChainState, input: &[u32; BLOCK_LEN], output: &mut [u32]) {
    let mask = U32x4::splat(low_mask(B));
    let mut deltas = DeltaEncoder::new(seed);
    let mut accumulator = U32x4::splat(0);
    let mut emitted = 0;

    for i in 0..VECTORS {
        // bits of the current output word already taken
        let offset = (i as u32 * B) % 32;
        let mut delta = deltas.transform(U32x4::load(&input[i * LANES..]));
        if MASKED {
            delta = delta & mask;
        } else {
            debug_assert!(
                delta.or_lanes() <= low_mask(B),
                "difference {:?} does not fit into {} bits",
                delta,
                B
            );
        }

        accumulator = if offset == 0 { delta } else { accumulator | delta.shl(offset) };

        if offset + B >= 32 {
            accumulator.store(&mut output[emitted * LANES..]);
            emitted += 1;
            if offset + B > 32 {
                // high bits that didn't make it into the word start the next one
                accumulator = delta.shr(32 - offset);
            }
        }
    }
    debug_assert_eq!(emitted, B as usize);
}

/// Unpacks a block packed with `B` bits from `input[..4*B]`.
/// Returns the outgoing chain state, the last value of the block.
#[inline(always)]
fn unpack_block<const B: u32>(seed: ChainState, input: &[u32], output: &mut [u32; BLOCK_LEN]) -> ChainState {
    match B {
        0 => {
            output.fill(seed);
            seed
        }
        32 => {
            output.copy_from_slice(&input[..BLOCK_LEN]);
            output[BLOCK_LEN - 1]
        }
        _ => unpack_deltas::<B>(seed, &input[..B as usize * LANES], output),
    }
}

#[inline(always)]
fn unpack_deltas<const B: u32>(seed: ChainState, input: &[u32], output: &mut [u32; BLOCK_LEN]) -> ChainState {
    let mask = U32x4::splat(low_mask(B));
    let mut sum = PrefixSum::new(seed);
    let mut consumed = 0;
    let mut word = U32x4::load(input);

    for i in 0..VECTORS {
        let offset = (i as u32 * B) % 32;
        let mut delta = word.shr(offset);
        // the last field always ends exactly at the end of the last word
        if offset + B >= 32 && i + 1 < VECTORS {
            consumed += 1;
            word = U32x4::load(&input[consumed * LANES..]);
            if offset + B > 32 {
                delta = delta | word.shl(32 - offset);
            }
        }
        sum.integrate(delta & mask).store(&mut output[i * LANES..]);
    }
    sum.chain_state()
}

fn pack_masked<const B: u32>(seed: ChainState, input: &[u32; BLOCK_LEN], output: &mut [u32]) -> ChainState {
    pack_block::<B, true>(seed, input, output)
}

fn pack_unmasked<const B: u32>(seed: ChainState, input: &[u32; BLOCK_LEN], output: &mut [u32]) -> ChainState {
    pack_block::<B, false>(seed, input, output)
}

fn unpack_width<const B: u32>(seed: ChainState, input: &[u32], output: &mut [u32; BLOCK_LEN]) -> ChainState {
    unpack_block::<B>(seed, input, output)
}

/// one entry per width, `table[b]` is the kernel for `b` bits
macro_rules! width_table {
    ($kernel:ident: $ty:ty) => {
        width_table!(@widths $kernel, $ty;
            0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15 16
            17 18 19 20 21 22 23 24 25 26 27 28 29 30 31 32)
    };
    (@widths $kernel:ident, $ty:ty; $($b:literal)*) => {
        [$($kernel::<$b> as $ty),*]
    };
}

static MASKED_PACKERS: [PackFn; 33] = width_table!(pack_masked: PackFn);
static UNMASKED_PACKERS: [PackFn; 33] = width_table!(pack_unmasked: PackFn);
static UNPACKERS: [UnpackFn; 33] = width_table!(unpack_width: UnpackFn);

/// the packing kernel for a (valid) width and policy
pub(crate) fn packer(width: BitWidth, policy: MaskPolicy) -> PackFn {
    match policy {
        MaskPolicy::Masked => MASKED_PACKERS[width.index()],
        MaskPolicy::Unmasked => UNMASKED_PACKERS[width.index()],
    }
}

/// the unpacking kernel for a (valid) width
pub(crate) fn unpacker(width: BitWidth) -> UnpackFn {
    UNPACKERS[width.index()]
}

/// checks the width and that `len` words can hold a block of it
fn check_buffer(width: u8, len: usize) -> Result<BitWidth, PackError> {
    let width = BitWidth::new(width)?;
    if len < width.word_count() {
        return Err(PackError::BufferTooSmall {
            width: width.get(),
            needed: width.word_count(),
            actual: len,
        });
    }
    Ok(width)
}

/// Packs a block of 128 values with `width` bits per difference into `output[..4*width]`,
/// truncating differences that don't fit.
///
/// `seed` is the last value of the previous block of the sequence (0 for the first).
/// Returns the chain state for the next block, `input[127]`.
///
/// # Errors
/// [`PackError::InvalidWidth`] if `width > 32`, [`PackError::BufferTooSmall`] if `output`
/// has fewer than `4*width` words.
///
/// # Example
/// ```rust
/// use simdpack::{pack, unpack, BLOCK_LEN};
/// let values: [u32; BLOCK_LEN] = std::array::from_fn(|i| i as u32);
/// let mut packed = [0_u32; 36];
/// let chain = pack(0, &values, &mut packed, 9).unwrap();
/// assert_eq!(chain, 127);
///
/// let mut decoded = [0; BLOCK_LEN];
/// assert_eq!(unpack(0, &packed, &mut decoded, 9).unwrap(), 127);
/// assert_eq!(decoded, values);
/// ```
pub fn pack(seed: ChainState, input: &[u32; BLOCK_LEN], output: &mut [u32], width: u8) -> Result<ChainState, PackError> {
    let width = check_buffer(width, output.len())?;
    Ok(packer(width, MaskPolicy::Masked)(seed, input, output))
}

/// Same as [`pack`], but without truncating the differences first.
///
/// Every difference must fit into `width` bits (use [`crate::max_bits`] to choose the width).
/// If one doesn't, its high bits corrupt the neighbouring codes; debug builds panic instead.
pub fn pack_without_mask(
    seed: ChainState,
    input: &[u32; BLOCK_LEN],
    output: &mut [u32],
    width: u8,
) -> Result<ChainState, PackError> {
    let width = check_buffer(width, output.len())?;
    Ok(packer(width, MaskPolicy::Unmasked)(seed, input, output))
}

/// Unpacks a block packed with `width` bits from `input[..4*width]`.
///
/// `seed` must be the chain state the block was packed with.
/// Returns the chain state for the next block, the last decoded value.
///
/// # Errors
/// [`PackError::InvalidWidth`] if `width > 32`, [`PackError::BufferTooSmall`] if `input`
/// has fewer than `4*width` words.
pub fn unpack(seed: ChainState, input: &[u32], output: &mut [u32; BLOCK_LEN], width: u8) -> Result<ChainState, PackError> {
    let width = check_buffer(width, input.len())?;
    Ok(unpacker(width)(seed, input, output))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::delta::delta_encode;
    use crate::max_bits;
    use crate::test_utils::{random_block, rng, sorted_block};
    use bitvec::prelude::*;
    use pretty_assertions::assert_eq;

    fn roundtrip(seed: u32, values: &[u32; BLOCK_LEN], width: u8, policy: MaskPolicy) -> [u32; BLOCK_LEN] {
        let mut packed = vec![0; 4 * width as usize];
        let chain = match policy {
            MaskPolicy::Masked => pack(seed, values, &mut packed, width),
            MaskPolicy::Unmasked => pack_without_mask(seed, values, &mut packed, width),
        }
        .unwrap();
        assert_eq!(chain, values[BLOCK_LEN - 1]);

        let mut decoded = [0; BLOCK_LEN];
        let chain_out = unpack(seed, &packed, &mut decoded, width).unwrap();
        assert_eq!(chain_out, decoded[BLOCK_LEN - 1]);
        decoded
    }

    /// packs the codes bit by bit, lane by lane
    fn reference_layout(codes: &[u32; BLOCK_LEN], width: usize) -> Vec<u32> {
        let mut packed = vec![0; LANES * width];
        for lane in 0..LANES {
            let mut stream: BitVec<u32, Lsb0> = BitVec::with_capacity(VECTORS * width);
            for code in codes.iter().skip(lane).step_by(LANES) {
                stream.extend_from_bitslice(&code.view_bits::<Lsb0>()[..width]);
            }
            for (k, word) in stream.as_raw_slice().iter().enumerate() {
                packed[k * LANES + lane] = *word;
            }
        }
        packed
    }

    #[test]
    fn test_roundtrip_every_width() {
        let mut rng = rng();
        for width in 0..=32 {
            for seed in [0, 1, 0xDEAD_BEEF] {
                let values = random_block(&mut rng, seed, width);
                assert_eq!(roundtrip(seed, &values, width, MaskPolicy::Masked), values, "masked, width {width}");
                assert_eq!(roundtrip(seed, &values, width, MaskPolicy::Unmasked), values, "unmasked, width {width}");
            }
        }
    }

    #[test]
    fn test_roundtrip_with_wider_width() {
        // any width at least as large as the minimal one works
        let mut rng = rng();
        let values = random_block(&mut rng, 7, 5);
        for width in 5..=32 {
            assert_eq!(roundtrip(7, &values, width, MaskPolicy::Unmasked), values);
        }
    }

    #[test]
    fn test_layout_matches_bit_by_bit_reference() {
        let mut rng = rng();
        for width in 1..32_u8 {
            let values = random_block(&mut rng, 3, width);
            let mut deltas = [0; BLOCK_LEN];
            delta_encode(3, &values, &mut deltas);

            let mut packed = vec![0; 4 * width as usize];
            pack(3, &values, &mut packed, width).unwrap();
            assert_eq!(packed, reference_layout(&deltas, width as usize), "width {width}");
        }
    }

    #[test]
    fn test_layout_matches_bitpacking_crate() {
        use bitpacking::{BitPacker, BitPacker4x};
        let bitpacker = BitPacker4x::new();
        let mut rng = rng();
        for width in 1..32_u8 {
            let seed = 100;
            let values = sorted_block(&mut rng, seed, width);
            assert_eq!(max_bits(seed, &values).get(), width);

            let mut theirs = vec![0_u8; 16 * width as usize];
            let n = bitpacker.compress_sorted(seed, &values, &mut theirs, width);
            assert_eq!(n, theirs.len());

            let mut packed = vec![0; 4 * width as usize];
            pack_without_mask(seed, &values, &mut packed, width).unwrap();
            let ours: Vec<u8> = packed.iter().flat_map(|w| w.to_le_bytes()).collect();
            assert_eq!(ours, theirs, "width {width}");
        }
    }

    #[test]
    fn test_mask_truncation() {
        let mut rng = rng();
        for width in 1..32_u8 {
            // all differences below 2^(width+1), so some don't fit
            let values = random_block(&mut rng, 0, width + 1);
            let decoded = roundtrip(0, &values, width, MaskPolicy::Masked);
            assert_ne!(decoded, values);

            // the result is the sequence of truncated differences
            let mut deltas = [0; BLOCK_LEN];
            delta_encode(0, &values, &mut deltas);
            let mut expected = deltas.map(|d| d & low_mask(width as u32));
            crate::delta::prefix_sum(0, &mut expected);
            assert_eq!(decoded, expected, "width {width}");
        }
    }

    #[test]
    fn test_mask_truncation_single_field() {
        // one difference of 2^b + 1 packed with b bits decodes as a difference of 1
        let width = 5;
        let mut values = [0_u32; BLOCK_LEN];
        for v in values[10..].iter_mut() {
            *v = 33;
        }
        let decoded = roundtrip(0, &values, width, MaskPolicy::Masked);
        assert_eq!(decoded[..10], [0; 10]);
        assert!(decoded[10..].iter().all(|&v| v == 1));
    }

    #[test]
    fn test_width_zero() {
        let values = [42; BLOCK_LEN];
        let mut packed: [u32; 0] = [];
        assert_eq!(pack(42, &values, &mut packed, 0), Ok(42));
        assert_eq!(pack_without_mask(42, &values, &mut packed, 0), Ok(42));

        // whatever is in the buffer, decoding broadcasts the seed
        let garbage = [0xFFFF_FFFF_u32; 8];
        let mut decoded = [0; BLOCK_LEN];
        assert_eq!(unpack(42, &garbage, &mut decoded, 0), Ok(42));
        assert_eq!(decoded, [42; BLOCK_LEN]);
    }

    #[test]
    fn test_width_zero_writes_nothing() {
        let values = [9; BLOCK_LEN];
        let mut packed = [7_u32; 8];
        pack(9, &values, &mut packed, 0).unwrap();
        assert_eq!(packed, [7; 8]);
    }

    #[test]
    fn test_width_32_identity() {
        let mut values: [u32; BLOCK_LEN] = std::array::from_fn(|i| (i as u32).wrapping_mul(0x9E37_79B9));
        values[0] = 0xFFFF_FFFF;
        values[1] = 0;
        values[2] = 1;
        values[3] = 0x8000_0000;

        let mut packed = [0; BLOCK_LEN];
        // no differences: the seed plays no role
        assert_eq!(pack(12345, &values, &mut packed, 32), Ok(values[127]));
        assert_eq!(packed, values);

        let mut decoded = [0; BLOCK_LEN];
        assert_eq!(unpack(999, &packed, &mut decoded, 32), Ok(values[127]));
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_chaining() {
        // two blocks of one sorted sequence, the chain state flows from one to the next
        let sequence: Vec<u32> = (0..256).map(|i| i * 3 + (i % 7)).collect();
        let first: [u32; BLOCK_LEN] = sequence[..BLOCK_LEN].try_into().unwrap();
        let second: [u32; BLOCK_LEN] = sequence[BLOCK_LEN..].try_into().unwrap();

        let w1 = max_bits(0, &first);
        let mut packed1 = vec![0; w1.word_count()];
        let chain1 = pack_without_mask(0, &first, &mut packed1, w1.get()).unwrap();
        assert_eq!(chain1, first[127]);

        let w2 = max_bits(chain1, &second);
        let mut packed2 = vec![0; w2.word_count()];
        let chain2 = pack_without_mask(chain1, &second, &mut packed2, w2.get()).unwrap();

        let mut decoded = Vec::new();
        let mut block = [0; BLOCK_LEN];
        let c = unpack(0, &packed1, &mut block, w1.get()).unwrap();
        assert_eq!(c, chain1);
        decoded.extend_from_slice(&block);
        let c = unpack(c, &packed2, &mut block, w2.get()).unwrap();
        assert_eq!(c, chain2);
        decoded.extend_from_slice(&block);

        assert_eq!(decoded, sequence);
    }

    #[test]
    fn test_one_bit_alternating() {
        // deltas 0,1,0,1,...
        let values: [u32; BLOCK_LEN] = std::array::from_fn(|i| 10 + (i as u32 / 2));
        assert_eq!(max_bits(10, &values).get(), 1);
        assert_eq!(roundtrip(10, &values, 1, MaskPolicy::Masked), values);
        assert_eq!(roundtrip(10, &values, 1, MaskPolicy::Unmasked), values);
    }

    #[test]
    fn test_nine_bits_counting() {
        let values: [u32; BLOCK_LEN] = std::array::from_fn(|i| i as u32);
        let mut packed = vec![0xAAAA_AAAA; 40];
        pack(0, &values, &mut packed, 9).unwrap();
        // exactly 9 vector-words are written, the rest is untouched
        assert_eq!(packed[36..], [0xAAAA_AAAA; 4]);

        let mut decoded = [0; BLOCK_LEN];
        unpack(0, &packed[..36], &mut decoded, 9).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_raw_width_wraparound() {
        let mut values = [5_u32; BLOCK_LEN];
        values[60] = 0xFFFF_FFFF;
        values[61] = 0;
        values[62] = 1;
        assert_eq!(roundtrip(0, &values, 32, MaskPolicy::Masked), values);
    }

    #[test]
    fn test_dividing_widths_have_no_carry() {
        // with widths dividing 32, the codes of a lane sit at fixed positions in its words
        for width in [1_u8, 2, 4, 8, 16] {
            let values: [u32; BLOCK_LEN] = std::array::from_fn(|i| i as u32);
            let mut packed = vec![0; 4 * width as usize];
            pack(u32::MAX, &values, &mut packed, width).unwrap();
            // first delta is 0 - (2^32 - 1) = 1, all others 1 as well
            let per_word = 32 / width as usize;
            let ones = (0..per_word).fold(0_u32, |acc, k| acc | (1 << (k * width as usize)));
            assert!(packed.iter().all(|&w| w == ones), "width {width}");
        }
    }

    #[test]
    fn test_invalid_width() {
        let values = [0; BLOCK_LEN];
        let mut buf = [0; BLOCK_LEN + 4];
        let mut out = [0; BLOCK_LEN];
        assert_eq!(pack(0, &values, &mut buf, 33), Err(PackError::InvalidWidth(33)));
        assert_eq!(pack_without_mask(0, &values, &mut buf, 200), Err(PackError::InvalidWidth(200)));
        assert_eq!(unpack(0, &buf, &mut out, 33), Err(PackError::InvalidWidth(33)));
    }

    #[test]
    fn test_buffer_too_small() {
        let values = [0; BLOCK_LEN];
        let mut buf = [0; 35];
        let expected = Err(PackError::BufferTooSmall { width: 9, needed: 36, actual: 35 });
        assert_eq!(pack(0, &values, &mut buf, 9), expected);
        assert_eq!(pack_without_mask(0, &values, &mut buf, 9), expected);
        let mut out = [0; BLOCK_LEN];
        assert_eq!(unpack(0, &buf, &mut out, 9), expected);
        // width 0 needs no buffer at all
        assert_eq!(unpack(3, &[], &mut out, 0), Ok(3));
    }

    #[test]
    fn test_tables_are_ordered() {
        // every table entry packs with its own width: the word count gives it away
        let values: [u32; BLOCK_LEN] = std::array::from_fn(|i| i as u32 * 2);
        for width in 2..=32_u8 {
            let w = BitWidth::new(width).unwrap();
            let mut packed = vec![0xFFFF_FFFF; BLOCK_LEN + 4];
            packer(w, MaskPolicy::Unmasked)(0, &values, &mut packed);
            assert_eq!(packed[w.word_count()..], vec![0xFFFF_FFFF; BLOCK_LEN + 4 - w.word_count()]);
            assert_ne!(packed[w.word_count() - 1], 0xFFFF_FFFF, "width {width}");
        }
    }
}
