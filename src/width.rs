//! Bit widths, and choosing the smallest one a block can be packed with.

use std::fmt;

use crate::delta::DeltaEncoder;
use crate::error::PackError;
use crate::vector::{U32x4, LANES};
use crate::{ChainState, BLOCK_LEN};

/// Number of bits every code of a block is stored with. Always in `0..=32`.
///
/// A block packed with width `b` takes exactly `b` 128-bit words (`4*b` u32 words).
/// ```rust
/// use simdpack::BitWidth;
/// let w = BitWidth::new(9).unwrap();
/// assert_eq!(w.word_count(), 36);
/// assert_eq!(w.byte_len(), 144);
/// assert!(BitWidth::new(33).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BitWidth(u8);

impl BitWidth {
    /// Constant blocks: nothing is stored.
    pub const ZERO: BitWidth = BitWidth(0);
    /// Raw blocks: values are stored as is, without differences.
    pub const MAX: BitWidth = BitWidth(32);

    /// Checks that `bits` is a valid width.
    pub fn new(bits: u8) -> Result<Self, PackError> {
        if bits > 32 {
            return Err(PackError::InvalidWidth(bits));
        }
        Ok(BitWidth(bits))
    }

    /// the number of bits
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Size of a packed block in u32 words.
    pub const fn word_count(self) -> usize {
        LANES * self.0 as usize
    }

    /// Size of a packed block in bytes.
    pub const fn byte_len(self) -> usize {
        4 * self.word_count()
    }

    /// The smallest width a block can be packed with, given the chain state it follows.
    /// Same as [`max_bits`].
    pub fn for_block(seed: ChainState, values: &[u32; BLOCK_LEN]) -> Self {
        max_bits(seed, values)
    }

    /// mask of the lowest `self` bits
    pub(crate) const fn mask(self) -> u32 {
        low_mask(self.0 as u32)
    }

    /// can `code` be stored with this width without truncation
    pub(crate) const fn fits(self, code: u32) -> bool {
        code & !self.mask() == 0
    }

    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<u8> for BitWidth {
    type Error = PackError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        BitWidth::new(bits)
    }
}

impl From<BitWidth> for u8 {
    fn from(w: BitWidth) -> u8 {
        w.0
    }
}

impl fmt::Display for BitWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// mask of the lowest `bits` bits, `bits` in `0..=32`
pub(crate) const fn low_mask(bits: u32) -> u32 {
    if bits == 0 {
        0
    } else {
        u32::MAX >> (32 - bits)
    }
}

/// number of significant bits of x
fn bits_needed(x: u32) -> u8 {
    (u32::BITS - x.leading_zeros()) as u8
}

/// The minimal width such that every difference of the block (against `seed` for the
/// first element) fits.
///
/// Zero iff all values equal `seed`, 32 if any difference needs all bits.
/// Packing with this width satisfies the precondition of the unmasked packer.
/// ```rust
/// use simdpack::{max_bits, BLOCK_LEN};
/// let values: [u32; BLOCK_LEN] = std::array::from_fn(|i| i as u32);
/// assert_eq!(max_bits(0, &values).get(), 1);
/// // the first difference is 0 - 5, which wraps around
/// assert_eq!(max_bits(5, &values).get(), 32);
/// ```
pub fn max_bits(seed: ChainState, values: &[u32; BLOCK_LEN]) -> BitWidth {
    let mut deltas = DeltaEncoder::new(seed);
    let mut accumulator = U32x4::splat(0);
    for chunk in values.chunks_exact(LANES) {
        accumulator = accumulator | deltas.transform(U32x4::load(chunk));
    }
    BitWidth(bits_needed(accumulator.or_lanes()))
}

/// The minimal width holding each of the (plain, not differenced) `values`.
pub fn max_bits_raw(values: &[u32]) -> BitWidth {
    BitWidth(bits_needed(values.iter().fold(0, |acc, &v| acc | v)))
}
