//! [`PackedBlock`]: one packed block together with the width it was packed with.

use std::fmt;

use crate::access::{select, set_code};
use crate::error::PackError;
use crate::pack::{packer, unpacker, MaskPolicy};
use crate::width::{max_bits, BitWidth};
use crate::{ChainState, BLOCK_LEN};

/// A block of 128 values, packed.
///
/// Keeps the width next to the words, so they can't get out of sync. The chain state
/// (the last value of the previous block) is still the caller's business.
///
/// # Example
/// ```rust
/// use simdpack::{PackedBlock, BLOCK_LEN};
/// let values: [u32; BLOCK_LEN] = std::array::from_fn(|i| 1000 + 2 * i as u32);
/// let (block, chain) = PackedBlock::encode(1000, &values);
/// assert_eq!(block.width().get(), 2);
/// assert_eq!(block.words().len(), 8);
/// assert_eq!(chain, values[127]);
///
/// let mut decoded = [0; BLOCK_LEN];
/// assert_eq!(block.decode(1000, &mut decoded), chain);
/// assert_eq!(decoded, values);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct PackedBlock {
    width: BitWidth,
    // only the first `width.word_count()` are used, the rest stays zero
    words: [u32; BLOCK_LEN],
}

impl PackedBlock {
    /// Packs `values` with the smallest width that holds all of their differences.
    /// Returns the block and the chain state for the next block.
    pub fn encode(seed: ChainState, values: &[u32; BLOCK_LEN]) -> (Self, ChainState) {
        let width = max_bits(seed, values);
        Self::encode_with(seed, values, width, MaskPolicy::Unmasked)
    }

    /// Packs `values` with the given width.
    ///
    /// With [`MaskPolicy::Unmasked`], every difference must fit into `width` (see
    /// [`crate::pack_without_mask`]).
    pub fn encode_with(
        seed: ChainState,
        values: &[u32; BLOCK_LEN],
        width: BitWidth,
        policy: MaskPolicy,
    ) -> (Self, ChainState) {
        let mut block = PackedBlock { width, words: [0; BLOCK_LEN] };
        let chain = packer(width, policy)(seed, values, &mut block.words);
        (block, chain)
    }

    /// Wraps words packed elsewhere (e.g. read from storage).
    ///
    /// # Errors
    /// `words` must be exactly `4*width` long: [`PackError::BufferTooSmall`] if it is
    /// shorter, [`PackError::TrailingWords`] if it is longer.
    pub fn from_words(width: BitWidth, words: &[u32]) -> Result<Self, PackError> {
        let needed = width.word_count();
        if words.len() < needed {
            return Err(PackError::BufferTooSmall { width: width.get(), needed, actual: words.len() });
        }
        if words.len() > needed {
            return Err(PackError::TrailingWords { expected: needed, actual: words.len() });
        }
        let mut block = PackedBlock { width, words: [0; BLOCK_LEN] };
        block.words[..needed].copy_from_slice(words);
        Ok(block)
    }

    /// the width the block is packed with
    pub fn width(&self) -> BitWidth {
        self.width
    }

    /// The packed words, `4*width` of them.
    pub fn words(&self) -> &[u32] {
        &self.words[..self.width.word_count()]
    }

    /// Unpacks all 128 values. `seed` must be the chain state the block was encoded with.
    /// Returns the chain state for the next block.
    pub fn decode(&self, seed: ChainState, output: &mut [u32; BLOCK_LEN]) -> ChainState {
        unpacker(self.width)(seed, self.words(), output)
    }

    /// The value at `index`, without unpacking the block.
    pub fn get(&self, seed: ChainState, index: usize) -> Result<u32, PackError> {
        check_index(index)?;
        Ok(select(seed, self.words(), self.width, index))
    }

    /// Replaces the value at `index` in place.
    ///
    /// Rewrites the differences to the previous and to the next value, so both have to fit
    /// into the block's width; the block is left unchanged if they don't.
    /// Returns the (possibly new) chain state of the block: changing the last value also
    /// changes what the next block was packed against.
    ///
    /// # Errors
    /// [`PackError::IndexOutOfRange`], or [`PackError::DoesNotFit`] if a new difference is
    /// too wide (for width 0: any value other than `seed`).
    /// ```rust
    /// use simdpack::{PackedBlock, PackError, BLOCK_LEN};
    /// let values: [u32; BLOCK_LEN] = std::array::from_fn(|i| 10 * i as u32);
    /// let (mut block, _) = PackedBlock::encode(0, &values); // 4 bits
    /// block.update(0, 5, 55).unwrap();
    /// assert_eq!(block.get(0, 5), Ok(55));
    /// assert_eq!(block.update(0, 5, 70), Err(PackError::DoesNotFit { delta: 30, width: 4 }));
    /// ```
    pub fn update(&mut self, seed: ChainState, index: usize, value: u32) -> Result<ChainState, PackError> {
        check_index(index)?;
        let width = self.width;
        let does_not_fit = |delta| PackError::DoesNotFit { delta, width: width.get() };

        match width {
            BitWidth::ZERO if value != seed => return Err(does_not_fit(value.wrapping_sub(seed))),
            BitWidth::ZERO => {}
            BitWidth::MAX => self.words[index] = value,
            _ => {
                let words = &mut self.words[..width.word_count()];
                let previous = if index == 0 { seed } else { select(seed, words, width, index - 1) };
                let delta = value.wrapping_sub(previous);
                if !width.fits(delta) {
                    return Err(does_not_fit(delta));
                }
                if index + 1 < BLOCK_LEN {
                    let next = select(seed, words, width, index + 1);
                    let next_delta = next.wrapping_sub(value);
                    if !width.fits(next_delta) {
                        return Err(does_not_fit(next_delta));
                    }
                    set_code(words, width, index + 1, next_delta);
                }
                set_code(words, width, index, delta);
            }
        }
        Ok(select(seed, self.words(), width, BLOCK_LEN - 1))
    }
}

fn check_index(index: usize) -> Result<(), PackError> {
    if index >= BLOCK_LEN {
        return Err(PackError::IndexOutOfRange(index));
    }
    Ok(())
}

impl fmt::Debug for PackedBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackedBlock")
            .field("width", &self.width)
            .field("words", &self.words())
            .finish()
    }
}
