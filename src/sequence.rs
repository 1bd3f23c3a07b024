//! Sequences of any length, as a series of packed blocks.
//!
//! The input is chunked into blocks of 128; each block gets its own (minimal) width,
//! and the chain state runs from block to block, starting at 0.
//! A short last block is padded by repeating its last value (differences of 0, so
//! the padding costs no bits); [`decode`] drops it again.
//!
//! # Example
//! ```rust
//! use simdpack::sequence::{encode, decode};
//! let ids: Vec<u32> = (0..1000).map(|i| i * 3).collect();
//! let encoded = encode(ids.iter().copied());
//! assert_eq!(encoded.len(), 1000);
//! assert_eq!(encoded.num_blocks(), 8);
//! assert_eq!(decode(&encoded), ids);
//! ```
//!
//! # Memory layout
//! Nothing is stored besides the three parts of [`EncodedSequence`]:
//! - the number of values
//! - one width per block
//! - the packed words of all blocks, back to back: |4*w0|4*w1|4*w2|...|

use itertools::Itertools;
use log::{debug, trace};

use crate::error::PackError;
use crate::pack::{packer, unpacker, MaskPolicy};
use crate::width::{max_bits, BitWidth};
use crate::{ChainState, BLOCK_LEN};

/// An encoded sequence: its length, the width of every block and the packed words.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncodedSequence {
    len: usize,
    widths: Vec<BitWidth>,
    words: Vec<u32>,
}

impl EncodedSequence {
    /// Puts a sequence back together from its stored parts, checking that they agree.
    ///
    /// # Errors
    /// * [`PackError::InvalidWidth`] for a width above 32
    /// * [`PackError::BlockCount`] if there aren't exactly `ceil(len/128)` widths
    /// * [`PackError::Truncated`] / [`PackError::TrailingWords`] if `words` is shorter /
    ///   longer than the widths say
    pub fn from_parts(len: usize, widths: &[u8], words: Vec<u32>) -> Result<Self, PackError> {
        let widths = widths.iter().map(|&w| BitWidth::new(w)).collect::<Result<Vec<_>, _>>()?;

        let expected_blocks = len.div_ceil(BLOCK_LEN);
        if widths.len() != expected_blocks {
            return Err(PackError::BlockCount { len, expected: expected_blocks, actual: widths.len() });
        }

        let expected_words: usize = widths.iter().map(|w| w.word_count()).sum();
        if words.len() < expected_words {
            return Err(PackError::Truncated { expected: expected_words, actual: words.len() });
        }
        if words.len() > expected_words {
            return Err(PackError::TrailingWords { expected: expected_words, actual: words.len() });
        }
        Ok(EncodedSequence { len, widths, words })
    }

    /// number of values in the sequence
    pub fn len(&self) -> usize {
        self.len
    }

    /// true if the sequence has no values
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// number of blocks, the last one possibly padded
    pub fn num_blocks(&self) -> usize {
        self.widths.len()
    }

    /// the width of each block
    pub fn widths(&self) -> &[BitWidth] {
        &self.widths
    }

    /// the packed words of all blocks
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Size of the packed words plus one byte per block width.
    pub fn compressed_bytes(&self) -> usize {
        4 * self.words.len() + self.widths.len()
    }

    /// Iterates over the blocks: their width and their packed words.
    pub fn blocks(&self) -> impl Iterator<Item = (BitWidth, &[u32])> + '_ {
        self.widths.iter().scan(0, move |pos, &width| {
            let start = *pos;
            *pos += width.word_count();
            Some((width, &self.words[start..*pos]))
        })
    }
}

/// Encodes a sequence of any length.
///
/// Every block is packed with the smallest width holding its differences, so the
/// unmasked packers are safe to use.
pub fn encode(values: impl Iterator<Item = u32>) -> EncodedSequence {
    let mut encoded = EncodedSequence::default();
    let mut chain: ChainState = 0;
    let mut block = [0_u32; BLOCK_LEN];

    for chunk in &values.chunks(BLOCK_LEN) {
        let mut n = 0;
        for v in chunk {
            block[n] = v;
            n += 1;
        }
        // pad with the last value: differences of 0
        let last = block[n - 1];
        block[n..].fill(last);
        encoded.len += n;

        let width = max_bits(chain, &block);
        let start = encoded.words.len();
        encoded.words.resize(start + width.word_count(), 0);
        chain = packer(width, MaskPolicy::Unmasked)(chain, &block, &mut encoded.words[start..]);
        trace!("block {} packed with {} bits", encoded.widths.len(), width);
        encoded.widths.push(width);
    }

    debug!(
        "encoded {} values into {} blocks, {} words",
        encoded.len,
        encoded.widths.len(),
        encoded.words.len()
    );
    encoded
}

/// Decodes all values of an encoded sequence.
pub fn decode(encoded: &EncodedSequence) -> Vec<u32> {
    let mut values = Vec::with_capacity(encoded.num_blocks() * BLOCK_LEN);
    let mut chain: ChainState = 0;
    let mut block = [0_u32; BLOCK_LEN];

    for (width, words) in encoded.blocks() {
        chain = unpacker(width)(chain, words, &mut block);
        values.extend_from_slice(&block);
    }
    // truncate, the last block is padded
    values.truncate(encoded.len);
    values
}
