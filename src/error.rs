//! The error type of the crate.
//!
//! The per-block kernels themselves cannot fail; everything here is detected once, at the
//! boundary (bit widths, buffer sizes, indices, stored sequences).

use thiserror::Error;

/// Everything that can go wrong when calling into the codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PackError {
    /// A bit width outside `0..=32`.
    #[error("bit width {0} is out of range, expected 0..=32")]
    InvalidWidth(u8),

    /// The packed buffer cannot hold a block of the given width.
    #[error("packed buffer of {actual} words is too small for bit width {width} (needs {needed})")]
    BufferTooSmall {
        /// bit width of the block
        width: u8,
        /// words required: 4 per bit
        needed: usize,
        /// words available
        actual: usize,
    },

    /// An element index outside the 128-element block.
    #[error("index {0} is outside of the 128-element block")]
    IndexOutOfRange(usize),

    /// An in-place update would need a difference that doesn't fit the block's width.
    #[error("difference {delta} does not fit into {width} bits")]
    DoesNotFit {
        /// the difference that would have to be stored
        delta: u32,
        /// bit width of the block
        width: u8,
    },

    /// A stored sequence has the wrong number of blocks for its length.
    #[error("a sequence of {len} values needs {expected} blocks, got {actual}")]
    BlockCount {
        /// number of values in the sequence
        len: usize,
        /// blocks needed for `len` values
        expected: usize,
        /// block widths given
        actual: usize,
    },

    /// Fewer packed words than the block widths account for.
    #[error("packed words truncated: the block widths need {expected} words, got {actual}")]
    Truncated {
        /// words the block widths account for
        expected: usize,
        /// words given
        actual: usize,
    },

    /// More packed words than the block widths account for.
    #[error("{actual} packed words given, but the block widths only account for {expected}")]
    TrailingWords {
        /// words the block widths account for
        expected: usize,
        /// words given
        actual: usize,
    },
}
