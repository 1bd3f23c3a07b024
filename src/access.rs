//! Reading and writing single elements of a packed block, without unpacking it.
//!
//! These follow the layout documented at the crate root: element `i` sits in lane `i % 4`,
//! at bit `(i / 4) * width` of that lane's bitstream.
//! The functions take the raw words, as stored; indices must be below 128 and `words` must
//! hold `4*width` words, or the slice indexing panics.

use crate::vector::LANES;
use crate::width::BitWidth;
use crate::ChainState;

/// physical word and bit offset of the code for `index`
fn locate(width: BitWidth, index: usize) -> (usize, u32) {
    let bit = (index / LANES) * width.get() as usize;
    ((bit / 32) * LANES + index % LANES, (bit % 32) as u32)
}

/// The packed code at `index`: a difference for widths 1..=31, the value itself for
/// width 32 and 0 for width 0.
pub fn code_at(words: &[u32], width: BitWidth, index: usize) -> u32 {
    let bits = width.get() as u32;
    match bits {
        0 => 0,
        32 => words[index],
        _ => {
            let (word, offset) = locate(width, index);
            let mut code = words[word] >> offset;
            if offset + bits > 32 {
                code |= words[word + LANES] << (32 - offset);
            }
            code & width.mask()
        }
    }
}

/// Overwrites the packed code at `index`, truncated to `width` bits. All other codes stay
/// as they are. A no-op for width 0.
pub fn set_code(words: &mut [u32], width: BitWidth, index: usize, code: u32) {
    let bits = width.get() as u32;
    match bits {
        0 => {}
        32 => words[index] = code,
        _ => {
            let mask = width.mask();
            let code = code & mask;
            let (word, offset) = locate(width, index);
            words[word] = (words[word] & !(mask << offset)) | (code << offset);
            if offset + bits > 32 {
                // the high bits live at the bottom of the same lane in the next word
                let spilled = 32 - offset;
                let high_mask = mask >> spilled;
                let next = &mut words[word + LANES];
                *next = (*next & !high_mask) | (code >> spilled);
            }
        }
    }
}

/// The absolute value at `index` of a block packed with chain state `seed`.
///
/// Sums the differences up to `index`, so it costs `O(index)`; decode the block if you need
/// many of them.
/// ```rust
/// use simdpack::{pack, select, BitWidth, BLOCK_LEN};
/// let values: [u32; BLOCK_LEN] = std::array::from_fn(|i| 5 * i as u32 + 1);
/// let mut packed = [0; 12];
/// pack(0, &values, &mut packed, 3).unwrap();
/// let width = BitWidth::new(3).unwrap();
/// assert_eq!(select(0, &packed, width, 0), 1);
/// assert_eq!(select(0, &packed, width, 100), 501);
/// ```
pub fn select(seed: ChainState, words: &[u32], width: BitWidth, index: usize) -> u32 {
    match width.get() {
        0 => seed,
        32 => words[index],
        _ => (0..=index).fold(seed, |acc, i| acc.wrapping_add(code_at(words, width, i))),
    }
}
