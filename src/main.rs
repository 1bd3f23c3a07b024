//! Rough throughput numbers: packing sorted random ids, block by block and as a sequence.
//!
//! `RUST_LOG=debug` shows what the sequence layer did.
use std::time::Instant;

use log::info;
use rand::distributions::Distribution;
use rand_distr::Geometric;
use simdpack::{max_bits, pack_without_mask, sequence, unpack, BitWidth, BLOCK_LEN};

/// runs all measurements
pub fn main() {
    env_logger::init();
    let n = 10_000_000;

    let ids = random_sorted_ids(n, 0.01);

    let now = Instant::now();
    let encoded = sequence::encode(ids.iter().copied());
    let elapsed_time = now.elapsed();
    println!("sequence::encode\t\t {} in {:?}", encoded.len(), elapsed_time);
    info!(
        "{} values in {} bytes, {:.2} bits per value",
        encoded.len(),
        encoded.compressed_bytes(),
        (8 * encoded.compressed_bytes()) as f64 / encoded.len() as f64
    );

    let now = Instant::now();
    let decoded = sequence::decode(&encoded);
    let elapsed_time = now.elapsed();
    println!("sequence::decode\t\t {} in {:?}", decoded.len(), elapsed_time);
    assert_eq!(decoded, ids);

    // the raw kernels, one width at a time
    for bits in [1_u8, 4, 7, 13, 20, 31, 32] {
        let width = BitWidth::new(bits).expect("valid width");
        let blocks = blocks_of_width(&ids, width);
        let mut packed = vec![0_u32; width.word_count()];
        let mut out = [0_u32; BLOCK_LEN];

        let now = Instant::now();
        let mut checksum = 0_u32;
        for (seed, block) in &blocks {
            let chain = pack_without_mask(*seed, block, &mut packed, bits).expect("valid width");
            let chain_out = unpack(*seed, &packed, &mut out, bits).expect("valid width");
            assert_eq!(chain, chain_out);
            checksum = checksum.wrapping_add(out[0]);
        }
        let elapsed_time = now.elapsed();
        println!(
            "pack+unpack {:2} bits\t\t {} in {:?} (checksum {})",
            bits,
            blocks.len() * BLOCK_LEN,
            elapsed_time,
            checksum
        );
    }
}

/// ids with geometrically distributed gaps (mean 1/p)
fn random_sorted_ids(n: usize, p: f64) -> Vec<u32> {
    let data_dist = Geometric::new(p).unwrap();
    let mut rng = rand::thread_rng();
    let mut id = 0_u32;
    let mut data: Vec<u32> = Vec::with_capacity(n);
    for _ in 0..n {
        id = id.wrapping_add(data_dist.sample(&mut rng) as u32);
        data.push(id);
    }
    data
}

/// the blocks of `ids` (with their chain states) that fit into `width`
fn blocks_of_width(ids: &[u32], width: BitWidth) -> Vec<(u32, [u32; BLOCK_LEN])> {
    let mut chain = 0;
    let mut blocks = Vec::new();
    for chunk in ids.chunks_exact(BLOCK_LEN) {
        let block: [u32; BLOCK_LEN] = chunk.try_into().unwrap();
        if max_bits(chain, &block) <= width {
            blocks.push((chain, block));
        }
        chain = block[BLOCK_LEN - 1];
    }
    blocks
}
