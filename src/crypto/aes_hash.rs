//! Correlation robust AES hash.
//!
//! This implementation of a correlation robust AES hash function
//! is based on the findings of <https://eprint.iacr.org/2019/074>.
use std::sync::LazyLock;

use aes::{
    Aes128,
    cipher::{BlockCipherEncrypt, KeyInit},
};

use crate::{block::Block, crypto::AES_PAR_BLOCKS};

/// AES accelerated hashing of [`Block`]s.
///
/// Keyed instances hash blinded shares before they are exchanged, the fixed key
/// instance [`FIXED_KEY_HASH`] derives the oblivious transfer pads.
#[derive(Clone)]
pub struct AesHash {
    aes: Aes128,
}

impl AesHash {
    /// Create a new `AesHash` keyed with `key`.
    pub fn new(key: Block) -> Self {
        Self {
            aes: Aes128::new(&key.into()),
        }
    }

    /// Compute the correlation robust hash of a block.
    ///
    /// Calculates `π(x) ^ x`.
    ///
    /// # Warning: only secure in semi-honest setting!
    /// See <https://eprint.iacr.org/2019/074> for details.
    pub fn cr_hash_block(&self, x: Block) -> Block {
        let mut x_enc = x.into();
        self.aes.encrypt_block(&mut x_enc);
        x ^ x_enc.into()
    }

    /// Correlation robust hash of a slice of blocks.
    ///
    /// Calculates `π(x) ^ x` in-place. Makes use of AES instruction-level
    /// parallelism.
    pub fn cr_hash_slice_mut(&self, x: &mut [Block]) {
        let mut tmp = [aes::Block::default(); AES_PAR_BLOCKS];

        for chunk in x.chunks_mut(AES_PAR_BLOCKS) {
            let enc = &mut tmp[..chunk.len()];
            for (dst, src) in enc.iter_mut().zip(chunk.iter()) {
                *dst = (*src).into();
            }
            self.aes.encrypt_blocks(enc);
            chunk
                .iter_mut()
                .zip(tmp)
                .for_each(|(x, x_enc)| *x ^= x_enc.into());
        }
    }

    /// Tweakable circular correlation robust hash function.
    ///
    /// Calculates `π(π(x) ^ tweak) ^ π(x)` for a single block. This is the TMMO
    /// function of <https://eprint.iacr.org/2019/074>.
    pub(crate) fn tccr_hash_block(&self, tweak: Block, x: Block) -> Block {
        let mut x_enc = x.into();
        self.aes.encrypt_block(&mut x_enc);
        let mut x_enc_xor_tweak_enc = (Block::from(x_enc) ^ tweak).into();
        self.aes.encrypt_block(&mut x_enc_xor_tweak_enc);

        Block::from(x_enc_xor_tweak_enc) ^ Block::from(x_enc)
    }

    /// Tweakable circular correlation robust hash of a slice.
    ///
    /// Calculates `π(π(x) ^ tweak(i)) ^ π(x)` in-place where `i` is the index of the
    /// block in `x`. Equal to calling [`AesHash::tccr_hash_block`] on every element.
    pub(crate) fn tccr_hash_slice_mut(
        &self,
        x: &mut [Block],
        mut tweak_fn: impl FnMut(usize) -> Block,
    ) {
        let mut tmp = [aes::Block::default(); AES_PAR_BLOCKS];
        for (chunk_idx, chunk) in x.chunks_mut(AES_PAR_BLOCKS).enumerate() {
            // π(x)
            let enc = &mut tmp[..chunk.len()];
            for (dst, src) in enc.iter_mut().zip(chunk.iter()) {
                *dst = (*src).into();
            }
            self.aes.encrypt_blocks(enc);
            // π(x) ^ tweak(i)
            chunk
                .iter_mut()
                .zip(&tmp)
                .enumerate()
                .for_each(|(idx, (dest, x_enc))| {
                    *dest = Block::from(*x_enc) ^ tweak_fn(chunk_idx * AES_PAR_BLOCKS + idx);
                });
            // π(π(x) ^ tweak(i)) ^ π(x)
            for (dest, x_enc) in chunk.iter_mut().zip(tmp) {
                let mut b = (*dest).into();
                self.aes.encrypt_block(&mut b);
                *dest = Block::from(b) ^ Block::from(x_enc);
            }
        }
    }
}

/// An `AesHash` with a fixed key.
pub(crate) static FIXED_KEY_HASH: LazyLock<AesHash> = LazyLock::new(|| {
    // The key was randomly chosen. Any key would be okay.
    AesHash::new(Block::from(193502124791825095790518994062991136444_u128))
});

#[cfg(test)]
mod tests {
    use crate::{block::Block, crypto::AesRng};
    use rand::{Rng, SeedableRng};

    use super::{AesHash, FIXED_KEY_HASH};

    #[test]
    fn slice_hash_matches_block_hash() {
        let mut rng = AesRng::seed_from_u64(3);
        let hash = AesHash::new(rng.random());
        let blocks: Vec<Block> = (0..25).map(|_| rng.random()).collect();
        let mut hashed = blocks.clone();
        hash.cr_hash_slice_mut(&mut hashed);
        for (b, h) in blocks.iter().zip(&hashed) {
            assert_eq!(hash.cr_hash_block(*b), *h);
        }
    }

    #[test]
    fn tccr_slice_matches_block() {
        let mut rng = AesRng::seed_from_u64(4);
        let blocks: Vec<Block> = (0..30).map(|_| rng.random()).collect();
        let mut hashed = blocks.clone();
        FIXED_KEY_HASH.tccr_hash_slice_mut(&mut hashed, Block::from);
        for (i, (b, h)) in blocks.iter().zip(&hashed).enumerate() {
            assert_eq!(FIXED_KEY_HASH.tccr_hash_block(Block::from(i), *b), *h);
        }
    }

    #[test]
    fn different_keys_differ() {
        let x = Block::from(42_u128);
        let a = AesHash::new(Block::ZERO).cr_hash_block(x);
        let b = AesHash::new(Block::ONES).cr_hash_block(x);
        assert_ne!(a, b);
    }
}
