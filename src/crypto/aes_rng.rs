//! RNG based on AES in CTR mode.
//!
//! Based on the `rand_aes` module of
//! [scuttlebutt](https://github.com/GaloisInc/swanky/blob/4455754abadee07f168079ac45ef33535b0df27d/scuttlebutt/src/rand_aes.rs),
//! using the [aes](`aes`) crate as the block cipher.
use std::mem;

use aes::{
    Aes128,
    cipher::{BlockCipherEncrypt, KeyInit},
};
use rand::rand_core::block::{BlockRng, BlockRngCore, CryptoBlockRng};
use rand::{CryptoRng, RngCore, SeedableRng};

use crate::block::Block;

/// A PRG using AES in counter mode, keyed with a [`Block`] seed.
///
/// Every party in the distance protocols draws its randomness (output shares, blinding
/// values, OPRF seeds) from an `AesRng` or any other [`CryptoRng`].
#[derive(Clone, Debug)]
pub struct AesRng(BlockRng<AesRngCore>);

impl RngCore for AesRng {
    #[inline]
    fn next_u32(&mut self) -> u32 {
        self.0.next_u32()
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }

    #[inline]
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let block_size = mem::size_of::<aes::Block>();
        let block_len = dest.len() / block_size * block_size;
        let (block_bytes, rest_bytes) = dest.split_at_mut(block_len);
        // encrypt whole blocks straight from the counter, bypassing the buffer
        let mut tmp = [aes::Block::default(); AES_PAR_BLOCKS];
        for chunk in block_bytes.chunks_mut(block_size * AES_PAR_BLOCKS) {
            let blocks = &mut tmp[..chunk.len() / block_size];
            self.0.core.encrypt_counters(blocks);
            for (dst, blk) in chunk.chunks_exact_mut(block_size).zip(blocks.iter()) {
                dst.copy_from_slice(&blk.0);
            }
        }
        self.0.fill_bytes(rest_bytes)
    }
}

impl SeedableRng for AesRng {
    type Seed = Block;

    #[inline]
    fn from_seed(seed: Self::Seed) -> Self {
        AesRng(BlockRng::<AesRngCore>::from_seed(seed))
    }
}

impl CryptoRng for AesRng {}

impl AesRng {
    /// Create a new random number generator seeded from `rand::random`.
    #[inline]
    pub fn new() -> Self {
        let seed = rand::random::<Block>();
        AesRng::from_seed(seed)
    }
}

impl Default for AesRng {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// The core of `AesRng`, used with `BlockRng`.
#[derive(Clone)]
pub struct AesRngCore {
    aes: Aes128,
    state: u128,
}

impl std::fmt::Debug for AesRngCore {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "AesRngCore {{}}")
    }
}

impl BlockRngCore for AesRngCore {
    type Item = u32;
    // equivalent to `[Block; AES_PAR_BLOCKS]`
    type Results = hidden::ParBlockWrapper;

    #[inline]
    fn generate(&mut self, results: &mut Self::Results) {
        let mut blocks = [aes::Block::default(); AES_PAR_BLOCKS];
        self.encrypt_counters(&mut blocks);
        let words = blocks.iter().flat_map(|blk| blk.0.chunks_exact(4));
        for (word, bytes) in results.as_mut().iter_mut().zip(words) {
            *word = u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        }
    }
}

impl AesRngCore {
    /// Encrypts the next `blocks.len()` counter values into `blocks`.
    #[inline]
    fn encrypt_counters(&mut self, blocks: &mut [aes::Block]) {
        for blk in blocks.iter_mut() {
            *blk = aes::cipher::Array(self.state.to_le_bytes());
            self.state += 1;
        }
        self.aes.encrypt_blocks(blocks);
    }
}

mod hidden {
    use super::AES_PAR_BLOCKS;

    /// Equivalent to `[aes::Block; AES_PAR_BLOCKS]`, which does not implement `Default`.
    #[derive(Copy, Clone)]
    pub struct ParBlockWrapper([u32; AES_PAR_BLOCKS * 4]);

    impl Default for ParBlockWrapper {
        fn default() -> Self {
            Self([0; AES_PAR_BLOCKS * 4])
        }
    }

    impl AsMut<[u32]> for ParBlockWrapper {
        fn as_mut(&mut self) -> &mut [u32] {
            &mut self.0
        }
    }

    impl AsRef<[u32]> for ParBlockWrapper {
        fn as_ref(&self) -> &[u32] {
            &self.0
        }
    }
}

impl SeedableRng for AesRngCore {
    type Seed = Block;

    #[inline]
    fn from_seed(seed: Self::Seed) -> Self {
        let aes = Aes128::new(&seed.into());
        AesRngCore {
            aes,
            state: Default::default(),
        }
    }
}

impl CryptoBlockRng for AesRngCore {}

impl From<AesRngCore> for AesRng {
    #[inline]
    fn from(core: AesRngCore) -> Self {
        AesRng(BlockRng::new(core))
    }
}

/// Number of Blocks for which hardware accelerated AES can make use of ILP.
///
/// This corresponds to `ParBlocksSize` in [`aes::cipher::ParBlocksSizeUser`] for the
/// SIMD backend on the target architecture. Results must not depend on it, so callers that
/// need the same stream on both parties draw whole blocks from an [`AesRng`].
// https://github.com/RustCrypto/block-ciphers/blob/4da9b802de52a3326fdc74d559caddd57042fed2/aes/src/ni.rs#L43
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub const AES_PAR_BLOCKS: usize = 9;
/// Number of Blocks for which hardware accelerated AES can make use of ILP.
// https://github.com/RustCrypto/block-ciphers/blob/4da9b802de52a3326fdc74d559caddd57042fed2/aes/src/armv8.rs#L32
#[cfg(target_arch = "aarch64")]
pub const AES_PAR_BLOCKS: usize = 21;
/// Number of Blocks for which hardware accelerated AES can make use of ILP.
#[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
pub const AES_PAR_BLOCKS: usize = 4;
