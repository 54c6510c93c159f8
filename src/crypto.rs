//! AES based primitives: the [`AesRng`] CSPRNG and the correlation robust [`AesHash`].
mod aes_hash;
mod aes_rng;

pub(crate) use aes_hash::FIXED_KEY_HASH;
pub use aes_hash::AesHash;
pub use aes_rng::{AES_PAR_BLOCKS, AesRng};
