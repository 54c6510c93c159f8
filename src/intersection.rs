//! Reveals the matching positions from the blinded shares of a distance protocol.
//!
//! The sender hashes its shares with a keyed correlation robust hash and sends them. The
//! receiver hashes its own shares with the same key; position `i` matches iff its hash is
//! among the sender's hashes.
use std::collections::HashSet;

use tracing::{Level, debug, instrument};

use crate::{
    block::Block,
    channel::{self, Channel, recv_from, send_to},
    crypto::AesHash,
};

/// Public hash key used when the parties did not agree on another one.
pub const DEFAULT_HASH_KEY: Block = Block::pack(13133210048402866, 17132091720387928);

/// Hashes every share with the [`AesHash`] keyed by `key`.
pub fn hash_shares(key: Block, shares: &[Block]) -> Vec<Block> {
    let hash = AesHash::new(key);
    let mut hashed = shares.to_vec();
    hash.cr_hash_slice_mut(&mut hashed);
    hashed
}

/// Ascending indices `i` of `receiver_z` whose hash is contained in `sender_hashed`.
pub fn compute_intersection(
    key: Block,
    receiver_z: &[Block],
    sender_hashed: &[Block],
) -> Vec<usize> {
    let sender_hashed: HashSet<Block> = sender_hashed.iter().copied().collect();
    hash_shares(key, receiver_z)
        .iter()
        .enumerate()
        .filter(|(_, h)| sender_hashed.contains(*h))
        .map(|(i, _)| i)
        .collect()
}

/// Sends the hashes of the sender's blinded shares `z` to the receiver.
#[instrument(level = Level::DEBUG, skip_all, err)]
pub async fn send_hashed_shares(
    channel: &mut impl Channel,
    key: Block,
    z: &[Block],
) -> Result<(), channel::Error> {
    send_to(channel, "hashed shares", &hash_shares(key, z)).await
}

/// Receives the sender's hashed shares and intersects them with the receiver's shares `z`.
#[instrument(level = Level::DEBUG, skip_all, err)]
pub async fn receive_intersection(
    channel: &mut impl Channel,
    key: Block,
    z: &[Block],
) -> Result<Vec<usize>, channel::Error> {
    let sender_hashed: Vec<Block> = recv_from(channel, "hashed shares").await?;
    let matches = compute_intersection(key, z, &sender_hashed);
    debug!(points = z.len(), matches = matches.len(), "intersection computed");
    Ok(matches)
}
