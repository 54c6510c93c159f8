//! Two-party coin tossing using a PRG as commitment.
//!
//! The sender commits to each of its seeds with `PRG(seed)`, learns the receiver's seeds
//! and then opens its commitments. Both output `seed ⊕ seed_`.
use rand::{Rng, SeedableRng};

use crate::{
    block::Block,
    channel::{Channel, recv_vec_from, send_to},
    crypto::AesRng,
    oprf::Error,
};

fn commit(seed: Block) -> Block {
    AesRng::from_seed(seed).random()
}

/// Coin tossing sender.
pub(crate) async fn send(channel: &mut impl Channel, seeds: &[Block]) -> Result<Vec<Block>, Error> {
    let coms: Vec<Block> = seeds.iter().map(|seed| commit(*seed)).collect();
    send_to(channel, "coin toss commitments", &coms).await?;
    let peer: Vec<Block> = recv_vec_from(channel, "coin toss peer seeds", seeds.len()).await?;
    send_to(channel, "coin toss openings", seeds).await?;
    Ok(seeds.iter().zip(peer).map(|(s, p)| *s ^ p).collect())
}

/// Coin tossing receiver.
pub(crate) async fn receive(
    channel: &mut impl Channel,
    seeds: &[Block],
) -> Result<Vec<Block>, Error> {
    let coms: Vec<Block> = recv_vec_from(channel, "coin toss commitments", seeds.len()).await?;
    send_to(channel, "coin toss peer seeds", seeds).await?;
    let openings: Vec<Block> = recv_vec_from(channel, "coin toss openings", seeds.len()).await?;
    let mut out = Vec::with_capacity(seeds.len());
    for ((seed, com), opening) in seeds.iter().zip(coms).zip(openings) {
        if commit(opening) != com {
            return Err(Error::CommitmentMismatch);
        }
        out.push(*seed ^ opening);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use futures::try_join;

    use super::*;
    use crate::channel::SimpleChannel;

    #[tokio::test]
    async fn both_parties_agree() {
        let (mut a, mut b) = SimpleChannel::pair();
        let mut rng = AesRng::seed_from_u64(1);
        let seeds_a: Vec<Block> = (0..4).map(|_| rng.random()).collect();
        let seeds_b: Vec<Block> = (0..4).map(|_| rng.random()).collect();
        let (out_a, out_b) = try_join!(send(&mut a, &seeds_a), receive(&mut b, &seeds_b)).unwrap();
        assert_eq!(out_a, out_b);
        assert_eq!(seeds_a[0] ^ seeds_b[0], out_a[0]);
    }

    #[tokio::test]
    async fn wrong_opening_is_detected() {
        let (mut a, mut b) = SimpleChannel::pair();
        let cheat = async {
            send_to(&mut a, "coin toss commitments", &vec![commit(Block::ONE)]).await?;
            let _: Vec<Block> = recv_vec_from(&mut a, "coin toss peer seeds", 1).await?;
            send_to(&mut a, "coin toss openings", &vec![Block::ZERO]).await?;
            Ok::<_, Error>(())
        };
        let seeds = [Block::ONES];
        let (cheated, res) = futures::join!(cheat, receive(&mut b, &seeds));
        cheated.unwrap();
        assert!(matches!(res, Err(Error::CommitmentMismatch)));
    }
}
