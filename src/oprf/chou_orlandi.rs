//! Chou-Orlandi oblivious transfer (cf. <https://eprint.iacr.org/2015/267>) over [`Block`]s.
//!
//! Uses the Ristretto prime order group from `curve25519-dalek`. The index of each OT is
//! hashed into the key derivation, otherwise all OTs of a batch would share their keys.
//! Provides the base OTs of the OPRF.
use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_TABLE,
    ristretto::{CompressedRistretto, RistrettoBasepointTable, RistrettoPoint},
    scalar::Scalar,
};
use rand::{CryptoRng, Rng};

use crate::{
    block::Block,
    channel::{Channel, recv_vec_from, send_to},
    oprf::Error,
    utils::RngCompat,
};

/// Oblivious transfer sender.
pub(crate) struct Sender {
    y: Scalar,
    s: RistrettoPoint,
}

impl Sender {
    pub(crate) async fn init<C: Channel, R: CryptoRng + Rng>(
        channel: &mut C,
        rng: &mut R,
    ) -> Result<Self, Error> {
        let y = Scalar::random(&mut RngCompat(&mut *rng));
        let s = &y * RISTRETTO_BASEPOINT_TABLE;
        send_to(channel, "CO_OT_s", s.compress().as_bytes().as_ref()).await?;
        Ok(Self { y, s })
    }

    pub(crate) async fn send<C: Channel>(
        &self,
        channel: &mut C,
        inputs: &[(Block, Block)],
    ) -> Result<(), Error> {
        let ys = self.y * self.s;
        let r_bytes_vec: Vec<Vec<u8>> = recv_vec_from(channel, "CO_OT_r", inputs.len()).await?;
        let mut c0c1vec = Vec::with_capacity(inputs.len());
        for (i, (r_bytes, input)) in r_bytes_vec.into_iter().zip(inputs).enumerate() {
            let r = convert_vec_to_point(r_bytes)?;
            let yr = self.y * r;
            let k0 = hash_pt(i as u128, &yr);
            let k1 = hash_pt(i as u128, &(yr - ys));
            c0c1vec.push((k0 ^ input.0, k1 ^ input.1));
        }
        send_to(channel, "CO_OT_c0c1", &c0c1vec).await?;
        Ok(())
    }
}

/// Oblivious transfer receiver.
pub(crate) struct Receiver {
    s: RistrettoBasepointTable,
}

impl Receiver {
    pub(crate) async fn init<C: Channel>(channel: &mut C) -> Result<Self, Error> {
        let s_bytes: Vec<u8> = recv_vec_from(channel, "CO_OT_s", 32).await?;
        let s = convert_vec_to_point(s_bytes)?;
        let s = RistrettoBasepointTable::create(&s);
        Ok(Self { s })
    }

    pub(crate) async fn receive<C: Channel, R: CryptoRng + Rng>(
        &self,
        channel: &mut C,
        rng: &mut R,
        choices: &[bool],
    ) -> Result<Vec<Block>, Error> {
        let zero = &Scalar::ZERO * &self.s;
        let one = &Scalar::ONE * &self.s;
        let mut ks = Vec::with_capacity(choices.len());
        let mut rs: Vec<Vec<u8>> = Vec::with_capacity(choices.len());
        for (i, b) in choices.iter().enumerate() {
            let x = Scalar::random(&mut RngCompat(&mut *rng));
            let c = if *b { one } else { zero };
            let r = c + &x * RISTRETTO_BASEPOINT_TABLE;
            rs.push(r.compress().as_bytes().to_vec());
            ks.push(hash_pt(i as u128, &(&x * &self.s)));
        }
        send_to(channel, "CO_OT_r", &rs).await?;

        let c0c1vec: Vec<(Block, Block)> =
            recv_vec_from(channel, "CO_OT_c0c1", choices.len()).await?;
        Ok(choices
            .iter()
            .zip(ks)
            .zip(c0c1vec)
            .map(|((b, k), (c0, c1))| k ^ if *b { c1 } else { c0 })
            .collect())
    }
}

fn hash_pt(tweak: u128, pt: &RistrettoPoint) -> Block {
    let h = blake3::keyed_hash(pt.compress().as_bytes(), &tweak.to_le_bytes());
    let mut out = [0; 16];
    out.copy_from_slice(&h.as_bytes()[..16]);
    Block::new(out)
}

fn convert_vec_to_point(data: Vec<u8>) -> Result<RistrettoPoint, Error> {
    let compressed_pt =
        CompressedRistretto::from_slice(&data).map_err(|_| Error::InvalidOtData)?;
    compressed_pt.decompress().ok_or(Error::InvalidOtData)
}

#[cfg(test)]
mod tests {
    use futures::try_join;
    use rand::SeedableRng;

    use super::*;
    use crate::{channel::SimpleChannel, crypto::AesRng};

    #[tokio::test]
    async fn receiver_gets_chosen_messages() {
        let (mut a, mut b) = SimpleChannel::pair();
        let mut rng_s = AesRng::seed_from_u64(10);
        let mut rng_r = AesRng::seed_from_u64(11);
        let inputs: Vec<(Block, Block)> = (0..20)
            .map(|_| (rng_s.random(), rng_s.random()))
            .collect();
        let choices: Vec<bool> = (0..20).map(|i| i % 3 == 0).collect();

        let sender = async {
            let ot = Sender::init(&mut a, &mut rng_s).await?;
            ot.send(&mut a, &inputs).await
        };
        let receiver = async {
            let ot = Receiver::init(&mut b).await?;
            ot.receive(&mut b, &mut rng_r, &choices).await
        };
        let ((), received) = try_join!(sender, receiver).unwrap();
        for ((b, (m0, m1)), r) in choices.iter().zip(&inputs).zip(received) {
            assert_eq!(if *b { *m1 } else { *m0 }, r);
        }
    }

    #[tokio::test]
    async fn invalid_point_is_rejected() {
        let (mut a, mut b) = SimpleChannel::pair();
        send_to(&mut a, "CO_OT_s", &vec![0xff_u8; 32]).await.unwrap();
        assert!(matches!(
            Receiver::init(&mut b).await,
            Err(Error::InvalidOtData)
        ));
    }
}
