//! KKRT batched OPRF over a 512-bit pseudorandom code.
use aes::{
    Aes128,
    cipher::{BlockCipherEncrypt, KeyInit},
};
use rand::{CryptoRng, Rng, RngCore, SeedableRng};
use tracing::{Level, debug, instrument};

use crate::{
    block::Block,
    channel::{Channel, recv_vec_from, send_to},
    crypto::AesRng,
    oprf::{Error, chou_orlandi, cointoss},
    transpose::transpose_bitmatrix,
    utils::{and_inplace, u8vec_to_boolvec, xor_inplace},
};

/// Width of the pseudorandom code (and base OTs per instance).
const CODE_BITS: usize = 512;
const CODE_BYTES: usize = CODE_BITS / 8;

/// Pseudorandom code `C(x) = AES_k1(x) || AES_k2(x) || AES_k3(x) || AES_k4(x)`.
struct PseudorandomCode {
    ciphers: [Aes128; 4],
}

impl PseudorandomCode {
    fn from_seed(seed: Block) -> Self {
        let mut rng = AesRng::from_seed(seed);
        let ciphers = std::array::from_fn(|_| Aes128::new(&rng.random::<Block>().into()));
        Self { ciphers }
    }

    fn encode(&self, x: Block) -> [u8; CODE_BYTES] {
        let mut out = [0; CODE_BYTES];
        for (cipher, chunk) in self.ciphers.iter().zip(out.chunks_exact_mut(Block::BYTES)) {
            let mut b = x.into();
            cipher.encrypt_block(&mut b);
            chunk.copy_from_slice(Block::from(b).as_bytes());
        }
        out
    }
}

/// Rows of the OPRF matrices. Every column then spans whole AES blocks, so the column PRGs
/// of both parties stay in counter mode lockstep.
fn padded_rows(m: usize) -> usize {
    m.div_ceil(128) * 128
}

fn hash_row(index: u64, row: &[u8]) -> Block {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&index.to_le_bytes());
    hasher.update(row);
    let hash = hasher.finalize();
    let mut out = [0; 16];
    out.copy_from_slice(&hash.as_bytes()[..16]);
    Block::new(out)
}

/// The OPRF key holder, able to evaluate the OPRF on arbitrary inputs.
pub struct OprfSender {
    code: PseudorandomCode,
    s: Vec<u8>,
    rngs: Vec<AesRng>,
    counter: u64,
}

impl OprfSender {
    /// Creates `count` OPRF sender instances, together with the peer's [`OprfReceiver::setup`].
    #[instrument(level = Level::DEBUG, skip_all, err)]
    pub async fn setup<C: Channel, R: CryptoRng + Rng>(
        channel: &mut C,
        rng: &mut R,
        count: usize,
    ) -> Result<Vec<Self>, Error> {
        let seeds: Vec<Block> = (0..count).map(|_| rng.random()).collect();
        let seeds = cointoss::send(channel, &seeds).await?;

        let mut s = vec![0; count * CODE_BYTES];
        rng.fill_bytes(&mut s);
        let choices = u8vec_to_boolvec(&s);
        let base_ot = chou_orlandi::Receiver::init(channel).await?;
        let keys = base_ot.receive(channel, rng, &choices).await?;
        debug!(instances = count, base_ots = keys.len(), "OPRF sender set up");

        Ok(seeds
            .into_iter()
            .zip(s.chunks_exact(CODE_BYTES))
            .zip(keys.chunks_exact(CODE_BITS))
            .map(|((seed, s), keys)| Self {
                code: PseudorandomCode::from_seed(seed),
                s: s.to_vec(),
                rngs: keys.iter().map(|k| AesRng::from_seed(*k)).collect(),
                counter: 0,
            })
            .collect())
    }

    /// Answers a batch of `m` OPRF queries, returning an [`Evaluator`] for the batch.
    ///
    /// Must be matched by an [`OprfReceiver::receive`] call with `m` inputs on the peer's
    /// corresponding instance. A batch of size 0 exchanges no messages.
    #[instrument(level = Level::DEBUG, skip_all, err)]
    pub async fn send<C: Channel>(
        &mut self,
        channel: &mut C,
        m: usize,
    ) -> Result<Evaluator<'_>, Error> {
        let offset = self.counter;
        self.counter += m as u64;
        if m == 0 {
            return Ok(Evaluator {
                code: &self.code,
                s: &self.s,
                rows: vec![],
                slots: 0,
                offset,
            });
        }
        let nrows = padded_rows(m);
        let col_bytes = nrows / 8;
        let us: Vec<u8> = recv_vec_from(channel, "KKRT columns", 2 * CODE_BITS * col_bytes).await?;

        // q^j = G(k_{s_j}) ^ u_{s_j}^j = t_{s_j}^j
        let mut qs = vec![0; CODE_BITS * col_bytes];
        for (j, (q, rng)) in qs
            .chunks_exact_mut(col_bytes)
            .zip(self.rngs.iter_mut())
            .enumerate()
        {
            rng.fill_bytes(q);
            let bit = (self.s[j / 8] >> (j % 8)) & 1;
            let start = (2 * j + bit as usize) * col_bytes;
            xor_inplace(q, &us[start..start + col_bytes]);
        }
        let mut rows = vec![0; qs.len()];
        transpose_bitmatrix(&qs, &mut rows, CODE_BITS);
        debug!(slots = m, "OPRF batch answered");

        Ok(Evaluator {
            code: &self.code,
            s: &self.s,
            rows,
            slots: m,
            offset,
        })
    }
}

/// Evaluates the OPRF on the slots of one batch answered by [`OprfSender::send`].
pub struct Evaluator<'a> {
    code: &'a PseudorandomCode,
    s: &'a [u8],
    rows: Vec<u8>,
    slots: usize,
    offset: u64,
}

impl Evaluator<'_> {
    /// Number of slots in the batch.
    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Computes `F(slot, input)`, equal to the receiver's output for `slot` iff the
    /// receiver's input for that slot was `input`.
    ///
    /// # Panics
    /// If `slot >= self.slots()`.
    pub fn eval(&self, slot: usize, input: Block) -> Block {
        assert!(slot < self.slots, "slot {slot} out of range");
        let mut row = self.code.encode(input);
        and_inplace(&mut row, self.s);
        xor_inplace(&mut row, &self.rows[slot * CODE_BYTES..(slot + 1) * CODE_BYTES]);
        hash_row(self.offset + slot as u64, &row)
    }
}

/// The OPRF input holder.
pub struct OprfReceiver {
    code: PseudorandomCode,
    rngs: Vec<(AesRng, AesRng)>,
    counter: u64,
}

impl OprfReceiver {
    /// Creates `count` OPRF receiver instances, together with the peer's [`OprfSender::setup`].
    #[instrument(level = Level::DEBUG, skip_all, err)]
    pub async fn setup<C: Channel, R: CryptoRng + Rng>(
        channel: &mut C,
        rng: &mut R,
        count: usize,
    ) -> Result<Vec<Self>, Error> {
        let seeds: Vec<Block> = (0..count).map(|_| rng.random()).collect();
        let seeds = cointoss::receive(channel, &seeds).await?;

        let pairs: Vec<(Block, Block)> = (0..count * CODE_BITS)
            .map(|_| (rng.random(), rng.random()))
            .collect();
        let base_ot = chou_orlandi::Sender::init(channel, rng).await?;
        base_ot.send(channel, &pairs).await?;
        debug!(instances = count, base_ots = pairs.len(), "OPRF receiver set up");

        Ok(seeds
            .into_iter()
            .zip(pairs.chunks_exact(CODE_BITS))
            .map(|(seed, pairs)| Self {
                code: PseudorandomCode::from_seed(seed),
                rngs: pairs
                    .iter()
                    .map(|(k0, k1)| (AesRng::from_seed(*k0), AesRng::from_seed(*k1)))
                    .collect(),
                counter: 0,
            })
            .collect())
    }

    /// Obtains `F(slot, inputs[slot])` for every input of the batch.
    #[instrument(level = Level::DEBUG, skip_all, err)]
    pub async fn receive<C: Channel, R: CryptoRng + Rng>(
        &mut self,
        channel: &mut C,
        rng: &mut R,
        inputs: &[Block],
    ) -> Result<Vec<Block>, Error> {
        let m = inputs.len();
        let offset = self.counter;
        self.counter += m as u64;
        if m == 0 {
            return Ok(vec![]);
        }
        let nrows = padded_rows(m);
        let col_bytes = nrows / 8;

        let mut t0 = vec![0; nrows * CODE_BYTES];
        rng.fill_bytes(&mut t0);
        let mut t1 = t0.clone();
        for (row, x) in t1.chunks_exact_mut(CODE_BYTES).zip(inputs) {
            xor_inplace(row, &self.code.encode(*x));
        }
        let mut t0_cols = vec![0; t0.len()];
        let mut t1_cols = vec![0; t1.len()];
        transpose_bitmatrix(&t0, &mut t0_cols, nrows);
        transpose_bitmatrix(&t1, &mut t1_cols, nrows);

        let mut us = Vec::with_capacity(2 * CODE_BITS * col_bytes);
        let mut g = vec![0; col_bytes];
        for ((rng0, rng1), (c0, c1)) in self.rngs.iter_mut().zip(
            t0_cols
                .chunks_exact(col_bytes)
                .zip(t1_cols.chunks_exact(col_bytes)),
        ) {
            rng0.fill_bytes(&mut g);
            xor_inplace(&mut g, c0);
            us.extend_from_slice(&g);
            rng1.fill_bytes(&mut g);
            xor_inplace(&mut g, c1);
            us.extend_from_slice(&g);
        }
        send_to(channel, "KKRT columns", &us).await?;
        debug!(slots = m, "OPRF batch queried");

        Ok(t0
            .chunks_exact(CODE_BYTES)
            .take(m)
            .enumerate()
            .map(|(i, row)| hash_row(offset + i as u64, row))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use futures::try_join;

    use super::*;
    use crate::channel::SimpleChannel;

    #[tokio::test]
    async fn outputs_match_evaluation() {
        let (mut a, mut b) = SimpleChannel::pair();
        let mut rng_s = AesRng::seed_from_u64(20);
        let mut rng_r = AesRng::seed_from_u64(21);
        let inputs: Vec<Block> = (0..37_usize).map(Block::from).collect();

        let sender = async {
            let mut oprfs = OprfSender::setup(&mut a, &mut rng_s, 2).await?;
            let mut evals = vec![];
            for oprf in oprfs.iter_mut() {
                // two batches per instance
                for _ in 0..2 {
                    let eval = oprf.send(&mut a, inputs.len()).await?;
                    let out: Vec<(Block, Block)> = (0..inputs.len())
                        .map(|i| (eval.eval(i, inputs[i]), eval.eval(i, Block::from(1000 + i))))
                        .collect();
                    evals.push(out);
                }
            }
            Ok::<_, Error>(evals)
        };
        let receiver = async {
            let mut oprfs = OprfReceiver::setup(&mut b, &mut rng_r, 2).await?;
            let mut outs = vec![];
            for oprf in oprfs.iter_mut() {
                for _ in 0..2 {
                    outs.push(oprf.receive(&mut b, &mut rng_r, &inputs).await?);
                }
            }
            Ok::<_, Error>(outs)
        };
        let (evals, outs) = try_join!(sender, receiver).unwrap();
        assert_eq!(4, outs.len());
        for (eval, out) in evals.iter().zip(&outs) {
            for ((same, other), received) in eval.iter().zip(out) {
                assert_eq!(same, received);
                assert_ne!(other, received);
            }
        }
        // outputs of different batches and instances are independent
        assert_ne!(outs[0], outs[1]);
        assert_ne!(outs[0], outs[2]);
    }

    #[tokio::test]
    async fn empty_batch_sends_nothing() {
        let (mut a, mut b) = SimpleChannel::pair();
        let mut rng_s = AesRng::seed_from_u64(22);
        let mut rng_r = AesRng::seed_from_u64(23);
        let (mut s, mut r) = try_join!(
            OprfSender::setup(&mut a, &mut rng_s, 1),
            OprfReceiver::setup(&mut b, &mut rng_r, 1)
        )
        .unwrap();
        let eval = s[0].send(&mut a, 0).await.unwrap();
        assert_eq!(0, eval.slots());
        assert!(r[0].receive(&mut b, &mut rng_r, &[]).await.unwrap().is_empty());
    }

    #[test]
    fn padded_rows_fill_whole_blocks() {
        assert_eq!(128, padded_rows(1));
        assert_eq!(128, padded_rows(128));
        assert_eq!(256, padded_rows(129));
        assert_eq!(0, padded_rows(300) / 8 % Block::BYTES);
    }
}
