//! Batched sparse oblivious transfer over an agreed ordered index set.
//!
//! For every point `i` of the index set and every batch `j`, the sender holds a message table
//! of `n` entries and a choice share `s_c`, the receiver holds a choice `r_c < n`. Afterwards
//! the two outputs are shares of `table[i][j][(s_c + r_c) mod n]`: additive shares modulo `M`
//! for [`value`], XOR shares for [`block`].
//!
//! Each entry of the sender's table is encrypted under a pad derived from the OPRF output on
//! the candidate choice, tweaked with the point token and batch index. The receiver can only
//! derive the pad of its own choice.
use std::fmt::Debug;

use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{Level, debug, instrument};

use crate::{
    block::Block,
    channel::{self, Channel, recv_from, recv_vec_from, send_to},
    crypto::FIXED_KEY_HASH,
    oprf::{self, OprfReceiver, OprfSender},
};

pub mod block;
pub mod value;

/// Errors occurring during a sparse oblivious transfer.
#[derive(Debug, Error)]
pub enum Error {
    /// A message could not be sent or received.
    #[error(transparent)]
    Channel(#[from] channel::Error),
    /// The underlying OPRF failed.
    #[error(transparent)]
    Oprf(#[from] oprf::Error),
    /// The two parties called the transfer with different parameters.
    #[error("OT parameters differ, ours: {ours:?}, peer: {peer:?}")]
    ParameterMismatch {
        /// Parameters of this party.
        ours: OtParams,
        /// Parameters announced by the peer.
        peer: OtParams,
    },
    /// An input has the wrong shape.
    #[error("expected {expected} {what}, got {actual}")]
    InvalidLength {
        /// Which input is malformed.
        what: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },
    /// A choice is not an index into the message table.
    #[error("choice {choice} is outside the domain of size {domain}")]
    ChoiceOutOfDomain {
        /// The offending choice.
        choice: usize,
        /// The domain size `n`.
        domain: usize,
    },
    /// A ring element does not belong to the configured group.
    #[error("element of modulus {actual} where modulus {expected} was expected")]
    ModulusMismatch {
        /// Modulus of the transfer.
        expected: u64,
        /// Modulus of the element.
        actual: u64,
    },
    /// The domain size is zero.
    #[error("the domain of a sparse OT must not be empty")]
    EmptyDomain,
}

/// Public parameters of one transfer, compared between the parties before any payload is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtParams {
    /// Number of points, i.e. the length of the ordered index set.
    pub points: usize,
    /// Batches per point.
    pub batches: usize,
    /// Size `n` of every message table.
    pub domain: usize,
    /// Identifies the payload group, the modulus for [`crate::ring::Zn`], 0 for [`Block`].
    pub group: u64,
}

/// A type that can be secret shared and transferred by the sparse OT.
pub trait Payload: Copy + Debug {
    /// Public description of the group the payload lives in.
    type Group: Copy + PartialEq + Debug;
    /// Masked representation sent over the channel.
    type Wire: Copy + Serialize + DeserializeOwned;

    /// The group of this element.
    fn group(&self) -> Self::Group;
    /// Numeric tag of a group, announced in [`OtParams`].
    fn group_tag(group: Self::Group) -> u64;
    /// A uniformly random element of `group`.
    fn random<R: Rng + ?Sized>(rng: &mut R, group: Self::Group) -> Self;
    /// The share completing `share` to `self`.
    fn split(self, share: Self) -> Self;
    /// Encrypts `self` under a one-time pad.
    fn mask(self, pad: Block) -> Self::Wire;
    /// Inverse of [`Payload::mask`].
    fn unmask(wire: Self::Wire, pad: Block, group: Self::Group) -> Self;
}

fn tweak(token: Block, batch: usize) -> Block {
    token ^ Block::from(batch)
}

async fn exchange_params(channel: &mut impl Channel, ours: OtParams) -> Result<(), Error> {
    send_to(channel, "sparse OT parameters", &ours).await?;
    let peer: OtParams = recv_from(channel, "sparse OT parameters").await?;
    if peer != ours {
        return Err(Error::ParameterMismatch { ours, peer });
    }
    Ok(())
}

fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<(), Error> {
    if expected != actual {
        return Err(Error::InvalidLength {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}

fn check_choices(
    choices: &[Vec<usize>],
    points: usize,
    batches: usize,
    domain: usize,
) -> Result<(), Error> {
    if domain == 0 {
        return Err(Error::EmptyDomain);
    }
    check_len("choice rows", points, choices.len())?;
    for row in choices {
        check_len("choices per point", batches, row.len())?;
        if let Some(&choice) = row.iter().find(|c| **c >= domain) {
            return Err(Error::ChoiceOutOfDomain { choice, domain });
        }
    }
    Ok(())
}

/// Sending side of a batched sparse OT, owning one OPRF sender instance.
pub struct Sender<T: Payload> {
    oprf: OprfSender,
    batches: usize,
    domain: usize,
    group: T::Group,
}

impl<T: Payload> Sender<T> {
    fn with_group(oprf: OprfSender, batches: usize, domain: usize, group: T::Group) -> Self {
        Self {
            oprf,
            batches,
            domain,
            group,
        }
    }

    fn params(&self, points: usize) -> OtParams {
        OtParams {
            points,
            batches: self.batches,
            domain: self.domain,
            group: T::group_tag(self.group),
        }
    }

    /// Transfers `tables[i][j][(choice_shares[i][j] + r_c) mod n]` in shared form, returning
    /// the sender's shares `out[i][j]`.
    ///
    /// `tables` must be `points x batches x domain`, `choice_shares` `points x batches`, where
    /// `points = ord_index_set.len()`. All inputs are validated before anything is sent.
    #[instrument(level = Level::DEBUG, skip_all, err)]
    pub async fn send<C: Channel, R: CryptoRng + Rng>(
        &mut self,
        channel: &mut C,
        rng: &mut R,
        ord_index_set: &[Block],
        tables: &[Vec<Vec<T>>],
        choice_shares: &[Vec<usize>],
    ) -> Result<Vec<Vec<T>>, Error> {
        let (points, k, n, group) = (ord_index_set.len(), self.batches, self.domain, self.group);
        check_choices(choice_shares, points, k, n)?;
        check_len("table rows", points, tables.len())?;
        for row in tables {
            check_len("tables per point", k, row.len())?;
            for table in row {
                check_len("table entries", n, table.len())?;
                if let Some(e) = table.iter().find(|e| e.group() != group) {
                    return Err(Error::ModulusMismatch {
                        expected: T::group_tag(group),
                        actual: T::group_tag(e.group()),
                    });
                }
            }
        }
        exchange_params(channel, self.params(points)).await?;
        debug!(points, batches = k, domain = n, "sparse OT send");

        let eval = self.oprf.send(channel, points * k).await?;
        let mut outs = Vec::with_capacity(points);
        let mut cts = Vec::with_capacity(points * k * n);
        let mut pads = vec![Block::ZERO; n];
        for (i, ((token, row), shares)) in ord_index_set
            .iter()
            .zip(tables)
            .zip(choice_shares)
            .enumerate()
        {
            let mut out = Vec::with_capacity(k);
            for (j, (table, s_c)) in row.iter().zip(shares).enumerate() {
                let slot = i * k + j;
                for (h, pad) in pads.iter_mut().enumerate() {
                    *pad = eval.eval(slot, Block::from(h));
                }
                let batch_tweak = tweak(*token, j);
                FIXED_KEY_HASH.tccr_hash_slice_mut(&mut pads, |_| batch_tweak);

                let share = T::random(rng, group);
                for (h, pad) in pads.iter().enumerate() {
                    cts.push(table[(s_c + h) % n].split(share).mask(*pad));
                }
                out.push(share);
            }
            outs.push(out);
        }
        send_to(channel, "sparse OT ciphertexts", &cts).await?;
        Ok(outs)
    }
}

/// Receiving side of a batched sparse OT, owning one OPRF receiver instance.
pub struct Receiver<T: Payload> {
    oprf: OprfReceiver,
    batches: usize,
    domain: usize,
    group: T::Group,
}

impl<T: Payload> Receiver<T> {
    fn with_group(oprf: OprfReceiver, batches: usize, domain: usize, group: T::Group) -> Self {
        Self {
            oprf,
            batches,
            domain,
            group,
        }
    }

    /// Receives the shares `out[i][j]` of the entries selected by `choices[i][j]` (together
    /// with the sender's choice shares).
    #[instrument(level = Level::DEBUG, skip_all, err)]
    pub async fn receive<C: Channel, R: CryptoRng + Rng>(
        &mut self,
        channel: &mut C,
        rng: &mut R,
        ord_index_set: &[Block],
        choices: &[Vec<usize>],
    ) -> Result<Vec<Vec<T>>, Error> {
        let (points, k, n) = (ord_index_set.len(), self.batches, self.domain);
        check_choices(choices, points, k, n)?;
        let params = OtParams {
            points,
            batches: k,
            domain: n,
            group: T::group_tag(self.group),
        };
        exchange_params(channel, params).await?;
        debug!(points, batches = k, domain = n, "sparse OT receive");

        let inputs: Vec<Block> = choices.iter().flatten().map(|c| Block::from(*c)).collect();
        let keys = self.oprf.receive(channel, rng, &inputs).await?;
        let cts: Vec<T::Wire> =
            recv_vec_from(channel, "sparse OT ciphertexts", points * k * n).await?;

        Ok(ord_index_set
            .iter()
            .zip(choices)
            .enumerate()
            .map(|(i, (token, row))| {
                row.iter()
                    .enumerate()
                    .map(|(j, c)| {
                        let slot = i * k + j;
                        let pad = FIXED_KEY_HASH.tccr_hash_block(tweak(*token, j), keys[slot]);
                        T::unmask(cts[slot * n + c], pad, self.group)
                    })
                    .collect()
            })
            .collect())
    }
}

#[cfg(test)]
async fn oprf_pair(
    a: &mut crate::channel::SimpleChannel,
    b: &mut crate::channel::SimpleChannel,
    count: usize,
) -> (Vec<OprfSender>, Vec<OprfReceiver>) {
    use rand::SeedableRng;

    use crate::crypto::AesRng;

    let mut rng_s = AesRng::seed_from_u64(100);
    let mut rng_r = AesRng::seed_from_u64(101);
    futures::try_join!(
        OprfSender::setup(a, &mut rng_s, count),
        OprfReceiver::setup(b, &mut rng_r, count)
    )
    .unwrap()
}
