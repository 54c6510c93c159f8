//! Batched oblivious PRF used to key the sparse oblivious transfers.
//!
//! The OPRF receiver learns `F(slot, x)` for each of its inputs `x`, while the OPRF sender can
//! evaluate `F(slot, y)` for arbitrary `y` without learning `x`. The construction follows
//! [KKRT16](https://eprint.iacr.org/2016/799): a 512-bit pseudorandom code agreed by coin
//! tossing, 512 [Chou-Orlandi](https://eprint.iacr.org/2015/267) base OTs per instance and
//! BLAKE3 to hash the code words into [`crate::block::Block`]s.
//!
//! Instances are created in batches by [`OprfSender::setup`] / [`OprfReceiver::setup`] and can
//! each serve any number of calls to [`OprfSender::send`] / [`OprfReceiver::receive`].
use thiserror::Error;

use crate::channel;

mod chou_orlandi;
mod cointoss;
mod kkrt;

pub use kkrt::{Evaluator, OprfReceiver, OprfSender};

/// Errors occurring during OPRF setup or evaluation.
#[derive(Debug, Error)]
pub enum Error {
    /// A message could not be sent or received.
    #[error(transparent)]
    Channel(#[from] channel::Error),
    /// The peer sent bytes that are not a valid compressed Ristretto point.
    #[error("received an invalid curve point during base OT")]
    InvalidOtData,
    /// A coin toss seed did not open the commitment sent before.
    #[error("coin toss commitment could not be opened")]
    CommitmentMismatch,
}
