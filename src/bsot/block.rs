//! Sparse OT of XOR shared [`Block`]s: `out_s ^ out_r = msg`.
use rand::Rng;

use crate::{
    block::Block,
    bsot::Payload,
    oprf::{OprfReceiver, OprfSender},
};

/// Block domain sender.
pub type Sender = super::Sender<Block>;
/// Block domain receiver.
pub type Receiver = super::Receiver<Block>;

impl Payload for Block {
    type Group = ();
    type Wire = Block;

    fn group(&self) {}

    fn group_tag((): ()) -> u64 {
        0
    }

    fn random<R: Rng + ?Sized>(rng: &mut R, (): ()) -> Self {
        rng.random()
    }

    fn split(self, share: Self) -> Self {
        self ^ share
    }

    fn mask(self, pad: Block) -> Block {
        self ^ pad
    }

    fn unmask(wire: Block, pad: Block, (): ()) -> Self {
        wire ^ pad
    }
}

impl Sender {
    /// Creates a sender for tables of `domain` blocks, `batches` per point.
    pub fn new(oprf: OprfSender, batches: usize, domain: usize) -> Self {
        Self::with_group(oprf, batches, domain, ())
    }
}

impl Receiver {
    /// Creates the receiver matching [`Sender::new`].
    pub fn new(oprf: OprfReceiver, batches: usize, domain: usize) -> Self {
        Self::with_group(oprf, batches, domain, ())
    }
}
