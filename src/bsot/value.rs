//! Sparse OT of additively shared [`Zn`] elements: `out_s + out_r = msg (mod M)`.
use rand::Rng;

use crate::{
    block::Block,
    bsot::Payload,
    oprf::{OprfReceiver, OprfSender},
    ring::Zn,
};

/// Value domain sender.
pub type Sender = super::Sender<Zn>;
/// Value domain receiver.
pub type Receiver = super::Receiver<Zn>;

impl Payload for Zn {
    type Group = u64;
    type Wire = u64;

    fn group(&self) -> u64 {
        self.modulus()
    }

    fn group_tag(group: u64) -> u64 {
        group
    }

    fn random<R: Rng + ?Sized>(rng: &mut R, group: u64) -> Self {
        Zn::random(rng, group)
    }

    fn split(self, share: Self) -> Self {
        self - share
    }

    fn mask(self, pad: Block) -> u64 {
        self.value() ^ pad.low()
    }

    fn unmask(wire: u64, pad: Block, group: u64) -> Self {
        Zn::new(wire ^ pad.low(), group)
    }
}

impl Sender {
    /// Creates a sender for tables of `domain` elements of `Z_modulus`, `batches` per point.
    ///
    /// # Panics
    /// If `modulus` is zero.
    pub fn new(oprf: OprfSender, batches: usize, domain: usize, modulus: u64) -> Self {
        assert_ne!(modulus, 0, "modulus must be non-zero");
        Self::with_group(oprf, batches, domain, modulus)
    }
}

impl Receiver {
    /// Creates the receiver matching [`Sender::new`].
    ///
    /// # Panics
    /// If `modulus` is zero.
    pub fn new(oprf: OprfReceiver, batches: usize, domain: usize, modulus: u64) -> Self {
        assert_ne!(modulus, 0, "modulus must be non-zero");
        Self::with_group(oprf, batches, domain, modulus)
    }
}
