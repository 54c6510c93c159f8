//! Two-party distance-threshold matching over sparse points using batched oblivious transfer.
//!
//! Two parties each hold an ordered collection of points in `[0, 256)^d`, aligned by an agreed
//! ordered index set of [`block::Block`] tokens. For every position they learn whether their
//! two points lie within a public threshold `δ` under the L1, L∞ or L2 distance, and nothing
//! else. The crate is secure against semi-honest adversaries.
//!
//! ## Main Components
//!
//! * [`distance`]: the [`distance::Sender`] / [`distance::Receiver`] protocols, generic over a
//!   [`distance::Metric`], and the [`distance::simulate`] helper.
//! * [`intersection`]: hashing and intersecting the blinded shares produced by the protocols.
//! * [`bsot`]: the batched sparse oblivious transfer the protocols are built from.
//! * [`oprf`]: the KKRT oblivious PRF keying the transfers.
//! * [`channel`]: the [`channel::Channel`] transport abstraction and an in-memory
//!   [`channel::SimpleChannel`].
//!
//! ## Example
//!
//! ```no_run
//! use distmatch::distance::{DistanceConfig, L1, simulate};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DistanceConfig::new(2, 1)?;
//! let sender_points = vec![vec![3, 10], vec![40, 40]];
//! let receiver_points = vec![vec![4, 10], vec![80, 80]];
//! let matches = simulate::<L1>(config, &sender_points, &receiver_points).await?;
//! assert_eq!(vec![0], matches);
//! # Ok(())
//! # }
//! ```
//!
//! In a real deployment each party runs its side over its own [`channel::Channel`]
//! implementation:
//!
//! ```ignore
//! // sender
//! let z = distance::Sender::<L2>::new(config)?
//!     .send(&mut channel, &mut rng, &ord_index_set, &points)
//!     .await?;
//! intersection::send_hashed_shares(&mut channel, DEFAULT_HASH_KEY, &z).await?;
//!
//! // receiver
//! let z = distance::Receiver::<L2>::new(config)?
//!     .receive(&mut channel, &mut rng, &ord_index_set, &points)
//!     .await?;
//! let matches = intersection::receive_intersection(&mut channel, DEFAULT_HASH_KEY, &z).await?;
//! ```
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod block;
pub mod bsot;
pub mod channel;
pub mod crypto;
pub mod distance;
pub mod intersection;
pub mod oprf;
pub mod ring;

mod transpose;
mod utils;
