//! Distance-threshold matching of two parties' points.
//!
//! Both parties hold points in `[0, 256)^d`, aligned by an agreed ordered index set. For each
//! position the protocol decides whether the two points are within distance `δ` under a
//! [`Metric`] ([`L1`], [`LInf`] or [`L2`]), distances being taken with wraparound per
//! dimension.
//!
//! The decision is computed in two sparse oblivious transfers:
//!
//! 1. For every point and dimension the sender builds the table `h -> entry(own, h)` over all
//!    256 candidate peer values. A [`bsot::value`] transfer with the receiver's coordinate as
//!    choice leaves both parties with additive shares of the entries modulo `M`, which they sum
//!    into shares of the aggregate `g`.
//! 2. The sender builds a blinding table of length `M` mapping every accepted aggregate to the
//!    zero block and all others to a fresh random block. A [`bsot::block`] transfer, indexed by
//!    the two aggregate shares, yields blinded shares `z` with `z_s ^ z_r = 0` iff the points
//!    match.
//!
//! The blinded shares can be compared through [`crate::intersection`].
use std::marker::PhantomData;

use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{Level, debug, instrument};

use crate::{
    block::Block,
    bsot,
    channel::{self, Channel, SimpleChannel},
    crypto::AesRng,
    intersection::{DEFAULT_HASH_KEY, receive_intersection, send_hashed_shares},
    oprf::{self, OprfReceiver, OprfSender},
    ring::Zn,
};

mod l1;
mod l2;
mod linf;

pub use l1::L1;
pub use l2::L2;
pub use linf::LInf;

/// Bits per coordinate.
pub const INPUT_BIT_LEN: u32 = 8;
/// Number of possible coordinate values.
pub const INPUT_DOMAIN: usize = 1 << INPUT_BIT_LEN;
/// Largest supported output modulus. The blinding table holds `M` blocks per point.
pub const MAX_MODULUS: u64 = 1 << 20;

/// Invalid protocol parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Points must have at least one dimension.
    #[error("points must have at least one dimension")]
    ZeroDimensions,
    /// The threshold must be a coordinate difference.
    #[error("threshold {0} is outside the input domain")]
    DeltaOutOfRange(u32),
    /// The metric's modulus for this configuration exceeds [`MAX_MODULUS`].
    #[error("{metric} needs a modulus of {modulus}, at most {MAX_MODULUS} is supported")]
    ModulusTooLarge {
        /// Name of the metric.
        metric: &'static str,
        /// The required modulus.
        modulus: u128,
    },
}

/// Public parameters both parties must agree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistanceConfig {
    dimensions: usize,
    delta: u32,
}

impl DistanceConfig {
    /// Creates a configuration for `dimensions`-dimensional points and threshold `delta`.
    pub fn new(dimensions: usize, delta: u32) -> Result<Self, ConfigError> {
        let config = Self { dimensions, delta };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.dimensions == 0 {
            return Err(ConfigError::ZeroDimensions);
        }
        if self.delta as usize >= INPUT_DOMAIN {
            return Err(ConfigError::DeltaOutOfRange(self.delta));
        }
        Ok(())
    }

    /// Number of dimensions `d`.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Threshold `δ`.
    pub fn delta(&self) -> u32 {
        self.delta
    }

    /// The output modulus `M` of `metric` under this configuration.
    pub fn modulus<M: Metric>(&self) -> Result<u64, ConfigError> {
        self.validate()?;
        let modulus = M::modulus(self);
        if modulus > MAX_MODULUS as u128 {
            return Err(ConfigError::ModulusTooLarge {
                metric: M::NAME,
                modulus,
            });
        }
        Ok(modulus as u64)
    }
}

/// Wraparound distance `min((a - b) mod 256, (b - a) mod 256)`.
pub fn wrap_distance(a: u8, b: u8) -> u8 {
    a.wrapping_sub(b).min(b.wrapping_sub(a))
}

/// A distance metric, decomposed into per-dimension table entries and an acceptance test on
/// their sum.
///
/// Implementations must keep the sum of `d` entries below [`Metric::modulus`] so that the
/// aggregate never wraps.
pub trait Metric {
    /// Name used in logs and errors.
    const NAME: &'static str;

    /// The output modulus `M`, before range checks.
    fn modulus(config: &DistanceConfig) -> u128;

    /// Entry of one dimension for own value `own` and candidate peer value `peer`.
    fn table_entry(config: &DistanceConfig, own: u8, peer: u8) -> u64;

    /// Whether the aggregate `g` of all dimensions signals a match.
    fn accepts(config: &DistanceConfig, g: u64) -> bool;
}

/// Errors occurring during the distance protocols.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A sparse oblivious transfer failed.
    #[error(transparent)]
    Ot(#[from] bsot::Error),
    /// The OPRF setup failed.
    #[error(transparent)]
    Oprf(#[from] oprf::Error),
    /// Blinded shares could not be exchanged.
    #[error(transparent)]
    Channel(#[from] channel::Error),
    /// The number of points differs from the length of the ordered index set.
    #[error("expected {expected} points, got {actual}")]
    PointCount {
        /// Length of the index set.
        expected: usize,
        /// Number of points.
        actual: usize,
    },
    /// A point has the wrong number of coordinates.
    #[error("point {point} has {actual} coordinates instead of {expected}")]
    DimensionMismatch {
        /// Index of the point.
        point: usize,
        /// Configured dimensions.
        expected: usize,
        /// Coordinates of the point.
        actual: usize,
    },
    /// A coordinate does not fit into [`INPUT_BIT_LEN`] bits.
    #[error("coordinate {0} is outside of the input domain")]
    InputOutOfDomain(u32),
}

fn check_points(
    config: &DistanceConfig,
    expected: usize,
    points: &[Vec<u32>],
) -> Result<Vec<Vec<u8>>, Error> {
    if points.len() != expected {
        return Err(Error::PointCount {
            expected,
            actual: points.len(),
        });
    }
    points
        .iter()
        .enumerate()
        .map(|(point, coords)| {
            if coords.len() != config.dimensions {
                return Err(Error::DimensionMismatch {
                    point,
                    expected: config.dimensions,
                    actual: coords.len(),
                });
            }
            coords
                .iter()
                .map(|c| u8::try_from(*c).map_err(|_| Error::InputOutOfDomain(*c)))
                .collect()
        })
        .collect()
}

/// The comparison table `h -> entry(own, h)` over all candidate peer coordinates.
fn comparison_table<M: Metric>(config: &DistanceConfig, own: u8, modulus: u64) -> Vec<Zn> {
    (0..INPUT_DOMAIN)
        .map(|peer| Zn::new(M::table_entry(config, own, peer as u8), modulus))
        .collect()
}

fn aggregate(shares: &[Vec<Zn>], modulus: u64) -> Vec<Vec<usize>> {
    shares
        .iter()
        .map(|row| {
            let g = row.iter().fold(Zn::zero(modulus), |acc, s| acc + *s);
            vec![g.value() as usize]
        })
        .collect()
}

/// The party building the comparison and blinding tables.
#[derive(Debug, Clone)]
pub struct Sender<M: Metric> {
    config: DistanceConfig,
    modulus: u64,
    metric: PhantomData<M>,
}

impl<M: Metric> Sender<M> {
    /// Creates a sender, checking that `config` is supported by the metric.
    pub fn new(config: DistanceConfig) -> Result<Self, ConfigError> {
        let modulus = config.modulus::<M>()?;
        Ok(Self {
            config,
            modulus,
            metric: PhantomData,
        })
    }

    /// Runs the protocol with the [`Receiver`] on the other end of `channel`, returning one
    /// blinded share per point of `ord_index_set`.
    #[instrument(level = Level::DEBUG, skip_all, fields(metric = M::NAME), err)]
    pub async fn send<C: Channel, R: CryptoRng + Rng>(
        &self,
        channel: &mut C,
        rng: &mut R,
        ord_index_set: &[Block],
        points: &[Vec<u32>],
    ) -> Result<Vec<Block>, Error> {
        let (cfg, modulus) = (&self.config, self.modulus);
        let points = check_points(cfg, ord_index_set.len(), points)?;
        let mut oprfs = OprfSender::setup(channel, rng, 2).await?.into_iter();
        let (Some(value_oprf), Some(blind_oprf)) = (oprfs.next(), oprfs.next()) else {
            unreachable!("OPRF setup returns the requested number of instances");
        };

        let tables: Vec<Vec<Vec<Zn>>> = points
            .iter()
            .map(|point| {
                point
                    .iter()
                    .map(|own| comparison_table::<M>(cfg, *own, modulus))
                    .collect()
            })
            .collect();
        let choice_shares = vec![vec![0; cfg.dimensions]; points.len()];
        let mut value_ot =
            bsot::value::Sender::new(value_oprf, cfg.dimensions, INPUT_DOMAIN, modulus);
        let shares = value_ot
            .send(channel, rng, ord_index_set, &tables, &choice_shares)
            .await?;
        drop(tables);
        let g = aggregate(&shares, modulus);
        debug!(points = points.len(), modulus, "aggregated table shares");

        let blinding: Vec<Vec<Vec<Block>>> = (0..points.len())
            .map(|_| {
                let r: Block = rng.random();
                let table = (0..modulus)
                    .map(|x| if M::accepts(cfg, x) { Block::ZERO } else { r })
                    .collect();
                vec![table]
            })
            .collect();
        let mut blind_ot = bsot::block::Sender::new(blind_oprf, 1, modulus as usize);
        let z = blind_ot
            .send(channel, rng, ord_index_set, &blinding, &g)
            .await?;
        debug!(points = points.len(), "blinded shares computed");
        Ok(z.into_iter().flatten().collect())
    }
}

/// The party choosing table entries with its own coordinates.
#[derive(Debug, Clone)]
pub struct Receiver<M: Metric> {
    config: DistanceConfig,
    modulus: u64,
    metric: PhantomData<M>,
}

impl<M: Metric> Receiver<M> {
    /// Creates a receiver, checking that `config` is supported by the metric.
    pub fn new(config: DistanceConfig) -> Result<Self, ConfigError> {
        let modulus = config.modulus::<M>()?;
        Ok(Self {
            config,
            modulus,
            metric: PhantomData,
        })
    }

    /// Runs the protocol with the [`Sender`] on the other end of `channel`, returning one
    /// blinded share per point of `ord_index_set`.
    #[instrument(level = Level::DEBUG, skip_all, fields(metric = M::NAME), err)]
    pub async fn receive<C: Channel, R: CryptoRng + Rng>(
        &self,
        channel: &mut C,
        rng: &mut R,
        ord_index_set: &[Block],
        points: &[Vec<u32>],
    ) -> Result<Vec<Block>, Error> {
        let (cfg, modulus) = (&self.config, self.modulus);
        let points = check_points(cfg, ord_index_set.len(), points)?;
        let mut oprfs = OprfReceiver::setup(channel, rng, 2).await?.into_iter();
        let (Some(value_oprf), Some(blind_oprf)) = (oprfs.next(), oprfs.next()) else {
            unreachable!("OPRF setup returns the requested number of instances");
        };

        let choices: Vec<Vec<usize>> = points
            .iter()
            .map(|point| point.iter().map(|c| *c as usize).collect())
            .collect();
        let mut value_ot =
            bsot::value::Receiver::new(value_oprf, cfg.dimensions, INPUT_DOMAIN, modulus);
        let shares = value_ot
            .receive(channel, rng, ord_index_set, &choices)
            .await?;
        let g = aggregate(&shares, modulus);
        debug!(points = points.len(), modulus, "aggregated table shares");

        let mut blind_ot = bsot::block::Receiver::new(blind_oprf, 1, modulus as usize);
        let z = blind_ot.receive(channel, rng, ord_index_set, &g).await?;
        debug!(points = points.len(), "blinded shares computed");
        Ok(z.into_iter().flatten().collect())
    }
}

/// Runs both parties locally over a [`SimpleChannel`] pair and reveals the indices of the
/// matching positions to the caller.
///
/// Both point lists are aligned by position. Uses fresh [`AesRng`]s, random point tokens and
/// [`DEFAULT_HASH_KEY`].
pub async fn simulate<M: Metric>(
    config: DistanceConfig,
    sender_points: &[Vec<u32>],
    receiver_points: &[Vec<u32>],
) -> Result<Vec<usize>, Error> {
    let sender = Sender::<M>::new(config)?;
    let receiver = Receiver::<M>::new(config)?;
    let (mut channel_s, mut channel_r) = SimpleChannel::pair();
    let mut rng_s = AesRng::new();
    let mut rng_r = AesRng::new();
    let ord_index_set: Vec<Block> = (0..sender_points.len()).map(|_| rng_s.random()).collect();

    let run_sender = async {
        let z = sender
            .send(&mut channel_s, &mut rng_s, &ord_index_set, sender_points)
            .await?;
        send_hashed_shares(&mut channel_s, DEFAULT_HASH_KEY, &z).await?;
        Ok::<_, Error>(())
    };
    let run_receiver = async {
        let z = receiver
            .receive(&mut channel_r, &mut rng_r, &ord_index_set, receiver_points)
            .await?;
        Ok::<_, Error>(receive_intersection(&mut channel_r, DEFAULT_HASH_KEY, &z).await?)
    };
    let ((), matches) = futures::try_join!(run_sender, run_receiver)?;
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn table_is_deterministic<M: Metric>(
        d: usize,
        delta: u32,
        own: u8,
    ) -> Result<(), TestCaseError> {
        let config = DistanceConfig::new(d, delta).unwrap();
        let Ok(modulus) = config.modulus::<M>() else {
            return Ok(());
        };
        let table = comparison_table::<M>(&config, own, modulus);
        prop_assert_eq!(&table, &comparison_table::<M>(&config, own, modulus));
        prop_assert_eq!(INPUT_DOMAIN, table.len());
        for (peer, entry) in table.iter().enumerate() {
            prop_assert_eq!(modulus, entry.modulus());
            prop_assert_eq!(M::table_entry(&config, own, peer as u8), entry.value());
        }
        Ok(())
    }

    proptest! {
        #[test]
        fn comparison_tables_are_deterministic(
            d in 1_usize..6,
            delta in 0_u32..256,
            own in any::<u8>()
        ) {
            table_is_deterministic::<L1>(d, delta, own)?;
            table_is_deterministic::<LInf>(d, delta, own)?;
            table_is_deterministic::<L2>(d, delta, own)?;
        }
    }

    #[test]
    fn wrap_distance_is_symmetric_and_wraps() {
        assert_eq!(0, wrap_distance(5, 5));
        assert_eq!(2, wrap_distance(5, 7));
        assert_eq!(2, wrap_distance(7, 5));
        assert_eq!(1, wrap_distance(0, 255));
        assert_eq!(128, wrap_distance(0, 128));
        assert_eq!(127, wrap_distance(0, 129));
    }

    #[test]
    fn config_validation() {
        assert_eq!(Err(ConfigError::ZeroDimensions), DistanceConfig::new(0, 1));
        assert_eq!(
            Err(ConfigError::DeltaOutOfRange(256)),
            DistanceConfig::new(1, 256)
        );
        let config = DistanceConfig::new(3, 4).unwrap();
        assert_eq!(3, config.dimensions());
        assert_eq!(4, config.delta());
        assert_eq!(Ok(16), config.modulus::<L1>());
        assert_eq!(Ok(4), config.modulus::<LInf>());
        assert_eq!(Ok(52), config.modulus::<L2>());
    }

    #[test]
    fn oversized_modulus_is_rejected() {
        let config = DistanceConfig::new(100, 255).unwrap();
        assert!(matches!(
            config.modulus::<L2>(),
            Err(ConfigError::ModulusTooLarge { metric: "L2", .. })
        ));
        assert!(Sender::<L2>::new(config).is_err());
        assert!(Receiver::<L1>::new(config).is_ok());
    }

    #[test]
    fn points_are_checked() {
        let config = DistanceConfig::new(2, 1).unwrap();
        assert!(matches!(
            check_points(&config, 2, &[vec![1, 2]]),
            Err(Error::PointCount {
                expected: 2,
                actual: 1
            })
        ));
        assert!(matches!(
            check_points(&config, 1, &[vec![1]]),
            Err(Error::DimensionMismatch { point: 0, .. })
        ));
        assert!(matches!(
            check_points(&config, 1, &[vec![1, 256]]),
            Err(Error::InputOutOfDomain(256))
        ));
        assert_eq!(
            vec![vec![1, 255]],
            check_points(&config, 1, &[vec![1, 255]]).unwrap()
        );
    }

    #[tokio::test]
    async fn simulate_reveals_matching_positions() {
        let config = DistanceConfig::new(2, 2).unwrap();
        let sender_points = vec![vec![10, 10], vec![0, 0], vec![100, 50], vec![7, 7]];
        let receiver_points = vec![vec![11, 9], vec![254, 0], vec![100, 53], vec![200, 7]];
        let matches = simulate::<L1>(config, &sender_points, &receiver_points)
            .await
            .unwrap();
        assert_eq!(vec![0, 1], matches);
    }
}
