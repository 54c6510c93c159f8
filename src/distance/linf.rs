use crate::distance::{DistanceConfig, Metric, wrap_distance};

/// Chebyshev distance: matches iff every dimension is within `δ`.
///
/// Entries are 1 for dimensions within `δ`, the aggregate counts them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LInf;

impl Metric for LInf {
    const NAME: &'static str = "LInf";

    fn modulus(config: &DistanceConfig) -> u128 {
        config.dimensions() as u128 + 1
    }

    fn table_entry(config: &DistanceConfig, own: u8, peer: u8) -> u64 {
        (wrap_distance(own, peer) as u32 <= config.delta()) as u64
    }

    fn accepts(config: &DistanceConfig, g: u64) -> bool {
        g == config.dimensions() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_dimensions_within_threshold() {
        let config = DistanceConfig::new(3, 2).unwrap();
        assert_eq!(1, LInf::table_entry(&config, 10, 12));
        assert_eq!(0, LInf::table_entry(&config, 10, 13));
        assert_eq!(1, LInf::table_entry(&config, 1, 255));
        assert!(LInf::accepts(&config, 3));
        assert!(!LInf::accepts(&config, 2));
        assert!(!LInf::accepts(&config, 0));
    }

    #[test]
    fn modulus_is_one_above_dimensions() {
        let config = DistanceConfig::new(5, 0).unwrap();
        assert_eq!(6, LInf::modulus(&config));
    }
}
