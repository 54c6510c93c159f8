use crate::distance::{DistanceConfig, Metric, wrap_distance};

/// Manhattan distance: matches iff `Σ_j dist_j ≤ δ`.
///
/// Entries are clamped to `δ + 1`, any clamped dimension alone already exceeds `δ`.
#[derive(Debug, Clone, Copy, Default)]
pub struct L1;

impl Metric for L1 {
    const NAME: &'static str = "L1";

    fn modulus(config: &DistanceConfig) -> u128 {
        config.dimensions() as u128 * (config.delta() as u128 + 1) + 1
    }

    fn table_entry(config: &DistanceConfig, own: u8, peer: u8) -> u64 {
        let dist = wrap_distance(own, peer) as u64;
        let delta = config.delta() as u64;
        if dist <= delta { dist } else { delta + 1 }
    }

    fn accepts(config: &DistanceConfig, g: u64) -> bool {
        g <= config.delta() as u64
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn entries_are_clamped() {
        let config = DistanceConfig::new(2, 3).unwrap();
        assert_eq!(0, L1::table_entry(&config, 9, 9));
        assert_eq!(3, L1::table_entry(&config, 9, 12));
        assert_eq!(4, L1::table_entry(&config, 9, 13));
        assert_eq!(4, L1::table_entry(&config, 0, 128));
        assert_eq!(1, L1::table_entry(&config, 255, 0));
        assert!(L1::accepts(&config, 3));
        assert!(!L1::accepts(&config, 4));
    }

    proptest! {
        #[test]
        fn sum_of_entries_never_wraps(
            d in 1_usize..8,
            delta in 0_u32..256,
            a in any::<u8>(),
            b in any::<u8>()
        ) {
            let config = DistanceConfig::new(d, delta).unwrap();
            let modulus = L1::modulus(&config);
            let entry = L1::table_entry(&config, a, b);
            prop_assert_eq!(entry, L1::table_entry(&config, b, a));
            prop_assert!((entry as u128) * (d as u128) < modulus);
            prop_assert_eq!(
                L1::accepts(&config, entry),
                (wrap_distance(a, b) as u32) <= delta
            );
        }
    }
}
