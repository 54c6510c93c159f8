use crate::distance::{DistanceConfig, Metric, wrap_distance};

/// Euclidean distance: matches iff `Σ_j dist_j² ≤ δ²`.
#[derive(Debug, Clone, Copy, Default)]
pub struct L2;

fn delta_sq(config: &DistanceConfig) -> u64 {
    config.delta() as u64 * config.delta() as u64
}

impl Metric for L2 {
    const NAME: &'static str = "L2";

    fn modulus(config: &DistanceConfig) -> u128 {
        config.dimensions() as u128 * (delta_sq(config) as u128 + 1) + 1
    }

    fn table_entry(config: &DistanceConfig, own: u8, peer: u8) -> u64 {
        let dist = wrap_distance(own, peer) as u64;
        if dist <= config.delta() as u64 {
            dist * dist
        } else {
            // exceeds δ² on its own
            delta_sq(config) + 1
        }
    }

    fn accepts(config: &DistanceConfig, g: u64) -> bool {
        g <= delta_sq(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squares_are_clamped() {
        let config = DistanceConfig::new(2, 3).unwrap();
        assert_eq!(21, L2::modulus(&config));
        assert_eq!(4, L2::table_entry(&config, 0, 254));
        assert_eq!(9, L2::table_entry(&config, 3, 0));
        assert_eq!(10, L2::table_entry(&config, 4, 0));
        assert!(L2::accepts(&config, 9));
        assert!(!L2::accepts(&config, 10));
        // (2, 2) is within 3, (2, 3) is not
        assert!(L2::accepts(&config, 4 + 4));
        assert!(!L2::accepts(&config, 4 + 9));
    }
}
