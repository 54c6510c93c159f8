//! Integers modulo a runtime modulus, used for additive secret sharing.
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// An element of `Z_M`, carrying its modulus `M`.
///
/// All arithmetic wraps modulo `M`. Combining elements of different moduli is a
/// programming error and caught by a debug assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Zn {
    value: u64,
    modulus: u64,
}

impl Zn {
    /// Reduces `value` into `[0, modulus)`.
    ///
    /// # Panics
    /// If `modulus` is zero.
    pub fn new(value: u64, modulus: u64) -> Self {
        assert_ne!(modulus, 0, "modulus must be non-zero");
        Self {
            value: value % modulus,
            modulus,
        }
    }

    /// The zero element of `Z_modulus`.
    pub fn zero(modulus: u64) -> Self {
        Self::new(0, modulus)
    }

    /// A uniformly random element of `Z_modulus`.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, modulus: u64) -> Self {
        assert_ne!(modulus, 0, "modulus must be non-zero");
        Self {
            value: rng.random_range(0..modulus),
            modulus,
        }
    }

    /// The canonical representative in `[0, modulus)`.
    pub fn value(&self) -> u64 {
        self.value
    }

    /// The modulus of this element.
    pub fn modulus(&self) -> u64 {
        self.modulus
    }
}

impl From<Zn> for u64 {
    fn from(z: Zn) -> Self {
        z.value
    }
}

impl Add for Zn {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        debug_assert_eq!(self.modulus, rhs.modulus, "mixed moduli");
        let sum = (self.value as u128 + rhs.value as u128) % self.modulus as u128;
        Self {
            value: sum as u64,
            modulus: self.modulus,
        }
    }
}

impl AddAssign for Zn {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Neg for Zn {
    type Output = Self;

    fn neg(self) -> Self {
        let value = if self.value == 0 {
            0
        } else {
            self.modulus - self.value
        };
        Self {
            value,
            modulus: self.modulus,
        }
    }
}

impl Sub for Zn {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        debug_assert_eq!(self.modulus, rhs.modulus, "mixed moduli");
        self + (-rhs)
    }
}

impl SubAssign for Zn {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::Zn;
    use crate::crypto::AesRng;

    #[test]
    fn new_reduces() {
        assert_eq!(3, Zn::new(10, 7).value());
        assert_eq!(0, Zn::new(7, 7).value());
        assert_eq!(7, Zn::new(7, 7).modulus());
    }

    #[test]
    fn arithmetic_wraps() {
        let m = 5;
        assert_eq!(Zn::new(1, m), Zn::new(3, m) + Zn::new(3, m));
        assert_eq!(Zn::new(4, m), Zn::new(1, m) - Zn::new(2, m));
        assert_eq!(Zn::new(0, m), -Zn::zero(m));
        let mut acc = Zn::zero(m);
        for _ in 0..7 {
            acc += Zn::new(1, m);
        }
        assert_eq!(2, u64::from(acc));
    }

    #[test]
    fn large_modulus_does_not_overflow() {
        let m = u64::MAX;
        let a = Zn::new(u64::MAX - 1, m);
        assert_eq!(Zn::new(u64::MAX - 2, m), a + a);
    }

    #[test]
    fn random_shares_reconstruct() {
        let mut rng = AesRng::seed_from_u64(7);
        let m = 33;
        for v in 0..m {
            let secret = Zn::new(v, m);
            let share = Zn::random(&mut rng, m);
            let other = secret - share;
            assert!(share.value() < m);
            assert_eq!(secret, share + other);
        }
    }

    #[test]
    #[should_panic]
    fn zero_modulus_panics() {
        Zn::new(1, 0);
    }
}
