//! Structural parameters shared by the generator, the replay codec and the driver.

use std::fmt;

use crate::error::{HarnessError, Result};

/// Largest supported quotient width. The prefill pass emits one operation per
/// slot, so this bounds the size of a generated workload.
pub const MAX_QUOTIENT_BITS: u32 = 32;

/// Mask selecting the low `bits` bits of a `u64`.
pub const fn bitmask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Structural parameters fixed for the duration of one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Params {
    pub key_bits: u32,
    pub quotient_bits: u32,
    pub value_bits: u32,
    /// Target occupancy percentage (0-100) used to size the prefill.
    pub initial_load_factor: u32,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            key_bits: 16,
            quotient_bits: 8,
            value_bits: 8,
            initial_load_factor: 50,
        }
    }
}

impl Params {
    pub fn new(key_bits: u32, quotient_bits: u32, value_bits: u32, initial_load_factor: u32) -> Self {
        Self {
            key_bits,
            quotient_bits,
            value_bits,
            initial_load_factor,
        }
    }

    /// Check every field against its supported range.
    pub fn validate(&self) -> Result<()> {
        if !(1..=64).contains(&self.key_bits) {
            return Err(HarnessError::invalid(
                "key_bits",
                format!("{} is outside 1..=64", self.key_bits),
            ));
        }
        if self.value_bits > 64 {
            return Err(HarnessError::invalid(
                "value_bits",
                format!("{} is outside 0..=64", self.value_bits),
            ));
        }
        if self.quotient_bits > MAX_QUOTIENT_BITS {
            return Err(HarnessError::invalid(
                "quotient_bits",
                format!("{} is outside 0..={MAX_QUOTIENT_BITS}", self.quotient_bits),
            ));
        }
        if self.initial_load_factor > 100 {
            return Err(HarnessError::invalid(
                "initial_load_factor",
                format!("{} is outside 0..=100", self.initial_load_factor),
            ));
        }
        Ok(())
    }

    /// Nominal subject capacity, `2^quotient_bits`.
    pub fn capacity(&self) -> u64 {
        1u64 << self.quotient_bits.min(63)
    }

    /// Number of prefill inserts, `floor(capacity * load_factor / 100)`.
    pub fn prefill_count(&self) -> u64 {
        let scaled = u128::from(self.capacity()) * u128::from(self.initial_load_factor) / 100;
        scaled as u64
    }

    pub fn key_mask(&self) -> u64 {
        bitmask(self.key_bits)
    }

    pub fn value_mask(&self) -> u64 {
        bitmask(self.value_bits)
    }

    pub fn key_fits(&self, key: u64) -> bool {
        key & !self.key_mask() == 0
    }

    pub fn value_fits(&self, value: u64) -> bool {
        value & !self.value_mask() == 0
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "key_bits={} quotient_bits={} value_bits={} load_factor={}",
            self.key_bits, self.quotient_bits, self.value_bits, self.initial_load_factor
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitmask_edges() {
        assert_eq!(bitmask(0), 0);
        assert_eq!(bitmask(1), 1);
        assert_eq!(bitmask(8), 0xff);
        assert_eq!(bitmask(63), u64::MAX >> 1);
        assert_eq!(bitmask(64), u64::MAX);
    }

    #[test]
    fn test_prefill_count_boundaries() {
        let mut params = Params::new(16, 8, 8, 0);
        assert_eq!(params.prefill_count(), 0);

        params.initial_load_factor = 100;
        assert_eq!(params.prefill_count(), 256);

        params.initial_load_factor = 50;
        assert_eq!(params.prefill_count(), 128);

        // floor, not round
        let params = Params::new(16, 3, 8, 33);
        assert_eq!(params.prefill_count(), 2);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(Params::default().validate().is_ok());
        assert!(Params::new(0, 8, 8, 50).validate().is_err());
        assert!(Params::new(65, 8, 8, 50).validate().is_err());
        assert!(Params::new(16, 33, 8, 50).validate().is_err());
        assert!(Params::new(16, 8, 65, 50).validate().is_err());
        assert!(Params::new(16, 8, 8, 101).validate().is_err());
        assert!(Params::new(64, 0, 0, 100).validate().is_ok());
    }

    #[test]
    fn test_fits() {
        let params = Params::new(4, 2, 2, 50);
        assert!(params.key_fits(15));
        assert!(!params.key_fits(16));
        assert!(params.value_fits(3));
        assert!(!params.value_fits(4));
    }
}
