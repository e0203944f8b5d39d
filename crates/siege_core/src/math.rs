//! Fixed-point math utilities for deterministic simulation.
//!
//! All simulation math uses fixed-point arithmetic so that a battle
//! replays bit-for-bit on every platform. Addition of fixed-point values
//! is exact, which is what makes resource accrual independent of how a
//! span of time is split into ticks.

use fixed::types::I32F32;

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Build a tick duration from a tick rate (ticks per second).
///
/// Returns zero for a zero rate.
#[must_use]
pub fn tick_duration(tick_rate: u32) -> Fixed {
    if tick_rate == 0 {
        return Fixed::ZERO;
    }
    Fixed::ONE / Fixed::from_num(tick_rate)
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for human-written decimals in configuration files.
///
/// Configuration is read once at the boundary, so `speed: 140.0` in a RON
/// file is converted to fixed-point here and never touches a float again.
pub mod decimal_serde {
    use super::Fixed;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_num::<f64>().serialize(serializer)
    }

    /// Deserialize a decimal into a fixed-point number.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(value)
            .ok_or_else(|| D::Error::custom(format!("{value} is out of fixed-point range")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_determinism() {
        // Same operations must produce identical results
        let a = Fixed::from_num(1) / Fixed::from_num(3);
        let b = Fixed::from_num(1) / Fixed::from_num(3);
        assert_eq!(a, b);

        let result1 = a * Fixed::from_num(7);
        let result2 = b * Fixed::from_num(7);
        assert_eq!(result1, result2);
    }

    #[test]
    fn test_fixed_addition_is_exact() {
        let tenth = Fixed::from_num(0.1);
        let mut sum = Fixed::ZERO;
        for _ in 0..10 {
            sum += tenth;
        }
        assert_eq!(sum, tenth * Fixed::from_num(10));
    }

    #[test]
    fn test_tick_duration() {
        assert_eq!(tick_duration(2), Fixed::from_num(0.5));
        assert_eq!(tick_duration(0), Fixed::ZERO);
        let sixty = tick_duration(60);
        assert!(sixty > Fixed::ZERO && sixty < Fixed::from_num(0.02));
    }

    #[test]
    fn test_decimal_serde_reads_ron() {
        #[derive(serde::Deserialize)]
        struct Speed {
            #[serde(with = "decimal_serde")]
            value: Fixed,
        }

        let parsed: Speed = ron::from_str("(value: 140.5)").unwrap();
        assert_eq!(parsed.value, Fixed::from_num(140.5));
    }
}
