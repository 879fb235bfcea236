//! Fixed-point math utilities for deterministic simulation.
//!
//! All simulation time, cooldowns and interpolation use fixed-point
//! arithmetic so that two runs of the same battle produce identical
//! results on every platform.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Fixed-point 2D vector, used for interpolated render positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate (column axis).
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate (row axis).
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
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

/// Serde support for hand-edited data files.
///
/// Writes fixed-point numbers as decimals (`0.05`, `1.5`) so RON config
/// stays readable. Conversion happens once at load time; the simulation
/// itself never touches floats.
pub mod fixed_decimal {
    use super::Fixed;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_num::<f64>().serialize(serializer)
    }

    /// Deserialize a fixed-point number from a decimal.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(value)
            .ok_or_else(|| D::Error::custom(format!("{value} is out of fixed-point range")))
    }

    /// Serde support for `Option<Fixed>` written as decimals.
    pub mod option {
        use super::Fixed;
        use serde::de::Error as _;
        use serde::{Deserialize, Deserializer, Serialize, Serializer};

        /// Serialize an optional fixed-point number.
        pub fn serialize<S>(value: &Option<Fixed>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            value.map(|v| v.to_num::<f64>()).serialize(serializer)
        }

        /// Deserialize an optional fixed-point number.
        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Fixed>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<f64>::deserialize(deserializer)? {
                Some(value) => Fixed::checked_from_num(value).map(Some).ok_or_else(|| {
                    D::Error::custom(format!("{value} is out of fixed-point range"))
                }),
                None => Ok(None),
            }
        }
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

/// Smoothstep ease-in/ease-out curve, `3t² - 2t³`, with `t` clamped to `[0, 1]`.
#[must_use]
pub fn ease_in_out(t: Fixed) -> Fixed {
    let t = t.clamp(Fixed::ZERO, Fixed::ONE);
    let three = Fixed::from_num(3);
    let two = Fixed::from_num(2);
    t * t * (three - two * t)
}

/// Reciprocal of a rate, e.g. seconds per attack from attacks per second.
///
/// Returns zero for non-positive rates; callers treat a zero interval as
/// "no waiting".
#[must_use]
pub fn reciprocal(rate: Fixed) -> Fixed {
    if rate <= Fixed::ZERO {
        Fixed::ZERO
    } else {
        Fixed::ONE / rate
    }
}

/// `base × 1.5^level`, rounded down to a whole number.
///
/// Computed as `base × 3^level / 2^level` in integers, saturating at
/// `u32::MAX`.
#[must_use]
pub fn scale_by_level(base: u32, level: u8) -> u32 {
    let level = u32::from(level);
    let scaled = u128::from(base) * 3u128.pow(level) >> level;
    u32::try_from(scaled).unwrap_or(u32::MAX)
}

/// Slack allowed when a timer is compared against zero or its duration.
///
/// Steps such as 1/20 s are not exact in binary fixed-point; the rounding
/// left after summing them must not hold a timer back by a whole tick.
pub const TIME_EPSILON: Fixed = Fixed::from_bits(1 << 12);

/// Run a countdown down by `dt`, snapping to zero within [`TIME_EPSILON`].
#[must_use]
pub fn countdown(remaining: Fixed, dt: Fixed) -> Fixed {
    let left = remaining.saturating_sub(dt);
    if left <= TIME_EPSILON {
        Fixed::ZERO
    } else {
        left
    }
}

/// Whether `elapsed` has reached `duration`, within [`TIME_EPSILON`].
#[must_use]
pub fn has_elapsed(elapsed: Fixed, duration: Fixed) -> bool {
    elapsed.saturating_add(TIME_EPSILON) >= duration
}

/// Apply a percentage bonus to a rate: `value × (100 + percent) / 100`.
#[must_use]
pub fn add_percent(value: Fixed, percent: u32) -> Fixed {
    value * Fixed::from_num(100 + percent) / Fixed::from_num(100)
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
        assert_eq!(a * Fixed::from_num(7), b * Fixed::from_num(7));
    }

    #[test]
    fn test_vec2_lerp() {
        let a = Vec2Fixed::new(Fixed::from_num(0), Fixed::from_num(0));
        let b = Vec2Fixed::new(Fixed::from_num(10), Fixed::from_num(20));
        let mid = a.lerp(b, Fixed::from_num(0.5));
        assert_eq!(mid, Vec2Fixed::new(Fixed::from_num(5), Fixed::from_num(10)));
    }

    #[test]
    fn test_ease_in_out_endpoints() {
        assert_eq!(ease_in_out(Fixed::ZERO), Fixed::ZERO);
        assert_eq!(ease_in_out(Fixed::ONE), Fixed::ONE);
        assert_eq!(ease_in_out(Fixed::from_num(0.5)), Fixed::from_num(0.5));
        // Clamped outside the unit interval
        assert_eq!(ease_in_out(Fixed::from_num(2)), Fixed::ONE);
        assert_eq!(ease_in_out(Fixed::from_num(-1)), Fixed::ZERO);
    }

    #[test]
    fn test_ease_in_out_is_slow_at_the_edges() {
        let quarter = ease_in_out(Fixed::from_num(0.25));
        assert!(quarter < Fixed::from_num(0.25));
    }

    #[test]
    fn test_scale_by_level() {
        assert_eq!(scale_by_level(10, 0), 10);
        assert_eq!(scale_by_level(10, 1), 15);
        assert_eq!(scale_by_level(10, 2), 22); // 22.5
        assert_eq!(scale_by_level(10, 3), 33); // 33.75
        assert_eq!(scale_by_level(1, 3), 3); // 3.375
    }

    #[test]
    fn test_scale_by_level_large_base() {
        assert_eq!(scale_by_level(1_000_000_000, 2), 2_250_000_000);
        assert_eq!(scale_by_level(u32::MAX, 3), u32::MAX);
    }

    #[test]
    fn test_twenty_steps_make_a_second() {
        let step = Fixed::ONE / Fixed::from_num(20);
        let mut cooldown = Fixed::ONE;
        let mut elapsed = Fixed::ZERO;
        for _ in 0..19 {
            cooldown = countdown(cooldown, step);
            elapsed += step;
            assert!(cooldown > Fixed::ZERO);
            assert!(!has_elapsed(elapsed, Fixed::ONE));
        }
        cooldown = countdown(cooldown, step);
        elapsed += step;
        assert_eq!(cooldown, Fixed::ZERO);
        assert!(has_elapsed(elapsed, Fixed::ONE));
    }

    #[test]
    fn test_reciprocal() {
        assert_eq!(reciprocal(Fixed::from_num(2)), Fixed::from_num(0.5));
        assert_eq!(reciprocal(Fixed::ZERO), Fixed::ZERO);
    }

    #[test]
    fn test_add_percent() {
        assert_eq!(
            add_percent(Fixed::from_num(2), 50),
            Fixed::from_num(3)
        );
    }
}
