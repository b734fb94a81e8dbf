//! Compile-time unit safety for traverse quantities.
//!
//! Prevents mixing incompatible units like metres and seconds, or radians
//! and degrees. All types are `#[repr(transparent)]` wrappers around `f64`
//! with zero runtime overhead; angle types carry explicit conversions so a
//! slope in degrees can never silently feed a trig function.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Macro to implement common arithmetic operations for unit types
macro_rules! impl_unit_ops {
    ($type:ty, $unit_name:literal) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Neg for $type {
            type Output = Self;
            fn neg(self) -> Self::Output {
                Self(-self.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Mul<$type> for f64 {
            type Output = $type;
            fn mul(self, rhs: $type) -> Self::Output {
                <$type>::new(self * rhs.0)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl Div<$type> for $type {
            type Output = f64;
            fn div(self, rhs: $type) -> Self::Output {
                self.0 / rhs.0
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.4} {}", self.0, $unit_name)
            }
        }

        impl $type {
            /// Create a new value
            #[inline]
            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            /// Get the raw numeric value
            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }

            /// Absolute value
            #[inline]
            pub fn abs(self) -> Self {
                Self(self.0.abs())
            }
        }
    };
}

/// Horizontal or along-path distance in metres.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Metres(pub f64);
impl_unit_ops!(Metres, "m");

/// Duration in seconds.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Seconds(pub f64);
impl_unit_ops!(Seconds, "s");

/// Metabolic energy in joules.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Joules(pub f64);
impl_unit_ops!(Joules, "J");

/// Walking speed in metres per second.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct MetresPerSecond(pub f64);
impl_unit_ops!(MetresPerSecond, "m/s");

/// Angle in degrees (slopes, headings, max-slope thresholds).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Degrees(pub f64);
impl_unit_ops!(Degrees, "deg");

/// Angle in radians (what the trig-facing energetics consume).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Radians(pub f64);
impl_unit_ops!(Radians, "rad");

impl Degrees {
    #[inline]
    pub fn to_radians(self) -> Radians {
        Radians(self.0.to_radians())
    }
}

impl Radians {
    #[inline]
    pub fn to_degrees(self) -> Degrees {
        Degrees(self.0.to_degrees())
    }
}

impl Metres {
    /// Distance covered at `speed`, as a duration.
    #[inline]
    pub fn over(self, speed: MetresPerSecond) -> Seconds {
        Seconds(self.0 / speed.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_unit_arithmetic() {
        let total = Metres(10.0) + Metres(4.5);
        assert_eq!(total, Metres(14.5));
        assert_eq!(total * 2.0, Metres(29.0));
        assert_eq!(Metres(29.0) / Metres(14.5), 2.0);
    }

    #[test]
    fn test_angle_round_trip() {
        let deg = Degrees(45.0);
        let rad = deg.to_radians();
        assert!((rad.value() - std::f64::consts::FRAC_PI_4).abs() < 1e-12);
        assert!((rad.to_degrees().value() - 45.0).abs() < 1e-12);
    }

    #[test]
    fn test_distance_over_speed() {
        let t = Metres(8.0).over(MetresPerSecond(1.6));
        assert!((t.value() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_serde_transparent() {
        let j: f64 = serde_json::from_str("42.5").unwrap();
        let e: Joules = serde_json::from_str("42.5").unwrap();
        assert_eq!(e.value(), j);
        assert_eq!(serde_json::to_string(&e).unwrap(), "42.5");
    }

    #[test]
    fn test_display_includes_unit() {
        assert_eq!(format!("{}", Seconds(1.5)), "1.5000 s");
    }
}
