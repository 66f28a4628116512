//! ULP-aware float comparison and half-float helpers.
//!
//! Bit-exact comparisons against a tolerance expressed in units in the last
//! place are used by the identity tests on op parameters, where a relative
//! epsilon would be either too loose near zero or too strict far from it.

use half::f16;

/// Maps a float's bit pattern onto a monotonically ordered integer line.
///
/// Negative floats are reflected so that consecutive representable values
/// differ by exactly one.
#[inline]
fn ordered_bits(v: f32) -> i64 {
    let bits = v.to_bits() as i32;
    let ordered = if bits < 0 { i32::MIN - bits } else { bits };
    ordered as i64
}

/// Distance in ULPs between two finite floats.
///
/// NaN compares at maximum distance from everything, including itself.
#[inline]
pub fn ulp_distance(a: f32, b: f32) -> u64 {
    if a.is_nan() || b.is_nan() {
        return u64::MAX;
    }
    (ordered_bits(a) - ordered_bits(b)).unsigned_abs()
}

/// True when `a` and `b` are within `tolerance` ULPs of each other.
#[inline]
pub fn within_ulps(a: f32, b: f32, tolerance: u64) -> bool {
    ulp_distance(a, b) <= tolerance
}

/// Converts a float to its IEEE half bit pattern (round to nearest even).
#[inline]
pub fn f32_to_half_bits(v: f32) -> u16 {
    f16::from_f32(v).to_bits()
}

/// Reconstructs a float from an IEEE half bit pattern.
#[inline]
pub fn half_bits_to_f32(bits: u16) -> f32 {
    f16::from_bits(bits).to_f32()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacent_floats_are_one_ulp() {
        let a = 1.0_f32;
        let b = f32::from_bits(a.to_bits() + 1);
        assert_eq!(ulp_distance(a, b), 1);
        assert!(within_ulps(a, b, 1));
        assert!(!within_ulps(a, b, 0));
    }

    #[test]
    fn sign_crossing() {
        // -0.0 and +0.0 share the same ordered position
        assert_eq!(ulp_distance(-0.0, 0.0), 0);
        let below = f32::from_bits((-0.0_f32).to_bits() + 1);
        assert_eq!(ulp_distance(below, 0.0), 1);
    }

    #[test]
    fn nan_never_close() {
        assert_eq!(ulp_distance(f32::NAN, 1.0), u64::MAX);
        assert!(!within_ulps(f32::NAN, f32::NAN, u64::MAX - 1));
    }

    #[test]
    fn half_roundtrip_exact_patterns() {
        // All half bit patterns survive the round trip, including NaNs and infs.
        for bits in [0_u16, 0x3c00, 0x7c00, 0xfc00, 0x7e00, 0x8000, 0xffff] {
            let f = half_bits_to_f32(bits);
            if f.is_nan() {
                assert!(half_bits_to_f32(f32_to_half_bits(f)).is_nan());
            } else {
                assert_eq!(f32_to_half_bits(f), bits & 0xffff);
            }
        }
    }

    #[test]
    fn half_one_is_0x3c00() {
        assert_eq!(f32_to_half_bits(1.0), 0x3c00);
        assert_eq!(half_bits_to_f32(0x3c00), 1.0);
    }
}
