//! Sample bit depths and their numerical scale semantics.
//!
//! Every sample buffer carries a [`BitDepth`] tag. Integer depths carry a
//! maximum code value; converting to normalized 32-bit float divides by that
//! maximum, converting back multiplies and rounds half-to-even.

/// Bit depth of an image sample.
///
/// Integer depths are unsigned with the declared width; `U10`/`U12`/`U14`
/// are stored in 16-bit words but scale by their own maximum code value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BitDepth {
    /// 8-bit unsigned integer (max 255).
    U8,
    /// 10-bit unsigned integer (max 1023).
    U10,
    /// 12-bit unsigned integer (max 4095).
    U12,
    /// 14-bit unsigned integer (max 16383).
    U14,
    /// 16-bit unsigned integer (max 65535).
    U16,
    /// 32-bit unsigned integer (max 4294967295).
    U32,
    /// 16-bit half float.
    F16,
    /// 32-bit float.
    #[default]
    F32,
}

impl BitDepth {
    /// Declared width in bits.
    pub const fn bits(&self) -> u32 {
        match self {
            BitDepth::U8 => 8,
            BitDepth::U10 => 10,
            BitDepth::U12 => 12,
            BitDepth::U14 => 14,
            BitDepth::U16 | BitDepth::F16 => 16,
            BitDepth::U32 | BitDepth::F32 => 32,
        }
    }

    /// True for floating-point depths.
    pub const fn is_float(&self) -> bool {
        matches!(self, BitDepth::F16 | BitDepth::F32)
    }

    /// True for unsigned-integer depths.
    pub const fn is_integer(&self) -> bool {
        !self.is_float()
    }

    /// Maximum code value for integer depths; 1 for float depths.
    pub const fn max_value(&self) -> f64 {
        match self {
            BitDepth::U8 => 255.0,
            BitDepth::U10 => 1023.0,
            BitDepth::U12 => 4095.0,
            BitDepth::U14 => 16383.0,
            BitDepth::U16 => 65535.0,
            BitDepth::U32 => 4294967295.0,
            BitDepth::F16 | BitDepth::F32 => 1.0,
        }
    }

    /// Scale factor that normalizes a sample of this depth to [0, 1] float.
    ///
    /// Float depths scale by 1; integer depths by `1 / max_value()`.
    pub fn scale_to_f32(&self) -> f64 {
        1.0 / self.max_value()
    }

    /// Bytes occupied by one stored sample.
    pub const fn bytes_per_sample(&self) -> usize {
        match self {
            BitDepth::U8 => 1,
            BitDepth::U10 | BitDepth::U12 | BitDepth::U14 | BitDepth::U16 | BitDepth::F16 => 2,
            BitDepth::U32 | BitDepth::F32 => 4,
        }
    }

    /// Parses the CLF-style depth string ("8i", "10i", ..., "16f", "32f").
    pub fn from_clf_str(s: &str) -> Option<Self> {
        match s {
            "8i" => Some(BitDepth::U8),
            "10i" => Some(BitDepth::U10),
            "12i" => Some(BitDepth::U12),
            "14i" => Some(BitDepth::U14),
            "16i" => Some(BitDepth::U16),
            "32i" => Some(BitDepth::U32),
            "16f" => Some(BitDepth::F16),
            "32f" => Some(BitDepth::F32),
            _ => None,
        }
    }

    /// CLF-style depth string.
    pub const fn clf_str(&self) -> &'static str {
        match self {
            BitDepth::U8 => "8i",
            BitDepth::U10 => "10i",
            BitDepth::U12 => "12i",
            BitDepth::U14 => "14i",
            BitDepth::U16 => "16i",
            BitDepth::U32 => "32i",
            BitDepth::F16 => "16f",
            BitDepth::F32 => "32f",
        }
    }
}

impl std::fmt::Display for BitDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.clf_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_values() {
        assert_eq!(BitDepth::U8.max_value(), 255.0);
        assert_eq!(BitDepth::U10.max_value(), 1023.0);
        assert_eq!(BitDepth::U16.max_value(), 65535.0);
        assert_eq!(BitDepth::F32.max_value(), 1.0);
    }

    #[test]
    fn scale_roundtrip() {
        for depth in [BitDepth::U8, BitDepth::U10, BitDepth::U12, BitDepth::U16] {
            let max = depth.max_value();
            let normalized = max * depth.scale_to_f32();
            assert!((normalized - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn clf_strings() {
        assert_eq!(BitDepth::from_clf_str("10i"), Some(BitDepth::U10));
        assert_eq!(BitDepth::from_clf_str("32f"), Some(BitDepth::F32));
        assert_eq!(BitDepth::from_clf_str("24i"), None);
        assert_eq!(BitDepth::U12.clf_str(), "12i");
        assert_eq!(BitDepth::F16.to_string(), "16f");
    }

    #[test]
    fn storage_sizes() {
        assert_eq!(BitDepth::U8.bytes_per_sample(), 1);
        assert_eq!(BitDepth::U10.bytes_per_sample(), 2);
        assert_eq!(BitDepth::F16.bytes_per_sample(), 2);
        assert_eq!(BitDepth::F32.bytes_per_sample(), 4);
    }
}
