//! Pixel-level constants and helpers.

/// Rec.709 luma weight for red.
pub const REC709_LUMA_R: f32 = 0.2126;
/// Rec.709 luma weight for green.
pub const REC709_LUMA_G: f32 = 0.7152;
/// Rec.709 luma weight for blue.
pub const REC709_LUMA_B: f32 = 0.0722;

/// Rec.709 luma weights as an array.
pub const REC709_LUMA: [f32; 3] = [REC709_LUMA_R, REC709_LUMA_G, REC709_LUMA_B];

/// Rec.709 luma of an RGB triple.
#[inline]
pub fn luma_rec709(rgb: [f32; 3]) -> f32 {
    rgb[0] * REC709_LUMA_R + rgb[1] * REC709_LUMA_G + rgb[2] * REC709_LUMA_B
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one() {
        let sum: f32 = REC709_LUMA.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn grey_is_its_own_luma() {
        let l = luma_rec709([0.5, 0.5, 0.5]);
        assert!((l - 0.5).abs() < 1e-6);
    }
}
