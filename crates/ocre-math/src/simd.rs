//! SIMD batch helpers for the CPU kernels.
//!
//! Built on the `wide` crate for portable SIMD on stable Rust. Kernels batch
//! four pixels (16 floats) at a time; the helpers here guarantee bit-identical
//! results to the scalar fallbacks for finite inputs.

use wide::f32x4;

/// `out = in * scale + offset` over one RGBA pixel.
#[inline]
pub fn mul_add_x4(values: [f32; 4], scale: [f32; 4], offset: [f32; 4]) -> [f32; 4] {
    let v = f32x4::from(values);
    let s = f32x4::from(scale);
    let o = f32x4::from(offset);
    (v * s + o).to_array()
}

/// Clamps one RGBA pixel to [lo, hi].
#[inline]
pub fn clamp_x4(values: [f32; 4], lo: f32, hi: f32) -> [f32; 4] {
    let v = f32x4::from(values);
    v.fast_max(f32x4::splat(lo)).fast_min(f32x4::splat(hi)).to_array()
}

/// Row-major 4x4 matrix times RGBA pixel, plus offset.
#[inline]
pub fn mat4_mul_add_x4(m: &[f32; 16], v: [f32; 4], offset: [f32; 4]) -> [f32; 4] {
    let vx = f32x4::splat(v[0]);
    let vy = f32x4::splat(v[1]);
    let vz = f32x4::splat(v[2]);
    let vw = f32x4::splat(v[3]);
    // Columns of the row-major matrix.
    let c0 = f32x4::from([m[0], m[4], m[8], m[12]]);
    let c1 = f32x4::from([m[1], m[5], m[9], m[13]]);
    let c2 = f32x4::from([m[2], m[6], m[10], m[14]]);
    let c3 = f32x4::from([m[3], m[7], m[11], m[15]]);
    (c0 * vx + c1 * vy + c2 * vz + c3 * vw + f32x4::from(offset)).to_array()
}

/// In-place `v * scale + offset` over a packed RGBA buffer.
pub fn mul_add_rgba_inplace(pixels: &mut [f32], scale: [f32; 4], offset: [f32; 4]) {
    let s = f32x4::from(scale);
    let o = f32x4::from(offset);
    for chunk in pixels.chunks_exact_mut(4) {
        let v = f32x4::from([chunk[0], chunk[1], chunk[2], chunk[3]]);
        chunk.copy_from_slice(&(v * s + o).to_array());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_add_matches_scalar() {
        let v = [0.1_f32, 0.2, 0.3, 0.4];
        let s = [2.0_f32, 2.0, 2.0, 1.0];
        let o = [0.5_f32, 0.5, 0.5, 0.0];
        let r = mul_add_x4(v, s, o);
        for i in 0..4 {
            assert_eq!(r[i], v[i] * s[i] + o[i]);
        }
    }

    #[test]
    fn clamp_bounds() {
        let r = clamp_x4([-1.0, 0.5, 2.0, 1.0], 0.0, 1.0);
        assert_eq!(r, [0.0, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn mat4_identity_passthrough() {
        let id = [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0_f32,
        ];
        let v = [0.25, 0.5, 0.75, 1.0];
        assert_eq!(mat4_mul_add_x4(&id, v, [0.0; 4]), v);
    }

    #[test]
    fn buffer_inplace() {
        let mut pixels = vec![0.5_f32; 8];
        mul_add_rgba_inplace(&mut pixels, [2.0; 4], [0.0; 4]);
        assert!(pixels.iter().all(|&v| v == 1.0));
    }
}
