//! Double-precision row-major 4x4 matrices.
//!
//! Op parameters are held in f64 and composed in f64; kernels narrow to f32
//! when they capture their derived quantities.

/// A row-major 4x4 matrix of f64.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4d {
    /// Matrix entries, row-major.
    pub m: [f64; 16],
}

impl Default for Mat4d {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mat4d {
    /// The identity matrix.
    pub const fn identity() -> Self {
        Self {
            m: [
                1.0, 0.0, 0.0, 0.0, //
                0.0, 1.0, 0.0, 0.0, //
                0.0, 0.0, 1.0, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ],
        }
    }

    /// Builds from row-major entries.
    pub const fn from_rows(m: [f64; 16]) -> Self {
        Self { m }
    }

    /// Embeds a 3x3 matrix into the upper-left corner of a 4x4 identity.
    pub fn from_3x3(m3: [f64; 9]) -> Self {
        let mut m = Self::identity().m;
        for r in 0..3 {
            for c in 0..3 {
                m[r * 4 + c] = m3[r * 3 + c];
            }
        }
        Self { m }
    }

    /// A diagonal matrix.
    pub fn from_diagonal(d: [f64; 4]) -> Self {
        let mut m = [0.0; 16];
        for i in 0..4 {
            m[i * 4 + i] = d[i];
        }
        Self { m }
    }

    /// Entry at (row, col).
    #[inline]
    pub fn at(&self, row: usize, col: usize) -> f64 {
        self.m[row * 4 + col]
    }

    /// True when every entry matches the identity to within `tol`.
    pub fn is_identity(&self, tol: f64) -> bool {
        let id = Self::identity();
        self.m
            .iter()
            .zip(id.m.iter())
            .all(|(a, b)| (a - b).abs() <= tol)
    }

    /// True when all off-diagonal entries are zero to within `tol`.
    pub fn is_diagonal(&self, tol: f64) -> bool {
        for r in 0..4 {
            for c in 0..4 {
                if r != c && self.at(r, c).abs() > tol {
                    return false;
                }
            }
        }
        true
    }

    /// Matrix product `self * rhs` (self applied second).
    pub fn mul(&self, rhs: &Mat4d) -> Mat4d {
        let a = &self.m;
        let b = &rhs.m;
        let mut r = [0.0; 16];
        for i in 0..4 {
            for j in 0..4 {
                r[i * 4 + j] = a[i * 4] * b[j]
                    + a[i * 4 + 1] * b[4 + j]
                    + a[i * 4 + 2] * b[8 + j]
                    + a[i * 4 + 3] * b[12 + j];
            }
        }
        Mat4d { m: r }
    }

    /// Matrix-vector product.
    pub fn apply(&self, v: [f64; 4]) -> [f64; 4] {
        let m = &self.m;
        [
            m[0] * v[0] + m[1] * v[1] + m[2] * v[2] + m[3] * v[3],
            m[4] * v[0] + m[5] * v[1] + m[6] * v[2] + m[7] * v[3],
            m[8] * v[0] + m[9] * v[1] + m[10] * v[2] + m[11] * v[3],
            m[12] * v[0] + m[13] * v[1] + m[14] * v[2] + m[15] * v[3],
        ]
    }

    /// Inverts by Gauss-Jordan elimination with partial pivoting.
    ///
    /// Returns `None` when the matrix is singular (pivot below 1e-12 after
    /// row exchange).
    pub fn inverse(&self) -> Option<Mat4d> {
        // Augmented [self | I], reduced in place.
        let mut a = self.m;
        let mut inv = Mat4d::identity().m;

        for col in 0..4 {
            // Partial pivot: largest magnitude in this column at or below the diagonal.
            let mut pivot_row = col;
            let mut pivot_abs = a[col * 4 + col].abs();
            for row in (col + 1)..4 {
                let cand = a[row * 4 + col].abs();
                if cand > pivot_abs {
                    pivot_abs = cand;
                    pivot_row = row;
                }
            }
            if pivot_abs < 1e-12 {
                return None;
            }
            if pivot_row != col {
                for k in 0..4 {
                    a.swap(col * 4 + k, pivot_row * 4 + k);
                    inv.swap(col * 4 + k, pivot_row * 4 + k);
                }
            }

            let pivot = a[col * 4 + col];
            for k in 0..4 {
                a[col * 4 + k] /= pivot;
                inv[col * 4 + k] /= pivot;
            }

            for row in 0..4 {
                if row == col {
                    continue;
                }
                let factor = a[row * 4 + col];
                if factor == 0.0 {
                    continue;
                }
                for k in 0..4 {
                    a[row * 4 + k] -= factor * a[col * 4 + k];
                    inv[row * 4 + k] -= factor * inv[col * 4 + k];
                }
            }
        }

        Some(Mat4d { m: inv })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_mat_close(a: &Mat4d, b: &Mat4d, tol: f64) {
        for i in 0..16 {
            assert!(
                (a.m[i] - b.m[i]).abs() < tol,
                "entry {i}: {} vs {}",
                a.m[i],
                b.m[i]
            );
        }
    }

    #[test]
    fn identity_properties() {
        let id = Mat4d::identity();
        assert!(id.is_identity(0.0));
        assert!(id.is_diagonal(0.0));
        assert_eq!(id.apply([1.0, 2.0, 3.0, 4.0]), [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn mul_with_identity() {
        let m = Mat4d::from_diagonal([2.0, 3.0, 4.0, 1.0]);
        assert_mat_close(&m.mul(&Mat4d::identity()), &m, 0.0);
        assert_mat_close(&Mat4d::identity().mul(&m), &m, 0.0);
    }

    #[test]
    fn embed_3x3() {
        let m = Mat4d::from_3x3([
            0.5, 0.1, 0.0, //
            0.0, 0.8, 0.2, //
            0.1, 0.0, 0.9,
        ]);
        assert_eq!(m.at(0, 0), 0.5);
        assert_eq!(m.at(3, 3), 1.0);
        assert_eq!(m.at(0, 3), 0.0);
        assert_eq!(m.at(3, 0), 0.0);
    }

    #[test]
    fn inverse_of_diagonal() {
        let m = Mat4d::from_diagonal([2.0, 4.0, 8.0, 1.0]);
        let inv = m.inverse().unwrap();
        assert_mat_close(
            &inv,
            &Mat4d::from_diagonal([0.5, 0.25, 0.125, 1.0]),
            1e-14,
        );
    }

    #[test]
    fn inverse_roundtrip_general() {
        let m = Mat4d::from_rows([
            0.41, 0.36, 0.18, 0.0, //
            0.21, 0.72, 0.07, 0.0, //
            0.02, 0.12, 0.95, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]);
        let inv = m.inverse().unwrap();
        assert_mat_close(&m.mul(&inv), &Mat4d::identity(), 1e-12);
    }

    #[test]
    fn singular_rejected() {
        // The canonical degenerate case: all color rows equal.
        let m = Mat4d::from_rows([
            0.3, 0.3, 0.3, 0.0, //
            0.3, 0.3, 0.3, 0.0, //
            0.3, 0.3, 0.3, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]);
        assert!(m.inverse().is_none());
    }

    #[test]
    fn pivoting_handles_zero_diagonal() {
        // Permutation matrix: zero on the diagonal but invertible.
        let m = Mat4d::from_rows([
            0.0, 1.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0, //
            0.0, 0.0, 1.0, 0.0,
        ]);
        let inv = m.inverse().unwrap();
        assert_mat_close(&m.mul(&inv), &Mat4d::identity(), 1e-14);
    }

    #[test]
    fn near_singular_still_inverts() {
        let mut rows = Mat4d::identity().m;
        rows[0] = 1e-6;
        let m = Mat4d::from_rows(rows);
        let inv = m.inverse().unwrap();
        let round = m.mul(&inv);
        assert!(round.is_identity(1e-5));
    }
}
