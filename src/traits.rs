//! Shared trait abstractions for common patterns

use crate::core::geo::Point;

/// Identity affine matrix in `[a, b, c, d, e, f]` form.
pub const IDENTITY_MATRIX: [f64; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// 2D affine matrix operations.
///
/// Matrices use the canvas convention `[a, b, c, d, e, f]`, mapping
/// `(x, y)` to `(a*x + c*y + e, b*x + d*y + f)`.
pub trait MatrixTransform {
    /// Apply 2D transformation matrix
    fn apply_transform(&self, matrix: &[f64; 6]) -> Self;

    /// Inverse of an affine matrix, `None` when it is singular
    fn invert_matrix(m: &[f64; 6]) -> Option<[f64; 6]> {
        let det = m[0] * m[3] - m[1] * m[2];
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let a = m[3] / det;
        let b = -m[1] / det;
        let c = -m[2] / det;
        let d = m[0] / det;
        Some([a, b, c, d, -(a * m[4] + c * m[5]), -(b * m[4] + d * m[5])])
    }
}

impl MatrixTransform for Point {
    fn apply_transform(&self, matrix: &[f64; 6]) -> Self {
        Point::new(
            matrix[0] * self.x + matrix[2] * self.y + matrix[4], // a*x + c*y + e
            matrix[1] * self.x + matrix[3] * self.y + matrix[5], // b*x + d*y + f
        )
    }
}
