//! 3x3 matrix, used for the linear part of a transform and for normal matrices.
//!
//! Same conventions as [`Mat4`](super::mat4::Mat4): column vectors on the
//! right, storage indexed as `data[row][col]`.

use std::ops::Mul;

use approx::{AbsDiffEq, RelativeEq};

use super::vec3::Vec3;

/// Smallest `|det|` accepted, as a fraction of the product of the column
/// lengths.
const SINGULAR_TOLERANCE: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3 {
    data: [[f32; 3]; 3],
}

impl Mat3 {
    pub const IDENTITY: Self = Self::new([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);

    pub const fn new(data: [[f32; 3]; 3]) -> Self {
        Mat3 { data }
    }

    /// Builds a matrix whose columns are the given basis vectors.
    pub fn from_cols(x: Vec3, y: Vec3, z: Vec3) -> Self {
        Mat3::new([[x.x, y.x, z.x], [x.y, y.y, z.y], [x.z, y.z, z.z]])
    }

    pub fn col(&self, col: usize) -> Vec3 {
        Vec3::new(self.data[0][col], self.data[1][col], self.data[2][col])
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row][col]
    }

    pub fn transpose(&self) -> Self {
        let m = &self.data;
        Mat3::new([
            [m[0][0], m[1][0], m[2][0]],
            [m[0][1], m[1][1], m[2][1]],
            [m[0][2], m[1][2], m[2][2]],
        ])
    }

    pub fn determinant(&self) -> f32 {
        let m = &self.data;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// Computes the inverse via the adjugate.
    /// Returns `None` if the matrix is singular.
    ///
    /// Singularity is judged relative to the column lengths, so a uniformly
    /// tiny (or huge) scale still inverts.
    pub fn inverse(&self) -> Option<Mat3> {
        let det = self.determinant();
        let volume =
            self.col(0).magnitude() * self.col(1).magnitude() * self.col(2).magnitude();
        if !(det.abs() > volume * SINGULAR_TOLERANCE) || !det.is_finite() {
            return None;
        }
        let inv_det = 1.0 / det;
        let m = &self.data;

        // Adjugate = transpose of the cofactor matrix.
        Some(Mat3::new([
            [
                (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det,
                (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det,
                (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det,
            ],
            [
                (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det,
                (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det,
                (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det,
            ],
            [
                (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det,
                (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det,
                (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det,
            ],
        ]))
    }

    /// True when the columns are unit length and mutually perpendicular,
    /// each within `tolerance`.
    pub fn is_orthonormal(&self, tolerance: f32) -> bool {
        let (x, y, z) = (self.col(0), self.col(1), self.col(2));
        (x.dot(x) - 1.0).abs() <= tolerance
            && (y.dot(y) - 1.0).abs() <= tolerance
            && (z.dot(z) - 1.0).abs() <= tolerance
            && x.dot(y).abs() <= tolerance
            && x.dot(z).abs() <= tolerance
            && y.dot(z).abs() <= tolerance
    }

    /// Elements in column-major order, ready for a `mat3` uniform upload.
    pub fn to_cols_array(&self) -> [f32; 9] {
        let m = &self.data;
        [
            m[0][0], m[1][0], m[2][0], m[0][1], m[1][1], m[2][1], m[0][2], m[1][2], m[2][2],
        ]
    }
}

impl Default for Mat3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul<Mat3> for Mat3 {
    type Output = Mat3;

    fn mul(self, rhs: Mat3) -> Self::Output {
        let mut result = [[0.0f32; 3]; 3];
        for (row, out) in result.iter_mut().enumerate() {
            for (col, value) in out.iter_mut().enumerate() {
                *value = self.data[row][0] * rhs.data[0][col]
                    + self.data[row][1] * rhs.data[1][col]
                    + self.data[row][2] * rhs.data[2][col];
            }
        }
        Mat3::new(result)
    }
}

impl Mul<Vec3> for Mat3 {
    type Output = Vec3;

    fn mul(self, v: Vec3) -> Self::Output {
        let m = &self.data;
        Vec3::new(
            m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
            m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
            m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
        )
    }
}

impl AbsDiffEq for Mat3 {
    type Epsilon = f32;

    fn default_epsilon() -> f32 {
        f32::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.data
            .iter()
            .flatten()
            .zip(other.data.iter().flatten())
            .all(|(a, b)| a.abs_diff_eq(b, epsilon))
    }
}

impl RelativeEq for Mat3 {
    fn default_max_relative() -> f32 {
        f32::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: f32, max_relative: f32) -> bool {
        self.data
            .iter()
            .flatten()
            .zip(other.data.iter().flatten())
            .all(|(a, b)| a.relative_eq(b, epsilon, max_relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn inverse_of_diagonal() {
        let m = Mat3::new([[2.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 0.5]]);
        let inv = m.inverse().unwrap();
        assert_relative_eq!(inv, Mat3::new([[0.5, 0.0, 0.0], [0.0, 0.25, 0.0], [0.0, 0.0, 2.0]]));
    }

    #[test]
    fn inverse_times_matrix_is_identity() {
        let m = Mat3::new([[1.0, 2.0, 0.5], [0.0, 3.0, -1.0], [2.0, 0.0, 1.0]]);
        let inv = m.inverse().unwrap();
        assert_relative_eq!(m * inv, Mat3::IDENTITY, epsilon = 1e-5);
    }

    #[test]
    fn singular_matrix_has_no_inverse() {
        let m = Mat3::new([[1.0, 2.0, 3.0], [2.0, 4.0, 6.0], [0.0, 1.0, 1.0]]);
        assert!(m.inverse().is_none());
    }

    #[test]
    fn tiny_uniform_scale_still_inverts() {
        let m = Mat3::new([[0.002, 0.0, 0.0], [0.0, 0.002, 0.0], [0.0, 0.0, 0.002]]);
        let inv = m.inverse().unwrap();
        assert_relative_eq!(inv.get(1, 1), 500.0, max_relative = 1e-5);

        // Nearly flattened columns are still singular.
        let flat = Mat3::from_cols(Vec3::X, Vec3::Y, Vec3::new(1.0, 1.0, 1e-9));
        assert!(flat.inverse().is_none());
    }

    #[test]
    fn cols_array_is_column_major() {
        let m = Mat3::from_cols(Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0), Vec3::new(7.0, 8.0, 9.0));
        assert_eq!(m.to_cols_array(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
    }
}
