//! 4x4 homogeneous transformation matrix using column-major convention.
//!
//! # Convention
//! - Vectors are **column vectors** on the right: `Mat4 * Vec`
//! - Translation is stored in the **last column**
//! - Transforms chain **right-to-left**: `A * B * v` applies B first, then A
//! - Eye space is right-handed and looks down -Z; clip space uses the
//!   OpenGL depth range, NDC z in `[-1, 1]`
//!
//! # Example
//! ```ignore
//! let transform = rotation * scale;  // scale applied first, then rotation
//! let result = transform.transform_point(vertex);
//! ```

use std::ops::Mul;

use approx::{AbsDiffEq, RelativeEq};
use tracing::warn;

use super::mat3::Mat3;
use super::vec3::Vec3;
use super::vec4::Vec4;
use crate::error::{Result, TransformError};

/// Tolerance used when checking that a 3x3 block is orthonormal.
pub const RIGID_TOLERANCE: f32 = 1e-4;

/// 4x4 matrix stored as `data[row][col]` with column-major convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4 {
    data: [[f32; 4]; 4],
}

impl Mat4 {
    pub const IDENTITY: Self = Self::new([
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]);

    pub const fn new(data: [[f32; 4]; 4]) -> Self {
        Mat4 { data }
    }

    pub fn identity() -> Self {
        Self::IDENTITY
    }

    /// Builds a matrix from 16 scalars in column-major order (the layout
    /// OpenGL expects for `glUniformMatrix4fv` with `transpose = false`).
    pub fn from_cols_array(m: [f32; 16]) -> Self {
        Mat4::new([
            [m[0], m[4], m[8], m[12]],
            [m[1], m[5], m[9], m[13]],
            [m[2], m[6], m[10], m[14]],
            [m[3], m[7], m[11], m[15]],
        ])
    }

    /// Returns the 16 scalars in column-major order.
    pub fn to_cols_array(&self) -> [f32; 16] {
        let m = &self.data;
        [
            m[0][0], m[1][0], m[2][0], m[3][0], //
            m[0][1], m[1][1], m[2][1], m[3][1], //
            m[0][2], m[1][2], m[2][2], m[3][2], //
            m[0][3], m[1][3], m[2][3], m[3][3],
        ]
    }

    /// Builds an affine matrix from a linear part and a translation.
    pub fn from_basis(x: Vec3, y: Vec3, z: Vec3, translation: Vec3) -> Self {
        Mat4::new([
            [x.x, y.x, z.x, translation.x],
            [x.y, y.y, z.y, translation.y],
            [x.z, y.z, z.z, translation.z],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Creates a translation matrix.
    ///
    /// Translation is stored in the last column (column-major convention).
    pub fn translation(x: f32, y: f32, z: f32) -> Self {
        Mat4::new([
            [1.0, 0.0, 0.0, x],
            [0.0, 1.0, 0.0, y],
            [0.0, 0.0, 1.0, z],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Creates a scale matrix.
    pub fn scale(x: f32, y: f32, z: f32) -> Self {
        Mat4::new([
            [x, 0.0, 0.0, 0.0],
            [0.0, y, 0.0, 0.0],
            [0.0, 0.0, z, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Creates a counter-clockwise rotation of `angle` radians about the
    /// axis `(x, y, z)` using the Rodrigues formula.
    ///
    /// The axis must already be unit length. A non-unit axis produces a
    /// matrix that also scales and shears.
    pub fn rotation(angle: f32, x: f32, y: f32, z: f32) -> Self {
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        Mat4::new([
            [t * x * x + c, t * x * y - s * z, t * x * z + s * y, 0.0],
            [t * x * y + s * z, t * y * y + c, t * y * z - s * x, 0.0],
            [t * x * z - s * y, t * y * z + s * x, t * z * z + c, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Creates a right-handed perspective projection (OpenGL depth range).
    ///
    /// `fov_y` is the vertical field of view in radians. Parameters are not
    /// validated here; [`Frustum`](crate::frustum::Frustum) does that.
    pub fn perspective(fov_y: f32, aspect_ratio: f32, near: f32, far: f32) -> Self {
        let f = 1.0 / (fov_y / 2.0).tan();
        let a = (far + near) / (near - far);
        let b = 2.0 * far * near / (near - far);
        Mat4::new([
            [f / aspect_ratio, 0.0, 0.0, 0.0],
            [0.0, f, 0.0, 0.0],
            [0.0, 0.0, a, b],
            [0.0, 0.0, -1.0, 0.0],
        ])
    }

    /// Creates a parallel projection mapping the given box onto the
    /// `[-1, 1]` cube.
    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        let width = right - left;
        let height = top - bottom;
        let depth = far - near;
        Mat4::new([
            [2.0 / width, 0.0, 0.0, -(right + left) / width],
            [0.0, 2.0 / height, 0.0, -(top + bottom) / height],
            [0.0, 0.0, -2.0 / depth, -(far + near) / depth],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Returns `a * b`: `b` is applied first, then `a`.
    pub fn multiply(a: &Mat4, b: &Mat4) -> Mat4 {
        *a * *b
    }

    /// The linear (rotation/scale/shear) part of the transform.
    pub fn upper_left_3x3(&self) -> Mat3 {
        let m = &self.data;
        Mat3::new([
            [m[0][0], m[0][1], m[0][2]],
            [m[1][0], m[1][1], m[1][2]],
            [m[2][0], m[2][1], m[2][2]],
        ])
    }

    pub fn translation_part(&self) -> Vec3 {
        Vec3::new(self.data[0][3], self.data[1][3], self.data[2][3])
    }

    /// True when the bottom row is exactly `[0, 0, 0, 1]`.
    pub fn is_affine(&self) -> bool {
        self.data[3] == [0.0, 0.0, 0.0, 1.0]
    }

    /// True for an affine matrix whose linear part is orthonormal within
    /// `tolerance`.
    pub fn is_rigid(&self, tolerance: f32) -> bool {
        self.is_affine() && self.upper_left_3x3().is_orthonormal(tolerance)
    }

    /// Inverts a rotation + translation matrix.
    ///
    /// For `M = [R | t]` the inverse is `[R^T | -R^T t]`. Fails with
    /// [`TransformError::InvalidOperation`] when `self` is not rigid, since
    /// the shortcut gives a wrong answer for scaled, sheared or projective
    /// matrices.
    pub fn inverse_rigid(&self) -> Result<Mat4> {
        if !self.is_rigid(RIGID_TOLERANCE) {
            warn!(matrix = ?self, "rigid inverse requested on a non-rigid matrix");
            return Err(TransformError::InvalidOperation(
                "rigid inverse requires an orthonormal rotation and affine bottom row".into(),
            ));
        }

        let rt = self.upper_left_3x3().transpose();
        let t = -(rt * self.translation_part());
        Ok(Mat4::from_basis(rt.col(0), rt.col(1), rt.col(2), t))
    }

    /// Transforms a point (w = 1): rotation, scale and translation all apply.
    ///
    /// Affine matrices leave w at 1. For a projection matrix the result goes
    /// through [`Vec4::perspective_divide`], so this returns normalized
    /// device coordinates; a point on the eye plane (w = 0) comes back
    /// undivided. Use `Mat4 * Vec4` to keep the clip-space w.
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        let v = *self * Vec4::from_vec3(p, 1.0);
        v.perspective_divide().unwrap_or_else(|| v.to_vec3())
    }

    /// Transforms a direction (w = 0): only the linear part applies, never
    /// the translation.
    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        self.upper_left_3x3() * v
    }

    /// Normal matrix: inverse-transpose of the upper-left 3x3 block.
    ///
    /// Fails with [`TransformError::InvalidOperation`] when the block is
    /// singular (e.g. a zero scale on some axis).
    pub fn upper_left_3x3_inverse_transpose(&self) -> Result<Mat3> {
        self.upper_left_3x3()
            .inverse()
            .map(|inv| inv.transpose())
            .ok_or_else(|| {
                warn!(matrix = ?self, "normal matrix requested for a singular transform");
                TransformError::InvalidOperation("upper-left 3x3 block is singular".into())
            })
    }

    /// Access element at [row][col].
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row][col]
    }

    /// Set element at [row][col].
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.data[row][col] = value;
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Matrix multiplication: Mat4 * Mat4.
///
/// For column-major convention, `A * B * v` applies B first, then A.
impl Mul<Mat4> for Mat4 {
    type Output = Mat4;

    fn mul(self, rhs: Mat4) -> Self::Output {
        let mut result = [[0.0f32; 4]; 4];

        for (row, out) in result.iter_mut().enumerate() {
            for (col, value) in out.iter_mut().enumerate() {
                *value = self.data[row][0] * rhs.data[0][col]
                    + self.data[row][1] * rhs.data[1][col]
                    + self.data[row][2] * rhs.data[2][col]
                    + self.data[row][3] * rhs.data[3][col];
            }
        }

        Mat4::new(result)
    }
}

/// Transform a Vec4 by a matrix: Mat4 * Vec4 (column vector).
impl Mul<Vec4> for Mat4 {
    type Output = Vec4;

    fn mul(self, v: Vec4) -> Self::Output {
        let m = &self.data;
        Vec4::new(
            m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z + m[0][3] * v.w,
            m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z + m[1][3] * v.w,
            m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z + m[2][3] * v.w,
            m[3][0] * v.x + m[3][1] * v.y + m[3][2] * v.z + m[3][3] * v.w,
        )
    }
}

impl AbsDiffEq for Mat4 {
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

impl RelativeEq for Mat4 {
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
