//! Oriented point in world space, used for cameras and movable objects.
//!
//! # Coordinate System
//!
//! Uses a **right-handed** coordinate system:
//! - X: positive right
//! - Y: positive up
//! - Z: positive toward the viewer; a default frame looks down -Z
//!
//! # Orientation
//!
//! Orientation is stored as two unit basis vectors, `forward` and `up`;
//! `right = forward x up` is derived. There are no Euler angles, so there is
//! no gimbal lock, and "move where I'm facing" is a single vector operation.
//! Every mutator re-orthonormalizes before returning.

use tracing::warn;

use crate::error::{Result, TransformError};
use crate::math::mat4::Mat4;
use crate::math::vec3::Vec3;

/// Shortest axis length accepted as a direction.
const MIN_AXIS_LENGTH: f32 = 1e-6;

/// One of a frame's own basis axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalAxis {
    Forward,
    Up,
    Right,
}

/// Position plus orthonormal `forward`/`up` basis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    origin: Vec3,
    forward: Vec3,
    up: Vec3,
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

/// Gram-Schmidt: normalize `forward`, then strip its component out of `up`
/// and normalize that. `None` if either input is degenerate or they are
/// parallel.
fn orthonormalize(forward: Vec3, up: Vec3) -> Option<(Vec3, Vec3)> {
    let forward = forward.try_normalize(MIN_AXIS_LENGTH)?;
    let up = (up - forward * up.dot(forward)).try_normalize(MIN_AXIS_LENGTH)?;
    Some((forward, up))
}

fn ensure_finite(name: &str, value: f32) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        warn!(name, value, "non-finite frame input");
        Err(TransformError::InvalidArgument(format!("{name} must be finite")))
    }
}

impl Frame {
    /// Creates a frame at the origin looking down -Z with +Y up.
    pub fn new() -> Self {
        Self {
            origin: Vec3::ZERO,
            forward: Vec3::FORWARD,
            up: Vec3::UP,
        }
    }

    /// Creates a frame with the given placement.
    ///
    /// `up` need not be exactly perpendicular to `forward`; it is projected.
    pub fn with_orientation(origin: Vec3, forward: Vec3, up: Vec3) -> Result<Self> {
        let mut frame = Self::new();
        frame.set_origin(origin);
        frame.set_orientation(forward, up)?;
        Ok(frame)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Unit viewing direction.
    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    /// Unit up direction, perpendicular to `forward`.
    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Unit right direction, `forward x up`.
    pub fn right(&self) -> Vec3 {
        self.forward.cross(self.up)
    }

    /// The world-space direction of one of the frame's own axes.
    pub fn axis(&self, axis: LocalAxis) -> Vec3 {
        match axis {
            LocalAxis::Forward => self.forward,
            LocalAxis::Up => self.up,
            LocalAxis::Right => self.right(),
        }
    }

    // =========================================================================
    // Placement
    // =========================================================================

    pub fn set_origin(&mut self, origin: Vec3) {
        self.origin = origin;
    }

    /// Sets both basis vectors at once. Leaves the frame unchanged and
    /// returns [`TransformError::InvalidArgument`] if they are degenerate
    /// or parallel.
    pub fn set_orientation(&mut self, forward: Vec3, up: Vec3) -> Result<()> {
        let (forward, up) = orthonormalize(forward, up).ok_or_else(|| {
            warn!(?forward, ?up, "degenerate frame orientation");
            TransformError::InvalidArgument(
                "forward and up must be non-zero and not parallel".into(),
            )
        })?;
        self.forward = forward;
        self.up = up;
        Ok(())
    }

    /// Sets the viewing direction, keeping `up` as close as possible.
    pub fn set_forward(&mut self, forward: Vec3) -> Result<()> {
        self.set_orientation(forward, self.up)
    }

    /// Sets the up direction; it is projected perpendicular to `forward`.
    pub fn set_up(&mut self, up: Vec3) -> Result<()> {
        self.set_orientation(self.forward, up)
    }

    /// Turns the frame to face `target`, keeping `up` as close as possible.
    pub fn look_at(&mut self, target: Vec3) -> Result<()> {
        self.set_forward(target - self.origin)
    }

    // =========================================================================
    // Movement
    // =========================================================================

    /// Moves along one of the frame's own axes. A non-finite `distance`
    /// returns [`TransformError::InvalidArgument`] and leaves the frame
    /// unchanged.
    pub fn move_local(&mut self, distance: f32, axis: LocalAxis) -> Result<()> {
        ensure_finite("distance", distance)?;
        self.origin = self.origin + self.axis(axis) * distance;
        Ok(())
    }

    /// Moves along the viewing direction; negative values back away.
    pub fn move_forward(&mut self, distance: f32) -> Result<()> {
        self.move_local(distance, LocalAxis::Forward)
    }

    pub fn move_up(&mut self, distance: f32) -> Result<()> {
        self.move_local(distance, LocalAxis::Up)
    }

    /// Strafes along the frame's right axis.
    pub fn move_right(&mut self, distance: f32) -> Result<()> {
        self.move_local(distance, LocalAxis::Right)
    }

    /// Moves along world axes, ignoring orientation.
    pub fn translate_world(&mut self, dx: f32, dy: f32, dz: f32) {
        self.origin = self.origin + Vec3::new(dx, dy, dz);
    }

    // =========================================================================
    // Rotation
    // =========================================================================

    /// Rotates the orientation by `angle` radians about a world-space axis
    /// through the frame's origin. The origin does not move.
    ///
    /// The axis is normalized here; a zero-length axis or a non-finite
    /// angle returns [`TransformError::InvalidArgument`] and leaves the frame
    /// unchanged.
    pub fn rotate_world(&mut self, angle: f32, x: f32, y: f32, z: f32) -> Result<()> {
        ensure_finite("angle", angle)?;
        let axis = Vec3::new(x, y, z).try_normalize(MIN_AXIS_LENGTH).ok_or_else(|| {
            warn!(x, y, z, "rotation about a degenerate axis");
            TransformError::InvalidArgument("rotation axis must be non-zero".into())
        })?;
        self.rotate_unit(angle, axis)
    }

    /// Rotates about one of the frame's own axes: `Up` yaws, `Right`
    /// pitches, `Forward` rolls. Rejects a non-finite angle like
    /// [`rotate_world`](Self::rotate_world).
    pub fn rotate_local(&mut self, angle: f32, axis: LocalAxis) -> Result<()> {
        ensure_finite("angle", angle)?;
        self.rotate_unit(angle, self.axis(axis))
    }

    fn rotate_unit(&mut self, angle: f32, axis: Vec3) -> Result<()> {
        let forward = self.forward.rotate_about(axis, angle);
        let up = self.up.rotate_about(axis, angle);
        let (forward, up) = orthonormalize(forward, up).ok_or_else(|| {
            warn!(angle, ?axis, "rotation left a degenerate basis");
            TransformError::InvalidOperation("rotation produced a degenerate basis".into())
        })?;
        self.forward = forward;
        self.up = up;
        Ok(())
    }

    /// Explicit Gram-Schmidt pass over the basis.
    pub fn normalize(&mut self) {
        if let Some((forward, up)) = orthonormalize(self.forward, self.up) {
            self.forward = forward;
            self.up = up;
        }
    }

    // =========================================================================
    // Matrix Generation
    // =========================================================================

    /// Object-to-world transform: columns `[right, up, -forward]`, origin
    /// in the last column. Used to place an object.
    pub fn object_to_world_matrix(&self) -> Mat4 {
        Mat4::from_basis(self.right(), self.up, -self.forward, self.origin)
    }

    /// World-to-camera (view) transform: the inverse of
    /// [`object_to_world_matrix`](Self::object_to_world_matrix).
    ///
    /// For a frame with rotation R and origin P:
    ///   World transform = T(P) * R
    ///   View = R^T * T(-P)
    /// The basis is orthonormal by construction, so the transpose is exact.
    pub fn world_to_camera_matrix(&self) -> Mat4 {
        let x = self.right();
        let y = self.up;
        let z = -self.forward;
        Mat4::new([
            [x.x, x.y, x.z, -x.dot(self.origin)],
            [y.x, y.y, y.z, -y.dot(self.origin)],
            [z.x, z.y, z.z, -z.dot(self.origin)],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// View matrix with the translation dropped, for skyboxes and other
    /// geometry that should follow the camera's orientation only.
    pub fn camera_rotation_matrix(&self) -> Mat4 {
        let mut view = self.world_to_camera_matrix();
        for row in 0..3 {
            view.set(row, 3, 0.0);
        }
        view
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f32::consts::FRAC_PI_2;

    const TOLERANCE: f32 = 1e-5;

    fn assert_orthonormal(frame: &Frame) {
        assert_abs_diff_eq!(frame.forward().magnitude(), 1.0, epsilon = TOLERANCE);
        assert_abs_diff_eq!(frame.up().magnitude(), 1.0, epsilon = TOLERANCE);
        assert_abs_diff_eq!(frame.forward().dot(frame.up()), 0.0, epsilon = TOLERANCE);
    }

    fn random_unit(rng: &mut StdRng) -> Vec3 {
        loop {
            let v = Vec3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            );
            if let Some(unit) = v.try_normalize(0.1) {
                return unit;
            }
        }
    }

    #[test]
    fn frame_starts_looking_down_negative_z() {
        let frame = Frame::new();
        assert_eq!(frame.forward(), Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(frame.up(), Vec3::UP);
        assert_relative_eq!(frame.right(), Vec3::RIGHT);
        assert_eq!(frame.object_to_world_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn move_local_follows_basis() {
        let mut frame = Frame::new();
        frame.move_forward(2.0).unwrap();
        frame.move_right(1.0).unwrap();
        frame.move_up(-3.0).unwrap();
        assert_relative_eq!(frame.origin(), Vec3::new(1.0, -3.0, -2.0));

        frame.rotate_local(FRAC_PI_2, LocalAxis::Up).unwrap();
        frame.move_local(1.0, LocalAxis::Forward).unwrap();
        // After yawing left 90 degrees, forward is -X.
        assert_abs_diff_eq!(frame.origin(), Vec3::new(0.0, -3.0, -2.0), epsilon = TOLERANCE);
    }

    #[test]
    fn camera_pulled_back_sees_origin_ahead() {
        let mut camera = Frame::new();
        camera.move_forward(-10.0).unwrap();
        assert_relative_eq!(camera.origin(), Vec3::new(0.0, 0.0, 10.0));

        let origin_in_eye = camera.world_to_camera_matrix().transform_point(Vec3::ZERO);
        assert_relative_eq!(origin_in_eye, Vec3::new(0.0, 0.0, -10.0));
    }

    #[test]
    fn rotate_world_uses_world_axis() {
        let mut frame = Frame::new();
        // Pitch up first so the local and world Y axes differ.
        frame.rotate_local(0.5, LocalAxis::Right).unwrap();
        let up_before = frame.up();
        frame.rotate_world(FRAC_PI_2, 0.0, 1.0, 0.0).unwrap();

        // Rotation about world Y leaves the world-Y component of both axes.
        assert_abs_diff_eq!(frame.up().y, up_before.y, epsilon = TOLERANCE);
        assert_orthonormal(&frame);
    }

    #[test]
    fn rotate_world_normalizes_axis() {
        let mut a = Frame::new();
        let mut b = Frame::new();
        a.rotate_world(0.3, 0.0, 5.0, 0.0).unwrap();
        b.rotate_world(0.3, 0.0, 1.0, 0.0).unwrap();
        assert_abs_diff_eq!(a.forward(), b.forward(), epsilon = TOLERANCE);
    }

    #[test]
    fn rotate_world_rejects_zero_axis() {
        let mut frame = Frame::new();
        let before = frame;
        assert!(matches!(
            frame.rotate_world(0.3, 0.0, 0.0, 0.0),
            Err(TransformError::InvalidArgument(_))
        ));
        assert_eq!(frame, before);
    }

    #[test]
    fn non_finite_angle_is_rejected() {
        let mut frame = Frame::new();
        frame.rotate_local(0.3, LocalAxis::Right).unwrap();
        let before = frame;

        for angle in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            assert!(matches!(
                frame.rotate_world(angle, 0.0, 1.0, 0.0),
                Err(TransformError::InvalidArgument(_))
            ));
            assert!(matches!(
                frame.rotate_local(angle, LocalAxis::Up),
                Err(TransformError::InvalidArgument(_))
            ));
        }
        assert_eq!(frame, before);
    }

    #[test]
    fn non_finite_distance_is_rejected() {
        let mut frame = Frame::new();
        frame.set_origin(Vec3::new(1.0, 2.0, 3.0));

        assert!(matches!(
            frame.move_forward(f32::NAN),
            Err(TransformError::InvalidArgument(_))
        ));
        assert!(frame.move_right(f32::INFINITY).is_err());
        assert!(frame.move_local(f32::NEG_INFINITY, LocalAxis::Up).is_err());
        assert_eq!(frame.origin(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn repeated_small_rotations_do_not_drift() {
        let mut frame = Frame::new();
        let axes = [
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.3, 0.4, 0.866),
        ];
        for i in 0..10_000 {
            let axis = axes[i % axes.len()];
            frame.rotate_world(0.0123, axis.x, axis.y, axis.z).unwrap();
            assert_orthonormal(&frame);
        }
    }

    #[test]
    fn world_to_camera_inverts_object_to_world() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let origin = Vec3::new(
                rng.gen_range(-100.0..100.0),
                rng.gen_range(-100.0..100.0),
                rng.gen_range(-100.0..100.0),
            );
            let mut frame = Frame::new();
            frame.set_origin(origin);
            let axis = random_unit(&mut rng);
            frame
                .rotate_world(rng.gen_range(-3.1..3.1), axis.x, axis.y, axis.z)
                .unwrap();
            frame
                .rotate_local(rng.gen_range(-3.1..3.1), LocalAxis::Forward)
                .unwrap();

            let product = frame.world_to_camera_matrix() * frame.object_to_world_matrix();
            assert_abs_diff_eq!(product, Mat4::IDENTITY, epsilon = 1e-4);
        }
    }

    #[test]
    fn world_to_camera_matches_rigid_inverse() {
        let frame = Frame::with_orientation(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::UP,
        )
        .unwrap();
        let expected = frame.object_to_world_matrix().inverse_rigid().unwrap();
        assert_abs_diff_eq!(frame.world_to_camera_matrix(), expected, epsilon = TOLERANCE);
    }

    #[test]
    fn set_orientation_projects_up() {
        let frame = Frame::with_orientation(Vec3::ZERO, Vec3::new(0.0, 0.0, -2.0), Vec3::new(0.0, 1.0, 1.0))
            .unwrap();
        assert_abs_diff_eq!(frame.up(), Vec3::UP, epsilon = TOLERANCE);
        assert_orthonormal(&frame);
    }

    #[test]
    fn parallel_orientation_is_rejected() {
        let mut frame = Frame::new();
        assert!(frame.set_forward(Vec3::new(0.0, 3.0, 0.0)).is_err());
        assert!(frame.set_up(Vec3::ZERO).is_err());
        assert_eq!(frame, Frame::new());
    }

    #[test]
    fn look_at_faces_target() {
        let mut frame = Frame::new();
        frame.set_origin(Vec3::new(0.0, 0.0, 5.0));
        frame.look_at(Vec3::new(5.0, 0.0, 5.0)).unwrap();
        assert_abs_diff_eq!(frame.forward(), Vec3::RIGHT, epsilon = TOLERANCE);

        // The target lands straight ahead in eye space.
        let eye = frame.world_to_camera_matrix().transform_point(Vec3::new(5.0, 0.0, 5.0));
        assert_abs_diff_eq!(eye, Vec3::new(0.0, 0.0, -5.0), epsilon = TOLERANCE);
    }

    #[test]
    fn camera_rotation_matrix_drops_translation() {
        let mut frame = Frame::new();
        frame.set_origin(Vec3::new(3.0, 4.0, 5.0));
        frame.rotate_local(0.4, LocalAxis::Up).unwrap();
        let m = frame.camera_rotation_matrix();
        assert_eq!(m.translation_part(), Vec3::ZERO);
        assert_eq!(m.upper_left_3x3(), frame.world_to_camera_matrix().upper_left_3x3());
    }
}
