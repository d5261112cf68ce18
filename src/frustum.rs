//! Viewing volume and its projection matrix.
//!
//! The [`Frustum`] is the single source of truth for the projection
//! parameters (perspective or orthographic). The matrix is derived eagerly
//! whenever a parameter changes, so [`Frustum::projection_matrix`] is a plain
//! read.
//!
//! Clip space follows OpenGL: right-handed eye space looking down -Z, NDC
//! depth in `[-1, 1]` with the near plane at -1.

use tracing::{debug, warn};

use crate::error::{Result, TransformError};
use crate::math::mat4::Mat4;

/// Parameters the current projection was built from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionKind {
    Perspective {
        /// Vertical field of view in radians.
        fov_y: f32,
        /// Width divided by height.
        aspect_ratio: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
}

/// Projection parameters plus the matrix derived from them.
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    kind: ProjectionKind,
    projection: Mat4,
}

fn invalid(message: &str) -> TransformError {
    warn!(reason = message, "rejected frustum parameters");
    TransformError::InvalidArgument(message.to_string())
}

impl Frustum {
    /// Unit orthographic volume `(-1, 1, -1, 1, -1, 1)`.
    pub fn new() -> Self {
        let kind = ProjectionKind::Orthographic {
            left: -1.0,
            right: 1.0,
            bottom: -1.0,
            top: 1.0,
            near: -1.0,
            far: 1.0,
        };
        Self {
            kind,
            projection: Mat4::orthographic(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0),
        }
    }

    /// Creates a perspective frustum; see [`set_perspective`](Self::set_perspective).
    pub fn perspective(fov_y_degrees: f32, aspect_ratio: f32, near: f32, far: f32) -> Result<Self> {
        let mut frustum = Self::new();
        frustum.set_perspective(fov_y_degrees, aspect_ratio, near, far)?;
        Ok(frustum)
    }

    /// Creates an orthographic frustum; see [`set_orthographic`](Self::set_orthographic).
    pub fn orthographic(
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    ) -> Result<Self> {
        let mut frustum = Self::new();
        frustum.set_orthographic(left, right, bottom, top, near, far)?;
        Ok(frustum)
    }

    /// Switches to a perspective projection.
    ///
    /// # Arguments
    /// * `fov_y_degrees` - Vertical field of view in degrees, in (0, 180)
    /// * `aspect_ratio` - Width divided by height (must be > 0)
    /// * `near` - Near clipping plane distance (must be > 0)
    /// * `far` - Far clipping plane distance (must be > near)
    ///
    /// On error the frustum keeps its previous parameters and matrix.
    pub fn set_perspective(
        &mut self,
        fov_y_degrees: f32,
        aspect_ratio: f32,
        near: f32,
        far: f32,
    ) -> Result<()> {
        self.update_perspective(fov_y_degrees.to_radians(), aspect_ratio, near, far)
    }

    fn update_perspective(&mut self, fov_y: f32, aspect_ratio: f32, near: f32, far: f32) -> Result<()> {
        if !(aspect_ratio > 0.0 && aspect_ratio.is_finite()) {
            return Err(invalid("aspect ratio must be positive"));
        }
        if !(near > 0.0) {
            return Err(invalid("near plane must be positive"));
        }
        if !(far > near && far.is_finite()) {
            return Err(invalid("far plane must lie beyond the near plane"));
        }
        if !(fov_y > 0.0 && fov_y < std::f32::consts::PI) {
            return Err(invalid("field of view must be between 0 and 180 degrees"));
        }

        self.kind = ProjectionKind::Perspective {
            fov_y,
            aspect_ratio,
            near,
            far,
        };
        self.projection = Mat4::perspective(fov_y, aspect_ratio, near, far);
        debug!(fov_y, aspect_ratio, near, far, "perspective projection updated");
        Ok(())
    }

    /// Switches to a parallel projection of the given box. `near`/`far` are
    /// distances along the viewing direction and may be negative.
    ///
    /// On error the frustum keeps its previous parameters and matrix.
    pub fn set_orthographic(
        &mut self,
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    ) -> Result<()> {
        if ![left, right, bottom, top, near, far]
            .iter()
            .all(|plane| plane.is_finite())
        {
            return Err(invalid("orthographic planes must be finite"));
        }
        if left == right {
            return Err(invalid("left and right planes coincide"));
        }
        if bottom == top {
            return Err(invalid("bottom and top planes coincide"));
        }
        if near == far {
            return Err(invalid("near and far planes coincide"));
        }

        self.kind = ProjectionKind::Orthographic {
            left,
            right,
            bottom,
            top,
            near,
            far,
        };
        self.projection = Mat4::orthographic(left, right, bottom, top, near, far);
        debug!(left, right, bottom, top, near, far, "orthographic projection updated");
        Ok(())
    }

    /// Updates the aspect ratio of a perspective frustum (typically on window
    /// resize). Orthographic frusta return [`TransformError::InvalidOperation`].
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) -> Result<()> {
        match self.kind {
            ProjectionKind::Perspective {
                fov_y, near, far, ..
            } => self.update_perspective(fov_y, aspect_ratio, near, far),
            ProjectionKind::Orthographic { .. } => Err(TransformError::InvalidOperation(
                "aspect ratio only applies to perspective frusta".into(),
            )),
        }
    }

    /// The last computed projection matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn kind(&self) -> ProjectionKind {
        self.kind
    }

    pub fn is_perspective(&self) -> bool {
        matches!(self.kind, ProjectionKind::Perspective { .. })
    }

    /// Near clipping plane distance.
    pub fn near(&self) -> f32 {
        match self.kind {
            ProjectionKind::Perspective { near, .. } | ProjectionKind::Orthographic { near, .. } => {
                near
            }
        }
    }

    /// Far clipping plane distance.
    pub fn far(&self) -> f32 {
        match self.kind {
            ProjectionKind::Perspective { far, .. } | ProjectionKind::Orthographic { far, .. } => far,
        }
    }

    /// Vertical field of view in radians; `None` for orthographic frusta.
    pub fn fov_y(&self) -> Option<f32> {
        match self.kind {
            ProjectionKind::Perspective { fov_y, .. } => Some(fov_y),
            ProjectionKind::Orthographic { .. } => None,
        }
    }

    /// Horizontal field of view in radians, computed from the vertical FOV
    /// and aspect ratio.
    pub fn fov_x(&self) -> Option<f32> {
        match self.kind {
            ProjectionKind::Perspective {
                fov_y,
                aspect_ratio,
                ..
            } => Some(2.0 * (aspect_ratio * (fov_y / 2.0).tan()).atan()),
            ProjectionKind::Orthographic { .. } => None,
        }
    }

    /// Width over height of the near plane.
    pub fn aspect_ratio(&self) -> f32 {
        match self.kind {
            ProjectionKind::Perspective { aspect_ratio, .. } => aspect_ratio,
            ProjectionKind::Orthographic {
                left,
                right,
                bottom,
                top,
                ..
            } => (right - left) / (top - bottom),
        }
    }
}

impl Default for Frustum {
    fn default() -> Self {
        Self::new()
    }
}
