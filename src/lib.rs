//! Transform core for real-time rendering.
//!
//! This crate provides the matrix plumbing a renderer needs for every draw
//! call: bounded matrix stacks, a perspective/orthographic frustum, an
//! orientation frame for cameras and objects, and a pipeline that derives
//! model-view, projection, model-view-projection and normal matrices with
//! generation-counter caching. No windowing or GPU API is involved; the
//! outputs are plain column-major arrays ready for uniform upload.
//!
//! # Quick Start
//!
//! ```ignore
//! use matstack::prelude::*;
//!
//! let mut scene = SceneContext::new(&SceneConfig::default())?;
//! let mut object = Frame::new();
//! object.rotate_world(0.1, 0.0, 1.0, 0.0)?;
//!
//! let _camera = scene.begin_camera()?;
//! let uniforms = scene.draw(&object, &RenderTechnique::Flat { color: RED })?;
//! ```

pub mod error;
pub mod frame;
pub mod frustum;
pub mod math;
pub mod matrix_stack;
pub mod pipeline;
pub mod scene;
pub mod technique;

// Re-export commonly needed types at crate root for convenience
pub use error::{Result, TransformError};
pub use frame::{Frame, LocalAxis};
pub use frustum::{Frustum, ProjectionKind};
pub use matrix_stack::{MatrixStack, ScopedPush, SharedMatrixStack};
pub use pipeline::TransformPipeline;
pub use scene::{SceneConfig, SceneContext};
pub use technique::{RenderTechnique, UniformValue, Uniforms};

/// Prelude module for convenient imports.
///
/// # Example
/// ```ignore
/// use matstack::prelude::*;
/// ```
pub mod prelude {
    // Errors
    pub use crate::error::{Result, TransformError};

    // Math
    pub use crate::math::mat3::Mat3;
    pub use crate::math::mat4::Mat4;
    pub use crate::math::vec3::Vec3;
    pub use crate::math::vec4::Vec4;

    // Transform state
    pub use crate::frame::{Frame, LocalAxis};
    pub use crate::frustum::{Frustum, ProjectionKind};
    pub use crate::matrix_stack::{MatrixStack, ScopedPush, SharedMatrixStack};
    pub use crate::pipeline::TransformPipeline;

    // Scene & techniques
    pub use crate::scene::{SceneConfig, SceneContext};
    pub use crate::technique::{Color, RenderTechnique, UniformValue, Uniforms};
    pub use crate::technique::{BLACK, GREEN, RED, WHITE};
}
