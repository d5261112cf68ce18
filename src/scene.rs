//! Scene setup: configuration and the context that owns the transform state.
//!
//! A [`SceneContext`] owns the camera [`Frame`], the model-view and
//! projection stacks, the [`Frustum`] and a [`TransformPipeline`] bound to the
//! two stacks. Input handlers mutate the camera through it; the render loop
//! uses it to bracket draw calls.
//!
//! ```ignore
//! let mut scene = SceneContext::new(&SceneConfig::default())?;
//! scene.camera_mut().move_forward(0.5)?;
//!
//! let _camera = scene.begin_camera()?;
//! let uniforms = scene.draw(&object, &RenderTechnique::Flat { color: RED })?;
//! // upload uniforms, issue draw call
//! ```

use tracing::{debug, info};

use crate::error::{Result, TransformError};
use crate::frame::Frame;
use crate::frustum::Frustum;
use crate::math::vec3::Vec3;
use crate::matrix_stack::{MatrixStack, ScopedPush, SharedMatrixStack, DEFAULT_MAX_DEPTH};
use crate::pipeline::TransformPipeline;
use crate::technique::{RenderTechnique, Uniforms};

pub const DEFAULT_VIEWPORT_WIDTH: u32 = 800;
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 600;
pub const DEFAULT_FOV_Y_DEGREES: f32 = 35.0;
pub const DEFAULT_NEAR: f32 = 1.0;
pub const DEFAULT_FAR: f32 = 500.0;
/// How far the default camera sits behind the world origin.
pub const DEFAULT_CAMERA_DISTANCE: f32 = 15.0;

/// Scene-setup parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneConfig {
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Vertical field of view in degrees.
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Maximum depth of both matrix stacks.
    pub max_stack_depth: usize,
    pub camera_origin: Vec3,
    pub camera_forward: Vec3,
    pub camera_up: Vec3,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            fov_y_degrees: DEFAULT_FOV_Y_DEGREES,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
            max_stack_depth: DEFAULT_MAX_DEPTH,
            camera_origin: Vec3::new(0.0, 0.0, DEFAULT_CAMERA_DISTANCE),
            camera_forward: Vec3::FORWARD,
            camera_up: Vec3::UP,
        }
    }
}

impl SceneConfig {
    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    pub fn with_perspective(mut self, fov_y_degrees: f32, near: f32, far: f32) -> Self {
        self.fov_y_degrees = fov_y_degrees;
        self.near = near;
        self.far = far;
        self
    }

    pub fn with_max_stack_depth(mut self, depth: usize) -> Self {
        self.max_stack_depth = depth;
        self
    }

    pub fn with_camera(mut self, origin: Vec3, forward: Vec3, up: Vec3) -> Self {
        self.camera_origin = origin;
        self.camera_forward = forward;
        self.camera_up = up;
        self
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.viewport_width as f32 / self.viewport_height as f32
    }
}

/// Owns all transform state for one scene.
#[derive(Debug)]
pub struct SceneContext {
    camera: Frame,
    model_view: SharedMatrixStack,
    projection: SharedMatrixStack,
    frustum: Frustum,
    pipeline: TransformPipeline,
}

impl SceneContext {
    /// Builds the scene and loads the initial projection.
    pub fn new(config: &SceneConfig) -> Result<Self> {
        if config.viewport_width == 0 || config.viewport_height == 0 {
            return Err(TransformError::InvalidArgument(
                "viewport must have a non-zero size".into(),
            ));
        }

        let camera =
            Frame::with_orientation(config.camera_origin, config.camera_forward, config.camera_up)?;
        let frustum = Frustum::perspective(
            config.fov_y_degrees,
            config.aspect_ratio(),
            config.near,
            config.far,
        )?;
        let model_view = MatrixStack::with_max_depth(config.max_stack_depth)?.into_shared();
        let projection = MatrixStack::with_max_depth(config.max_stack_depth)?.into_shared();
        projection.borrow_mut().load_top(frustum.projection_matrix());
        let pipeline = TransformPipeline::bound(&model_view, &projection);

        info!(
            width = config.viewport_width,
            height = config.viewport_height,
            fov_y_degrees = config.fov_y_degrees,
            "scene context created"
        );

        Ok(Self {
            camera,
            model_view,
            projection,
            frustum,
            pipeline,
        })
    }

    pub fn camera(&self) -> &Frame {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Frame {
        &mut self.camera
    }

    pub fn model_view(&self) -> &SharedMatrixStack {
        &self.model_view
    }

    pub fn projection(&self) -> &SharedMatrixStack {
        &self.projection
    }

    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    pub fn pipeline(&self) -> &TransformPipeline {
        &self.pipeline
    }

    /// Re-derives the perspective for a new viewport and loads it into the
    /// projection stack. A zero height is treated as 1.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let height = height.max(1);
        self.frustum.set_aspect_ratio(width as f32 / height as f32)?;
        self.projection
            .try_borrow_mut()
            .map_err(|_| TransformError::InvalidOperation("projection stack is borrowed".into()))?
            .load_top(self.frustum.projection_matrix());
        debug!(width, height, "viewport resized");
        Ok(())
    }

    /// Enters the camera's eye space for the rest of the frame. Dropping the
    /// guard pops it again.
    pub fn begin_camera(&self) -> Result<ScopedPush> {
        ScopedPush::new(&self.model_view, self.camera.world_to_camera_matrix())
    }

    /// Places `object` on the model-view stack and collects the uniforms
    /// `technique` needs; the object's entry is popped before returning.
    pub fn draw(&self, object: &Frame, technique: &RenderTechnique) -> Result<Uniforms> {
        let _object = ScopedPush::new(&self.model_view, object.object_to_world_matrix())?;
        technique.uniforms(&self.pipeline)
    }

    /// Converts a world-space light position into the eye space the lit
    /// techniques expect.
    pub fn light_in_eye_space(&self, world_position: Vec3) -> Vec3 {
        self.camera
            .world_to_camera_matrix()
            .transform_point(world_position)
    }
}
