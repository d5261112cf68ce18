//! Render techniques and the uniforms each one needs.
//!
//! A [`RenderTechnique`] is a closed set of shading variants. Each variant
//! knows which matrices and parameters its shader consumes and pulls them
//! from a [`TransformPipeline`] in one call, so a renderer picks a technique
//! explicitly and uploads whatever [`Uniforms`] it gets back.
//!
//! No GL calls are made here; uploading is the renderer's job.

use crate::error::Result;
use crate::math::vec3::Vec3;
use crate::pipeline::TransformPipeline;

/// RGBA color, each channel in `[0.0, 1.0]`.
pub type Color = [f32; 4];

pub const WHITE: Color = [1.0, 1.0, 1.0, 1.0];
pub const BLACK: Color = [0.0, 0.0, 0.0, 1.0];
pub const RED: Color = [1.0, 0.0, 0.0, 1.0];
pub const GREEN: Color = [0.0, 1.0, 0.0, 1.0];

// Uniform names shared by the techniques' shaders.
pub const MVP_MATRIX: &str = "mvpMatrix";
pub const MV_MATRIX: &str = "mvMatrix";
pub const P_MATRIX: &str = "pMatrix";
pub const NORMAL_MATRIX: &str = "normalMatrix";
pub const COLOR: &str = "vColor";
pub const LIGHT_POSITION: &str = "vLightPosition";
pub const TEXTURE_UNIT: &str = "textureUnit0";

/// Shading variants, from unlit passthrough to textured point lighting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderTechnique {
    /// Vertices are already in clip space; solid color.
    Identity { color: Color },
    /// Solid color, transformed by the model-view-projection matrix.
    Flat { color: Color },
    /// Diffuse lighting from a light fixed at the eye.
    DefaultLight { color: Color },
    /// Diffuse lighting from a point light. `light_position` is in eye space.
    PointLightDiffuse { light_position: Vec3, color: Color },
    /// Texture sampled as-is.
    TextureReplace { texture_unit: u32 },
    /// Texture multiplied by a color.
    TextureModulate { color: Color, texture_unit: u32 },
    /// Texture lit by a point light. `light_position` is in eye space.
    TexturePointLightDiffuse {
        light_position: Vec3,
        color: Color,
        texture_unit: u32,
    },
}

/// A single uniform value, matrices in column-major order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Mat4([f32; 16]),
    Mat3([f32; 9]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Sampler(u32),
}

/// Named uniform values for one draw call, in upload order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Uniforms {
    values: Vec<(&'static str, UniformValue)>,
}

impl Uniforms {
    fn with(mut self, name: &'static str, value: UniformValue) -> Self {
        self.values.push((name, value));
        self
    }

    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(&'static str, UniformValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl RenderTechnique {
    pub fn name(&self) -> &'static str {
        match self {
            RenderTechnique::Identity { .. } => "identity",
            RenderTechnique::Flat { .. } => "flat",
            RenderTechnique::DefaultLight { .. } => "default_light",
            RenderTechnique::PointLightDiffuse { .. } => "point_light_diffuse",
            RenderTechnique::TextureReplace { .. } => "texture_replace",
            RenderTechnique::TextureModulate { .. } => "texture_modulate",
            RenderTechnique::TexturePointLightDiffuse { .. } => "texture_point_light_diffuse",
        }
    }

    /// Collects the uniforms this technique's shader consumes.
    ///
    /// Fails with whatever the pipeline reports (`NotBound`, or
    /// `InvalidOperation` for a singular normal matrix).
    pub fn uniforms(&self, pipeline: &TransformPipeline) -> Result<Uniforms> {
        let mvp = || -> Result<UniformValue> {
            Ok(UniformValue::Mat4(
                pipeline.model_view_projection_matrix()?.to_cols_array(),
            ))
        };
        let lit = || -> Result<Uniforms> {
            Ok(Uniforms::default()
                .with(MV_MATRIX, UniformValue::Mat4(pipeline.model_view_matrix()?.to_cols_array()))
                .with(P_MATRIX, UniformValue::Mat4(pipeline.projection_matrix()?.to_cols_array()))
                .with(NORMAL_MATRIX, UniformValue::Mat3(pipeline.normal_matrix()?.to_cols_array())))
        };

        let uniforms = match *self {
            RenderTechnique::Identity { color } => {
                Uniforms::default().with(COLOR, UniformValue::Vec4(color))
            }
            RenderTechnique::Flat { color } => Uniforms::default()
                .with(MVP_MATRIX, mvp()?)
                .with(COLOR, UniformValue::Vec4(color)),
            RenderTechnique::DefaultLight { color } => {
                lit()?.with(COLOR, UniformValue::Vec4(color))
            }
            RenderTechnique::PointLightDiffuse {
                light_position,
                color,
            } => lit()?
                .with(LIGHT_POSITION, UniformValue::Vec3(light_position.to_array()))
                .with(COLOR, UniformValue::Vec4(color)),
            RenderTechnique::TextureReplace { texture_unit } => Uniforms::default()
                .with(MVP_MATRIX, mvp()?)
                .with(TEXTURE_UNIT, UniformValue::Sampler(texture_unit)),
            RenderTechnique::TextureModulate {
                color,
                texture_unit,
            } => Uniforms::default()
                .with(MVP_MATRIX, mvp()?)
                .with(COLOR, UniformValue::Vec4(color))
                .with(TEXTURE_UNIT, UniformValue::Sampler(texture_unit)),
            RenderTechnique::TexturePointLightDiffuse {
                light_position,
                color,
                texture_unit,
            } => lit()?
                .with(LIGHT_POSITION, UniformValue::Vec3(light_position.to_array()))
                .with(COLOR, UniformValue::Vec4(color))
                .with(TEXTURE_UNIT, UniformValue::Sampler(texture_unit)),
        };
        Ok(uniforms)
    }
}
