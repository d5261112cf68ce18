//! Vector and matrix types.
//!
//! All types are small `Copy` values; nothing here allocates.

pub mod mat3;
pub mod mat4;
pub mod vec3;
pub mod vec4;

pub use mat3::Mat3;
pub use mat4::Mat4;
pub use vec3::Vec3;
pub use vec4::Vec4;
