use serde::{Deserialize, Serialize};
use web_sys::{WebGl2RenderingContext, WebGlUniformLocation};

/// Kind of a uniform, as discovered by program introspection.
///
/// Only scalars, small float vectors and integers can be driven by
/// parameters. Any other GL type is kept as [`UniformKind::Unsupported`] so
/// that it still shows up in the descriptor table.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UniformKind {
    /// `float`
    Float,
    /// `vec2`
    Vec2,
    /// `vec3`
    Vec3,
    /// `vec4`
    Vec4,
    /// `int`
    Int,
    /// Any other type, with its GL type enum.
    Unsupported(u32),
}

impl UniformKind {
    /// Maps a GL type enum as returned by `getActiveUniform()` to a kind.
    pub fn from_gl_type(gl_type: u32) -> UniformKind {
        match gl_type {
            WebGl2RenderingContext::FLOAT => UniformKind::Float,
            WebGl2RenderingContext::FLOAT_VEC2 => UniformKind::Vec2,
            WebGl2RenderingContext::FLOAT_VEC3 => UniformKind::Vec3,
            WebGl2RenderingContext::FLOAT_VEC4 => UniformKind::Vec4,
            WebGl2RenderingContext::INT => UniformKind::Int,
            other => UniformKind::Unsupported(other),
        }
    }

    /// Returns `true` if uniforms of this kind can be set.
    pub fn is_supported(&self) -> bool {
        !matches!(self, UniformKind::Unsupported(_))
    }
}

/// Value range of a uniform.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct UniformRange {
    /// Minimum value (inclusive).
    pub min: f32,
    /// Maximum value (inclusive).
    pub max: f32,
    /// Default value.
    pub default: f32,
}

impl UniformRange {
    /// Creates a range.
    pub const fn new(min: f32, max: f32, default: f32) -> UniformRange {
        UniformRange { min, max, default }
    }

    /// Clamps `value` into `[min, max]`.
    pub fn clamp(&self, value: f32) -> f32 {
        value.max(self.min).min(self.max)
    }

    /// Returns `true` if `min <= default <= max`.
    pub fn is_valid(&self) -> bool {
        self.min <= self.max && self.min <= self.default && self.default <= self.max
    }
}

/// Descriptor of an active uniform of a linked program.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UniformDescriptor {
    /// Uniform name as reported by the driver.
    pub name: String,
    /// Kind of the uniform.
    pub kind: UniformKind,
    /// Declared array size (1 for non-arrays).
    pub size: i32,
    /// Inferred value range.
    pub range: UniformRange,
}

/// Value to be written to a uniform.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    /// `float`
    Float(f32),
    /// `vec2`
    Vec2([f32; 2]),
    /// `vec3`
    Vec3([f32; 3]),
    /// `vec4`
    Vec4([f32; 4]),
    /// `int`
    Int(i32),
}

impl UniformValue {
    /// Builds a uniform value of the given kind from a scalar parameter.
    ///
    /// Vectors receive the scalar in every component and integers receive
    /// the scalar rounded to the nearest integer. Returns `None` for
    /// unsupported kinds.
    pub fn from_scalar(kind: UniformKind, value: f32) -> Option<UniformValue> {
        Some(match kind {
            UniformKind::Float => UniformValue::Float(value),
            UniformKind::Vec2 => UniformValue::Vec2([value; 2]),
            UniformKind::Vec3 => UniformValue::Vec3([value; 3]),
            UniformKind::Vec4 => UniformValue::Vec4([value; 4]),
            UniformKind::Int => UniformValue::Int(value.round() as i32),
            UniformKind::Unsupported(_) => return None,
        })
    }

    /// Sets the value of the WebGL2 uniform in `location`.
    pub fn uniform(&self, gl: &WebGl2RenderingContext, location: Option<&WebGlUniformLocation>) {
        match self {
            UniformValue::Float(x) => x.uniform(gl, location),
            UniformValue::Vec2(x) => x.uniform(gl, location),
            UniformValue::Vec3(x) => x.uniform(gl, location),
            UniformValue::Vec4(x) => x.uniform(gl, location),
            UniformValue::Int(x) => x.uniform(gl, location),
        }
    }
}

/// Trait that links native Rust types with WebGL2 uniform types.
pub trait UniformType {
    /// Sets the value of the uniform.
    ///
    /// This function sets the value of the WebGL2 uniform in `location` to the
    /// value of `self` using one of the `uniform{1,2,3,4}{f,i}` WebGL2
    /// functions as appropriate.
    fn uniform(&self, gl: &WebGl2RenderingContext, location: Option<&WebGlUniformLocation>);
}

macro_rules! impl_uniform {
    ($t:ty, $fun:ident, $sel:ident, $($things:expr),+) => {
        #[doc = concat!("Uniform type corresponding to `", stringify!($fun), "`.")]
        impl UniformType for $t {
            fn uniform(&$sel, gl: &WebGl2RenderingContext, location: Option<&WebGlUniformLocation>) {
                gl.$fun(location, $($things,)+)
            }
        }
    }
}

impl_uniform!(f32, uniform1f, self, *self);
impl_uniform!(i32, uniform1i, self, *self);
impl_uniform!([f32; 2], uniform2f, self, self[0], self[1]);
impl_uniform!([f32; 3], uniform3f, self, self[0], self[1], self[2]);
impl_uniform!([f32; 4], uniform4f, self, self[0], self[1], self[2], self[3]);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn gl_types_map_to_kinds() {
        assert_eq!(UniformKind::from_gl_type(0x1406), UniformKind::Float);
        assert_eq!(UniformKind::from_gl_type(0x8b50), UniformKind::Vec2);
        assert_eq!(UniformKind::from_gl_type(0x8b51), UniformKind::Vec3);
        assert_eq!(UniformKind::from_gl_type(0x8b52), UniformKind::Vec4);
        assert_eq!(UniformKind::from_gl_type(0x1404), UniformKind::Int);
        // mat4
        assert_eq!(
            UniformKind::from_gl_type(0x8b5c),
            UniformKind::Unsupported(0x8b5c)
        );
    }

    #[test]
    fn scalar_is_splatted_by_kind() {
        assert_eq!(
            UniformValue::from_scalar(UniformKind::Vec3, 0.5),
            Some(UniformValue::Vec3([0.5, 0.5, 0.5]))
        );
        assert_eq!(
            UniformValue::from_scalar(UniformKind::Int, 1.6),
            Some(UniformValue::Int(2))
        );
        assert_eq!(
            UniformValue::from_scalar(UniformKind::Unsupported(0x8b5e), 1.0),
            None
        );
    }

    #[test]
    fn range_clamps_inclusive() {
        let range = UniformRange::new(-2.0, 2.0, 0.0);
        assert_eq!(range.clamp(10.0), 2.0);
        assert_eq!(range.clamp(-10.0), -2.0);
        assert_eq!(range.clamp(2.0), 2.0);
        assert_eq!(range.clamp(0.25), 0.25);
        assert!(range.is_valid());
        assert!(!UniformRange::new(1.0, 0.0, 0.5).is_valid());
    }
}
