//! Render engine.
//!
//! This module implements the render engine that draws a parametric pattern
//! as instanced points. The engine is organized around a [`RenderEngine`],
//! which owns a [`GlBackend`] together with the GPU resources created through
//! it: one linked [`ShaderProgram`] and one vertex buffer holding the pattern
//! geometry.
//!
//! [`WebGl2Backend`] implements the backend over a WebGL2 context.

use std::fmt;

pub use backend::{ActiveUniform, GlBackend};
pub use engine::{instance_count, Control, EngineState, RenderEngine};
pub use program::{ShaderProgram, StagedProgram};
pub use uniform::{UniformDescriptor, UniformKind, UniformRange, UniformType, UniformValue};
pub use webgl::WebGl2Backend;

mod backend;
mod engine;
mod program;
#[cfg(test)]
pub(crate) mod testing;
mod uniform;
mod webgl;

/// Shader program source.
///
/// This contains the source for the vertex and fragment shaders of a program
/// that is to be compiled.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ProgramSource<'a> {
    /// Source for the vertex shader.
    pub vertex_shader: &'a str,
    /// Source for the fragment shader.
    pub fragment_shader: &'a str,
}

/// Shader stage.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    /// Vertex shader.
    Vertex,
    /// Fragment shader.
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        })
    }
}
