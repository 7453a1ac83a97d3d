use super::{ShaderStage, UniformValue};

/// Active uniform as reported by program introspection.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ActiveUniform {
    /// Uniform name.
    pub name: String,
    /// GL type enum.
    pub gl_type: u32,
    /// Declared array size.
    pub size: i32,
}

/// Graphics API used by the render engine.
///
/// This trait abstracts the small subset of the graphics API that the engine
/// needs. Object handles are associated types so that the engine can own them
/// and release them explicitly.
pub trait GlBackend {
    /// Compiled shader handle.
    type Shader;
    /// Linked program handle.
    type Program;
    /// Vertex buffer handle.
    type Buffer;
    /// Uniform location handle.
    type Location;

    /// Compiles a shader stage.
    ///
    /// On failure, the shader object is deleted and the compiler info log is
    /// returned.
    fn compile_shader(&self, stage: ShaderStage, source: &str) -> Result<Self::Shader, String>;

    /// Deletes a shader object.
    fn delete_shader(&self, shader: Self::Shader);

    /// Links a program from two compiled stages.
    ///
    /// On failure, the program object is deleted and the linker info log is
    /// returned. The shader objects are not deleted.
    fn link_program(
        &self,
        vertex_shader: &Self::Shader,
        fragment_shader: &Self::Shader,
    ) -> Result<Self::Program, String>;

    /// Deletes a program object.
    fn delete_program(&self, program: Self::Program);

    /// Makes `program` the current program.
    fn use_program(&self, program: &Self::Program);

    /// Lists the active uniforms of a linked program.
    fn active_uniforms(&self, program: &Self::Program) -> Vec<ActiveUniform>;

    /// Returns the location of a uniform, if the program has it.
    fn uniform_location(&self, program: &Self::Program, name: &str) -> Option<Self::Location>;

    /// Writes a value to a uniform of the current program.
    fn set_uniform(&self, location: &Self::Location, value: UniformValue);

    /// Returns the location of a vertex attribute, if the program has it.
    fn attribute_location(&self, program: &Self::Program, name: &str) -> Option<u32>;

    /// Creates a vertex buffer and fills it with `data`.
    fn create_vertex_buffer(&self, data: &[f32]) -> Option<Self::Buffer>;

    /// Deletes a vertex buffer.
    fn delete_buffer(&self, buffer: Self::Buffer);

    /// Binds `buffer` to the vertex attribute at `location`.
    ///
    /// Each vertex is formed by `components` consecutive floats.
    fn bind_vertex_buffer(&self, buffer: &Self::Buffer, location: u32, components: i32);

    /// Clears the color buffer.
    fn clear(&self, color: [f32; 4]);

    /// Draws `count` points starting at the first vertex, `instances` times.
    fn draw_points_instanced(&self, count: i32, instances: i32);

    /// Returns the driver/device identification string.
    fn renderer_info(&self) -> String;
}
