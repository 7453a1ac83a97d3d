use super::{
    GlBackend, ProgramSource, ShaderStage, UniformDescriptor, UniformKind, UniformValue,
};
use crate::config::UniformRangeRules;
use crate::error::Error;

/// Shader program.
///
/// Holds at most one linked program, together with the descriptors and
/// locations of its active uniforms. The program handle is owned by this
/// object and is only released through [`ShaderProgram::load`] and
/// [`ShaderProgram::cleanup`], which take the backend that created it.
pub struct ShaderProgram<B: GlBackend> {
    linked: Option<Linked<B>>,
}

struct Linked<B: GlBackend> {
    program: B::Program,
    // Parallel to descriptors
    descriptors: Vec<UniformDescriptor>,
    locations: Vec<Option<B::Location>>,
    attribute: Option<u32>,
}

/// Program that has been linked and introspected but not installed.
pub struct StagedProgram<B: GlBackend> {
    linked: Linked<B>,
}

impl<B: GlBackend> StagedProgram<B> {
    /// Returns the descriptors of the active uniforms.
    pub fn descriptors(&self) -> &[UniformDescriptor] {
        &self.linked.descriptors
    }

    /// Releases the program.
    pub fn discard(self, gl: &B) {
        gl.delete_program(self.linked.program);
    }
}

impl<B: GlBackend> Default for ShaderProgram<B> {
    fn default() -> Self {
        ShaderProgram { linked: None }
    }
}

impl<B: GlBackend> ShaderProgram<B> {
    /// Creates an empty shader program.
    pub fn new() -> ShaderProgram<B> {
        ShaderProgram::default()
    }

    /// Compiles, links and introspects a program.
    ///
    /// The new program is fully validated before the previously held
    /// program is released, so a failure leaves the current program in
    /// place. `attribute` is the vertex attribute whose location is recorded
    /// for the pattern geometry.
    pub fn load(
        &mut self,
        gl: &B,
        source: ProgramSource<'_>,
        rules: &UniformRangeRules,
        attribute: &str,
    ) -> Result<&[UniformDescriptor], Error> {
        let staged = Self::stage(gl, source, rules, attribute)?;
        Ok(self.commit(gl, staged))
    }

    /// Compiles, links and introspects a program without installing it.
    ///
    /// The result must be either passed to [`ShaderProgram::commit`] or
    /// released with [`StagedProgram::discard`].
    pub fn stage(
        gl: &B,
        source: ProgramSource<'_>,
        rules: &UniformRangeRules,
        attribute: &str,
    ) -> Result<StagedProgram<B>, Error> {
        let program = Self::compile_and_link(gl, source)?;
        let (descriptors, locations) = discover(gl, &program, rules);
        let attribute = gl.attribute_location(&program, attribute);
        if attribute.is_none() {
            log::warn!("program has no active attribute for the pattern");
        }
        Ok(StagedProgram {
            linked: Linked {
                program,
                descriptors,
                locations,
                attribute,
            },
        })
    }

    /// Installs a staged program, releasing the one currently held.
    pub fn commit(&mut self, gl: &B, staged: StagedProgram<B>) -> &[UniformDescriptor] {
        self.cleanup(gl);
        &self.linked.insert(staged.linked).descriptors
    }

    fn compile_and_link(gl: &B, source: ProgramSource<'_>) -> Result<B::Program, Error> {
        let vertex_shader = compile(gl, ShaderStage::Vertex, source.vertex_shader)?;
        let fragment_shader = match compile(gl, ShaderStage::Fragment, source.fragment_shader) {
            Ok(shader) => shader,
            Err(e) => {
                gl.delete_shader(vertex_shader);
                return Err(e);
            }
        };
        let program = gl.link_program(&vertex_shader, &fragment_shader);
        // The shaders are no longer needed once the program is linked (or
        // has failed to link).
        gl.delete_shader(vertex_shader);
        gl.delete_shader(fragment_shader);
        program.map_err(|diagnostic| Error::Link { diagnostic })
    }

    /// Rediscovers the active uniforms of the linked program.
    ///
    /// The uniform caches are replaced with the result. Returns an empty
    /// slice if no program is linked.
    pub fn discover_uniforms(&mut self, gl: &B, rules: &UniformRangeRules) -> &[UniformDescriptor] {
        match self.linked.as_mut() {
            Some(linked) => {
                (linked.descriptors, linked.locations) = discover(gl, &linked.program, rules);
                &linked.descriptors
            }
            None => &[],
        }
    }

    /// Returns the descriptors of the active uniforms.
    pub fn descriptors(&self) -> &[UniformDescriptor] {
        self.linked
            .as_ref()
            .map(|linked| linked.descriptors.as_slice())
            .unwrap_or(&[])
    }

    /// Returns `true` if a program is linked.
    pub fn is_linked(&self) -> bool {
        self.linked.is_some()
    }

    /// Returns `true` if the linked program has an active uniform `name`.
    pub fn has_uniform(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Returns the location of the pattern vertex attribute.
    pub fn attribute_location(&self) -> Option<u32> {
        self.linked.as_ref().and_then(|linked| linked.attribute)
    }

    /// Makes the linked program current.
    pub fn use_program(&self, gl: &B) {
        if let Some(linked) = &self.linked {
            gl.use_program(&linked.program);
        }
    }

    /// Sets the value of a uniform from a scalar parameter value.
    ///
    /// The value is converted according to the kind of the uniform (see
    /// [`UniformValue::from_scalar`]). Returns `Ok(false)` if the program
    /// has no such uniform, and an [`Error::UnsupportedUniformType`] if the
    /// uniform cannot be set. The linked program must be current.
    pub fn set_uniform(&self, gl: &B, name: &str, value: f32) -> Result<bool, Error> {
        let Some((descriptor, location)) = self.find(name) else {
            return Ok(false);
        };
        if let UniformKind::Unsupported(gl_type) = descriptor.kind {
            return Err(Error::UnsupportedUniformType {
                name: name.to_string(),
                gl_type,
            });
        }
        let Some(value) = UniformValue::from_scalar(descriptor.kind, value) else {
            return Ok(false);
        };
        match location {
            Some(location) => {
                gl.set_uniform(location, value);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Releases the program and clears all the caches.
    ///
    /// This does nothing if no program is linked.
    pub fn cleanup(&mut self, gl: &B) {
        if let Some(linked) = self.linked.take() {
            gl.delete_program(linked.program);
        }
    }

    fn find(&self, name: &str) -> Option<(&UniformDescriptor, &Option<B::Location>)> {
        let linked = self.linked.as_ref()?;
        linked
            .descriptors
            .iter()
            .zip(linked.locations.iter())
            .find(|(descriptor, _)| descriptor.name == name)
    }
}

fn compile<B: GlBackend>(gl: &B, stage: ShaderStage, source: &str) -> Result<B::Shader, Error> {
    gl.compile_shader(stage, source)
        .map_err(|diagnostic| Error::Compile { stage, diagnostic })
}

#[allow(clippy::type_complexity)]
fn discover<B: GlBackend>(
    gl: &B,
    program: &B::Program,
    rules: &UniformRangeRules,
) -> (Vec<UniformDescriptor>, Vec<Option<B::Location>>) {
    gl.active_uniforms(program)
        .into_iter()
        .map(|active| {
            let kind = UniformKind::from_gl_type(active.gl_type);
            let range = rules.range_for(&active.name);
            log::debug!(
                "discovered uniform {}: {:?}[{}] in [{}, {}]",
                active.name,
                kind,
                active.size,
                range.min,
                range.max
            );
            let location = gl.uniform_location(program, &active.name);
            let descriptor = UniformDescriptor {
                name: active.name,
                kind,
                size: active.size,
                range,
            };
            (descriptor, location)
        })
        .unzip()
}
