use serde::Serialize;

use super::{GlBackend, ProgramSource, ShaderProgram, UniformDescriptor};
use crate::config::{EngineConfig, ProgramPaths, ReloadPolicy};
use crate::error::Error;
use crate::params::ParameterStore;
use crate::pattern;

/// Render engine.
///
/// The render engine is the main object used for rendering. It owns the
/// graphics backend, the linked [`ShaderProgram`], the [`ParameterStore`]
/// seeded from the program's uniforms and the vertex buffer holding the
/// geometry of the active pattern.
///
/// A program is loaded with [`RenderEngine::load_program`]. After that,
/// [`RenderEngine::update`] and [`RenderEngine::set_pattern`] modify the
/// scene, and each of them renders exactly once.
pub struct RenderEngine<B: GlBackend> {
    gl: B,
    config: EngineConfig,
    program: ShaderProgram<B>,
    params: ParameterStore,
    geometry: Option<Geometry<B>>,
    geometry_version: u64,
    state: EngineState,
    // Paths of the last successfully loaded program. Used to reload after a
    // context restore.
    paths: Option<ProgramPaths>,
    // Program requested while the context was lost.
    pending: Option<ProgramPaths>,
    load_generation: u64,
}

struct Geometry<B: GlBackend> {
    buffer: B::Buffer,
    vertex_count: i32,
}

/// State of the render engine.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum EngineState {
    /// No program has been loaded yet.
    Uninitialized,
    /// A program is loaded and the engine renders.
    Ready,
    /// A program load failed and no usable program remains, or a reload is
    /// pending after a context restore. Rendering is suspended.
    NotReady,
    /// The graphics context has been lost. Rendering is suspended until the
    /// context is restored.
    ContextLost,
    /// The engine has been disposed. This state is terminal.
    Disposed,
}

/// Control description for the user interface.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Control {
    /// Parameter name.
    pub name: String,
    /// Minimum value.
    pub min: f32,
    /// Maximum value.
    pub max: f32,
    /// Slider step.
    pub step: f32,
    /// Current value.
    pub value: f32,
}

/// Number of instances drawn for a given energy.
///
/// Each whole unit of energy stacks one more layer on top of the first one,
/// so this is `max(0, floor(energy) + 1)`.
pub fn instance_count(energy: f32) -> i32 {
    // Float to int casts saturate.
    (energy.floor() + 1.0).max(0.0) as i32
}

impl<B: GlBackend> RenderEngine<B> {
    /// Creates a new render engine.
    ///
    /// The configuration is validated. The engine starts in the
    /// [`EngineState::Uninitialized`] state.
    pub fn new(gl: B, mut config: EngineConfig) -> Result<RenderEngine<B>, Error> {
        config.validate()?;
        config.initial_pattern = config.initial_pattern.to_lowercase();
        Ok(RenderEngine {
            gl,
            config,
            program: ShaderProgram::new(),
            params: ParameterStore::new(),
            geometry: None,
            geometry_version: 0,
            state: EngineState::Uninitialized,
            paths: None,
            pending: None,
            load_generation: 0,
        })
    }

    /// Loads a shader program.
    ///
    /// The program is compiled, linked and introspected. The parameter store
    /// is seeded from the discovered uniforms and every parameter is set to
    /// its default. Then the geometry is rebuilt, the uniforms are pushed and
    /// the scene is rendered once. The descriptors of the discovered
    /// uniforms are returned.
    ///
    /// How the previous program is treated depends on the
    /// [`ReloadPolicy`]. With [`ReloadPolicy::AtomicSwap`], a failed load
    /// leaves the previous program, geometry and parameters untouched. With
    /// [`ReloadPolicy::TearDownFirst`], the previous program and geometry are
    /// released first and a failed load leaves the engine
    /// [`EngineState::NotReady`].
    ///
    /// While the context is lost, the GPU is not touched: `paths` is
    /// recorded, an empty list of descriptors is returned and the program is
    /// requested again by [`RenderEngine::context_restored`].
    pub fn load_program(
        &mut self,
        paths: &ProgramPaths,
        source: ProgramSource<'_>,
    ) -> Result<Vec<UniformDescriptor>, Error> {
        self.check_alive()?;
        if self.state == EngineState::ContextLost {
            log::info!(
                "context lost: deferring program {} + {} until restore",
                paths.vertex,
                paths.fragment
            );
            self.pending = Some(paths.clone());
            return Ok(Vec::new());
        }
        if self.config.reload_policy == ReloadPolicy::TearDownFirst {
            self.tear_down();
        }
        match self.install_program(paths, source) {
            Ok(descriptors) => {
                log::info!(
                    "loaded program {} + {} with {} uniforms",
                    paths.vertex,
                    paths.fragment,
                    descriptors.len()
                );
                Ok(descriptors)
            }
            Err(e) => {
                log::error!("program load failed: {e}");
                self.load_failed();
                Err(e)
            }
        }
    }

    fn install_program(
        &mut self,
        paths: &ProgramPaths,
        source: ProgramSource<'_>,
    ) -> Result<Vec<UniformDescriptor>, Error> {
        let staged = ShaderProgram::stage(
            &self.gl,
            source,
            &self.config.uniform_range_rules,
            &self.config.pattern_attribute,
        )?;
        // The geometry is built for the new program before it is installed,
        // with the geometry parameter at its default.
        let offset = staged
            .descriptors()
            .iter()
            .find(|d| d.name == self.config.geometry_parameter)
            .map_or(0.0, |d| d.range.default);
        let kind = self.active_pattern().to_string();
        let geometry = match self.build_geometry(&kind, offset) {
            Ok(geometry) => geometry,
            Err(e) => {
                staged.discard(&self.gl);
                return Err(e);
            }
        };
        let descriptors = self.program.commit(&self.gl, staged).to_vec();
        self.params.init_from_uniforms(&descriptors);
        // Values carried over from the previous program are overridden.
        self.params
            .set(descriptors.iter().map(|d| (d.name.as_str(), d.range.default)));
        self.replace_geometry(geometry);
        self.paths = Some(paths.clone());
        self.pending = None;
        self.state = EngineState::Ready;
        self.push_uniforms();
        self.render()?;
        Ok(descriptors)
    }

    /// Starts a new program load.
    ///
    /// Returns the generation number of the load, which must be passed to
    /// [`RenderEngine::check_load`] once the sources are available. Any
    /// load started earlier becomes superseded. With
    /// [`ReloadPolicy::TearDownFirst`] the current program and geometry are
    /// released immediately.
    pub fn begin_load(&mut self) -> Result<u64, Error> {
        self.check_alive()?;
        self.load_generation += 1;
        if self.config.reload_policy == ReloadPolicy::TearDownFirst {
            self.tear_down();
        }
        Ok(self.load_generation)
    }

    /// Checks whether the load with the given generation may complete.
    ///
    /// Fails with [`Error::Disposed`] if the engine was disposed while the
    /// sources were being retrieved, and with [`Error::Superseded`] if a
    /// newer load has been started since.
    pub fn check_load(&self, generation: u64) -> Result<(), Error> {
        self.check_alive()?;
        if generation != self.load_generation {
            return Err(Error::Superseded);
        }
        Ok(())
    }

    /// Records that a program load failed before reaching the engine (for
    /// instance, because a source could not be retrieved).
    pub fn abort_load(&mut self, error: &Error) {
        if self.state != EngineState::Disposed {
            log::error!("program load failed: {error}");
            self.load_failed();
        }
    }

    fn load_failed(&mut self) {
        let intact = self.program.is_linked() && self.geometry.is_some();
        match self.state {
            EngineState::ContextLost | EngineState::Disposed => (),
            EngineState::Ready if intact => (),
            _ => self.state = EngineState::NotReady,
        }
    }

    /// Changes the active pattern.
    ///
    /// This does nothing if `kind` is already the active pattern. Otherwise
    /// the geometry is rebuilt and the scene is rendered once. An unknown
    /// pattern fails with [`Error::UnknownPattern`] and leaves the current
    /// geometry untouched.
    pub fn set_pattern(&mut self, kind: &str) -> Result<(), Error> {
        self.check_alive()?;
        let kind = kind.to_lowercase();
        pattern::lookup(&self.config.patterns, &kind)?;
        if kind == self.active_pattern() {
            return Ok(());
        }
        log::info!("changing pattern to {kind}");
        if self.is_ready() {
            self.rebuild_geometry(&kind)?;
        }
        self.params.set_pattern(&kind);
        self.render()
    }

    /// Updates some parameters.
    ///
    /// The values are clamped and stored (unknown names are ignored). If the
    /// geometry parameter changed, the geometry is rebuilt. Then all the
    /// parameters are pushed to the program and the scene is rendered once.
    ///
    /// This does nothing unless the engine is [`EngineState::Ready`].
    pub fn update<I, S>(&mut self, updates: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = (S, f32)>,
        S: AsRef<str>,
    {
        self.check_alive()?;
        if !self.is_ready() {
            return Ok(());
        }
        let before = self.params.get(&self.config.geometry_parameter);
        self.params.set(updates);
        if self.params.get(&self.config.geometry_parameter) != before {
            let kind = self.active_pattern().to_string();
            self.rebuild_geometry(&kind)?;
        }
        self.push_uniforms();
        self.render()
    }

    /// Resets all the parameters and the pattern to their defaults.
    ///
    /// If a program is loaded, the geometry is rebuilt, the uniforms are
    /// pushed and the scene is rendered once.
    pub fn reset_parameters(&mut self) -> Result<(), Error> {
        self.check_alive()?;
        self.params.reset();
        if !self.is_ready() {
            return Ok(());
        }
        let kind = self.active_pattern().to_string();
        self.rebuild_geometry(&kind)?;
        self.push_uniforms();
        self.render()
    }

    /// Renders the scene.
    ///
    /// This does nothing unless the engine is [`EngineState::Ready`]. The
    /// pattern geometry is drawn as points, stacked in as many instances as
    /// given by [`instance_count`] for the instance parameter. If the
    /// instance count is zero, the frame is cleared and nothing is drawn.
    pub fn render(&self) -> Result<(), Error> {
        self.check_alive()?;
        if !self.is_ready() {
            return Ok(());
        }
        self.gl.clear(self.config.clear_color);
        let Some(geometry) = &self.geometry else {
            return Ok(());
        };
        if let Some(location) = self.program.attribute_location() {
            self.gl.bind_vertex_buffer(&geometry.buffer, location, 2);
        }
        let instances = self
            .params
            .get(&self.config.instance_parameter)
            .map_or(1, instance_count);
        log::debug!(
            "render: pattern {}, {} points, {} instances",
            self.active_pattern(),
            geometry.vertex_count,
            instances
        );
        if instances > 0 {
            self.gl
                .draw_points_instanced(geometry.vertex_count, instances);
        }
        Ok(())
    }

    /// Handles the loss of the graphics context.
    ///
    /// Rendering stops until [`RenderEngine::context_restored`] is called.
    pub fn context_lost(&mut self) -> Result<(), Error> {
        self.check_alive()?;
        log::warn!("graphics context lost");
        self.state = EngineState::ContextLost;
        Ok(())
    }

    /// Handles the restoration of the graphics context.
    ///
    /// If a program was requested while the context was lost, or else if a
    /// program had been loaded, its paths are returned and the engine stays
    /// [`EngineState::NotReady`] until the program is loaded again by the
    /// caller. Otherwise the engine becomes [`EngineState::Ready`].
    pub fn context_restored(&mut self) -> Result<Option<ProgramPaths>, Error> {
        self.check_alive()?;
        log::info!("graphics context restored");
        match self.pending.take().or_else(|| self.paths.clone()) {
            Some(paths) => {
                self.state = EngineState::NotReady;
                Ok(Some(paths))
            }
            None => {
                self.state = EngineState::Ready;
                Ok(None)
            }
        }
    }

    /// Returns the controls for the current parameters.
    pub fn controls(&self) -> Result<Vec<Control>, Error> {
        self.check_alive()?;
        Ok(self
            .params
            .get_all_ranges()
            .into_iter()
            .map(|(name, range)| Control {
                value: self.params.get(&name).unwrap_or(range.default),
                name,
                min: range.min,
                max: range.max,
                step: self.config.control_step,
            })
            .collect())
    }

    /// Returns the driver/device identification string.
    pub fn renderer_info(&self) -> Result<String, Error> {
        self.check_alive()?;
        Ok(self.gl.renderer_info())
    }

    /// Releases all the GPU resources.
    ///
    /// The engine becomes [`EngineState::Disposed`] and any further call
    /// fails with [`Error::Disposed`].
    pub fn dispose(&mut self) -> Result<(), Error> {
        self.check_alive()?;
        self.release_resources();
        self.state = EngineState::Disposed;
        log::info!("render engine disposed");
        Ok(())
    }

    /// Returns the engine state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Returns `true` if the engine has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.state == EngineState::Disposed
    }

    /// Returns the number of geometry rebuilds so far.
    pub fn geometry_version(&self) -> u64 {
        self.geometry_version
    }

    /// Returns the active pattern tag.
    pub fn active_pattern(&self) -> &str {
        self.params
            .pattern()
            .unwrap_or(&self.config.initial_pattern)
    }

    /// Returns the parameter store.
    pub fn parameters(&self) -> &ParameterStore {
        &self.params
    }

    /// Returns the descriptors of the uniforms of the loaded program.
    pub fn descriptors(&self) -> &[UniformDescriptor] {
        self.program.descriptors()
    }

    /// Returns the paths of the last successfully loaded program.
    pub fn program_paths(&self) -> Option<&ProgramPaths> {
        self.paths.as_ref()
    }

    /// Returns the paths of the program requested while the context was
    /// lost, if any.
    pub fn pending_paths(&self) -> Option<&ProgramPaths> {
        self.pending.as_ref()
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the graphics backend.
    pub fn backend(&self) -> &B {
        &self.gl
    }

    fn check_alive(&self) -> Result<(), Error> {
        if self.is_disposed() {
            Err(Error::Disposed)
        } else {
            Ok(())
        }
    }

    fn is_ready(&self) -> bool {
        self.state == EngineState::Ready && self.program.is_linked()
    }

    fn rebuild_geometry(&mut self, kind: &str) -> Result<(), Error> {
        let offset = self
            .params
            .get(&self.config.geometry_parameter)
            .unwrap_or(0.0);
        let geometry = self.build_geometry(kind, offset)?;
        self.replace_geometry(geometry);
        Ok(())
    }

    fn build_geometry(&self, kind: &str, offset: f32) -> Result<Geometry<B>, Error> {
        let count = self.config.point_count.min(self.config.max_vertices);
        let geometry = pattern::generate(&self.config.patterns, kind, count as f64, offset)?;
        let buffer = self
            .gl
            .create_vertex_buffer(&geometry.to_interleaved())
            .ok_or(Error::Resource("vertex buffer"))?;
        log::debug!(
            "geometry created: pattern {kind}, {} vertices, offset {offset}",
            geometry.len()
        );
        Ok(Geometry {
            buffer,
            vertex_count: geometry.len() as i32,
        })
    }

    // The new buffer exists before the old one is released.
    fn replace_geometry(&mut self, geometry: Geometry<B>) {
        if let Some(old) = self.geometry.replace(geometry) {
            self.gl.delete_buffer(old.buffer);
        }
        self.geometry_version += 1;
    }

    fn push_uniforms(&self) {
        self.program.use_program(&self.gl);
        for (name, value) in self.params.get_all() {
            if let Err(e) = self.program.set_uniform(&self.gl, &name, value) {
                log::warn!("{e}");
            }
        }
    }

    fn tear_down(&mut self) {
        self.release_resources();
        if self.state != EngineState::ContextLost {
            self.state = EngineState::NotReady;
        }
    }

    fn release_resources(&mut self) {
        if let Some(geometry) = self.geometry.take() {
            self.gl.delete_buffer(geometry.buffer);
        }
        self.program.cleanup(&self.gl);
    }
}

impl<B: GlBackend> Drop for RenderEngine<B> {
    fn drop(&mut self) {
        if !self.is_disposed() {
            self.release_resources();
        }
    }
}
