//! Visualizer session.
//!
//! A [`Session`] shares a [`RenderEngine`] with the event handlers of the
//! page and drives the asynchronous part of a program load: the retrieval of
//! the shader sources through a [`SourceFetcher`]. No borrow of the engine is
//! held while the sources are being retrieved, so the engine can be used (or
//! disposed) in the meantime. Loads that complete after the engine has been
//! disposed, or after a newer load has started, are discarded.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use crate::config::ProgramPaths;
use crate::error::Error;
use crate::render::{Control, GlBackend, ProgramSource, RenderEngine, UniformDescriptor};

/// Shader source retrieval.
// The futures are driven on the browser's single thread, so they need not be
// Send.
#[allow(async_fn_in_trait)]
pub trait SourceFetcher {
    /// Retrieves the text at `path`.
    async fn fetch(&self, path: &str) -> Result<String, Error>;
}

/// Visualizer session.
///
/// Cloning a session gives another handle to the same engine.
pub struct Session<B: GlBackend, F> {
    engine: Rc<RefCell<RenderEngine<B>>>,
    fetcher: Rc<F>,
}

impl<B: GlBackend, F> Clone for Session<B, F> {
    fn clone(&self) -> Self {
        Session {
            engine: Rc::clone(&self.engine),
            fetcher: Rc::clone(&self.fetcher),
        }
    }
}

impl<B: GlBackend, F: SourceFetcher> Session<B, F> {
    /// Creates a new session.
    pub fn new(engine: RenderEngine<B>, fetcher: F) -> Session<B, F> {
        Session {
            engine: Rc::new(RefCell::new(engine)),
            fetcher: Rc::new(fetcher),
        }
    }

    /// Loads the program whose sources are at `paths`.
    ///
    /// Both sources are retrieved concurrently. See
    /// [`RenderEngine::load_program`] for the rest of the load. If the
    /// context is lost by the time the sources arrive, the load is deferred
    /// to [`Session::context_restored`] and no descriptors are returned.
    pub async fn load_program(&self, paths: ProgramPaths) -> Result<Vec<UniformDescriptor>, Error> {
        let generation = self.engine.borrow_mut().begin_load()?;
        log::info!("loading program {} + {}", paths.vertex, paths.fragment);
        let sources = futures::try_join!(
            self.fetcher.fetch(&paths.vertex),
            self.fetcher.fetch(&paths.fragment)
        );
        let mut engine = self.engine.borrow_mut();
        engine.check_load(generation)?;
        let (vertex_shader, fragment_shader) = match sources {
            Ok(sources) => sources,
            Err(e) => {
                engine.abort_load(&e);
                return Err(e);
            }
        };
        engine.load_program(
            &paths,
            ProgramSource {
                vertex_shader: &vertex_shader,
                fragment_shader: &fragment_shader,
            },
        )
    }

    /// Loads a program from the shader catalog.
    pub async fn load_shader(&self, key: &str) -> Result<Vec<UniformDescriptor>, Error> {
        let paths = self.engine.borrow().config().shader(key)?.clone();
        self.load_program(paths).await
    }

    /// Loads the default program of the shader catalog.
    pub async fn load_default_shader(&self) -> Result<Vec<UniformDescriptor>, Error> {
        let key = self.engine.borrow().config().default_shader.clone();
        self.load_shader(&key).await
    }

    /// Handles the restoration of the graphics context.
    ///
    /// The program requested while the context was lost, or else the
    /// program that had been loaded, is loaded again and its uniform
    /// descriptors are returned.
    pub async fn context_restored(&self) -> Result<Option<Vec<UniformDescriptor>>, Error> {
        let paths = self.engine.borrow_mut().context_restored()?;
        match paths {
            Some(paths) => self.load_program(paths).await.map(Some),
            None => Ok(None),
        }
    }

    /// Handles the loss of the graphics context.
    pub fn context_lost(&self) -> Result<(), Error> {
        self.engine.borrow_mut().context_lost()
    }

    /// Changes the active pattern.
    pub fn set_pattern(&self, kind: &str) -> Result<(), Error> {
        self.engine.borrow_mut().set_pattern(kind)
    }

    /// Updates some parameters.
    pub fn update<I, S>(&self, updates: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = (S, f32)>,
        S: AsRef<str>,
    {
        self.engine.borrow_mut().update(updates)
    }

    /// Returns the controls for the current parameters.
    pub fn controls(&self) -> Result<Vec<Control>, Error> {
        self.engine.borrow().controls()
    }

    /// Returns the driver/device identification string.
    pub fn renderer_info(&self) -> Result<String, Error> {
        self.engine.borrow().renderer_info()
    }

    /// Resets all the parameters and the pattern to their defaults.
    pub fn reset(&self) -> Result<(), Error> {
        self.engine.borrow_mut().reset_parameters()
    }

    /// Disposes the engine.
    pub fn dispose(&self) -> Result<(), Error> {
        self.engine.borrow_mut().dispose()
    }

    /// Borrows the engine.
    pub fn engine(&self) -> Ref<'_, RenderEngine<B>> {
        self.engine.borrow()
    }

    /// Mutably borrows the engine.
    pub fn engine_mut(&self) -> RefMut<'_, RenderEngine<B>> {
        self.engine.borrow_mut()
    }

    /// Returns the source fetcher.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::EngineConfig;
    use crate::render::testing::{RecordingBackend, FRAGMENT_SHADER, VERTEX_SHADER};
    use crate::render::EngineState;
    use futures::executor::block_on;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapFetcher {
        sources: HashMap<String, String>,
        requests: RefCell<Vec<String>>,
        // Runs once, in the middle of the next fetch.
        hook: RefCell<Option<Box<dyn FnOnce()>>>,
    }

    impl MapFetcher {
        fn with_theory() -> MapFetcher {
            let sources = HashMap::from([
                ("/shaders/theory.vert".to_string(), VERTEX_SHADER.to_string()),
                ("/shaders/theory.frag".to_string(), FRAGMENT_SHADER.to_string()),
                ("/shaders/basic.vert".to_string(), VERTEX_SHADER.to_string()),
            ]);
            MapFetcher {
                sources,
                ..MapFetcher::default()
            }
        }

        fn set_hook(&self, hook: impl FnOnce() + 'static) {
            self.hook.replace(Some(Box::new(hook)));
        }

        fn requests(&self) -> Vec<String> {
            self.requests.borrow().clone()
        }
    }

    impl SourceFetcher for MapFetcher {
        async fn fetch(&self, path: &str) -> Result<String, Error> {
            self.requests.borrow_mut().push(path.to_string());
            let hook = self.hook.borrow_mut().take();
            if let Some(hook) = hook {
                hook();
            }
            self.sources
                .get(path)
                .cloned()
                .ok_or_else(|| Error::Fetch {
                    path: path.to_string(),
                    status: 404,
                    reason: "Not Found".to_string(),
                })
        }
    }

    fn session() -> (Session<RecordingBackend, MapFetcher>, RecordingBackend) {
        let gl = RecordingBackend::new();
        let engine = RenderEngine::new(gl.clone(), EngineConfig::default()).unwrap();
        (Session::new(engine, MapFetcher::with_theory()), gl)
    }

    #[test]
    fn loads_from_catalog() {
        let (session, gl) = session();
        let descriptors = block_on(session.load_default_shader()).unwrap();
        assert_eq!(descriptors.len(), 5);
        assert_eq!(
            session.fetcher().requests(),
            vec!["/shaders/theory.vert", "/shaders/theory.frag"]
        );
        assert_eq!(session.engine().state(), EngineState::Ready);
        assert_eq!(session.controls().unwrap().len(), 5);
        assert_eq!(gl.log().draws, vec![(720, 7)]);
    }

    #[test]
    fn unknown_shader_fetches_nothing() {
        let (session, _gl) = session();
        assert_eq!(
            block_on(session.load_shader("fancy")),
            Err(Error::UnknownShader {
                key: "fancy".to_string()
            })
        );
        assert!(session.fetcher().requests().is_empty());
    }

    #[test]
    fn fetch_failure() {
        let (session, gl) = session();
        let err = block_on(session.load_shader("debug")).unwrap_err();
        assert!(matches!(err, Error::Fetch { status: 404, .. }));
        assert_eq!(session.engine().state(), EngineState::NotReady);
        assert!(gl.log().programs_created.is_empty());
    }

    #[test]
    fn fetch_failure_keeps_loaded_program() {
        let (session, gl) = session();
        block_on(session.load_default_shader()).unwrap();
        // basic.frag is missing
        assert!(block_on(session.load_shader("basic")).is_err());
        assert_eq!(session.engine().state(), EngineState::Ready);
        assert_eq!(
            session.engine().program_paths(),
            Some(&ProgramPaths::new("/shaders/theory.vert", "/shaders/theory.frag"))
        );
        assert_eq!(gl.log().live_programs(), 1);
    }

    #[test]
    fn restore_reloads_same_program_once() {
        let (session, gl) = session();
        let descriptors = block_on(session.load_default_shader()).unwrap();
        session.update([("offset", 1.0)]).unwrap();
        session.context_lost().unwrap();
        let reloaded = block_on(session.context_restored()).unwrap();
        assert_eq!(reloaded, Some(descriptors));
        assert_eq!(
            session.fetcher().requests(),
            vec![
                "/shaders/theory.vert",
                "/shaders/theory.frag",
                "/shaders/theory.vert",
                "/shaders/theory.frag"
            ]
        );
        assert_eq!(session.engine().state(), EngineState::Ready);
        assert_eq!(session.engine().parameters().get("offset"), Some(0.0));
        assert_eq!(gl.log().live_programs(), 1);
    }

    #[test]
    fn restore_before_any_load() {
        let (session, _gl) = session();
        session.context_lost().unwrap();
        assert_eq!(block_on(session.context_restored()), Ok(None));
        assert!(session.fetcher().requests().is_empty());
    }

    #[test]
    fn dispose_during_fetch_discards_load() {
        let (session, gl) = session();
        let handle = session.clone();
        session
            .fetcher()
            .set_hook(move || handle.dispose().unwrap());
        assert_eq!(block_on(session.load_default_shader()), Err(Error::Disposed));
        assert!(gl.log().programs_created.is_empty());
        assert!(gl.log().draws.is_empty());
        assert!(session.engine().is_disposed());
    }

    #[test]
    fn context_lost_during_fetch_reloads_on_restore() {
        let (session, gl) = session();
        let handle = session.clone();
        session
            .fetcher()
            .set_hook(move || handle.context_lost().unwrap());
        assert_eq!(block_on(session.load_default_shader()), Ok(Vec::new()));
        assert_eq!(session.engine().state(), EngineState::ContextLost);
        assert!(gl.log().programs_created.is_empty());

        let reloaded = block_on(session.context_restored()).unwrap().unwrap();
        assert_eq!(reloaded.len(), 5);
        assert_eq!(
            session.fetcher().requests(),
            vec![
                "/shaders/theory.vert",
                "/shaders/theory.frag",
                "/shaders/theory.vert",
                "/shaders/theory.frag"
            ]
        );
        assert_eq!(session.engine().state(), EngineState::Ready);
        assert_eq!(gl.log().programs_created.len(), 1);
        assert_eq!(gl.log().draws.len(), 1);
    }

    #[test]
    fn superseded_load_is_discarded() {
        let (session, gl) = session();
        let handle = session.clone();
        session.fetcher().set_hook(move || {
            handle.engine_mut().begin_load().unwrap();
        });
        assert_eq!(
            block_on(session.load_default_shader()),
            Err(Error::Superseded)
        );
        assert!(gl.log().programs_created.is_empty());
        // the next load goes through
        block_on(session.load_default_shader()).unwrap();
        assert_eq!(gl.log().live_programs(), 1);
    }
}
