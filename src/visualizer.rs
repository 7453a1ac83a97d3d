//! JavaScript interface.
//!
//! [`Visualizer`] is the object exported to JavaScript. It owns a
//! [`Session`] over a WebGL2 canvas and translates between JavaScript values
//! and the engine types.

use serde::Serialize;
use wasm_bindgen::{prelude::*, JsCast};
use wasm_bindgen_futures::{future_to_promise, spawn_local};
use web_sys::{Event, HtmlCanvasElement, Window};

use crate::config::{EngineConfig, ProgramPaths};
use crate::fetch::HttpFetcher;
use crate::render::{EngineState, RenderEngine, WebGl2Backend};
use crate::session::Session;

type WebSession = Session<WebGl2Backend, HttpFetcher>;

/// Parametric pattern visualizer.
#[wasm_bindgen]
pub struct Visualizer {
    session: WebSession,
    canvas: HtmlCanvasElement,
    listeners: Option<ContextListeners>,
}

struct ContextListeners {
    lost: Closure<dyn Fn(Event)>,
    restored: Closure<dyn Fn(Event)>,
}

const CONTEXT_LOST: &str = "webglcontextlost";
const CONTEXT_RESTORED: &str = "webglcontextrestored";

impl ContextListeners {
    fn install(
        canvas: &HtmlCanvasElement,
        window: &Window,
        session: &WebSession,
    ) -> Result<ContextListeners, JsValue> {
        let lost = {
            let session = session.clone();
            Closure::<dyn Fn(Event)>::new(move |event: Event| {
                // Required for the browser to restore the context later.
                event.prevent_default();
                if let Err(e) = session.context_lost() {
                    log::warn!("{e}");
                }
            })
        };
        let restored = {
            let session = session.clone();
            let canvas = canvas.clone();
            let window = window.clone();
            Closure::<dyn Fn(Event)>::new(move |_: Event| {
                if session.engine().is_disposed() {
                    return;
                }
                session.engine().backend().setup(&canvas, &window);
                let session = session.clone();
                spawn_local(async move {
                    if let Err(e) = session.context_restored().await {
                        log::error!("reload after context restore failed: {e}");
                    }
                });
            })
        };
        canvas
            .add_event_listener_with_callback(CONTEXT_LOST, lost.as_ref().unchecked_ref())?;
        canvas.add_event_listener_with_callback(
            CONTEXT_RESTORED,
            restored.as_ref().unchecked_ref(),
        )?;
        Ok(ContextListeners { lost, restored })
    }

    fn remove(&self, canvas: &HtmlCanvasElement) -> Result<(), JsValue> {
        canvas.remove_event_listener_with_callback(
            CONTEXT_LOST,
            self.lost.as_ref().unchecked_ref(),
        )?;
        canvas.remove_event_listener_with_callback(
            CONTEXT_RESTORED,
            self.restored.as_ref().unchecked_ref(),
        )
    }
}

#[wasm_bindgen]
impl Visualizer {
    /// Creates a visualizer rendering to `canvas`.
    ///
    /// `config` is an optional engine configuration in JSON. Omitted fields
    /// take their default values.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas: HtmlCanvasElement, config: Option<String>) -> Result<Visualizer, JsValue> {
        let window = web_sys::window().ok_or("unable to get window")?;
        let config = match config {
            Some(json) => EngineConfig::from_json(&json)?,
            None => EngineConfig::default(),
        };
        let gl = WebGl2Backend::new(&canvas, &window, &config.context)?;
        let engine = RenderEngine::new(gl, config)?;
        let session = Session::new(engine, HttpFetcher::new(window.clone()));
        let listeners = ContextListeners::install(&canvas, &window, &session)?;
        Ok(Visualizer {
            session,
            canvas,
            listeners: Some(listeners),
        })
    }

    /// Loads the program with sources at the given paths.
    ///
    /// Returns a promise that resolves to the descriptors of the discovered
    /// uniforms. The list is empty if the context was lost in the meantime,
    /// in which case the program is loaded when the context is restored.
    #[wasm_bindgen(js_name = loadProgram)]
    pub fn load_program(&self, vertex_path: String, fragment_path: String) -> js_sys::Promise {
        let session = self.session.clone();
        future_to_promise(async move {
            let descriptors = session
                .load_program(ProgramPaths::new(vertex_path, fragment_path))
                .await?;
            to_js(&descriptors)
        })
    }

    /// Loads a program from the shader catalog.
    ///
    /// Returns a promise that resolves to the descriptors of the discovered
    /// uniforms.
    #[wasm_bindgen(js_name = loadShader)]
    pub fn load_shader(&self, key: String) -> js_sys::Promise {
        let session = self.session.clone();
        future_to_promise(async move {
            let descriptors = session.load_shader(&key).await?;
            to_js(&descriptors)
        })
    }

    /// Changes the active pattern.
    #[wasm_bindgen(js_name = setPattern)]
    pub fn set_pattern(&self, kind: &str) -> Result<(), JsValue> {
        Ok(self.session.set_pattern(kind)?)
    }

    /// Updates some parameters.
    ///
    /// `params` is an object mapping parameter names to numbers. Entries
    /// whose value is not a number are ignored.
    pub fn update(&self, params: &JsValue) -> Result<(), JsValue> {
        let params = params
            .dyn_ref::<js_sys::Object>()
            .ok_or("parameters must be an object")?;
        let updates = js_sys::Object::entries(params)
            .iter()
            .filter_map(|entry| {
                let entry = entry.dyn_into::<js_sys::Array>().ok()?;
                let name = entry.get(0).as_string()?;
                let value = entry.get(1).as_f64()?;
                Some((name, value as f32))
            })
            .collect::<Vec<_>>();
        Ok(self.session.update(updates)?)
    }

    /// Returns the controls for the current parameters.
    ///
    /// Each control is an object with `name`, `min`, `max`, `step` and
    /// `value` fields.
    #[wasm_bindgen(js_name = getControls)]
    pub fn get_controls(&self) -> Result<JsValue, JsValue> {
        to_js(&self.session.controls()?)
    }

    /// Returns the driver/device identification string.
    #[wasm_bindgen(js_name = getRendererInfo)]
    pub fn get_renderer_info(&self) -> Result<String, JsValue> {
        Ok(self.session.renderer_info()?)
    }

    /// Resets all the parameters and the pattern to their defaults.
    pub fn reset(&self) -> Result<(), JsValue> {
        Ok(self.session.reset()?)
    }

    /// Returns the engine state as a string.
    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        match self.session.engine().state() {
            EngineState::Uninitialized => "uninitialized",
            EngineState::Ready => "ready",
            EngineState::NotReady => "not-ready",
            EngineState::ContextLost => "context-lost",
            EngineState::Disposed => "disposed",
        }
        .to_string()
    }

    /// Releases all the GPU resources and event listeners.
    ///
    /// Any further call fails.
    pub fn dispose(&mut self) -> Result<(), JsValue> {
        if let Some(listeners) = self.listeners.take() {
            listeners.remove(&self.canvas)?;
        }
        Ok(self.session.dispose()?)
    }
}

impl Visualizer {
    /// Returns the session.
    pub fn session(&self) -> &Session<WebGl2Backend, HttpFetcher> {
        &self.session
    }
}

impl Drop for Visualizer {
    fn drop(&mut self) {
        // The listeners hold handles to the session, which would otherwise
        // keep the engine alive.
        if let Some(listeners) = self.listeners.take() {
            if let Err(e) = listeners.remove(&self.canvas) {
                web_sys::console::error_1(&e);
            }
        }
    }
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    let json = serde_json::to_string(value).map_err(|e| format!("unable to format JSON: {e}"))?;
    js_sys::JSON::parse(&json)
}
