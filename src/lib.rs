//! zset-wasm is a web visualizer of parametric patterns. It loads a pair of
//! GLSL shaders, discovers their uniforms and turns each of them into a
//! bounded parameter. The active pattern is drawn with WebGL2 as instanced
//! points, and the scene is redrawn whenever a parameter or the pattern
//! changes.

#![warn(missing_docs)]

use std::rc::Rc;
use wasm_bindgen::{prelude::*, JsCast};
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, HtmlCanvasElement, Window};

pub use crate::error::Error;
use crate::visualizer::Visualizer;

pub mod config;
pub mod error;
pub mod fetch;
pub mod params;
pub mod pattern;
pub mod render;
pub mod session;
pub mod version;
pub mod visualizer;

/// Initialize the wasm module.
///
/// This function is set to run as soon as the wasm module is instantiated. It
/// sets a panic hook using the [`console_error_panic_hook`] crate and routes
/// the [`log`] records to the browser console.
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    std::panic::set_hook(Box::new(console_error_panic_hook::hook));
    // Fails only if a logger is already set.
    console_log::init_with_level(log::Level::Info).ok();
    Ok(())
}

/// Starts the zset-wasm web application.
///
/// This function should be called from JavaScript when the web page is
/// loaded. It creates a [`Visualizer`] on the `#canvas` element and loads the
/// default shader of the catalog. The visualizer is returned so that the page
/// can wire its controls to it.
#[wasm_bindgen]
pub fn zset_wasm_start() -> Result<Visualizer, JsValue> {
    let (_window, document) = get_window_and_document()?;
    let canvas = document
        .get_element_by_id("canvas")
        .ok_or("unable to get #canvas element")?
        .dyn_into::<HtmlCanvasElement>()?;
    let visualizer = Visualizer::new(canvas, None)?;
    let session = visualizer.session().clone();
    spawn_local(async move {
        if let Err(e) = session.load_default_shader().await {
            log::error!("unable to load default shader: {e}");
        }
    });
    Ok(visualizer)
}

/// Returns the [`Window`] and [`Document`] objects.
///
/// These are returned inside an [`Rc`] so that their ownership can be shared.
pub fn get_window_and_document() -> Result<(Rc<Window>, Rc<Document>), JsValue> {
    let window = Rc::new(web_sys::window().ok_or("unable to get window")?);
    let document = Rc::new(window.document().ok_or("unable to get document")?);
    Ok((window, document))
}
