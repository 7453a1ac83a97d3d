#![cfg(target_arch = "wasm32")]

use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;
use web_sys::HtmlCanvasElement;

use zset_wasm::config::{EngineConfig, ProgramPaths};
use zset_wasm::render::{EngineState, ProgramSource, RenderEngine, UniformKind, WebGl2Backend};
use zset_wasm::visualizer::Visualizer;

wasm_bindgen_test_configure!(run_in_browser);

const VERTEX_SHADER: &str = r#"#version 300 es
in vec2 pattern;
uniform float energy;
uniform float offset;
void main() {
    float layer = float(gl_InstanceID) / (energy + 1.0);
    float r = pattern.x * (1.0 - 0.1 * layer);
    gl_Position = vec4(r * cos(pattern.y + offset), r * sin(pattern.y), 0.0, 1.0);
    gl_PointSize = 2.0;
}
"#;

const FRAGMENT_SHADER: &str = r#"#version 300 es
precision highp float;
uniform vec3 tint;
out vec4 color;
void main() {
    color = vec4(tint + 0.5, 1.0);
}
"#;

fn canvas() -> HtmlCanvasElement {
    let document = web_sys::window().unwrap().document().unwrap();
    let canvas = document
        .create_element("canvas")
        .unwrap()
        .dyn_into::<HtmlCanvasElement>()
        .unwrap();
    canvas.set_width(64);
    canvas.set_height(64);
    document.body().unwrap().append_child(&canvas).unwrap();
    canvas
}

fn engine() -> RenderEngine<WebGl2Backend> {
    let window = web_sys::window().unwrap();
    let config = EngineConfig::default();
    let gl = WebGl2Backend::new(&canvas(), &window, &config.context).unwrap();
    RenderEngine::new(gl, config).unwrap()
}

fn paths() -> ProgramPaths {
    ProgramPaths::new("inline.vert", "inline.frag")
}

#[wasm_bindgen_test]
fn introspects_and_renders() {
    let mut engine = engine();
    let descriptors = engine
        .load_program(
            &paths(),
            ProgramSource {
                vertex_shader: VERTEX_SHADER,
                fragment_shader: FRAGMENT_SHADER,
            },
        )
        .unwrap();
    let mut names: Vec<&str> = descriptors.iter().map(|d| d.name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["energy", "offset", "tint"]);
    let tint = descriptors.iter().find(|d| d.name == "tint").unwrap();
    assert_eq!(tint.kind, UniformKind::Vec3);
    assert_eq!(engine.state(), EngineState::Ready);
    engine.update([("offset", 1.0), ("energy", 3.0)]).unwrap();
    engine.set_pattern("rose").unwrap();
    assert!(!engine.renderer_info().unwrap().is_empty());
    engine.dispose().unwrap();
}

#[wasm_bindgen_test]
fn compile_error_is_reported() {
    let mut engine = engine();
    let err = engine
        .load_program(
            &paths(),
            ProgramSource {
                vertex_shader: "#version 300 es\nvoid main() { nonsense }\n",
                fragment_shader: FRAGMENT_SHADER,
            },
        )
        .unwrap_err();
    assert!(err.to_string().starts_with("vertex shader compile failed"));
    assert_eq!(engine.state(), EngineState::NotReady);
}

#[wasm_bindgen_test]
fn visualizer_lifecycle() {
    let mut visualizer = Visualizer::new(canvas(), None).unwrap();
    assert_eq!(visualizer.state(), "uninitialized");
    assert!(visualizer.set_pattern("hypercube").is_err());
    visualizer.set_pattern("sphere").unwrap();
    let controls = visualizer.get_controls().unwrap();
    assert_eq!(js_sys::Array::from(&controls).length(), 0);
    visualizer.dispose().unwrap();
    assert_eq!(visualizer.state(), "disposed");
    assert!(visualizer.reset().is_err());
}

#[wasm_bindgen_test]
fn visualizer_rejects_bad_config() {
    let config = r#"{"initial_pattern": "torus"}"#.to_string();
    assert!(Visualizer::new(canvas(), Some(config)).is_err());
}
