//! Recording backend used by the unit tests.
//!
//! Shader "compilation" scans the source for `uniform` and `in` declarations,
//! so test programs are written as ordinary GLSL. A `#error` line makes the
//! stage fail to compile and a `// LINK_ERROR` comment makes linking fail.

use std::cell::{Cell, Ref, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use super::{ActiveUniform, GlBackend, ShaderStage, UniformValue};

pub(crate) const VERTEX_SHADER: &str = r#"#version 300 es
in vec2 pattern;
uniform float energy;
uniform float offset;
uniform vec3 tint;
void main() {
    gl_PointSize = 2.0;
}
"#;

pub(crate) const FRAGMENT_SHADER: &str = r#"#version 300 es
precision highp float;
uniform float glow;
uniform mat4 u_matrix;
out vec4 color;
void main() {
    color = vec4(glow);
}
"#;

pub(crate) struct Shader {
    source: String,
}

pub(crate) struct Program {
    id: u32,
    uniforms: Vec<ActiveUniform>,
    attributes: Vec<String>,
}

#[derive(Debug, Default)]
pub(crate) struct Log {
    pub(crate) compiles: usize,
    pub(crate) shaders_created: usize,
    pub(crate) shaders_deleted: usize,
    pub(crate) programs_created: Vec<u32>,
    pub(crate) programs_deleted: Vec<u32>,
    pub(crate) used_programs: Vec<u32>,
    pub(crate) buffers_created: Vec<u32>,
    pub(crate) buffers_deleted: Vec<u32>,
    pub(crate) buffer_data: HashMap<u32, Vec<f32>>,
    pub(crate) bound_buffers: Vec<(u32, u32)>,
    pub(crate) uniforms: Vec<(String, UniformValue)>,
    pub(crate) clears: usize,
    pub(crate) draws: Vec<(i32, i32)>,
}

impl Log {
    pub(crate) fn live_programs(&self) -> usize {
        self.programs_created.len() - self.programs_deleted.len()
    }

    pub(crate) fn live_buffers(&self) -> usize {
        self.buffers_created.len() - self.buffers_deleted.len()
    }

    pub(crate) fn last_uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }
}

// Clones share the same log, so a test can keep a handle to the backend
// that it moved into an engine.
#[derive(Default, Clone)]
pub(crate) struct RecordingBackend {
    log: Rc<RefCell<Log>>,
    next_id: Rc<Cell<u32>>,
    fail_buffers: Rc<Cell<bool>>,
}

impl RecordingBackend {
    pub(crate) fn new() -> RecordingBackend {
        RecordingBackend::default()
    }

    pub(crate) fn log(&self) -> Ref<'_, Log> {
        self.log.borrow()
    }

    // Makes buffer creation fail, as when the GPU is out of memory.
    pub(crate) fn set_fail_buffers(&self, fail: bool) {
        self.fail_buffers.set(fail);
    }

    fn id(&self) -> u32 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }
}

fn gl_type(name: &str) -> u32 {
    match name {
        "float" => 0x1406,
        "int" => 0x1404,
        "vec2" => 0x8b50,
        "vec3" => 0x8b51,
        "vec4" => 0x8b52,
        "bool" => 0x8b56,
        "mat4" => 0x8b5c,
        "sampler2D" => 0x8b5e,
        _ => 0,
    }
}

// Returns (type, name) for each declaration starting with `keyword`.
fn declarations<'a>(source: &'a str, keyword: &str) -> Vec<(&'a str, &'a str)> {
    source
        .lines()
        .filter_map(|line| {
            let mut tokens: Vec<&str> = line
                .trim()
                .trim_end_matches(';')
                .split_whitespace()
                .collect();
            if tokens.first() != Some(&keyword) || tokens.len() < 3 {
                return None;
            }
            let name = tokens.pop()?;
            let ty = tokens.pop()?;
            Some((ty, name))
        })
        .collect()
}

impl GlBackend for RecordingBackend {
    type Shader = Shader;
    type Program = Program;
    type Buffer = u32;
    type Location = String;

    fn compile_shader(&self, stage: ShaderStage, source: &str) -> Result<Shader, String> {
        let mut log = self.log.borrow_mut();
        log.compiles += 1;
        if source.lines().any(|line| line.trim_start().starts_with("#error")) {
            return Err(format!("ERROR: 0:1: '{stage}' : #error directive"));
        }
        log.shaders_created += 1;
        Ok(Shader {
            source: source.to_string(),
        })
    }

    fn delete_shader(&self, _shader: Shader) {
        self.log.borrow_mut().shaders_deleted += 1;
    }

    fn link_program(
        &self,
        vertex_shader: &Shader,
        fragment_shader: &Shader,
    ) -> Result<Program, String> {
        if [vertex_shader, fragment_shader]
            .iter()
            .any(|shader| shader.source.contains("LINK_ERROR"))
        {
            return Err("ERROR: Linking failed".to_string());
        }
        let mut uniforms: Vec<ActiveUniform> = Vec::new();
        for shader in [vertex_shader, fragment_shader] {
            for (ty, name) in declarations(&shader.source, "uniform") {
                let (name, size) = match name.split_once('[') {
                    Some((base, rest)) => (
                        format!("{base}[0]"),
                        rest.trim_end_matches(']').parse().unwrap_or(1),
                    ),
                    None => (name.to_string(), 1),
                };
                if !uniforms.iter().any(|u| u.name == name) {
                    uniforms.push(ActiveUniform {
                        name,
                        gl_type: gl_type(ty),
                        size,
                    });
                }
            }
        }
        let attributes = declarations(&vertex_shader.source, "in")
            .into_iter()
            .map(|(_, name)| name.to_string())
            .collect();
        let id = self.id();
        self.log.borrow_mut().programs_created.push(id);
        Ok(Program {
            id,
            uniforms,
            attributes,
        })
    }

    fn delete_program(&self, program: Program) {
        self.log.borrow_mut().programs_deleted.push(program.id);
    }

    fn use_program(&self, program: &Program) {
        self.log.borrow_mut().used_programs.push(program.id);
    }

    fn active_uniforms(&self, program: &Program) -> Vec<ActiveUniform> {
        program.uniforms.clone()
    }

    fn uniform_location(&self, program: &Program, name: &str) -> Option<String> {
        program
            .uniforms
            .iter()
            .any(|u| u.name == name)
            .then(|| name.to_string())
    }

    fn set_uniform(&self, location: &String, value: UniformValue) {
        self.log
            .borrow_mut()
            .uniforms
            .push((location.clone(), value));
    }

    fn attribute_location(&self, program: &Program, name: &str) -> Option<u32> {
        program
            .attributes
            .iter()
            .position(|a| a == name)
            .map(|j| j as u32)
    }

    fn create_vertex_buffer(&self, data: &[f32]) -> Option<u32> {
        if self.fail_buffers.get() {
            return None;
        }
        let id = self.id();
        let mut log = self.log.borrow_mut();
        log.buffers_created.push(id);
        log.buffer_data.insert(id, data.to_vec());
        Some(id)
    }

    fn delete_buffer(&self, buffer: u32) {
        self.log.borrow_mut().buffers_deleted.push(buffer);
    }

    fn bind_vertex_buffer(&self, buffer: &u32, location: u32, components: i32) {
        assert_eq!(components, 2);
        self.log.borrow_mut().bound_buffers.push((*buffer, location));
    }

    fn clear(&self, _color: [f32; 4]) {
        self.log.borrow_mut().clears += 1;
    }

    fn draw_points_instanced(&self, count: i32, instances: i32) {
        self.log.borrow_mut().draws.push((count, instances));
    }

    fn renderer_info(&self) -> String {
        "Recording renderer".to_string()
    }
}
