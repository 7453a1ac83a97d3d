use wasm_bindgen::prelude::*;
use web_sys::{
    HtmlCanvasElement, WebGl2RenderingContext, WebGlBuffer, WebGlContextAttributes,
    WebGlPowerPreference, WebGlProgram, WebGlShader, WebGlUniformLocation, Window,
};

use super::{ActiveUniform, GlBackend, ShaderStage, UniformValue};
use crate::config::{ContextOptions, PowerPreference};

/// WebGL2 graphics backend.
///
/// This implements [`GlBackend`] over a [`WebGl2RenderingContext`] obtained
/// from an HTML canvas element.
pub struct WebGl2Backend {
    gl: WebGl2RenderingContext,
}

impl WebGl2Backend {
    /// Creates a WebGL2 backend for a canvas.
    ///
    /// The WebGL2 context is requested with the attributes given in
    /// `options`. Alpha blending is enabled and the canvas is sized to its
    /// layout size in device pixels.
    pub fn new(
        canvas: &HtmlCanvasElement,
        window: &Window,
        options: &ContextOptions,
    ) -> Result<WebGl2Backend, JsValue> {
        let attrs = WebGlContextAttributes::new();
        attrs.set_alpha(options.alpha);
        attrs.set_antialias(options.antialias);
        attrs.set_preserve_drawing_buffer(options.preserve_drawing_buffer);
        attrs.set_power_preference(match options.power_preference {
            PowerPreference::Default => WebGlPowerPreference::Default,
            PowerPreference::LowPower => WebGlPowerPreference::LowPower,
            PowerPreference::HighPerformance => WebGlPowerPreference::HighPerformance,
        });
        let gl = canvas
            .get_context_with_context_options("webgl2", &attrs)?
            .ok_or("WebGL2 is not supported")?
            .dyn_into::<WebGl2RenderingContext>()?;
        let backend = WebGl2Backend { gl };
        backend.setup(canvas, window);
        Ok(backend)
    }

    /// Sets the blending mode and the viewport.
    ///
    /// This must be called again after the context is restored, since a
    /// restored context has default state.
    pub fn setup(&self, canvas: &HtmlCanvasElement, window: &Window) {
        self.gl.enable(WebGl2RenderingContext::BLEND);
        self.gl.blend_func(
            WebGl2RenderingContext::SRC_ALPHA,
            WebGl2RenderingContext::ONE_MINUS_SRC_ALPHA,
        );
        self.resize(canvas, window);
    }

    /// Sizes the canvas and the viewport to the layout size of the canvas
    /// in device pixels.
    pub fn resize(&self, canvas: &HtmlCanvasElement, window: &Window) {
        let ratio = window.device_pixel_ratio();
        let width = (f64::from(canvas.client_width()) * ratio).round() as u32;
        let height = (f64::from(canvas.client_height()) * ratio).round() as u32;
        if width > 0 && height > 0 {
            canvas.set_width(width);
            canvas.set_height(height);
        }
        self.gl
            .viewport(0, 0, canvas.width() as i32, canvas.height() as i32);
    }

    /// Returns the WebGL2 context.
    pub fn context(&self) -> &WebGl2RenderingContext {
        &self.gl
    }
}

impl GlBackend for WebGl2Backend {
    type Shader = WebGlShader;
    type Program = WebGlProgram;
    type Buffer = WebGlBuffer;
    type Location = WebGlUniformLocation;

    fn compile_shader(&self, stage: ShaderStage, source: &str) -> Result<WebGlShader, String> {
        let shader_type = match stage {
            ShaderStage::Vertex => WebGl2RenderingContext::VERTEX_SHADER,
            ShaderStage::Fragment => WebGl2RenderingContext::FRAGMENT_SHADER,
        };
        let shader = self
            .gl
            .create_shader(shader_type)
            .ok_or_else(|| "failed to create shader".to_string())?;
        self.gl.shader_source(&shader, source);
        self.gl.compile_shader(&shader);
        if self
            .gl
            .get_shader_parameter(&shader, WebGl2RenderingContext::COMPILE_STATUS)
            .as_bool()
            .unwrap_or(false)
        {
            Ok(shader)
        } else {
            let diagnostic = self
                .gl
                .get_shader_info_log(&shader)
                .unwrap_or_else(|| "unknown error creating shader".to_string());
            self.gl.delete_shader(Some(&shader));
            Err(diagnostic)
        }
    }

    fn delete_shader(&self, shader: WebGlShader) {
        self.gl.delete_shader(Some(&shader));
    }

    fn link_program(
        &self,
        vertex_shader: &WebGlShader,
        fragment_shader: &WebGlShader,
    ) -> Result<WebGlProgram, String> {
        let program = self
            .gl
            .create_program()
            .ok_or_else(|| "unable to create program".to_string())?;
        self.gl.attach_shader(&program, vertex_shader);
        self.gl.attach_shader(&program, fragment_shader);
        self.gl.link_program(&program);
        if self
            .gl
            .get_program_parameter(&program, WebGl2RenderingContext::LINK_STATUS)
            .as_bool()
            .unwrap_or(false)
        {
            Ok(program)
        } else {
            let diagnostic = self
                .gl
                .get_program_info_log(&program)
                .unwrap_or_else(|| "unknown error linking program".to_string());
            self.gl.delete_program(Some(&program));
            Err(diagnostic)
        }
    }

    fn delete_program(&self, program: WebGlProgram) {
        self.gl.delete_program(Some(&program));
    }

    fn use_program(&self, program: &WebGlProgram) {
        self.gl.use_program(Some(program));
    }

    fn active_uniforms(&self, program: &WebGlProgram) -> Vec<ActiveUniform> {
        let count = self
            .gl
            .get_program_parameter(program, WebGl2RenderingContext::ACTIVE_UNIFORMS)
            .as_f64()
            .unwrap_or(0.0) as u32;
        (0..count)
            .filter_map(|index| self.gl.get_active_uniform(program, index))
            .map(|info| ActiveUniform {
                name: info.name(),
                gl_type: info.type_(),
                size: info.size(),
            })
            .collect()
    }

    fn uniform_location(&self, program: &WebGlProgram, name: &str) -> Option<WebGlUniformLocation> {
        self.gl.get_uniform_location(program, name)
    }

    fn set_uniform(&self, location: &WebGlUniformLocation, value: UniformValue) {
        value.uniform(&self.gl, Some(location));
    }

    fn attribute_location(&self, program: &WebGlProgram, name: &str) -> Option<u32> {
        match self.gl.get_attrib_location(program, name) {
            x if x >= 0 => Some(x as u32),
            _ => None,
        }
    }

    fn create_vertex_buffer(&self, data: &[f32]) -> Option<WebGlBuffer> {
        let buffer = self.gl.create_buffer()?;
        self.gl
            .bind_buffer(WebGl2RenderingContext::ARRAY_BUFFER, Some(&buffer));
        // The typed array is a copy in the JS heap, so it stays valid even if
        // the wasm memory grows.
        let view = js_sys::Float32Array::from(data);
        self.gl.buffer_data_with_array_buffer_view(
            WebGl2RenderingContext::ARRAY_BUFFER,
            &view,
            WebGl2RenderingContext::STATIC_DRAW,
        );
        Some(buffer)
    }

    fn delete_buffer(&self, buffer: WebGlBuffer) {
        self.gl.delete_buffer(Some(&buffer));
    }

    fn bind_vertex_buffer(&self, buffer: &WebGlBuffer, location: u32, components: i32) {
        self.gl
            .bind_buffer(WebGl2RenderingContext::ARRAY_BUFFER, Some(buffer));
        self.gl.enable_vertex_attrib_array(location);
        let normalized = false;
        let stride = 0;
        let offset = 0;
        self.gl.vertex_attrib_pointer_with_i32(
            location,
            components,
            WebGl2RenderingContext::FLOAT,
            normalized,
            stride,
            offset,
        );
    }

    fn clear(&self, color: [f32; 4]) {
        self.gl.clear_color(color[0], color[1], color[2], color[3]);
        self.gl.clear(WebGl2RenderingContext::COLOR_BUFFER_BIT);
    }

    fn draw_points_instanced(&self, count: i32, instances: i32) {
        self.gl
            .draw_arrays_instanced(WebGl2RenderingContext::POINTS, 0, count, instances);
    }

    fn renderer_info(&self) -> String {
        self.gl
            .get_parameter(WebGl2RenderingContext::RENDERER)
            .ok()
            .and_then(|value| value.as_string())
            .unwrap_or_else(|| "unknown renderer".to_string())
    }
}
