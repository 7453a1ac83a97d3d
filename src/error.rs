//! Error type.
//!
//! All fallible operations of the engine return [`Error`]. At the wasm
//! boundary errors are converted into JavaScript `Error` objects.

use std::fmt;
use wasm_bindgen::JsValue;

use crate::render::ShaderStage;

/// Engine error.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A shader stage failed to compile.
    Compile {
        /// Stage that failed.
        stage: ShaderStage,
        /// Compiler info log.
        diagnostic: String,
    },
    /// The program failed to link.
    Link {
        /// Linker info log.
        diagnostic: String,
    },
    /// A shader source could not be retrieved.
    ///
    /// `status` is the HTTP status of the response, or 0 if no response was
    /// received.
    Fetch {
        /// Path that was requested.
        path: String,
        /// HTTP status code.
        status: u16,
        /// Status text or transport error message.
        reason: String,
    },
    /// The pattern tag is not in the pattern table.
    UnknownPattern {
        /// Requested pattern.
        kind: String,
    },
    /// The key is not in the shader catalog.
    UnknownShader {
        /// Requested catalog key.
        key: String,
    },
    /// A uniform has a type that cannot be set.
    ///
    /// This is not fatal: the uniform is skipped and rendering continues.
    UnsupportedUniformType {
        /// Uniform name.
        name: String,
        /// GL type enum reported by introspection.
        gl_type: u32,
    },
    /// The graphics API failed to create an object.
    Resource(&'static str),
    /// Invalid engine configuration.
    Config(String),
    /// The engine has been disposed.
    Disposed,
    /// A newer program load was started before this one completed.
    Superseded,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Compile { stage, diagnostic } => {
                write!(f, "{stage} shader compile failed: {diagnostic}")
            }
            Error::Link { diagnostic } => write!(f, "program link failed: {diagnostic}"),
            Error::Fetch {
                path,
                status,
                reason,
            } => write!(f, "failed to fetch shader at {path}: {status} {reason}"),
            Error::UnknownPattern { kind } => write!(f, "unknown pattern type: {kind}"),
            Error::UnknownShader { key } => write!(f, "unknown shader: {key}"),
            Error::UnsupportedUniformType { name, gl_type } => {
                write!(f, "unsupported uniform type for {name}: {gl_type:#06x}")
            }
            Error::Resource(what) => write!(f, "unable to create {what}"),
            Error::Config(msg) => write!(f, "invalid configuration: {msg}"),
            Error::Disposed => write!(f, "render engine has been disposed"),
            Error::Superseded => write!(f, "program load superseded by a newer load"),
        }
    }
}

impl std::error::Error for Error {}

impl From<Error> for JsValue {
    fn from(value: Error) -> JsValue {
        js_sys::Error::new(&value.to_string()).into()
    }
}
