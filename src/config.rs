//! Engine configuration.
//!
//! The heuristics of the engine (uniform range rules, pattern table and
//! shader catalog) are plain data in an [`EngineConfig`] passed at engine
//! construction. The configuration can be deserialized from JSON; any field
//! that is omitted takes its default value.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f32::consts::{PI, TAU};

use crate::error::Error;
use crate::pattern::{PatternSpec, RadiusShape};
use crate::render::UniformRange;

/// Paths of the two stages of a shader program.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq, Hash)]
pub struct ProgramPaths {
    /// Path of the vertex shader source.
    pub vertex: String,
    /// Path of the fragment shader source.
    pub fragment: String,
}

impl ProgramPaths {
    /// Creates program paths.
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> ProgramPaths {
        ProgramPaths {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }
}

/// Range assignment rules for discovered uniforms.
///
/// Uniforms whose name appears in `named` get that range. Every other uniform
/// gets `default`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct UniformRangeRules {
    /// Ranges for specific uniform names.
    pub named: BTreeMap<String, UniformRange>,
    /// Range for all other uniforms.
    pub default: UniformRange,
}

impl UniformRangeRules {
    /// Returns the range for the uniform `name`.
    pub fn range_for(&self, name: &str) -> UniformRange {
        self.named.get(name).copied().unwrap_or(self.default)
    }
}

impl Default for UniformRangeRules {
    fn default() -> Self {
        // "energy" counts stacked dimensional layers.
        let named = BTreeMap::from([(
            "energy".to_string(),
            UniformRange::new(0.0, 4.0 * PI, 2.0 * PI),
        )]);
        UniformRangeRules {
            named,
            default: UniformRange::new(-2.0, 2.0, 0.0),
        }
    }
}

/// How a program reload treats the resources of the previous program.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReloadPolicy {
    /// Compile and link the new program before releasing the old one. A
    /// failed reload keeps the previous program, geometry and parameters.
    #[default]
    AtomicSwap,
    /// Release the old program and geometry before the new one is known to
    /// be valid. A failed reload leaves the engine not rendering.
    TearDownFirst,
}

/// GPU power preference requested at context creation.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PowerPreference {
    /// Let the browser decide.
    Default,
    /// Prefer a low power GPU.
    LowPower,
    /// Prefer a high performance GPU.
    #[default]
    HighPerformance,
}

/// Attributes used to create the WebGL2 context.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq)]
#[serde(default)]
pub struct ContextOptions {
    /// The canvas has an alpha channel.
    pub alpha: bool,
    /// Request antialiasing.
    pub antialias: bool,
    /// Keep the drawing buffer between frames.
    pub preserve_drawing_buffer: bool,
    /// GPU power preference.
    pub power_preference: PowerPreference,
}

impl Default for ContextOptions {
    fn default() -> Self {
        ContextOptions {
            alpha: true,
            antialias: true,
            preserve_drawing_buffer: true,
            power_preference: PowerPreference::HighPerformance,
        }
    }
}

/// Engine configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Range rules for discovered uniforms.
    pub uniform_range_rules: UniformRangeRules,
    /// Pattern table, indexed by lowercase pattern tag.
    pub patterns: BTreeMap<String, PatternSpec>,
    /// Shader catalog, indexed by key.
    pub shader_catalog: BTreeMap<String, ProgramPaths>,
    /// Catalog key of the shader loaded at startup.
    pub default_shader: String,
    /// Pattern active when none has been selected.
    pub initial_pattern: String,
    /// Number of points generated for a pattern.
    pub point_count: usize,
    /// Upper bound for the number of points of a pattern.
    pub max_vertices: usize,
    /// Step reported for the controls.
    pub control_step: f32,
    /// Parameter that shifts the pattern phase and triggers a geometry
    /// rebuild when it changes.
    pub geometry_parameter: String,
    /// Parameter that gives the number of stacked instances.
    pub instance_parameter: String,
    /// Vertex attribute that receives the pattern vertices.
    pub pattern_attribute: String,
    /// Color used to clear the frame.
    pub clear_color: [f32; 4],
    /// Context creation attributes.
    pub context: ContextOptions,
    /// Reload behaviour.
    pub reload_policy: ReloadPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let patterns = BTreeMap::from([
            (
                "origin".to_string(),
                PatternSpec::new(TAU, RadiusShape::Constant(0.0)),
            ),
            (
                "circle".to_string(),
                PatternSpec::new(TAU, RadiusShape::Constant(1.0)),
            ),
            (
                "sphere".to_string(),
                PatternSpec::new(2.0 * TAU, RadiusShape::Constant(1.0)),
            ),
            ("rose".to_string(), PatternSpec::new(TAU, RadiusShape::Lobes)),
        ]);
        let shader_catalog = ["theory", "basic", "debug"]
            .into_iter()
            .map(|key| {
                (
                    key.to_string(),
                    ProgramPaths::new(
                        format!("/shaders/{key}.vert"),
                        format!("/shaders/{key}.frag"),
                    ),
                )
            })
            .collect();
        EngineConfig {
            uniform_range_rules: UniformRangeRules::default(),
            patterns,
            shader_catalog,
            default_shader: "theory".to_string(),
            initial_pattern: "circle".to_string(),
            point_count: 720,
            max_vertices: 1440,
            control_step: 0.01,
            geometry_parameter: "offset".to_string(),
            instance_parameter: "energy".to_string(),
            pattern_attribute: "pattern".to_string(),
            clear_color: [0.0; 4],
            context: ContextOptions::default(),
            reload_policy: ReloadPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Parses a configuration from JSON and validates it.
    pub fn from_json(json: &str) -> Result<EngineConfig, Error> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the consistency of the configuration.
    pub fn validate(&self) -> Result<(), Error> {
        let rules = &self.uniform_range_rules;
        if let Some((name, _)) = rules.named.iter().find(|(_, range)| !range.is_valid()) {
            return Err(Error::Config(format!("invalid range for uniform {name}")));
        }
        if !rules.default.is_valid() {
            return Err(Error::Config("invalid default uniform range".to_string()));
        }
        if let Some(name) = self.patterns.keys().find(|k| k.to_lowercase() != **k) {
            return Err(Error::Config(format!("pattern tag {name} is not lowercase")));
        }
        if let Some((name, _)) = self
            .patterns
            .iter()
            .find(|(_, spec)| !(spec.domain.is_finite() && spec.domain > 0.0))
        {
            return Err(Error::Config(format!("invalid domain for pattern {name}")));
        }
        if !self.patterns.contains_key(&self.initial_pattern.to_lowercase()) {
            return Err(Error::UnknownPattern {
                kind: self.initial_pattern.clone(),
            });
        }
        if self.max_vertices < 3 {
            return Err(Error::Config("max_vertices must be at least 3".to_string()));
        }
        Ok(())
    }

    /// Looks up a shader in the catalog.
    pub fn shader(&self, key: &str) -> Result<&ProgramPaths, Error> {
        self.shader_catalog
            .get(key)
            .ok_or_else(|| Error::UnknownShader {
                key: key.to_string(),
            })
    }
}
