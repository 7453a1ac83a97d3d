//! Pattern geometry.
//!
//! A pattern is a parametric curve in polar form. Its geometry is a sequence
//! of `(radius, phase)` vertices that sample one traversal of the pattern's
//! phase domain. The vertex shader turns these into positions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Error;

/// Fraction of the domain that a unit of offset shifts the phase by.
///
/// With offsets in `[-2, 2]` this gives at most one full domain of shift in
/// each direction.
pub const PHASE_SCALE: f32 = 0.5;

/// Scale applied to every radius so that patterns stay inside clip space.
pub const RADIUS_SCALE: f32 = 0.5;

/// Radius as a function of phase.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RadiusShape {
    /// Constant radius. A radius of 0 collapses the pattern to a point.
    Constant(f32),
    /// Four lobes: `2·cos(φ)·sin(φ)`.
    Lobes,
}

impl RadiusShape {
    /// Evaluates the radius at `phase`.
    pub fn radius(&self, phase: f32) -> f32 {
        match self {
            RadiusShape::Constant(r) => *r,
            RadiusShape::Lobes => 2.0 * phase.cos() * phase.sin(),
        }
    }
}

/// Pattern definition.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct PatternSpec {
    /// Length of the phase domain in radians (`2π` is one revolution).
    pub domain: f32,
    /// Radius function.
    pub radius: RadiusShape,
}

impl PatternSpec {
    /// Creates a pattern definition.
    pub const fn new(domain: f32, radius: RadiusShape) -> PatternSpec {
        PatternSpec { domain, radius }
    }
}

/// Polar vertex of a pattern.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PolarVertex {
    /// Radius.
    pub radius: f32,
    /// Phase in radians.
    pub phase: f32,
}

/// Geometry of a pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternGeometry {
    kind: String,
    vertices: Vec<PolarVertex>,
}

impl PatternGeometry {
    /// Returns the pattern tag this geometry was generated for.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the vertices.
    pub fn vertices(&self) -> &[PolarVertex] {
        &self.vertices
    }

    /// Returns the number of vertices.
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Returns `true` if there are no vertices.
    ///
    /// Generated geometry always has at least 3 vertices.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Returns the vertices as interleaved `radius, phase` floats, in the
    /// layout expected by the vertex buffer.
    pub fn to_interleaved(&self) -> Vec<f32> {
        self.vertices
            .iter()
            .flat_map(|v| [v.radius, v.phase])
            .collect()
    }
}

/// Looks up a pattern by tag.
///
/// Tags are matched case-insensitively.
pub fn lookup<'a>(
    patterns: &'a BTreeMap<String, PatternSpec>,
    kind: &str,
) -> Result<&'a PatternSpec, Error> {
    patterns
        .get(&kind.to_lowercase())
        .ok_or_else(|| Error::UnknownPattern {
            kind: kind.to_string(),
        })
}

/// Generates the geometry of a pattern.
///
/// The number of points is `count` rounded down, with a minimum of 3. The
/// points sample the pattern's domain at evenly spaced phases, shifted by
/// `offset` times [`PHASE_SCALE`] domains.
pub fn generate(
    patterns: &BTreeMap<String, PatternSpec>,
    kind: &str,
    count: f64,
    offset: f32,
) -> Result<PatternGeometry, Error> {
    let spec = lookup(patterns, kind)?;
    // NaN converts to 0
    let num_points = (count.floor() as usize).max(3);
    let phase_offset = offset * spec.domain * PHASE_SCALE;
    let vertices = (0..num_points)
        .map(|j| {
            let phase = (j as f32 / num_points as f32) * spec.domain + phase_offset;
            PolarVertex {
                radius: spec.radius.radius(phase) * RADIUS_SCALE,
                phase,
            }
        })
        .collect();
    Ok(PatternGeometry {
        kind: kind.to_lowercase(),
        vertices,
    })
}
