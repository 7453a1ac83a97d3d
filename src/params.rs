//! Parameter store.
//!
//! The parameter store holds the current value and the range of every
//! uniform discovered in the loaded program. Values are always kept inside
//! their range.

use crate::render::{UniformDescriptor, UniformRange};

/// Parameter store.
#[derive(Debug, Clone, Default)]
pub struct ParameterStore {
    // Kept in discovery order, which is the order used for the controls.
    entries: Vec<Entry>,
    pattern: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    name: String,
    range: UniformRange,
    value: f32,
}

impl ParameterStore {
    /// Creates an empty parameter store.
    pub fn new() -> ParameterStore {
        ParameterStore::default()
    }

    /// Initializes the store from the descriptors of a newly linked program.
    ///
    /// The range of each descriptor is recorded. Parameters that already
    /// have a value keep it (clamped to the new range), while new
    /// parameters are seeded with their default. Parameters that are not
    /// present in `descriptors` are removed.
    pub fn init_from_uniforms(&mut self, descriptors: &[UniformDescriptor]) {
        let entries = descriptors
            .iter()
            .map(|descriptor| {
                let value = self
                    .find(&descriptor.name)
                    .map(|entry| descriptor.range.clamp(entry.value))
                    .unwrap_or(descriptor.range.default);
                Entry {
                    name: descriptor.name.clone(),
                    range: descriptor.range,
                    value,
                }
            })
            .collect();
        self.entries = entries;
    }

    /// Updates the values of some parameters.
    ///
    /// Each value is clamped to the range of its parameter. Updates for
    /// unknown parameters, as well as non-finite values, are ignored.
    pub fn set<I, S>(&mut self, updates: I)
    where
        I: IntoIterator<Item = (S, f32)>,
        S: AsRef<str>,
    {
        for (name, value) in updates {
            if !value.is_finite() {
                continue;
            }
            if let Some(entry) = self.find_mut(name.as_ref()) {
                entry.value = entry.range.clamp(value);
            }
        }
    }

    /// Returns the value of a parameter.
    pub fn get(&self, name: &str) -> Option<f32> {
        self.find(name).map(|entry| entry.value)
    }

    /// Returns the values of all the parameters.
    pub fn get_all(&self) -> Vec<(String, f32)> {
        self.entries
            .iter()
            .map(|entry| (entry.name.clone(), entry.value))
            .collect()
    }

    /// Returns the range of a parameter.
    pub fn get_range(&self, name: &str) -> Option<UniformRange> {
        self.find(name).map(|entry| entry.range)
    }

    /// Returns the ranges of all the parameters.
    pub fn get_all_ranges(&self) -> Vec<(String, UniformRange)> {
        self.entries
            .iter()
            .map(|entry| (entry.name.clone(), entry.range))
            .collect()
    }

    /// Sets the pattern tag.
    pub fn set_pattern(&mut self, pattern: &str) {
        self.pattern = Some(pattern.to_string());
    }

    /// Returns the pattern tag.
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    /// Resets every parameter to its default and clears the pattern tag.
    pub fn reset(&mut self) {
        for entry in self.entries.iter_mut() {
            entry.value = entry.range.default;
        }
        self.pattern = None;
    }

    /// Returns `true` if the store has a parameter called `name`.
    pub fn has(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Returns the names of all the parameters.
    pub fn parameter_names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    /// Returns the number of parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store has no parameters.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|entry| entry.name == name)
    }
}
