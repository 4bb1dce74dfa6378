//! Ordered storage for bound parameter values.

use crate::value::{ToValue, Value};

/// Parameter values in placeholder order.
///
/// Placeholders are positional `?`; the n-th value pushed binds to slot n.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamList {
    params: Vec<Value>,
}

impl ParamList {
    /// Create a new empty parameter list.
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Add a parameter and return its 1-based slot.
    pub fn push(&mut self, value: impl ToValue) -> usize {
        self.push_value(value.to_value())
    }

    /// Add an already converted value and return its 1-based slot.
    pub fn push_value(&mut self, value: Value) -> usize {
        self.params.push(value);
        self.params.len()
    }

    /// Get the current parameter count.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Extend this list with another list's parameters.
    pub fn extend(&mut self, other: &ParamList) {
        self.params.extend(other.params.iter().cloned());
    }

    /// Values paired with their 1-based slot.
    pub fn slots(&self) -> impl Iterator<Item = (usize, &Value)> {
        self.params.iter().enumerate().map(|(i, v)| (i + 1, v))
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.params
    }
}
