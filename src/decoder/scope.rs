//! Variable table used while decoding one area

use std::collections::HashMap;

/// Template variable bindings, keyed by name without braces
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableScope {
    bindings: HashMap<String, String>,
}

impl VariableScope {
    /// Create an empty scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `value`, replacing any previous binding
    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.bindings.insert(name.into(), value.into());
    }

    /// Get the value bound to `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Drop every binding
    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
