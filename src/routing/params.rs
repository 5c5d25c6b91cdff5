//! Path parameters extracted by a matched route.

use std::collections::HashMap;

/// Mapping from parameter name to the raw path text it captured.
///
/// Spread parameters hold the remaining segments joined with `/`.
/// Optional parameters that matched nothing are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamBindings {
    values: HashMap<String, String>,
}

impl ParamBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a parameter value by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(name, value)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub(crate) fn remove(&mut self, name: &str) {
        self.values.remove(name);
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for ParamBindings {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut bindings = Self::new();
        for (name, value) in iter {
            bindings.insert(name, value);
        }
        bindings
    }
}
