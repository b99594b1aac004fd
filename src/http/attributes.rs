//! String-keyed request attributes.
//!
//! Path captures and query-string parameters land in a single namespace on
//! the request. Values are stored as strings with typed accessors.

use std::collections::HashMap;

/// Attribute map attached to a request by route dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    values: HashMap<String, String>,
}

impl Attributes {
    /// Create an empty attribute map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `key=value` list separated by `sep` (query-string syntax).
    ///
    /// Entries without a `=` are ignored. Later entries overwrite earlier
    /// ones with the same key.
    #[must_use]
    pub fn from_pairs(raw: &str, sep: char) -> Self {
        let mut attrs = Self::new();
        for piece in raw.split(sep) {
            if let Some((key, value)) = piece.split_once('=') {
                if !key.is_empty() {
                    attrs.insert(key, value);
                }
            }
        }
        attrs
    }

    /// Insert an attribute, overwriting an existing one with the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Merge `other` into `self`; entries of `other` win on collision.
    pub fn merge(&mut self, other: Attributes) {
        self.values.extend(other.values);
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the map holds no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether an attribute with `key` is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// The raw string value, or `""` when absent.
    #[must_use]
    pub fn get_str(&self, key: &str) -> &str {
        self.values.get(key).map_or("", String::as_str)
    }

    /// The value parsed as an integer, or `default` when absent or unparsable.
    #[must_use]
    pub fn get_i64(&self, key: &str, default: i64) -> i64 {
        self.values
            .get(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// The value parsed as a float, or `default` when absent or unparsable.
    #[must_use]
    pub fn get_f64(&self, key: &str, default: f64) -> f64 {
        self.values
            .get(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// The value interpreted as a boolean.
    ///
    /// `"1"`, `"true"` and `"yes"` are true; anything else present is false;
    /// absent yields `default`.
    #[must_use]
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.values
            .get(key)
            .map_or(default, |v| matches!(v.as_str(), "1" | "true" | "yes"))
    }
}
