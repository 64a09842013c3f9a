//! Parameter locations and the raw, undecoded parameter maps built per location

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a parameter lives in an HTTP request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    /// Processing order used by the validation handler
    pub const ALL: [ParameterLocation; 4] = [
        ParameterLocation::Path,
        ParameterLocation::Cookie,
        ParameterLocation::Query,
        ParameterLocation::Header,
    ];

    /// Upper-case name used in error payloads (`PATH`, `QUERY`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Path => "PATH",
            ParameterLocation::Query => "QUERY",
            ParameterLocation::Header => "HEADER",
            ParameterLocation::Cookie => "COOKIE",
        }
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw string values of one location, keyed by parameter name
///
/// A name may carry several values (repeated query keys, repeated headers).
/// Insertion order is kept so decoders see keys in request order.
/// Parameter parsers remove the keys they claim, so whatever is left after a
/// pass is the set of unclaimed ("additional") entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawParameters {
    entries: IndexMap<String, Vec<String>>,
}

impl RawParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one value under `name`
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries
            .entry(name.into())
            .or_default()
            .push(value.into());
    }

    /// Build from `(name, value)` pairs, grouping repeated names
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut raw = Self::new();
        for (k, v) in pairs {
            raw.insert(k, v);
        }
        raw
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.entries
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Remove and return every value under `name`
    pub fn take(&mut self, name: &str) -> Option<Vec<String>> {
        self.entries.shift_remove(name)
    }

    /// Names currently present, in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawParameters {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::from_pairs(iter)
    }
}
