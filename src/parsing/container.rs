//! Array, tuple and object decoders
//!
//! Each decoder works both on one serialized string (`a,b,c`) and on a list
//! of raw values (one per repeated query key). An empty element decodes to
//! `null`, except a tuple item read by the no-op parser, which stays `""`.
//! A failing element fails the whole container; nothing is partially
//! returned.

use super::value::PrimitiveParser;
use crate::core::MalformedValueError;
use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Value};

pub const DEFAULT_SEPARATOR: &str = ",";

fn parse_element(parser: PrimitiveParser, raw: &str) -> Result<Value, MalformedValueError> {
    if raw.is_empty() {
        Ok(Value::Null)
    } else {
        parser.parse(raw)
    }
}

// =============================================================================
// Array
// =============================================================================

/// Homogeneous array decoder
#[derive(Debug, Clone)]
pub struct ArrayParser {
    items: PrimitiveParser,
    separator: String,
}

impl ArrayParser {
    pub fn new(items: PrimitiveParser) -> Self {
        Self::with_separator(items, DEFAULT_SEPARATOR)
    }

    pub fn with_separator(items: PrimitiveParser, separator: impl Into<String>) -> Self {
        Self {
            items,
            separator: separator.into(),
        }
    }

    pub fn items(&self) -> PrimitiveParser {
        self.items
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Decode `a<sep>b<sep>c`; empty segments are kept as `null`
    pub fn parse(&self, serialized: &str) -> Result<Value, MalformedValueError> {
        serialized
            .split(self.separator.as_str())
            .map(|item| parse_element(self.items, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    /// Decode one item per raw value
    pub fn parse_values(&self, values: &[String]) -> Result<Value, MalformedValueError> {
        values
            .iter()
            .map(|item| parse_element(self.items, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }
}

// =============================================================================
// Tuple
// =============================================================================

/// Positional array decoder
///
/// Index `i < items.len()` uses `items[i]`; later indexes use the additional
/// items parser, or are dropped when there is none.
#[derive(Debug, Clone)]
pub struct TupleParser {
    items: Vec<PrimitiveParser>,
    additional: Option<PrimitiveParser>,
    separator: String,
}

impl TupleParser {
    pub fn new(items: Vec<PrimitiveParser>, additional: Option<PrimitiveParser>) -> Self {
        Self::with_separator(items, additional, DEFAULT_SEPARATOR)
    }

    pub fn with_separator(
        items: Vec<PrimitiveParser>,
        additional: Option<PrimitiveParser>,
        separator: impl Into<String>,
    ) -> Self {
        Self {
            items,
            additional,
            separator: separator.into(),
        }
    }

    pub fn items(&self) -> &[PrimitiveParser] {
        &self.items
    }

    pub fn additional(&self) -> Option<PrimitiveParser> {
        self.additional
    }

    fn parser_at(&self, index: usize) -> Option<PrimitiveParser> {
        self.items.get(index).copied().or(self.additional)
    }

    fn collect<'a>(
        &self,
        raw: impl Iterator<Item = &'a str>,
    ) -> Result<Value, MalformedValueError> {
        let mut result = Vec::new();
        for (index, item) in raw.enumerate() {
            let value = match self.parser_at(index) {
                Some(PrimitiveParser::Noop) => PrimitiveParser::Noop.parse(item)?,
                Some(parser) => parse_element(parser, item)?,
                None => continue,
            };
            result.push(value);
        }
        Ok(Value::Array(result))
    }

    pub fn parse(&self, serialized: &str) -> Result<Value, MalformedValueError> {
        self.collect(serialized.split(self.separator.as_str()))
    }

    pub fn parse_values(&self, values: &[String]) -> Result<Value, MalformedValueError> {
        self.collect(values.iter().map(String::as_str))
    }
}

// =============================================================================
// Object
// =============================================================================

/// Per-field decoders of an object schema
///
/// Resolution order for a key: exact property, then the first pattern (in
/// declaration order) that matches anywhere in the key, then the additional
/// properties parser. Parameters use scalar parsers; form bodies use
/// [`FormValueParser`](super::value::FormValueParser)s.
#[derive(Debug, Clone)]
pub struct FieldParsers<P = PrimitiveParser> {
    properties: IndexMap<String, P>,
    pattern_properties: Vec<(Regex, P)>,
    additional: Option<P>,
}

impl<P> Default for FieldParsers<P> {
    fn default() -> Self {
        Self {
            properties: IndexMap::new(),
            pattern_properties: Vec::new(),
            additional: None,
        }
    }
}

impl<P: Copy> FieldParsers<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn property(mut self, name: impl Into<String>, parser: P) -> Self {
        self.properties.insert(name.into(), parser);
        self
    }

    pub fn pattern_property(mut self, pattern: Regex, parser: P) -> Self {
        self.pattern_properties.push((pattern, parser));
        self
    }

    pub fn additional_properties(mut self, parser: Option<P>) -> Self {
        self.additional = parser;
        self
    }

    pub fn has_additional(&self) -> bool {
        self.additional.is_some()
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Pick the parser for `key`, if any rule claims it
    pub fn resolve(&self, key: &str) -> Option<P> {
        if let Some(parser) = self.properties.get(key) {
            return Some(*parser);
        }
        self.pattern_properties
            .iter()
            .find(|(pattern, _)| pattern.is_match(key))
            .map(|(_, parser)| *parser)
            .or(self.additional)
    }
}

impl FieldParsers<PrimitiveParser> {
    /// Decode the value of `key`, failing when no rule claims it
    pub fn parse_field(&self, key: &str, raw: &str) -> Result<Value, MalformedValueError> {
        let parser = self
            .resolve(key)
            .ok_or_else(|| MalformedValueError::new(format!("Unrecognized key {}", key)))?;
        parse_element(parser, raw)
    }
}

/// Decoder for `k1<sep>v1<sep>k2<sep>v2`
#[derive(Debug, Clone)]
pub struct ObjectParser {
    fields: FieldParsers,
    separator: String,
}

impl ObjectParser {
    pub fn new(fields: FieldParsers) -> Self {
        Self::with_separator(fields, DEFAULT_SEPARATOR)
    }

    pub fn with_separator(fields: FieldParsers, separator: impl Into<String>) -> Self {
        Self {
            fields,
            separator: separator.into(),
        }
    }

    pub fn fields(&self) -> &FieldParsers {
        &self.fields
    }

    pub fn parse(&self, serialized: &str) -> Result<Value, MalformedValueError> {
        let tokens: Vec<&str> = serialized.split(self.separator.as_str()).collect();
        if tokens.len() % 2 != 0 {
            return Err(MalformedValueError::new(
                "Key value pairs must have an even number of serialized values",
            ));
        }
        let mut result = Map::new();
        for pair in tokens.chunks(2) {
            let (key, raw) = (pair[0], pair[1]);
            if key.is_empty() {
                return Err(MalformedValueError::new("Empty key not allowed"));
            }
            let value = self.fields.parse_field(key, raw)?;
            result.insert(key.to_string(), value);
        }
        Ok(Value::Object(result))
    }
}
