//! Reference JSON-Schema engine
//!
//! Covers the keywords produced by [`super::SchemaBuilder`] plus the usual
//! combinators and `$ref`. Local references (`#/...`) are followed inline,
//! for validation as well as for `default` lookup.
//! Remote references make the schema asynchronous: the referenced documents
//! are fetched through a [`SchemaResolver`] on first use and cached for every
//! schema compiled by the same [`JsonSchemaParser`].

use super::{Schema, SchemaParser};
use crate::core::{ConfigError, SchemaError};
use async_trait::async_trait;
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

const MAX_DEPTH: usize = 64;

type DocumentCache = Arc<RwLock<HashMap<String, Arc<Value>>>>;

// =============================================================================
// Resolver
// =============================================================================

/// Fetches remote schema documents by URI
#[async_trait]
pub trait SchemaResolver: Send + Sync {
    async fn resolve(&self, uri: &str) -> Result<Value, SchemaError>;
}

/// Resolver serving documents registered up front
#[derive(Debug, Clone, Default)]
pub struct InMemorySchemaResolver {
    documents: HashMap<String, Value>,
}

impl InMemorySchemaResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, uri: impl Into<String>, document: Value) -> Self {
        self.documents.insert(uri.into(), document);
        self
    }
}

#[async_trait]
impl SchemaResolver for InMemorySchemaResolver {
    async fn resolve(&self, uri: &str) -> Result<Value, SchemaError> {
        tokio::task::yield_now().await;
        self.documents.get(uri).cloned().ok_or_else(|| {
            SchemaError::new(format!("Cannot resolve schema document {}", uri)).with_keyword("$ref")
        })
    }
}

// =============================================================================
// Parser
// =============================================================================

/// Compiles fragments into [`JsonSchema`]s sharing one document cache
#[derive(Clone, Default)]
pub struct JsonSchemaParser {
    resolver: Option<Arc<dyn SchemaResolver>>,
    cache: DocumentCache,
}

impl JsonSchemaParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resolver(mut self, resolver: impl SchemaResolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Compile into the concrete engine type
    pub fn compile(&self, schema: &Value) -> Result<JsonSchema, ConfigError> {
        if !schema.is_object() && !schema.is_boolean() {
            return Err(ConfigError::InvalidSchema {
                target: "schema".to_string(),
                message: "a schema must be an object or a boolean".to_string(),
            });
        }
        let mut patterns = HashMap::new();
        compile_patterns(schema, &mut patterns)?;
        let mut remote_refs = Vec::new();
        collect_remote_refs(schema, &mut remote_refs);

        Ok(JsonSchema {
            json: Arc::new(schema.clone()),
            patterns: Arc::new(patterns),
            remote_refs,
            resolver: self.resolver.clone(),
            cache: self.cache.clone(),
        })
    }
}

impl SchemaParser for JsonSchemaParser {
    fn parse(&self, schema: &Value) -> Result<Arc<dyn Schema>, ConfigError> {
        Ok(Arc::new(self.compile(schema)?))
    }
}

fn compile_patterns(
    schema: &Value,
    patterns: &mut HashMap<String, Regex>,
) -> Result<(), ConfigError> {
    let compile = |pattern: &str, patterns: &mut HashMap<String, Regex>| -> Result<(), ConfigError> {
        if patterns.contains_key(pattern) {
            return Ok(());
        }
        let regex = Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        patterns.insert(pattern.to_string(), regex);
        Ok(())
    };
    match schema {
        Value::Object(map) => {
            for (keyword, value) in map {
                match (keyword.as_str(), value) {
                    ("default" | "enum" | "const" | "examples", _) => {}
                    ("pattern", Value::String(pattern)) => compile(pattern, patterns)?,
                    ("multipleOf", Value::Number(factor))
                        if factor.as_f64().is_none_or(|f| f <= 0.0) =>
                    {
                        return Err(ConfigError::InvalidSchema {
                            target: "multipleOf".to_string(),
                            message: format!("multipleOf must be greater than 0, found {}", factor),
                        });
                    }
                    ("patternProperties", Value::Object(entries)) => {
                        for (pattern, sub) in entries {
                            compile(pattern, patterns)?;
                            compile_patterns(sub, patterns)?;
                        }
                    }
                    _ => compile_patterns(value, patterns)?,
                }
            }
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(|i| compile_patterns(i, patterns)),
        _ => Ok(()),
    }
}

/// URIs of the documents referenced by non-local `$ref`s
fn collect_remote_refs(schema: &Value, out: &mut Vec<String>) {
    match schema {
        Value::Object(map) => {
            for (keyword, value) in map {
                match (keyword.as_str(), value) {
                    ("default" | "enum" | "const" | "examples", _) => {}
                    ("$ref", Value::String(reference)) => {
                        let uri = reference.split('#').next().unwrap_or_default();
                        if !uri.is_empty() && !out.iter().any(|u| u == uri) {
                            out.push(uri.to_string());
                        }
                    }
                    _ => collect_remote_refs(value, out),
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|i| collect_remote_refs(i, out)),
        _ => {}
    }
}

// =============================================================================
// Schema
// =============================================================================

pub struct JsonSchema {
    json: Arc<Value>,
    patterns: Arc<HashMap<String, Regex>>,
    remote_refs: Vec<String>,
    resolver: Option<Arc<dyn SchemaResolver>>,
    cache: DocumentCache,
}

impl fmt::Debug for JsonSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchema")
            .field("json", &self.json)
            .field("remote_refs", &self.remote_refs)
            .finish()
    }
}

impl JsonSchema {
    fn run(&self, remote: &HashMap<String, Arc<Value>>, value: &Value) -> Result<(), SchemaError> {
        let validation = Validation {
            remote,
            patterns: &self.patterns,
        };
        validation.validate(&self.json, &self.json, value, "", 0)
    }

    /// Fetch every remote document reachable from this schema
    async fn load_remote(&self) -> Result<HashMap<String, Arc<Value>>, SchemaError> {
        let mut loaded: HashMap<String, Arc<Value>> = HashMap::new();
        let mut pending = self.remote_refs.clone();
        while let Some(uri) = pending.pop() {
            if loaded.contains_key(&uri) {
                continue;
            }
            let cached = self.cache.read().await.get(&uri).cloned();
            let document = match cached {
                Some(document) => document,
                None => {
                    let resolver = self.resolver.as_ref().ok_or_else(|| {
                        SchemaError::new(format!("Cannot resolve remote reference {}", uri))
                            .with_keyword("$ref")
                    })?;
                    let fetched = Arc::new(resolver.resolve(&uri).await?);
                    tracing::debug!(uri = %uri, "fetched remote schema document");
                    self.cache.write().await.insert(uri.clone(), fetched.clone());
                    fetched
                }
            };
            let mut nested = Vec::new();
            collect_remote_refs(&document, &mut nested);
            pending.extend(nested.into_iter().filter(|u| !loaded.contains_key(u)));
            loaded.insert(uri, document);
        }
        Ok(loaded)
    }
}

#[async_trait]
impl Schema for JsonSchema {
    fn json(&self) -> &Value {
        &self.json
    }

    fn is_sync(&self) -> bool {
        self.remote_refs.is_empty()
    }

    fn validate_sync(&self, value: &Value) -> Result<(), SchemaError> {
        self.run(&HashMap::new(), value)
    }

    async fn validate_async(&self, value: &Value) -> Result<(), SchemaError> {
        let remote = self.load_remote().await?;
        self.run(&remote, value)
    }

    fn apply_default_values(&self, value: &mut Value) {
        self.fill_defaults(&HashMap::new(), value);
    }

    async fn apply_default_values_async(&self, value: &mut Value) -> Result<(), SchemaError> {
        let remote = self.load_remote().await?;
        self.fill_defaults(&remote, value);
        Ok(())
    }

    fn default_value(&self) -> Option<Value> {
        self.declared_default(&HashMap::new())
    }

    async fn default_value_async(&self) -> Result<Option<Value>, SchemaError> {
        let remote = self.load_remote().await?;
        Ok(self.declared_default(&remote))
    }
}

impl JsonSchema {
    fn fill_defaults(&self, remote: &HashMap<String, Arc<Value>>, value: &mut Value) {
        let validation = Validation {
            remote,
            patterns: &self.patterns,
        };
        validation.apply_defaults(&self.json, &self.json, value, 0);
    }

    fn declared_default(&self, remote: &HashMap<String, Arc<Value>>) -> Option<Value> {
        let validation = Validation {
            remote,
            patterns: &self.patterns,
        };
        let mut default = validation.find_default(&self.json, &self.json, 0)?.clone();
        validation.apply_defaults(&self.json, &self.json, &mut default, 0);
        Some(default)
    }
}

// =============================================================================
// Keyword validation
// =============================================================================

struct Validation<'a> {
    remote: &'a HashMap<String, Arc<Value>>,
    patterns: &'a HashMap<String, Regex>,
}

fn fail(keyword: &str, path: &str, message: String) -> SchemaError {
    let message = if path.is_empty() {
        message
    } else {
        format!("{} at {}", message, path)
    };
    SchemaError::new(message).with_keyword(keyword).at(path)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match (expected, value) {
        ("null", Value::Null) => true,
        ("boolean", Value::Bool(_)) => true,
        ("number", Value::Number(_)) => true,
        ("integer", Value::Number(n)) => {
            n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        ("string", Value::String(_)) => true,
        ("array", Value::Array(_)) => true,
        ("object", Value::Object(_)) => true,
        _ => false,
    }
}

/// Equality where `1` and `1.0` are the same number
fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| json_eq(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| json_eq(v, other)))
        }
        _ => a == b,
    }
}

fn is_multiple_of(value: &Number, factor: &Number) -> bool {
    if let (Some(v), Some(f)) = (value.as_i64(), factor.as_i64()) {
        return f != 0 && v.wrapping_rem(f) == 0;
    }
    let (v, f) = (
        value.as_f64().unwrap_or(f64::NAN),
        factor.as_f64().unwrap_or(f64::NAN),
    );
    if f == 0.0 || !f.is_finite() {
        return false;
    }
    let quotient = v / f;
    (quotient - quotient.round()).abs() < 1e-9
}

fn child_path(path: &str, segment: impl fmt::Display) -> String {
    format!("{}/{}", path, segment)
}

impl<'a> Validation<'a> {
    fn regex(&self, pattern: &str) -> Result<Regex, SchemaError> {
        match self.patterns.get(pattern) {
            Some(regex) => Ok(regex.clone()),
            None => Regex::new(pattern).map_err(|e| {
                SchemaError::new(format!("Invalid pattern {}: {}", pattern, e))
                    .with_keyword("pattern")
            }),
        }
    }

    /// Find the document and fragment a `$ref` points to
    fn resolve_ref(
        &self,
        document: &'a Value,
        reference: &str,
    ) -> Result<(&'a Value, &'a Value), SchemaError> {
        let (uri, pointer) = reference.split_once('#').unwrap_or((reference, ""));
        let target: &'a Value = if uri.is_empty() {
            document
        } else {
            self.remote.get(uri).map(|d| &**d).ok_or_else(|| {
                SchemaError::new(format!("Unresolved remote reference {}", reference))
                    .with_keyword("$ref")
            })?
        };
        let schema = if pointer.is_empty() {
            target
        } else {
            target.pointer(pointer).ok_or_else(|| {
                SchemaError::new(format!("Reference {} points nowhere", reference))
                    .with_keyword("$ref")
            })?
        };
        Ok((target, schema))
    }

    /// The `default` declared by a schema, its `$ref` target or the first `allOf` member
    fn find_default(
        &self,
        document: &'a Value,
        schema: &'a Value,
        depth: usize,
    ) -> Option<&'a Value> {
        if depth > MAX_DEPTH {
            return None;
        }
        if let Some(default) = schema.get("default") {
            return Some(default);
        }
        if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
            if let Ok((target_document, target)) = self.resolve_ref(document, reference) {
                if let Some(default) = self.find_default(target_document, target, depth + 1) {
                    return Some(default);
                }
            }
        }
        schema
            .get("allOf")
            .and_then(Value::as_array)?
            .iter()
            .find_map(|sub| self.find_default(document, sub, depth + 1))
    }

    fn apply_defaults(
        &self,
        document: &'a Value,
        schema: &'a Value,
        value: &mut Value,
        depth: usize,
    ) {
        if depth > MAX_DEPTH {
            return;
        }
        if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
            if let Ok((target_document, target)) = self.resolve_ref(document, reference) {
                self.apply_defaults(target_document, target, value, depth + 1);
            }
        }
        if let Some(all_of) = schema.get("allOf").and_then(Value::as_array) {
            for sub in all_of {
                self.apply_defaults(document, sub, value, depth + 1);
            }
        }
        match value {
            Value::Object(map) => {
                let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
                    return;
                };
                for (name, property) in properties {
                    if !map.contains_key(name) {
                        if let Some(default) = self.find_default(document, property, depth + 1) {
                            map.insert(name.clone(), default.clone());
                        }
                    }
                    if let Some(child) = map.get_mut(name) {
                        self.apply_defaults(document, property, child, depth + 1);
                    }
                }
            }
            Value::Array(items) => match schema.get("items") {
                Some(item_schema @ Value::Object(_)) => {
                    for item in items.iter_mut() {
                        self.apply_defaults(document, item_schema, item, depth + 1);
                    }
                }
                Some(Value::Array(positional)) => {
                    for (item, item_schema) in items.iter_mut().zip(positional) {
                        self.apply_defaults(document, item_schema, item, depth + 1);
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }

    fn validate(
        &self,
        document: &'a Value,
        schema: &'a Value,
        value: &Value,
        path: &str,
        depth: usize,
    ) -> Result<(), SchemaError> {
        if depth > MAX_DEPTH {
            return Err(fail("$ref", path, "Schema nesting is too deep".to_string()));
        }
        let keywords: &'a Map<String, Value> = match schema {
            Value::Bool(true) => return Ok(()),
            Value::Bool(false) => {
                return Err(fail("false", path, "No value is allowed".to_string()));
            }
            Value::Object(map) => map,
            _ => return Ok(()),
        };

        if let Some(reference) = keywords.get("$ref").and_then(Value::as_str) {
            let (target_document, target) = self.resolve_ref(document, reference)?;
            self.validate(target_document, target, value, path, depth + 1)?;
        }

        self.validate_generic(document, keywords, value, path, depth)?;

        match value {
            Value::Number(n) => self.validate_number(keywords, n, path),
            Value::String(s) => self.validate_string(keywords, s, path),
            Value::Array(items) => self.validate_array(document, keywords, items, path, depth),
            Value::Object(map) => self.validate_object(document, keywords, map, path, depth),
            _ => Ok(()),
        }
    }

    fn validate_generic(
        &self,
        document: &'a Value,
        keywords: &'a Map<String, Value>,
        value: &Value,
        path: &str,
        depth: usize,
    ) -> Result<(), SchemaError> {
        if let Some(expected) = keywords.get("type") {
            let matched = match expected {
                Value::String(t) => type_matches(t, value),
                Value::Array(types) => types
                    .iter()
                    .filter_map(Value::as_str)
                    .any(|t| type_matches(t, value)),
                _ => true,
            };
            if !matched {
                return Err(fail(
                    "type",
                    path,
                    format!("Expected type {}, found {}", expected, type_name(value)),
                ));
            }
        }

        if let Some(allowed) = keywords.get("enum").and_then(Value::as_array) {
            if !allowed.iter().any(|a| json_eq(a, value)) {
                return Err(fail(
                    "enum",
                    path,
                    format!("Value {} is not one of {}", value, Value::Array(allowed.clone())),
                ));
            }
        }

        if let Some(expected) = keywords.get("const") {
            if !json_eq(expected, value) {
                return Err(fail("const", path, format!("Value must be {}", expected)));
            }
        }

        if let Some(all_of) = keywords.get("allOf").and_then(Value::as_array) {
            for sub in all_of {
                self.validate(document, sub, value, path, depth + 1)?;
            }
        }

        if let Some(any_of) = keywords.get("anyOf").and_then(Value::as_array) {
            let matched = any_of
                .iter()
                .any(|sub| self.validate(document, sub, value, path, depth + 1).is_ok());
            if !matched {
                return Err(fail(
                    "anyOf",
                    path,
                    "Value does not match any of the allowed schemas".to_string(),
                ));
            }
        }

        if let Some(one_of) = keywords.get("oneOf").and_then(Value::as_array) {
            let matches = one_of
                .iter()
                .filter(|sub| self.validate(document, sub, value, path, depth + 1).is_ok())
                .count();
            if matches != 1 {
                return Err(fail(
                    "oneOf",
                    path,
                    format!("Value must match exactly one schema, matched {}", matches),
                ));
            }
        }

        if let Some(not) = keywords.get("not") {
            if self.validate(document, not, value, path, depth + 1).is_ok() {
                return Err(fail(
                    "not",
                    path,
                    "Value matches a forbidden schema".to_string(),
                ));
            }
        }

        Ok(())
    }

    fn validate_number(
        &self,
        keywords: &Map<String, Value>,
        number: &Number,
        path: &str,
    ) -> Result<(), SchemaError> {
        let value = number.as_f64().unwrap_or(f64::NAN);

        if let Some(Value::Number(factor)) = keywords.get("multipleOf") {
            if !is_multiple_of(number, factor) {
                return Err(fail(
                    "multipleOf",
                    path,
                    format!("Value {} is not a multiple of {}", number, factor),
                ));
            }
        }

        // Draft 4 spells exclusivity as a boolean next to minimum/maximum
        let exclusive_flag = |key: &str| keywords.get(key).and_then(Value::as_bool) == Some(true);

        if let Some(minimum) = keywords.get("minimum").and_then(Value::as_f64) {
            if exclusive_flag("exclusiveMinimum") {
                if value <= minimum {
                    return Err(fail(
                        "exclusiveMinimum",
                        path,
                        format!("Value {} must be greater than {}", number, minimum),
                    ));
                }
            } else if value < minimum {
                return Err(fail(
                    "minimum",
                    path,
                    format!("Value {} is lower than minimum {}", number, minimum),
                ));
            }
        }

        if let Some(maximum) = keywords.get("maximum").and_then(Value::as_f64) {
            if exclusive_flag("exclusiveMaximum") {
                if value >= maximum {
                    return Err(fail(
                        "exclusiveMaximum",
                        path,
                        format!("Value {} must be lower than {}", number, maximum),
                    ));
                }
            } else if value > maximum {
                return Err(fail(
                    "maximum",
                    path,
                    format!("Value {} is greater than maximum {}", number, maximum),
                ));
            }
        }

        if let Some(bound) = keywords.get("exclusiveMinimum").and_then(Value::as_f64) {
            if value <= bound {
                return Err(fail(
                    "exclusiveMinimum",
                    path,
                    format!("Value {} must be greater than {}", number, bound),
                ));
            }
        }

        if let Some(bound) = keywords.get("exclusiveMaximum").and_then(Value::as_f64) {
            if value >= bound {
                return Err(fail(
                    "exclusiveMaximum",
                    path,
                    format!("Value {} must be lower than {}", number, bound),
                ));
            }
        }

        Ok(())
    }

    fn validate_string(
        &self,
        keywords: &Map<String, Value>,
        string: &str,
        path: &str,
    ) -> Result<(), SchemaError> {
        let length = string.chars().count() as u64;

        if let Some(min) = keywords.get("minLength").and_then(Value::as_u64) {
            if length < min {
                return Err(fail(
                    "minLength",
                    path,
                    format!("String is shorter than {} characters", min),
                ));
            }
        }

        if let Some(max) = keywords.get("maxLength").and_then(Value::as_u64) {
            if length > max {
                return Err(fail(
                    "maxLength",
                    path,
                    format!("String is longer than {} characters", max),
                ));
            }
        }

        if let Some(pattern) = keywords.get("pattern").and_then(Value::as_str) {
            if !self.regex(pattern)?.is_match(string) {
                return Err(fail(
                    "pattern",
                    path,
                    format!("String does not match pattern {}", pattern),
                ));
            }
        }

        Ok(())
    }

    fn validate_array(
        &self,
        document: &'a Value,
        keywords: &'a Map<String, Value>,
        items: &[Value],
        path: &str,
        depth: usize,
    ) -> Result<(), SchemaError> {
        let count = items.len() as u64;

        if let Some(min) = keywords.get("minItems").and_then(Value::as_u64) {
            if count < min {
                return Err(fail(
                    "minItems",
                    path,
                    format!("Array has fewer than {} items", min),
                ));
            }
        }

        if let Some(max) = keywords.get("maxItems").and_then(Value::as_u64) {
            if count > max {
                return Err(fail(
                    "maxItems",
                    path,
                    format!("Array has more than {} items", max),
                ));
            }
        }

        if keywords.get("uniqueItems").and_then(Value::as_bool) == Some(true) {
            for (i, item) in items.iter().enumerate() {
                if items[..i].iter().any(|other| json_eq(other, item)) {
                    return Err(fail(
                        "uniqueItems",
                        path,
                        "Array items are not unique".to_string(),
                    ));
                }
            }
        }

        match keywords.get("items") {
            Some(Value::Array(positional)) => {
                for (i, item) in items.iter().enumerate() {
                    let item_path = child_path(path, i);
                    match positional.get(i) {
                        Some(item_schema) => {
                            self.validate(document, item_schema, item, &item_path, depth + 1)?
                        }
                        None => {
                            if let Some(additional) = keywords.get("additionalItems") {
                                self.validate(document, additional, item, &item_path, depth + 1)?;
                            }
                        }
                    }
                }
            }
            Some(item_schema) => {
                for (i, item) in items.iter().enumerate() {
                    self.validate(document, item_schema, item, &child_path(path, i), depth + 1)?;
                }
            }
            None => {}
        }

        Ok(())
    }

    fn validate_object(
        &self,
        document: &'a Value,
        keywords: &'a Map<String, Value>,
        object: &Map<String, Value>,
        path: &str,
        depth: usize,
    ) -> Result<(), SchemaError> {
        let count = object.len() as u64;

        if let Some(min) = keywords.get("minProperties").and_then(Value::as_u64) {
            if count < min {
                return Err(fail(
                    "minProperties",
                    path,
                    format!("Object has fewer than {} properties", min),
                ));
            }
        }

        if let Some(max) = keywords.get("maxProperties").and_then(Value::as_u64) {
            if count > max {
                return Err(fail(
                    "maxProperties",
                    path,
                    format!("Object has more than {} properties", max),
                ));
            }
        }

        if let Some(required) = keywords.get("required").and_then(Value::as_array) {
            for name in required.iter().filter_map(Value::as_str) {
                if !object.contains_key(name) {
                    return Err(fail(
                        "required",
                        path,
                        format!("Missing required property {}", name),
                    ));
                }
            }
        }

        let properties = keywords.get("properties").and_then(Value::as_object);
        let pattern_properties = keywords.get("patternProperties").and_then(Value::as_object);
        let additional = keywords.get("additionalProperties");

        for (key, value) in object {
            let key_path = child_path(path, key);
            let mut matched = false;

            if let Some(property) = properties.and_then(|p| p.get(key)) {
                matched = true;
                self.validate(document, property, value, &key_path, depth + 1)?;
            }

            if let Some(patterns) = pattern_properties {
                for (pattern, sub) in patterns {
                    if self.regex(pattern)?.is_match(key) {
                        matched = true;
                        self.validate(document, sub, value, &key_path, depth + 1)?;
                    }
                }
            }

            if !matched {
                match additional {
                    Some(Value::Bool(false)) => {
                        return Err(fail(
                            "additionalProperties",
                            path,
                            format!("Property {} is not allowed", key),
                        ));
                    }
                    Some(sub @ Value::Object(_)) => {
                        self.validate(document, sub, value, &key_path, depth + 1)?;
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile(schema: Value) -> JsonSchema {
        JsonSchemaParser::new().compile(&schema).unwrap()
    }

    #[test]
    fn test_type_and_multiple_of() {
        let schema = compile(json!({"type": "integer", "multipleOf": 2}));
        assert!(schema.is_sync());
        assert!(schema.validate_sync(&json!(4)).is_ok());
        let err = schema.validate_sync(&json!(3)).unwrap_err();
        assert_eq!(err.keyword(), Some("multipleOf"));
        assert_eq!(schema.validate_sync(&json!("4")).unwrap_err().keyword(), Some("type"));
    }

    #[test]
    fn test_integer_accepts_integral_floats() {
        let schema = compile(json!({"type": "integer"}));
        assert!(schema.validate_sync(&json!(2.0)).is_ok());
        assert!(schema.validate_sync(&json!(2.5)).is_err());
    }

    #[test]
    fn test_bounds() {
        let schema = compile(json!({"type": "number", "minimum": 1, "exclusiveMaximum": 10}));
        assert!(schema.validate_sync(&json!(1)).is_ok());
        assert!(schema.validate_sync(&json!(0.5)).is_err());
        assert!(schema.validate_sync(&json!(10)).is_err());

        let draft4 = compile(json!({"minimum": 1, "exclusiveMinimum": true}));
        assert!(draft4.validate_sync(&json!(1)).is_err());
        assert!(draft4.validate_sync(&json!(2)).is_ok());
    }

    #[test]
    fn test_string_keywords() {
        let schema = compile(json!({"type": "string", "minLength": 2, "maxLength": 4, "pattern": "^a"}));
        assert!(schema.validate_sync(&json!("abc")).is_ok());
        assert!(schema.validate_sync(&json!("a")).is_err());
        assert!(schema.validate_sync(&json!("abcde")).is_err());
        assert_eq!(schema.validate_sync(&json!("bcd")).unwrap_err().keyword(), Some("pattern"));
    }

    #[test]
    fn test_object_keywords_and_path() {
        let schema = compile(json!({
            "type": "object",
            "required": ["id"],
            "properties": {"id": {"type": "integer"}},
            "patternProperties": {"^x-": {"type": "string"}},
            "additionalProperties": false
        }));
        assert!(schema.validate_sync(&json!({"id": 1, "x-tag": "t"})).is_ok());
        assert_eq!(schema.validate_sync(&json!({})).unwrap_err().keyword(), Some("required"));
        assert!(schema.validate_sync(&json!({"id": 1, "other": 2})).is_err());

        let err = schema.validate_sync(&json!({"id": "one"})).unwrap_err();
        assert_eq!(err.instance_path(), "/id");
        assert!(err.message().ends_with("at /id"));
    }

    #[test]
    fn test_array_keywords() {
        let schema = compile(json!({
            "type": "array",
            "items": [{"type": "integer"}, {"type": "boolean"}],
            "additionalItems": {"type": "string"},
            "maxItems": 3,
            "uniqueItems": true
        }));
        assert!(schema.validate_sync(&json!([1, true, "x"])).is_ok());
        assert!(schema.validate_sync(&json!([1, true, 3])).is_err());
        assert!(schema.validate_sync(&json!([1, true, "x", "y"])).is_err());

        let unique = compile(json!({"uniqueItems": true}));
        assert!(unique.validate_sync(&json!([1, 1.0])).is_err());
    }

    #[test]
    fn test_combinators() {
        let schema = compile(json!({"oneOf": [{"type": "integer"}, {"type": "number"}]}));
        assert!(schema.validate_sync(&json!(1.5)).is_ok());
        assert_eq!(schema.validate_sync(&json!(1)).unwrap_err().keyword(), Some("oneOf"));

        let schema = compile(json!({"anyOf": [{"type": "string"}, {"type": "null"}], "not": {"const": "x"}}));
        assert!(schema.validate_sync(&Value::Null).is_ok());
        assert!(schema.validate_sync(&json!("x")).is_err());
        assert!(schema.validate_sync(&json!(1)).is_err());
    }

    #[test]
    fn test_local_ref() {
        let schema = compile(json!({
            "definitions": {"id": {"type": "integer", "minimum": 1}},
            "type": "object",
            "properties": {"id": {"$ref": "#/definitions/id"}}
        }));
        assert!(schema.is_sync());
        assert!(schema.validate_sync(&json!({"id": 3})).is_ok());
        assert!(schema.validate_sync(&json!({"id": 0})).is_err());
    }

    #[test]
    fn test_defaults_applied_recursively() {
        let schema = compile(json!({
            "type": "object",
            "properties": {
                "limit": {"type": "integer", "default": 10},
                "sort": {
                    "type": "object",
                    "default": {},
                    "properties": {"order": {"type": "string", "default": "asc"}}
                }
            }
        }));
        let mut value = json!({});
        schema.apply_default_values(&mut value);
        assert_eq!(value, json!({"limit": 10, "sort": {"order": "asc"}}));

        let mut value = json!({"limit": 3});
        schema.apply_default_values(&mut value);
        assert_eq!(value["limit"], json!(3));
    }

    #[test]
    fn test_multiple_of_extremes() {
        assert!(is_multiple_of(&Number::from(i64::MIN), &Number::from(-1)));
        assert!(is_multiple_of(&Number::from(i64::MIN), &Number::from(2)));
        assert!(!is_multiple_of(&Number::from(7), &Number::from(0)));

        let schema = compile(json!({"type": "integer", "multipleOf": 3}));
        assert!(schema.validate_sync(&json!(i64::MIN)).is_err());
        assert!(schema.validate_sync(&json!(i64::MAX - 1)).is_ok());
    }

    #[test]
    fn test_non_positive_multiple_of_rejected_at_compile() {
        for factor in [json!(-1), json!(0), json!(-0.5)] {
            let result = JsonSchemaParser::new().compile(&json!({"multipleOf": factor}));
            assert!(matches!(result, Err(ConfigError::InvalidSchema { .. })));
        }
    }

    #[test]
    fn test_defaults_follow_local_refs() {
        let schema = compile(json!({
            "definitions": {
                "limit": {"type": "integer", "default": 5},
                "page": {"properties": {"limit": {"$ref": "#/definitions/limit"}}}
            },
            "allOf": [{"$ref": "#/definitions/page"}]
        }));
        let mut value = json!({});
        schema.apply_default_values(&mut value);
        assert_eq!(value, json!({"limit": 5}));

        let schema = compile(json!({
            "definitions": {"limit": {"type": "integer", "default": 5}},
            "allOf": [{"minimum": 1}, {"$ref": "#/definitions/limit"}, {"default": 9}]
        }));
        assert_eq!(schema.default_value(), Some(json!(5)));
        assert_eq!(compile(json!({"type": "integer"})).default_value(), None);
    }

    #[tokio::test]
    async fn test_remote_defaults_resolve_pointers_in_remote_document() {
        let resolver = InMemorySchemaResolver::new().with_document(
            "https://schemas.example.com/page.json",
            json!({
                "definitions": {"size": {"type": "integer", "default": 20}},
                "properties": {"limit": {"$ref": "#/definitions/size"}}
            }),
        );
        let parser = JsonSchemaParser::new().with_resolver(resolver);
        let schema = parser
            .compile(&json!({"$ref": "https://schemas.example.com/page.json"}))
            .unwrap();
        let mut value = json!({});
        schema.apply_default_values_async(&mut value).await.unwrap();
        assert_eq!(value, json!({"limit": 20}));

        let limit = parser
            .compile(&json!({"$ref": "https://schemas.example.com/page.json#/definitions/size"}))
            .unwrap();
        assert_eq!(limit.default_value_async().await.unwrap(), Some(json!(20)));
    }

    #[test]
    fn test_invalid_pattern_rejected_at_compile() {
        let result = JsonSchemaParser::new().compile(&json!({"pattern": "("}));
        assert!(matches!(result, Err(ConfigError::InvalidPattern { .. })));
        assert!(JsonSchemaParser::new().compile(&json!(3)).is_err());
    }

    #[tokio::test]
    async fn test_remote_ref_is_async_and_cached() {
        let resolver = InMemorySchemaResolver::new().with_document(
            "https://schemas.example.com/pet.json",
            json!({"definitions": {"name": {"type": "string", "minLength": 1}}}),
        );
        let parser = JsonSchemaParser::new().with_resolver(resolver);
        let schema = parser
            .compile(&json!({"$ref": "https://schemas.example.com/pet.json#/definitions/name"}))
            .unwrap();
        assert!(!schema.is_sync());
        assert!(schema.validate_async(&json!("rex")).await.is_ok());
        assert!(schema.validate_async(&json!("")).await.is_err());
        assert!(parser.cache.read().await.contains_key("https://schemas.example.com/pet.json"));
    }

    #[tokio::test]
    async fn test_remote_ref_without_resolver_fails() {
        let schema = compile(json!({"$ref": "https://nowhere.example.com/x.json"}));
        let err = schema.validate_async(&json!(1)).await.unwrap_err();
        assert_eq!(err.keyword(), Some("$ref"));
    }
}
