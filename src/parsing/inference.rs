//! Choosing decoders from a JSON-Schema fragment
//!
//! Only the `type` keyword (and the container keywords `items`,
//! `additionalItems`, `properties`, `patternProperties`,
//! `additionalProperties`) is inspected. Any fragment the rules do not
//! recognise falls back to the no-op parser, leaving the decision to the
//! schema engine.

use super::container::{ArrayParser, FieldParsers, ObjectParser, TupleParser};
use super::value::{FormValueParser, PrimitiveParser, ValueParser};
use crate::core::ConfigError;
use regex::Regex;
use serde_json::Value;

/// The declared `type` of a fragment
///
/// A list of types yields its first entry that is not `"null"`.
pub fn schema_type(schema: &Value) -> Option<&str> {
    match schema.get("type")? {
        Value::String(t) => Some(t.as_str()),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null"),
        _ => None,
    }
}

pub fn infer_primitive(schema: &Value) -> PrimitiveParser {
    match schema_type(schema) {
        Some("integer") => PrimitiveParser::Integer,
        Some("number") => PrimitiveParser::Float,
        Some("boolean") => PrimitiveParser::Boolean,
        _ => PrimitiveParser::Noop,
    }
}

/// Parser of a sub-schema keyword that may also be a boolean
///
/// `true` accepts anything with the no-op parser; `false` or absence mean
/// no parser.
fn infer_optional(fragment: Option<&Value>) -> Option<PrimitiveParser> {
    match fragment? {
        Value::Bool(true) => Some(PrimitiveParser::Noop),
        Value::Bool(false) => None,
        Value::Object(_) => fragment.map(infer_primitive),
        _ => None,
    }
}

pub fn infer_items(schema: &Value) -> Option<PrimitiveParser> {
    match schema.get("items")? {
        items @ Value::Object(_) => Some(infer_primitive(items)),
        _ => None,
    }
}

/// Positional parsers when `items` is a list of schemas
pub fn infer_tuple_items(schema: &Value) -> Option<Vec<PrimitiveParser>> {
    schema
        .get("items")?
        .as_array()
        .map(|items| items.iter().map(infer_primitive).collect())
}

pub fn infer_additional_items(schema: &Value) -> Option<PrimitiveParser> {
    infer_optional(schema.get("additionalItems"))
}

pub fn infer_additional_properties(schema: &Value) -> Option<PrimitiveParser> {
    infer_optional(schema.get("additionalProperties"))
}

fn infer_fields<P: Copy>(
    schema: &Value,
    infer: impl Fn(&Value) -> P,
    additional: Option<P>,
) -> Result<FieldParsers<P>, ConfigError> {
    let mut fields = FieldParsers::new();
    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (name, fragment) in properties {
            fields = fields.property(name.clone(), infer(fragment));
        }
    }
    if let Some(patterns) = schema.get("patternProperties").and_then(Value::as_object) {
        for (pattern, fragment) in patterns {
            let regex = Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            fields = fields.pattern_property(regex, infer(fragment));
        }
    }
    Ok(fields.additional_properties(additional))
}

pub fn infer_field_parsers(schema: &Value) -> Result<FieldParsers, ConfigError> {
    infer_fields(schema, infer_primitive, infer_additional_properties(schema))
}

/// Field decoders of a form body, one [`FormValueParser`] per field
pub fn infer_form_field_parsers(
    schema: &Value,
) -> Result<FieldParsers<FormValueParser>, ConfigError> {
    let additional = match schema.get("additionalProperties") {
        Some(fragment @ Value::Object(_)) => Some(infer_form_value_parser(fragment)),
        _ => None,
    };
    infer_fields(schema, infer_form_value_parser, additional)
}

pub fn is_tuple_schema(schema: &Value) -> bool {
    schema_type(schema) == Some("array") && schema.get("items").is_some_and(Value::is_array)
}

/// Decoder for a whole serialized parameter (`style: form/simple`)
pub fn infer_value_parser(schema: &Value, separator: &str) -> Result<ValueParser, ConfigError> {
    let parser = match schema_type(schema) {
        Some("array") if is_tuple_schema(schema) => TupleParser::with_separator(
            infer_tuple_items(schema).unwrap_or_default(),
            infer_additional_items(schema),
            separator,
        )
        .into(),
        Some("array") => ArrayParser::with_separator(
            infer_items(schema).unwrap_or_default(),
            separator,
        )
        .into(),
        Some("object") => {
            ObjectParser::with_separator(infer_field_parsers(schema)?, separator).into()
        }
        _ => infer_primitive(schema).into(),
    };
    Ok(parser)
}

/// Decoder for one form field of a body object schema
pub fn infer_form_value_parser(schema: &Value) -> FormValueParser {
    if schema_type(schema) == Some("array") {
        FormValueParser::new(true, infer_items(schema).unwrap_or_default())
    } else {
        FormValueParser::new(false, infer_primitive(schema))
    }
}
