//! Declarations of parameters and bodies
//!
//! The same [`ParameterSpec`] and [`BodySpec`] types are produced by the
//! factory functions below and deserialized from YAML configuration.
//!
//! ```rust
//! use request_validator::schema::{array_schema, int_schema};
//! use request_validator::validation::dsl::{exploded_param, optional_param, param};
//!
//! let pet_id = param("petId", int_schema());
//! let ids = exploded_param("id", array_schema().items(int_schema().multiple_of(2)));
//! let limit = optional_param("limit", int_schema().default_value(20));
//! assert!(pet_id.required && ids.required && !limit.required);
//! ```

use super::body::{BodyProcessor, FormKind, is_json_media_type};
use super::processor::ParameterProcessor;
use super::validator::SchemaValidator;
use crate::core::{ConfigError, ParameterLocation};
use crate::parsing::inference::{
    infer_field_parsers, infer_form_field_parsers, infer_items, infer_primitive,
    infer_tuple_items, infer_additional_items, infer_value_parser, is_tuple_schema, schema_type,
};
use crate::parsing::{ArrayParser, DEFAULT_SEPARATOR, ParameterParser, PrimitiveParser, TupleParser};
use crate::schema::{SchemaBuilder, SchemaParser};
use crate::server::context::{FORM_URL_ENCODED, MULTIPART_FORM_DATA, media_type};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// How a parameter value is laid out in the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Style {
    /// One raw value holding the whole serialized value (`1,2,3`)
    #[default]
    #[serde(alias = "form", alias = "simple")]
    Serialized,
    /// One raw key per item or field (`?id=1&id=2`)
    Exploded,
    /// `name[field]=value` keys
    DeepObject,
    /// One raw value holding a JSON document
    Json,
}

/// A declared parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,

    /// Set by the handler builder when registered through a location method
    #[serde(rename = "in", default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ParameterLocation>,

    #[serde(default)]
    pub style: Style,

    /// Separator of serialized containers, `,` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,

    #[serde(default)]
    pub required: bool,

    #[serde(default = "any_value")]
    pub schema: Value,
}

fn any_value() -> Value {
    Value::Object(Default::default())
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, style: Style, required: bool, schema: SchemaBuilder) -> Self {
        Self {
            name: name.into(),
            location: None,
            style,
            separator: None,
            required,
            schema: schema.build(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn in_location(mut self, location: ParameterLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    fn invalid(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::InvalidParameter {
            parameter: self.name.clone(),
            message: message.into(),
        }
    }

    /// Pick the parser for this declaration
    ///
    /// `lookup_name` is the raw key to read, which differs from the declared
    /// name for case-insensitive headers.
    pub fn parameter_parser(&self, lookup_name: &str) -> Result<ParameterParser, ConfigError> {
        let name = lookup_name.to_string();
        let separator = self.separator.as_deref().unwrap_or(DEFAULT_SEPARATOR);
        if separator.is_empty() {
            return Err(self.invalid("separator cannot be empty"));
        }
        let schema = &self.schema;

        let parser = match self.style {
            Style::Json => ParameterParser::Single {
                name,
                parser: PrimitiveParser::Json.into(),
            },
            Style::Serialized => ParameterParser::Single {
                name,
                parser: infer_value_parser(schema, separator)?,
            },
            Style::Exploded => match schema_type(schema) {
                Some("array") if is_tuple_schema(schema) => ParameterParser::ExplodedTuple {
                    name,
                    parser: TupleParser::new(
                        infer_tuple_items(schema).unwrap_or_default(),
                        infer_additional_items(schema),
                    ),
                },
                Some("array") => ParameterParser::ExplodedArray {
                    name,
                    parser: ArrayParser::new(infer_items(schema).unwrap_or_default()),
                },
                Some("object") => ParameterParser::ExplodedObject {
                    name,
                    fields: infer_field_parsers(schema)?,
                },
                _ => ParameterParser::Single {
                    name,
                    parser: infer_primitive(schema).into(),
                },
            },
            Style::DeepObject => {
                if schema_type(schema) != Some("object") {
                    return Err(self.invalid("deepObject style requires an object schema"));
                }
                ParameterParser::DeepObject {
                    name,
                    fields: infer_field_parsers(schema)?,
                }
            }
        };
        Ok(parser)
    }

    /// Compile into a processor for `location`
    pub fn into_processor(
        self,
        location: ParameterLocation,
        schema_parser: &dyn SchemaParser,
    ) -> Result<ParameterProcessor, ConfigError> {
        let lookup_name = match location {
            ParameterLocation::Header => self.name.to_ascii_lowercase(),
            _ => self.name.clone(),
        };
        let parser = self.parameter_parser(&lookup_name)?;
        let schema = schema_parser
            .parse(&self.schema)
            .map_err(|e| match e {
                ConfigError::InvalidSchema { message, .. } => self.invalid(message),
                other => other,
            })?;
        Ok(ParameterProcessor::new(
            self.name,
            location,
            !self.required,
            parser,
            Arc::new(SchemaValidator::new(schema)),
        ))
    }
}

/// A declared body for one content type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodySpec {
    pub content_type: String,
    #[serde(default = "any_value")]
    pub schema: Value,
}

impl BodySpec {
    pub fn new(content_type: impl Into<String>, schema: SchemaBuilder) -> Self {
        Self {
            content_type: content_type.into(),
            schema: schema.build(),
        }
    }

    pub fn into_processor(
        self,
        schema_parser: &dyn SchemaParser,
    ) -> Result<BodyProcessor, ConfigError> {
        let media = media_type(&self.content_type);
        let validator = Arc::new(SchemaValidator::new(schema_parser.parse(&self.schema)?));
        let form = |kind: FormKind| -> Result<BodyProcessor, ConfigError> {
            Ok(BodyProcessor::Form {
                kind,
                fields: infer_form_field_parsers(&self.schema)?,
                validator: validator.clone(),
            })
        };
        match media.as_str() {
            m if is_json_media_type(m) => Ok(BodyProcessor::Json {
                validator: validator.clone(),
            }),
            m if m.starts_with("text/plain") => Ok(BodyProcessor::TextPlain {
                validator: validator.clone(),
            }),
            FORM_URL_ENCODED => form(FormKind::UrlEncoded),
            MULTIPART_FORM_DATA => form(FormKind::Multipart),
            _ => Err(ConfigError::UnsupportedContentType {
                content_type: self.content_type.clone(),
            }),
        }
    }
}

// =============================================================================
// Parameter factories
// =============================================================================

/// Required parameter holding its whole value (`?ids=1,2,3`)
pub fn param(name: impl Into<String>, schema: SchemaBuilder) -> ParameterSpec {
    ParameterSpec::new(name, Style::Serialized, true, schema)
}

pub fn optional_param(name: impl Into<String>, schema: SchemaBuilder) -> ParameterSpec {
    ParameterSpec::new(name, Style::Serialized, false, schema)
}

/// Required parameter whose raw value is a JSON document
pub fn json_param(name: impl Into<String>, schema: SchemaBuilder) -> ParameterSpec {
    ParameterSpec::new(name, Style::Json, true, schema)
}

pub fn json_param_optional(name: impl Into<String>, schema: SchemaBuilder) -> ParameterSpec {
    ParameterSpec::new(name, Style::Json, false, schema)
}

/// Required serialized parameter with a custom separator (`?ids=1|2|3`)
pub fn serialized_param(
    name: impl Into<String>,
    separator: impl Into<String>,
    schema: SchemaBuilder,
) -> ParameterSpec {
    ParameterSpec::new(name, Style::Serialized, true, schema).with_separator(separator)
}

pub fn exploded_param(name: impl Into<String>, schema: SchemaBuilder) -> ParameterSpec {
    ParameterSpec::new(name, Style::Exploded, true, schema)
}

pub fn exploded_param_optional(name: impl Into<String>, schema: SchemaBuilder) -> ParameterSpec {
    ParameterSpec::new(name, Style::Exploded, false, schema)
}

pub fn deep_object_param(name: impl Into<String>, schema: SchemaBuilder) -> ParameterSpec {
    ParameterSpec::new(name, Style::DeepObject, true, schema)
}

pub fn deep_object_param_optional(name: impl Into<String>, schema: SchemaBuilder) -> ParameterSpec {
    ParameterSpec::new(name, Style::DeepObject, false, schema)
}

// =============================================================================
// Body factories
// =============================================================================

pub fn json_body(schema: SchemaBuilder) -> BodySpec {
    BodySpec::new("application/json", schema)
}

pub fn text_plain_body(schema: SchemaBuilder) -> BodySpec {
    BodySpec::new("text/plain", schema)
}

pub fn form_url_encoded_body(schema: SchemaBuilder) -> BodySpec {
    BodySpec::new(FORM_URL_ENCODED, schema)
}

pub fn multipart_form_data_body(schema: SchemaBuilder) -> BodySpec {
    BodySpec::new(MULTIPART_FORM_DATA, schema)
}
