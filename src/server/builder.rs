//! ValidationHandlerBuilder for fluent construction of validation handlers

use super::handler::ValidationHandler;
use crate::config::HandlerConfig;
use crate::core::{ConfigError, ParameterLocation};
use crate::schema::{JsonSchemaParser, SchemaParser};
use crate::validation::{
    BodyProcessor, BodySpec, ParameterProcessor, ParameterSpec, RequestPredicate,
};
use std::sync::Arc;

/// Builder for [`ValidationHandler`]s
///
/// # Example
///
/// ```rust
/// use request_validator::prelude::*;
///
/// let handler = ValidationHandlerBuilder::new()
///     .path_parameter(param("petId", int_schema()))?
///     .query_parameter(optional_param("limit", int_schema().default_value(20)))?
///     .body(json_body(object_schema()))?
///     .build();
/// # Ok::<(), ConfigError>(())
/// ```
pub struct ValidationHandlerBuilder {
    schema_parser: Arc<dyn SchemaParser>,
    predicates: Vec<RequestPredicate>,
    processors: Vec<ParameterProcessor>,
    body_processors: Vec<BodyProcessor>,
    body_required: bool,
    max_body_size: Option<usize>,
}

impl Default for ValidationHandlerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationHandlerBuilder {
    /// Create a builder compiling schemas with the bundled engine
    pub fn new() -> Self {
        Self {
            schema_parser: Arc::new(JsonSchemaParser::new()),
            predicates: Vec::new(),
            processors: Vec::new(),
            body_processors: Vec::new(),
            body_required: false,
            max_body_size: None,
        }
    }

    /// Compile the schemas of subsequently declared parameters and bodies
    /// with another engine
    pub fn with_schema_parser(mut self, parser: impl SchemaParser + 'static) -> Self {
        self.schema_parser = Arc::new(parser);
        self
    }

    fn declare(
        mut self,
        location: ParameterLocation,
        spec: ParameterSpec,
    ) -> Result<Self, ConfigError> {
        let processor = spec.into_processor(location, self.schema_parser.as_ref())?;
        self.processors.push(processor);
        Ok(self)
    }

    pub fn path_parameter(self, spec: ParameterSpec) -> Result<Self, ConfigError> {
        self.declare(ParameterLocation::Path, spec)
    }

    pub fn query_parameter(self, spec: ParameterSpec) -> Result<Self, ConfigError> {
        self.declare(ParameterLocation::Query, spec)
    }

    pub fn header_parameter(self, spec: ParameterSpec) -> Result<Self, ConfigError> {
        self.declare(ParameterLocation::Header, spec)
    }

    pub fn cookie_parameter(self, spec: ParameterSpec) -> Result<Self, ConfigError> {
        self.declare(ParameterLocation::Cookie, spec)
    }

    /// Register a declaration carrying its own location (`in`)
    pub fn declared_parameter(self, spec: ParameterSpec) -> Result<Self, ConfigError> {
        let location = spec.location.ok_or_else(|| ConfigError::InvalidParameter {
            parameter: spec.name.clone(),
            message: "missing location".to_string(),
        })?;
        self.declare(location, spec)
    }

    /// Register an already built processor
    ///
    /// Processors of one location run in registration order. An exploded
    /// object accepting additional properties claims every remaining key,
    /// so register it last.
    pub fn parameter(mut self, processor: ParameterProcessor) -> Self {
        self.processors.push(processor);
        self
    }

    /// Accept a body; processors are tried in registration order
    pub fn body(mut self, spec: BodySpec) -> Result<Self, ConfigError> {
        let processor = spec.into_processor(self.schema_parser.as_ref())?;
        self.body_processors.push(processor);
        Ok(self)
    }

    pub fn body_processor(mut self, processor: BodyProcessor) -> Self {
        self.body_processors.push(processor);
        self
    }

    /// Reject requests without a `Content-Type`
    pub fn body_required(mut self, required: bool) -> Self {
        self.body_required = required;
        self
    }

    pub fn predicate(mut self, predicate: RequestPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Limit of the buffered body, in bytes
    pub fn max_body_size(mut self, limit: usize) -> Self {
        self.max_body_size = Some(limit);
        self
    }

    /// Build a handler from a configuration entry
    pub fn from_config(config: &HandlerConfig) -> Result<Self, ConfigError> {
        let mut builder = Self::new().body_required(config.body_required);
        if let Some(limit) = config.max_body_size {
            builder = builder.max_body_size(limit);
        }
        for spec in &config.parameters {
            builder = builder.declared_parameter(spec.clone())?;
        }
        for spec in &config.body {
            builder = builder.body(spec.clone())?;
        }
        for rule in &config.file_uploads {
            builder = builder.predicate(RequestPredicate::multipart_file_upload_exists(
                rule.name.as_str(),
                &rule.content_type,
            )?);
        }
        Ok(builder)
    }

    pub fn build(self) -> ValidationHandler {
        let mut predicates = Vec::with_capacity(self.predicates.len() + 1);
        if self.body_required {
            predicates.push(RequestPredicate::body_required());
        }
        predicates.extend(self.predicates);
        ValidationHandler::new(
            predicates,
            self.processors,
            self.body_processors,
            self.max_body_size,
        )
    }
}
