//! Typed error handling for request validation
//!
//! Every rejected request is described by exactly one [`ValidationError`].
//! The variants carry enough context (parameter name, location, content
//! type, underlying cause) to build a precise message for the client.
//!
//! # Error Categories
//!
//! - [`ParameterProcessorError`]: a path/query/header/cookie parameter was
//!   missing, could not be decoded, or failed schema validation
//! - [`BodyProcessorError`]: the body could not be decoded, failed schema
//!   validation, or no body processor accepts its content type
//! - [`RequestPredicateError`]: a precondition unrelated to the schema failed
//! - [`ConfigError`]: a validation handler could not be built
//!
//! # Example
//!
//! ```rust,ignore
//! match handler.validate(&ctx).await {
//!     Ok(params) => { /* ... */ }
//!     Err(ValidationError::Parameter(e)) if e.kind() == ParameterErrorKind::Parsing => {
//!         println!("{} in {} is malformed", e.parameter_name(), e.location());
//!     }
//!     Err(e) => return e.into_response(),
//! }
//! ```

use super::location::ParameterLocation;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

// =============================================================================
// Causes
// =============================================================================

/// A raw string could not be decoded into the expected shape or type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct MalformedValueError {
    message: String,
}

impl MalformedValueError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A decoded value was rejected by the schema engine
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct SchemaError {
    message: String,
    keyword: Option<String>,
    instance_path: String,
}

impl SchemaError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            keyword: None,
            instance_path: String::new(),
        }
    }

    /// Name the schema keyword that failed
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    /// JSON pointer of the offending part of the value
    pub fn at(mut self, instance_path: impl Into<String>) -> Self {
        self.instance_path = instance_path.into();
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn keyword(&self) -> Option<&str> {
        self.keyword.as_deref()
    }

    pub fn instance_path(&self) -> &str {
        &self.instance_path
    }
}

/// The underlying reason of a processor failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ErrorCause {
    #[error(transparent)]
    Malformed(#[from] MalformedValueError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl ErrorCause {
    /// Type name reported as `causeType` in error payloads
    pub fn cause_type(&self) -> &'static str {
        match self {
            ErrorCause::Malformed(_) => "MalformedValueError",
            ErrorCause::Schema(_) => "SchemaError",
        }
    }
}

// =============================================================================
// Parameter errors
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ParameterErrorKind {
    #[serde(rename = "MISSING_PARAMETER_WHEN_REQUIRED_ERROR")]
    MissingParameterWhenRequired,
    #[serde(rename = "PARSING_ERROR")]
    Parsing,
    #[serde(rename = "VALIDATION_ERROR")]
    Validation,
}

impl ParameterErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterErrorKind::MissingParameterWhenRequired => {
                "MISSING_PARAMETER_WHEN_REQUIRED_ERROR"
            }
            ParameterErrorKind::Parsing => "PARSING_ERROR",
            ParameterErrorKind::Validation => "VALIDATION_ERROR",
        }
    }
}

impl fmt::Display for ParameterErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A path, query, header or cookie parameter was rejected
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ParameterProcessorError {
    message: String,
    parameter_name: String,
    location: ParameterLocation,
    kind: ParameterErrorKind,
    #[source]
    cause: Option<ErrorCause>,
}

impl ParameterProcessorError {
    pub fn missing_parameter_when_required(
        parameter_name: impl Into<String>,
        location: ParameterLocation,
    ) -> Self {
        let parameter_name = parameter_name.into();
        Self {
            message: format!("Missing parameter {} in {}", parameter_name, location),
            parameter_name,
            location,
            kind: ParameterErrorKind::MissingParameterWhenRequired,
            cause: None,
        }
    }

    pub fn parsing(
        parameter_name: impl Into<String>,
        location: ParameterLocation,
        cause: MalformedValueError,
    ) -> Self {
        let parameter_name = parameter_name.into();
        Self {
            message: format!(
                "Parsing error for parameter {} in location {}: {}",
                parameter_name, location, cause
            ),
            parameter_name,
            location,
            kind: ParameterErrorKind::Parsing,
            cause: Some(cause.into()),
        }
    }

    pub fn validation(
        parameter_name: impl Into<String>,
        location: ParameterLocation,
        cause: SchemaError,
    ) -> Self {
        let parameter_name = parameter_name.into();
        Self {
            message: format!(
                "Validation error for parameter {} in location {}: {}",
                parameter_name, location, cause
            ),
            parameter_name,
            location,
            kind: ParameterErrorKind::Validation,
            cause: Some(cause.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn parameter_name(&self) -> &str {
        &self.parameter_name
    }

    pub fn location(&self) -> ParameterLocation {
        self.location
    }

    pub fn kind(&self) -> ParameterErrorKind {
        self.kind
    }

    pub fn cause(&self) -> Option<&ErrorCause> {
        self.cause.as_ref()
    }
}

// =============================================================================
// Body errors
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BodyErrorKind {
    #[serde(rename = "PARSING_ERROR")]
    Parsing,
    #[serde(rename = "VALIDATION_ERROR")]
    Validation,
    #[serde(rename = "MISSING_MATCHING_BODY_PROCESSOR")]
    MissingMatchingBodyProcessor,
}

impl BodyErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyErrorKind::Parsing => "PARSING_ERROR",
            BodyErrorKind::Validation => "VALIDATION_ERROR",
            BodyErrorKind::MissingMatchingBodyProcessor => "MISSING_MATCHING_BODY_PROCESSOR",
        }
    }
}

impl fmt::Display for BodyErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The request body was rejected
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct BodyProcessorError {
    message: String,
    content_type: String,
    kind: BodyErrorKind,
    #[source]
    cause: Option<ErrorCause>,
}

impl BodyProcessorError {
    pub fn parsing(content_type: impl Into<String>, cause: MalformedValueError) -> Self {
        let content_type = content_type.into();
        Self {
            message: format!("Body {} parsing error: {}", content_type, cause),
            content_type,
            kind: BodyErrorKind::Parsing,
            cause: Some(cause.into()),
        }
    }

    pub fn validation(content_type: impl Into<String>, cause: SchemaError) -> Self {
        let content_type = content_type.into();
        Self {
            message: format!("Validation error for body {}: {}", content_type, cause),
            content_type,
            kind: BodyErrorKind::Validation,
            cause: Some(cause.into()),
        }
    }

    pub fn missing_matching_body_processor(content_type: impl Into<String>) -> Self {
        let content_type = content_type.into();
        Self {
            message: format!("Cannot find body processor for content type {}", content_type),
            content_type,
            kind: BodyErrorKind::MissingMatchingBodyProcessor,
            cause: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn kind(&self) -> BodyErrorKind {
        self.kind
    }

    pub fn cause(&self) -> Option<&ErrorCause> {
        self.cause.as_ref()
    }
}

// =============================================================================
// Predicate errors
// =============================================================================

/// A request precondition (body required, file upload present, ...) failed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct RequestPredicateError {
    message: String,
}

impl RequestPredicateError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

// =============================================================================
// Top-level error
// =============================================================================

/// Why a request was rejected by a validation handler
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error(transparent)]
    Parameter(#[from] ParameterProcessorError),

    #[error(transparent)]
    Body(#[from] BodyProcessorError),

    #[error(transparent)]
    Predicate(#[from] RequestPredicateError),

    /// The body could not be read from the connection
    #[error("Cannot read request body: {message}")]
    BodyRead { message: String },

    /// The body exceeded the configured buffering limit
    #[error("Request body exceeds the limit of {limit} bytes")]
    PayloadTooLarge { limit: usize },
}

/// JSON form of a validation failure, rendered in 4xx responses
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub error_type_name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl ValidationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ValidationError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::Parameter(e) => e.kind().as_str(),
            ValidationError::Body(e) => e.kind().as_str(),
            ValidationError::Predicate(_) => "REQUEST_PREDICATE_ERROR",
            ValidationError::BodyRead { .. } => "BODY_READ_ERROR",
            ValidationError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            ValidationError::Parameter(_) => "ParameterProcessorError",
            ValidationError::Body(_) => "BodyProcessorError",
            ValidationError::Predicate(_) => "RequestPredicateError",
            ValidationError::BodyRead { .. } | ValidationError::PayloadTooLarge { .. } => {
                "RequestBodyError"
            }
        }
    }

    /// Convert to the JSON error payload
    pub fn to_response(&self) -> ErrorResponse {
        let mut response = ErrorResponse {
            error_type_name: self.type_name().to_string(),
            message: self.to_string(),
            cause_type: None,
            cause_message: None,
            parameter_name: None,
            location: None,
            error_type: None,
            content_type: None,
        };
        let cause = match self {
            ValidationError::Parameter(e) => {
                response.parameter_name = Some(e.parameter_name().to_string());
                response.location = Some(e.location().as_str().to_string());
                response.error_type = Some(e.kind().as_str().to_string());
                e.cause()
            }
            ValidationError::Body(e) => {
                response.content_type = Some(e.content_type().to_string());
                response.error_type = Some(e.kind().as_str().to_string());
                e.cause()
            }
            _ => None,
        };
        if let Some(cause) = cause {
            response.cause_type = Some(cause.cause_type().to_string());
            response.cause_message = Some(cause.to_string());
        }
        response
    }
}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Config errors
// =============================================================================

/// Errors raised while building a validation handler
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A `patternProperties` key or file-upload pattern is not a valid regex
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A body declaration names a content type no body processor handles
    #[error("Unsupported body content type: {content_type}")]
    UnsupportedContentType { content_type: String },

    /// The schema engine refused a schema
    #[error("Invalid schema for {target}: {message}")]
    InvalidSchema { target: String, message: String },

    /// A parameter declaration is inconsistent with its schema
    #[error("Invalid declaration for parameter '{parameter}': {message}")]
    InvalidParameter { parameter: String, message: String },
}

/// A specialized Result type for validation outcomes
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Tests
// =============================================================================
