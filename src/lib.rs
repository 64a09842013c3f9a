//! # Request Validator
//!
//! Declarative HTTP request validation for axum.
//!
//! ## Features
//!
//! - **Styled Parameters**: Serialized (`1,2,3`), exploded (`?id=1&id=2`), deepObject (`o[a]=1`) and JSON
//! - **Type Inference**: Raw strings are decoded into typed JSON guided by the declared schema
//! - **Pluggable Schemas**: Validation goes through the `Schema` trait; a reference engine is bundled
//! - **Async Validation**: Schemas with remote references resolve concurrently, others stay synchronous
//! - **Bodies**: JSON, text, url-encoded and multipart forms, selected by content type
//! - **Structured Errors**: Every failure renders as a JSON 400 naming the parameter, location and cause
//! - **Configuration-Based**: Handlers can be declared via YAML
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use request_validator::prelude::*;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let handler = ValidationHandlerBuilder::new()
//!     .path_parameter(param("petId", int_schema()))?
//!     .query_parameter(exploded_param("id", array_schema().items(int_schema().multiple_of(2))))?
//!     .body(json_body(object_schema()))?
//!     .build();
//!
//! let app: Router = Router::new().route(
//!     "/pets/{petId}",
//!     post(|params: RequestParameters| async move {
//!         format!("{:?}", params.path_parameter("petId"))
//!     })
//!     .route_layer(handler.layer()),
//! );
//! # let _ = app;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod parsing;
pub mod schema;
pub mod server;
pub mod validation;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        BodyErrorKind, BodyProcessorError, ConfigError, Deferred, ErrorResponse,
        MalformedValueError, ParameterErrorKind, ParameterLocation, ParameterProcessorError,
        RawParameters, RequestParameter, RequestParameters, RequestPredicateError, SchemaError,
        ValidationError,
    };

    // === Parsing ===
    pub use crate::parsing::{
        ArrayParser, FieldParsers, ObjectParser, ParameterParser, PrimitiveParser, TupleParser,
        ValueParser,
    };

    // === Schema ===
    pub use crate::schema::{
        InMemorySchemaResolver, JsonSchemaParser, Schema, SchemaBuilder, SchemaParser,
        SchemaResolver, any_schema, array_schema, boolean_schema, int_schema, number_schema,
        object_schema, ref_schema, string_schema, tuple_schema,
    };

    // === Validation ===
    pub use crate::validation::dsl::{
        deep_object_param, deep_object_param_optional, exploded_param, exploded_param_optional,
        form_url_encoded_body, json_body, json_param, json_param_optional,
        multipart_form_data_body, optional_param, param, serialized_param, text_plain_body,
    };
    pub use crate::validation::{
        BodyProcessor, BodySpec, ParameterProcessor, ParameterSpec, RequestPredicate,
        SchemaValidator, Style, Validator,
    };

    // === Config ===
    pub use crate::config::{FileUploadRule, HandlerConfig, ValidationConfig};

    // === Server ===
    pub use crate::server::{
        RequestContext, ValidationHandler, ValidationHandlerBuilder, ValidationLayer,
    };

    // === External dependencies ===
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};

    // === Axum ===
    pub use axum::{
        Router,
        routing::{delete, get, post, put},
    };
}
