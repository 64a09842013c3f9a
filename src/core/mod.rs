//! Core module containing the fundamental types shared by every layer

pub mod deferred;
pub mod error;
pub mod location;
pub mod parameter;

pub use deferred::Deferred;
pub use error::{
    BodyErrorKind, BodyProcessorError, ConfigError, ErrorCause, ErrorResponse,
    MalformedValueError, ParameterErrorKind, ParameterProcessorError, RequestPredicateError,
    SchemaError, ValidationError, ValidationResult,
};
pub use location::{ParameterLocation, RawParameters};
pub use parameter::{RequestParameter, RequestParameters};
