//! Adapter between decoded values and the schema engine

use crate::core::{Deferred, RequestParameter, SchemaError};
use crate::schema::Schema;
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;

/// Validates a decoded value and wraps it into a [`RequestParameter`]
pub trait Validator: Send + Sync + Debug {
    /// Ready when the schema is synchronous, pending otherwise
    fn validate(&self, value: Value) -> Deferred<RequestParameter, SchemaError>;

    /// Value to use when the request does not carry the parameter
    ///
    /// Pending when finding the default requires fetching remote documents.
    fn default_value(&self) -> Deferred<Option<RequestParameter>, SchemaError>;
}

/// [`Validator`] backed by a compiled [`Schema`]
///
/// Defaults declared by the schema are applied after a successful
/// validation, before wrapping.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    schema: Arc<dyn Schema>,
}

impl SchemaValidator {
    pub fn new(schema: Arc<dyn Schema>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Arc<dyn Schema> {
        &self.schema
    }
}

impl Validator for SchemaValidator {
    fn validate(&self, mut value: Value) -> Deferred<RequestParameter, SchemaError> {
        if self.schema.is_sync() {
            return match self.schema.validate_sync(&value) {
                Ok(()) => {
                    self.schema.apply_default_values(&mut value);
                    Deferred::ok(RequestParameter::new(value))
                }
                Err(e) => Deferred::err(e),
            };
        }
        let schema = self.schema.clone();
        Deferred::pending(async move {
            schema.validate_async(&value).await?;
            schema.apply_default_values_async(&mut value).await?;
            Ok::<_, SchemaError>(RequestParameter::new(value))
        })
    }

    fn default_value(&self) -> Deferred<Option<RequestParameter>, SchemaError> {
        if self.schema.is_sync() {
            return Deferred::ok(self.schema.default_value().map(RequestParameter::new));
        }
        let schema = self.schema.clone();
        Deferred::pending(async move {
            let default = schema.default_value_async().await?;
            Ok::<_, SchemaError>(default.map(RequestParameter::new))
        })
    }
}
