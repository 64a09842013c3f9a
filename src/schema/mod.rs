//! Schema contract consumed by the validators
//!
//! Validation delegates to a [`Schema`] implementation. The crate ships a
//! reference engine ([`JsonSchema`]) built by [`JsonSchemaParser`]; any other
//! engine can be plugged in by implementing [`SchemaParser`] and [`Schema`].

pub mod builder;
pub mod engine;

pub use builder::{
    SchemaBuilder, any_schema, array_schema, boolean_schema, int_schema, number_schema,
    object_schema, ref_schema, string_schema, tuple_schema,
};
pub use engine::{InMemorySchemaResolver, JsonSchema, JsonSchemaParser, SchemaResolver};

use crate::core::{ConfigError, SchemaError};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;

/// A compiled schema
#[async_trait]
pub trait Schema: Send + Sync + Debug {
    /// The JSON fragment this schema was compiled from
    ///
    /// Used to infer value parsers and to read the `default` keyword.
    fn json(&self) -> &Value;

    /// Whether [`Schema::validate_sync`] can decide without suspending
    fn is_sync(&self) -> bool;

    /// Validate without suspending; only meaningful when [`Schema::is_sync`]
    fn validate_sync(&self, value: &Value) -> Result<(), SchemaError>;

    /// Validate, resolving whatever must be fetched first
    async fn validate_async(&self, value: &Value) -> Result<(), SchemaError>;

    /// Fill missing values with the defaults the schema declares
    fn apply_default_values(&self, value: &mut Value);

    /// Like [`Schema::apply_default_values`], following remote references
    async fn apply_default_values_async(&self, value: &mut Value) -> Result<(), SchemaError> {
        self.apply_default_values(value);
        Ok(())
    }

    /// Value the schema declares for an absent instance
    fn default_value(&self) -> Option<Value> {
        self.json().get("default").cloned()
    }

    /// Like [`Schema::default_value`], following remote references
    async fn default_value_async(&self) -> Result<Option<Value>, SchemaError> {
        Ok(self.default_value())
    }
}

/// Compiles JSON fragments into [`Schema`]s
pub trait SchemaParser: Send + Sync {
    fn parse(&self, schema: &Value) -> Result<Arc<dyn Schema>, ConfigError>;
}
