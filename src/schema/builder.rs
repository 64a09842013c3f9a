//! Fluent construction of JSON-Schema fragments
//!
//! # Example
//!
//! ```rust
//! use request_validator::schema::{int_schema, object_schema, string_schema};
//!
//! let pet = object_schema()
//!     .required_property("id", int_schema().minimum(1))
//!     .property("name", string_schema().max_length(64))
//!     .build();
//! assert_eq!(pet["required"][0], "id");
//! ```

use serde_json::{Map, Value, json};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaBuilder {
    keywords: Map<String, Value>,
}

fn typed(type_name: &str) -> SchemaBuilder {
    SchemaBuilder::default().with("type", type_name)
}

pub fn int_schema() -> SchemaBuilder {
    typed("integer")
}

pub fn number_schema() -> SchemaBuilder {
    typed("number")
}

pub fn string_schema() -> SchemaBuilder {
    typed("string")
}

pub fn boolean_schema() -> SchemaBuilder {
    typed("boolean")
}

pub fn array_schema() -> SchemaBuilder {
    typed("array")
}

/// An array whose items are declared one position at a time with [`SchemaBuilder::item`]
pub fn tuple_schema() -> SchemaBuilder {
    typed("array").with("items", json!([]))
}

pub fn object_schema() -> SchemaBuilder {
    typed("object")
}

/// Accepts anything
pub fn any_schema() -> SchemaBuilder {
    SchemaBuilder::default()
}

pub fn ref_schema(uri: impl Into<String>) -> SchemaBuilder {
    SchemaBuilder::default().with("$ref", uri.into())
}

impl SchemaBuilder {
    /// Set an arbitrary keyword
    pub fn with(mut self, keyword: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keywords.insert(keyword.into(), value.into());
        self
    }

    fn take_object(&mut self, keyword: &str) -> Map<String, Value> {
        match self.keywords.remove(keyword) {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    fn take_array(&mut self, keyword: &str) -> Vec<Value> {
        match self.keywords.remove(keyword) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        }
    }

    pub fn items(self, items: SchemaBuilder) -> Self {
        self.with("items", items.build())
    }

    /// Append a positional item schema
    pub fn item(mut self, item: SchemaBuilder) -> Self {
        let mut items = self.take_array("items");
        items.push(item.build());
        self.with("items", items)
    }

    pub fn additional_items(self, schema: SchemaBuilder) -> Self {
        self.with("additionalItems", schema.build())
    }

    pub fn property(mut self, name: impl Into<String>, schema: SchemaBuilder) -> Self {
        let mut properties = self.take_object("properties");
        properties.insert(name.into(), schema.build());
        self.with("properties", properties)
    }

    pub fn required_property(mut self, name: impl Into<String>, schema: SchemaBuilder) -> Self {
        let name = name.into();
        let mut required = self.take_array("required");
        required.push(Value::String(name.clone()));
        self.with("required", required).property(name, schema)
    }

    pub fn pattern_property(mut self, pattern: impl Into<String>, schema: SchemaBuilder) -> Self {
        let mut patterns = self.take_object("patternProperties");
        patterns.insert(pattern.into(), schema.build());
        self.with("patternProperties", patterns)
    }

    pub fn additional_properties(self, schema: SchemaBuilder) -> Self {
        self.with("additionalProperties", schema.build())
    }

    pub fn allow_additional_properties(self, allowed: bool) -> Self {
        self.with("additionalProperties", allowed)
    }

    pub fn default_value(self, value: impl Into<Value>) -> Self {
        self.with("default", value)
    }

    pub fn multiple_of(self, factor: impl Into<Value>) -> Self {
        self.with("multipleOf", factor)
    }

    pub fn minimum(self, minimum: impl Into<Value>) -> Self {
        self.with("minimum", minimum)
    }

    pub fn maximum(self, maximum: impl Into<Value>) -> Self {
        self.with("maximum", maximum)
    }

    pub fn exclusive_minimum(self, minimum: impl Into<Value>) -> Self {
        self.with("exclusiveMinimum", minimum)
    }

    pub fn exclusive_maximum(self, maximum: impl Into<Value>) -> Self {
        self.with("exclusiveMaximum", maximum)
    }

    pub fn min_length(self, length: u64) -> Self {
        self.with("minLength", length)
    }

    pub fn max_length(self, length: u64) -> Self {
        self.with("maxLength", length)
    }

    pub fn pattern(self, pattern: impl Into<String>) -> Self {
        self.with("pattern", pattern.into())
    }

    pub fn enum_values<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.with("enum", values)
    }

    pub fn min_items(self, count: u64) -> Self {
        self.with("minItems", count)
    }

    pub fn max_items(self, count: u64) -> Self {
        self.with("maxItems", count)
    }

    pub fn unique_items(self) -> Self {
        self.with("uniqueItems", true)
    }

    /// Allow `null` in addition to the declared type
    pub fn nullable(mut self) -> Self {
        if let Some(Value::String(t)) = self.keywords.get("type").cloned() {
            self.keywords
                .insert("type".to_string(), json!([t, "null"]));
        }
        self
    }

    pub fn build(self) -> Value {
        Value::Object(self.keywords)
    }
}

impl From<SchemaBuilder> for Value {
    fn from(builder: SchemaBuilder) -> Self {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_schema_with_keywords() {
        let schema = int_schema().multiple_of(2).minimum(0).default_value(4).build();
        assert_eq!(
            schema,
            json!({"type": "integer", "multipleOf": 2, "minimum": 0, "default": 4})
        );
    }

    #[test]
    fn test_tuple_schema_items_accumulate() {
        let schema = tuple_schema()
            .item(int_schema())
            .item(string_schema())
            .additional_items(boolean_schema())
            .build();
        assert_eq!(schema["items"], json!([{"type": "integer"}, {"type": "string"}]));
        assert_eq!(schema["additionalItems"], json!({"type": "boolean"}));
    }

    #[test]
    fn test_object_schema_properties_keep_order() {
        let schema = object_schema()
            .required_property("b", int_schema())
            .property("a", string_schema())
            .pattern_property("^x-", number_schema())
            .allow_additional_properties(false)
            .build();
        let keys: Vec<&String> = schema["properties"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(schema["required"], json!(["b"]));
        assert_eq!(schema["additionalProperties"], json!(false));
    }

    #[test]
    fn test_enum_and_ref() {
        assert_eq!(
            string_schema().enum_values(["a", "b"]).build()["enum"],
            json!(["a", "b"])
        );
        assert_eq!(ref_schema("#/definitions/pet").build(), json!({"$ref": "#/definitions/pet"}));
    }

    #[test]
    fn test_nullable() {
        assert_eq!(int_schema().nullable().build()["type"], json!(["integer", "null"]));
    }
}
