//! Validated request values handed to downstream handlers

use super::location::ParameterLocation;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// One validated value, after schema defaults were applied
///
/// The payload is a JSON value (null, boolean, number, string, array or
/// object). Parameters produced by a parameter processor carry the name they
/// were declared with; body values are anonymous.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestParameter {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    value: Value,
}

impl RequestParameter {
    pub fn new(value: Value) -> Self {
        Self { name: None, value }
    }

    pub fn null() -> Self {
        Self::new(Value::Null)
    }

    /// Attach the parameter name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    pub fn is_boolean(&self) -> bool {
        self.value.is_boolean()
    }

    pub fn is_number(&self) -> bool {
        self.value.is_number()
    }

    pub fn is_string(&self) -> bool {
        self.value.is_string()
    }

    pub fn is_array(&self) -> bool {
        self.value.is_array()
    }

    pub fn is_object(&self) -> bool {
        self.value.is_object()
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.value.as_bool()
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.value.as_i64()
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.value.as_f64()
    }

    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        self.value.as_array()
    }

    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        self.value.as_object()
    }

    /// Deserialize the value into a typed structure
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.value.clone())
    }
}

impl From<Value> for RequestParameter {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

/// The per-request bag of validated parameters
///
/// One map per location plus an optional body. Stored in the request
/// extensions by the validation layer and extractable in handlers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestParameters {
    path: HashMap<String, RequestParameter>,
    query: HashMap<String, RequestParameter>,
    header: HashMap<String, RequestParameter>,
    cookie: HashMap<String, RequestParameter>,
    body: Option<RequestParameter>,
}

impl RequestParameters {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self, location: ParameterLocation) -> &HashMap<String, RequestParameter> {
        match location {
            ParameterLocation::Path => &self.path,
            ParameterLocation::Query => &self.query,
            ParameterLocation::Header => &self.header,
            ParameterLocation::Cookie => &self.cookie,
        }
    }

    fn map_mut(&mut self, location: ParameterLocation) -> &mut HashMap<String, RequestParameter> {
        match location {
            ParameterLocation::Path => &mut self.path,
            ParameterLocation::Query => &mut self.query,
            ParameterLocation::Header => &mut self.header,
            ParameterLocation::Cookie => &mut self.cookie,
        }
    }

    /// Record a parameter under `name` for `location`
    pub fn insert(
        &mut self,
        location: ParameterLocation,
        name: impl Into<String>,
        parameter: RequestParameter,
    ) {
        self.map_mut(location).insert(name.into(), parameter);
    }

    pub fn set_body(&mut self, body: RequestParameter) {
        self.body = Some(body);
    }

    pub fn parameter(&self, location: ParameterLocation, name: &str) -> Option<&RequestParameter> {
        match location {
            // Header names are case-insensitive
            ParameterLocation::Header => self
                .header
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v),
            _ => self.map(location).get(name),
        }
    }

    pub fn path_parameter(&self, name: &str) -> Option<&RequestParameter> {
        self.parameter(ParameterLocation::Path, name)
    }

    pub fn query_parameter(&self, name: &str) -> Option<&RequestParameter> {
        self.parameter(ParameterLocation::Query, name)
    }

    pub fn header_parameter(&self, name: &str) -> Option<&RequestParameter> {
        self.parameter(ParameterLocation::Header, name)
    }

    pub fn cookie_parameter(&self, name: &str) -> Option<&RequestParameter> {
        self.parameter(ParameterLocation::Cookie, name)
    }

    pub fn body(&self) -> Option<&RequestParameter> {
        self.body.as_ref()
    }

    /// Names of the parameters recorded for `location`
    pub fn names(&self, location: ParameterLocation) -> impl Iterator<Item = &str> {
        self.map(location).keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_none() && ParameterLocation::ALL.iter().all(|l| self.map(*l).is_empty())
    }

    /// Merge the output of a later validation handler into this bag
    ///
    /// Locations are unioned and same-name parameters from `other` replace the
    /// existing ones. The body from `other` only fills an absent body.
    pub fn merge(&mut self, other: RequestParameters) {
        let RequestParameters {
            path,
            query,
            header,
            cookie,
            body,
        } = other;
        self.path.extend(path);
        self.query.extend(query);
        self.header.extend(header);
        self.cookie.extend(cookie);
        if self.body.is_none() {
            self.body = body;
        }
    }
}
