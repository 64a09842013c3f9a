//! Parse, default and validate one declared parameter

use super::validator::Validator;
use crate::core::{
    Deferred, ParameterLocation, ParameterProcessorError, RawParameters, RequestParameter,
};
use crate::parsing::ParameterParser;
use std::sync::Arc;

/// One declared parameter, built at registration time and shared by requests
#[derive(Debug, Clone)]
pub struct ParameterProcessor {
    name: String,
    location: ParameterLocation,
    optional: bool,
    parser: ParameterParser,
    validator: Arc<dyn Validator>,
}

impl ParameterProcessor {
    pub fn new(
        name: impl Into<String>,
        location: ParameterLocation,
        optional: bool,
        parser: ParameterParser,
        validator: Arc<dyn Validator>,
    ) -> Self {
        Self {
            name: name.into(),
            location,
            optional,
            parser,
            validator,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> ParameterLocation {
        self.location
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn parser(&self) -> &ParameterParser {
        &self.parser
    }

    /// Extract, default and validate the parameter
    ///
    /// Resolves to `None` only when the parameter is optional, absent and
    /// without a default.
    pub fn process(
        &self,
        raw: &mut RawParameters,
    ) -> Deferred<Option<RequestParameter>, ParameterProcessorError> {
        let parsed = match self.parser.parse_parameter(raw) {
            Ok(parsed) => parsed,
            Err(cause) => {
                return Deferred::err(ParameterProcessorError::parsing(
                    &self.name,
                    self.location,
                    cause,
                ));
            }
        };

        let name = self.name.clone();
        let location = self.location;

        let Some(value) = parsed else {
            let optional = self.optional;
            let error_name = name.clone();
            return self
                .validator
                .default_value()
                .map_err(move |cause| {
                    ParameterProcessorError::validation(error_name, location, cause)
                })
                .and_then(move |default| match default {
                    Some(default) => Ok(Some(default.named(name))),
                    None if optional => Ok(None),
                    None => Err(ParameterProcessorError::missing_parameter_when_required(
                        name, location,
                    )),
                });
        };

        let error_name = name.clone();
        self.validator
            .validate(value)
            .map(move |param| Some(param.named(name)))
            .map_err(move |cause| ParameterProcessorError::validation(error_name, location, cause))
    }
}
