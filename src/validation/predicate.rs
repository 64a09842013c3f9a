//! Request-level preconditions checked before any parameter

use crate::core::{ConfigError, RequestPredicateError};
use crate::server::context::RequestContext;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

type PredicateFn = dyn Fn(&RequestContext) -> Result<(), RequestPredicateError> + Send + Sync;

#[derive(Clone)]
pub struct RequestPredicate {
    description: String,
    check: Arc<PredicateFn>,
}

impl fmt::Debug for RequestPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestPredicate")
            .field("description", &self.description)
            .finish()
    }
}

impl RequestPredicate {
    pub fn new<F>(description: impl Into<String>, check: F) -> Self
    where
        F: Fn(&RequestContext) -> Result<(), RequestPredicateError> + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            check: Arc::new(check),
        }
    }

    /// Fails when the request declares no `Content-Type`
    pub fn body_required() -> Self {
        Self::new("body required", |ctx| match ctx.content_type() {
            Some(_) => Ok(()),
            None => Err(RequestPredicateError::new("Body required")),
        })
    }

    /// Fails unless a multipart file part named `name` has a content type
    /// fully matching `content_type_pattern`
    pub fn multipart_file_upload_exists(
        name: impl Into<String>,
        content_type_pattern: &str,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let regex = Regex::new(&format!("^(?:{})$", content_type_pattern)).map_err(|e| {
            ConfigError::InvalidPattern {
                pattern: content_type_pattern.to_string(),
                message: e.to_string(),
            }
        })?;
        let message = format!(
            "File with content type {} and name {} is missing",
            content_type_pattern, name
        );
        Ok(Self::new(
            format!("file upload {}", name),
            move |ctx: &RequestContext| {
                let present = ctx.file_uploads().iter().any(|file| {
                    file.name == name
                        && file
                            .content_type
                            .as_deref()
                            .is_some_and(|ct| regex.is_match(ct))
                });
                if present {
                    Ok(())
                } else {
                    Err(RequestPredicateError::new(message.clone()))
                }
            },
        ))
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn test(&self, ctx: &RequestContext) -> Result<(), RequestPredicateError> {
        (self.check)(ctx)
    }
}
