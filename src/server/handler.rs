//! The validation handler: predicates, parameters, then body
//!
//! Everything a handler holds is immutable and shared across requests.
//! Per-request state (raw parameters, the result bag, pending validations)
//! lives on the stack of [`ValidationHandler::validate`].

use super::context::{DEFAULT_MAX_BODY_SIZE, RequestContext};
use super::layer::ValidationLayer;
use crate::core::{
    BodyProcessorError, Deferred, ParameterLocation, RequestParameter, RequestParameters,
    ValidationError,
};
use crate::validation::{BodyProcessor, ParameterProcessor, RequestPredicate};
use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use std::sync::Arc;

/// Outcome of a validation that had to suspend
enum Resolved {
    Parameter {
        location: ParameterLocation,
        name: String,
        parameter: Option<RequestParameter>,
    },
    Body(RequestParameter),
}

type PendingValidation = BoxFuture<'static, Result<Resolved, ValidationError>>;

#[derive(Debug, Clone)]
pub struct ValidationHandler {
    inner: Arc<HandlerInner>,
}

#[derive(Debug)]
struct HandlerInner {
    predicates: Vec<RequestPredicate>,
    path: Vec<ParameterProcessor>,
    query: Vec<ParameterProcessor>,
    header: Vec<ParameterProcessor>,
    cookie: Vec<ParameterProcessor>,
    body_processors: Vec<BodyProcessor>,
    max_body_size: usize,
}

impl ValidationHandler {
    pub(crate) fn new(
        predicates: Vec<RequestPredicate>,
        processors: Vec<ParameterProcessor>,
        body_processors: Vec<BodyProcessor>,
        max_body_size: Option<usize>,
    ) -> Self {
        let mut inner = HandlerInner {
            predicates,
            path: Vec::new(),
            query: Vec::new(),
            header: Vec::new(),
            cookie: Vec::new(),
            body_processors,
            max_body_size: max_body_size.unwrap_or(DEFAULT_MAX_BODY_SIZE),
        };
        for processor in processors {
            match processor.location() {
                ParameterLocation::Path => inner.path.push(processor),
                ParameterLocation::Query => inner.query.push(processor),
                ParameterLocation::Header => inner.header.push(processor),
                ParameterLocation::Cookie => inner.cookie.push(processor),
            }
        }
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn processors(&self, location: ParameterLocation) -> &[ParameterProcessor] {
        match location {
            ParameterLocation::Path => &self.inner.path,
            ParameterLocation::Query => &self.inner.query,
            ParameterLocation::Header => &self.inner.header,
            ParameterLocation::Cookie => &self.inner.cookie,
        }
    }

    pub fn body_processors(&self) -> &[BodyProcessor] {
        &self.inner.body_processors
    }

    pub fn max_body_size(&self) -> usize {
        self.inner.max_body_size
    }

    /// Wrap this handler into a tower layer
    pub fn layer(&self) -> ValidationLayer {
        ValidationLayer::new(self.clone())
    }

    /// Validate one request
    ///
    /// When every schema is synchronous the result is computed without
    /// spawning or allocating any concurrency primitive. Otherwise the
    /// pending validations run concurrently and the first failure to
    /// complete is reported; the others are dropped.
    pub async fn validate(&self, ctx: &RequestContext) -> Result<RequestParameters, ValidationError> {
        let result = self.run(ctx).await;
        match &result {
            Ok(params) => tracing::trace!(
                path = params.names(ParameterLocation::Path).count(),
                query = params.names(ParameterLocation::Query).count(),
                body = params.body().is_some(),
                "request passed validation"
            ),
            Err(e) => log_rejection(e),
        }
        result
    }

    async fn run(&self, ctx: &RequestContext) -> Result<RequestParameters, ValidationError> {
        for predicate in &self.inner.predicates {
            predicate.test(ctx)?;
        }

        let mut params = RequestParameters::new();
        let mut pending: Option<FuturesUnordered<PendingValidation>> = None;

        for location in ParameterLocation::ALL {
            let processors = self.processors(location);
            if processors.is_empty() {
                continue;
            }
            let mut raw = ctx.raw_parameters(location);
            for processor in processors {
                match processor.process(&mut raw) {
                    Deferred::Ready(Ok(Some(parameter))) => {
                        params.insert(location, processor.name(), parameter);
                    }
                    Deferred::Ready(Ok(None)) => {}
                    Deferred::Ready(Err(e)) => return Err(e.into()),
                    Deferred::Pending(future) => {
                        let name = processor.name().to_string();
                        pending
                            .get_or_insert_with(FuturesUnordered::new)
                            .push(Box::pin(async move {
                                let parameter = future.await?;
                                Ok::<_, ValidationError>(Resolved::Parameter {
                                    location,
                                    name,
                                    parameter,
                                })
                            }));
                    }
                }
            }
        }

        if let Some(content_type) = ctx.content_type() {
            let body_processors = &self.inner.body_processors;
            if !body_processors.is_empty() {
                let Some(processor) = body_processors.iter().find(|p| p.can_process(content_type))
                else {
                    tracing::warn!(content_type = %content_type, "no body processor matches content type");
                    return Err(
                        BodyProcessorError::missing_matching_body_processor(content_type).into(),
                    );
                };
                match processor.process(ctx) {
                    Deferred::Ready(Ok(body)) => params.set_body(body),
                    Deferred::Ready(Err(e)) => return Err(e.into()),
                    Deferred::Pending(future) => {
                        pending
                            .get_or_insert_with(FuturesUnordered::new)
                            .push(Box::pin(async move {
                                Ok::<_, ValidationError>(Resolved::Body(future.await?))
                            }));
                    }
                }
            }
        }

        if let Some(mut pending) = pending {
            while let Some(resolved) = pending.next().await {
                match resolved? {
                    Resolved::Parameter {
                        location,
                        name,
                        parameter: Some(parameter),
                    } => params.insert(location, name, parameter),
                    Resolved::Parameter { parameter: None, .. } => {}
                    Resolved::Body(body) => params.set_body(body),
                }
            }
        }

        Ok(params)
    }
}

fn log_rejection(error: &ValidationError) {
    match error {
        ValidationError::Parameter(e) => tracing::debug!(
            parameter = %e.parameter_name(),
            location = %e.location(),
            kind = %e.kind(),
            error = %e,
            "request rejected"
        ),
        ValidationError::Body(e) => tracing::debug!(
            content_type = %e.content_type(),
            kind = %e.kind(),
            error = %e,
            "request rejected"
        ),
        other => tracing::debug!(
            kind = other.error_code(),
            error = %other,
            "request rejected"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BodyErrorKind, ParameterErrorKind};
    use crate::schema::{
        InMemorySchemaResolver, JsonSchemaParser, array_schema, int_schema, object_schema,
        ref_schema, string_schema,
    };
    use crate::server::builder::ValidationHandlerBuilder;
    use crate::validation::dsl::{exploded_param, json_body, optional_param, param};
    use axum::body::Bytes;
    use serde_json::json;

    #[tokio::test]
    async fn test_locations_are_validated() {
        let handler = ValidationHandlerBuilder::new()
            .path_parameter(param("petId", int_schema()))
            .unwrap()
            .query_parameter(exploded_param("id", array_schema().items(int_schema())))
            .unwrap()
            .header_parameter(optional_param("X-Trace", string_schema()))
            .unwrap()
            .cookie_parameter(optional_param("session", string_schema()))
            .unwrap()
            .build();

        let ctx = RequestContext::new()
            .with_path_param("petId", "7")
            .with_query("id=1&id=2")
            .with_header("x-trace", "abc")
            .with_cookie_header("session=s1");
        let params = handler.validate(&ctx).await.unwrap();

        assert_eq!(params.path_parameter("petId").unwrap().as_i64(), Some(7));
        assert_eq!(params.query_parameter("id").unwrap().value(), &json!([1, 2]));
        assert_eq!(params.header_parameter("X-Trace").unwrap().as_str(), Some("abc"));
        assert_eq!(params.cookie_parameter("session").unwrap().as_str(), Some("s1"));
        assert!(params.body().is_none());
    }

    #[tokio::test]
    async fn test_first_failing_location_wins() {
        let handler = ValidationHandlerBuilder::new()
            .path_parameter(param("petId", int_schema()))
            .unwrap()
            .query_parameter(param("q", int_schema()))
            .unwrap()
            .build();
        let ctx = RequestContext::new()
            .with_path_param("petId", "x")
            .with_query("q=y");
        match handler.validate(&ctx).await.unwrap_err() {
            ValidationError::Parameter(e) => {
                assert_eq!(e.location(), ParameterLocation::Path);
                assert_eq!(e.kind(), ParameterErrorKind::Parsing);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_body_processor() {
        let handler = ValidationHandlerBuilder::new()
            .body(json_body(object_schema()))
            .unwrap()
            .build();
        let ctx = RequestContext::new()
            .with_body("application/xml", Bytes::from_static(b"<a/>"))
            .await;
        match handler.validate(&ctx).await.unwrap_err() {
            ValidationError::Body(e) => {
                assert_eq!(e.kind(), BodyErrorKind::MissingMatchingBodyProcessor)
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_body_ignored_without_processors() {
        let handler = ValidationHandlerBuilder::new().build();
        let ctx = RequestContext::new()
            .with_body("application/xml", Bytes::from_static(b"<a/>"))
            .await;
        assert!(handler.validate(&ctx).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pending_validations_are_collected() {
        let parser = JsonSchemaParser::new().with_resolver(
            InMemorySchemaResolver::new().with_document(
                "https://schemas.example.com/even.json",
                json!({"type": "integer", "multipleOf": 2}),
            ),
        );
        let handler = ValidationHandlerBuilder::new()
            .with_schema_parser(parser)
            .query_parameter(param("a", ref_schema("https://schemas.example.com/even.json")))
            .unwrap()
            .query_parameter(param("b", int_schema()))
            .unwrap()
            .body(json_body(ref_schema("https://schemas.example.com/even.json")))
            .unwrap()
            .build();

        let ctx = RequestContext::new()
            .with_query("a=4&b=5")
            .with_body("application/json", Bytes::from_static(b"6"))
            .await;
        let params = handler.validate(&ctx).await.unwrap();
        assert_eq!(params.query_parameter("a").unwrap().as_i64(), Some(4));
        assert_eq!(params.query_parameter("b").unwrap().as_i64(), Some(5));
        assert_eq!(params.body().unwrap().as_i64(), Some(6));

        let ctx = RequestContext::new().with_query("a=3&b=5");
        match handler.validate(&ctx).await.unwrap_err() {
            ValidationError::Parameter(e) => {
                assert_eq!(e.parameter_name(), "a");
                assert_eq!(e.kind(), ParameterErrorKind::Validation);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
