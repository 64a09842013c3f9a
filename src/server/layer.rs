//! Tower integration
//!
//! [`ValidationLayer`] runs a [`ValidationHandler`] in front of an inner
//! service. Validated parameters travel to the handler as a
//! [`RequestParameters`] request extension; stacking several layers merges
//! their results into the same extension.

use super::context::RequestContext;
use super::handler::ValidationHandler;
use crate::core::RequestParameters;
use axum::extract::{FromRequestParts, Request};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use std::convert::Infallible;
use std::task::{Context, Poll};
use tower::{Layer, Service};

#[derive(Debug, Clone)]
pub struct ValidationLayer {
    handler: ValidationHandler,
}

impl ValidationLayer {
    pub fn new(handler: ValidationHandler) -> Self {
        Self { handler }
    }
}

impl<S> Layer<S> for ValidationLayer {
    type Service = ValidationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ValidationService {
            handler: self.handler.clone(),
            inner,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationService<S> {
    handler: ValidationHandler,
    inner: S,
}

impl<S> Service<Request> for ValidationService<S>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let handler = self.handler.clone();
        // The clone is not ready; swap so the polled instance serves this call
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let (ctx, mut req) =
                match RequestContext::from_request(req, handler.max_body_size()).await {
                    Ok(buffered) => buffered,
                    Err(e) => return Ok(e.into_response()),
                };

            let params = match handler.validate(&ctx).await {
                Ok(params) => params,
                Err(e) => return Ok(e.into_response()),
            };

            match req.extensions_mut().get_mut::<RequestParameters>() {
                Some(existing) => existing.merge(params),
                None => {
                    req.extensions_mut().insert(params);
                }
            }
            inner.call(req).await
        })
    }
}

/// Extract the parameters validated by the enclosing [`ValidationLayer`]s
///
/// Rejects with 500 when no layer ran, which is a routing mistake rather
/// than a client error.
impl<S> FromRequestParts<S> for RequestParameters
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestParameters>()
            .cloned()
            .ok_or((
                StatusCode::INTERNAL_SERVER_ERROR,
                "request parameters missing: no validation layer on this route",
            ))
    }
}
