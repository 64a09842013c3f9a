//! Per-request view consumed by the validation handler
//!
//! [`RequestContext::from_request`] buffers the body once and decodes every
//! location into [`RawParameters`]. The request is rebuilt around the
//! buffered bytes so downstream handlers still see the body.

use crate::core::{ParameterLocation, RawParameters, ValidationError};
use axum::RequestExt;
use axum::body::{Body, Bytes};
use axum::extract::{RawPathParams, Request};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE, COOKIE};
use http_body_util::LengthLimitError;
use std::convert::Infallible;
use std::error::Error as StdError;

pub const FORM_URL_ENCODED: &str = "application/x-www-form-urlencoded";
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// Default buffering limit for request bodies (2 MiB)
pub const DEFAULT_MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

/// The media type of a `Content-Type` value, lower-cased and without parameters
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// A file part of a multipart body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub size: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Raw payload of any non-form content type
    Bytes(Bytes),
    /// Decoded `application/x-www-form-urlencoded` fields
    Form(RawParameters),
    /// Decoded `multipart/form-data` parts
    Multipart {
        attributes: RawParameters,
        files: Vec<FileUpload>,
    },
    /// A form body that could not be decoded
    Malformed(String),
}

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    path: RawParameters,
    query: RawParameters,
    header: RawParameters,
    cookie: RawParameters,
    content_type: Option<String>,
    body: RequestBody,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path.insert(name, value);
        self
    }

    /// Decode and append a raw query string (`a=1&b=2`)
    pub fn with_query(mut self, query: &str) -> Self {
        for (name, value) in decode_pairs(query) {
            self.query.insert(name, value);
        }
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.header.insert(name.to_ascii_lowercase(), value);
        self
    }

    /// Decode and append a raw `Cookie` header value
    pub fn with_cookie_header(mut self, header: &str) -> Self {
        for (name, value) in split_cookies(header) {
            self.cookie.insert(name, value);
        }
        self
    }

    /// Attach a body, decoding it according to `content_type`
    pub async fn with_body(mut self, content_type: impl Into<String>, bytes: Bytes) -> Self {
        let content_type = content_type.into();
        self.body = decode_body(&content_type, bytes).await;
        self.content_type = Some(content_type);
        self
    }

    /// Buffer and decode an axum request
    ///
    /// Fails with 413 when the body exceeds `limit`.
    pub async fn from_request(
        mut req: Request,
        limit: usize,
    ) -> Result<(Self, Request), ValidationError> {
        let mut ctx = RequestContext::new();

        // Only present when the layer runs after routing
        if let Ok(params) = req.extract_parts::<RawPathParams>().await {
            for (name, value) in &params {
                ctx.path.insert(name, value);
            }
        }

        if let Some(query) = req.uri().query() {
            ctx = ctx.with_query(query);
        }

        for (name, value) in req.headers() {
            match value.to_str() {
                Ok(value) => ctx.header.insert(name.as_str(), value),
                Err(_) => tracing::debug!(header = %name, "skipping non-visible-ASCII header"),
            }
        }

        if let Some(cookies) = req.headers().get(COOKIE).and_then(|v| v.to_str().ok()) {
            ctx = ctx.with_cookie_header(cookies);
        }

        ctx.content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let declared_length = req
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared_length.is_some_and(|length| length > limit) {
            return Err(ValidationError::PayloadTooLarge { limit });
        }

        let (parts, body) = req.into_parts();
        let bytes = axum::body::to_bytes(body, limit).await.map_err(|e| {
            let message = e.to_string();
            tracing::warn!(error = %message, "failed to buffer request body");
            if exceeds_length_limit(&e) {
                ValidationError::PayloadTooLarge { limit }
            } else {
                ValidationError::BodyRead { message }
            }
        })?;

        if let Some(content_type) = &ctx.content_type {
            ctx.body = decode_body(content_type, bytes.clone()).await;
        } else if !bytes.is_empty() {
            ctx.body = RequestBody::Bytes(bytes.clone());
        }

        Ok((ctx, Request::from_parts(parts, Body::from(bytes))))
    }

    /// A fresh copy of the raw values of `location`, ready to be consumed
    pub fn raw_parameters(&self, location: ParameterLocation) -> RawParameters {
        match location {
            ParameterLocation::Path => self.path.clone(),
            ParameterLocation::Query => self.query.clone(),
            ParameterLocation::Header => self.header.clone(),
            ParameterLocation::Cookie => self.cookie.clone(),
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn file_uploads(&self) -> &[FileUpload] {
        match &self.body {
            RequestBody::Multipart { files, .. } => files,
            _ => &[],
        }
    }
}

fn decode_pairs(encoded: &str) -> Vec<(String, String)> {
    match serde_urlencoded::from_str::<Vec<(String, String)>>(encoded) {
        Ok(pairs) => pairs,
        Err(e) => {
            tracing::debug!(error = %e, "ignoring undecodable url-encoded pairs");
            Vec::new()
        }
    }
}

fn exceeds_length_limit(error: &(dyn StdError + 'static)) -> bool {
    std::iter::successors(Some(error), |e: &&(dyn StdError + 'static)| (*e).source()).any(|e| e.is::<LengthLimitError>())
}

/// Split `a=1; b=2` into percent-decoded pairs; form-style `R=100&G=200`
/// values are split too
fn split_cookies(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .flat_map(|pair| pair.split('&'))
        .map(str::trim)
        .filter(|pair| pair.contains('='))
        .flat_map(decode_pairs)
        .filter_map(|(name, value)| {
            let name = name.trim();
            if name.is_empty() {
                None
            } else {
                Some((name.to_string(), value.trim().to_string()))
            }
        })
        .collect()
}

async fn decode_body(content_type: &str, bytes: Bytes) -> RequestBody {
    let media = media_type(content_type);
    if media == FORM_URL_ENCODED {
        return match serde_urlencoded::from_bytes::<Vec<(String, String)>>(&bytes) {
            Ok(pairs) => RequestBody::Form(RawParameters::from_pairs(pairs)),
            Err(e) => RequestBody::Malformed(e.to_string()),
        };
    }
    if media == MULTIPART_FORM_DATA {
        return match decode_multipart(content_type, bytes).await {
            Ok(body) => body,
            Err(e) => RequestBody::Malformed(e.to_string()),
        };
    }
    if bytes.is_empty() {
        RequestBody::Empty
    } else {
        RequestBody::Bytes(bytes)
    }
}

async fn decode_multipart(content_type: &str, bytes: Bytes) -> Result<RequestBody, multer::Error> {
    let boundary = multer::parse_boundary(content_type)?;
    let stream = futures::stream::once(async move { Ok::<Bytes, Infallible>(bytes) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut attributes = RawParameters::new();
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(|m| m.to_string());
        if file_name.is_some() {
            let size = field.bytes().await?.len();
            files.push(FileUpload {
                name,
                file_name,
                content_type,
                size,
            });
        } else {
            attributes.insert(name, field.text().await?);
        }
    }
    Ok(RequestBody::Multipart { attributes, files })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type() {
        assert_eq!(media_type("Application/JSON; charset=utf-8"), "application/json");
        assert_eq!(media_type("text/plain"), "text/plain");
    }

    #[test]
    fn test_query_and_cookie_decoding() {
        let ctx = RequestContext::new()
            .with_query("id=1&id=2&name=a%20b")
            .with_cookie_header("session=abc; color=R=100&G=200");
        let query = ctx.raw_parameters(ParameterLocation::Query);
        assert_eq!(query.get("id").unwrap().len(), 2);
        assert_eq!(query.first("name"), Some("a b"));

        let cookies = ctx.raw_parameters(ParameterLocation::Cookie);
        assert_eq!(cookies.first("session"), Some("abc"));
        assert_eq!(cookies.first("G"), Some("200"));
    }

    #[test]
    fn test_cookie_pairs_are_percent_decoded() {
        let ctx = RequestContext::new()
            .with_cookie_header("user%20name=J%C3%B6rg+M; tags=a%2Cb; =orphan; flag");
        let cookies = ctx.raw_parameters(ParameterLocation::Cookie);
        assert_eq!(cookies.first("user name"), Some("Jörg M"));
        assert_eq!(cookies.first("tags"), Some("a,b"));
        assert_eq!(cookies.names().count(), 2);
    }

    #[test]
    fn test_header_names_are_lowercased() {
        let ctx = RequestContext::new().with_header("X-Rate-Limit", "5");
        assert_eq!(
            ctx.raw_parameters(ParameterLocation::Header).first("x-rate-limit"),
            Some("5")
        );
    }

    #[tokio::test]
    async fn test_form_body_decoding() {
        let ctx = RequestContext::new()
            .with_body(FORM_URL_ENCODED, Bytes::from_static(b"a=1&tags=x&tags=y"))
            .await;
        match ctx.body() {
            RequestBody::Form(fields) => {
                assert_eq!(fields.first("a"), Some("1"));
                assert_eq!(fields.get("tags").unwrap().len(), 2);
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_multipart_body_decoding() {
        let body = "--XX\r\n\
            Content-Disposition: form-data; name=\"title\"\r\n\r\n\
            hello\r\n\
            --XX\r\n\
            Content-Disposition: form-data; name=\"avatar\"; filename=\"a.png\"\r\n\
            Content-Type: image/png\r\n\r\n\
            PNGDATA\r\n\
            --XX--\r\n";
        let ctx = RequestContext::new()
            .with_body("multipart/form-data; boundary=XX", Bytes::from(body))
            .await;
        match ctx.body() {
            RequestBody::Multipart { attributes, files } => {
                assert_eq!(attributes.first("title"), Some("hello"));
                assert_eq!(files.len(), 1);
                assert_eq!(files[0].name, "avatar");
                assert_eq!(files[0].content_type.as_deref(), Some("image/png"));
                assert_eq!(files[0].size, 7);
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_from_request_rebuilds_body() {
        let req = Request::builder()
            .uri("/pets?limit=3")
            .header("content-type", "application/json")
            .body(Body::from("{\"a\":1}"))
            .unwrap();
        let (ctx, req) = RequestContext::from_request(req, 1024).await.unwrap();
        assert_eq!(ctx.content_type(), Some("application/json"));
        assert_eq!(ctx.raw_parameters(ParameterLocation::Query).first("limit"), Some("3"));
        let bytes = axum::body::to_bytes(req.into_body(), 1024).await.unwrap();
        assert_eq!(&bytes[..], b"{\"a\":1}");
    }

    #[tokio::test]
    async fn test_from_request_over_limit() {
        let req = Request::builder()
            .uri("/")
            .header("content-type", "text/plain")
            .body(Body::from("0123456789"))
            .unwrap();
        let err = RequestContext::from_request(req, 4).await.unwrap_err();
        assert_eq!(err, ValidationError::PayloadTooLarge { limit: 4 });
    }

    #[tokio::test]
    async fn test_streamed_body_over_limit_without_content_length() {
        let chunks = futures::stream::iter(vec![
            Ok::<_, Infallible>(Bytes::from_static(b"01234")),
            Ok(Bytes::from_static(b"56789")),
        ]);
        let req = Request::builder()
            .uri("/")
            .header("content-type", "text/plain")
            .body(Body::from_stream(chunks))
            .unwrap();
        assert!(req.headers().get(CONTENT_LENGTH).is_none());
        let err = RequestContext::from_request(req, 4).await.unwrap_err();
        assert_eq!(err, ValidationError::PayloadTooLarge { limit: 4 });
    }

    #[tokio::test]
    async fn test_failing_stream_is_a_read_error() {
        let chunks = futures::stream::iter(vec![Err::<Bytes, _>(std::io::Error::other("reset"))]);
        let req = Request::builder()
            .uri("/")
            .body(Body::from_stream(chunks))
            .unwrap();
        let err = RequestContext::from_request(req, 1024).await.unwrap_err();
        assert!(matches!(err, ValidationError::BodyRead { .. }));
    }
}
