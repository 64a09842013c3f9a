//! Body decoders, selected by content type

use super::validator::Validator;
use crate::core::{BodyProcessorError, Deferred, MalformedValueError, RequestParameter};
use crate::parsing::{FieldParsers, FormValueParser};
use crate::server::context::{
    FORM_URL_ENCODED, MULTIPART_FORM_DATA, RequestBody, RequestContext, media_type,
};
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    UrlEncoded,
    Multipart,
}

impl FormKind {
    pub fn media_type(&self) -> &'static str {
        match self {
            FormKind::UrlEncoded => FORM_URL_ENCODED,
            FormKind::Multipart => MULTIPART_FORM_DATA,
        }
    }
}

#[derive(Debug, Clone)]
pub enum BodyProcessor {
    /// `application/json` and any `*+json` media type
    Json { validator: Arc<dyn Validator> },
    /// Any `text/plain` media type; the raw text is validated as a string
    TextPlain { validator: Arc<dyn Validator> },
    /// Url-encoded or multipart form, decoded field by field into an object
    Form {
        kind: FormKind,
        fields: FieldParsers<FormValueParser>,
        validator: Arc<dyn Validator>,
    },
}

pub fn is_json_media_type(media: &str) -> bool {
    media == "application/json" || media.ends_with("+json")
}

impl BodyProcessor {
    pub fn can_process(&self, content_type: &str) -> bool {
        let media = media_type(content_type);
        match self {
            BodyProcessor::Json { .. } => is_json_media_type(&media),
            BodyProcessor::TextPlain { .. } => media.starts_with("text/plain"),
            BodyProcessor::Form { kind, .. } => media == kind.media_type(),
        }
    }

    fn validator(&self) -> &Arc<dyn Validator> {
        match self {
            BodyProcessor::Json { validator }
            | BodyProcessor::TextPlain { validator }
            | BodyProcessor::Form { validator, .. } => validator,
        }
    }

    /// Decode and validate the body of `ctx`
    pub fn process(&self, ctx: &RequestContext) -> Deferred<RequestParameter, BodyProcessorError> {
        let content_type = ctx.content_type().unwrap_or_default().to_string();
        let decoded = match self {
            BodyProcessor::Json { .. } => decode_json(ctx.body()),
            BodyProcessor::TextPlain { .. } => decode_text(ctx.body()),
            BodyProcessor::Form { fields, .. } => decode_form(fields, ctx.body()),
        };
        match decoded {
            Ok(value) => self
                .validator()
                .validate(value)
                .map_err(move |cause| BodyProcessorError::validation(content_type, cause)),
            Err(cause) => Deferred::err(BodyProcessorError::parsing(content_type, cause)),
        }
    }
}

fn body_bytes(body: &RequestBody) -> Result<&[u8], MalformedValueError> {
    match body {
        RequestBody::Empty => Ok(&[]),
        RequestBody::Bytes(bytes) => Ok(bytes.as_ref()),
        RequestBody::Malformed(message) => Err(MalformedValueError::new(message.clone())),
        RequestBody::Form(_) | RequestBody::Multipart { .. } => {
            Err(MalformedValueError::new("Body is a form, not a raw payload"))
        }
    }
}

fn decode_json(body: &RequestBody) -> Result<Value, MalformedValueError> {
    serde_json::from_slice(body_bytes(body)?)
        .map_err(|e| MalformedValueError::new(format!("Malformed JSON: {}", e)))
}

fn decode_text(body: &RequestBody) -> Result<Value, MalformedValueError> {
    let text = std::str::from_utf8(body_bytes(body)?)
        .map_err(|e| MalformedValueError::new(format!("Body is not valid UTF-8: {}", e)))?;
    Ok(Value::String(text.to_string()))
}

fn decode_form(
    fields: &FieldParsers<FormValueParser>,
    body: &RequestBody,
) -> Result<Value, MalformedValueError> {
    let attributes = match body {
        RequestBody::Form(attributes) => attributes,
        RequestBody::Multipart { attributes, .. } => attributes,
        RequestBody::Empty => return Ok(Value::Object(Map::new())),
        RequestBody::Malformed(message) => return Err(MalformedValueError::new(message.clone())),
        RequestBody::Bytes(_) => {
            return Err(MalformedValueError::new("Body is not a decodable form"));
        }
    };

    let mut object = Map::new();
    for (key, values) in attributes.iter() {
        if values.is_empty() {
            continue;
        }
        let value = match fields.resolve(key) {
            Some(parser) => parser.parse(values)?,
            // Undeclared fields keep their raw text so the schema decides
            None => Some(match values {
                [single] => Value::String(single.clone()),
                many => Value::Array(many.iter().cloned().map(Value::String).collect()),
            }),
        };
        if let Some(value) = value {
            object.insert(key.to_string(), value);
        }
    }
    Ok(Value::Object(object))
}
