//! Decoding of single raw strings into JSON values

use super::container::{ArrayParser, ObjectParser, TupleParser};
use crate::core::MalformedValueError;
use serde_json::{Number, Value};

/// Stateless decoder for one scalar string
///
/// Every variant is a shared constant; selecting one never allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveParser {
    /// Returns the raw string unchanged
    #[default]
    Noop,
    /// Base-10 signed 64-bit integer
    Integer,
    /// Finite 64-bit float
    Float,
    /// Exactly `true` or `false`
    Boolean,
    /// An embedded JSON document
    Json,
}

impl PrimitiveParser {
    pub fn parse(&self, raw: &str) -> Result<Value, MalformedValueError> {
        match self {
            PrimitiveParser::Noop => Ok(Value::String(raw.to_string())),
            PrimitiveParser::Integer => raw
                .parse::<i64>()
                .map(|v| Value::Number(v.into()))
                .map_err(|e| {
                    MalformedValueError::new(format!("Cannot parse '{}' as integer: {}", raw, e))
                }),
            PrimitiveParser::Float => {
                let parsed = raw.parse::<f64>().map_err(|e| {
                    MalformedValueError::new(format!("Cannot parse '{}' as number: {}", raw, e))
                })?;
                Number::from_f64(parsed).map(Value::Number).ok_or_else(|| {
                    MalformedValueError::new(format!("Cannot parse '{}' as finite number", raw))
                })
            }
            PrimitiveParser::Boolean => match raw {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(MalformedValueError::new(format!(
                    "Cannot parse '{}' as boolean",
                    raw
                ))),
            },
            PrimitiveParser::Json => serde_json::from_str(raw).map_err(|e| {
                MalformedValueError::new(format!("Cannot parse '{}' as json: {}", raw, e))
            }),
        }
    }
}

/// Decoder for one raw string, scalar or serialized container
#[derive(Debug, Clone)]
pub enum ValueParser {
    Primitive(PrimitiveParser),
    Array(ArrayParser),
    Tuple(TupleParser),
    Object(ObjectParser),
}

impl ValueParser {
    pub fn parse(&self, raw: &str) -> Result<Value, MalformedValueError> {
        match self {
            ValueParser::Primitive(p) => p.parse(raw),
            ValueParser::Array(p) => p.parse(raw),
            ValueParser::Tuple(p) => p.parse(raw),
            ValueParser::Object(p) => p.parse(raw),
        }
    }
}

impl From<PrimitiveParser> for ValueParser {
    fn from(parser: PrimitiveParser) -> Self {
        ValueParser::Primitive(parser)
    }
}

impl From<ArrayParser> for ValueParser {
    fn from(parser: ArrayParser) -> Self {
        ValueParser::Array(parser)
    }
}

impl From<TupleParser> for ValueParser {
    fn from(parser: TupleParser) -> Self {
        ValueParser::Tuple(parser)
    }
}

impl From<ObjectParser> for ValueParser {
    fn from(parser: ObjectParser) -> Self {
        ValueParser::Object(parser)
    }
}

/// Decoder for one form field, which may carry several values
///
/// When an array is expected every value is decoded with the inner parser,
/// otherwise only the first value is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormValueParser {
    expect_array: bool,
    inner: PrimitiveParser,
}

impl FormValueParser {
    pub fn new(expect_array: bool, inner: PrimitiveParser) -> Self {
        Self {
            expect_array,
            inner,
        }
    }

    pub fn expects_array(&self) -> bool {
        self.expect_array
    }

    /// Decode the values of a field; `None` when the field has no value
    pub fn parse(&self, values: &[String]) -> Result<Option<Value>, MalformedValueError> {
        if self.expect_array {
            let items = values
                .iter()
                .map(|v| self.inner.parse(v))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Some(Value::Array(items)))
        } else {
            match values.first() {
                Some(first) => self.inner.parse(first).map(Some),
                None => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_parser() {
        assert_eq!(PrimitiveParser::Integer.parse("42").unwrap(), json!(42));
        assert_eq!(PrimitiveParser::Integer.parse("-7").unwrap(), json!(-7));
        assert!(PrimitiveParser::Integer.parse("4.2").is_err());
        assert!(PrimitiveParser::Integer.parse("abc").is_err());
        assert!(PrimitiveParser::Integer.parse("").is_err());
    }

    #[test]
    fn test_float_parser() {
        assert_eq!(PrimitiveParser::Float.parse("1.5").unwrap(), json!(1.5));
        assert_eq!(PrimitiveParser::Float.parse("3").unwrap(), json!(3.0));
        assert!(PrimitiveParser::Float.parse("NaN").is_err());
        assert!(PrimitiveParser::Float.parse("inf").is_err());
        assert!(PrimitiveParser::Float.parse("x").is_err());
    }

    #[test]
    fn test_boolean_parser_is_strict() {
        assert_eq!(PrimitiveParser::Boolean.parse("true").unwrap(), json!(true));
        assert_eq!(PrimitiveParser::Boolean.parse("false").unwrap(), json!(false));
        assert!(PrimitiveParser::Boolean.parse("TRUE").is_err());
        assert!(PrimitiveParser::Boolean.parse("1").is_err());
    }

    #[test]
    fn test_noop_and_json() {
        assert_eq!(PrimitiveParser::Noop.parse("hello").unwrap(), json!("hello"));
        assert_eq!(
            PrimitiveParser::Json.parse(r#"{"a":[1,2]}"#).unwrap(),
            json!({"a": [1, 2]})
        );
        let err = PrimitiveParser::Json.parse("{oops").unwrap_err();
        assert!(err.message().contains("json"));
    }

    #[test]
    fn test_form_value_parser() {
        let values = vec!["1".to_string(), "2".to_string()];
        let array = FormValueParser::new(true, PrimitiveParser::Integer);
        assert_eq!(array.parse(&values).unwrap(), Some(json!([1, 2])));

        let single = FormValueParser::new(false, PrimitiveParser::Integer);
        assert_eq!(single.parse(&values).unwrap(), Some(json!(1)));
        assert_eq!(single.parse(&[]).unwrap(), None);

        let bad = vec!["x".to_string()];
        assert!(array.parse(&bad).is_err());
    }
}
