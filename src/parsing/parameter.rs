//! Extraction of one parameter from the raw values of its location
//!
//! A parser removes every raw key it claims, so after all processors of a
//! location ran, the remaining keys are the ones nobody declared.

use super::container::{ArrayParser, FieldParsers, TupleParser};
use super::value::ValueParser;
use crate::core::{MalformedValueError, RawParameters};
use serde_json::{Map, Value};

#[derive(Debug, Clone)]
pub enum ParameterParser {
    /// First raw value under the name, decoded as a whole
    Single { name: String, parser: ValueParser },
    /// Every raw value under the name is one item (`?id=1&id=2`)
    ExplodedArray { name: String, parser: ArrayParser },
    /// Every raw value under the name is one positional item
    ExplodedTuple { name: String, parser: TupleParser },
    /// Every claimed raw key is one field (`?id=1&name=rex`)
    ExplodedObject { name: String, fields: FieldParsers },
    /// Raw keys shaped `name[field]` are the fields
    DeepObject { name: String, fields: FieldParsers },
}

impl ParameterParser {
    pub fn name(&self) -> &str {
        match self {
            ParameterParser::Single { name, .. }
            | ParameterParser::ExplodedArray { name, .. }
            | ParameterParser::ExplodedTuple { name, .. }
            | ParameterParser::ExplodedObject { name, .. }
            | ParameterParser::DeepObject { name, .. } => name,
        }
    }

    /// Decode the parameter, or `None` when the request does not carry it
    pub fn parse_parameter(
        &self,
        raw: &mut RawParameters,
    ) -> Result<Option<Value>, MalformedValueError> {
        match self {
            ParameterParser::Single { name, parser } => match raw.take(name) {
                Some(values) => match values.first() {
                    Some(first) => parser.parse(first).map(Some),
                    None => Ok(None),
                },
                None => Ok(None),
            },
            ParameterParser::ExplodedArray { name, parser } => match raw.take(name) {
                Some(values) => parser.parse_values(&values).map(Some),
                None => Ok(None),
            },
            ParameterParser::ExplodedTuple { name, parser } => match raw.take(name) {
                Some(values) => parser.parse_values(&values).map(Some),
                None => Ok(None),
            },
            ParameterParser::ExplodedObject { fields, .. } => {
                let claimed: Vec<String> = raw
                    .names()
                    .filter(|key| fields.resolve(key).is_some())
                    .map(str::to_string)
                    .collect();
                let mut object = Map::new();
                for key in claimed {
                    let Some(values) = raw.take(&key) else {
                        continue;
                    };
                    match values.first() {
                        Some(first) if !first.is_empty() => {
                            let value = fields.parse_field(&key, first)?;
                            object.insert(key, value);
                        }
                        _ => {}
                    }
                }
                Ok(non_empty(object))
            }
            ParameterParser::DeepObject { name, fields } => {
                let prefix = format!("{}[", name);
                let claimed: Vec<(String, String)> = raw
                    .names()
                    .filter_map(|key| {
                        key.strip_prefix(prefix.as_str())
                            .and_then(|rest| rest.strip_suffix(']'))
                            .map(|field| (key.to_string(), field.to_string()))
                    })
                    .collect();
                let mut object = Map::new();
                for (key, field) in claimed {
                    let Some(values) = raw.take(&key) else {
                        continue;
                    };
                    match values.first() {
                        Some(first) if !first.is_empty() => {
                            let value = fields.parse_field(&field, first)?;
                            object.insert(field, value);
                        }
                        _ => {}
                    }
                }
                Ok(non_empty(object))
            }
        }
    }
}

fn non_empty(object: Map<String, Value>) -> Option<Value> {
    if object.is_empty() {
        None
    } else {
        Some(Value::Object(object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::value::PrimitiveParser;
    use regex::Regex;
    use serde_json::json;

    fn raw(pairs: &[(&str, &str)]) -> RawParameters {
        RawParameters::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn test_single_takes_first_value_and_removes_key() {
        let parser = ParameterParser::Single {
            name: "petId".to_string(),
            parser: PrimitiveParser::Integer.into(),
        };
        let mut params = raw(&[("petId", "3"), ("petId", "4"), ("other", "x")]);
        assert_eq!(parser.parse_parameter(&mut params).unwrap(), Some(json!(3)));
        assert!(!params.contains("petId"));
        assert!(params.contains("other"));
    }

    #[test]
    fn test_single_missing_is_none() {
        let parser = ParameterParser::Single {
            name: "q".to_string(),
            parser: PrimitiveParser::Noop.into(),
        };
        assert_eq!(parser.parse_parameter(&mut RawParameters::new()).unwrap(), None);
    }

    #[test]
    fn test_exploded_array() {
        let parser = ParameterParser::ExplodedArray {
            name: "id".to_string(),
            parser: ArrayParser::new(PrimitiveParser::Integer),
        };
        let mut params = raw(&[("id", "2"), ("id", ""), ("id", "4")]);
        assert_eq!(
            parser.parse_parameter(&mut params).unwrap(),
            Some(json!([2, null, 4]))
        );
        assert!(params.is_empty());
    }

    #[test]
    fn test_exploded_tuple() {
        let parser = ParameterParser::ExplodedTuple {
            name: "t".to_string(),
            parser: TupleParser::new(
                vec![PrimitiveParser::Integer, PrimitiveParser::Boolean],
                None,
            ),
        };
        let mut params = raw(&[("t", "1"), ("t", "false"), ("t", "dropped")]);
        assert_eq!(
            parser.parse_parameter(&mut params).unwrap(),
            Some(json!([1, false]))
        );
    }

    #[test]
    fn test_exploded_object_claims_only_matching_keys() {
        let parser = ParameterParser::ExplodedObject {
            name: "filter".to_string(),
            fields: FieldParsers::new()
                .property("age", PrimitiveParser::Integer)
                .pattern_property(Regex::new("^is_").unwrap(), PrimitiveParser::Boolean),
        };
        let mut params = raw(&[("age", "5"), ("is_good", "true"), ("page", "2")]);
        assert_eq!(
            parser.parse_parameter(&mut params).unwrap(),
            Some(json!({"age": 5, "is_good": true}))
        );
        assert_eq!(params.names().collect::<Vec<_>>(), vec!["page"]);
    }

    #[test]
    fn test_exploded_object_with_additional_claims_everything() {
        let parser = ParameterParser::ExplodedObject {
            name: "all".to_string(),
            fields: FieldParsers::new().additional_properties(Some(PrimitiveParser::Noop)),
        };
        let mut params = raw(&[("a", "1"), ("b", "2")]);
        assert_eq!(
            parser.parse_parameter(&mut params).unwrap(),
            Some(json!({"a": "1", "b": "2"}))
        );
        assert!(params.is_empty());
    }

    #[test]
    fn test_exploded_object_exact_property_beats_matching_pattern() {
        let parser = ParameterParser::ExplodedObject {
            name: "o".to_string(),
            fields: FieldParsers::new()
                .property("a", PrimitiveParser::Integer)
                .pattern_property(Regex::new("a.*").unwrap(), PrimitiveParser::Boolean)
                .additional_properties(Some(PrimitiveParser::Noop)),
        };
        let mut params = raw(&[("a", "1")]);
        assert_eq!(
            parser.parse_parameter(&mut params).unwrap(),
            Some(json!({"a": 1}))
        );
        assert!(params.is_empty());
    }

    #[test]
    fn test_exploded_tuple_keeps_empty_noop_item() {
        let parser = ParameterParser::ExplodedTuple {
            name: "t".to_string(),
            parser: TupleParser::new(vec![PrimitiveParser::Noop, PrimitiveParser::Integer], None),
        };
        let mut params = raw(&[("t", ""), ("t", "")]);
        assert_eq!(
            parser.parse_parameter(&mut params).unwrap(),
            Some(json!(["", null]))
        );
    }

    #[test]
    fn test_exploded_object_absent_is_none() {
        let parser = ParameterParser::ExplodedObject {
            name: "o".to_string(),
            fields: FieldParsers::new().property("x", PrimitiveParser::Noop),
        };
        let mut params = raw(&[("y", "1")]);
        assert_eq!(parser.parse_parameter(&mut params).unwrap(), None);
    }

    #[test]
    fn test_deep_object() {
        let parser = ParameterParser::DeepObject {
            name: "color".to_string(),
            fields: FieldParsers::new()
                .property("R", PrimitiveParser::Integer)
                .property("G", PrimitiveParser::Integer)
                .property("B", PrimitiveParser::Integer),
        };
        let mut params = raw(&[
            ("color[R]", "100"),
            ("color[G]", "200"),
            ("color[B]", ""),
            ("colorR", "1"),
        ]);
        assert_eq!(
            parser.parse_parameter(&mut params).unwrap(),
            Some(json!({"R": 100, "G": 200}))
        );
        assert_eq!(params.names().collect::<Vec<_>>(), vec!["colorR"]);
    }

    #[test]
    fn test_deep_object_unrecognized_field() {
        let parser = ParameterParser::DeepObject {
            name: "o".to_string(),
            fields: FieldParsers::new().property("a", PrimitiveParser::Noop),
        };
        let mut params = raw(&[("o[z]", "1")]);
        let err = parser.parse_parameter(&mut params).unwrap_err();
        assert_eq!(err.message(), "Unrecognized key z");
    }
}
