//! Property tests for the value decoders.
//!
//! These tests check decoding invariants over generated raw strings
//! rather than hand-picked samples.

use proptest::prelude::*;
use request_validator::prelude::*;

proptest! {
    /// Property: a serialized integer array decodes to the joined integers
    #[test]
    fn proptest_serialized_integer_array(items in prop::collection::vec(any::<i64>(), 1..16)) {
        let serialized = items
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let parsed = ArrayParser::new(PrimitiveParser::Integer).parse(&serialized).unwrap();
        prop_assert_eq!(parsed, json!(items));
    }

    /// Property: the separator choice does not change the decoded items
    #[test]
    fn proptest_separator_independence(
        items in prop::collection::vec("[a-z0-9]{1,8}", 1..10),
        separator in prop_oneof![Just(","), Just("|"), Just(" "), Just(";")],
    ) {
        let parser = ArrayParser::with_separator(PrimitiveParser::Noop, separator);
        let parsed = parser.parse(&items.join(separator)).unwrap();
        prop_assert_eq!(parsed, json!(items));
    }

    /// Property: the noop decoder never alters a value
    #[test]
    fn proptest_noop_is_identity(raw in ".*") {
        prop_assert_eq!(PrimitiveParser::Noop.parse(&raw).unwrap(), Value::String(raw.clone()));
    }

    /// Property: integer decoding agrees with the standard parser
    #[test]
    fn proptest_integer_matches_std(raw in "-?[0-9]{0,20}|[a-z]{1,4}") {
        let parsed = PrimitiveParser::Integer.parse(&raw);
        match raw.parse::<i64>() {
            Ok(n) => prop_assert_eq!(parsed.unwrap(), json!(n)),
            Err(_) => prop_assert!(parsed.is_err()),
        }
    }

    /// Property: key/value pairs decode to an object with the same entries
    #[test]
    fn proptest_serialized_object(
        entries in prop::collection::btree_map("[a-z]{1,6}", any::<u32>(), 1..8),
    ) {
        let serialized = entries
            .iter()
            .map(|(k, v)| format!("{},{}", k, v))
            .collect::<Vec<_>>()
            .join(",");
        let parser = ObjectParser::new(
            FieldParsers::new().additional_properties(Some(PrimitiveParser::Integer)),
        );
        let parsed = parser.parse(&serialized).unwrap();
        let expected: serde_json::Map<String, Value> =
            entries.iter().map(|(k, v)| (k.clone(), json!(v))).collect();
        prop_assert_eq!(parsed, Value::Object(expected));
    }

    /// Property: decoding a parameter consumes exactly its key
    #[test]
    fn proptest_parameter_consumes_only_its_key(
        value in "[0-9]{1,6}",
        other in "[a-z]{1,6}",
    ) {
        let parser = ParameterParser::Single {
            name: "id".to_string(),
            parser: PrimitiveParser::Integer.into(),
        };
        let mut raw = RawParameters::from_pairs([("id", value.as_str()), ("other", other.as_str())]);
        prop_assert!(parser.parse_parameter(&mut raw).unwrap().is_some());
        prop_assert!(!raw.contains("id"));
        prop_assert_eq!(raw.first("other"), Some(other.as_str()));
        prop_assert_eq!(parser.parse_parameter(&mut raw).unwrap(), None);
    }

    /// Property: processing the same raw values twice yields equal parameters
    #[test]
    fn proptest_processor_idempotence(items in prop::collection::vec(0i64..1000, 1..8)) {
        let processor = param("ids", array_schema().items(int_schema()))
            .into_processor(ParameterLocation::Query, &JsonSchemaParser::new())
            .unwrap();
        let serialized = items
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let raw = RawParameters::from_pairs([("ids", serialized.as_str())]);

        let first = tokio_test::block_on(processor.process(&mut raw.clone()).resolve()).unwrap();
        let second = tokio_test::block_on(processor.process(&mut raw.clone()).resolve()).unwrap();
        prop_assert_eq!(first.clone(), second);
        prop_assert_eq!(first.unwrap().into_value(), json!(items));
    }

    /// Property: boolean and float arrays survive the comma round trip
    #[test]
    fn proptest_serialized_mixed_primitives(
        flags in prop::collection::vec(any::<bool>(), 1..8),
        numbers in prop::collection::vec(-1.0e6f64..1.0e6, 1..8),
    ) {
        let joined = |values: Vec<String>| values.join(",");
        let flags_raw = joined(flags.iter().map(bool::to_string).collect());
        let numbers_raw = joined(numbers.iter().map(f64::to_string).collect());

        let parsed = ArrayParser::new(PrimitiveParser::Boolean).parse(&flags_raw).unwrap();
        prop_assert_eq!(parsed, json!(flags));
        let parsed = ArrayParser::new(PrimitiveParser::Float).parse(&numbers_raw).unwrap();
        prop_assert_eq!(parsed, json!(numbers));
    }
}
