//! Decoding raw request strings into JSON values
//!
//! - [`value`]: scalar decoders and the serialized-container dispatcher
//! - [`container`]: array, tuple and object decoders
//! - [`inference`]: decoder selection from a schema fragment
//! - [`parameter`]: per-style extraction from a location's raw values

pub mod container;
pub mod inference;
pub mod parameter;
pub mod value;

pub use container::{ArrayParser, DEFAULT_SEPARATOR, FieldParsers, ObjectParser, TupleParser};
pub use parameter::ParameterParser;
pub use value::{FormValueParser, PrimitiveParser, ValueParser};
