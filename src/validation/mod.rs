//! Parameter and body validation
//!
//! A [`ParameterProcessor`] turns the raw values of one location into a
//! validated [`RequestParameter`](crate::core::RequestParameter); a
//! [`BodyProcessor`] does the same for the body of one content type. Both
//! delegate the schema check to a [`Validator`].

pub mod body;
pub mod dsl;
pub mod predicate;
pub mod processor;
pub mod validator;

pub use body::{BodyProcessor, FormKind};
pub use dsl::{BodySpec, ParameterSpec, Style};
pub use predicate::RequestPredicate;
pub use processor::ParameterProcessor;
pub use validator::{SchemaValidator, Validator};
