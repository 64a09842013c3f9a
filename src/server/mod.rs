//! Server integration for validation handlers
//!
//! This module provides:
//! - `ValidationHandlerBuilder` to declare parameters, bodies and predicates
//! - `ValidationHandler`, the per-route orchestrator
//! - `ValidationLayer`, running a handler in front of an axum route

pub mod builder;
pub mod context;
pub mod handler;
pub mod layer;

pub use builder::ValidationHandlerBuilder;
pub use context::{FileUpload, RequestBody, RequestContext};
pub use handler::ValidationHandler;
pub use layer::{ValidationLayer, ValidationService};
