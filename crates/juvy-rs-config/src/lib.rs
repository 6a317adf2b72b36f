//! Schema-driven configuration engine.
//!
//! This crate normalizes a declarative schema, seeds a value tree from its
//! defaults, overlays environment variables and command-line arguments, and
//! validates the result. Documents and schema fragments can be loaded from
//! JSON5 files.

mod args;
mod coerce;
mod error;
mod format;
mod loader;
mod schema;
mod store;
mod validate;
mod value;

/// POSIX-style flag parsing used by the argument overlay.
pub use args::parse_args;
/// Public error types for normalization, access and loading.
pub use error::{JuvyError, SchemaError};
/// Format checks and the custom format registry.
pub use format::{BuiltinType, Coercer, CustomFormat, Format, FormatError, FormatRegistry, Predicate};
/// Schema fragment loading.
pub use loader::{SchemaLoader, load_schema};
/// Normalized schema types.
pub use schema::{Property, RESERVED_KEY, Schema, SchemaNode};
/// The configuration store.
pub use store::{Juvy, JuvyBuilder};
/// Validation options and results.
pub use validate::{
    ErrorSet, OutputSink, SENSITIVE_PLACEHOLDER, ValidateOptions, ValidationError, ValidationMode,
    validate,
};
/// Configuration values.
pub use value::{TypeTag, Value};
