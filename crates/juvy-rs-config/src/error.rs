//! Error types for schema normalization, value access and loading.

use crate::validate::ValidationError;
use thiserror::Error;

/// Errors raised while normalizing a schema description.
///
/// These are fatal: a store is never constructed from a schema that fails
/// normalization.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The description root is not an object.
    #[error("schema description must be an object")]
    NotAnObject,
    /// A property uses the reserved children marker as its name.
    #[error("'{path}': '_juvyProperties' is reserved word of juvy")]
    ReservedKeyword { path: String },
    /// Two leaves bind the same command-line argument.
    #[error("'{path}' reuses a command-line argument: {arg}")]
    DuplicateArgument { path: String, arg: String },
    /// A string format names neither a built-in nor a registered format.
    #[error("'{path}' uses an unknown format type: {format}")]
    UnknownFormat { path: String, format: String },
    /// The format is neither a string, a list of values nor null.
    #[error("'{path}': `format` must be a function or a known format type")]
    InvalidFormat { path: String },
    /// A rule key holds a value of the wrong shape.
    #[error("'{path}': `{key}` must be {expected}")]
    InvalidRule {
        path: String,
        key: &'static str,
        expected: &'static str,
    },
}

/// Errors returned by the configuration store.
#[derive(Debug, Error)]
pub enum JuvyError {
    /// Schema normalization failed.
    #[error("invalid schema: {0}")]
    Schema(#[from] SchemaError),
    /// A dotted path does not resolve in the value tree or schema.
    #[error("cannot find configuration param '{path}'")]
    NotFound { path: String },
    /// A string override could not be converted to the leaf's format.
    #[error("cannot coerce configuration param '{path}': {message}")]
    Coerce { path: String, message: String },
    /// An intermediate path segment holds a non-object value.
    #[error("cannot set configuration param '{path}': '{segment}' is not an object")]
    NotAnObject { path: String, segment: String },
    /// A configuration document has the wrong shape.
    #[error("invalid config document: {0}")]
    InvalidDocument(String),
    /// A schema fragment on disk has the wrong shape.
    #[error("invalid schema fragment at {path}: {message}")]
    InvalidFragment { path: String, message: String },
    /// Validation found blocking errors.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Reading a config or schema file failed.
    #[error("failed to read config: {0}")]
    ReadFailed(#[from] std::io::Error),
    /// Parsing a JSON5 document failed.
    #[error("failed to parse config: {0}")]
    ParseFailed(#[from] json5::Error),
    /// Converting JSON values failed.
    #[error("failed to decode config: {0}")]
    DecodeFailed(#[from] serde_json::Error),
    /// Walking a schema directory failed.
    #[error("failed to walk schema directory: {0}")]
    WalkFailed(#[from] walkdir::Error),
}
