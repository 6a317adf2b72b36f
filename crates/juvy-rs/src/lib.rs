//! Public surface for Juvy.
//!
//! This crate re-exports the configuration engine and provides a small
//! initialization helper to keep consumer setup consistent.

/// Re-export for convenience.
pub use juvy_rs_config as config;
pub use juvy_rs_config::{
    Juvy, JuvyBuilder, JuvyError, SchemaError, SchemaLoader, ValidateOptions, ValidationError,
    ValidationMode, Value, load_schema,
};

#[inline]
/// Initialize logging using env_logger if the "logging" feature is enabled.
///
/// This is a no-op if the feature is not enabled. Binaries are still expected
/// to call this early in startup to ensure log output is wired up.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::try_init();
    }
}
