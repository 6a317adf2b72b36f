//! Test helpers shared across Juvy crates.

pub mod fixtures;
pub mod sources;

pub use fixtures::{app_schema, server_schema};
pub use sources::{argv, env_vars, write_file};
