//! Full-tree validation of a value tree against a normalized schema.

use crate::format::{BuiltinType, Format, FormatError};
use crate::schema::{Property, Schema};
use crate::value::{TypeTag, Value};
use std::fmt;
use thiserror::Error;

/// Replacement shown for sensitive values in error output.
pub const SENSITIVE_PLACEHOLDER: &str = "[Sensitive]";

/// How undeclared instance paths are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationMode {
    /// Undeclared paths produce a warning only.
    #[default]
    Warn,
    /// Undeclared paths fail validation.
    Strict,
}

/// Sink receiving warning text in warn mode.
pub type OutputSink = Box<dyn Fn(&str)>;

/// Options for [`crate::Juvy::validate`].
#[derive(Default)]
pub struct ValidateOptions {
    pub mode: ValidationMode,
    /// Receives warnings instead of the `log` warn level when set.
    pub output: Option<OutputSink>,
}

impl ValidateOptions {
    pub fn warn() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self {
            mode: ValidationMode::Strict,
            output: None,
        }
    }

    /// Route warnings to `output`.
    pub fn with_output(mut self, output: impl Fn(&str) + 'static) -> Self {
        self.output = Some(Box::new(output));
        self
    }
}

impl fmt::Debug for ValidateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidateOptions")
            .field("mode", &self.mode)
            .field("output", &self.output.is_some())
            .finish()
    }
}

/// Findings of one validation pass.
#[derive(Debug, Clone, Default)]
pub struct ErrorSet {
    /// Instance paths absent from the schema.
    pub undeclared: Vec<String>,
    pub invalid_type: Vec<FormatError>,
    /// Schema paths absent from the instance.
    pub missing: Vec<String>,
}

impl ErrorSet {
    pub fn is_empty(&self) -> bool {
        self.undeclared.is_empty() && self.invalid_type.is_empty() && self.missing.is_empty()
    }

    /// Whether these findings fail validation in `mode`.
    pub fn is_blocking(&self, mode: ValidationMode) -> bool {
        !self.invalid_type.is_empty()
            || !self.missing.is_empty()
            || (mode == ValidationMode::Strict && !self.undeclared.is_empty())
    }

    /// Render the invalid-type bucket, redacting sensitive values.
    pub fn render_invalid_type(&self, schema: &Schema) -> String {
        self.invalid_type
            .iter()
            .map(|err| {
                let value = if schema.is_sensitive(&err.path) {
                    serde_json::Value::String(SENSITIVE_PLACEHOLDER.to_string())
                } else {
                    err.value.to_json()
                };
                format!("{}: {}: value was {}", err.path, err.message, value)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn render_missing(&self) -> String {
        self.missing
            .iter()
            .map(|path| {
                format!(
                    "configuration param '{path}' missing from config, did you override its parent?"
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn render_undeclared(&self) -> String {
        self.undeclared
            .iter()
            .map(|path| format!("configuration param '{path}' not declared in the schema"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Aggregated validation failure.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ValidationError {
    errors: ErrorSet,
    message: String,
}

impl ValidationError {
    /// Build the aggregated error: invalid types, then missing paths, then
    /// (strict only) undeclared paths, one finding per line.
    pub fn new(errors: ErrorSet, schema: &Schema, mode: ValidationMode) -> Self {
        let mut sections = vec![errors.render_invalid_type(schema), errors.render_missing()];
        if mode == ValidationMode::Strict {
            sections.push(errors.render_undeclared());
        }
        let message = sections
            .into_iter()
            .filter(|section| !section.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        Self { errors, message }
    }

    pub fn errors(&self) -> &ErrorSet {
        &self.errors
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Check every declared path of `schema` against `instance`.
///
/// Undeclared paths are always collected; whether they block is decided by
/// the caller through [`ErrorSet::is_blocking`].
pub fn validate(instance: &Value, schema: &Schema) -> ErrorSet {
    let mut flat_instance = instance.flatten();
    let mut errors = ErrorSet::default();

    for property in schema.leaves() {
        let name = &property.path;
        let item = match flat_instance.remove(name) {
            Some(item) => item,
            None => {
                // An object-valued leaf with children is flattened away;
                // pull it back out of the tree.
                let recovered = match property.default.type_tag() {
                    TypeTag::Object | TypeTag::Null => instance.lookup(name).cloned(),
                    _ => None,
                };
                match recovered {
                    Some(item) => item,
                    None => {
                        errors.missing.push(name.clone());
                        continue;
                    }
                }
            }
        };

        if owns_descendants(property) {
            let prefix = format!("{name}.");
            flat_instance.retain(|key, _| !key.starts_with(&prefix));
        }

        if let Err(err) = property.check(&item) {
            errors.invalid_type.push(err);
        }
    }

    errors.undeclared = flat_instance.into_keys().collect();
    errors
}

/// Object-typed leaves account for every path below them.
fn owns_descendants(property: &Property) -> bool {
    matches!(property.format, Format::Builtin(BuiltinType::Object))
        || matches!(
            property.default.type_tag(),
            TypeTag::Object | TypeTag::Null
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new(&json!({
            "port": { "default": 3000, "format": "port" },
            "db": {
                "password": { "default": "secret", "sensitive": true },
                "options": { "default": { "ssl": true }, "format": "object" },
            },
        }))
        .expect("schema")
    }

    #[test]
    fn clean_instance_has_no_findings() {
        let instance = Value::from(json!({
            "port": 3000,
            "db": { "password": "x", "options": { "ssl": false, "extra": 1 } },
        }));
        let errors = validate(&instance, &schema());
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn absent_leaf_is_reported_missing() {
        let instance = Value::from(json!({
            "db": { "password": "x", "options": {} },
        }));
        let errors = validate(&instance, &schema());
        assert_eq!(errors.missing, vec!["port".to_string()]);
        assert!(errors.is_blocking(ValidationMode::Warn));
    }

    #[test]
    fn extra_paths_are_undeclared() {
        let instance = Value::from(json!({
            "port": 3000,
            "db": { "password": "x", "options": {} },
            "extra": { "flag": true },
        }));
        let errors = validate(&instance, &schema());
        assert_eq!(errors.undeclared, vec!["extra.flag".to_string()]);
        assert!(!errors.is_blocking(ValidationMode::Warn));
        assert!(errors.is_blocking(ValidationMode::Strict));
    }

    #[test]
    fn sensitive_values_are_redacted_in_messages() {
        let instance = Value::from(json!({
            "port": 70000,
            "db": { "password": 12345, "options": {} },
        }));
        let schema = schema();
        let errors = validate(&instance, &schema);
        let rendered = ValidationError::new(errors, &schema, ValidationMode::Warn);

        let lines: Vec<&str> = rendered.message().lines().collect();
        assert_eq!(
            lines,
            vec![
                "db.password: should be of type String: value was \"[Sensitive]\"",
                "port: ports must be within range 0 - 65535: value was 70000",
            ]
        );
        assert!(!rendered.message().contains("12345"));
    }

    #[test]
    fn strict_message_appends_undeclared_lines() {
        let instance = Value::from(json!({
            "db": { "password": "x", "options": {} },
            "stray": 1,
        }));
        let schema = schema();
        let errors = validate(&instance, &schema);
        let rendered = ValidationError::new(errors, &schema, ValidationMode::Strict);
        assert_eq!(
            rendered.message(),
            "configuration param 'port' missing from config, did you override its parent?\n\
             configuration param 'stray' not declared in the schema"
        );
    }
}
