//! Leaf formats: built-in kinds, enumerations and registered predicates.

use crate::value::{TypeTag, Value};
use log::warn;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Predicate backing a custom format. `Err` carries the failure message.
pub type Predicate = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// Converts a raw string override into a value for a custom format.
pub type Coercer = Arc<dyn Fn(&str) -> Result<Value, String> + Send + Sync>;

/// Built-in type names accepted as formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinType {
    Object,
    Array,
    String,
    Number,
    Boolean,
    RegExp,
}

impl BuiltinType {
    /// Resolve a format name. Both `Number` and `number` spellings are accepted.
    pub fn from_name(name: &str) -> Option<Self> {
        let builtin = match name {
            "Object" | "object" => BuiltinType::Object,
            "Array" | "array" => BuiltinType::Array,
            "String" | "string" => BuiltinType::String,
            "Number" | "number" => BuiltinType::Number,
            "Boolean" | "boolean" => BuiltinType::Boolean,
            "RegExp" | "regexp" => BuiltinType::RegExp,
            _ => return None,
        };
        Some(builtin)
    }

    pub fn tag(self) -> TypeTag {
        match self {
            BuiltinType::Object => TypeTag::Object,
            BuiltinType::Array => TypeTag::Array,
            BuiltinType::String => TypeTag::String,
            BuiltinType::Number => TypeTag::Number,
            BuiltinType::Boolean => TypeTag::Boolean,
            BuiltinType::RegExp => TypeTag::RegExp,
        }
    }

    pub fn name(self) -> &'static str {
        self.tag().name()
    }
}

/// A named, user-registered format.
#[derive(Clone)]
pub struct CustomFormat {
    name: String,
    predicate: Predicate,
    coerce: Option<Coercer>,
}

impl CustomFormat {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn coercer(&self) -> Option<&Coercer> {
        self.coerce.as_ref()
    }
}

impl fmt::Debug for CustomFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomFormat")
            .field("name", &self.name)
            .field("coerce", &self.coerce.is_some())
            .finish()
    }
}

/// Validator kind attached to every schema leaf.
#[derive(Debug, Clone)]
pub enum Format {
    /// `*`: accepts anything.
    Any,
    Integer,
    /// Non-negative integer.
    Nat,
    /// Integer in `0..=65535`.
    Port,
    /// Exact runtime type check.
    Builtin(BuiltinType),
    /// Membership in a fixed list of literals.
    Enumeration(Vec<Value>),
    Custom(CustomFormat),
    /// No declared format: the value must carry the default's type tag.
    Inferred(TypeTag),
}

impl Format {
    /// Run the predicate for this format.
    pub fn check(&self, value: &Value) -> Result<(), String> {
        match self {
            Format::Any => Ok(()),
            Format::Integer => ensure(value.is_integer(), "must be an integer"),
            Format::Nat => ensure(
                value.is_integer() && value.as_f64().is_some_and(|n| n >= 0.0),
                "must be a positive integer",
            ),
            Format::Port => ensure(
                value.is_integer()
                    && value
                        .as_f64()
                        .is_some_and(|n| (0.0..=65535.0).contains(&n)),
                "ports must be within range 0 - 65535",
            ),
            Format::Builtin(builtin) => {
                if value.type_tag() == builtin.tag() {
                    Ok(())
                } else {
                    Err(format!("must be of type {}", builtin.name()))
                }
            }
            Format::Enumeration(options) => {
                if options.contains(value) {
                    Ok(())
                } else {
                    let rendered: Vec<serde_json::Value> =
                        options.iter().map(Value::to_json).collect();
                    Err(format!(
                        "must be one of the possible values: {}",
                        serde_json::Value::Array(rendered)
                    ))
                }
            }
            Format::Custom(custom) => (custom.predicate)(value),
            Format::Inferred(tag) => {
                if value.type_tag() == *tag {
                    Ok(())
                } else {
                    Err(format!("should be of type {}", tag.name()))
                }
            }
        }
    }

    /// Format as exported in the schema JSON.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Format::Any => "*".into(),
            Format::Integer => "integer".into(),
            Format::Nat => "nat".into(),
            Format::Port => "port".into(),
            Format::Builtin(builtin) => builtin.name().to_lowercase().into(),
            Format::Enumeration(options) => {
                serde_json::Value::Array(options.iter().map(Value::to_json).collect())
            }
            Format::Custom(custom) => custom.name.clone().into(),
            Format::Inferred(tag) => tag.name().to_lowercase().into(),
        }
    }
}

fn ensure(condition: bool, message: &str) -> Result<(), String> {
    if condition {
        Ok(())
    } else {
        Err(message.to_string())
    }
}

/// Names resolved before the registry is consulted.
const PREDEFINED: &[&str] = &["*", "integer", "nat", "port"];

/// Resolve a string format against the predefined kinds and built-in types.
pub(crate) fn predefined(name: &str) -> Option<Format> {
    if let Some(builtin) = BuiltinType::from_name(name) {
        return Some(Format::Builtin(builtin));
    }
    match name {
        "*" => Some(Format::Any),
        "integer" => Some(Format::Integer),
        "nat" => Some(Format::Nat),
        "port" => Some(Format::Port),
        _ => None,
    }
}

/// Registry of custom formats consulted during schema normalization.
#[derive(Clone, Default)]
pub struct FormatRegistry {
    formats: HashMap<String, CustomFormat>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a predicate under `name`.
    ///
    /// Built-in names always resolve first, so registering one has no effect.
    pub fn add_format<F>(&mut self, name: impl Into<String>, predicate: F) -> &mut Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.insert(name.into(), Arc::new(predicate), None)
    }

    /// Register a predicate together with a coercion for string overrides.
    pub fn add_format_with_coerce<F, C>(
        &mut self,
        name: impl Into<String>,
        predicate: F,
        coerce: C,
    ) -> &mut Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
        C: Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.insert(name.into(), Arc::new(predicate), Some(Arc::new(coerce)))
    }

    pub fn get(&self, name: &str) -> Option<&CustomFormat> {
        self.formats.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    fn insert(&mut self, name: String, predicate: Predicate, coerce: Option<Coercer>) -> &mut Self {
        if PREDEFINED.contains(&name.as_str()) || BuiltinType::from_name(&name).is_some() {
            warn!("custom format '{name}' is shadowed by a built-in format");
        }
        self.formats.insert(
            name.clone(),
            CustomFormat {
                name,
                predicate,
                coerce,
            },
        );
        self
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.formats.keys().collect();
        names.sort();
        f.debug_struct("FormatRegistry")
            .field("formats", &names)
            .finish()
    }
}

/// A value failed its leaf's format.
#[derive(Debug, Clone, Error)]
#[error("{path}: {message}")]
pub struct FormatError {
    /// Full dotted path of the leaf.
    pub path: String,
    pub message: String,
    /// The offending value.
    pub value: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn port_accepts_only_integers_in_range() {
        assert!(Format::Port.check(&Value::Integer(0)).is_ok());
        assert!(Format::Port.check(&Value::Integer(65535)).is_ok());
        assert_eq!(
            Format::Port.check(&Value::Integer(70000)).unwrap_err(),
            "ports must be within range 0 - 65535"
        );
        assert!(Format::Port.check(&Value::Float(80.5)).is_err());
        assert!(Format::Port.check(&Value::from("80")).is_err());
    }

    #[test]
    fn nat_rejects_negatives_and_nan() {
        assert!(Format::Nat.check(&Value::Integer(3)).is_ok());
        assert!(Format::Nat.check(&Value::Integer(-1)).is_err());
        assert!(Format::Nat.check(&Value::Float(f64::NAN)).is_err());
    }

    #[test]
    fn builtin_checks_exact_type() {
        let format = Format::Builtin(BuiltinType::Array);
        assert!(format.check(&Value::Array(Vec::new())).is_ok());
        assert_eq!(
            format.check(&Value::object()).unwrap_err(),
            "must be of type Array"
        );
    }

    #[test]
    fn enumeration_lists_options_on_failure() {
        let format = Format::Enumeration(vec![Value::from("production"), Value::from("test")]);
        assert!(format.check(&Value::from("test")).is_ok());
        assert_eq!(
            format.check(&Value::from("staging")).unwrap_err(),
            r#"must be one of the possible values: ["production","test"]"#
        );
    }

    #[test]
    fn inferred_compares_type_tags() {
        let format = Format::Inferred(TypeTag::Number);
        assert!(format.check(&Value::Float(1.5)).is_ok());
        assert_eq!(
            format.check(&Value::Bool(true)).unwrap_err(),
            "should be of type Number"
        );
    }

    #[test]
    fn registry_resolves_custom_predicates() {
        let mut registry = FormatRegistry::new();
        registry.add_format("lowercase", |value| match value.as_str() {
            Some(text) if text == text.to_lowercase() => Ok(()),
            _ => Err("must be a lowercase string".to_string()),
        });

        let custom = registry.get("lowercase").expect("registered").clone();
        let format = Format::Custom(custom);
        assert!(format.check(&Value::from("abc")).is_ok());
        assert!(format.check(&Value::from("ABC")).is_err());
        assert_eq!(format.to_json(), serde_json::json!("lowercase"));
    }
}
