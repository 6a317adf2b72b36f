//! Dynamic value tree held by the configuration store.

use regex::Regex;
use serde_json::Number;
use std::collections::BTreeMap;
use std::fmt;

/// Largest integer a double represents exactly (2^53).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// A configuration value.
///
/// Integers and floats share the `number` type tag; integral floats produced
/// by coercion are normalized to [`Value::Integer`].
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
    /// A compiled pattern produced by the `regexp` format.
    Regex(Regex),
}

/// Runtime type tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
    RegExp,
}

impl TypeTag {
    /// Display name used in validation messages.
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Null => "Null",
            TypeTag::Boolean => "Boolean",
            TypeTag::Number => "Number",
            TypeTag::String => "String",
            TypeTag::Array => "Array",
            TypeTag::Object => "Object",
            TypeTag::RegExp => "RegExp",
        }
    }
}

impl Value {
    /// Build a number, normalizing integral doubles to integers.
    pub fn from_f64(number: f64) -> Self {
        if number.is_finite() && number.fract() == 0.0 && number.abs() < MAX_SAFE_INTEGER {
            Value::Integer(number as i64)
        } else {
            Value::Float(number)
        }
    }

    /// Empty object value.
    pub fn object() -> Self {
        Value::Object(BTreeMap::new())
    }

    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Null => TypeTag::Null,
            Value::Bool(_) => TypeTag::Boolean,
            Value::Integer(_) | Value::Float(_) => TypeTag::Number,
            Value::String(_) => TypeTag::String,
            Value::Array(_) => TypeTag::Array,
            Value::Object(_) => TypeTag::Object,
            Value::Regex(_) => TypeTag::RegExp,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(value) => Some(*value as f64),
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_regex(&self) -> Option<&Regex> {
        match self {
            Value::Regex(regex) => Some(regex),
            _ => None,
        }
    }

    /// True for integers and for floats with no fractional part.
    pub fn is_integer(&self) -> bool {
        match self {
            Value::Integer(_) => true,
            Value::Float(value) => value.is_finite() && value.fract() == 0.0,
            _ => false,
        }
    }

    /// Resolve a dotted path. The empty path resolves to `self`.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return Some(self);
        }
        let mut current = self;
        for segment in path.split('.') {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Flatten nested objects into dotted-path entries.
    ///
    /// Arrays, regexes and scalars are leaves. Empty objects are kept as
    /// leaves so they stay visible to validation.
    pub fn flatten(&self) -> BTreeMap<String, Value> {
        let mut entries = BTreeMap::new();
        if let Value::Object(map) = self {
            for (key, value) in map {
                flatten_into(key.clone(), value, &mut entries);
            }
        }
        entries
    }

    /// Convert to JSON. Regexes render as their pattern; non-finite floats
    /// become null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(value) => serde_json::Value::Bool(*value),
            Value::Integer(value) => serde_json::Value::Number((*value).into()),
            Value::Float(value) => Number::from_f64(*value)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(value) => serde_json::Value::String(value.clone()),
            Value::Array(values) => {
                serde_json::Value::Array(values.iter().map(Value::to_json).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
            Value::Regex(regex) => serde_json::Value::String(regex.as_str().to_string()),
        }
    }
}

fn flatten_into(path: String, value: &Value, entries: &mut BTreeMap<String, Value>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                flatten_into(format!("{path}.{key}"), child, entries);
            }
        }
        _ => {
            entries.insert(path, value.clone());
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
                integer_equals_float(*a, *b)
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Regex(a), Value::Regex(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

/// Exact comparison: the float must be integral and within `i64` range.
fn integer_equals_float(integer: i64, float: f64) -> bool {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    float.fract() == 0.0 && (-LIMIT..LIMIT).contains(&float) && float as i64 == integer
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(value) => Value::Bool(value),
            serde_json::Value::Number(number) => match number.as_i64() {
                Some(value) => Value::Integer(value),
                None => Value::from_f64(number.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(value) => Value::String(value),
            serde_json::Value::Array(values) => {
                Value::Array(values.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&serde_json::Value> for Value {
    fn from(value: &serde_json::Value) -> Self {
        Value::from(value.clone())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value.into())
    }
}

impl From<u16> for Value {
    fn from(value: u16) -> Self {
        Value::Integer(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::from_f64(value)
    }
}

impl From<Regex> for Value {
    fn from(value: Regex) -> Self {
        Value::Regex(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::Array(values)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Object(map)
    }
}
