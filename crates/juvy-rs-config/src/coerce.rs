//! String coercion for overrides coming from env, argv and documents.

use crate::format::{BuiltinType, Coercer, Format};
use crate::value::{TypeTag, Value};
use regex::Regex;

/// How a raw string is converted for a given leaf.
#[derive(Clone)]
pub(crate) enum Coercion {
    Integer,
    Float,
    Boolean,
    /// Split on `,` into an array of strings.
    List,
    Json,
    Pattern,
    Custom(Coercer),
    /// Leave the string unchanged.
    Keep,
}

impl Coercion {
    /// Pick the coercion for a leaf's format, falling back to the default's
    /// type tag when the format does not imply one.
    pub(crate) fn for_leaf(format: &Format, default: &Value) -> Self {
        match format {
            Format::Integer | Format::Nat | Format::Port => Coercion::Integer,
            Format::Builtin(builtin) => match builtin {
                BuiltinType::Number => Coercion::Float,
                BuiltinType::Boolean => Coercion::Boolean,
                BuiltinType::Array => Coercion::List,
                BuiltinType::Object => Coercion::Json,
                BuiltinType::RegExp => Coercion::Pattern,
                BuiltinType::String => Coercion::Keep,
            },
            Format::Any => Coercion::Keep,
            Format::Custom(custom) => match custom.coercer() {
                Some(coercer) => Coercion::Custom(coercer.clone()),
                None => Self::for_tag(default.type_tag()),
            },
            Format::Enumeration(_) | Format::Inferred(_) => Self::for_tag(default.type_tag()),
        }
    }

    /// Untyped arrays and objects parse as JSON; only an explicit `array`
    /// format splits on commas.
    fn for_tag(tag: TypeTag) -> Self {
        match tag {
            TypeTag::Number => Coercion::Float,
            TypeTag::Boolean => Coercion::Boolean,
            TypeTag::Array | TypeTag::Object | TypeTag::RegExp => Coercion::Json,
            TypeTag::String | TypeTag::Null => Coercion::Keep,
        }
    }

    /// Convert `value` if it is a string; other values pass through.
    pub(crate) fn apply(&self, value: Value) -> Result<Value, String> {
        let Value::String(raw) = value else {
            return Ok(value);
        };
        match self {
            Coercion::Integer => Ok(parse_int(&raw)),
            Coercion::Float => Ok(parse_float(&raw)),
            Coercion::Boolean => Ok(Value::Bool(raw.to_lowercase() != "false")),
            Coercion::List => Ok(Value::Array(
                raw.split(',').map(|item| Value::String(item.to_string())).collect(),
            )),
            Coercion::Json => serde_json::from_str::<serde_json::Value>(&raw)
                .map(Value::from)
                .map_err(|err| err.to_string()),
            Coercion::Pattern => Regex::new(&raw)
                .map(Value::Regex)
                .map_err(|err| err.to_string()),
            Coercion::Custom(coercer) => coercer(&raw),
            Coercion::Keep => Ok(Value::String(raw)),
        }
    }
}

/// Parse the leading base-10 integer of `raw`; NaN when there is none.
fn parse_int(raw: &str) -> Value {
    let trimmed = raw.trim_start();
    let (sign, rest) = split_sign(trimmed);
    let digits: &str = &rest[..rest
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(rest.len())];
    if digits.is_empty() {
        return Value::Float(f64::NAN);
    }
    let literal = format!("{sign}{digits}");
    match literal.parse::<i64>() {
        Ok(number) => Value::Integer(number),
        Err(_) => Value::from_f64(literal.parse::<f64>().unwrap_or(f64::NAN)),
    }
}

/// Parse the leading decimal literal of `raw`; NaN when there is none.
fn parse_float(raw: &str) -> Value {
    let trimmed = raw.trim_start();
    let (sign, rest) = split_sign(trimmed);
    if rest.starts_with("Infinity") {
        let infinity = if sign == "-" {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
        return Value::Float(infinity);
    }

    let bytes = rest.as_bytes();
    let mut end = 0;
    let mut mantissa_digits = 0;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
        mantissa_digits += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        let mut fraction_end = end + 1;
        while fraction_end < bytes.len() && bytes[fraction_end].is_ascii_digit() {
            fraction_end += 1;
            mantissa_digits += 1;
        }
        end = fraction_end;
    }
    if mantissa_digits == 0 {
        return Value::Float(f64::NAN);
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exponent_end = end + 1;
        if exponent_end < bytes.len() && (bytes[exponent_end] == b'+' || bytes[exponent_end] == b'-')
        {
            exponent_end += 1;
        }
        let digits_start = exponent_end;
        while exponent_end < bytes.len() && bytes[exponent_end].is_ascii_digit() {
            exponent_end += 1;
        }
        if exponent_end > digits_start {
            end = exponent_end;
        }
    }

    let literal = format!("{sign}{}", &rest[..end]);
    Value::from_f64(literal.parse::<f64>().unwrap_or(f64::NAN))
}

fn split_sign(input: &str) -> (&str, &str) {
    match input.as_bytes().first() {
        Some(b'-') => ("-", &input[1..]),
        Some(b'+') => ("", &input[1..]),
        _ => ("", input),
    }
}
