//! Schema normalization.
//!
//! Turns a nested JSON schema description into a tree of namespaces and
//! leaves, and indexes env/argv bindings and sensitive paths along the way.

use crate::coerce::Coercion;
use crate::error::SchemaError;
use crate::format::{self, Format, FormatError, FormatRegistry};
use crate::value::Value;
use log::debug;
use serde_json::Map;
use std::collections::{BTreeMap, BTreeSet};

/// Internal children marker; never valid as a property name.
pub const RESERVED_KEY: &str = "_juvyProperties";

/// Rule keys understood on a leaf.
const RULE_KEYS: &[&str] = &[
    "default",
    "format",
    "env",
    "arg",
    "sensitive",
    "nullable",
    "doc",
];

/// A namespace or a leaf in the normalized schema.
#[derive(Debug, Clone)]
pub enum SchemaNode {
    Namespace(BTreeMap<String, SchemaNode>),
    Leaf(Box<Property>),
}

/// A normalized schema leaf.
#[derive(Debug, Clone)]
pub struct Property {
    /// Full dotted path.
    pub path: String,
    pub default: Value,
    pub format: Format,
    pub env: Option<String>,
    pub arg: Option<String>,
    pub sensitive: bool,
    pub nullable: bool,
    pub doc: Option<String>,
}

impl Property {
    /// Compiled validator: nullable leaves accept null, everything else runs
    /// the format predicate.
    pub fn check(&self, value: &Value) -> Result<(), FormatError> {
        if self.nullable && value.is_null() {
            return Ok(());
        }
        self.format.check(value).map_err(|message| FormatError {
            path: self.path.clone(),
            message,
            value: value.clone(),
        })
    }

    pub(crate) fn coercion(&self) -> Coercion {
        Coercion::for_leaf(&self.format, &self.default)
    }

    fn to_json(&self) -> serde_json::Value {
        let mut map = Map::new();
        map.insert("default".to_string(), self.default.to_json());
        map.insert("format".to_string(), self.format.to_json());
        if let Some(env) = &self.env {
            map.insert("env".to_string(), env.clone().into());
        }
        if let Some(arg) = &self.arg {
            map.insert("arg".to_string(), arg.clone().into());
        }
        if self.sensitive {
            map.insert("sensitive".to_string(), true.into());
        }
        if self.nullable {
            map.insert("nullable".to_string(), true.into());
        }
        if let Some(doc) = &self.doc {
            map.insert("doc".to_string(), doc.clone().into());
        }
        serde_json::Value::Object(map)
    }
}

/// Normalized schema plus its binding indexes.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    root: BTreeMap<String, SchemaNode>,
    env: BTreeMap<String, Vec<String>>,
    args: BTreeMap<String, String>,
    sensitive: BTreeSet<String>,
}

impl Schema {
    /// Normalize a schema description using only the built-in formats.
    pub fn new(description: &serde_json::Value) -> Result<Self, SchemaError> {
        Self::with_formats(description, &FormatRegistry::default())
    }

    /// Normalize a schema description, resolving custom formats from `registry`.
    pub fn with_formats(
        description: &serde_json::Value,
        registry: &FormatRegistry,
    ) -> Result<Self, SchemaError> {
        let map = description.as_object().ok_or(SchemaError::NotAnObject)?;
        let mut schema = Schema::default();
        let mut root = BTreeMap::new();
        for (name, node) in map {
            let child = schema.normalize_node(name, node, name, registry)?;
            root.insert(name.clone(), child);
        }
        schema.root = root;
        debug!(
            "normalized schema (leaves={}, env={}, args={}, sensitive={})",
            schema.leaves().len(),
            schema.env.len(),
            schema.args.len(),
            schema.sensitive.len()
        );
        Ok(schema)
    }

    fn normalize_node(
        &mut self,
        name: &str,
        node: &serde_json::Value,
        full_name: &str,
        registry: &FormatRegistry,
    ) -> Result<SchemaNode, SchemaError> {
        if name == RESERVED_KEY {
            return Err(SchemaError::ReservedKeyword {
                path: full_name.to_string(),
            });
        }

        let rules = match node {
            serde_json::Value::Object(map) if !map.is_empty() && !map.contains_key("default") => {
                let mut children = BTreeMap::new();
                for (key, child) in map {
                    let child_path = join_path(full_name, key);
                    let normalized = self.normalize_node(key, child, &child_path, registry)?;
                    children.insert(key.clone(), normalized);
                }
                return Ok(SchemaNode::Namespace(children));
            }
            serde_json::Value::Object(map) if !map.is_empty() => map.clone(),
            shorthand => {
                let mut map = Map::new();
                map.insert("default".to_string(), shorthand.clone());
                map
            }
        };

        let property = self.normalize_leaf(&rules, full_name, registry)?;
        Ok(SchemaNode::Leaf(Box::new(property)))
    }

    fn normalize_leaf(
        &mut self,
        rules: &Map<String, serde_json::Value>,
        full_name: &str,
        registry: &FormatRegistry,
    ) -> Result<Property, SchemaError> {
        for key in rules.keys() {
            if !RULE_KEYS.contains(&key.as_str()) {
                debug!("ignoring unknown rule '{key}' on '{full_name}'");
            }
        }

        let default = rules
            .get("default")
            .map(Value::from)
            .unwrap_or(Value::Null);

        let env = optional_string(rules, "env", full_name)?;
        if let Some(env) = &env {
            self.env
                .entry(env.clone())
                .or_default()
                .push(full_name.to_string());
        }

        // Flags are parsed without their dashes, so `--port` binds as `port`.
        let arg = optional_string(rules, "arg", full_name)?
            .map(|arg| arg.trim_start_matches('-').to_string())
            .filter(|arg| !arg.is_empty());
        if let Some(arg) = &arg {
            if self.args.contains_key(arg) {
                return Err(SchemaError::DuplicateArgument {
                    path: full_name.to_string(),
                    arg: arg.clone(),
                });
            }
            self.args.insert(arg.clone(), full_name.to_string());
        }

        let sensitive = flag(rules, "sensitive", full_name)?;
        if sensitive {
            self.sensitive.insert(full_name.to_string());
        }
        let nullable = flag(rules, "nullable", full_name)?;
        let doc = optional_string(rules, "doc", full_name)?;
        let format = resolve_format(rules.get("format"), &default, full_name, registry)?;

        Ok(Property {
            path: full_name.to_string(),
            default,
            format,
            env,
            arg,
            sensitive,
            nullable,
            doc,
        })
    }

    /// Node at a dotted path.
    pub fn node(&self, path: &str) -> Option<&SchemaNode> {
        let mut segments = path.split('.');
        let mut current = self.root.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                SchemaNode::Namespace(children) => children.get(segment)?,
                SchemaNode::Leaf(_) => return None,
            };
        }
        Some(current)
    }

    /// Leaf at a dotted path; `None` for namespaces and unknown paths.
    pub fn property(&self, path: &str) -> Option<&Property> {
        match self.node(path)? {
            SchemaNode::Leaf(property) => Some(&**property),
            SchemaNode::Namespace(_) => None,
        }
    }

    pub fn root(&self) -> &BTreeMap<String, SchemaNode> {
        &self.root
    }

    /// Every leaf in path order.
    pub fn leaves(&self) -> Vec<&Property> {
        let mut leaves = Vec::new();
        collect_leaves(&self.root, &mut leaves);
        leaves
    }

    /// Env var name → bound paths.
    pub fn env_bindings(&self) -> &BTreeMap<String, Vec<String>> {
        &self.env
    }

    /// Argument name → bound path.
    pub fn arg_bindings(&self) -> &BTreeMap<String, String> {
        &self.args
    }

    pub fn is_sensitive(&self, path: &str) -> bool {
        self.sensitive.contains(path)
    }

    pub fn sensitive_paths(&self) -> &BTreeSet<String> {
        &self.sensitive
    }

    /// Export the normalized schema; namespaces nest under the children marker.
    pub fn to_json(&self) -> serde_json::Value {
        namespace_json(&self.root)
    }
}

fn collect_leaves<'a>(nodes: &'a BTreeMap<String, SchemaNode>, leaves: &mut Vec<&'a Property>) {
    for node in nodes.values() {
        match node {
            SchemaNode::Namespace(children) => collect_leaves(children, leaves),
            SchemaNode::Leaf(property) => leaves.push(&**property),
        }
    }
}

fn namespace_json(nodes: &BTreeMap<String, SchemaNode>) -> serde_json::Value {
    let children: Map<String, serde_json::Value> = nodes
        .iter()
        .map(|(name, node)| {
            let value = match node {
                SchemaNode::Namespace(children) => namespace_json(children),
                SchemaNode::Leaf(property) => property.to_json(),
            };
            (name.clone(), value)
        })
        .collect();
    let mut map = Map::new();
    map.insert(RESERVED_KEY.to_string(), serde_json::Value::Object(children));
    serde_json::Value::Object(map)
}

/// Resolve a leaf's format: built-in and predefined names, then literal
/// lists, then registered formats, then the default's type.
fn resolve_format(
    format: Option<&serde_json::Value>,
    default: &Value,
    path: &str,
    registry: &FormatRegistry,
) -> Result<Format, SchemaError> {
    match format {
        None | Some(serde_json::Value::Null) => Ok(Format::Inferred(default.type_tag())),
        Some(serde_json::Value::String(name)) => {
            if let Some(format) = format::predefined(name) {
                return Ok(format);
            }
            match registry.get(name) {
                Some(custom) => Ok(Format::Custom(custom.clone())),
                None => Err(SchemaError::UnknownFormat {
                    path: path.to_string(),
                    format: name.clone(),
                }),
            }
        }
        Some(serde_json::Value::Array(options)) => Ok(Format::Enumeration(
            options.iter().map(Value::from).collect(),
        )),
        Some(_) => Err(SchemaError::InvalidFormat {
            path: path.to_string(),
        }),
    }
}

/// Read an optional string rule; empty strings count as absent.
fn optional_string(
    rules: &Map<String, serde_json::Value>,
    key: &'static str,
    path: &str,
) -> Result<Option<String>, SchemaError> {
    match rules.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(value)) if value.is_empty() => Ok(None),
        Some(serde_json::Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(invalid_rule(path, key, "a string")),
    }
}

fn flag(
    rules: &Map<String, serde_json::Value>,
    key: &'static str,
    path: &str,
) -> Result<bool, SchemaError> {
    match rules.get(key) {
        None | Some(serde_json::Value::Null) => Ok(false),
        Some(serde_json::Value::Bool(value)) => Ok(*value),
        Some(_) => Err(invalid_rule(path, key, "a boolean")),
    }
}

fn invalid_rule(path: &str, key: &'static str, expected: &'static str) -> SchemaError {
    SchemaError::InvalidRule {
        path: path.to_string(),
        key,
        expected,
    }
}

/// Join nested paths for error messages and indexes.
pub(crate) fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::BuiltinType;
    use crate::value::TypeTag;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn objects_without_default_become_namespaces() {
        let schema = Schema::new(&json!({
            "db": {
                "host": { "default": "localhost", "env": "DB_HOST" },
                "pool": { "min": 1, "max": 10 },
            },
        }))
        .expect("schema");

        assert!(matches!(schema.node("db"), Some(SchemaNode::Namespace(_))));
        assert!(matches!(schema.node("db.pool"), Some(SchemaNode::Namespace(_))));
        let max = schema.property("db.pool.max").expect("leaf");
        assert_eq!(max.default, Value::Integer(10));
        assert!(matches!(max.format, Format::Inferred(TypeTag::Number)));
        assert!(schema.property("db").is_none());
    }

    #[test]
    fn shorthand_values_become_leaves() {
        let schema = Schema::new(&json!({
            "list": [1, 2],
            "empty": {},
            "nothing": null,
            "name": "app",
        }))
        .expect("schema");

        assert_eq!(
            schema.property("list").expect("list").default,
            Value::from(json!([1, 2]))
        );
        assert_eq!(schema.property("empty").expect("empty").default, Value::object());
        assert!(schema.property("nothing").expect("nothing").default.is_null());
        assert_eq!(schema.leaves().len(), 4);
    }

    #[test]
    fn reserved_keyword_is_rejected_with_path() {
        let err = Schema::new(&json!({ "outer": { "_juvyProperties": 1 } })).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::ReservedKeyword { ref path } if path == "outer._juvyProperties"
        ));
    }

    #[test]
    fn duplicate_argument_fails() {
        let err = Schema::new(&json!({
            "a": { "default": 1, "arg": "level" },
            "b": { "default": 2, "arg": "level" },
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateArgument { ref arg, .. } if arg == "level"));
    }

    #[test]
    fn argument_names_are_indexed_without_dashes() {
        let schema = Schema::new(&json!({
            "port": { "default": 80, "arg": "--port" },
            "verbose": { "default": false, "arg": "-v" },
        }))
        .expect("schema");
        assert_eq!(schema.arg_bindings().get("port").map(String::as_str), Some("port"));
        assert_eq!(schema.arg_bindings().get("v").map(String::as_str), Some("verbose"));
        assert_eq!(schema.property("port").unwrap().arg.as_deref(), Some("port"));

        let err = Schema::new(&json!({
            "a": { "default": 1, "arg": "level" },
            "b": { "default": 2, "arg": "--level" },
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateArgument { ref arg, .. } if arg == "level"));
    }

    #[test]
    fn env_variables_may_bind_many_paths() {
        let schema = Schema::new(&json!({
            "a": { "default": "", "env": "SHARED" },
            "b": { "default": "", "env": "SHARED" },
        }))
        .expect("schema");
        assert_eq!(
            schema.env_bindings().get("SHARED"),
            Some(&vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn format_resolution_covers_every_shape() {
        let mut registry = FormatRegistry::new();
        registry.add_format("even", |value| match value.as_i64() {
            Some(number) if number % 2 == 0 => Ok(()),
            _ => Err("must be even".to_string()),
        });
        let schema = Schema::with_formats(
            &json!({
                "port": { "default": 80, "format": "port" },
                "ratio": { "default": 0.5, "format": "Number" },
                "mode": { "default": "a", "format": ["a", "b"] },
                "count": { "default": 2, "format": "even" },
                "anything": { "default": null, "format": "*" },
            }),
            &registry,
        )
        .expect("schema");

        assert!(matches!(schema.property("port").unwrap().format, Format::Port));
        assert!(matches!(
            schema.property("ratio").unwrap().format,
            Format::Builtin(BuiltinType::Number)
        ));
        assert!(matches!(
            schema.property("mode").unwrap().format,
            Format::Enumeration(_)
        ));
        assert!(matches!(
            schema.property("count").unwrap().format,
            Format::Custom(_)
        ));
        assert!(matches!(schema.property("anything").unwrap().format, Format::Any));
    }

    #[test]
    fn unknown_and_invalid_formats_fail() {
        let err = Schema::new(&json!({ "a": { "default": 1, "format": "email" } })).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownFormat { ref format, .. } if format == "email"));

        let err = Schema::new(&json!({ "a": { "default": 1, "format": 5 } })).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidFormat { ref path } if path == "a"));
    }

    #[test]
    fn nullable_leaf_accepts_null() {
        let schema = Schema::new(&json!({
            "token": { "default": null, "format": "String", "nullable": true, "sensitive": true },
        }))
        .expect("schema");
        let token = schema.property("token").expect("token");
        assert!(token.check(&Value::Null).is_ok());
        let err = token.check(&Value::Integer(1)).unwrap_err();
        assert_eq!(err.path, "token");
        assert_eq!(err.message, "must be of type String");
        assert!(schema.is_sensitive("token"));
    }

    #[test]
    fn export_nests_children_under_marker() {
        let schema = Schema::new(&json!({
            "server": { "port": { "default": 3000, "format": "port", "env": "PORT" } },
        }))
        .expect("schema");
        assert_eq!(
            schema.to_json(),
            json!({
                "_juvyProperties": {
                    "server": {
                        "_juvyProperties": {
                            "port": { "default": 3000, "format": "port", "env": "PORT" }
                        }
                    }
                }
            })
        );
    }
}
