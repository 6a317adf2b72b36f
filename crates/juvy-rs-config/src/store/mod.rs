//! The configuration store: seeded defaults, env and argv overlays, and
//! dotted-path accessors.
//!
//! Precedence (low -> high): schema defaults, environment variables,
//! command-line arguments. Documents loaded later sit between the defaults
//! and the overlays, because the overlays are re-applied after every load.


use crate::args::parse_args;
use crate::error::JuvyError;
use crate::format::FormatRegistry;
use crate::schema::{Schema, SchemaNode};
use crate::validate::{self, ValidateOptions, ValidationError, ValidationMode};
use crate::value::Value;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

/// Parent segments that are never written through.
const DENIED_SEGMENTS: &[&str] = &["__proto__", "constructor", "prototype"];

/// Live configuration handle.
#[derive(Debug, Clone)]
pub struct Juvy {
    schema: Schema,
    instance: Value,
    /// Values of bound environment variables captured at construction.
    env_values: BTreeMap<String, String>,
    /// Parsed command-line flags captured at construction.
    arg_values: BTreeMap<String, Option<String>>,
}

/// Builder for [`Juvy`] with injectable environment and argument sources.
#[derive(Debug)]
pub struct JuvyBuilder {
    description: serde_json::Value,
    formats: FormatRegistry,
    env: Option<BTreeMap<String, String>>,
    args: Option<Vec<String>>,
}

impl JuvyBuilder {
    fn new(description: serde_json::Value) -> Self {
        Self {
            description,
            formats: FormatRegistry::default(),
            env: None,
            args: None,
        }
    }

    /// Use `formats` to resolve custom format names.
    pub fn formats(mut self, formats: FormatRegistry) -> Self {
        self.formats = formats;
        self
    }

    /// Register one custom format.
    pub fn format<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.formats.add_format(name, predicate);
        self
    }

    /// Register one custom format that also converts string overrides.
    pub fn format_with_coerce<F, C>(
        mut self,
        name: impl Into<String>,
        predicate: F,
        coerce: C,
    ) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
        C: Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.formats.add_format_with_coerce(name, predicate, coerce);
        self
    }

    /// Read overlays from these variables instead of the process environment.
    pub fn env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = Some(
            vars.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        );
        self
    }

    /// Parse flags from these arguments instead of the process arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// Normalize the schema, seed defaults and apply the overlays.
    pub fn build(self) -> Result<Juvy, JuvyError> {
        let schema = Schema::with_formats(&self.description, &self.formats)?;

        let env_values: BTreeMap<String, String> = match self.env {
            Some(vars) => schema
                .env_bindings()
                .keys()
                .filter_map(|name| vars.get(name).map(|value| (name.clone(), value.clone())))
                .collect(),
            None => schema
                .env_bindings()
                .keys()
                .filter_map(|name| process_env(name).map(|value| (name.clone(), value)))
                .collect(),
        };
        let args = self
            .args
            .unwrap_or_else(|| {
                std::env::args_os()
                    .skip(1)
                    .map(|arg| arg.to_string_lossy().into_owned())
                    .collect()
            });
        let arg_values = parse_args(&args);

        let instance = Value::Object(seed(schema.root())?);
        let mut juvy = Juvy {
            schema,
            instance,
            env_values,
            arg_values,
        };
        juvy.apply_overlays()?;
        info!(
            "configuration ready (leaves={}, env_overrides={}, arg_overrides={})",
            juvy.schema.leaves().len(),
            juvy.env_values.len(),
            juvy.bound_args().count()
        );
        Ok(juvy)
    }
}

/// Read a bound variable from the process environment. Values that are not
/// valid UTF-8 are converted lossily rather than dropped.
fn process_env(name: &str) -> Option<String> {
    let value = std::env::var_os(name)?;
    if value.to_str().is_none() {
        warn!("env variable {name} is not valid UTF-8; using a lossy conversion");
    }
    Some(value.to_string_lossy().into_owned())
}

/// Build the default tree: namespaces become objects, leaves hold their
/// coerced default.
fn seed(nodes: &BTreeMap<String, SchemaNode>) -> Result<BTreeMap<String, Value>, JuvyError> {
    let mut values = BTreeMap::new();
    for (name, node) in nodes {
        let value = match node {
            SchemaNode::Namespace(children) => Value::Object(seed(children)?),
            SchemaNode::Leaf(property) => property
                .coercion()
                .apply(property.default.clone())
                .map_err(|message| JuvyError::Coerce {
                    path: property.path.clone(),
                    message,
                })?,
        };
        values.insert(name.clone(), value);
    }
    Ok(values)
}

impl Juvy {
    /// Build a store from the process environment and arguments.
    pub fn new(description: serde_json::Value) -> Result<Self, JuvyError> {
        Self::builder(description).build()
    }

    pub fn builder(description: serde_json::Value) -> JuvyBuilder {
        JuvyBuilder::new(description)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Owned copy of the value at `path`; the empty path yields the whole tree.
    pub fn get(&self, path: &str) -> Result<Value, JuvyError> {
        self.instance
            .lookup(path)
            .cloned()
            .ok_or_else(|| not_found(path))
    }

    /// Typed read through serde.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<T, JuvyError> {
        let value = self.get(path)?;
        Ok(serde_json::from_value(value.to_json())?)
    }

    pub fn has(&self, path: &str) -> bool {
        self.get(path).is_ok()
    }

    /// Declared default of the leaf at `path`.
    pub fn default(&self, path: &str) -> Result<Value, JuvyError> {
        self.schema
            .property(path)
            .map(|property| property.default.clone())
            .ok_or_else(|| not_found(path))
    }

    /// Coerce `value` for the leaf at `path` and store it, creating missing
    /// parent objects.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<&mut Self, JuvyError> {
        let value = self.coerce(path, value.into())?;
        let mut segments: Vec<&str> = path.split('.').collect();
        let child = segments.pop().unwrap_or_default();

        if let Some(denied) = segments
            .iter()
            .find(|segment| DENIED_SEGMENTS.contains(*segment))
        {
            debug!("skipping write to '{path}' through reserved segment '{denied}'");
            return Ok(self);
        }

        let parent = object_at_mut(&mut self.instance, &segments, path)?;
        parent.insert(child.to_string(), value);
        Ok(self)
    }

    /// Restore the declared default at `path`.
    pub fn reset(&mut self, path: &str) -> Result<&mut Self, JuvyError> {
        let default = self.default(path)?;
        self.set(path, default)
    }

    /// Validate the whole tree.
    ///
    /// Invalid types and missing paths always fail. Undeclared paths fail in
    /// strict mode and are reported as a warning otherwise.
    pub fn validate(&self, options: ValidateOptions) -> Result<&Self, JuvyError> {
        let errors = validate::validate(&self.instance, &self.schema);
        if options.mode == ValidationMode::Warn && !errors.undeclared.is_empty() {
            let warning = format!("Warning: {}", errors.render_undeclared());
            match &options.output {
                Some(output) => output(&warning),
                None => warn!("{warning}"),
            }
        }
        if errors.is_blocking(options.mode) {
            return Err(ValidationError::new(errors, &self.schema, options.mode).into());
        }
        debug!("configuration validated (mode={:?})", options.mode);
        Ok(self)
    }

    /// The whole value tree as JSON.
    pub fn properties(&self) -> serde_json::Value {
        self.instance.to_json()
    }

    /// The whole value tree as JSON with sensitive leaves masked.
    pub fn to_redacted_json(&self) -> serde_json::Value {
        let mut json = self.properties();
        for path in self.schema.sensitive_paths() {
            if let Some(slot) = json_slot_mut(&mut json, path) {
                *slot = serde_json::Value::String(validate::SENSITIVE_PLACEHOLDER.to_string());
            }
        }
        json
    }

    /// Normalized schema export.
    pub fn schema_json(&self) -> serde_json::Value {
        self.schema.to_json()
    }

    pub fn schema_string(&self) -> Result<String, JuvyError> {
        Ok(serde_json::to_string_pretty(&self.schema_json())?)
    }

    pub fn env_bindings(&self) -> &BTreeMap<String, Vec<String>> {
        self.schema.env_bindings()
    }

    pub fn arg_bindings(&self) -> &BTreeMap<String, String> {
        self.schema.arg_bindings()
    }

    /// Lower-level seam: mutable access to the raw value tree, bypassing
    /// coercion and the reserved-segment guard.
    pub fn instance_mut(&mut self) -> &mut Value {
        &mut self.instance
    }

    /// Re-apply the environment overlay, then the argument overlay.
    pub(crate) fn apply_overlays(&mut self) -> Result<(), JuvyError> {
        let env_writes: Vec<(String, String)> = self
            .schema
            .env_bindings()
            .iter()
            .filter_map(|(name, paths)| self.env_values.get(name).map(|value| (name, paths, value)))
            .flat_map(|(name, paths, value)| {
                debug!("applying env overlay {name} -> {paths:?}");
                paths.iter().map(move |path| (path.clone(), value.clone()))
            })
            .collect();
        for (path, value) in env_writes {
            self.set(&path, value)?;
        }

        let arg_writes: Vec<(String, String)> = self
            .bound_args()
            .map(|(path, value)| (path.to_string(), value.to_string()))
            .collect();
        for (path, value) in arg_writes {
            debug!("applying argument overlay -> {path}");
            self.set(&path, value)?;
        }
        Ok(())
    }

    /// Bound argument path and raw value for every flag that carried a value.
    fn bound_args(&self) -> impl Iterator<Item = (&str, &str)> {
        self.schema
            .arg_bindings()
            .iter()
            .filter_map(|(name, path)| match self.arg_values.get(name) {
                Some(Some(value)) => Some((path.as_str(), value.as_str())),
                _ => None,
            })
    }

    fn coerce(&self, path: &str, value: Value) -> Result<Value, JuvyError> {
        match self.schema.property(path) {
            Some(property) => property
                .coercion()
                .apply(value)
                .map_err(|message| JuvyError::Coerce {
                    path: path.to_string(),
                    message,
                }),
            None => Ok(value),
        }
    }
}

fn not_found(path: &str) -> JuvyError {
    JuvyError::NotFound {
        path: path.to_string(),
    }
}

/// Walk to the object at `segments`, replacing absent or null segments with
/// empty objects.
fn object_at_mut<'a>(
    root: &'a mut Value,
    segments: &[&str],
    path: &str,
) -> Result<&'a mut BTreeMap<String, Value>, JuvyError> {
    let mut current = root;
    let mut parent = "";
    for segment in segments {
        current = match current {
            Value::Object(map) => {
                let slot = map.entry((*segment).to_string()).or_insert(Value::Null);
                if slot.is_null() {
                    *slot = Value::object();
                }
                slot
            }
            _ => return Err(not_an_object(path, parent)),
        };
        parent = *segment;
    }
    match current {
        Value::Object(map) => Ok(map),
        _ => Err(not_an_object(path, parent)),
    }
}

fn not_an_object(path: &str, segment: &str) -> JuvyError {
    JuvyError::NotAnObject {
        path: path.to_string(),
        segment: segment.to_string(),
    }
}

fn json_slot_mut<'a>(
    root: &'a mut serde_json::Value,
    path: &str,
) -> Option<&'a mut serde_json::Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = current.as_object_mut()?.get_mut(segment)?;
    }
    Some(current)
}
