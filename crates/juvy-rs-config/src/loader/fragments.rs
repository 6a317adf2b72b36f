//! Assemble a schema description from a directory of JSON5 fragments.

use crate::error::JuvyError;
use log::debug;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Fragment file that contributes at its directory's namespace.
const INDEX_STEM: &str = "index";
/// Extensions recognised as fragments.
const FRAGMENT_EXTENSIONS: &[&str] = &["json5", "json"];

/// Schema description built from fragments.
#[derive(Debug, Clone)]
pub struct SchemaLoader {
    description: Value,
    sources: Vec<PathBuf>,
}

impl Default for SchemaLoader {
    fn default() -> Self {
        Self {
            description: Value::Object(Map::new()),
            sources: Vec::new(),
        }
    }
}

impl SchemaLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk `root` for fragments in file-name order.
    ///
    /// `a/b/index.json5` lands under `a.b`, `a/b/c.json5` under `a.b.c`, and
    /// the root `index.json5` at the top level.
    pub fn from_dir(root: impl AsRef<Path>) -> Result<Self, JuvyError> {
        let root = root.as_ref();
        let mut loader = Self::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() || !is_fragment(entry.path()) {
                continue;
            }
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            let namespace = namespace_for(relative);
            loader.add_file(entry.path(), &namespace)?;
        }
        debug!(
            "schema fragments loaded (root={}, files={})",
            root.display(),
            loader.sources.len()
        );
        Ok(loader)
    }

    /// Load a single fragment file at the top level.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, JuvyError> {
        let mut loader = Self::new();
        loader.add_file(path.as_ref(), &[])?;
        Ok(loader)
    }

    /// Merge a fragment under the dotted `namespace` (empty for top level).
    pub fn add_fragment(&mut self, namespace: &str, fragment: Value) -> Result<&mut Self, JuvyError> {
        if !fragment.is_object() {
            return Err(JuvyError::InvalidFragment {
                path: namespace.to_string(),
                message: "fragment must be an object".to_string(),
            });
        }
        let segments: Vec<String> = namespace
            .split('.')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        merge_at(&mut self.description, &segments, fragment);
        Ok(self)
    }

    /// Files merged so far, in load order.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn description(&self) -> &Value {
        &self.description
    }

    pub fn into_description(self) -> Value {
        self.description
    }

    fn add_file(&mut self, path: &Path, namespace: &[String]) -> Result<(), JuvyError> {
        let contents = fs::read_to_string(path)?;
        let fragment: Value =
            json5::from_str(&contents).map_err(|err| invalid_fragment(path, err.to_string()))?;
        if !fragment.is_object() {
            return Err(invalid_fragment(path, "fragment must be an object".to_string()));
        }
        debug!(
            "merging schema fragment {} at '{}'",
            path.display(),
            namespace.join(".")
        );
        merge_at(&mut self.description, namespace, fragment);
        self.sources.push(path.to_path_buf());
        Ok(())
    }
}

/// Load a schema description from a fragment directory or a single file.
pub fn load_schema(path: impl AsRef<Path>) -> Result<Value, JuvyError> {
    let path = path.as_ref();
    let loader = if path.is_dir() {
        SchemaLoader::from_dir(path)?
    } else {
        SchemaLoader::from_file(path)?
    };
    Ok(loader.into_description())
}

fn is_fragment(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| FRAGMENT_EXTENSIONS.contains(&ext))
}

/// Directory segments plus the file stem, unless the stem is `index`.
fn namespace_for(relative: &Path) -> Vec<String> {
    let mut segments: Vec<String> = relative
        .parent()
        .map(|parent| {
            parent
                .components()
                .map(|component| component.as_os_str().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    if let Some(stem) = relative.file_stem().map(|stem| stem.to_string_lossy()) {
        if stem != INDEX_STEM {
            segments.push(stem.into_owned());
        }
    }
    segments
}

/// Deep-merge `fragment` into `base` below `segments`; later scalars win.
fn merge_at(base: &mut Value, segments: &[String], fragment: Value) {
    let mut current = base;
    for segment in segments {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        current = match current {
            Value::Object(map) => map
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new())),
            _ => return,
        };
    }
    deep_merge(current, fragment);
}

fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn invalid_fragment(path: &Path, message: String) -> JuvyError {
    JuvyError::InvalidFragment {
        path: path.display().to_string(),
        message,
    }
}
