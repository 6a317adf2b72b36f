//! Configuration documents and schema fragments read from disk.
//!
//! Documents are merged into a live store leaf by leaf through
//! [`Juvy::set`], then the environment and argument overlays are re-applied
//! so they keep precedence over anything loaded.

mod fragments;


pub use fragments::{SchemaLoader, load_schema};

use crate::error::JuvyError;
use crate::schema::join_path;
use crate::store::Juvy;
use log::{debug, info};
use std::fs;
use std::path::Path;

impl Juvy {
    /// Merge a JSON document into the store.
    pub fn load_value(&mut self, document: serde_json::Value) -> Result<&mut Self, JuvyError> {
        let serde_json::Value::Object(map) = document else {
            return Err(JuvyError::InvalidDocument(
                "config document must be an object".to_string(),
            ));
        };
        let mut writes = 0;
        self.merge_document("", &map, &mut writes)?;
        self.apply_overlays()?;
        debug!("config document merged (writes={writes})");
        Ok(self)
    }

    /// Merge JSON5 contents into the store.
    pub fn load_str(&mut self, contents: &str) -> Result<&mut Self, JuvyError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let document: serde_json::Value = json5::from_str(contents)?;
        self.load_value(document)
    }

    /// Merge a JSON5 file into the store.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<&mut Self, JuvyError> {
        let path = path.as_ref();
        info!("loading config from path: {}", path.display());
        let contents = fs::read_to_string(path)?;
        self.load_str(&contents)
    }

    /// Objects under namespaces and undeclared paths are descended into;
    /// everything else, including object-valued leaves, is written whole.
    fn merge_document(
        &mut self,
        prefix: &str,
        map: &serde_json::Map<String, serde_json::Value>,
        writes: &mut usize,
    ) -> Result<(), JuvyError> {
        for (key, value) in map {
            let path = join_path(prefix, key);
            match value {
                serde_json::Value::Object(children) if self.schema().property(&path).is_none() => {
                    self.merge_document(&path, children, writes)?;
                }
                _ => {
                    self.set(&path, value)?;
                    *writes += 1;
                }
            }
        }
        Ok(())
    }
}
