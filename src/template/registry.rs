// ABOUTME: Helper registry populated from helper module files and programmatic registration
// ABOUTME: Each module is a YAML map of export name to expression; later exports win

use indexmap::IndexMap;
use serde_yaml::Value as YamlValue;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::error::{Result, TemplateError};
use super::helpers::builtin_helpers;
use crate::expr::{self, Value};
use crate::fs::{DirectoryOptions, FileSystem};

/// Extensions recognised as helper modules.
pub const HELPER_EXTENSIONS: &[&str] = &[".yaml", ".yml"];

#[derive(Debug, Clone, Default)]
pub struct HelperRegistry {
    helpers: IndexMap<String, Value>,
}

impl HelperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the native built-in helpers.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (name, helper) in builtin_helpers() {
            registry.register(name, helper);
        }
        registry
    }

    /// Add or replace a helper.
    pub fn register(&mut self, name: impl Into<String>, helper: Value) {
        let name = name.into();
        if self.helpers.insert(name.clone(), helper).is_some() {
            debug!("Helper '{}' overridden", name);
        }
    }

    /// Add or replace a native helper backed by a Rust closure.
    pub fn register_fn<F>(&mut self, name: &str, func: F)
    where
        F: Fn(&[Value]) -> expr::Result<Value> + Send + Sync + 'static,
    {
        self.register(name, Value::native(name, func));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.helpers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.helpers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.helpers.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.helpers.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.helpers.iter()
    }

    /// Move every helper from `other` into this registry; `other` wins on collision.
    pub fn merge(&mut self, other: HelperRegistry) {
        for (name, helper) in other.helpers {
            self.register(name, helper);
        }
    }

    /// Load every helper module under `directory`, returning the files processed.
    ///
    /// Modules are merged in path order. If any module fails to read or parse,
    /// nothing from this call is kept.
    pub async fn load(&mut self, fs: &dyn FileSystem, directory: &Path) -> Result<Vec<PathBuf>> {
        let options = DirectoryOptions::new(HELPER_EXTENSIONS, true);
        let files = fs.read_directory(directory, &options).await?;

        let mut staged = Vec::with_capacity(files.len());
        for file in &files {
            let source = fs.read_file(file).await?;
            staged.push(parse_module(file, &source)?);
        }

        for exports in staged {
            for (name, helper) in exports {
                self.register(name, helper);
            }
        }

        info!(
            "Loaded {} helper modules from {}",
            files.len(),
            directory.display()
        );
        Ok(files)
    }
}

/// Parse one helper module into its exported bindings.
///
/// String entries are expressions evaluated with nothing in scope, so
/// `(name) => 'Hello ' + name` exports a function and `'Acme'` a string.
/// Other YAML values export as plain data.
pub fn parse_module(path: &Path, source: &str) -> Result<IndexMap<String, Value>> {
    if source.trim().is_empty() {
        return Ok(IndexMap::new());
    }

    let entries: IndexMap<String, YamlValue> = serde_yaml::from_str(source)
        .map_err(|e| TemplateError::helper_module(path, e))?;

    let mut exports = IndexMap::with_capacity(entries.len());
    for (name, entry) in entries {
        let value = match entry {
            YamlValue::String(source) => expr::evaluate_constant(&source)
                .map_err(|e| TemplateError::helper_module(path, format!("{}: {}", name, e)))?,
            other => serde_json::to_value(other)
                .map(Value::from)
                .map_err(|e| TemplateError::helper_module(path, format!("{}: {}", name, e)))?,
        };
        exports.insert(name, value);
    }

    debug!("Parsed helper module {} ({} exports)", path.display(), exports.len());
    Ok(exports)
}
