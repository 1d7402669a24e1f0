// ABOUTME: Per-render locals and evaluation context assembly
// ABOUTME: Merges caller locals over registered helpers into one fresh name-to-value map

use indexmap::IndexMap;
use serde::Serialize;

use super::registry::HelperRegistry;
use crate::expr::{self, Value};

/// Variables supplied by the caller for a single render.
#[derive(Debug, Clone, Default)]
pub struct Locals {
    values: IndexMap<String, Value>,
}

/// The merged bindings visible to one render's expressions.
pub type EvaluationContext = IndexMap<String, Value>;

impl Locals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build locals from any struct or map that serializes to a JSON object.
    pub fn from_serialize<T: Serialize + ?Sized>(data: &T) -> serde_json::Result<Self> {
        Ok(Self::from(serde_json::to_value(data)?))
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Builder-style insert of a native function local.
    pub fn with_fn<F>(self, key: &str, func: F) -> Self
    where
        F: Fn(&[Value]) -> expr::Result<Value> + Send + Sync + 'static,
    {
        let value = Value::native(key, func);
        self.with(key, value)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn extend(&mut self, other: Locals) {
        self.values.extend(other.values);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

impl From<serde_json::Value> for Locals {
    /// Non-object JSON produces empty locals.
    fn from(value: serde_json::Value) -> Self {
        match Value::from(value) {
            Value::Object(values) => Self { values },
            _ => Self::default(),
        }
    }
}

impl From<IndexMap<String, Value>> for Locals {
    fn from(values: IndexMap<String, Value>) -> Self {
        Self { values }
    }
}

impl FromIterator<(String, Value)> for Locals {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Helpers first, then locals on top, so a local shadows a helper of the same name.
pub fn build_context(helpers: &HelperRegistry, locals: &Locals) -> EvaluationContext {
    let mut context = EvaluationContext::with_capacity(helpers.len() + locals.len());
    for (name, helper) in helpers.iter() {
        context.insert(name.clone(), helper.clone());
    }
    for (name, value) in locals.iter() {
        context.insert(name.clone(), value.clone());
    }
    context
}
