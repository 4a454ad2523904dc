use crate::error::{Result, VastError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Options accepted by the plugin.
///
/// Only `url` is used; any other keys are kept in `extra` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginOptions {
    /// The ad-server URL to resolve
    pub url: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PluginOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            extra: Map::new(),
        }
    }

    /// Merge caller options over defaults, objects recursively, later values winning
    pub fn merge(defaults: &Value, options: &Value) -> Result<Self> {
        let mut merged = defaults.clone();
        merge_value(&mut merged, options);
        Self::from_value(merged)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    fn from_value(value: Value) -> Result<Self> {
        let has_url = value
            .get("url")
            .and_then(Value::as_str)
            .is_some_and(|url| !url.trim().is_empty());
        if !has_url {
            return Err(VastError::MissingField("url".to_string()));
        }
        Ok(serde_json::from_value(value)?)
    }
}

fn merge_value(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                merge_value(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (target, source) => *target = source.clone(),
    }
}
