//! Load options and their validation

use crate::error::LoadError;
use crate::module::{ExportSelection, ALL_EXPORTS};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// How per-file pipelines are scheduled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcurrencyMode {
    /// Start every file at once and wait for all of them
    #[default]
    Concurrent,
    /// One file at a time, in resolver order
    Sequential,
}

/// Which export(s) of a module are treated as handlers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportPolicy {
    #[default]
    Default,
    Named,
    All,
}

/// Property names read off each handler candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyAliasMap {
    pub name: String,
    pub is_once: String,
    pub is_prepend: String,
    pub execute: String,
}

impl Default for KeyAliasMap {
    fn default() -> Self {
        Self {
            name: "name".to_string(),
            is_once: "isOnce".to_string(),
            is_prepend: "isPrepend".to_string(),
            execute: "execute".to_string(),
        }
    }
}

impl KeyAliasMap {
    fn validate(&self) -> Result<(), LoadError> {
        let roles = [
            ("keys.name", &self.name),
            ("keys.is_once", &self.is_once),
            ("keys.is_prepend", &self.is_prepend),
            ("keys.execute", &self.execute),
        ];
        for (option, alias) in roles {
            if alias.trim().is_empty() {
                return Err(LoadError::invalid_option(option, "alias must be a non-empty string"));
            }
        }
        Ok(())
    }
}

/// Caller configuration for one `load_event_handlers` call
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    pub concurrency: ConcurrencyMode,
    pub export_policy: ExportPolicy,
    /// Named export to read; `*` selects every named export
    pub preferred_export_name: String,
    /// Arguments passed before the emitted ones on every invocation
    pub prepend_args: Vec<Value>,
    pub keys: KeyAliasMap,
    /// Include subdirectories
    pub recursive: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            concurrency: ConcurrencyMode::Concurrent,
            export_policy: ExportPolicy::Default,
            preferred_export_name: "eventHandler".to_string(),
            prepend_args: Vec::new(),
            keys: KeyAliasMap::default(),
            recursive: false,
        }
    }
}

impl LoadOptions {
    /// Merge a configuration mapping over the defaults.
    ///
    /// Anything but a mapping is rejected. Each known key is decoded on its
    /// own so a type error names the offending option; unknown keys are
    /// ignored.
    pub fn from_value(value: Value) -> Result<Self, LoadError> {
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(LoadError::invalid_option(
                    "options",
                    format!("expected a mapping, got {}", json_kind(&other)),
                ))
            }
        };

        let mut options = Self::default();
        for (key, value) in map {
            match key.as_str() {
                "concurrency" => options.concurrency = decode(&key, value)?,
                "export_policy" => options.export_policy = decode(&key, value)?,
                "preferred_export_name" => options.preferred_export_name = decode(&key, value)?,
                "prepend_args" => options.prepend_args = decode(&key, value)?,
                "keys" => options.keys = decode(&key, value)?,
                "recursive" => options.recursive = decode(&key, value)?,
                _ => debug!("Ignoring unknown load option `{}`", key),
            }
        }

        options.validate()?;
        Ok(options)
    }

    /// Parse options from a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, LoadError> {
        let value: Value = toml::from_str(content)
            .map_err(|e| LoadError::invalid_option("options", e.to_string()))?;
        Self::from_value(value)
    }

    /// Check value constraints that the types alone do not express
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.preferred_export_name.trim().is_empty() {
            return Err(LoadError::invalid_option(
                "preferred_export_name",
                "must be a non-empty export name or `*`",
            ));
        }
        self.keys.validate()
    }

    /// Resolve the export policy and preferred name into a selection
    pub fn export_selection(&self) -> ExportSelection {
        match self.export_policy {
            ExportPolicy::Default => ExportSelection::Default,
            ExportPolicy::All => ExportSelection::AllNamed,
            ExportPolicy::Named if self.preferred_export_name == ALL_EXPORTS => {
                ExportSelection::AllNamed
            }
            ExportPolicy::Named => ExportSelection::Named(self.preferred_export_name.clone()),
        }
    }

    pub fn sequential(mut self) -> Self {
        self.concurrency = ConcurrencyMode::Sequential;
        self
    }

    pub fn with_export_policy(mut self, policy: ExportPolicy) -> Self {
        self.export_policy = policy;
        self
    }

    pub fn with_preferred_export_name(mut self, name: &str) -> Self {
        self.preferred_export_name = name.to_string();
        self
    }

    pub fn with_prepend_args(mut self, args: Vec<Value>) -> Self {
        self.prepend_args = args;
        self
    }

    pub fn with_keys(mut self, keys: KeyAliasMap) -> Self {
        self.keys = keys;
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }
}

fn decode<T: DeserializeOwned>(option: &str, value: Value) -> Result<T, LoadError> {
    serde_json::from_value(value).map_err(|e| LoadError::invalid_option(option, e.to_string()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a mapping",
    }
}
