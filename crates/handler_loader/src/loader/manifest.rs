//! Declarative handler manifests
//!
//! A manifest is a TOML or JSON document. The top-level `default` table is the
//! module's default export, every other top-level key is a named export.
//! Functions and symbols cannot be written as data, so manifests refer to them
//! by key:
//!
//! ```toml
//! [default]
//! name = "ping"
//! isOnce = true
//! execute = { fn = "reply_pong" }
//!
//! [ready]
//! name = { symbol = "ready" }
//! execute = { fn = "log" }
//! ```
//!
//! Keys are resolved through a [`HandlerRegistry`] filled by the host program.

use super::{extension_of, ModuleLoader};
use crate::error::LoaderError;
use crate::module::{ModuleNamespace, DEFAULT_EXPORT};
use crate::value::{Execute, HandlerCandidate, HandlerResult, PropertyValue, Symbol};
use async_trait::async_trait;
use compact_str::CompactString;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

const FUNCTION_REF: &str = "fn";
const SYMBOL_REF: &str = "symbol";

/// Compiled-in functions and shared symbols that manifests refer to.
///
/// Clones share the same tables.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    functions: Arc<DashMap<CompactString, Execute>>,
    symbols: Arc<DashMap<CompactString, Symbol>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `execute` under `key`, replacing any previous entry
    pub fn register(&self, key: &str, execute: Execute) -> &Self {
        self.functions.insert(CompactString::new(key), execute);
        self
    }

    pub fn register_sync<F>(&self, key: &str, f: F) -> &Self
    where
        F: Fn(&[Value]) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(key, Execute::sync(f))
    }

    pub fn register_async<F, Fut>(&self, key: &str, f: F) -> &Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(key, Execute::asynchronous(f))
    }

    pub fn function(&self, key: &str) -> Option<Execute> {
        self.functions.get(key).map(|entry| entry.value().clone())
    }

    /// The symbol registered under `key`, created on first use
    pub fn symbol(&self, key: &str) -> Symbol {
        self.symbols
            .entry(CompactString::new(key))
            .or_insert_with(|| Symbol::new(Some(key)))
            .clone()
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }
}

/// Loads `.toml` and `.json` handler manifests
#[derive(Clone, Default)]
pub struct ManifestLoader {
    registry: HandlerRegistry,
}

impl ManifestLoader {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Build a namespace from an already parsed document
    pub fn namespace_from_value(&self, document: Value) -> Result<ModuleNamespace, LoaderError> {
        let Value::Object(exports) = document else {
            return Err(LoaderError::Parse(format!(
                "manifest root must be a table, found {}",
                json_type(&document)
            )));
        };

        let mut namespace = ModuleNamespace::new();
        for (export, value) in exports {
            let value = self.convert(value)?;
            if export == DEFAULT_EXPORT {
                namespace.set_default(value);
            } else {
                namespace.set_export(&export, value);
            }
        }
        Ok(namespace)
    }

    fn convert(&self, value: Value) -> Result<PropertyValue, LoaderError> {
        Ok(match value {
            Value::Null => PropertyValue::Null,
            Value::Bool(b) => PropertyValue::Bool(b),
            Value::Number(n) => PropertyValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => PropertyValue::String(s),
            Value::Array(items) => PropertyValue::List(
                items
                    .into_iter()
                    .map(|item| self.convert(item))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(map) => self.convert_table(map)?,
        })
    }

    fn convert_table(&self, map: Map<String, Value>) -> Result<PropertyValue, LoaderError> {
        if map.len() == 1 {
            if let Some(Value::String(key)) = map.get(FUNCTION_REF) {
                return self
                    .registry
                    .function(key)
                    .map(PropertyValue::Function)
                    .ok_or_else(|| LoaderError::UnknownFunction(key.clone()));
            }
            if let Some(Value::String(key)) = map.get(SYMBOL_REF) {
                return Ok(PropertyValue::Symbol(self.registry.symbol(key)));
            }
        }

        let mut candidate = HandlerCandidate::new();
        for (key, value) in map {
            candidate.insert(&key, self.convert(value)?);
        }
        Ok(PropertyValue::Object(candidate))
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "table",
    }
}

#[async_trait]
impl ModuleLoader for ManifestLoader {
    fn accepts(&self, path: &Path) -> bool {
        matches!(extension_of(path).as_deref(), Some("toml" | "json"))
    }

    async fn load(&self, path: &Path) -> Result<ModuleNamespace, LoaderError> {
        let content = tokio::fs::read_to_string(path).await?;
        let document: Value = match extension_of(path).as_deref() {
            Some("toml") => toml::from_str(&content)?,
            Some("json") => serde_json::from_str(&content)?,
            _ => return Err(LoaderError::Unsupported(path.display().to_string())),
        };

        let namespace = self.namespace_from_value(document)?;
        debug!(
            "📄 Parsed manifest {} ({} named export(s))",
            path.display(),
            namespace.export_names().count()
        );
        Ok(namespace)
    }
}
