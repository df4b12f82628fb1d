//! Module namespaces and export selection

use crate::error::LoadError;
use crate::value::PropertyValue;
use smallvec::SmallVec;
use std::path::Path;

/// Name of the default export slot. It can never be requested by name.
pub const DEFAULT_EXPORT: &str = "default";

/// Wildcard export name selecting every named export
pub const ALL_EXPORTS: &str = "*";

/// Exports produced by loading one handler module
#[derive(Debug, Clone, Default)]
pub struct ModuleNamespace {
    default: Option<PropertyValue>,
    named: Vec<(String, PropertyValue)>,
}

impl ModuleNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default export
    pub fn with_default(mut self, value: impl Into<PropertyValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Add or replace a named export, keeping first-insertion order
    pub fn with_export(mut self, name: &str, value: impl Into<PropertyValue>) -> Self {
        self.set_export(name, value.into());
        self
    }

    pub fn set_default(&mut self, value: PropertyValue) {
        self.default = Some(value);
    }

    pub fn set_export(&mut self, name: &str, value: PropertyValue) {
        if let Some(slot) = self.named.iter_mut().find(|(existing, _)| existing == name) {
            slot.1 = value;
        } else {
            self.named.push((name.to_string(), value));
        }
    }

    pub fn default_export(&self) -> Option<&PropertyValue> {
        self.default.as_ref()
    }

    pub fn export(&self, name: &str) -> Option<&PropertyValue> {
        self.named
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn export_names(&self) -> impl Iterator<Item = &str> {
        self.named.iter().map(|(name, _)| name.as_str())
    }
}

/// Which export(s) of a module are handler candidates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportSelection {
    Default,
    Named(String),
    AllNamed,
}

/// A candidate together with the export it came from
#[derive(Debug, Clone)]
pub struct SelectedExport {
    pub export: String,
    pub value: PropertyValue,
}

impl ExportSelection {
    /// Extract handler candidates from `namespace`.
    ///
    /// With `AllNamed`, a falsy named export is an error rather than being
    /// skipped.
    pub fn select(
        &self,
        namespace: ModuleNamespace,
        file: &Path,
    ) -> Result<SmallVec<[SelectedExport; 1]>, LoadError> {
        let not_found = |export: &str, reason: &str| LoadError::ExportNotFound {
            export: export.to_string(),
            file: file.to_path_buf(),
            reason: reason.to_string(),
        };

        match self {
            ExportSelection::Default => {
                let value = namespace
                    .default
                    .ok_or_else(|| not_found(DEFAULT_EXPORT, "module has no default export"))?;
                Ok(SmallVec::from_buf([SelectedExport {
                    export: DEFAULT_EXPORT.to_string(),
                    value,
                }]))
            }
            ExportSelection::Named(name) => {
                if name == DEFAULT_EXPORT {
                    return Err(not_found(name, "the default export cannot be selected by name"));
                }
                let value = namespace
                    .named
                    .into_iter()
                    .find(|(export, _)| export == name)
                    .map(|(_, value)| value)
                    .ok_or_else(|| not_found(name, "no such named export"))?;
                Ok(SmallVec::from_buf([SelectedExport {
                    export: name.clone(),
                    value,
                }]))
            }
            ExportSelection::AllNamed => namespace
                .named
                .into_iter()
                .filter(|(export, _)| export != DEFAULT_EXPORT)
                .map(|(export, value)| {
                    if value.is_falsy() {
                        Err(not_found(&export, &format!("export is empty ({value})")))
                    } else {
                        Ok(SelectedExport { export, value })
                    }
                })
                .collect(),
        }
    }
}
