//! Error types for the handler loader

use std::path::PathBuf;

/// Boxed error returned by handler functions and bind overrides
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for a `load_event_handlers` call.
///
/// Every variant aborts the whole load. Listeners bound before the failure
/// stay bound.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Handler directory is missing, unreadable or not a directory
    #[error("Invalid handler directory {path}: {reason}")]
    InvalidDirectory { path: PathBuf, reason: String },

    /// Options mapping or one of its values is invalid
    #[error("Invalid option `{option}`: {reason}")]
    InvalidOptions { option: String, reason: String },

    /// No loadable handler module was found
    #[error("No handler modules found in {path} ({files_found} file(s) present)")]
    EmptyDirectory { path: PathBuf, files_found: usize },

    /// Loading a handler module failed
    #[error("Failed to load handler module {file}: {source}")]
    ModuleLoad {
        file: PathBuf,
        #[source]
        source: LoaderError,
    },

    /// The requested export is absent from a loaded module
    #[error("Export `{export}` not found in {file}: {reason}")]
    ExportNotFound {
        export: String,
        file: PathBuf,
        reason: String,
    },

    /// Handler candidate lacks a required property
    #[error("Handler in {file} is missing required property `{alias}`")]
    MissingProperty { alias: String, file: PathBuf },

    /// Handler property has the wrong type
    #[error("Handler property `{alias}` in {file} has invalid value {value}: expected {expected}")]
    InvalidType {
        alias: String,
        value: String,
        expected: &'static str,
        file: PathBuf,
    },

    /// Caller-supplied bind override failed
    #[error("Bind override failed for {file}: {source}")]
    BindOverride {
        file: PathBuf,
        #[source]
        source: BoxError,
    },
}

impl LoadError {
    pub(crate) fn invalid_option(option: &str, reason: impl Into<String>) -> Self {
        LoadError::InvalidOptions {
            option: option.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by a [`ModuleLoader`](crate::loader::ModuleLoader)
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Manifest references a function that was never registered
    #[error("Unknown function reference `{0}`")]
    UnknownFunction(String),

    /// Library loading error
    #[error("Library loading error: {0}")]
    Library(String),

    /// Library lacks a required export
    #[error("Module does not export `{0}`")]
    MissingSymbol(&'static str),

    /// Module was built against an incompatible loader version
    #[error("ABI version mismatch: module v{module}, loader v{loader}")]
    AbiMismatch { module: String, loader: String },

    /// Module constructor returned null
    #[error("Module constructor returned null")]
    NullModule,

    /// No configured loader handles this file
    #[error("Unsupported module file: {0}")]
    Unsupported(String),
}

impl From<serde_json::Error> for LoaderError {
    fn from(err: serde_json::Error) -> Self {
        LoaderError::Parse(err.to_string())
    }
}

impl From<toml::de::Error> for LoaderError {
    fn from(err: toml::de::Error) -> Self {
        LoaderError::Parse(err.to_string())
    }
}
