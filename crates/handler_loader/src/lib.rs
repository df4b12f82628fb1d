//! # Handler Loader
//!
//! Discovers event handler modules in a directory, validates their shape and
//! binds them as listeners onto an event emitter.
//!
//! A handler is a small declarative object:
//!
//! - `name`: the event to listen to (a string or a [`Symbol`])
//! - `execute`: the function to call, synchronous or asynchronous
//! - `isOnce` (optional): remove the listener after its first call
//! - `isPrepend` (optional): run ahead of the listeners already registered
//!
//! Property names are configurable through [`KeyAliasMap`].
//!
//! ## Architecture
//!
//! - **DirectoryResolver**: lists candidate files
//! - **ModuleLoader**: turns a file into a [`ModuleNamespace`] (manifests,
//!   dynamic libraries)
//! - **ExportSelection**: picks handler candidates out of a namespace
//! - **normalize**: validates a candidate into a [`NormalizedHandler`]
//! - **Listener**: wraps `execute` with the prepended arguments
//! - **bind**: issues one registration call on the [`TargetEmitter`]
//! - **HandlerLoader**: runs the pipeline for every file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use handler_loader::*;
//!
//! # async fn run(emitter: &dyn TargetEmitter) -> Result<(), LoadError> {
//! let registry = HandlerRegistry::new();
//! registry.register_sync("reply_pong", |args| {
//!     println!("pong {:?}", args);
//!     Ok(())
//! });
//!
//! let loader = HandlerLoader::new(ManifestLoader::new(registry));
//! let summary = loader
//!     .load_event_handlers("handlers", emitter, LoadOptions::default())
//!     .await?;
//! println!("{} handler(s) bound", summary.handlers_bound);
//! # Ok(())
//! # }
//! ```

pub mod binder;
pub mod emitter;
pub mod error;
pub mod listener;
pub mod loader;
pub mod macros;
pub mod manager;
pub mod module;
pub mod options;
pub mod resolver;
pub mod validate;
pub mod value;

#[cfg(test)]
mod test_support;

// Re-export core types
pub use binder::{bind, BindMethod, BindOverride, FnOverride};
pub use emitter::TargetEmitter;
pub use error::{BoxError, LoadError, LoaderError};
pub use listener::{Invocation, Listener};
pub use loader::{
    DynamicLibraryLoader, DynamicLoaderConfig, HandlerRegistry, LoaderSet, ManifestLoader,
    ModuleLoader, DYNAMIC_LIBRARY_EXTENSION,
};
pub use manager::{HandlerLoader, LoadSummary};
pub use module::{ExportSelection, ModuleNamespace, SelectedExport, ALL_EXPORTS, DEFAULT_EXPORT};
pub use options::{ConcurrencyMode, ExportPolicy, KeyAliasMap, LoadOptions};
pub use resolver::{DirectoryResolver, FsDirectoryResolver};
pub use validate::{normalize, NormalizedHandler};
pub use value::{EventName, Execute, HandlerCandidate, HandlerResult, PropertyValue, Symbol};

/// Version of the handler loader
pub const HANDLER_LOADER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// [`HANDLER_LOADER_VERSION`] as a C string, returned by exported modules
#[doc(hidden)]
pub const HANDLER_LOADER_ABI_VERSION: &std::ffi::CStr =
    match std::ffi::CStr::from_bytes_with_nul(concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes()) {
        Ok(version) => version,
        Err(_) => panic!("crate version contains a nul byte"),
    };
