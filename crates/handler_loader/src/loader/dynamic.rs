//! Compiled handler modules loaded from dynamic libraries

use super::{extension_of, ModuleLoader};
use crate::error::LoaderError;
use crate::module::ModuleNamespace;
use async_trait::async_trait;
use libloading::{Library, Symbol};
use std::ffi::CStr;
use std::os::raw::c_char;
use std::path::Path;
use tracing::{debug, warn};

/// Extension of dynamic libraries on the current platform
#[cfg(target_os = "windows")]
pub const DYNAMIC_LIBRARY_EXTENSION: &str = "dll";
#[cfg(target_os = "macos")]
pub const DYNAMIC_LIBRARY_EXTENSION: &str = "dylib";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const DYNAMIC_LIBRARY_EXTENSION: &str = "so";

/// Exported by [`export_handler_module!`](crate::export_handler_module)
pub(crate) const ABI_VERSION_SYMBOL: &[u8] = b"handler_loader_abi_version";
pub(crate) const MODULE_SYMBOL: &[u8] = b"handler_module";

type AbiVersionFn = unsafe extern "C" fn() -> *const c_char;
type ModuleFn = unsafe extern "C" fn() -> *mut ModuleNamespace;

/// Safety checks applied before a library's namespace is trusted
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DynamicLoaderConfig {
    /// Load modules built against any loader version
    pub allow_abi_mismatch: bool,

    /// Require the exact version instead of matching major.minor
    pub strict_versioning: bool,
}

/// Loads modules built with [`export_handler_module!`](crate::export_handler_module).
///
/// Libraries are never unloaded. Listeners, the futures they return and the
/// errors they produce all point into library code, and any of them may
/// outlive the emitter they were bound to.
///
/// Opening a library runs its initializers, so loading happens on tokio's
/// blocking pool.
#[derive(Debug, Clone, Default)]
pub struct DynamicLibraryLoader {
    config: DynamicLoaderConfig,
}

impl DynamicLibraryLoader {
    pub fn new(config: DynamicLoaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DynamicLoaderConfig {
        &self.config
    }

    /// Check a module's ABI version against this crate's version
    pub fn check_abi(&self, module_version: &str) -> Result<(), LoaderError> {
        let loader_version = crate::HANDLER_LOADER_VERSION;
        let compatible = if self.config.strict_versioning {
            module_version == loader_version
        } else {
            versions_compatible(module_version, loader_version)
        };

        if compatible {
            return Ok(());
        }
        if self.config.allow_abi_mismatch {
            warn!(
                "⚠️ Loading module built for v{} into loader v{}",
                module_version, loader_version
            );
            return Ok(());
        }
        Err(LoaderError::AbiMismatch {
            module: module_version.to_string(),
            loader: loader_version.to_string(),
        })
    }

    fn load_library(&self, path: &Path) -> Result<ModuleNamespace, LoaderError> {
        let library = unsafe {
            Library::new(path)
                .map_err(|e| LoaderError::Library(format!("Failed to load library: {e}")))?
        };

        let module_version = {
            let abi_version: Symbol<AbiVersionFn> = unsafe {
                library
                    .get(ABI_VERSION_SYMBOL)
                    .map_err(|_| LoaderError::MissingSymbol("handler_loader_abi_version"))?
            };
            let version_ptr = unsafe { abi_version() };
            if version_ptr.is_null() {
                return Err(LoaderError::Library(
                    "Module returned a null ABI version".to_string(),
                ));
            }
            unsafe { CStr::from_ptr(version_ptr) }
                .to_string_lossy()
                .into_owned()
        };
        self.check_abi(&module_version)?;

        let namespace = {
            let create_module: Symbol<ModuleFn> = unsafe {
                library
                    .get(MODULE_SYMBOL)
                    .map_err(|_| LoaderError::MissingSymbol("handler_module"))?
            };
            let module_ptr = unsafe { create_module() };
            if module_ptr.is_null() {
                return Err(LoaderError::NullModule);
            }
            unsafe { *Box::from_raw(module_ptr) }
        };

        debug!(
            "📚 Loaded module library {} (ABI v{})",
            path.display(),
            module_version
        );
        std::mem::forget(library);
        Ok(namespace)
    }
}

/// Two versions are compatible when major and minor match.
///
/// Versions that do not parse as `major.minor[...]` must match exactly.
pub(crate) fn versions_compatible(module_version: &str, loader_version: &str) -> bool {
    let parse_major_minor = |version: &str| -> Option<(u32, u32)> {
        let mut parts = version.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        Some((major, minor))
    };

    match (parse_major_minor(module_version), parse_major_minor(loader_version)) {
        (Some(module), Some(loader)) => module == loader,
        _ => module_version == loader_version,
    }
}

#[async_trait]
impl ModuleLoader for DynamicLibraryLoader {
    fn accepts(&self, path: &Path) -> bool {
        extension_of(path).as_deref() == Some(DYNAMIC_LIBRARY_EXTENSION)
    }

    async fn load(&self, path: &Path) -> Result<ModuleNamespace, LoaderError> {
        let loader = self.clone();
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || loader.load_library(&path))
            .await
            .map_err(|e| LoaderError::Library(format!("Library loading task failed: {e}")))?
    }
}
