//! Module loaders
//!
//! A [`ModuleLoader`] turns one file into a [`ModuleNamespace`]. Two loaders
//! ship with the crate: [`ManifestLoader`] for declarative `.toml`/`.json`
//! handler files backed by a [`HandlerRegistry`], and [`DynamicLibraryLoader`]
//! for compiled handler modules.

mod dynamic;
mod manifest;

pub use dynamic::{DynamicLibraryLoader, DynamicLoaderConfig, DYNAMIC_LIBRARY_EXTENSION};
pub use manifest::{HandlerRegistry, ManifestLoader};

use crate::error::LoaderError;
use crate::module::ModuleNamespace;
use async_trait::async_trait;
use std::path::Path;

/// Loads handler modules from files
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    /// Whether this loader handles `path`. Files nobody accepts are skipped.
    fn accepts(&self, path: &Path) -> bool;

    /// Load `path` exactly once and return its exports
    async fn load(&self, path: &Path) -> Result<ModuleNamespace, LoaderError>;
}

#[async_trait]
impl<L: ModuleLoader + ?Sized> ModuleLoader for Box<L> {
    fn accepts(&self, path: &Path) -> bool {
        (**self).accepts(path)
    }

    async fn load(&self, path: &Path) -> Result<ModuleNamespace, LoaderError> {
        (**self).load(path).await
    }
}

/// Lowercased file extension
pub(crate) fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|extension| extension.to_string_lossy().to_lowercase())
}

/// Dispatches each file to the first loader that accepts it
#[derive(Default)]
pub struct LoaderSet {
    loaders: Vec<Box<dyn ModuleLoader>>,
}

impl LoaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a loader; earlier loaders win when several accept a file
    pub fn with(mut self, loader: impl ModuleLoader + 'static) -> Self {
        self.loaders.push(Box::new(loader));
        self
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}

#[async_trait]
impl ModuleLoader for LoaderSet {
    fn accepts(&self, path: &Path) -> bool {
        self.loaders.iter().any(|loader| loader.accepts(path))
    }

    async fn load(&self, path: &Path) -> Result<ModuleNamespace, LoaderError> {
        match self.loaders.iter().find(|loader| loader.accepts(path)) {
            Some(loader) => loader.load(path).await,
            None => Err(LoaderError::Unsupported(path.display().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_loader_set_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("ping.toml");
        std::fs::write(&file, "[default]\nname = \"ping\"\n").unwrap();

        let loaders = LoaderSet::new()
            .with(DynamicLibraryLoader::default())
            .with(ManifestLoader::new(HandlerRegistry::new()));

        assert_eq!(loaders.len(), 2);
        assert!(loaders.accepts(&file));
        assert!(loaders.accepts(Path::new(&format!("lib.{DYNAMIC_LIBRARY_EXTENSION}"))));
        assert!(!loaders.accepts(Path::new("README.md")));

        let namespace = loaders.load(&file).await.unwrap();
        assert!(namespace.default_export().is_some());

        let err = loaders.load(&PathBuf::from("notes.txt")).await.unwrap_err();
        assert!(matches!(err, LoaderError::Unsupported(_)));
    }

    #[test]
    fn test_extension_is_lowercased() {
        assert_eq!(extension_of(Path::new("a/B.TOML")).as_deref(), Some("toml"));
        assert_eq!(extension_of(Path::new("Makefile")), None);
    }
}
