//! Handler loading orchestration

use crate::binder::{bind, BindOverride};
use crate::emitter::TargetEmitter;
use crate::error::LoadError;
use crate::listener::Listener;
use crate::loader::ModuleLoader;
use crate::module::ExportSelection;
use crate::options::{ConcurrencyMode, KeyAliasMap, LoadOptions};
use crate::resolver::{DirectoryResolver, FsDirectoryResolver};
use crate::validate::normalize;
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Counters describing a successful load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct LoadSummary {
    /// Files returned by the resolver
    pub files_found: usize,
    /// Files no module loader accepts
    pub files_skipped: usize,
    pub modules_loaded: usize,
    /// Handlers bound, or handed to the bind override
    pub handlers_bound: usize,
}

/// Loads every handler module of a directory and binds it onto a target.
///
/// The loader is stateless between calls: loading the same directory twice
/// imports every file again and registers every handler a second time.
pub struct HandlerLoader {
    loader: Box<dyn ModuleLoader>,
    resolver: Box<dyn DirectoryResolver>,
}

/// State shared by the per-file pipelines of one load call
struct LoadContext<'a, T: TargetEmitter + ?Sized> {
    target: &'a T,
    bind_override: Option<&'a dyn BindOverride<T>>,
    selection: ExportSelection,
    keys: &'a KeyAliasMap,
    prepend_args: Arc<[Value]>,
}

impl HandlerLoader {
    /// Create a loader reading the filesystem through [`FsDirectoryResolver`]
    pub fn new(loader: impl ModuleLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            resolver: Box::new(FsDirectoryResolver),
        }
    }

    /// Replace the directory resolver
    pub fn with_resolver(mut self, resolver: impl DirectoryResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Load the handlers found in `directory` and bind them onto `target`.
    ///
    /// # Arguments
    ///
    /// * `directory` - Handler directory; resolved to an absolute path first
    /// * `target` - Emitter receiving one listener per handler
    /// * `options` - Export policy, key aliases, prepended arguments, recursion
    ///   and concurrency mode
    ///
    /// # Returns
    ///
    /// A [`LoadSummary`] counting the files seen and the handlers bound.
    ///
    /// # Errors
    ///
    /// * [`LoadError::InvalidDirectory`] - the path is missing, not a directory
    ///   or cannot be listed
    /// * [`LoadError::InvalidOptions`] - rejected before any file is read
    /// * [`LoadError::EmptyDirectory`] - no file is accepted by the module loader
    /// * any module, export or validation error from a single file
    ///
    /// In sequential mode loading stops at the first failing file. In
    /// concurrent mode every file is still processed and the first failure
    /// is returned afterwards. Either way, listeners bound before a failure
    /// stay bound.
    pub async fn load_event_handlers<T>(
        &self,
        directory: impl AsRef<Path>,
        target: &T,
        options: LoadOptions,
    ) -> Result<LoadSummary, LoadError>
    where
        T: TargetEmitter + ?Sized,
    {
        self.run(directory.as_ref(), target, options, None).await
    }

    /// Like [`load_event_handlers`](Self::load_event_handlers), but every
    /// handler candidate goes to `bind_override` instead of being validated
    /// and bound.
    pub async fn load_event_handlers_with<T>(
        &self,
        directory: impl AsRef<Path>,
        target: &T,
        options: LoadOptions,
        bind_override: &dyn BindOverride<T>,
    ) -> Result<LoadSummary, LoadError>
    where
        T: TargetEmitter + ?Sized,
    {
        self.run(directory.as_ref(), target, options, Some(bind_override))
            .await
    }

    async fn run<T>(
        &self,
        directory: &Path,
        target: &T,
        options: LoadOptions,
        bind_override: Option<&dyn BindOverride<T>>,
    ) -> Result<LoadSummary, LoadError>
    where
        T: TargetEmitter + ?Sized,
    {
        let root = resolve_root(directory).await?;
        options.validate()?;

        let files = self
            .resolver
            .resolve(&root, options.recursive)
            .await
            .map_err(|e| LoadError::InvalidDirectory {
                path: root.clone(),
                reason: e.to_string(),
            })?;
        let files_found = files.len();

        let (modules, skipped): (Vec<PathBuf>, Vec<PathBuf>) =
            files.into_iter().partition(|file| self.loader.accepts(file));
        for file in &skipped {
            debug!("⏭️ Skipping {}: no loader accepts it", file.display());
        }
        if modules.is_empty() {
            return Err(LoadError::EmptyDirectory {
                path: root,
                files_found,
            });
        }

        info!(
            "🔌 Loading {} handler module(s) from {} ({:?})",
            modules.len(),
            root.display(),
            options.concurrency
        );

        let context = LoadContext {
            target,
            bind_override,
            selection: options.export_selection(),
            keys: &options.keys,
            prepend_args: Arc::from(options.prepend_args.clone()),
        };

        let handlers_bound = match options.concurrency {
            ConcurrencyMode::Sequential => {
                let mut bound = 0;
                for file in &modules {
                    bound += self.load_file(&context, file).await?;
                }
                bound
            }
            ConcurrencyMode::Concurrent => {
                let mut pipelines: FuturesUnordered<_> = modules
                    .iter()
                    .map(|file| self.load_file(&context, file))
                    .collect();

                // Every started pipeline runs to completion before the first failure is reported
                let mut bound = 0;
                let mut first_error = None;
                while let Some(result) = pipelines.next().await {
                    match result {
                        Ok(count) => bound += count,
                        Err(e) if first_error.is_none() => first_error = Some(e),
                        Err(e) => debug!("Additional handler load failure: {}", e),
                    }
                }
                if let Some(e) = first_error {
                    return Err(e);
                }
                bound
            }
        };

        let summary = LoadSummary {
            files_found,
            files_skipped: skipped.len(),
            modules_loaded: modules.len(),
            handlers_bound,
        };
        info!(
            "🎉 Handler loading complete: {} handler(s) from {} module(s)",
            summary.handlers_bound, summary.modules_loaded
        );
        Ok(summary)
    }

    /// Import one file, then bind (or hand over) each of its candidates
    async fn load_file<T>(
        &self,
        context: &LoadContext<'_, T>,
        file: &Path,
    ) -> Result<usize, LoadError>
    where
        T: TargetEmitter + ?Sized,
    {
        let result = self.import_and_bind(context, file).await;
        if let Err(e) = &result {
            error!("❌ Failed to load handlers from {}: {}", file.display(), e);
        }
        result
    }

    async fn import_and_bind<T>(
        &self,
        context: &LoadContext<'_, T>,
        file: &Path,
    ) -> Result<usize, LoadError>
    where
        T: TargetEmitter + ?Sized,
    {
        let namespace = self
            .loader
            .load(file)
            .await
            .map_err(|source| LoadError::ModuleLoad {
                file: file.to_path_buf(),
                source,
            })?;
        let candidates = context.selection.select(namespace, file)?;

        let mut bound = 0;
        for candidate in candidates {
            match context.bind_override {
                Some(bind_override) => {
                    bind_override
                        .bind(context.target, candidate.value, file, &context.prepend_args)
                        .await
                        .map_err(|source| LoadError::BindOverride {
                            file: file.to_path_buf(),
                            source,
                        })?;
                    debug!(
                        "🔗 Bind override handled export `{}` of {}",
                        candidate.export,
                        file.display()
                    );
                }
                None => {
                    let handler = normalize(&candidate.value, context.keys, file)?;
                    let listener =
                        Listener::new(handler.execute.clone(), context.prepend_args.clone());
                    let method = bind(context.target, &handler, listener);
                    debug!(
                        "🔗 Bound `{}` via {} from {} (export `{}`)",
                        handler.event_name,
                        method,
                        file.display(),
                        candidate.export
                    );
                }
            }
            bound += 1;
        }
        Ok(bound)
    }
}

/// Absolute, symlink-free form of the handler directory
async fn resolve_root(directory: &Path) -> Result<PathBuf, LoadError> {
    let invalid = |reason: String| LoadError::InvalidDirectory {
        path: directory.to_path_buf(),
        reason,
    };

    let root = tokio::fs::canonicalize(directory)
        .await
        .map_err(|e| invalid(e.to_string()))?;
    let metadata = tokio::fs::metadata(&root)
        .await
        .map_err(|e| invalid(e.to_string()))?;
    if !metadata.is_dir() {
        return Err(invalid("not a directory".to_string()));
    }
    Ok(root)
}
