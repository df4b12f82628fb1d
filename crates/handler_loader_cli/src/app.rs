//! Main application logic.
//!
//! The `Application` loads the configured handler directory into an in-memory
//! emitter, reports every binding and can emit one event through the loaded
//! listeners.

use crate::{cli::CliArgs, config::AppConfig, logging::display_banner};
use async_trait::async_trait;
use handler_loader::{
    bind, normalize, BindMethod, BindOverride, BoxError, DynamicLibraryLoader, EventName,
    HandlerLoader, HandlerRegistry, Invocation, KeyAliasMap, Listener, LoadError, LoadOptions,
    LoadSummary, LoaderSet, ManifestLoader, PropertyValue, TargetEmitter,
};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info};

/// Emitter that keeps listeners in memory, in registration order
#[derive(Default)]
pub struct RecordingEmitter {
    listeners: Mutex<HashMap<EventName, Vec<RecordedListener>>>,
}

struct RecordedListener {
    listener: Listener,
    once: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RecordingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, event: EventName, listener: Listener, once: bool, prepend: bool) {
        let mut listeners = lock(&self.listeners);
        let list = listeners.entry(event).or_default();
        let entry = RecordedListener { listener, once };
        if prepend {
            list.insert(0, entry);
        } else {
            list.push(entry);
        }
    }

    pub fn listener_count(&self, event: &EventName) -> usize {
        lock(&self.listeners).get(event).map_or(0, Vec::len)
    }

    /// Call every listener of `event` in order, dropping once-listeners first
    pub fn emit(&self, event: &EventName, args: &[Value]) -> Vec<Invocation> {
        let listeners: Vec<Listener> = {
            let mut map = lock(&self.listeners);
            let Some(list) = map.get_mut(event) else {
                return Vec::new();
            };
            let listeners = list.iter().map(|entry| entry.listener.clone()).collect();
            list.retain(|entry| !entry.once);
            listeners
        };
        listeners.iter().map(|listener| listener.call(args)).collect()
    }
}

impl TargetEmitter for RecordingEmitter {
    fn on(&self, event: EventName, listener: Listener) {
        self.insert(event, listener, false, false);
    }

    fn add_listener(&self, event: EventName, listener: Listener) {
        self.insert(event, listener, false, false);
    }

    fn once(&self, event: EventName, listener: Listener) {
        self.insert(event, listener, true, false);
    }

    fn prepend_listener(&self, event: EventName, listener: Listener) {
        self.insert(event, listener, false, true);
    }

    fn prepend_once_listener(&self, event: EventName, listener: Listener) {
        self.insert(event, listener, true, true);
    }
}

/// One handler as it was bound
#[derive(Debug, Clone)]
pub struct BindingRecord {
    pub method: BindMethod,
    pub event: EventName,
    pub file: PathBuf,
    pub is_async: bool,
}

/// Binds like the default path while recording which file each handler came from
struct InspectingBinder {
    keys: KeyAliasMap,
    records: Mutex<Vec<BindingRecord>>,
}

#[async_trait]
impl BindOverride<RecordingEmitter> for InspectingBinder {
    async fn bind(
        &self,
        target: &RecordingEmitter,
        candidate: PropertyValue,
        source: &Path,
        prepend_args: &[Value],
    ) -> Result<(), BoxError> {
        let handler = normalize(&candidate, &self.keys, source)?;
        let listener = Listener::new(handler.execute.clone(), Arc::from(prepend_args));
        let method = bind(target, &handler, listener);

        lock(&self.records).push(BindingRecord {
            method,
            event: handler.event_name,
            file: source.to_path_buf(),
            is_async: handler.execute.is_async(),
        });
        Ok(())
    }
}

/// Validation errors raised inside the binder surface as themselves
fn unwrap_binder_error(err: LoadError) -> LoadError {
    match err {
        LoadError::BindOverride { file, source } => match source.downcast::<LoadError>() {
            Ok(inner) => *inner,
            Err(source) => LoadError::BindOverride { file, source },
        },
        other => other,
    }
}

/// Outcome of one application run
#[derive(Debug)]
pub struct RunReport {
    pub summary: LoadSummary,
    pub bindings: Vec<BindingRecord>,
    /// Listeners called by `--emit`, if an event was emitted
    pub emitted: Option<usize>,
}

/// Functions available to manifests under `execute = { fn = "..." }`
pub fn builtin_registry() -> HandlerRegistry {
    let registry = HandlerRegistry::new();
    registry
        .register_sync("log", |args| {
            let shown = Value::Array(args.to_vec());
            info!("📣 log handler called with {}", shown);
            Ok(())
        })
        .register_sync("print", |args| {
            println!("{}", Value::Array(args.to_vec()));
            Ok(())
        });
    registry
}

/// Parse `--args`: a JSON array is spread, any other value is a single argument
fn parse_emit_args(raw: Option<&str>) -> Result<Vec<Value>, serde_json::Error> {
    Ok(match raw {
        None => Vec::new(),
        Some(raw) => match serde_json::from_str(raw)? {
            Value::Array(items) => items,
            single => vec![single],
        },
    })
}

/// Main application struct.
pub struct Application {
    config: AppConfig,
    options: LoadOptions,
    registry: HandlerRegistry,
    loader: HandlerLoader,
    emit: Option<(String, Vec<Value>)>,
}

impl Application {
    /// Creates a new application instance.
    ///
    /// `config` must already carry the CLI overrides.
    pub fn new(args: CliArgs, config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }

        let options = config.load_options(&args)?;
        let emit = match args.emit {
            Some(event) => Some((event, parse_emit_args(args.emit_args.as_deref())?)),
            None => None,
        };

        let registry = builtin_registry();
        let loader = HandlerLoader::new(
            LoaderSet::new()
                .with(DynamicLibraryLoader::new(config.loader.dynamic.clone()))
                .with(ManifestLoader::new(registry.clone())),
        );

        display_banner();
        info!(
            "📂 Config: {} | Handlers: {} | Concurrency: {:?}",
            args.config_path.display(),
            config.loader.directory,
            options.concurrency
        );

        Ok(Self {
            config,
            options,
            registry,
            loader,
            emit,
        })
    }

    /// `@name` refers to the registry symbol `name`, anything else is a string event
    fn event_name(&self, raw: &str) -> EventName {
        match raw.strip_prefix('@') {
            Some(key) if !key.is_empty() => EventName::Symbol(self.registry.symbol(key)),
            _ => EventName::from(raw),
        }
    }

    /// Loads the handlers and performs the optional emission
    pub async fn execute(&self) -> Result<RunReport, Box<dyn std::error::Error>> {
        let emitter = RecordingEmitter::new();
        let binder = InspectingBinder {
            keys: self.options.keys.clone(),
            records: Mutex::new(Vec::new()),
        };

        let summary = self
            .loader
            .load_event_handlers_with(
                self.config.handler_directory(),
                &emitter,
                self.options.clone(),
                &binder,
            )
            .await
            .map_err(unwrap_binder_error)?;
        let bindings = std::mem::take(&mut *lock(&binder.records));

        let emitted = match &self.emit {
            Some((event, args)) => Some(self.emit_event(&emitter, event, args).await?),
            None => None,
        };

        Ok(RunReport {
            summary,
            bindings,
            emitted,
        })
    }

    async fn emit_event(
        &self,
        emitter: &RecordingEmitter,
        event: &str,
        args: &[Value],
    ) -> Result<usize, Box<dyn std::error::Error>> {
        let event_name = self.event_name(event);
        let invocations = emitter.emit(&event_name, args);
        let called = invocations.len();

        let results = futures::future::join_all(invocations.into_iter().map(Invocation::settle)).await;
        let failures = results
            .into_iter()
            .filter_map(Result::err)
            .inspect(|e| error!("❌ Handler for {} failed: {}", event_name, e))
            .count();

        info!("📣 Emitted {} to {} listener(s)", event_name, called);
        if failures > 0 {
            return Err(format!("{failures} handler(s) failed while handling {event_name}").into());
        }
        Ok(called)
    }

    /// Runs the application and prints one line per binding on stdout
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let report = self.execute().await?;

        for binding in &report.bindings {
            println!(
                "{} {} {}",
                binding.method,
                binding.event,
                binding.file.display()
            );
        }

        info!(
            "✅ {} handler(s) bound from {} module(s), {} file(s) skipped",
            report.summary.handlers_bound, report.summary.modules_loaded, report.summary.files_skipped
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_handler(dir: &Path, file: &str, content: &str) {
        std::fs::write(dir.join(file), content).expect("Failed to write handler file");
    }

    fn application(dir: &Path, args: CliArgs) -> Application {
        let mut config = AppConfig::default();
        config.loader.directory = dir.to_string_lossy().to_string();
        Application::new(args, config).expect("Failed to create application")
    }

    #[test]
    fn test_parse_emit_args() {
        assert!(parse_emit_args(None).unwrap().is_empty());
        assert_eq!(
            parse_emit_args(Some("[1, \"a\"]")).unwrap(),
            vec![json!(1), json!("a")]
        );
        assert_eq!(parse_emit_args(Some("{\"id\": 2}")).unwrap(), vec![json!({"id": 2})]);
        assert!(parse_emit_args(Some("{broken")).is_err());
    }

    #[test]
    fn test_builtin_functions_accept_any_arguments() {
        let registry = builtin_registry();
        assert_eq!(registry.function_count(), 2);

        for key in ["log", "print"] {
            let Some(handler_loader::Execute::Sync(f)) = registry.function(key) else {
                panic!("builtin {key} is not a sync function");
            };
            assert!(f(&[json!("hello"), json!({"id": 1})]).is_ok());
            assert!(f(&[]).is_ok());
        }
    }

    #[test]
    fn test_recording_emitter_order_and_once() {
        let emitter = RecordingEmitter::new();
        let event = EventName::from("tick");
        let listener = Listener::new(handler_loader::Execute::sync(|_| Ok(())), Arc::from(Vec::new()));

        emitter.on(event.clone(), listener.clone());
        emitter.prepend_once_listener(event.clone(), listener);
        assert_eq!(emitter.listener_count(&event), 2);

        assert_eq!(emitter.emit(&event, &[]).len(), 2);
        assert_eq!(emitter.listener_count(&event), 1);
        assert!(emitter.emit(&EventName::from("other"), &[]).is_empty());
    }

    #[tokio::test]
    async fn test_execute_reports_bindings_and_emits() {
        let dir = tempfile::tempdir().unwrap();
        write_handler(
            dir.path(),
            "ping.toml",
            "[default]\nname = \"ping\"\nexecute = { fn = \"log\" }\n",
        );
        write_handler(
            dir.path(),
            "first.toml",
            "[default]\nname = \"ping\"\nisPrepend = true\nisOnce = true\nexecute = { fn = \"log\" }\n",
        );
        write_handler(dir.path(), "README.md", "ignored");

        let app = application(
            dir.path(),
            CliArgs {
                sequential: true,
                emit: Some("ping".to_string()),
                emit_args: Some("[\"hello\"]".to_string()),
                ..Default::default()
            },
        );
        let report = app.execute().await.expect("Run failed");

        assert_eq!(report.summary.handlers_bound, 2);
        assert_eq!(report.summary.files_skipped, 1);
        let lines: Vec<String> = report
            .bindings
            .iter()
            .map(|b| format!("{} {}", b.method, b.event))
            .collect();
        assert_eq!(lines, vec!["prependOnceListener ping", "on ping"]);
        assert!(report.bindings[0].file.ends_with("first.toml"));
        assert_eq!(report.emitted, Some(2));
    }

    #[tokio::test]
    async fn test_symbol_events() {
        let dir = tempfile::tempdir().unwrap();
        write_handler(
            dir.path(),
            "ready.json",
            r#"{ "default": { "name": { "symbol": "ready" }, "execute": { "fn": "log" } } }"#,
        );

        let app = application(
            dir.path(),
            CliArgs {
                emit: Some("@ready".to_string()),
                ..Default::default()
            },
        );
        let report = app.execute().await.expect("Run failed");
        assert_eq!(report.emitted, Some(1));
        assert_eq!(report.bindings[0].event.to_string(), "Symbol(ready)");
    }

    #[tokio::test]
    async fn test_validation_errors_are_reported_directly() {
        let dir = tempfile::tempdir().unwrap();
        write_handler(dir.path(), "bad.toml", "[default]\nexecute = { fn = \"log\" }\n");

        let err = application(dir.path(), CliArgs::default())
            .execute()
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LoadError>(),
            Some(LoadError::MissingProperty { alias, .. }) if alias == "name"
        ));
    }

    #[test]
    fn test_invalid_configuration() {
        let mut config = AppConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(Application::new(CliArgs::default(), config).is_err());
    }
}
