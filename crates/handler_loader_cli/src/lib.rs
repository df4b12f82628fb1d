//! # Handler Loader CLI
//!
//! Loads a directory of event handler modules the same way an application
//! would, then prints how each handler was bound.
//!
//! ## Quick Start
//!
//! ```bash
//! # Load ./handlers (or the directory from handler-loader.toml)
//! handler-loader
//!
//! # Inspect another directory, one file at a time
//! handler-loader --dir ./events --sequential
//!
//! # Bind every named export and fire an event through the listeners
//! handler-loader --export-policy all --emit ping --args '["hello"]'
//! ```
//!
//! Each binding is printed as `<method> <event> <file>` on stdout; logs go to
//! stderr. Any load error exits with status 1.

use tracing::error;

pub mod app;
pub mod cli;
pub mod config;
pub mod logging;

use app::Application;
use cli::CliArgs;
use config::AppConfig;

/// Entry point used by the `handler-loader` binary.
///
/// # Exit Codes
///
/// * **0**: every handler loaded (and every emitted listener succeeded)
/// * **1**: configuration, loading or handler error
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    // Parse CLI arguments first
    let args = CliArgs::parse();

    // Configuration provides the logging settings
    let mut config = match AppConfig::load_from_file(&args.config_path).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to read {}: {e}", args.config_path.display());
            std::process::exit(1);
        }
    };
    config.apply_cli_overrides(&args);

    // Setup logging before anything else
    if let Err(e) = logging::setup_logging(&config.logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(args, config) {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Handler loading failed: {e}");
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start: {e}");
            std::process::exit(1);
        }
    }

    Ok(())
}

// Re-export main types for library usage
pub use app::{builtin_registry, BindingRecord, RecordingEmitter, RunReport};
pub use config::{LoaderSettings, LoggingSettings};
