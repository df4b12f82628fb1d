//! Logging system setup and configuration.
//!
//! Logs go to stderr so the binding report on stdout stays machine readable.

use crate::config::LoggingSettings;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the logging system with the specified configuration.
///
/// # Arguments
///
/// * `config` - Logging configuration from the config file
/// * `json_format` - Whether to force JSON output format (CLI override)
///
/// # Returns
///
/// `Ok(())` if logging was set up, or an error when a global subscriber is
/// already installed.
///
/// # Features
///
/// * **Environment variable support** - `RUST_LOG` takes precedence over the configured level
/// * **Flexible formatting** - Human-readable or JSON output
/// * **Clean stdout** - Every event is written to stderr
pub fn setup_logging(
    config: &LoggingSettings,
    json_format: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = config.level.as_str();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if json_format || config.json_format {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_file(false)
                    .with_line_number(false)
                    .with_target(false),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_file(false)
                    .with_line_number(false)
                    .with_target(false),
            )
            .try_init()?;
    }

    info!("🔧 Logging initialized with level: {}", log_level);
    Ok(())
}

/// Logs the tool name and library version.
///
/// The library version is the one compiled handler modules are checked against.
pub fn display_banner() {
    info!(
        "🧩 Handler Loader v{} (library v{})",
        env!("CARGO_PKG_VERSION"),
        handler_loader::HANDLER_LOADER_VERSION
    );
}
