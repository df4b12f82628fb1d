//! Configuration management for the handler loader.
//!
//! Settings are read from a TOML file. A missing file means defaults; it is
//! never created on disk.

use crate::cli::CliArgs;
use handler_loader::{DynamicLoaderConfig, LoadError, LoadOptions};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::info;

fn default_directory() -> String {
    "handlers".to_string()
}

fn default_options() -> Value {
    Value::Object(Map::new())
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Handler loading settings
    #[serde(default)]
    pub loader: LoaderSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Handler directory and load options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderSettings {
    /// Directory path where handler files are located
    #[serde(default = "default_directory")]
    pub directory: String,
    /// Load options, with the keys accepted by `LoadOptions::from_value`
    #[serde(default = "default_options")]
    pub options: Value,
    /// Version checks for compiled handler libraries
    #[serde(default)]
    pub dynamic: DynamicLoaderConfig,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            options: default_options(),
            dynamic: DynamicLoaderConfig::default(),
        }
    }
}

/// Logging system configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file, or defaults when it does not exist
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if tokio::fs::try_exists(path).await? {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            info!("📄 Loaded configuration from {}", path.display());
            Ok(config)
        } else {
            info!(
                "📄 No configuration file at {}, using defaults",
                path.display()
            );
            Ok(AppConfig::default())
        }
    }

    /// Applies command-line overrides on top of the file values
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(dir) = &args.handler_dir {
            self.loader.directory = dir.to_string_lossy().to_string();
        }
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
        args.apply_to_dynamic_config(&mut self.loader.dynamic);
    }

    /// Load options from the `[loader.options]` table, with CLI overrides
    pub fn load_options(&self, args: &CliArgs) -> Result<LoadOptions, LoadError> {
        let mut options = LoadOptions::from_value(self.loader.options.clone())?;
        if args.recursive {
            options = options.recursive(true);
        }
        if args.sequential {
            options = options.sequential();
        }
        if let Some(policy) = args.export_policy {
            options = options.with_export_policy(policy);
        }
        if let Some(name) = &args.export_name {
            options = options.with_preferred_export_name(name);
        }
        options.validate()?;
        Ok(options)
    }

    pub fn handler_directory(&self) -> PathBuf {
        PathBuf::from(&self.loader.directory)
    }

    pub fn validate(&self) -> Result<(), String> {
        // Validate handler directory
        if self.loader.directory.trim().is_empty() {
            return Err("Handler directory cannot be empty".to_string());
        }

        // Validate load options shape
        LoadOptions::from_value(self.loader.options.clone()).map_err(|e| e.to_string())?;

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handler_loader::{ConcurrencyMode, ExportPolicy};
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.handler_directory(), PathBuf::from("handlers"));
        assert_eq!(
            config.load_options(&CliArgs::default()).unwrap(),
            LoadOptions::default()
        );
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();

        config.loader.directory = " ".to_string();
        assert!(config.validate().is_err());

        config.loader.directory = "handlers".to_string();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "warn".to_string();
        config.loader.options = json!(["not", "a", "table"]);
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_missing_file_yields_defaults_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("handler-loader.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("handler-loader.toml");
        tokio::fs::write(
            &path,
            r#"
                [loader]
                directory = "events"

                [loader.options]
                concurrency = "sequential"
                prepend_args = ["server"]

                [loader.options.keys]
                name = "event"

                [loader.dynamic]
                strict_versioning = true

                [logging]
                level = "debug"
            "#,
        )
        .await
        .unwrap();

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.loader.directory, "events");
        assert!(config.loader.dynamic.strict_versioning);
        assert!(!config.logging.json_format);

        let options = config.load_options(&CliArgs::default()).unwrap();
        assert_eq!(options.concurrency, ConcurrencyMode::Sequential);
        assert_eq!(options.prepend_args, vec![json!("server")]);
        assert_eq!(options.keys.name, "event");
        assert_eq!(options.keys.execute, "execute");
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = AppConfig::default();
        let args = CliArgs {
            handler_dir: Some(PathBuf::from("other")),
            log_level: Some("trace".to_string()),
            json_logs: true,
            recursive: true,
            sequential: true,
            export_policy: Some(ExportPolicy::All),
            strict_versioning: true,
            ..Default::default()
        };

        config.apply_cli_overrides(&args);
        assert_eq!(config.loader.directory, "other");
        assert_eq!(config.logging.level, "trace");
        assert!(config.logging.json_format);
        assert!(config.loader.dynamic.strict_versioning);

        let options = config.load_options(&args).unwrap();
        assert!(options.recursive);
        assert_eq!(options.concurrency, ConcurrencyMode::Sequential);
        assert_eq!(options.export_policy, ExportPolicy::All);
    }

    #[test]
    fn test_empty_export_name_is_rejected() {
        let args = CliArgs {
            export_name: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(
            AppConfig::default().load_options(&args),
            Err(LoadError::InvalidOptions { .. })
        ));
    }
}
