//! Command-line interface handling for the handler loader.
//!
//! Argument parsing uses the `clap` builder API. Every option is an override
//! for a value that can also come from the configuration file.

use clap::{Arg, ArgAction, ArgMatches, Command};
use handler_loader::{DynamicLoaderConfig, ExportPolicy};
use std::ffi::OsString;
use std::path::PathBuf;

/// Command line arguments parsed from user input.
///
/// Every field except `config_path` overrides a configuration file setting or
/// a load option when present; `Default` means "no overrides".
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for the handler directory
    pub handler_dir: Option<PathBuf>,
    /// Include subdirectories
    pub recursive: bool,
    /// Load one file at a time
    pub sequential: bool,
    /// Optional override for the export policy
    pub export_policy: Option<ExportPolicy>,
    /// Optional override for the preferred export name
    pub export_name: Option<String>,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Whether to load modules built for a different loader version (DANGEROUS)
    pub allow_abi_mismatch: bool,
    /// Whether to require exact version matching including patch digits
    pub strict_versioning: bool,
    /// Event to emit once loading succeeded
    pub emit: Option<String>,
    /// JSON array (or single value) passed as the emitted arguments
    pub emit_args: Option<String>,
}

fn command() -> Command {
    Command::new("handler-loader")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Horizon Team")
        .about("Loads a directory of event handler modules and reports how each one binds")
        .arg(
            Arg::new("dir")
                .short('d')
                .long("dir")
                .value_name("DIR")
                .help("Handler directory path"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("handler-loader.toml"),
        )
        .arg(
            Arg::new("recursive")
                .short('r')
                .long("recursive")
                .help("Also load handlers from subdirectories")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("sequential")
                .long("sequential")
                .help("Load handler files one at a time, in directory order")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("export-policy")
                .long("export-policy")
                .value_name("POLICY")
                .value_parser(["default", "named", "all"])
                .help("Which module exports are handlers"),
        )
        .arg(
            Arg::new("export-name")
                .long("export-name")
                .value_name("NAME")
                .help("Named export to read with the `named` policy (`*` for all)"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("allow-abi-mismatch")
                .long("allow-abi-mismatch")
                .help("Load handler libraries built for another loader version (MAY CAUSE CRASHES)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("strict-versioning")
                .long("strict-versioning")
                .help("Require exact version matching including patch digits (default: only major.minor must match)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("emit")
                .short('e')
                .long("emit")
                .value_name("EVENT")
                .help("Emit EVENT after loading; prefix with @ for a registry symbol"),
        )
        .arg(
            Arg::new("args")
                .long("args")
                .value_name("JSON")
                .requires("emit")
                .help("Arguments for --emit, as a JSON array or a single JSON value"),
        )
}

impl CliArgs {
    /// Parses the process arguments using clap.
    ///
    /// # Returns
    ///
    /// A `CliArgs` instance containing all parsed command-line options.
    ///
    /// # Exits
    ///
    /// On invalid arguments (or `--help`/`--version`) clap prints usage
    /// information and terminates the process.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    /// Parses an explicit argument list.
    ///
    /// The first item is the binary name, as with `std::env::args`.
    ///
    /// # Errors
    ///
    /// Returns the clap error for unknown flags, invalid `--export-policy`
    /// values and `--args` given without `--emit`.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(Self::from_matches(&command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_default(),
            handler_dir: matches.get_one::<String>("dir").map(PathBuf::from),
            recursive: matches.get_flag("recursive"),
            sequential: matches.get_flag("sequential"),
            export_policy: matches
                .get_one::<String>("export-policy")
                .and_then(|policy| match policy.as_str() {
                    "default" => Some(ExportPolicy::Default),
                    "named" => Some(ExportPolicy::Named),
                    "all" => Some(ExportPolicy::All),
                    _ => None,
                }),
            export_name: matches.get_one::<String>("export-name").cloned(),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            allow_abi_mismatch: matches.get_flag("allow-abi-mismatch"),
            strict_versioning: matches.get_flag("strict-versioning"),
            emit: matches.get_one::<String>("emit").cloned(),
            emit_args: matches.get_one::<String>("args").cloned(),
        }
    }

    /// Merges the dynamic library safety flags into `config`.
    ///
    /// Flags can only enable a check or relaxation; a flag left off never
    /// clears a setting coming from the configuration file.
    ///
    /// # Arguments
    ///
    /// * `config` - Dynamic loader settings read from the configuration file
    pub fn apply_to_dynamic_config(&self, config: &mut DynamicLoaderConfig) {
        config.allow_abi_mismatch |= self.allow_abi_mismatch;
        config.strict_versioning |= self.strict_versioning;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::try_parse_from(["handler-loader"]).unwrap();
        assert_eq!(args.config_path, PathBuf::from("handler-loader.toml"));
        assert!(args.handler_dir.is_none());
        assert!(!args.recursive && !args.sequential && !args.json_logs);
        assert!(args.export_policy.is_none());
        assert!(args.emit.is_none());
    }

    #[test]
    fn test_overrides() {
        let args = CliArgs::try_parse_from([
            "handler-loader",
            "--dir",
            "events",
            "-r",
            "--sequential",
            "--export-policy",
            "named",
            "--export-name",
            "*",
            "--log-level",
            "debug",
            "--emit",
            "ping",
            "--args",
            "[1, \"two\"]",
        ])
        .unwrap();

        assert_eq!(args.handler_dir, Some(PathBuf::from("events")));
        assert!(args.recursive && args.sequential);
        assert_eq!(args.export_policy, Some(ExportPolicy::Named));
        assert_eq!(args.export_name.as_deref(), Some("*"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert_eq!(args.emit.as_deref(), Some("ping"));
        assert_eq!(args.emit_args.as_deref(), Some("[1, \"two\"]"));
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(CliArgs::try_parse_from(["handler-loader", "--export-policy", "first"]).is_err());
        assert!(CliArgs::try_parse_from(["handler-loader", "--args", "[]"]).is_err());
    }

    #[test]
    fn test_dynamic_safety_flags() {
        let args = CliArgs::try_parse_from(["handler-loader", "--allow-abi-mismatch"]).unwrap();
        let mut config = DynamicLoaderConfig {
            strict_versioning: true,
            ..Default::default()
        };
        args.apply_to_dynamic_config(&mut config);
        assert!(config.allow_abi_mismatch);
        assert!(config.strict_versioning);
    }
}
