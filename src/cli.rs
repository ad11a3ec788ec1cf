// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `watchhook`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "watchhook",
    version,
    about = "Poll content-repository projects and call a webhook when they change.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `$WATCHHOOK_CONFIG`, else `Watchhook.toml` in the current
    /// working directory.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Run a single poll cycle and exit.
    #[arg(long)]
    pub once: bool,

    /// Call every enabled webhook on the first cycle, changed or not.
    #[arg(long)]
    pub force: bool,

    /// Print watch entries with their stored cursor and exit.
    #[arg(long)]
    pub list: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WATCHHOOK_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate and print the config; no network or state access.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let args = CliArgs::try_parse_from([
            "watchhook",
            "--config",
            "site.toml",
            "--once",
            "--force",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(args.config, Some(PathBuf::from("site.toml")));
        assert!(args.once);
        assert!(args.force);
        assert!(!args.list);
        assert_eq!(args.log_level, Some(LogLevel::Debug));
    }

    #[test]
    fn config_is_optional() {
        let args = CliArgs::try_parse_from(["watchhook"]).unwrap();
        assert!(args.config.is_none());
        assert!(!args.dry_run);
    }
}
