// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::loader::default_config_path;

/// Command-line arguments for `pipexec`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pipexec",
    version,
    about = "Run a table of external commands as a connected process pipeline.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the pipeline file (TOML).
    ///
    /// Default: `Pipeline.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Read the first stage's stdin from this file (overrides `[pipeline].input`).
    #[arg(long, value_name = "PATH")]
    pub input: Option<String>,

    /// Write the last stage's stdout to this file (overrides `[pipeline].output`).
    #[arg(long, value_name = "PATH")]
    pub output: Option<String>,

    /// Kill stages still running after this long, e.g. `500ms`, `10s`, `2m`.
    #[arg(long, value_name = "DURATION")]
    pub timeout: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PIPEXEC_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the pipeline, but don't spawn any stage.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
