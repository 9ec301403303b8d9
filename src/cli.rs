// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `devwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "devwatch",
    version,
    about = "Start, supervise and tear down local build providers.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `devwatch.toml` in the current working directory.
    #[arg(long, global = true, value_name = "PATH", default_value = "devwatch.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DEVWATCH_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the one-shot init services (e.g. binary installation).
    Dev,
    /// Init every enabled service, then run the watch-mode ones until Ctrl-C.
    Watch,
    /// Init every enabled service, then run a one-shot build for each.
    Build,
    /// Download or refresh every required binary and npm package.
    Install,
    /// Print the resolved start order without running anything.
    Plan,
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
