// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `assetflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetflow",
    version,
    about = "Build front-end assets and rebuild them on change.",
    long_about = None
)]
pub struct CliArgs {
    /// What to do. Defaults to `watch`.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to the config file (TOML). The file is optional; built-in
    /// defaults are used for everything it does not set.
    #[arg(long, value_name = "PATH", default_value = "Assetflow.toml", global = true)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Validate config, print targets, plan and watch bindings, run nothing.
    #[arg(long, global = true)]
    pub dry_run: bool,
}

impl CliArgs {
    /// The effective command (`watch` when none was given).
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Watch { no_serve: false })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the full build plan once and exit.
    Build,
    /// Run the full build plan, serve the output and rebuild on change.
    Watch {
        /// Do not start the dev server / live reload.
        #[arg(long)]
        no_serve: bool,
    },
    /// Remove everything under the build root.
    Clean,
    /// Drop all cached image optimization results.
    ClearCache,
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
