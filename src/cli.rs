// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

use crate::types::{BuildSequence, GeneratorMode};

/// Command-line arguments for `sitepipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sitepipe",
    version,
    about = "Compile assets, run the site generator and serve the result with live reload.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// If omitted, `Sitepipe.toml` in the current directory is used when it
    /// exists, and built-in defaults otherwise.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<String>,

    /// Override the dev server port from `[serve].port`.
    #[arg(long, value_name = "PORT", global = true)]
    pub port: Option<u16>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SITEPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Load + validate the config, print the plan, but don't execute anything.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// What to run. Defaults to `serve`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl CliArgs {
    /// The effective command (`serve` when none was given).
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Remove the generated site, staging area and compiled assets.
    Clean,
    /// Compile the script bundle and style sheets.
    Compile,
    /// Run the site generator once.
    Generate {
        /// Generator mode; `serve` hands serving over to the generator itself.
        #[arg(long, value_enum, default_value = "build")]
        mode: GeneratorMode,
    },
    /// clean -> compile -> generate, then exit.
    Build,
    /// Build, then rebuild whenever watched sources change.
    Watch,
    /// Build, start the dev server, then rebuild on change.
    Serve,
}

impl Command {
    /// Steps requested by the first cycle of this command.
    pub fn initial_sequence(&self) -> BuildSequence {
        match self {
            Command::Clean => BuildSequence::Clean,
            Command::Compile => BuildSequence::Compile,
            Command::Generate { .. } => BuildSequence::Generate,
            Command::Build | Command::Watch | Command::Serve => BuildSequence::Full,
        }
    }

    /// Whether the process terminates once the first cycle is done.
    pub fn is_one_shot(&self) -> bool {
        !matches!(self, Command::Watch | Command::Serve)
    }

    pub fn starts_server(&self) -> bool {
        matches!(self, Command::Serve)
    }
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
