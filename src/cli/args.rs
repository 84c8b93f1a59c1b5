//! Top-level command line definition

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use crate::cli::commands::{
    cdm::CdmArgs, completions::CompletionsArgs, config::ConfigCommands, hbm::HbmArgs,
    table::TableArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "esdv",
    version,
    about = "ESD waveform verifier - check captured discharge currents against JS-001 and JS-002",
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command
#[derive(clap::Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Output format
    #[arg(short = 'o', long, global = true, value_enum, default_value_t = OutputFormat::Auto)]
    pub output: OutputFormat,

    /// Log more detail to stderr (repeat for more)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file applied over the user and working-directory configs
    #[arg(long, global = true, env = "ESDV_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Use the configured format, falling back to text
    #[default]
    Auto,
    /// Human-readable tables
    Text,
    Yaml,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate a capture against the JS-002 charged-device model
    Cdm(CdmArgs),

    /// Evaluate a capture against the JS-001 human-body model
    Hbm(HbmArgs),

    /// Show published tolerance tables or the entry resolved for a voltage
    Table(TableArgs),

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}
