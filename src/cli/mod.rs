//! CLI module - argument parsing and command dispatch

pub mod args;
pub mod choices;
pub mod commands;
pub mod helpers;
pub mod logging;
pub mod output;

pub use args::{Cli, Commands, GlobalOpts, OutputFormat};
pub use choices::{BandwidthArg, LoadArg, NoiseArg, StandardArg, TargetArg};
