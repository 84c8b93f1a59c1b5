//! `esdv config` command - inspect the layered configuration

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::output::print_structured;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration after all layers are merged
    Show,

    /// List the configuration files that are read, in priority order
    Path,
}

pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show => run_show(global),
        ConfigCommands::Path => run_path(global),
    }
}

fn run_show(global: &GlobalOpts) -> Result<()> {
    let config = Config::load(global.config.as_deref())?;
    let format = match global.output {
        OutputFormat::Json => OutputFormat::Json,
        _ => OutputFormat::Yaml,
    };
    print_structured(&config, format)
}

fn run_path(global: &GlobalOpts) -> Result<()> {
    let mut paths = Config::search_paths();
    paths.extend(global.config.iter().cloned());

    for path in paths {
        if path.is_file() {
            println!("{} {}", style("✓").green(), path.display());
        } else {
            println!(
                "{} {} {}",
                style("✗").dim(),
                path.display(),
                style("(not found)").dim()
            );
        }
    }
    Ok(())
}
