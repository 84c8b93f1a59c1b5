use clap::Parser;
use esdv::cli::logging::init_logging;
use esdv::cli::{Cli, Commands};
use miette::Result;

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    match cli.command {
        Commands::Cdm(args) => esdv::cli::commands::cdm::run(args, &cli.global),
        Commands::Hbm(args) => esdv::cli::commands::hbm::run(args, &cli.global),
        Commands::Table(args) => esdv::cli::commands::table::run(args, &cli.global),
        Commands::Config(cmd) => esdv::cli::commands::config::run(cmd, &cli.global),
        Commands::Completions(args) => esdv::cli::commands::completions::run(args),
    }
}
