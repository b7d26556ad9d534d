mod cli;
mod commands;
mod config;
mod progress;

use std::process::ExitCode;

use clap::Parser;
use engine_logging::{engine_error, level_for_verbosity, LogDestination};

use crate::cli::{Args, Command};
use crate::config::HarvestConfig;

fn main() -> ExitCode {
    let args = Args::parse();

    let destination = match &args.log_file {
        Some(path) => LogDestination::TerminalAndFile(path.clone()),
        None => LogDestination::Terminal,
    };
    engine_logging::initialize(destination, level_for_verbosity(args.verbose, args.quiet));

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            engine_error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = HarvestConfig::load(args.config.as_deref())?.with_output_dir(args.output_dir);

    let seeds = match args.command {
        Command::Stars { range } => commands::star_seed(range),
        Command::Breaks { file } => commands::breaks_seeds(&file)?,
        Command::Days { stars, from, to } => commands::day_seed(stars, from, to)?,
        Command::Scrape { query_file, output } => {
            let runtime = tokio::runtime::Runtime::new()?;
            return runtime.block_on(commands::scrape(&config, &query_file, output.as_deref()));
        }
        Command::Table { output } => return commands::table(&config, output),
        Command::HIndex { input, output, min } => {
            return commands::h_index(&config, input, output, min)
        }
    };

    let runtime = tokio::runtime::Runtime::new()?;
    let summary = runtime.block_on(commands::harvest(&config, &seeds))?;
    commands::print_summary(&summary);
    Ok(())
}
