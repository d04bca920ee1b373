mod cli;
mod commands;
mod specfile;
mod statefile;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let state_file = cli.state_file.clone();

    match cli.command {
        Command::Apply(args) => commands::apply::run(&args, state_file.as_deref()),
        Command::Plan(args) => commands::plan::run(&args, state_file.as_deref()),
        Command::Read(args) => commands::read::run(&args, state_file.as_deref()),
        Command::Destroy(args) => commands::destroy::run(&args, state_file.as_deref()),
        Command::State => commands::state::run(state_file.as_deref()),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "commandeer", &mut io::stdout());
            Ok(())
        }
    }
}
