mod cli;
mod commands;
mod config;
mod engine;
mod manifest;
mod paths;
mod progress;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::Settings;
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

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

    // Completions need no tenant
    if let Command::Completions { shell } = cli.command {
        generate(shell, &mut Cli::command(), "tenantctl", &mut io::stdout());
        return Ok(());
    }

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };
    let settings = Settings::load(&cli.connection)?;
    log::debug!("Settings: {settings:?}");

    match &cli.command {
        Command::Plan(args) => commands::plan::run(&ctx, &settings, args),
        Command::Apply(args) => commands::apply::run(&ctx, &settings, args),
        Command::Destroy(args) => commands::destroy::run(&ctx, &settings, args),
        Command::Status => commands::status::run(&ctx, &settings),
        Command::Show(args) => commands::show::run(&settings, args),
        Command::Token(args) => commands::token::run(&settings, args),
        Command::Completions { .. } => Ok(()),
    }
}
