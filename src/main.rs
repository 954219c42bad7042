mod cli;
mod commands;
mod config;
mod engine;
mod manifest;
mod paths;
mod resource;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::{Overrides, Settings};
use std::io;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub json: bool,
}

fn main() -> Result<ExitCode> {
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

    if let Command::Completions { shell } = cli.command {
        generate(shell, &mut Cli::command(), "cibform", &mut io::stdout());
        return Ok(ExitCode::SUCCESS);
    }

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        json: cli.json,
    };

    let settings = Settings::load(cli.config.as_deref())?.with_overrides(&Overrides {
        cibadmin: cli.cibadmin.clone(),
        crm_mon: cli.crm_mon.clone(),
        no_verify: cli.no_verify,
        release_removed_members: cli.release_removed_members,
    });
    log::debug!("{settings:?}");

    let ok = match &cli.command {
        Command::Apply(args) => {
            commands::manifest::apply(&ctx, &settings, args, cli.check, cli.yes)?
        }
        Command::Diff(args) => commands::manifest::diff(&ctx, &settings, args)?,
        Command::Status(args) => commands::manifest::status(&ctx, &settings, args)?,
        single => match single.descriptor() {
            Some(raw) => commands::single::run(&ctx, &settings, &raw, cli.check)?,
            None => true,
        },
    };

    Ok(if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
