//! The `mars` CLI: reads a source file and runs it through the library
//! pipeline, mirroring the teacher's `why` binary (`src/bin/why/main.rs`)
//! but without a subcommand, since this core has only one thing to do.

use clap::Parser as ClapParser;
use log::error;
use mars::diagnostic::render_diagnostics;
use mars::run::{run_source, RunOutcome};
use std::fs;
use std::process::ExitCode;

/// Mars — lexer, parser, analyzer and evaluator for the Mars language.
#[derive(ClapParser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// The Mars source file to run.
    file: std::path::PathBuf,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn level_filter(verbosity: u8) -> log::LevelFilter {
    match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    simple_logger::SimpleLogger::new()
        .with_level(level_filter(cli.verbose))
        .init()
        .expect("logger already initialized");

    let source = match fs::read_to_string(&cli.file) {
        Ok(source) => source,
        Err(err) => {
            error!("could not read {}: {err}", cli.file.display());
            return ExitCode::FAILURE;
        }
    };

    let file_name = cli.file.display().to_string();
    match run_source(&source, &file_name) {
        RunOutcome::Value(value) => {
            println!("{}", value.display_form());
            ExitCode::SUCCESS
        }
        RunOutcome::Diagnostics(diagnostics) => {
            eprintln!("{}", render_diagnostics(&diagnostics));
            ExitCode::FAILURE
        }
    }
}
