//! # Musou CLI
//!
//! Compliance reports for rooms kept in a record store or read from a JSON
//! file. Reports go to stdout (text or JSON); logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, Level};
use tracing_subscriber::{fmt, EnvFilter};

mod cli;
mod render;

use cli::Commands;

/// Check lighting, ventilation and smoke exhaust openings (採光・換気・排煙)
#[derive(Parser)]
#[command(name = "musou")]
#[command(author, version)]
#[command(about = "Window opening compliance reports: 採光・換気・排煙")]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Store directory holding the rooms and settings records
    #[arg(long, env = "MUSOU_STORE", default_value = ".musou", global = true)]
    store: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    debug!(store = %cli.store.display(), "starting");

    match cli::run(cli.command, &cli.store) {
        Ok(cli::Outcome::Compliant) => ExitCode::SUCCESS,
        Ok(cli::Outcome::Deficient) => ExitCode::from(1),
        Err(e) => {
            report_error(&e);
            ExitCode::from(2)
        }
    }
}

fn report_error(error: &anyhow::Error) {
    eprintln!("Error: {:#}", error);
    if let Some(calc) = error.downcast_ref::<musou_core::CalcError>() {
        if calc.is_recoverable() {
            eprintln!("The store is busy; try again once the other writer finishes.");
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::ERROR,
        (_, 0) => Level::WARN,
        (_, 1) => Level::INFO,
        (_, 2) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
