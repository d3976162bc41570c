mod commands;
mod error;
mod logging;
mod output;
mod plan;
mod simulate;

use std::process::ExitCode;

use clap::Parser;

use crate::commands::Commands;
use crate::error::CliError;

#[derive(Parser)]
#[command(name = "saga-runner")]
#[command(bin_name = "saga-runner")]
#[command(about = "Run simulated saga plans with ordered compensation", long_about = None)]
#[command(version)]
struct Cli {
    /// Log filter directives (overrides RUST_LOG), e.g. "debug" or "saga_transaction=debug"
    #[arg(long = "log-level", global = true, value_name = "FILTER")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.log_level.as_deref()) {
        print_error(&e);
        return ExitCode::FAILURE;
    }

    if let Err(e) = cli.command.execute() {
        print_error(&e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn print_error(error: &CliError) {
    eprintln!("error: {error}");

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("caused by: {cause}");
        source = std::error::Error::source(cause);
    }
}
