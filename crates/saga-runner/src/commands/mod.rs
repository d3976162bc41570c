mod check;
mod run;

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::error::Result;

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Execute a plan as a transaction and report what ran and what was undone
    Run(RunArgs),
    /// Validate a plan without running it
    Check(CheckArgs),
}

#[derive(Args)]
pub(crate) struct RunArgs {
    /// Path to the TOML plan
    pub(crate) plan: PathBuf,

    /// Cancel the execution context before the step at this index
    #[arg(long, value_name = "INDEX")]
    pub(crate) cancel_before: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
    pub(crate) format: OutputFormat,

    /// Include the per-step audit log in the report
    #[arg(long)]
    pub(crate) audit: bool,
}

#[derive(Args)]
pub(crate) struct CheckArgs {
    /// Path to the TOML plan
    pub(crate) plan: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Plain,
    Json,
}

impl Commands {
    pub(crate) fn execute(self) -> Result<()> {
        match self {
            Self::Run(args) => run::run(args),
            Self::Check(args) => check::run(args),
        }
    }
}
