use thiserror::Error;

use crate::plan::PlanError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid plan")]
    Plan(#[from] PlanError),

    #[error("transaction failed")]
    Transaction(#[from] saga_transaction::TransactionError),

    #[error("failed to render report")]
    Render(#[from] serde_json::Error),

    #[error("invalid log filter '{filter}'")]
    LogFilter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
}

pub type Result<T> = std::result::Result<T, CliError>;
