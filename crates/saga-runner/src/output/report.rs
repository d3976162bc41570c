use saga_transaction::{AuditLog, ErrorDetails, TransactionError};
use serde::Serialize;

use crate::simulate::TraceEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Outcome {
    Completed,
    Failed,
}

#[derive(Debug, Serialize)]
pub(crate) struct RollbackProblem {
    pub(crate) index: usize,
    pub(crate) step: String,
    pub(crate) error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) operation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) details: Option<ErrorDetails>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Failure {
    pub(crate) kind: String,
    pub(crate) message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) cause: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) failed_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) failed_step: Option<String>,
    pub(crate) rollback_errors: Vec<RollbackProblem>,
}

/// Everything a run produced, ready for formatting.
#[derive(Debug, Serialize)]
pub(crate) struct Report {
    pub(crate) outcome: Outcome,
    pub(crate) trace: Vec<TraceEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) failure: Option<Failure>,
    /// One summary line per attempted step, when auditing was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) audit: Option<Vec<String>>,
}

impl Report {
    pub(crate) fn new(trace: Vec<TraceEvent>, result: Result<(), &TransactionError>) -> Self {
        match result {
            Ok(()) => Self {
                outcome: Outcome::Completed,
                trace,
                failure: None,
                audit: None,
            },
            Err(err) => Self {
                outcome: Outcome::Failed,
                trace,
                failure: Some(Failure::from_error(err)),
                audit: None,
            },
        }
    }

    pub(crate) fn with_audit(mut self, audit: &AuditLog) -> Self {
        self.audit = Some(audit.summary().lines().map(str::to_string).collect());
        self
    }
}

impl Failure {
    fn from_error(err: &TransactionError) -> Self {
        let rollback_errors = err
            .rollback_errors()
            .iter()
            .map(|failure| RollbackProblem {
                index: failure.index,
                step: failure.step.clone(),
                error: failure.error.to_string(),
                operation: failure.wrapped().map(|w| w.operation.clone()),
                details: failure.details().filter(|d| !d.is_empty()).cloned(),
            })
            .collect();

        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
            cause: std::error::Error::source(err).map(ToString::to_string),
            failed_index: err.failed_index(),
            failed_step: err.failed_step().map(str::to_string),
            rollback_errors,
        }
    }
}

