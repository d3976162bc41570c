use std::fmt;

use thiserror::Error;

use crate::context::CancellationError;
use crate::details::{ErrorDetails, WrappedError, find_details, find_wrapped};
use crate::transaction::TransactionState;

/// Error type returned by operations, compensations, and setup callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error from a compensation that failed during rollback.
#[derive(Debug, Error)]
#[error("compensation failed for step '{step}' (index {index})")]
pub struct RollbackFailure {
    /// Index of the step whose compensation failed.
    pub index: usize,
    /// Label of the step whose compensation failed.
    pub step: String,
    /// The underlying error.
    #[source]
    pub error: BoxError,
}

impl RollbackFailure {
    /// The [`WrappedError`] the compensation returned, if it was checked.
    #[must_use]
    pub fn wrapped(&self) -> Option<&WrappedError> {
        find_wrapped(self.error.as_ref())
    }

    /// Details attached by a checked compensation.
    #[must_use]
    pub fn details(&self) -> Option<&ErrorDetails> {
        find_details(self.error.as_ref())
    }
}

/// A coordinator-level consistency check that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum InvariantViolation {
    /// Operations and compensations are no longer paired one to one.
    #[error("{operations} operation(s) registered with {compensations} compensation(s)")]
    UnpairedSteps {
        operations: usize,
        compensations: usize,
    },

    /// `execute` was called on a transaction that already ran.
    #[error("transaction already executed (state: {state})")]
    AlreadyExecuted { state: TransactionState },
}

/// The primary cause of a failed transaction.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Cause {
    /// The registration callback failed before any step ran.
    #[error("transaction setup failed")]
    Setup(#[source] BoxError),

    /// The execution context was done before a step could start.
    #[error("transaction cancelled")]
    Cancelled(#[source] CancellationError),

    /// A forward step returned an error.
    #[error("operation failed")]
    Operation(#[source] BoxError),

    /// The transaction was not in a state that allows execution.
    #[error("transaction invariant violated")]
    Invariant(#[source] InvariantViolation),
}

/// Discriminant of [`Cause`], for matching without borrowing the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    Setup,
    Cancelled,
    Operation,
    Invariant,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Setup => "setup",
            Self::Cancelled => "cancelled",
            Self::Operation => "operation",
            Self::Invariant => "invariant",
        };
        f.write_str(label)
    }
}

/// The single error returned by a failed transaction.
///
/// Carries exactly one primary [`Cause`] and every compensation that failed
/// while rolling back. Compensation failures are never the primary cause.
#[derive(Debug)]
pub struct TransactionError {
    cause: Cause,
    failed_index: Option<usize>,
    failed_step: Option<String>,
    rollback_errors: Vec<RollbackFailure>,
}

impl TransactionError {
    pub(crate) fn setup(error: BoxError) -> Self {
        Self {
            cause: Cause::Setup(error),
            failed_index: None,
            failed_step: None,
            rollback_errors: Vec::new(),
        }
    }

    pub(crate) fn cancelled_at_entry(error: CancellationError) -> Self {
        Self {
            cause: Cause::Cancelled(error),
            failed_index: None,
            failed_step: None,
            rollback_errors: Vec::new(),
        }
    }

    pub(crate) fn invariant(violation: InvariantViolation) -> Self {
        Self {
            cause: Cause::Invariant(violation),
            failed_index: None,
            failed_step: None,
            rollback_errors: Vec::new(),
        }
    }

    pub(crate) fn at_step(
        cause: Cause,
        index: usize,
        step: String,
        rollback_errors: Vec<RollbackFailure>,
    ) -> Self {
        Self {
            cause,
            failed_index: Some(index),
            failed_step: Some(step),
            rollback_errors,
        }
    }

    /// Which kind of cause this error carries.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self.cause {
            Cause::Setup(_) => ErrorKind::Setup,
            Cause::Cancelled(_) => ErrorKind::Cancelled,
            Cause::Operation(_) => ErrorKind::Operation,
            Cause::Invariant(_) => ErrorKind::Invariant,
        }
    }

    /// The primary cause.
    #[must_use]
    pub fn cause(&self) -> &Cause {
        &self.cause
    }

    /// Take the primary cause, dropping any rollback failures.
    #[must_use]
    pub fn into_cause(self) -> Cause {
        self.cause
    }

    /// Index of the step that failed, or before which cancellation was seen.
    ///
    /// `None` for setup failures, invariant violations, and cancellation
    /// detected before a transaction was constructed.
    #[must_use]
    pub fn failed_index(&self) -> Option<usize> {
        self.failed_index
    }

    /// Label of the step at [`failed_index`](Self::failed_index).
    #[must_use]
    pub fn failed_step(&self) -> Option<&str> {
        self.failed_step.as_deref()
    }

    /// Compensations that failed, in the order they were attempted.
    #[must_use]
    pub fn rollback_errors(&self) -> &[RollbackFailure] {
        &self.rollback_errors
    }

    /// Whether cleanup left residual effects behind.
    #[must_use]
    pub fn has_rollback_errors(&self) -> bool {
        !self.rollback_errors.is_empty()
    }

    /// Whether the transaction stopped because its context was done.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::Cancelled
    }

    /// The cancellation reason, when the cause is cancellation.
    #[must_use]
    pub fn cancellation(&self) -> Option<CancellationError> {
        match self.cause {
            Cause::Cancelled(error) => Some(error),
            _ => None,
        }
    }

    /// The invariant that was violated, when the cause is an invariant.
    #[must_use]
    pub fn invariant_violation(&self) -> Option<InvariantViolation> {
        match self.cause {
            Cause::Invariant(violation) => Some(violation),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.cause, self.failed_index, &self.failed_step) {
            (Cause::Operation(_), Some(index), Some(step)) => {
                write!(f, "operation '{step}' (index {index}) failed")?;
            }
            (Cause::Cancelled(_), Some(index), Some(step)) => {
                write!(f, "transaction cancelled before step '{step}' (index {index})")?;
            }
            (cause, _, _) => write!(f, "{cause}")?,
        }
        if !self.rollback_errors.is_empty() {
            write!(
                f,
                ", and {} compensation(s) also failed",
                self.rollback_errors.len()
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for TransactionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.cause {
            Cause::Setup(error) | Cause::Operation(error) => Some(error.as_ref()),
            Cause::Cancelled(error) => Some(error),
            Cause::Invariant(violation) => Some(violation),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    fn rollback_failure(index: usize, message: &str) -> RollbackFailure {
        RollbackFailure {
            index,
            step: format!("step-{index}"),
            error: message.into(),
        }
    }

    #[test]
    fn operation_failure_display_names_the_step() {
        let err = TransactionError::at_step(
            Cause::Operation("X".into()),
            2,
            "charge".to_string(),
            Vec::new(),
        );

        assert_eq!(err.to_string(), "operation 'charge' (index 2) failed");
        assert_eq!(err.kind(), ErrorKind::Operation);
        assert_eq!(err.failed_index(), Some(2));
        assert_eq!(err.source().map(ToString::to_string), Some("X".to_string()));
    }

    #[test]
    fn display_mentions_failed_compensations() {
        let err = TransactionError::at_step(
            Cause::Operation("boom".into()),
            1,
            "step-1".to_string(),
            vec![rollback_failure(0, "Y")],
        );

        let msg = err.to_string();

        assert!(msg.contains("step-1"));
        assert!(msg.contains("1 compensation(s) also failed"));
        assert!(err.has_rollback_errors());
    }

    #[test]
    fn cancellation_before_step_is_distinguishable_from_operation_failure() {
        let err = TransactionError::at_step(
            Cause::Cancelled(CancellationError::Cancelled),
            0,
            "step-0".to_string(),
            Vec::new(),
        );

        assert!(err.is_cancelled());
        assert_eq!(err.cancellation(), Some(CancellationError::Cancelled));
        assert!(err.to_string().contains("cancelled before step 'step-0'"));
    }

    #[test]
    fn setup_error_has_no_index() {
        let err = TransactionError::setup("bad config".into());

        assert_eq!(err.kind(), ErrorKind::Setup);
        assert_eq!(err.failed_index(), None);
        assert_eq!(err.to_string(), "transaction setup failed");
        assert_eq!(
            err.source().map(ToString::to_string),
            Some("bad config".to_string())
        );
    }

    #[test]
    fn entry_cancellation_has_no_index() {
        let err = TransactionError::cancelled_at_entry(CancellationError::DeadlineExceeded);

        assert_eq!(err.failed_index(), None);
        assert_eq!(err.to_string(), "transaction cancelled");
        assert_eq!(
            err.source().map(ToString::to_string),
            Some("context deadline exceeded".to_string())
        );
    }

    #[test]
    fn invariant_violation_reports_counts() {
        let err = TransactionError::invariant(InvariantViolation::UnpairedSteps {
            operations: 2,
            compensations: 1,
        });

        assert_eq!(err.kind(), ErrorKind::Invariant);
        let source = err.source().map(ToString::to_string).unwrap_or_default();
        assert!(source.contains("2 operation(s)"));
        assert!(source.contains("1 compensation(s)"));
    }

    #[test]
    fn rollback_failure_exposes_checked_details() {
        let failure = RollbackFailure {
            index: 0,
            step: "reserve".to_string(),
            error: Box::new(
                WrappedError::new("Y", "release_stock", "could not release stock")
                    .with_detail("sku", "A-1"),
            ),
        };

        let wrapped = failure.wrapped().expect("checked error");
        assert_eq!(wrapped.operation, "release_stock");
        assert_eq!(
            failure.details().and_then(|d| d.get::<String>("sku")),
            Some("A-1".to_string())
        );
    }

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::Setup.to_string(), "setup");
        assert_eq!(ErrorKind::Cancelled.to_string(), "cancelled");
        assert_eq!(ErrorKind::Operation.to_string(), "operation");
        assert_eq!(ErrorKind::Invariant.to_string(), "invariant");
    }
}
