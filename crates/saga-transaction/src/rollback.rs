use crate::context::ExecutionContext;
use crate::details::{ErrorDetails, WrappedError};
use crate::error::BoxError;
use crate::step::Compensation;

/// Compensation that does nothing.
///
/// For steps with no effect to undo, such as reads, or whose effect is
/// intentionally irreversible.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRollback;

impl Compensation for NoopRollback {
    fn compensate(&self, _ctx: &ExecutionContext) -> Result<(), BoxError> {
        Ok(())
    }
}

/// A compensation that does nothing.
#[must_use]
pub fn noop_rollback() -> NoopRollback {
    NoopRollback
}

/// Compensation whose failures are wrapped in a [`WrappedError`] labelled
/// with the operation name, a message, and optional details.
#[derive(Debug, Clone)]
pub struct CheckedRollback<C> {
    rollback: C,
    operation: String,
    message: String,
    details: ErrorDetails,
}

impl<C> CheckedRollback<C> {
    /// Name of the operation being undone.
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Message reported when the compensation fails.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Details attached to a failure.
    #[must_use]
    pub fn details(&self) -> &ErrorDetails {
        &self.details
    }
}

impl<C: Compensation> Compensation for CheckedRollback<C> {
    fn compensate(&self, ctx: &ExecutionContext) -> Result<(), BoxError> {
        self.rollback.compensate(ctx).map_err(|source| {
            let wrapped = WrappedError::new(source, self.operation.as_str(), self.message.as_str())
                .with_details(self.details.clone());
            Box::new(wrapped) as BoxError
        })
    }
}

/// Wrap `rollback` so that a failure names `operation` and carries `message`.
pub fn checked_rollback<C: Compensation>(
    rollback: C,
    operation: impl Into<String>,
    message: impl Into<String>,
) -> CheckedRollback<C> {
    checked_rollback_with_details(rollback, operation, message, ErrorDetails::new())
}

/// Like [`checked_rollback`], also attaching `details` to the failure.
pub fn checked_rollback_with_details<C: Compensation>(
    rollback: C,
    operation: impl Into<String>,
    message: impl Into<String>,
    details: ErrorDetails,
) -> CheckedRollback<C> {
    CheckedRollback {
        rollback,
        operation: operation.into(),
        message: message.into(),
        details,
    }
}
