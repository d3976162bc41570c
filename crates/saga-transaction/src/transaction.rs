use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::audit::AuditLog;
use crate::config::TransactionConfig;
use crate::context::ExecutionContext;
use crate::error::{Cause, InvariantViolation, RollbackFailure, TransactionError};
use crate::logger::{TracingLogger, TransactionLogger};
use crate::step::{Compensation, Operation};

/// Lifecycle of a [`Transaction`].
///
/// `Building` → `Executing` → `Completed` | `Failed`. There is no way back to
/// `Building`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Steps may be registered.
    Building,
    /// `execute` is running.
    Executing,
    /// Every step succeeded.
    Completed,
    /// A step failed or the context was done; completed steps were
    /// compensated.
    Failed,
}

impl TransactionState {
    /// Whether `execute` has finished, successfully or not.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Building => "building",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// An ordered list of operations, each paired with the compensation that
/// undoes it.
///
/// Steps run one at a time in registration order. If a step fails, or the
/// context is done before a step starts, every step that already completed is
/// compensated in exact reverse order before the error is returned.
///
/// A transaction runs once. Calling [`execute`](Self::execute) again returns
/// an [`InvariantViolation::AlreadyExecuted`] error without running anything.
///
/// It is owned by a single thread of control; steps are not required to be
/// `Send`.
///
/// Rollback keeps going past compensations that return an error. A
/// compensation that panics unwinds out of `execute`, and the compensations
/// of earlier steps do not run.
pub struct Transaction<'a> {
    operations: Vec<Box<dyn Operation + 'a>>,
    compensations: Vec<Box<dyn Compensation + 'a>>,
    names: Vec<Option<String>>,
    logger: Arc<dyn TransactionLogger>,
    config: TransactionConfig,
    state: TransactionState,
}

impl<'a> Transaction<'a> {
    /// Create an empty transaction that logs through `tracing`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_logger(None)
    }

    /// Create an empty transaction reporting compensation failures to
    /// `logger`. `None` selects [`TracingLogger`].
    #[must_use]
    pub fn with_logger(logger: Option<Arc<dyn TransactionLogger>>) -> Self {
        let logger = logger.unwrap_or_else(|| Arc::new(TracingLogger));
        Self {
            operations: Vec::new(),
            compensations: Vec::new(),
            names: Vec::new(),
            logger,
            config: TransactionConfig::default(),
            state: TransactionState::Building,
        }
    }

    /// Use `config` for this transaction.
    #[must_use]
    pub fn with_config(mut self, config: TransactionConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a step. Unnamed steps are labelled `step-{index}`.
    pub fn add_operation<O, C>(&mut self, operation: O, rollback: C) -> &mut Self
    where
        O: Operation + 'a,
        C: Compensation + 'a,
    {
        self.push(None, operation, rollback)
    }

    /// Register a step with a label used in logs, audit records, and errors.
    pub fn add_named_operation<O, C>(
        &mut self,
        name: impl Into<String>,
        operation: O,
        rollback: C,
    ) -> &mut Self
    where
        O: Operation + 'a,
        C: Compensation + 'a,
    {
        self.push(Some(name.into()), operation, rollback)
    }

    fn push<O, C>(&mut self, name: Option<String>, operation: O, rollback: C) -> &mut Self
    where
        O: Operation + 'a,
        C: Compensation + 'a,
    {
        self.operations.push(Box::new(operation));
        self.compensations.push(Box::new(rollback));
        self.names.push(name);
        self
    }

    /// Number of registered operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether no operations are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Configuration used for rollback.
    #[must_use]
    pub fn config(&self) -> &TransactionConfig {
        &self.config
    }

    /// Run every step in order.
    ///
    /// # Errors
    ///
    /// Returns a [`TransactionError`] whose cause is:
    /// - [`Cause::Operation`] if a step failed,
    /// - [`Cause::Cancelled`] if `ctx` was done before a step started,
    /// - [`Cause::Invariant`] if the transaction already ran or its steps are
    ///   not paired, in which case nothing is invoked.
    ///
    /// In the first two cases every completed step has been compensated, and
    /// any compensation failures are listed in
    /// [`rollback_errors`](TransactionError::rollback_errors).
    pub fn execute(&mut self, ctx: &ExecutionContext) -> Result<(), TransactionError> {
        let mut audit_log = AuditLog::new();
        self.execute_internal(ctx, &mut audit_log)
    }

    /// Run every step in order and return both the result and an audit log.
    pub fn execute_with_audit(
        &mut self,
        ctx: &ExecutionContext,
    ) -> (Result<(), TransactionError>, AuditLog) {
        let mut audit_log = AuditLog::new();
        let result = self.execute_internal(ctx, &mut audit_log);
        (result, audit_log)
    }

    fn execute_internal(
        &mut self,
        ctx: &ExecutionContext,
        audit_log: &mut AuditLog,
    ) -> Result<(), TransactionError> {
        if self.state != TransactionState::Building {
            return Err(TransactionError::invariant(
                InvariantViolation::AlreadyExecuted { state: self.state },
            ));
        }
        if self.operations.len() != self.compensations.len() {
            self.state = TransactionState::Failed;
            return Err(TransactionError::invariant(
                InvariantViolation::UnpairedSteps {
                    operations: self.operations.len(),
                    compensations: self.compensations.len(),
                },
            ));
        }

        self.state = TransactionState::Executing;
        let result = self.run_forward(ctx, audit_log);
        self.state = if result.is_ok() {
            TransactionState::Completed
        } else {
            TransactionState::Failed
        };
        result
    }

    fn run_forward(
        &self,
        ctx: &ExecutionContext,
        audit_log: &mut AuditLog,
    ) -> Result<(), TransactionError> {
        for (index, operation) in self.operations.iter().enumerate() {
            let step = self.step_name(index);

            if let Err(reason) = ctx.check() {
                warn!(index, step = %step, %reason, "context done before step, rolling back");
                audit_log.record_cancelled(index, &step);
                let rollback_errors = self.rollback(index, audit_log);
                return Err(TransactionError::at_step(
                    Cause::Cancelled(reason),
                    index,
                    step,
                    rollback_errors,
                ));
            }

            debug!(index, step = %step, "executing step");
            audit_log.record_start(index, &step);

            if let Err(error) = operation.execute(ctx) {
                audit_log.record_failure();
                warn!(index, step = %step, %error, "step failed, rolling back");
                let rollback_errors = self.rollback(index, audit_log);
                return Err(TransactionError::at_step(
                    Cause::Operation(error),
                    index,
                    step,
                    rollback_errors,
                ));
            }

            audit_log.record_success();
        }

        debug!(steps = self.operations.len(), "transaction completed");
        Ok(())
    }

    /// Compensate the first `completed` steps, last one first.
    ///
    /// Every compensation is attempted regardless of earlier failures. The
    /// rollback context is never linked to the forward context.
    fn rollback(&self, completed: usize, audit_log: &mut AuditLog) -> Vec<RollbackFailure> {
        let mut failures = Vec::new();
        if completed == 0 {
            return failures;
        }

        let ctx = ExecutionContext::background(self.config.rollback_timeout);
        debug!(steps = completed, "rolling back completed steps");

        for (index, compensation) in self.compensations.iter().enumerate().take(completed).rev() {
            match compensation.compensate(&ctx) {
                Ok(()) => {
                    debug!(index, step = %self.step_name(index), "step compensated");
                    audit_log.record_compensated(index);
                }
                Err(error) => {
                    audit_log.record_compensation_failed(index);
                    let failure = RollbackFailure {
                        index,
                        step: self.step_name(index),
                        error,
                    };
                    self.logger.compensation_failed(&failure);
                    failures.push(failure);
                }
            }
        }

        failures
    }

    fn step_name(&self, index: usize) -> String {
        match self.names.get(index) {
            Some(Some(name)) => name.clone(),
            _ => format!("step-{index}"),
        }
    }
}

impl Default for Transaction<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("operations", &self.operations.len())
            .field("compensations", &self.compensations.len())
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
