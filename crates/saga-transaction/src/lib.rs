//! In-process saga coordinator.
//!
//! A [`Transaction`] runs an ordered list of operations, each paired with a
//! compensation. If an operation fails, or the execution context is cancelled
//! between operations, every operation that already completed is compensated
//! in reverse order and a single [`TransactionError`] is returned. That error
//! carries the primary cause and every compensation that also failed.

mod audit;
mod config;
mod context;
mod details;
mod error;
mod logger;
mod rollback;
mod scope;
mod step;
mod transaction;

pub use audit::{AuditLog, StepRecord, StepStatus};
pub use config::TransactionConfig;
pub use context::{CancellationError, ExecutionContext};
pub use details::{ErrorDetails, WrappedError, find_details, find_wrapped};
pub use error::{BoxError, Cause, ErrorKind, InvariantViolation, RollbackFailure, TransactionError};
pub use logger::{TracingLogger, TransactionLogger};
pub use rollback::{
    CheckedRollback, NoopRollback, checked_rollback, checked_rollback_with_details, noop_rollback,
};
pub use scope::{
    with_transaction, with_transaction_audit, with_transaction_config,
    with_transaction_config_audit,
};
pub use step::{Compensation, Operation, compensation_fn, operation_fn};
pub use transaction::{Transaction, TransactionState};
pub use tokio_util::sync::CancellationToken;
