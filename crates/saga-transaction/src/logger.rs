use tracing::error;

use crate::error::RollbackFailure;

/// Receives one entry per compensation that fails during rollback.
///
/// Implementations must tolerate being shared by transactions running on
/// different threads.
pub trait TransactionLogger: Send + Sync {
    /// Record a failed compensation.
    fn compensation_failed(&self, failure: &RollbackFailure);
}

/// Default logger, emitting a `tracing` error event per failed compensation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl TransactionLogger for TracingLogger {
    fn compensation_failed(&self, failure: &RollbackFailure) {
        let wrapped = failure.wrapped();
        error!(
            index = failure.index,
            step = %failure.step,
            error = %failure.error,
            operation = wrapped.map(|w| w.operation.as_str()),
            details = wrapped.map(|w| tracing::field::debug(&w.details)),
            "compensation failed during rollback"
        );
    }
}
