use tracing::debug;

use crate::audit::AuditLog;
use crate::config::TransactionConfig;
use crate::context::ExecutionContext;
use crate::error::{BoxError, TransactionError};
use crate::transaction::Transaction;

/// Build and run a transaction in one call.
///
/// `setup` registers the steps. The transaction is only constructed if `ctx`
/// is not already done, and only executed if `setup` succeeds.
///
/// # Errors
///
/// Returns a [`TransactionError`] whose cause is
/// [`Cause::Cancelled`](crate::Cause::Cancelled) if `ctx` was done on entry,
/// [`Cause::Setup`](crate::Cause::Setup) if `setup` failed, or whatever
/// [`Transaction::execute`] returned.
pub fn with_transaction<'a, F>(ctx: &ExecutionContext, setup: F) -> Result<(), TransactionError>
where
    F: FnOnce(&mut Transaction<'a>) -> Result<(), BoxError>,
{
    with_transaction_config(ctx, TransactionConfig::default(), setup)
}

/// [`with_transaction`] with an explicit configuration.
///
/// # Errors
///
/// See [`with_transaction`].
pub fn with_transaction_config<'a, F>(
    ctx: &ExecutionContext,
    config: TransactionConfig,
    setup: F,
) -> Result<(), TransactionError>
where
    F: FnOnce(&mut Transaction<'a>) -> Result<(), BoxError>,
{
    with_transaction_config_audit(ctx, config, setup).0
}

/// [`with_transaction`] that also returns the audit log of the run.
///
/// The log is empty when the transaction never started, either because `ctx`
/// was done on entry or because `setup` failed.
#[must_use]
pub fn with_transaction_audit<'a, F>(
    ctx: &ExecutionContext,
    setup: F,
) -> (Result<(), TransactionError>, AuditLog)
where
    F: FnOnce(&mut Transaction<'a>) -> Result<(), BoxError>,
{
    with_transaction_config_audit(ctx, TransactionConfig::default(), setup)
}

/// [`with_transaction_audit`] with an explicit configuration.
#[must_use]
pub fn with_transaction_config_audit<'a, F>(
    ctx: &ExecutionContext,
    config: TransactionConfig,
    setup: F,
) -> (Result<(), TransactionError>, AuditLog)
where
    F: FnOnce(&mut Transaction<'a>) -> Result<(), BoxError>,
{
    if let Err(reason) = ctx.check() {
        debug!(%reason, "context done before transaction setup");
        return (
            Err(TransactionError::cancelled_at_entry(reason)),
            AuditLog::new(),
        );
    }

    let mut transaction = Transaction::new().with_config(config);
    if let Err(error) = setup(&mut transaction) {
        debug!(%error, "transaction setup failed");
        return (Err(TransactionError::setup(error)), AuditLog::new());
    }

    transaction.execute_with_audit(ctx)
}
