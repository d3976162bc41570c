use crate::context::ExecutionContext;
use crate::error::BoxError;

/// A forward unit of work in a transaction.
///
/// Implemented for any `Fn(&ExecutionContext) -> Result<(), BoxError>`, so
/// closures can be registered directly. Implement it on a type when the step
/// carries its own state or dependencies.
pub trait Operation {
    /// Perform the step.
    ///
    /// # Errors
    ///
    /// Returns an error if the step fails; the transaction then rolls back
    /// every step completed before it.
    fn execute(&self, ctx: &ExecutionContext) -> Result<(), BoxError>;
}

impl<F> Operation for F
where
    F: Fn(&ExecutionContext) -> Result<(), BoxError>,
{
    fn execute(&self, ctx: &ExecutionContext) -> Result<(), BoxError> {
        self(ctx)
    }
}

/// Undoes the effect of exactly one [`Operation`].
///
/// Compensations receive the rollback context, never the forward one.
pub trait Compensation {
    /// Undo the paired operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the effect could not be undone. The failure is
    /// reported alongside the primary cause; earlier steps are still
    /// compensated.
    fn compensate(&self, ctx: &ExecutionContext) -> Result<(), BoxError>;
}

impl<F> Compensation for F
where
    F: Fn(&ExecutionContext) -> Result<(), BoxError>,
{
    fn compensate(&self, ctx: &ExecutionContext) -> Result<(), BoxError> {
        self(ctx)
    }
}

/// Pin a closure to the [`Operation`] signature.
///
/// Lets the compiler infer the argument and error types of an otherwise
/// unannotated closure.
pub fn operation_fn<F>(f: F) -> F
where
    F: Fn(&ExecutionContext) -> Result<(), BoxError>,
{
    f
}

/// Pin a closure to the [`Compensation`] signature.
pub fn compensation_fn<F>(f: F) -> F
where
    F: Fn(&ExecutionContext) -> Result<(), BoxError>,
{
    f
}
