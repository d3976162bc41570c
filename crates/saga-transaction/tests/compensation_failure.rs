//! Integration tests for compensation failure scenarios.

use std::cell::RefCell;
use std::error::Error as _;
use std::sync::{Arc, Mutex};

use saga_transaction::{
    Cause, ErrorDetails, ExecutionContext, RollbackFailure, Transaction, TransactionLogger,
    checked_rollback, checked_rollback_with_details, compensation_fn, operation_fn,
    with_transaction,
};

#[derive(Default)]
struct CollectingLogger {
    steps: Mutex<Vec<String>>,
}

impl TransactionLogger for CollectingLogger {
    fn compensation_failed(&self, failure: &RollbackFailure) {
        if let Ok(mut steps) = self.steps.lock() {
            steps.push(failure.step.clone());
        }
    }
}

#[test]
fn failed_compensation_is_reported_as_secondary() {
    let mut tx = Transaction::new();
    tx.add_named_operation("A", operation_fn(|_| Ok(())), compensation_fn(|_| Err("Y".into())))
        .add_named_operation(
            "B",
            operation_fn(|_| Err("B failed".into())),
            compensation_fn(|_| Ok(())),
        );

    let err = tx
        .execute(&ExecutionContext::new())
        .expect_err("B fails");

    assert_eq!(err.failed_index(), Some(1));
    assert!(matches!(err.cause(), Cause::Operation(e) if e.to_string() == "B failed"));
    let rollback_errors: Vec<String> = err
        .rollback_errors()
        .iter()
        .map(|f| f.error.to_string())
        .collect();
    assert_eq!(rollback_errors, ["Y"]);
    assert_eq!(
        err.to_string(),
        "operation 'B' (index 1) failed, and 1 compensation(s) also failed"
    );
    assert_eq!(
        err.source().map(ToString::to_string),
        Some("B failed".to_string())
    );
}

#[test]
fn compensation_failure_still_runs_other_compensations() {
    let log = RefCell::new(Vec::new());
    let mut tx = Transaction::new();
    tx.add_named_operation(
        "step_a",
        operation_fn(|_| Ok(())),
        compensation_fn(|_| {
            log.borrow_mut().push("compensated step_a");
            Ok(())
        }),
    )
    .add_named_operation(
        "step_b",
        operation_fn(|_| Ok(())),
        compensation_fn(|_| {
            log.borrow_mut().push("failed to compensate step_b");
            Err("compensation b failed".into())
        }),
    )
    .add_named_operation(
        "step_c",
        operation_fn(|_| Ok(())),
        compensation_fn(|_| {
            log.borrow_mut().push("compensated step_c");
            Ok(())
        }),
    )
    .add_named_operation("trigger", operation_fn(|_| Err("triggered failure".into())), compensation_fn(|_| Ok(())));

    let err = tx
        .execute(&ExecutionContext::new())
        .expect_err("trigger fails");

    assert_eq!(
        *log.borrow(),
        [
            "compensated step_c",
            "failed to compensate step_b",
            "compensated step_a",
        ]
    );
    assert_eq!(err.rollback_errors().len(), 1);
    assert_eq!(err.rollback_errors()[0].step, "step_b");
}

#[test]
fn multiple_compensation_failures_are_collected_in_rollback_order() {
    let logger = Arc::new(CollectingLogger::default());
    let mut tx = Transaction::with_logger(Some(logger.clone()));
    tx.add_named_operation("first", operation_fn(|_| Ok(())), compensation_fn(|_| Err("first".into())))
        .add_named_operation("second", operation_fn(|_| Ok(())), compensation_fn(|_| Err("second".into())))
        .add_named_operation("third", operation_fn(|_| Err("boom".into())), compensation_fn(|_| Ok(())));

    let err = tx
        .execute(&ExecutionContext::new())
        .expect_err("third fails");

    let steps: Vec<&str> = err.rollback_errors().iter().map(|f| f.step.as_str()).collect();
    assert_eq!(steps, ["second", "first"]);
    assert!(err.to_string().contains("2 compensation(s) also failed"));

    let logged = logger.steps.lock().expect("logger lock");
    assert_eq!(*logged, ["second", "first"]);
}

#[test]
fn checked_rollback_makes_failures_self_describing() {
    let err = with_transaction(&ExecutionContext::new(), |tx| {
        tx.add_named_operation(
            "reserve",
            operation_fn(|_| Ok(())),
            checked_rollback(
                compensation_fn(|_| Err("warehouse offline".into())),
                "release_stock",
                "could not release reserved stock",
            ),
        )
        .add_named_operation(
            "charge",
            operation_fn(|_| Ok(())),
            checked_rollback_with_details(
                compensation_fn(|_| Err("gateway timeout".into())),
                "refund",
                "could not refund card",
                ErrorDetails::new().with("payment_id", "pay_7").with("amount_cents", 2500),
            ),
        )
        .add_named_operation("ship", operation_fn(|_| Err("no courier".into())), compensation_fn(|_| Ok(())));
        Ok(())
    })
    .expect_err("ship fails");

    let [refund, release] = err.rollback_errors() else {
        panic!("expected two rollback failures");
    };

    let refund_wrapped = refund.wrapped().expect("refund is checked");
    assert_eq!(refund_wrapped.operation, "refund");
    assert_eq!(refund_wrapped.message, "could not refund card");
    let details = refund.details().expect("refund carries details");
    assert_eq!(details.get::<String>("payment_id"), Some("pay_7".to_string()));
    assert_eq!(details.get::<u32>("amount_cents"), Some(2500));

    let release_wrapped = release.wrapped().expect("release is checked");
    assert_eq!(release_wrapped.operation, "release_stock");
    assert!(release.details().is_some_and(ErrorDetails::is_empty));
    assert_eq!(
        release_wrapped.source().map(ToString::to_string),
        Some("warehouse offline".to_string())
    );
}

#[test]
fn unchecked_compensation_failures_have_no_details() {
    let mut tx = Transaction::new();
    tx.add_operation(operation_fn(|_| Ok(())), compensation_fn(|_| Err("bare".into())))
        .add_operation(operation_fn(|_| Err("boom".into())), compensation_fn(|_| Ok(())));

    let err = tx
        .execute(&ExecutionContext::new())
        .expect_err("second fails");

    assert!(err.rollback_errors()[0].wrapped().is_none());
    assert!(err.rollback_errors()[0].details().is_none());
}
