use std::cell::RefCell;

use saga_transaction::{
    BoxError, ErrorDetails, ExecutionContext, Transaction, checked_rollback_with_details,
    compensation_fn, noop_rollback, operation_fn,
};
use serde::Serialize;
use tracing::info;

use crate::plan::{Plan, RollbackKind, StepPlan};

/// One observable action taken by a simulated step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "step", rename_all = "snake_case")]
pub(crate) enum TraceEvent {
    Run(String),
    Undo(String),
    UndoFailed(String),
}

impl TraceEvent {
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Run(step) => format!("run {step}"),
            Self::Undo(step) => format!("undo {step}"),
            Self::UndoFailed(step) => format!("undo {step} (failed)"),
        }
    }
}

/// Register every step of `plan` on `tx`.
///
/// `cancel_before` cancels `ctx` right after the step preceding that index
/// runs; index 0 is handled by the caller before the transaction starts.
pub(crate) fn register<'a>(
    tx: &mut Transaction<'a>,
    plan: &'a Plan,
    trace: &'a RefCell<Vec<TraceEvent>>,
    cancel_before: Option<usize>,
) {
    for (index, step) in plan.steps.iter().enumerate() {
        let cancel_after = step.cancel || cancel_before == Some(index + 1);
        let operation = operation_fn(move |ctx: &ExecutionContext| {
            info!(step = %step.name, "running simulated step");
            trace.borrow_mut().push(TraceEvent::Run(step.name.clone()));
            if cancel_after {
                ctx.cancel();
            }
            if step.fail {
                return Err(step.failure_message().into());
            }
            Ok(())
        });

        match step.rollback {
            RollbackKind::Noop => {
                tx.add_named_operation(step.name.as_str(), operation, noop_rollback());
            }
            RollbackKind::Plain => {
                tx.add_named_operation(step.name.as_str(), operation, undo(step, trace));
            }
            RollbackKind::Checked => {
                let details = step.details.clone().unwrap_or_default();
                tx.add_named_operation(
                    step.name.as_str(),
                    operation,
                    checked_rollback_with_details(
                        undo(step, trace),
                        step.name.as_str(),
                        format!("could not undo {}", step.name),
                        details,
                    ),
                );
            }
        }
    }
}

fn undo<'a>(
    step: &'a StepPlan,
    trace: &'a RefCell<Vec<TraceEvent>>,
) -> impl Fn(&ExecutionContext) -> Result<(), BoxError> + 'a {
    compensation_fn(move |_| {
        info!(step = %step.name, "undoing simulated step");
        if step.rollback_fails {
            trace
                .borrow_mut()
                .push(TraceEvent::UndoFailed(step.name.clone()));
            return Err(step.rollback_failure_message().into());
        }
        trace.borrow_mut().push(TraceEvent::Undo(step.name.clone()));
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use saga_transaction::{ErrorKind, with_transaction};

    use super::*;

    fn plan(content: &str) -> Plan {
        toml::from_str(content).expect("valid plan toml")
    }

    fn describe(trace: &RefCell<Vec<TraceEvent>>) -> Vec<String> {
        trace.borrow().iter().map(TraceEvent::describe).collect()
    }

    #[test]
    fn successful_plan_runs_every_step() -> anyhow::Result<()> {
        let plan = plan("[[steps]]\nname = \"a\"\n[[steps]]\nname = \"b\"\n");
        let trace = RefCell::new(Vec::new());

        with_transaction(&ExecutionContext::new(), |tx| {
            register(tx, &plan, &trace, None);
            Ok(())
        })?;

        assert_eq!(describe(&trace), ["run a", "run b"]);
        Ok(())
    }

    #[test]
    fn failing_step_undoes_previous_steps() {
        let plan = plan(
            "[[steps]]\nname = \"a\"\n[[steps]]\nname = \"b\"\nrollback = \"noop\"\n[[steps]]\nname = \"c\"\nfail = true\n",
        );
        let trace = RefCell::new(Vec::new());

        let err = with_transaction(&ExecutionContext::new(), |tx| {
            register(tx, &plan, &trace, None);
            Ok(())
        })
        .expect_err("c fails");

        assert_eq!(describe(&trace), ["run a", "run b", "run c", "undo a"]);
        assert_eq!(err.failed_step(), Some("c"));
    }

    #[test]
    fn checked_rollback_failure_carries_plan_details() {
        let plan = plan(
            "[[steps]]\nname = \"a\"\nrollback = \"checked\"\nrollback_fails = true\ndetails = { sku = \"A-1\" }\n[[steps]]\nname = \"b\"\nfail = true\n",
        );
        let trace = RefCell::new(Vec::new());

        let err = with_transaction(&ExecutionContext::new(), |tx| {
            register(tx, &plan, &trace, None);
            Ok(())
        })
        .expect_err("b fails");

        assert_eq!(describe(&trace), ["run a", "run b", "undo a (failed)"]);
        let failure = &err.rollback_errors()[0];
        assert_eq!(failure.wrapped().map(|w| w.operation.as_str()), Some("a"));
        assert_eq!(
            failure.details().and_then(|d| d.get::<String>("sku")),
            Some("A-1".to_string())
        );
    }

    #[test]
    fn cancel_before_stops_at_the_requested_step() {
        let plan = plan("[[steps]]\nname = \"a\"\n[[steps]]\nname = \"b\"\n");
        let trace = RefCell::new(Vec::new());

        let err = with_transaction(&ExecutionContext::new(), |tx| {
            register(tx, &plan, &trace, Some(1));
            Ok(())
        })
        .expect_err("cancelled before b");

        assert_eq!(describe(&trace), ["run a", "undo a"]);
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(err.failed_index(), Some(1));
    }

    #[test]
    fn trace_events_serialize_with_tags() -> anyhow::Result<()> {
        let json = serde_json::to_string(&TraceEvent::UndoFailed("a".to_string()))?;

        assert_eq!(json, r#"{"event":"undo_failed","step":"a"}"#);
        Ok(())
    }
}
