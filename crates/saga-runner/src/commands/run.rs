use std::cell::RefCell;

use saga_transaction::{ExecutionContext, with_transaction_config_audit};
use tracing::info;

use super::{OutputFormat, RunArgs};
use crate::error::Result;
use crate::output::{JsonFormatter, PlainTextFormatter, Report, ReportFormatter};
use crate::plan::Plan;
use crate::simulate::{self, TraceEvent};

pub(super) fn run(args: RunArgs) -> Result<()> {
    let plan = Plan::load(&args.plan)?;
    if let Some(index) = args.cancel_before {
        plan.check_cancel_before(index)?;
    }

    let ctx = ExecutionContext::new();
    if args.cancel_before == Some(0) {
        ctx.cancel();
    }

    info!(plan = %args.plan.display(), steps = plan.steps.len(), "running plan");
    let trace = RefCell::new(Vec::new());
    let (result, audit) = with_transaction_config_audit(&ctx, plan.transaction, |tx| {
        simulate::register(tx, &plan, &trace, args.cancel_before);
        Ok(())
    });

    let trace: Vec<TraceEvent> = trace.into_inner();
    let mut report = Report::new(trace, result.as_ref().map(|_| ()));
    if args.audit {
        report = report.with_audit(&audit);
    }
    let formatter: &dyn ReportFormatter = match args.format {
        OutputFormat::Plain => &PlainTextFormatter,
        OutputFormat::Json => &JsonFormatter,
    };
    print!("{}", formatter.format(&report)?);

    result?;
    Ok(())
}
