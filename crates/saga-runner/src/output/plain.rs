use std::fmt::Write as _;

use super::report::{Failure, RollbackProblem};
use super::{Outcome, Report, ReportFormatter};
use crate::error::Result;

pub(crate) struct PlainTextFormatter;

impl PlainTextFormatter {
    fn format_trace(output: &mut String, report: &Report) {
        output.push_str("Trace:\n");
        if report.trace.is_empty() {
            output.push_str("  (no steps ran)\n");
        }
        for event in &report.trace {
            let _ = writeln!(output, "  {}", event.describe());
        }
    }

    fn format_audit(output: &mut String, audit: &[String]) {
        output.push_str("\nAudit:\n");
        for line in audit {
            let _ = writeln!(output, "  {line}");
        }
    }

    fn format_failure(output: &mut String, failure: &Failure) {
        let _ = writeln!(output, "\nTransaction failed ({}): {}", failure.kind, failure.message);
        if let Some(cause) = &failure.cause {
            let _ = writeln!(output, "  cause: {cause}");
        }
        if !failure.rollback_errors.is_empty() {
            output.push_str("\nRollback problems:\n");
            for problem in &failure.rollback_errors {
                Self::format_rollback_problem(output, problem);
            }
        }
    }

    fn format_rollback_problem(output: &mut String, problem: &RollbackProblem) {
        let _ = writeln!(
            output,
            "  ⚠ {} (index {}): {}",
            problem.step, problem.index, problem.error
        );
        if let Some(details) = &problem.details {
            for (key, value) in details.iter() {
                let _ = writeln!(output, "      {key} = {value}");
            }
        }
    }
}

impl ReportFormatter for PlainTextFormatter {
    fn format(&self, report: &Report) -> Result<String> {
        let mut output = String::new();
        Self::format_trace(&mut output, report);
        if let Some(audit) = &report.audit {
            Self::format_audit(&mut output, audit);
        }

        match (&report.outcome, &report.failure) {
            (Outcome::Failed, Some(failure)) => Self::format_failure(&mut output, failure),
            _ => output.push_str("\nTransaction completed\n"),
        }

        Ok(output)
    }
}
