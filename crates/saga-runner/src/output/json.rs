use super::{Report, ReportFormatter};
use crate::error::Result;

pub(crate) struct JsonFormatter;

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &Report) -> Result<String> {
        let mut output = serde_json::to_string_pretty(report)?;
        output.push('\n');
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use saga_transaction::{ExecutionContext, noop_rollback, operation_fn, with_transaction};
    use serde_json::Value;

    use super::*;
    use crate::simulate::TraceEvent;

    #[test]
    fn completed_report_has_no_failure_field() -> anyhow::Result<()> {
        let report = Report::new(vec![TraceEvent::Run("a".to_string())], Ok(()));

        let value: Value = serde_json::from_str(&JsonFormatter.format(&report)?)?;

        assert_eq!(value["outcome"], "completed");
        assert_eq!(value["trace"][0]["event"], "run");
        assert_eq!(value["trace"][0]["step"], "a");
        assert!(value.get("failure").is_none());
        Ok(())
    }

    #[test]
    fn failed_report_exposes_structured_failure() -> anyhow::Result<()> {
        let err = with_transaction(&ExecutionContext::new(), |tx| {
            tx.add_operation(operation_fn(|_| Err("boom".into())), noop_rollback());
            Ok(())
        })
        .expect_err("step fails");
        let report = Report::new(vec![TraceEvent::Run("step-0".to_string())], Err(&err));

        let value: Value = serde_json::from_str(&JsonFormatter.format(&report)?)?;

        assert_eq!(value["outcome"], "failed");
        assert_eq!(value["failure"]["kind"], "operation");
        assert_eq!(value["failure"]["failed_index"], 0);
        assert_eq!(value["failure"]["cause"], "boom");
        assert_eq!(value["failure"]["rollback_errors"], Value::Array(Vec::new()));
        Ok(())
    }
}
