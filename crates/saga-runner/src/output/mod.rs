mod formatter;
mod json;
mod plain;
mod report;

pub(crate) use formatter::ReportFormatter;
pub(crate) use json::JsonFormatter;
pub(crate) use plain::PlainTextFormatter;
pub(crate) use report::{Outcome, Report};
