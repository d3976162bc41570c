use super::Report;
use crate::error::Result;

pub(crate) trait ReportFormatter {
    fn format(&self, report: &Report) -> Result<String>;
}
