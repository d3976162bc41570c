use std::time::Instant;

/// Status of a step in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepStatus {
    /// Step executed successfully.
    Executed,
    /// Step failed during execution.
    Failed,
    /// Step never started because the context was done.
    Cancelled,
    /// Step was compensated successfully.
    Compensated,
    /// Step compensation failed.
    CompensationFailed,
}

/// Record of one forward step.
#[derive(Debug, Clone)]
pub struct StepRecord {
    /// Position of the step in registration order.
    pub index: usize,
    /// Label of the step.
    pub name: String,
    /// Current status.
    pub status: StepStatus,
    /// When the step started, or was found cancelled.
    pub started_at: Instant,
    /// When the step last changed status.
    pub completed_at: Option<Instant>,
}

/// Audit log tracking every forward step and compensation of a transaction.
#[derive(Debug, Default, Clone)]
pub struct AuditLog {
    records: Vec<StepRecord>,
}

impl AuditLog {
    /// Create a new empty audit log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_start(&mut self, index: usize, name: &str) {
        self.records.push(StepRecord {
            index,
            name: name.to_string(),
            status: StepStatus::Executed,
            started_at: Instant::now(),
            completed_at: None,
        });
    }

    pub(crate) fn record_success(&mut self) {
        self.finish_last(StepStatus::Executed);
    }

    pub(crate) fn record_failure(&mut self) {
        self.finish_last(StepStatus::Failed);
    }

    pub(crate) fn record_cancelled(&mut self, index: usize, name: &str) {
        let now = Instant::now();
        self.records.push(StepRecord {
            index,
            name: name.to_string(),
            status: StepStatus::Cancelled,
            started_at: now,
            completed_at: Some(now),
        });
    }

    pub(crate) fn record_compensated(&mut self, index: usize) {
        self.update(index, StepStatus::Compensated);
    }

    pub(crate) fn record_compensation_failed(&mut self, index: usize) {
        self.update(index, StepStatus::CompensationFailed);
    }

    fn finish_last(&mut self, status: StepStatus) {
        if let Some(record) = self.records.last_mut() {
            record.status = status;
            record.completed_at = Some(Instant::now());
        }
    }

    fn update(&mut self, index: usize, status: StepStatus) {
        if let Some(record) = self.records.iter_mut().find(|r| r.index == index) {
            record.status = status;
            record.completed_at = Some(Instant::now());
        }
    }

    /// Get all records, in forward order.
    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Record for the step at `index`, if it was attempted.
    #[must_use]
    pub fn record(&self, index: usize) -> Option<&StepRecord> {
        self.records.iter().find(|r| r.index == index)
    }

    /// Get a summary of the execution for display.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        for record in &self.records {
            let status = match record.status {
                StepStatus::Executed => "✓",
                StepStatus::Failed => "✗",
                StepStatus::Cancelled => "⊘",
                StepStatus::Compensated => "↩",
                StepStatus::CompensationFailed => "⚠",
            };
            lines.push(format!("{status} {}", record.name));
        }
        lines.join("\n")
    }
}
