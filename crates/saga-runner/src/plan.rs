use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use saga_transaction::{ErrorDetails, TransactionConfig};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum PlanError {
    #[error("failed to read plan '{path}'")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse plan '{path}'")]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },

    #[error("step {index} has an empty name")]
    EmptyName { index: usize },

    #[error("step name '{0}' is used more than once")]
    DuplicateName(String),

    #[error("step '{0}' has details but its rollback is not \"checked\"")]
    DetailsWithoutCheckedRollback(String),

    #[error("step '{0}' has a noop rollback, which cannot fail")]
    NoopRollbackCannotFail(String),

    #[error("--cancel-before {index} is out of range for a plan with {len} step(s)")]
    CancelBeforeOutOfRange { index: usize, len: usize },
}

/// How a simulated step is undone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum RollbackKind {
    /// A bare compensation.
    #[default]
    Plain,
    /// A compensation whose failures are labelled and carry details.
    Checked,
    /// Nothing to undo.
    Noop,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct StepPlan {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) fail: bool,
    #[serde(default)]
    pub(crate) message: Option<String>,
    #[serde(default)]
    pub(crate) cancel: bool,
    #[serde(default)]
    pub(crate) rollback: RollbackKind,
    #[serde(default)]
    pub(crate) rollback_fails: bool,
    #[serde(default)]
    pub(crate) rollback_message: Option<String>,
    #[serde(default)]
    pub(crate) details: Option<ErrorDetails>,
}

impl StepPlan {
    pub(crate) fn failure_message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| format!("{} failed", self.name))
    }

    pub(crate) fn rollback_failure_message(&self) -> String {
        self.rollback_message
            .clone()
            .unwrap_or_else(|| format!("could not undo {}", self.name))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Plan {
    #[serde(default)]
    pub(crate) transaction: TransactionConfig,
    #[serde(default)]
    pub(crate) steps: Vec<StepPlan>,
}

impl Plan {
    pub(crate) fn load(path: &Path) -> Result<Self, PlanError> {
        let content = fs::read_to_string(path).map_err(|source| PlanError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let plan: Self = toml::from_str(&content).map_err(|source| PlanError::Parse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;
        plan.validate()?;
        Ok(plan)
    }

    pub(crate) fn validate(&self) -> Result<(), PlanError> {
        let mut seen = HashSet::new();
        for (index, step) in self.steps.iter().enumerate() {
            if step.name.trim().is_empty() {
                return Err(PlanError::EmptyName { index });
            }
            if !seen.insert(step.name.as_str()) {
                return Err(PlanError::DuplicateName(step.name.clone()));
            }
            if step.details.is_some() && step.rollback != RollbackKind::Checked {
                return Err(PlanError::DetailsWithoutCheckedRollback(step.name.clone()));
            }
            if step.rollback_fails && step.rollback == RollbackKind::Noop {
                return Err(PlanError::NoopRollbackCannotFail(step.name.clone()));
            }
        }
        Ok(())
    }

    /// Check that cancelling before step `index` is meaningful for this plan.
    ///
    /// Index 0 is always accepted and cancels before the transaction starts.
    /// Cancellation is only observed before a step, so indices past the last
    /// step are rejected.
    pub(crate) fn check_cancel_before(&self, index: usize) -> Result<(), PlanError> {
        let len = self.steps.len();
        if index > 0 && index >= len {
            return Err(PlanError::CancelBeforeOutOfRange { index, len });
        }
        Ok(())
    }
}
