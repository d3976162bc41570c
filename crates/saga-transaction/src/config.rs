use std::time::Duration;

use serde::Deserialize;

/// Tunables for a [`Transaction`](crate::Transaction).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransactionConfig {
    /// Deadline placed on the rollback context, measured from the start of
    /// rollback. `None` lets compensations run to completion.
    #[serde(rename = "rollback_timeout_ms", with = "millis")]
    pub rollback_timeout: Option<Duration>,
}

impl TransactionConfig {
    /// Create a configuration with an unbounded rollback.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the context handed to compensations by `timeout`.
    #[must_use]
    pub fn with_rollback_timeout(mut self, timeout: Duration) -> Self {
        self.rollback_timeout = Some(timeout);
        self
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
