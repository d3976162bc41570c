use std::error::Error as StdError;

use indexmap::IndexMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::error::BoxError;

/// Ordered key/value diagnostics attached to a [`WrappedError`].
///
/// Values are stored as JSON so callers can attach anything serializable and
/// read it back with [`get`](Self::get) as a concrete type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ErrorDetails(IndexMap<String, Value>);

impl ErrorDetails {
    /// Create an empty set of details.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a detail, replacing any previous value under the same key.
    ///
    /// Values that fail to serialize are stored as their error message.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.insert(key, value);
        self
    }

    /// Add or replace `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Serialize) {
        let value = serde_json::to_value(value).unwrap_or_else(|e| Value::String(e.to_string()));
        self.0.insert(key.into(), value);
    }

    /// Read a detail back as `T`.
    ///
    /// Returns `None` if the key is missing or the value does not deserialize
    /// into `T`.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.0
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Raw JSON value for a key.
    #[must_use]
    pub fn get_raw(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ErrorDetails {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// An error labelled with the operation that produced it.
#[derive(Debug, Error)]
#[error("{operation}: {message}")]
pub struct WrappedError {
    /// Label of the operation that failed.
    pub operation: String,
    /// What the operation was trying to do.
    pub message: String,
    /// Structured diagnostics.
    pub details: ErrorDetails,
    /// The underlying error.
    #[source]
    pub source: BoxError,
}

impl WrappedError {
    /// Label `source` with an operation name and message.
    pub fn new(
        source: impl Into<BoxError>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
            details: ErrorDetails::new(),
            source: source.into(),
        }
    }

    /// Attach details, merging over any already present.
    #[must_use]
    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        for (key, value) in details.0 {
            self.details.0.insert(key, value);
        }
        self
    }

    /// Attach one detail.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.details.insert(key, value);
        self
    }
}

/// Find the first [`WrappedError`] in an error's source chain, including the
/// error itself.
#[must_use]
pub fn find_wrapped<'e>(error: &'e (dyn StdError + 'static)) -> Option<&'e WrappedError> {
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(wrapped) = err.downcast_ref::<WrappedError>() {
            return Some(wrapped);
        }
        current = err.source();
    }
    None
}

/// Details of the first [`WrappedError`] in an error's source chain.
#[must_use]
pub fn find_details<'e>(error: &'e (dyn StdError + 'static)) -> Option<&'e ErrorDetails> {
    find_wrapped(error).map(|wrapped| &wrapped.details)
}
