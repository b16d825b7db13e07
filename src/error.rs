//! Error types for queries, providers and live streams.

use thiserror::Error;

/// Faults raised by a [`DataProvider`](crate::provider::DataProvider) while
/// executing a query.
#[derive(Error, Debug)]
pub enum ProviderFault {
    #[error("Provider unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Malformed query: {reason}")]
    MalformedQuery { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the loader.
///
/// Every error delivered through a stream is terminal. The engine never
/// retries on its own; resubscribe to try again.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Query has no source; set one before building")]
    MissingSource,

    #[error("Provider returned no result for '{locator}'")]
    NullResult { locator: String },

    #[error("Provider fault: {0}")]
    Provider(#[from] ProviderFault),

    #[error("Consumer fell behind: {capacity} handles already pending")]
    Overflow { capacity: usize },

    #[error("Load was cancelled before it produced a result")]
    Cancelled,

    #[error("Failed to decode query: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid loader configuration: {0}")]
    Config(String),
}

impl LoaderError {
    /// Whether this error was produced by the data provider itself.
    pub fn is_provider_fault(&self) -> bool {
        matches!(self, LoaderError::Provider(_))
    }
}

pub type LoaderResult<T> = Result<T, LoaderError>;
