//! Error types for pagewise.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`PagingError`] - Terminal failures of a pagination pipeline
//! - [`FetchError`] - Optional classification for source failures
//! - [`StoreError`] - Failures reported by a [`PageStore`](crate::PageStore)

use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A failure that ends a pagination pipeline.
///
/// Pipelines are fail-closed: after emitting one of these they accept no
/// further requests, and a new pipeline must be built to resume.
#[derive(Error, Debug)]
pub enum PagingError {
    /// An interceptor failed while inspecting a request. Never retried.
    #[error("interceptor #{index} failed: {source}")]
    Interceptor {
        /// Position of the failing interceptor in the chain.
        index: usize,
        /// The interceptor's error.
        #[source]
        source: BoxError,
    },

    /// The source fetch failed and the retry policy gave up.
    #[error("fetch failed: {0}")]
    Fetch(#[source] BoxError),

    /// The pipeline has terminated and no longer accepts requests.
    #[error("pagination pipeline is closed")]
    Closed,
}

impl PagingError {
    /// Wrap an interceptor failure.
    pub fn interceptor(index: usize, source: BoxError) -> Self {
        Self::Interceptor { index, source }
    }

    /// Wrap a source failure.
    pub fn fetch<E>(source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Fetch(source.into())
    }

    /// Whether this error came from the source fetch.
    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch(_))
    }
}

/// Classification a source can give its failures.
///
/// [`RetryPolicy::transient`](crate::RetryPolicy::transient) retries only the
/// `Transient` variant; sources are free to use their own error types instead.
#[derive(Error, Debug)]
pub enum FetchError {
    /// A network or backend hiccup worth retrying.
    #[error("transient fetch failure: {0}")]
    Transient(#[source] BoxError),

    /// A failure that will not go away on retry.
    #[error("permanent fetch failure: {0}")]
    Permanent(#[source] BoxError),
}

impl FetchError {
    /// Create a transient failure.
    pub fn transient(source: impl Into<BoxError>) -> Self {
        Self::Transient(source.into())
    }

    /// Create a permanent failure.
    pub fn permanent(source: impl Into<BoxError>) -> Self {
        Self::Permanent(source.into())
    }

    /// Whether a retry may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Errors reported by local page storage.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The storage backend failed.
    #[error("storage backend error: {0}")]
    Backend(#[source] BoxError),

    /// The stored data could not be mapped to or from page values.
    #[error("invalid stored data: {0}")]
    Invalid(String),
}

impl StoreError {
    /// Wrap a backend failure.
    pub fn backend(source: impl Into<BoxError>) -> Self {
        Self::Backend(source.into())
    }

    /// Reject stored data that does not map to page values.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}
