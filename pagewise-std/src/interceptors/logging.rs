//! Logging interceptor for request observation.

use pagewise_core::{BoxError, Intercept, Interceptor, Key, Page, Request, Value};
use tracing::info;

/// An interceptor that logs every request and the page it produced.
///
/// It never changes a request. Place it first in the chain to also see pages
/// served by short-circuiting interceptors further down.
#[derive(Debug, Clone, Copy)]
pub struct LoggingInterceptor {
    label: &'static str,
}

impl LoggingInterceptor {
    /// Create a logging interceptor whose events carry `label`.
    pub const fn new(label: &'static str) -> Self {
        Self { label }
    }

    /// The label attached to every event.
    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl Default for LoggingInterceptor {
    fn default() -> Self {
        Self::new("pagewise")
    }
}

impl<K: Key, V: Value> Interceptor<K, V> for LoggingInterceptor {
    async fn intercept(&self, request: &Request<K>) -> Result<Intercept<K, V>, BoxError> {
        info!(
            label = self.label,
            direction = %request.direction(),
            key = ?request.key(),
            page_size = request.page_size(),
            "sending pagination request"
        );
        Ok(Intercept::observe(request.clone()))
    }

    async fn handle(&self, page: &Page<K, V>) {
        info!(
            label = self.label,
            direction = %page.request.direction(),
            key = ?page.key(),
            values = page.len(),
            complete = page.is_complete(),
            "received page"
        );
    }
}
