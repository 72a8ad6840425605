//! Request deduplication.

use pagewise_core::{Key, Request};
use std::time::Duration;

/// Matching requests closer together than this are collapsed into one.
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_millis(250);

/// Drops rapid re-triggers of the same request.
///
/// A request is a duplicate when it [matches](Request::matches) the request
/// received immediately before it and was built less than `window` later.
/// The comparison is always against the previous *received* request, so a
/// dropped duplicate still becomes the reference for the next one.
#[derive(Debug)]
pub struct RequestFunnel<K> {
    window: Duration,
    previous: Option<Request<K>>,
}

impl<K: Key> RequestFunnel<K> {
    /// A funnel collapsing matches within `window`.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            previous: None,
        }
    }

    /// Pass `request` through, or `None` if it duplicates its predecessor.
    pub fn admit(&mut self, request: Request<K>) -> Option<Request<K>> {
        let duplicate = self.previous.as_ref().is_some_and(|previous| {
            request.matches(previous)
                && request
                    .params()
                    .timestamp()
                    .saturating_duration_since(previous.params().timestamp())
                    < self.window
        });
        self.previous = Some(request.clone());
        (!duplicate).then_some(request)
    }

    /// The configured window.
    pub fn window(&self) -> Duration {
        self.window
    }
}

impl<K: Key> Default for RequestFunnel<K> {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_WINDOW)
    }
}
