//! Directional page requests.

use crate::{key::KeyChain, retry::RetryPolicy, user_info::UserInfo};
use std::{fmt, num::NonZeroUsize};
use tokio::time::Instant;

/// The direction a request extends the accumulated list in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Replace everything with a fresh first page.
    Refresh,
    /// Load data before the first known page.
    Prepend,
    /// Load data after the last known page.
    Append,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Refresh => "refresh",
            Direction::Prepend => "prepend",
            Direction::Append => "append",
        })
    }
}

/// Parameters shared by every request variant.
///
/// Params are immutable once built. The `with_*` methods return new values,
/// keeping the construction timestamp of the original.
#[derive(Clone)]
pub struct RequestParams<K> {
    key_chain: KeyChain<K>,
    page_size: NonZeroUsize,
    retry_policy: Option<RetryPolicy>,
    user_info: UserInfo,
    timestamp: Instant,
}

impl<K> RequestParams<K> {
    /// Build params for `key_chain`, stamped with the current time.
    pub fn new(key_chain: KeyChain<K>, page_size: NonZeroUsize) -> Self {
        Self {
            key_chain,
            page_size,
            retry_policy: None,
            user_info: UserInfo::new(),
            timestamp: Instant::now(),
        }
    }

    /// Attach a retry policy for the source fetch.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Replace the request context.
    #[must_use]
    pub fn with_user_info(mut self, user_info: UserInfo) -> Self {
        self.user_info = user_info;
        self
    }

    /// The same params, stamped with the current time.
    ///
    /// Used when a request is deliberately issued again, so it is not
    /// mistaken for a rapid re-trigger of its earlier copy.
    #[must_use]
    pub fn restamped(&self) -> Self
    where
        K: Clone,
    {
        Self {
            timestamp: Instant::now(),
            ..self.clone()
        }
    }

    /// The key chain this request targets.
    pub fn key_chain(&self) -> &KeyChain<K> {
        &self.key_chain
    }

    /// Number of values that makes a full page.
    pub fn page_size(&self) -> NonZeroUsize {
        self.page_size
    }

    /// The retry policy for the source fetch, if any.
    pub fn retry_policy(&self) -> Option<&RetryPolicy> {
        self.retry_policy.as_ref()
    }

    /// Parameters for interceptors and sources.
    pub fn user_info(&self) -> &UserInfo {
        &self.user_info
    }

    /// When these params were built. Only used for deduplication.
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }
}

impl<K: PartialEq> RequestParams<K> {
    /// Whether two params target the same page the same way.
    ///
    /// Retry policy, context and timestamp are not compared.
    pub fn matches(&self, other: &Self) -> bool {
        self.key_chain == other.key_chain && self.page_size == other.page_size
    }
}

impl<K: fmt::Debug> fmt::Debug for RequestParams<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestParams")
            .field("key_chain", &self.key_chain)
            .field("page_size", &self.page_size)
            .field("retry_policy", &self.retry_policy)
            .field("user_info", &self.user_info)
            .finish_non_exhaustive()
    }
}

/// A request for one page in a given direction.
#[derive(Debug, Clone)]
pub enum Request<K> {
    /// Reload from the source's initial key.
    Refresh(RequestParams<K>),
    /// Load the page before the first known one.
    Prepend(RequestParams<K>),
    /// Load the page after the last known one.
    Append(RequestParams<K>),
}

impl<K> Request<K> {
    /// Build a request for `direction`.
    pub fn new(direction: Direction, params: RequestParams<K>) -> Self {
        match direction {
            Direction::Refresh => Request::Refresh(params),
            Direction::Prepend => Request::Prepend(params),
            Direction::Append => Request::Append(params),
        }
    }

    /// The request's direction tag.
    pub fn direction(&self) -> Direction {
        match self {
            Request::Refresh(_) => Direction::Refresh,
            Request::Prepend(_) => Direction::Prepend,
            Request::Append(_) => Direction::Append,
        }
    }

    /// The request's parameters.
    pub fn params(&self) -> &RequestParams<K> {
        match self {
            Request::Refresh(params) | Request::Prepend(params) | Request::Append(params) => {
                params
            }
        }
    }

    /// Consume the request, keeping its parameters.
    pub fn into_params(self) -> RequestParams<K> {
        match self {
            Request::Refresh(params) | Request::Prepend(params) | Request::Append(params) => {
                params
            }
        }
    }

    /// The key identifying the requested page.
    pub fn key(&self) -> &K {
        &self.params().key_chain.key
    }

    /// Number of values that makes a full page.
    pub fn page_size(&self) -> usize {
        self.params().page_size.get()
    }

    /// Build a new request in the same direction with different params.
    #[must_use]
    pub fn map_params(self, f: impl FnOnce(RequestParams<K>) -> RequestParams<K>) -> Self {
        let direction = self.direction();
        Request::new(direction, f(self.into_params()))
    }
}

impl<K: PartialEq> Request<K> {
    /// Same direction, same key chain, same page size.
    pub fn matches(&self, other: &Self) -> bool {
        self.direction() == other.direction() && self.params().matches(other.params())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(key: u32, size: usize) -> RequestParams<u32> {
        RequestParams::new(
            KeyChain::new(key, key.checked_sub(1), Some(key + 1)),
            NonZeroUsize::new(size).unwrap(),
        )
    }

    #[test]
    fn test_matches_requires_same_direction() {
        let refresh = Request::Refresh(params(1, 10));
        let append = Request::Append(params(1, 10));
        assert!(refresh.matches(&Request::Refresh(params(1, 10))));
        assert!(!refresh.matches(&append));
    }

    #[test]
    fn test_matches_ignores_context_and_policy() {
        let plain = Request::Append(params(3, 10));
        let decorated = Request::Append(
            params(3, 10)
                .with_user_info(UserInfo::new().with(7u8))
                .with_retry_policy(RetryPolicy::always(2)),
        );
        assert!(plain.matches(&decorated));
    }

    #[test]
    fn test_matches_compares_page_size_and_chain() {
        let a = Request::Prepend(params(3, 10));
        assert!(!a.matches(&Request::Prepend(params(3, 20))));
        assert!(!a.matches(&Request::Prepend(params(4, 10))));
    }

    #[test]
    fn test_map_params_keeps_direction_and_timestamp() {
        let request = Request::Prepend(params(5, 10));
        let stamp = request.params().timestamp();
        let mapped = request.map_params(|p| p.with_user_info(UserInfo::new().with("tag")));
        assert_eq!(mapped.direction(), Direction::Prepend);
        assert_eq!(mapped.params().timestamp(), stamp);
        assert!(mapped.params().user_info().contains::<&'static str>());
        assert_eq!(*mapped.key(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restamped_keeps_everything_but_time() {
        let original = params(2, 10).with_retry_policy(RetryPolicy::always(1));
        tokio::time::advance(std::time::Duration::from_secs(1)).await;

        let copy = original.restamped();
        assert!(copy.matches(&original));
        assert!(copy.retry_policy().is_some());
        assert!(copy.timestamp() > original.timestamp());
    }
}
