//! TTL cache interceptor.

use pagewise_core::{BoxError, Intercept, Interceptor, Key, Page, Request, Value};
use std::{
    collections::HashMap,
    hash::Hash,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::time::Instant;
use tracing::{debug, trace};

/// Default lifetime of a cached page: ten minutes.
pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(10 * 60);

struct CacheEntry<K, V> {
    page: Page<K, V>,
    stored_at: Instant,
}

/// An interceptor that answers repeated requests from memory.
///
/// Pages are cached by key when the post-fetch hook sees them. A request for
/// a key with a fresh entry completes with the cached values and never
/// reaches the source. Expired entries are dropped lazily, on every
/// `intercept` call.
pub struct CacheInterceptor<K, V> {
    expiration: Duration,
    entries: Mutex<HashMap<K, CacheEntry<K, V>>>,
}

impl<K, V> CacheInterceptor<K, V> {
    /// A cache using [`DEFAULT_EXPIRATION`].
    pub fn new() -> Self {
        Self::with_expiration(DEFAULT_EXPIRATION)
    }

    /// A cache whose entries live for `expiration`.
    pub fn with_expiration(expiration: Duration) -> Self {
        Self {
            expiration,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// How long entries stay fresh.
    pub fn expiration(&self) -> Duration {
        self.expiration
    }

    /// Number of entries, expired ones included until the next prune.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, CacheEntry<K, V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K, V> Default for CacheInterceptor<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Interceptor<K, V> for CacheInterceptor<K, V>
where
    K: Key + Eq + Hash,
    V: Value,
{
    async fn intercept(&self, request: &Request<K>) -> Result<Intercept<K, V>, BoxError> {
        let cached = {
            let mut entries = self.lock();
            let now = Instant::now();
            let before = entries.len();
            entries.retain(|_, entry| now.duration_since(entry.stored_at) <= self.expiration);
            if entries.len() < before {
                trace!(evicted = before - entries.len(), "pruned expired pages");
            }
            entries
                .get(request.key())
                .map(|entry| entry.page.values.clone())
        };

        match cached {
            Some(values) => {
                debug!(key = ?request.key(), "cache hit");
                // The cached values answer this request, whatever produced them.
                Ok(Intercept::complete(Page::new(request.clone(), values)))
            }
            None => Ok(Intercept::observe(request.clone())),
        }
    }

    async fn handle(&self, page: &Page<K, V>) {
        let entry = CacheEntry {
            page: page.clone(),
            stored_at: Instant::now(),
        };
        self.lock().insert(page.key().clone(), entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewise_core::{KeyChain, RequestParams};
    use std::num::NonZeroUsize;

    fn append(key: u32) -> Request<u32> {
        Request::Append(RequestParams::new(
            KeyChain::isolated(key),
            NonZeroUsize::new(2).unwrap(),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_miss_then_hit() {
        let cache = CacheInterceptor::<u32, &'static str>::new();

        let first = cache.intercept(&append(1)).await.unwrap();
        assert!(matches!(
            first,
            Intercept::Proceed {
                handle_afterwards: true,
                ..
            }
        ));

        cache.handle(&Page::new(append(1), vec!["a", "b"])).await;
        match cache.intercept(&append(1)).await.unwrap() {
            Intercept::Complete(page) => assert_eq!(page.values, vec!["a", "b"]),
            other => panic!("expected cache hit, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let cache = CacheInterceptor::<u32, u8>::with_expiration(Duration::from_secs(5));
        cache.handle(&Page::new(append(1), vec![1, 2])).await;

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(cache.intercept(&append(1)).await.unwrap().is_complete());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(!cache.intercept(&append(1)).await.unwrap().is_complete());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_answers_current_request() {
        let cache = CacheInterceptor::<u32, u8>::new();
        let refresh = Request::Refresh(RequestParams::new(
            KeyChain::isolated(1),
            NonZeroUsize::new(2).unwrap(),
        ));
        cache.handle(&Page::new(refresh, vec![1, 2])).await;

        match cache.intercept(&append(1)).await.unwrap() {
            Intercept::Complete(page) => {
                assert_eq!(page.request.direction(), pagewise_core::Direction::Append);
                assert!(page.is_complete());
            }
            other => panic!("expected cache hit, got {other:?}"),
        }
    }

    #[test]
    fn test_default_expiration() {
        let cache = CacheInterceptor::<u32, u8>::default();
        assert_eq!(cache.expiration(), Duration::from_secs(600));
        cache.clear();
        assert_eq!(cache.len(), 0);
    }
}
