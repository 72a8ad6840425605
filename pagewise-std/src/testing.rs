//! Testing utilities for pagewise.
//!
//! This module provides in-memory collaborators to make testing pipelines,
//! interceptors and managers easier.
//!
//! # Features
//!
//! - [`VecSource`]: A page-numbered source over a growable vector, with
//!   scripted failures and optional latency
//! - [`RecordingInterceptor`]: An interceptor that records every request and page
//! - [`FailingInterceptor`]: An interceptor that always errors
//! - [`MemoryStore`]: A [`PageStore`] over a sorted in-memory set

use pagewise_core::{
    BoxError, Direction, FetchError, Intercept, Interceptor, Key, KeyChain, Page, PageStore,
    Request, Source, StoreError, Value,
};
use std::{
    collections::BTreeSet,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering},
    },
    time::Duration,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Vec Source
// ============================================================================

/// A source serving fixed-size slices of a vector, keyed by page number.
///
/// Page `n` covers `data[n * stride..]`, truncated to the request's page size.
/// Data can be appended at any time, so a page that came back incomplete may
/// be complete on the next fetch.
///
/// # Example
///
/// ```rust,ignore
/// let source = VecSource::new(0..25, 10);
/// source.fail_next(2); // the next two fetches fail transiently
/// ```
pub struct VecSource<V> {
    stride: usize,
    refresh_key: usize,
    data: Mutex<Vec<V>>,
    latency: Duration,
    fetched: Mutex<Vec<(Direction, usize)>>,
    transient_failures: AtomicU32,
    permanent_failure: AtomicBool,
}

impl<V> VecSource<V> {
    /// A source over `data` with pages of `stride` values, refreshing at page 0.
    pub fn new(data: impl IntoIterator<Item = V>, stride: usize) -> Self {
        Self {
            stride: stride.max(1),
            refresh_key: 0,
            data: Mutex::new(data.into_iter().collect()),
            latency: Duration::ZERO,
            fetched: Mutex::new(Vec::new()),
            transient_failures: AtomicU32::new(0),
            permanent_failure: AtomicBool::new(false),
        }
    }

    /// Start refreshes at page `key` instead of 0.
    #[must_use]
    pub fn with_refresh_key(mut self, key: usize) -> Self {
        self.refresh_key = key;
        self
    }

    /// Delay every fetch by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Append values to the underlying data.
    pub fn push(&self, values: impl IntoIterator<Item = V>) {
        lock(&self.data).extend(values);
    }

    /// Make the next `n` fetches fail with [`FetchError::Transient`].
    pub fn fail_next(&self, n: u32) {
        self.transient_failures.store(n, Ordering::SeqCst);
    }

    /// Make every fetch fail with [`FetchError::Permanent`].
    pub fn fail_permanently(&self, fail: bool) {
        self.permanent_failure.store(fail, Ordering::SeqCst);
    }

    /// Number of fetch attempts, failed ones included.
    pub fn fetch_count(&self) -> usize {
        lock(&self.fetched).len()
    }

    /// Direction and key of every fetch attempt, in order.
    pub fn fetched(&self) -> Vec<(Direction, usize)> {
        lock(&self.fetched).clone()
    }

    fn take_transient_failure(&self) -> bool {
        self.transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl<V: Value> Source for VecSource<V> {
    type Key = usize;
    type Value = V;
    type Error = FetchError;

    fn refresh_key(&self) -> usize {
        self.refresh_key
    }

    fn key_chain(&self, key: &usize) -> KeyChain<usize> {
        let len = lock(&self.data).len();
        let next = key + 1;
        KeyChain::new(
            *key,
            key.checked_sub(1),
            (next * self.stride < len).then_some(next),
        )
    }

    async fn fetch(&self, request: &Request<usize>) -> Result<Page<usize, V>, FetchError> {
        lock(&self.fetched).push((request.direction(), *request.key()));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.permanent_failure.load(Ordering::SeqCst) {
            return Err(FetchError::permanent("scripted permanent failure"));
        }
        if self.take_transient_failure() {
            return Err(FetchError::transient("scripted transient failure"));
        }

        let values = lock(&self.data)
            .iter()
            .skip(request.key() * self.stride)
            .take(request.page_size())
            .cloned()
            .collect();
        Ok(Page::new(request.clone(), values))
    }
}

// ============================================================================
// Recording Interceptor
// ============================================================================

/// An interceptor that records every request and every page it observes.
///
/// Clones share their recordings.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = RecordingInterceptor::new();
/// let handle = recorder.clone();
///
/// // Use in a chain...
///
/// assert_eq!(handle.requests().len(), 1);
/// ```
pub struct RecordingInterceptor<K, V> {
    requests: Arc<Mutex<Vec<Request<K>>>>,
    pages: Arc<Mutex<Vec<Page<K, V>>>>,
    handle_afterwards: bool,
}

impl<K, V> RecordingInterceptor<K, V> {
    /// A recorder that asks to observe results.
    pub fn new() -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            pages: Arc::new(Mutex::new(Vec::new())),
            handle_afterwards: true,
        }
    }

    /// A recorder that only sees requests.
    pub fn passive() -> Self {
        Self {
            handle_afterwards: false,
            ..Self::new()
        }
    }

    /// Number of requests seen.
    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Number of pages observed.
    pub fn page_count(&self) -> usize {
        lock(&self.pages).len()
    }

    /// Clear all recordings.
    pub fn clear(&self) {
        lock(&self.requests).clear();
        lock(&self.pages).clear();
    }
}

impl<K: Clone, V: Clone> RecordingInterceptor<K, V> {
    /// A copy of the requests seen.
    pub fn requests(&self) -> Vec<Request<K>> {
        lock(&self.requests).clone()
    }

    /// A copy of the pages observed.
    pub fn pages(&self) -> Vec<Page<K, V>> {
        lock(&self.pages).clone()
    }
}

impl<K, V> Default for RecordingInterceptor<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for RecordingInterceptor<K, V> {
    fn clone(&self) -> Self {
        Self {
            requests: Arc::clone(&self.requests),
            pages: Arc::clone(&self.pages),
            handle_afterwards: self.handle_afterwards,
        }
    }
}

impl<K: Key, V: Value> Interceptor<K, V> for RecordingInterceptor<K, V> {
    async fn intercept(&self, request: &Request<K>) -> Result<Intercept<K, V>, BoxError> {
        lock(&self.requests).push(request.clone());
        Ok(Intercept::Proceed {
            request: request.clone(),
            handle_afterwards: self.handle_afterwards,
        })
    }

    async fn handle(&self, page: &Page<K, V>) {
        lock(&self.pages).push(page.clone());
    }
}

// ============================================================================
// Failing Interceptor
// ============================================================================

/// An interceptor whose `intercept` always fails with `message`.
#[derive(Debug, Clone, Copy)]
pub struct FailingInterceptor {
    message: &'static str,
}

impl FailingInterceptor {
    /// Create a failing interceptor.
    pub const fn new(message: &'static str) -> Self {
        Self { message }
    }
}

impl<K: Key, V: Value> Interceptor<K, V> for FailingInterceptor {
    async fn intercept(&self, _request: &Request<K>) -> Result<Intercept<K, V>, BoxError> {
        Err(self.message.into())
    }
}

// ============================================================================
// Memory Store
// ============================================================================

/// Context a [`MemoryStore`] expects in a request's `UserInfo`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryScope;

/// A [`PageStore`] keeping values in sorted order, paged like [`VecSource`].
pub struct MemoryStore<V> {
    stride: usize,
    values: Mutex<BTreeSet<V>>,
    failure: Mutex<Option<&'static str>>,
    inserts: AtomicUsize,
}

impl<V: Ord + Clone> MemoryStore<V> {
    /// An empty store with pages of `stride` values.
    pub fn new(stride: usize) -> Self {
        Self {
            stride: stride.max(1),
            values: Mutex::new(BTreeSet::new()),
            failure: Mutex::new(None),
            inserts: AtomicUsize::new(0),
        }
    }

    /// Add values directly, bypassing the pipeline.
    pub fn seed(&self, values: impl IntoIterator<Item = V>) {
        lock(&self.values).extend(values);
    }

    /// All stored values, sorted.
    pub fn values(&self) -> Vec<V> {
        lock(&self.values).iter().cloned().collect()
    }

    /// Number of successful [`PageStore::insert`] calls.
    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    /// Make every operation fail with a backend error.
    pub fn fail_with(&self, message: &'static str) {
        *lock(&self.failure) = Some(message);
    }

    fn check(&self) -> Result<(), StoreError> {
        match *lock(&self.failure) {
            Some(message) => Err(StoreError::backend(message)),
            None => Ok(()),
        }
    }
}

impl<V> PageStore<usize, V> for MemoryStore<V>
where
    V: Value + Ord,
{
    type Context = MemoryScope;

    fn get(&self, request: &Request<usize>, _cx: &MemoryScope) -> Result<Vec<V>, StoreError> {
        self.check()?;
        Ok(lock(&self.values)
            .iter()
            .skip(request.key() * self.stride)
            .take(request.page_size())
            .cloned()
            .collect())
    }

    fn insert(&self, remote_values: &[V], _cx: &MemoryScope) -> Result<Vec<V>, StoreError> {
        self.check()?;
        lock(&self.values).extend(remote_values.iter().cloned());
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(remote_values.to_vec())
    }

    fn delete_all(&self, _cx: &MemoryScope) -> Result<(), StoreError> {
        self.check()?;
        lock(&self.values).clear();
        Ok(())
    }
}
