//! # Pagination Manager
//!
//! [`PaginationManager`] is the consumer-facing side of a pipeline. It turns
//! `refresh`/`prepend`/`append` triggers into requests, folds the resulting
//! pages into one ordered list, and publishes that list with busy flags.
//!
//! ```rust,ignore
//! let manager = PaginationManager::builder(source)
//!     .page_size(NonZeroUsize::new(20).unwrap())
//!     .interceptor(LoggingInterceptor::default())
//!     .interceptor(CacheInterceptor::new())
//!     .build();
//!
//! manager.refresh(UserInfo::new())?;
//! let mut outputs = manager.subscribe();
//! while let Some(Ok(output)) = outputs.next().await {
//!     render(&output.values);
//! }
//! ```
//!
//! Triggers never wait for the page. Whether a trigger sends anything
//! depends on the boundary page in its direction:
//!
//! - no page yet: a refresh is sent instead,
//! - the page was incomplete: the same page is requested again,
//! - otherwise: the neighboring key is requested, if there is one.

mod accumulator;
mod output;

pub use accumulator::{Accumulator, Plan};
pub use output::{Busy, Output};

use crate::{
    chain::InterceptorChainBuilder,
    pager::{Pager, PagerConfig, PagingState, RequestSink, StateStream},
};
use accumulator::plan_request;
use futures::{
    Stream, StreamExt,
    stream::{self, BoxStream},
};
use pagewise_core::{
    Direction, Interceptor, Key, PagingError, Request, RequestParams, RetryPolicy, Source,
    UserInfo, Value,
};
use std::{
    fmt,
    num::NonZeroUsize,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    task::{Context, Poll},
    time::Duration,
};
use tokio::sync::watch;
use tracing::{debug, trace};

/// Page size used when the builder is not given one.
pub const DEFAULT_PAGE_SIZE: NonZeroUsize = NonZeroUsize::new(20).unwrap();

/// The latest output, or the failure that ended the pipeline.
pub type Snapshot<V> = Result<Output<V>, Arc<PagingError>>;

/// What a trigger did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// A request in this direction was queued.
    Issued(Direction),
    /// There is nothing more to load in the requested direction.
    Exhausted,
}

impl Trigger {
    /// Whether a request was queued.
    pub fn is_issued(&self) -> bool {
        matches!(self, Self::Issued(_))
    }
}

type SharedAccumulator<S> =
    Arc<Mutex<Accumulator<<S as Source>::Key, <S as Source>::Value>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drives a pagination pipeline for one source.
pub struct PaginationManager<S: Source> {
    source: Arc<S>,
    page_size: NonZeroUsize,
    retry_policy: Option<RetryPolicy>,
    sink: RequestSink<S::Key>,
    accumulator: SharedAccumulator<S>,
    output: watch::Receiver<Snapshot<S::Value>>,
}

impl<S: Source> PaginationManager<S> {
    /// A manager over `source` with no interceptors.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new(source: S, page_size: NonZeroUsize) -> Self {
        Self::builder(source).page_size(page_size).build()
    }

    /// Start configuring a manager.
    pub fn builder(source: S) -> PaginationManagerBuilder<S> {
        PaginationManagerBuilder::new(source)
    }

    /// Reload from the source's refresh key.
    ///
    /// # Errors
    ///
    /// [`PagingError::Closed`] once the pipeline has failed.
    pub fn refresh(&self, user_info: UserInfo) -> Result<Trigger, PagingError> {
        self.trigger(Direction::Refresh, user_info)
    }

    /// Load the page before the first one.
    ///
    /// # Errors
    ///
    /// [`PagingError::Closed`] once the pipeline has failed.
    pub fn prepend(&self, user_info: UserInfo) -> Result<Trigger, PagingError> {
        self.trigger(Direction::Prepend, user_info)
    }

    /// Load the page after the last one.
    ///
    /// # Errors
    ///
    /// [`PagingError::Closed`] once the pipeline has failed.
    pub fn append(&self, user_info: UserInfo) -> Result<Trigger, PagingError> {
        self.trigger(Direction::Append, user_info)
    }

    /// The latest snapshot.
    pub fn output(&self) -> Snapshot<S::Value> {
        self.output.borrow().clone()
    }

    /// Watch the output.
    ///
    /// The stream starts with the current snapshot and then yields every
    /// change. Snapshots produced faster than the subscriber reads them are
    /// coalesced; the latest one is never lost. After a pipeline failure
    /// the stream yields the error and ends.
    pub fn subscribe(&self) -> OutputStream<S::Value> {
        OutputStream::new(self.output.clone())
    }

    /// Whether the pipeline has failed.
    pub fn is_closed(&self) -> bool {
        self.output.borrow().is_err() || self.sink.is_closed()
    }

    /// The source pages come from.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Values per page.
    pub fn page_size(&self) -> NonZeroUsize {
        self.page_size
    }

    fn trigger(&self, direction: Direction, user_info: UserInfo) -> Result<Trigger, PagingError> {
        if self.is_closed() {
            return Err(PagingError::Closed);
        }

        let plan = lock(&self.accumulator).plan(direction);
        let request = plan_request(direction, plan, |direction, key| {
            let key = key.unwrap_or_else(|| self.source.refresh_key());
            self.request(direction, key, user_info)
        });
        let Some(request) = request else {
            trace!(%direction, "no more data");
            return Ok(Trigger::Exhausted);
        };

        let issued = request.direction();
        debug!(direction = %issued, key = ?request.key(), "issuing request");
        self.sink.send(request)?;
        Ok(Trigger::Issued(issued))
    }

    fn request(&self, direction: Direction, key: S::Key, user_info: UserInfo) -> Request<S::Key> {
        let mut params = RequestParams::new(self.source.key_chain(&key), self.page_size)
            .with_user_info(user_info);
        if let Some(policy) = &self.retry_policy {
            params = params.with_retry_policy(policy.clone());
        }
        Request::new(direction, params)
    }
}

impl<S: Source> fmt::Debug for PaginationManager<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaginationManager")
            .field("page_size", &self.page_size)
            .field("retry_policy", &self.retry_policy)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Builder for constructing a [`PaginationManager`].
pub struct PaginationManagerBuilder<S: Source> {
    source: S,
    page_size: NonZeroUsize,
    retry_policy: Option<RetryPolicy>,
    chain: InterceptorChainBuilder<S::Key, S::Value>,
    config: PagerConfig,
}

impl<S: Source> PaginationManagerBuilder<S> {
    /// A builder with [`DEFAULT_PAGE_SIZE`], no interceptors and no retries.
    pub fn new(source: S) -> Self {
        Self {
            source,
            page_size: DEFAULT_PAGE_SIZE,
            retry_policy: None,
            chain: InterceptorChainBuilder::new(),
            config: PagerConfig::default(),
        }
    }

    /// Values per page.
    pub fn page_size(mut self, page_size: NonZeroUsize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Append an interceptor to the chain.
    pub fn interceptor<I>(mut self, interceptor: I) -> Self
    where
        I: Interceptor<S::Key, S::Value>,
    {
        self.chain = self.chain.with(interceptor);
        self
    }

    /// Retry policy attached to every request the manager builds.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Window within which identical requests are collapsed.
    pub fn dedup_window(mut self, window: Duration) -> Self {
        self.config = self.config.with_dedup_window(window);
        self
    }

    /// Start the pipeline.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn build(self) -> PaginationManager<S> {
        let source = Arc::new(self.source);
        let (sink, states) =
            Pager::spawn(Arc::clone(&source), self.chain.build(), self.config).into_parts();

        let accumulator = Arc::new(Mutex::new(Accumulator::new()));
        let (tx, output) = watch::channel(Ok(Output::new()));
        tokio::spawn(fold_states(states, Arc::clone(&accumulator), tx));

        PaginationManager {
            source,
            page_size: self.page_size,
            retry_policy: self.retry_policy,
            sink,
            accumulator,
            output,
        }
    }
}

async fn fold_states<K, V>(
    mut states: StateStream<K, V>,
    accumulator: Arc<Mutex<Accumulator<K, V>>>,
    output: watch::Sender<Snapshot<V>>,
) where
    K: Key,
    V: Value,
{
    while let Some(event) = states.next_state().await {
        match event {
            Ok(state) => {
                let done = matches!(state, PagingState::Done(_));
                let snapshot = lock(&accumulator).apply(state).clone();
                if done {
                    debug!(values = snapshot.values.len(), "output updated");
                }
                output.send_modify(|current| *current = Ok(snapshot));
            }
            Err(err) => {
                output.send_modify(|current| *current = Err(Arc::new(err)));
                break;
            }
        }
    }
}

/// A stream of [`Snapshot`]s. See [`PaginationManager::subscribe`].
pub struct OutputStream<V> {
    inner: BoxStream<'static, Snapshot<V>>,
}

impl<V: Value> OutputStream<V> {
    fn new(receiver: watch::Receiver<Snapshot<V>>) -> Self {
        let inner = stream::unfold((Some(receiver), true), |(receiver, first)| async move {
            let Some(mut receiver) = receiver else {
                return None;
            };
            if !first && receiver.changed().await.is_err() {
                return None;
            }
            let snapshot = receiver.borrow_and_update().clone();
            let next = snapshot.is_ok().then_some(receiver);
            Some((snapshot, (next, false)))
        })
        .boxed();
        Self { inner }
    }
}

impl<V> Stream for OutputStream<V> {
    type Item = Snapshot<V>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl<V> fmt::Debug for OutputStream<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputStream").finish_non_exhaustive()
    }
}
