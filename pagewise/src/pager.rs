//! The request-processing pipeline.
//!
//! A [`Pager`] owns a background task that takes requests one at a time:
//!
//! 1. the [`RequestFunnel`] drops rapid duplicates,
//! 2. a busy state for the request's direction is emitted,
//! 3. the [`InterceptorChain`] runs, possibly answering the request itself,
//! 4. otherwise the [`Source`] is fetched under the request's retry policy,
//! 5. observing interceptors see the page, and a `Done` state is emitted.
//!
//! The pipeline is fail-closed. The first interceptor or fetch failure is
//! emitted as the last event, and every later request is refused with
//! [`PagingError::Closed`].

use crate::{
    chain::{InterceptorChain, Resolution},
    funnel::{DEFAULT_DEDUP_WINDOW, RequestFunnel},
};
use futures::Stream;
use pagewise_core::{Direction, Key, Origin, Page, PagingError, Request, Source, Value, retry};
use std::{
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, debug_span, error};

/// What the pipeline is doing.
#[derive(Debug, Clone)]
pub enum PagingState<K, V> {
    /// A refresh request was admitted.
    Refreshing,
    /// A prepend request was admitted.
    Prepending,
    /// An append request was admitted.
    Appending,
    /// A request finished with this page.
    Done(Page<K, V>),
}

impl<K, V> PagingState<K, V> {
    /// The busy state announcing a request in `direction`.
    pub fn busy(direction: Direction) -> Self {
        match direction {
            Direction::Refresh => Self::Refreshing,
            Direction::Prepend => Self::Prepending,
            Direction::Append => Self::Appending,
        }
    }

    /// Whether this state carries a finished page.
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }
}

/// One item of a pager's output: a state, or the terminal failure.
pub type PagerEvent<K, V> = Result<PagingState<K, V>, PagingError>;

/// Pipeline settings.
#[derive(Debug, Clone, Copy)]
pub struct PagerConfig {
    /// Matching requests closer together than this are dropped.
    pub dedup_window: Duration,
}

impl PagerConfig {
    /// Replace the deduplication window.
    #[must_use]
    pub fn with_dedup_window(mut self, window: Duration) -> Self {
        self.dedup_window = window;
        self
    }
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            dedup_window: DEFAULT_DEDUP_WINDOW,
        }
    }
}

/// The sending half of a pager's admission queue. Cheap to clone.
#[derive(Debug)]
pub struct RequestSink<K> {
    tx: mpsc::UnboundedSender<Request<K>>,
}

impl<K> Clone for RequestSink<K> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<K> RequestSink<K> {
    /// Queue `request`. Requests are processed in the order they are sent.
    ///
    /// # Errors
    ///
    /// [`PagingError::Closed`] once the pipeline has terminated.
    pub fn send(&self, request: Request<K>) -> Result<(), PagingError> {
        self.tx.send(request).map_err(|_| PagingError::Closed)
    }

    /// Whether the pipeline stopped accepting requests.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The receiving half of a pager's output.
///
/// Yields every state in order. After a failure it yields the error once and
/// then ends.
#[derive(Debug)]
pub struct StateStream<K, V> {
    rx: mpsc::UnboundedReceiver<PagerEvent<K, V>>,
}

impl<K, V> StateStream<K, V> {
    /// Wait for the next event. `None` once the pipeline has stopped.
    pub async fn next_state(&mut self) -> Option<PagerEvent<K, V>> {
        self.rx.recv().await
    }
}

impl<K, V> Stream for StateStream<K, V> {
    type Item = PagerEvent<K, V>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// A running pagination pipeline.
#[derive(Debug)]
pub struct Pager<K, V> {
    sink: RequestSink<K>,
    states: StateStream<K, V>,
}

impl<K: Key, V: Value> Pager<K, V> {
    /// Start a pipeline fetching from `source` through `chain`.
    ///
    /// The pipeline task runs until it fails, or until both halves of the
    /// pager are dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn<S>(source: S, chain: InterceptorChain<K, V>, config: PagerConfig) -> Self
    where
        S: Source<Key = K, Value = V>,
    {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = mpsc::unbounded_channel();

        let worker = Worker {
            source,
            chain,
            funnel: RequestFunnel::new(config.dedup_window),
        };
        tokio::spawn(worker.run(request_rx, state_tx));

        Self {
            sink: RequestSink { tx: request_tx },
            states: StateStream { rx: state_rx },
        }
    }

    /// Queue `request`.
    ///
    /// # Errors
    ///
    /// [`PagingError::Closed`] once the pipeline has terminated.
    pub fn send(&self, request: Request<K>) -> Result<(), PagingError> {
        self.sink.send(request)
    }

    /// Another handle for queueing requests.
    pub fn sink(&self) -> RequestSink<K> {
        self.sink.clone()
    }

    /// Wait for the next event.
    pub async fn next_state(&mut self) -> Option<PagerEvent<K, V>> {
        self.states.next_state().await
    }

    /// Split into the request sink and the state stream.
    pub fn into_parts(self) -> (RequestSink<K>, StateStream<K, V>) {
        (self.sink, self.states)
    }
}

struct Worker<S: Source> {
    source: S,
    chain: InterceptorChain<S::Key, S::Value>,
    funnel: RequestFunnel<S::Key>,
}

impl<S: Source> Worker<S> {
    async fn run(
        mut self,
        mut requests: mpsc::UnboundedReceiver<Request<S::Key>>,
        states: mpsc::UnboundedSender<PagerEvent<S::Key, S::Value>>,
    ) {
        debug!("pager started");

        while let Some(request) = requests.recv().await {
            let Some(request) = self.funnel.admit(request) else {
                debug!("dropping duplicate request");
                continue;
            };

            let span = debug_span!(
                "page_request",
                direction = %request.direction(),
                key = ?request.key(),
            );

            if states
                .send(Ok(PagingState::busy(request.direction())))
                .is_err()
            {
                break;
            }

            match self.process(request).instrument(span).await {
                Ok(page) => {
                    if states.send(Ok(PagingState::Done(page))).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    error!(error = %err, "pagination pipeline failed, closing");
                    requests.close();
                    let _ = states.send(Err(err));
                    break;
                }
            }
        }

        debug!("pager stopped");
    }

    async fn process(
        &self,
        request: Request<S::Key>,
    ) -> Result<Page<S::Key, S::Value>, PagingError> {
        let (resolution, observers) = self.chain.run(request).await?.into_parts();

        let page = match resolution {
            Resolution::Complete(page) => page,
            Resolution::Fetch(request) => {
                let policy = request.params().retry_policy();
                retry(policy, || self.source.fetch(&request))
                    .await
                    .map_err(PagingError::fetch)?
                    .with_origin(Origin::Source)
            }
        };

        debug!(values = page.len(), complete = page.is_complete(), "page ready");
        observers.notify(&page).await;
        Ok(page)
    }
}
