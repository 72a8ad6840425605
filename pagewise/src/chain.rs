//! Ordered interceptor chains.

use pagewise_core::{
    DynInterceptor, Intercept, Interceptor, Key, Origin, Page, PagingError, Request, Value,
};
use std::{fmt, sync::Arc};
use tracing::trace;

/// An ordered list of interceptors every request passes through.
pub struct InterceptorChain<K: Key, V: Value> {
    interceptors: Vec<Arc<dyn DynInterceptor<K, V>>>,
}

impl<K: Key, V: Value> InterceptorChain<K, V> {
    /// An empty chain. Requests go straight to the source.
    pub fn new() -> Self {
        Self {
            interceptors: Vec::new(),
        }
    }

    /// Start building a chain.
    pub fn builder() -> InterceptorChainBuilder<K, V> {
        InterceptorChainBuilder::new()
    }

    /// Number of interceptors.
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Whether the chain has no interceptors.
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Run `request` through the chain.
    ///
    /// Traversal stops at the first interceptor that completes the request;
    /// its page is marked [`Origin::Interceptor`]. The returned
    /// [`Intercepted`] remembers which interceptors, up to that
    /// point, asked to observe the resulting page.
    ///
    /// # Errors
    ///
    /// [`PagingError::Interceptor`] with the failing interceptor's position.
    pub async fn run(&self, request: Request<K>) -> Result<Intercepted<K, V>, PagingError> {
        let mut current = request;
        let mut observers = Vec::new();

        for (index, interceptor) in self.interceptors.iter().enumerate() {
            let decision = interceptor
                .intercept_dyn(&current)
                .await
                .map_err(|source| PagingError::interceptor(index, source))?;

            match decision {
                Intercept::Proceed {
                    request,
                    handle_afterwards,
                } => {
                    current = request;
                    if handle_afterwards {
                        observers.push(Arc::clone(interceptor));
                    }
                }
                Intercept::Complete(page) => {
                    trace!(index, key = ?page.key(), "chain short-circuited");
                    let page = page.with_origin(Origin::Interceptor);
                    return Ok(Intercepted {
                        resolution: Resolution::Complete(page),
                        observers,
                    });
                }
            }
        }

        Ok(Intercepted {
            resolution: Resolution::Fetch(current),
            observers,
        })
    }
}

impl<K: Key, V: Value> Default for InterceptorChain<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Key, V: Value> fmt::Debug for InterceptorChain<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("len", &self.interceptors.len())
            .finish()
    }
}

/// How a request left the chain.
#[derive(Debug)]
pub enum Resolution<K, V> {
    /// Every interceptor proceeded; fetch this (possibly rewritten) request.
    Fetch(Request<K>),
    /// An interceptor answered the request itself.
    Complete(Page<K, V>),
}

/// The outcome of [`InterceptorChain::run`].
pub struct Intercepted<K: Key, V: Value> {
    /// Where the request ended up.
    pub resolution: Resolution<K, V>,
    observers: Vec<Arc<dyn DynInterceptor<K, V>>>,
}

impl<K: Key, V: Value> Intercepted<K, V> {
    /// Number of interceptors waiting for the page.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Split into the resolution and the observers to notify.
    pub fn into_parts(self) -> (Resolution<K, V>, Observers<K, V>) {
        (self.resolution, Observers(self.observers))
    }
}

impl<K: Key, V: Value + fmt::Debug> fmt::Debug for Intercepted<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Intercepted")
            .field("resolution", &self.resolution)
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Interceptors that asked to see the page for a request.
pub struct Observers<K: Key, V: Value>(Vec<Arc<dyn DynInterceptor<K, V>>>);

impl<K: Key, V: Value> Observers<K, V> {
    /// Run every observer's `handle` hook, in chain order.
    pub async fn notify(&self, page: &Page<K, V>) {
        for observer in &self.0 {
            observer.handle_dyn(page).await;
        }
    }

    /// Number of observers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nobody is observing.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Builder for constructing an [`InterceptorChain`].
pub struct InterceptorChainBuilder<K: Key, V: Value> {
    interceptors: Vec<Arc<dyn DynInterceptor<K, V>>>,
}

impl<K: Key, V: Value> Default for InterceptorChainBuilder<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Key, V: Value> InterceptorChainBuilder<K, V> {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self {
            interceptors: Vec::new(),
        }
    }

    /// Append an interceptor to the end of the chain.
    pub fn with<I: Interceptor<K, V>>(mut self, interceptor: I) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Append an already shared interceptor.
    pub fn with_shared(mut self, interceptor: Arc<dyn DynInterceptor<K, V>>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Build the chain.
    pub fn build(self) -> InterceptorChain<K, V> {
        InterceptorChain {
            interceptors: self.interceptors,
        }
    }
}
