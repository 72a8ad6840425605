//! # Interceptors
//!
//! An interceptor sits between a request and the source. For every request
//! it can:
//!
//! - **transform** it, by proceeding with a new request value,
//! - **short-circuit** it, by completing with a page of its own,
//! - **observe** the outcome, by asking for its [`handle`] hook to run once
//!   the page is known.
//!
//! Interceptors run in chain order. A short-circuit stops the traversal:
//! later interceptors never see the request, while earlier ones that asked to
//! observe still get the page.
//!
//! # Static vs Dynamic Dispatch
//!
//! [`Interceptor`] uses native `async fn` in traits. Chains store
//! interceptors behind the object-safe [`DynInterceptor`], which every
//! `Interceptor` implements automatically.
//!
//! [`handle`]: Interceptor::handle

use crate::{
    error::BoxError,
    key::{Key, Value},
    page::Page,
    request::Request,
};
use std::{future::Future, pin::Pin, sync::Arc};

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What an interceptor decided for a request.
#[derive(Debug, Clone)]
pub enum Intercept<K, V> {
    /// Continue down the chain with `request`.
    Proceed {
        /// The request the next interceptor (or the source) receives.
        request: Request<K>,
        /// Run this interceptor's `handle` hook with the resulting page.
        handle_afterwards: bool,
    },
    /// Stop the chain; this page is the result.
    Complete(Page<K, V>),
}

impl<K, V> Intercept<K, V> {
    /// Continue with `request` without observing the result.
    pub fn proceed(request: Request<K>) -> Self {
        Self::Proceed {
            request,
            handle_afterwards: false,
        }
    }

    /// Continue with `request` and observe the result.
    pub fn observe(request: Request<K>) -> Self {
        Self::Proceed {
            request,
            handle_afterwards: true,
        }
    }

    /// Complete the request with `page`.
    pub fn complete(page: Page<K, V>) -> Self {
        Self::Complete(page)
    }

    /// Whether the chain stops here.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }
}

/// A participant in the interceptor chain.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an `Interceptor<{K}, {V}>`",
    label = "missing `Interceptor` implementation",
    note = "Interceptors must implement `intercept` for requests keyed by `{K}`."
)]
pub trait Interceptor<K: Key, V: Value>: Send + Sync + 'static {
    /// Inspect a request before it reaches the source.
    ///
    /// Errors end the pipeline and are never retried.
    fn intercept(
        &self,
        request: &Request<K>,
    ) -> impl Future<Output = Result<Intercept<K, V>, BoxError>> + Send;

    /// Observe the page produced for a request this interceptor proceeded
    /// with `handle_afterwards` set. Does nothing by default.
    fn handle(&self, page: &Page<K, V>) -> impl Future<Output = ()> + Send {
        let _ = page;
        std::future::ready(())
    }
}

/// Object-safe version of [`Interceptor`].
pub trait DynInterceptor<K: Key, V: Value>: Send + Sync + 'static {
    /// Dynamic dispatch version of [`Interceptor::intercept`].
    fn intercept_dyn<'a>(
        &'a self,
        request: &'a Request<K>,
    ) -> BoxFuture<'a, Result<Intercept<K, V>, BoxError>>;

    /// Dynamic dispatch version of [`Interceptor::handle`].
    fn handle_dyn<'a>(&'a self, page: &'a Page<K, V>) -> BoxFuture<'a, ()>;
}

// Blanket implementation: Any type implementing Interceptor implements DynInterceptor automatically.
impl<K: Key, V: Value, T: Interceptor<K, V>> DynInterceptor<K, V> for T {
    fn intercept_dyn<'a>(
        &'a self,
        request: &'a Request<K>,
    ) -> BoxFuture<'a, Result<Intercept<K, V>, BoxError>> {
        Box::pin(self.intercept(request))
    }

    fn handle_dyn<'a>(&'a self, page: &'a Page<K, V>) -> BoxFuture<'a, ()> {
        Box::pin(self.handle(page))
    }
}

// Allow Box<dyn DynInterceptor> to be used where Interceptor is expected.
impl<K: Key, V: Value> Interceptor<K, V> for Box<dyn DynInterceptor<K, V>> {
    async fn intercept(&self, request: &Request<K>) -> Result<Intercept<K, V>, BoxError> {
        (**self).intercept_dyn(request).await
    }

    async fn handle(&self, page: &Page<K, V>) {
        (**self).handle_dyn(page).await;
    }
}

// Shared interceptors, e.g. a cache the caller also inspects.
impl<K: Key, V: Value, T: Interceptor<K, V>> Interceptor<K, V> for Arc<T> {
    async fn intercept(&self, request: &Request<K>) -> Result<Intercept<K, V>, BoxError> {
        (**self).intercept(request).await
    }

    async fn handle(&self, page: &Page<K, V>) {
        (**self).handle(page).await;
    }
}
