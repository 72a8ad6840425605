//! Collaborator contracts: the data source and optional local storage.

use crate::{
    error::StoreError,
    key::{Key, KeyChain, Value},
    page::Page,
    request::Request,
};
use std::{future::Future, sync::Arc};

/// The "server" a pipeline fetches pages from.
///
/// `fetch` must be idempotent: the pipeline re-invokes it from scratch when a
/// request's retry policy allows.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a pagination `Source`",
    label = "missing `Source` implementation",
    note = "Sources provide a refresh key, key chains and an async `fetch`."
)]
pub trait Source: Send + Sync + 'static {
    /// Identifies a page's position.
    type Key: Key;
    /// The items pages carry.
    type Value: Value;
    /// Fetch failure.
    type Error: std::error::Error + Send + Sync + 'static;

    /// The key a refresh starts from.
    fn refresh_key(&self) -> Self::Key;

    /// The neighbors of `key`.
    fn key_chain(&self, key: &Self::Key) -> KeyChain<Self::Key>;

    /// Retrieve the page for `request`.
    fn fetch(
        &self,
        request: &Request<Self::Key>,
    ) -> impl Future<Output = Result<Page<Self::Key, Self::Value>, Self::Error>> + Send;
}

impl<S: Source> Source for Arc<S> {
    type Key = S::Key;
    type Value = S::Value;
    type Error = S::Error;

    fn refresh_key(&self) -> Self::Key {
        (**self).refresh_key()
    }

    fn key_chain(&self, key: &Self::Key) -> KeyChain<Self::Key> {
        (**self).key_chain(key)
    }

    async fn fetch(
        &self,
        request: &Request<Self::Key>,
    ) -> Result<Page<Self::Key, Self::Value>, Self::Error> {
        (**self).fetch(request).await
    }
}

/// Local persistence for pages, used by storage-backed interceptors.
///
/// `Context` is whatever handle the backend needs per request (a connection,
/// a transaction scope). It travels in the request's
/// [`UserInfo`](crate::UserInfo).
pub trait PageStore<K: Key, V: Value>: Send + Sync + 'static {
    /// Per-request storage handle.
    type Context: Send + Sync + 'static;

    /// Values already stored for `request`.
    fn get(&self, request: &Request<K>, cx: &Self::Context) -> Result<Vec<V>, StoreError>;

    /// Persist freshly fetched values, returning their stored form.
    fn insert(&self, remote_values: &[V], cx: &Self::Context) -> Result<Vec<V>, StoreError>;

    /// Remove everything.
    fn delete_all(&self, cx: &Self::Context) -> Result<(), StoreError>;
}
