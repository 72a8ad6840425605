//! Storage-backed interceptor.
//!
//! [`StoreInterceptor`] serves pages from a local [`PageStore`] and writes
//! pages fetched from the source back into it. Pages answered by a later
//! interceptor, such as a cache, are not written again. It only takes part in requests whose
//! [`UserInfo`](pagewise_core::UserInfo) carries the store's `Context`; all
//! other requests pass through untouched.
//!
//! ```rust,ignore
//! let info = UserInfo::new().with(db_handle).with(HardRefresh);
//! manager.refresh(info)?; // purges the store, then refetches
//! ```

use pagewise_core::{
    BoxError, Direction, Intercept, Interceptor, Key, Page, PageStore, Request, Value,
};
use tracing::{debug, trace, warn};

/// Marker: purge the store before serving a refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HardRefresh;

/// An interceptor that reads and writes pages through a [`PageStore`].
pub struct StoreInterceptor<D> {
    store: D,
}

impl<D> StoreInterceptor<D> {
    /// Wrap `store`.
    pub fn new(store: D) -> Self {
        Self { store }
    }

    /// The wrapped store.
    pub fn store(&self) -> &D {
        &self.store
    }
}

impl<K, V, D> Interceptor<K, V> for StoreInterceptor<D>
where
    K: Key,
    V: Value,
    D: PageStore<K, V>,
{
    async fn intercept(&self, request: &Request<K>) -> Result<Intercept<K, V>, BoxError> {
        let user_info = request.params().user_info();
        let Some(cx) = user_info.get::<D::Context>() else {
            return Ok(Intercept::proceed(request.clone()));
        };

        if request.direction() == Direction::Refresh && user_info.contains::<HardRefresh>() {
            debug!("hard refresh, purging store");
            self.store.delete_all(cx)?;
        }

        let mut values = self.store.get(request, cx)?;
        if values.len() < request.page_size() {
            debug!(key = ?request.key(), stored = values.len(), "store miss");
            return Ok(Intercept::observe(request.clone()));
        }

        values.truncate(request.page_size());
        debug!(key = ?request.key(), "serving page from store");
        Ok(Intercept::complete(Page::new(request.clone(), values)))
    }

    async fn handle(&self, page: &Page<K, V>) {
        let Some(cx) = page.request.params().user_info().get::<D::Context>() else {
            return;
        };
        if !page.is_fetched() {
            trace!(key = ?page.key(), "page did not come from the source, not persisting");
            return;
        }
        if let Err(err) = self.store.insert(&page.values, cx) {
            warn!(key = ?page.key(), error = %err, "failed to persist fetched page");
        }
    }
}
