//! # Typed request context
//!
//! [`UserInfo`] is the side channel requests use to carry parameters that only
//! specific interceptors or sources understand: a storage handle, a search
//! query, a hard-refresh marker. The pipeline itself never looks inside.
//!
//! Entries are keyed by their Rust type, so every participant declares the
//! exact types it reads:
//!
//! ```rust,ignore
//! #[derive(Clone)]
//! struct Query(String);
//!
//! let info = UserInfo::new().with(Query("rust".into()));
//! assert_eq!(info.get::<Query>().map(|q| q.0.as_str()), Some("rust"));
//! ```

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    sync::Arc,
};

type Entries = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// A cheaply clonable, type-keyed map of request parameters.
///
/// Cloning shares the underlying map; writing after a clone copies it first,
/// so a request's context can never be changed through another request.
#[derive(Clone, Default)]
pub struct UserInfo {
    entries: Option<Arc<Entries>>,
}

impl UserInfo {
    /// An empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy of this context with `value` stored under its type.
    ///
    /// A previous value of the same type is replaced.
    #[must_use]
    pub fn with<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.insert(value);
        self
    }

    /// Store `value` under its type, replacing any previous value.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        let entries = self.entries.get_or_insert_with(Default::default);
        Arc::make_mut(entries).insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Look up the value stored for type `T`.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.entries
            .as_ref()?
            .get(&TypeId::of::<T>())
            .and_then(|value| (**value).downcast_ref::<T>())
    }

    /// Whether a value of type `T` is present.
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.get::<T>().is_some()
    }

    /// Remove the value stored for type `T`.
    pub fn remove<T: Send + Sync + 'static>(&mut self) -> bool {
        match self.entries.as_mut() {
            Some(entries) => Arc::make_mut(entries).remove(&TypeId::of::<T>()).is_some(),
            None => false,
        }
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |entries| entries.len())
    }

    /// Whether the context holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for UserInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserInfo")
            .field("entries", &self.len())
            .finish()
    }
}
