//! Page keys and their neighbors.

use std::fmt::Debug;

/// A marker trait for values that identify a page's position.
///
/// The pipeline only ever compares keys for equality. Interceptors that
/// index pages by key (such as a cache) add their own `Eq + Hash` bounds.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be used as a page key",
    label = "must be `Clone + PartialEq + Debug + Send + Sync + 'static`",
    note = "Offsets, page numbers and cursor strings all qualify."
)]
pub trait Key: Clone + PartialEq + Debug + Send + Sync + 'static {}

impl<T> Key for T where T: Clone + PartialEq + Debug + Send + Sync + 'static {}

/// A marker trait for the items a page carries.
pub trait Value: Clone + Send + Sync + 'static {}

impl<T> Value for T where T: Clone + Send + Sync + 'static {}

/// A key together with its backward and forward neighbors.
///
/// A missing neighbor means the source has no more data in that direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyChain<K> {
    /// The key of the page itself.
    pub key: K,
    /// The key of the page before this one.
    pub prev_key: Option<K>,
    /// The key of the page after this one.
    pub next_key: Option<K>,
}

impl<K> KeyChain<K> {
    /// Create a key chain.
    pub fn new(key: K, prev_key: Option<K>, next_key: Option<K>) -> Self {
        Self {
            key,
            prev_key,
            next_key,
        }
    }

    /// A key chain with no neighbors in either direction.
    pub fn isolated(key: K) -> Self {
        Self::new(key, None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_chain_equality_is_structural() {
        let a = KeyChain::new(10u32, Some(0), Some(20));
        let b = KeyChain::new(10u32, Some(0), Some(20));
        let c = KeyChain::new(10u32, None, Some(20));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_isolated_has_no_neighbors() {
        let chain = KeyChain::isolated("cursor");
        assert!(chain.prev_key.is_none());
        assert!(chain.next_key.is_none());
    }
}
