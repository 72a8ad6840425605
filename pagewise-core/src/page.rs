//! Page results.

use crate::request::Request;

/// Where a page's values came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Origin {
    /// Fetched from the source.
    #[default]
    Source,
    /// Served by an interceptor without reaching the source.
    Interceptor,
}

/// The values returned for one request, together with that request.
#[derive(Debug, Clone)]
pub struct Page<K, V> {
    /// The request that produced this page.
    pub request: Request<K>,
    /// The values, in source order.
    pub values: Vec<V>,
    /// Where the values came from. Set by the pipeline once the page leaves
    /// the interceptor chain or the source.
    pub origin: Origin,
}

impl<K, V> Page<K, V> {
    /// Create a page. Its origin is [`Origin::Source`].
    pub fn new(request: Request<K>, values: Vec<V>) -> Self {
        Self {
            request,
            values,
            origin: Origin::Source,
        }
    }

    /// The same page with a different origin.
    #[must_use]
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Whether the values were fetched from the source.
    pub fn is_fetched(&self) -> bool {
        self.origin == Origin::Source
    }

    /// The key of the request that produced this page.
    pub fn key(&self) -> &K {
        self.request.key()
    }

    /// A page is complete when it holds exactly as many values as requested.
    ///
    /// An incomplete page means the source ran out of data in that direction.
    pub fn is_complete(&self) -> bool {
        self.values.len() == self.request.page_size()
    }

    /// Number of values in the page.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the page holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{key::KeyChain, request::RequestParams};
    use std::num::NonZeroUsize;

    fn request(size: usize) -> Request<u32> {
        Request::Append(RequestParams::new(
            KeyChain::isolated(0),
            NonZeroUsize::new(size).unwrap(),
        ))
    }

    #[test]
    fn test_complete_iff_len_equals_page_size() {
        assert!(Page::new(request(3), vec!['a', 'b', 'c']).is_complete());
        assert!(!Page::new(request(3), vec!['a', 'b']).is_complete());
        assert!(!Page::<u32, char>::new(request(3), vec![]).is_complete());
    }

    #[test]
    fn test_key_comes_from_request() {
        let page = Page::new(request(1), vec![1]);
        assert_eq!(*page.key(), 0);
        assert_eq!(page.len(), 1);
    }

    #[test]
    fn test_origin_defaults_to_source() {
        let page = Page::new(request(2), vec![1, 2]);
        assert!(page.is_fetched());

        let served = page.with_origin(Origin::Interceptor);
        assert_eq!(served.origin, Origin::Interceptor);
        assert!(!served.is_fetched());
        assert!(served.is_complete());
    }
}
