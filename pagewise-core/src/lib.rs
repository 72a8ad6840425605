//! # pagewise-core
//!
//! Core types and traits for the pagewise pagination pipeline.
//!
//! This crate has minimal dependencies and is meant to be imported by
//! sources, storage adapters and interceptors that don't need the pipeline
//! runtime itself.
//!
//! # Request Model
//!
//! A [`Request`] asks for one page in a [`Direction`]: refresh, prepend or
//! append. Its [`RequestParams`] name the page through a [`KeyChain`] (the
//! page's key plus its neighbors), the page size, an optional
//! [`RetryPolicy`] and a typed [`UserInfo`] context. Requests are never
//! mutated; anything that wants a different request builds a new one.
//!
//! A [`Page`] is the values returned for a request. It is *complete* when it
//! holds exactly `page_size` values. Its [`Origin`] tells whether the values
//! came from the source or from an interceptor.
//!
//! # Extension Points
//!
//! - [`Source`] - where pages come from
//! - [`Interceptor`] - transforms, short-circuits or observes requests
//! - [`PageStore`] - optional local persistence used by storage interceptors
//!
//! # Error Types
//!
//! - [`PagingError`] - Terminal pipeline failures
//! - [`FetchError`] - Transient/permanent classification for sources
//! - [`StoreError`] - Local storage failures

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod error;
mod interceptor;
mod key;
mod page;
mod request;
mod retry;
mod source;
mod user_info;

// Re-exports
pub use error::{BoxError, FetchError, PagingError, StoreError};
pub use interceptor::{BoxFuture, DynInterceptor, Intercept, Interceptor};
pub use key::{Key, KeyChain, Value};
pub use page::{Origin, Page};
pub use request::{Direction, Request, RequestParams};
pub use retry::{DynError, RetryPolicy, retry, retry_if};
pub use source::{PageStore, Source};
pub use user_info::UserInfo;
