//! # pagewise - Bidirectional Pagination Pipeline
//!
//! `pagewise` loads pages from a [`Source`] in three directions (refresh,
//! prepend, append) and folds them into one ordered list.
//!
//! Every request travels through the same pipeline:
//!
//! ```text
//! trigger -> funnel (dedup) -> interceptor chain -> source (with retry) -> handles -> output
//! ```
//!
//! Interceptors can rewrite requests, answer them from a cache or a local
//! store, or just observe the pages that come back.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pagewise::prelude::*;
//!
//! let manager = PaginationManager::builder(MySource::new())
//!     .page_size(NonZeroUsize::new(20).unwrap())
//!     .interceptor(LoggingInterceptor::default())
//!     .interceptor(CacheInterceptor::new())
//!     .retry_policy(RetryPolicy::transient(3))
//!     .build();
//!
//! manager.refresh(UserInfo::new())?;
//! manager.append(UserInfo::new())?;
//!
//! let mut outputs = manager.subscribe();
//! while let Some(output) = outputs.next().await {
//!     let output = output?;
//!     println!("{} values, appending: {}", output.values.len(), output.is_appending());
//! }
//! ```
//!
//! ## Lower Level
//!
//! [`Pager`] is the pipeline without aggregation: send it [`Request`]s, read
//! [`PagingState`]s. [`InterceptorChain`] and [`RequestFunnel`] are usable on
//! their own as well.

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod chain;
mod funnel;
pub mod manager;
mod pager;

pub use pagewise_core::{
    // Errors
    BoxError,
    // Interceptors
    BoxFuture,
    // Requests
    Direction,
    DynError,
    DynInterceptor,
    FetchError,
    Intercept,
    Interceptor,
    // Keys
    Key,
    KeyChain,
    Origin,
    Page,
    // Storage
    PageStore,
    PagingError,
    Request,
    RequestParams,
    // Retry
    RetryPolicy,
    // Source
    Source,
    StoreError,
    UserInfo,
    Value,
    retry,
    retry_if,
};

// Pipeline
pub use chain::{InterceptorChain, InterceptorChainBuilder, Intercepted, Observers, Resolution};
pub use funnel::{DEFAULT_DEDUP_WINDOW, RequestFunnel};
pub use pager::{Pager, PagerConfig, PagerEvent, PagingState, RequestSink, StateStream};

// Manager
pub use manager::{
    Busy, Output, OutputStream, PaginationManager, PaginationManagerBuilder, Snapshot, Trigger,
};

/// Standard interceptor implementations.
pub mod interceptors {
    #![allow(clippy::wildcard_imports)]
    pub use pagewise_std::interceptors::*;
}

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use pagewise_std::testing::*;
}

/// Prelude module - common imports for pagewise.
///
/// # Usage
///
/// ```rust,ignore
/// use pagewise::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        BoxError,
        Direction,
        FetchError,
        Intercept,
        Interceptor,
        KeyChain,
        Output,
        Page,
        PaginationManager,
        PagingError,
        Request,
        RetryPolicy,
        Source,
        Trigger,
        UserInfo,
        interceptors::{CacheInterceptor, LoggingInterceptor, StoreInterceptor},
    };
}
