//! # pagewise-std
//!
//! Standard implementations for the pagewise pagination pipeline.
//!
//! This crate provides:
//! - **Caching**: [`CacheInterceptor`], a TTL cache that short-circuits repeated requests
//! - **Logging**: [`LoggingInterceptor`], `tracing` events for every request and page
//! - **Storage**: [`StoreInterceptor`], serves and persists pages through a [`PageStore`]
//! - **Testing**: in-memory sources, stores and recording interceptors
//!
//! [`CacheInterceptor`]: interceptors::CacheInterceptor
//! [`LoggingInterceptor`]: interceptors::LoggingInterceptor
//! [`StoreInterceptor`]: interceptors::StoreInterceptor
//! [`PageStore`]: pagewise_core::PageStore

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use pagewise_core;

// Modules
pub mod interceptors;
pub mod testing;
