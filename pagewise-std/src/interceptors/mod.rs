//! Standard interceptors.

mod cache;
mod logging;
mod store;

pub use cache::{CacheInterceptor, DEFAULT_EXPIRATION};
pub use logging::LoggingInterceptor;
pub use store::{HardRefresh, StoreInterceptor};
