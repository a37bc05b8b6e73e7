//! Helpers wrapped around database calls: query logging, connection scoping,
//! transactions, retry with backoff and a bounded query cache.

mod cache;
mod connection;
mod retry;
mod transaction;

pub use cache::QueryCache;
pub use connection::{logged, with_connection};
pub use retry::{RetryPolicy, Retryable, retry};
pub use transaction::transactional;
