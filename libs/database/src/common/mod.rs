//! Utilities shared by the connectors

pub mod retry;

pub use retry::{RetryConfig, retry_with_backoff};
