//! Request policies.

pub mod retry;

pub use retry::{RetryConfig, RetryPolicy};
