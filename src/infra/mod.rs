//! Infrastructure layer
//!
//! Contains:
//! - The [`ContentStore`] trait and its error types
//! - Pinning service HTTP client (uploads + gateway reads)
//! - In-memory content store (development, tests)
//! - Retry helper

mod error;
mod memory;
mod pinning;
pub mod retry;
mod traits;

pub use error::*;
pub use memory::{content_id_for, InMemoryContentStore};
pub use pinning::{
    PinningClient, PinningConfig, DEFAULT_API_URL, DEFAULT_FETCH_RETRIES, DEFAULT_GATEWAY_URL,
    DEFAULT_TIMEOUT,
};
pub use retry::{Retry, RetryConfig, RetryResult};
pub use traits::*;
