//! Client layer for the external scheduling service.
//!
//! This crate owns everything that touches the wire: the REST client and
//! its session-token tracking, the JSON wire types, and the retry
//! wrapper that decorates every call with a context-appropriate backoff
//! schedule.

pub mod client;
pub mod dto;
pub mod error;
pub mod retry;

pub use client::{SchedulingApi, SchedulingClient};
pub use error::SchedulingError;
pub use retry::{Backoff, RetryPolicy, retry_with};
