//! HTTP client building for outbound provider and record store calls.

mod client;

pub use client::{ClientBuilder, HttpClientConfig};
