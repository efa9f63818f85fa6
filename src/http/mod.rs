//! HTTP transport module
//!
//! Provides the [`Transport`] contract and the reqwest-backed base transport.
//!
//! # Features
//!
//! - **Transport trait**: one request in, one fully-read response out
//! - **Automatic Retries**: configurable retry logic with backoff, in the
//!   base transport only
//! - **Backoff Strategies**: constant, linear, and exponential backoff

mod client;
mod transport;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig};
pub use transport::{HttpRequest, HttpResponse, Transport};

#[cfg(test)]
mod tests;
