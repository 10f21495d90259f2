//! Remote call gateway for Arogya.
//!
//! Provides uniform, resilient request/response execution against the fixed
//! set of named remote endpoints: retry with exponential backoff, per-endpoint
//! timeouts, capped connection pooling, and request tracing headers. Carries
//! no business logic; every failure mode collapses to "no result" for callers.

pub mod endpoint;
pub mod gateway;

pub use endpoint::{Endpoint, EndpointId, EndpointSet};
pub use gateway::{RemoteCall, RemoteGateway, RetryPolicy};
