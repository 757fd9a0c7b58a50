//! # modsync-client
//!
//! HTTP access to the remote mod catalog. [`ResilientClient`] performs raw
//! requests with bounded retries, adaptive rate-limit backoff, in-flight
//! request coalescing and a short-lived response cache. [`CatalogClient`]
//! layers the typed catalog endpoints on top of it.

pub mod backoff;
pub mod cache;
pub mod catalog;
pub mod client;
pub mod error;
pub mod request;

mod inflight;

pub use backoff::{RetryPolicy, SharedBackoff};
pub use catalog::{CatalogClient, CatalogProject, CatalogSource, CatalogVersion};
pub use client::ResilientClient;
pub use error::RemoteError;
pub use request::ApiRequest;
