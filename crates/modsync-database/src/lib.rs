//! # modsync-database
//!
//! Persistence for the job engine. The [`store`] module defines the store
//! traits the worker depends on; [`repositories`] implements them on
//! PostgreSQL and [`memory`] implements them in process for tests and
//! local dry runs.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use store::{ActivityLog, JobStore, ModRegistry};
