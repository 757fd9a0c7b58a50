//! Append-only activity log entities.

pub mod model;

pub use model::{ActivityEntry, CreateActivityEntry};
