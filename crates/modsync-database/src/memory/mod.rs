//! In-process store backends guarded by Tokio mutexes.
//!
//! Every operation takes the state lock for its whole duration, which gives
//! the same atomicity the PostgreSQL backend gets from conditional writes.
//! State is lost when the process exits.

pub mod activity;
pub mod job;
pub mod mods;

pub use activity::MemoryActivityLog;
pub use job::MemoryJobStore;
pub use mods::MemoryModRegistry;
