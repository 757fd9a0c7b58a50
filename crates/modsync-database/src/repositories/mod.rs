//! PostgreSQL implementations of the store traits.

pub mod activity;
pub mod job;
pub mod mods;

pub use activity::PgActivityLog;
pub use job::PgJobStore;
pub use mods::PgModRegistry;

/// Convert a caller's row limit into a `LIMIT` bind, clamping instead of wrapping.
pub(crate) fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}
