//! # modsync-entity
//!
//! Domain entity models for ModSync. Job records, activity log entries,
//! and the tracked instance/mod metadata that work functions read and
//! update. Database-backed entities additionally derive `sqlx::FromRow`.

pub mod activity;
pub mod catalog;
pub mod job;
