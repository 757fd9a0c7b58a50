//! Core type definitions used across the ModSync workspace.

pub mod id;

pub use id::*;
