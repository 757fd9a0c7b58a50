//! Locally tracked instances and mods.

pub mod model;

pub use model::{Instance, TrackedMod};
