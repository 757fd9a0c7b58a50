//! Built-in work functions.

pub mod sync;
pub mod update;

pub use sync::CatalogSyncHandler;
pub use update::ModUpdateHandler;
