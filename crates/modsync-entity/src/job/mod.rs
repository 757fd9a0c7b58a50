//! Background job domain entities.

pub mod model;
pub mod payload;
pub mod status;

pub use model::{EnqueueOutcome, Job, JobStatusView};
pub use payload::{JobKind, JobPayload, SyncPayload, UpdatePayload};
pub use status::{JobStatus, TerminalStatus};
