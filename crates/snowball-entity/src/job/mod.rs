//! Background job domain entities.

pub mod backoff;
pub mod model;
pub mod payload;
pub mod status;

pub use backoff::{BackoffKind, BackoffPolicy};
pub use model::{Job, NewJob};
pub use payload::{
    AnalyzeNetworkPayload, DigestPayload, JobPayload, ProcessCsvPayload, VerifyEmailPayload,
};
pub use status::JobStatus;
