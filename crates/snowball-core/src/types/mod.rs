//! Shared value types: typed identifiers and queue names.

pub mod id;
pub mod queue;

pub use id::{ContactListId, JobId, RepositoryId, UserId};
