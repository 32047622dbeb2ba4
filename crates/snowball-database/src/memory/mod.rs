//! In-memory store backends using Tokio mutexes.
//!
//! Suitable for single-node deployments and tests. State lives only as long
//! as the process.

pub mod email;
pub mod job;
pub mod repository;
pub mod user;

pub use email::MemoryEmailStore;
pub use job::MemoryJobStore;
pub use repository::MemoryRepositoryStore;
pub use user::MemoryUserStore;
