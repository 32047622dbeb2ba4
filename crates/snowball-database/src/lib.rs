//! # snowball-database
//!
//! Data store traits for jobs, repositories, member emails and users,
//! with an in-memory backend for single-node runs and tests and a
//! PostgreSQL backend built on `sqlx`.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::{connect, mask_password};
pub use store::{
    DataStore, EmailStore, JobStore, QueueStatusCount, RepositoryStore, StallReport, UserStore,
};
