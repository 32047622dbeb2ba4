//! Repository member email entities.

pub mod model;

pub use model::{EmailEntry, VerificationStatus};
