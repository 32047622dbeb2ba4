//! Periodic repository digests.

pub mod service;

pub use service::{DIGEST_TEMPLATE, DigestService, DigestSummary};
