//! # snowball-core
//!
//! Core crate for Snowball. Contains configuration schemas, typed
//! identifiers, collaborator traits (reputation, verification,
//! notification, pub/sub, cache), and the unified error system.
//!
//! This crate has **no** internal dependencies on other Snowball crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
