//! # snowball-cache
//!
//! Cache providers for Snowball:
//!
//! - **memory**: in-process key/value cache using [moka](https://crates.io/crates/moka)
//!   with per-entry TTLs, fronted by [`CacheManager`]
//! - **reputation**: the TTL cache that fronts the external domain
//!   reputation lookup

pub mod keys;
pub mod memory;
pub mod provider;
pub mod reputation;

pub use provider::CacheManager;
pub use reputation::ReputationCache;
