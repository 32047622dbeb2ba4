//! # snowball-entity
//!
//! Domain entity models for Snowball. Every struct in this crate
//! represents a database table row or a domain value object. All entities
//! derive `Debug`, `Clone`, `Serialize`, `Deserialize`, and database
//! entities additionally derive `sqlx::FromRow`.

pub mod email;
pub mod job;
pub mod network;
pub mod repository;
pub mod reputation;
pub mod user;
