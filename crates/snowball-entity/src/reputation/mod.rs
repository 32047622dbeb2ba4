//! Domain reputation cache rows.

pub mod model;

pub use model::DomainReputationEntry;
