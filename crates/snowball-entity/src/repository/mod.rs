//! Mailing repository entities.

pub mod growth;
pub mod model;

pub use growth::GrowthRecord;
pub use model::{Repository, RepositoryLimits};
