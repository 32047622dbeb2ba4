//! Network analysis snapshots.

pub mod model;

pub use model::{ContributorStat, NetworkAnalysisSnapshot};
