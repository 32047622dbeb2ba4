//! Repository growth statistics and owner notification.

pub mod tracker;

pub use tracker::{GrowthTracker, GrowthUpdate, growth_rate};
