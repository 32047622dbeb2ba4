//! Multi-factor email quality scoring.

pub mod scorer;

pub use scorer::{QualityScore, QualityScorer, compute_score};
