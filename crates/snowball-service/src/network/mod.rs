//! Repository network analysis.

pub mod analyzer;

pub use analyzer::NetworkAnalyzer;
