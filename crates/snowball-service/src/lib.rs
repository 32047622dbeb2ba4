//! # snowball-service
//!
//! Domain services run by Snowball's background jobs:
//!
//! - **csv** / **ingest**: parse, validate, score and persist contact uploads
//! - **quality**: weighted quality scoring backed by domain reputation
//! - **snowball**: depth-bounded fan-out planning
//! - **growth**: repository growth statistics and owner notification
//! - **network**: cached reach and engagement snapshots
//! - **digest**: periodic owner digests
//! - **clients**: HTTP clients for the external collaborators
//! - **events**: in-memory pub/sub towards real-time clients

pub mod clients;
pub mod csv;
pub mod digest;
pub mod events;
pub mod growth;
pub mod ingest;
pub mod network;
pub mod quality;
pub mod snowball;

pub use clients::Collaborators;
pub use digest::DigestService;
pub use events::MemoryPubSub;
pub use growth::GrowthTracker;
pub use ingest::{CsvProcessingResult, IngestionPipeline};
pub use network::NetworkAnalyzer;
pub use quality::QualityScorer;
pub use snowball::SnowballPlanner;
