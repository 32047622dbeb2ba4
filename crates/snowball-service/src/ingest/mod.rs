//! CSV ingestion: validate, deduplicate, score and persist one wave.

pub mod pipeline;
pub mod result;

pub use pipeline::{IngestOutcome, IngestionPipeline};
pub use result::CsvProcessingResult;
