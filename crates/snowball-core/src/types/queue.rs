//! Names of the built-in job queues.

/// Depth-0 CSV ingestion and email verification.
pub const EMAIL_PROCESSING: &str = "email-processing";

/// Digest fan-out and delivery.
pub const DIGEST_GENERATION: &str = "digest-generation";

/// Recursive snowball waves, eligible-list sweeps, and network analysis.
pub const SNOWBALL_DISTRIBUTION: &str = "snowball-distribution";

/// Maintenance jobs.
pub const DATA_CLEANUP: &str = "data-cleanup";

/// All built-in queues.
pub const ALL: [&str; 4] = [
    EMAIL_PROCESSING,
    DIGEST_GENERATION,
    SNOWBALL_DISTRIBUTION,
    DATA_CLEANUP,
];
