//! Per-upload processing counters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::csv::SkipReason;

/// Counters reported for one processed CSV.
///
/// `processed = added + skipped + rejected`; quality rejections are counted
/// in `rejected`, every other reason in `skipped`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvProcessingResult {
    /// Data rows read.
    pub processed: usize,
    /// Entries persisted.
    pub added: usize,
    /// Rows dropped by validation, deduplication or limits.
    pub skipped: usize,
    /// Rows scored below the threshold.
    pub rejected: usize,
    /// Count per reason.
    pub reasons: BTreeMap<SkipReason, usize>,
}

impl CsvProcessingResult {
    /// Count a row that was read.
    pub fn record_processed(&mut self) {
        self.processed += 1;
    }

    /// Count a persisted entry.
    pub fn record_added(&mut self) {
        self.added += 1;
    }

    /// Count a row that was not persisted.
    pub fn record_skip(&mut self, reason: SkipReason) {
        if reason.is_rejection() {
            self.rejected += 1;
        } else {
            self.skipped += 1;
        }
        *self.reasons.entry(reason).or_insert(0) += 1;
    }

    /// Count for one reason.
    pub fn count(&self, reason: SkipReason) -> usize {
        self.reasons.get(&reason).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejections_counted_separately() {
        let mut result = CsvProcessingResult::default();
        for _ in 0..3 {
            result.record_processed();
        }
        result.record_added();
        result.record_skip(SkipReason::Malformed);
        result.record_skip(SkipReason::LowQuality);
        assert_eq!((result.added, result.skipped, result.rejected), (1, 1, 1));
        assert_eq!(result.count(SkipReason::LowQuality), 1);
        assert_eq!(result.count(SkipReason::Spam), 0);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["reasons"]["low_quality"], 1);
    }
}
