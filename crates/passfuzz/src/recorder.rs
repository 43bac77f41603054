//! Run records for export.

use std::path::Path;

use passfuzz_inspector::FuzzEvent;
use serde::{Deserialize, Serialize};

use crate::config::FuzzConfig;
use crate::fuzzer::{FailureCause, FuzzResult};

/// Complete fuzz run record for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzRunRecord {
    /// Configuration used, with the start seed resolved.
    pub config: FuzzConfig,
    pub result: FuzzResult,
    pub stats: RunStats,
    /// Events captured during the run, if any were collected.
    pub events: Vec<FuzzEvent>,
    pub metadata: RunMetadata,
}

impl FuzzRunRecord {
    pub fn new(config: FuzzConfig, result: FuzzResult, events: Vec<FuzzEvent>) -> Self {
        let stats = RunStats::from_result(&result);
        let millis = u64::try_from(result.total_duration.as_millis()).unwrap_or(u64::MAX);
        let metadata = RunMetadata::new(millis);
        Self {
            config,
            result,
            stats,
            events,
            metadata,
        }
    }

    /// Export to a JSON file.
    pub fn export_to_file(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    pub fn import_from_file(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Summary statistics for a fuzz run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub stages_tested: usize,
    pub stages_skipped: usize,
    pub seeds_run: u64,
    pub not_applicable: u64,
    pub generation_failures: usize,
    pub structural_failures: usize,
    pub property_failures: usize,
}

impl RunStats {
    pub fn from_result(result: &FuzzResult) -> Self {
        let mut stats = RunStats {
            stages_tested: result.stages_tested.len(),
            stages_skipped: result.stages_skipped.len(),
            seeds_run: result.seeds_run,
            not_applicable: result.not_applicable,
            ..RunStats::default()
        };
        for failure in &result.failures {
            match failure.cause {
                FailureCause::Generation { .. } => stats.generation_failures += 1,
                FailureCause::Structural { .. } => stats.structural_failures += 1,
                FailureCause::Property { .. } => stats.property_failures += 1,
            }
        }
        stats
    }
}

/// Metadata for a fuzz run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Seconds since the Unix epoch when the record was made.
    pub timestamp: String,
    pub duration_ms: u64,
    pub platform: String,
}

impl RunMetadata {
    pub fn new(duration_ms: u64) -> Self {
        Self {
            timestamp: unix_timestamp(),
            duration_ms,
            platform: std::env::consts::OS.to_string(),
        }
    }
}

fn unix_timestamp() -> String {
    use std::time::SystemTime;
    let duration = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}", duration.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuzzer::FailureRecord;
    use passfuzz_inspector::SeedKey;

    fn result() -> FuzzResult {
        FuzzResult {
            start_seed: 5,
            stages_tested: vec![1, 2],
            stages_skipped: vec![3],
            seeds_run: 20,
            not_applicable: 2,
            failures: vec![
                FailureRecord {
                    key: SeedKey::new(1, "a", "top", 5),
                    cause: FailureCause::Structural {
                        violation: "top: bad".into(),
                    },
                },
                FailureRecord {
                    key: SeedKey::new(2, "b", "top", 9),
                    cause: FailureCause::Property {
                        properties: vec!["count".into()],
                    },
                },
            ],
            ..FuzzResult::default()
        }
    }

    #[test]
    fn test_stats() {
        let stats = RunStats::from_result(&result());
        assert_eq!(stats.stages_tested, 2);
        assert_eq!(stats.stages_skipped, 1);
        assert_eq!(stats.structural_failures, 1);
        assert_eq!(stats.property_failures, 1);
        assert_eq!(stats.generation_failures, 0);
    }

    #[test]
    fn test_duration_saturates() {
        let result = FuzzResult {
            total_duration: std::time::Duration::MAX,
            ..result()
        };
        let record = FuzzRunRecord::new(FuzzConfig::default(), result, Vec::new());
        assert_eq!(record.metadata.duration_ms, u64::MAX);

        let record = FuzzRunRecord::new(FuzzConfig::default(), FuzzResult::default(), Vec::new());
        assert_eq!(record.metadata.duration_ms, 0);
    }

    #[test]
    fn test_export_roundtrip() {
        let record = FuzzRunRecord::new(
            FuzzConfig::default().with_start_seed(5),
            result(),
            Vec::new(),
        );
        let path = std::env::temp_dir().join(format!(
            "passfuzz-record-{}-{}.json",
            std::process::id(),
            record.metadata.timestamp
        ));

        record.export_to_file(&path).unwrap();
        let back = FuzzRunRecord::import_from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(back, record);
    }
}
