//! Configuration for fuzz runs.

use serde::{Deserialize, Serialize};

use crate::error::FuzzError;

/// Knobs of a fuzz run.
///
/// Stage indices are 1-based: stage `i` runs pass `i` on trees generated from
/// the output schema of pass `i - 1` (or the pipeline input for `i = 1`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuzzConfig {
    // === Generation ===
    /// Deepest tree the generator may produce; a lone root has depth 1.
    pub max_depth: usize,

    /// First seed of every seed loop (None = drawn from entropy when the
    /// fuzzer is built).
    pub start_seed: Option<u64>,

    /// Seeds per `(stage, root)`.
    pub seed_count: u64,

    // === Checking ===
    /// Stop the whole run at the first failing seed.
    pub failfast: bool,

    /// Evaluate the passes' properties on well-formed output.
    pub check_props: bool,

    // === Stage window ===
    /// First stage to fuzz, at least 1.
    pub start_index: usize,

    /// Last stage to fuzz, inclusive (None = second to last pass).
    pub end_index: Option<usize>,
}

impl Default for FuzzConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            start_seed: None,
            seed_count: 100,
            failfast: false,
            check_props: false,
            start_index: 1,
            end_index: None,
        }
    }
}

impl FuzzConfig {
    // === Builder methods ===

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_start_seed(mut self, seed: u64) -> Self {
        self.start_seed = Some(seed);
        self
    }

    pub fn with_seed_count(mut self, count: u64) -> Self {
        self.seed_count = count;
        self
    }

    pub fn with_failfast(mut self, failfast: bool) -> Self {
        self.failfast = failfast;
        self
    }

    pub fn with_check_props(mut self, check_props: bool) -> Self {
        self.check_props = check_props;
        self
    }

    pub fn with_start_index(mut self, start_index: usize) -> Result<Self, FuzzError> {
        if start_index == 0 {
            return Err(FuzzError::StartIndexZero);
        }
        self.start_index = start_index;
        Ok(self)
    }

    pub fn with_end_index(mut self, end_index: usize) -> Self {
        self.end_index = Some(end_index);
        self
    }

    /// Check the settings against a pipeline of `passes` passes.
    pub fn validate(&self, passes: usize) -> Result<(), FuzzError> {
        if self.start_index == 0 {
            return Err(FuzzError::StartIndexZero);
        }
        match self.end_index {
            Some(end_index) if end_index > passes => {
                Err(FuzzError::EndIndexOutOfRange { end_index, passes })
            }
            _ => Ok(()),
        }
    }

    /// The inclusive stage window for a pipeline of `passes` passes.
    ///
    /// Empty when `start_index` lies past the end.
    pub fn stages(&self, passes: usize) -> std::ops::RangeInclusive<usize> {
        let end = self.end_index.unwrap_or(passes.saturating_sub(1));
        self.start_index.max(1)..=end.min(passes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FuzzConfig::default();
        assert_eq!(config.max_depth, 10);
        assert_eq!(config.seed_count, 100);
        assert_eq!(config.start_index, 1);
        assert!(!config.failfast);
        assert!(!config.check_props);
        assert_eq!(config.stages(4), 1..=3);
    }

    #[test]
    fn test_start_index_zero_rejected() {
        assert_eq!(
            FuzzConfig::default().with_start_index(0),
            Err(FuzzError::StartIndexZero)
        );
        let config = FuzzConfig::default().with_start_index(2).unwrap();
        assert_eq!(config.start_index, 2);
    }

    #[test]
    fn test_window() {
        let config = FuzzConfig::default()
            .with_start_index(2)
            .unwrap()
            .with_end_index(3);
        assert_eq!(config.stages(5), 2..=3);
        assert!(config.validate(5).is_ok());
        assert_eq!(
            config.validate(2),
            Err(FuzzError::EndIndexOutOfRange {
                end_index: 3,
                passes: 2
            })
        );

        let past_end = FuzzConfig::default().with_start_index(4).unwrap();
        assert!(past_end.stages(3).is_empty());
        assert!(FuzzConfig::default().stages(1).is_empty());
    }

    #[test]
    fn test_serde() {
        let config = FuzzConfig::default()
            .with_check_props(true)
            .with_start_seed(7);
        let json = serde_json::to_string(&config).unwrap();
        let back: FuzzConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
