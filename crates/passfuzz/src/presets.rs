//! Predefined configurations for common fuzz runs.

use crate::config::FuzzConfig;
use crate::error::FuzzError;

/// Collection of preset configurations.
pub struct Presets;

impl Presets {
    /// A few seeds over shallow trees (CI-friendly, runs fast).
    pub fn quick() -> FuzzConfig {
        FuzzConfig::default()
            .with_max_depth(6)
            .with_seed_count(20)
            .with_failfast(true)
    }

    /// Default depth and seed count, properties on.
    pub fn standard() -> FuzzConfig {
        FuzzConfig::default().with_check_props(true)
    }

    /// Many seeds over deep trees, collecting every failure.
    pub fn exhaustive() -> FuzzConfig {
        FuzzConfig::default()
            .with_max_depth(16)
            .with_seed_count(2_000)
            .with_check_props(true)
    }

    /// All presets, by name.
    pub fn all() -> Vec<(&'static str, FuzzConfig)> {
        vec![
            ("quick", Self::quick()),
            ("standard", Self::standard()),
            ("exhaustive", Self::exhaustive()),
        ]
    }

    pub fn by_name(name: &str) -> Result<FuzzConfig, FuzzError> {
        Self::all()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, config)| config)
            .ok_or_else(|| FuzzError::UnknownPreset(name.to_string()))
    }
}
