//! Configuration errors.

/// A fuzzer was configured with settings it cannot honor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FuzzError {
    /// Stage indices are 1-based; stage 0 would be the pipeline input.
    #[error("start_index must be at least 1")]
    StartIndexZero,

    #[error("end_index {end_index} is past the last pass (pipeline has {passes} passes)")]
    EndIndexOutOfRange { end_index: usize, passes: usize },

    #[error("unknown preset `{0}`")]
    UnknownPreset(String),
}
