//! Event types for passfuzz runs.
//!
//! Events carry pre-rendered trees and locations as strings so that sinks do
//! not need to know the tree model of the pipeline under test.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};

/// Separator line used between sections of a failure report.
const RULE: &str = "============";
/// Separator line used between trees inside a failure report.
const THIN_RULE: &str = "------------";

/// Identifies one `(stage, root, seed)` evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeedKey {
    /// 1-based index of the stage in the pipeline.
    pub stage: usize,
    /// Name of the pass run at this stage.
    pub pass: String,
    /// Root tag the tree was generated from.
    pub root: String,
    /// Seed used for generation.
    pub seed: u64,
}

impl SeedKey {
    pub fn new(stage: usize, pass: impl Into<String>, root: impl Into<String>, seed: u64) -> Self {
        Self {
            stage,
            pass: pass.into(),
            root: root.into(),
            seed,
        }
    }
}

impl fmt::Display for SeedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pass: {}, seed: {}", self.pass, self.seed)
    }
}

/// Why a stage was not fuzzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// The schema expected of the stage's input is absent or empty.
    MissingInputSchema,
    /// The pass declares no output schema.
    MissingOutputSchema,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingInputSchema => write!(f, "no input schema"),
            SkipReason::MissingOutputSchema => write!(f, "no output schema"),
        }
    }
}

/// One line item of a collected error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorEntry {
    /// A literal message.
    Message(String),
    /// A located node pinpointing the violation.
    Witness {
        /// `origin:line:col` of the witness.
        origin: String,
        /// Source excerpt of the witness span.
        excerpt: String,
    },
}

/// An error collected while evaluating a seed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedError {
    pub entries: Vec<ErrorEntry>,
}

impl ReportedError {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            entries: vec![ErrorEntry::Message(message.into())],
        }
    }

    pub fn with_witness(mut self, origin: impl Into<String>, excerpt: impl Into<String>) -> Self {
        self.entries.push(ErrorEntry::Witness {
            origin: origin.into(),
            excerpt: excerpt.into(),
        });
        self
    }
}

/// Classification of a failed seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The pass output does not conform to the pass's schema.
    Structural {
        /// Rendered schema violation.
        violation: String,
    },
    /// One or more properties failed on well-formed output.
    Property {
        /// Names of the failed properties.
        properties: Vec<String>,
    },
}

/// Diagnostic report for a failed seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub key: SeedKey,
    pub kind: FailureKind,
    /// The generated input tree, rendered before the pass ran.
    pub before: String,
    /// The pass output, rendered.
    pub after: String,
    /// Collected errors, already capped.
    pub errors: Vec<ReportedError>,
    /// Number of errors dropped by the cap.
    pub omitted_errors: usize,
}

impl FailureReport {
    /// Render the report as text.
    ///
    /// Structural reports only inline the trees when `include_trees` is set,
    /// since a trace sink has already printed them. Property reports always
    /// include them.
    pub fn render(&self, include_trees: bool) -> String {
        let mut out = String::new();
        let trees = include_trees || matches!(self.kind, FailureKind::Property { .. });

        if trees {
            let _ = writeln!(out, "{RULE}");
            let _ = writeln!(out, "{}", self.key);
            let _ = writeln!(out, "{THIN_RULE}");
            let _ = write!(out, "{}", self.before);
            let _ = writeln!(out, "{THIN_RULE}");
            let _ = write!(out, "{}", self.after);
        }

        match &self.kind {
            FailureKind::Structural { violation } => {
                let _ = writeln!(out, "{THIN_RULE}");
                let _ = writeln!(out, "{violation}");
            }
            FailureKind::Property { .. } => {
                for error in &self.errors {
                    let _ = writeln!(out, "{THIN_RULE}");
                    for entry in &error.entries {
                        match entry {
                            ErrorEntry::Message(message) => {
                                let _ = writeln!(out, "{}", message.trim_end());
                            }
                            ErrorEntry::Witness { origin, excerpt } => {
                                let _ = writeln!(out, "-- {origin}");
                                let _ = writeln!(out, "{excerpt}");
                            }
                        }
                    }
                }
                if self.omitted_errors > 0 {
                    let _ = writeln!(out, "Too many errors, stopping here");
                }
            }
        }

        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(
            out,
            "Failed pass: {}, seed: {}",
            self.key.pass, self.key.seed
        );
        out
    }
}

/// Severity of an event, mapped onto log levels by logging sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Trace,
    Info,
    Error,
}

/// Events emitted during a fuzz run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FuzzEvent {
    // === Stage lifecycle ===
    /// A stage is about to be fuzzed.
    StageStart { stage: usize, pass: String },

    /// A stage was skipped without running any seed.
    StageSkipped {
        stage: usize,
        pass: String,
        reason: SkipReason,
    },

    /// A stage finished.
    StageEnd {
        stage: usize,
        pass: String,
        seeds: u64,
        failures: usize,
    },

    // === Per-seed trace ===
    /// A tree was generated for a seed.
    TreeGenerated { key: SeedKey, tree: String },

    /// The pass produced its output tree.
    TreeRewritten {
        key: SeedKey,
        tree: String,
        rewrites: usize,
        changes: usize,
    },

    /// The output carries error nodes, so the seed was not checked.
    NotApplicable { key: SeedKey, errors: usize },

    // === Failures ===
    /// The schema could not generate a tree for this root.
    GenerationFailed { key: SeedKey, message: String },

    /// A seed failed a structural or property check.
    Failure(FailureReport),
}

impl FuzzEvent {
    pub fn severity(&self) -> Severity {
        match self {
            FuzzEvent::StageStart { .. }
            | FuzzEvent::StageSkipped { .. }
            | FuzzEvent::StageEnd { .. } => Severity::Info,
            FuzzEvent::TreeGenerated { .. }
            | FuzzEvent::TreeRewritten { .. }
            | FuzzEvent::NotApplicable { .. } => Severity::Trace,
            FuzzEvent::GenerationFailed { .. } | FuzzEvent::Failure(_) => Severity::Error,
        }
    }

    /// The seed this event belongs to, if any.
    pub fn seed_key(&self) -> Option<&SeedKey> {
        match self {
            FuzzEvent::TreeGenerated { key, .. }
            | FuzzEvent::TreeRewritten { key, .. }
            | FuzzEvent::NotApplicable { key, .. }
            | FuzzEvent::GenerationFailed { key, .. } => Some(key),
            FuzzEvent::Failure(report) => Some(&report.key),
            _ => None,
        }
    }
}

/// An ordered log of events from one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FuzzTrace {
    pub events: Vec<FuzzEvent>,
}

impl FuzzTrace {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: FuzzEvent) {
        self.events.push(event);
    }

    /// All failure reports, in emission order.
    pub fn failures(&self) -> impl Iterator<Item = &FailureReport> {
        self.events.iter().filter_map(|e| match e {
            FuzzEvent::Failure(report) => Some(report),
            _ => None,
        })
    }

    /// Stages that were started, in order.
    pub fn stages_started(&self) -> Vec<usize> {
        self.events
            .iter()
            .filter_map(|e| match e {
                FuzzEvent::StageStart { stage, .. } => Some(*stage),
                _ => None,
            })
            .collect()
    }

    /// Stages that were skipped, in order.
    pub fn stages_skipped(&self) -> Vec<usize> {
        self.events
            .iter()
            .filter_map(|e| match e {
                FuzzEvent::StageSkipped { stage, .. } => Some(*stage),
                _ => None,
            })
            .collect()
    }

    /// Seeds for which a tree was generated at `stage`.
    pub fn seeds_generated(&self, stage: usize) -> Vec<u64> {
        self.events
            .iter()
            .filter_map(|e| match e {
                FuzzEvent::TreeGenerated { key, .. } if key.stage == stage => Some(key.seed),
                _ => None,
            })
            .collect()
    }

    /// Check if any event matches a predicate.
    pub fn has_event<F>(&self, predicate: F) -> bool
    where
        F: Fn(&FuzzEvent) -> bool,
    {
        self.events.iter().any(predicate)
    }
}
