//! Bridge from fuzz events to the `tracing` crate.

use crate::events::FuzzEvent;
use crate::sink::EventSink;

/// Sink that logs events through `tracing` under the `passfuzz` target.
///
/// Stage lifecycle events are logged at `INFO`, failures at `ERROR` and
/// per-seed trees at `TRACE`. Trace events are only requested when a
/// subscriber has `TRACE` enabled for the target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for TracingSink {
    fn emit(&self, event: FuzzEvent) {
        match &event {
            FuzzEvent::StageStart { stage, pass } => {
                tracing::info!(target: "passfuzz", stage, "Testing pass: {pass}");
            }
            FuzzEvent::StageSkipped {
                stage,
                pass,
                reason,
            } => {
                tracing::info!(target: "passfuzz", stage, %reason, "Skipping pass: {pass}");
            }
            FuzzEvent::StageEnd {
                stage,
                pass,
                seeds,
                failures,
            } => {
                tracing::info!(target: "passfuzz", stage, seeds, failures, "Finished pass: {pass}");
            }
            FuzzEvent::TreeGenerated { key, tree } => {
                tracing::trace!(target: "passfuzz", root = %key.root, "============\n{key}\n------------\n{tree}------------");
            }
            FuzzEvent::TreeRewritten {
                key,
                tree,
                rewrites,
                changes,
            } => {
                tracing::trace!(target: "passfuzz", seed = key.seed, rewrites, changes, "{tree}------------");
            }
            FuzzEvent::NotApplicable { key, errors } => {
                tracing::trace!(target: "passfuzz", seed = key.seed, errors, "output carries error nodes, skipping checks");
            }
            FuzzEvent::GenerationFailed { key, message } => {
                tracing::error!(target: "passfuzz", seed = key.seed, root = %key.root, "Failed to generate tree for pass {}: {message}", key.pass);
            }
            FuzzEvent::Failure(report) => {
                tracing::error!(target: "passfuzz", "{}", report.render(!self.trace_enabled()));
            }
        }
    }

    fn trace_enabled(&self) -> bool {
        tracing::enabled!(target: "passfuzz", tracing::Level::TRACE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{FailureKind, FailureReport, SeedKey};

    #[test]
    fn test_emit_without_subscriber() {
        let sink = TracingSink::new();
        assert!(!sink.trace_enabled());

        sink.emit(FuzzEvent::StageStart {
            stage: 1,
            pass: "p".into(),
        });
        sink.emit(FuzzEvent::Failure(FailureReport {
            key: SeedKey::new(1, "p", "top", 3),
            kind: FailureKind::Structural {
                violation: "bad".into(),
            },
            before: String::new(),
            after: String::new(),
            errors: vec![],
            omitted_errors: 0,
        }));
    }
}
