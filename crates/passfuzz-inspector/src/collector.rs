//! Event collector for testing.
//!
//! `EventCollector` accumulates events for later inspection and assertion.

use parking_lot::Mutex;

use crate::events::{FuzzEvent, FuzzTrace};
use crate::sink::EventSink;

/// Event collector for testing - accumulates events for assertions.
///
/// # Example
///
/// ```ignore
/// use passfuzz_inspector::EventCollector;
/// use std::sync::Arc;
///
/// let collector = Arc::new(EventCollector::new());
/// let status = Fuzzer::new(passes, wf, gens).with_sink(collector.clone()).test();
///
/// let trace = collector.trace();
/// assert_eq!(trace.failures().count(), 0);
/// ```
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Mutex<Vec<FuzzEvent>>,
    trace: bool,
}

impl EventCollector {
    /// Create a new empty event collector that does not request trace events.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collector that also receives per-seed trace events.
    pub fn with_trace() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            trace: true,
        }
    }

    /// Get collected events as a trace.
    pub fn trace(&self) -> FuzzTrace {
        FuzzTrace {
            events: self.events.lock().clone(),
        }
    }

    /// Get collected events as a vector.
    pub fn events(&self) -> Vec<FuzzEvent> {
        self.events.lock().clone()
    }

    /// Clear all collected events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Take collected events, clearing the collector.
    pub fn take(&self) -> Vec<FuzzEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Get the number of collected events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Check if no events have been collected.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for EventCollector {
    fn emit(&self, event: FuzzEvent) {
        self.events.lock().push(event);
    }

    fn trace_enabled(&self) -> bool {
        self.trace
    }
}
