//! Event sink trait and implementations.
//!
//! The `EventSink` trait defines the interface for receiving fuzz events.
//! Implementations can collect events for testing, forward to the `tracing`
//! crate, or fan out to several sinks.

use std::sync::Arc;

use crate::events::FuzzEvent;

/// Trait for receiving fuzz events.
///
/// # Example
///
/// ```ignore
/// use passfuzz_inspector::{EventSink, FuzzEvent};
///
/// struct PrintSink;
///
/// impl EventSink for PrintSink {
///     fn emit(&self, event: FuzzEvent) {
///         println!("{:?}", event);
///     }
/// }
/// ```
pub trait EventSink: Send + Sync + 'static {
    /// Called when an event occurs.
    fn emit(&self, event: FuzzEvent);

    /// Whether per-seed trace events are wanted.
    ///
    /// The harness only renders trees for trace events when this is true, and
    /// inlines the trees into failure reports when it is false.
    fn trace_enabled(&self) -> bool {
        false
    }

    /// Called at the end of a run to flush buffered events.
    fn flush(&self) {}
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn emit(&self, event: FuzzEvent) {
        (**self).emit(event);
    }

    fn trace_enabled(&self) -> bool {
        (**self).trace_enabled()
    }

    fn flush(&self) {
        (**self).flush();
    }
}

/// Null sink that discards all events.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: FuzzEvent) {}
}

/// A sink that forwards events to multiple child sinks.
pub struct MultiplexSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl MultiplexSink {
    pub fn new(sinks: Vec<Box<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

impl EventSink for MultiplexSink {
    fn emit(&self, event: FuzzEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }

    fn trace_enabled(&self) -> bool {
        self.sinks.iter().any(|s| s.trace_enabled())
    }

    fn flush(&self) {
        for sink in &self.sinks {
            sink.flush();
        }
    }
}

/// A sink that filters events before forwarding.
pub struct FilterSink<F, S>
where
    F: Fn(&FuzzEvent) -> bool + Send + Sync + 'static,
    S: EventSink,
{
    filter: F,
    inner: S,
}

impl<F, S> FilterSink<F, S>
where
    F: Fn(&FuzzEvent) -> bool + Send + Sync + 'static,
    S: EventSink,
{
    pub fn new(filter: F, inner: S) -> Self {
        Self { filter, inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<F, S> EventSink for FilterSink<F, S>
where
    F: Fn(&FuzzEvent) -> bool + Send + Sync + 'static,
    S: EventSink,
{
    fn emit(&self, event: FuzzEvent) {
        if (self.filter)(&event) {
            self.inner.emit(event);
        }
    }

    fn trace_enabled(&self) -> bool {
        self.inner.trace_enabled()
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{SeedKey, Severity};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingSink {
        count: AtomicU32,
        trace: bool,
    }

    impl CountingSink {
        fn new(trace: bool) -> Self {
            Self {
                count: AtomicU32::new(0),
                trace,
            }
        }

        fn count(&self) -> u32 {
            self.count.load(Ordering::SeqCst)
        }
    }

    impl EventSink for CountingSink {
        fn emit(&self, _event: FuzzEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }

        fn trace_enabled(&self) -> bool {
            self.trace
        }
    }

    fn start() -> FuzzEvent {
        FuzzEvent::StageStart {
            stage: 1,
            pass: "p".into(),
        }
    }

    #[test]
    fn test_null_sink() {
        let sink = NullSink;
        sink.emit(start());
        assert!(!sink.trace_enabled());
    }

    #[test]
    fn test_multiplex_sink() {
        let sink1 = Arc::new(CountingSink::new(false));
        let sink2 = Arc::new(CountingSink::new(true));

        let multiplex = MultiplexSink::new(vec![
            Box::new(sink1.clone()),
            Box::new(sink2.clone()),
        ]);

        multiplex.emit(start());

        assert_eq!(sink1.count(), 1);
        assert_eq!(sink2.count(), 1);
        assert!(multiplex.trace_enabled());
    }

    #[test]
    fn test_filter_sink() {
        let filter_sink = FilterSink::new(
            |e: &FuzzEvent| e.severity() >= Severity::Info,
            CountingSink::new(false),
        );

        filter_sink.emit(start());
        filter_sink.emit(FuzzEvent::NotApplicable {
            key: SeedKey::new(1, "p", "top", 0),
            errors: 1,
        });

        assert_eq!(filter_sink.inner().count(), 1);
    }
}
