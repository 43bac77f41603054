//! Inspector: observability for passfuzz runs.
//!
//! The fuzz harness reports everything it does as [`FuzzEvent`]s sent to an
//! [`EventSink`]. This crate defines the events and a set of sinks:
//!
//! - **EventCollector**: Collects events for testing and assertion
//! - **TracingSink**: Bridges to the `tracing` crate
//! - **MultiplexSink** / **FilterSink**: Compose other sinks
//! - **NullSink**: Discards everything
//!
//! # Quick Start
//!
//! ```ignore
//! use passfuzz_inspector::{EventCollector, FuzzEvent};
//! use std::sync::Arc;
//!
//! let collector = Arc::new(EventCollector::new());
//! let fuzzer = Fuzzer::new(passes, input_wf, generators).with_sink(collector.clone());
//! fuzzer.test();
//!
//! let trace = collector.trace();
//! assert!(trace.failures().next().is_none());
//! ```
//!
//! # Event Types
//!
//! - **Stage lifecycle**: `StageStart`, `StageSkipped`, `StageEnd`
//! - **Per-seed trace**: `TreeGenerated`, `TreeRewritten`, `NotApplicable`
//! - **Failures**: `GenerationFailed`, `Failure`
//!
//! Trees and locations are carried as pre-rendered strings, so sinks stay
//! independent of the tree model.

mod collector;
mod events;
mod sink;
mod tracing_sink;

pub use collector::EventCollector;
pub use events::{
    ErrorEntry, FailureKind, FailureReport, FuzzEvent, FuzzTrace, ReportedError, SeedKey,
    Severity, SkipReason,
};
pub use sink::{EventSink, FilterSink, MultiplexSink, NullSink};
pub use tracing_sink::TracingSink;
