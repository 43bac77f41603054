//! Schema-directed differential fuzzing for multi-pass tree-rewriting
//! pipelines.
//!
//! Each pass of a pipeline declares the [`Schema`] its output must satisfy.
//! The [`Fuzzer`] generates random trees from the schema a stage expects as
//! input, runs the stage's pass over them, and checks that
//!
//! - the output conforms to the pass's own schema, unless the pass reported
//!   an error by embedding an [`ERROR`] node, and
//! - the pass's [`Prop`]erties relating input and output hold.
//!
//! Generation is seeded, so every failure report names a seed that
//! reproduces it.
//!
//! # Quick Start
//!
//! ```ignore
//! use passfuzz::{Field, Fuzzer, Generators, PassDef, Shape, Token, Wellformed, TOP};
//! use std::sync::Arc;
//!
//! const LEAF: Token = Token::new("leaf");
//!
//! let wf = Arc::new(Wellformed::new().shape(TOP, Shape::seq([LEAF]).at_least(1).at_most(3)));
//! let identity = PassDef::map("identity", |ast| ast).with_shared_wf(wf.clone());
//!
//! let status = Fuzzer::new(vec![identity.into_ref()], Some(wf), Generators::new())
//!     .with_end_index(1)?
//!     .with_start_seed(0)
//!     .with_seed_count(10)
//!     .test();
//! assert_eq!(status, 0);
//! ```
//!
//! Diagnostics are sent to an [`EventSink`]; by default a [`TracingSink`]
//! that logs through `tracing`.

pub mod ast;
mod config;
mod error;
mod fuzzer;
mod pass;
pub mod pipeline;
mod presets;
mod prop;
mod recorder;
pub mod wf;

pub use ast::{Location, Node, Source, SymbolTable, Token, ERROR, ERROR_AST, ERROR_MSG, TOP};
pub use config::FuzzConfig;
pub use error::FuzzError;
pub use fuzzer::{FailureCause, FailureRecord, FuzzResult, Fuzzer, MAX_REPORTED_ERRORS};
pub use pass::{Change, Pass, PassDef, PassRef, PassRun};
pub use pipeline::{Parser, Reader, Rewriter, Writer};
pub use presets::Presets;
pub use prop::{Prop, PropMap, PropResult};
pub use recorder::{FuzzRunRecord, RunMetadata, RunStats};
pub use wf::{
    ident, int_literal, Field, GenLocationFn, Generators, Schema, SchemaRef, Shape, WfError,
    WfScope, Wellformed,
};

pub use passfuzz_inspector::{
    EventCollector, EventSink, FailureKind, FailureReport, FuzzEvent, FuzzTrace, MultiplexSink,
    NullSink, SeedKey, SkipReason, TracingSink,
};
