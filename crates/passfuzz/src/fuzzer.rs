//! The fuzz loop: generate, rewrite, verify, check properties.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::{Duration, Instant};

use passfuzz_inspector::{
    ErrorEntry, EventSink, FailureKind, FailureReport, FuzzEvent, ReportedError, SeedKey,
    SkipReason, TracingSink,
};
use serde::{Deserialize, Serialize};

use crate::ast::{Node, Token, ERROR_MSG, TOP};
use crate::config::FuzzConfig;
use crate::error::FuzzError;
use crate::pass::{Pass, PassRef, PassRun};
use crate::pipeline::{Reader, Rewriter, Writer};
use crate::prop::Prop;
use crate::wf::{Generators, Schema, SchemaRef, WfScope};

/// Most errors listed in a single property failure report.
pub const MAX_REPORTED_ERRORS: usize = 21;

/// Why a seed failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureCause {
    /// The input schema could not produce a tree for the root. Recorded once
    /// per `(stage, root)`, at the first seed.
    Generation { reason: String },
    /// The pass output is not well-formed.
    Structural { violation: String },
    /// Properties failed on well-formed output.
    Property { properties: Vec<String> },
}

/// A failed `(stage, root, seed)` evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub key: SeedKey,
    pub cause: FailureCause,
}

/// Result of a fuzz run.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzResult {
    /// First seed of every seed loop, for reproduction.
    pub start_seed: u64,
    /// Stages fuzzed, in order.
    pub stages_tested: Vec<usize>,
    /// Stages skipped for lack of a schema, in order.
    pub stages_skipped: Vec<usize>,
    /// Trees generated and run through a pass.
    pub seeds_run: u64,
    /// Seeds whose output carried error nodes and so went unchecked.
    pub not_applicable: u64,
    pub failures: Vec<FailureRecord>,
    /// The run ended at a failure because fail-fast was on.
    pub stopped_early: bool,
    pub total_duration: Duration,
}

impl FuzzResult {
    fn new(start_seed: u64) -> Self {
        Self {
            start_seed,
            ..Self::default()
        }
    }

    /// Process-style status: 0 when nothing failed, 1 otherwise.
    pub fn status(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn first_failure(&self) -> Option<&FailureRecord> {
        self.failures.first()
    }

    pub fn failures_for_stage(&self, stage: usize) -> impl Iterator<Item = &FailureRecord> {
        self.failures.iter().filter(move |f| f.key.stage == stage)
    }
}

/// Differential fuzzer for a pipeline of passes.
///
/// Stage `i` (1-based) generates trees from the output schema of pass `i - 1`
/// (the pipeline input schema for stage 1), runs pass `i` over them and checks
/// the output against pass `i`'s schema and, optionally, its properties.
///
/// ```ignore
/// let status = Fuzzer::new(passes, Some(input_wf), generators)
///     .with_seed_count(500)
///     .with_check_props(true)
///     .test();
/// ```
pub struct Fuzzer {
    passes: Vec<PassRef>,
    input_wf: Option<SchemaRef>,
    generators: Generators,
    config: FuzzConfig,
    start_seed: u64,
    sink: Arc<dyn EventSink>,
}

impl Fuzzer {
    pub fn new(passes: Vec<PassRef>, input_wf: Option<SchemaRef>, generators: Generators) -> Self {
        let start_seed = rand::random();
        Self {
            passes,
            input_wf,
            generators,
            config: FuzzConfig::default().with_start_seed(start_seed),
            start_seed,
            sink: Arc::new(TracingSink::new()),
        }
    }

    pub fn from_reader(reader: &Reader) -> Self {
        Self::new(
            reader.passes.clone(),
            Some(reader.parser.wf.clone()),
            reader.parser.generators.clone(),
        )
    }

    pub fn from_writer(writer: &Writer, generators: Generators) -> Self {
        Self::new(
            writer.passes.clone(),
            Some(writer.input_wf.clone()),
            generators,
        )
    }

    pub fn from_rewriter(rewriter: &Rewriter, generators: Generators) -> Self {
        Self::new(
            rewriter.passes.clone(),
            Some(rewriter.input_wf.clone()),
            generators,
        )
    }

    // === Configuration ===

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    pub fn with_start_seed(mut self, seed: u64) -> Self {
        self.start_seed = seed;
        self.config.start_seed = Some(seed);
        self
    }

    pub fn with_seed_count(mut self, count: u64) -> Self {
        self.config.seed_count = count;
        self
    }

    pub fn with_failfast(mut self, failfast: bool) -> Self {
        self.config.failfast = failfast;
        self
    }

    pub fn with_check_props(mut self, check_props: bool) -> Self {
        self.config.check_props = check_props;
        self
    }

    /// First stage to fuzz. Stages are 1-based, so 0 is rejected.
    pub fn with_start_index(mut self, start_index: usize) -> Result<Self, FuzzError> {
        self.config = self.config.with_start_index(start_index)?;
        Ok(self)
    }

    /// Last stage to fuzz, inclusive. Must not exceed the number of passes.
    pub fn with_end_index(mut self, end_index: usize) -> Result<Self, FuzzError> {
        let config = self.config.clone().with_end_index(end_index);
        config.validate(self.passes.len())?;
        self.config = config;
        Ok(self)
    }

    /// Replace every setting at once. An unset start seed keeps the current
    /// one.
    pub fn with_config(mut self, config: FuzzConfig) -> Result<Self, FuzzError> {
        config.validate(self.passes.len())?;
        self.start_seed = config.start_seed.unwrap_or(self.start_seed);
        self.config = FuzzConfig {
            start_seed: Some(self.start_seed),
            ..config
        };
        Ok(self)
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.config.max_depth
    }

    pub fn start_seed(&self) -> u64 {
        self.start_seed
    }

    pub fn seed_count(&self) -> u64 {
        self.config.seed_count
    }

    pub fn failfast(&self) -> bool {
        self.config.failfast
    }

    pub fn check_props(&self) -> bool {
        self.config.check_props
    }

    pub fn start_index(&self) -> usize {
        self.config.start_index
    }

    /// Last stage fuzzed, with the default resolved.
    pub fn end_index(&self) -> usize {
        *self.config.stages(self.passes.len()).end()
    }

    pub fn config(&self) -> &FuzzConfig {
        &self.config
    }

    pub fn passes(&self) -> &[PassRef] {
        &self.passes
    }

    // === Running ===

    /// Fuzz every stage in the window. Returns 0 when every evaluated seed
    /// passed.
    pub fn test(&self) -> i32 {
        self.run().status()
    }

    /// Fuzz every stage in the window and return the structured outcome.
    pub fn run(&self) -> FuzzResult {
        let started = Instant::now();
        let mut result = FuzzResult::new(self.start_seed);

        for stage in self.config.stages(self.passes.len()) {
            let pass = &self.passes[stage - 1];
            let prev = if stage > 1 {
                self.passes[stage - 2].wf()
            } else {
                self.input_wf.clone()
            };

            let (prev, curr) = match (usable(prev), usable(pass.wf())) {
                (Some(prev), Some(curr)) => (prev, curr),
                (prev, _) => {
                    let reason = if prev.is_none() {
                        SkipReason::MissingInputSchema
                    } else {
                        SkipReason::MissingOutputSchema
                    };
                    self.sink.emit(FuzzEvent::StageSkipped {
                        stage,
                        pass: pass.name().to_string(),
                        reason,
                    });
                    result.stages_skipped.push(stage);
                    continue;
                }
            };

            self.sink.emit(FuzzEvent::StageStart {
                stage,
                pass: pass.name().to_string(),
            });
            result.stages_tested.push(stage);
            let seeds_before = result.seeds_run;
            let failures_before = result.failures.len();

            let flow = {
                let _scope = WfScope::enter([prev.clone(), curr.clone()]);
                self.run_stage(stage, pass.as_ref(), prev.as_ref(), curr.as_ref(), &mut result)
            };

            self.sink.emit(FuzzEvent::StageEnd {
                stage,
                pass: pass.name().to_string(),
                seeds: result.seeds_run - seeds_before,
                failures: result.failures.len() - failures_before,
            });

            if flow.is_break() {
                result.stopped_early = true;
                break;
            }
        }

        result.total_duration = started.elapsed();
        self.sink.flush();
        result
    }

    /// Property loops for every root with properties, then the plain
    /// structural loop for [`TOP`] unless a property loop already covered it.
    fn run_stage(
        &self,
        stage: usize,
        pass: &dyn Pass,
        prev: &dyn Schema,
        curr: &dyn Schema,
        result: &mut FuzzResult,
    ) -> ControlFlow<()> {
        let props = pass.props();
        if self.config.check_props {
            for (&root, root_props) in props {
                self.run_test(stage, pass, prev, curr, root, root_props, result)?;
            }
        }
        if !(self.config.check_props && props.contains_key(&TOP)) {
            self.run_test(stage, pass, prev, curr, TOP, &[], result)?;
        }
        ControlFlow::Continue(())
    }

    #[allow(clippy::too_many_arguments)]
    fn run_test(
        &self,
        stage: usize,
        pass: &dyn Pass,
        prev: &dyn Schema,
        curr: &dyn Schema,
        root: Token,
        props: &[Prop],
        result: &mut FuzzResult,
    ) -> ControlFlow<()> {
        let trace = self.sink.trace_enabled();
        let stop = if self.config.failfast {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        };

        for offset in 0..self.config.seed_count {
            let seed = self.start_seed.wrapping_add(offset);
            let key = SeedKey::new(stage, pass.name(), root.name(), seed);

            let ast = match prev.gen(root, &self.generators, seed, self.config.max_depth) {
                Ok(ast) => ast,
                Err(err) => {
                    // Every later seed would fail the same way.
                    let reason = err.to_string();
                    self.sink.emit(FuzzEvent::GenerationFailed {
                        key: key.clone(),
                        message: reason.clone(),
                    });
                    result.failures.push(FailureRecord {
                        key,
                        cause: FailureCause::Generation { reason },
                    });
                    return stop;
                }
            };
            result.seeds_run += 1;
            if trace {
                self.sink.emit(FuzzEvent::TreeGenerated {
                    key: key.clone(),
                    tree: ast.to_string(),
                });
            }

            let ast_copy = ast.clone();
            let PassRun {
                ast: mut new_ast,
                count,
                changes,
            } = pass.run(ast);
            if trace {
                self.sink.emit(FuzzEvent::TreeRewritten {
                    key: key.clone(),
                    tree: new_ast.to_string(),
                    rewrites: count,
                    changes: changes.len(),
                });
            }

            let verdict = match curr.build_st(&mut new_ast) {
                Ok(()) if new_ast.has_errors() => {
                    // The pass reported an error, so its output is exempt.
                    result.not_applicable += 1;
                    if trace {
                        self.sink.emit(FuzzEvent::NotApplicable {
                            key,
                            errors: new_ast.errors().len(),
                        });
                    }
                    continue;
                }
                Ok(()) => curr.check(&new_ast),
                Err(err) => Err(err),
            };

            if let Err(violation) = verdict {
                self.report(
                    result,
                    FailureReport {
                        key,
                        kind: FailureKind::Structural {
                            violation: violation.to_string(),
                        },
                        before: ast_copy.to_string(),
                        after: new_ast.to_string(),
                        errors: Vec::new(),
                        omitted_errors: 0,
                    },
                );
                if stop.is_break() {
                    return stop;
                }
                continue;
            }

            if !self.config.check_props {
                continue;
            }

            let mut failed = Vec::new();
            let mut errors = Vec::new();
            for prop in props {
                if let Some(error) = prop.eval(&ast_copy, &new_ast).into_error(prop.name()) {
                    failed.push(prop.name().to_string());
                    errors.push(error);
                }
            }
            if errors.is_empty() {
                continue;
            }

            let omitted_errors = errors.len().saturating_sub(MAX_REPORTED_ERRORS);
            self.report(
                result,
                FailureReport {
                    key,
                    kind: FailureKind::Property { properties: failed },
                    before: ast_copy.to_string(),
                    after: new_ast.to_string(),
                    errors: errors
                        .iter()
                        .take(MAX_REPORTED_ERRORS)
                        .map(describe_error)
                        .collect(),
                    omitted_errors,
                },
            );
            if stop.is_break() {
                return stop;
            }
        }

        ControlFlow::Continue(())
    }

    fn report(&self, result: &mut FuzzResult, report: FailureReport) {
        let cause = match &report.kind {
            FailureKind::Structural { violation } => FailureCause::Structural {
                violation: violation.clone(),
            },
            FailureKind::Property { properties } => FailureCause::Property {
                properties: properties.clone(),
            },
        };
        result.failures.push(FailureRecord {
            key: report.key.clone(),
            cause,
        });
        self.sink.emit(FuzzEvent::Failure(report));
    }
}

fn usable(wf: Option<SchemaRef>) -> Option<SchemaRef> {
    wf.filter(|wf| !wf.is_empty())
}

/// Message children are reported verbatim, anything else as a witness.
fn describe_error(error: &Node) -> ReportedError {
    let mut reported = ReportedError::default();
    for child in error.children() {
        if child.is(ERROR_MSG) {
            reported
                .entries
                .push(ErrorEntry::Message(child.text().to_string()));
        } else {
            let location = child.location();
            let excerpt = if location.is_empty() {
                child.to_string().trim_end().to_string()
            } else {
                location.str()
            };
            reported = reported.with_witness(location.origin_linecol(), excerpt);
        }
    }
    reported
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Location;
    use crate::prop::PropResult;

    #[test]
    fn test_describe_error() {
        let witness = Node::leaf(TOP, "abc");
        let error = PropResult::fail_at(&witness).into_error("p").unwrap();
        let reported = describe_error(&error);
        assert_eq!(reported.entries.len(), 2);
        assert_eq!(
            reported.entries[0],
            ErrorEntry::Message("property 'p' failed\n".into())
        );
        assert_eq!(
            reported.entries[1],
            ErrorEntry::Witness {
                origin: "<generated>:1:1".into(),
                excerpt: "abc\n^^^".into(),
            }
        );

        let unlocated = Node::new(TOP).with_location(Location::default());
        let error = PropResult::fail_at(&unlocated).into_error("p").unwrap();
        match &describe_error(&error).entries[1] {
            ErrorEntry::Witness { origin, excerpt } => {
                assert_eq!(origin, "<unknown>");
                assert_eq!(excerpt, "(top)");
            }
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[test]
    fn test_status() {
        let mut result = FuzzResult::new(3);
        assert_eq!(result.status(), 0);
        result.failures.push(FailureRecord {
            key: SeedKey::new(2, "p", "top", 3),
            cause: FailureCause::Structural {
                violation: "bad".into(),
            },
        });
        assert_eq!(result.status(), 1);
        assert_eq!(result.failures_for_stage(2).count(), 1);
        assert_eq!(result.failures_for_stage(1).count(), 0);
    }
}
