//! Pipeline holders the fuzzer can be built from.

use crate::pass::PassRef;
use crate::wf::{Generators, SchemaRef};

/// The front of a reading pipeline: the schema of freshly parsed trees and
/// generators for their leaves.
#[derive(Clone)]
pub struct Parser {
    pub wf: SchemaRef,
    pub generators: Generators,
}

impl Parser {
    pub fn new(wf: SchemaRef, generators: Generators) -> Self {
        Self { wf, generators }
    }
}

/// Parses source text and rewrites it through `passes`.
#[derive(Clone)]
pub struct Reader {
    pub name: String,
    pub parser: Parser,
    pub passes: Vec<PassRef>,
}

impl Reader {
    pub fn new(name: impl Into<String>, parser: Parser, passes: Vec<PassRef>) -> Self {
        Self {
            name: name.into(),
            parser,
            passes,
        }
    }
}

/// Rewrites trees of `input_wf` into output form.
#[derive(Clone)]
pub struct Writer {
    pub name: String,
    pub input_wf: SchemaRef,
    pub passes: Vec<PassRef>,
}

impl Writer {
    pub fn new(name: impl Into<String>, input_wf: SchemaRef, passes: Vec<PassRef>) -> Self {
        Self {
            name: name.into(),
            input_wf,
            passes,
        }
    }
}

/// Rewrites trees of `input_wf` into trees of the same language.
#[derive(Clone)]
pub struct Rewriter {
    pub name: String,
    pub input_wf: SchemaRef,
    pub passes: Vec<PassRef>,
}

impl Rewriter {
    pub fn new(name: impl Into<String>, input_wf: SchemaRef, passes: Vec<PassRef>) -> Self {
        Self {
            name: name.into(),
            input_wf,
            passes,
        }
    }
}
