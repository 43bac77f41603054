//! Passes: named tree rewrites with an output schema and properties.

use std::fmt;
use std::sync::Arc;

use crate::ast::{Location, Node, Token};
use crate::prop::{Prop, PropMap};
use crate::wf::{Schema, SchemaRef};

/// A single rewrite a pass performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub token: Token,
    pub location: Location,
}

/// What a pass returns: the rewritten tree and what it did to get there.
#[derive(Debug, Clone)]
pub struct PassRun {
    pub ast: Node,
    /// Number of rewrite iterations performed.
    pub count: usize,
    pub changes: Vec<Change>,
}

impl PassRun {
    /// A run that left `ast` as it was.
    pub fn unchanged(ast: Node) -> Self {
        Self {
            ast,
            count: 0,
            changes: Vec::new(),
        }
    }
}

/// A stage of a pipeline.
///
/// Runs must be independent: the fuzzer invokes [`run`](Pass::run) once per
/// seed and expects no state to carry over.
pub trait Pass: Send + Sync {
    fn name(&self) -> &str;

    /// Schema of this pass's output. `None` means the output is not
    /// described, and the stage cannot be fuzzed.
    fn wf(&self) -> Option<SchemaRef>;

    fn props(&self) -> &PropMap;

    fn run(&self, ast: Node) -> PassRun;
}

pub type PassRef = Arc<dyn Pass>;

type RewriteFn = dyn Fn(Node) -> PassRun + Send + Sync;

/// A [`Pass`] backed by a closure.
#[derive(Clone)]
pub struct PassDef {
    name: String,
    wf: Option<SchemaRef>,
    props: PropMap,
    f: Arc<RewriteFn>,
}

impl PassDef {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Node) -> PassRun + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            wf: None,
            props: PropMap::new(),
            f: Arc::new(f),
        }
    }

    /// A pass that reports no rewrite statistics.
    pub fn map<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Node) -> Node + Send + Sync + 'static,
    {
        Self::new(name, move |ast| PassRun::unchanged(f(ast)))
    }

    pub fn with_wf<S: Schema + 'static>(self, wf: S) -> Self {
        self.with_shared_wf(Arc::new(wf))
    }

    pub fn with_shared_wf(mut self, wf: SchemaRef) -> Self {
        self.wf = Some(wf);
        self
    }

    /// Attach a property checked on trees generated from `root`.
    pub fn prop(mut self, root: Token, prop: Prop) -> Self {
        self.props.entry(root).or_default().push(prop);
        self
    }

    pub fn into_ref(self) -> PassRef {
        Arc::new(self)
    }
}

impl Pass for PassDef {
    fn name(&self) -> &str {
        &self.name
    }

    fn wf(&self) -> Option<SchemaRef> {
        self.wf.clone()
    }

    fn props(&self) -> &PropMap {
        &self.props
    }

    fn run(&self, ast: Node) -> PassRun {
        (self.f)(ast)
    }
}

impl fmt::Debug for PassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassDef")
            .field("name", &self.name)
            .field("has_wf", &self.wf.is_some())
            .field("props", &self.props)
            .finish()
    }
}
