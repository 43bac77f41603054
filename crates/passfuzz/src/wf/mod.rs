//! Well-formedness: the schema protocol the fuzzer drives.
//!
//! A [`Schema`] can generate random conforming trees, check that a tree
//! conforms, and build the symbol tables a tree's bindings describe. The
//! crate ships one implementation, the shape-based [`Wellformed`].

pub mod context;
mod generators;
mod shape;

use std::sync::Arc;

use crate::ast::{Node, Token};

pub use context::WfScope;
pub use generators::{ident, int_literal, GenLocationFn, Generators};
pub use shape::{Field, Shape, Wellformed};

/// Shared handle to a schema.
pub type SchemaRef = Arc<dyn Schema>;

/// The capability set the fuzzer needs from a schema.
pub trait Schema: Send + Sync {
    /// A schema that declares nothing. Stages with an empty schema on either
    /// side are not fuzzed.
    fn is_empty(&self) -> bool;

    /// Generate a conforming tree rooted at `root`.
    ///
    /// Must be deterministic for a fixed `(root, generators, seed, max_depth)`
    /// and must never nest deeper than `max_depth` (a lone root has depth 1).
    fn gen(
        &self,
        root: Token,
        generators: &Generators,
        seed: u64,
        max_depth: usize,
    ) -> Result<Node, WfError>;

    /// Structural conformance. Does not touch the tree.
    fn check(&self, node: &Node) -> Result<(), WfError>;

    /// Build the symbol tables of every scope in `node`, validating bindings
    /// on the way.
    fn build_st(&self, node: &mut Node) -> Result<(), WfError>;

    /// Index of the child holding field `field` of `parent`, when the schema
    /// gives `parent` a fixed field layout.
    fn field_index(&self, _parent: Token, _field: Token) -> Option<usize> {
        None
    }
}

/// Ways a tree fails a schema, or a schema fails to produce a tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WfError {
    #[error("cannot generate {token} within depth {max_depth}: {}", describe_height(.needed))]
    DepthBound {
        token: Token,
        needed: Option<usize>,
        max_depth: usize,
    },

    #[error("{at}: {token} is a leaf but has {found} children")]
    UnexpectedChildren {
        at: String,
        token: Token,
        found: usize,
    },

    #[error("{at}: {token} expects {expected} children, found {found}")]
    Arity {
        at: String,
        token: Token,
        expected: usize,
        found: usize,
    },

    #[error("{at}: {token} expects {} children, found {found}", describe_range(.min, .max))]
    ChildCount {
        at: String,
        token: Token,
        found: usize,
        min: usize,
        max: Option<usize>,
    },

    #[error("{at}: {found} is not allowed under {parent}, expected {}", join_tokens(.expected))]
    UnexpectedToken {
        at: String,
        parent: Token,
        found: Token,
        expected: Vec<Token>,
    },

    #[error("duplicate binding `{name}` in {scope}")]
    DuplicateBinding { name: String, scope: Token },

    #[error("binding `{name}` of {token} has no enclosing scope")]
    UnscopedBinding { token: Token, name: String },

    #[error("{token} has no {field} child to bind")]
    MissingBindingField { token: Token, field: Token },
}

fn describe_height(needed: &Option<usize>) -> String {
    match needed {
        Some(n) => format!("needs depth {n}"),
        None => "no finite derivation".to_string(),
    }
}

fn describe_range(min: &usize, max: &Option<usize>) -> String {
    match max {
        Some(max) if max == min => format!("{min}"),
        Some(max) => format!("{min}..={max}"),
        None => format!("at least {min}"),
    }
}

fn join_tokens(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| t.name())
        .collect::<Vec<_>>()
        .join(" | ")
}
