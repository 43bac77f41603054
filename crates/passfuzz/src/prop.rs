//! Properties relating a pass's input tree to its output tree.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::ast::{Node, Token, ERROR, ERROR_MSG};

/// Outcome of evaluating a property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropResult {
    Ok,
    /// Failed without pointing at a specific node.
    Failed,
    /// Failed, with the node that demonstrates the failure.
    Witness(Node),
}

impl PropResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, PropResult::Ok)
    }

    /// `Ok` when `holds`, otherwise `Failed`.
    pub fn check(holds: bool) -> Self {
        if holds {
            PropResult::Ok
        } else {
            PropResult::Failed
        }
    }

    /// A failure witnessed by a copy of `node`.
    pub fn fail_at(node: &Node) -> Self {
        PropResult::Witness(node.clone())
    }

    pub fn witness(&self) -> Option<&Node> {
        match self {
            PropResult::Witness(node) => Some(node),
            PropResult::Ok | PropResult::Failed => None,
        }
    }

    /// The error node reporting this result as a failure of property `name`,
    /// or `None` when the property held.
    pub fn into_error(self, name: &str) -> Option<Node> {
        let error =
            Node::new(ERROR).with(Node::leaf(ERROR_MSG, format!("property '{name}' failed\n")));
        match self {
            PropResult::Ok => None,
            PropResult::Failed => Some(error),
            PropResult::Witness(node) => Some(error.with(node)),
        }
    }
}

type PropFn = dyn Fn(&Node, &Node) -> PropResult + Send + Sync;

/// A named check over `(input, output)` of a pass.
#[derive(Clone)]
pub struct Prop {
    name: String,
    f: Arc<PropFn>,
}

impl Prop {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Node, &Node) -> PropResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            f: Arc::new(f),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn eval(&self, before: &Node, after: &Node) -> PropResult {
        (self.f)(before, after)
    }
}

impl fmt::Debug for Prop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prop").field("name", &self.name).finish()
    }
}

/// Properties of a pass, grouped by the root tag the fuzzer generates from.
pub type PropMap = IndexMap<Token, Vec<Prop>>;
