//! Shape-based schemas.

use indexmap::{IndexMap, IndexSet};
use rand::prelude::*;
use rand::rngs::SmallRng;

use super::{Generators, Schema, WfError};
use crate::ast::{Node, SymbolTable, Token};

/// Longest run of optional extra children added to an unbounded sequence.
const MAX_SEQUENCE_EXTRA: usize = 3;

/// One positional child slot of a [`Shape::Fields`] node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: Token,
    choices: Vec<Token>,
}

impl Field {
    /// A field named after the only token it accepts.
    pub fn new(token: Token) -> Self {
        Self {
            name: token,
            choices: vec![token],
        }
    }

    /// A field named `name` accepting any of `choices`.
    pub fn named(name: Token, choices: impl IntoIterator<Item = Token>) -> Self {
        Self {
            name,
            choices: choices.into_iter().collect(),
        }
    }

    pub fn name(&self) -> Token {
        self.name
    }

    pub fn choices(&self) -> &[Token] {
        &self.choices
    }
}

/// What the children of a node with a given tag must look like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// No children; the node's text comes from a generator.
    Leaf,
    /// Exactly one child per field, in order.
    Fields(Vec<Field>),
    /// Any number of children in `[min, max]`, each one of `choices`.
    Sequence {
        choices: Vec<Token>,
        min: usize,
        max: Option<usize>,
    },
}

impl Shape {
    pub fn fields(fields: impl IntoIterator<Item = Field>) -> Self {
        Shape::Fields(fields.into_iter().collect())
    }

    /// An unbounded, possibly empty sequence.
    pub fn seq(choices: impl IntoIterator<Item = Token>) -> Self {
        Shape::Sequence {
            choices: choices.into_iter().collect(),
            min: 0,
            max: None,
        }
    }

    /// Lower bound on a sequence's length. No effect on other shapes.
    pub fn at_least(mut self, n: usize) -> Self {
        if let Shape::Sequence { min, .. } = &mut self {
            *min = n;
        }
        self
    }

    /// Upper bound on a sequence's length. No effect on other shapes.
    pub fn at_most(mut self, n: usize) -> Self {
        if let Shape::Sequence { max, .. } = &mut self {
            *max = Some(n);
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Binding {
    field: Token,
    shadowing: bool,
}

/// A schema given as one [`Shape`] per tag, plus binding and scope
/// declarations.
///
/// Tags without a declared shape are leaves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Wellformed {
    shapes: IndexMap<Token, Shape>,
    bindings: IndexMap<Token, Binding>,
    scopes: IndexSet<Token>,
}

impl Wellformed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shape(mut self, token: Token, shape: Shape) -> Self {
        self.shapes.insert(token, shape);
        self
    }

    /// Nodes tagged `token` bind the text of their `field` child in the
    /// nearest enclosing scope. Binding a name twice in one scope is an error.
    pub fn binding(mut self, token: Token, field: Token) -> Self {
        self.bindings.insert(
            token,
            Binding {
                field,
                shadowing: false,
            },
        );
        self
    }

    /// Like [`binding`](Self::binding), but a name bound again in the same
    /// scope shadows the earlier definition instead of being rejected.
    pub fn binding_shadowing(mut self, token: Token, field: Token) -> Self {
        self.bindings.insert(
            token,
            Binding {
                field,
                shadowing: true,
            },
        );
        self
    }

    /// Nodes tagged `token` open a scope and carry a symbol table.
    pub fn scope(mut self, token: Token) -> Self {
        self.scopes.insert(token);
        self
    }

    /// `self` extended by `other`; declarations in `other` win.
    pub fn merge(&self, other: &Wellformed) -> Wellformed {
        let mut merged = self.clone();
        for (&token, shape) in &other.shapes {
            merged.shapes.insert(token, shape.clone());
        }
        for (&token, binding) in &other.bindings {
            merged.bindings.insert(token, *binding);
        }
        merged.scopes.extend(other.scopes.iter().copied());
        merged
    }

    pub fn shape_of(&self, token: Token) -> Option<&Shape> {
        self.shapes.get(&token)
    }

    /// Declared tags, in declaration order.
    pub fn tokens(&self) -> impl Iterator<Item = Token> + '_ {
        self.shapes.keys().copied()
    }

    /// Smallest depth of any tree rooted at `token`, or `None` when no
    /// finite tree exists.
    pub fn min_depth(&self, token: Token) -> Option<usize> {
        self.height_in(&self.heights(), token)
    }

    /// Minimum heights of every declared tag with a finite derivation,
    /// iterated to a fixpoint.
    fn heights(&self) -> IndexMap<Token, usize> {
        let mut heights = IndexMap::new();
        loop {
            let mut changed = false;
            for (&token, shape) in &self.shapes {
                let Some(height) = self.shape_height(&heights, shape) else {
                    continue;
                };
                if heights.get(&token).map_or(true, |&old| height < old) {
                    heights.insert(token, height);
                    changed = true;
                }
            }
            if !changed {
                return heights;
            }
        }
    }

    fn height_in(&self, heights: &IndexMap<Token, usize>, token: Token) -> Option<usize> {
        if self.shapes.contains_key(&token) {
            heights.get(&token).copied()
        } else {
            Some(1)
        }
    }

    fn shape_height(&self, heights: &IndexMap<Token, usize>, shape: &Shape) -> Option<usize> {
        let lowest = |choices: &[Token]| {
            choices
                .iter()
                .filter_map(|&c| self.height_in(heights, c))
                .min()
        };
        match shape {
            Shape::Leaf => Some(1),
            Shape::Fields(fields) => fields
                .iter()
                .try_fold(0, |deepest, field| {
                    lowest(&field.choices).map(|h| deepest.max(h))
                })
                .map(|h| h + 1),
            Shape::Sequence { min: 0, .. } => Some(1),
            Shape::Sequence { choices, .. } => lowest(choices).map(|h| h + 1),
        }
    }

    fn check_node(&self, node: &Node, at: &str) -> Result<(), WfError> {
        if node.is_error() {
            return Ok(());
        }
        let token = node.token();
        match self.shapes.get(&token) {
            None | Some(Shape::Leaf) => {
                if !node.is_empty() {
                    return Err(WfError::UnexpectedChildren {
                        at: at.to_string(),
                        token,
                        found: node.len(),
                    });
                }
            }
            Some(Shape::Fields(fields)) => {
                if node.len() != fields.len() {
                    return Err(WfError::Arity {
                        at: at.to_string(),
                        token,
                        expected: fields.len(),
                        found: node.len(),
                    });
                }
                for (i, (child, field)) in node.children().iter().zip(fields).enumerate() {
                    self.check_child(token, &field.choices, child, i, at)?;
                }
            }
            Some(Shape::Sequence { choices, min, max }) => {
                let found = node.len();
                if found < *min || max.is_some_and(|max| found > max) {
                    return Err(WfError::ChildCount {
                        at: at.to_string(),
                        token,
                        found,
                        min: *min,
                        max: *max,
                    });
                }
                for (i, child) in node.children().iter().enumerate() {
                    self.check_child(token, choices, child, i, at)?;
                }
            }
        }
        Ok(())
    }

    fn check_child(
        &self,
        parent: Token,
        choices: &[Token],
        child: &Node,
        index: usize,
        at: &str,
    ) -> Result<(), WfError> {
        if child.is_error() {
            return Ok(());
        }
        let at = format!("{at}/{}[{index}]", child.token());
        if !choices.contains(&child.token()) {
            return Err(WfError::UnexpectedToken {
                at,
                parent,
                found: child.token(),
                expected: choices.to_vec(),
            });
        }
        self.check_node(child, &at)
    }

    fn binding_field_index(&self, node: &Node, field: Token) -> Option<usize> {
        Schema::field_index(self, node.token(), field)
            .filter(|&i| i < node.len())
            .or_else(|| node.children().iter().position(|c| c.is(field)))
    }

    fn collect_bindings(
        &self,
        node: &Node,
        path: &mut Vec<usize>,
        open: &mut Vec<usize>,
        tables: &mut Vec<ScopeTable>,
    ) -> Result<(), WfError> {
        if node.is_error() {
            return Ok(());
        }
        let token = node.token();

        if let Some(binding) = self.bindings.get(&token) {
            let index = self.binding_field_index(node, binding.field).ok_or(
                WfError::MissingBindingField {
                    token,
                    field: binding.field,
                },
            )?;
            let name = node.children()[index].text().to_string();
            let Some(&scope) = open.last() else {
                return Err(WfError::UnscopedBinding { token, name });
            };
            let table = &mut tables[scope];
            if table.symtab.contains(&name) && !binding.shadowing {
                return Err(WfError::DuplicateBinding {
                    name,
                    scope: table.token,
                });
            }
            let relative = path[table.path.len()..].to_vec();
            table.symtab.insert(name, relative);
        }

        let opens_scope = self.scopes.contains(&token);
        if opens_scope {
            open.push(tables.len());
            tables.push(ScopeTable {
                path: path.clone(),
                token,
                symtab: SymbolTable::default(),
            });
        }

        for (i, child) in node.children().iter().enumerate() {
            path.push(i);
            let result = self.collect_bindings(child, path, open, tables);
            path.pop();
            result?;
        }

        if opens_scope {
            open.pop();
        }
        Ok(())
    }
}

struct ScopeTable {
    path: Vec<usize>,
    token: Token,
    symtab: SymbolTable,
}

struct Generation<'a> {
    wf: &'a Wellformed,
    heights: &'a IndexMap<Token, usize>,
    generators: &'a Generators,
    rng: SmallRng,
}

impl Generation<'_> {
    fn viable(&self, choices: &[Token], budget: usize) -> Vec<Token> {
        choices
            .iter()
            .copied()
            .filter(|&c| self.wf.height_in(self.heights, c).is_some_and(|h| h <= budget))
            .collect()
    }

    /// A tree rooted at `token` no deeper than `budget`. The caller ensures
    /// `token` fits.
    fn node(&mut self, token: Token, budget: usize) -> Node {
        let wf = self.wf;
        let inner = budget.saturating_sub(1);
        match wf.shapes.get(&token) {
            None | Some(Shape::Leaf) => {
                let text = self.generators.generate(token, &mut self.rng);
                Node::leaf(token, text)
            }
            Some(Shape::Fields(fields)) => {
                let mut node = Node::new(token);
                for field in fields {
                    let viable = self.viable(&field.choices, inner);
                    if let Some(&choice) = viable.choose(&mut self.rng) {
                        let child = self.node(choice, inner);
                        node.push(child);
                    }
                }
                node
            }
            Some(Shape::Sequence { choices, min, max }) => {
                let mut node = Node::new(token);
                let viable = self.viable(choices, inner);
                if viable.is_empty() {
                    return node;
                }
                let count = match max {
                    Some(max) => self.rng.gen_range(*min..=(*max).max(*min)),
                    None => {
                        let mut extra = 0;
                        while extra < MAX_SEQUENCE_EXTRA && self.rng.gen_bool(0.5) {
                            extra += 1;
                        }
                        min + extra
                    }
                };
                for _ in 0..count {
                    if let Some(&choice) = viable.choose(&mut self.rng) {
                        let child = self.node(choice, inner);
                        node.push(child);
                    }
                }
                node
            }
        }
    }
}

impl Schema for Wellformed {
    fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    fn gen(
        &self,
        root: Token,
        generators: &Generators,
        seed: u64,
        max_depth: usize,
    ) -> Result<Node, WfError> {
        let heights = self.heights();
        let needed = self.height_in(&heights, root);
        if !needed.is_some_and(|h| h <= max_depth) {
            return Err(WfError::DepthBound {
                token: root,
                needed,
                max_depth,
            });
        }

        let mut generation = Generation {
            wf: self,
            heights: &heights,
            generators,
            rng: SmallRng::seed_from_u64(seed),
        };
        Ok(generation.node(root, max_depth))
    }

    fn check(&self, node: &Node) -> Result<(), WfError> {
        self.check_node(node, node.token().name())
    }

    fn build_st(&self, node: &mut Node) -> Result<(), WfError> {
        node.clear_symtabs();
        let mut tables = Vec::new();
        self.collect_bindings(node, &mut Vec::new(), &mut Vec::new(), &mut tables)?;
        for table in tables {
            if let Some(scope) = node.at_path_mut(&table.path) {
                scope.set_symtab(table.symtab);
            }
        }
        Ok(())
    }

    fn field_index(&self, parent: Token, field: Token) -> Option<usize> {
        match self.shapes.get(&parent)? {
            Shape::Fields(fields) => fields.iter().position(|f| f.name == field),
            _ => None,
        }
    }
}
