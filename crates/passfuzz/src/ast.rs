//! Tree model: tokens, source locations and owned nodes.

use std::fmt;
use std::sync::Arc;

use crate::wf::context;

/// The tag identifying a node's kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(&'static str);

impl Token {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Default root of every pipeline.
pub const TOP: Token = Token::new("top");
/// Marks a subtree a pass reported as erroneous.
pub const ERROR: Token = Token::new("error");
/// Message leaf inside an [`ERROR`] node.
pub const ERROR_MSG: Token = Token::new("errormsg");
/// Offending subtree inside an [`ERROR`] node.
pub const ERROR_AST: Token = Token::new("errorast");

/// A named piece of source text.
#[derive(Debug, PartialEq, Eq)]
pub struct Source {
    origin: String,
    contents: String,
}

impl Source {
    pub fn new(origin: impl Into<String>, contents: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            origin: origin.into(),
            contents: contents.into(),
        })
    }

    /// Source for text produced by a generator rather than read from a file.
    pub fn synthetic(contents: impl Into<String>) -> Arc<Self> {
        Self::new("<generated>", contents)
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// Zero-based line and column of a byte offset.
    pub fn linecol(&self, pos: usize) -> (usize, usize) {
        let pos = pos.min(self.contents.len());
        let before = &self.contents.as_bytes()[..pos];
        let line = before.iter().filter(|&&b| b == b'\n').count();
        let line_start = before
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1);
        (line, pos - line_start)
    }

    fn line_bounds(&self, pos: usize) -> (usize, usize) {
        let bytes = self.contents.as_bytes();
        let pos = pos.min(bytes.len());
        let start = bytes[..pos]
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1);
        let end = bytes[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(bytes.len(), |i| pos + i);
        (start, end)
    }
}

/// A span of a [`Source`]. Internal nodes usually carry an empty location.
#[derive(Clone, Default)]
pub struct Location {
    source: Option<Arc<Source>>,
    pos: usize,
    len: usize,
}

impl Location {
    pub fn new(source: Arc<Source>, pos: usize, len: usize) -> Self {
        Self {
            source: Some(source),
            pos,
            len,
        }
    }

    /// A location spanning the whole of a fresh synthetic source.
    pub fn synthetic(text: impl Into<String>) -> Self {
        let source = Source::synthetic(text);
        let len = source.contents().len();
        Self::new(source, 0, len)
    }

    pub fn source(&self) -> Option<&Arc<Source>> {
        self.source.as_ref()
    }

    /// The text covered by this location.
    pub fn view(&self) -> &str {
        match &self.source {
            Some(source) => self
                .pos
                .checked_add(self.len)
                .and_then(|end| source.contents().get(self.pos..end))
                .unwrap_or(""),
            None => "",
        }
    }

    pub fn is_empty(&self) -> bool {
        self.view().is_empty()
    }

    /// `origin:line:col`, one-based.
    pub fn origin_linecol(&self) -> String {
        match &self.source {
            Some(source) => {
                let (line, col) = source.linecol(self.pos);
                format!("{}:{}:{}", source.origin(), line + 1, col + 1)
            }
            None => "<unknown>".to_string(),
        }
    }

    /// The source line containing this location with the span underlined.
    pub fn str(&self) -> String {
        let Some(source) = &self.source else {
            return String::new();
        };
        let (start, end) = source.line_bounds(self.pos);
        let line = &source.contents()[start..end];
        let pos = self.pos.min(end);
        let indent = source.contents()[start..pos].chars().count();
        let width = source.contents()[pos..end.min(pos.saturating_add(self.len))]
            .chars()
            .count()
            .max(1);
        format!("{line}\n{}{}", " ".repeat(indent), "^".repeat(width))
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.view() == other.view()
    }
}

impl Eq for Location {}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Location({:?})", self.view())
    }
}

/// Names bound beneath a scope node, mapped to paths relative to that node.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: std::collections::HashMap<String, Vec<Vec<usize>>, ahash::RandomState>,
}

impl SymbolTable {
    pub fn insert(&mut self, name: impl Into<String>, path: Vec<usize>) {
        self.entries.entry(name.into()).or_default().push(path);
    }

    /// Paths of every definition of `name`, in tree order.
    pub fn get(&self, name: &str) -> &[Vec<usize>] {
        self.entries.get(name).map_or(&[], Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// A tree node. Each node exclusively owns its children; `clone` is deep.
#[derive(Clone, Debug)]
pub struct Node {
    token: Token,
    location: Location,
    children: Vec<Node>,
    symtab: Option<SymbolTable>,
}

impl Node {
    pub fn new(token: Token) -> Self {
        Self {
            token,
            location: Location::default(),
            children: Vec::new(),
            symtab: None,
        }
    }

    /// A childless node whose location is `text` in a synthetic source.
    pub fn leaf(token: Token, text: impl Into<String>) -> Self {
        Self::new(token).with_location(Location::synthetic(text))
    }

    /// An [`ERROR`] node carrying `message`.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ERROR).with(Self::leaf(ERROR_MSG, message))
    }

    /// An [`ERROR`] node carrying `message` and the subtree it is about.
    pub fn error_at(message: impl Into<String>, offending: Node) -> Self {
        Self::error(message).with(Self::new(ERROR_AST).with(offending))
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn with(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn token(&self) -> Token {
        self.token
    }

    pub fn is(&self, token: Token) -> bool {
        self.token == token
    }

    pub fn set_token(&mut self, token: Token) {
        self.token = token;
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn set_location(&mut self, location: Location) {
        self.location = location;
    }

    /// Shorthand for `location().view()`.
    pub fn text(&self) -> &str {
        self.location.view()
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    pub fn into_children(self) -> Vec<Node> {
        self.children
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children.get(index)
    }

    pub fn push(&mut self, child: Node) {
        self.children.push(child);
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Nesting depth; a childless node has depth 1.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(Node::depth).max().unwrap_or(0)
    }

    /// Number of nodes in this subtree.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(Node::size).sum::<usize>()
    }

    pub fn is_error(&self) -> bool {
        self.token == ERROR
    }

    /// Every [`ERROR`] node in this subtree, outermost first. Error nodes are
    /// not searched for nested errors.
    pub fn errors(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        self.collect_errors(&mut out);
        out
    }

    fn collect_errors<'a>(&'a self, out: &mut Vec<&'a Node>) {
        if self.is_error() {
            out.push(self);
            return;
        }
        for child in &self.children {
            child.collect_errors(out);
        }
    }

    pub fn has_errors(&self) -> bool {
        self.is_error() || self.children.iter().any(Node::has_errors)
    }

    /// The child in field `name`, resolved through the schemas installed in
    /// the current well-formedness context.
    pub fn field(&self, name: Token) -> Option<&Node> {
        context::field_index(self.token, name).and_then(|i| self.children.get(i))
    }

    pub fn at_path(&self, path: &[usize]) -> Option<&Node> {
        path.iter().try_fold(self, |node, &i| node.children.get(i))
    }

    pub fn at_path_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        path.iter()
            .try_fold(self, |node, &i| node.children.get_mut(i))
    }

    /// The symbol table built for this node, if it is a scope.
    pub fn symtab(&self) -> Option<&SymbolTable> {
        self.symtab.as_ref()
    }

    pub(crate) fn set_symtab(&mut self, symtab: SymbolTable) {
        self.symtab = Some(symtab);
    }

    pub(crate) fn clear_symtabs(&mut self) {
        self.symtab = None;
        for child in &mut self.children {
            child.clear_symtabs();
        }
    }

    /// Definitions of `name` in this node's symbol table.
    pub fn lookup(&self, name: &str) -> Vec<&Node> {
        self.symtab
            .as_ref()
            .map(|st| st.get(name).iter().filter_map(|p| self.at_path(p)).collect())
            .unwrap_or_default()
    }

    fn fmt_indented(&self, indent: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:indent$}({}", "", self.token, indent = indent)?;
        let text = self.text();
        if !text.is_empty() {
            write!(f, " {}:{}", text.len(), text)?;
        }
        for child in &self.children {
            writeln!(f)?;
            child.fmt_indented(indent + 2, f)?;
        }
        write!(f, ")")
    }
}

/// Structural equality: tag, text and children. Symbol tables are ignored.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
            && self.location == other.location
            && self.children == other.children
    }
}

impl Eq for Node {}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(0, f)?;
        writeln!(f)
    }
}
