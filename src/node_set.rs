//! The jQuery-style node set
//!
//! A [`NodeSet`] is an ordered list of [`NodeHandle`]s plus an optional,
//! shared [`ParseOptions`] bag and the [`Parser`] it came from. Queries
//! (`find`, `children`, `filter`) build new sets; mutations (`append`,
//! `empty`, `remove`, `set_text`, `set_html`) change the live trees the
//! handles point into and return the same set for chaining.
//!
//! # Aliasing
//!
//! Handles do not own their nodes. Two sets over the same tree see each
//! other's mutations, and `Clone` on a `NodeSet` aliases the same nodes.
//! Use [`NodeSet::deep_clone`] for an independent copy.
//!
//! # Examples
//!
//! ```rust
//! use htmlquery::Parser;
//!
//! let parser = Parser::new();
//! let div = parser.parse("<div><p>a</p><p>b</p></div>", None).unwrap();
//!
//! assert_eq!(div.find("p").unwrap().get_text().unwrap(), "ab");
//!
//! div.set_html("<span>c</span>").unwrap();
//! let spans = div.find("span").unwrap();
//! assert_eq!(spans.len(), 1);
//! assert_eq!(spans.get_text().unwrap(), "c");
//! ```

use std::fmt;
use std::rc::Rc;
use std::slice;

use crate::dom::{Document, NodeHandle, parse_selector};
use crate::error::{DomError, Result};
use crate::options::ParseOptions;
use crate::parser::Parser;

/// How a [`NodeSet::filter`] predicate is called
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// The predicate gets each node
    #[default]
    Value,
    /// The predicate gets each position
    Key,
    /// The predicate gets each position and node
    Both,
}

/// Argument handed to a [`NodeSet::filter`] predicate
#[derive(Debug, Clone, Copy)]
pub enum FilterArg<'a> {
    Value(&'a NodeHandle),
    Key(usize),
    Both(usize, &'a NodeHandle),
}

impl FilterMode {
    fn arg(self, index: usize, node: &NodeHandle) -> FilterArg<'_> {
        match self {
            FilterMode::Value => FilterArg::Value(node),
            FilterMode::Key => FilterArg::Key(index),
            FilterMode::Both => FilterArg::Both(index, node),
        }
    }
}

/// Something [`NodeSet::append`] can insert
#[derive(Debug, Clone)]
pub enum Appendable {
    /// Markup, parsed with the target set's options
    Markup(String),
    /// An existing node, copied
    Node(NodeHandle),
    /// Every node of a set, copied
    Set(NodeSet),
}

impl From<&str> for Appendable {
    fn from(markup: &str) -> Self {
        Appendable::Markup(markup.to_string())
    }
}

impl From<String> for Appendable {
    fn from(markup: String) -> Self {
        Appendable::Markup(markup)
    }
}

impl From<NodeHandle> for Appendable {
    fn from(node: NodeHandle) -> Self {
        Appendable::Node(node)
    }
}

impl From<&NodeHandle> for Appendable {
    fn from(node: &NodeHandle) -> Self {
        Appendable::Node(node.clone())
    }
}

impl From<NodeSet> for Appendable {
    fn from(set: NodeSet) -> Self {
        Appendable::Set(set)
    }
}

impl From<&NodeSet> for Appendable {
    fn from(set: &NodeSet) -> Self {
        Appendable::Set(set.clone())
    }
}

/// What [`Parser::init`] queries
#[derive(Debug, Clone)]
pub enum Scope<'a> {
    Node(NodeHandle),
    Set(&'a NodeSet),
}

impl From<NodeHandle> for Scope<'_> {
    fn from(node: NodeHandle) -> Self {
        Scope::Node(node)
    }
}

impl From<&NodeHandle> for Scope<'_> {
    fn from(node: &NodeHandle) -> Self {
        Scope::Node(node.clone())
    }
}

impl<'a> From<&'a NodeSet> for Scope<'a> {
    fn from(set: &'a NodeSet) -> Self {
        Scope::Set(set)
    }
}

/// Computed read-only view of a set
#[derive(Debug, Clone)]
pub struct NodeSetView {
    /// Same as [`NodeSet::get_html`]
    pub html: String,
    /// Same as [`NodeSet::get_text`]
    pub text: String,
    /// The wrapped handles
    pub node: Vec<NodeHandle>,
}

/// An ordered collection of node handles with jQuery-style operations
#[derive(Clone)]
pub struct NodeSet {
    nodes: Vec<NodeHandle>,
    options: Option<Rc<ParseOptions>>,
    parser: Parser,
}

impl NodeSet {
    pub(crate) fn from_parts(
        nodes: Vec<NodeHandle>,
        options: Option<Rc<ParseOptions>>,
        parser: Parser,
    ) -> Self {
        Self {
            nodes,
            options,
            parser,
        }
    }

    /// A new set over `nodes` sharing this set's options and parser
    fn derive(&self, nodes: Vec<NodeHandle>) -> Self {
        Self::from_parts(nodes, self.options.clone(), self.parser.clone())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[NodeHandle] {
        &self.nodes
    }

    pub fn iter(&self) -> slice::Iter<'_, NodeHandle> {
        self.nodes.iter()
    }

    /// All wrapped handles
    pub fn to_vec(&self) -> Vec<NodeHandle> {
        self.nodes.clone()
    }

    /// The handle at `index`
    ///
    /// # Errors
    ///
    /// [`DomError::ChildNotFound`] when `index` is out of range.
    pub fn get(&self, index: usize) -> Result<NodeHandle> {
        self.nodes
            .get(index)
            .cloned()
            .ok_or(DomError::ChildNotFound {
                index,
                len: self.nodes.len(),
            })
    }

    pub fn options(&self) -> Option<&ParseOptions> {
        self.options.as_deref()
    }

    /// Replace the options used for markup parsed on behalf of this set
    pub fn set_options(&mut self, options: ParseOptions) -> &mut Self {
        self.options = Some(Rc::new(options));
        self
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    /// Charset of the first node's tree, or the parser's default
    pub fn charset(&self) -> &str {
        self.nodes
            .first()
            .map(|node| node.document().charset())
            .unwrap_or_else(|| self.parser.default_charset())
    }

    /// Descendants of every node matching `selector`
    ///
    /// Matches are concatenated in node order, then document order within
    /// each node. Duplicates are kept.
    pub fn find(&self, selector: &str) -> Result<NodeSet> {
        let selector = parse_selector(selector)?;
        let mut found = Vec::new();
        for node in &self.nodes {
            found.extend(node.select(&selector)?);
        }
        Ok(self.derive(found))
    }

    /// Direct children of every node, in node order
    pub fn children(&self) -> Result<NodeSet> {
        let mut children = Vec::new();
        for node in &self.nodes {
            children.extend(node.children()?);
        }
        Ok(self.derive(children))
    }

    /// Deep-copy the set, then keep the copies `predicate` accepts
    ///
    /// `mode` picks what the predicate is given for each node.
    pub fn filter<F>(&self, mode: FilterMode, mut predicate: F) -> Result<NodeSet>
    where
        F: FnMut(FilterArg<'_>) -> bool,
    {
        let mut copy = self.deep_clone()?;
        let mut kept = Vec::with_capacity(copy.nodes.len());
        for (index, node) in copy.nodes.iter().enumerate() {
            if predicate(mode.arg(index, node)) {
                kept.push(node.clone());
            }
        }
        copy.nodes = kept;
        Ok(copy)
    }

    /// Copy every node, with its subtree, into a new independent tree
    ///
    /// A wrapped document or fragment root gets a detached tree of its
    /// own. The copy serializes to the same markup. Mutating it never affects
    /// this set.
    pub fn deep_clone(&self) -> Result<NodeSet> {
        let document = Document::detached(self.charset());
        let root = document.root();
        let mut copies = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if node.kind()?.is_root() {
                copies.push(node.clone_root()?);
            } else {
                copies.push(root.append_tree(&node.snapshot()?)?);
            }
        }
        Ok(self.derive(copies))
    }

    /// Concatenated text of every node
    pub fn get_text(&self) -> Result<String> {
        let mut text = String::new();
        for node in &self.nodes {
            text.push_str(&node.text()?);
        }
        Ok(text)
    }

    /// Replace the children of every node with one text node
    pub fn set_text(&self, text: &str) -> Result<&Self> {
        self.empty()?;
        for node in &self.nodes {
            node.append_text(text)?;
        }
        Ok(self)
    }

    /// Markup of every node, concatenated
    ///
    /// This is the markup the nodes would produce as the children of a
    /// detached root.
    pub fn get_html(&self) -> Result<String> {
        let mut html = String::new();
        for node in &self.nodes {
            html.push_str(&node.outer_html()?);
        }
        Ok(html)
    }

    /// Replace the children of every node with the parsed `markup`
    pub fn set_html(&self, markup: &str) -> Result<&Self> {
        self.empty()?;
        self.append([markup])
    }

    /// Append a copy of each item to every node
    ///
    /// Markup is parsed with this set's options. Items are inserted in the
    /// order given; every target gets its own copy.
    pub fn append<I, T>(&self, items: I) -> Result<&Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<Appendable>,
    {
        let mut subtrees = Vec::new();
        for item in items {
            let set = match item.into() {
                Appendable::Markup(markup) => self.parser.parse_shared(&markup, self.options.clone())?,
                Appendable::Node(node) => self.derive(vec![node]),
                Appendable::Set(set) => set,
            };
            for node in &set.nodes {
                subtrees.push(node.snapshot()?);
            }
        }

        for target in &self.nodes {
            for subtree in &subtrees {
                target.append_tree(subtree)?;
            }
        }

        tracing::trace!(
            targets = self.nodes.len(),
            inserted = subtrees.len(),
            "appended to node set"
        );
        Ok(self)
    }

    /// Detach every child of every node
    pub fn empty(&self) -> Result<&Self> {
        for child in self.children()?.nodes {
            child.delete()?;
        }
        Ok(self)
    }

    /// Detach nodes from their trees
    ///
    /// With a selector, the matching descendants are removed and this
    /// set's own nodes stay. Without one, every wrapped node is removed.
    pub fn remove(&self, selector: Option<&str>) -> Result<&Self> {
        match selector {
            Some(selector) => {
                self.find(selector)?.remove(None)?;
            }
            None => {
                for node in &self.nodes {
                    node.delete()?;
                }
                tracing::trace!(removed = self.nodes.len(), "removed node set");
            }
        }
        Ok(self)
    }

    /// Computed `html`, `text` and `node` values
    pub fn view(&self) -> Result<NodeSetView> {
        Ok(NodeSetView {
            html: self.get_html()?,
            text: self.get_text()?,
            node: self.to_vec(),
        })
    }
}

impl fmt::Display for NodeSet {
    /// Writes [`NodeSet::get_html`]
    ///
    /// Nodes that fail to serialize are skipped rather than failing the
    /// whole write.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            match node.outer_html() {
                Ok(html) => f.write_str(&html)?,
                Err(e) => tracing::warn!(error = %e, "Skipping node that failed to serialize"),
            }
        }
        Ok(())
    }
}

impl fmt::Debug for NodeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeSet")
            .field("nodes", &self.nodes)
            .field("options", &self.options)
            .finish()
    }
}

impl<'a> IntoIterator for &'a NodeSet {
    type Item = &'a NodeHandle;
    type IntoIter = slice::Iter<'a, NodeHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}
