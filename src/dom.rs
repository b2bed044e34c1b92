//! Shared documents and node handles
//!
//! A [`Document`] owns one parsed `scraper::Html` tree behind an
//! `Rc<RefCell<_>>`. A [`NodeHandle`] is a `(Document, NodeId)` pair: it
//! does not own the node, and cloning it aliases the same node. Every
//! mutation made through one handle is visible through all other handles
//! into the same tree.
//!
//! The handle methods are the small collaborator surface the node-set
//! facade is built on: `children`, `find`, `add_child`, `delete`, `text`,
//! `inner_html` and `outer_html`.
//!
//! # Examples
//!
//! ```rust
//! use htmlquery::dom::Document;
//! use scraper::Html;
//!
//! let doc = Document::new(Html::parse_fragment("<ul><li>a</li><li>b</li></ul>"), "UTF-8");
//! let items = doc.root().find("li").unwrap();
//! assert_eq!(items.len(), 2);
//!
//! items[0].delete().unwrap();
//! assert_eq!(doc.root().text().unwrap(), "b");
//! ```

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use ego_tree::{NodeId, NodeMut, NodeRef, Tree};
use html5ever::tendril::StrTendril;
use scraper::node::Text;
use scraper::{ElementRef, Html, Node, Selector};

use crate::charset::DEFAULT_CHARSET;
use crate::error::{DomError, Result};
use crate::serialize;

/// The kind of a tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Fragment,
    Doctype,
    Comment,
    Text,
    Element,
    ProcessingInstruction,
}

impl NodeKind {
    /// Classify a scraper node
    ///
    /// Fails with [`DomError::UnknownChildType`] for node variants this
    /// crate does not know how to handle.
    pub fn of(node: &Node) -> Result<Self> {
        match node {
            Node::Document => Ok(NodeKind::Document),
            Node::Fragment => Ok(NodeKind::Fragment),
            Node::Doctype(_) => Ok(NodeKind::Doctype),
            Node::Comment(_) => Ok(NodeKind::Comment),
            Node::Text(_) => Ok(NodeKind::Text),
            Node::Element(_) => Ok(NodeKind::Element),
            Node::ProcessingInstruction(_) => Ok(NodeKind::ProcessingInstruction),
            #[allow(unreachable_patterns)]
            other => Err(DomError::UnknownChildType(format!("{other:?}"))),
        }
    }

    /// Whether a node of this kind can be placed under another node
    pub fn is_insertable(self) -> bool {
        !matches!(self, NodeKind::Document | NodeKind::Fragment)
    }

    /// Whether a node of this kind can hold children
    pub fn is_container(self) -> bool {
        matches!(self, NodeKind::Document | NodeKind::Fragment | NodeKind::Element)
    }

    /// Whether this is a document or fragment root
    pub fn is_root(self) -> bool {
        !self.is_insertable()
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Document => "document",
            NodeKind::Fragment => "fragment",
            NodeKind::Doctype => "doctype",
            NodeKind::Comment => "comment",
            NodeKind::Text => "text",
            NodeKind::Element => "element",
            NodeKind::ProcessingInstruction => "processing instruction",
        };
        f.write_str(name)
    }
}

struct DocumentInner {
    html: RefCell<Html>,
    charset: String,
}

/// A parsed tree shared by every handle that points into it
#[derive(Clone)]
pub struct Document {
    inner: Rc<DocumentInner>,
}

impl Document {
    /// Take ownership of a parsed tree
    pub fn new(html: Html, charset: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(DocumentInner {
                html: RefCell::new(html),
                charset: charset.into(),
            }),
        }
    }

    /// An empty tree whose root is a bare fragment node
    pub fn detached(charset: impl Into<String>) -> Self {
        Self::new(Html::new_fragment(), charset)
    }

    /// Handle to the tree's root node
    pub fn root(&self) -> NodeHandle {
        let id = self.inner.html.borrow().tree.root().id();
        self.handle(id)
    }

    /// Charset the markup was decoded from
    pub fn charset(&self) -> &str {
        &self.inner.charset
    }

    /// Parse errors html5ever reported while building the tree
    pub fn parse_errors(&self) -> Vec<String> {
        self.inner
            .html
            .borrow()
            .errors
            .iter()
            .map(|e| e.to_string())
            .collect()
    }

    /// Whether both values refer to the same tree
    pub fn ptr_eq(&self, other: &Document) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn handle(&self, id: NodeId) -> NodeHandle {
        NodeHandle {
            doc: self.clone(),
            id,
        }
    }

    fn borrow(&self) -> Ref<'_, Html> {
        self.inner.html.borrow()
    }

    fn borrow_mut(&self) -> RefMut<'_, Html> {
        self.inner.html.borrow_mut()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::detached(DEFAULT_CHARSET)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("charset", &self.inner.charset)
            .field("nodes", &self.borrow().tree.nodes().count())
            .finish()
    }
}

/// A non-owning reference to one node of a [`Document`]
#[derive(Clone)]
pub struct NodeHandle {
    doc: Document,
    id: NodeId,
}

impl NodeHandle {
    /// The tree this node lives in
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Arena id of the node within its tree
    pub fn id(&self) -> NodeId {
        self.id
    }

    fn with_node<T>(&self, f: impl FnOnce(NodeRef<'_, Node>) -> T) -> Result<T> {
        let html = self.doc.borrow();
        let node = html.tree.get(self.id).ok_or(DomError::NotLoaded)?;
        Ok(f(node))
    }

    pub fn kind(&self) -> Result<NodeKind> {
        self.with_node(|node| NodeKind::of(node.value()))?
    }

    /// Local tag name, for element nodes
    pub fn tag_name(&self) -> Result<Option<String>> {
        self.with_node(|node| node.value().as_element().map(|e| e.name().to_string()))
    }

    /// Attribute value, for element nodes
    pub fn attr(&self, name: &str) -> Result<Option<String>> {
        self.with_node(|node| {
            node.value()
                .as_element()
                .and_then(|e| e.attr(name))
                .map(str::to_string)
        })
    }

    pub fn parent(&self) -> Result<Option<NodeHandle>> {
        let parent = self.with_node(|node| node.parent().map(|p| p.id()))?;
        Ok(parent.map(|id| self.doc.handle(id)))
    }

    /// Whether the node still hangs off a parent
    pub fn is_attached(&self) -> Result<bool> {
        self.with_node(|node| node.parent().is_some())
    }

    /// Direct children, in document order
    pub fn children(&self) -> Result<Vec<NodeHandle>> {
        let ids: Vec<NodeId> = self.with_node(|node| node.children().map(|c| c.id()).collect())?;
        Ok(ids.into_iter().map(|id| self.doc.handle(id)).collect())
    }

    /// Descendant elements matching a CSS selector, in document order
    ///
    /// The node itself is never part of the result.
    pub fn find(&self, selector: &str) -> Result<Vec<NodeHandle>> {
        self.select(&parse_selector(selector)?)
    }

    pub(crate) fn select(&self, selector: &Selector) -> Result<Vec<NodeHandle>> {
        let ids: Vec<NodeId> = self.with_node(|node| {
            node.descendants()
                .skip(1)
                .filter_map(ElementRef::wrap)
                .filter(|element| selector.matches(element))
                .map(|element| element.id())
                .collect()
        })?;
        Ok(ids.into_iter().map(|id| self.doc.handle(id)).collect())
    }

    /// Concatenated text of the node and all its descendants
    pub fn text(&self) -> Result<String> {
        self.with_node(|node| {
            node.descendants()
                .filter_map(|n| n.value().as_text())
                .map(|t| &**t)
                .collect()
        })
    }

    pub fn outer_html(&self) -> Result<String> {
        Ok(self.with_node(serialize::outer_html)??)
    }

    pub fn inner_html(&self) -> Result<String> {
        Ok(self.with_node(serialize::inner_html)??)
    }

    /// Append a deep copy of `child` as the last child of this node
    ///
    /// Returns a handle to the inserted copy. `child` itself is left
    /// where it is.
    pub fn add_child(&self, child: &NodeHandle) -> Result<NodeHandle> {
        let subtree = child.snapshot()?;
        self.append_tree(&subtree)
    }

    /// Append a new text node as the last child of this node
    pub fn append_text(&self, text: &str) -> Result<NodeHandle> {
        self.ensure_container()?;
        let mut html = self.doc.borrow_mut();
        let mut node = html.tree.get_mut(self.id).ok_or(DomError::NotLoaded)?;
        let id = node
            .append(Node::Text(Text {
                text: StrTendril::from(text),
            }))
            .id();
        Ok(self.doc.handle(id))
    }

    /// Detach the node from its parent
    ///
    /// The node and its subtree stay valid and can still be read through
    /// existing handles.
    pub fn delete(&self) -> Result<()> {
        let mut html = self.doc.borrow_mut();
        let mut node = html.tree.get_mut(self.id).ok_or(DomError::NotLoaded)?;
        node.detach();
        Ok(())
    }

    /// Whether both handles refer to the same node of the same tree
    pub fn same_node(&self, other: &NodeHandle) -> bool {
        self.id == other.id && self.doc.ptr_eq(&other.doc)
    }

    /// Copy a document or fragment root into a new detached tree
    ///
    /// The children are copied under the new tree's root, which is
    /// returned. The copy serializes like this root.
    pub(crate) fn clone_root(&self) -> Result<NodeHandle> {
        let document = Document::detached(self.doc.charset());
        let root = document.root();
        for child in self.children()? {
            root.add_child(&child)?;
        }
        Ok(root)
    }

    fn ensure_container(&self) -> Result<()> {
        let kind = self.kind()?;
        if !kind.is_container() {
            return Err(DomError::UnknownChildType(kind.to_string()));
        }
        Ok(())
    }

    /// Owned deep copy of this node's subtree
    pub(crate) fn snapshot(&self) -> Result<Tree<Node>> {
        self.with_node(|node| {
            let kind = NodeKind::of(node.value())?;
            if !kind.is_insertable() {
                return Err(DomError::UnknownChildType(kind.to_string()));
            }
            let mut tree = Tree::new(node.value().clone());
            graft(tree.root_mut(), node);
            Ok(tree)
        })?
    }

    /// Append a copy of `subtree` as the last child of this node
    pub(crate) fn append_tree(&self, subtree: &Tree<Node>) -> Result<NodeHandle> {
        self.ensure_container()?;
        let mut html = self.doc.borrow_mut();
        let mut target = html.tree.get_mut(self.id).ok_or(DomError::NotLoaded)?;
        let source = subtree.root();
        let copy = target.append(source.value().clone());
        let id = copy.id();
        graft(copy, source);
        Ok(self.doc.handle(id))
    }
}

impl PartialEq for NodeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.same_node(other)
    }
}

impl Eq for NodeHandle {}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.kind().ok();
        let name = self.tag_name().ok().flatten();
        f.debug_struct("NodeHandle")
            .field("id", &self.id)
            .field("kind", &kind)
            .field("name", &name)
            .finish()
    }
}

/// Copy every child of `source` (recursively) under `parent`
fn graft(mut parent: NodeMut<'_, Node>, source: NodeRef<'_, Node>) {
    for child in source.children() {
        let copy = parent.append(child.value().clone());
        graft(copy, child);
    }
}

pub(crate) fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| DomError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(markup: &str) -> Document {
        Document::new(Html::parse_fragment(markup), DEFAULT_CHARSET)
    }

    #[test]
    fn test_find_excludes_self_and_keeps_order() {
        let d = doc("<div id=\"a\"><div id=\"b\"><div id=\"c\"></div></div></div>");
        let outer = d.root().find("#a").expect("find")[0].clone();
        let ids: Vec<_> = outer
            .find("div")
            .expect("find")
            .iter()
            .map(|h| h.attr("id").expect("attr").unwrap_or_default())
            .collect();
        assert_eq!(ids, ["b", "c"]);
    }

    #[test]
    fn test_find_on_text_node_is_empty() {
        let d = doc("plain");
        let text = d.root().find("*").expect("find");
        // only the fragment's <html> context element
        assert_eq!(text.len(), 1);
        let text_node = text[0].children().expect("children")[0].clone();
        assert_eq!(text_node.kind().expect("kind"), NodeKind::Text);
        assert!(text_node.find("*").expect("find").is_empty());
    }

    #[test]
    fn test_invalid_selector() {
        let d = doc("<p>x</p>");
        let err = d.root().find("p[").unwrap_err();
        assert!(matches!(err, DomError::InvalidSelector { .. }));
    }

    #[test]
    fn test_add_child_copies_across_documents() {
        let target = doc("<div></div>");
        let source = doc("<b>x</b>");
        let div = target.root().find("div").expect("find")[0].clone();
        let b = source.root().find("b").expect("find")[0].clone();

        let inserted = div.add_child(&b).expect("add child");
        assert!(!inserted.same_node(&b));
        assert_eq!(div.inner_html().expect("html"), "<b>x</b>");
        assert!(b.is_attached().expect("attached"));
    }

    #[test]
    fn test_add_child_into_own_descendant() {
        let d = doc("<div><span>s</span></div>");
        let div = d.root().find("div").expect("find")[0].clone();
        let span = d.root().find("span").expect("find")[0].clone();

        span.add_child(&div).expect("add child");
        assert_eq!(
            div.outer_html().expect("html"),
            "<div><span>s<div><span>s</span></div></span></div>"
        );
    }

    #[test]
    fn test_delete_detaches_but_handle_stays_readable() {
        let d = doc("<p>a</p><p>b</p>");
        let first = d.root().find("p").expect("find")[0].clone();
        first.delete().expect("delete");

        assert!(!first.is_attached().expect("attached"));
        assert_eq!(first.text().expect("text"), "a");
        assert_eq!(d.root().find("p").expect("find").len(), 1);
    }

    #[test]
    fn test_root_cannot_be_inserted() {
        let d = doc("<p>a</p>");
        let p = d.root().find("p").expect("find")[0].clone();
        let err = p.add_child(&doc("x").root()).unwrap_err();
        assert!(matches!(err, DomError::UnknownChildType(_)));
    }

    #[test]
    fn test_leaf_nodes_reject_children() {
        let d = doc("<p>a</p>t");
        let p = d.root().find("p").expect("find")[0].clone();
        let text = p.children().expect("children")[0].clone();

        let err = text.append_text("x").unwrap_err();
        assert!(matches!(err, DomError::UnknownChildType(ref kind) if kind == "text"));
        let err = text.add_child(&p).unwrap_err();
        assert!(matches!(err, DomError::UnknownChildType(_)));
        assert_eq!(p.outer_html().expect("html"), "<p>a</p>");
    }

    #[test]
    fn test_clone_root_copies_children() {
        let d = doc("<p>a</p>");
        let copy = d.root().clone_root().expect("clone root");
        assert!(!copy.document().ptr_eq(&d));
        assert_eq!(copy.inner_html().expect("html"), d.root().inner_html().expect("html"));
    }

    #[test]
    fn test_append_text_is_escaped_on_output() {
        let d = doc("<p></p>");
        let p = d.root().find("p").expect("find")[0].clone();
        p.append_text("1 < 2").expect("append");
        assert_eq!(p.outer_html().expect("html"), "<p>1 &lt; 2</p>");
        assert_eq!(p.text().expect("text"), "1 < 2");
    }

    #[test]
    fn test_handles_alias_same_node() {
        let d = doc("<i>x</i>");
        let a = d.root().find("i").expect("find")[0].clone();
        let b = d.root().find("i").expect("find")[0].clone();
        assert_eq!(a, b);
        assert_ne!(a, doc("<i>x</i>").root().find("i").expect("find")[0]);
    }
}
