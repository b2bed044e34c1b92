//! Markup serialization for single tree nodes
//!
//! scraper only serializes whole documents and elements. Node sets can
//! also hold text, comment and doctype nodes, so this module wraps any
//! `NodeRef` in an html5ever `Serialize` impl and hands elements back to
//! scraper's own implementation.

use std::io;

use ego_tree::NodeRef;
use html5ever::serialize::{Serialize, SerializeOpts, Serializer, TraversalScope, serialize};
use scraper::{ElementRef, Node};

struct SerializableNode<'a>(NodeRef<'a, Node>);

impl Serialize for SerializableNode<'_> {
    fn serialize<S>(&self, serializer: &mut S, traversal_scope: TraversalScope) -> io::Result<()>
    where
        S: Serializer,
    {
        match traversal_scope {
            TraversalScope::IncludeNode => write_node(self.0, serializer),
            TraversalScope::ChildrenOnly(_) => match ElementRef::wrap(self.0) {
                Some(element) => element.serialize(serializer, TraversalScope::ChildrenOnly(None)),
                None => {
                    for child in self.0.children() {
                        write_node(child, serializer)?;
                    }
                    Ok(())
                }
            },
        }
    }
}

fn write_node<S: Serializer>(node: NodeRef<'_, Node>, serializer: &mut S) -> io::Result<()> {
    match node.value() {
        Node::Element(_) => match ElementRef::wrap(node) {
            Some(element) => element.serialize(serializer, TraversalScope::IncludeNode),
            None => Ok(()),
        },
        Node::Text(text) => serializer.write_text(text),
        Node::Comment(comment) => serializer.write_comment(comment),
        Node::Doctype(doctype) => serializer.write_doctype(doctype.name()),
        Node::ProcessingInstruction(pi) => {
            serializer.write_processing_instruction(&pi.target, &pi.data)
        }
        Node::Document | Node::Fragment => {
            for child in node.children() {
                write_node(child, serializer)?;
            }
            Ok(())
        }
        #[allow(unreachable_patterns)]
        other => Err(io::Error::other(format!("unknown child type: {other:?}"))),
    }
}

fn to_markup(node: NodeRef<'_, Node>, traversal_scope: TraversalScope) -> io::Result<String> {
    let mut buf = Vec::new();
    let opts = SerializeOpts {
        traversal_scope,
        ..Default::default()
    };
    serialize(&mut buf, &SerializableNode(node), opts)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Markup of `node` including the node itself
pub(crate) fn outer_html(node: NodeRef<'_, Node>) -> io::Result<String> {
    to_markup(node, TraversalScope::IncludeNode)
}

/// Markup of the children of `node`
pub(crate) fn inner_html(node: NodeRef<'_, Node>) -> io::Result<String> {
    to_markup(node, TraversalScope::ChildrenOnly(None))
}
