//! Markup parsing and node-set construction
//!
//! A [`Parser`] is the factory every [`NodeSet`] comes from. It is built
//! once, holds the default [`ParseOptions`] and the output charset, and is
//! cheap to clone: each node set keeps a clone so that markup appended
//! later is parsed the same way.
//!
//! # Pipeline
//!
//! 1. Options are resolved: library defaults, then the parser's defaults,
//!    then the per-call options (explicit fields win at each step)
//! 2. Byte input is decoded to UTF-8 (see [`crate::charset`])
//! 3. The markup is cleaned (see [`crate::cleaner`])
//! 4. html5ever parses it as a `<body>` fragment
//! 5. Text nodes are tidied according to the whitespace options
//! 6. The resulting node set wraps the fragment's top-level nodes
//!
//! # Examples
//!
//! ```rust
//! use htmlquery::{ParseOptions, Parser};
//!
//! let parser = Parser::new();
//! let set = parser.parse("<div><p>a</p><p>b</p></div>", None).unwrap();
//! assert_eq!(set.find("p").unwrap().len(), 2);
//!
//! let strict = ParseOptions::new().strict(true);
//! assert!(parser.parse("<p>a</b>", Some(&strict)).is_err());
//! ```

use std::rc::Rc;
use std::sync::OnceLock;

use ego_tree::{NodeId, NodeRef};
use html5ever::tendril::StrTendril;
use regex::Regex;
use scraper::{Html, Node};

use crate::charset::{DEFAULT_CHARSET, decode_to_utf8, detect_charset};
use crate::cleaner;
use crate::dom::{Document, NodeHandle};
use crate::error::{DomError, Result};
use crate::node_set::{NodeSet, Scope};
use crate::options::{ParseOptions, ResolvedOptions};

/// Elements whose text keeps its whitespace as written
const PREFORMATTED_ELEMENTS: &[&str] = &["pre", "textarea", "script", "style"];

#[derive(Debug)]
struct ParserConfig {
    defaults: ParseOptions,
    default_charset: &'static str,
}

/// Factory for node sets
///
/// Clones share the same configuration.
#[derive(Debug, Clone)]
pub struct Parser {
    config: Rc<ParserConfig>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// A parser using the library defaults
    pub fn new() -> Self {
        Self::with_defaults(ParseOptions::new())
    }

    /// A parser whose defaults are `defaults` layered over the library
    /// defaults
    pub fn with_defaults(defaults: ParseOptions) -> Self {
        Self {
            config: Rc::new(ParserConfig {
                defaults: ParseOptions::library_defaults().merged(&defaults),
                default_charset: DEFAULT_CHARSET,
            }),
        }
    }

    pub fn defaults(&self) -> &ParseOptions {
        &self.config.defaults
    }

    /// Charset that string input is assumed to be in
    pub fn default_charset(&self) -> &str {
        self.config.default_charset
    }

    /// Options a parse with `options` would run with
    pub fn effective_options(&self, options: Option<&ParseOptions>) -> ResolvedOptions {
        match options {
            Some(options) => self.config.defaults.merged(options).resolve(),
            None => self.config.defaults.resolve(),
        }
    }

    /// Parse a markup string into a new tree and wrap its top-level nodes
    ///
    /// # Errors
    ///
    /// - [`DomError::Parse`] in strict mode when html5ever reported errors
    pub fn parse(&self, markup: &str, options: Option<&ParseOptions>) -> Result<NodeSet> {
        self.parse_shared(markup, options.cloned().map(Rc::new))
    }

    /// Decode and parse raw bytes
    ///
    /// `content_type` is an optional Content-Type value used for charset
    /// detection. The `enforce_encoding` option overrides it.
    ///
    /// # Errors
    ///
    /// - [`DomError::Encoding`] when the charset is unknown or the bytes
    ///   are invalid for it
    /// - [`DomError::Parse`] in strict mode when html5ever reported errors
    pub fn parse_bytes(
        &self,
        bytes: &[u8],
        content_type: Option<&str>,
        options: Option<&ParseOptions>,
    ) -> Result<NodeSet> {
        let resolved = self.effective_options(options);
        let charset = detect_charset(resolved.enforce_encoding.as_deref(), content_type, bytes);
        let decoded = decode_to_utf8(bytes, &charset)?;
        let markup = decoded.strip_prefix('\u{feff}').unwrap_or(&*decoded);

        let (document, ids) = self.build(markup, &resolved, charset)?;
        Ok(self.wrap_ids(&document, ids, options.cloned().map(Rc::new)))
    }

    /// Parse into a [`Document`] without wrapping anything
    pub fn parse_document(&self, markup: &str, options: Option<&ParseOptions>) -> Result<Document> {
        let resolved = self.effective_options(options);
        let (document, _) = self.build(markup, &resolved, DEFAULT_CHARSET.to_string())?;
        Ok(document)
    }

    /// Wrap a single existing node
    pub fn wrap(&self, node: NodeHandle, options: Option<&ParseOptions>) -> NodeSet {
        self.wrap_all([node], options)
    }

    /// Wrap existing nodes, in the given order
    pub fn wrap_all(
        &self,
        nodes: impl IntoIterator<Item = NodeHandle>,
        options: Option<&ParseOptions>,
    ) -> NodeSet {
        NodeSet::from_parts(
            nodes.into_iter().collect(),
            options.cloned().map(Rc::new),
            self.clone(),
        )
    }

    /// Query `scope` with `selector`
    ///
    /// A single node is wrapped first. When `options` is given, the result
    /// carries it; otherwise it keeps the options of the query.
    pub fn init<'a>(
        &self,
        selector: &str,
        scope: impl Into<Scope<'a>>,
        options: Option<&ParseOptions>,
    ) -> Result<NodeSet> {
        let mut result = match scope.into() {
            Scope::Set(set) => set.find(selector)?,
            Scope::Node(node) => self.wrap(node, None).find(selector)?,
        };
        if let Some(options) = options {
            result.set_options(options.clone());
        }
        Ok(result)
    }

    pub(crate) fn parse_shared(
        &self,
        markup: &str,
        options: Option<Rc<ParseOptions>>,
    ) -> Result<NodeSet> {
        let resolved = self.effective_options(options.as_deref());
        let (document, ids) = self.build(markup, &resolved, DEFAULT_CHARSET.to_string())?;
        Ok(self.wrap_ids(&document, ids, options))
    }

    fn wrap_ids(
        &self,
        document: &Document,
        ids: Vec<NodeId>,
        options: Option<Rc<ParseOptions>>,
    ) -> NodeSet {
        let nodes = ids.into_iter().map(|id| document.handle(id)).collect();
        NodeSet::from_parts(nodes, options, self.clone())
    }

    fn build(
        &self,
        markup: &str,
        options: &ResolvedOptions,
        charset: String,
    ) -> Result<(Document, Vec<NodeId>)> {
        let cleaned = cleaner::clean(markup, options);
        let mut html = Html::parse_fragment(&cleaned);

        if options.strict && !html.errors.is_empty() {
            let errors: Vec<String> = html.errors.iter().map(|e| e.to_string()).collect();
            return Err(DomError::Parse(errors.join("; ")));
        }

        tidy_text_nodes(&mut html, options);

        let container = fragment_container(&html);
        let ids: Vec<NodeId> = html
            .tree
            .get(container)
            .map(|node| node.children().map(|c| c.id()).collect())
            .unwrap_or_default();

        tracing::debug!(
            input_len = markup.len(),
            cleaned_len = cleaned.len(),
            charset = %charset,
            top_level_nodes = ids.len(),
            "parsed markup"
        );

        Ok((Document::new(html, charset), ids))
    }
}

/// The `<html>` context element html5ever puts fragment content under,
/// or the root when there is none
fn fragment_container(html: &Html) -> NodeId {
    let root = html.tree.root();
    root.children()
        .find(|child| child.value().is_element())
        .map(|child| child.id())
        .unwrap_or_else(|| root.id())
}

fn is_preformatted(node: NodeRef<'_, Node>) -> bool {
    node.ancestors()
        .filter_map(|ancestor| ancestor.value().as_element())
        .any(|element| PREFORMATTED_ELEMENTS.contains(&element.name()))
}

/// Collapse whitespace runs to one space
///
/// With `keep_line_breaks`, `\n` is left alone so preserved line breaks
/// survive.
fn collapse_whitespace(text: &str, keep_line_breaks: bool) -> Option<String> {
    static RUNS: OnceLock<Option<Regex>> = OnceLock::new();
    static RUNS_KEEPING_LF: OnceLock<Option<Regex>> = OnceLock::new();
    let regex = if keep_line_breaks {
        RUNS_KEEPING_LF.get_or_init(|| Regex::new(r"[ \t\r\x0C]{2,}|[\t\r\x0C]").ok())
    } else {
        RUNS.get_or_init(|| Regex::new(r"[ \t\n\r\x0C]{2,}|[\t\n\r\x0C]").ok())
    }
    .as_ref()?;
    if !regex.is_match(text) {
        return None;
    }
    Some(regex.replace_all(text, " ").into_owned())
}

/// Drop whitespace-only text nodes and collapse whitespace runs, as
/// configured
fn tidy_text_nodes(html: &mut Html, options: &ResolvedOptions) {
    if options.whitespace_text_node && !options.remove_double_space {
        return;
    }

    let mut blank = Vec::new();
    let mut collapsed = Vec::new();
    for node in html.tree.root().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        if !options.whitespace_text_node && text.trim().is_empty() {
            blank.push(node.id());
        } else if options.remove_double_space && !is_preformatted(node) {
            if let Some(replacement) = collapse_whitespace(text, options.preserve_line_breaks) {
                collapsed.push((node.id(), replacement));
            }
        }
    }

    for id in blank {
        if let Some(mut node) = html.tree.get_mut(id) {
            node.detach();
        }
    }
    for (id, replacement) in collapsed {
        if let Some(mut node) = html.tree.get_mut(id)
            && let Node::Text(text) = node.value()
        {
            text.text = StrTendril::from(replacement.as_str());
        }
    }
}
