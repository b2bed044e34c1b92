//! htmlquery - jQuery-style node sets over an html5ever parse tree
//!
//! This library wraps scraper's html5ever-based tree in a chainable,
//! jQuery-like API: `find`, `children`, `filter`, `append`, `empty`,
//! `remove`, text and markup getters and setters, and deep copies.
//!
//! # Architecture
//!
//! The library is structured into several modules:
//! - `parser`: the `Parser` factory that turns markup into node sets
//! - `node_set`: the `NodeSet` facade and its operations
//! - `dom`: shared documents and non-owning node handles
//! - `options`: the mergeable `ParseOptions` bag
//! - `cleaner`: markup cleanup applied before parsing
//! - `charset`: charset detection and transcoding for byte input
//! - `serialize`: markup output for single nodes
//! - `error`: the `DomError` type
//!
//! # Threading
//!
//! Trees are shared through `Rc<RefCell<_>>`, so node sets are neither
//! `Send` nor `Sync`. All operations are synchronous.
//!
//! # Examples
//!
//! ```rust
//! use htmlquery::Parser;
//!
//! let parser = Parser::new();
//! let list = parser.parse("<ul><li>a</li></ul>", None).unwrap();
//!
//! list.append(["<li>b</li>"]).unwrap();
//! assert_eq!(list.find("li").unwrap().get_text().unwrap(), "ab");
//!
//! list.find("li:first-child").unwrap().remove(None).unwrap();
//! assert_eq!(list.to_string(), "<ul><li>b</li></ul>");
//! ```

pub mod charset;
pub mod cleaner;
pub mod dom;
pub mod error;
pub mod node_set;
pub mod options;
pub mod parser;
mod serialize;

pub use dom::{Document, NodeHandle, NodeKind};
pub use error::{DomError, Result};
pub use node_set::{Appendable, FilterArg, FilterMode, NodeSet, NodeSetView, Scope};
pub use options::{ParseOptions, ResolvedOptions};
pub use parser::Parser;
