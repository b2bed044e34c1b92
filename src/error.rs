//! Error types for tree operations
//!
//! Errors raised by the parse tree are passed straight through to the
//! caller. Nothing in this crate retries or rewrites them.

use std::io;

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, DomError>;

/// Errors that can occur while parsing, querying or mutating a tree
#[derive(Debug, Error)]
pub enum DomError {
    /// A handle refers to a node its tree does not hold
    #[error("Node is not loaded in its document")]
    NotLoaded,

    /// Positional access past the end of a node sequence
    #[error("Child not found at index {index} (length {len})")]
    ChildNotFound { index: usize, len: usize },

    /// A node kind that cannot be placed or handled where it was found
    #[error("Unknown child type: {0}")]
    UnknownChildType(String),

    /// The selector string could not be parsed
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// Character encoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Markup was rejected in strict mode
    #[error("Parse error: {0}")]
    Parse(String),

    /// Writing serialized markup failed
    #[error("Serialization error: {0}")]
    Serialize(#[from] io::Error),
}
