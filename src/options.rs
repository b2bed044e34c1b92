//! Parse options
//!
//! `ParseOptions` is a mergeable options bag. Every field is optional so
//! that a per-call override can replace only the fields it sets, leaving
//! the rest to the parser's defaults.
//!
//! # Examples
//!
//! ```rust
//! use htmlquery::options::ParseOptions;
//!
//! let defaults = ParseOptions::library_defaults();
//! let overrides = ParseOptions::new().remove_scripts(false);
//!
//! let effective = defaults.merged(&overrides).resolve();
//! assert!(!effective.remove_scripts);
//! assert!(effective.remove_styles);
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Options controlling how markup is cleaned and parsed
///
/// `None` means "not set here". Use [`ParseOptions::merged`] to layer
/// options and [`ParseOptions::resolve`] to get concrete values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct ParseOptions {
    /// Run the input cleaner before parsing
    pub cleanup_input: Option<bool>,
    /// Strip `<script>` blocks (cleaner)
    pub remove_scripts: Option<bool>,
    /// Strip `<style>` blocks (cleaner)
    pub remove_styles: Option<bool>,
    /// Strip `{word ...}` template tags (cleaner)
    pub remove_smarty_scripts: Option<bool>,
    /// Keep line breaks as `&#10;` instead of replacing them with spaces
    pub preserve_line_breaks: Option<bool>,
    /// Collapse whitespace runs inside text nodes
    pub remove_double_space: Option<bool>,
    /// Keep text nodes that contain only whitespace
    pub whitespace_text_node: Option<bool>,
    /// Reject markup that produced any parse error
    pub strict: Option<bool>,
    /// Charset label that overrides detection for byte input
    pub enforce_encoding: Option<String>,
}

/// Fully resolved options, with library defaults filled in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    pub cleanup_input: bool,
    pub remove_scripts: bool,
    pub remove_styles: bool,
    pub remove_smarty_scripts: bool,
    pub preserve_line_breaks: bool,
    pub remove_double_space: bool,
    pub whitespace_text_node: bool,
    pub strict: bool,
    pub enforce_encoding: Option<String>,
}

impl Default for ResolvedOptions {
    fn default() -> Self {
        Self {
            cleanup_input: true,
            remove_scripts: true,
            remove_styles: true,
            remove_smarty_scripts: false,
            preserve_line_breaks: false,
            remove_double_space: true,
            whitespace_text_node: true,
            strict: false,
            enforce_encoding: None,
        }
    }
}

impl ParseOptions {
    /// Create an options bag with nothing set
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with every field set to the library default
    pub fn library_defaults() -> Self {
        let d = ResolvedOptions::default();
        Self {
            cleanup_input: Some(d.cleanup_input),
            remove_scripts: Some(d.remove_scripts),
            remove_styles: Some(d.remove_styles),
            remove_smarty_scripts: Some(d.remove_smarty_scripts),
            preserve_line_breaks: Some(d.preserve_line_breaks),
            remove_double_space: Some(d.remove_double_space),
            whitespace_text_node: Some(d.whitespace_text_node),
            strict: Some(d.strict),
            enforce_encoding: d.enforce_encoding,
        }
    }

    /// Layer `overrides` on top of `self`
    ///
    /// Fields set in `overrides` win; unset fields keep the value from
    /// `self`.
    pub fn merged(&self, overrides: &ParseOptions) -> ParseOptions {
        ParseOptions {
            cleanup_input: overrides.cleanup_input.or(self.cleanup_input),
            remove_scripts: overrides.remove_scripts.or(self.remove_scripts),
            remove_styles: overrides.remove_styles.or(self.remove_styles),
            remove_smarty_scripts: overrides
                .remove_smarty_scripts
                .or(self.remove_smarty_scripts),
            preserve_line_breaks: overrides
                .preserve_line_breaks
                .or(self.preserve_line_breaks),
            remove_double_space: overrides
                .remove_double_space
                .or(self.remove_double_space),
            whitespace_text_node: overrides
                .whitespace_text_node
                .or(self.whitespace_text_node),
            strict: overrides.strict.or(self.strict),
            enforce_encoding: overrides
                .enforce_encoding
                .clone()
                .or_else(|| self.enforce_encoding.clone()),
        }
    }

    /// Fill unset fields with the library defaults
    pub fn resolve(&self) -> ResolvedOptions {
        let d = ResolvedOptions::default();
        ResolvedOptions {
            cleanup_input: self.cleanup_input.unwrap_or(d.cleanup_input),
            remove_scripts: self.remove_scripts.unwrap_or(d.remove_scripts),
            remove_styles: self.remove_styles.unwrap_or(d.remove_styles),
            remove_smarty_scripts: self
                .remove_smarty_scripts
                .unwrap_or(d.remove_smarty_scripts),
            preserve_line_breaks: self
                .preserve_line_breaks
                .unwrap_or(d.preserve_line_breaks),
            remove_double_space: self.remove_double_space.unwrap_or(d.remove_double_space),
            whitespace_text_node: self
                .whitespace_text_node
                .unwrap_or(d.whitespace_text_node),
            strict: self.strict.unwrap_or(d.strict),
            enforce_encoding: self.enforce_encoding.clone().or(d.enforce_encoding),
        }
    }

    pub fn cleanup_input(mut self, value: bool) -> Self {
        self.cleanup_input = Some(value);
        self
    }

    pub fn remove_scripts(mut self, value: bool) -> Self {
        self.remove_scripts = Some(value);
        self
    }

    pub fn remove_styles(mut self, value: bool) -> Self {
        self.remove_styles = Some(value);
        self
    }

    pub fn remove_smarty_scripts(mut self, value: bool) -> Self {
        self.remove_smarty_scripts = Some(value);
        self
    }

    pub fn preserve_line_breaks(mut self, value: bool) -> Self {
        self.preserve_line_breaks = Some(value);
        self
    }

    pub fn remove_double_space(mut self, value: bool) -> Self {
        self.remove_double_space = Some(value);
        self
    }

    pub fn whitespace_text_node(mut self, value: bool) -> Self {
        self.whitespace_text_node = Some(value);
        self
    }

    pub fn strict(mut self, value: bool) -> Self {
        self.strict = Some(value);
        self
    }

    /// Force byte input to be decoded with this charset label
    pub fn enforce_encoding(mut self, label: impl Into<String>) -> Self {
        self.enforce_encoding = Some(label.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_options_are_unset() {
        let options = ParseOptions::new();
        assert_eq!(options.strict, None);
        assert_eq!(options.enforce_encoding, None);
    }

    #[test]
    fn test_resolve_fills_defaults() {
        let resolved = ParseOptions::new().resolve();
        assert_eq!(resolved, ResolvedOptions::default());
    }

    #[test]
    fn test_merge_explicit_field_wins() {
        let base = ParseOptions::library_defaults();
        let merged = base.merged(&ParseOptions::new().strict(true));
        assert_eq!(merged.strict, Some(true));
        assert_eq!(merged.remove_scripts, Some(true));
    }

    #[test]
    fn test_merge_keeps_base_encoding_when_override_unset() {
        let base = ParseOptions::new().enforce_encoding("ISO-8859-1");
        let merged = base.merged(&ParseOptions::new().cleanup_input(false));
        assert_eq!(merged.enforce_encoding.as_deref(), Some("ISO-8859-1"));
        assert_eq!(merged.cleanup_input, Some(false));
    }

    #[test]
    fn test_merge_override_encoding_replaces_base() {
        let base = ParseOptions::new().enforce_encoding("ISO-8859-1");
        let merged = base.merged(&ParseOptions::new().enforce_encoding("windows-1252"));
        assert_eq!(merged.enforce_encoding.as_deref(), Some("windows-1252"));
    }

    proptest! {
        #[test]
        fn prop_merge_with_empty_is_identity(
            strict in any::<Option<bool>>(),
            scripts in any::<Option<bool>>(),
            spaces in any::<Option<bool>>(),
        ) {
            let mut options = ParseOptions::new();
            options.strict = strict;
            options.remove_scripts = scripts;
            options.remove_double_space = spaces;

            prop_assert_eq!(options.merged(&ParseOptions::new()), options.clone());
            prop_assert_eq!(ParseOptions::new().merged(&options), options);
        }
    }
}
