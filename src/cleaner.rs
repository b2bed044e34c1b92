//! Markup cleanup applied before parsing
//!
//! When `cleanup_input` is enabled the raw markup goes through these
//! passes, in order:
//!
//! 1. Whitespace between a closing attribute quote and `>` is removed
//! 2. Line breaks become a space (or `&#10;` with `preserve_line_breaks`)
//! 3. Doctype declarations, comments and CDATA sections are stripped
//! 4. `<script>` / `<style>` blocks are stripped when requested
//! 5. `{word ...}` template tags are stripped when requested
//!
//! # Examples
//!
//! ```rust
//! use htmlquery::cleaner::clean;
//! use htmlquery::options::ResolvedOptions;
//!
//! let cleaned = clean("<p class=\"a\"  >x</p><!-- note -->", &ResolvedOptions::default());
//! assert_eq!(cleaned, "<p class=\"a\">x</p>");
//! ```

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

use crate::options::ResolvedOptions;

fn cached(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn replace_all(input: String, regex: Option<&Regex>, replacement: &str) -> String {
    match regex {
        Some(regex) => match regex.replace_all(&input, replacement) {
            Cow::Borrowed(_) => input,
            Cow::Owned(replaced) => replaced,
        },
        None => input,
    }
}

/// Clean raw markup according to `options`
///
/// Returns the input unchanged when `cleanup_input` is off.
pub fn clean<'a>(html: &'a str, options: &ResolvedOptions) -> Cow<'a, str> {
    if !options.cleanup_input {
        return Cow::Borrowed(html);
    }

    static SINGLE_QUOTE_GAP: OnceLock<Option<Regex>> = OnceLock::new();
    static DOUBLE_QUOTE_GAP: OnceLock<Option<Regex>> = OnceLock::new();
    static DOCTYPE: OnceLock<Option<Regex>> = OnceLock::new();
    static COMMENT: OnceLock<Option<Regex>> = OnceLock::new();
    static CDATA: OnceLock<Option<Regex>> = OnceLock::new();
    static SCRIPT: OnceLock<Option<Regex>> = OnceLock::new();
    static STYLE: OnceLock<Option<Regex>> = OnceLock::new();
    static SMARTY: OnceLock<Option<Regex>> = OnceLock::new();

    let mut out = html.to_string();

    out = replace_all(out, cached(&SINGLE_QUOTE_GAP, r"'\s+>"), "'>");
    out = replace_all(out, cached(&DOUBLE_QUOTE_GAP, r#""\s+>"#), "\">");

    let line_break = if options.preserve_line_breaks {
        "&#10;"
    } else {
        " "
    };
    out = out
        .replace("\r\n", line_break)
        .replace(['\r', '\n'], line_break);

    out = replace_all(out, cached(&DOCTYPE, r"(?is)<!doctype.*?>"), "");
    out = replace_all(out, cached(&COMMENT, r"(?s)<!--.*?-->"), "");
    out = replace_all(out, cached(&CDATA, r"(?s)<!\[CDATA\[.*?\]\]>"), "");

    if options.remove_scripts {
        out = replace_all(
            out,
            cached(&SCRIPT, r"(?is)<\s*script\b[^>]*>.*?<\s*/\s*script\s*>"),
            "",
        );
    }

    if options.remove_styles {
        out = replace_all(
            out,
            cached(&STYLE, r"(?is)<\s*style\b[^>]*>.*?<\s*/\s*style\s*>"),
            "",
        );
    }

    if options.remove_smarty_scripts {
        out = replace_all(out, cached(&SMARTY, r"(?s)\{\w.*?\}"), "");
    }

    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn defaults() -> ResolvedOptions {
        ResolvedOptions::default()
    }

    #[test]
    fn test_disabled_cleanup_borrows_input() {
        let options = ResolvedOptions {
            cleanup_input: false,
            ..defaults()
        };
        let html = "<!-- keep --><script>x()</script>";
        assert!(matches!(clean(html, &options), Cow::Borrowed(s) if s == html));
    }

    #[test]
    fn test_strips_comments_and_doctype() {
        let html = "<!DOCTYPE html><div><!-- a\ncomment --><p>x</p></div>";
        assert_eq!(clean(html, &defaults()), "<div><p>x</p></div>");
    }

    #[test]
    fn test_strips_cdata() {
        assert_eq!(clean("<p><![CDATA[raw]]>x</p>", &defaults()), "<p>x</p>");
    }

    #[test]
    fn test_strips_scripts_and_styles_by_default() {
        let html = "<style>p{}</style><p>a</p><script type=\"text/javascript\">go()</script>";
        assert_eq!(clean(html, &defaults()), "<p>a</p>");
    }

    #[test]
    fn test_keeps_scripts_when_disabled() {
        let options = ResolvedOptions {
            remove_scripts: false,
            ..defaults()
        };
        assert_eq!(
            clean("<script>go()</script>", &options),
            "<script>go()</script>"
        );
    }

    #[test]
    fn test_line_breaks_replaced_with_space() {
        assert_eq!(clean("<p>a\r\nb\nc\rd</p>", &defaults()), "<p>a b c d</p>");
    }

    #[test]
    fn test_line_breaks_preserved_as_entity() {
        let options = ResolvedOptions {
            preserve_line_breaks: true,
            ..defaults()
        };
        assert_eq!(clean("<p>a\nb</p>", &options), "<p>a&#10;b</p>");
    }

    #[test]
    fn test_quote_gap_removed() {
        assert_eq!(
            clean("<a href='x'   >l</a><b id=\"y\"\t>m</b>", &defaults()),
            "<a href='x'>l</a><b id=\"y\">m</b>"
        );
    }

    #[test]
    fn test_smarty_tags_only_when_enabled() {
        let html = "<p>{if $x}hi{/if}</p>";
        assert_eq!(clean(html, &defaults()), html);

        let options = ResolvedOptions {
            remove_smarty_scripts: true,
            ..defaults()
        };
        assert_eq!(clean(html, &options), "<p>hi{/if}</p>");
    }

    proptest! {
        #[test]
        fn prop_plain_markup_untouched(text in "[a-zA-Z0-9 ]{0,60}") {
            let html = format!("<div><p>{text}</p></div>");
            prop_assert_eq!(clean(&html, &defaults()), html.as_str());
        }
    }
}
