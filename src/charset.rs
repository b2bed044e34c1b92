//! Charset detection and transcoding for byte input
//!
//! Byte input is decoded to UTF-8 before it reaches the parser. The
//! charset is picked by the first source that names one:
//!
//! 1. The `enforce_encoding` parse option
//! 2. A `charset` parameter in the Content-Type value
//! 3. A `<meta charset>` or `<meta http-equiv="Content-Type">` tag in the
//!    first 1024 bytes
//! 4. [`DEFAULT_CHARSET`]
//!
//! ```rust
//! use htmlquery::charset::detect_charset;
//!
//! let html = b"<meta charset=\"iso-8859-1\"><p>x</p>";
//! assert_eq!(detect_charset(None, None, html), "ISO-8859-1");
//! assert_eq!(detect_charset(Some("utf-8"), None, html), "UTF-8");
//! ```

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

use crate::error::{DomError, Result};

/// Charset assumed when nothing else names one; also the output charset
pub const DEFAULT_CHARSET: &str = "UTF-8";

/// Meta tags are only looked for in this many leading bytes
const META_SCAN_LIMIT: usize = 1024;

/// Pick the charset for `html`
///
/// `enforced` wins over `content_type`, which wins over meta tags. The
/// returned label is upper-cased.
pub fn detect_charset(enforced: Option<&str>, content_type: Option<&str>, html: &[u8]) -> String {
    enforced
        .filter(|label| !label.trim().is_empty())
        .map(str::to_string)
        .or_else(|| content_type.and_then(charset_from_content_type))
        .or_else(|| charset_from_meta(html))
        .map(|label| label.trim().to_uppercase())
        .unwrap_or_else(|| DEFAULT_CHARSET.to_string())
}

/// The `charset` parameter of a Content-Type value, if any
///
/// ```rust
/// use htmlquery::charset::charset_from_content_type;
///
/// assert_eq!(
///     charset_from_content_type("text/html; charset=\"Shift_JIS\""),
///     Some("Shift_JIS".to_string())
/// );
/// assert_eq!(charset_from_content_type("text/html"), None);
/// ```
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    static PARAM: OnceLock<Option<Regex>> = OnceLock::new();
    let regex = PARAM
        .get_or_init(|| Regex::new(r#"(?i)charset\s*=\s*"?([^";,\s]+)"?"#).ok())
        .as_ref()?;

    regex
        .captures(content_type)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// The charset declared by a meta tag near the start of `html`, if any
pub fn charset_from_meta(html: &[u8]) -> Option<String> {
    let prefix = String::from_utf8_lossy(&html[..html.len().min(META_SCAN_LIMIT)]);

    static HTML5_META: OnceLock<Option<Regex>> = OnceLock::new();
    static HTTP_EQUIV_META: OnceLock<Option<Regex>> = OnceLock::new();

    let html5 = HTML5_META
        .get_or_init(|| Regex::new(r#"(?i)<meta\s+charset\s*=\s*["']?([^"';>\s]+)"#).ok())
        .as_ref()?;
    if let Some(m) = html5.captures(&prefix).and_then(|caps| caps.get(1)) {
        return Some(m.as_str().to_string());
    }

    let http_equiv = HTTP_EQUIV_META
        .get_or_init(|| {
            Regex::new(
                r#"(?i)<meta\s+http-equiv\s*=\s*["']?content-type["']?\s+content\s*=\s*["']?[^"'>]*charset\s*=\s*([^"';>\s]+)"#,
            )
            .ok()
        })
        .as_ref()?;
    http_equiv
        .captures(&prefix)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Decode `html` from `charset` into UTF-8
///
/// UTF-8 input is borrowed when valid. Unknown labels and byte sequences
/// that are invalid for the charset fail with [`DomError::Encoding`].
pub fn decode_to_utf8<'a>(html: &'a [u8], charset: &str) -> Result<Cow<'a, str>> {
    if charset.eq_ignore_ascii_case(DEFAULT_CHARSET) || charset.eq_ignore_ascii_case("utf8") {
        return std::str::from_utf8(html).map(Cow::Borrowed).map_err(|e| {
            DomError::Encoding(format!(
                "Invalid UTF-8 at byte position {}: {}",
                e.valid_up_to(),
                e
            ))
        });
    }

    let encoding = encoding_rs::Encoding::for_label(charset.as_bytes())
        .ok_or_else(|| DomError::Encoding(format!("Unsupported charset '{charset}'")))?;

    encoding
        .decode_without_bom_handling_and_without_replacement(html)
        .ok_or_else(|| DomError::Encoding(format!("Invalid byte sequence for charset '{charset}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_content_type_variants() {
        for (value, expected) in [
            ("text/html; charset=UTF-8", Some("UTF-8")),
            ("text/html;charset=windows-1252", Some("windows-1252")),
            ("text/html; CHARSET=\"ISO-8859-1\"; q=1", Some("ISO-8859-1")),
            ("text/html", None),
            ("", None),
        ] {
            assert_eq!(
                charset_from_content_type(value).as_deref(),
                expected,
                "content type {value:?}"
            );
        }
    }

    #[test]
    fn test_meta_html5_and_http_equiv() {
        assert_eq!(
            charset_from_meta(b"<head><META Charset='utf-8'></head>").as_deref(),
            Some("utf-8")
        );
        assert_eq!(
            charset_from_meta(
                b"<meta http-equiv=\"Content-Type\" content=\"text/html; charset=koi8-r\">"
            )
            .as_deref(),
            Some("koi8-r")
        );
        assert_eq!(charset_from_meta(b"<p>plain</p>"), None);
    }

    #[test]
    fn test_meta_beyond_scan_limit_ignored() {
        let mut html = vec![b' '; META_SCAN_LIMIT];
        html.extend_from_slice(b"<meta charset=\"ISO-8859-1\">");
        assert_eq!(charset_from_meta(&html), None);
    }

    #[test]
    fn test_cascade_order() {
        let html = b"<meta charset=\"ISO-8859-1\">";
        assert_eq!(detect_charset(None, None, b"<p>x</p>"), DEFAULT_CHARSET);
        assert_eq!(detect_charset(None, None, html), "ISO-8859-1");
        assert_eq!(
            detect_charset(None, Some("text/html; charset=windows-1252"), html),
            "WINDOWS-1252"
        );
        assert_eq!(
            detect_charset(Some("koi8-r"), Some("text/html; charset=utf-8"), html),
            "KOI8-R"
        );
    }

    #[test]
    fn test_blank_enforced_label_is_ignored() {
        assert_eq!(detect_charset(Some("  "), None, b""), DEFAULT_CHARSET);
    }

    #[test]
    fn test_decode_utf8_borrows() {
        let decoded = decode_to_utf8("caf\u{e9}".as_bytes(), "UTF-8").expect("valid utf-8");
        assert!(matches!(decoded, Cow::Borrowed("caf\u{e9}")));
    }

    #[test]
    fn test_decode_latin1_transcodes() {
        let decoded = decode_to_utf8(b"Caf\xE9", "ISO-8859-1").expect("latin-1");
        assert_eq!(decoded, "Caf\u{e9}");
    }

    #[test]
    fn test_decode_invalid_utf8_fails() {
        let err = decode_to_utf8(b"\xFF\xFE", "UTF-8").unwrap_err();
        assert!(matches!(err, DomError::Encoding(_)));
    }

    #[test]
    fn test_decode_unknown_label_fails() {
        let err = decode_to_utf8(b"abc", "x-made-up").unwrap_err();
        assert!(err.to_string().contains("Unsupported charset"));
    }

    proptest! {
        #[test]
        fn prop_header_beats_meta(
            header in prop::sample::select(vec!["utf-8", "iso-8859-1", "windows-1252", "big5"]),
            meta in prop::sample::select(vec!["UTF-8", "SHIFT_JIS", "GB2312"]),
        ) {
            let html = format!("<meta charset=\"{meta}\"><p>x</p>");
            let content_type = format!("text/html; charset={header}");
            prop_assert_eq!(
                detect_charset(None, Some(&content_type), html.as_bytes()),
                header.to_uppercase()
            );
        }
    }
}
