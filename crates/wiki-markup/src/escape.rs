//! HTML escaping helpers.
//!
//! Two policies are used by the converter:
//!
//! - [`escape_html`] for text content (`&`, `<`, `>`, `"`, `'`).
//! - [`escape_attribute`] for `href`/`src` values. Every character other than
//!   an ASCII letter or digit becomes a hexadecimal character reference, so a
//!   link target can never break out of its attribute.

use std::fmt::Write;

/// Escape text for use as HTML element content.
///
/// # Example
///
/// ```
/// use wiki_markup::escape_html;
///
/// assert_eq!(escape_html("a < b & 'c'"), "a &lt; b &amp; &#39;c&#39;");
/// ```
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    push_escaped(&mut out, text);
    out
}

/// Append `text` to `out`, escaped for HTML element content.
pub(crate) fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

/// Escape a URL for use inside an `href` or `src` attribute.
///
/// # Example
///
/// ```
/// use wiki_markup::escape_attribute;
///
/// assert_eq!(
///     escape_attribute("https://www.google.com"),
///     "https&#x3A;&#x2F;&#x2F;www&#x2E;google&#x2E;com"
/// );
/// ```
pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len() * 2);
    for c in value.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else {
            write!(out, "&#x{:X};", u32::from(c)).unwrap();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html_specials() {
        assert_eq!(
            escape_html(r#"<a href="x">&'"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;"
        );
    }

    #[test]
    fn test_escape_html_plain_text_unchanged() {
        assert_eq!(escape_html("hello world"), "hello world");
    }

    #[test]
    fn test_escape_attribute_keeps_alphanumerics() {
        assert_eq!(escape_attribute("abcXYZ019"), "abcXYZ019");
    }

    #[test]
    fn test_escape_attribute_punctuation() {
        assert_eq!(escape_attribute("#myanchortag"), "&#x23;myanchortag");
        assert_eq!(escape_attribute("spam@gmail.com"), "spam&#x40;gmail&#x2E;com");
        assert_eq!(escape_attribute("image_frame"), "image&#x5F;frame");
    }

    #[test]
    fn test_escape_attribute_quotes_cannot_break_out() {
        let escaped = escape_attribute(r#"" onmouseover="alert(1)"#);
        assert!(!escaped.contains('"'));
        assert!(!escaped.contains('('));
    }

    #[test]
    fn test_escape_attribute_non_ascii() {
        assert_eq!(escape_attribute("é"), "&#xE9;");
    }
}
