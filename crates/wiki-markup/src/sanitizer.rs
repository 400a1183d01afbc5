//! Removal of dangerous elements from rendered HTML.

use crate::util::find_ignore_case;

/// Elements removed together with their content.
const REMOVED_WITH_CONTENT: &[&str] = &["script", "iframe", "frameset", "applet", "object"];

/// Elements whose tags are removed but whose content is kept.
const REMOVED_TAG_ONLY: &[&str] = &["frame", "embed"];

/// Strips blocked elements from HTML when enabled.
///
/// Tag names match case-insensitively and `>` inside quoted attribute values
/// does not end a tag. Removal repeats until nothing changes, so fragments
/// that join into a new blocked tag after one pass are removed as well.
///
/// # Example
///
/// ```
/// use wiki_markup::HtmlSanitizer;
///
/// let sanitizer = HtmlSanitizer::new(true);
/// assert_eq!(sanitizer.sanitize("a<script>alert(1)</script>b"), "ab");
/// assert_eq!(HtmlSanitizer::new(false).sanitize("<script>"), "<script>");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HtmlSanitizer {
    enabled: bool,
}

impl HtmlSanitizer {
    /// Create a sanitizer. A disabled sanitizer returns its input unchanged.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Whether blocked elements are removed.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Remove blocked elements from `html`.
    #[must_use]
    pub fn sanitize(&self, html: &str) -> String {
        if !self.enabled {
            return html.to_owned();
        }

        let mut current = html.to_owned();
        let mut passes = 0;
        while let Some(next) = strip_once(&current) {
            current = next;
            passes += 1;
        }
        if passes > 0 {
            tracing::debug!(passes, removed = html.len() - current.len(), "Removed blocked HTML");
        }
        current
    }
}

impl Default for HtmlSanitizer {
    fn default() -> Self {
        Self::new(true)
    }
}

/// A blocked tag found at some position.
struct BlockedTag {
    name: &'static str,
    closing: bool,
    self_closing: bool,
    /// Byte length of the whole tag, `None` if it never ends.
    len: Option<usize>,
}

/// One removal pass. Returns `None` when nothing was removed.
fn strip_once(html: &str) -> Option<String> {
    let mut out = String::with_capacity(html.len());
    let mut changed = false;
    let mut rest = html;

    while let Some(lt) = rest.find('<') {
        out.push_str(&rest[..lt]);
        rest = &rest[lt..];

        let Some(tag) = blocked_tag(rest) else {
            out.push('<');
            rest = &rest[1..];
            continue;
        };
        changed = true;

        let Some(len) = tag.len else {
            rest = "";
            break;
        };
        rest = &rest[len..];

        let with_content = REMOVED_WITH_CONTENT.contains(&tag.name);
        if with_content && !tag.closing && !tag.self_closing {
            rest = skip_past_closing(rest, tag.name);
        }
    }

    out.push_str(rest);
    changed.then_some(out)
}

/// Skip the element content and its closing tag. An element that is never
/// closed runs to the end of the input.
fn skip_past_closing<'a>(rest: &'a str, name: &str) -> &'a str {
    let closer = format!("</{name}");
    let mut search = 0;
    while let Some(offset) = find_ignore_case(&rest[search..], &closer) {
        let start = search + offset;
        let after_name = &rest[start + closer.len()..];
        if after_name.starts_with(|c: char| c == '>' || c.is_ascii_whitespace()) {
            return match tag_len(&rest[start..]) {
                Some(len) => &rest[start + len..],
                None => "",
            };
        }
        search = start + closer.len();
    }
    ""
}

/// Recognize a blocked opening or closing tag at the start of `s`.
fn blocked_tag(s: &str) -> Option<BlockedTag> {
    let after_lt = &s[1..];
    let (closing, name_start) = match after_lt.strip_prefix('/') {
        Some(name) => (true, name),
        None => (false, after_lt),
    };
    let name_len = name_start
        .bytes()
        .take_while(u8::is_ascii_alphanumeric)
        .count();
    let name = &name_start[..name_len];
    let terminated = name_start[name_len..]
        .chars()
        .next()
        .is_none_or(|c| c == '>' || c == '/' || c.is_ascii_whitespace());
    if name.is_empty() || !terminated {
        return None;
    }

    let name = REMOVED_WITH_CONTENT
        .iter()
        .chain(REMOVED_TAG_ONLY)
        .find(|blocked| blocked.eq_ignore_ascii_case(name))
        .copied()?;
    let len = tag_len(s);
    let self_closing = len.is_some_and(|len| s[..len].trim_end_matches('>').ends_with('/'));

    Some(BlockedTag {
        name,
        closing,
        self_closing,
        len,
    })
}

/// Byte length of the tag starting at `s`, skipping quoted attribute values.
fn tag_len(s: &str) -> Option<usize> {
    let mut quote = None;
    for (i, b) in s.bytes().enumerate().skip(1) {
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'>') => return Some(i + 1),
            (None, _) => {}
        }
    }
    None
}
