//! Inline scanning helpers shared by the wiki grammars.

use crate::util::starts_with_ignore_case;

/// Stack of open inline formatting elements.
///
/// Closing an element that is not on top closes the elements above it and
/// reopens them afterwards, so the emitted HTML always nests correctly.
#[derive(Debug, Default)]
pub(super) struct FormatStack {
    open: Vec<&'static str>,
}

impl FormatStack {
    pub(super) fn contains(&self, tag: &str) -> bool {
        self.open.contains(&tag)
    }

    pub(super) fn top(&self) -> Option<&'static str> {
        self.open.last().copied()
    }

    /// Open `tag`, or close it when it is already open.
    pub(super) fn toggle(&mut self, tag: &'static str, out: &mut String) {
        let Some(pos) = self.open.iter().rposition(|open| *open == tag) else {
            push_open(out, tag);
            self.open.push(tag);
            return;
        };

        let reopen = self.open.split_off(pos + 1);
        for inner in reopen.iter().rev() {
            push_close(out, inner);
        }
        self.open.pop();
        push_close(out, tag);
        for inner in reopen {
            push_open(out, inner);
            self.open.push(inner);
        }
    }

    /// Close everything still open.
    pub(super) fn close_all(&mut self, out: &mut String) {
        while let Some(tag) = self.open.pop() {
            push_close(out, tag);
        }
    }
}

fn push_open(out: &mut String, tag: &str) {
    out.push('<');
    out.push_str(tag);
    out.push('>');
}

fn push_close(out: &mut String, tag: &str) {
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

/// Length of a raw HTML tag or comment at the start of `s`.
///
/// Quoted attribute values may contain `>`. Returns `None` when `s` does not
/// start with something tag-shaped or the tag is never closed; the caller then
/// escapes the `<`.
pub(super) fn html_tag_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'<') {
        return None;
    }

    if s.starts_with("<!--") {
        return s[4..].find("-->").map(|end| end + 4 + 3);
    }

    let name_start = if bytes.get(1) == Some(&b'/') { 2 } else { 1 };
    if !bytes.get(name_start).is_some_and(u8::is_ascii_alphabetic) {
        return None;
    }

    let mut quote: Option<u8> = None;
    for (i, &b) in bytes.iter().enumerate().skip(name_start + 1) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'>' => return Some(i + 1),
                b'<' => return None,
                _ => {}
            },
        }
    }
    None
}

/// Length of a character reference (`&amp;`, `&#39;`, `&#x2F;`) at the start
/// of `s`.
pub(super) fn entity_len(s: &str) -> Option<usize> {
    let rest = s.strip_prefix('&')?;
    let (offset, is_digit): (usize, fn(&u8) -> bool) =
        if rest.starts_with("#x") || rest.starts_with("#X") {
            (3, u8::is_ascii_hexdigit)
        } else if rest.starts_with('#') {
            (2, u8::is_ascii_digit)
        } else {
            (1, u8::is_ascii_alphanumeric)
        };

    let body = &s.as_bytes()[offset.min(s.len())..];
    let len = body.iter().take(32).take_while(|&b| is_digit(b)).count();
    if len == 0 || body.get(len) != Some(&b';') {
        return None;
    }
    if offset == 1 && !body[0].is_ascii_alphabetic() {
        return None;
    }
    Some(offset + len + 1)
}

/// Length of a bare `http://` or `https://` URL at the start of `s`.
///
/// Trailing punctuation is left to the surrounding text.
pub(super) fn bare_url_len(s: &str) -> Option<usize> {
    let scheme = if starts_with_ignore_case(s, "https://") {
        8
    } else if starts_with_ignore_case(s, "http://") {
        7
    } else {
        return None;
    };

    let mut end = s
        .find(|c: char| c.is_whitespace() || matches!(c, '<' | '>' | '"' | '|' | '[' | ']'))
        .unwrap_or(s.len());

    while end > scheme {
        let last = s.as_bytes()[end - 1];
        let unbalanced_paren = last == b')' && !s[..end].contains('(');
        if matches!(last, b'.' | b',' | b';' | b':' | b'!' | b'?' | b'\'') || unbalanced_paren {
            end -= 1;
        } else {
            break;
        }
    }

    (end > scheme).then_some(end)
}

/// Append one text character, escaped for element content.
pub(super) fn push_text_char(out: &mut String, c: char) {
    match c {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        _ => out.push(c),
    }
}

/// Whether `s[i..]` starts with a bare URL that is not glued to a word.
pub(super) fn url_at(s: &str, i: usize) -> Option<usize> {
    let boundary = s[..i]
        .chars()
        .next_back()
        .is_none_or(|prev| !prev.is_alphanumeric());
    if boundary { bare_url_len(&s[i..]) } else { None }
}

/// Length of the UTF-8 character starting at byte `i`.
pub(super) fn char_len_at(s: &str, i: usize) -> usize {
    s[i..].chars().next().map_or(1, char::len_utf8)
}
