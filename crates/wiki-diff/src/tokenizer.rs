//! Splitting HTML into diffable tokens.

/// Split `html` into tags, whitespace runs and words.
///
/// Tags are atomic: a `>` inside a quoted attribute value does not end the
/// tag. A `<` that does not start a complete tag is ordinary text. The
/// tokens concatenate back to the input.
pub(crate) fn tokenize(html: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut rest = html;

    while !rest.is_empty() {
        let len = if rest.starts_with('<') {
            tag_len(rest).unwrap_or_else(|| word_len(rest))
        } else if rest.starts_with(char::is_whitespace) {
            rest.find(|c: char| !c.is_whitespace()).unwrap_or(rest.len())
        } else {
            word_len(rest)
        };
        tokens.push(&rest[..len]);
        rest = &rest[len..];
    }

    tokens
}

/// Whether a token is a complete tag.
pub(crate) fn is_tag(token: &str) -> bool {
    token.len() > 1 && token.starts_with('<') && token.ends_with('>') && tag_len(token).is_some()
}

/// Whether a token is only whitespace.
pub(crate) fn is_whitespace(token: &str) -> bool {
    token.chars().all(char::is_whitespace)
}

/// Length of a word: everything up to whitespace or the next `<`. The first
/// character is always consumed.
fn word_len(s: &str) -> usize {
    let first = s.chars().next().map_or(0, char::len_utf8);
    s[first..]
        .find(|c: char| c == '<' || c.is_whitespace())
        .map_or(s.len(), |end| first + end)
}

/// Length of the tag at the start of `s`, `None` if it is not a tag.
fn tag_len(s: &str) -> Option<usize> {
    let after = s[1..].chars().next()?;
    if !(after.is_ascii_alphabetic() || matches!(after, '/' | '!' | '?')) {
        return None;
    }

    let mut quote = None;
    for (i, b) in s.bytes().enumerate().skip(1) {
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'>') => return Some(i + 1),
            (None, b'<') => return None,
            (None, _) => {}
        }
    }
    None
}
