//! Token extraction.
//!
//! Two passes over the raw markup:
//!
//! 1. Brace runs and `<nowiki>` are classified left to right. A run of three
//!    or more `{` opens a pass-through closed by the last three braces of the
//!    next run of three or more `}`. Exactly `{{TOC}}` (any case) is the table
//!    of contents. Any other run, and an unterminated opener, stays in the
//!    markup for the grammar.
//! 2. `@@name:body@@` invocations are found in what is left. A named token's
//!    raw body gets pass-through text restored to its source form.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::{Token, TokenKind, TokenSet};
use crate::escape::escape_html;
use crate::util::{find_ignore_case, starts_with_ignore_case};

static NAMED_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)@@([A-Za-z0-9_-]+):(.*?)@@").unwrap());

const NOWIKI_OPEN: &str = "<nowiki>";
const NOWIKI_CLOSE: &str = "</nowiki>";
const TOC: &str = "{{TOC}}";
const PLACEHOLDER_PREFIX: &str = "wikitoken";

/// Replace tokens in `raw` with placeholders.
///
/// Returns the markup to hand to the grammar and the extracted tokens.
///
/// # Example
///
/// ```
/// use wiki_markup::tokens::{TokenKind, extract_tokens};
///
/// let (markup, tokens) = extract_tokens("a {{{**b**}}} c");
/// assert_eq!(markup, format!("a {} c", tokens.placeholder(0)));
/// assert_eq!(tokens.tokens()[0].kind, TokenKind::InlinePassThrough);
/// assert_eq!(tokens.tokens()[0].raw_body, "**b**");
/// ```
pub fn extract_tokens(raw: &str) -> (String, TokenSet) {
    extract_tokens_avoiding(raw, "")
}

/// Like [`extract_tokens`], with placeholders that also never occur in
/// `avoid`.
///
/// Grammars can assemble placeholder text the raw markup never contained
/// (escape characters, entities), so the converter passes the HTML of a
/// failed attempt here and extracts again.
pub(crate) fn extract_tokens_avoiding(raw: &str, avoid: &str) -> (String, TokenSet) {
    let mut set = TokenSet {
        prefix: placeholder_prefix(raw, avoid),
        tokens: Vec::new(),
    };
    let markup = extract_pass_through(raw, &mut set);
    let markup = extract_named(&markup, &mut set);

    tracing::debug!(tokens = set.len(), "Extracted tokens");
    (markup, set)
}

/// Render `text` as literal HTML: escaped, with block pass-through as
/// `<pre>` and inline pass-through as its escaped body.
///
/// # Example
///
/// ```
/// use wiki_markup::tokens::render_literal;
///
/// assert_eq!(render_literal("<b> {{{[[x]]}}}"), "&lt;b&gt; [[x]]");
/// assert_eq!(render_literal("a\n{{{\nb\n}}}\nc"), "a\n<pre>b</pre>\nc");
/// ```
#[must_use]
pub fn render_literal(text: &str) -> String {
    let mut set = TokenSet {
        prefix: placeholder_prefix(text, ""),
        tokens: Vec::new(),
    };
    let escaped = escape_html(&extract_pass_through(text, &mut set));
    substitute(&escaped, &set, set.len(), |token| match token.kind {
        TokenKind::BlockPassThrough => format!("<pre>{}</pre>", escape_html(&token.raw_body)),
        TokenKind::InlinePassThrough => escape_html(&token.raw_body),
        TokenKind::TableOfContents | TokenKind::Named => escape_html(&token.source),
    })
}

/// Shortest prefix that occurs in neither `raw` nor `avoid` (ignoring case).
fn placeholder_prefix(raw: &str, avoid: &str) -> String {
    let raw = raw.to_ascii_lowercase();
    let avoid = avoid.to_ascii_lowercase();
    let mut prefix = PLACEHOLDER_PREFIX.to_owned();
    while raw.contains(&prefix) || avoid.contains(&prefix) {
        prefix.push('q');
    }
    prefix
}

/// Text written into the markup in place of a token.
///
/// Block pass-through gets a line of its own so the grammar sees a separate
/// paragraph.
fn emitted(kind: TokenKind, placeholder: &str) -> String {
    match kind {
        TokenKind::BlockPassThrough => format!("\n{placeholder}\n"),
        TokenKind::InlinePassThrough | TokenKind::TableOfContents | TokenKind::Named => {
            placeholder.to_owned()
        }
    }
}

/// Replace the placeholders of the first `count` tokens in `text`.
///
/// The exact emitted text is replaced first; a placeholder whose padding the
/// surrounding text no longer carries is replaced bare.
pub(super) fn substitute(
    text: &str,
    set: &TokenSet,
    count: usize,
    render: impl Fn(&Token) -> String,
) -> String {
    let mut out = text.to_owned();
    for (index, token) in set.tokens.iter().enumerate().take(count) {
        let placeholder = set.placeholder(index);
        if !out.contains(&placeholder) {
            continue;
        }
        let replacement = render(token);
        let emitted = emitted(token.kind, &placeholder);
        if emitted != placeholder {
            out = out.replace(&emitted, &replacement);
        }
        out = out.replace(&placeholder, &replacement);
    }
    out
}

fn extract_pass_through(raw: &str, set: &mut TokenSet) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        let rest = &raw[i..];

        if rest.starts_with('{') {
            let run = rest.bytes().take_while(|&b| b == b'{').count();
            if run >= 3 {
                if let Some(consumed) = brace_pass_through(raw, i, run, set, &mut out) {
                    i += consumed;
                    continue;
                }
            } else if run == 2 && starts_with_ignore_case(rest, TOC) {
                let source = &rest[..TOC.len()];
                let placeholder = push_token(set, TokenKind::TableOfContents, "toc", "", source);
                out.push_str(&placeholder);
                i += TOC.len();
                continue;
            }
            out.push_str(&rest[..run]);
            i += run;
        } else if starts_with_ignore_case(rest, NOWIKI_OPEN) {
            let body_start = NOWIKI_OPEN.len();
            match find_ignore_case(&rest[body_start..], NOWIKI_CLOSE) {
                Some(end) => {
                    let source = &rest[..body_start + end + NOWIKI_CLOSE.len()];
                    let body = &rest[body_start..body_start + end];
                    let placeholder =
                        push_token(set, TokenKind::InlinePassThrough, "nowiki", body, source);
                    out.push_str(&placeholder);
                    i += source.len();
                }
                None => {
                    out.push_str(&rest[..body_start]);
                    i += body_start;
                }
            }
        } else {
            let len = rest.chars().next().map_or(1, char::len_utf8);
            out.push_str(&rest[..len]);
            i += len;
        }
    }

    out
}

/// Extract a `{{{...}}}` pass-through starting at `start`. Returns the number
/// of bytes consumed, or `None` when it is never closed.
fn brace_pass_through(
    raw: &str,
    start: usize,
    run: usize,
    set: &mut TokenSet,
    out: &mut String,
) -> Option<usize> {
    let (close_start, close_run) = find_closing_run(raw, start + run)?;
    let end = close_start + close_run;
    let source = &raw[start..end];

    let opener_alone =
        run == 3 && line_is_blank_before(raw, start) && line_is_blank_after(raw, start + 3);
    let closer_alone =
        close_run == 3 && line_is_blank_before(raw, close_start) && line_is_blank_after(raw, end);

    if opener_alone && closer_alone {
        let body_start = raw[start + 3..]
            .find('\n')
            .map_or(close_start, |nl| start + 3 + nl + 1);
        let body_end = raw[..close_start].rfind('\n').unwrap_or(close_start);
        let body = if body_start <= body_end {
            raw[body_start..body_end].trim_end_matches('\r')
        } else {
            ""
        };
        let placeholder = push_token(set, TokenKind::BlockPassThrough, "nowiki", body, source);
        out.push_str(&emitted(TokenKind::BlockPassThrough, &placeholder));
    } else {
        let body = &raw[start + 3..end - 3];
        let placeholder = push_token(set, TokenKind::InlinePassThrough, "nowiki", body, source);
        out.push_str(&placeholder);
    }

    Some(end - start)
}

/// Find the next run of three or more `}` at or after `from`.
fn find_closing_run(raw: &str, from: usize) -> Option<(usize, usize)> {
    let bytes = raw.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == b'}' {
            let run = bytes[i..].iter().take_while(|&&b| b == b'}').count();
            if run >= 3 {
                return Some((i, run));
            }
            i += run;
        } else {
            i += 1;
        }
    }
    None
}

fn line_is_blank_before(raw: &str, pos: usize) -> bool {
    let line_start = raw[..pos].rfind('\n').map_or(0, |nl| nl + 1);
    raw[line_start..pos].trim().is_empty()
}

fn line_is_blank_after(raw: &str, pos: usize) -> bool {
    let line_end = raw[pos..].find('\n').map_or(raw.len(), |nl| pos + nl);
    raw[pos..line_end].trim().is_empty()
}

fn extract_named(markup: &str, set: &mut TokenSet) -> String {
    let pass_through_count = set.len();
    NAMED_TOKEN
        .replace_all(markup, |caps: &Captures<'_>| {
            let source = restore_source(&caps[0], set, pass_through_count);
            let body = restore_source(&caps[2], set, pass_through_count);
            push_token(set, TokenKind::Named, &caps[1], &body, &source)
        })
        .into_owned()
}

/// Put pass-through source text back in place of what was emitted for it.
fn restore_source(text: &str, set: &TokenSet, count: usize) -> String {
    substitute(text, set, count, |token| token.source.clone())
}

fn push_token(set: &mut TokenSet, kind: TokenKind, name: &str, body: &str, source: &str) -> String {
    let placeholder = set.placeholder(set.tokens.len());
    set.tokens.push(Token {
        kind,
        name: name.to_owned(),
        raw_body: body.to_owned(),
        source: source.to_owned(),
    });
    placeholder
}
