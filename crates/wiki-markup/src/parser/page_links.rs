//! Finding and renaming links to wiki pages inside raw markup.

use std::ops::Range;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::links::{LinkKind, classify};
use crate::util::starts_with_ignore_case;

/// Markdown inline link: optional `!`, `[text]`, then `(<target>)` or
/// `(target "title")`.
static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(!?)\[((?:[^\[\]]|\[[^\[\]]*\])*)\]\(\s*(<[^<>\n]*>|[^\s()]*)(\s+"[^"]*")?\s*\)"#)
        .unwrap()
});

/// Iterate over `[[...]]` links as (byte range, inner text).
fn bracket_links(markup: &str) -> impl Iterator<Item = (Range<usize>, &str)> + '_ {
    let mut pos = 0;
    std::iter::from_fn(move || {
        let start = pos + markup[pos..].find("[[")?;
        let inner_start = start + 2;
        let end = inner_start + markup[inner_start..].find("]]")?;
        pos = end + 2;
        Some((start..end + 2, &markup[inner_start..end]))
    })
}

/// Page title targeted by a `[[target|text]]` link, when it targets a page.
fn page_target<'a>(inner: &'a str, media_prefixes: &[&str]) -> Option<&'a str> {
    let target = inner.split_once('|').map_or(inner, |(target, _)| target).trim();
    if target.is_empty()
        || media_prefixes
            .iter()
            .any(|prefix| starts_with_ignore_case(target, prefix))
    {
        return None;
    }
    (classify(target) == LinkKind::InternalPageTitle).then_some(target)
}

fn title_matches(target: &str, title: &str) -> bool {
    let page = target.split_once('#').map_or(target, |(page, _)| page);
    page.trim().to_lowercase() == title.trim().to_lowercase()
}

fn with_fragment(target: &str, new_title: &str) -> String {
    match target.split_once('#') {
        Some((_, fragment)) => format!("{new_title}#{fragment}"),
        None => new_title.to_owned(),
    }
}

pub(super) fn bracket_contains(markup: &str, title: &str, media_prefixes: &[&str]) -> bool {
    bracket_links(markup).any(|(_, inner)| {
        page_target(inner, media_prefixes).is_some_and(|target| title_matches(target, title))
    })
}

pub(super) fn bracket_replace(
    markup: &str,
    old_title: &str,
    new_title: &str,
    media_prefixes: &[&str],
) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut last = 0;

    for (range, inner) in bracket_links(markup) {
        let Some(target) = page_target(inner, media_prefixes) else {
            continue;
        };
        if !title_matches(target, old_title) {
            continue;
        }

        let tail = inner.find('|').map_or("", |pipe| &inner[pipe..]);
        out.push_str(&markup[last..range.start]);
        out.push_str("[[");
        out.push_str(&with_fragment(target, new_title));
        out.push_str(tail);
        out.push_str("]]");
        last = range.end;
    }

    out.push_str(&markup[last..]);
    out
}

fn markdown_target<'a>(caps: &Captures<'a>) -> Option<&'a str> {
    if !caps[1].is_empty() {
        return None;
    }
    let raw = caps.get(3)?.as_str();
    let target = raw
        .strip_prefix('<')
        .and_then(|t| t.strip_suffix('>'))
        .unwrap_or(raw)
        .trim();
    (!target.is_empty() && classify(target) == LinkKind::InternalPageTitle).then_some(target)
}

pub(super) fn markdown_contains(markup: &str, title: &str) -> bool {
    MARKDOWN_LINK
        .captures_iter(markup)
        .any(|caps| markdown_target(&caps).is_some_and(|target| title_matches(target, title)))
}

pub(super) fn markdown_replace(markup: &str, old_title: &str, new_title: &str) -> String {
    MARKDOWN_LINK
        .replace_all(markup, |caps: &Captures<'_>| {
            let Some(target) = markdown_target(caps).filter(|t| title_matches(t, old_title)) else {
                return caps[0].to_owned();
            };
            let new_target = with_fragment(target, new_title);
            let destination = if new_target.contains(char::is_whitespace) {
                format!("<{new_target}>")
            } else {
                new_target
            };
            let title_attr = caps.get(4).map_or("", |m| m.as_str());
            format!("[{}]({destination}{title_attr})", &caps[2])
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const MEDIA: &[&str] = &["file:", "image:"];

    #[test]
    fn test_bracket_contains_case_insensitive() {
        assert!(bracket_contains("see [[Main Page]] now", "main page", &[]));
        assert!(bracket_contains("see [[main page|home]]", "Main Page", &[]));
        assert!(bracket_contains("[[Guide#setup|setup]]", "guide", &[]));
        assert!(!bracket_contains("[[Other]]", "Main Page", &[]));
    }

    #[test]
    fn test_bracket_contains_ignores_non_page_targets() {
        assert!(!bracket_contains("[[http://guide.com|Guide]]", "Guide", &[]));
        assert!(!bracket_contains("[[~/guide]]", "~/guide", &[]));
        assert!(!bracket_contains("[[File:Guide|x]]", "File:Guide", MEDIA));
    }

    #[test]
    fn test_bracket_replace_keeps_display_text() {
        assert_eq!(
            bracket_replace("a [[Old|shown]] b [[old]] c [[Other]]", "Old", "New", &[]),
            "a [[New|shown]] b [[New]] c [[Other]]"
        );
    }

    #[test]
    fn test_bracket_replace_keeps_fragment() {
        assert_eq!(
            bracket_replace("[[Old#part|x]]", "old", "New Name", &[]),
            "[[New Name#part|x]]"
        );
    }

    #[test]
    fn test_markdown_contains() {
        assert!(markdown_contains("go [home](Home)", "home"));
        assert!(markdown_contains("go [home](<Main Page>)", "main page"));
        assert!(!markdown_contains("![pic](Home)", "Home"));
        assert!(!markdown_contains("[x](https://home.com)", "https://home.com"));
    }

    #[test]
    fn test_markdown_replace() {
        assert_eq!(
            markdown_replace("[a](Old) ![b](Old) [c](Old \"t\")", "old", "New Page"),
            "[a](<New Page>) ![b](Old) [c](<New Page> \"t\")"
        );
    }
}
