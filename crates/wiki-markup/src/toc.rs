//! Table of contents for rendered pages.

use std::collections::HashSet;
use std::fmt::Write;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::escape::escape_attribute;

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h([1-6])(\s[^>]*)?>(.*?)</h([1-6])\s*>").unwrap());

static ID_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\bid\s*=\s*["']([^"']*)["']"#).unwrap());

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Heading collected from rendered HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    /// Heading level (1-6).
    pub level: u8,
    /// Anchor id.
    pub id: String,
    /// Heading text with markup removed (entities kept).
    pub title: String,
}

/// Give every heading in `html` an `id` and collect the headings.
///
/// Existing ids are kept. Generated ids are slugs of the heading text, with
/// `-1`, `-2`, ... appended to repeats.
pub fn assign_heading_ids(html: &str) -> (String, Vec<TocEntry>) {
    let mut entries = Vec::new();
    let mut used = HashSet::new();

    let with_ids = HEADING.replace_all(html, |caps: &Captures<'_>| {
        if caps[1] != caps[4] {
            return caps[0].to_owned();
        }
        let level = caps[1].parse::<u8>().unwrap_or(1);
        let attrs = caps.get(2).map_or("", |m| m.as_str());
        let inner = &caps[3];
        let title = TAG.replace_all(inner, "").trim().to_owned();

        let (id, tag) = match ID_ATTR.captures(attrs) {
            Some(existing) => {
                let id = existing[1].to_owned();
                used.insert(id.clone());
                (id, caps[0].to_owned())
            }
            None => {
                let id = unique_id(&slugify(&title), &mut used);
                let tag = format!(r#"<h{level}{attrs} id="{id}">{inner}</h{level}>"#);
                (id, tag)
            }
        };

        entries.push(TocEntry { level, id, title });
        tag
    });

    (with_ids.into_owned(), entries)
}

/// Render a nested table of contents. No entries render as an empty string.
///
/// # Example
///
/// ```
/// use wiki_markup::toc::{TocEntry, render_toc};
///
/// let entries = vec![TocEntry { level: 2, id: "intro".into(), title: "Intro".into() }];
/// assert_eq!(
///     render_toc(&entries),
///     r##"<div class="toc"><ul><li><a href="&#x23;intro">Intro</a></li></ul></div>"##
/// );
/// ```
#[must_use]
pub fn render_toc(entries: &[TocEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }

    let mut out = String::from(r#"<div class="toc">"#);
    let mut open: Vec<u8> = Vec::new();

    for entry in entries {
        match open.last().copied() {
            None => {
                out.push_str("<ul><li>");
                open.push(entry.level);
            }
            Some(last) if entry.level > last => {
                out.push_str("<ul><li>");
                open.push(entry.level);
            }
            Some(_) => {
                while open.len() > 1 && open.last().is_some_and(|&last| entry.level < last) {
                    out.push_str("</li></ul>");
                    open.pop();
                }
                out.push_str("</li><li>");
                if let Some(last) = open.last_mut() {
                    *last = entry.level;
                }
            }
        }
        write!(
            out,
            r#"<a href="{}">{}</a>"#,
            escape_attribute(&format!("#{}", entry.id)),
            entry.title
        )
        .unwrap();
    }

    for _ in open {
        out.push_str("</li></ul>");
    }
    out.push_str("</div>");
    out
}

/// Lowercase letters and digits joined by single dashes.
fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if dash && !slug.is_empty() {
                slug.push('-');
            }
            dash = false;
            slug.extend(c.to_lowercase());
        } else {
            dash = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("section");
    }
    slug
}

fn unique_id(base: &str, used: &mut HashSet<String>) -> String {
    let mut id = base.to_owned();
    let mut n = 0;
    while used.contains(&id) {
        n += 1;
        id = format!("{base}-{n}");
    }
    used.insert(id.clone());
    id
}
