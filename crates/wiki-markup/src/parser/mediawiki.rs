//! MediaWiki-style wikitext grammar.

use super::blocks::{Cell, ListBuilder, TableBuilder, paragraph, split_cells};
use super::inline::{FormatStack, char_len_at, entity_len, html_tag_len, push_text_char, url_at};
use super::{MarkupParser, ParseHooks, page_links};
use crate::dialect::MarkupDialect;
use crate::escape::{escape_html, push_escaped};
use crate::util::{find_ignore_case, starts_with_ignore_case};

/// Link prefixes that embed media instead of linking to a page.
const MEDIA_PREFIXES: &[&str] = &["file:", "image:"];

/// Schemes accepted inside single-bracket external links.
const EXTERNAL_SCHEMES: &[&str] = &["http://", "https://", "ftp://", "mailto:", "//"];

/// Image options that are not alt text.
const IMAGE_OPTIONS: &[&str] = &[
    "thumb", "thumbnail", "frame", "frameless", "border", "left", "right", "center", "none",
    "upright",
];

/// MediaWiki-style wikitext parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaWikiParser;

impl MarkupParser for MediaWikiParser {
    fn dialect(&self) -> MarkupDialect {
        MarkupDialect::MediaWiki
    }

    fn parse(&self, markup: &str, hooks: &mut dyn ParseHooks) -> String {
        let mut doc = Document {
            hooks,
            blocks: Vec::new(),
            open: Open::Nothing,
        };
        for line in markup.lines() {
            doc.line(line);
        }
        doc.flush();
        doc.blocks.join("\n")
    }

    fn contains_page_link(&self, markup: &str, title: &str) -> bool {
        page_links::bracket_contains(markup, title, MEDIA_PREFIXES)
    }

    fn replace_page_links(&self, markup: &str, old_title: &str, new_title: &str) -> String {
        page_links::bracket_replace(markup, old_title, new_title, MEDIA_PREFIXES)
    }
}

enum Open<'m> {
    Nothing,
    Paragraph(Vec<&'m str>),
    Preformatted(Vec<&'m str>),
    List {
        builder: ListBuilder,
        html: String,
        item: &'m str,
    },
    Table(TableBuilder),
}

struct Document<'m, 'h> {
    hooks: &'h mut dyn ParseHooks,
    blocks: Vec<String>,
    open: Open<'m>,
}

impl<'m> Document<'m, '_> {
    fn line(&mut self, line: &'m str) {
        let trimmed = line.trim();

        if matches!(self.open, Open::Table(_)) {
            self.table_line(trimmed);
            return;
        }

        if trimmed.is_empty() {
            self.flush();
        } else if trimmed.starts_with("{|") {
            self.flush();
            self.open = Open::Table(TableBuilder::default());
        } else if let Some((level, text)) = heading(trimmed) {
            self.flush();
            let html = render_inline(text, &mut *self.hooks);
            self.blocks.push(format!("<h{level}>{html}</h{level}>"));
        } else if trimmed.len() >= 4 && trimmed.bytes().all(|b| b == b'-') {
            self.flush();
            self.blocks.push("<hr />".to_owned());
        } else if trimmed.starts_with(['*', '#']) {
            self.list_item(trimmed);
        } else if let Some(pre) = line.strip_prefix(' ') {
            if !matches!(self.open, Open::Preformatted(_)) {
                self.flush();
                self.open = Open::Preformatted(Vec::new());
            }
            if let Open::Preformatted(lines) = &mut self.open {
                lines.push(pre);
            }
        } else {
            if !matches!(self.open, Open::Paragraph(_)) {
                self.flush();
                self.open = Open::Paragraph(Vec::new());
            }
            if let Open::Paragraph(lines) = &mut self.open {
                lines.push(line);
            }
        }
    }

    fn list_item(&mut self, trimmed: &'m str) {
        let len = trimmed
            .bytes()
            .take_while(|b| matches!(b, b'*' | b'#'))
            .count();
        if !matches!(self.open, Open::List { .. }) {
            self.flush();
            self.open = Open::List {
                builder: ListBuilder::default(),
                html: String::new(),
                item: "",
            };
        }
        if let Open::List {
            builder,
            html,
            item,
        } = &mut self.open
        {
            if builder.is_open() {
                html.push_str(&render_inline(item, &mut *self.hooks));
            }
            builder.item(&trimmed[..len], html);
            *item = trimmed[len..].trim();
        }
    }

    fn table_line(&mut self, trimmed: &str) {
        if trimmed.starts_with("|}") {
            self.flush();
            return;
        }
        if trimmed.starts_with("|-") || trimmed.starts_with("|+") || trimmed.is_empty() {
            if trimmed.starts_with("|-")
                && let Open::Table(table) = &mut self.open
            {
                table.push_row(Vec::new());
            }
            return;
        }

        let (header, body) = if let Some(body) = trimmed.strip_prefix('!') {
            (true, body)
        } else if let Some(body) = trimmed.strip_prefix('|') {
            (false, body)
        } else {
            return;
        };

        let mut cells = split_cells(body, "||");
        if header {
            cells = cells
                .into_iter()
                .flat_map(|cell| split_cells(cell, "!!"))
                .collect();
        }

        for cell in cells {
            let content = split_cells(cell, "|").pop().unwrap_or(cell);
            let html = render_inline(content.trim(), &mut *self.hooks);
            if let Open::Table(table) = &mut self.open {
                table.push_cell(Cell { header, html });
            }
        }
    }

    fn flush(&mut self) {
        let mut out = String::new();
        match std::mem::replace(&mut self.open, Open::Nothing) {
            Open::Nothing => return,
            Open::Paragraph(lines) => {
                let html = render_inline(&lines.join("\n"), &mut *self.hooks);
                paragraph(&html, &mut out);
            }
            Open::Preformatted(lines) => {
                let html = render_inline(&lines.join("\n"), &mut *self.hooks);
                out.push_str("<pre>");
                out.push_str(&html);
                out.push_str("</pre>");
            }
            Open::List {
                mut builder,
                mut html,
                item,
            } => {
                html.push_str(&render_inline(item, &mut *self.hooks));
                builder.finish(&mut html);
                out = html;
            }
            Open::Table(mut table) => table.finish(&mut out),
        }
        self.blocks.push(out);
    }
}

/// `== Title ==` style heading: level and inner text.
fn heading(trimmed: &str) -> Option<(usize, &str)> {
    let leading = trimmed.bytes().take_while(|&b| b == b'=').count();
    let trailing = trimmed.bytes().rev().take_while(|&b| b == b'=').count();
    if leading == 0 || trailing == 0 || leading + trailing >= trimmed.len() {
        return None;
    }
    let level = leading.min(trailing).min(6);
    let text = &trimmed[level..trimmed.len() - level];
    Some((level, text.trim()))
}

fn render_inline(text: &str, hooks: &mut dyn ParseHooks) -> String {
    let mut inline = Inline {
        out: String::with_capacity(text.len() + 16),
        stack: FormatStack::default(),
        hooks,
    };
    let mut i = 0;
    while i < text.len() {
        i += inline.step(text, i);
    }
    inline.stack.close_all(&mut inline.out);
    inline.out
}

struct Inline<'h> {
    out: String,
    stack: FormatStack,
    hooks: &'h mut dyn ParseHooks,
}

impl Inline<'_> {
    fn step(&mut self, text: &str, i: usize) -> usize {
        let rest = &text[i..];
        match rest.as_bytes()[0] {
            b'\'' if rest.starts_with("'''''") => {
                self.bold_italic();
                5
            }
            b'\'' if rest.starts_with("'''") => {
                self.stack.toggle("strong", &mut self.out);
                3
            }
            b'\'' if rest.starts_with("''") => {
                self.stack.toggle("em", &mut self.out);
                2
            }
            b'[' if rest.starts_with("[[") => match rest[2..].find("]]") {
                Some(end) => {
                    self.internal(&rest[2..2 + end]);
                    end + 4
                }
                None => {
                    self.out.push_str("[[");
                    2
                }
            },
            b'[' => self.external(rest),
            b'<' if starts_with_ignore_case(rest, "<nowiki>") => {
                let body = &rest[8..];
                match find_ignore_case(body, "</nowiki>") {
                    Some(end) => {
                        push_escaped(&mut self.out, &body[..end]);
                        8 + end + 9
                    }
                    None => {
                        self.out.push_str("&lt;");
                        1
                    }
                }
            }
            b'<' => match html_tag_len(rest) {
                Some(len) => {
                    self.out.push_str(&rest[..len]);
                    len
                }
                None => {
                    self.out.push_str("&lt;");
                    1
                }
            },
            b'&' => match entity_len(rest) {
                Some(len) => {
                    self.out.push_str(&rest[..len]);
                    len
                }
                None => {
                    self.out.push_str("&amp;");
                    1
                }
            },
            b'h' | b'H' => match url_at(text, i) {
                Some(len) => {
                    let url = &rest[..len];
                    let html = self.hooks.link(url, url, &escape_html(url));
                    self.out.push_str(&html);
                    len
                }
                None => {
                    self.out.push(char::from(rest.as_bytes()[0]));
                    1
                }
            },
            _ => {
                let len = char_len_at(text, i);
                for c in rest[..len].chars() {
                    push_text_char(&mut self.out, c);
                }
                len
            }
        }
    }

    /// `'''''` closes whichever of bold/italic is innermost first.
    fn bold_italic(&mut self) {
        if self.stack.contains("strong") && self.stack.contains("em") {
            let inner = self.stack.top().unwrap_or("em");
            let outer = if inner == "em" { "strong" } else { "em" };
            self.stack.toggle(inner, &mut self.out);
            self.stack.toggle(outer, &mut self.out);
        } else {
            self.stack.toggle("strong", &mut self.out);
            self.stack.toggle("em", &mut self.out);
        }
    }

    fn internal(&mut self, inner: &str) {
        let target = inner.split_once('|').map_or(inner, |(target, _)| target).trim();
        if target.is_empty() {
            self.out.push_str("[[");
            push_escaped(&mut self.out, inner);
            self.out.push_str("]]");
            return;
        }

        if let Some(prefix) = MEDIA_PREFIXES
            .iter()
            .find(|prefix| starts_with_ignore_case(target, prefix))
        {
            let src = target[prefix.len()..].trim();
            let alt = inner
                .split('|')
                .skip(1)
                .map(str::trim)
                .filter(|part| !is_image_option(part))
                .last()
                .unwrap_or("");
            let html = self.hooks.image(src, alt, alt);
            self.out.push_str(&html);
            return;
        }

        let html = match inner.split_once('|').map(|(_, text)| text.trim()) {
            Some(text) if !text.is_empty() => {
                let text_html = render_inline(text, &mut *self.hooks);
                self.hooks.link(target, text, &text_html)
            }
            _ => self.hooks.link(target, target, &escape_html(target)),
        };
        self.out.push_str(&html);
    }

    /// `[url text]`. Anything else is a literal bracket.
    fn external(&mut self, rest: &str) -> usize {
        let body = &rest[1..];
        let is_url = EXTERNAL_SCHEMES
            .iter()
            .any(|scheme| starts_with_ignore_case(body, scheme));
        let end = body.find(']').filter(|&end| !body[..end].contains('\n'));

        let (true, Some(end)) = (is_url, end) else {
            self.out.push('[');
            return 1;
        };

        let inner = &body[..end];
        let (url, text) = match inner.split_once(char::is_whitespace) {
            Some((url, text)) if !text.trim().is_empty() => (url, text.trim()),
            _ => (inner.trim(), inner.trim()),
        };
        let text_html = render_inline(text, &mut *self.hooks);
        let html = self.hooks.link(url, text, &text_html);
        self.out.push_str(&html);
        end + 2
    }
}

fn is_image_option(part: &str) -> bool {
    part.is_empty()
        || IMAGE_OPTIONS.iter().any(|opt| part.eq_ignore_ascii_case(opt))
        || (part.ends_with("px") && part[..part.len() - 2].bytes().all(|b| b.is_ascii_digit() || b == b'x'))
}
