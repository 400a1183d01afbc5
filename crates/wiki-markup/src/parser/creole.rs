//! Creole 1.0 grammar.

use super::blocks::{Cell, ListBuilder, TableBuilder, paragraph, split_cells};
use super::inline::{FormatStack, char_len_at, entity_len, html_tag_len, push_text_char, url_at};
use super::{MarkupParser, ParseHooks, page_links};
use crate::dialect::MarkupDialect;
use crate::escape::{escape_html, push_escaped};

/// Creole 1.0 parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreoleParser;

impl MarkupParser for CreoleParser {
    fn dialect(&self) -> MarkupDialect {
        MarkupDialect::Creole
    }

    fn parse(&self, markup: &str, hooks: &mut dyn ParseHooks) -> String {
        let mut doc = Document::new(hooks);
        for line in markup.lines() {
            doc.line(line);
        }
        doc.finish()
    }

    fn contains_page_link(&self, markup: &str, title: &str) -> bool {
        page_links::bracket_contains(markup, title, &[])
    }

    fn replace_page_links(&self, markup: &str, old_title: &str, new_title: &str) -> String {
        page_links::bracket_replace(markup, old_title, new_title, &[])
    }
}

enum Open<'m> {
    Nothing,
    Paragraph(Vec<&'m str>),
    List {
        builder: ListBuilder,
        html: String,
        item: String,
    },
    Table(TableBuilder),
    Preformatted(Vec<&'m str>),
}

struct Document<'m, 'h> {
    hooks: &'h mut dyn ParseHooks,
    blocks: Vec<String>,
    open: Open<'m>,
}

impl<'m, 'h> Document<'m, 'h> {
    fn new(hooks: &'h mut dyn ParseHooks) -> Self {
        Self {
            hooks,
            blocks: Vec::new(),
            open: Open::Nothing,
        }
    }

    fn line(&mut self, line: &'m str) {
        if let Open::Preformatted(lines) = &mut self.open {
            if line.trim() == "}}}" {
                self.flush();
            } else {
                lines.push(line);
            }
            return;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            self.flush();
        } else if trimmed == "{{{" {
            self.flush();
            self.open = Open::Preformatted(Vec::new());
        } else if trimmed.starts_with('=') {
            self.flush();
            self.heading(trimmed);
        } else if trimmed.len() >= 4 && trimmed.bytes().all(|b| b == b'-') {
            self.flush();
            self.blocks.push("<hr />".to_owned());
        } else if let Some(markers) = self.list_markers(trimmed) {
            self.list_item(markers, trimmed[markers.len()..].trim());
        } else if trimmed.starts_with('|') {
            self.table_row(trimmed);
        } else if let Open::List { item, .. } = &mut self.open {
            item.push('\n');
            item.push_str(trimmed);
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

    /// Leading `*`/`#` run, when it starts a list item rather than bold text.
    fn list_markers<'t>(&self, trimmed: &'t str) -> Option<&'t str> {
        let len = trimmed
            .bytes()
            .take_while(|b| matches!(b, b'*' | b'#'))
            .count();
        if len == 0 {
            return None;
        }
        let depth = match &self.open {
            Open::List { builder, .. } => builder.depth(),
            _ => 0,
        };
        let is_item = if depth == 0 { len == 1 } else { len <= depth + 1 };
        is_item.then(|| &trimmed[..len])
    }

    fn list_item(&mut self, markers: &str, text: &str) {
        if !matches!(self.open, Open::List { .. }) {
            self.flush();
            self.open = Open::List {
                builder: ListBuilder::default(),
                html: String::new(),
                item: String::new(),
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
            builder.item(markers, html);
            item.clear();
            item.push_str(text);
        }
    }

    fn heading(&mut self, trimmed: &str) {
        let level = trimmed.bytes().take_while(|&b| b == b'=').count().min(6);
        let text = trimmed
            .trim_start_matches('=')
            .trim_end_matches('=')
            .trim();
        let html = render_inline(text, &mut *self.hooks);
        self.blocks.push(format!("<h{level}>{html}</h{level}>"));
    }

    fn table_row(&mut self, trimmed: &str) {
        if !matches!(self.open, Open::Table(_)) {
            self.flush();
            self.open = Open::Table(TableBuilder::default());
        }

        let row = trimmed.strip_prefix('|').unwrap_or(trimmed);
        let row = row.strip_suffix('|').unwrap_or(row);
        let cells = split_cells(row, "|")
            .into_iter()
            .map(|cell| match cell.strip_prefix('=') {
                Some(header) => Cell {
                    header: true,
                    html: render_inline(header.trim(), &mut *self.hooks),
                },
                None => Cell {
                    header: false,
                    html: render_inline(cell.trim(), &mut *self.hooks),
                },
            })
            .collect();

        if let Open::Table(table) = &mut self.open {
            table.push_row(cells);
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
            Open::List {
                mut builder,
                mut html,
                item,
            } => {
                html.push_str(&render_inline(&item, &mut *self.hooks));
                builder.finish(&mut html);
                out = html;
            }
            Open::Table(mut table) => table.finish(&mut out),
            Open::Preformatted(lines) => {
                out.push_str("<pre>");
                push_escaped(&mut out, &lines.join("\n"));
                out.push_str("</pre>");
            }
        }
        self.blocks.push(out);
    }

    fn finish(mut self) -> String {
        self.flush();
        self.blocks.join("\n")
    }
}

/// Render Creole inline markup.
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
    /// Consume the construct at `text[i..]`, returning its byte length.
    fn step(&mut self, text: &str, i: usize) -> usize {
        let rest = &text[i..];
        match rest.as_bytes()[0] {
            b'~' => {
                if let Some(c) = rest[1..].chars().next().filter(|c| !c.is_whitespace()) {
                    push_text_char(&mut self.out, c);
                    return 1 + c.len_utf8();
                }
                self.out.push('~');
                1
            }
            b'[' if rest.starts_with("[[") => match rest[2..].find("]]") {
                Some(end) => {
                    self.link(&rest[2..2 + end]);
                    end + 4
                }
                None => {
                    self.out.push_str("[[");
                    2
                }
            },
            b'{' if rest.starts_with("{{{") => match rest[3..].find("}}}") {
                Some(end) => {
                    push_escaped(&mut self.out, &rest[3..3 + end]);
                    end + 6
                }
                None => {
                    self.out.push_str("{{{");
                    3
                }
            },
            b'{' if rest.starts_with("{{") => match rest[2..].find("}}") {
                Some(end) => {
                    self.image(&rest[2..2 + end]);
                    end + 4
                }
                None => {
                    self.out.push_str("{{");
                    2
                }
            },
            b'*' if rest.starts_with("**") => {
                self.stack.toggle("strong", &mut self.out);
                2
            }
            b'/' if rest.starts_with("//") && !text[..i].ends_with(':') => {
                self.stack.toggle("em", &mut self.out);
                2
            }
            b'\\' if rest.starts_with("\\\\") => {
                self.out.push_str("<br />");
                2
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

    fn link(&mut self, inner: &str) {
        let (target, text) = match inner.split_once('|') {
            Some((target, text)) => (target.trim(), Some(text.trim())),
            None => (inner.trim(), None),
        };
        if target.is_empty() {
            self.out.push_str("[[");
            push_escaped(&mut self.out, inner);
            self.out.push_str("]]");
            return;
        }

        let html = match text.filter(|text| !text.is_empty()) {
            Some(text) => {
                let text_html = render_inline(text, &mut *self.hooks);
                self.hooks.link(target, text, &text_html)
            }
            None => self.hooks.link(target, target, &escape_html(target)),
        };
        self.out.push_str(&html);
    }

    fn image(&mut self, inner: &str) {
        let (src, alt) = match inner.split_once('|') {
            Some((src, alt)) => (src.trim(), alt.trim()),
            None => (inner.trim(), ""),
        };
        if src.is_empty() {
            self.out.push_str("{{");
            push_escaped(&mut self.out, inner);
            self.out.push_str("}}");
            return;
        }
        let html = self.hooks.image(src, alt, "");
        self.out.push_str(&html);
    }
}
