//! Markdown grammar: `CommonMark` with GitHub extensions.
//!
//! Rendering is event-driven over `pulldown-cmark`. Link and image content is
//! captured in a buffer stack until the closing event so the hooks receive
//! both the raw display text and its rendered HTML.

use std::fmt::Write;

use pulldown_cmark::{
    Alignment, BlockQuoteKind, CodeBlockKind, Event, LinkType, Options, Parser, Tag, TagEnd,
};

use super::{MarkupParser, ParseHooks, page_links};
use crate::dialect::MarkupDialect;
use crate::escape::{escape_html, push_escaped};

/// Markdown parser.
#[derive(Debug, Clone, Copy)]
pub struct MarkdownParser {
    gfm: bool,
}

impl MarkdownParser {
    /// Create a parser with GitHub Flavored Markdown enabled.
    #[must_use]
    pub fn new() -> Self {
        Self { gfm: true }
    }

    /// Enable or disable GitHub Flavored Markdown features.
    ///
    /// When enabled the parser supports tables, strikethrough (`~~text~~`),
    /// task lists (`- [ ] item`) and alert blockquotes (`> [!NOTE]`).
    #[must_use]
    pub fn with_gfm(mut self, enabled: bool) -> Self {
        self.gfm = enabled;
        self
    }

    fn options(self) -> Options {
        if self.gfm {
            Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_GFM
        } else {
            Options::empty()
        }
    }
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupParser for MarkdownParser {
    fn dialect(&self) -> MarkupDialect {
        MarkupDialect::Markdown
    }

    fn parse(&self, markup: &str, hooks: &mut dyn ParseHooks) -> String {
        let mut renderer = Renderer::new(hooks, markup.len());
        for event in Parser::new_ext(markup, self.options()) {
            renderer.event(event);
        }
        renderer.output
    }

    fn contains_page_link(&self, markup: &str, title: &str) -> bool {
        page_links::markdown_contains(markup, title)
    }

    fn replace_page_links(&self, markup: &str, old_title: &str, new_title: &str) -> String {
        page_links::markdown_replace(markup, old_title, new_title)
    }
}

/// Link or image content buffered until its end event.
struct Capture {
    kind: CaptureKind,
    html: String,
    text: String,
}

enum CaptureKind {
    Link { target: String },
    Image { src: String, title: String },
}

#[derive(Default)]
struct TableState {
    alignments: Vec<Alignment>,
    in_head: bool,
    cell: usize,
}

impl TableState {
    fn alignment_style(&self) -> &'static str {
        match self.alignments.get(self.cell) {
            Some(Alignment::Left) => r#" style="text-align: left""#,
            Some(Alignment::Center) => r#" style="text-align: center""#,
            Some(Alignment::Right) => r#" style="text-align: right""#,
            Some(Alignment::None) | None => "",
        }
    }
}

struct Renderer<'h> {
    output: String,
    hooks: &'h mut dyn ParseHooks,
    captures: Vec<Capture>,
    code: Option<String>,
    table: TableState,
}

impl<'h> Renderer<'h> {
    fn new(hooks: &'h mut dyn ParseHooks, capacity: usize) -> Self {
        Self {
            output: String::with_capacity(capacity * 2),
            hooks,
            captures: Vec::new(),
            code: None,
            table: TableState::default(),
        }
    }

    /// Push content to the innermost capture, or to the output.
    fn push_inline(&mut self, content: &str) {
        match self.captures.last_mut() {
            Some(capture) => capture.html.push_str(content),
            None => self.output.push_str(content),
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.inline_code(&code),
            Event::Html(html) | Event::InlineHtml(html) => self.push_inline(&html),
            Event::SoftBreak => self.soft_break(),
            Event::HardBreak => self.push_inline("<br />"),
            Event::Rule => self.output.push_str("<hr />"),
            Event::TaskListMarker(checked) => {
                self.push_inline(if checked {
                    r#"<input type="checkbox" disabled checked> "#
                } else {
                    r#"<input type="checkbox" disabled> "#
                });
            }
            Event::FootnoteReference(_) | Event::InlineMath(_) | Event::DisplayMath(_) => {
                // Not supported
            }
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.output.push_str("<p>"),
            Tag::Heading { level, .. } => write!(self.output, "<{level}>").unwrap(),
            Tag::BlockQuote(kind) => match kind {
                Some(kind) => write!(
                    self.output,
                    r#"<blockquote class="alert alert-{}">"#,
                    alert_name(kind)
                )
                .unwrap(),
                None => self.output.push_str("<blockquote>"),
            },
            Tag::CodeBlock(kind) => {
                match kind {
                    CodeBlockKind::Fenced(info) if !info.trim().is_empty() => {
                        let lang = info.split_whitespace().next().unwrap_or_default();
                        write!(
                            self.output,
                            r#"<pre><code class="language-{}">"#,
                            escape_html(lang)
                        )
                        .unwrap();
                    }
                    _ => self.output.push_str("<pre><code>"),
                }
                self.code = Some(String::new());
            }
            Tag::List(start) => match start {
                Some(1) => self.output.push_str("<ol>"),
                Some(n) => write!(self.output, r#"<ol start="{n}">"#).unwrap(),
                None => self.output.push_str("<ul>"),
            },
            Tag::Item => self.output.push_str("<li>"),
            Tag::FootnoteDefinition(_) | Tag::HtmlBlock | Tag::MetadataBlock(_) => {}
            Tag::DefinitionList => self.output.push_str("<dl>"),
            Tag::DefinitionListTitle => self.output.push_str("<dt>"),
            Tag::DefinitionListDefinition => self.output.push_str("<dd>"),
            Tag::Table(alignments) => {
                self.table = TableState {
                    alignments,
                    ..TableState::default()
                };
                self.output.push_str("<table>");
            }
            Tag::TableHead => {
                self.table.in_head = true;
                self.table.cell = 0;
                self.output.push_str("<thead><tr>");
            }
            Tag::TableRow => {
                self.table.cell = 0;
                self.output.push_str("<tr>");
            }
            Tag::TableCell => {
                let tag = if self.table.in_head { "th" } else { "td" };
                write!(self.output, "<{tag}{}>", self.table.alignment_style()).unwrap();
            }
            Tag::Emphasis => self.push_inline("<em>"),
            Tag::Strong => self.push_inline("<strong>"),
            Tag::Strikethrough => self.push_inline("<s>"),
            Tag::Superscript => self.push_inline("<sup>"),
            Tag::Subscript => self.push_inline("<sub>"),
            Tag::Link {
                link_type,
                dest_url,
                ..
            } => {
                let target = if link_type == LinkType::Email {
                    format!("mailto:{dest_url}")
                } else {
                    dest_url.to_string()
                };
                self.captures.push(Capture {
                    kind: CaptureKind::Link { target },
                    html: String::new(),
                    text: String::new(),
                });
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                self.captures.push(Capture {
                    kind: CaptureKind::Image {
                        src: dest_url.to_string(),
                        title: title.to_string(),
                    },
                    html: String::new(),
                    text: String::new(),
                });
            }
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.output.push_str("</p>"),
            TagEnd::Heading(level) => write!(self.output, "</{level}>").unwrap(),
            TagEnd::BlockQuote(_) => self.output.push_str("</blockquote>"),
            TagEnd::CodeBlock => {
                let content = self.code.take().unwrap_or_default();
                push_escaped(&mut self.output, &content);
                self.output.push_str("</code></pre>");
            }
            TagEnd::List(ordered) => self.output.push_str(if ordered { "</ol>" } else { "</ul>" }),
            TagEnd::Item => self.output.push_str("</li>"),
            TagEnd::FootnoteDefinition | TagEnd::HtmlBlock | TagEnd::MetadataBlock(_) => {}
            TagEnd::DefinitionList => self.output.push_str("</dl>"),
            TagEnd::DefinitionListTitle => self.output.push_str("</dt>"),
            TagEnd::DefinitionListDefinition => self.output.push_str("</dd>"),
            TagEnd::Table => self.output.push_str("</tbody></table>"),
            TagEnd::TableHead => {
                self.table.in_head = false;
                self.output.push_str("</tr></thead><tbody>");
            }
            TagEnd::TableRow => self.output.push_str("</tr>"),
            TagEnd::TableCell => {
                self.output
                    .push_str(if self.table.in_head { "</th>" } else { "</td>" });
                self.table.cell += 1;
            }
            TagEnd::Emphasis => self.push_inline("</em>"),
            TagEnd::Strong => self.push_inline("</strong>"),
            TagEnd::Strikethrough => self.push_inline("</s>"),
            TagEnd::Superscript => self.push_inline("</sup>"),
            TagEnd::Subscript => self.push_inline("</sub>"),
            TagEnd::Link | TagEnd::Image => self.end_capture(),
        }
    }

    fn end_capture(&mut self) {
        let Some(capture) = self.captures.pop() else {
            return;
        };
        let html = match capture.kind {
            CaptureKind::Link { target } => {
                self.hooks.link(&target, &capture.text, &capture.html)
            }
            CaptureKind::Image { src, title } => self.hooks.image(&src, &capture.text, &title),
        };
        if let Some(parent) = self.captures.last_mut() {
            parent.text.push_str(&capture.text);
        }
        self.push_inline(&html);
    }

    fn text(&mut self, text: &str) {
        if let Some(code) = &mut self.code {
            code.push_str(text);
            return;
        }
        if let Some(capture) = self.captures.last_mut() {
            capture.text.push_str(text);
        }
        self.push_inline(&escape_html(text));
    }

    fn inline_code(&mut self, code: &str) {
        if let Some(capture) = self.captures.last_mut() {
            capture.text.push_str(code);
        }
        self.push_inline(&format!("<code>{}</code>", escape_html(code)));
    }

    fn soft_break(&mut self) {
        if let Some(capture) = self.captures.last_mut() {
            capture.text.push(' ');
        }
        self.push_inline("\n");
    }
}

fn alert_name(kind: BlockQuoteKind) -> &'static str {
    match kind {
        BlockQuoteKind::Note => "note",
        BlockQuoteKind::Tip => "tip",
        BlockQuoteKind::Important => "important",
        BlockQuoteKind::Warning => "warning",
        BlockQuoteKind::Caution => "caution",
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parser::tests::PlainHooks;

    fn parse(markup: &str) -> String {
        MarkdownParser::new().parse(markup, &mut PlainHooks::default())
    }

    #[test]
    fn test_paragraph() {
        assert_eq!(parse("Hello, world!"), "<p>Hello, world!</p>");
    }

    #[test]
    fn test_heading() {
        assert_eq!(parse("## Section Title"), "<h2>Section Title</h2>");
    }

    #[test]
    fn test_inline_formatting() {
        assert_eq!(
            parse("**bold** *em* ~~gone~~ `code`"),
            "<p><strong>bold</strong> <em>em</em> <s>gone</s> <code>code</code></p>"
        );
    }

    #[test]
    fn test_link_reaches_hooks_with_rendered_text() {
        let mut hooks = PlainHooks::default();
        let html = MarkdownParser::new().parse("[the *page*](Main Page)", &mut hooks);
        assert_eq!(html, "<p>[the <em>page</em>](Main Page)</p>");
        assert!(hooks.links.is_empty());

        let html = MarkdownParser::new().parse("[the *page*](<Main Page>)", &mut hooks);
        assert_eq!(html, "<p><a href=\"Main Page\">the <em>page</em></a></p>");
        assert_eq!(hooks.links, vec![("Main Page".to_owned(), "the page".to_owned())]);
    }

    #[test]
    fn test_email_autolink_gets_mailto() {
        let mut hooks = PlainHooks::default();
        MarkdownParser::new().parse("<spam@gmail.com>", &mut hooks);
        assert_eq!(hooks.links[0].0, "mailto:spam@gmail.com");
    }

    #[test]
    fn test_image_alt_collected() {
        let mut hooks = PlainHooks::default();
        let html = MarkdownParser::new().parse("![A *nice* pic](/DSC001.jpg \"Title\")", &mut hooks);
        assert_eq!(html, "<p><img src=\"/DSC001.jpg\" alt=\"A nice pic\"></p>");
        assert_eq!(hooks.images, vec![("/DSC001.jpg".to_owned(), "A nice pic".to_owned())]);
    }

    #[test]
    fn test_image_inside_link() {
        let mut hooks = PlainHooks::default();
        let html = MarkdownParser::new().parse("[![logo](l.png)](Home)", &mut hooks);
        assert_eq!(
            html,
            "<p><a href=\"Home\"><img src=\"l.png\" alt=\"logo\"></a></p>"
        );
    }

    #[test]
    fn test_code_block_escaped() {
        assert_eq!(
            parse("```rust\nlet x = a < b;\n```"),
            "<pre><code class=\"language-rust\">let x = a &lt; b;\n</code></pre>"
        );
    }

    #[test]
    fn test_code_block_text_never_reaches_hooks() {
        let mut hooks = PlainHooks::default();
        MarkdownParser::new().parse("    [x](y)\n", &mut hooks);
        assert!(hooks.links.is_empty());
    }

    #[test]
    fn test_table_alignment() {
        let html = parse("| A | B |\n|:--|--:|\n| 1 | 2 |");
        assert_eq!(
            html,
            "<table><thead><tr><th style=\"text-align: left\">A</th><th style=\"text-align: right\">B</th></tr></thead><tbody><tr><td style=\"text-align: left\">1</td><td style=\"text-align: right\">2</td></tr></tbody></table>"
        );
    }

    #[test]
    fn test_raw_html_passthrough() {
        assert_eq!(
            parse("<div onclick=\"x\">test</div>"),
            "<div onclick=\"x\">test</div>"
        );
    }

    #[test]
    fn test_task_list() {
        let html = parse("- [x] done\n- [ ] todo");
        assert!(html.contains(r#"<input type="checkbox" disabled checked> done"#));
        assert!(html.contains(r#"<input type="checkbox" disabled> todo"#));
    }

    #[test]
    fn test_alert_blockquote() {
        let html = parse("> [!WARNING]\n> Careful");
        assert!(html.starts_with(r#"<blockquote class="alert alert-warning">"#), "{html}");
    }

    #[test]
    fn test_gfm_disabled() {
        let html = MarkdownParser::new()
            .with_gfm(false)
            .parse("~~x~~", &mut PlainHooks::default());
        assert_eq!(html, "<p>~~x~~</p>");
    }

    #[test]
    fn test_page_links() {
        let parser = MarkdownParser::new();
        assert!(parser.contains_page_link("see [it](Home)", "home"));
        assert_eq!(
            parser.replace_page_links("see [it](Home#top)", "home", "Start"),
            "see [it](Start#top)"
        );
    }
}
