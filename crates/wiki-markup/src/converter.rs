//! The conversion pipeline.
//!
//! ```text
//! raw ─▶ extract tokens ─▶ before_parse ─▶ grammar ─▶ expand tokens ─▶ after_parse ─▶ sanitize
//!                                            │
//!                                 link/image hooks ─▶ resolvers
//! ```

use std::fmt;
use std::sync::Arc;

use crate::context::{ConversionContext, MarkupSettings, PageLookup, Resolvers};
use crate::dialect::{MarkupDialect, select};
use crate::error::MarkupError;
use crate::links::{LinkReference, resolve_image, resolve_link};
use crate::parser::{ParseHooks, ParserHandle};
use crate::plugin::{PluginSet, TextPlugin};
use crate::sanitizer::HtmlSanitizer;
use crate::tokens::{self, TokenSet, TokenTable};

/// Extraction attempts before giving up on collision-free placeholders.
const PLACEHOLDER_ATTEMPTS: usize = 4;

/// Result of one conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    /// Final, sanitized HTML.
    pub html: String,
    /// False when the output depends on a page lookup that gave no answer.
    pub is_cacheable: bool,
    /// Links seen while parsing, in document order.
    pub links: Vec<LinkReference>,
}

/// Converts raw wiki markup to HTML.
///
/// Built once per site configuration and shared between threads. Every call
/// gets its own [`ConversionContext`]; nothing is mutated between calls.
///
/// # Example
///
/// ```
/// use wiki_markup::{MarkupConverter, MarkupSettings};
///
/// let converter = MarkupConverter::new(MarkupSettings::default())
///     .with_internal_link_resolver(|_, title| format!("/wiki/{title}"));
///
/// assert_eq!(
///     converter.to_html("see [[Home]]"),
///     "<p>see <a href=\"&#x2F;wiki&#x2F;Home\">Home</a>\n</p>"
/// );
/// ```
#[derive(Clone)]
pub struct MarkupConverter {
    settings: MarkupSettings,
    parser: ParserHandle,
    resolvers: Resolvers,
    tokens: Arc<TokenTable>,
    plugins: PluginSet,
    sanitizer: HtmlSanitizer,
}

impl MarkupConverter {
    /// Create a converter for the given site settings.
    ///
    /// Resolvers default to identity mappings and every page is reported as
    /// existing.
    #[must_use]
    pub fn new(settings: MarkupSettings) -> Self {
        Self {
            parser: select(settings.dialect),
            sanitizer: HtmlSanitizer::new(settings.use_html_whitelist),
            settings,
            resolvers: Resolvers::default(),
            tokens: Arc::new(TokenTable::new()),
            plugins: PluginSet::default(),
        }
    }

    /// Create a converter with default settings for a configured dialect name.
    ///
    /// # Errors
    ///
    /// Returns [`MarkupError::UnsupportedDialect`] for unknown names.
    pub fn from_dialect_name(name: &str) -> Result<Self, MarkupError> {
        let dialect = name.parse::<MarkupDialect>()?;
        Ok(Self::new(MarkupSettings {
            dialect,
            ..MarkupSettings::default()
        }))
    }

    /// Set the callback turning attachment and image paths into absolute URLs.
    #[must_use]
    pub fn with_absolute_path_resolver(
        mut self,
        resolver: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.resolvers.absolute_path = Arc::new(resolver);
        self
    }

    /// Set the callback producing the URL of an existing page.
    #[must_use]
    pub fn with_internal_link_resolver(
        mut self,
        resolver: impl Fn(Option<i32>, &str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.resolvers.internal_link = Arc::new(resolver);
        self
    }

    /// Set the callback producing the "create page" URL for a missing page.
    #[must_use]
    pub fn with_new_page_link_resolver(
        mut self,
        resolver: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.resolvers.new_page_link = Arc::new(resolver);
        self
    }

    /// Set the page existence lookup.
    #[must_use]
    pub fn with_page_lookup(
        mut self,
        lookup: impl Fn(&str) -> PageLookup + Send + Sync + 'static,
    ) -> Self {
        self.resolvers.page_lookup = Arc::new(lookup);
        self
    }

    /// Set the named token table.
    #[must_use]
    pub fn with_tokens(mut self, tokens: Arc<TokenTable>) -> Self {
        self.tokens = tokens;
        self
    }

    /// Replace the plugin snapshot.
    #[must_use]
    pub fn with_plugins(mut self, plugins: PluginSet) -> Self {
        self.plugins = plugins;
        self
    }

    /// Append a plugin to the snapshot.
    #[must_use]
    pub fn with_plugin(mut self, plugin: Arc<dyn TextPlugin>) -> Self {
        self.plugins = self.plugins.with(plugin);
        self
    }

    /// Site settings in use.
    #[must_use]
    pub fn settings(&self) -> &MarkupSettings {
        &self.settings
    }

    /// Dialect in use.
    #[must_use]
    pub fn dialect(&self) -> MarkupDialect {
        self.parser.dialect()
    }

    /// Convert markup to HTML.
    #[must_use]
    pub fn to_html(&self, raw: &str) -> String {
        self.convert(raw).html
    }

    /// Convert markup, also reporting cacheability and the links seen.
    #[must_use]
    pub fn convert(&self, raw: &str) -> Conversion {
        if raw.is_empty() {
            return Conversion {
                html: String::new(),
                is_cacheable: true,
                links: Vec::new(),
            };
        }

        let mut parsed = self.parse(raw, "");
        for _ in 1..PLACEHOLDER_ATTEMPTS {
            if parsed.placeholders_intact {
                break;
            }
            tracing::debug!("Grammar output contains placeholder text, extracting again");
            parsed = self.parse(raw, &parsed.html);
        }
        if !parsed.placeholders_intact {
            tracing::warn!("Could not pick collision-free token placeholders");
        }

        let html = tokens::expand(&parsed.tokens, &parsed.html, &self.tokens);
        let html = self.plugins.after_parse(html);
        let html = self.sanitizer.sanitize(&html);

        tracing::debug!(
            dialect = %self.settings.dialect,
            tokens = parsed.tokens.len(),
            links = parsed.links.len(),
            cacheable = parsed.is_cacheable,
            "Converted markup"
        );

        Conversion {
            html,
            is_cacheable: parsed.is_cacheable,
            links: parsed.links,
        }
    }

    /// Extract tokens and run the grammar, with placeholders that never
    /// occur in `avoid`.
    fn parse(&self, raw: &str, avoid: &str) -> Parsed {
        let ctx = ConversionContext::new(&self.resolvers, &self.settings);

        let (markup, token_set) = tokens::extract_tokens_avoiding(raw, avoid);
        let markup = self.plugins.before_parse(markup);

        let mut hooks = ResolverHooks {
            ctx: &ctx,
            tokens: &token_set,
            links: Vec::new(),
        };
        let html = self.parser.parse(&markup, &mut hooks);
        let links = hooks.links;

        Parsed {
            placeholders_intact: token_set.is_empty()
                || token_set.placeholder_count(&html) <= token_set.placeholder_count(&markup),
            html,
            tokens: token_set,
            links,
            is_cacheable: ctx.is_cacheable(),
        }
    }

    /// Whether `markup` links to the page `title`.
    #[must_use]
    pub fn contains_page_link(&self, markup: &str, title: &str) -> bool {
        self.parser.contains_page_link(markup, title)
    }

    /// Point links to `old_title` at `new_title`.
    #[must_use]
    pub fn replace_page_links(&self, markup: &str, old_title: &str, new_title: &str) -> String {
        self.parser.replace_page_links(markup, old_title, new_title)
    }
}

impl Default for MarkupConverter {
    fn default() -> Self {
        Self::new(MarkupSettings::default())
    }
}

impl fmt::Debug for MarkupConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkupConverter")
            .field("settings", &self.settings)
            .field("tokens", &self.tokens)
            .field("plugins", &self.plugins)
            .finish_non_exhaustive()
    }
}

/// Grammar output of one extraction attempt.
struct Parsed {
    html: String,
    tokens: TokenSet,
    links: Vec<LinkReference>,
    is_cacheable: bool,
    /// False when the grammar produced placeholder text that was not in its
    /// input, which would expand a token in the wrong place.
    placeholders_intact: bool,
}

/// Parse hooks wired to the resolvers of one conversion.
///
/// Targets and attribute text get token placeholders replaced by the
/// token's literal text before resolving, so token HTML never reaches an
/// attribute and resolvers see what the author wrote.
struct ResolverHooks<'c, 'a> {
    ctx: &'c ConversionContext<'a>,
    tokens: &'c TokenSet,
    links: Vec<LinkReference>,
}

impl ParseHooks for ResolverHooks<'_, '_> {
    fn link(&mut self, target: &str, text: &str, text_html: &str) -> String {
        let target = self.tokens.restore_literal(target);
        let resolved = resolve_link(&target, self.ctx);
        self.links.push(LinkReference {
            target,
            text: self.tokens.restore_literal(text),
            kind: resolved.kind,
        });
        resolved.to_html(text_html)
    }

    fn image(&mut self, src: &str, alt: &str, title: &str) -> String {
        let src = self.tokens.restore_literal(src);
        resolve_image(&src, self.ctx).to_html(
            &self.tokens.restore_literal(alt),
            &self.tokens.restore_literal(title),
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use std::sync::Mutex;

    use super::*;
    use crate::error::TokenExpansionError;
    use crate::links::LinkKind;

    fn creole() -> MarkupConverter {
        MarkupConverter::default()
    }

    #[test]
    fn test_converter_is_send_sync() {
        static_assertions::assert_impl_all!(MarkupConverter: Send, Sync);
        static_assertions::assert_impl_all!(Conversion: Send, Sync);
    }

    #[test]
    fn test_empty_input() {
        let conversion = creole().convert("");
        assert_eq!(conversion.html, "");
        assert!(conversion.is_cacheable);
        assert!(conversion.links.is_empty());
    }

    #[test]
    fn test_anchor_and_external_not_rewritten() {
        let converter = creole().with_internal_link_resolver(|_, title| format!("/wiki/{title}"));
        assert_eq!(
            converter.to_html("[[#myanchortag|hello world]] [[https://www.google.com|google]]"),
            "<p><a href=\"&#x23;myanchortag\">hello world</a> <a href=\"https&#x3A;&#x2F;&#x2F;www&#x2E;google&#x2E;com\">google</a>\n</p>"
        );
    }

    #[test]
    fn test_attachment_forms_are_equivalent() {
        let converter = creole();
        let tilde = converter.to_html("[[~/my/folder/image1.jpg|hello world]]");
        let prefixed = converter.to_html("[[attachment:/my/folder/image1.jpg|hello world]]");
        assert_eq!(
            tilde,
            "<p><a href=\"&#x2F;Attachments&#x2F;my&#x2F;folder&#x2F;image1&#x2E;jpg\">hello world</a>\n</p>"
        );
        assert_eq!(tilde, prefixed);
    }

    #[test]
    fn test_blocked_elements_removed() {
        let markup = concat!(
            " some text <script type=\"text/html\">while(true)alert('lolz');</script>",
            "<iframe src=\"google.com\"></iframe><frame>blah</frame> ",
            "<applet code=\"MyApplet.class\" width=100 height=140></applet>",
            "<frameset src='new.html'></frameset>"
        );
        assert_eq!(creole().to_html(markup), "<p> some text blah \n</p>");
    }

    #[test]
    fn test_whitelist_off_keeps_html() {
        let fragment = r#"<div onclick="javascript:alert('ouch');">test</div>"#;
        let converter = MarkupConverter::new(MarkupSettings {
            use_html_whitelist: false,
            ..MarkupSettings::default()
        });
        assert_eq!(converter.to_html(fragment), format!("<p>{fragment}\n</p>"));
    }

    #[test]
    fn test_sanitized_output_is_stable() {
        let converter = creole();
        let once = converter.to_html("<scr<script>x</script>ipt>y</script> text");
        assert_eq!(HtmlSanitizer::new(true).sanitize(&once), once);
    }

    #[test]
    fn test_missing_page_gets_class() {
        let converter = creole()
            .with_page_lookup(|title| {
                if title == "Home" {
                    PageLookup::Exists(Some(1))
                } else {
                    PageLookup::Missing
                }
            })
            .with_internal_link_resolver(|id, title| format!("/wiki/{}/{title}", id.unwrap_or(0)))
            .with_new_page_link_resolver(|title| format!("/new?title={title}"));

        let conversion = converter.convert("[[Home]] [[Nowhere|go]]");
        assert_eq!(
            conversion.html,
            concat!(
                "<p><a href=\"&#x2F;wiki&#x2F;1&#x2F;Home\">Home</a> ",
                "<a href=\"&#x2F;new&#x3F;title&#x3D;Nowhere\" class=\"missing-page-link\">go</a>\n</p>"
            )
        );
        assert!(conversion.is_cacheable);
        assert_eq!(
            conversion.links,
            vec![
                LinkReference {
                    target: "Home".to_owned(),
                    text: "Home".to_owned(),
                    kind: LinkKind::InternalPageTitle,
                },
                LinkReference {
                    target: "Nowhere".to_owned(),
                    text: "go".to_owned(),
                    kind: LinkKind::InternalPageTitle,
                },
            ]
        );
    }

    #[test]
    fn test_indeterminate_lookup_not_cacheable() {
        let converter = creole().with_page_lookup(|_| PageLookup::Indeterminate);
        let conversion = converter.convert("[[Somewhere]]");
        assert!(!conversion.is_cacheable);
        assert_eq!(conversion.html, "<p><a href=\"Somewhere\">Somewhere</a>\n</p>");

        // A fresh conversion starts cacheable again.
        assert!(converter.convert("plain").is_cacheable);
    }

    #[test]
    fn test_image_through_absolute_path_resolver() {
        let converter = creole().with_absolute_path_resolver(|path| format!("{path}123"));
        assert_eq!(
            converter.to_html("{{/DSC001.jpg|photo}}"),
            "<p><img src=\"&#x2F;Attachments&#x2F;DSC001&#x2E;jpg123\" alt=\"photo\">\n</p>"
        );
    }

    #[test]
    fn test_pass_through_is_not_rewritten() {
        let conversion = creole().convert("{{{[[Page]] **x** <b>}}}");
        assert_eq!(conversion.html, "<p>[[Page]] **x** &lt;b&gt;\n</p>");
        assert!(conversion.links.is_empty());
    }

    #[test]
    fn test_named_token_expanded() {
        let table = TokenTable::new().with_template(
            "warningbox",
            r#"<div class="alert">${body}</div><br style="clear:both"/>"#,
        );
        let converter = creole().with_tokens(Arc::new(table));
        assert_eq!(
            converter.to_html("@@WarningBox:Careful@@"),
            "<p><div class=\"alert\">Careful</div><br style=\"clear:both\"/>\n</p>"
        );
    }

    #[test]
    fn test_failing_token_renders_literal_text() {
        let table = TokenTable::new().with_token("bad", |_: &str| {
            Err::<String, _>(TokenExpansionError::Renderer("boom".to_owned()))
        });
        let converter = creole().with_tokens(Arc::new(table));
        assert_eq!(converter.to_html("@@bad:<x>@@"), "<p>@@bad:&lt;x&gt;@@\n</p>");
    }

    #[test]
    fn test_token_with_pass_through_renders_pre() {
        let table = TokenTable::new().with_template(
            "warningbox",
            r#"<div class="alert">${body}</div><br style="clear:both"/>"#,
        );
        let converter = creole().with_tokens(Arc::new(table));
        let html = converter.to_html(
            "@@warningbox:ENTER YOUR CONTENT HERE \n{{{\nhere is my C#code\n}}} \n\n@@",
        );
        assert_eq!(
            html,
            concat!(
                "<p><div class=\"alert\">ENTER YOUR CONTENT HERE \n",
                "<pre>here is my C#code</pre> \n\n",
                "</div><br style=\"clear:both\"/>\n</p>"
            )
        );
    }

    #[test]
    fn test_token_in_link_target_stays_out_of_attributes() {
        let looked_up = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&looked_up);
        let table = TokenTable::new().with_token("code", |body: &str| {
            Ok::<_, TokenExpansionError>(format!("<code>{}</code>", body.replace('<', "&lt;")))
        });
        let converter = creole()
            .with_tokens(Arc::new(table))
            .with_page_lookup(move |title| {
                seen.lock().unwrap().push(title.to_owned());
                PageLookup::Exists(None)
            });

        let conversion = converter.convert(r#"[[@@code:x" onmouseover="alert(1)@@|hover]]"#);
        assert!(!conversion.html.contains("onmouseover=\""), "{}", conversion.html);
        assert!(conversion.html.starts_with("<p><a href=\"&#x40;&#x40;code&#x3A;x&#x22;"));
        assert_eq!(conversion.links[0].target, r#"@@code:x" onmouseover="alert(1)@@"#);
        assert_eq!(conversion.links[0].text, "hover");
        assert_eq!(
            *looked_up.lock().unwrap(),
            vec![r#"@@code:x" onmouseover="alert(1)@@"#.to_owned()]
        );
    }

    #[test]
    fn test_token_in_image_alt_is_literal_text() {
        let table = TokenTable::new().with_template("b", "<b>${body}</b>");
        let converter = creole().with_tokens(Arc::new(table));
        assert_eq!(
            converter.to_html("{{/a.png|@@b:x@@}}"),
            "<p><img src=\"&#x2F;Attachments&#x2F;a&#x2E;png\" alt=\"@@b:x@@\">\n</p>"
        );
    }

    #[test]
    fn test_escaped_placeholder_text_is_not_expanded() {
        let html = creole().to_html("{{{<b>secret</b>}}} and wiki~token0x");
        assert_eq!(html, "<p>&lt;b&gt;secret&lt;/b&gt; and wikitoken0x\n</p>");
    }

    #[test]
    fn test_table_of_contents() {
        let html = creole().to_html("{{TOC}}\n\n== Intro ==\n\n== Usage ==");
        assert_eq!(
            html,
            concat!(
                "<div class=\"toc\"><ul><li><a href=\"&#x23;intro\">Intro</a></li>",
                "<li><a href=\"&#x23;usage\">Usage</a></li></ul></div>\n",
                "<h2 id=\"intro\">Intro</h2>\n<h2 id=\"usage\">Usage</h2>"
            )
        );
    }

    #[test]
    fn test_toc_brace_counts() {
        let converter = creole();
        assert!(converter.to_html("{{TOC}}").is_empty());
        assert_eq!(converter.to_html("a {{{TOC}}} b"), "<p>a TOC b\n</p>");
        assert_eq!(converter.to_html("a {{{{TOC}}}} b"), "<p>a {TOC} b\n</p>");
    }

    #[test]
    fn test_plugins_wrap_the_grammar() {
        struct Shout;

        impl TextPlugin for Shout {
            fn id(&self) -> &str {
                "shout"
            }

            fn before_parse(&self, markup: &str) -> String {
                markup.replace("hello", "**hello**")
            }

            fn after_parse(&self, html: &str) -> String {
                format!("{html}<script>evil()</script>")
            }
        }

        let converter = creole().with_plugin(Arc::new(Shout));
        assert_eq!(converter.to_html("hello"), "<p><strong>hello</strong>\n</p>");
    }

    #[test]
    fn test_from_dialect_name() {
        let converter = MarkupConverter::from_dialect_name("MediaWiki").unwrap();
        assert_eq!(converter.dialect(), MarkupDialect::MediaWiki);
        assert_eq!(converter.to_html("'''b'''"), "<p><strong>b</strong>\n</p>");

        let err = MarkupConverter::from_dialect_name("textile").unwrap_err();
        assert!(matches!(err, MarkupError::UnsupportedDialect(_)));
    }

    #[test]
    fn test_every_dialect_renders_a_paragraph() {
        for dialect in MarkupDialect::ALL {
            let converter = MarkupConverter::new(MarkupSettings {
                dialect,
                ..MarkupSettings::default()
            });
            let html = converter.to_html("plain text");
            assert!(html.starts_with("<p>plain text"), "{dialect}: {html}");
        }
    }

    #[test]
    fn test_page_link_tools_use_dialect() {
        let converter = creole();
        assert!(converter.contains_page_link("see [[home page|here]]", "Home Page"));
        assert_eq!(
            converter.replace_page_links("see [[Home Page|here]]", "home page", "Start"),
            "see [[Start|here]]"
        );
    }

    #[test]
    fn test_concurrent_conversions() {
        let converter = creole().with_page_lookup(|title| {
            if title.starts_with('?') {
                PageLookup::Indeterminate
            } else {
                PageLookup::Exists(None)
            }
        });

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let converter = &converter;
                    scope.spawn(move || {
                        let markup = if i % 2 == 0 { "[[?maybe]]" } else { "[[Known]]" };
                        converter.convert(markup).is_cacheable
                    })
                })
                .collect();
            for (i, handle) in handles.into_iter().enumerate() {
                assert_eq!(handle.join().unwrap(), i % 2 == 1);
            }
        });
    }
}
