//! Custom token engine.
//!
//! Tokens are pulled out of the raw markup before the grammar runs and put
//! back into the rendered HTML afterwards:
//!
//! ```text
//! raw markup ──extract_tokens──▶ markup with placeholders + TokenSet
//!                                       │
//!                                   grammar
//!                                       ▼
//! final HTML ◀──────expand─────── HTML with placeholders
//! ```
//!
//! Three token kinds exist:
//!
//! - pass-through blocks (`{{{ ... }}}`, `<nowiki>...</nowiki>`), rendered as
//!   literal text and never seen by the grammar;
//! - the built-in table of contents (`{{TOC}}`);
//! - named tokens (`@@name:body@@`), rendered by a [`TokenTable`] entry.

mod expand;
mod replacements;
mod scanner;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::TokenExpansionError;

pub use expand::expand;
pub use replacements::Replacements;
pub use scanner::{extract_tokens, render_literal};
pub(crate) use scanner::extract_tokens_avoiding;

/// Kind of extracted token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Pass-through inside a line; renders as escaped text.
    InlinePassThrough,
    /// Pass-through whose delimiters sit alone on their lines; renders as
    /// `<pre>`.
    BlockPassThrough,
    /// The built-in table of contents.
    TableOfContents,
    /// A named `@@name:body@@` invocation.
    Named,
}

/// A token extracted from raw markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token kind.
    pub kind: TokenKind,
    /// Token name (`nowiki` for pass-through, `toc` for the table of contents).
    pub name: String,
    /// Body as written by the author.
    pub raw_body: String,
    /// Full source text of the token, delimiters included.
    pub source: String,
}

impl Token {
    /// Whether the body renders as literal text.
    #[must_use]
    pub fn is_preformatted(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::InlinePassThrough | TokenKind::BlockPassThrough
        )
    }

    /// Plain-text form used where HTML cannot go: link targets, image
    /// sources and attribute values.
    ///
    /// Pass-through tokens give their body, every other token its source.
    #[must_use]
    pub fn literal(&self) -> &str {
        if self.is_preformatted() {
            &self.raw_body
        } else {
            &self.source
        }
    }
}

/// Tokens extracted from one document, in placeholder order.
#[derive(Debug, Clone, Default)]
pub struct TokenSet {
    prefix: String,
    tokens: Vec<Token>,
}

impl TokenSet {
    /// Placeholder text standing in for the token at `index`.
    ///
    /// Placeholders are ASCII letters and digits only, so every grammar
    /// passes them through as plain text.
    #[must_use]
    pub fn placeholder(&self, index: usize) -> String {
        format!("{}{index}x", self.prefix)
    }

    /// Replace every placeholder in `text` with its token's
    /// [`literal`](Token::literal) form.
    #[must_use]
    pub fn restore_literal(&self, text: &str) -> String {
        if self.tokens.is_empty() || !text.contains(&self.prefix) {
            return text.to_owned();
        }
        scanner::substitute(text, self, self.tokens.len(), |token| token.literal().to_owned())
    }

    /// Number of placeholder-like strings in `text`.
    pub(crate) fn placeholder_count(&self, text: &str) -> usize {
        text.matches(self.prefix.as_str()).count()
    }

    /// Extracted tokens.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Whether any table of contents was requested.
    #[must_use]
    pub fn has_toc(&self) -> bool {
        self.tokens
            .iter()
            .any(|token| token.kind == TokenKind::TableOfContents)
    }

    /// Number of tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether no tokens were extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Renders the body of a named token to an HTML fragment.
pub trait TokenRenderer: Send + Sync {
    /// Render the raw body.
    ///
    /// # Errors
    ///
    /// Returns [`TokenExpansionError`] when the body cannot be rendered. The
    /// token then shows as its literal source text.
    fn render(&self, body: &str) -> Result<String, TokenExpansionError>;
}

impl<F> TokenRenderer for F
where
    F: Fn(&str) -> Result<String, TokenExpansionError> + Send + Sync,
{
    fn render(&self, body: &str) -> Result<String, TokenExpansionError> {
        self(body)
    }
}

/// Token defined by an HTML template.
///
/// `${body}` is replaced by the body rendered with [`render_literal`]:
/// escaped text, with pass-through blocks as `<pre>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateToken {
    template: String,
}

impl TemplateToken {
    /// Placeholder replaced by the token body.
    pub const BODY: &'static str = "${body}";

    /// Create a template token.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl TokenRenderer for TemplateToken {
    fn render(&self, body: &str) -> Result<String, TokenExpansionError> {
        Ok(self.template.replace(Self::BODY, &render_literal(body)))
    }
}

/// Case-insensitive table of named token renderers.
///
/// Built once by the host and shared read-only between conversions.
#[derive(Clone, Default)]
pub struct TokenTable {
    renderers: HashMap<String, Arc<dyn TokenRenderer>>,
}

impl TokenTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a renderer under `name`, replacing any previous one.
    #[must_use]
    pub fn with_token(mut self, name: &str, renderer: impl TokenRenderer + 'static) -> Self {
        self.insert(name, renderer);
        self
    }

    /// Register an HTML template under `name`.
    #[must_use]
    pub fn with_template(self, name: &str, template: impl Into<String>) -> Self {
        self.with_token(name, TemplateToken::new(template))
    }

    /// Register a renderer under `name`, replacing any previous one.
    pub fn insert(&mut self, name: &str, renderer: impl TokenRenderer + 'static) {
        self.renderers
            .insert(name.to_lowercase(), Arc::new(renderer));
    }

    /// Look up a renderer by name (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn TokenRenderer> {
        self.renderers.get(&name.to_lowercase()).map(|renderer| &**renderer)
    }

    /// Number of registered tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    /// Whether no tokens are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }
}

impl fmt::Debug for TokenTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.renderers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("TokenTable").field("names", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_table_case_insensitive() {
        let table = TokenTable::new().with_template("WarningBox", "<b>${body}</b>");
        assert!(table.get("warningbox").is_some());
        assert!(table.get("WARNINGBOX").is_some());
        assert!(table.get("other").is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_template_escapes_body() {
        let token = TemplateToken::new(r#"<div class="alert">${body}</div>"#);
        assert_eq!(
            token.render("<script>").unwrap(),
            r#"<div class="alert">&lt;script&gt;</div>"#
        );
    }

    #[test]
    fn test_template_renders_pass_through_as_pre() {
        let token = TemplateToken::new("<div>${body}</div>");
        assert_eq!(
            token.render("see \n{{{\nlet x = a<b;\n}}}\n{{{**raw**}}} end").unwrap(),
            "<div>see \n<pre>let x = a&lt;b;</pre>\n**raw** end</div>"
        );
    }

    #[test]
    fn test_literal_form() {
        let (_, set) = extract_tokens("{{{**a**}}} @@x:y@@ {{TOC}}");
        let literals: Vec<&str> = set.tokens().iter().map(Token::literal).collect();
        assert_eq!(literals, vec!["**a**", "{{TOC}}", "@@x:y@@"]);
    }

    #[test]
    fn test_restore_literal() {
        let (markup, set) = extract_tokens("[[@@page:Home@@|{{{go}}}]]");
        assert_eq!(set.restore_literal(&markup), "[[@@page:Home@@|go]]");
        assert_eq!(set.restore_literal("untouched"), "untouched");
    }

    #[test]
    fn test_closure_renderer() {
        let table = TokenTable::new().with_token("upper", |body: &str| {
            Ok::<_, TokenExpansionError>(body.to_uppercase())
        });
        assert_eq!(table.get("Upper").unwrap().render("abc").unwrap(), "ABC");
    }

    #[test]
    fn test_debug_lists_names() {
        let table = TokenTable::new()
            .with_template("b", "")
            .with_template("a", "");
        assert_eq!(format!("{table:?}"), r#"TokenTable { names: ["a", "b"] }"#);
    }

    #[test]
    fn test_token_table_is_send_sync() {
        static_assertions::assert_impl_all!(TokenTable: Send, Sync);
    }
}
