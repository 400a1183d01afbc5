//! Markup grammars.
//!
//! Every dialect implements [`MarkupParser`]. A parser only knows its own
//! syntax: link and image targets are handed to [`ParseHooks`] as raw text,
//! and the hooks return the HTML to splice in. The converter wires the hooks
//! to the link resolver, so no grammar ever writes an `href` itself.

mod blocks;
mod creole;
mod inline;
mod markdown;
mod mediawiki;
mod page_links;

use std::sync::Arc;

use crate::dialect::MarkupDialect;

pub use creole::CreoleParser;
pub use markdown::MarkdownParser;
pub use mediawiki::MediaWikiParser;

/// Callbacks fired while a grammar renders links and images.
pub trait ParseHooks {
    /// A link was seen.
    ///
    /// `target` and `text` are the raw authored values; `text_html` is the
    /// display content already rendered by the grammar. Returns the complete
    /// anchor element.
    fn link(&mut self, target: &str, text: &str, text_html: &str) -> String;

    /// An image was seen. Returns the complete image element.
    fn image(&mut self, src: &str, alt: &str, title: &str) -> String;
}

/// A markup grammar.
pub trait MarkupParser: Send + Sync {
    /// Dialect implemented by this parser.
    fn dialect(&self) -> MarkupDialect;

    /// Render markup to HTML.
    ///
    /// Never fails: constructs the grammar cannot interpret are emitted as
    /// escaped text.
    fn parse(&self, markup: &str, hooks: &mut dyn ParseHooks) -> String;

    /// Whether the markup contains a link to the page `title`
    /// (case-insensitive).
    fn contains_page_link(&self, markup: &str, title: &str) -> bool;

    /// Rewrite links to page `old_title` so they point at `new_title`.
    ///
    /// Explicit display text is kept; links without one show the new title.
    fn replace_page_links(&self, markup: &str, old_title: &str, new_title: &str) -> String;
}

/// Shared handle to a grammar.
pub type ParserHandle = Arc<dyn MarkupParser>;
