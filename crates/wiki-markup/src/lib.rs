//! Wiki markup to sanitized HTML.
//!
//! A [`MarkupConverter`] turns raw Creole, Markdown or MediaWiki-style markup
//! into HTML in a fixed sequence of steps:
//!
//! 1. [`tokens::extract_tokens`] pulls pass-through blocks, the table of
//!    contents and named `@@token:body@@` invocations out of the markup.
//! 2. Enabled [`TextPlugin`]s transform the remaining markup.
//! 3. The dialect's [`MarkupParser`] renders HTML, calling back into the
//!    link and image resolvers for every target it sees.
//! 4. [`tokens::expand`] puts the rendered tokens back.
//! 5. Plugins transform the HTML, and the [`HtmlSanitizer`] strips blocked
//!    elements.
//!
//! # Example
//!
//! ```
//! use wiki_markup::{MarkupConverter, MarkupDialect, MarkupSettings};
//!
//! let settings = MarkupSettings {
//!     dialect: MarkupDialect::MediaWiki,
//!     ..MarkupSettings::default()
//! };
//! let converter = MarkupConverter::new(settings);
//!
//! assert_eq!(
//!     converter.to_html("''hello'' [[#top|back]]"),
//!     "<p><em>hello</em> <a href=\"&#x23;top\">back</a>\n</p>"
//! );
//! ```

mod context;
mod converter;
mod dialect;
mod error;
mod escape;
mod links;
pub mod parser;
mod plugin;
mod sanitizer;
pub mod toc;
pub mod tokens;
mod util;

pub use context::{
    AbsolutePathFn, ConversionContext, InternalLinkFn, MarkupSettings, NewPageLinkFn, PageLookup,
    PageLookupFn, Resolvers,
};
pub use converter::{Conversion, MarkupConverter};
pub use dialect::{MarkupDialect, select, select_by_name};
pub use error::{MarkupError, TokenExpansionError};
pub use escape::{escape_attribute, escape_html};
pub use links::{
    LinkKind, LinkReference, ResolvedImage, ResolvedLink, classify, resolve_image, resolve_link,
};
pub use parser::{MarkupParser, ParseHooks, ParserHandle};
pub use plugin::{PluginSet, TextPlugin};
pub use sanitizer::HtmlSanitizer;
pub use tokens::{TemplateToken, TokenRenderer, TokenTable};
