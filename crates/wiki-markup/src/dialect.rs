//! Markup dialects and grammar selection.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::MarkupError;
use crate::parser::{CreoleParser, MarkdownParser, MediaWikiParser, ParserHandle};

/// Wiki markup grammar used by a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum MarkupDialect {
    /// Creole 1.0.
    #[default]
    Creole,
    /// `CommonMark` with GitHub extensions.
    Markdown,
    /// MediaWiki-style wikitext.
    MediaWiki,
}

impl MarkupDialect {
    /// All supported dialects.
    pub const ALL: [Self; 3] = [Self::Creole, Self::Markdown, Self::MediaWiki];

    /// Canonical configuration name of the dialect.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Creole => "creole",
            Self::Markdown => "markdown",
            Self::MediaWiki => "mediawiki",
        }
    }
}

impl fmt::Display for MarkupDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MarkupDialect {
    type Err = MarkupError;

    /// Parse a configured dialect name (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|dialect| dialect.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| MarkupError::UnsupportedDialect(s.to_owned()))
    }
}

/// Return the parser for a dialect.
///
/// Every supported dialect always yields a usable parser.
#[must_use]
pub fn select(dialect: MarkupDialect) -> ParserHandle {
    match dialect {
        MarkupDialect::Creole => Arc::new(CreoleParser),
        MarkupDialect::Markdown => Arc::new(MarkdownParser::new()),
        MarkupDialect::MediaWiki => Arc::new(MediaWikiParser),
    }
}

/// Return the parser for a configured dialect name.
///
/// # Errors
///
/// Returns [`MarkupError::UnsupportedDialect`] for unknown names. There is no
/// fallback grammar.
pub fn select_by_name(name: &str) -> Result<ParserHandle, MarkupError> {
    name.parse().map(select)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tests::PlainHooks;

    #[test]
    fn test_from_str_case_insensitive() {
        assert_eq!("Creole".parse::<MarkupDialect>().unwrap(), MarkupDialect::Creole);
        assert_eq!("MARKDOWN".parse::<MarkupDialect>().unwrap(), MarkupDialect::Markdown);
        assert_eq!("Mediawiki".parse::<MarkupDialect>().unwrap(), MarkupDialect::MediaWiki);
        assert_eq!(" creole ".parse::<MarkupDialect>().unwrap(), MarkupDialect::Creole);
    }

    #[test]
    fn test_unknown_dialect_fails() {
        let err = "textile".parse::<MarkupDialect>().unwrap_err();
        assert!(matches!(err, MarkupError::UnsupportedDialect(ref name) if name == "textile"));
        assert!(err.to_string().contains("textile"));
    }

    #[test]
    fn test_select_by_name_unknown_has_no_fallback() {
        assert!(select_by_name("").is_err());
        assert!(select_by_name("bbcode").is_err());
    }

    #[test]
    fn test_every_dialect_yields_working_parser() {
        for dialect in MarkupDialect::ALL {
            let parser = select(dialect);
            assert_eq!(parser.dialect(), dialect);
            let html = parser.parse("hello", &mut PlainHooks::default());
            assert!(html.contains("<p>"), "{dialect}: {html}");
            assert!(html.contains("hello"), "{dialect}: {html}");
        }
    }

    #[test]
    fn test_display_round_trips_name() {
        for dialect in MarkupDialect::ALL {
            assert_eq!(dialect.to_string().parse::<MarkupDialect>().unwrap(), dialect);
        }
    }
}
