//! Per-conversion context and host-supplied resolver callbacks.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use crate::dialect::MarkupDialect;

/// Callback converting an attachment or image path to an absolute URL.
pub type AbsolutePathFn = dyn Fn(&str) -> String + Send + Sync;
/// Callback producing the canonical URL of an existing page.
pub type InternalLinkFn = dyn Fn(Option<i32>, &str) -> String + Send + Sync;
/// Callback producing the "create page" URL for a title that does not exist yet.
pub type NewPageLinkFn = dyn Fn(&str) -> String + Send + Sync;
/// Callback looking up whether a page with the given title exists.
pub type PageLookupFn = dyn Fn(&str) -> PageLookup + Send + Sync;

/// Outcome of looking up a page title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLookup {
    /// The page exists (with its id, when the host has one).
    Exists(Option<i32>),
    /// No page with this title exists.
    Missing,
    /// The lookup could not give a definitive answer. The link is rendered
    /// as an internal link and the result is marked non-cacheable.
    Indeterminate,
}

/// Site configuration consumed by the converter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupSettings {
    /// Markup grammar.
    pub dialect: MarkupDialect,
    /// Strip dangerous elements from the final HTML.
    pub use_html_whitelist: bool,
    /// Base path attachments are served from (e.g. `/Attachments`).
    pub attachments_path: String,
    /// Additional image host prefixes treated as external (e.g. `i.imgur.com/`).
    pub image_host_prefixes: Vec<String>,
}

impl Default for MarkupSettings {
    fn default() -> Self {
        Self {
            dialect: MarkupDialect::default(),
            use_html_whitelist: true,
            attachments_path: "/Attachments".to_owned(),
            image_host_prefixes: Vec::new(),
        }
    }
}

/// Host-supplied resolver callbacks.
///
/// The defaults map every path and title to itself and report every page as
/// existing.
#[derive(Clone)]
pub struct Resolvers {
    /// Attachment/image path to absolute URL.
    pub absolute_path: Arc<AbsolutePathFn>,
    /// Existing page to canonical URL.
    pub internal_link: Arc<InternalLinkFn>,
    /// Missing page to "create page" URL.
    pub new_page_link: Arc<NewPageLinkFn>,
    /// Page existence lookup.
    pub page_lookup: Arc<PageLookupFn>,
}

impl Default for Resolvers {
    fn default() -> Self {
        Self {
            absolute_path: Arc::new(|path: &str| path.to_owned()),
            internal_link: Arc::new(|_: Option<i32>, title: &str| title.to_owned()),
            new_page_link: Arc::new(|title: &str| title.to_owned()),
            page_lookup: Arc::new(|_: &str| PageLookup::Exists(None)),
        }
    }
}

impl fmt::Debug for Resolvers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolvers").finish_non_exhaustive()
    }
}

/// State for a single conversion.
///
/// Created by the converter before parsing begins and dropped when the
/// conversion returns. Resolvers are read-only for its whole lifetime; only
/// the cacheable flag changes.
pub struct ConversionContext<'a> {
    resolvers: &'a Resolvers,
    settings: &'a MarkupSettings,
    cacheable: Cell<bool>,
}

impl<'a> ConversionContext<'a> {
    /// Create a context for one conversion.
    #[must_use]
    pub fn new(resolvers: &'a Resolvers, settings: &'a MarkupSettings) -> Self {
        Self {
            resolvers,
            settings,
            cacheable: Cell::new(true),
        }
    }

    /// Convert a path to an absolute URL.
    pub fn absolute_path(&self, path: &str) -> String {
        (self.resolvers.absolute_path)(path)
    }

    /// URL of an existing page.
    pub fn internal_link(&self, page_id: Option<i32>, title: &str) -> String {
        (self.resolvers.internal_link)(page_id, title)
    }

    /// URL for creating a missing page.
    pub fn new_page_link(&self, title: &str) -> String {
        (self.resolvers.new_page_link)(title)
    }

    /// Look up a page title.
    pub fn lookup_page(&self, title: &str) -> PageLookup {
        (self.resolvers.page_lookup)(title)
    }

    /// Attachments base path.
    pub fn attachments_path(&self) -> &str {
        &self.settings.attachments_path
    }

    /// Extra image host prefixes treated as external.
    pub fn image_host_prefixes(&self) -> &[String] {
        &self.settings.image_host_prefixes
    }

    /// Whether the HTML whitelist is applied.
    pub fn use_html_whitelist(&self) -> bool {
        self.settings.use_html_whitelist
    }

    /// Whether the output of this conversion may be cached.
    pub fn is_cacheable(&self) -> bool {
        self.cacheable.get()
    }

    /// Mark the output as depending on something that may change.
    pub fn mark_uncacheable(&self) {
        self.cacheable.set(false);
    }
}

impl fmt::Debug for ConversionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionContext")
            .field("settings", self.settings)
            .field("cacheable", &self.cacheable.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_resolvers_are_identity() {
        let resolvers = Resolvers::default();
        let settings = MarkupSettings::default();
        let ctx = ConversionContext::new(&resolvers, &settings);

        assert_eq!(ctx.absolute_path("/a/b.png"), "/a/b.png");
        assert_eq!(ctx.internal_link(Some(3), "Home"), "Home");
        assert_eq!(ctx.new_page_link("New"), "New");
        assert_eq!(ctx.lookup_page("Anything"), PageLookup::Exists(None));
    }

    #[test]
    fn test_cacheable_flag() {
        let resolvers = Resolvers::default();
        let settings = MarkupSettings::default();
        let ctx = ConversionContext::new(&resolvers, &settings);

        assert!(ctx.is_cacheable());
        ctx.mark_uncacheable();
        assert!(!ctx.is_cacheable());
    }

    #[test]
    fn test_default_settings() {
        let settings = MarkupSettings::default();
        assert_eq!(settings.dialect, MarkupDialect::Creole);
        assert!(settings.use_html_whitelist);
        assert_eq!(settings.attachments_path, "/Attachments");
    }
}
