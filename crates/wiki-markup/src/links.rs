//! Link and image target resolution.
//!
//! Targets are classified by a fixed rule set, evaluated in order:
//!
//! 1. `#anchor` - left as is
//! 2. `http://`, `https://`, `www.`, `mailto:`, `//` - left as is
//! 3. `~/path` - attachment
//! 4. `attachment:path` - attachment
//! 5. anything else - internal page title
//!
//! Classification is pure; resolution calls the host callbacks held by the
//! [`ConversionContext`]. Rendered `href`/`src` values are always
//! attribute-escaped.

use crate::context::{ConversionContext, PageLookup};
use crate::escape::{escape_attribute, escape_html};
use crate::util::starts_with_ignore_case;

const EXTERNAL_PREFIXES: [&str; 3] = ["http://", "https://", "www."];
const ATTACHMENT_PREFIX: &str = "attachment:";
/// Photo hosts whose images are external even when written without a
/// scheme (`i.imgur.com/a.png`). Subdomains match too.
const KNOWN_IMAGE_HOSTS: [&str; 4] = [
    "imgur.com",
    "photobucket.com",
    "flickr.com",
    "staticflickr.com",
];
const MISSING_PAGE_CLASS: &str = "missing-page-link";

/// Classification of a raw link target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// In-page anchor (`#section`).
    Anchor,
    /// Absolute external URL (`http://`, `https://`, `www.`).
    ExternalAbsolute,
    /// Protocol-relative URL (`//host/path`).
    ProtocolRelative,
    /// Email link (`mailto:`).
    Mailto,
    /// Attachment written as `~/path`.
    AttachmentTilde,
    /// Attachment written as `attachment:path`.
    AttachmentPrefixed,
    /// Title of a wiki page.
    InternalPageTitle,
}

impl LinkKind {
    /// Whether the target is left unrewritten.
    #[must_use]
    pub fn is_external(self) -> bool {
        matches!(
            self,
            Self::ExternalAbsolute | Self::ProtocolRelative | Self::Mailto
        )
    }

    /// Whether the target refers to an attachment.
    #[must_use]
    pub fn is_attachment(self) -> bool {
        matches!(self, Self::AttachmentTilde | Self::AttachmentPrefixed)
    }
}

/// A link seen while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReference {
    /// Target as written by the author.
    pub target: String,
    /// Display text as written by the author.
    pub text: String,
    /// Classification of the target.
    pub kind: LinkKind,
}

/// A resolved link target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    /// Final URL (unescaped).
    pub url: String,
    /// Classification of the original target.
    pub kind: LinkKind,
    /// CSS class for the anchor element, if any.
    pub css_class: Option<&'static str>,
}

impl ResolvedLink {
    /// Render an anchor element around already-rendered display HTML.
    #[must_use]
    pub fn to_html(&self, text_html: &str) -> String {
        match self.css_class {
            Some(class) => format!(
                r#"<a href="{}" class="{class}">{text_html}</a>"#,
                escape_attribute(&self.url)
            ),
            None => format!(r#"<a href="{}">{text_html}</a>"#, escape_attribute(&self.url)),
        }
    }
}

/// A resolved image source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    /// Final URL (unescaped).
    pub src: String,
    /// Whether the source was left unrewritten.
    pub external: bool,
}

impl ResolvedImage {
    /// Render an `<img>` element.
    #[must_use]
    pub fn to_html(&self, alt: &str, title: &str) -> String {
        let title_attr = if title.is_empty() {
            String::new()
        } else {
            format!(r#" title="{}""#, escape_html(title))
        };
        format!(
            r#"<img src="{}"{title_attr} alt="{}">"#,
            escape_attribute(&self.src),
            escape_html(alt)
        )
    }
}

/// Classify a raw link target.
///
/// # Example
///
/// ```
/// use wiki_markup::{LinkKind, classify};
///
/// assert_eq!(classify("#top"), LinkKind::Anchor);
/// assert_eq!(classify("WWW.example.com"), LinkKind::ExternalAbsolute);
/// assert_eq!(classify("~/files/a.pdf"), LinkKind::AttachmentTilde);
/// assert_eq!(classify("Main Page"), LinkKind::InternalPageTitle);
/// ```
pub fn classify(target: &str) -> LinkKind {
    let target = target.trim();
    if target.starts_with('#') {
        LinkKind::Anchor
    } else if starts_with_ignore_case(target, "mailto:") {
        LinkKind::Mailto
    } else if EXTERNAL_PREFIXES
        .iter()
        .any(|prefix| starts_with_ignore_case(target, prefix))
    {
        LinkKind::ExternalAbsolute
    } else if target.starts_with("//") {
        LinkKind::ProtocolRelative
    } else if target.starts_with("~/") {
        LinkKind::AttachmentTilde
    } else if starts_with_ignore_case(target, ATTACHMENT_PREFIX) {
        LinkKind::AttachmentPrefixed
    } else {
        LinkKind::InternalPageTitle
    }
}

/// Resolve a link target to its final URL.
///
/// Internal titles are looked up with the context's page lookup: existing
/// pages use the internal link resolver, missing pages the new page resolver.
/// An indeterminate lookup marks the conversion non-cacheable.
pub fn resolve_link(target: &str, ctx: &ConversionContext<'_>) -> ResolvedLink {
    let target = target.trim();
    let kind = classify(target);

    let (url, css_class) = match kind {
        LinkKind::Anchor
        | LinkKind::ExternalAbsolute
        | LinkKind::ProtocolRelative
        | LinkKind::Mailto => (target.to_owned(), None),
        LinkKind::AttachmentTilde | LinkKind::AttachmentPrefixed => {
            (attachment_url(attachment_remainder(target, kind), ctx), None)
        }
        LinkKind::InternalPageTitle => resolve_page_title(target, ctx),
    };

    ResolvedLink {
        url,
        kind,
        css_class,
    }
}

/// Resolve an image source to its final URL.
///
/// External URLs, well-known photo hosts and configured image host prefixes
/// are left unrewritten. Everything else is served from the attachments path.
pub fn resolve_image(src: &str, ctx: &ConversionContext<'_>) -> ResolvedImage {
    let src = src.trim();
    let kind = classify(src);

    let known_host = is_known_image_host(src)
        || ctx
            .image_host_prefixes()
            .iter()
            .any(|prefix| !prefix.is_empty() && starts_with_ignore_case(src, prefix));

    if kind.is_external() || kind == LinkKind::Anchor || known_host {
        return ResolvedImage {
            src: src.to_owned(),
            external: true,
        };
    }

    let remainder = if kind.is_attachment() {
        attachment_remainder(src, kind)
    } else {
        src
    };

    ResolvedImage {
        src: attachment_url(remainder, ctx),
        external: false,
    }
}

fn resolve_page_title(target: &str, ctx: &ConversionContext<'_>) -> (String, Option<&'static str>) {
    let (title, fragment) = match target.split_once('#') {
        Some((title, fragment)) => (title.trim(), Some(fragment)),
        None => (target, None),
    };

    let (mut url, css_class) = match ctx.lookup_page(title) {
        PageLookup::Exists(id) => (ctx.internal_link(id, title), None),
        PageLookup::Missing => (ctx.new_page_link(title), Some(MISSING_PAGE_CLASS)),
        PageLookup::Indeterminate => {
            tracing::debug!(title, "Page lookup indeterminate, output not cacheable");
            ctx.mark_uncacheable();
            (ctx.internal_link(None, title), None)
        }
    };

    if let Some(fragment) = fragment {
        url.push('#');
        url.push_str(fragment);
    }
    (url, css_class)
}

/// Whether `src` starts with a built-in photo host, e.g. `i.imgur.com/`.
fn is_known_image_host(src: &str) -> bool {
    let Some((host, _)) = src.split_once('/') else {
        return false;
    };
    KNOWN_IMAGE_HOSTS.iter().any(|known| {
        host.eq_ignore_ascii_case(known)
            || host
                .len()
                .checked_sub(known.len() + 1)
                .is_some_and(|dot| {
                    host.as_bytes()[dot] == b'.' && host[dot + 1..].eq_ignore_ascii_case(known)
                })
    })
}

/// Strip the attachment marker, leaving the path below the attachments root.
fn attachment_remainder(target: &str, kind: LinkKind) -> &str {
    match kind {
        LinkKind::AttachmentTilde => &target[1..],
        LinkKind::AttachmentPrefixed => &target[ATTACHMENT_PREFIX.len()..],
        _ => target,
    }
}

fn attachment_url(remainder: &str, ctx: &ConversionContext<'_>) -> String {
    let base = ctx.attachments_path().trim_end_matches('/');
    let path = if remainder.starts_with('/') {
        format!("{base}{remainder}")
    } else {
        format!("{base}/{remainder}")
    };
    ctx.absolute_path(&path)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::context::{MarkupSettings, Resolvers};

    fn settings() -> MarkupSettings {
        MarkupSettings::default()
    }

    #[test]
    fn test_classify_precedence() {
        assert_eq!(classify("#anchor"), LinkKind::Anchor);
        assert_eq!(classify("http://x.com"), LinkKind::ExternalAbsolute);
        assert_eq!(classify("HTTPS://x.com"), LinkKind::ExternalAbsolute);
        assert_eq!(classify("www.blah.com"), LinkKind::ExternalAbsolute);
        assert_eq!(classify("MailTo:a@b.com"), LinkKind::Mailto);
        assert_eq!(classify("//cdn.example.com/a.js"), LinkKind::ProtocolRelative);
        assert_eq!(classify("~/a/b.jpg"), LinkKind::AttachmentTilde);
        assert_eq!(classify("Attachment:/a/b.jpg"), LinkKind::AttachmentPrefixed);
        assert_eq!(classify("Some page"), LinkKind::InternalPageTitle);
        assert_eq!(classify("~notattachment"), LinkKind::InternalPageTitle);
    }

    #[test]
    fn test_external_targets_not_rewritten() {
        let resolvers = Resolvers::default();
        let settings = settings();
        let ctx = ConversionContext::new(&resolvers, &settings);

        for target in [
            "http://www.blah.com",
            "https://www.google.com",
            "www.blah.com",
            "mailto:spam@gmail.com",
            "#myanchortag",
        ] {
            let resolved = resolve_link(target, &ctx);
            assert_eq!(resolved.url, target);
            assert_eq!(resolved.css_class, None);
        }
    }

    #[test]
    fn test_attachment_forms_equivalent() {
        let resolvers = Resolvers::default();
        let settings = settings();
        let ctx = ConversionContext::new(&resolvers, &settings);

        let tilde = resolve_link("~/my/folder/image1.jpg", &ctx);
        let prefixed = resolve_link("attachment:/my/folder/image1.jpg", &ctx);

        assert_eq!(tilde.url, "/Attachments/my/folder/image1.jpg");
        assert_eq!(tilde.url, prefixed.url);
        assert_eq!(tilde.kind, LinkKind::AttachmentTilde);
        assert_eq!(prefixed.kind, LinkKind::AttachmentPrefixed);
    }

    #[test]
    fn test_attachment_without_leading_slash() {
        let resolvers = Resolvers::default();
        let settings = MarkupSettings {
            attachments_path: "/files/".to_owned(),
            ..MarkupSettings::default()
        };
        let ctx = ConversionContext::new(&resolvers, &settings);

        assert_eq!(resolve_link("attachment:doc.pdf", &ctx).url, "/files/doc.pdf");
        assert_eq!(resolve_link("~/doc.pdf", &ctx).url, "/files/doc.pdf");
    }

    #[test]
    fn test_attachment_uses_absolute_path_resolver() {
        let resolvers = Resolvers {
            absolute_path: Arc::new(|path: &str| format!("https://wiki.example.com{path}")),
            ..Resolvers::default()
        };
        let settings = settings();
        let ctx = ConversionContext::new(&resolvers, &settings);

        assert_eq!(
            resolve_link("~/a.txt", &ctx).url,
            "https://wiki.example.com/Attachments/a.txt"
        );
    }

    #[test]
    fn test_internal_existing_page() {
        let resolvers = Resolvers {
            internal_link: Arc::new(|id: Option<i32>, title: &str| {
                format!("/wiki/{}/{}", id.unwrap_or(0), title.replace(' ', "-"))
            }),
            page_lookup: Arc::new(|_: &str| PageLookup::Exists(Some(7))),
            ..Resolvers::default()
        };
        let settings = settings();
        let ctx = ConversionContext::new(&resolvers, &settings);

        let resolved = resolve_link("Main Page", &ctx);
        assert_eq!(resolved.url, "/wiki/7/Main-Page");
        assert_eq!(resolved.css_class, None);
        assert!(ctx.is_cacheable());
    }

    #[test]
    fn test_internal_missing_page() {
        let resolvers = Resolvers {
            new_page_link: Arc::new(|title: &str| format!("/pages/new?title={title}")),
            page_lookup: Arc::new(|_: &str| PageLookup::Missing),
            ..Resolvers::default()
        };
        let settings = settings();
        let ctx = ConversionContext::new(&resolvers, &settings);

        let resolved = resolve_link("Brand New", &ctx);
        assert_eq!(resolved.url, "/pages/new?title=Brand New");
        assert_eq!(resolved.css_class, Some("missing-page-link"));
    }

    #[test]
    fn test_internal_indeterminate_marks_uncacheable() {
        let resolvers = Resolvers {
            page_lookup: Arc::new(|_: &str| PageLookup::Indeterminate),
            ..Resolvers::default()
        };
        let settings = settings();
        let ctx = ConversionContext::new(&resolvers, &settings);

        let resolved = resolve_link("Maybe", &ctx);
        assert_eq!(resolved.url, "Maybe");
        assert!(!ctx.is_cacheable());
    }

    #[test]
    fn test_internal_fragment_preserved() {
        let resolvers = Resolvers::default();
        let settings = settings();
        let ctx = ConversionContext::new(&resolvers, &settings);

        assert_eq!(resolve_link("Guide#install", &ctx).url, "Guide#install");
    }

    #[test]
    fn test_resolved_link_html_is_escaped() {
        let link = ResolvedLink {
            url: r#"x" onclick="y"#.to_owned(),
            kind: LinkKind::InternalPageTitle,
            css_class: None,
        };
        let html = link.to_html("text");
        assert_eq!(
            html,
            r#"<a href="x&#x22;&#x20;onclick&#x3D;&#x22;y">text</a>"#
        );
    }

    #[test]
    fn test_image_relative_goes_to_attachments() {
        let resolvers = Resolvers {
            absolute_path: Arc::new(|path: &str| format!("{path}123")),
            ..Resolvers::default()
        };
        let settings = settings();
        let ctx = ConversionContext::new(&resolvers, &settings);

        let image = resolve_image("/DSC001.jpg", &ctx);
        assert_eq!(image.src, "/Attachments/DSC001.jpg123");
        assert!(!image.external);
    }

    #[test]
    fn test_image_known_prefixes_not_rewritten() {
        let resolvers = Resolvers {
            absolute_path: Arc::new(|path: &str| format!("{path}123")),
            ..Resolvers::default()
        };
        let settings = settings();
        let ctx = ConversionContext::new(&resolvers, &settings);

        for url in [
            "http://i223.photobucket.com/albums/dd45/wally2603/91e7840f.jpg",
            "https://i223.photobucket.com/albums/dd45/wally2603/91e7840f.jpg",
            "www.photobucket.com/albums/dd45/wally2603/91e7840f.jpg",
        ] {
            let image = resolve_image(url, &ctx);
            assert_eq!(image.src, url);
            assert!(image.external);
        }
    }

    #[test]
    fn test_image_configured_host_prefix() {
        let resolvers = Resolvers::default();
        let settings = MarkupSettings {
            image_host_prefixes: vec!["i.imgur.com/".to_owned()],
            ..MarkupSettings::default()
        };
        let ctx = ConversionContext::new(&resolvers, &settings);

        assert_eq!(resolve_image("i.imgur.com/abc.png", &ctx).src, "i.imgur.com/abc.png");
        assert_eq!(resolve_image("abc.png", &ctx).src, "/Attachments/abc.png");
    }

    #[test]
    fn test_image_built_in_hosts() {
        let resolvers = Resolvers::default();
        let settings = settings();
        let ctx = ConversionContext::new(&resolvers, &settings);

        for src in [
            "i.imgur.com/abc.png",
            "IMGUR.com/abc.png",
            "i223.photobucket.com/albums/a.jpg",
            "farm1.staticflickr.com/2/b.jpg",
        ] {
            let image = resolve_image(src, &ctx);
            assert_eq!(image.src, src);
            assert!(image.external, "{src}");
        }

        for src in ["notimgur.com/a.png", "imgur.com", "imgur.com.evil/a.png"] {
            assert!(!resolve_image(src, &ctx).external, "{src}");
        }
    }

    #[test]
    fn test_image_attachment_forms() {
        let resolvers = Resolvers::default();
        let settings = settings();
        let ctx = ConversionContext::new(&resolvers, &settings);

        assert_eq!(resolve_image("~/a/b.png", &ctx).src, "/Attachments/a/b.png");
        assert_eq!(resolve_image("attachment:a/b.png", &ctx).src, "/Attachments/a/b.png");
    }

    #[test]
    fn test_image_html() {
        let image = ResolvedImage {
            src: "/a.png".to_owned(),
            external: false,
        };
        assert_eq!(
            image.to_html("A <b>", ""),
            r#"<img src="&#x2F;a&#x2E;png" alt="A &lt;b&gt;">"#
        );
        assert_eq!(
            image.to_html("alt", "Title"),
            r#"<img src="&#x2F;a&#x2E;png" title="Title" alt="alt">"#
        );
    }
}
