//! Ordered placeholder substitution.

/// Placeholder substitutions applied in the order they were registered.
///
/// Later substitutions see the output of earlier ones, so a ToC registered
/// first still gets the token placeholders copied from heading text expanded.
///
/// Every substitution has two forms. The HTML form goes into element
/// content; a placeholder found inside a tag (an attribute value, a raw HTML
/// tag) gets the attribute-safe form instead, so token HTML can never add
/// attributes to an element.
///
/// # Example
///
/// ```
/// use wiki_markup::tokens::Replacements;
///
/// let mut replacements = Replacements::default();
/// replacements.block("wikitoken0x", "<pre>x</pre>", "x");
/// replacements.inline("wikitoken1x", "<b>y</b>", "y");
///
/// let html = replacements.apply(
///     "<p>wikitoken0x\n</p><p title=\"wikitoken1x\">wikitoken1x</p>".to_owned(),
/// );
/// assert_eq!(html, "<pre>x</pre><p title=\"y\"><b>y</b></p>");
/// ```
#[derive(Debug, Default)]
pub struct Replacements {
    items: Vec<Replacement>,
}

#[derive(Debug)]
struct Replacement {
    placeholder: String,
    html: String,
    in_tag: String,
}

impl Replacements {
    /// Substitute `placeholder` with `html`, or with `in_tag` where the
    /// placeholder sits inside a tag. `in_tag` must already be escaped.
    pub fn inline(
        &mut self,
        placeholder: &str,
        html: impl Into<String>,
        in_tag: impl Into<String>,
    ) {
        self.items.push(Replacement {
            placeholder: placeholder.to_owned(),
            html: html.into(),
            in_tag: in_tag.into(),
        });
    }

    /// Substitute a block-level `placeholder`.
    ///
    /// The paragraph a grammar wraps around a lone placeholder is replaced
    /// along with it; a placeholder found elsewhere is substituted in place.
    pub fn block(&mut self, placeholder: &str, html: &str, in_tag: &str) {
        for wrapped in [
            format!("<p>{placeholder}\n</p>"),
            format!("<p>{placeholder}</p>"),
        ] {
            self.inline(&wrapped, html, in_tag);
        }
        self.inline(placeholder, html, in_tag);
    }

    /// Apply every substitution to `html`.
    #[must_use]
    pub fn apply(self, mut html: String) -> String {
        for item in self.items {
            if html.contains(&item.placeholder) {
                html = item.substitute(&html);
            }
        }
        html
    }
}

impl Replacement {
    fn substitute(&self, html: &str) -> String {
        let mut out = String::with_capacity(html.len() + self.html.len());
        let mut scan = TagScan::default();
        let mut last = 0;

        for (start, _) in html.match_indices(&self.placeholder) {
            let between = &html[last..start];
            scan.advance(between);
            out.push_str(between);
            out.push_str(if scan.in_tag { &self.in_tag } else { &self.html });
            last = start + self.placeholder.len();
        }

        out.push_str(&html[last..]);
        out
    }
}

/// Tracks whether a position in HTML is inside a tag. Quoted attribute
/// values may contain `>`.
#[derive(Debug, Default)]
struct TagScan {
    in_tag: bool,
    quote: Option<u8>,
}

impl TagScan {
    fn advance(&mut self, text: &str) {
        for b in text.bytes() {
            match (self.in_tag, self.quote) {
                (false, _) => self.in_tag = b == b'<',
                (true, Some(q)) if b == q => self.quote = None,
                (true, Some(_)) => {}
                (true, None) => match b {
                    b'"' | b'\'' => self.quote = Some(b),
                    b'>' => self.in_tag = false,
                    _ => {}
                },
            }
        }
    }
}
