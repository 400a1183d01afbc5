//! Word-level diff of two rendered HTML documents.
//!
//! Both inputs are split into tags, words and whitespace runs, aligned with
//! Myers' algorithm, and merged into one document. Removed text is wrapped in
//! `<del class="diffdel">`, added text in `<ins class="diffins">`. Tags in
//! changed regions are emitted as they are, outside the markers, so the
//! result keeps most of the structure of both versions. Nesting across a
//! change boundary is not guaranteed to be well formed; the output is meant
//! for display only.
//!
//! # Example
//!
//! ```
//! let html = wiki_diff::diff("<p>the quick fox</p>", "<p>the slow fox</p>");
//! assert_eq!(
//!     html,
//!     r#"<p>the <del class="diffdel">quick</del><ins class="diffins">slow</ins> fox</p>"#
//! );
//! ```

mod tokenizer;

use std::time::{Duration, Instant};

use similar::{Algorithm, DiffTag, capture_diff_slices_deadline};

use crate::tokenizer::{is_tag, is_whitespace, tokenize};

/// Kind of a diff segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Present in both versions.
    Unchanged,
    /// Present only in the new version.
    Inserted,
    /// Present only in the old version.
    Deleted,
}

/// A run of text sharing one [`SegmentKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSegment {
    /// Segment kind.
    pub kind: SegmentKind,
    /// Source text, tags included.
    pub text: String,
}

/// Diff between two HTML documents.
///
/// Inputs with more tokens than the limit are not aligned; the whole old
/// document is reported as deleted and the whole new one as inserted.
#[derive(Debug, Clone)]
pub struct HtmlDiff<'a> {
    old: &'a str,
    new: &'a str,
    max_tokens: usize,
    timeout: Option<Duration>,
}

/// Tokens of one segment before they are joined.
type TokenRun<'a> = (SegmentKind, Vec<&'a str>);

impl<'a> HtmlDiff<'a> {
    /// Default limit on the combined token count of both documents.
    pub const DEFAULT_MAX_TOKENS: usize = 20_000;

    /// Prepare a diff of `old` against `new`.
    #[must_use]
    pub fn new(old: &'a str, new: &'a str) -> Self {
        Self {
            old,
            new,
            max_tokens: Self::DEFAULT_MAX_TOKENS,
            timeout: None,
        }
    }

    /// Set the combined token limit.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Bound the alignment time. Past the deadline the alignment is
    /// approximate: still a valid diff, but not necessarily a minimal one.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Diff as a list of segments. Adjacent segments never share a kind.
    #[must_use]
    pub fn segments(&self) -> Vec<DiffSegment> {
        self.runs()
            .into_iter()
            .map(|(kind, tokens)| DiffSegment {
                kind,
                text: tokens.concat(),
            })
            .collect()
    }

    /// Merged HTML with deletions and insertions marked.
    #[must_use]
    pub fn build(&self) -> String {
        let mut out = String::with_capacity(self.old.len() + self.new.len());
        for (kind, tokens) in self.runs() {
            match kind {
                SegmentKind::Unchanged => tokens.iter().for_each(|token| out.push_str(token)),
                SegmentKind::Deleted | SegmentKind::Inserted => push_marked(&mut out, &tokens, kind),
            }
        }
        out
    }

    fn runs(&self) -> Vec<TokenRun<'a>> {
        let old = tokenize(self.old);
        let new = tokenize(self.new);

        if old == new {
            return if old.is_empty() {
                Vec::new()
            } else {
                vec![(SegmentKind::Unchanged, old)]
            };
        }

        let total = old.len() + new.len();
        if total > self.max_tokens {
            tracing::warn!(
                tokens = total,
                max_tokens = self.max_tokens,
                "Documents too large to align, reporting whole content as replaced"
            );
            return coarse(old, new);
        }

        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);
        let ops = capture_diff_slices_deadline(Algorithm::Myers, &old, &new, deadline);
        tracing::debug!(old = old.len(), new = new.len(), ops = ops.len(), "Aligned documents");

        // Between two unchanged runs, deletions always come before insertions.
        let mut runs: Vec<TokenRun<'a>> = Vec::new();
        let mut deleted: Vec<&'a str> = Vec::new();
        let mut inserted: Vec<&'a str> = Vec::new();
        for op in ops {
            let (tag, old_range, new_range) = op.as_tag_tuple();
            match tag {
                DiffTag::Equal => {
                    flush_changes(&mut runs, &mut deleted, &mut inserted);
                    push_run(&mut runs, SegmentKind::Unchanged, &old[old_range]);
                }
                DiffTag::Delete => deleted.extend_from_slice(&old[old_range]),
                DiffTag::Insert => inserted.extend_from_slice(&new[new_range]),
                DiffTag::Replace => {
                    deleted.extend_from_slice(&old[old_range]);
                    inserted.extend_from_slice(&new[new_range]);
                }
            }
        }
        flush_changes(&mut runs, &mut deleted, &mut inserted);
        runs
    }
}

/// Diff two HTML documents with the default limits.
#[must_use]
pub fn diff(old: &str, new: &str) -> String {
    HtmlDiff::new(old, new).build()
}

fn coarse<'a>(old: Vec<&'a str>, new: Vec<&'a str>) -> Vec<TokenRun<'a>> {
    let mut runs = Vec::with_capacity(2);
    if !old.is_empty() {
        runs.push((SegmentKind::Deleted, old));
    }
    if !new.is_empty() {
        runs.push((SegmentKind::Inserted, new));
    }
    runs
}

fn flush_changes<'a>(
    runs: &mut Vec<TokenRun<'a>>,
    deleted: &mut Vec<&'a str>,
    inserted: &mut Vec<&'a str>,
) {
    push_run(runs, SegmentKind::Deleted, deleted);
    push_run(runs, SegmentKind::Inserted, inserted);
    deleted.clear();
    inserted.clear();
}

fn push_run<'a>(runs: &mut Vec<TokenRun<'a>>, kind: SegmentKind, tokens: &[&'a str]) {
    if tokens.is_empty() {
        return;
    }
    match runs.last_mut() {
        Some((last, existing)) if *last == kind => existing.extend_from_slice(tokens),
        _ => runs.push((kind, tokens.to_vec())),
    }
}

/// Emit a changed run: tags as they are, text between them wrapped in the
/// marker for `kind`. Whitespace-only text is never wrapped; removed
/// whitespace is dropped so the spacing of the new version is kept.
fn push_marked(out: &mut String, tokens: &[&str], kind: SegmentKind) {
    let (open, close) = match kind {
        SegmentKind::Deleted => (r#"<del class="diffdel">"#, "</del>"),
        SegmentKind::Inserted => (r#"<ins class="diffins">"#, "</ins>"),
        SegmentKind::Unchanged => ("", ""),
    };

    for group in tokens.chunk_by(|a, b| is_tag(a) == is_tag(b)) {
        if is_tag(group[0]) {
            group.iter().for_each(|tag| out.push_str(tag));
            continue;
        }
        let text = group.concat();
        if is_whitespace(&text) {
            if kind != SegmentKind::Deleted {
                out.push_str(&text);
            }
        } else {
            out.push_str(open);
            out.push_str(&text);
            out.push_str(close);
        }
    }
}
