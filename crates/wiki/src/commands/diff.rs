//! `wiki diff` command implementation.

use std::path::PathBuf;

use clap::Args;
use wiki_config::CliSettings;
use wiki_diff::{HtmlDiff, SegmentKind};
use wiki_markup::MarkupDialect;

use super::{converter, load_config, read_input};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the diff command.
#[derive(Args)]
pub(crate) struct DiffArgs {
    /// Old version of the page.
    old: PathBuf,

    /// New version of the page.
    new: PathBuf,

    /// Treat both files as markup and render them before diffing.
    #[arg(short, long)]
    markup: bool,

    /// Markup dialect used with --markup (overrides config).
    #[arg(short, long)]
    dialect: Option<MarkupDialect>,

    /// Token limit above which the whole page is shown as replaced
    /// (overrides config).
    #[arg(long)]
    max_tokens: Option<usize>,

    /// Path to configuration file (default: auto-discover wiki.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl DiffArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            dialect: self.dialect,
            ..CliSettings::default()
        };
        let config = load_config(self.config.as_deref(), &cli_settings, &output, self.verbose)?;

        let mut old = read_input(&self.old)?;
        let mut new = read_input(&self.new)?;
        if self.markup {
            let converter = converter(&config);
            old = converter.to_html(&old);
            new = converter.to_html(&new);
            tracing::debug!(dialect = %converter.dialect(), "Rendered both versions");
        }

        let max_tokens = self.max_tokens.unwrap_or(config.diff.max_tokens);
        let mut html_diff = HtmlDiff::new(&old, &new).with_max_tokens(max_tokens);
        if let Some(timeout) = config.diff.timeout() {
            html_diff = html_diff.with_timeout(timeout);
        }

        if self.verbose {
            let segments = html_diff.segments();
            let count = |kind| segments.iter().filter(|s| s.kind == kind).count();
            output.info(&format!(
                "Segments: {} unchanged, {} deleted, {} inserted",
                count(SegmentKind::Unchanged),
                count(SegmentKind::Deleted),
                count(SegmentKind::Inserted)
            ));
        }

        output.document(&html_diff.build())
    }
}
