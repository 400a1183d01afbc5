//! `wiki render` command implementation.

use std::path::PathBuf;

use clap::Args;
use wiki_config::CliSettings;
use wiki_markup::MarkupDialect;

use super::{converter, load_config, read_input};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Markup file to render.
    file: PathBuf,

    /// Markup dialect: creole, markdown or mediawiki (overrides config).
    #[arg(short, long)]
    dialect: Option<MarkupDialect>,

    /// Keep script, iframe and similar elements in the output.
    #[arg(long)]
    no_whitelist: bool,

    /// Base path for attachment links (overrides config).
    #[arg(long)]
    attachments_path: Option<String>,

    /// Path to configuration file (default: auto-discover wiki.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl RenderArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            dialect: self.dialect,
            use_html_whitelist: self.no_whitelist.then_some(false),
            attachments_path: self.attachments_path,
        };
        let config = load_config(self.config.as_deref(), &cli_settings, &output, self.verbose)?;

        let markup = read_input(&self.file)?;
        if markup.trim().is_empty() {
            output.warning(&format!("{} is empty", self.file.display()));
        }

        let conversion = converter(&config).convert(&markup);
        if self.verbose {
            output.info(&format!(
                "Links: {}, cacheable: {}",
                conversion.links.len(),
                conversion.is_cacheable
            ));
        }

        output.document(&conversion.html)
    }
}
