//! CLI command implementations.

pub(crate) mod diff;
pub(crate) mod render;

use std::path::Path;
use std::sync::Arc;

use wiki_config::{CliSettings, Config};
use wiki_markup::MarkupConverter;

use crate::error::CliError;
use crate::output::Output;

pub(crate) use diff::DiffArgs;
pub(crate) use render::RenderArgs;

/// Load the site configuration, reporting where it came from.
fn load_config(
    config_path: Option<&Path>,
    cli_settings: &CliSettings,
    output: &Output,
    verbose: bool,
) -> Result<Config, CliError> {
    let config = Config::load(config_path, Some(cli_settings))?;
    if verbose {
        match &config.config_path {
            Some(path) => output.info(&format!("Config: {}", path.display())),
            None => output.info("Config: defaults (no wiki.toml found)"),
        }
        output.info(&format!("Dialect: {}", config.markup_settings().dialect));
    }
    Ok(config)
}

/// Build a converter from the site configuration.
///
/// Attachment paths are used as they are; there is no host to resolve page
/// ids, so every page is treated as existing.
fn converter(config: &Config) -> MarkupConverter {
    MarkupConverter::new(config.markup_settings().clone())
        .with_tokens(Arc::new(config.token_table()))
}

/// Read a UTF-8 input file.
fn read_input(path: &Path) -> Result<String, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), bytes = text.len(), "Read input");
    Ok(text)
}
