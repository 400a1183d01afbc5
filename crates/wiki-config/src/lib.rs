//! Site configuration for wiki markup conversion.
//!
//! Parses `wiki.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `markup.attachments_path`

mod expand;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use wiki_markup::{MarkupDialect, MarkupError, MarkupSettings, TokenTable};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override markup dialect.
    pub dialect: Option<MarkupDialect>,
    /// Override HTML whitelist flag.
    pub use_html_whitelist: Option<bool>,
    /// Override attachments base path.
    pub attachments_path: Option<String>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "wiki.toml";

/// Site configuration.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Markup configuration as written in TOML.
    markup: MarkupConfigRaw,
    /// Diff configuration.
    pub diff: DiffConfig,
    /// Template tokens: name to HTML with `${body}` placeholder.
    pub tokens: BTreeMap<String, String>,

    /// Resolved markup settings (set after loading).
    #[serde(skip)]
    pub markup_resolved: MarkupSettings,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Raw markup configuration as parsed from TOML.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct MarkupConfigRaw {
    dialect: String,
    use_html_whitelist: bool,
    attachments_path: String,
    image_host_prefixes: Vec<String>,
}

impl Default for MarkupConfigRaw {
    fn default() -> Self {
        let settings = MarkupSettings::default();
        Self {
            dialect: settings.dialect.name().to_owned(),
            use_html_whitelist: settings.use_html_whitelist,
            attachments_path: settings.attachments_path,
            image_host_prefixes: settings.image_host_prefixes,
        }
    }
}

/// Diff configuration.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DiffConfig {
    /// Combined token limit above which the diff is coarse.
    pub max_tokens: usize,
    /// Alignment time budget in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl DiffConfig {
    /// Alignment time budget.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            max_tokens: 20_000,
            timeout_ms: None,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`markup.attachments_path`").
        field: String,
        /// Error message (e.g., "${`ATTACHMENTS`} not set").
        message: String,
    },
    /// Unknown markup dialect.
    #[error("Configuration error in markup.dialect: {0}")]
    Dialect(#[from] MarkupError),
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Whether a token name can be written as `@@name:body@@`.
fn is_valid_token_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `wiki.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails or
    /// a value is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = std::env::current_dir()
            .ok()
            .and_then(|cwd| Self::discover_from(&cwd))
        {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Search for the config file in `start` and its parents.
    #[must_use]
    pub fn discover_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.is_file() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(dialect) = settings.dialect {
            self.markup_resolved.dialect = dialect;
        }
        if let Some(use_html_whitelist) = settings.use_html_whitelist {
            self.markup_resolved.use_html_whitelist = use_html_whitelist;
        }
        if let Some(attachments_path) = &settings.attachments_path {
            self.markup_resolved.attachments_path.clone_from(attachments_path);
        }
    }

    /// Markup settings for a converter.
    #[must_use]
    pub fn markup_settings(&self) -> &MarkupSettings {
        &self.markup_resolved
    }

    /// Token table built from the `[tokens]` templates.
    #[must_use]
    pub fn token_table(&self) -> TokenTable {
        let mut table = TokenTable::new();
        for (name, template) in &self.tokens {
            table.insert(name, wiki_markup::TemplateToken::new(template.as_str()));
        }
        table
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;
        config.resolve_markup()?;
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_markup()?;
        self.validate_diff()?;
        self.validate_tokens()?;
        Ok(())
    }

    fn validate_markup(&self) -> Result<(), ConfigError> {
        require_non_empty(
            &self.markup_resolved.attachments_path,
            "markup.attachments_path",
        )?;
        if self
            .markup_resolved
            .image_host_prefixes
            .iter()
            .any(String::is_empty)
        {
            return Err(ConfigError::Validation(
                "markup.image_host_prefixes cannot contain empty entries".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_diff(&self) -> Result<(), ConfigError> {
        if self.diff.max_tokens == 0 {
            return Err(ConfigError::Validation(
                "diff.max_tokens must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_tokens(&self) -> Result<(), ConfigError> {
        if let Some(name) = self.tokens.keys().find(|name| !is_valid_token_name(name)) {
            return Err(ConfigError::Validation(format!(
                "tokens.{name}: token names may only contain letters, digits, '-' and '_'"
            )));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.markup.attachments_path =
            expand::expand_env(&self.markup.attachments_path, "markup.attachments_path")?;
        Ok(())
    }

    /// Resolve the raw markup section into converter settings.
    fn resolve_markup(&mut self) -> Result<(), ConfigError> {
        let dialect = self.markup.dialect.parse::<MarkupDialect>()?;
        self.markup_resolved = MarkupSettings {
            dialect,
            use_html_whitelist: self.markup.use_html_whitelist,
            attachments_path: self.markup.attachments_path.clone(),
            image_host_prefixes: self.markup.image_host_prefixes.clone(),
        };
        Ok(())
    }
}
