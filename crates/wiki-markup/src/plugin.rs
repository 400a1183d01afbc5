//! Text plugins run around the grammar.

use std::fmt;
use std::sync::Arc;

/// Hook into a conversion before and after the grammar runs.
///
/// Plugins are owned by the host and shared read-only between conversions.
/// Both hooks default to returning their input unchanged.
pub trait TextPlugin: Send + Sync {
    /// Stable plugin identifier, used in logs.
    fn id(&self) -> &str;

    /// Whether the plugin runs. Disabled plugins are skipped.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Transform markup after tokens are extracted and before parsing.
    fn before_parse(&self, markup: &str) -> String {
        markup.to_owned()
    }

    /// Transform HTML after tokens are expanded and before sanitizing.
    fn after_parse(&self, html: &str) -> String {
        html.to_owned()
    }
}

/// Read-only snapshot of the plugins applied by a converter.
#[derive(Clone, Default)]
pub struct PluginSet {
    plugins: Arc<[Arc<dyn TextPlugin>]>,
}

impl PluginSet {
    /// Snapshot the given plugins.
    #[must_use]
    pub fn new(plugins: Vec<Arc<dyn TextPlugin>>) -> Self {
        Self {
            plugins: plugins.into(),
        }
    }

    /// Return a new snapshot with `plugin` appended.
    #[must_use]
    pub fn with(&self, plugin: Arc<dyn TextPlugin>) -> Self {
        let mut plugins = self.plugins.to_vec();
        plugins.push(plugin);
        Self::new(plugins)
    }

    /// Run every enabled plugin's `before_parse` in order.
    pub fn before_parse(&self, markup: String) -> String {
        self.enabled().fold(markup, |markup, plugin| {
            tracing::debug!(plugin = plugin.id(), "Running before_parse");
            plugin.before_parse(&markup)
        })
    }

    /// Run every enabled plugin's `after_parse` in order.
    pub fn after_parse(&self, html: String) -> String {
        self.enabled().fold(html, |html, plugin| {
            tracing::debug!(plugin = plugin.id(), "Running after_parse");
            plugin.after_parse(&html)
        })
    }

    /// Number of plugins, enabled or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    fn enabled(&self) -> impl Iterator<Item = &Arc<dyn TextPlugin>> {
        self.plugins.iter().filter(|plugin| plugin.is_enabled())
    }
}

impl fmt::Debug for PluginSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.plugins.iter().map(|plugin| plugin.id()))
            .finish()
    }
}
