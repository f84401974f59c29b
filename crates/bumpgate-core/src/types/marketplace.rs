use serde::Deserialize;

/// The parts of `.claude-plugin/marketplace.json` that affect where plugins live.
///
/// Everything else in the document is ignored; the file is only consulted for
/// its plugin root.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marketplace {
    #[serde(default)]
    pub plugin_root: Option<String>,
    #[serde(default)]
    pub metadata: Option<MarketplaceMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceMetadata {
    #[serde(default)]
    pub plugin_root: Option<String>,
}

impl Marketplace {
    /// The configured plugin root, preferring the top-level `pluginRoot` over
    /// `metadata.pluginRoot`.
    pub fn plugin_root(&self) -> Option<&str> {
        self.plugin_root.as_deref().or_else(|| {
            self.metadata
                .as_ref()
                .and_then(|m| m.plugin_root.as_deref())
        })
    }
}
