//! Trait for plugin merging

use async_trait::async_trait;
use std::path::Path;

/// Merges the content list of a config document into one plugin
///
/// Implementations may shell out to an external binary or provide stub
/// behavior when merging is unavailable.
#[async_trait]
pub trait PluginMerger: Send + Sync {
    /// Merge the plugins listed in `config_path` into `output_plugin`
    ///
    /// # Arguments
    ///
    /// * `config_path` - The openmw.cfg whose content directives are merged
    /// * `output_plugin` - Where the merged plugin is written
    ///
    /// # Errors
    ///
    /// `Error::ExternalTool` when the tool fails, `Error::NotSupported` when
    /// no merger is available.
    async fn merge(&self, config_path: &Path, output_plugin: &Path) -> crate::Result<()>;

    /// Name of this implementation, for logs
    fn name(&self) -> &'static str;
}
