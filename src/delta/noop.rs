//! No-op merger for graceful degradation

use super::traits::PluginMerger;
use async_trait::async_trait;
use std::path::Path;

/// Merger used when no `delta_plugin` binary is available
///
/// Every merge returns `Error::NotSupported`, so a preset without a
/// DELTA_PLUGIN step still installs normally.
///
/// # Examples
///
/// ```
/// use aradir::delta::{NoOpPluginMerger, PluginMerger};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() {
/// let merger = NoOpPluginMerger;
/// let result = merger
///     .merge(Path::new("openmw.cfg"), Path::new("merged.omwaddon"))
///     .await;
/// assert!(result.is_err());
/// # }
/// ```
pub struct NoOpPluginMerger;

#[async_trait]
impl PluginMerger for NoOpPluginMerger {
    async fn merge(&self, _config_path: &Path, _output_plugin: &Path) -> crate::Result<()> {
        Err(crate::Error::NotSupported(
            "plugin merging requires the delta_plugin binary. \
             Set `delta` in preferences or ensure delta_plugin is in PATH."
                .into(),
        ))
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
