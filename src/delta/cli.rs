//! CLI-based merger using the external delta_plugin binary

use super::traits::PluginMerger;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

const BINARY_NAMES: [&str; 2] = ["delta_plugin", "delta_plugin.exe"];

/// Runs `delta_plugin --openmw-cfg <cfg> merge <output>`
///
/// # Examples
///
/// ```no_run
/// use aradir::delta::CliPluginMerger;
/// use std::path::{Path, PathBuf};
///
/// // Explicit binary
/// let merger = CliPluginMerger::new(PathBuf::from("/opt/delta/delta_plugin"));
///
/// // Directory holding the binary, falling back to PATH
/// let merger = CliPluginMerger::discover(Some(Path::new("/opt/delta")));
/// ```
pub struct CliPluginMerger {
    binary_path: PathBuf,
}

impl CliPluginMerger {
    /// Create a merger with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find delta_plugin in PATH
    pub fn from_path() -> Option<Self> {
        which::which(BINARY_NAMES[0]).ok().map(Self::new)
    }

    /// Resolve a configured location, then PATH
    ///
    /// `location` may be the binary itself or the directory it was unpacked
    /// into.
    pub fn discover(location: Option<&Path>) -> Option<Self> {
        if let Some(location) = location {
            if location.is_file() {
                return Some(Self::new(location.to_path_buf()));
            }
            if location.is_dir()
                && let Some(found) = BINARY_NAMES
                    .iter()
                    .map(|name| location.join(name))
                    .find(|candidate| candidate.is_file())
            {
                return Some(Self::new(found));
            }
            debug!(?location, "configured delta location has no binary");
        }
        Self::from_path()
    }

    /// Binary this merger runs
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }
}

#[async_trait]
impl PluginMerger for CliPluginMerger {
    async fn merge(&self, config_path: &Path, output_plugin: &Path) -> crate::Result<()> {
        info!(?config_path, ?output_plugin, "merging plugins");

        let output = Command::new(&self.binary_path)
            .arg("--openmw-cfg")
            .arg(config_path)
            .arg("merge")
            .arg(output_plugin)
            .output()
            .await
            .map_err(|e| {
                crate::Error::ExternalTool(format!("Failed to execute delta_plugin: {}", e))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(%stdout, %stderr, "delta_plugin output");

        if !output.status.success() {
            return Err(crate::Error::ExternalTool(format!(
                "delta_plugin exited with {}: {}{}",
                output.status, stdout, stderr
            )));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "cli-delta-plugin"
    }
}
