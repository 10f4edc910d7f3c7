//! Download driver seam
//!
//! The pipeline never talks to a mod site directly. It hands each pending
//! [`DownloadStep`] to a [`ModDownloader`] and awaits the resolved file name,
//! so a download counts as complete only when the driver says so.

use crate::config::DownloadConfig;
use crate::error::{DownloadError, Result};
use crate::types::{ArchiveType, DownloadStep};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Mod files pages live under this base
pub const NEXUS_MODS_URL: &str = "https://www.nexusmods.com/morrowind/mods/";

/// Source type handled by [`ManualDownloader`]
pub const NEXUS_SOURCE: &str = "nexus";

/// Acquires one mod file into the download directory
#[async_trait]
pub trait ModDownloader: Send + Sync {
    /// Download `step` into `download_dir`
    ///
    /// Resolves once the file is complete on disk. Returns the file name
    /// relative to `download_dir`, or `None` when the driver could not tell
    /// which file it produced. `recorded` holds the file names the manifest
    /// already attributes to earlier downloads; a driver must not hand one of
    /// those back.
    async fn download(
        &self,
        step: &DownloadStep,
        download_dir: &Path,
        recorded: &HashSet<String>,
    ) -> Result<Option<String>>;

    /// Name of this implementation, for logs
    fn name(&self) -> &'static str;
}

/// Points the user at the mod's files page and waits for the archive
///
/// An archive already in the download directory is used right away when no
/// manifest record claims it and its name carries the step's mod id, the way
/// the site names its files (`Name-<modId>-<version>.7z`). Otherwise a new
/// archive whose size holds steady across two polls is taken as the finished
/// download. In-progress browser files (`.part`, `.crdownload`) never match
/// since only archive extensions count.
pub struct ManualDownloader {
    poll_interval: Duration,
    timeout: Duration,
}

impl ManualDownloader {
    /// Create a driver from download settings
    pub fn new(config: &DownloadConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            timeout: config.timeout,
        }
    }

    /// Files page of a mod
    pub fn files_page(mod_id: i32) -> std::result::Result<Url, url::ParseError> {
        Url::parse(NEXUS_MODS_URL)?.join(&format!("{}/files", mod_id))
    }

    async fn archives_in(dir: &Path) -> std::io::Result<HashMap<String, u64>> {
        let mut found = HashMap::new();
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(found),
            Err(e) => return Err(e),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if ArchiveType::from_path(&path).is_none() {
                continue;
            }
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                found.insert(name.to_string(), metadata.len());
            }
        }
        Ok(found)
    }

    /// Pick an unclaimed archive on disk that belongs to `step`
    ///
    /// Names that also contain the step's site file name win; ties go to the
    /// lexically first name.
    fn existing_download(
        present: &HashMap<String, u64>,
        step: &DownloadStep,
        recorded: &HashSet<String>,
    ) -> Option<String> {
        let mod_id = step.mod_id.to_string();
        let site_name = step.site_file_name.to_lowercase();
        present
            .iter()
            .filter(|(name, size)| **size > 0 && !recorded.contains(*name))
            .filter(|(name, _)| {
                let stem = Path::new(name.as_str())
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or_default();
                stem.split('-').any(|part| part == mod_id)
            })
            .map(|(name, _)| name)
            .min_by_key(|name| (!name.to_lowercase().contains(&site_name), (*name).clone()))
            .cloned()
    }

    async fn wait_for_new_archive(
        &self,
        dir: &Path,
        baseline: &HashSet<String>,
    ) -> std::io::Result<String> {
        let mut last_sizes: HashMap<String, u64> = HashMap::new();
        loop {
            tokio::time::sleep(self.poll_interval).await;
            let current = Self::archives_in(dir).await?;
            for (name, size) in &current {
                if baseline.contains(name) || *size == 0 {
                    continue;
                }
                if last_sizes.get(name) == Some(size) {
                    return Ok(name.clone());
                }
                debug!(file = %name, size, "download in progress");
            }
            last_sizes = current;
        }
    }
}

#[async_trait]
impl ModDownloader for ManualDownloader {
    async fn download(
        &self,
        step: &DownloadStep,
        download_dir: &Path,
        recorded: &HashSet<String>,
    ) -> Result<Option<String>> {
        if step.source != NEXUS_SOURCE {
            return Err(DownloadError::UnsupportedSource {
                mod_id: step.mod_id,
                source_type: step.source.clone(),
            }
            .into());
        }

        let page = Self::files_page(step.mod_id).map_err(|e| DownloadError::DriverFailed {
            mod_id: step.mod_id,
            reason: e.to_string(),
        })?;
        tokio::fs::create_dir_all(download_dir).await?;
        let present = Self::archives_in(download_dir).await?;
        if let Some(name) = Self::existing_download(&present, step, recorded) {
            info!(mod_id = step.mod_id, file = %name, "using archive already in the download directory");
            return Ok(Some(name));
        }
        let baseline: HashSet<String> = present.into_keys().collect();

        info!(
            mod_id = step.mod_id,
            file = %step.site_file_name,
            %page,
            dir = ?download_dir,
            "download the file manually into the download directory"
        );

        let name = tokio::time::timeout(
            self.timeout,
            self.wait_for_new_archive(download_dir, &baseline),
        )
        .await
        .map_err(|_| DownloadError::Timeout {
            mod_id: step.mod_id,
            file_name: step.site_file_name.clone(),
            seconds: self.timeout.as_secs(),
        })??;

        info!(mod_id = step.mod_id, file = %name, "download detected");
        Ok(Some(name))
    }

    fn name(&self) -> &'static str {
        "manual"
    }
}
