//! Test doubles for the download driver and plugin merger

use super::fixtures::{standard_archives, write_zip};
use aradir::types::DownloadStep;
use aradir::{ModDownloader, PluginMerger};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Serves prepared archives by site file name and counts calls
pub struct FakeDownloader {
    archives: HashMap<String, (String, Vec<(String, String)>)>,
    calls: AtomicUsize,
}

impl FakeDownloader {
    /// Serves [`standard_archives`]
    pub fn standard() -> Self {
        let archives = standard_archives()
            .into_iter()
            .map(|(site, file, entries)| {
                let entries = entries
                    .into_iter()
                    .map(|(n, c)| (n.to_string(), c.to_string()))
                    .collect();
                (site.to_string(), (file.to_string(), entries))
            })
            .collect();
        Self {
            archives,
            calls: AtomicUsize::new(0),
        }
    }

    /// How many times `download` ran
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModDownloader for FakeDownloader {
    async fn download(
        &self,
        step: &DownloadStep,
        download_dir: &Path,
        _recorded: &HashSet<String>,
    ) -> aradir::Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let Some((file_name, entries)) = self.archives.get(&step.site_file_name) else {
            return Ok(None);
        };
        let entries: Vec<(&str, &str)> = entries
            .iter()
            .map(|(n, c)| (n.as_str(), c.as_str()))
            .collect();
        write_zip(&download_dir.join(file_name), &entries);
        Ok(Some(file_name.clone()))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Records each merge and the config content it saw
#[derive(Default)]
pub struct RecordingMerger {
    /// (config path, output plugin, config lines at merge time)
    pub calls: Mutex<Vec<(PathBuf, PathBuf, Vec<String>)>>,
}

impl RecordingMerger {
    /// Number of merges run
    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PluginMerger for RecordingMerger {
    async fn merge(&self, config_path: &Path, output_plugin: &Path) -> aradir::Result<()> {
        let lines = std::fs::read_to_string(config_path)?
            .lines()
            .map(String::from)
            .collect();
        std::fs::write(output_plugin, b"merged")?;
        self.calls.lock().unwrap().push((
            config_path.to_path_buf(),
            output_plugin.to_path_buf(),
            lines,
        ));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
