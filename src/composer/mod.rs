//! Config composition: applies a preset's unpack steps to openmw.cfg
//!
//! The composer owns three locations:
//!
//! - the mod install folder, where each archive was extracted into its
//!   artifact folder
//! - the preset's config directory, holding the working openmw.cfg and
//!   settings.cfg
//! - the list root, against which DELETE_LIST_BY_FILE list files resolve
//!
//! Steps run strictly in preset order. Every step that rewrites openmw.cfg
//! returns a freshly re-read [`Partition`], so later steps always see what
//! earlier ones wrote.

mod document;
mod instruction;

pub use document::{
    BASE_MASTERS, ConfigDocument, LineKind, MERGED_PLUGIN, Partition, content_directive,
    data_directive, merge_settings, resources_directive,
};
pub use instruction::{InstallPair, Instruction, PlannedStep, plan, resolve_record};

use crate::config::{OPENMW_CFG, SETTINGS_CFG};
use crate::delta::{DELTA_FOLDER, PluginMerger};
use crate::error::{ResolutionError, Result};
use crate::types::ManifestRecord;
use crate::utils::{
    LineEncoding, copy_recursive, join_within, read_lines, slash_path, write_lines,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Interprets planned unpack steps against one preset's config directory
pub struct Composer {
    install_root: PathBuf,
    config_dir: PathBuf,
    list_root: PathBuf,
    merger: Arc<dyn PluginMerger>,
}

impl Composer {
    /// Create a composer
    ///
    /// # Arguments
    ///
    /// * `install_root` - Folder holding the extracted artifact folders
    /// * `config_dir` - The preset's config directory (openmw.cfg, settings.cfg)
    /// * `list_root` - Base directory for delete-list files
    /// * `merger` - Plugin merger used by DELTA_PLUGIN
    pub fn new(
        install_root: PathBuf,
        config_dir: PathBuf,
        list_root: PathBuf,
        merger: Arc<dyn PluginMerger>,
    ) -> Self {
        Self {
            install_root,
            config_dir,
            list_root,
            merger,
        }
    }

    /// The working openmw.cfg
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(OPENMW_CFG)
    }

    /// The working settings.cfg
    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_CFG)
    }

    /// Where the merged plugin is written
    pub fn delta_folder(&self) -> PathBuf {
        self.install_root.join(DELTA_FOLDER)
    }

    /// Read the working openmw.cfg and split it
    pub async fn load_partition(&self) -> Result<Partition> {
        Ok(ConfigDocument::load(&self.config_path()).await?.partition())
    }

    /// Apply one step and return the working sets the next step should see
    ///
    /// `record` must be the step's resolved manifest record when the
    /// instruction operates on an artifact folder.
    pub async fn apply(
        &self,
        step: &PlannedStep,
        record: Option<&ManifestRecord>,
        partition: Partition,
    ) -> Result<Partition> {
        debug!(
            step_index = step.index,
            kind = step.instruction.kind(),
            mod_id = step.mod_id,
            "applying unpack step"
        );

        match &step.instruction {
            Instruction::Data(paths) => {
                let root = self.artifact_root(step, record)?;
                let lines = paths
                    .iter()
                    .map(|p| data_directive(&format!("{}/{}", root, p)));
                self.rewrite(&partition, lines).await
            }
            Instruction::Resources(paths) => {
                let root = self.artifact_root(step, record)?;
                let lines = paths
                    .iter()
                    .map(|p| resources_directive(&format!("{}/{}", root, p)));
                self.rewrite(&partition, lines).await
            }
            Instruction::DataDirect(lines) => self.rewrite(&partition, lines.iter().cloned()).await,
            Instruction::Content(names) => self.add_content(names).await,
            Instruction::Settings(lines) => {
                self.merge_settings(lines).await;
                Ok(partition)
            }
            Instruction::DeleteList(paths) => {
                let folder = self.artifact_dir(step, record)?;
                for path in paths {
                    remove_artifact_file(&folder, path).await;
                }
                Ok(partition)
            }
            Instruction::DeleteListByFile(list_files) => {
                let folder = self.artifact_dir(step, record)?;
                for list_file in list_files {
                    let Some(list_path) = join_within(&self.list_root, list_file) else {
                        warn!(%list_file, "delete list outside the list root, skipped");
                        continue;
                    };
                    let entries = match read_lines(&list_path, false).await {
                        Ok((entries, _)) => entries,
                        Err(e) => {
                            warn!(?list_path, error = %e, "could not read delete list");
                            continue;
                        }
                    };
                    for path in entries.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
                        remove_artifact_file(&folder, path).await;
                    }
                }
                Ok(partition)
            }
            Instruction::InstallToConfigFolder(pairs) => {
                let folder = self.artifact_dir(step, record)?;
                for pair in pairs {
                    let (Some(src), Some(dest)) = (
                        join_within(&folder, &pair.source),
                        join_within(&self.config_dir, &pair.destination),
                    ) else {
                        warn!(?pair, "install pair leaves its folder, skipped");
                        continue;
                    };
                    match copy_recursive(&src, &dest).await {
                        Ok(files) => debug!(?src, ?dest, files, "installed into config folder"),
                        Err(e) => warn!(?src, ?dest, error = %e, "install copy failed"),
                    }
                }
                Ok(partition)
            }
            Instruction::DeltaPlugin => self.merge_plugins().await,
        }
    }

    fn artifact_dir(&self, step: &PlannedStep, record: Option<&ManifestRecord>) -> Result<PathBuf> {
        let record = record.ok_or(ResolutionError::RecordRequired {
            step_index: step.index,
            kind: step.instruction.kind(),
        })?;
        Ok(self.install_root.join(record.artifact_folder()))
    }

    fn artifact_root(&self, step: &PlannedStep, record: Option<&ManifestRecord>) -> Result<String> {
        Ok(slash_path(&self.artifact_dir(step, record)?))
    }

    /// Write config lines, `added`, then content lines; re-read the result
    async fn rewrite<I>(&self, partition: &Partition, added: I) -> Result<Partition>
    where
        I: IntoIterator<Item = String>,
    {
        let path = self.config_path();
        write_lines(&path, &partition.compose(added), partition.encoding).await?;
        self.load_partition().await
    }

    async fn add_content(&self, names: &[String]) -> Result<Partition> {
        let path = self.config_path();
        let mut doc = ConfigDocument::load(&path).await?;
        let added = names
            .iter()
            .filter(|name| doc.append_unique(content_directive(name)))
            .count();
        debug!(added, requested = names.len(), "content directives");
        doc.save(&path).await?;
        Ok(doc.partition())
    }

    async fn merge_settings(&self, lines: &[String]) {
        let path = self.settings_path();
        let (existing, encoding) = match read_lines(&path, true).await {
            Ok(read) => read,
            Err(e) => {
                warn!(?path, error = %e, "could not read settings, starting empty");
                (Vec::new(), LineEncoding::Utf8)
            }
        };
        let merged = merge_settings(existing, lines);
        if let Err(e) = write_lines(&path, &merged, encoding).await {
            warn!(?path, error = %e, "settings merge not written");
        }
    }

    async fn merge_plugins(&self) -> Result<Partition> {
        let path = self.config_path();
        let mut doc = ConfigDocument::load(&path).await?;
        doc.normalize_base_content();
        doc.save(&path).await?;

        let delta_folder = self.delta_folder();
        tokio::fs::create_dir_all(&delta_folder).await?;
        let output = delta_folder.join(MERGED_PLUGIN);
        info!(merger = self.merger.name(), ?output, "running plugin merge");
        self.merger.merge(&path, &output).await?;

        let mut doc = ConfigDocument::load(&path).await?;
        doc.apply_merged_plugin(&slash_path(&delta_folder));
        doc.save(&path).await?;
        Ok(doc.partition())
    }
}

async fn remove_artifact_file(folder: &Path, relative: &str) {
    let Some(path) = join_within(folder, relative) else {
        warn!(?folder, relative, "refusing to delete outside the artifact folder");
        return;
    };
    match tokio::fs::remove_file(&path).await {
        Ok(()) => debug!(?path, "deleted"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(?path, "already absent")
        }
        Err(e) => warn!(?path, error = %e, "delete failed"),
    }
}
