//! Pipeline orchestration
//!
//! A run goes through four phases, strictly in order and one item at a time:
//! 1. Download - resume from the manifest, fetch what is missing, persist the
//!    manifest after each completed file
//! 2. Extract - unpack every recorded archive into its artifact folder
//! 3. Prepare - copy the engine's openmw.cfg into the preset directory
//! 4. Unpack - apply the preset's unpack steps to that copy

use crate::composer::{Composer, plan, resolve_record};
use crate::config::{OPENMW_CFG, Preferences};
use crate::delta::PluginMerger;
use crate::download::ModDownloader;
use crate::error::{Error, Result, Severity};
use crate::extraction::{ExtractOutcome, PasswordList, extract_archive};
use crate::resume::{pending_steps, resume};
use crate::store;
use crate::types::{ArchiveType, Event, Manifest, ManifestRecord, Preset};
use crate::utils::write_atomic;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::{Child, Command};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 256;

/// Totals for one run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Preset that was installed
    pub preset: String,
    /// Files downloaded this run
    pub downloaded: usize,
    /// Archives extracted this run (skipped ones are not counted)
    pub extracted: usize,
    /// Unpack steps applied
    pub steps_applied: usize,
}

/// Runs the install pipeline for the configured preset
pub struct Pipeline {
    /// Event channel for progress reporting
    event_tx: broadcast::Sender<Event>,
    /// Paths and behavior switches
    prefs: Arc<Preferences>,
    /// Download driver
    downloader: Arc<dyn ModDownloader>,
    /// Plugin merger used by DELTA_PLUGIN steps
    merger: Arc<dyn PluginMerger>,
}

impl Pipeline {
    /// Create a pipeline
    pub fn new(
        prefs: Arc<Preferences>,
        downloader: Arc<dyn ModDownloader>,
        merger: Arc<dyn PluginMerger>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            event_tx,
            prefs,
            downloader,
            merger,
        }
    }

    /// Receive progress events from subsequent runs
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Run every phase for `prefs.preset`
    pub async fn run(&self) -> Result<RunSummary> {
        self.prefs.validate()?;
        let preset = store::read_preset(&self.prefs, &self.prefs.preset).await?;
        info!(
            preset = %preset.name,
            downloads = preset.download_steps.len(),
            steps = preset.unpack_steps.len(),
            "starting install"
        );

        let mut summary = RunSummary {
            preset: preset.name.clone(),
            ..Default::default()
        };

        let manifest = if self.prefs.nodownload {
            info!("download phase disabled, using existing manifest");
            store::load_or_new_manifest(&self.prefs, &preset.name).await?
        } else {
            let (manifest, downloaded) = self.download_phase(&preset).await?;
            summary.downloaded = downloaded;
            manifest
        };

        let install_root = std::path::absolute(self.prefs.mod_install_folder(&preset.name))?;
        summary.extracted = self.extract_phase(&manifest, &install_root).await?;

        let config_dir = self.prepare_config(&preset.name).await?;
        summary.steps_applied = self
            .unpack_phase(&preset, &manifest, install_root, config_dir.clone())
            .await?;

        if self.prefs.launch {
            launch_engine(&self.prefs.openmw, &config_dir)?;
        }

        info!(?summary, "install complete");
        self.emit(Event::Complete {
            preset: preset.name,
        });
        Ok(summary)
    }

    /// Bring the manifest up to date with the preset's download steps
    ///
    /// When every step is already satisfied the downloader is never called
    /// and the manifest is not rewritten. Returns the manifest and how many
    /// files were downloaded.
    pub async fn download_phase(&self, preset: &Preset) -> Result<(Manifest, usize)> {
        let mut manifest = store::load_or_new_manifest(&self.prefs, &preset.name).await?;
        let satisfied = resume(&manifest, &self.prefs.downloads).await;

        if pending_steps(&preset.download_steps, &satisfied).is_empty() {
            info!(
                satisfied = preset.download_steps.len(),
                "all downloads present, skipping download phase"
            );
            self.emit(Event::DownloadPhaseSkipped {
                satisfied: preset.download_steps.len(),
            });
            return Ok((manifest, 0));
        }

        let mut downloaded = 0;
        for step in &preset.download_steps {
            if satisfied.contains(&step.site_file_name) {
                debug!(mod_id = step.mod_id, file = %step.site_file_name, "already downloaded");
                self.emit(Event::DownloadSkipped {
                    mod_id: step.mod_id,
                    site_file_name: step.site_file_name.clone(),
                });
                continue;
            }

            self.emit(Event::DownloadStarted {
                mod_id: step.mod_id,
                site_file_name: step.site_file_name.clone(),
            });
            info!(
                mod_id = step.mod_id,
                file = %step.site_file_name,
                driver = self.downloader.name(),
                "downloading"
            );

            let recorded: HashSet<String> = manifest
                .records
                .iter()
                .map(|r| r.file_name.clone())
                .collect();
            let file_name = self
                .downloader
                .download(step, &self.prefs.downloads, &recorded)
                .await?
                .filter(|name| !name.is_empty());
            let Some(file_name) = file_name else {
                warn!(
                    mod_id = step.mod_id,
                    file = %step.site_file_name,
                    "download produced no file name, not recorded"
                );
                continue;
            };

            manifest.records.push(ManifestRecord {
                file_name: file_name.clone(),
                mod_id: step.mod_id,
                file_display_name: step.site_file_name.clone(),
            });
            store::write_manifest(&self.prefs, &manifest).await?;
            downloaded += 1;
            self.emit(Event::DownloadCompleted {
                mod_id: step.mod_id,
                file_name,
            });
        }

        Ok((manifest, downloaded))
    }

    /// Extract every recorded archive into `install_root/<artifact folder>`
    ///
    /// Returns how many archives were actually extracted.
    pub async fn extract_phase(&self, manifest: &Manifest, install_root: &Path) -> Result<usize> {
        let extraction = &self.prefs.extraction;
        let passwords = PasswordList::collect(
            extraction.password.as_deref(),
            extraction.password_file.as_deref(),
            extraction.try_empty_password,
        )
        .await;

        let mut extracted = 0;
        for record in manifest.records.iter().filter(|r| !r.file_name.is_empty()) {
            let archive = self.prefs.downloads.join(&record.file_name);
            if ArchiveType::from_path(&archive).is_none() {
                warn!(?archive, "not an archive, leaving as is");
                continue;
            }
            let dest = install_root.join(record.artifact_folder());

            match extract_archive(&archive, &dest, &passwords).await {
                Ok(ExtractOutcome::Extracted(files)) => {
                    extracted += 1;
                    self.emit(Event::Extracted {
                        archive,
                        dest,
                        files: files.len(),
                    });
                }
                Ok(ExtractOutcome::Skipped) => {
                    self.emit(Event::ExtractionSkipped { archive });
                }
                Err(e) => tolerate(e, "extraction")?,
            }
        }
        Ok(extracted)
    }

    /// Copy the engine's openmw.cfg into the preset directory
    ///
    /// Any previous copy is replaced. Returns the preset directory.
    pub async fn prepare_config(&self, preset_name: &str) -> Result<PathBuf> {
        let config_dir = std::path::absolute(self.prefs.preset_dir(preset_name))?;
        let source = self.prefs.engine_config_path();
        let dest = config_dir.join(OPENMW_CFG);

        let bytes = tokio::fs::read(&source)
            .await
            .map_err(|e| Error::config_io(&source, e))?;
        write_atomic(&dest, bytes)
            .await
            .map_err(|e| Error::config_io(&dest, e))?;

        debug!(?source, ?dest, "engine config copied into preset");
        Ok(config_dir)
    }

    /// Apply the preset's unpack steps to the working config in `config_dir`
    ///
    /// All steps are interpreted before the first one runs, so an unknown or
    /// malformed step leaves the document untouched. Returns how many steps
    /// were applied.
    pub async fn unpack_phase(
        &self,
        preset: &Preset,
        manifest: &Manifest,
        install_root: PathBuf,
        config_dir: PathBuf,
    ) -> Result<usize> {
        let steps = plan(&preset.unpack_steps)?;
        let composer = Composer::new(
            install_root,
            config_dir,
            self.prefs.workdir.clone(),
            self.merger.clone(),
        );

        let mut partition = composer.load_partition().await?;
        for step in &steps {
            let record = resolve_record(&manifest.records, step)?;
            partition = composer.apply(step, record, partition).await?;
            self.emit(Event::StepApplied {
                step_index: step.index,
                kind: step.instruction.kind(),
            });
        }

        info!(applied = steps.len(), "unpack steps applied");
        Ok(steps.len())
    }
}

/// Decide whether a failure stops the run
fn tolerate(err: Error, phase: &str) -> Result<()> {
    match err.severity() {
        Severity::Fatal => Err(err),
        Severity::Recoverable => {
            warn!(phase, error = %err, "continuing after error");
            Ok(())
        }
        Severity::Absorbed => {
            debug!(phase, error = %err, "ignored");
            Ok(())
        }
    }
}

/// Start the engine against a preset's config directory without waiting
///
/// Runs `openmw --config=<preset_dir> --replace=config` from `openmw_dir`.
pub fn launch_engine(openmw_dir: &Path, preset_dir: &Path) -> Result<Child> {
    let binary = ["openmw", "openmw.exe"]
        .iter()
        .map(|name| openmw_dir.join(name))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| {
            Error::NotSupported(format!("no openmw binary in {}", openmw_dir.display()))
        })?;

    info!(?binary, ?preset_dir, "launching engine");
    let mut config_arg = std::ffi::OsString::from("--config=");
    config_arg.push(preset_dir);
    Command::new(&binary)
        .arg(config_arg)
        .arg("--replace=config")
        .current_dir(openmw_dir)
        .spawn()
        .map_err(|e| Error::ExternalTool(format!("Failed to launch openmw: {}", e)))
}
