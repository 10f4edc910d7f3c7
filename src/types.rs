//! Core types: presets, manifests, archive formats, and pipeline events

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One mod file to acquire from a named source
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadStep {
    /// Source type (e.g. "nexus")
    #[serde(rename = "type")]
    pub source: String,
    /// Mod identity on the source site
    pub mod_id: i32,
    /// Display name of the file on the mod's files page
    pub site_file_name: String,
}

/// One raw install instruction as authored in a preset
///
/// `kind` selects interpreter behavior and `data` is interpreted according to
/// it; see [`crate::composer::Instruction`] for the typed form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnpackStep {
    /// Mod identity; values `<= 0` mean the step is not tied to an artifact
    #[serde(default)]
    pub mod_id: i32,
    /// Position among the mod's manifest records, in arrival order
    #[serde(default)]
    pub file_index: usize,
    /// Instruction type tag (DATA, CONTENT, ...)
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-dependent payload
    #[serde(default)]
    pub data: Vec<String>,
}

/// Named, author-defined mod list plus install instructions
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    /// Preset name, also the directory name under `presets/`
    pub name: String,
    /// Last modification time as authored
    #[serde(default)]
    pub last_modified: i64,
    /// Where the list is published
    #[serde(default, alias = "listUrl")]
    pub source_url: String,
    /// Files to download, in order
    #[serde(default)]
    pub download_steps: Vec<DownloadStep>,
    /// Install instructions, in order
    #[serde(default)]
    pub unpack_steps: Vec<UnpackStep>,
}

/// Binds a downloaded file on disk to the mod identity used by the preset
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestRecord {
    /// Actual file name in the download directory
    pub file_name: String,
    /// Mod identity
    pub mod_id: i32,
    /// The download step's `siteFileName`
    pub file_display_name: String,
}

impl ManifestRecord {
    /// Directory name the archive is extracted into
    pub fn artifact_folder(&self) -> String {
        crate::utils::artifact_folder_name(&self.file_name)
    }
}

/// Append-only log of downloaded artifacts for one preset
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Preset name this manifest belongs to
    pub list_name: String,
    /// Creation time, unix seconds
    #[serde(rename = "created", alias = "createdAt")]
    pub created_at: i64,
    /// Records in arrival order
    #[serde(default)]
    pub records: Vec<ManifestRecord>,
}

impl Manifest {
    /// Start an empty manifest stamped with the current time
    pub fn new(list_name: impl Into<String>) -> Self {
        Self {
            list_name: list_name.into(),
            created_at: chrono::Utc::now().timestamp(),
            records: Vec::new(),
        }
    }

    /// Records belonging to `mod_id`, in arrival order
    pub fn records_for(&self, mod_id: i32) -> impl Iterator<Item = &ManifestRecord> {
        self.records.iter().filter(move |r| r.mod_id == mod_id)
    }
}

/// Supported archive container formats
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveType {
    /// ZIP archive (.zip)
    Zip,
    /// 7-Zip archive (.7z), may be password protected
    SevenZip,
    /// RAR archive (.rar)
    Rar,
}

impl ArchiveType {
    /// Detect archive type by file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "zip" => Some(ArchiveType::Zip),
            "7z" => Some(ArchiveType::SevenZip),
            "rar" => Some(ArchiveType::Rar),
            _ => None,
        }
    }
}

/// Event emitted while the pipeline runs
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Every download step was already satisfied; no downloads will run
    DownloadPhaseSkipped {
        /// Number of satisfied steps
        satisfied: usize,
    },
    /// A single download step was skipped because its file is on disk
    DownloadSkipped {
        /// Mod id
        mod_id: i32,
        /// Site file name
        site_file_name: String,
    },
    /// A download started
    DownloadStarted {
        /// Mod id
        mod_id: i32,
        /// Site file name
        site_file_name: String,
    },
    /// A download completed and was recorded in the manifest
    DownloadCompleted {
        /// Mod id
        mod_id: i32,
        /// Resolved file name on disk
        file_name: String,
    },
    /// Archive extracted
    Extracted {
        /// Archive path
        archive: PathBuf,
        /// Destination folder
        dest: PathBuf,
        /// Number of files written
        files: usize,
    },
    /// Extraction skipped because the destination already exists
    ExtractionSkipped {
        /// Archive path
        archive: PathBuf,
    },
    /// An unpack step finished
    StepApplied {
        /// Position in the preset's unpack list
        step_index: usize,
        /// Instruction type tag
        kind: &'static str,
    },
    /// The whole pipeline finished
    Complete {
        /// Preset name
        preset: String,
    },
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const PRESET_YAML: &str = r#"
name: total-overhaul
lastModified: 1700000000
listUrl: https://example.com/lists/total-overhaul
downloadSteps:
  - type: nexus
    modId: 43266
    siteFileName: Patch for Purists
unpackSteps:
  - modId: 43266
    fileIndex: 0
    type: DATA
    data:
      - "00 Core"
  - type: CONTENT
    data:
      - Patch for Purists.esm
  - type: DELTA_PLUGIN
"#;

    #[test]
    fn preset_parses_original_field_names() {
        let preset: Preset = serde_yaml::from_str(PRESET_YAML).unwrap();
        assert_eq!(preset.name, "total-overhaul");
        assert_eq!(preset.source_url, "https://example.com/lists/total-overhaul");
        assert_eq!(preset.download_steps[0].source, "nexus");
        assert_eq!(preset.download_steps[0].mod_id, 43266);
        assert_eq!(preset.unpack_steps.len(), 3);
        assert_eq!(preset.unpack_steps[1].mod_id, 0);
        assert_eq!(preset.unpack_steps[2].kind, "DELTA_PLUGIN");
        assert!(preset.unpack_steps[2].data.is_empty());
    }

    #[test]
    fn manifest_keeps_created_key_on_disk() {
        let yaml = "listName: base\ncreated: 1690000000\nrecords:\n  - fileName: a.7z\n    modId: 7\n    fileDisplayName: A\n";
        let manifest: Manifest = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(manifest.created_at, 1_690_000_000);
        assert_eq!(manifest.records[0].artifact_folder(), "a");

        let written = serde_yaml::to_string(&manifest).unwrap();
        assert!(written.contains("created: 1690000000"));
        assert!(!written.contains("createdAt"));
    }

    #[test]
    fn manifest_reads_created_at_spelling() {
        let yaml = "listName: base\ncreatedAt: 42\n";
        let manifest: Manifest = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(manifest.created_at, 42);
        assert!(manifest.records.is_empty());
    }

    #[test]
    fn records_for_preserves_arrival_order() {
        let mut manifest = Manifest::new("base");
        for (name, id) in [("a.zip", 1), ("b.zip", 2), ("c.zip", 1)] {
            manifest.records.push(ManifestRecord {
                file_name: name.into(),
                mod_id: id,
                file_display_name: name.into(),
            });
        }
        let names: Vec<_> = manifest.records_for(1).map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, ["a.zip", "c.zip"]);
    }

    #[test]
    fn archive_type_detection_is_case_insensitive() {
        assert_eq!(ArchiveType::from_path(Path::new("x.ZIP")), Some(ArchiveType::Zip));
        assert_eq!(ArchiveType::from_path(Path::new("x.7z")), Some(ArchiveType::SevenZip));
        assert_eq!(ArchiveType::from_path(Path::new("x.Rar")), Some(ArchiveType::Rar));
        assert_eq!(ArchiveType::from_path(Path::new("x.tar.gz")), None);
        assert_eq!(ArchiveType::from_path(Path::new("noext")), None);
    }
}
