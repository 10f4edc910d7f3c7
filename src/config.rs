//! Configuration types for aradir
//!
//! Preferences are read from `preferences.yaml` and may be overridden from the
//! command line. Field names match the keys users already have on disk.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the engine configuration document
pub const OPENMW_CFG: &str = "openmw.cfg";

/// Name of the settings document
pub const SETTINGS_CFG: &str = "settings.cfg";

/// Archive extraction settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionConfig {
    /// Password to try on encrypted archives
    #[serde(default)]
    pub password: Option<String>,

    /// Path to a password file (one password per line)
    #[serde(default)]
    pub password_file: Option<PathBuf>,

    /// Try empty password as fallback (default: true)
    #[serde(default = "default_true")]
    pub try_empty_password: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            password: None,
            password_file: None,
            try_empty_password: true,
        }
    }
}

/// Settings for waiting on downloads to finish
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadConfig {
    /// How often the download folder is checked (default: 2s)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub poll_interval: Duration,

    /// Give up waiting for a single file after this long (default: 30 minutes)
    #[serde(default = "default_download_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            timeout: default_download_timeout(),
        }
    }
}

/// User preferences for one installation
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// Preset name
    #[serde(default)]
    pub preset: String,

    /// Downloads folder
    #[serde(default)]
    pub downloads: PathBuf,

    /// Mod extract/install root
    #[serde(default)]
    pub modinstall: PathBuf,

    /// Game installation (Data Files parent)
    #[serde(default)]
    pub gamedata: PathBuf,

    /// OpenMW settings folder containing openmw.cfg
    #[serde(default)]
    pub settings: PathBuf,

    /// OpenMW install folder
    #[serde(default)]
    pub openmw: PathBuf,

    /// delta_plugin executable or the folder containing it
    #[serde(default)]
    pub delta: Option<PathBuf>,

    /// Skip the download phase and use the existing manifest
    #[serde(default)]
    pub nodownload: bool,

    /// Extract every preset into `<modinstall>/shared` instead of `<modinstall>/<preset>`
    #[serde(default)]
    pub shared_install_folder: bool,

    /// Root holding `presets/` and `manifests/` (default: current directory)
    #[serde(default = "default_workdir")]
    pub workdir: PathBuf,

    /// Start OpenMW with the composed config when done
    #[serde(default)]
    pub launch: bool,

    /// Archive extraction
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Download waiting
    #[serde(default)]
    pub download: DownloadConfig,
}

/// Command-line overrides; `None` keeps the preference file's value
#[derive(Clone, Debug, Default)]
pub struct PreferenceOverrides {
    /// Preset name
    pub preset: Option<String>,
    /// Downloads folder
    pub downloads: Option<PathBuf>,
    /// Mod install root
    pub modinstall: Option<PathBuf>,
    /// Game data folder
    pub gamedata: Option<PathBuf>,
    /// OpenMW settings folder
    pub settings: Option<PathBuf>,
    /// OpenMW install folder
    pub openmw: Option<PathBuf>,
    /// delta_plugin location
    pub delta: Option<PathBuf>,
    /// Skip downloads
    pub nodownload: Option<bool>,
    /// Launch OpenMW afterwards
    pub launch: Option<bool>,
}

impl Preferences {
    /// Read preferences from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::Load {
            what: "preferences",
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_yaml::from_str(&text).map_err(|e| Error::Load {
            what: "preferences",
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Apply command-line overrides on top of file values
    pub fn apply_overrides(&mut self, overrides: PreferenceOverrides) {
        if let Some(v) = overrides.preset {
            self.preset = v;
        }
        if let Some(v) = overrides.downloads {
            self.downloads = v;
        }
        if let Some(v) = overrides.modinstall {
            self.modinstall = v;
        }
        if let Some(v) = overrides.gamedata {
            self.gamedata = v;
        }
        if let Some(v) = overrides.settings {
            self.settings = v;
        }
        if let Some(v) = overrides.openmw {
            self.openmw = v;
        }
        if let Some(v) = overrides.delta {
            self.delta = Some(v);
        }
        if let Some(v) = overrides.nodownload {
            self.nodownload = v;
        }
        if let Some(v) = overrides.launch {
            self.launch = v;
        }
    }

    /// Fail early on missing required values
    pub fn validate(&self) -> Result<()> {
        if self.preset.trim().is_empty() {
            return Err(Error::Config {
                message: "preset field is unset".into(),
                key: Some("preset".into()),
            });
        }

        let required = [
            ("downloads", &self.downloads),
            ("modinstall", &self.modinstall),
            ("settings", &self.settings),
        ];
        for (key, value) in required {
            if value.as_os_str().is_empty() {
                return Err(Error::Config {
                    message: format!("{} path is unset", key),
                    key: Some(key.into()),
                });
            }
        }

        if self.launch && self.openmw.as_os_str().is_empty() {
            return Err(Error::Config {
                message: "launch requested but openmw path is unset".into(),
                key: Some("openmw".into()),
            });
        }
        Ok(())
    }

    /// Folder archives for `list_name` are extracted into
    pub fn mod_install_folder(&self, list_name: &str) -> PathBuf {
        if self.shared_install_folder {
            self.modinstall.join("shared")
        } else {
            self.modinstall.join(list_name)
        }
    }

    /// Folder holding a preset's YAML and its composed config documents
    pub fn preset_dir(&self, name: &str) -> PathBuf {
        self.workdir.join("presets").join(name)
    }

    /// Manifest file for a preset
    pub fn manifest_path(&self, name: &str) -> PathBuf {
        self.workdir
            .join("manifests")
            .join(format!("{}-manifest.yaml", name))
    }

    /// The engine's own openmw.cfg, copied into the preset folder before composing
    pub fn engine_config_path(&self) -> PathBuf {
        self.settings.join(OPENMW_CFG)
    }
}

fn default_true() -> bool {
    true
}

fn default_workdir() -> PathBuf {
    PathBuf::from(".")
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_download_timeout() -> Duration {
    Duration::from_secs(30 * 60)
}

/// Serialize `Duration` as whole seconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
