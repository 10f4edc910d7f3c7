//! Preset and manifest persistence
//!
//! Presets live at `<workdir>/presets/<name>/<name>.yaml` and are read-only at
//! runtime. Manifests live at `<workdir>/manifests/<name>-manifest.yaml` and are
//! rewritten atomically.

use crate::config::Preferences;
use crate::error::{Error, Result};
use crate::types::{Manifest, Preset};
use crate::utils::write_atomic;
use std::path::Path;
use tracing::{debug, info};

/// Read the preset named `name`
pub async fn read_preset(prefs: &Preferences, name: &str) -> Result<Preset> {
    let path = prefs.preset_dir(name).join(format!("{}.yaml", name));
    let text = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| Error::Load {
            what: "preset",
            path: path.clone(),
            reason: e.to_string(),
        })?;
    let preset: Preset = serde_yaml::from_str(&text).map_err(|e| Error::Load {
        what: "preset",
        path: path.clone(),
        reason: e.to_string(),
    })?;

    debug!(
        ?path,
        downloads = preset.download_steps.len(),
        unpack_steps = preset.unpack_steps.len(),
        "loaded preset"
    );
    Ok(preset)
}

/// Names of all presets under `<workdir>/presets`, sorted
pub async fn list_presets(prefs: &Preferences) -> Result<Vec<String>> {
    let root = prefs.workdir.join("presets");
    let mut names = Vec::new();

    let mut entries = match tokio::fs::read_dir(&root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
        Err(e) => return Err(e.into()),
    };

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if entry.path().join(format!("{}.yaml", name)).is_file() {
            names.push(name);
        }
    }

    names.sort();
    Ok(names)
}

/// Read the manifest for `list_name`, if one has been written
pub async fn read_manifest(prefs: &Preferences, list_name: &str) -> Result<Option<Manifest>> {
    let path = prefs.manifest_path(list_name);
    let text = match tokio::fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(Error::Load {
                what: "manifest",
                path,
                reason: e.to_string(),
            });
        }
    };

    let manifest = serde_yaml::from_str(&text).map_err(|e| Error::Load {
        what: "manifest",
        path: path.clone(),
        reason: e.to_string(),
    })?;
    Ok(Some(manifest))
}

/// Read the manifest for `list_name`, or start a fresh one
pub async fn load_or_new_manifest(prefs: &Preferences, list_name: &str) -> Result<Manifest> {
    Ok(read_manifest(prefs, list_name)
        .await?
        .unwrap_or_else(|| Manifest::new(list_name)))
}

/// Persist a manifest, replacing any previous version atomically
pub async fn write_manifest(prefs: &Preferences, manifest: &Manifest) -> Result<()> {
    let path = prefs.manifest_path(&manifest.list_name);
    write_manifest_to(&path, manifest).await?;
    info!(
        ?path,
        records = manifest.records.len(),
        "manifest written"
    );
    Ok(())
}

async fn write_manifest_to(path: &Path, manifest: &Manifest) -> Result<()> {
    let yaml = serde_yaml::to_string(manifest)?;
    write_atomic(path, yaml.into_bytes()).await?;
    Ok(())
}
