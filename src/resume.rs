//! Resume tracking for the download phase
//!
//! A download step counts as satisfied when the manifest has a record for it
//! whose file is still present in the download directory. Re-running with no
//! file-system changes therefore downloads nothing.

use crate::types::{DownloadStep, Manifest};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

/// Display names of manifest records whose files are present in `download_dir`
///
/// Existence-check failures are logged and treated as "not satisfied".
pub async fn resume(manifest: &Manifest, download_dir: &Path) -> HashSet<String> {
    let mut satisfied = HashSet::new();

    for record in &manifest.records {
        if record.file_name.is_empty() {
            continue;
        }
        let path = download_dir.join(&record.file_name);
        match tokio::fs::try_exists(&path).await {
            Ok(true) => {
                satisfied.insert(record.file_display_name.clone());
            }
            Ok(false) => {
                debug!(?path, mod_id = record.mod_id, "recorded download missing on disk");
            }
            Err(e) => {
                warn!(?path, error = %e, "could not check downloaded file, treating as missing");
            }
        }
    }

    satisfied
}

/// Download steps that still need to run, in preset order
pub fn pending_steps<'a>(
    steps: &'a [DownloadStep],
    satisfied: &HashSet<String>,
) -> Vec<&'a DownloadStep> {
    steps
        .iter()
        .filter(|step| !satisfied.contains(&step.site_file_name))
        .collect()
}
