use crate::error::{ArchiveError, Error, Result};
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};

use super::password_list::PasswordList;

/// Whether `dest_path` already holds extracted content
///
/// An existing but empty directory counts as not extracted, so an extraction
/// that died before writing anything is retried.
pub async fn is_extracted(dest_path: &Path) -> bool {
    match tokio::fs::read_dir(dest_path).await {
        Ok(mut entries) => matches!(entries.next_entry().await, Ok(Some(_))),
        Err(_) => false,
    }
}

/// Shared implementation for archive extraction with password attempts.
///
/// Tries each password in the list by calling `try_extract_fn` via `spawn_blocking`.
/// Filesystem conflicts on single entries never reach this level; the
/// extractors skip those entries and keep going.
pub(crate) async fn extract_with_passwords_impl(
    format_name: &str,
    try_extract_fn: impl Fn(&Path, &str, &Path) -> Result<Vec<PathBuf>> + Send + 'static + Clone,
    archive_path: &Path,
    dest_path: &Path,
    passwords: &PasswordList,
) -> Result<Vec<PathBuf>> {
    if passwords.is_empty() {
        warn!(
            ?archive_path,
            "no passwords to try for {} extraction", format_name
        );
        return Err(ArchiveError::NoPasswordsAvailable {
            archive: archive_path.to_path_buf(),
        }
        .into());
    }

    for (i, password) in passwords.iter().enumerate() {
        debug!(
            attempt = i + 1,
            total = passwords.len(),
            password_length = password.len(),
            "trying password {}/{}",
            i + 1,
            passwords.len()
        );

        let archive_path_owned = archive_path.to_path_buf();
        let dest_path_owned = dest_path.to_path_buf();
        let password_owned = password.clone();
        let try_fn = try_extract_fn.clone();

        let result =
            spawn_blocking(move || try_fn(&archive_path_owned, &password_owned, &dest_path_owned))
                .await
                .map_err(|e| ArchiveError::ExtractionFailed {
                    archive: archive_path.to_path_buf(),
                    reason: format!("extraction task panicked: {}", e),
                })?;

        match result {
            Ok(files) => {
                info!(
                    ?archive_path,
                    extracted_count = files.len(),
                    "{} extraction successful on attempt {}/{}",
                    format_name,
                    i + 1,
                    passwords.len()
                );
                return Ok(files);
            }
            Err(Error::Archive(ArchiveError::WrongPassword { .. })) => {
                debug!(attempt = i + 1, "wrong password, trying next");
                continue;
            }
            Err(e) => {
                warn!(
                    error = %e,
                    ?archive_path,
                    "{} extraction failed with non-password error",
                    format_name
                );
                return Err(e);
            }
        }
    }

    warn!(
        ?archive_path,
        attempted = passwords.len(),
        "all passwords failed for {} extraction",
        format_name
    );
    Err(ArchiveError::AllPasswordsFailed {
        archive: archive_path.to_path_buf(),
        count: passwords.len(),
    }
    .into())
}

/// Build a path under `dest_path` from an archive entry name, dropping any
/// component that could escape the destination
pub(crate) fn sanitized_entry_path(dest_path: &Path, entry_name: &str) -> Option<PathBuf> {
    let normalized = entry_name.replace('\\', "/");
    let sanitized = Path::new(&normalized)
        .components()
        .filter(|c| matches!(c, std::path::Component::Normal(_)))
        .collect::<PathBuf>();

    if sanitized.as_os_str().is_empty() {
        None
    } else {
        Some(dest_path.join(sanitized))
    }
}

/// Map an I/O failure during extraction into the archive error family
pub(crate) fn io_failure(archive_path: &Path, path: &Path, what: &str, e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::AlreadyExists {
        ArchiveError::AlreadyExists {
            archive: archive_path.to_path_buf(),
            path: path.to_path_buf(),
        }
        .into()
    } else {
        ArchiveError::ExtractionFailed {
            archive: archive_path.to_path_buf(),
            reason: format!("{} {}: {}", what, path.display(), e),
        }
        .into()
    }
}

/// Create the directory for a directory entry
///
/// A failure only loses this entry; it is logged and extraction continues.
pub(crate) fn create_entry_dir(archive_path: &Path, path: &Path) {
    if let Err(e) = std::fs::create_dir_all(path) {
        skip_entry(archive_path, path, "failed to create directory", &e);
    }
}

/// Create the parent directories of a file entry, then the file itself
///
/// Returns `None` when either step fails, in which case the entry is skipped
/// and the rest of the archive still extracts.
pub(crate) fn create_entry_file(archive_path: &Path, path: &Path) -> Option<std::fs::File> {
    if !create_entry_parent(archive_path, path) {
        return None;
    }
    match std::fs::File::create(path) {
        Ok(file) => Some(file),
        Err(e) => {
            skip_entry(archive_path, path, "failed to create", &e);
            None
        }
    }
}

/// Create the parent directories of a file entry; false if that failed
pub(crate) fn create_entry_parent(archive_path: &Path, path: &Path) -> bool {
    let Some(parent) = path.parent() else {
        return true;
    };
    match std::fs::create_dir_all(parent) {
        Ok(()) => true,
        Err(e) => {
            skip_entry(archive_path, parent, "failed to create directory", &e);
            false
        }
    }
}

fn skip_entry(archive_path: &Path, path: &Path, what: &str, e: &std::io::Error) {
    warn!(?archive_path, ?path, error = %e, "{}, skipping entry", what);
}
