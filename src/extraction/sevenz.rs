use crate::error::{ArchiveError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::shared::{create_entry_dir, create_entry_file, io_failure, sanitized_entry_path};

/// Archive extractor for 7z files, the password-capable format
pub struct SevenZipExtractor;

impl SevenZipExtractor {
    fn is_password_error(error_msg: &str) -> bool {
        error_msg.contains("password")
            || error_msg.contains("Password")
            || error_msg.contains("encrypted")
    }

    /// Try to extract a 7z archive with a single password
    ///
    /// Entries are written through [`sanitized_entry_path`], so names that
    /// would escape `dest_path` are dropped instead of followed.
    pub fn try_extract(
        archive_path: &Path,
        password: &str,
        dest_path: &Path,
    ) -> Result<Vec<PathBuf>> {
        debug!(
            ?archive_path,
            password_length = password.len(),
            ?dest_path,
            "attempting 7z extraction"
        );

        std::fs::create_dir_all(dest_path)
            .map_err(|e| io_failure(archive_path, dest_path, "failed to create destination", e))?;

        let file = std::fs::File::open(archive_path)
            .map_err(|e| io_failure(archive_path, archive_path, "failed to open", e))?;

        let mut extracted_files = Vec::new();
        let mut write_error: Option<(PathBuf, std::io::Error)> = None;
        let pw = sevenz_rust::Password::from(password);

        let result = sevenz_rust::decompress_with_extract_fn_and_password(
            file,
            dest_path,
            pw,
            |entry, reader, _default_dest| {
                let Some(path) = sanitized_entry_path(dest_path, entry.name()) else {
                    return Ok(true);
                };
                // Returning false stops the walk; the error is reported below
                match Self::write_entry(archive_path, &path, entry.is_directory(), reader) {
                    Ok(true) => extracted_files.push(path),
                    Ok(false) => {}
                    Err(e) => {
                        write_error = Some((path, e));
                        return Ok(false);
                    }
                }
                Ok(true)
            },
        );

        if let Some((path, e)) = write_error {
            return Err(io_failure(archive_path, &path, "failed to write", e));
        }

        match result {
            Ok(()) => {
                info!(
                    ?archive_path,
                    extracted_count = extracted_files.len(),
                    "7z extraction successful"
                );
                Ok(extracted_files)
            }
            Err(e) => {
                let err_str = format!("{:?}", e);
                if Self::is_password_error(&err_str) {
                    Err(ArchiveError::WrongPassword {
                        archive: archive_path.to_path_buf(),
                    }
                    .into())
                } else {
                    Err(ArchiveError::ExtractionFailed {
                        archive: archive_path.to_path_buf(),
                        reason: format!("failed to extract 7z archive: {}", e),
                    }
                    .into())
                }
            }
        }
    }

    /// Materialize one entry; returns whether a file was written
    ///
    /// An entry that cannot be placed on disk is skipped, but its bytes are
    /// still drained so the solid stream stays aligned for the next entry.
    fn write_entry(
        archive_path: &Path,
        path: &Path,
        is_directory: bool,
        reader: &mut dyn std::io::Read,
    ) -> std::io::Result<bool> {
        if is_directory {
            create_entry_dir(archive_path, path);
            return Ok(false);
        }
        match create_entry_file(archive_path, path) {
            Some(mut outfile) => {
                std::io::copy(reader, &mut outfile)?;
                Ok(true)
            }
            None => {
                std::io::copy(reader, &mut std::io::sink())?;
                Ok(false)
            }
        }
    }
}
