use crate::error::{ArchiveError, Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::shared::{create_entry_dir, create_entry_parent, io_failure, sanitized_entry_path};

/// Archive extractor for RAR files, delegated to the unrar library
pub struct RarExtractor;

impl RarExtractor {
    /// Check if an unrar error indicates a password problem
    fn is_password_error(error_msg: &str) -> bool {
        error_msg.contains("password")
            || error_msg.contains("encrypted")
            || error_msg.contains("ERAR_BAD_PASSWORD")
            || error_msg.contains("ERAR_MISSING_PASSWORD")
    }

    /// Convert an unrar error to our error type
    fn convert_unrar_error(e: unrar::error::UnrarError, archive_path: &Path) -> Error {
        let err_str = e.to_string();
        if Self::is_password_error(&err_str) {
            ArchiveError::WrongPassword {
                archive: archive_path.to_path_buf(),
            }
            .into()
        } else {
            ArchiveError::ExtractionFailed {
                archive: archive_path.to_path_buf(),
                reason: err_str,
            }
            .into()
        }
    }

    fn skip_failed(e: unrar::error::UnrarError, archive_path: &Path) -> Error {
        ArchiveError::ExtractionFailed {
            archive: archive_path.to_path_buf(),
            reason: format!("failed to skip entry: {}", e),
        }
        .into()
    }

    /// Try to extract a RAR archive with a single password
    ///
    /// Returns `ArchiveError::WrongPassword` when the password is rejected so
    /// the caller can move on to the next one.
    pub fn try_extract(
        archive_path: &Path,
        password: &str,
        dest_path: &Path,
    ) -> Result<Vec<PathBuf>> {
        debug!(
            ?archive_path,
            password_length = password.len(),
            ?dest_path,
            "attempting RAR extraction"
        );

        std::fs::create_dir_all(dest_path)
            .map_err(|e| io_failure(archive_path, dest_path, "failed to create destination", e))?;

        let archive = if password.is_empty() {
            unrar::Archive::new(archive_path)
        } else {
            unrar::Archive::with_password(archive_path, password.as_bytes())
        };

        let mut at_header = archive
            .open_for_processing()
            .map_err(|e| Self::convert_unrar_error(e, archive_path))?;

        let mut extracted_files = Vec::new();
        loop {
            let at_file = match at_header.read_header() {
                Ok(Some(entry_processor)) => entry_processor,
                Ok(None) => break,
                Err(e) => return Err(Self::convert_unrar_error(e, archive_path)),
            };

            let header = at_file.entry();
            let filename = header.filename.to_string_lossy().to_string();
            let Some(file_path) = sanitized_entry_path(dest_path, &filename) else {
                at_header = at_file
                    .skip()
                    .map_err(|e| Self::skip_failed(e, archive_path))?;
                continue;
            };

            if header.is_directory() {
                create_entry_dir(archive_path, &file_path);
                at_header = at_file
                    .skip()
                    .map_err(|e| Self::skip_failed(e, archive_path))?;
                continue;
            }

            if !create_entry_parent(archive_path, &file_path) {
                at_header = at_file
                    .skip()
                    .map_err(|e| Self::skip_failed(e, archive_path))?;
                continue;
            }
            at_header = at_file
                .extract_to(&file_path)
                .map_err(|e| Self::convert_unrar_error(e, archive_path))?;
            extracted_files.push(file_path);
        }

        info!(
            ?archive_path,
            extracted_count = extracted_files.len(),
            "RAR extraction successful"
        );

        Ok(extracted_files)
    }
}
