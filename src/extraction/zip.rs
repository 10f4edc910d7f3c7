use crate::error::{ArchiveError, Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::shared::{create_entry_dir, create_entry_file, io_failure};

/// Archive extractor for ZIP files
///
/// Entries are materialized one at a time: parent directories first, then a
/// freshly created file the entry is streamed into. Directory entries only
/// produce the directory. Permissions stored in the archive are not restored.
pub struct ZipExtractor;

impl ZipExtractor {
    fn entry_error(e: zip::result::ZipError, archive_path: &Path) -> Error {
        let err_str = e.to_string().to_lowercase();
        if err_str.contains("password") || err_str.contains("encrypted") {
            ArchiveError::WrongPassword {
                archive: archive_path.to_path_buf(),
            }
            .into()
        } else {
            ArchiveError::ExtractionFailed {
                archive: archive_path.to_path_buf(),
                reason: format!("failed to read ZIP entry: {}", e),
            }
            .into()
        }
    }

    /// Open a ZIP entry by index, handling password decryption if needed
    fn open_zip_entry<'a>(
        archive: &'a mut zip::ZipArchive<std::fs::File>,
        index: usize,
        password: &str,
        archive_path: &Path,
    ) -> Result<zip::read::ZipFile<'a>> {
        if password.is_empty() {
            archive
                .by_index(index)
                .map_err(|e| Self::entry_error(e, archive_path))
        } else {
            archive
                .by_index_decrypt(index, password.as_bytes())
                .map_err(|e| Self::entry_error(e, archive_path))?
                .map_err(|_| {
                    ArchiveError::WrongPassword {
                        archive: archive_path.to_path_buf(),
                    }
                    .into()
                })
        }
    }

    /// Write a single ZIP entry to disk, creating directories as needed
///
/// Returns `None` for directory entries and for entries that could not be
/// placed on disk. Only read or decryption failures are errors.
    fn extract_zip_entry(
        mut file: zip::read::ZipFile,
        dest_path: &Path,
        archive_path: &Path,
    ) -> Result<Option<PathBuf>> {
        let file_path = match file.enclosed_name() {
            Some(path) => dest_path.join(path),
            None => {
                warn!(name = file.name(), "skipping entry with unsafe path");
                return Ok(None);
            }
        };

        if file.is_dir() {
            create_entry_dir(archive_path, &file_path);
            return Ok(None);
        }

        let Some(mut outfile) = create_entry_file(archive_path, &file_path) else {
            return Ok(None);
        };

        std::io::copy(&mut file, &mut outfile).map_err(|e| {
            let err_str = e.to_string();
            if err_str.contains("password") || err_str.contains("encrypted") {
                ArchiveError::WrongPassword {
                    archive: archive_path.to_path_buf(),
                }
                .into()
            } else {
                io_failure(archive_path, &file_path, "failed to write", e)
            }
        })?;

        Ok(Some(file_path))
    }

    /// Try to extract a ZIP archive with a single password
    pub fn try_extract(
        archive_path: &Path,
        password: &str,
        dest_path: &Path,
    ) -> Result<Vec<PathBuf>> {
        debug!(
            ?archive_path,
            password_length = password.len(),
            ?dest_path,
            "attempting ZIP extraction"
        );

        std::fs::create_dir_all(dest_path)
            .map_err(|e| io_failure(archive_path, dest_path, "failed to create destination", e))?;

        let file = std::fs::File::open(archive_path)
            .map_err(|e| io_failure(archive_path, archive_path, "failed to open", e))?;

        let mut archive = zip::ZipArchive::new(file).map_err(|e| ArchiveError::ExtractionFailed {
            archive: archive_path.to_path_buf(),
            reason: format!("failed to read ZIP archive: {}", e),
        })?;

        let mut extracted_files = Vec::new();
        for i in 0..archive.len() {
            let file = Self::open_zip_entry(&mut archive, i, password, archive_path)?;
            if let Some(file_path) = Self::extract_zip_entry(file, dest_path, archive_path)? {
                extracted_files.push(file_path);
            }
        }

        info!(
            ?archive_path,
            extracted_count = extracted_files.len(),
            "ZIP extraction successful"
        );

        Ok(extracted_files)
    }
}
