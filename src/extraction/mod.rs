//! Archive extraction
//!
//! Dispatches on file extension to a ZIP, 7z, or RAR extractor. Extraction is
//! idempotent per destination directory: a destination that already holds
//! content is assumed complete and is left alone.

mod password_list;
mod rar;
mod sevenz;
mod shared;
mod zip;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use password_list::PasswordList;
pub use rar::RarExtractor;
pub use sevenz::SevenZipExtractor;
pub use shared::is_extracted;
pub use zip::ZipExtractor;

use crate::error::{ArchiveError, Result};
use crate::types::ArchiveType;
use std::path::{Path, PathBuf};
use tracing::info;

/// What [`extract_archive`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// Archive was extracted; holds the files written
    Extracted(Vec<PathBuf>),
    /// Destination already existed, nothing was done
    Skipped,
}

impl ExtractOutcome {
    /// Whether a real extraction happened
    pub fn was_extracted(&self) -> bool {
        matches!(self, ExtractOutcome::Extracted(_))
    }
}

/// Unified archive extraction dispatcher
///
/// Detects the archive type and routes to the appropriate extractor, trying
/// each password from `passwords` in order.
///
/// # Returns
/// * `Ok(ExtractOutcome::Skipped)` - `dest_path` already holds content
/// * `Ok(ExtractOutcome::Extracted(files))` - files written on success
/// * `Err(Error)` - unknown type, wrong password, corruption, etc.
///
/// # Example
/// ```no_run
/// use aradir::extraction::{extract_archive, PasswordList};
/// use std::path::Path;
///
/// # async fn example() -> aradir::error::Result<()> {
/// let passwords = PasswordList::collect(None, None, true).await;
/// let outcome = extract_archive(
///     Path::new("downloads/Graphic Herbalism-46599-1-03.7z"),
///     Path::new("mods/base/Graphic Herbalism-46599-1-03"),
///     &passwords,
/// ).await?;
/// println!("extracted: {}", outcome.was_extracted());
/// # Ok(())
/// # }
/// ```
pub async fn extract_archive(
    archive_path: &Path,
    dest_path: &Path,
    passwords: &PasswordList,
) -> Result<ExtractOutcome> {
    let archive_type = ArchiveType::from_path(archive_path).ok_or_else(|| {
        ArchiveError::UnsupportedFormat {
            path: archive_path.to_path_buf(),
        }
    })?;

    if is_extracted(dest_path).await {
        info!(?archive_path, ?dest_path, "destination exists, skipping extraction");
        return Ok(ExtractOutcome::Skipped);
    }

    info!(
        ?archive_path,
        ?archive_type,
        "dispatching extraction to appropriate extractor"
    );

    let files = match archive_type {
        ArchiveType::Zip => {
            shared::extract_with_passwords_impl(
                "ZIP",
                ZipExtractor::try_extract,
                archive_path,
                dest_path,
                passwords,
            )
            .await?
        }
        ArchiveType::SevenZip => {
            shared::extract_with_passwords_impl(
                "7z",
                SevenZipExtractor::try_extract,
                archive_path,
                dest_path,
                passwords,
            )
            .await?
        }
        ArchiveType::Rar => {
            shared::extract_with_passwords_impl(
                "RAR",
                RarExtractor::try_extract,
                archive_path,
                dest_path,
                passwords,
            )
            .await?
        }
    };

    Ok(ExtractOutcome::Extracted(files))
}
