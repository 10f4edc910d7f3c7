//! Utility functions for line-oriented files, atomic writes, and path naming

use crate::error::{Error, Result};
use crate::types::ArchiveType;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// How the bytes of a line file map to text
///
/// openmw.cfg is commonly written in a legacy code page (`encoding=win1252`),
/// so a file is not required to be UTF-8. A file that is not valid UTF-8 is
/// read one byte per char, which writes back to exactly the same bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LineEncoding {
    /// Valid UTF-8 throughout
    #[default]
    Utf8,
    /// Single-byte text; each byte is the char with the same code point
    Latin1,
}

impl LineEncoding {
    /// Decode file contents, picking the encoding that round-trips them
    pub fn decode(bytes: Vec<u8>) -> (String, Self) {
        match String::from_utf8(bytes) {
            Ok(text) => (text, LineEncoding::Utf8),
            Err(e) => {
                let text: String = e.into_bytes().into_iter().map(char::from).collect();
                (text, LineEncoding::Latin1)
            }
        }
    }

    /// Append `text` to `out` in this encoding
    ///
    /// In `Latin1` mode a char above U+00FF has no single-byte form and is
    /// written as UTF-8.
    pub fn encode_into(self, text: &str, out: &mut Vec<u8>) {
        match self {
            LineEncoding::Utf8 => out.extend_from_slice(text.as_bytes()),
            LineEncoding::Latin1 => {
                for c in text.chars() {
                    match u8::try_from(c) {
                        Ok(b) => out.push(b),
                        Err(_) => {
                            let mut buf = [0; 4];
                            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                        }
                    }
                }
            }
        }
    }
}

/// Read a text file as lines, without trailing newline characters
///
/// A missing file yields an empty list when `missing_ok` is set. The returned
/// encoding must be passed back to [`write_lines`] to keep untouched lines
/// byte-identical.
pub async fn read_lines(path: &Path, missing_ok: bool) -> Result<(Vec<String>, LineEncoding)> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let (text, encoding) = LineEncoding::decode(bytes);
            if encoding == LineEncoding::Latin1 {
                debug!(?path, "file is not UTF-8, reading bytewise");
            }
            Ok((text.lines().map(str::to_string).collect(), encoding))
        }
        Err(e) if missing_ok && e.kind() == std::io::ErrorKind::NotFound => {
            Ok((Vec::new(), LineEncoding::Utf8))
        }
        Err(e) => Err(Error::config_io(path, e)),
    }
}

/// Replace `path` with `lines`, one per line, via write-to-temp-then-rename
pub async fn write_lines(path: &Path, lines: &[String], encoding: LineEncoding) -> Result<()> {
    let mut content = Vec::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
    for line in lines {
        encoding.encode_into(line, &mut content);
        content.push(b'\n');
    }
    write_atomic(path, content)
        .await
        .map_err(|e| Error::config_io(path, e))
}

/// Atomically replace the file at `path` with `bytes`
///
/// The temp file is created in the destination directory so the final rename
/// never crosses file systems.
pub async fn write_atomic(path: &Path, bytes: Vec<u8>) -> std::io::Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        debug!(?path, bytes = bytes.len(), "atomically replaced file");
        Ok(())
    })
    .await
    .map_err(|e| std::io::Error::other(format!("write task panicked: {}", e)))?
}

/// Remove duplicate lines, keeping the first occurrence of each
#[must_use]
pub fn dedup_lines<I>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    lines
        .into_iter()
        .filter(|line| seen.insert(line.clone()))
        .collect()
}

/// Derive the extraction folder name from an archive file name
///
/// Strips a supported archive extension; other names are returned unchanged.
///
/// # Examples
///
/// ```
/// use aradir::utils::artifact_folder_name;
///
/// assert_eq!(artifact_folder_name("Graphic Herbalism-46599-1-03.7z"), "Graphic Herbalism-46599-1-03");
/// assert_eq!(artifact_folder_name("readme.txt"), "readme.txt");
/// ```
#[must_use]
pub fn artifact_folder_name(file_name: &str) -> String {
    let path = Path::new(file_name);
    if ArchiveType::from_path(path).is_some()
        && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
    {
        return stem.to_string();
    }
    file_name.to_string()
}

/// Render a path with forward slashes, the way openmw.cfg expects
#[must_use]
pub fn slash_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Join `relative` onto `base`, refusing anything that would leave `base`
///
/// Absolute paths, drive prefixes and `..` components yield `None`.
/// Backslashes count as separators.
///
/// # Examples
///
/// ```
/// use aradir::utils::join_within;
/// use std::path::Path;
///
/// let base = Path::new("/mods/Mod-1-0");
/// assert_eq!(join_within(base, "textures\\a.dds"), Some(base.join("textures/a.dds")));
/// assert_eq!(join_within(base, "../other/a.dds"), None);
/// assert_eq!(join_within(base, "/etc/passwd"), None);
/// ```
#[must_use]
pub fn join_within(base: &Path, relative: &str) -> Option<PathBuf> {
    let normalized = relative.replace('\\', "/");
    let mut joined = base.to_path_buf();
    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(joined)
}

/// Copy a file or directory tree from `src` to `dest`, overwriting files
///
/// Returns the number of files copied.
pub async fn copy_recursive(src: &Path, dest: &Path) -> std::io::Result<usize> {
    let metadata = tokio::fs::metadata(src).await?;
    if metadata.is_file() {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(src, dest).await?;
        return Ok(1);
    }

    let mut copied = 0;
    let mut pending = vec![(src.to_path_buf(), dest.to_path_buf())];
    while let Some((from, to)) = pending.pop() {
        tokio::fs::create_dir_all(&to).await?;
        let mut entries = tokio::fs::read_dir(&from).await?;
        while let Some(entry) = entries.next_entry().await? {
            let target = to.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                pending.push((entry.path(), target));
            } else {
                tokio::fs::copy(entry.path(), &target).await?;
                copied += 1;
            }
        }
    }
    Ok(copied)
}
