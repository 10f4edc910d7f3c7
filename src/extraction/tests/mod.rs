use crate::error::{ArchiveError, Error};
use crate::extraction::shared::{extract_with_passwords_impl, sanitized_entry_path};
use crate::extraction::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Create a valid ZIP archive containing the given entries; names ending in '/' are directories
fn create_zip_archive(archive_path: &Path, files: &[(&str, &str)]) {
    let file = std::fs::File::create(archive_path).unwrap();
    let mut writer = ::zip::ZipWriter::new(file);
    let options =
        ::zip::write::FileOptions::default().compression_method(::zip::CompressionMethod::Stored);
    for (name, content) in files {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            std::io::Write::write_all(&mut writer, content.as_bytes()).unwrap();
        }
    }
    writer.finish().unwrap();
}

/// Create a password-encrypted ZIP using the deprecated ZipCrypto method
fn create_encrypted_zip(archive_path: &Path, file_name: &str, content: &[u8], password: &[u8]) {
    use ::zip::unstable::write::FileOptionsExt;
    let file = std::fs::File::create(archive_path).unwrap();
    let mut writer = ::zip::ZipWriter::new(file);
    let options = ::zip::write::FileOptions::default()
        .compression_method(::zip::CompressionMethod::Stored)
        .with_deprecated_encryption(password);
    writer.start_file(file_name, options).unwrap();
    std::io::Write::write_all(&mut writer, content).unwrap();
    writer.finish().unwrap();
}

/// Create a valid 7z archive from a source directory
fn create_7z_archive(archive_path: &Path, source_dir: &Path) {
    sevenz_rust::compress_to_path(source_dir, archive_path).unwrap();
}

fn count_files(dir: &Path) -> usize {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count()
}

// ---------------------------------------------------------------------------
// Password list
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_password_list_collect_empty() {
    let passwords = PasswordList::collect(None, None, false).await;
    assert!(passwords.is_empty());
    assert_eq!(passwords.len(), 0);
}

#[tokio::test]
async fn test_password_list_priority_order() {
    use std::io::Write;

    let mut temp_file = tempfile::NamedTempFile::new().unwrap();
    writeln!(temp_file, "from-file").unwrap();
    writeln!(temp_file, "configured").unwrap();
    writeln!(temp_file).unwrap();
    writeln!(temp_file, "  padded  ").unwrap();
    temp_file.flush().unwrap();

    let passwords = PasswordList::collect(Some("configured"), Some(temp_file.path()), true).await;
    let password_vec: Vec<&str> = passwords.iter().map(|s| s.as_str()).collect();
    assert_eq!(password_vec, ["configured", "from-file", "padded", ""]);
}

#[tokio::test]
async fn test_password_list_missing_file_is_ignored() {
    let passwords =
        PasswordList::collect(None, Some(Path::new("/nonexistent/passwords.txt")), true).await;
    assert_eq!(passwords.len(), 1);
    assert_eq!(passwords.iter().next().unwrap(), "");
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_unsupported_extension_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("mod.tar.gz");
    std::fs::write(&archive, b"not an archive").unwrap();

    let err = extract_archive(&archive, &temp_dir.path().join("out"), &PasswordList::empty_only())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Archive(ArchiveError::UnsupportedFormat { .. })
    ));
    assert!(!temp_dir.path().join("out").exists());
}

#[tokio::test]
async fn test_zip_extraction_materializes_entries() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("Mod-123-1-0.zip");
    create_zip_archive(
        &archive,
        &[
            ("Data Files/", ""),
            ("Data Files/Mod.esp", "plugin"),
            ("Data Files/textures/tx_a.dds", "texture"),
            ("empty/", ""),
        ],
    );

    let dest = temp_dir.path().join("Mod-123-1-0");
    let outcome = extract_archive(&archive, &dest, &PasswordList::empty_only())
        .await
        .unwrap();

    match outcome {
        ExtractOutcome::Extracted(files) => assert_eq!(files.len(), 2),
        ExtractOutcome::Skipped => panic!("expected extraction"),
    }
    assert_eq!(
        std::fs::read(dest.join("Data Files/textures/tx_a.dds")).unwrap(),
        b"texture"
    );
    assert!(dest.join("empty").is_dir());
}

#[tokio::test]
async fn test_zip_entry_under_a_file_is_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("Clash-5-1.zip");
    create_zip_archive(&archive, &[("a", "file"), ("a/b.txt", "x"), ("z.txt", "z")]);

    let dest = temp_dir.path().join("Clash-5-1");
    let outcome = extract_archive(&archive, &dest, &PasswordList::empty_only())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ExtractOutcome::Extracted(vec![dest.join("a"), dest.join("z.txt")])
    );
    assert_eq!(std::fs::read(dest.join("a")).unwrap(), b"file");
    assert_eq!(std::fs::read(dest.join("z.txt")).unwrap(), b"z");
}

#[tokio::test]
async fn test_zip_nested_directory_conflict_continues() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("Clash-5-2.zip");
    create_zip_archive(
        &archive,
        &[("a", "file"), ("a/b/c.txt", "x"), ("a/d/", ""), ("z.txt", "z")],
    );

    let dest = temp_dir.path().join("Clash-5-2");
    let outcome = extract_archive(&archive, &dest, &PasswordList::empty_only())
        .await
        .unwrap();

    assert!(outcome.was_extracted());
    assert!(dest.join("a").is_file());
    assert_eq!(std::fs::read(dest.join("z.txt")).unwrap(), b"z");
}

#[tokio::test]
async fn test_second_extraction_is_a_noop() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("mod.zip");
    create_zip_archive(&archive, &[("a.txt", "first")]);
    let dest = temp_dir.path().join("mod");

    let first = extract_archive(&archive, &dest, &PasswordList::empty_only())
        .await
        .unwrap();
    assert!(first.was_extracted());

    // Mutate extracted content; a real second extraction would overwrite it
    std::fs::write(dest.join("a.txt"), b"edited").unwrap();

    let second = extract_archive(&archive, &dest, &PasswordList::empty_only())
        .await
        .unwrap();
    assert_eq!(second, ExtractOutcome::Skipped);
    assert_eq!(std::fs::read(dest.join("a.txt")).unwrap(), b"edited");
}

#[tokio::test]
async fn test_empty_destination_is_reextracted() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("mod.zip");
    create_zip_archive(&archive, &[("a.txt", "content")]);
    let dest = temp_dir.path().join("mod");
    std::fs::create_dir_all(&dest).unwrap();

    assert!(!is_extracted(&dest).await);
    let outcome = extract_archive(&archive, &dest, &PasswordList::empty_only())
        .await
        .unwrap();
    assert!(outcome.was_extracted());
    assert!(is_extracted(&dest).await);
}

#[tokio::test]
async fn test_corrupt_zip_is_extraction_failure() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("broken.zip");
    std::fs::write(&archive, b"PK garbage").unwrap();

    let err = extract_archive(&archive, &temp_dir.path().join("out"), &PasswordList::empty_only())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Archive(ArchiveError::ExtractionFailed { .. })
    ));
}

#[tokio::test]
async fn test_encrypted_zip_tries_passwords_in_order() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("secret.zip");
    create_encrypted_zip(&archive, "secret.txt", b"hidden", b"right");

    let mut temp_file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut temp_file, b"wrong\nright\n").unwrap();
    let passwords = PasswordList::collect(None, Some(temp_file.path()), false).await;

    let dest = temp_dir.path().join("secret");
    let outcome = extract_archive(&archive, &dest, &passwords).await.unwrap();
    assert!(outcome.was_extracted());
    assert_eq!(std::fs::read(dest.join("secret.txt")).unwrap(), b"hidden");
}

#[tokio::test]
async fn test_encrypted_zip_all_passwords_fail() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("secret.zip");
    create_encrypted_zip(&archive, "secret.txt", b"hidden", b"right");

    let passwords = PasswordList::collect(Some("wrong"), None, false).await;
    let err = extract_archive(&archive, &temp_dir.path().join("secret"), &passwords)
        .await
        .unwrap_err();
    // ZipCrypto may also surface a wrong key as a generic read failure
    assert!(matches!(
        err,
        Error::Archive(ArchiveError::AllPasswordsFailed { count: 1, .. })
            | Error::Archive(ArchiveError::ExtractionFailed { .. })
    ));
}

#[tokio::test]
async fn test_7z_extraction() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    std::fs::create_dir_all(source.join("meshes")).unwrap();
    std::fs::write(source.join("Mod.esp"), b"plugin").unwrap();
    std::fs::write(source.join("meshes/rock.nif"), b"mesh").unwrap();

    let archive = temp_dir.path().join("Mod-7-1.7z");
    create_7z_archive(&archive, &source);

    let dest = temp_dir.path().join("Mod-7-1");
    let outcome = extract_archive(&archive, &dest, &PasswordList::empty_only())
        .await
        .unwrap();
    assert!(outcome.was_extracted());
    assert_eq!(count_files(&dest), 2);
}

#[tokio::test]
async fn test_rar_with_invalid_data_fails() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("bogus.rar");
    std::fs::write(&archive, b"Rar! not really").unwrap();

    let result = extract_archive(&archive, &temp_dir.path().join("bogus"), &PasswordList::empty_only()).await;
    assert!(result.is_err());
}

// ---------------------------------------------------------------------------
// Shared implementation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_destination_conflict_surfaces_as_absorbed() {
    let archive = PathBuf::from("/downloads/mod.rar");
    let err = extract_with_passwords_impl(
        "TEST",
        |archive: &Path, _pw: &str, dest: &Path| {
            Err(ArchiveError::AlreadyExists {
                archive: archive.to_path_buf(),
                path: dest.to_path_buf(),
            }
            .into())
        },
        &archive,
        Path::new("/mods/mod"),
        &PasswordList::empty_only(),
    )
    .await
    .unwrap_err();
    assert!(err.is_already_exists());
    assert_eq!(err.severity(), crate::error::Severity::Absorbed);
}

#[tokio::test]
async fn test_no_passwords_available() {
    let passwords = PasswordList::collect(None, None, false).await;
    let err = extract_with_passwords_impl(
        "TEST",
        |_a: &Path, _pw: &str, _d: &Path| Ok(Vec::new()),
        Path::new("/downloads/mod.7z"),
        Path::new("/mods/mod"),
        &passwords,
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Archive(ArchiveError::NoPasswordsAvailable { .. })
    ));
}

#[test]
fn test_sanitized_entry_path_drops_traversal() {
    let dest = Path::new("/mods/x");
    assert_eq!(
        sanitized_entry_path(dest, "../../etc/passwd"),
        Some(PathBuf::from("/mods/x/etc/passwd"))
    );
    assert_eq!(
        sanitized_entry_path(dest, r"Data Files\Mod.esp"),
        Some(PathBuf::from("/mods/x/Data Files/Mod.esp"))
    );
    assert_eq!(sanitized_entry_path(dest, ".."), None);
}
