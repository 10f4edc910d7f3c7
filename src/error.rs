//! Error types for aradir
//!
//! This module provides the error taxonomy for the installation pipeline:
//! - Domain-specific error families (archive, resolution, download)
//! - Instruction errors raised while interpreting a preset's unpack steps
//! - A [`Severity`] classification so the orchestrator can choose between
//!   aborting the run, logging and continuing, or absorbing the failure

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for aradir operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for aradir
///
/// Each variant carries enough context (paths, step positions, mod ids) to
/// diagnose the failure from a log line alone.
#[derive(Debug, Error)]
pub enum Error {
    /// Preferences are invalid or incomplete
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The preference key that caused the error (e.g., "preset")
        key: Option<String>,
    },

    /// Reading or writing a configuration document (openmw.cfg, settings.cfg) failed
    #[error("config document I/O failed for {path}: {source}")]
    ConfigIo {
        /// The document that could not be read or written
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Archive extraction error
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// An unpack step carries a type tag the interpreter does not know
    #[error("unknown instruction type {kind:?} at unpack step {step_index}")]
    UnknownInstruction {
        /// Position of the step in the preset's unpack list
        step_index: usize,
        /// The unrecognized type tag
        kind: String,
    },

    /// An unpack step has a known type but a malformed payload
    #[error("invalid instruction at unpack step {step_index}: {reason}")]
    InvalidInstruction {
        /// Position of the step in the preset's unpack list
        step_index: usize,
        /// Why the payload was rejected
        reason: String,
    },

    /// Manifest record lookup failed
    #[error("manifest resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// Download driver failure
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// Preset or manifest could not be found or parsed
    #[error("failed to load {what} from {path}: {reason}")]
    Load {
        /// "preset", "manifest" or "preferences"
        what: &'static str,
        /// File that was being loaded
        path: PathBuf,
        /// Parse or read failure
        reason: String,
    },

    /// YAML serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// External tool execution failed (delta_plugin, openmw)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Operation not supported (missing binary, not configured)
    #[error("not supported: {0}")]
    NotSupported(String),
}

/// Archive extraction errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// File extension does not map to a supported container format
    #[error("unsupported archive format: {path}")]
    UnsupportedFormat {
        /// The file that could not be dispatched
        path: PathBuf,
    },

    /// Archive extraction failed
    #[error("extraction failed for {archive}: {reason}")]
    ExtractionFailed {
        /// The archive file that failed to extract
        archive: PathBuf,
        /// The reason extraction failed
        reason: String,
    },

    /// Extraction hit a file that is already present at the destination
    #[error("entry already exists while extracting {archive}: {path}")]
    AlreadyExists {
        /// The archive being extracted
        archive: PathBuf,
        /// The destination entry that already existed
        path: PathBuf,
    },

    /// Wrong password for encrypted archive
    #[error("wrong password for encrypted archive {archive}")]
    WrongPassword {
        /// The encrypted archive that could not be opened
        archive: PathBuf,
    },

    /// All passwords failed for archive extraction
    #[error("all {count} passwords failed for archive {archive}")]
    AllPasswordsFailed {
        /// The encrypted archive that could not be opened
        archive: PathBuf,
        /// The number of passwords that were tried
        count: usize,
    },

    /// No passwords available, not even the empty one
    #[error("no passwords available for archive {archive}")]
    NoPasswordsAvailable {
        /// The archive that needed at least one password attempt
        archive: PathBuf,
    },
}

/// Manifest record resolution errors
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// No manifest record exists for the mod
    #[error("no manifest records for mod {mod_id}")]
    NoRecordsForMod {
        /// The mod id referenced by the unpack step
        mod_id: i32,
    },

    /// The mod has records, but fewer than `file_index + 1`
    #[error("file index {file_index} out of range for mod {mod_id} ({available} record(s))")]
    IndexOutOfRange {
        /// The mod id referenced by the unpack step
        mod_id: i32,
        /// The requested position among the mod's records
        file_index: usize,
        /// How many records the mod has
        available: usize,
    },

    /// The step needs an artifact folder but does not reference a mod
    #[error("unpack step {step_index} ({kind}) requires a mod id")]
    RecordRequired {
        /// Position of the step in the preset's unpack list
        step_index: usize,
        /// Instruction type tag
        kind: &'static str,
    },
}

/// Download driver errors
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The source type of a download step has no driver
    #[error("unsupported download source {source_type:?} for mod {mod_id}")]
    UnsupportedSource {
        /// The mod being downloaded
        mod_id: i32,
        /// The `type` field of the download step
        source_type: String,
    },

    /// The download did not complete in time
    #[error("timed out after {seconds}s waiting for {file_name:?} (mod {mod_id})")]
    Timeout {
        /// The mod being downloaded
        mod_id: i32,
        /// The site file name that was expected
        file_name: String,
        /// How long we waited
        seconds: u64,
    },

    /// The driver itself failed
    #[error("download driver failed for mod {mod_id}: {reason}")]
    DriverFailed {
        /// The mod being downloaded
        mod_id: i32,
        /// Driver-provided reason
        reason: String,
    },
}

/// How the orchestrator should react to an error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    /// Abort the run immediately, no partial-state recovery
    Fatal,
    /// Log a warning and continue with the next item
    Recoverable,
    /// Treat as success without surfacing
    Absorbed,
}

impl Error {
    /// Classify this error for the orchestrator's abort/continue policy
    pub fn severity(&self) -> Severity {
        match self {
            e if e.is_already_exists() => Severity::Absorbed,

            // Per-file cleanup and copy failures; a later idempotency check catches the real problem
            Error::Io(_) => Severity::Recoverable,

            Error::Config { .. }
            | Error::ConfigIo { .. }
            | Error::Archive(_)
            | Error::UnknownInstruction { .. }
            | Error::InvalidInstruction { .. }
            | Error::Resolution(_)
            | Error::Download(_)
            | Error::Load { .. }
            | Error::Serialization(_)
            | Error::ExternalTool(_)
            | Error::NotSupported(_) => Severity::Fatal,
        }
    }

    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::ConfigIo { .. } => "config_io_error",
            Error::Archive(ArchiveError::UnsupportedFormat { .. }) => "unsupported_format",
            Error::Archive(ArchiveError::AlreadyExists { .. }) => "already_exists",
            Error::Archive(ArchiveError::WrongPassword { .. })
            | Error::Archive(ArchiveError::AllPasswordsFailed { .. })
            | Error::Archive(ArchiveError::NoPasswordsAvailable { .. }) => "archive_password",
            Error::Archive(ArchiveError::ExtractionFailed { .. }) => "extraction_failed",
            Error::UnknownInstruction { .. } => "unknown_instruction",
            Error::InvalidInstruction { .. } => "invalid_instruction",
            Error::Resolution(_) => "resolution_error",
            Error::Download(_) => "download_error",
            Error::Load { .. } => "load_error",
            Error::Serialization(_) => "serialization_error",
            Error::Io(_) => "io_error",
            Error::ExternalTool(_) => "external_tool_error",
            Error::NotSupported(_) => "not_supported",
        }
    }

    /// Wrap an I/O failure on a configuration document
    pub(crate) fn config_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::ConfigIo {
            path: path.into(),
            source,
        }
    }

    /// True when extraction failed only because content was already in place
    pub fn is_already_exists(&self) -> bool {
        match self {
            Error::Archive(ArchiveError::AlreadyExists { .. }) => true,
            Error::Io(e) => e.kind() == std::io::ErrorKind::AlreadyExists,
            Error::Archive(ArchiveError::ExtractionFailed { reason, .. }) => {
                reason.contains("already exists")
            }
            _ => false,
        }
    }
}
