//! # aradir
//!
//! Installs curated OpenMW mod lists: downloads archives, extracts them, and
//! composes the engine's openmw.cfg so it references the extracted content in
//! the right load order.
//!
//! ## Design Philosophy
//!
//! - **Re-runnable** - Every phase is idempotent; a second run with nothing
//!   changed downloads and extracts nothing
//! - **Line-preserving** - openmw.cfg is edited as ordered text lines, never
//!   parsed into a model, so engine-written lines survive
//! - **Crash-consistent** - Manifests and config documents are replaced
//!   atomically, one step at a time
//! - **Event-driven** - Consumers subscribe to progress events
//!
//! ## Quick Start
//!
//! ```no_run
//! use aradir::delta::merger_for;
//! use aradir::download::ManualDownloader;
//! use aradir::{Pipeline, Preferences};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let prefs = Preferences::load(Path::new("preferences.yaml"))?;
//!     let downloader = Arc::new(ManualDownloader::new(&prefs.download));
//!     let merger = merger_for(prefs.delta.as_deref());
//!
//!     let pipeline = Pipeline::new(Arc::new(prefs), downloader, merger);
//!
//!     // Subscribe to events
//!     let mut events = pipeline.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = pipeline.run().await?;
//!     println!("applied {} steps", summary.steps_applied);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Config composition over openmw.cfg
pub mod composer;
/// Preferences
pub mod config;
/// Plugin merging via DeltaPlugin
pub mod delta;
/// Download drivers
pub mod download;
/// Error types
pub mod error;
/// Archive extraction
pub mod extraction;
/// Pipeline orchestration
pub mod pipeline;
/// Download resume tracking
pub mod resume;
/// Preset and manifest persistence
pub mod store;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use composer::{Composer, ConfigDocument, Instruction};
pub use config::Preferences;
pub use delta::{CliPluginMerger, NoOpPluginMerger, PluginMerger};
pub use download::{ManualDownloader, ModDownloader};
pub use error::{ArchiveError, DownloadError, Error, ResolutionError, Result, Severity};
pub use pipeline::{Pipeline, RunSummary, launch_engine};
pub use types::{DownloadStep, Event, Manifest, ManifestRecord, Preset, UnpackStep};
