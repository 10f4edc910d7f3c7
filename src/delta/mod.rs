//! Plugin merging through the external DeltaPlugin tool
//!
//! The merger reads a config document's content list and writes a single
//! merged plugin that replaces the base-game masters in load order.
//!
//! ## Architecture
//!
//! The core abstraction is the [`PluginMerger`] trait:
//!
//! - [`CliPluginMerger`]: runs the external `delta_plugin` binary
//! - [`NoOpPluginMerger`]: stub used when no binary is available
//!
//! ## Usage
//!
//! ```no_run
//! use aradir::delta::{CliPluginMerger, PluginMerger};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let merger = CliPluginMerger::discover(None)
//!         .expect("delta_plugin not found");
//!
//!     merger
//!         .merge(
//!             Path::new("presets/base/openmw.cfg"),
//!             Path::new("mods/base/DeltaPlugin/DeltaPluginMerged.omwaddon"),
//!         )
//!         .await?;
//!     Ok(())
//! }
//! ```

mod cli;
mod noop;
mod traits;

pub use cli::CliPluginMerger;
pub use noop::NoOpPluginMerger;
pub use traits::PluginMerger;

use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Folder inside the mod install folder that receives the merged plugin
pub const DELTA_FOLDER: &str = "DeltaPlugin";

/// Pick the merger for a configured location, falling back to the stub
pub fn merger_for(location: Option<&Path>) -> Arc<dyn PluginMerger> {
    match CliPluginMerger::discover(location) {
        Some(merger) => {
            info!(binary = ?merger.binary_path(), "using delta_plugin");
            Arc::new(merger)
        }
        None => {
            warn!(
                ?location,
                "delta_plugin not found, DELTA_PLUGIN steps will fail"
            );
            Arc::new(NoOpPluginMerger)
        }
    }
}
