//! # aradir CLI
//!
//! Installs an OpenMW mod-list preset from the command line. Values come from
//! `preferences.yaml`; flags override individual fields.

use aradir::config::PreferenceOverrides;
use aradir::delta::merger_for;
use aradir::download::ManualDownloader;
use aradir::{Pipeline, Preferences, Result, store};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Command-line interface for aradir
#[derive(Parser, Debug)]
#[command(name = "aradir")]
#[command(about = "Downloads, extracts and configures OpenMW mod-list presets")]
#[command(version)]
struct Cli {
    /// Preferences file
    #[arg(long, default_value = "preferences.yaml")]
    prefs: PathBuf,

    /// Preset ID
    #[arg(long)]
    preset: Option<String>,

    /// Downloads folder path
    #[arg(long)]
    downloads: Option<PathBuf>,

    /// Mods install folder path
    #[arg(long)]
    modinstall: Option<PathBuf>,

    /// Game data folder path
    #[arg(long)]
    gamedata: Option<PathBuf>,

    /// Settings folder path (holds the engine's openmw.cfg)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// OpenMW install folder path
    #[arg(long)]
    openmw: Option<PathBuf>,

    /// DeltaPlugin binary or folder
    #[arg(long)]
    delta: Option<PathBuf>,

    /// Skip downloading mods
    #[arg(long)]
    nodownload: bool,

    /// Launch OpenMW with the composed config afterwards
    #[arg(long)]
    launch: bool,

    /// List available presets and exit
    #[arg(long)]
    list: bool,
}

impl Cli {
    fn overrides(&self) -> PreferenceOverrides {
        PreferenceOverrides {
            preset: self.preset.clone(),
            downloads: self.downloads.clone(),
            modinstall: self.modinstall.clone(),
            gamedata: self.gamedata.clone(),
            settings: self.settings.clone(),
            openmw: self.openmw.clone(),
            delta: self.delta.clone(),
            nodownload: self.nodownload.then_some(true),
            launch: self.launch.then_some(true),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(code = e.error_code(), "{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut prefs = if cli.prefs.is_file() {
        Preferences::load(&cli.prefs)?
    } else {
        info!(path = ?cli.prefs, "no preferences file, using flags only");
        Preferences::default()
    };
    prefs.apply_overrides(cli.overrides());

    if cli.list {
        for name in store::list_presets(&prefs).await? {
            println!("{name}");
        }
        return Ok(());
    }

    let downloader = Arc::new(ManualDownloader::new(&prefs.download));
    let merger = merger_for(prefs.delta.as_deref());
    let pipeline = Pipeline::new(Arc::new(prefs), downloader, merger);

    let summary = pipeline.run().await?;
    info!(
        preset = %summary.preset,
        downloaded = summary.downloaded,
        extracted = summary.extracted,
        steps = summary.steps_applied,
        "done"
    );
    Ok(())
}
