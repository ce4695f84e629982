//! Card Lister - live card title scanner
//!
//! Reads the title of a card held up to the camera, looks the card up by
//! fuzzy name and appends every newly seen card to a CSV log.

mod analysis;
mod app;
mod capture;
mod config;
mod controls;
mod error;
mod lookup;
mod overlay;
mod shared;
mod storage;
mod vision;

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::app::{CardScanner, ScannerParts};
use crate::capture::ImageSequenceDevice;
use crate::config::AppConfig;
use crate::lookup::{LookupDispatcher, ScryfallClient};
use crate::overlay::PreviewRenderer;
use crate::shared::SessionState;
use crate::storage::{CsvScanLog, ScanRecorder};
use crate::vision::TesseractOcr;

/// Card Lister - scan card titles and log new cards
#[derive(Parser, Debug)]
#[command(name = "card-lister")]
#[command(about = "Scan card titles from a camera feed and log their prices")]
struct Args {
    /// Configuration file (defaults to config.toml in the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of frames to replay as the camera feed
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// CSV file receiving scanned cards
    #[arg(short, long)]
    log: Option<PathBuf>,

    /// Run OCR once every N frames
    #[arg(long)]
    ocr_frequency: Option<u64>,

    /// Digital zoom factor
    #[arg(long)]
    zoom: Option<f32>,

    /// Write the annotated frame to this image file
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Restart the frame sequence when it ends
    #[arg(long)]
    loop_playback: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Write the default configuration to the config path and exit
    #[arg(long)]
    write_default_config: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if args.write_default_config {
        let path = match &args.config {
            Some(path) => path.clone(),
            None => storage::get_config_dir()?.join("config.toml"),
        };
        config::save_config(&AppConfig::default(), &path)?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    let mut config = load_or_create_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args);
    config.validate()?;

    run(config)
}

/// Load configuration from an explicit path, the user config file, or defaults
fn load_or_create_config(explicit: Option<&std::path::Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        let config = config::load_config(path)?;
        info!("Loaded configuration from {:?}", path);
        return Ok(config);
    }

    if let Ok(config_dir) = storage::get_config_dir() {
        let config_path = config_dir.join("config.toml");
        if config_path.exists() {
            match config::load_config(&config_path) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", config_path);
                    return Ok(config);
                }
                Err(e) => error!("Ignoring broken configuration: {:#}", e),
            }
        }
    }
    info!("Using default configuration");
    Ok(AppConfig::default())
}

fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(source) = &args.source {
        config.capture.source = Some(source.clone());
    }
    if let Some(log) = &args.log {
        config.storage.log_path = log.clone();
    }
    if let Some(frequency) = args.ocr_frequency {
        config.recognition.ocr_frequency = frequency;
    }
    if let Some(zoom) = args.zoom {
        config.capture.zoom_factor = zoom;
    }
    if args.loop_playback {
        config.capture.loop_playback = true;
    }
    if let Some(preview) = &args.preview {
        config.overlay.preview_path = Some(preview.clone());
    }
}

fn run(config: AppConfig) -> Result<()> {
    let source = config
        .capture
        .source
        .clone()
        .context("No capture source configured (use --source or capture.source)")?;

    let scan_log = CsvScanLog::open(&config.storage.log_path)
        .with_context(|| format!("Could not open scan log {:?}", config.storage.log_path))?;
    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    let lookup = ScryfallClient::new(&config.lookup)?;

    let mut device =
        ImageSequenceDevice::new(source, config.capture.max_fps, config.capture.loop_playback);
    app::open_device(&mut device, &config).context("Could not open capture device")?;

    let session =
        SessionState::new(config.capture.initial_focus, config.capture.zoom_factor).shared();
    let recorder = Arc::new(ScanRecorder::new(Arc::new(Mutex::new(scan_log)), session.clone()));

    let dispatcher = LookupDispatcher::new(
        Arc::new(lookup),
        recorder,
        session.clone(),
        runtime.handle().clone(),
        Duration::from_secs(config.lookup.timeout_secs),
        config.lookup.discard_stale,
    );

    let parts = ScannerParts {
        device: Box::new(device),
        renderer: Box::new(PreviewRenderer::with_stdin(
            config.overlay.preview_path.clone(),
            config.overlay.preview_every,
        )),
        ocr: Box::new(TesseractOcr::new(&config.recognition)),
        dispatcher,
        session,
        runtime: runtime.handle().clone(),
    };

    info!(
        "Zoom {}x, OCR every {} frames, logging to {:?}",
        config.capture.zoom_factor, config.recognition.ocr_frequency, config.storage.log_path
    );
    let summary = CardScanner::new(parts, &config)?.run();

    runtime.shutdown_timeout(Duration::from_secs(1));
    info!("Card Lister shutdown complete ({} saved)", summary.saved);
    Ok(())
}
