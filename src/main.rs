use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod app;
mod file_util;
mod labels;
mod session;
mod surface;

use app::PolymarkApp;
use session::Session;

/// Hand-draw polygon outlines over a directory of images and persist
/// them to per-image JSON label files.
#[derive(Parser)]
#[command(name = "polymark", version)]
struct Cli {
    /// Directory containing the images to label
    #[arg(long)]
    image_directory: PathBuf,

    /// Directory the JSON label files are written to
    #[arg(long)]
    label_directory: PathBuf,

    /// Image file extension, used as a *.<ext> filter
    #[arg(long, default_value = "png")]
    image_extension: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let files = file_util::scan_images(&cli.image_directory, &cli.image_extension)?;
    info!(
        "labeling {} *.{} images from {}",
        files.len(),
        cli.image_extension,
        cli.image_directory.display()
    );
    std::fs::create_dir_all(&cli.label_directory)
        .with_context(|| format!("creating label directory {}", cli.label_directory.display()))?;

    let session = Session::new(files, cli.label_directory);
    let fatal: Arc<Mutex<Option<anyhow::Error>>> = Arc::new(Mutex::new(None));
    let app = PolymarkApp::new(session, fatal.clone())?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title("polymark"),
        ..Default::default()
    };
    eframe::run_native("polymark", options, Box::new(move |_cc| Ok(Box::new(app))))
        .map_err(|e| anyhow::anyhow!("display session failed: {e}"))?;

    // a failed session transition closes the window and parks its error
    // here; report it so the process exits non-zero
    let fatal_err = fatal.lock().unwrap().take();
    match fatal_err {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
