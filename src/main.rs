#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod batch;
mod config;
mod error;
mod events;
mod ffmpeg;
mod project;
mod ui;
mod utils;

#[cfg(all(test, unix))]
mod test_support;

use anyhow::{anyhow, Result};
use app::MergerApp;
use config::MergerConfig;
use eframe::egui;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let config = MergerConfig::load();
    let app = MergerApp::new(&config)?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 800.0])
            .with_min_inner_size([700.0, 500.0])
            .with_drag_and_drop(true)
            .with_title("FFmpeg Audio Merger"),
        ..Default::default()
    };

    eframe::run_native(
        "FFmpeg Audio Merger",
        options,
        Box::new(|_cc| Ok(Box::new(app))),
    )
    .map_err(|e| anyhow!("Failed to start the user interface: {}", e))
}
