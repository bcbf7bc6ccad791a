// src/main.rs
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
mod gui;

use std::env;
use std::path::PathBuf;

use anyhow::anyhow;
use eframe::egui;
use log::info;
use wdq_explorer::waveform::ExplorerSettings;

const SETTINGS_ENV: &str = "WDQ_EXPLORER_SETTINGS";
const SETTINGS_FILE: &str = "wdq-explorer.json";

fn settings_path() -> PathBuf {
    env::var_os(SETTINGS_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(SETTINGS_FILE))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let path = settings_path();
    let settings = ExplorerSettings::load_or_default(&path);
    info!("settings: {}", path.display());
    // Optional recording to open on startup.
    let initial = env::args_os().nth(1).map(PathBuf::from);

    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([1463.0, 915.0])
        .with_min_inner_size([960.0, 600.0])
        .with_title("WDQ Explorer");
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native(
        "WDQ Explorer",
        options,
        Box::new(move |_cc| Box::new(gui::ExplorerApp::new(settings, initial))),
    )
    .map_err(|err| anyhow!("failed to start the GUI: {err}"))
}
