mod app;
mod chart;
mod color;
mod config;
mod data;
mod router;
mod state;
mod ui;
mod view;

use std::sync::Arc;

use anyhow::Result;
use app::RailDashApp;
use clap::Parser;
use config::{Cli, Settings};
use eframe::egui;
use state::AppState;
use view::Layout;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let settings = Settings::from_cli(&cli)?;
    log::info!(
        "Starting {:?} dashboard on {}",
        settings.variant,
        settings.data_path.display()
    );

    let table = match data::loader::load_file(&settings.data_path, &settings.data) {
        Ok(table) => table,
        Err(e) => {
            log::error!("Failed to load data: {e:#}");
            return Err(e);
        }
    };

    let layout = Layout {
        variant: settings.variant,
        groups: settings.groups,
    };
    let state = AppState::new(Arc::new(table), layout);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 900.0])
            .with_min_inner_size([640.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Rail Dash – Vehicle Sensors",
        options,
        Box::new(|_cc| Ok(Box::new(RailDashApp::new(state)))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))?;

    Ok(())
}
