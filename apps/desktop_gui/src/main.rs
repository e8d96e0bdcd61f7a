use std::{path::PathBuf, sync::Arc};

mod backend_bridge;
mod controller;
mod ui;

use backend_bridge::commands::BackendCommand;
use clap::Parser;
use controller::events::UiEvent;
use crossbeam_channel::bounded;
use eframe::egui;
use planner_core::{
    config::{self, PlannerSettings},
    Catalog,
};
use shared::domain::RouteMode;
use ui::{
    settings::{PersistedDesktopSettings, SETTINGS_STORAGE_KEY},
    PlannerApp,
};

#[derive(Parser, Debug)]
#[command(name = "picnic-planner-gui", about = "Picnic Day planner window")]
struct Args {
    /// SQLite database holding the saved itinerary.
    #[arg(long)]
    database_url: Option<String>,
    /// JSON catalog to use instead of the built-in events.
    #[arg(long)]
    catalog: Option<PathBuf>,
    #[arg(long)]
    route_mode: Option<RouteMode>,
}

fn resolve_settings(args: Args) -> PlannerSettings {
    let mut settings = config::load_settings();
    match args.database_url {
        Some(url) => settings.database_url = url,
        None if settings.database_url == PlannerSettings::default().database_url => {
            if let Some(path) = default_database_path() {
                settings.database_url = format!("sqlite://{}", path.display());
            }
        }
        None => {}
    }
    if let Some(path) = args.catalog {
        settings.catalog_path = Some(path);
    }
    if let Some(mode) = args.route_mode {
        settings.route_mode = mode;
    }
    settings
}

/// Per-user data dir, so the window finds the same itinerary wherever it
/// is launched from.
fn default_database_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|base| base.join("picnic-planner").join("planner.db"))
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = resolve_settings(Args::parse());
    let catalog = match settings.load_catalog() {
        Ok(catalog) => Arc::new(catalog),
        Err(err) => {
            tracing::error!("failed to load catalog, using built-in events: {err:#}");
            Arc::new(Catalog::builtin())
        }
    };

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    backend_bridge::runtime::launch(cmd_rx, ui_tx, settings.clone());
    // The worker answers in order, so the restore lands before anything else
    // the window queues.
    let _ = cmd_tx.try_send(BackendCommand::LoadItinerary);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Picnic Day Planner")
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([980.0, 640.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Picnic Day Planner",
        options,
        Box::new(move |cc| {
            let persisted_settings = cc.storage.and_then(|storage| {
                storage
                    .get_string(SETTINGS_STORAGE_KEY)
                    .and_then(|text| serde_json::from_str::<PersistedDesktopSettings>(&text).ok())
            });
            Ok(Box::new(PlannerApp::new(
                cmd_tx,
                ui_rx,
                catalog,
                &settings,
                persisted_settings,
            )))
        }),
    )
}
