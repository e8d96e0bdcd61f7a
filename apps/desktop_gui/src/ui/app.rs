use std::{path::PathBuf, sync::Arc, time::Instant};

use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use planner_core::{
    config::PlannerSettings,
    export::{ExportPipeline, DEFAULT_FILE_NAME},
    map::{self, TileId},
    snapshot::MapSnapshot,
    Catalog, ChangeCause, Planner, PlannerEvent, RouteTracker, SettleSignal,
};
use shared::domain::{Event, EventId, LatLng, RouteMode};
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{err_label, UiError, UiErrorContext, UiEvent};
use crate::controller::orchestration::dispatch_backend_command;
use crate::ui::export_flow::ExportFlow;
use crate::ui::itinerary_list::{ItineraryList, ListAction};
use crate::ui::map_panel::MapPanel;
use crate::ui::settings::{
    LayoutPrefs, PersistedDesktopSettings, SETTINGS_STORAGE_KEY, MAX_ITINERARY_PANEL_WIDTH,
    MAX_SEARCH_PANEL_WIDTH, MIN_ITINERARY_PANEL_WIDTH, MIN_SEARCH_PANEL_WIDTH,
};

#[derive(Debug, Clone)]
struct StatusBanner {
    message: String,
}

pub struct PlannerApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    planner: Planner,
    planner_events: broadcast::Receiver<PlannerEvent>,
    tracker: RouteTracker,
    settle: SettleSignal,
    export: ExportFlow,
    export_title: String,
    export_dir: PathBuf,
    map: MapPanel,
    list: ItineraryList,
    status: String,
    status_banner: Option<StatusBanner>,
    search_panel_width: f32,
    itinerary_panel_width: f32,
    restored: bool,
}

impl PlannerApp {
    pub fn new(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        catalog: Arc<Catalog>,
        settings: &PlannerSettings,
        persisted_settings: Option<PersistedDesktopSettings>,
    ) -> Self {
        let prefs = persisted_settings.unwrap_or_default().into_runtime();
        let planner = Planner::new(catalog);
        let planner_events = planner.subscribe_events();
        Self {
            cmd_tx,
            ui_rx,
            planner,
            planner_events,
            tracker: RouteTracker::new(prefs.route_mode.unwrap_or(settings.route_mode)),
            settle: SettleSignal::new(),
            export: ExportFlow::new(ExportPipeline::new()),
            export_title: settings.export_title.clone(),
            export_dir: settings.export_dir.clone(),
            map: MapPanel::new(prefs.viewport),
            list: ItineraryList::default(),
            status: "Loading saved itinerary...".to_string(),
            status_banner: None,
            search_panel_width: prefs.search_panel_width,
            itinerary_panel_width: prefs.itinerary_panel_width,
            restored: false,
        }
    }

    fn dispatch(&mut self, cmd: BackendCommand) -> bool {
        dispatch_backend_command(&self.cmd_tx, cmd, &mut self.status)
    }

    fn show_error(&mut self, err: &UiError) {
        tracing::warn!(context = ?err.context(), "{}", err.message());
        self.status = format!("{} error", err_label(err.category()));
        self.status_banner = Some(StatusBanner {
            message: err.message().to_string(),
        });
    }

    fn process_ui_events(&mut self, ctx: &egui::Context) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(message) => {
                    self.status = message;
                }
                UiEvent::Error(err) => self.show_error(&err),
                UiEvent::ItineraryRestored(itinerary) => {
                    let count = itinerary.len();
                    self.planner.restore(itinerary);
                    self.restored = true;
                    self.status = match count {
                        0 => "Ready".to_string(),
                        1 => "Restored 1 saved stop".to_string(),
                        n => format!("Restored {n} saved stops"),
                    };
                }
                UiEvent::RouteResolved { generation, result } => {
                    if let Err(err) = &result {
                        tracing::warn!(generation, "route unavailable: {err}");
                    }
                    if !self.tracker.resolve(generation, result) {
                        tracing::debug!(generation, "dropping stale route result");
                    }
                }
                UiEvent::TileLoaded { tile, size, rgba } => {
                    self.map.on_tile_loaded(ctx, tile, size, &rgba);
                }
                UiEvent::TileFailed { tile } => self.map.on_tile_failed(tile),
                UiEvent::ExportWritten(path) => {
                    self.export.finish();
                    self.status = format!("Saved {}", path.display());
                }
                UiEvent::ExportSkipped(reason) => {
                    self.export.finish();
                    tracing::debug!("export skipped: {reason}");
                }
                UiEvent::ExportFailed(err) => {
                    self.export.finish();
                    self.show_error(&err);
                }
            }
        }
    }

    fn process_planner_events(&mut self) {
        loop {
            match self.planner_events.try_recv() {
                Ok(PlannerEvent::ItineraryChanged { events, cause }) => {
                    if cause != ChangeCause::Restored {
                        self.dispatch(BackendCommand::PersistItinerary {
                            events: events.clone(),
                        });
                    }
                    let waypoints: Vec<LatLng> =
                        events.iter().map(|event| event.position()).collect();
                    let refit = matches!(cause, ChangeCause::Added { .. } | ChangeCause::Restored);
                    if refit && !waypoints.is_empty() {
                        self.map.fit(&waypoints);
                    }
                    if let Some(request) = self.tracker.on_waypoints_changed(waypoints) {
                        self.dispatch(BackendCommand::FetchRoute { request });
                    }
                }
                Ok(PlannerEvent::QueryCleared) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "planner events lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }

    fn set_route_mode(&mut self, mode: RouteMode) {
        if self.tracker.mode() == mode {
            return;
        }
        if let Some(request) = self.tracker.set_mode(mode) {
            self.dispatch(BackendCommand::FetchRoute { request });
        }
    }

    fn add_event(&mut self, id: EventId) {
        match self.planner.add_by_id(id) {
            Ok(outcome) if !outcome.changed() => {
                self.status = "Already in your itinerary".to_string();
            }
            Ok(_) => {}
            Err(err) => self.show_error(&UiError::from_message(
                UiErrorContext::General,
                err.to_string(),
            )),
        }
    }

    fn open_directions(&mut self, ctx: &egui::Context, destination: LatLng) {
        match map::directions_url(destination) {
            Ok(url) => ctx.open_url(egui::OpenUrl::new_tab(url.as_str())),
            Err(err) => tracing::warn!("could not build directions link: {err}"),
        }
    }

    fn start_export(&mut self) {
        if self.planner.itinerary().is_empty() {
            return;
        }
        if !self.export.begin() {
            tracing::debug!("export already running; ignoring trigger");
            return;
        }
        let mut dialog = rfd::FileDialog::new()
            .set_file_name(DEFAULT_FILE_NAME)
            .add_filter("PDF", &["pdf"]);
        if self.export_dir.is_dir() {
            dialog = dialog.set_directory(&self.export_dir);
        }
        match dialog.save_file() {
            Some(path) => {
                self.status = "Preparing export...".to_string();
                self.export.target(path, self.tracker.generation(), Instant::now());
            }
            None => self.export.finish(),
        }
    }

    fn poll_export(&mut self, ctx: &egui::Context) {
        let settle = self.settle.clone();
        if self.export.poll_settle(|generation| settle.is_settled(generation), Instant::now()) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Screenshot(egui::UserData::default()));
        }

        let screenshot = ctx.input(|input| {
            input.raw.events.iter().find_map(|event| match event {
                egui::Event::Screenshot { image, .. } => Some(Arc::clone(image)),
                _ => None,
            })
        });
        let Some(image) = screenshot else {
            if self.export.is_busy() {
                ctx.request_repaint();
            }
            return;
        };
        let Some(path) = self.export.take_capture_target() else {
            return;
        };

        let snapshot = self.map.rect().and_then(|rect| {
            let region = image.region(&rect, Some(ctx.pixels_per_point()));
            let rgba: Vec<u8> = region
                .pixels
                .iter()
                .flat_map(|pixel| pixel.to_srgba_unmultiplied())
                .collect();
            MapSnapshot::from_rgba(region.size[0] as u32, region.size[1] as u32, &rgba)
        });
        if snapshot.is_none() {
            tracing::warn!("map capture produced no image");
        }
        let cmd = BackendCommand::Export {
            title: self.export_title.clone(),
            events: self.planner.itinerary().events().to_vec(),
            snapshot,
            path,
        };
        if !self.dispatch(cmd) {
            self.export.finish();
        }
    }

    fn mark_settled_if_idle(&self) {
        if self.tracker.is_settled() && self.map.is_idle() {
            self.settle.mark_settled(self.tracker.generation());
        }
    }

    fn show_status_banner(&mut self, ui: &mut egui::Ui) {
        if let Some(banner) = self.status_banner.clone() {
            egui::Frame::NONE
                .fill(egui::Color32::from_rgb(111, 53, 53))
                .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(175, 96, 96)))
                .corner_radius(8.0)
                .inner_margin(egui::Margin::symmetric(10, 8))
                .show(ui, |ui| {
                    ui.horizontal_wrapped(|ui| {
                        ui.label(egui::RichText::new(&banner.message).color(egui::Color32::WHITE));
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.button("Dismiss").clicked() {
                                self.status_banner = None;
                            }
                        });
                    });
                });
        }
    }

    fn show_search_panel(&mut self, ctx: &egui::Context) {
        let response = egui::SidePanel::left("search_panel")
            .default_width(self.search_panel_width)
            .width_range(MIN_SEARCH_PANEL_WIDTH..=MAX_SEARCH_PANEL_WIDTH)
            .show(ctx, |ui| {
                ui.heading("Events");
                ui.add_space(6.0);
                ui.add(
                    egui::TextEdit::singleline(self.planner.search_mut().query_mut())
                        .hint_text("Search by name")
                        .desired_width(f32::INFINITY),
                );
                ui.add_space(6.0);

                let mut clicked = None;
                let restored = self.restored;
                let Some(results) = visible_results(&self.planner) else {
                    return None;
                };
                egui::ScrollArea::vertical().show(ui, |ui| {
                    if results.is_empty() {
                        ui.label(egui::RichText::new("No matching events").weak());
                    }
                    for event in results {
                        let planned = self.planner.itinerary().contains(event.id);
                        ui.horizontal(|ui| {
                            ui.vertical(|ui| {
                                ui.label(egui::RichText::new(&event.name).strong());
                                let meta = event.metadata_line();
                                if !meta.is_empty() {
                                    ui.label(egui::RichText::new(meta).small().weak());
                                }
                            });
                            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                                let label = if planned { "Added" } else { "Add" };
                                if ui
                                    .add_enabled(restored && !planned, egui::Button::new(label))
                                    .clicked()
                                {
                                    clicked = Some(event.id);
                                }
                            });
                        });
                        ui.separator();
                    }
                });
                clicked
            });
        self.search_panel_width = response.response.rect.width();
        if let Some(id) = response.inner {
            self.add_event(id);
        }
    }

    fn show_itinerary_panel(&mut self, ctx: &egui::Context) {
        let response = egui::SidePanel::right("itinerary_panel")
            .default_width(self.itinerary_panel_width)
            .width_range(MIN_ITINERARY_PANEL_WIDTH..=MAX_ITINERARY_PANEL_WIDTH)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("My itinerary");
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let can_export = !self.planner.itinerary().is_empty() && !self.export.is_busy();
                        if ui
                            .add_enabled(can_export, egui::Button::new("Export PDF"))
                            .clicked()
                        {
                            self.start_export();
                        }
                    });
                });

                let mut mode = self.tracker.mode();
                ui.horizontal(|ui| {
                    ui.label("Route:");
                    ui.selectable_value(&mut mode, RouteMode::Walking, "Walking");
                    ui.selectable_value(&mut mode, RouteMode::Straight, "Straight");
                    if ui.button("Fit map").clicked() {
                        let waypoints = self.planner.itinerary().waypoints();
                        self.map.fit(&waypoints);
                    }
                    if ui.small_button("+").on_hover_text("Zoom in").clicked() {
                        self.map.zoom_by(1);
                    }
                    if ui.small_button("-").on_hover_text("Zoom out").clicked() {
                        self.map.zoom_by(-1);
                    }
                });
                self.set_route_mode(mode);
                ui.separator();

                egui::ScrollArea::vertical()
                    .show(ui, |ui| self.list.show(ui, self.planner.itinerary()))
                    .inner
            });
        self.itinerary_panel_width = response.response.rect.width();
        match response.inner {
            Some(ListAction::Dropped(gesture)) => {
                self.planner.apply_gesture(gesture);
            }
            Some(ListAction::OpenDirections(destination)) => self.open_directions(ctx, destination),
            None => {}
        }
    }

    fn show_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            self.show_status_banner(ui);
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new(&self.status).small());
                if self.export.is_busy() {
                    ui.spinner();
                }
            });
        });
    }

    fn show_map(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                let cmd_tx = self.cmd_tx.clone();
                let mut status = String::new();
                let route = self.tracker.current().cloned();
                self.map.show(ui, self.planner.itinerary(), route.as_ref(), |tile: TileId| {
                    dispatch_backend_command(&cmd_tx, BackendCommand::FetchTile { tile }, &mut status)
                });
                if !status.is_empty() {
                    self.status = status;
                }
            });
    }
}

/// The result list exists only while a query is typed.
fn visible_results(planner: &Planner) -> Option<Vec<&Event>> {
    planner
        .search()
        .is_active()
        .then(|| planner.search_results())
}

impl eframe::App for PlannerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events(ctx);
        self.process_planner_events();

        self.show_status_bar(ctx);
        self.show_search_panel(ctx);
        self.show_itinerary_panel(ctx);
        self.show_map(ctx);

        // A drop or add above may have queued events for this frame.
        self.process_planner_events();
        self.mark_settled_if_idle();
        self.poll_export(ctx);

        if self.list.is_dragging() || !self.map.is_idle() || !self.tracker.is_settled() {
            ctx.request_repaint_after(std::time::Duration::from_millis(16));
        } else {
            ctx.request_repaint_after(std::time::Duration::from_millis(250));
        }
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let settings = PersistedDesktopSettings::from_runtime(LayoutPrefs {
            search_panel_width: self.search_panel_width,
            itinerary_panel_width: self.itinerary_panel_width,
            viewport: self.map.viewport(),
            route_mode: Some(self.tracker.mode()),
        });
        if let Ok(serialized) = serde_json::to_string(&settings) {
            storage.set_string(SETTINGS_STORAGE_KEY, serialized);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_are_hidden_until_a_query_is_typed() {
        let mut planner = Planner::new(Arc::new(Catalog::builtin()));
        assert!(visible_results(&planner).is_none());

        planner.search_mut().set_query("no such event");
        assert_eq!(visible_results(&planner).map(|found| found.len()), Some(0));

        planner.search_mut().set_query("EXPO");
        let found = visible_results(&planner).expect("results");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, EventId(2));
    }
}
