//! Backend worker: owns the tokio runtime, the database and the HTTP
//! clients, and answers UI commands on the event queue.

use std::{sync::Arc, thread};

use crossbeam_channel::{Receiver, Sender};
use planner_core::{
    config::{self, PlannerSettings},
    export::{self, ExportOutcome},
    routing::{DirectionsRouter, RoutingCollaborator},
    tiles::{TileClient, DEFAULT_TILE_TIMEOUT},
    Itinerary, PersistenceAdapter,
};
use storage::Storage;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

pub fn launch(cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>, settings: PlannerSettings) {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let persistence = match open_persistence(&settings.database_url).await {
                Ok(adapter) => Some(adapter),
                Err(err) => {
                    tracing::error!("itinerary storage unavailable: {err:#}");
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                        UiErrorContext::Persistence,
                        format!("storage unavailable, changes will not be saved: {err:#}"),
                    )));
                    None
                }
            };

            // Straight lines are drawn locally; only walking requests reach the worker.
            let router = match DirectionsRouter::new(
                settings.routing_provider(),
                settings.route_timeout(),
            ) {
                Ok(router) => Arc::new(router),
                Err(err) => {
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                        UiErrorContext::BackendStartup,
                        format!("backend worker startup failure: {err:#}"),
                    )));
                    return;
                }
            };
            let tiles = match TileClient::new(settings.tile_url.clone(), DEFAULT_TILE_TIMEOUT) {
                Ok(client) => client,
                Err(err) => {
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                        UiErrorContext::BackendStartup,
                        format!("backend worker startup failure: {err:#}"),
                    )));
                    return;
                }
            };
            let _ = ui_tx.try_send(UiEvent::Info("Backend worker ready".to_string()));

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    BackendCommand::LoadItinerary => {
                        let itinerary = match &persistence {
                            Some(adapter) => adapter.load().await,
                            None => Itinerary::new(),
                        };
                        let _ = ui_tx.try_send(UiEvent::ItineraryRestored(itinerary));
                    }
                    BackendCommand::PersistItinerary { events } => {
                        // Awaited in place so writes land in the order they were issued.
                        if let Some(adapter) = &persistence {
                            if let Err(err) = adapter.save(&events).await {
                                tracing::warn!("itinerary write failed: {err:#}");
                            }
                        }
                    }
                    BackendCommand::FetchRoute { request } => {
                        tracing::info!(
                            generation = request.generation,
                            waypoints = request.waypoints.len(),
                            "backend: fetch_route"
                        );
                        let router = Arc::clone(&router);
                        let ui_tx = ui_tx.clone();
                        tokio::spawn(async move {
                            let result = router
                                .route(&request.waypoints, request.mode)
                                .await
                                .map_err(|err| format!("{err:#}"));
                            let _ = ui_tx.try_send(UiEvent::RouteResolved {
                                generation: request.generation,
                                result,
                            });
                        });
                    }
                    BackendCommand::FetchTile { tile } => {
                        let tiles = tiles.clone();
                        let ui_tx = ui_tx.clone();
                        tokio::spawn(async move {
                            let event = match tiles.fetch_image(tile).await {
                                Ok(image) => UiEvent::TileLoaded {
                                    tile,
                                    size: [image.width() as usize, image.height() as usize],
                                    rgba: image.into_raw(),
                                },
                                Err(err) => {
                                    tracing::warn!("backend: tile failed: {err:#}");
                                    UiEvent::TileFailed { tile }
                                }
                            };
                            let _ = ui_tx.try_send(event);
                        });
                    }
                    BackendCommand::Export {
                        title,
                        events,
                        snapshot,
                        path,
                    } => {
                        tracing::info!(entries = events.len(), path = %path.display(), "backend: export");
                        let event =
                            match export::write_export(&title, &events, snapshot.as_ref(), &path)
                                .await
                            {
                                Ok(ExportOutcome::Written { path, .. }) => UiEvent::ExportWritten(path),
                                Ok(ExportOutcome::Skipped(reason)) => UiEvent::ExportSkipped(reason),
                                Err(err) => UiEvent::ExportFailed(UiError::from_message(
                                    UiErrorContext::Export,
                                    err.to_string(),
                                )),
                            };
                        let _ = ui_tx.try_send(event);
                    }
                }
            }
            tracing::info!("ui command queue closed; backend worker exiting");
        });
    });
}

async fn open_persistence(raw_database_url: &str) -> anyhow::Result<PersistenceAdapter> {
    let database_url = config::prepare_database_url(raw_database_url)?;
    let storage = Storage::new(&database_url).await?;
    storage.health_check().await?;
    tracing::info!(database_url = %database_url, "itinerary storage ready");
    Ok(PersistenceAdapter::new(Arc::new(storage)))
}
