//! Backend commands queued from UI to backend worker.

use std::path::PathBuf;

use planner_core::{map::TileId, snapshot::MapSnapshot};
use shared::{domain::Event, protocol::RouteRequest};

pub enum BackendCommand {
    LoadItinerary,
    PersistItinerary {
        events: Vec<Event>,
    },
    FetchRoute {
        request: RouteRequest,
    },
    FetchTile {
        tile: TileId,
    },
    Export {
        title: String,
        events: Vec<Event>,
        snapshot: Option<MapSnapshot>,
        path: PathBuf,
    },
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoadItinerary => "load_itinerary",
            Self::PersistItinerary { .. } => "persist_itinerary",
            Self::FetchRoute { .. } => "fetch_route",
            Self::FetchTile { .. } => "fetch_tile",
            Self::Export { .. } => "export",
        }
    }
}
