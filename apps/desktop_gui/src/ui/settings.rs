//! Layout preferences kept in eframe storage between runs.

use planner_core::map::{MapConstraints, MapViewport};
use serde::{Deserialize, Serialize};
use shared::domain::{LatLng, RouteMode};

pub const SETTINGS_STORAGE_KEY: &str = "planner_gui.settings";

pub const DEFAULT_SEARCH_PANEL_WIDTH: f32 = 280.0;
pub const MIN_SEARCH_PANEL_WIDTH: f32 = 220.0;
pub const MAX_SEARCH_PANEL_WIDTH: f32 = 420.0;

pub const DEFAULT_ITINERARY_PANEL_WIDTH: f32 = 320.0;
pub const MIN_ITINERARY_PANEL_WIDTH: f32 = 260.0;
pub const MAX_ITINERARY_PANEL_WIDTH: f32 = 480.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedDesktopSettings {
    pub search_panel_width: f32,
    pub itinerary_panel_width: f32,
    pub map_center: [f64; 2],
    pub map_zoom: u8,
    pub route_mode: Option<RouteMode>,
}

impl Default for PersistedDesktopSettings {
    fn default() -> Self {
        let viewport = MapViewport::default();
        Self {
            search_panel_width: DEFAULT_SEARCH_PANEL_WIDTH,
            itinerary_panel_width: DEFAULT_ITINERARY_PANEL_WIDTH,
            map_center: [viewport.center.lat, viewport.center.lng],
            map_zoom: viewport.zoom,
            route_mode: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutPrefs {
    pub search_panel_width: f32,
    pub itinerary_panel_width: f32,
    pub viewport: MapViewport,
    pub route_mode: Option<RouteMode>,
}

impl PersistedDesktopSettings {
    /// Clamps everything back into range; stored values may predate a
    /// change of limits.
    pub fn into_runtime(self) -> LayoutPrefs {
        let constraints = MapConstraints::default();
        let center = LatLng::new(self.map_center[0], self.map_center[1]);
        let center = if constraints.bounds.contains(center) {
            center
        } else {
            MapViewport::default().center
        };
        LayoutPrefs {
            search_panel_width: self
                .search_panel_width
                .clamp(MIN_SEARCH_PANEL_WIDTH, MAX_SEARCH_PANEL_WIDTH),
            itinerary_panel_width: self
                .itinerary_panel_width
                .clamp(MIN_ITINERARY_PANEL_WIDTH, MAX_ITINERARY_PANEL_WIDTH),
            viewport: MapViewport {
                center,
                zoom: self
                    .map_zoom
                    .clamp(constraints.min_zoom, constraints.max_zoom),
            },
            route_mode: self.route_mode,
        }
    }

    pub fn from_runtime(prefs: LayoutPrefs) -> Self {
        Self {
            search_panel_width: prefs
                .search_panel_width
                .clamp(MIN_SEARCH_PANEL_WIDTH, MAX_SEARCH_PANEL_WIDTH),
            itinerary_panel_width: prefs
                .itinerary_panel_width
                .clamp(MIN_ITINERARY_PANEL_WIDTH, MAX_ITINERARY_PANEL_WIDTH),
            map_center: [prefs.viewport.center.lat, prefs.viewport.center.lng],
            map_zoom: prefs.viewport.zoom,
            route_mode: prefs.route_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_values_are_clamped() {
        let prefs = PersistedDesktopSettings {
            search_panel_width: 5.0,
            itinerary_panel_width: 5000.0,
            map_center: [0.0, 0.0],
            map_zoom: 3,
            route_mode: Some(RouteMode::Straight),
        }
        .into_runtime();

        assert_eq!(prefs.search_panel_width, MIN_SEARCH_PANEL_WIDTH);
        assert_eq!(prefs.itinerary_panel_width, MAX_ITINERARY_PANEL_WIDTH);
        assert_eq!(prefs.viewport.center, MapViewport::default().center);
        assert_eq!(prefs.viewport.zoom, 14);
        assert_eq!(prefs.route_mode, Some(RouteMode::Straight));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let parsed: PersistedDesktopSettings =
            serde_json::from_str(r#"{"map_zoom": 17}"#).expect("parse");
        assert_eq!(parsed.map_zoom, 17);
        assert_eq!(parsed.search_panel_width, DEFAULT_SEARCH_PANEL_WIDTH);
        assert_eq!(parsed.route_mode, None);
    }

    #[test]
    fn runtime_round_trip_keeps_viewport() {
        let mut prefs = PersistedDesktopSettings::default().into_runtime();
        prefs.viewport.zoom = 16;
        let stored = PersistedDesktopSettings::from_runtime(prefs);
        assert_eq!(stored.into_runtime(), prefs);
    }
}
