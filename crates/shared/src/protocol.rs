//! Wire shapes exchanged with the routing service.
//!
//! Both OSRM and the Mapbox Directions API answer with the same envelope:
//! a `code` string and a list of `routes`, each carrying a GeoJSON
//! `LineString` whose coordinates are `[lng, lat]` pairs.

use serde::{Deserialize, Serialize};

use crate::domain::{LatLng, TravelMode};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub generation: u64,
    pub waypoints: Vec<LatLng>,
    #[serde(default)]
    pub mode: TravelMode,
}

/// A drawable path, in visit order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RouteGeometry {
    pub points: Vec<LatLng>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_s: Option<f64>,
}

impl RouteGeometry {
    pub fn straight(waypoints: &[LatLng]) -> Self {
        Self {
            points: waypoints.to_vec(),
            distance_m: None,
            duration_s: None,
        }
    }

    pub fn is_drawable(&self) -> bool {
        self.points.len() >= 2
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectionsResponse {
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectionsRoute {
    pub geometry: GeoJsonLineString,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeoJsonLineString {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<[f64; 2]>,
}

impl DirectionsRoute {
    pub fn into_geometry(self) -> RouteGeometry {
        RouteGeometry {
            points: self
                .geometry
                .coordinates
                .into_iter()
                .map(|[lng, lat]| LatLng::new(lat, lng))
                .collect(),
            distance_m: self.distance,
            duration_s: self.duration,
        }
    }
}
