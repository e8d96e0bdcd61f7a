use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::{LatLng, TravelMode},
    protocol::{DirectionsResponse, RouteGeometry},
};
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_OSRM_URL: &str = "https://router.project-osrm.org/route/v1";
pub const DEFAULT_OSRM_PROFILE: &str = "foot";
pub const DEFAULT_MAPBOX_URL: &str = "https://api.mapbox.com/directions/v5";
pub const DEFAULT_ROUTE_TIMEOUT: Duration = Duration::from_secs(30);

/// External turn-by-turn service. Best effort: callers draw nothing on error.
#[async_trait]
pub trait RoutingCollaborator: Send + Sync {
    async fn route(&self, waypoints: &[LatLng], mode: TravelMode) -> Result<RouteGeometry>;
}

/// Connects the stops directly; used when no routing service is configured.
pub struct StraightLineRouter;

#[async_trait]
impl RoutingCollaborator for StraightLineRouter {
    async fn route(&self, waypoints: &[LatLng], _mode: TravelMode) -> Result<RouteGeometry> {
        if waypoints.len() < 2 {
            bail!("a route needs at least two waypoints");
        }
        Ok(RouteGeometry::straight(waypoints))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingProvider {
    Osrm {
        service_url: String,
        profile: String,
    },
    Mapbox {
        base_url: String,
        access_token: String,
    },
}

impl RoutingProvider {
    pub fn osrm_default() -> Self {
        Self::Osrm {
            service_url: DEFAULT_OSRM_URL.to_string(),
            profile: DEFAULT_OSRM_PROFILE.to_string(),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Osrm { .. } => "osrm",
            Self::Mapbox { .. } => "mapbox",
        }
    }
}

/// Client for Directions-style HTTP APIs (OSRM and Mapbox share the
/// response format).
pub struct DirectionsRouter {
    http: Client,
    provider: RoutingProvider,
}

impl DirectionsRouter {
    pub fn new(provider: RoutingProvider, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("picnic-planner/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build routing http client")?;
        Ok(Self { http, provider })
    }

    pub fn provider(&self) -> &RoutingProvider {
        &self.provider
    }

    pub fn request_url(&self, waypoints: &[LatLng], mode: TravelMode) -> Result<Url> {
        let coordinates = waypoints
            .iter()
            .map(|point| format!("{:.6},{:.6}", point.lng, point.lat))
            .collect::<Vec<_>>()
            .join(";");

        let url = match &self.provider {
            RoutingProvider::Osrm {
                service_url,
                profile,
            } => {
                let profile = match mode {
                    TravelMode::Walking => profile.as_str(),
                };
                let mut url = Url::parse(&format!(
                    "{}/{profile}/{coordinates}",
                    service_url.trim_end_matches('/')
                ))
                .with_context(|| format!("invalid osrm service url '{service_url}'"))?;
                url.query_pairs_mut()
                    .append_pair("overview", "full")
                    .append_pair("geometries", "geojson")
                    .append_pair("alternatives", "false");
                url
            }
            RoutingProvider::Mapbox {
                base_url,
                access_token,
            } => {
                let profile = match mode {
                    TravelMode::Walking => "mapbox/walking",
                };
                let mut url = Url::parse(&format!(
                    "{}/{profile}/{coordinates}",
                    base_url.trim_end_matches('/')
                ))
                .with_context(|| format!("invalid mapbox base url '{base_url}'"))?;
                url.query_pairs_mut()
                    .append_pair("geometries", "geojson")
                    .append_pair("overview", "full")
                    .append_pair("language", "en")
                    .append_pair("access_token", access_token);
                url
            }
        };
        Ok(url)
    }
}

#[async_trait]
impl RoutingCollaborator for DirectionsRouter {
    async fn route(&self, waypoints: &[LatLng], mode: TravelMode) -> Result<RouteGeometry> {
        if waypoints.len() < 2 {
            bail!("a route needs at least two waypoints");
        }
        let url = self.request_url(waypoints, mode)?;
        debug!(
            provider = self.provider.label(),
            waypoints = waypoints.len(),
            "requesting route"
        );
        let response: DirectionsResponse = self
            .http
            .get(url)
            .send()
            .await
            .context("routing request failed")?
            .error_for_status()
            .context("routing service returned an error status")?
            .json()
            .await
            .context("failed to decode routing response")?;

        if !response.code.eq_ignore_ascii_case("ok") {
            return Err(anyhow!(
                "routing service answered {}: {}",
                response.code,
                response.message.unwrap_or_default()
            ));
        }
        let route = response
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("routing service returned no routes"))?;
        let geometry = route.into_geometry();
        if !geometry.is_drawable() {
            bail!("routing service returned a degenerate path");
        }
        info!(
            provider = self.provider.label(),
            points = geometry.points.len(),
            distance_m = geometry.distance_m.unwrap_or_default(),
            "route received"
        );
        Ok(geometry)
    }
}

#[cfg(test)]
#[path = "tests/routing_tests.rs"]
mod tests;
