use std::fmt::Display;

use shared::{
    domain::{LatLng, RouteMode, TravelMode},
    protocol::{RouteGeometry, RouteRequest},
};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum RouteState {
    /// Fewer than two waypoints: nothing to draw.
    Idle,
    Pending { generation: u64 },
    Ready { generation: u64, geometry: RouteGeometry },
    Failed { generation: u64 },
}

/// Keeps at most one route figure for the current waypoint order.
///
/// Every change of the ordered waypoints bumps the generation and drops the
/// previous figure; a result is accepted only if it carries the generation
/// that is current when it arrives.
#[derive(Debug, Clone)]
pub struct RouteTracker {
    mode: RouteMode,
    generation: u64,
    waypoints: Vec<LatLng>,
    state: RouteState,
}

impl RouteTracker {
    pub fn new(mode: RouteMode) -> Self {
        Self {
            mode,
            generation: 0,
            waypoints: Vec::new(),
            state: RouteState::Idle,
        }
    }

    pub fn mode(&self) -> RouteMode {
        self.mode
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> &RouteState {
        &self.state
    }

    pub fn waypoints(&self) -> &[LatLng] {
        &self.waypoints
    }

    /// Switches between straight segments and walking routes, re-planning
    /// the current waypoints.
    pub fn set_mode(&mut self, mode: RouteMode) -> Option<RouteRequest> {
        if self.mode == mode {
            return None;
        }
        self.mode = mode;
        let waypoints = std::mem::take(&mut self.waypoints);
        self.plan(waypoints)
    }

    /// Returns the request to send, if the new order needs one.
    pub fn on_waypoints_changed(&mut self, waypoints: Vec<LatLng>) -> Option<RouteRequest> {
        if waypoints == self.waypoints && self.generation > 0 {
            return None;
        }
        self.plan(waypoints)
    }

    fn plan(&mut self, waypoints: Vec<LatLng>) -> Option<RouteRequest> {
        self.generation += 1;
        self.waypoints = waypoints;
        let generation = self.generation;

        if self.waypoints.len() < 2 {
            self.state = RouteState::Idle;
            return None;
        }
        match self.mode {
            RouteMode::Straight => {
                self.state = RouteState::Ready {
                    generation,
                    geometry: RouteGeometry::straight(&self.waypoints),
                };
                None
            }
            RouteMode::Walking => {
                self.state = RouteState::Pending { generation };
                debug!(generation, waypoints = self.waypoints.len(), "route requested");
                Some(RouteRequest {
                    generation,
                    waypoints: self.waypoints.clone(),
                    mode: TravelMode::Walking,
                })
            }
        }
    }

    /// Applies a routing result. Returns false when the result is stale.
    pub fn resolve<E: Display>(
        &mut self,
        generation: u64,
        result: Result<RouteGeometry, E>,
    ) -> bool {
        if generation != self.generation {
            debug!(
                generation,
                current = self.generation,
                "discarding stale route result"
            );
            return false;
        }
        self.state = match result {
            Ok(geometry) if geometry.is_drawable() => RouteState::Ready {
                generation,
                geometry,
            },
            Ok(_) => {
                warn!(generation, "routing returned an undrawable path");
                RouteState::Failed { generation }
            }
            Err(err) => {
                warn!(generation, error = %err, "routing failed; showing no route");
                RouteState::Failed { generation }
            }
        };
        true
    }

    pub fn current(&self) -> Option<&RouteGeometry> {
        match &self.state {
            RouteState::Ready { geometry, .. } => Some(geometry),
            _ => None,
        }
    }

    /// No request is outstanding for the current generation.
    pub fn is_settled(&self) -> bool {
        !matches!(self.state, RouteState::Pending { .. })
    }
}

impl Default for RouteTracker {
    fn default() -> Self {
        Self::new(RouteMode::default())
    }
}
