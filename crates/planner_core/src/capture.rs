//! Off-screen capture of the map view for front ends without a window.

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
    itinerary::Itinerary,
    map::{self, MapConstraints, MapViewport},
    route::RouteTracker,
    routing::RoutingCollaborator,
    settle::SettleSignal,
    snapshot::{self, MapSnapshot, SnapshotScene},
    tiles::TileClient,
};

pub const DEFAULT_CAPTURE_SIZE: [u32; 2] = [1024, 768];
const FIT_PADDING: f64 = 48.0;

pub struct CaptureOptions {
    pub size: [u32; 2],
    /// How long to wait for the route before drawing without it.
    pub settle_timeout: Duration,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            size: DEFAULT_CAPTURE_SIZE,
            settle_timeout: Duration::from_secs(30),
        }
    }
}

/// Frames every stop, requests the route and tiles concurrently, waits for
/// the route generation to settle and then draws the view.
pub async fn capture_view(
    itinerary: &Itinerary,
    tracker: RouteTracker,
    router: Arc<dyn RoutingCollaborator>,
    tiles: Option<&TileClient>,
    options: CaptureOptions,
) -> Option<MapSnapshot> {
    let size = [f64::from(options.size[0]), f64::from(options.size[1])];
    let waypoints = itinerary.waypoints();
    let viewport = MapViewport::fit(&waypoints, &MapConstraints::default(), size, FIT_PADDING);

    let signal = SettleSignal::new();
    let tracker = Arc::new(Mutex::new(tracker));
    let (generation, request) = {
        let mut tracker = tracker.lock().await;
        let request = tracker.on_waypoints_changed(waypoints);
        (tracker.generation(), request)
    };

    match request {
        None => {
            signal.mark_settled(generation);
        }
        Some(request) => {
            let tracker = tracker.clone();
            let signal = signal.clone();
            tokio::spawn(async move {
                let result = router.route(&request.waypoints, request.mode).await;
                if tracker.lock().await.resolve(request.generation, result) {
                    signal.mark_settled(request.generation);
                }
            });
        }
    }

    let loaded = match tiles {
        Some(client) => client.fetch_all(&viewport.visible_tiles(size)).await,
        None => HashMap::new(),
    };
    debug!(tiles = loaded.len(), zoom = viewport.zoom, "tiles ready for capture");

    if !signal.wait_for(generation, options.settle_timeout).await {
        warn!(generation, "route did not settle in time; capturing without it");
    }

    let tracker = tracker.lock().await;
    let markers = map::markers(itinerary);
    snapshot::render(&SnapshotScene {
        viewport,
        size: options.size,
        tiles: &loaded,
        route: tracker.current(),
        markers: &markers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{catalog::Catalog, routing::StraightLineRouter};
    use anyhow::Result;
    use async_trait::async_trait;
    use shared::{
        domain::{LatLng, RouteMode, TravelMode},
        protocol::RouteGeometry,
    };

    struct StalledRouter;

    #[async_trait]
    impl RoutingCollaborator for StalledRouter {
        async fn route(&self, waypoints: &[LatLng], _mode: TravelMode) -> Result<RouteGeometry> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(RouteGeometry::straight(waypoints))
        }
    }

    fn builtin_itinerary() -> Itinerary {
        Itinerary::from_events(Catalog::builtin().events().to_vec())
    }

    fn small() -> CaptureOptions {
        CaptureOptions {
            size: [320, 240],
            settle_timeout: Duration::from_millis(100),
        }
    }

    #[tokio::test]
    async fn captures_without_tiles() {
        let snapshot = capture_view(
            &builtin_itinerary(),
            RouteTracker::new(RouteMode::Walking),
            Arc::new(StraightLineRouter),
            None,
            small(),
        )
        .await
        .expect("snapshot");
        assert_eq!((snapshot.width, snapshot.height), (320, 240));
        assert_eq!(snapshot.rgb.len(), 320 * 240 * 3);
    }

    #[tokio::test]
    async fn stalled_router_does_not_block_capture() {
        let started = std::time::Instant::now();
        let snapshot = capture_view(
            &builtin_itinerary(),
            RouteTracker::new(RouteMode::Walking),
            Arc::new(StalledRouter),
            None,
            small(),
        )
        .await;
        assert!(snapshot.is_some());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn empty_itinerary_still_draws_the_default_view() {
        let snapshot = capture_view(
            &Itinerary::new(),
            RouteTracker::new(RouteMode::Straight),
            Arc::new(StraightLineRouter),
            None,
            small(),
        )
        .await;
        assert!(snapshot.is_some());
    }
}
