use super::*;
use crate::catalog::Catalog;

fn itinerary_of(ids: &[i64]) -> Itinerary {
    let catalog = Catalog::builtin();
    Itinerary::from_events(
        ids.iter()
            .map(|id| catalog.get(EventId(*id)).cloned().expect("event"))
            .collect(),
    )
}

#[test]
fn palette_cycles_by_position() {
    for position in 0..12 {
        assert_eq!(color_for(position), PALETTE[position % PALETTE.len()]);
    }
    assert_eq!(color_for(0).hex(), "#8F9532");
    assert_eq!(color_for(5).hex(), "#D4A61B");
}

#[test]
fn marker_numbers_follow_position_for_every_length() {
    let all = [1, 2, 3, 4];
    for len in 0..=all.len() {
        let specs = markers(&itinerary_of(&all[..len]));
        assert_eq!(specs.len(), len);
        for (index, spec) in specs.iter().enumerate() {
            assert_eq!(spec.number, index + 1);
            assert_eq!(spec.color, PALETTE[index % PALETTE.len()]);
        }
    }
}

#[test]
fn reordering_recolors_markers_by_new_position() {
    let mut itinerary = itinerary_of(&[2, 4]);
    itinerary.reorder(0, 1).expect("reorder");
    let specs = markers(&itinerary);
    assert_eq!(specs[0].id, EventId(4));
    assert_eq!(specs[0].number, 1);
    assert_eq!(specs[0].color, PALETTE[0]);
    assert_eq!(specs[1].id, EventId(2));
    assert_eq!(specs[1].number, 2);
    assert_eq!(specs[1].color, PALETTE[1]);
}

#[test]
fn projection_round_trips() {
    let point = LatLng::new(38.5382, -121.7617);
    for zoom in [0, 10, 15, 18] {
        let back = unproject(project(point, zoom), zoom);
        assert!((back.lat - point.lat).abs() < 1e-9, "zoom {zoom}");
        assert!((back.lng - point.lng).abs() < 1e-9, "zoom {zoom}");
    }
    let origin = project(LatLng::new(0.0, 0.0), 1);
    assert!((origin.x - 256.0).abs() < 1e-9);
    assert!((origin.y - 256.0).abs() < 1e-9);
}

#[test]
fn clamp_keeps_the_view_inside_the_bounds() {
    let constraints = MapConstraints::default();
    let size = [800.0, 600.0];
    let mut viewport = MapViewport::default();
    viewport.pan_by([-100_000.0, -100_000.0], &constraints, size);

    let east_edge = viewport.screen_position(
        LatLng::new(constraints.bounds.north, constraints.bounds.east),
        size,
    );
    assert!((east_edge[0] - size[0]).abs() < 1e-6, "east edge at {east_edge:?}");

    viewport.pan_by([100_000.0, 0.0], &constraints, size);
    let west_edge = viewport.screen_position(
        LatLng::new(constraints.bounds.north, constraints.bounds.west),
        size,
    );
    assert!(west_edge[0].abs() < 1e-6, "west edge at {west_edge:?}");
}

#[test]
fn zoom_stays_in_range() {
    let constraints = MapConstraints::default();
    let mut viewport = MapViewport::default();
    viewport.zoom_by(10, &constraints, [800.0, 600.0]);
    assert_eq!(viewport.zoom, constraints.max_zoom);
    viewport.zoom_by(-10, &constraints, [800.0, 600.0]);
    assert_eq!(viewport.zoom, constraints.min_zoom);
}

#[test]
fn visible_tiles_cover_the_viewport() {
    let viewport = MapViewport::default();
    let size = [800.0, 600.0];
    let tiles = viewport.visible_tiles(size);
    assert!(!tiles.is_empty());
    assert!(tiles.iter().all(|placement| placement.tile.z == 15));
    assert!(tiles.iter().any(|p| p.left <= 0.0 && p.top <= 0.0));
    assert!(tiles
        .iter()
        .any(|p| p.left + TILE_SIZE >= size[0] && p.top + TILE_SIZE >= size[1]));
}

#[test]
fn tile_url_fills_the_template() {
    let tile = TileId { z: 15, x: 5300, y: 12600 };
    assert_eq!(
        tile.url(DEFAULT_TILE_URL),
        "https://tile.openstreetmap.org/15/5300/12600.png"
    );
}

#[test]
fn fit_zooms_in_as_far_as_the_points_allow() {
    let constraints = MapConstraints::default();
    let itinerary = itinerary_of(&[1, 2, 3, 4]);
    let size = [1024.0, 768.0];
    let viewport = MapViewport::fit(&itinerary.waypoints(), &constraints, size, 48.0);
    assert!(viewport.zoom >= constraints.min_zoom && viewport.zoom <= constraints.max_zoom);
    for point in itinerary.waypoints() {
        let [x, y] = viewport.screen_position(point, size);
        assert!((0.0..=size[0]).contains(&x) && (0.0..=size[1]).contains(&y));
    }
}

#[test]
fn directions_link_requests_walking_mode() {
    let url = directions_url(LatLng::new(38.5382, -121.7617)).expect("url");
    assert_eq!(url.host_str(), Some("www.google.com"));
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert!(pairs.contains(&("destination".to_string(), "38.5382,-121.7617".to_string())));
    assert!(pairs.contains(&("travelmode".to_string(), "walking".to_string())));
}
