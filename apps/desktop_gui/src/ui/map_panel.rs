//! Map view: raster tiles, the route figure and numbered markers inside a
//! viewport that never leaves the campus bounds.

use std::collections::{HashMap, HashSet};

use eframe::egui;
use egui::{Color32, TextureHandle};
use planner_core::{
    map::{
        self, Color, MapConstraints, MapViewport, TileId, MARKER_DIAMETER, ROUTE_COLOR,
        ROUTE_OPACITY, ROUTE_WIDTH, TILE_SIZE,
    },
    Itinerary,
};
use shared::{domain::LatLng, protocol::RouteGeometry};

const BACKGROUND: Color32 = Color32::from_rgb(0xE5, 0xE3, 0xDF);
const SCROLL_STEP: f32 = 60.0;
const FIT_PADDING: f64 = 48.0;

/// Tile bookkeeping, generic over the loaded value so it can be exercised
/// without a render context.
pub struct TileCache<T> {
    loaded: HashMap<TileId, T>,
    pending: HashSet<TileId>,
    failed: HashSet<TileId>,
}

impl<T> Default for TileCache<T> {
    fn default() -> Self {
        Self {
            loaded: HashMap::new(),
            pending: HashSet::new(),
            failed: HashSet::new(),
        }
    }
}

impl<T> TileCache<T> {
    pub fn get(&self, tile: &TileId) -> Option<&T> {
        self.loaded.get(tile)
    }

    /// Marks the tile pending and returns true if it still has to be fetched.
    pub fn begin_request(&mut self, tile: TileId) -> bool {
        if self.loaded.contains_key(&tile) || self.failed.contains(&tile) {
            return false;
        }
        self.pending.insert(tile)
    }

    pub fn cancel_request(&mut self, tile: TileId) {
        self.pending.remove(&tile);
    }

    pub fn insert(&mut self, tile: TileId, value: T) {
        self.pending.remove(&tile);
        self.loaded.insert(tile, value);
    }

    pub fn mark_failed(&mut self, tile: TileId) {
        self.pending.remove(&tile);
        self.failed.insert(tile);
    }

    pub fn is_pending(&self, tile: &TileId) -> bool {
        self.pending.contains(tile)
    }
}

pub struct MapPanel {
    viewport: MapViewport,
    constraints: MapConstraints,
    tiles: TileCache<TextureHandle>,
    last_rect: Option<egui::Rect>,
    scroll_accum: f32,
    visible_pending: usize,
}

impl MapPanel {
    pub fn new(viewport: MapViewport) -> Self {
        Self {
            viewport,
            constraints: MapConstraints::default(),
            tiles: TileCache::default(),
            last_rect: None,
            scroll_accum: 0.0,
            visible_pending: 0,
        }
    }

    pub fn viewport(&self) -> MapViewport {
        self.viewport
    }

    /// Screen rectangle of the last drawn map, in points.
    pub fn rect(&self) -> Option<egui::Rect> {
        self.last_rect
    }

    /// Every tile in view has either loaded or failed.
    pub fn is_idle(&self) -> bool {
        self.visible_pending == 0
    }

    pub fn fit(&mut self, points: &[LatLng]) {
        let size = self.size();
        self.viewport = MapViewport::fit(points, &self.constraints, size, FIT_PADDING);
    }

    pub fn zoom_by(&mut self, steps: i32) {
        let size = self.size();
        self.viewport.zoom_by(steps, &self.constraints, size);
    }

    pub fn on_tile_loaded(&mut self, ctx: &egui::Context, tile: TileId, size: [usize; 2], rgba: &[u8]) {
        if rgba.len() != size[0] * size[1] * 4 {
            self.tiles.mark_failed(tile);
            return;
        }
        let image = egui::ColorImage::from_rgba_unmultiplied(size, rgba);
        let texture = ctx.load_texture(
            format!("tile:{}/{}/{}", tile.z, tile.x, tile.y),
            image,
            egui::TextureOptions::LINEAR,
        );
        self.tiles.insert(tile, texture);
    }

    pub fn on_tile_failed(&mut self, tile: TileId) {
        self.tiles.mark_failed(tile);
    }

    fn size(&self) -> [f64; 2] {
        self.last_rect
            .map(|rect| [f64::from(rect.width()), f64::from(rect.height())])
            .unwrap_or([800.0, 600.0])
    }

    /// `request_tile` queues a fetch and returns false if it could not.
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        itinerary: &Itinerary,
        route: Option<&RouteGeometry>,
        mut request_tile: impl FnMut(TileId) -> bool,
    ) {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let rect = response.rect;
        self.last_rect = Some(rect);
        let size = [f64::from(rect.width()), f64::from(rect.height())];

        if response.dragged() {
            let delta = response.drag_delta();
            self.viewport
                .pan_by([f64::from(delta.x), f64::from(delta.y)], &self.constraints, size);
        }
        if response.hovered() {
            self.scroll_accum += ui.input(|input| input.raw_scroll_delta.y);
            while self.scroll_accum >= SCROLL_STEP {
                self.viewport.zoom_by(1, &self.constraints, size);
                self.scroll_accum -= SCROLL_STEP;
            }
            while self.scroll_accum <= -SCROLL_STEP {
                self.viewport.zoom_by(-1, &self.constraints, size);
                self.scroll_accum += SCROLL_STEP;
            }
        }
        // Window resizes change the visible extent, so clamp every frame.
        self.viewport.clamp(&self.constraints, size);

        painter.rect_filled(rect, 0.0, BACKGROUND);

        let tile_size = egui::vec2(TILE_SIZE as f32, TILE_SIZE as f32);
        let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
        let mut pending = 0;
        for placement in self.viewport.visible_tiles(size) {
            let tile_rect = egui::Rect::from_min_size(
                rect.min + egui::vec2(placement.left as f32, placement.top as f32),
                tile_size,
            );
            if let Some(texture) = self.tiles.get(&placement.tile) {
                painter.image(texture.id(), tile_rect, uv, Color32::WHITE);
                continue;
            }
            if self.tiles.begin_request(placement.tile) && !request_tile(placement.tile) {
                self.tiles.cancel_request(placement.tile);
            }
            if self.tiles.is_pending(&placement.tile) {
                pending += 1;
            }
        }
        self.visible_pending = pending;

        let to_screen = |point: LatLng| {
            let [x, y] = self.viewport.screen_position(point, size);
            rect.min + egui::vec2(x as f32, y as f32)
        };

        if let Some(route) = route.filter(|route| route.is_drawable()) {
            let points: Vec<egui::Pos2> = route.points.iter().map(|p| to_screen(*p)).collect();
            let alpha = (ROUTE_OPACITY * 255.0).round() as u8;
            painter.add(egui::Shape::line(
                points,
                egui::Stroke::new(ROUTE_WIDTH, with_alpha(ROUTE_COLOR, alpha)),
            ));
        }

        for marker in map::markers(itinerary) {
            let center = to_screen(marker.position);
            painter.circle(
                center,
                MARKER_DIAMETER / 2.0,
                with_alpha(marker.color, 255),
                egui::Stroke::new(2.0, Color32::WHITE),
            );
            painter.text(
                center,
                egui::Align2::CENTER_CENTER,
                marker.number.to_string(),
                egui::FontId::proportional(13.0),
                Color32::WHITE,
            );
        }

        painter.text(
            rect.right_bottom() - egui::vec2(4.0, 2.0),
            egui::Align2::RIGHT_BOTTOM,
            "© OpenStreetMap contributors",
            egui::FontId::proportional(10.0),
            Color32::from_gray(60),
        );
    }
}

pub fn with_alpha(color: Color, alpha: u8) -> Color32 {
    Color32::from_rgba_unmultiplied(color.r, color.g, color.b, alpha)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(x: u32) -> TileId {
        TileId { z: 15, x, y: 12 }
    }

    #[test]
    fn tiles_are_requested_once() {
        let mut cache: TileCache<()> = TileCache::default();
        assert!(cache.begin_request(tile(1)));
        assert!(!cache.begin_request(tile(1)));
        assert!(cache.is_pending(&tile(1)));

        cache.insert(tile(1), ());
        assert!(!cache.is_pending(&tile(1)));
        assert!(!cache.begin_request(tile(1)));
        assert!(cache.get(&tile(1)).is_some());
    }

    #[test]
    fn failed_tiles_are_not_retried() {
        let mut cache: TileCache<()> = TileCache::default();
        assert!(cache.begin_request(tile(2)));
        cache.mark_failed(tile(2));
        assert!(!cache.is_pending(&tile(2)));
        assert!(!cache.begin_request(tile(2)));
    }

    #[test]
    fn cancelled_requests_can_be_retried() {
        let mut cache: TileCache<()> = TileCache::default();
        assert!(cache.begin_request(tile(3)));
        cache.cancel_request(tile(3));
        assert!(cache.begin_request(tile(3)));
    }

    #[test]
    fn zoom_steps_stay_within_constraints() {
        let constraints = MapConstraints::default();
        let mut panel = MapPanel::new(MapViewport::default());
        panel.zoom_by(1);
        assert_eq!(panel.viewport().zoom, MapViewport::default().zoom + 1);

        panel.zoom_by(50);
        assert_eq!(panel.viewport().zoom, constraints.max_zoom);
        panel.zoom_by(-50);
        assert_eq!(panel.viewport().zoom, constraints.min_zoom);
    }

    #[test]
    fn route_color_keeps_configured_opacity() {
        let color = with_alpha(ROUTE_COLOR, 230);
        assert_eq!(color.a(), 230);
    }
}
