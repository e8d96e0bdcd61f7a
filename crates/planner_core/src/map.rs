//! Map model: palette, numbered markers, Web Mercator projection, and the
//! bounded viewport shared by the GUI map panel and the snapshot renderer.

use std::f64::consts::PI;

use shared::domain::{EventId, LatLng};
use url::Url;

use crate::itinerary::Itinerary;

pub const TILE_SIZE: f64 = 256.0;
pub const DEFAULT_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const DIRECTIONS_BASE_URL: &str = "https://www.google.com/maps/dir/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const WHITE: Self = Self::rgb(255, 255, 255);

    pub fn hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    pub fn unit(self) -> (f32, f32, f32) {
        (
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }
}

pub const PALETTE: [Color; 4] = [
    Color::rgb(0x8F, 0x95, 0x32),
    Color::rgb(0xD4, 0xA6, 0x1B),
    Color::rgb(0x6F, 0xB3, 0xC9),
    Color::rgb(0x4F, 0x7F, 0xA6),
];

pub const ROUTE_COLOR: Color = Color::rgb(0x25, 0x63, 0xEB);
pub const ROUTE_WIDTH: f32 = 5.0;
pub const ROUTE_OPACITY: f32 = 0.9;
pub const MARKER_DIAMETER: f32 = 28.0;

pub fn color_for(position: usize) -> Color {
    PALETTE[position % PALETTE.len()]
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub id: EventId,
    /// 1-based visit number.
    pub number: usize,
    pub position: LatLng,
    pub color: Color,
}

pub fn markers(itinerary: &Itinerary) -> Vec<MarkerSpec> {
    itinerary
        .iter()
        .enumerate()
        .map(|(index, event)| MarkerSpec {
            id: event.id,
            number: index + 1,
            position: event.position(),
            color: color_for(index),
        })
        .collect()
}

pub fn directions_url(destination: LatLng) -> Result<Url, url::ParseError> {
    Url::parse_with_params(
        DIRECTIONS_BASE_URL,
        &[
            ("api", "1".to_string()),
            (
                "destination",
                format!("{},{}", destination.lat, destination.lng),
            ),
            ("travelmode", "walking".to_string()),
        ],
    )
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldPoint {
    pub x: f64,
    pub y: f64,
}

pub fn world_size(zoom: u8) -> f64 {
    TILE_SIZE * f64::from(1u32 << zoom)
}

pub fn project(point: LatLng, zoom: u8) -> WorldPoint {
    let scale = world_size(zoom);
    let lat = point.lat.clamp(-85.051_128_78, 85.051_128_78).to_radians();
    WorldPoint {
        x: (point.lng + 180.0) / 360.0 * scale,
        y: (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * scale,
    }
}

pub fn unproject(point: WorldPoint, zoom: u8) -> LatLng {
    let scale = world_size(zoom);
    let lng = point.x / scale * 360.0 - 180.0;
    let n = PI - 2.0 * PI * point.y / scale;
    let lat = n.sinh().atan().to_degrees();
    LatLng::new(lat, lng)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl MapBounds {
    pub fn contains(&self, point: LatLng) -> bool {
        (self.south..=self.north).contains(&point.lat) && (self.west..=self.east).contains(&point.lng)
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    pub fn around(points: &[LatLng]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = Self {
            south: first.lat,
            west: first.lng,
            north: first.lat,
            east: first.lng,
        };
        for point in &points[1..] {
            bounds.south = bounds.south.min(point.lat);
            bounds.north = bounds.north.max(point.lat);
            bounds.west = bounds.west.min(point.lng);
            bounds.east = bounds.east.max(point.lng);
        }
        Some(bounds)
    }
}

/// Fixed area of relevance and zoom range for the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapConstraints {
    pub bounds: MapBounds,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

impl Default for MapConstraints {
    fn default() -> Self {
        Self {
            bounds: MapBounds {
                south: 38.5300,
                west: -121.7750,
                north: 38.5480,
                east: -121.7400,
            },
            min_zoom: 14,
            max_zoom: 18,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileId {
    pub fn url(&self, template: &str) -> String {
        template
            .replace("{s}", "a")
            .replace("{z}", &self.z.to_string())
            .replace("{x}", &self.x.to_string())
            .replace("{y}", &self.y.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilePlacement {
    pub tile: TileId,
    /// Top-left corner in viewport pixels.
    pub left: f64,
    pub top: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapViewport {
    pub center: LatLng,
    pub zoom: u8,
}

impl Default for MapViewport {
    fn default() -> Self {
        Self {
            center: LatLng::new(38.5382, -121.7617),
            zoom: 15,
        }
    }
}

impl MapViewport {
    /// Keeps zoom within range and the visible area inside the bounds. When
    /// the view is larger than the bounds on an axis it is centered instead.
    pub fn clamp(&mut self, constraints: &MapConstraints, size: [f64; 2]) {
        self.zoom = self.zoom.clamp(constraints.min_zoom, constraints.max_zoom);
        let nw = project(
            LatLng::new(constraints.bounds.north, constraints.bounds.west),
            self.zoom,
        );
        let se = project(
            LatLng::new(constraints.bounds.south, constraints.bounds.east),
            self.zoom,
        );
        let center = project(self.center, self.zoom);
        let clamp_axis = |value: f64, min: f64, max: f64, extent: f64| {
            let half = extent / 2.0;
            if max - min <= extent {
                (min + max) / 2.0
            } else {
                value.clamp(min + half, max - half)
            }
        };
        let clamped = WorldPoint {
            x: clamp_axis(center.x, nw.x, se.x, size[0]),
            y: clamp_axis(center.y, nw.y, se.y, size[1]),
        };
        self.center = unproject(clamped, self.zoom);
    }

    /// Drag by a screen delta; content follows the pointer.
    pub fn pan_by(&mut self, delta: [f64; 2], constraints: &MapConstraints, size: [f64; 2]) {
        let center = project(self.center, self.zoom);
        self.center = unproject(
            WorldPoint {
                x: center.x - delta[0],
                y: center.y - delta[1],
            },
            self.zoom,
        );
        self.clamp(constraints, size);
    }

    pub fn zoom_by(&mut self, steps: i32, constraints: &MapConstraints, size: [f64; 2]) {
        let zoom = (i32::from(self.zoom) + steps)
            .clamp(i32::from(constraints.min_zoom), i32::from(constraints.max_zoom));
        self.zoom = zoom as u8;
        self.clamp(constraints, size);
    }

    pub fn screen_position(&self, point: LatLng, size: [f64; 2]) -> [f64; 2] {
        let center = project(self.center, self.zoom);
        let world = project(point, self.zoom);
        [
            world.x - center.x + size[0] / 2.0,
            world.y - center.y + size[1] / 2.0,
        ]
    }

    pub fn visible_tiles(&self, size: [f64; 2]) -> Vec<TilePlacement> {
        let center = project(self.center, self.zoom);
        let left = center.x - size[0] / 2.0;
        let top = center.y - size[1] / 2.0;
        let tiles_per_axis = 1i64 << self.zoom;
        let first_x = (left / TILE_SIZE).floor() as i64;
        let last_x = ((left + size[0]) / TILE_SIZE).floor() as i64;
        let first_y = ((top / TILE_SIZE).floor() as i64).max(0);
        let last_y = (((top + size[1]) / TILE_SIZE).floor() as i64).min(tiles_per_axis - 1);

        let mut placements = Vec::new();
        for ty in first_y..=last_y {
            for tx in first_x..=last_x {
                placements.push(TilePlacement {
                    tile: TileId {
                        z: self.zoom,
                        x: tx.rem_euclid(tiles_per_axis) as u32,
                        y: ty as u32,
                    },
                    left: tx as f64 * TILE_SIZE - left,
                    top: ty as f64 * TILE_SIZE - top,
                });
            }
        }
        placements
    }

    /// Largest zoom at which every point fits with `padding` pixels to spare,
    /// then clamped to the constraints.
    pub fn fit(
        points: &[LatLng],
        constraints: &MapConstraints,
        size: [f64; 2],
        padding: f64,
    ) -> Self {
        let Some(area) = MapBounds::around(points) else {
            let mut viewport = Self::default();
            viewport.clamp(constraints, size);
            return viewport;
        };
        let mut zoom = constraints.min_zoom;
        for candidate in (constraints.min_zoom..=constraints.max_zoom).rev() {
            let nw = project(LatLng::new(area.north, area.west), candidate);
            let se = project(LatLng::new(area.south, area.east), candidate);
            if se.x - nw.x <= size[0] - 2.0 * padding && se.y - nw.y <= size[1] - 2.0 * padding {
                zoom = candidate;
                break;
            }
        }
        let mut viewport = Self {
            center: area.center(),
            zoom,
        };
        viewport.clamp(constraints, size);
        viewport
    }
}

#[cfg(test)]
#[path = "tests/map_tests.rs"]
mod tests;
