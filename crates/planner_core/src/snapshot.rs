//! Raster image of the map view, either captured from the GUI or drawn
//! off-screen from tiles, the route and the markers.

use std::collections::HashMap;

use image::RgbaImage;
use shared::protocol::RouteGeometry;
use tiny_skia::{
    Color as SkColor, ColorU8, FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap,
    PixmapPaint, Rect, Stroke, Transform,
};

use crate::map::{
    Color, MapViewport, MarkerSpec, TileId, MARKER_DIAMETER, ROUTE_COLOR, ROUTE_OPACITY,
    ROUTE_WIDTH,
};

const BACKGROUND: Color = Color::rgb(0xE5, 0xE3, 0xDF);
const MARKER_BORDER: f32 = 2.0;
const DIGIT_CELL: f32 = 3.0;

/// Opaque RGB pixels, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapSnapshot {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl MapSnapshot {
    /// Drops alpha. Returns `None` when the buffer does not match the size.
    pub fn from_rgba(width: u32, height: u32, rgba: &[u8]) -> Option<Self> {
        if width == 0 || height == 0 || rgba.len() != width as usize * height as usize * 4 {
            return None;
        }
        let rgb = rgba
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();
        Some(Self { width, height, rgb })
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Height over width.
    pub fn aspect(&self) -> f64 {
        if self.width == 0 {
            return 0.0;
        }
        f64::from(self.height) / f64::from(self.width)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 3;
        Some([self.rgb[offset], self.rgb[offset + 1], self.rgb[offset + 2]])
    }
}

pub struct SnapshotScene<'a> {
    pub viewport: MapViewport,
    pub size: [u32; 2],
    pub tiles: &'a HashMap<TileId, RgbaImage>,
    pub route: Option<&'a RouteGeometry>,
    pub markers: &'a [MarkerSpec],
}

/// Draws the scene the way the map panel shows it. Missing tiles leave the
/// background visible.
pub fn render(scene: &SnapshotScene<'_>) -> Option<MapSnapshot> {
    let [width, height] = scene.size;
    let mut pixmap = Pixmap::new(width, height)?;
    pixmap.fill(sk_color(BACKGROUND, 255));
    let size = [f64::from(width), f64::from(height)];

    for placement in scene.viewport.visible_tiles(size) {
        let Some(tile) = scene.tiles.get(&placement.tile).and_then(tile_pixmap) else {
            continue;
        };
        pixmap.draw_pixmap(
            placement.left.round() as i32,
            placement.top.round() as i32,
            tile.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }

    if let Some(route) = scene.route.filter(|route| route.is_drawable()) {
        let mut builder = PathBuilder::new();
        for (index, point) in route.points.iter().enumerate() {
            let [x, y] = scene.viewport.screen_position(*point, size);
            if index == 0 {
                builder.move_to(x as f32, y as f32);
            } else {
                builder.line_to(x as f32, y as f32);
            }
        }
        if let Some(path) = builder.finish() {
            let paint = solid_paint(ROUTE_COLOR, (ROUTE_OPACITY * 255.0).round() as u8);
            let stroke = Stroke {
                width: ROUTE_WIDTH,
                line_cap: LineCap::Round,
                line_join: LineJoin::Round,
                ..Stroke::default()
            };
            pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
    }

    for marker in scene.markers {
        let [x, y] = scene.viewport.screen_position(marker.position, size);
        draw_marker(&mut pixmap, marker, x as f32, y as f32);
    }

    let rgb = pixmap
        .pixels()
        .iter()
        .flat_map(|px| {
            let color = px.demultiply();
            [color.red(), color.green(), color.blue()]
        })
        .collect();
    Some(MapSnapshot { width, height, rgb })
}

fn draw_marker(pixmap: &mut Pixmap, marker: &MarkerSpec, cx: f32, cy: f32) {
    let radius = MARKER_DIAMETER / 2.0;
    let Some(circle) = PathBuilder::from_circle(cx, cy, radius) else {
        return;
    };
    pixmap.fill_path(
        &circle,
        &solid_paint(marker.color, 255),
        FillRule::Winding,
        Transform::identity(),
        None,
    );
    let border = Stroke {
        width: MARKER_BORDER,
        ..Stroke::default()
    };
    pixmap.stroke_path(
        &circle,
        &solid_paint(Color::WHITE, 255),
        &border,
        Transform::identity(),
        None,
    );

    let digits = marker.number.to_string();
    let count = digits.len() as f32;
    let text_width = count * 3.0 * DIGIT_CELL + (count - 1.0) * DIGIT_CELL;
    let mut left = cx - text_width / 2.0;
    let top = cy - 2.5 * DIGIT_CELL;
    let white = solid_paint(Color::WHITE, 255);
    for digit in digits.bytes() {
        let rows = DIGIT_GLYPHS[usize::from(digit - b'0')];
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..3u8 {
                if bits & (0b100 >> col) == 0 {
                    continue;
                }
                if let Some(cell) = Rect::from_xywh(
                    left + f32::from(col) * DIGIT_CELL,
                    top + row as f32 * DIGIT_CELL,
                    DIGIT_CELL,
                    DIGIT_CELL,
                ) {
                    pixmap.fill_rect(cell, &white, Transform::identity(), None);
                }
            }
        }
        left += 4.0 * DIGIT_CELL;
    }
}

fn tile_pixmap(image: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    for (dst, px) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        *dst = ColorU8::from_rgba(px[0], px[1], px[2], px[3]).premultiply();
    }
    Some(pixmap)
}

fn solid_paint(color: Color, alpha: u8) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(sk_color(color, alpha));
    paint.anti_alias = true;
    paint
}

fn sk_color(color: Color, alpha: u8) -> SkColor {
    SkColor::from_rgba8(color.r, color.g, color.b, alpha)
}

/// 3x5 bitmap digits, one row per entry, high bit on the left.
const DIGIT_GLYPHS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b001, 0b001, 0b001],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];
