use std::{collections::HashMap, time::Duration};

use anyhow::{Context, Result};
use image::RgbaImage;
use reqwest::Client;
use tracing::{debug, warn};

use crate::map::{TileId, TilePlacement};

pub const DEFAULT_TILE_TIMEOUT: Duration = Duration::from_secs(15);

/// Fetches raster map tiles from a `{z}/{x}/{y}` URL template.
#[derive(Clone)]
pub struct TileClient {
    http: Client,
    template: String,
}

impl TileClient {
    pub fn new(template: impl Into<String>, timeout: Duration) -> Result<Self> {
        // Public tile servers reject requests without an identifying agent.
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("picnic-planner/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build tile http client")?;
        Ok(Self {
            http,
            template: template.into(),
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub async fn fetch_bytes(&self, tile: TileId) -> Result<Vec<u8>> {
        let url = tile.url(&self.template);
        let bytes = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("tile request failed: {url}"))?
            .error_for_status()
            .with_context(|| format!("tile server rejected {url}"))?
            .bytes()
            .await
            .context("failed to read tile body")?;
        debug!(z = tile.z, x = tile.x, y = tile.y, bytes = bytes.len(), "tile fetched");
        Ok(bytes.to_vec())
    }

    pub async fn fetch_image(&self, tile: TileId) -> Result<RgbaImage> {
        let bytes = self.fetch_bytes(tile).await?;
        decode_tile(&bytes)
    }

    /// Loads every distinct tile in `placements`. Tiles that fail are left
    /// out and the map shows background there.
    pub async fn fetch_all(&self, placements: &[TilePlacement]) -> HashMap<TileId, RgbaImage> {
        let mut tiles = HashMap::new();
        for placement in placements {
            if tiles.contains_key(&placement.tile) {
                continue;
            }
            match self.fetch_image(placement.tile).await {
                Ok(image) => {
                    tiles.insert(placement.tile, image);
                }
                Err(err) => warn!("skipping tile: {err:#}"),
            }
        }
        tiles
    }
}

pub fn decode_tile(bytes: &[u8]) -> Result<RgbaImage> {
    Ok(image::load_from_memory(bytes)
        .context("failed to decode tile image")?
        .to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    #[test]
    fn decodes_png_tiles() {
        let tile = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        let mut bytes = Cursor::new(Vec::new());
        tile.write_to(&mut bytes, ImageFormat::Png).expect("encode");

        let decoded = decode_tile(bytes.get_ref()).expect("decode");
        assert_eq!(decoded.dimensions(), (4, 4));
        assert_eq!(decoded.get_pixel(2, 2), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode_tile(b"not a png").is_err());
    }
}
