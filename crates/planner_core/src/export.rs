//! Printable itinerary: title, map snapshot, then one stanza per stop.
//!
//! Layout is planned first as plain data (`ExportLayout::plan`) and only
//! then drawn with printpdf, so pagination can be checked without a PDF.

use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use printpdf::{
    BuiltinFont, Color as PdfColor, ColorBits, ColorSpace, Image, ImageTransform, ImageXObject,
    Mm, PdfDocument, PdfLayerReference, Px, Rgb,
};
use shared::domain::Event;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    map::{color_for, Color},
    snapshot::MapSnapshot,
};

pub const DEFAULT_TITLE: &str = "Picnic Day Itinerary";
pub const DEFAULT_FILE_NAME: &str = "picnic-day-itinerary.pdf";

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const MARGIN_MM: f32 = 15.0;
pub const TITLE_SIZE_PT: f32 = 18.0;
pub const ENTRY_SIZE_PT: f32 = 12.0;
pub const LINE_STEP_MM: f32 = 7.0;
pub const STANZA_GAP_MM: f32 = 4.0;
pub const TOP_AFTER_BREAK_MM: f32 = 20.0;

const TEXT_COLOR: Color = Color::rgb(0x11, 0x18, 0x27);
const DETAIL_COLOR: Color = Color::rgb(0x4B, 0x55, 0x63);

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("itinerary is empty")]
    EmptyItinerary,
    #[error("map capture is unavailable")]
    MissingSnapshot,
    #[error("an export is already in progress")]
    InProgress,
    #[error("pdf rendering failed: {0}")]
    Pdf(String),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    /// Conditions that abort an export without telling the user.
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            Self::EmptyItinerary | Self::MissingSnapshot | Self::InProgress
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutItem {
    Title {
        text: String,
    },
    Map {
        width: f32,
        height: f32,
    },
    /// `1. Name`, with the number in the marker color.
    Heading {
        number: usize,
        name: String,
        color: Color,
    },
    Detail {
        text: String,
    },
}

/// One item on one page. `top` is the distance from the top edge in mm: the
/// baseline for text, the upper edge for the map.
#[derive(Debug, Clone, PartialEq)]
pub struct Placed {
    pub page: usize,
    pub x: f32,
    pub top: f32,
    pub item: LayoutItem,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportLayout {
    pub pages: usize,
    pub items: Vec<Placed>,
}

struct Cursor {
    page: usize,
    top: f32,
}

impl Cursor {
    fn bottom_limit() -> f32 {
        PAGE_HEIGHT_MM - MARGIN_MM
    }

    /// Advances one line, starting a new page when the line would pass the
    /// printable height.
    fn next_line(&mut self) -> (usize, f32) {
        let candidate = self.top + LINE_STEP_MM;
        if candidate > Self::bottom_limit() {
            self.page += 1;
            self.top = TOP_AFTER_BREAK_MM;
        } else {
            self.top = candidate;
        }
        (self.page, self.top)
    }
}

impl ExportLayout {
    pub fn printable_width() -> f32 {
        PAGE_WIDTH_MM - 2.0 * MARGIN_MM
    }

    /// `map_aspect` is the snapshot's height over width.
    pub fn plan(title: &str, events: &[Event], map_aspect: f64) -> Result<Self, ExportError> {
        if events.is_empty() {
            return Err(ExportError::EmptyItinerary);
        }
        if !(map_aspect.is_finite() && map_aspect > 0.0) {
            return Err(ExportError::MissingSnapshot);
        }

        let mut items = Vec::new();
        let mut cursor = Cursor {
            page: 0,
            top: MARGIN_MM,
        };

        let (page, top) = cursor.next_line();
        items.push(Placed {
            page,
            x: MARGIN_MM,
            top,
            item: LayoutItem::Title {
                text: title.to_string(),
            },
        });
        cursor.top += STANZA_GAP_MM;

        let mut width = Self::printable_width();
        let mut height = width * map_aspect as f32;
        let room = Cursor::bottom_limit() - cursor.top;
        if height > room {
            width *= room / height;
            height = room;
        }
        items.push(Placed {
            page: cursor.page,
            x: MARGIN_MM + (Self::printable_width() - width) / 2.0,
            top: cursor.top,
            item: LayoutItem::Map { width, height },
        });
        cursor.top += height + STANZA_GAP_MM;

        for (index, event) in events.iter().enumerate() {
            let (page, top) = cursor.next_line();
            items.push(Placed {
                page,
                x: MARGIN_MM,
                top,
                item: LayoutItem::Heading {
                    number: index + 1,
                    name: event.name.clone(),
                    color: color_for(index),
                },
            });
            let detail = event.metadata_line();
            if !detail.is_empty() {
                let (page, top) = cursor.next_line();
                items.push(Placed {
                    page,
                    x: MARGIN_MM,
                    top,
                    item: LayoutItem::Detail { text: detail },
                });
            }
            cursor.top += STANZA_GAP_MM;
        }

        Ok(Self {
            pages: cursor.page + 1,
            items,
        })
    }
}

pub fn compose_pdf(
    title: &str,
    events: &[Event],
    snapshot: &MapSnapshot,
) -> Result<Vec<u8>, ExportError> {
    if snapshot.is_empty() {
        return Err(ExportError::MissingSnapshot);
    }
    let title = pdf_text(title);
    let layout = ExportLayout::plan(&title, events, snapshot.aspect())?;

    let (doc, first_page, first_layer) = PdfDocument::new(
        title.as_str(),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|err| ExportError::Pdf(err.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|err| ExportError::Pdf(err.to_string()))?;

    let mut layers = vec![doc.get_page(first_page).get_layer(first_layer)];
    for page in 1..layout.pages {
        let (page_index, layer_index) = doc.add_page(
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            format!("Layer {}", page + 1),
        );
        layers.push(doc.get_page(page_index).get_layer(layer_index));
    }

    for placed in &layout.items {
        let Some(layer) = layers.get(placed.page) else {
            continue;
        };
        let baseline = Mm(PAGE_HEIGHT_MM - placed.top);
        match &placed.item {
            LayoutItem::Title { text } => {
                layer.set_fill_color(pdf_color(TEXT_COLOR));
                layer.use_text(text.as_str(), TITLE_SIZE_PT, Mm(placed.x), baseline, &bold);
            }
            LayoutItem::Map { width, height } => {
                place_snapshot(layer, snapshot, placed.x, placed.top + height, *width);
            }
            LayoutItem::Heading {
                number,
                name,
                color,
            } => {
                let label = format!("{number}.");
                layer.set_fill_color(pdf_color(*color));
                layer.use_text(label.as_str(), ENTRY_SIZE_PT, Mm(placed.x), baseline, &bold);
                layer.set_fill_color(pdf_color(TEXT_COLOR));
                layer.use_text(
                    pdf_text(name).as_str(),
                    ENTRY_SIZE_PT,
                    Mm(placed.x + 8.0),
                    baseline,
                    &bold,
                );
            }
            LayoutItem::Detail { text } => {
                layer.set_fill_color(pdf_color(DETAIL_COLOR));
                layer.use_text(
                    pdf_text(text).as_str(),
                    ENTRY_SIZE_PT,
                    Mm(placed.x + 8.0),
                    baseline,
                    &regular,
                );
            }
        }
    }

    let bytes = doc
        .save_to_bytes()
        .map_err(|err| ExportError::Pdf(err.to_string()))?;
    debug!(pages = layout.pages, bytes = bytes.len(), "composed itinerary pdf");
    Ok(bytes)
}

/// `bottom` is measured from the top edge, like layout positions.
fn place_snapshot(layer: &PdfLayerReference, snapshot: &MapSnapshot, x: f32, bottom: f32, width: f32) {
    let image = Image::from(ImageXObject {
        width: Px(snapshot.width as usize),
        height: Px(snapshot.height as usize),
        color_space: ColorSpace::Rgb,
        bits_per_component: ColorBits::Bit8,
        interpolate: true,
        image_data: snapshot.rgb.clone(),
        image_filter: None,
        clipping_bbox: None,
        smask: None,
    });
    // DPI = pixels / inches
    let dpi = snapshot.width as f32 / (width / 25.4);
    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(x)),
            translate_y: Some(Mm(PAGE_HEIGHT_MM - bottom)),
            dpi: Some(dpi),
            ..Default::default()
        },
    );
}

fn pdf_color(color: Color) -> PdfColor {
    let (r, g, b) = color.unit();
    PdfColor::Rgb(Rgb::new(r, g, b, None))
}

/// Builtin fonts only cover Latin-1; anything else becomes '?'.
fn pdf_text(text: &str) -> String {
    text.chars()
        .map(|c| if (c as u32) < 0x100 { c } else { '?' })
        .collect()
}

/// Admits one export at a time. A trigger while another export holds the
/// guard is refused.
#[derive(Clone, Default)]
pub struct ExportPipeline {
    busy: Arc<AtomicBool>,
}

impl ExportPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&self) -> Option<ExportGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ExportGuard {
                busy: self.busy.clone(),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

pub struct ExportGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for ExportGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Written { path: PathBuf, bytes: usize },
    Skipped(String),
}

/// Runs one export under the pipeline guard. A trigger while another export
/// is running is skipped.
pub async fn export_to_file(
    pipeline: &ExportPipeline,
    title: &str,
    events: &[Event],
    snapshot: Option<&MapSnapshot>,
    path: &Path,
) -> Result<ExportOutcome, ExportError> {
    let Some(_guard) = pipeline.try_begin() else {
        debug!("export already running; ignoring trigger");
        return Ok(ExportOutcome::Skipped(ExportError::InProgress.to_string()));
    };
    write_export(title, events, snapshot, path).await
}

/// Composes and writes the document. Silent preconditions come back as
/// `Skipped`; the caller shows nothing for them.
pub async fn write_export(
    title: &str,
    events: &[Event],
    snapshot: Option<&MapSnapshot>,
    path: &Path,
) -> Result<ExportOutcome, ExportError> {
    let result = match snapshot {
        Some(snapshot) => compose_pdf(title, events, snapshot),
        None => Err(ExportError::MissingSnapshot),
    };
    let bytes = match result {
        Ok(bytes) => bytes,
        Err(err) if err.is_silent() => {
            debug!("export skipped: {err}");
            return Ok(ExportOutcome::Skipped(err.to_string()));
        }
        Err(err) => return Err(err),
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| ExportError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    tokio::fs::write(path, &bytes)
        .await
        .map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    info!(path = %path.display(), bytes = bytes.len(), "itinerary exported");
    Ok(ExportOutcome::Written {
        path: path.to_path_buf(),
        bytes: bytes.len(),
    })
}

#[cfg(test)]
#[path = "tests/export_tests.rs"]
mod tests;
