use super::*;
use crate::catalog::Catalog;

fn stops(count: usize) -> Vec<Event> {
    (0..count)
        .map(|i| {
            Event::new(i as i64 + 1, format!("Stop {}", i + 1), 38.53, -121.76)
                .with_time("9:00 AM")
                .with_location("Quad")
        })
        .collect()
}

fn snapshot() -> MapSnapshot {
    MapSnapshot::from_rgba(4, 3, &[200; 48]).expect("snapshot")
}

fn temp_path(name: &str) -> PathBuf {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_nanos();
    std::env::temp_dir()
        .join(format!("picnic_planner_export_test_{suffix}"))
        .join(name)
}

#[test]
fn empty_itinerary_has_no_layout() {
    assert!(matches!(
        ExportLayout::plan(DEFAULT_TITLE, &[], 0.75),
        Err(ExportError::EmptyItinerary)
    ));
}

#[test]
fn missing_capture_has_no_layout() {
    assert!(matches!(
        ExportLayout::plan(DEFAULT_TITLE, &stops(1), 0.0),
        Err(ExportError::MissingSnapshot)
    ));
}

#[test]
fn short_itinerary_fits_on_one_page() {
    let catalog = Catalog::builtin();
    let layout = ExportLayout::plan(DEFAULT_TITLE, catalog.events(), 0.75).expect("layout");

    assert_eq!(layout.pages, 1);
    assert!(matches!(
        &layout.items[0].item,
        LayoutItem::Title { text } if text == DEFAULT_TITLE
    ));
    let LayoutItem::Map { width, height } = layout.items[1].item else {
        panic!("map should follow the title");
    };
    assert!((width - 180.0).abs() < 1e-3);
    assert!((height - 135.0).abs() < 1e-3);

    let headings: Vec<_> = layout
        .items
        .iter()
        .filter_map(|placed| match &placed.item {
            LayoutItem::Heading { number, name, color } => Some((*number, name.clone(), *color)),
            _ => None,
        })
        .collect();
    assert_eq!(headings.len(), 4);
    assert_eq!(headings[0].0, 1);
    assert_eq!(headings[0].1, "Opening Ceremony");
    assert_eq!(headings[3].2, color_for(3));
}

#[test]
fn stanzas_are_laid_out_top_to_bottom() {
    let layout = ExportLayout::plan(DEFAULT_TITLE, &stops(3), 0.75).expect("layout");
    let tops: Vec<f32> = layout.items.iter().skip(2).map(|placed| placed.top).collect();
    assert!(tops.windows(2).all(|pair| pair[1] > pair[0]));
    assert_eq!(tops[1] - tops[0], LINE_STEP_MM);
    assert_eq!(tops[2] - tops[1], LINE_STEP_MM + STANZA_GAP_MM);
}

#[test]
fn long_itinerary_breaks_onto_a_new_page() {
    let layout = ExportLayout::plan(DEFAULT_TITLE, &stops(10), 0.75).expect("layout");

    assert_eq!(layout.pages, 2);
    assert!(layout
        .items
        .iter()
        .all(|placed| placed.top <= PAGE_HEIGHT_MM - MARGIN_MM));
    let first_on_second_page = layout
        .items
        .iter()
        .find(|placed| placed.page == 1)
        .expect("second page item");
    assert_eq!(first_on_second_page.top, TOP_AFTER_BREAK_MM);
}

#[test]
fn tall_maps_shrink_to_the_remaining_height() {
    let layout = ExportLayout::plan(DEFAULT_TITLE, &stops(1), 3.0).expect("layout");
    let LayoutItem::Map { width, height } = layout.items[1].item else {
        panic!("map should follow the title");
    };
    assert!(layout.items[1].top + height <= PAGE_HEIGHT_MM - MARGIN_MM + 1e-3);
    assert!(width < ExportLayout::printable_width());
    assert!((height / width - 3.0).abs() < 1e-3);
}

#[test]
fn composes_a_pdf_document() {
    let bytes = compose_pdf(DEFAULT_TITLE, &stops(12), &snapshot()).expect("pdf");
    assert!(bytes.starts_with(b"%PDF"));
}

#[test]
fn pipeline_refuses_reentry_until_guard_drops() {
    let pipeline = ExportPipeline::new();
    let guard = pipeline.try_begin().expect("first export");
    assert!(pipeline.is_busy());
    assert!(pipeline.try_begin().is_none());
    drop(guard);
    assert!(!pipeline.is_busy());
    assert!(pipeline.try_begin().is_some());
}

#[tokio::test]
async fn empty_export_writes_nothing() {
    let path = temp_path("empty.pdf");
    let outcome = export_to_file(&ExportPipeline::new(), DEFAULT_TITLE, &[], Some(&snapshot()), &path)
        .await
        .expect("export");
    assert!(matches!(outcome, ExportOutcome::Skipped(_)));
    assert!(!path.exists());
}

#[tokio::test]
async fn failed_capture_writes_nothing() {
    let path = temp_path("no-capture.pdf");
    let outcome = export_to_file(&ExportPipeline::new(), DEFAULT_TITLE, &stops(2), None, &path)
        .await
        .expect("export");
    assert!(matches!(outcome, ExportOutcome::Skipped(_)));
    assert!(!path.exists());
}

#[tokio::test]
async fn concurrent_trigger_is_ignored() {
    let pipeline = ExportPipeline::new();
    let _held = pipeline.try_begin().expect("first export");
    let path = temp_path("second.pdf");
    let outcome = export_to_file(&pipeline, DEFAULT_TITLE, &stops(2), Some(&snapshot()), &path)
        .await
        .expect("export");
    assert!(matches!(outcome, ExportOutcome::Skipped(_)));
    assert!(!path.exists());
}

#[tokio::test]
async fn writes_document_to_disk() {
    let path = temp_path("itinerary.pdf");
    let outcome = export_to_file(&ExportPipeline::new(), DEFAULT_TITLE, &stops(2), Some(&snapshot()), &path)
        .await
        .expect("export");

    let ExportOutcome::Written { path: written, bytes } = outcome else {
        panic!("expected a written document");
    };
    assert_eq!(written, path);
    let on_disk = std::fs::read(&path).expect("read pdf");
    assert_eq!(on_disk.len(), bytes);
    assert!(on_disk.starts_with(b"%PDF"));

    if let Some(parent) = path.parent() {
        let _ = std::fs::remove_dir_all(parent);
    }
}
