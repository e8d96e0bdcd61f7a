//! Ordered itinerary rows with press-drag-release reordering.

use eframe::egui;
use egui::Color32;
use planner_core::{
    map,
    reorder::{Bounds, DragGesture, DropZone, Point},
    Itinerary,
};
use shared::domain::{EventId, LatLng};

use crate::ui::map_panel::with_alpha;

const ROW_HEIGHT: f32 = 48.0;
const BADGE_RADIUS: f32 = 11.0;

pub enum ListAction {
    Dropped(DragGesture),
    OpenDirections(LatLng),
}

#[derive(Default)]
pub struct ItineraryList {
    dragging: Option<EventId>,
}

impl ItineraryList {
    pub fn is_dragging(&self) -> bool {
        self.dragging.is_some()
    }

    pub fn show(&mut self, ui: &mut egui::Ui, itinerary: &Itinerary) -> Option<ListAction> {
        if itinerary.is_empty() {
            self.dragging = None;
            ui.label(egui::RichText::new("Search for events and add them here.").weak());
            return None;
        }

        let rows: Vec<_> = itinerary
            .iter()
            .map(|event| {
                let (rect, response) = ui.allocate_exact_size(
                    egui::vec2(ui.available_width(), ROW_HEIGHT),
                    egui::Sense::click_and_drag(),
                );
                ui.add_space(4.0);
                (event, rect, response)
            })
            .collect();

        let container = rows
            .iter()
            .fold(egui::Rect::NOTHING, |acc, (_, rect, _)| acc.union(*rect));
        let mut zone = DropZone::new(bounds_of(container));
        for (event, rect, _) in &rows {
            zone.push_item(event.id, bounds_of(*rect));
        }

        if let Some((event, _, _)) = rows.iter().find(|(_, _, response)| response.drag_started()) {
            self.dragging = Some(event.id);
        }
        let pointer = ui.input(|input| input.pointer.interact_pos());
        let target = self
            .dragging
            .zip(pointer)
            .and_then(|(_, pos)| zone.target_at(Point::new(pos.x, pos.y)));

        let mut action = None;
        let painter = ui.painter();
        let visuals = ui.visuals().clone();
        for (index, (event, rect, response)) in rows.iter().enumerate() {
            let is_active = self.dragging == Some(event.id);
            let is_target = !is_active && self.dragging.is_some() && target == Some(event.id);
            let fill = if is_active {
                visuals.faint_bg_color.gamma_multiply(0.5)
            } else if response.hovered() {
                visuals.widgets.hovered.weak_bg_fill
            } else {
                visuals.faint_bg_color
            };
            painter.rect_filled(*rect, 6.0, fill);
            if is_target {
                painter.rect_stroke(
                    *rect,
                    6.0,
                    egui::Stroke::new(2.0, visuals.selection.stroke.color),
                    egui::StrokeKind::Inside,
                );
            }

            let badge = egui::pos2(rect.left() + 20.0, rect.center().y);
            painter.circle_filled(badge, BADGE_RADIUS, with_alpha(map::color_for(index), 255));
            painter.text(
                badge,
                egui::Align2::CENTER_CENTER,
                (index + 1).to_string(),
                egui::FontId::proportional(12.0),
                Color32::WHITE,
            );
            painter.text(
                egui::pos2(rect.left() + 40.0, rect.top() + 8.0),
                egui::Align2::LEFT_TOP,
                &event.name,
                egui::FontId::proportional(14.0),
                visuals.strong_text_color(),
            );
            let meta = event.metadata_line();
            if !meta.is_empty() {
                painter.text(
                    egui::pos2(rect.left() + 40.0, rect.top() + 27.0),
                    egui::Align2::LEFT_TOP,
                    meta,
                    egui::FontId::proportional(11.5),
                    visuals.weak_text_color(),
                );
            }

            if response.double_clicked() {
                action = Some(ListAction::OpenDirections(event.position()));
            }
        }

        if let Some(active) = self.dragging {
            let released = rows.iter().any(|(_, _, response)| response.drag_stopped())
                || ui.input(|input| input.pointer.any_released());
            if released {
                let gesture = match pointer {
                    Some(pos) => DragGesture::released(active, &zone, Point::new(pos.x, pos.y)),
                    None => DragGesture { active, over: None },
                };
                self.dragging = None;
                action = Some(ListAction::Dropped(gesture));
            } else {
                ui.ctx().set_cursor_icon(egui::CursorIcon::Grabbing);
            }
        }

        action
    }
}

fn bounds_of(rect: egui::Rect) -> Bounds {
    Bounds::new(
        Point::new(rect.min.x, rect.min.y),
        Point::new(rect.max.x, rect.max.y),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(index: usize) -> egui::Rect {
        let top = 100.0 + index as f32 * (ROW_HEIGHT + 4.0);
        egui::Rect::from_min_size(egui::pos2(10.0, top), egui::vec2(280.0, ROW_HEIGHT))
    }

    fn zone(ids: &[i64]) -> DropZone {
        let container = (0..ids.len()).fold(egui::Rect::NOTHING, |acc, i| acc.union(row(i)));
        let mut zone = DropZone::new(bounds_of(container));
        for (index, id) in ids.iter().enumerate() {
            zone.push_item(EventId(*id), bounds_of(row(index)));
        }
        zone
    }

    #[test]
    fn release_over_a_row_targets_it() {
        let zone = zone(&[2, 4, 1]);
        let over_third = row(2).center();
        let gesture =
            DragGesture::released(EventId(2), &zone, Point::new(over_third.x, over_third.y));
        assert_eq!(gesture.over, Some(EventId(1)));
    }

    #[test]
    fn release_outside_the_list_has_no_target() {
        let zone = zone(&[2, 4]);
        let gesture = DragGesture::released(EventId(2), &zone, Point::new(500.0, 20.0));
        assert_eq!(gesture.over, None);
    }
}
