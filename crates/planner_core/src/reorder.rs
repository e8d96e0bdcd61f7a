//! Drag gesture resolution for the itinerary list.

use shared::domain::EventId;

use crate::itinerary::Itinerary;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn distance_sq(self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    pub const fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
        )
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }
}

/// Where each list row was drawn on the frame the drag ended.
#[derive(Debug, Clone, Default)]
pub struct DropZone {
    container: Option<Bounds>,
    items: Vec<(EventId, Bounds)>,
}

impl DropZone {
    pub fn new(container: Bounds) -> Self {
        Self {
            container: Some(container),
            items: Vec::new(),
        }
    }

    pub fn push_item(&mut self, id: EventId, bounds: Bounds) {
        self.items.push((id, bounds));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Closest-center targeting. `None` when the point is outside the list.
    pub fn target_at(&self, point: Point) -> Option<EventId> {
        if let Some(container) = self.container {
            if !container.contains(point) {
                return None;
            }
        }
        closest_center(&self.items, point)
    }
}

pub fn closest_center(items: &[(EventId, Bounds)], point: Point) -> Option<EventId> {
    items
        .iter()
        .map(|(id, bounds)| (*id, bounds.center().distance_sq(point)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}

/// A finished press-and-release on the itinerary list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragGesture {
    pub active: EventId,
    pub over: Option<EventId>,
}

impl DragGesture {
    pub fn released(active: EventId, zone: &DropZone, release: Point) -> Self {
        Self {
            active,
            over: zone.target_at(release),
        }
    }
}

/// Maps a gesture to `(from, to)` indices in the current order, or `None`
/// when the gesture should not touch the store.
pub fn resolve_drop(itinerary: &Itinerary, gesture: DragGesture) -> Option<(usize, usize)> {
    let over = gesture.over?;
    if over == gesture.active {
        return None;
    }
    let from = itinerary.position_of(gesture.active)?;
    let to = itinerary.position_of(over)?;
    Some((from, to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn row(index: usize) -> Bounds {
        let top = 40.0 + index as f32 * 48.0;
        Bounds::new(Point::new(0.0, top), Point::new(300.0, top + 40.0))
    }

    fn zone_for(ids: &[i64]) -> DropZone {
        let mut zone = DropZone::new(Bounds::new(Point::new(0.0, 0.0), Point::new(300.0, 400.0)));
        for (index, id) in ids.iter().enumerate() {
            zone.push_item(EventId(*id), row(index));
        }
        zone
    }

    fn itinerary_of(ids: &[i64]) -> Itinerary {
        let catalog = Catalog::builtin();
        Itinerary::from_events(
            ids.iter()
                .map(|id| catalog.get(EventId(*id)).cloned().expect("event"))
                .collect(),
        )
    }

    #[test]
    fn picks_the_row_whose_center_is_nearest() {
        let zone = zone_for(&[1, 2, 3]);
        assert_eq!(zone.target_at(Point::new(150.0, 62.0)), Some(EventId(1)));
        assert_eq!(zone.target_at(Point::new(10.0, 170.0)), Some(EventId(3)));
        // Gap between rows resolves to the nearer center.
        assert_eq!(zone.target_at(Point::new(150.0, 83.0)), Some(EventId(1)));
        assert_eq!(zone.target_at(Point::new(150.0, 86.0)), Some(EventId(2)));
    }

    #[test]
    fn release_outside_the_list_has_no_target() {
        let zone = zone_for(&[1, 2]);
        assert_eq!(zone.target_at(Point::new(500.0, 60.0)), None);
        assert_eq!(closest_center(&[], Point::new(0.0, 0.0)), None);
    }

    #[test]
    fn resolves_indices_from_current_order() {
        let itinerary = itinerary_of(&[2, 4]);
        let zone = zone_for(&[2, 4]);
        let gesture = DragGesture::released(EventId(2), &zone, Point::new(100.0, 110.0));
        assert_eq!(gesture.over, Some(EventId(4)));
        assert_eq!(resolve_drop(&itinerary, gesture), Some((0, 1)));
    }

    #[test]
    fn dropping_on_itself_or_nowhere_is_a_no_op() {
        let itinerary = itinerary_of(&[1, 2]);
        let on_self = DragGesture {
            active: EventId(1),
            over: Some(EventId(1)),
        };
        let nowhere = DragGesture {
            active: EventId(1),
            over: None,
        };
        assert_eq!(resolve_drop(&itinerary, on_self), None);
        assert_eq!(resolve_drop(&itinerary, nowhere), None);
    }
}
