use std::sync::Arc;

use shared::{
    domain::{Event, EventId},
    error::PlannerError,
};
use tokio::sync::broadcast;
use tracing::{debug, info};

pub mod capture;
pub mod catalog;
pub mod config;
pub mod export;
pub mod itinerary;
pub mod map;
pub mod persistence;
pub mod reorder;
pub mod route;
pub mod routing;
pub mod settle;
pub mod snapshot;
pub mod tiles;

pub use catalog::{Catalog, SearchState};
pub use itinerary::{AddOutcome, Itinerary, ReorderError, ReorderOutcome};
pub use persistence::PersistenceAdapter;
pub use reorder::{DragGesture, DropZone};
pub use route::RouteTracker;
pub use settle::SettleSignal;

const PLANNER_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeCause {
    Added { id: EventId, position: usize },
    Reordered { from: usize, to: usize },
    Restored,
}

#[derive(Debug, Clone)]
pub enum PlannerEvent {
    /// Carries the full new order so consumers never read a half-applied state.
    ItineraryChanged {
        events: Vec<Event>,
        cause: ChangeCause,
    },
    QueryCleared,
}

/// Owns the application state. Itinerary writes go through `add`, `reorder`
/// and the startup `restore`; each successful one is announced on the event
/// channel.
pub struct Planner {
    catalog: Arc<Catalog>,
    search: SearchState,
    itinerary: Itinerary,
    events: broadcast::Sender<PlannerEvent>,
}

impl Planner {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        let (events, _) = broadcast::channel(PLANNER_EVENT_CAPACITY);
        Self {
            catalog,
            search: SearchState::default(),
            itinerary: Itinerary::new(),
            events,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PlannerEvent> {
        self.events.subscribe()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn itinerary(&self) -> &Itinerary {
        &self.itinerary
    }

    pub fn search(&self) -> &SearchState {
        &self.search
    }

    pub fn search_mut(&mut self) -> &mut SearchState {
        &mut self.search
    }

    pub fn search_results(&self) -> Vec<&Event> {
        self.search.visible_results(&self.catalog)
    }

    pub fn add(&mut self, event: Event) -> AddOutcome {
        let id = event.id;
        let outcome = self.itinerary.add(event);
        if let AddOutcome::Appended { position } = outcome {
            info!(event_id = id.0, position, "added event to itinerary");
            self.publish_change(ChangeCause::Added { id, position });
        } else {
            debug!(event_id = id.0, "event already in itinerary");
        }
        if self.search.is_active() {
            self.search.clear();
            let _ = self.events.send(PlannerEvent::QueryCleared);
        }
        outcome
    }

    pub fn add_by_id(&mut self, id: EventId) -> Result<AddOutcome, PlannerError> {
        let event = self
            .catalog
            .get(id)
            .cloned()
            .ok_or(PlannerError::UnknownEvent(id))?;
        Ok(self.add(event))
    }

    pub fn reorder(&mut self, from: usize, to: usize) -> Result<ReorderOutcome, ReorderError> {
        let outcome = self.itinerary.reorder(from, to)?;
        if let ReorderOutcome::Moved { from, to } = outcome {
            info!(from, to, "reordered itinerary");
            self.publish_change(ChangeCause::Reordered { from, to });
        }
        Ok(outcome)
    }

    /// Applies a finished drag. Gestures without a distinct target are dropped.
    pub fn apply_gesture(&mut self, gesture: DragGesture) -> ReorderOutcome {
        let Some((from, to)) = reorder::resolve_drop(&self.itinerary, gesture) else {
            debug!(active = gesture.active.0, "drag ended without a drop target");
            return ReorderOutcome::Unchanged;
        };
        // Indices come straight from the current order, so they are in range.
        self.reorder(from, to).unwrap_or(ReorderOutcome::Unchanged)
    }

    pub fn restore(&mut self, itinerary: Itinerary) {
        self.itinerary = itinerary;
        self.publish_change(ChangeCause::Restored);
    }

    fn publish_change(&self, cause: ChangeCause) {
        let _ = self.events.send(PlannerEvent::ItineraryChanged {
            events: self.itinerary.events().to_vec(),
            cause,
        });
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
