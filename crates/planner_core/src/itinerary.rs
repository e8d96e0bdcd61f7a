use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use shared::domain::{Event, EventId, LatLng};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReorderError {
    #[error("reorder index {index} is out of range for {len} entries")]
    OutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Appended { position: usize },
    AlreadyPresent { position: usize },
}

impl AddOutcome {
    pub fn changed(self) -> bool {
        matches!(self, Self::Appended { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderOutcome {
    Moved { from: usize, to: usize },
    Unchanged,
}

impl ReorderOutcome {
    pub fn changed(self) -> bool {
        matches!(self, Self::Moved { .. })
    }
}

/// Ordered visit list. Never holds the same event id twice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Itinerary {
    events: Vec<Event>,
}

impl Itinerary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds from an arbitrary list, keeping the first occurrence of each id.
    pub fn from_events(events: Vec<Event>) -> Self {
        let mut seen = HashSet::new();
        let events = events
            .into_iter()
            .filter(|event| seen.insert(event.id))
            .collect();
        Self { events }
    }

    pub fn add(&mut self, event: Event) -> AddOutcome {
        if let Some(position) = self.position_of(event.id) {
            return AddOutcome::AlreadyPresent { position };
        }
        self.events.push(event);
        AddOutcome::Appended {
            position: self.events.len() - 1,
        }
    }

    /// Moves the entry at `from` to `to`; entries in between shift by one.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<ReorderOutcome, ReorderError> {
        let len = self.events.len();
        for index in [from, to] {
            if index >= len {
                return Err(ReorderError::OutOfRange { index, len });
            }
        }
        if from == to {
            return Ok(ReorderOutcome::Unchanged);
        }
        let moved = self.events.remove(from);
        self.events.insert(to, moved);
        Ok(ReorderOutcome::Moved { from, to })
    }

    pub fn position_of(&self, id: EventId) -> Option<usize> {
        self.events.iter().position(|event| event.id == id)
    }

    pub fn contains(&self, id: EventId) -> bool {
        self.position_of(id).is_some()
    }

    pub fn get(&self, position: usize) -> Option<&Event> {
        self.events.get(position)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn ids(&self) -> Vec<EventId> {
        self.events.iter().map(|event| event.id).collect()
    }

    pub fn waypoints(&self) -> Vec<LatLng> {
        self.events.iter().map(Event::position).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl<'a> IntoIterator for &'a Itinerary {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

#[cfg(test)]
#[path = "tests/itinerary_tests.rs"]
mod tests;
