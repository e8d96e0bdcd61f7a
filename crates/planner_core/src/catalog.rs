use std::{collections::HashSet, fs, path::Path};

use anyhow::Context;
use shared::domain::{Event, EventId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog lists event id {0} more than once")]
    DuplicateId(EventId),
    #[error("event {id} has an invalid coordinate ({lat}, {lng})")]
    InvalidCoordinate { id: EventId, lat: f64, lng: f64 },
}

/// The fixed list of candidate events. Read-only once built.
#[derive(Debug, Clone)]
pub struct Catalog {
    events: Vec<Event>,
}

impl Catalog {
    pub fn new(events: Vec<Event>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for event in &events {
            if !seen.insert(event.id) {
                return Err(CatalogError::DuplicateId(event.id));
            }
            if !(-90.0..=90.0).contains(&event.lat) || !(-180.0..=180.0).contains(&event.lng) {
                return Err(CatalogError::InvalidCoordinate {
                    id: event.id,
                    lat: event.lat,
                    lng: event.lng,
                });
            }
        }
        Ok(Self { events })
    }

    pub fn builtin() -> Self {
        Self {
            events: vec![
                Event::new(1, "Opening Ceremony", 38.5382, -121.7617)
                    .with_time("9:00 AM")
                    .with_location("Memorial Union Quad"),
                Event::new(2, "Engineering Expo", 38.5405, -121.7496)
                    .with_time("10:00 AM - 3:00 PM")
                    .with_location("Kemper Hall"),
                Event::new(3, "Animal Science Demo", 38.5396, -121.7544)
                    .with_time("11:30 AM")
                    .with_location("Cole Facility"),
                Event::new(4, "Chemistry Magic Show", 38.5369, -121.7589)
                    .with_time("1:00 PM")
                    .with_location("Chemistry Building"),
            ],
        }
    }

    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog '{}'", path.display()))?;
        let events: Vec<Event> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse catalog '{}'", path.display()))?;
        Ok(Self::new(events)?)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.events.iter().find(|event| event.id == id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Case-insensitive substring match over event names, in catalog order.
pub fn filter<'a>(catalog: &'a Catalog, query: &str) -> Vec<&'a Event> {
    let needle = query.to_lowercase();
    catalog
        .events
        .iter()
        .filter(|event| event.name.to_lowercase().contains(&needle))
        .collect()
}

/// Live search box state. Results are only shown while a query is typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    query: String,
}

impl SearchState {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut String {
        &mut self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn clear(&mut self) {
        self.query.clear();
    }

    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
    }

    pub fn visible_results<'a>(&self, catalog: &'a Catalog) -> Vec<&'a Event> {
        if !self.is_active() {
            return Vec::new();
        }
        filter(catalog, &self.query)
    }
}
