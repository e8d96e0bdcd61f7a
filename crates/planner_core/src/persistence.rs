use std::sync::Arc;

use anyhow::{Context, Result};
use shared::domain::Event;
use storage::KeyValueStore;
use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{itinerary::Itinerary, ChangeCause, PlannerEvent};

pub const ITINERARY_STORAGE_KEY: &str = "itinerary";

/// Mirrors the itinerary into a key-value store. Reads never fail: anything
/// unreadable comes back as an empty itinerary.
#[derive(Clone)]
pub struct PersistenceAdapter {
    store: Arc<dyn KeyValueStore>,
}

impl PersistenceAdapter {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> Itinerary {
        let bytes = match self.store.get(ITINERARY_STORAGE_KEY).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!("no persisted itinerary; starting empty");
                return Itinerary::new();
            }
            Err(err) => {
                warn!("failed to read persisted itinerary, starting empty: {err:#}");
                return Itinerary::new();
            }
        };
        match decode_snapshot(&bytes) {
            Some(itinerary) => {
                info!(entries = itinerary.len(), "restored persisted itinerary");
                itinerary
            }
            None => {
                warn!(
                    bytes = bytes.len(),
                    "persisted itinerary is malformed, starting empty"
                );
                Itinerary::new()
            }
        }
    }

    pub async fn save(&self, events: &[Event]) -> Result<()> {
        let bytes = serde_json::to_vec(events).context("failed to encode itinerary")?;
        self.store.put(ITINERARY_STORAGE_KEY, &bytes).await?;
        debug!(entries = events.len(), "persisted itinerary");
        Ok(())
    }

    pub async fn clear(&self) -> Result<bool> {
        self.store.delete(ITINERARY_STORAGE_KEY).await
    }

    /// Writes every store change until the planner goes away. Resolves to the
    /// number of writes attempted.
    pub fn spawn_mirror(&self, mut events: broadcast::Receiver<PlannerEvent>) -> JoinHandle<usize> {
        let adapter = self.clone();
        tokio::spawn(async move {
            let mut writes = 0;
            loop {
                match events.recv().await {
                    Ok(PlannerEvent::ItineraryChanged { events, cause }) => {
                        if cause == ChangeCause::Restored {
                            continue;
                        }
                        writes += 1;
                        if let Err(err) = adapter.save(&events).await {
                            warn!("itinerary write failed: {err:#}");
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "persistence mirror lagged behind planner events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            writes
        })
    }
}

pub fn decode_snapshot(bytes: &[u8]) -> Option<Itinerary> {
    serde_json::from_slice::<Vec<Event>>(bytes)
        .ok()
        .map(Itinerary::from_events)
}

#[cfg(test)]
#[path = "tests/persistence_tests.rs"]
mod tests;
