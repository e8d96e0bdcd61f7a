use thiserror::Error;

use crate::domain::EventId;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("event {0} is not in the catalog")]
    UnknownEvent(EventId),
    #[error("position {position} is out of range for an itinerary of {len} entries")]
    PositionOutOfRange { position: usize, len: usize },
}
