//! UI/backend events and error modeling for the planner GUI.

use std::path::PathBuf;

use planner_core::{map::TileId, Itinerary};
use shared::protocol::RouteGeometry;

pub enum UiEvent {
    Info(String),
    Error(UiError),
    ItineraryRestored(Itinerary),
    RouteResolved {
        generation: u64,
        result: Result<RouteGeometry, String>,
    },
    TileLoaded {
        tile: TileId,
        size: [usize; 2],
        rgba: Vec<u8>,
    },
    TileFailed {
        tile: TileId,
    },
    ExportWritten(PathBuf),
    ExportSkipped(String),
    ExportFailed(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Transport,
    Storage,
    Export,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    Persistence,
    Export,
    General,
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("sqlite")
            || message_lower.contains("database")
            || message_lower.contains("migration")
            || message_lower.contains("storage")
        {
            UiErrorCategory::Storage
        } else if message_lower.contains("pdf")
            || message_lower.contains("failed to write")
            || message_lower.contains("permission denied")
        {
            UiErrorCategory::Export
        } else if message_lower.contains("invalid")
            || message_lower.contains("missing")
            || message_lower.contains("malformed")
            || message_lower.contains("out of range")
        {
            UiErrorCategory::Validation
        } else if message_lower.contains("timeout")
            || message_lower.contains("timed out")
            || message_lower.contains("connection")
            || message_lower.contains("network")
            || message_lower.contains("dns")
            || message_lower.contains("unavailable")
            || message_lower.contains("disconnect")
            || message_lower.contains("request failed")
        {
            UiErrorCategory::Transport
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub fn err_label(category: UiErrorCategory) -> &'static str {
    match category {
        UiErrorCategory::Transport => "Network",
        UiErrorCategory::Storage => "Storage",
        UiErrorCategory::Export => "Export",
        UiErrorCategory::Validation => "Input",
        UiErrorCategory::Unknown => "Error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_backend_command_processor_disconnect_as_transport_error() {
        let err = UiError::from_message(
            UiErrorContext::General,
            "Backend command processor disconnected (possible startup/runtime failure)",
        );
        assert_eq!(err.category(), UiErrorCategory::Transport);
    }

    #[test]
    fn classifies_database_failures_as_storage() {
        let err = UiError::from_message(
            UiErrorContext::Persistence,
            "failed to open database 'sqlite://./data/planner.db': unable to open database file",
        );
        assert_eq!(err.category(), UiErrorCategory::Storage);
        assert_eq!(err.context(), UiErrorContext::Persistence);
    }

    #[test]
    fn classifies_write_failures_as_export() {
        let err = UiError::from_message(
            UiErrorContext::Export,
            "failed to write /readonly/plan.pdf: Permission denied",
        );
        assert_eq!(err.category(), UiErrorCategory::Export);
        assert_eq!(err_label(err.category()), "Export");
    }

    #[test]
    fn unrecognized_messages_are_unknown() {
        let err = UiError::from_message(UiErrorContext::General, "something odd");
        assert_eq!(err.category(), UiErrorCategory::Unknown);
        assert_eq!(err.message(), "something odd");
    }
}
