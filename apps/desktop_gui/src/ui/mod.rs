//! UI layer for the planner window: app shell, panels, and persisted layout.

pub mod app;
pub mod export_flow;
pub mod itinerary_list;
pub mod map_panel;
pub mod settings;

pub use app::PlannerApp;
