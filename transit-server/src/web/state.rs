//! Application state for the web layer.

use crate::planner::PlanningService;

/// Shared application state.
///
/// Cheap to clone; the planning service shares its timetable handle, cache
/// and configuration behind `Arc`s.
#[derive(Clone)]
pub struct AppState {
    /// Planner over the current timetable snapshot
    pub planner: PlanningService,
}

impl AppState {
    /// Create a new app state.
    pub fn new(planner: PlanningService) -> Self {
        Self { planner }
    }
}
