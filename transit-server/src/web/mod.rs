//! Web layer for the transit planner.
//!
//! Provides HTTP endpoints for planning routes and browsing the loaded
//! timetable.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
