//! Itinerary planner using round-based search.
//!
//! This module implements the core planning algorithm that answers:
//! "Leaving this stop at this time, when is the earliest I can reach that
//! stop, using at most this many vehicles?"
//!
//! Each round allows one more boarding. Route patterns are scanned in
//! stop order, and walking transfers are relaxed after every round.

mod config;
mod labels;
mod reconstruct;
mod search;
mod service;

#[cfg(test)]
mod search_tests;

pub use config::PlannerConfig;
pub use labels::{RideLabel, RideUpdate, RoundLabels, WalkLabel};
pub use reconstruct::{ReconstructError, reconstruct};
pub use search::{RoundSearch, SearchOutcome, SearchRequest};
pub use service::{
    Departure, EndpointRole, PlanError, PlanRequest, PlanResult, PlanningService,
};
