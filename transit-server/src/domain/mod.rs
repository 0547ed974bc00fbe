//! Domain types for the transit planner.
//!
//! This module contains the core domain model types. All types enforce
//! their invariants at construction time, so code that receives these types
//! can trust their validity.

mod error;
mod itinerary;
mod leg;
mod route;
mod stop;
mod time;

pub use error::DomainError;
pub use itinerary::Itinerary;
pub use leg::{Leg, RideLeg, StartLeg, TransferLeg};
pub use route::{RouteId, RouteMode, ServiceDays, ServiceId, TripId};
pub use stop::{Coordinate, InvalidCoordinate, StopId};
pub use time::{
    MINUTES_PER_DAY, MINUTES_PER_WEEK, TimeError, WeekMinute, parse_day, parse_hhmm, weekday_of,
};
