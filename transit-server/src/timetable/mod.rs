//! In-memory timetable.
//!
//! Loads a dataset dump, validates it, and builds the immutable index the
//! planner searches. A `TimetableHandle` publishes the current snapshot and
//! swaps it atomically on refresh.

mod dataset;
mod error;
mod footpaths;
mod index;
mod snapshot;
mod spatial;

#[cfg(test)]
pub(crate) mod fixtures;

pub use dataset::{
    CalendarRecord, Dataset, RouteRecord, StopRecord, StopTimeRecord, TransferRecord, TripRecord,
};
pub use error::TimetableError;
pub use footpaths::{Footpath, FootpathConfig, Footpaths, generate_footpaths};
pub use index::{
    IndexCounts, PatternIdx, Route, RouteIdx, RoutePattern, Stop, StopIdx, StopTime,
    TimetableIndex, Trip, TripIdx,
};
pub use snapshot::{Snapshot, TimetableHandle, TimetableSource};
pub use spatial::StopTree;
