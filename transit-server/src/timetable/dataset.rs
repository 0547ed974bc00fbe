//! Dataset records as produced by the feed loader.
//!
//! A dataset is a JSON dump of already-parsed timetable entities. The
//! planner never reads the raw feed; it only consumes this dump and builds a
//! `TimetableIndex` from it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{RouteId, RouteMode, ServiceId, StopId, TripId};

use super::error::TimetableError;

/// All entities of one timetable refresh.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub stops: Vec<StopRecord>,

    #[serde(default)]
    pub routes: Vec<RouteRecord>,

    #[serde(default)]
    pub calendars: Vec<CalendarRecord>,

    #[serde(default)]
    pub trips: Vec<TripRecord>,

    #[serde(default)]
    pub stop_times: Vec<StopTimeRecord>,

    #[serde(default)]
    pub transfers: Vec<TransferRecord>,
}

/// A stop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopRecord {
    pub id: StopId,
    #[serde(default)]
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// A route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRecord {
    pub id: RouteId,
    #[serde(default)]
    pub name: String,
    pub mode: RouteMode,
}

/// A service calendar: which days of the week the service runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarRecord {
    pub service_id: ServiceId,
    /// Monday first
    pub days: [bool; 7],
}

/// A trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripRecord {
    pub id: TripId,
    pub route_id: RouteId,
    pub service_id: ServiceId,
}

/// A trip's visit to one stop.
///
/// Times are minutes from the start of the service day and may exceed 1440
/// for trips that run past midnight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopTimeRecord {
    pub trip_id: TripId,
    pub stop_id: StopId,
    pub sequence: u32,
    pub arrival: u32,
    pub departure: u32,
}

/// A directed walking connection between two stops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRecord {
    pub from_stop_id: StopId,
    pub to_stop_id: StopId,
    pub minutes: u32,
}

impl Dataset {
    /// Read a dataset dump from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, TimetableError> {
        let bytes = std::fs::read(path).map_err(|source| TimetableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| TimetableError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}
