//! Endpoint resolution.
//!
//! Turns a request endpoint (a stop identifier or a coordinate) into a stop
//! of the current timetable. Coordinates snap to the nearest stop by
//! great-circle distance, within a configured maximum.

use crate::domain::{Coordinate, StopId};
use crate::timetable::{StopIdx, TimetableIndex};

/// A request endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    /// A literal stop identifier
    Stop(StopId),
    /// A location to snap to the nearest stop
    Coordinate(Coordinate),
}

/// A resolved endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStop {
    pub stop: StopIdx,
    pub id: StopId,
    /// Distance from the requested coordinate (0 for literal ids).
    pub distance_m: f64,
}

/// Error from endpoint resolution.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocateError {
    /// No stop with this identifier
    #[error("unknown stop {0}")]
    UnknownStop(StopId),

    /// No stop within the snap distance of a coordinate
    #[error("no stop within {max_distance_m} m of ({lat}, {lon})")]
    NoStopNearby {
        lat: f64,
        lon: f64,
        max_distance_m: f64,
    },
}

/// Resolves endpoints against one timetable snapshot.
pub struct StopLocator<'a> {
    index: &'a TimetableIndex,
    max_distance_m: f64,
}

impl<'a> StopLocator<'a> {
    pub fn new(index: &'a TimetableIndex, max_distance_m: f64) -> Self {
        Self {
            index,
            max_distance_m,
        }
    }

    /// Resolve an endpoint to a stop.
    pub fn resolve(&self, endpoint: &Endpoint) -> Result<ResolvedStop, LocateError> {
        match endpoint {
            Endpoint::Stop(id) => self.by_id(id),
            Endpoint::Coordinate(coordinate) => self.nearest(coordinate),
        }
    }

    /// Check that a stop identifier exists.
    pub fn by_id(&self, id: &StopId) -> Result<ResolvedStop, LocateError> {
        let stop = self
            .index
            .stop_idx(id)
            .ok_or_else(|| LocateError::UnknownStop(id.clone()))?;
        Ok(ResolvedStop {
            stop,
            id: id.clone(),
            distance_m: 0.0,
        })
    }

    /// Nearest stop to a coordinate within the maximum distance.
    ///
    /// Equidistant stops resolve to the lowest identifier.
    pub fn nearest(&self, coordinate: &Coordinate) -> Result<ResolvedStop, LocateError> {
        let best = self
            .index
            .stops_within(coordinate, self.max_distance_m)
            .into_iter()
            .min_by(|(a, da), (b, db)| {
                da.total_cmp(db)
                    .then_with(|| self.index.stop(*a).id.cmp(&self.index.stop(*b).id))
            });

        match best {
            Some((stop, distance_m)) => Ok(ResolvedStop {
                stop,
                id: self.index.stop(stop).id.clone(),
                distance_m,
            }),
            None => Err(LocateError::NoStopNearby {
                lat: coordinate.lat(),
                lon: coordinate.lon(),
                max_distance_m: self.max_distance_m,
            }),
        }
    }
}
