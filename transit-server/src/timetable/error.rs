//! Timetable error types.

use std::path::PathBuf;

/// Errors that can occur while loading a dataset or building the index.
///
/// Every integrity violation is reported at construction time; a built
/// `TimetableIndex` never fails a later lookup because of bad data.
#[derive(Debug, thiserror::Error)]
pub enum TimetableError {
    /// Reading the dataset file failed
    #[error("failed to read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Dataset file is not valid JSON for the expected shape
    #[error("failed to parse dataset {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An identifier is empty
    #[error("{kind} with empty identifier")]
    EmptyId { kind: &'static str },

    /// Two entities of the same kind share an identifier
    #[error("duplicate {kind} identifier: {id}")]
    DuplicateId { kind: &'static str, id: String },

    /// A stop has an out-of-range coordinate
    #[error("stop {stop_id} has an invalid coordinate: {reason}")]
    InvalidCoordinate { stop_id: String, reason: String },

    /// A record references a stop that does not exist
    #[error("{context} references unknown stop {stop_id}")]
    UnknownStop { context: String, stop_id: String },

    /// A stop time references a trip that does not exist
    #[error("stop time references unknown trip {trip_id}")]
    UnknownTrip { trip_id: String },

    /// A trip references a route that does not exist
    #[error("trip {trip_id} references unknown route {route_id}")]
    UnknownRoute { trip_id: String, route_id: String },

    /// A trip references a service calendar that does not exist
    #[error("trip {trip_id} references unknown service {service_id}")]
    UnknownService { trip_id: String, service_id: String },

    /// A transfer starts and ends at the same stop
    #[error("transfer from stop {stop_id} to itself")]
    TransferLoop { stop_id: String },

    /// A trip's stop times are inconsistent
    #[error("trip {trip_id} has invalid stop times: {reason}")]
    InvalidStopTimes { trip_id: String, reason: String },

    /// A background load task failed to complete
    #[error("background load failed: {0}")]
    Background(String),
}
