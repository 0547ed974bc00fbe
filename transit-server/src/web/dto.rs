//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::domain::{Coordinate, Leg, RouteMode, StopId, WeekMinute};
use crate::locator::{Endpoint, ResolvedStop};
use crate::planner::{Departure, PlanRequest, PlanResult};
use crate::timetable::{IndexCounts, Route, Snapshot, Stop, TimetableIndex};

/// Request to plan a route.
///
/// Each endpoint is either a stop id or a latitude/longitude pair; an id
/// takes precedence when both are given. The departure is either `day` and
/// `time`, or an absolute `departure_mins`, which takes precedence.
#[derive(Debug, Default, Deserialize)]
pub struct PlanRouteRequest {
    pub source_id: Option<String>,
    pub source_lat: Option<f64>,
    pub source_lon: Option<f64>,

    pub target_id: Option<String>,
    pub target_lat: Option<f64>,
    pub target_lon: Option<f64>,

    /// Day of week, Monday = 0
    pub day: Option<i64>,

    /// 24-hour "HH:MM"
    pub time: Option<String>,

    /// Minutes since Monday 00:00
    pub departure_mins: Option<i64>,

    /// Round budget (maximum boardings)
    pub max_rounds: Option<i64>,
}

impl PlanRouteRequest {
    /// Convert into a planner request, checking that each part is present.
    pub fn into_plan_request(self) -> Result<PlanRequest, String> {
        let source = endpoint("source", self.source_id, self.source_lat, self.source_lon)?;
        let target = endpoint("target", self.target_id, self.target_lat, self.target_lon)?;

        let departure = match (self.departure_mins, self.day, self.time) {
            (Some(mins), _, _) => Departure::WeekMinutes(mins),
            (None, Some(day), Some(time)) => Departure::DayTime { day, time },
            _ => return Err("departure requires day and time, or departure_mins".to_string()),
        };

        Ok(PlanRequest {
            source,
            target,
            departure,
            max_rounds: self.max_rounds,
        })
    }
}

fn endpoint(
    role: &str,
    id: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
) -> Result<Endpoint, String> {
    match (id, lat, lon) {
        (Some(id), _, _) if !id.is_empty() => Ok(Endpoint::Stop(StopId::new(id))),
        (_, Some(lat), Some(lon)) => Coordinate::new(lat, lon)
            .map(Endpoint::Coordinate)
            .map_err(|e| format!("{role}: {e}")),
        (_, Some(_), None) | (_, None, Some(_)) => {
            Err(format!("{role} needs both {role}_lat and {role}_lon"))
        }
        _ => Err(format!("{role} requires {role}_id or {role}_lat/{role}_lon")),
    }
}

/// Response for a planned route.
#[derive(Debug, Serialize)]
pub struct PlanRouteResponse {
    /// Week-minute of arrival, or null when unreachable
    pub earliest_arrival: Option<i64>,

    /// Legs from the source, starting with the start leg
    pub path_objs: Vec<LegResult>,

    pub source_stop: ResolvedStopResult,
    pub target_stop: ResolvedStopResult,

    /// Boardings used, or rounds searched when unreachable
    pub rounds: usize,
}

/// An endpoint as resolved by the planner.
#[derive(Debug, Serialize)]
pub struct ResolvedStopResult {
    pub id: String,
    pub distance_m: f64,
}

/// One leg of an itinerary.
///
/// The nested stop and route objects are omitted when their id is not in
/// the snapshot.
#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum LegResult {
    Start {
        stop_id: String,
        arrival_time: i64,
        arrival_label: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        stop: Option<StopResult>,
    },
    Transfer {
        from_stop_id: String,
        stop_id: String,
        transfer_time: u32,
        arrival_time: i64,
        arrival_label: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        from_stop: Option<StopResult>,
        #[serde(skip_serializing_if = "Option::is_none")]
        stop: Option<StopResult>,
    },
    Trip {
        route_id: String,
        trip_id: String,
        board_stop_id: String,
        board_pos: u32,
        disembark_stop_id: String,
        disembark_pos: u32,
        departure_time: i64,
        arrival_time: i64,
        arrival_label: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        route: Option<RouteResult>,
        #[serde(skip_serializing_if = "Option::is_none")]
        board_stop: Option<StopResult>,
        #[serde(skip_serializing_if = "Option::is_none")]
        disembark_stop: Option<StopResult>,
    },
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

/// A stop in the catalogue.
#[derive(Debug, Serialize, PartialEq)]
pub struct StopResult {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// A route in the catalogue.
#[derive(Debug, Serialize, PartialEq)]
pub struct RouteResult {
    pub id: String,
    pub name: String,
    pub mode: RouteMode,
}

/// Query for the nearest stop to a location.
#[derive(Debug, Deserialize)]
pub struct NearestStopQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Nearest stop to a location.
#[derive(Debug, Serialize)]
pub struct NearestStopResponse {
    pub id: String,
    pub name: String,
    pub distance_m: f64,
}

/// Snapshot and cache status.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub generation: u64,

    /// RFC 3339 load time of the current snapshot
    pub loaded_at: String,

    pub counts: IndexCounts,

    /// Approximate number of cached plans
    pub cached_plans: u64,
}

// Conversion implementations

impl PlanRouteResponse {
    /// Create from a planner result.
    pub fn from_plan(plan: &PlanResult) -> Self {
        Self {
            earliest_arrival: plan.earliest_arrival.map(WeekMinute::minutes),
            path_objs: plan
                .itinerary
                .legs()
                .iter()
                .map(|leg| LegResult::from_leg(leg, plan.snapshot.index()))
                .collect(),
            source_stop: ResolvedStopResult::from_resolved(&plan.source),
            target_stop: ResolvedStopResult::from_resolved(&plan.target),
            rounds: plan.rounds,
        }
    }
}

impl ResolvedStopResult {
    pub fn from_resolved(resolved: &ResolvedStop) -> Self {
        Self {
            id: resolved.id.as_str().to_string(),
            distance_m: resolved.distance_m,
        }
    }
}

impl LegResult {
    /// Create from a domain leg, looking up its stops and route in `index`.
    pub fn from_leg(leg: &Leg, index: &TimetableIndex) -> Self {
        let arrival_label = leg.arrival().to_string();
        let stop = |id: &StopId| index.stop_idx(id).map(|idx| StopResult::from_stop(index.stop(idx)));

        match leg {
            Leg::Start(start) => LegResult::Start {
                stop_id: start.stop.as_str().to_string(),
                arrival_time: start.time.minutes(),
                arrival_label,
                stop: stop(&start.stop),
            },
            Leg::Transfer(walk) => LegResult::Transfer {
                from_stop_id: walk.from.as_str().to_string(),
                stop_id: walk.to.as_str().to_string(),
                transfer_time: walk.duration_mins,
                arrival_time: walk.arrival.minutes(),
                arrival_label,
                from_stop: stop(&walk.from),
                stop: stop(&walk.to),
            },
            Leg::Ride(ride) => LegResult::Trip {
                route_id: ride.route().as_str().to_string(),
                trip_id: ride.trip().as_str().to_string(),
                board_stop_id: ride.board_stop().as_str().to_string(),
                board_pos: ride.board_pos(),
                disembark_stop_id: ride.disembark_stop().as_str().to_string(),
                disembark_pos: ride.disembark_pos(),
                departure_time: ride.departure().minutes(),
                arrival_time: ride.arrival().minutes(),
                arrival_label,
                route: index
                    .route_idx(ride.route())
                    .map(|idx| RouteResult::from_route(index.route(idx))),
                board_stop: stop(ride.board_stop()),
                disembark_stop: stop(ride.disembark_stop()),
            },
        }
    }
}

impl StopResult {
    pub fn from_stop(stop: &Stop) -> Self {
        Self {
            id: stop.id.as_str().to_string(),
            name: stop.name.clone(),
            lat: stop.coordinate.lat(),
            lon: stop.coordinate.lon(),
        }
    }
}

impl RouteResult {
    pub fn from_route(route: &Route) -> Self {
        Self {
            id: route.id.as_str().to_string(),
            name: route.name.clone(),
            mode: route.mode,
        }
    }
}

impl StatusResponse {
    pub fn from_snapshot(snapshot: &Snapshot, cached_plans: u64) -> Self {
        Self {
            generation: snapshot.generation(),
            loaded_at: snapshot.loaded_at().to_rfc3339(),
            counts: snapshot.index().counts(),
            cached_plans,
        }
    }
}
