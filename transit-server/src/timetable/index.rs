//! Immutable, indexed timetable.
//!
//! `TimetableIndex::build` validates a `Dataset` and turns it into dense
//! vectors addressed by small index types, plus the derived lookups the
//! search engine needs: routes and patterns touching a stop, trips of a
//! route in departure order, and outgoing footpaths.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use serde::Serialize;
use tracing::debug;

use crate::domain::{
    Coordinate, MINUTES_PER_DAY, RouteId, RouteMode, ServiceDays, ServiceId, StopId, TripId,
};

use super::dataset::{Dataset, StopTimeRecord};
use super::error::TimetableError;
use super::footpaths::{Footpath, FootpathConfig, Footpaths, generate_footpaths};
use super::spatial::StopTree;

/// Position of a stop in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StopIdx(pub usize);

/// Position of a route in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RouteIdx(pub usize);

/// Position of a trip in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TripIdx(pub usize);

/// Position of a route pattern in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PatternIdx(pub usize);

/// A stop.
#[derive(Debug, Clone)]
pub struct Stop {
    pub id: StopId,
    pub name: String,
    pub coordinate: Coordinate,
}

/// A route.
#[derive(Debug, Clone)]
pub struct Route {
    pub id: RouteId,
    pub name: String,
    pub mode: RouteMode,
}

/// A trip's visit to one stop, in minutes from the start of its service day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopTime {
    pub stop: StopIdx,
    pub sequence: u32,
    pub arrival: u32,
    pub departure: u32,
}

/// A trip with its validated stop times, ordered by sequence.
#[derive(Debug, Clone)]
pub struct Trip {
    pub id: TripId,
    pub route: RouteIdx,
    pub service_id: ServiceId,
    pub days: ServiceDays,
    pub stop_times: Vec<StopTime>,
    pub pattern: PatternIdx,
}

impl Trip {
    /// Departure offset from the first stop.
    pub fn first_departure(&self) -> u32 {
        // At least two stop times by construction
        self.stop_times[0].departure
    }
}

/// Trips of one route that visit exactly the same stop sequence.
///
/// Trips are ordered by first departure, then trip id.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    pub route: RouteIdx,
    pub stops: Vec<StopIdx>,
    pub trips: Vec<TripIdx>,
}

/// Entity counts, for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexCounts {
    pub stops: usize,
    pub routes: usize,
    pub trips: usize,
    pub patterns: usize,
    pub footpaths: usize,
}

/// The queryable timetable.
///
/// Never mutated after construction; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct TimetableIndex {
    stops: Vec<Stop>,
    stop_lookup: HashMap<StopId, StopIdx>,

    routes: Vec<Route>,
    route_lookup: HashMap<RouteId, RouteIdx>,

    trips: Vec<Trip>,
    trip_lookup: HashMap<TripId, TripIdx>,

    patterns: Vec<RoutePattern>,

    /// Routes serving each stop, ascending
    routes_by_stop: Vec<Vec<RouteIdx>>,

    /// (pattern, position) for every visit of a pattern to each stop
    patterns_by_stop: Vec<Vec<(PatternIdx, usize)>>,

    /// Trips of each route, by first departure then trip id
    trips_by_route: Vec<Vec<TripIdx>>,

    footpaths: Footpaths,

    tree: StopTree,
}

impl TimetableIndex {
    /// Validate a dataset and build the index.
    ///
    /// # Errors
    ///
    /// Fails on the first integrity violation: empty or duplicate
    /// identifiers, dangling references, invalid coordinates, self
    /// transfers, or inconsistent stop times.
    pub fn build(dataset: Dataset, footpath_config: &FootpathConfig) -> Result<Self, TimetableError> {
        let Dataset {
            stops: stop_records,
            routes: route_records,
            calendars,
            trips: trip_records,
            stop_times,
            transfers,
        } = dataset;

        // Stops
        let mut stops = Vec::with_capacity(stop_records.len());
        let mut stop_lookup = HashMap::with_capacity(stop_records.len());
        for record in stop_records {
            check_id("stop", record.id.as_str())?;
            let coordinate = Coordinate::new(record.lat, record.lon).map_err(|e| {
                TimetableError::InvalidCoordinate {
                    stop_id: record.id.to_string(),
                    reason: e.to_string(),
                }
            })?;
            insert_unique(&mut stop_lookup, "stop", record.id.clone(), StopIdx(stops.len()))?;
            stops.push(Stop {
                id: record.id,
                name: record.name,
                coordinate,
            });
        }

        // Routes
        let mut routes = Vec::with_capacity(route_records.len());
        let mut route_lookup = HashMap::with_capacity(route_records.len());
        for record in route_records {
            check_id("route", record.id.as_str())?;
            insert_unique(&mut route_lookup, "route", record.id.clone(), RouteIdx(routes.len()))?;
            routes.push(Route {
                id: record.id,
                name: record.name,
                mode: record.mode,
            });
        }

        // Calendars
        let mut services: HashMap<ServiceId, ServiceDays> = HashMap::with_capacity(calendars.len());
        for record in calendars {
            check_id("service", record.service_id.as_str())?;
            insert_unique(
                &mut services,
                "service",
                record.service_id,
                ServiceDays::from_flags(record.days),
            )?;
        }

        // Trips, without stop times yet
        let mut trip_lookup = HashMap::with_capacity(trip_records.len());
        let mut trip_heads = Vec::with_capacity(trip_records.len());
        for record in trip_records {
            check_id("trip", record.id.as_str())?;
            let route = *route_lookup
                .get(&record.route_id)
                .ok_or_else(|| TimetableError::UnknownRoute {
                    trip_id: record.id.to_string(),
                    route_id: record.route_id.to_string(),
                })?;
            let days = *services
                .get(&record.service_id)
                .ok_or_else(|| TimetableError::UnknownService {
                    trip_id: record.id.to_string(),
                    service_id: record.service_id.to_string(),
                })?;
            insert_unique(&mut trip_lookup, "trip", record.id.clone(), TripIdx(trip_heads.len()))?;
            trip_heads.push((record, route, days));
        }

        // Stop times, grouped per trip
        let mut grouped: Vec<Vec<StopTimeRecord>> = vec![Vec::new(); trip_heads.len()];
        for record in stop_times {
            let trip = trip_lookup
                .get(&record.trip_id)
                .ok_or_else(|| TimetableError::UnknownTrip {
                    trip_id: record.trip_id.to_string(),
                })?;
            grouped[trip.0].push(record);
        }

        let mut trips = Vec::with_capacity(trip_heads.len());
        for ((record, route, days), records) in trip_heads.into_iter().zip(grouped) {
            let stop_times = validate_stop_times(&record.id, records, &stop_lookup)?;
            trips.push(Trip {
                id: record.id,
                route,
                service_id: record.service_id,
                days,
                stop_times,
                pattern: PatternIdx(0), // assigned below
            });
        }

        let patterns = build_patterns(&mut trips);

        // Derived lookups
        let mut trips_by_route: Vec<Vec<TripIdx>> = vec![Vec::new(); routes.len()];
        for (i, trip) in trips.iter().enumerate() {
            trips_by_route[trip.route.0].push(TripIdx(i));
        }
        for route_trips in &mut trips_by_route {
            route_trips.sort_by(|a, b| {
                let (a, b) = (&trips[a.0], &trips[b.0]);
                (a.first_departure(), &a.id).cmp(&(b.first_departure(), &b.id))
            });
        }

        let mut routes_by_stop: Vec<Vec<RouteIdx>> = vec![Vec::new(); stops.len()];
        let mut patterns_by_stop: Vec<Vec<(PatternIdx, usize)>> = vec![Vec::new(); stops.len()];
        for (p, pattern) in patterns.iter().enumerate() {
            for (pos, stop) in pattern.stops.iter().enumerate() {
                patterns_by_stop[stop.0].push((PatternIdx(p), pos));
                routes_by_stop[stop.0].push(pattern.route);
            }
        }
        for stop_routes in &mut routes_by_stop {
            stop_routes.sort();
            stop_routes.dedup();
        }

        // Footpaths: explicit transfers first, then generated ones where
        // the dataset has nothing for the pair
        let tree = StopTree::build(&stops);
        let mut footpaths = Footpaths::new(stops.len());
        for record in transfers {
            let context = || format!("transfer {} -> {}", record.from_stop_id, record.to_stop_id);
            let from = lookup_stop(&stop_lookup, &record.from_stop_id, context)?;
            let to = lookup_stop(&stop_lookup, &record.to_stop_id, context)?;
            if from == to {
                return Err(TimetableError::TransferLoop {
                    stop_id: record.from_stop_id.to_string(),
                });
            }
            footpaths.add(from, to, record.minutes);
        }
        let explicit = footpaths.len();

        if footpath_config.generate {
            for (from, to, minutes) in generate_footpaths(&stops, &tree, footpath_config) {
                footpaths.add_if_absent(from, to, minutes);
            }
        }
        footpaths.sort();

        debug!(
            stops = stops.len(),
            routes = routes.len(),
            trips = trips.len(),
            patterns = patterns.len(),
            explicit_transfers = explicit,
            footpaths = footpaths.len(),
            "Built timetable index"
        );

        Ok(Self {
            stops,
            stop_lookup,
            routes,
            route_lookup,
            trips,
            trip_lookup,
            patterns,
            routes_by_stop,
            patterns_by_stop,
            trips_by_route,
            footpaths,
            tree,
        })
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn stop(&self, idx: StopIdx) -> &Stop {
        &self.stops[idx.0]
    }

    /// Look up a stop by identifier.
    pub fn stop_idx(&self, id: &StopId) -> Option<StopIdx> {
        self.stop_lookup.get(id).copied()
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn route(&self, idx: RouteIdx) -> &Route {
        &self.routes[idx.0]
    }

    /// Look up a route by identifier.
    pub fn route_idx(&self, id: &RouteId) -> Option<RouteIdx> {
        self.route_lookup.get(id).copied()
    }

    pub fn trips(&self) -> &[Trip] {
        &self.trips
    }

    pub fn trip(&self, idx: TripIdx) -> &Trip {
        &self.trips[idx.0]
    }

    /// Look up a trip by identifier.
    pub fn trip_idx(&self, id: &TripId) -> Option<TripIdx> {
        self.trip_lookup.get(id).copied()
    }

    /// Routes with at least one trip calling at `stop`.
    pub fn routes_at(&self, stop: StopIdx) -> &[RouteIdx] {
        &self.routes_by_stop[stop.0]
    }

    /// Trips of a route, ordered by first departure then trip id.
    pub fn trips_of(&self, route: RouteIdx) -> &[TripIdx] {
        &self.trips_by_route[route.0]
    }

    /// A trip's stop times in sequence order.
    pub fn stop_times(&self, trip: TripIdx) -> &[StopTime] {
        &self.trips[trip.0].stop_times
    }

    /// Outgoing footpaths from a stop, ordered by destination.
    pub fn footpaths_from(&self, stop: StopIdx) -> &[Footpath] {
        self.footpaths.from(stop)
    }

    pub fn patterns(&self) -> &[RoutePattern] {
        &self.patterns
    }

    pub fn pattern(&self, idx: PatternIdx) -> &RoutePattern {
        &self.patterns[idx.0]
    }

    /// Every (pattern, position) at which a pattern visits `stop`.
    pub fn patterns_at(&self, stop: StopIdx) -> &[(PatternIdx, usize)] {
        &self.patterns_by_stop[stop.0]
    }

    /// Stops within `radius_m` of a coordinate, with distances in metres.
    pub fn stops_within(&self, center: &Coordinate, radius_m: f64) -> Vec<(StopIdx, f64)> {
        self.tree.within(center, radius_m)
    }

    pub fn counts(&self) -> IndexCounts {
        IndexCounts {
            stops: self.stops.len(),
            routes: self.routes.len(),
            trips: self.trips.len(),
            patterns: self.patterns.len(),
            footpaths: self.footpaths.len(),
        }
    }
}

fn check_id(kind: &'static str, id: &str) -> Result<(), TimetableError> {
    if id.is_empty() {
        return Err(TimetableError::EmptyId { kind });
    }
    Ok(())
}

fn insert_unique<K, V>(
    map: &mut HashMap<K, V>,
    kind: &'static str,
    key: K,
    value: V,
) -> Result<(), TimetableError>
where
    K: std::hash::Hash + Eq + std::fmt::Display,
{
    match map.entry(key) {
        Entry::Occupied(entry) => Err(TimetableError::DuplicateId {
            kind,
            id: entry.key().to_string(),
        }),
        Entry::Vacant(entry) => {
            entry.insert(value);
            Ok(())
        }
    }
}

fn lookup_stop(
    lookup: &HashMap<StopId, StopIdx>,
    id: &StopId,
    context: impl FnOnce() -> String,
) -> Result<StopIdx, TimetableError> {
    lookup
        .get(id)
        .copied()
        .ok_or_else(|| TimetableError::UnknownStop {
            context: context(),
            stop_id: id.to_string(),
        })
}

/// Sort a trip's stop times and check their consistency.
fn validate_stop_times(
    trip_id: &TripId,
    mut records: Vec<StopTimeRecord>,
    stop_lookup: &HashMap<StopId, StopIdx>,
) -> Result<Vec<StopTime>, TimetableError> {
    let invalid = |reason: String| TimetableError::InvalidStopTimes {
        trip_id: trip_id.to_string(),
        reason,
    };

    if records.len() < 2 {
        return Err(invalid(format!(
            "needs at least two stop times, found {}",
            records.len()
        )));
    }

    records.sort_by_key(|r| r.sequence);

    let mut stop_times: Vec<StopTime> = Vec::with_capacity(records.len());
    for record in records {
        let stop = lookup_stop(stop_lookup, &record.stop_id, || format!("trip {trip_id}"))?;

        if record.departure < record.arrival {
            return Err(invalid(format!(
                "departure before arrival at sequence {}",
                record.sequence
            )));
        }
        if let Some(prev) = stop_times.last() {
            if prev.sequence == record.sequence {
                return Err(invalid(format!(
                    "duplicate sequence position {}",
                    record.sequence
                )));
            }
            if record.arrival < prev.departure {
                return Err(invalid(format!(
                    "arrival at sequence {} precedes the previous departure",
                    record.sequence
                )));
            }
        }

        stop_times.push(StopTime {
            stop,
            sequence: record.sequence,
            arrival: record.arrival,
            departure: record.departure,
        });
    }

    Ok(stop_times)
}

/// Group trips into patterns by (route, stop sequence) and record each
/// trip's pattern.
///
/// Trips that overtake each other somewhere along the sequence go into
/// separate patterns, so within a pattern the earliest departure from any
/// position is also the earliest arrival downstream.
fn build_patterns(trips: &mut [Trip]) -> Vec<RoutePattern> {
    let mut patterns: Vec<RoutePattern> = Vec::new();
    let mut by_key: HashMap<(RouteIdx, Vec<StopIdx>), Vec<PatternIdx>> = HashMap::new();

    for i in 0..trips.len() {
        let route = trips[i].route;
        let stops: Vec<StopIdx> = trips[i].stop_times.iter().map(|st| st.stop).collect();
        let candidates = by_key.entry((route, stops.clone())).or_default();

        let existing = candidates.iter().copied().find(|p| {
            patterns[p.0]
                .trips
                .iter()
                .all(|other| !overtakes_on_any_day(&trips[i], &trips[other.0]))
        });
        let idx = match existing {
            Some(idx) => idx,
            None => {
                patterns.push(RoutePattern {
                    route,
                    stops,
                    trips: Vec::new(),
                });
                let idx = PatternIdx(patterns.len() - 1);
                candidates.push(idx);
                idx
            }
        };

        trips[i].pattern = idx;
        patterns[idx.0].trips.push(TripIdx(i));
    }

    for pattern in &mut patterns {
        pattern
            .trips
            .sort_by(|a, b| compare_in_pattern(&trips[a.0], &trips[b.0]));
    }

    patterns
}

/// Whether an instance of `a` passes an instance of `b`, with the two
/// running on the same or on different service days.
///
/// Only day offsets where the two trips' time spans overlap can overtake.
fn overtakes_on_any_day(a: &Trip, b: &Trip) -> bool {
    let (Some((a_first, a_last)), Some((b_first, b_last))) = (time_span(a), time_span(b)) else {
        return false;
    };
    let first_day = (b_first - a_last).div_euclid(MINUTES_PER_DAY);
    let last_day = (b_last - a_first).div_euclid(MINUTES_PER_DAY) + 1;
    (first_day..=last_day).any(|day| overtakes(a, b, day * MINUTES_PER_DAY))
}

fn time_span(trip: &Trip) -> Option<(i64, i64)> {
    let first = trip.stop_times.first()?.arrival;
    let last = trip.stop_times.last()?.departure;
    Some((i64::from(first), i64::from(last)))
}

/// Whether two trips over the same stops pass each other, with `a`'s
/// times moved by `shift` minutes.
fn overtakes(a: &Trip, b: &Trip, shift: i64) -> bool {
    let (mut earlier, mut later) = (false, false);
    for (x, y) in a.stop_times.iter().zip(&b.stop_times) {
        for (s, t) in [(x.arrival, y.arrival), (x.departure, y.departure)] {
            let (s, t) = (i64::from(s) + shift, i64::from(t));
            earlier |= s < t;
            later |= s > t;
        }
    }
    earlier && later
}

/// First departure, then the remaining times, then trip id.
fn compare_in_pattern(a: &Trip, b: &Trip) -> Ordering {
    let times = |t: &Trip| {
        t.stop_times
            .iter()
            .map(|st| (st.arrival, st.departure))
            .collect::<Vec<_>>()
    };
    a.first_departure()
        .cmp(&b.first_departure())
        .then_with(|| times(a).cmp(&times(b)))
        .then_with(|| a.id.cmp(&b.id))
}
