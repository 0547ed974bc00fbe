//! Per-round search labels.
//!
//! Each round keeps its own arrival array and two label tables: one for
//! arrivals by riding a trip, one for arrivals by walking. Walks are only
//! relaxed from ride arrivals, so following labels backwards can never
//! loop between two walks.
//!
//! Best ride arrivals are tracked apart from best overall arrivals: a ride
//! that loses to an earlier walk at its stop can still start a walk that
//! wins somewhere else.

use crate::domain::WeekMinute;
use crate::timetable::{StopIdx, TripIdx};

/// Arrival at a stop by riding one trip instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RideLabel {
    pub trip: TripIdx,
    /// Service day the trip instance runs on, relative to the week start
    pub day: i64,
    pub board_stop: StopIdx,
    /// Index into the trip's stop times
    pub board_pos: usize,
    /// Index into the trip's stop times
    pub disembark_pos: usize,
    pub departure: WeekMinute,
    pub arrival: WeekMinute,
}

/// Arrival at a stop by walking from another stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkLabel {
    pub from: StopIdx,
    pub minutes: u32,
    pub arrival: WeekMinute,
}

/// What recording a ride arrival changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RideUpdate {
    /// Best arrival by riding improved; walks from the stop may now improve
    pub ride: bool,
    /// Best arrival by any means improved
    pub arrival: bool,
}

/// Best arrivals and back-pointers for every round of one search.
#[derive(Debug, Clone)]
pub struct RoundLabels {
    arrivals: Vec<Vec<Option<WeekMinute>>>,
    ride_arrivals: Vec<Vec<Option<WeekMinute>>>,
    rides: Vec<Vec<Option<RideLabel>>>,
    walks: Vec<Vec<Option<WalkLabel>>>,
}

impl RoundLabels {
    /// Round 0 with every stop unreached.
    pub fn new(stop_count: usize) -> Self {
        Self {
            arrivals: vec![vec![None; stop_count]],
            ride_arrivals: vec![vec![None; stop_count]],
            rides: vec![vec![None; stop_count]],
            walks: vec![vec![None; stop_count]],
        }
    }

    /// Start a new round, seeded with the previous round's arrivals and
    /// ride arrivals.
    ///
    /// Returns the new round number.
    pub fn push_round(&mut self) -> usize {
        let stop_count = self.arrivals[0].len();
        let seeded = self.arrivals[self.arrivals.len() - 1].clone();
        self.arrivals.push(seeded);
        let rides_seeded = self.ride_arrivals[self.ride_arrivals.len() - 1].clone();
        self.ride_arrivals.push(rides_seeded);
        self.rides.push(vec![None; stop_count]);
        self.walks.push(vec![None; stop_count]);
        self.arrivals.len() - 1
    }

    /// Number of rounds recorded, including round 0.
    pub fn round_count(&self) -> usize {
        self.arrivals.len()
    }

    /// Best arrival at `stop` using at most `round` boardings.
    pub fn arrival(&self, round: usize, stop: StopIdx) -> Option<WeekMinute> {
        self.arrivals.get(round)?.get(stop.0).copied().flatten()
    }

    /// Best arrival at `stop` ending with a ride, using at most `round`
    /// boardings.
    pub fn ride_arrival(&self, round: usize, stop: StopIdx) -> Option<WeekMinute> {
        self.ride_arrivals.get(round)?.get(stop.0).copied().flatten()
    }

    pub fn ride(&self, round: usize, stop: StopIdx) -> Option<&RideLabel> {
        self.rides.get(round)?.get(stop.0)?.as_ref()
    }

    pub fn walk(&self, round: usize, stop: StopIdx) -> Option<&WalkLabel> {
        self.walks.get(round)?.get(stop.0)?.as_ref()
    }

    /// Whether `time` strictly beats the current arrival at `stop`.
    pub fn improves(&self, round: usize, stop: StopIdx, time: WeekMinute) -> bool {
        self.arrival(round, stop).is_none_or(|current| time < current)
    }

    /// Set an arrival with no label (the search origin).
    pub fn set_origin(&mut self, stop: StopIdx, time: WeekMinute) {
        self.arrivals[0][stop.0] = Some(time);
    }

    /// Record a ride arrival if it strictly beats the best ride arrival at
    /// `stop`, and take it as the stop's arrival if it beats that too.
    pub fn improve_by_ride(&mut self, round: usize, stop: StopIdx, label: RideLabel) -> RideUpdate {
        let beats_rides = self
            .ride_arrival(round, stop)
            .is_none_or(|best| label.arrival < best);
        if !beats_rides {
            return RideUpdate::default();
        }
        self.ride_arrivals[round][stop.0] = Some(label.arrival);
        self.rides[round][stop.0] = Some(label);

        let arrival = self.improves(round, stop, label.arrival);
        if arrival {
            self.arrivals[round][stop.0] = Some(label.arrival);
        }
        RideUpdate { ride: true, arrival }
    }

    /// Record a walk arrival if it is a strict improvement.
    pub fn improve_by_walk(&mut self, round: usize, stop: StopIdx, label: WalkLabel) -> bool {
        if !self.improves(round, stop, label.arrival) {
            return false;
        }
        self.arrivals[round][stop.0] = Some(label.arrival);
        self.walks[round][stop.0] = Some(label);
        true
    }
}
