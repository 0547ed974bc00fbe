//! Round-based earliest-arrival search.
//!
//! Round `k` holds the best arrival at every stop using at most `k` vehicle
//! boardings. Each round scans the route patterns touching stops improved in
//! the previous round, then relaxes footpaths from stops whose best ride
//! arrival improved.
//!
//! Trip instances are concrete (trip, service day) pairs. A trip with offset
//! `o` running on day `d` reaches its stops at `d * 1440 + o` week-minutes,
//! so overnight and end-of-week services need no wraparound arithmetic.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{debug, trace};

use crate::domain::{MINUTES_PER_DAY, WeekMinute, weekday_of};
use crate::timetable::{PatternIdx, RoutePattern, StopIdx, TimetableIndex, TripIdx};

use super::labels::{RideLabel, RoundLabels, WalkLabel};

/// Request for one search.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub source: StopIdx,
    pub target: StopIdx,
    pub start: WeekMinute,

    /// Maximum number of boardings (at least 1).
    pub max_rounds: usize,

    /// Days after the start day whose trip instances are considered.
    pub horizon_days: u32,

    /// Give up once this instant has passed.
    pub deadline: Option<Instant>,
}

impl SearchRequest {
    /// Create a new search request with a one-day horizon and no deadline.
    pub fn new(source: StopIdx, target: StopIdx, start: WeekMinute, max_rounds: usize) -> Self {
        Self {
            source,
            target,
            start,
            max_rounds,
            horizon_days: 1,
            deadline: None,
        }
    }

    pub fn with_horizon(mut self, horizon_days: u32) -> Self {
        self.horizon_days = horizon_days;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Everything a search found.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub source: StopIdx,
    pub target: StopIdx,
    pub start: WeekMinute,
    pub labels: RoundLabels,

    /// The deadline passed before the search finished.
    pub timed_out: bool,
}

impl SearchOutcome {
    /// Earliest arrival at the target across all rounds.
    pub fn earliest_arrival(&self) -> Option<WeekMinute> {
        // Later rounds are never worse
        self.labels
            .arrival(self.labels.round_count() - 1, self.target)
    }

    /// Smallest round achieving the earliest arrival.
    pub fn best_round(&self) -> Option<usize> {
        let best = self.earliest_arrival()?;
        (0..self.labels.round_count()).find(|&k| self.labels.arrival(k, self.target) == Some(best))
    }

    /// Rounds performed after round 0.
    pub fn rounds_run(&self) -> usize {
        self.labels.round_count() - 1
    }

    /// Best arrival at the target using at most `round` boardings.
    ///
    /// Rounds beyond the last one performed repeat the last one.
    pub fn arrival_in_round(&self, round: usize) -> Option<WeekMinute> {
        let last = self.labels.round_count() - 1;
        self.labels.arrival(round.min(last), self.target)
    }
}

/// A trip instance the scan is currently riding.
#[derive(Debug, Clone, Copy)]
struct Boarding {
    trip: TripIdx,
    day: i64,
    board_stop: StopIdx,
    board_pos: usize,
}

/// Round-based search over one timetable snapshot.
pub struct RoundSearch<'a> {
    index: &'a TimetableIndex,
}

impl<'a> RoundSearch<'a> {
    pub fn new(index: &'a TimetableIndex) -> Self {
        Self { index }
    }

    /// Run a search. Never fails; check `timed_out` on the outcome.
    pub fn run(&self, request: &SearchRequest) -> SearchOutcome {
        let mut labels = RoundLabels::new(self.index.stops().len());
        labels.set_origin(request.source, request.start);

        let days = DayWindow::around(request.start, request.horizon_days);

        // Round 0: walking from the origin before any boarding
        let mut marked = vec![request.source];
        for path in self.index.footpaths_from(request.source) {
            let label = WalkLabel {
                from: request.source,
                minutes: path.minutes,
                arrival: request.start + path.minutes,
            };
            if labels.improve_by_walk(0, path.to, label) {
                marked.push(path.to);
            }
        }

        let mut timed_out = false;
        for _ in 0..request.max_rounds {
            if marked.is_empty() {
                break;
            }
            if past(request.deadline) {
                timed_out = true;
                break;
            }

            let round = labels.push_round();
            let Some(mut scanned) = self.scan_routes(&mut labels, round, &marked, &days, request) else {
                timed_out = true;
                break;
            };
            scanned.rides.sort();
            scanned.rides.dedup();
            let walk_improved = self.relax_footpaths(&mut labels, round, &scanned.rides);

            marked = scanned.arrivals;
            marked.extend(walk_improved);
            marked.sort();
            marked.dedup();

            debug!(
                round,
                marked = marked.len(),
                target = ?labels.arrival(round, request.target),
                "Search round complete"
            );
        }

        SearchOutcome {
            source: request.source,
            target: request.target,
            start: request.start,
            labels,
            timed_out,
        }
    }

    /// Scan every pattern touching a marked stop, from the earliest marked
    /// position. Returns `None` on timeout.
    fn scan_routes(
        &self,
        labels: &mut RoundLabels,
        round: usize,
        marked: &[StopIdx],
        days: &DayWindow,
        request: &SearchRequest,
    ) -> Option<Improved> {
        let mut queue: BTreeMap<PatternIdx, usize> = BTreeMap::new();
        for stop in marked {
            for &(pattern, pos) in self.index.patterns_at(*stop) {
                queue
                    .entry(pattern)
                    .and_modify(|earliest| *earliest = (*earliest).min(pos))
                    .or_insert(pos);
            }
        }

        let mut improved = Improved::default();
        for (pattern_idx, first_pos) in queue {
            if past(request.deadline) {
                return None;
            }
            let pattern = self.index.pattern(pattern_idx);
            self.scan_pattern(labels, round, pattern, first_pos, days, &mut improved);
        }

        Some(improved)
    }

    fn scan_pattern(
        &self,
        labels: &mut RoundLabels,
        round: usize,
        pattern: &RoutePattern,
        first_pos: usize,
        days: &DayWindow,
        improved: &mut Improved,
    ) {
        let mut current: Option<Boarding> = None;

        for (pos, &stop) in pattern.stops.iter().enumerate().skip(first_pos) {
            // Ride the current trip to this stop
            if let Some(boarding) = current {
                let times = self.index.stop_times(boarding.trip);
                let label = RideLabel {
                    trip: boarding.trip,
                    day: boarding.day,
                    board_stop: boarding.board_stop,
                    board_pos: boarding.board_pos,
                    disembark_pos: pos,
                    departure: WeekMinute::on_day(
                        boarding.day,
                        times[boarding.board_pos].departure,
                    ),
                    arrival: WeekMinute::on_day(boarding.day, times[pos].arrival),
                };
                let update = labels.improve_by_ride(round, stop, label);
                if update.ride {
                    improved.rides.push(stop);
                }
                if update.arrival {
                    trace!(stop = stop.0, arrival = %label.arrival, "Improved by ride");
                    improved.arrivals.push(stop);
                }
            }

            // Catch an earlier trip instance here if the previous round
            // reached this stop in time
            let Some(ready) = labels.arrival(round - 1, stop) else {
                continue;
            };
            let current_departure = current.map(|b| {
                WeekMinute::on_day(b.day, self.index.stop_times(b.trip)[pos].departure)
            });
            if current_departure.is_some_and(|dep| dep < ready) {
                continue;
            }
            let Some((trip, day)) = self.earliest_instance(pattern, pos, ready, days) else {
                continue;
            };
            let switch = current.is_none_or(|b| {
                self.compare_from(pos, (trip, day), (b.trip, b.day)) == Ordering::Less
            });
            if switch {
                current = Some(Boarding {
                    trip,
                    day,
                    board_stop: stop,
                    board_pos: pos,
                });
            }
        }
    }

    /// Earliest (trip, day) instance of a pattern departing position `pos`
    /// no earlier than `ready`.
    ///
    /// Among equal departures the instance arriving earlier downstream wins,
    /// then the earlier day, then the trip listed first.
    fn earliest_instance(
        &self,
        pattern: &RoutePattern,
        pos: usize,
        ready: WeekMinute,
        days: &DayWindow,
    ) -> Option<(TripIdx, i64)> {
        let mut best: Option<(TripIdx, i64)> = None;

        for day in days.iter() {
            let weekday = weekday_of(day);
            let ready_offset = ready.minutes() - day * MINUTES_PER_DAY;

            // Trips in a pattern never overtake, so departures at `pos`
            // are sorted
            let first = pattern.trips.partition_point(|&t| {
                i64::from(self.index.stop_times(t)[pos].departure) < ready_offset
            });
            let Some(&trip) = pattern.trips[first..]
                .iter()
                .find(|&&t| self.index.trip(t).days.runs_on(weekday))
            else {
                continue;
            };

            if best.is_none_or(|b| self.compare_from(pos, (trip, day), b) == Ordering::Less) {
                best = Some((trip, day));
            }
        }

        best
    }

    /// Order two instances of one pattern by their times from `pos` on,
    /// departure at `pos` first.
    fn compare_from(&self, pos: usize, a: (TripIdx, i64), b: (TripIdx, i64)) -> Ordering {
        let times = |(trip, day): (TripIdx, i64)| {
            self.index.stop_times(trip)[pos..].iter().map(move |st| {
                (
                    WeekMinute::on_day(day, st.departure),
                    WeekMinute::on_day(day, st.arrival),
                )
            })
        };
        times(a).cmp(times(b))
    }

    /// Relax footpaths from stops whose best ride arrival improved in this
    /// round.
    ///
    /// Walks start from the ride arrival, never from another walk.
    fn relax_footpaths(
        &self,
        labels: &mut RoundLabels,
        round: usize,
        ride_improved: &[StopIdx],
    ) -> Vec<StopIdx> {
        let mut improved = Vec::new();

        for &from in ride_improved {
            let Some(base) = labels.ride(round, from).map(|r| r.arrival) else {
                continue;
            };
            for path in self.index.footpaths_from(from) {
                let label = WalkLabel {
                    from,
                    minutes: path.minutes,
                    arrival: base + path.minutes,
                };
                if labels.improve_by_walk(round, path.to, label) {
                    improved.push(path.to);
                }
            }
        }

        improved
    }
}

/// Stops a round of pattern scans improved.
#[derive(Debug, Default)]
struct Improved {
    /// Best ride arrival improved
    rides: Vec<StopIdx>,
    /// Best overall arrival improved
    arrivals: Vec<StopIdx>,
}

/// Service days whose trip instances a search considers.
#[derive(Debug, Clone, Copy)]
struct DayWindow {
    first: i64,
    last: i64,
}

impl DayWindow {
    /// The day before the start (for overnight trips) through
    /// `horizon_days` after it.
    fn around(start: WeekMinute, horizon_days: u32) -> Self {
        let start_day = start.day_index();
        Self {
            first: start_day - 1,
            last: start_day + i64::from(horizon_days),
        }
    }

    fn iter(&self) -> impl Iterator<Item = i64> {
        self.first..=self.last
    }
}

fn past(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}
