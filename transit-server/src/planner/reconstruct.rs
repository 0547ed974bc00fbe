//! Itinerary reconstruction from search labels.

use crate::domain::{DomainError, Itinerary, Leg, RideLeg, StartLeg, TransferLeg, WeekMinute};
use crate::timetable::{StopIdx, TimetableIndex};

use super::labels::{RideLabel, WalkLabel};
use super::search::SearchOutcome;

/// Error from following labels back to the origin.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReconstructError {
    /// A stop's arrival has no label explaining it
    #[error("no label explains the arrival at stop {stop} in round {round}")]
    BrokenChain { stop: String, round: usize },

    /// The chain visits more legs than the rounds allow
    #[error("label chain did not reach the origin after {0} steps")]
    TooLong(usize),

    /// The reconstructed legs do not form a valid itinerary
    #[error(transparent)]
    Invalid(#[from] DomainError),
}

enum Step<'a> {
    Walk(&'a WalkLabel),
    Ride(&'a RideLabel),
}

/// Build the itinerary to the target from a finished search.
///
/// An unreachable target yields an itinerary holding only the start leg.
pub fn reconstruct(
    index: &TimetableIndex,
    outcome: &SearchOutcome,
) -> Result<Itinerary, ReconstructError> {
    let origin = index.stop(outcome.source).id.clone();

    let Some(mut round) = outcome.best_round() else {
        return Ok(Itinerary::start_only(origin, outcome.start));
    };

    let labels = &outcome.labels;
    let mut stop = outcome.target;
    let mut want_ride = false;
    let mut reversed: Vec<Leg> = Vec::new();

    // At most one ride and one walk per round
    let max_steps = 2 * labels.round_count() + 1;

    loop {
        if stop == outcome.source && !want_ride {
            break;
        }
        if reversed.len() > max_steps {
            return Err(ReconstructError::TooLong(reversed.len()));
        }

        let step = if want_ride {
            labels.ride(round, stop).map(Step::Ride)
        } else {
            find_label(outcome, round, stop).map(|(r, step)| {
                round = r;
                step
            })
        };

        match step {
            Some(Step::Walk(walk)) => {
                reversed.push(Leg::Transfer(TransferLeg {
                    from: index.stop(walk.from).id.clone(),
                    to: index.stop(stop).id.clone(),
                    duration_mins: walk.minutes,
                    arrival: walk.arrival,
                }));
                stop = walk.from;
                // Walks in later rounds always leave a ride arrival
                want_ride = round > 0;
            }
            Some(Step::Ride(ride)) => {
                reversed.push(Leg::Ride(ride_leg(index, ride, stop)?));
                stop = ride.board_stop;
                want_ride = false;
                round = round.checked_sub(1).ok_or_else(|| broken(index, stop, 0))?;
            }
            None => return Err(broken(index, stop, round)),
        }
    }

    let mut legs = vec![Leg::Start(StartLeg {
        stop: origin,
        time: outcome.start,
    })];
    legs.extend(reversed.into_iter().rev());

    Ok(Itinerary::new(legs)?)
}

/// The label that set `stop`'s arrival in `round`, searching down to the
/// round where that arrival was first reached.
fn find_label<'a>(
    outcome: &'a SearchOutcome,
    round: usize,
    stop: StopIdx,
) -> Option<(usize, Step<'a>)> {
    let labels = &outcome.labels;
    let wanted: WeekMinute = labels.arrival(round, stop)?;

    for r in (0..=round).rev() {
        if let Some(walk) = labels.walk(r, stop).filter(|w| w.arrival == wanted) {
            return Some((r, Step::Walk(walk)));
        }
        if let Some(ride) = labels.ride(r, stop).filter(|l| l.arrival == wanted) {
            return Some((r, Step::Ride(ride)));
        }
    }

    None
}

fn ride_leg(
    index: &TimetableIndex,
    label: &RideLabel,
    disembark: StopIdx,
) -> Result<RideLeg, DomainError> {
    let trip = index.trip(label.trip);
    let route = index.route(trip.route);
    let times = &trip.stop_times;

    RideLeg::new(
        route.id.clone(),
        trip.id.clone(),
        index.stop(label.board_stop).id.clone(),
        times[label.board_pos].sequence,
        index.stop(disembark).id.clone(),
        times[label.disembark_pos].sequence,
        label.departure,
        label.arrival,
    )
}

fn broken(index: &TimetableIndex, stop: StopIdx, round: usize) -> ReconstructError {
    ReconstructError::BrokenChain {
        stop: index.stop(stop).id.to_string(),
        round,
    }
}
