//! Itinerary type.
//!
//! An `Itinerary` is the ordered sequence of legs from the origin stop to
//! the destination stop.

use super::{DomainError, Leg, StartLeg, StopId, WeekMinute};

/// A complete itinerary.
///
/// # Invariants
///
/// - The first leg is the only `Start` leg
/// - Consecutive legs connect (destination of one = origin of next)
/// - Arrival times never decrease along the sequence
/// - A ride never departs before the rider reaches its boarding stop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Itinerary {
    legs: Vec<Leg>,
}

impl Itinerary {
    /// Construct an itinerary from legs, validating the invariants.
    ///
    /// # Examples
    ///
    /// ```
    /// use transit_server::domain::{Itinerary, Leg, StartLeg, TransferLeg, StopId, WeekMinute};
    ///
    /// let legs = vec![
    ///     Leg::Start(StartLeg { stop: StopId::new("A"), time: WeekMinute::new(480) }),
    ///     Leg::Transfer(TransferLeg {
    ///         from: StopId::new("A"),
    ///         to: StopId::new("B"),
    ///         duration_mins: 5,
    ///         arrival: WeekMinute::new(485),
    ///     }),
    /// ];
    /// let itinerary = Itinerary::new(legs).unwrap();
    /// assert_eq!(itinerary.arrival(), WeekMinute::new(485));
    /// assert_eq!(itinerary.boardings(), 0);
    /// ```
    pub fn new(legs: Vec<Leg>) -> Result<Self, DomainError> {
        let first = legs.first().ok_or(DomainError::EmptyItinerary)?;
        if !matches!(first, Leg::Start(_)) {
            return Err(DomainError::MissingStart);
        }

        for (i, pair) in legs.windows(2).enumerate() {
            let (prev, next) = (&pair[0], &pair[1]);
            let index = i + 1;

            if matches!(next, Leg::Start(_)) {
                return Err(DomainError::UnexpectedStart(index));
            }
            if prev.destination() != next.origin() {
                return Err(DomainError::Disconnected {
                    index,
                    expected: prev.destination().clone(),
                    found: next.origin().clone(),
                });
            }
            if next.arrival() < prev.arrival() {
                return Err(DomainError::TimeTravel(index));
            }
            if let Leg::Ride(ride) = next {
                if ride.departure() < prev.arrival() {
                    return Err(DomainError::TimeTravel(index));
                }
            }
        }

        Ok(Self { legs })
    }

    /// An itinerary that never leaves the origin.
    pub fn start_only(stop: StopId, time: WeekMinute) -> Self {
        Self {
            legs: vec![Leg::Start(StartLeg { stop, time })],
        }
    }

    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    /// Origin stop.
    pub fn origin(&self) -> &StopId {
        self.legs[0].origin()
    }

    /// Stop reached by the last leg.
    pub fn destination(&self) -> &StopId {
        self.last_leg().destination()
    }

    /// Start time at the origin.
    pub fn start_time(&self) -> WeekMinute {
        self.legs[0].arrival()
    }

    /// Arrival time at the destination.
    pub fn arrival(&self) -> WeekMinute {
        self.last_leg().arrival()
    }

    /// Number of vehicle boardings.
    pub fn boardings(&self) -> usize {
        self.legs.iter().filter(|leg| leg.is_ride()).count()
    }

    /// Total travel time in minutes, including waiting.
    pub fn duration_mins(&self) -> i64 {
        self.arrival().minutes_since(self.start_time())
    }

    fn last_leg(&self) -> &Leg {
        // Non-empty by construction
        &self.legs[self.legs.len() - 1]
    }
}
