//! Itinerary legs.
//!
//! A `Leg` is one step of a reconstructed itinerary: the initial placement
//! at the origin stop, a walking transfer, or a ride on one trip.

use super::{DomainError, RouteId, StopId, TripId, WeekMinute};

/// Initial placement of the rider at the origin stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartLeg {
    pub stop: StopId,
    pub time: WeekMinute,
}

/// A walk between two stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferLeg {
    pub from: StopId,
    pub to: StopId,
    /// Walking duration in minutes
    pub duration_mins: u32,
    pub arrival: WeekMinute,
}

/// A ride on a single trip from a boarding stop to a disembark stop.
///
/// # Invariants
///
/// - Disembark position is strictly after the boarding position
/// - Arrival is not before departure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RideLeg {
    route: RouteId,
    trip: TripId,
    board_stop: StopId,
    board_pos: u32,
    disembark_stop: StopId,
    disembark_pos: u32,
    departure: WeekMinute,
    arrival: WeekMinute,
}

impl RideLeg {
    /// Create a ride leg.
    ///
    /// Positions are the trip's stop-time sequence positions.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the disembark position does not follow the boarding
    /// position, or if the arrival is before the departure.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        route: RouteId,
        trip: TripId,
        board_stop: StopId,
        board_pos: u32,
        disembark_stop: StopId,
        disembark_pos: u32,
        departure: WeekMinute,
        arrival: WeekMinute,
    ) -> Result<Self, DomainError> {
        if disembark_pos <= board_pos {
            return Err(DomainError::InvalidLeg(
                "disembark position must be after boarding position",
            ));
        }
        if arrival < departure {
            return Err(DomainError::InvalidLeg("arrival must not precede departure"));
        }
        Ok(Self {
            route,
            trip,
            board_stop,
            board_pos,
            disembark_stop,
            disembark_pos,
            departure,
            arrival,
        })
    }

    pub fn route(&self) -> &RouteId {
        &self.route
    }

    pub fn trip(&self) -> &TripId {
        &self.trip
    }

    pub fn board_stop(&self) -> &StopId {
        &self.board_stop
    }

    pub fn board_pos(&self) -> u32 {
        self.board_pos
    }

    pub fn disembark_stop(&self) -> &StopId {
        &self.disembark_stop
    }

    pub fn disembark_pos(&self) -> u32 {
        self.disembark_pos
    }

    /// Departure time from the boarding stop.
    pub fn departure(&self) -> WeekMinute {
        self.departure
    }

    /// Arrival time at the disembark stop.
    pub fn arrival(&self) -> WeekMinute {
        self.arrival
    }
}

/// One step of an itinerary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Leg {
    Start(StartLeg),
    Transfer(TransferLeg),
    Ride(RideLeg),
}

impl Leg {
    /// Stop where this leg begins.
    pub fn origin(&self) -> &StopId {
        match self {
            Leg::Start(start) => &start.stop,
            Leg::Transfer(walk) => &walk.from,
            Leg::Ride(ride) => ride.board_stop(),
        }
    }

    /// Stop where this leg ends.
    pub fn destination(&self) -> &StopId {
        match self {
            Leg::Start(start) => &start.stop,
            Leg::Transfer(walk) => &walk.to,
            Leg::Ride(ride) => ride.disembark_stop(),
        }
    }

    /// Time the rider is at this leg's destination.
    pub fn arrival(&self) -> WeekMinute {
        match self {
            Leg::Start(start) => start.time,
            Leg::Transfer(walk) => walk.arrival,
            Leg::Ride(ride) => ride.arrival(),
        }
    }

    pub fn is_ride(&self) -> bool {
        matches!(self, Leg::Ride(_))
    }

    pub fn as_ride(&self) -> Option<&RideLeg> {
        match self {
            Leg::Ride(ride) => Some(ride),
            _ => None,
        }
    }
}
