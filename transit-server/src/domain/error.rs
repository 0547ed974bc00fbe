//! Domain error types.
//!
//! These errors represent validation failures in the domain layer. They are
//! distinct from dataset loading and request errors.

use super::StopId;

/// Domain-level errors for validation and data consistency.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Invalid leg construction (e.g., disembark before board)
    #[error("invalid leg: {0}")]
    InvalidLeg(&'static str),

    /// Itinerary has no legs
    #[error("itinerary must have at least one leg")]
    EmptyItinerary,

    /// Itinerary does not begin with a start leg
    #[error("itinerary must begin with a start leg")]
    MissingStart,

    /// A start leg appears after the first position
    #[error("unexpected start leg at position {0}")]
    UnexpectedStart(usize),

    /// Consecutive legs don't connect
    #[error("leg {index} begins at {found} but the previous leg ended at {expected}")]
    Disconnected {
        index: usize,
        expected: StopId,
        found: StopId,
    },

    /// A leg arrives (or departs) before the previous leg's arrival
    #[error("leg {0} goes back in time")]
    TimeTravel(usize),
}
