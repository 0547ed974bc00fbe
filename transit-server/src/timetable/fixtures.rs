//! Test helpers for building small datasets.

use crate::domain::{RouteId, RouteMode, ServiceId, StopId, TripId};

use super::dataset::{
    CalendarRecord, Dataset, RouteRecord, StopRecord, StopTimeRecord, TransferRecord, TripRecord,
};

/// Fluent builder for a `Dataset`.
///
/// Stop times get sequence positions 1, 2, 3, ... in the order given.
#[derive(Debug, Default, Clone)]
pub struct DatasetBuilder {
    dataset: Dataset,
}

impl DatasetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(mut self, id: &str, lat: f64, lon: f64) -> Self {
        self.dataset.stops.push(StopRecord {
            id: StopId::new(id),
            name: id.to_string(),
            lat,
            lon,
        });
        self
    }

    /// A bus route named after its id.
    pub fn route(mut self, id: &str) -> Self {
        self.dataset.routes.push(RouteRecord {
            id: RouteId::new(id),
            name: id.to_string(),
            mode: RouteMode::Bus,
        });
        self
    }

    /// A service calendar, Monday first.
    pub fn calendar(mut self, service_id: &str, days: [bool; 7]) -> Self {
        self.dataset.calendars.push(CalendarRecord {
            service_id: ServiceId::new(service_id),
            days,
        });
        self
    }

    /// A service that runs every day.
    pub fn daily(self, service_id: &str) -> Self {
        self.calendar(service_id, [true; 7])
    }

    /// A trip calling at `(stop, arrival, departure)` in order.
    pub fn trip(mut self, id: &str, route: &str, service: &str, calls: &[(&str, u32, u32)]) -> Self {
        self.dataset.trips.push(TripRecord {
            id: TripId::new(id),
            route_id: RouteId::new(route),
            service_id: ServiceId::new(service),
        });
        for (i, (stop, arrival, departure)) in calls.iter().enumerate() {
            self.dataset.stop_times.push(StopTimeRecord {
                trip_id: TripId::new(id),
                stop_id: StopId::new(*stop),
                sequence: i as u32 + 1,
                arrival: *arrival,
                departure: *departure,
            });
        }
        self
    }

    pub fn transfer(mut self, from: &str, to: &str, minutes: u32) -> Self {
        self.dataset.transfers.push(TransferRecord {
            from_stop_id: StopId::new(from),
            to_stop_id: StopId::new(to),
            minutes,
        });
        self
    }

    pub fn build(self) -> Dataset {
        self.dataset
    }
}
