//! Unit tests for the round-based search and itinerary reconstruction.

use super::*;
use crate::domain::{Itinerary, Leg, StopId, TripId, WeekMinute, weekday_of};
use crate::timetable::fixtures::DatasetBuilder;
use crate::timetable::{FootpathConfig, StopIdx, TimetableIndex};

fn index(builder: DatasetBuilder) -> TimetableIndex {
    TimetableIndex::build(builder.build(), &FootpathConfig::disabled()).unwrap()
}

fn stop(index: &TimetableIndex, id: &str) -> StopIdx {
    index.stop_idx(&StopId::new(id)).unwrap()
}

fn search(
    index: &TimetableIndex,
    from: &str,
    to: &str,
    start: i64,
    rounds: usize,
) -> SearchOutcome {
    let request = SearchRequest::new(
        stop(index, from),
        stop(index, to),
        WeekMinute::new(start),
        rounds,
    );
    RoundSearch::new(index).run(&request)
}

fn plan(index: &TimetableIndex, from: &str, to: &str, start: i64, rounds: usize) -> Itinerary {
    let outcome = search(index, from, to, start, rounds);
    reconstruct(index, &outcome).unwrap()
}

fn leg_kinds(itinerary: &Itinerary) -> Vec<&'static str> {
    itinerary
        .legs()
        .iter()
        .map(|leg| match leg {
            Leg::Start(_) => "start",
            Leg::Transfer(_) => "transfer",
            Leg::Ride(_) => "trip",
        })
        .collect()
}

/// Stops spaced a degree apart so nothing is walkable by accident.
fn spaced_stops(builder: DatasetBuilder, ids: &[&str]) -> DatasetBuilder {
    ids.iter()
        .enumerate()
        .fold(builder, |b, (i, id)| b.stop(id, i as f64, 0.0))
}

/// A -> B on R1, walk B -> C, C -> D on R2.
fn one_transfer_network() -> TimetableIndex {
    index(
        spaced_stops(DatasetBuilder::new(), &["A", "B", "C", "D"])
            .route("R1")
            .route("R2")
            .daily("ALL")
            .trip("T1", "R1", "ALL", &[("A", 480, 480), ("B", 495, 495)])
            .trip("T2", "R2", "ALL", &[("C", 500, 500), ("D", 520, 520)])
            .transfer("B", "C", 3),
    )
}

#[test]
fn source_equals_target() {
    let index = one_transfer_network();
    let outcome = search(&index, "A", "A", 470, 5);

    assert_eq!(outcome.earliest_arrival(), Some(WeekMinute::new(470)));
    assert_eq!(outcome.best_round(), Some(0));

    let itinerary = reconstruct(&index, &outcome).unwrap();
    assert_eq!(leg_kinds(&itinerary), vec!["start"]);
    assert_eq!(itinerary.arrival(), WeekMinute::new(470));
}

#[test]
fn direct_trip() {
    let index = one_transfer_network();
    let outcome = search(&index, "A", "B", 470, 1);

    assert_eq!(outcome.earliest_arrival(), Some(WeekMinute::new(495)));
    assert_eq!(outcome.best_round(), Some(1));

    let itinerary = reconstruct(&index, &outcome).unwrap();
    assert_eq!(leg_kinds(&itinerary), vec!["start", "trip"]);

    let ride = itinerary.legs()[1].as_ride().unwrap();
    assert_eq!(ride.trip().as_str(), "T1");
    assert_eq!(ride.route().as_str(), "R1");
    assert_eq!(ride.board_stop().as_str(), "A");
    assert_eq!(ride.board_pos(), 1);
    assert_eq!(ride.disembark_stop().as_str(), "B");
    assert_eq!(ride.disembark_pos(), 2);
    assert_eq!(ride.departure(), WeekMinute::new(480));
}

#[test]
fn no_service_in_day_window_is_unreachable() {
    // Weekday-only service, requested on Saturday after the last trip:
    // neither Saturday nor Sunday has a run
    let index = index(
        spaced_stops(DatasetBuilder::new(), &["A", "B"])
            .route("R")
            .calendar("WK", [true, true, true, true, true, false, false])
            .trip("T", "R", "WK", &[("A", 480, 480), ("B", 490, 490)]),
    );
    let saturday_noon = 5 * 1440 + 720;
    let outcome = search(&index, "A", "B", saturday_noon, 3);

    assert!(outcome.earliest_arrival().is_none());
    assert!(outcome.best_round().is_none());

    let itinerary = reconstruct(&index, &outcome).unwrap();
    assert_eq!(leg_kinds(&itinerary), vec!["start"]);
    assert_eq!(itinerary.origin().as_str(), "A");
}

#[test]
fn one_transfer_needs_two_rounds() {
    let index = one_transfer_network();

    let one = search(&index, "A", "D", 470, 1);
    assert!(one.earliest_arrival().is_none());

    let two = search(&index, "A", "D", 470, 2);
    assert_eq!(two.earliest_arrival(), Some(WeekMinute::new(520)));
    assert_eq!(two.best_round(), Some(2));

    let itinerary = reconstruct(&index, &two).unwrap();
    assert_eq!(
        leg_kinds(&itinerary),
        vec!["start", "trip", "transfer", "trip"]
    );

    let Leg::Transfer(walk) = &itinerary.legs()[2] else {
        panic!("expected transfer leg");
    };
    assert_eq!(walk.from.as_str(), "B");
    assert_eq!(walk.to.as_str(), "C");
    assert_eq!(walk.duration_mins, 3);
    assert_eq!(walk.arrival, WeekMinute::new(498));
}

#[test]
fn sunday_night_to_monday_morning() {
    let index = index(
        spaced_stops(DatasetBuilder::new(), &["X", "Y"])
            .route("NIGHT")
            .calendar("MON", [true, false, false, false, false, false, false])
            .trip("N1", "NIGHT", "MON", &[("X", 5, 5), ("Y", 20, 20)]),
    );
    // Sunday 23:50
    let outcome = search(&index, "X", "Y", 10070, 2);
    let itinerary = reconstruct(&index, &outcome).unwrap();

    let ride = itinerary.legs()[1].as_ride().unwrap();
    assert_eq!(ride.departure(), WeekMinute::new(10085));
    assert_eq!(ride.departure().to_string(), "Mon 00:05");
    assert!(ride.departure().minutes_since(WeekMinute::new(10070)) <= 15);
    assert_eq!(outcome.earliest_arrival(), Some(WeekMinute::new(10100)));
}

#[test]
fn previous_day_overnight_trip() {
    // Saturday-only trip running past midnight, caught on Sunday morning
    let index = index(
        spaced_stops(DatasetBuilder::new(), &["X", "Y"])
            .route("OWL")
            .calendar("SAT", [false, false, false, false, false, true, false])
            .trip("O1", "OWL", "SAT", &[("X", 1510, 1510), ("Y", 1530, 1530)]),
    );
    let sunday_0030 = 6 * 1440 + 30;
    let outcome = search(&index, "X", "Y", sunday_0030, 1);

    assert_eq!(
        outcome.earliest_arrival(),
        Some(WeekMinute::new(5 * 1440 + 1530))
    );
    assert_eq!(
        outcome.earliest_arrival().map(|t| t.to_string()),
        Some("Sun 01:30".to_string())
    );
}

#[test]
fn inactive_days_are_skipped() {
    let index = index(
        spaced_stops(DatasetBuilder::new(), &["A", "B"])
            .route("R")
            .calendar("WED", [false, false, true, false, false, false, false])
            .calendar("THU", [false, false, false, true, false, false, false])
            .trip("WED1", "R", "WED", &[("A", 600, 600), ("B", 610, 610)])
            .trip("THU1", "R", "THU", &[("A", 500, 500), ("B", 510, 510)]),
    );
    // Wednesday 07:00: the 08:20 Thursday trip does not run today
    let wednesday_0700 = 2 * 1440 + 420;
    let outcome = search(&index, "A", "B", wednesday_0700, 1);
    assert_eq!(
        outcome.earliest_arrival(),
        Some(WeekMinute::new(2 * 1440 + 610))
    );
}

#[test]
fn next_day_within_horizon() {
    let index = index(
        spaced_stops(DatasetBuilder::new(), &["A", "B"])
            .route("R")
            .daily("ALL")
            .trip("T", "R", "ALL", &[("A", 480, 480), ("B", 490, 490)]),
    );
    // Monday 09:00, so the next run is Tuesday 08:00
    let outcome = search(&index, "A", "B", 540, 1);
    assert_eq!(
        outcome.earliest_arrival(),
        Some(WeekMinute::new(1440 + 490))
    );

    let request = SearchRequest::new(stop(&index, "A"), stop(&index, "B"), WeekMinute::new(540), 1)
        .with_horizon(0);
    let outcome = RoundSearch::new(&index).run(&request);
    assert!(outcome.earliest_arrival().is_none());
}

#[test]
fn walk_from_origin_uses_no_boardings() {
    let index = index(spaced_stops(DatasetBuilder::new(), &["A", "B"]).transfer("A", "B", 7));
    let outcome = search(&index, "A", "B", 100, 3);

    assert_eq!(outcome.earliest_arrival(), Some(WeekMinute::new(107)));
    assert_eq!(outcome.best_round(), Some(0));

    let itinerary = reconstruct(&index, &outcome).unwrap();
    assert_eq!(leg_kinds(&itinerary), vec!["start", "transfer"]);
    assert_eq!(itinerary.boardings(), 0);
}

#[test]
fn walk_then_ride() {
    let index = index(
        spaced_stops(DatasetBuilder::new(), &["HOME", "A", "B"])
            .route("R")
            .daily("ALL")
            .trip("T", "R", "ALL", &[("A", 480, 480), ("B", 490, 490)])
            .transfer("HOME", "A", 5),
    );
    let itinerary = plan(&index, "HOME", "B", 470, 2);

    assert_eq!(leg_kinds(&itinerary), vec!["start", "transfer", "trip"]);
    assert_eq!(itinerary.arrival(), WeekMinute::new(490));
}

#[test]
fn walks_do_not_chain() {
    // A -> B and B -> C are both walkable, but two walks in a row are
    // never combined
    let index = index(
        spaced_stops(DatasetBuilder::new(), &["A", "B", "C"])
            .transfer("A", "B", 2)
            .transfer("B", "C", 2),
    );
    let outcome = search(&index, "A", "C", 0, 5);
    assert!(outcome.earliest_arrival().is_none());
}

#[test]
fn faster_trip_preferred_over_earlier_overtaken_trip() {
    let index = index(
        spaced_stops(DatasetBuilder::new(), &["X", "Y", "Z"])
            .route("R")
            .daily("ALL")
            .trip("SLOW", "R", "ALL", &[("X", 480, 480), ("Y", 500, 500), ("Z", 600, 600)])
            .trip("FAST", "R", "ALL", &[("X", 490, 490), ("Y", 505, 505), ("Z", 520, 520)]),
    );
    let outcome = search(&index, "X", "Z", 470, 1);
    assert_eq!(outcome.earliest_arrival(), Some(WeekMinute::new(520)));
}

#[test]
fn next_day_trip_overtaking_overnight_trip() {
    // Monday 23:00. SLOW's Monday run leaves X at Tue 01:00; FAST's
    // Tuesday run leaves ten minutes later and arrives first
    let index = index(
        spaced_stops(DatasetBuilder::new(), &["X", "Y"])
            .route("R")
            .calendar("MON", [true, false, false, false, false, false, false])
            .calendar("TUE", [false, true, false, false, false, false, false])
            .trip("SLOW", "R", "MON", &[("X", 1500, 1500), ("Y", 1600, 1600)])
            .trip("FAST", "R", "TUE", &[("X", 70, 70), ("Y", 80, 80)]),
    );
    let outcome = search(&index, "X", "Y", 1380, 1);
    assert_eq!(outcome.earliest_arrival(), Some(WeekMinute::new(1520)));

    let itinerary = reconstruct(&index, &outcome).unwrap();
    let ride = itinerary.legs()[1].as_ride().unwrap();
    assert_eq!(ride.trip().as_str(), "FAST");
    assert_eq!(ride.departure(), WeekMinute::new(1510));
}

#[test]
fn equal_departures_prefer_earlier_arrival_across_days() {
    // Both leave X at Tue 01:00; the Tuesday run of EARLY_ARR gets to Y
    // ten minutes sooner
    let index = index(
        spaced_stops(DatasetBuilder::new(), &["X", "Y"])
            .route("R")
            .calendar("MON", [true, false, false, false, false, false, false])
            .calendar("TUE", [false, true, false, false, false, false, false])
            .trip("LATE_ARR", "R", "MON", &[("X", 1500, 1500), ("Y", 1530, 1530)])
            .trip("EARLY_ARR", "R", "TUE", &[("X", 60, 60), ("Y", 80, 80)]),
    );
    let a = index.trip_idx(&TripId::new("LATE_ARR")).unwrap();
    let b = index.trip_idx(&TripId::new("EARLY_ARR")).unwrap();
    assert_eq!(index.trip(a).pattern, index.trip(b).pattern);

    let itinerary = plan(&index, "X", "Y", 1400, 1);
    assert_eq!(itinerary.arrival(), WeekMinute::new(1520));
    let ride = itinerary.legs()[1].as_ride().unwrap();
    assert_eq!(ride.trip().as_str(), "EARLY_ARR");
}

#[test]
fn walk_from_ride_slower_than_earlier_walk() {
    // A is reached sooner on foot, but only a ride arrival may start the
    // walk on to B
    let index = index(
        spaced_stops(DatasetBuilder::new(), &["S", "A", "B"])
            .route("R")
            .daily("ALL")
            .trip("T", "R", "ALL", &[("S", 100, 100), ("A", 110, 110)])
            .transfer("S", "A", 1)
            .transfer("A", "B", 2),
    );
    let outcome = search(&index, "S", "B", 90, 2);
    assert_eq!(outcome.labels.arrival(1, stop(&index, "A")), Some(WeekMinute::new(91)));
    assert_eq!(outcome.earliest_arrival(), Some(WeekMinute::new(112)));
    assert_eq!(outcome.best_round(), Some(1));

    let itinerary = reconstruct(&index, &outcome).unwrap();
    assert_eq!(leg_kinds(&itinerary), vec!["start", "trip", "transfer"]);
    assert_eq!(itinerary.arrival(), WeekMinute::new(112));
}

#[test]
fn switches_to_earlier_trip_at_later_stop() {
    // Reaching Y by walking catches T_EARLY there; boarding at X only
    // allows T_LATE
    let index = index(
        spaced_stops(DatasetBuilder::new(), &["X", "Y", "Z"])
            .route("R")
            .daily("ALL")
            .trip("T_EARLY", "R", "ALL", &[("X", 470, 470), ("Y", 480, 480), ("Z", 490, 490)])
            .trip("T_LATE", "R", "ALL", &[("X", 500, 500), ("Y", 510, 510), ("Z", 520, 520)])
            .transfer("X", "Y", 3),
    );
    let itinerary = plan(&index, "X", "Z", 475, 1);

    assert_eq!(leg_kinds(&itinerary), vec!["start", "transfer", "trip"]);
    let ride = itinerary.legs()[2].as_ride().unwrap();
    assert_eq!(ride.trip().as_str(), "T_EARLY");
    assert_eq!(itinerary.arrival(), WeekMinute::new(490));
}

#[test]
fn rounds_are_monotonic() {
    let index = one_transfer_network();
    let outcome = search(&index, "A", "D", 470, 4);

    for k in 1..outcome.labels.round_count() {
        for s in 0..index.stops().len() {
            let prev = outcome.labels.arrival(k - 1, StopIdx(s));
            let cur = outcome.labels.arrival(k, StopIdx(s));
            if let Some(prev) = prev {
                assert!(cur.is_some_and(|cur| cur <= prev), "round {k} stop {s}");
            }
        }
    }
}

#[test]
fn search_stops_when_nothing_is_marked() {
    let index = one_transfer_network();
    let outcome = search(&index, "A", "D", 470, 20);
    assert!(outcome.rounds_run() < 20);
    assert_eq!(outcome.arrival_in_round(20), Some(WeekMinute::new(520)));
    assert!(!outcome.timed_out);
}

#[test]
fn expired_deadline_reports_timeout() {
    let index = one_transfer_network();
    let request = SearchRequest::new(stop(&index, "A"), stop(&index, "D"), WeekMinute::new(470), 5)
        .with_deadline(std::time::Instant::now());
    let outcome = RoundSearch::new(&index).run(&request);
    assert!(outcome.timed_out);
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    const STOPS: usize = 6;

    /// A route: its stop sequence and trips as
    /// (first departure, hop times, dwell, service-day bits).
    #[derive(Debug, Clone)]
    struct RouteShape {
        stops: Vec<usize>,
        trips: Vec<(u32, Vec<u32>, u32, u8)>,
    }

    fn route_shape() -> impl Strategy<Value = RouteShape> {
        (
            proptest::sample::subsequence((0..STOPS).collect::<Vec<_>>(), 2..=4),
            any::<bool>(),
            proptest::collection::vec(
                (
                    0u32..1600,
                    proptest::collection::vec(1u32..40, 3),
                    0u32..3,
                    any::<u8>(),
                ),
                1..4,
            ),
        )
            .prop_map(|(mut stops, reverse, trips)| {
                if reverse {
                    stops.reverse();
                }
                RouteShape { stops, trips }
            })
    }

    prop_compose! {
        fn network()(
            routes in proptest::collection::vec(route_shape(), 1..5),
            transfers in proptest::collection::vec((0..STOPS, 0..STOPS, 0u32..20), 0..6),
        ) -> TimetableIndex {
            let names: Vec<String> = (0..STOPS).map(|i| format!("S{i}")).collect();
            let mut builder = DatasetBuilder::new();
            for (i, name) in names.iter().enumerate() {
                builder = builder.stop(name, i as f64, 0.0);
            }

            for (r, shape) in routes.iter().enumerate() {
                let route = format!("R{r}");
                builder = builder.route(&route);
                for (t, (first, hops, dwell, bits)) in shape.trips.iter().enumerate() {
                    let service = format!("C{r}_{t}");
                    let mut days = [false; 7];
                    for (d, day) in days.iter_mut().enumerate() {
                        *day = bits & (1 << d) != 0;
                    }
                    builder = builder.calendar(&service, days);

                    let mut clock = *first;
                    let mut calls = Vec::new();
                    for (i, s) in shape.stops.iter().enumerate() {
                        let last = i + 1 == shape.stops.len();
                        let departure = if last { clock } else { clock + dwell };
                        calls.push((names[*s].as_str(), clock, departure));
                        clock = departure + hops[i.min(hops.len() - 1)];
                    }
                    builder = builder.trip(&format!("T{r}_{t}"), &route, &service, &calls);
                }
            }

            let mut seen = std::collections::HashSet::new();
            for (a, b, mins) in transfers {
                if a != b && seen.insert((a, b)) {
                    builder = builder.transfer(&names[a], &names[b], mins);
                }
            }

            TimetableIndex::build(builder.build(), &FootpathConfig::disabled()).unwrap()
        }
    }

    fn query() -> impl Strategy<Value = (usize, usize, i64, usize)> {
        (0..STOPS, 0..STOPS, 0i64..10080, 1usize..5)
    }

    fn improve(slot: &mut Option<WeekMinute>, time: WeekMinute) {
        if slot.is_none_or(|current| time < current) {
            *slot = Some(time);
        }
    }

    fn walk(index: &TimetableIndex, from: &[Option<WeekMinute>], into: &mut [Option<WeekMinute>]) {
        for (s, base) in from.iter().enumerate() {
            let Some(base) = *base else { continue };
            for path in index.footpaths_from(StopIdx(s)) {
                improve(&mut into[path.to.0], base + path.minutes);
            }
        }
    }

    /// Best arrival at every stop for each round budget `0..=rounds`,
    /// found by trying every boardable trip instance in the day window.
    fn exhaustive(index: &TimetableIndex, q: (usize, usize, i64, usize)) -> Vec<Vec<Option<WeekMinute>>> {
        let (source, _, start, rounds) = q;
        let start = WeekMinute::new(start);
        let days = (start.day_index() - 1)..=(start.day_index() + 1);

        let mut instances = Vec::new();
        for trip in index.trips() {
            for day in days.clone() {
                if trip.days.runs_on(weekday_of(day)) {
                    let calls: Vec<_> = trip
                        .stop_times
                        .iter()
                        .map(|st| {
                            (
                                st.stop,
                                WeekMinute::on_day(day, st.arrival),
                                WeekMinute::on_day(day, st.departure),
                            )
                        })
                        .collect();
                    instances.push(calls);
                }
            }
        }

        let mut origin = vec![None; STOPS];
        origin[source] = Some(start);
        let mut first = origin.clone();
        walk(index, &origin, &mut first);
        let mut arrivals = vec![first];

        for _ in 0..rounds {
            let prev = arrivals[arrivals.len() - 1].clone();
            let mut rides = vec![None; STOPS];
            for calls in &instances {
                let mut aboard = false;
                for &(stop, arrival, departure) in calls {
                    if aboard {
                        improve(&mut rides[stop.0], arrival);
                    }
                    aboard |= prev[stop.0].is_some_and(|ready| ready <= departure);
                }
            }

            let mut next = prev;
            for (slot, ride) in next.iter_mut().zip(&rides) {
                if let Some(ride) = *ride {
                    improve(slot, ride);
                }
            }
            walk(index, &rides, &mut next);
            arrivals.push(next);
        }

        arrivals
    }

    fn run(index: &TimetableIndex, q: (usize, usize, i64, usize)) -> SearchOutcome {
        let (source, target, start, rounds) = q;
        let request = SearchRequest::new(StopIdx(source), StopIdx(target), WeekMinute::new(start), rounds);
        RoundSearch::new(index).run(&request)
    }

    proptest! {
        /// More rounds never make the answer worse
        #[test]
        fn round_budget_monotonic(index in network(), q in query()) {
            let fewer = run(&index, q).earliest_arrival();
            let more = run(&index, (q.0, q.1, q.2, q.3 + 1)).earliest_arrival();
            if let Some(fewer) = fewer {
                prop_assert!(more.is_some_and(|more| more <= fewer));
            }
        }

        /// Every stop's arrival never increases from one round to the next
        #[test]
        fn per_round_arrivals_monotonic(index in network(), q in query()) {
            let outcome = run(&index, q);
            for k in 1..outcome.labels.round_count() {
                for s in 0..STOPS {
                    if let Some(prev) = outcome.labels.arrival(k - 1, StopIdx(s)) {
                        let cur = outcome.labels.arrival(k, StopIdx(s));
                        prop_assert!(cur.is_some_and(|cur| cur <= prev));
                    }
                }
            }
        }

        /// Reconstructed itineraries are valid and end at the reported arrival
        #[test]
        fn itinerary_matches_arrival(index in network(), q in query()) {
            let outcome = run(&index, q);
            let itinerary = reconstruct(&index, &outcome).unwrap();

            match outcome.earliest_arrival() {
                Some(arrival) => {
                    prop_assert_eq!(itinerary.arrival(), arrival);
                    prop_assert_eq!(itinerary.destination(), &index.stop(StopIdx(q.1)).id);
                    prop_assert!(itinerary.boardings() <= q.3);
                }
                None => {
                    prop_assert_eq!(itinerary.legs().len(), 1);
                }
            }

            prop_assert_eq!(itinerary.origin(), &index.stop(StopIdx(q.0)).id);
            prop_assert_eq!(itinerary.start_time(), WeekMinute::new(q.2));
            for pair in itinerary.legs().windows(2) {
                prop_assert!(pair[0].arrival() <= pair[1].arrival());
            }
        }

        /// Every round agrees with trying all trip instances
        #[test]
        fn matches_exhaustive_search(index in network(), q in query()) {
            let outcome = run(&index, q);
            let expected = exhaustive(&index, q);
            let last = outcome.labels.round_count() - 1;

            for (k, arrivals) in expected.iter().enumerate() {
                prop_assert_eq!(outcome.arrival_in_round(k), arrivals[q.1], "round {}", k);
                for (s, arrival) in arrivals.iter().enumerate() {
                    prop_assert_eq!(
                        outcome.labels.arrival(k.min(last), StopIdx(s)),
                        *arrival,
                        "round {} stop {}",
                        k,
                        s
                    );
                }
            }
        }

        /// The same query gives the same answer
        #[test]
        fn search_is_idempotent(index in network(), q in query()) {
            let first = reconstruct(&index, &run(&index, q)).unwrap();
            let second = reconstruct(&index, &run(&index, q)).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
