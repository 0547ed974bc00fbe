//! Planning service.
//!
//! Validates a plan request, resolves its endpoints against the current
//! snapshot, runs the search on the blocking pool under a wall-clock budget,
//! and rebuilds the itinerary. Every failure is classified here.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::Weekday;
use tracing::{debug, info, warn};

use crate::cache::{CachedPlan, PlanCache, PlanKey};
use crate::domain::{Itinerary, MINUTES_PER_WEEK, WeekMinute, parse_day};
use crate::locator::{Endpoint, LocateError, ResolvedStop, StopLocator};
use crate::timetable::{Snapshot, TimetableError, TimetableHandle, TimetableIndex, TimetableSource};

use super::config::PlannerConfig;
use super::reconstruct::reconstruct;
use super::search::{RoundSearch, SearchRequest};

/// When the rider sets off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Departure {
    /// Day of week (Monday = 0) and a 24-hour "HH:MM" time
    DayTime { day: i64, time: String },
    /// Minutes since Monday 00:00
    WeekMinutes(i64),
}

impl Departure {
    /// Collapse to a week-minute.
    pub fn resolve(&self) -> Result<WeekMinute, PlanError> {
        match self {
            Departure::DayTime { day, time } => {
                let weekday: Weekday = parse_day(*day).map_err(invalid)?;
                WeekMinute::from_day_and_time(weekday, time).map_err(invalid)
            }
            Departure::WeekMinutes(mins) => {
                if !(0..MINUTES_PER_WEEK).contains(mins) {
                    return Err(PlanError::InvalidRequest(format!(
                        "departure_mins must be within 0..{MINUTES_PER_WEEK}"
                    )));
                }
                Ok(WeekMinute::new(*mins))
            }
        }
    }
}

/// A validated-on-use plan request.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub source: Endpoint,
    pub target: Endpoint,
    pub departure: Departure,
    /// Round budget; the configured default when absent.
    pub max_rounds: Option<i64>,
}

/// Which end of the request failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointRole {
    Source,
    Target,
}

impl fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointRole::Source => f.write_str("source"),
            EndpointRole::Target => f.write_str("target"),
        }
    }
}

/// Error from planning.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlanError {
    /// The request is malformed or out of range
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// An endpoint did not resolve to a stop
    #[error("{role} not found: {source}")]
    NotFound {
        role: EndpointRole,
        #[source]
        source: LocateError,
    },

    /// The search ran out of wall-clock budget
    #[error("search timed out")]
    Timeout,

    /// Anything else; a bug or a failed background task
    #[error("internal error: {0}")]
    Internal(String),
}

fn invalid(err: impl fmt::Display) -> PlanError {
    PlanError::InvalidRequest(err.to_string())
}

/// Result of planning.
#[derive(Debug, Clone)]
pub struct PlanResult {
    /// `None` when the target cannot be reached within the round budget.
    pub earliest_arrival: Option<WeekMinute>,

    /// Legs to the target, or just the start leg when unreachable.
    pub itinerary: Arc<Itinerary>,

    pub source: ResolvedStop,
    pub target: ResolvedStop,

    /// Boardings used by the best itinerary, or rounds searched when
    /// unreachable.
    pub rounds: usize,

    /// Snapshot the plan was computed against.
    pub generation: u64,

    /// Same snapshot, for resolving the ids in the itinerary.
    pub snapshot: Arc<Snapshot>,
}

/// Plans itineraries against the current timetable.
#[derive(Clone)]
pub struct PlanningService {
    timetable: TimetableHandle,
    config: Arc<PlannerConfig>,
    cache: Arc<PlanCache>,
}

impl PlanningService {
    pub fn new(timetable: TimetableHandle, config: PlannerConfig, cache: PlanCache) -> Self {
        Self {
            timetable,
            config: Arc::new(config),
            cache: Arc::new(cache),
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn cache(&self) -> &PlanCache {
        &self.cache
    }

    /// The snapshot new requests will be planned against.
    pub async fn snapshot(&self) -> Arc<Snapshot> {
        self.timetable.current().await
    }

    /// Reload the timetable and drop every cached plan.
    ///
    /// On failure the current snapshot and the cache are left untouched.
    pub async fn reload(&self, source: &TimetableSource) -> Result<u64, TimetableError> {
        let generation = self.timetable.reload_from(source).await?;
        let dropped = self.cache.entry_count();
        self.cache.invalidate_all();
        info!(generation, dropped, "Invalidated plan cache after reload");
        Ok(generation)
    }

    /// Check the departure and round budget.
    pub fn validate(&self, request: &PlanRequest) -> Result<(WeekMinute, usize), PlanError> {
        let start = request.departure.resolve()?;

        let rounds = match request.max_rounds {
            None => self.config.default_rounds,
            Some(r) if r >= 1 && r <= self.config.max_rounds_limit as i64 => r as usize,
            Some(r) => {
                return Err(PlanError::InvalidRequest(format!(
                    "max_rounds must be within 1..={}, got {r}",
                    self.config.max_rounds_limit
                )));
            }
        };

        Ok((start, rounds))
    }

    /// Plan an itinerary.
    pub async fn plan(&self, request: PlanRequest) -> Result<PlanResult, PlanError> {
        let (start, rounds) = self.validate(&request)?;
        let snapshot = self.timetable.current().await;
        let generation = snapshot.generation();

        let locator = StopLocator::new(snapshot.index(), self.config.max_snap_m);
        let source = locator
            .resolve(&request.source)
            .map_err(|source| PlanError::NotFound {
                role: EndpointRole::Source,
                source,
            })?;
        let target = locator
            .resolve(&request.target)
            .map_err(|source| PlanError::NotFound {
                role: EndpointRole::Target,
                source,
            })?;

        let key: PlanKey = (generation, source.stop, target.stop, start, rounds);
        let plan = match self.cache.get(&key).await {
            Some(hit) => {
                debug!(source = %source.id, target = %target.id, start = %start, "Plan cache hit");
                hit
            }
            None => {
                let searched = Arc::clone(&snapshot);
                let search = SearchRequest::new(source.stop, target.stop, start, rounds)
                    .with_horizon(self.config.horizon_days)
                    .with_deadline(Instant::now() + self.config.search_timeout());

                let plan = tokio::task::spawn_blocking(move || {
                    run_search(searched.index(), &search)
                })
                .await
                .map_err(|e| PlanError::Internal(format!("search task failed: {e}")))??;

                self.cache.insert(key, plan.clone()).await;
                plan
            }
        };

        debug!(
            source = %source.id,
            target = %target.id,
            start = %start,
            arrival = ?plan.earliest_arrival.map(|t| t.to_string()),
            rounds = plan.rounds,
            "Planned itinerary"
        );

        Ok(PlanResult {
            earliest_arrival: plan.earliest_arrival,
            itinerary: plan.itinerary,
            source,
            target,
            rounds: plan.rounds,
            generation,
            snapshot,
        })
    }
}

/// Run the engine and rebuild the itinerary. Blocking.
fn run_search(index: &TimetableIndex, request: &SearchRequest) -> Result<CachedPlan, PlanError> {
    let started = Instant::now();
    let outcome = RoundSearch::new(index).run(request);

    if outcome.timed_out {
        warn!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            rounds = outcome.rounds_run(),
            "Search timed out"
        );
        return Err(PlanError::Timeout);
    }

    let itinerary = reconstruct(index, &outcome).map_err(|e| {
        warn!(error = %e, "Failed to reconstruct itinerary");
        PlanError::Internal(e.to_string())
    })?;

    Ok(CachedPlan {
        earliest_arrival: outcome.earliest_arrival(),
        itinerary: Arc::new(itinerary),
        rounds: outcome.best_round().unwrap_or_else(|| outcome.rounds_run()),
    })
}
