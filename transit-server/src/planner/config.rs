//! Planner configuration.

use std::time::Duration;

/// Configuration parameters for itinerary planning.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Round budget used when a request does not name one.
    pub default_rounds: usize,

    /// Largest round budget a request may ask for.
    pub max_rounds_limit: usize,

    /// Wall-clock budget for one search (milliseconds).
    pub search_timeout_ms: u64,

    /// Days after the start day whose trips are considered.
    /// The day before the start day is always included for overnight trips.
    pub horizon_days: u32,

    /// Maximum distance from a coordinate endpoint to its stop (metres).
    pub max_snap_m: f64,
}

impl PlannerConfig {
    /// Create a new configuration with the given parameters.
    pub fn new(
        default_rounds: usize,
        max_rounds_limit: usize,
        search_timeout_ms: u64,
        horizon_days: u32,
        max_snap_m: f64,
    ) -> Self {
        Self {
            default_rounds,
            max_rounds_limit,
            search_timeout_ms,
            horizon_days,
            max_snap_m,
        }
    }

    /// Returns the search timeout as a Duration.
    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            default_rounds: 5,
            max_rounds_limit: 20,
            search_timeout_ms: 2000,
            horizon_days: 1,
            max_snap_m: 1000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = PlannerConfig::default();

        assert_eq!(config.default_rounds, 5);
        assert_eq!(config.max_rounds_limit, 20);
        assert_eq!(config.search_timeout_ms, 2000);
        assert_eq!(config.horizon_days, 1);
        assert_eq!(config.max_snap_m, 1000.0);
    }

    #[test]
    fn duration_methods() {
        let config = PlannerConfig::default();
        assert_eq!(config.search_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn custom_config() {
        let config = PlannerConfig::new(3, 8, 500, 2, 250.0);

        assert_eq!(config.default_rounds, 3);
        assert_eq!(config.max_rounds_limit, 8);
        assert_eq!(config.search_timeout(), Duration::from_millis(500));
        assert_eq!(config.horizon_days, 2);
        assert_eq!(config.max_snap_m, 250.0);
    }
}
