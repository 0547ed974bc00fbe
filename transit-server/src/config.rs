//! Server configuration from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::planner::PlannerConfig;
use crate::timetable::{FootpathConfig, TimetableSource};

/// Error from reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {var}={value:?}: {reason}")]
pub struct ConfigError {
    var: &'static str,
    value: String,
    reason: &'static str,
}

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,

    /// Dataset dump to load and refresh from.
    pub dataset_path: PathBuf,

    /// How often to reload the dataset; `None` disables refresh.
    pub refresh_interval: Option<Duration>,

    pub planner: PlannerConfig,
    pub footpaths: FootpathConfig,
    pub cache: CacheConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            dataset_path: PathBuf::from("data/timetable.json"),
            refresh_interval: Some(Duration::from_secs(60 * 60)),
            planner: PlannerConfig::default(),
            footpaths: FootpathConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Read configuration from `TRANSIT_*` environment variables, falling
    /// back to defaults for unset ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(addr) = parsed::<SocketAddr>(&lookup, "TRANSIT_BIND_ADDR", "expected host:port")? {
            config.bind_addr = addr;
        }

        if let Some(path) = lookup("TRANSIT_DATASET") {
            if path.is_empty() {
                return Err(ConfigError {
                    var: "TRANSIT_DATASET",
                    value: path,
                    reason: "must not be empty",
                });
            }
            config.dataset_path = PathBuf::from(path);
        }

        if let Some(secs) = parsed::<u64>(&lookup, "TRANSIT_REFRESH_SECS", "expected seconds")? {
            config.refresh_interval = (secs > 0).then(|| Duration::from_secs(secs));
        }

        if let Some(limit) = parsed::<usize>(&lookup, "TRANSIT_MAX_ROUNDS", "expected an integer")? {
            if limit == 0 {
                return Err(ConfigError {
                    var: "TRANSIT_MAX_ROUNDS",
                    value: limit.to_string(),
                    reason: "must be at least 1",
                });
            }
            config.planner.max_rounds_limit = limit;
            config.planner.default_rounds = config.planner.default_rounds.min(limit);
        }

        if let Some(ms) = parsed::<u64>(&lookup, "TRANSIT_SEARCH_TIMEOUT_MS", "expected milliseconds")? {
            config.planner.search_timeout_ms = ms;
        }

        if let Some(m) = distance(&lookup, "TRANSIT_MAX_SNAP_M")? {
            config.planner.max_snap_m = m;
        }

        if let Some(m) = distance(&lookup, "TRANSIT_FOOTPATH_MAX_M")? {
            config.footpaths.generate = m > 0.0;
            config.footpaths.max_walk_m = m;
        }

        Ok(config)
    }

    /// Where the timetable is loaded from.
    pub fn timetable_source(&self) -> TimetableSource {
        TimetableSource::new(&self.dataset_path, self.footpaths.clone())
    }
}

fn parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    reason: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) => match value.trim().parse() {
            Ok(v) => Ok(Some(v)),
            Err(_) => Err(ConfigError { var, value, reason }),
        },
    }
}

fn distance(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<f64>, ConfigError> {
    let Some(m) = parsed::<f64>(lookup, var, "expected metres")? else {
        return Ok(None);
    };
    if !m.is_finite() || m < 0.0 {
        return Err(ConfigError {
            var,
            value: m.to_string(),
            reason: "must be a non-negative number of metres",
        });
    }
    Ok(Some(m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = from(&[]).unwrap();
        assert_eq!(config.bind_addr, SocketAddr::from(([127, 0, 0, 1], 3000)));
        assert_eq!(config.dataset_path, PathBuf::from("data/timetable.json"));
        assert_eq!(config.refresh_interval, Some(Duration::from_secs(3600)));
        assert_eq!(config.planner.max_rounds_limit, 20);
        assert!(config.footpaths.generate);
    }

    #[test]
    fn reads_all_variables() {
        let config = from(&[
            ("TRANSIT_BIND_ADDR", "0.0.0.0:8080"),
            ("TRANSIT_DATASET", "/srv/feed.json"),
            ("TRANSIT_REFRESH_SECS", "600"),
            ("TRANSIT_MAX_ROUNDS", "3"),
            ("TRANSIT_SEARCH_TIMEOUT_MS", "750"),
            ("TRANSIT_MAX_SNAP_M", "400"),
            ("TRANSIT_FOOTPATH_MAX_M", "250.5"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.dataset_path, PathBuf::from("/srv/feed.json"));
        assert_eq!(config.refresh_interval, Some(Duration::from_secs(600)));
        assert_eq!(config.planner.max_rounds_limit, 3);
        assert_eq!(config.planner.default_rounds, 3);
        assert_eq!(config.planner.search_timeout_ms, 750);
        assert_eq!(config.planner.max_snap_m, 400.0);
        assert_eq!(config.footpaths.max_walk_m, 250.5);
        assert!(config.footpaths.generate);

        let source = config.timetable_source();
        assert_eq!(source.path, PathBuf::from("/srv/feed.json"));
    }

    #[test]
    fn zero_disables_refresh_and_footpaths() {
        let config = from(&[("TRANSIT_REFRESH_SECS", "0"), ("TRANSIT_FOOTPATH_MAX_M", "0")]).unwrap();
        assert_eq!(config.refresh_interval, None);
        assert!(!config.footpaths.generate);
    }

    #[test]
    fn rejects_invalid_values() {
        let err = from(&[("TRANSIT_MAX_ROUNDS", "many")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid TRANSIT_MAX_ROUNDS=\"many\": expected an integer"
        );

        assert!(from(&[("TRANSIT_MAX_ROUNDS", "0")]).is_err());
        assert!(from(&[("TRANSIT_BIND_ADDR", "localhost")]).is_err());
        assert!(from(&[("TRANSIT_MAX_SNAP_M", "-5")]).is_err());
        assert!(from(&[("TRANSIT_FOOTPATH_MAX_M", "NaN")]).is_err());
        assert!(from(&[("TRANSIT_DATASET", "")]).is_err());
    }
}
