//! Walking connections between stops.
//!
//! Footpaths come from two places: explicit transfers in the dataset, and
//! (optionally) connections generated between stops that are close enough
//! to walk. An explicit transfer always wins over a generated one.

use super::index::{Stop, StopIdx};
use super::spatial::StopTree;

/// Configuration for generated footpaths.
#[derive(Debug, Clone)]
pub struct FootpathConfig {
    /// Whether to generate footpaths from stop coordinates at all.
    pub generate: bool,

    /// Maximum straight-line walking distance (metres).
    pub max_walk_m: f64,

    /// Walking speed (metres per minute).
    pub walk_speed_m_per_min: f64,

    /// Lower bound on any generated walk (minutes).
    pub min_transfer_mins: u32,
}

impl FootpathConfig {
    /// Create a new configuration with the given parameters.
    pub fn new(
        generate: bool,
        max_walk_m: f64,
        walk_speed_m_per_min: f64,
        min_transfer_mins: u32,
    ) -> Self {
        Self {
            generate,
            max_walk_m,
            walk_speed_m_per_min,
            min_transfer_mins,
        }
    }

    /// A configuration that only uses the dataset's explicit transfers.
    pub fn disabled() -> Self {
        Self {
            generate: false,
            ..Self::default()
        }
    }

    /// Walking time for a distance, rounded up to whole minutes.
    pub fn walk_minutes(&self, distance_m: f64) -> u32 {
        let mins = (distance_m / self.walk_speed_m_per_min).ceil() as u32;
        mins.max(self.min_transfer_mins)
    }
}

impl Default for FootpathConfig {
    fn default() -> Self {
        Self {
            generate: true,
            max_walk_m: 1000.0,
            walk_speed_m_per_min: 5000.0 / 60.0, // 5 km/h
            min_transfer_mins: 1,
        }
    }
}

/// A directed walk to a neighbouring stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footpath {
    pub to: StopIdx,
    pub minutes: u32,
}

/// Outgoing footpaths for every stop.
///
/// Connections are directed: a walk from A to B says nothing about B to A.
/// At most one footpath exists per ordered pair.
#[derive(Debug, Clone, Default)]
pub struct Footpaths {
    outgoing: Vec<Vec<Footpath>>,
}

impl Footpaths {
    /// Create an empty collection for `stop_count` stops.
    pub fn new(stop_count: usize) -> Self {
        Self {
            outgoing: vec![Vec::new(); stop_count],
        }
    }

    /// Add a footpath, keeping the shorter duration if one already exists.
    pub fn add(&mut self, from: StopIdx, to: StopIdx, minutes: u32) {
        let paths = &mut self.outgoing[from.0];
        match paths.iter_mut().find(|p| p.to == to) {
            Some(existing) => existing.minutes = existing.minutes.min(minutes),
            None => paths.push(Footpath { to, minutes }),
        }
    }

    /// Add a footpath only if the pair has none yet.
    ///
    /// Returns whether it was added.
    pub fn add_if_absent(&mut self, from: StopIdx, to: StopIdx, minutes: u32) -> bool {
        let paths = &mut self.outgoing[from.0];
        if paths.iter().any(|p| p.to == to) {
            return false;
        }
        paths.push(Footpath { to, minutes });
        true
    }

    /// Walking time between two stops, if connected.
    pub fn get(&self, from: StopIdx, to: StopIdx) -> Option<u32> {
        self.outgoing
            .get(from.0)?
            .iter()
            .find(|p| p.to == to)
            .map(|p| p.minutes)
    }

    /// All footpaths leaving a stop, ordered by destination.
    pub fn from(&self, stop: StopIdx) -> &[Footpath] {
        self.outgoing.get(stop.0).map_or(&[], Vec::as_slice)
    }

    /// Sort each stop's footpaths by destination.
    pub fn sort(&mut self) {
        for paths in &mut self.outgoing {
            paths.sort_by_key(|p| p.to);
        }
    }

    /// Total number of directed footpaths.
    pub fn len(&self) -> usize {
        self.outgoing.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.outgoing.iter().all(Vec::is_empty)
    }
}

/// Generate walking connections between every pair of distinct stops that
/// lie within `config.max_walk_m` of each other.
///
/// Both directions are returned. The result is ordered by (from, to).
pub fn generate_footpaths(
    stops: &[Stop],
    tree: &StopTree,
    config: &FootpathConfig,
) -> Vec<(StopIdx, StopIdx, u32)> {
    let mut generated = Vec::new();

    for (i, stop) in stops.iter().enumerate() {
        let from = StopIdx(i);
        let mut nearby = tree.within(&stop.coordinate, config.max_walk_m);
        nearby.sort_by_key(|(idx, _)| *idx);

        generated.extend(
            nearby
                .into_iter()
                .filter(|(to, _)| *to != from)
                .map(|(to, dist)| (from, to, config.walk_minutes(dist))),
        );
    }

    generated
}
