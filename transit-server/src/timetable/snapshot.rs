//! Published timetable snapshots.
//!
//! The current `TimetableIndex` lives behind a handle that swaps one `Arc`
//! on refresh. Readers clone the `Arc` and keep using their snapshot for the
//! whole request, even if a refresh lands meanwhile.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::info;

use super::dataset::Dataset;
use super::error::TimetableError;
use super::footpaths::FootpathConfig;
use super::index::TimetableIndex;

/// One immutable version of the timetable.
#[derive(Debug)]
pub struct Snapshot {
    generation: u64,
    loaded_at: DateTime<Utc>,
    index: TimetableIndex,
}

impl Snapshot {
    /// Monotonically increasing version number, starting at 1.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn index(&self) -> &TimetableIndex {
        &self.index
    }
}

/// Where a snapshot is loaded from.
#[derive(Debug, Clone)]
pub struct TimetableSource {
    pub path: PathBuf,
    pub footpaths: FootpathConfig,
}

impl TimetableSource {
    pub fn new(path: impl Into<PathBuf>, footpaths: FootpathConfig) -> Self {
        Self {
            path: path.into(),
            footpaths,
        }
    }

    /// Read and index the dataset. Blocking.
    pub fn load(&self) -> Result<TimetableIndex, TimetableError> {
        let dataset = Dataset::from_path(&self.path)?;
        TimetableIndex::build(dataset, &self.footpaths)
    }
}

/// Thread-safe handle to the current snapshot.
#[derive(Clone)]
pub struct TimetableHandle {
    inner: Arc<RwLock<Arc<Snapshot>>>,
}

impl TimetableHandle {
    /// Publish an already-built index as generation 1.
    pub fn new(index: TimetableIndex) -> Self {
        let snapshot = Snapshot {
            generation: 1,
            loaded_at: Utc::now(),
            index,
        };
        Self {
            inner: Arc::new(RwLock::new(Arc::new(snapshot))),
        }
    }

    /// Load the initial snapshot from a source.
    ///
    /// Fails if the dataset cannot be read or does not validate.
    pub async fn load(source: &TimetableSource) -> Result<Self, TimetableError> {
        let index = load_off_thread(source.clone()).await?;
        info!(path = %source.path.display(), counts = ?index.counts(), "Loaded timetable");
        Ok(Self::new(index))
    }

    /// The current snapshot.
    pub async fn current(&self) -> Arc<Snapshot> {
        let guard = self.inner.read().await;
        Arc::clone(&guard)
    }

    /// Publish a new index, returning its generation.
    pub async fn replace(&self, index: TimetableIndex) -> u64 {
        let mut guard = self.inner.write().await;
        let generation = guard.generation + 1;
        *guard = Arc::new(Snapshot {
            generation,
            loaded_at: Utc::now(),
            index,
        });
        generation
    }

    /// Rebuild from a source and publish the result.
    ///
    /// The load runs on the blocking pool. On failure the current snapshot
    /// stays in place and the error is returned.
    pub async fn reload_from(&self, source: &TimetableSource) -> Result<u64, TimetableError> {
        let index = load_off_thread(source.clone()).await?;
        let counts = index.counts();
        let generation = self.replace(index).await;
        info!(generation, ?counts, "Published timetable snapshot");
        Ok(generation)
    }
}

async fn load_off_thread(source: TimetableSource) -> Result<TimetableIndex, TimetableError> {
    tokio::task::spawn_blocking(move || source.load())
        .await
        .map_err(|e| TimetableError::Background(e.to_string()))?
}
