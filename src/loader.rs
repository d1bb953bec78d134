//! Workout trace loading
//!
//! Traces live in a directory of `<workout id>.json` files or in a single
//! bundled JSON object keyed by workout id. A scenario's traces are loaded
//! concurrently with a bound on in-flight loads; a failed load becomes
//! `None` for that slot and never fails the batch.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::PlannerConfig;
use crate::error::{ErrorSeverity, LoadError, PlannerError};
use crate::models::{PowerProfile, ScenarioMetrics, TraceRecord, WorkoutSelection, WorkoutTrace};
use crate::scenario::ScenarioAggregator;
use crate::tss::TssCalculator;

/// Source of workout traces keyed by workout id
#[async_trait]
pub trait TraceLoader: Send + Sync {
    async fn load_trace(&self, workout_id: &str) -> Result<WorkoutTrace, LoadError>;
}

/// Parse a stored record and pick its preferred variant
pub fn parse_trace_record(workout_id: &str, content: &str) -> Result<WorkoutTrace, LoadError> {
    let record: TraceRecord = serde_json::from_str(content).map_err(|e| LoadError::Parse {
        workout_id: workout_id.to_string(),
        reason: e.to_string(),
    })?;

    record.select().ok_or_else(|| LoadError::Empty {
        workout_id: workout_id.to_string(),
    })
}

/// Loads `<root>/<workout id>.json`
#[derive(Debug, Clone)]
pub struct FileTraceLoader {
    root: PathBuf,
}

impl FileTraceLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ids that would escape the library directory have no path
    fn path_for(&self, workout_id: &str) -> Option<PathBuf> {
        let valid = !workout_id.is_empty()
            && !workout_id.contains(|c: char| c == '/' || c == '\\')
            && workout_id != "."
            && workout_id != "..";
        valid.then(|| self.root.join(format!("{}.json", workout_id)))
    }
}

#[async_trait]
impl TraceLoader for FileTraceLoader {
    async fn load_trace(&self, workout_id: &str) -> Result<WorkoutTrace, LoadError> {
        let path = self.path_for(workout_id).ok_or_else(|| LoadError::NotFound {
            workout_id: workout_id.to_string(),
        })?;

        let content = tokio::fs::read_to_string(&path).await.map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                LoadError::NotFound {
                    workout_id: workout_id.to_string(),
                }
            } else {
                LoadError::Io {
                    workout_id: workout_id.to_string(),
                    source,
                }
            }
        })?;

        parse_trace_record(workout_id, &content)
    }
}

/// Traces held in memory, e.g. from a bundled library file
#[derive(Debug, Clone, Default)]
pub struct InMemoryTraceLoader {
    traces: HashMap<String, WorkoutTrace>,
}

impl InMemoryTraceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, workout_id: impl Into<String>, trace: WorkoutTrace) {
        self.traces.insert(workout_id.into(), trace);
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Build from `{ "<id>": trace | {indoor, outdoor}, ... }`. Records with
    /// no usable variant are skipped.
    pub fn from_bundle_json(content: &str) -> Result<Self, PlannerError> {
        let records: HashMap<String, TraceRecord> = serde_json::from_str(content)?;
        let mut loader = Self::new();

        for (workout_id, record) in records {
            match record.select() {
                Some(trace) => loader.insert(workout_id, trace),
                None => warn!(workout_id = %workout_id, "Bundled workout has no usable trace"),
            }
        }

        Ok(loader)
    }

    pub fn from_bundle_file(path: &Path) -> Result<Self, PlannerError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_bundle_json(&content)
    }
}

#[async_trait]
impl TraceLoader for InMemoryTraceLoader {
    async fn load_trace(&self, workout_id: &str) -> Result<WorkoutTrace, LoadError> {
        self.traces
            .get(workout_id)
            .cloned()
            .ok_or_else(|| LoadError::NotFound {
                workout_id: workout_id.to_string(),
            })
    }
}

/// Load traces for `workout_ids` with at most `max_concurrent` loads in
/// flight. The result matches the input order; failures are logged and
/// become `None`.
pub async fn load_traces<L>(loader: &L, workout_ids: &[String], max_concurrent: usize) -> Vec<Option<WorkoutTrace>>
where
    L: TraceLoader + ?Sized,
{
    let traces: Vec<Option<WorkoutTrace>> = stream::iter(workout_ids)
        .map(|workout_id| async move {
            match loader.load_trace(workout_id).await {
                Ok(trace) => Some(trace),
                Err(e) => {
                    log_load_failure(e);
                    None
                }
            }
        })
        .buffered(max_concurrent.max(1))
        .collect()
        .await;

    let loaded = traces.iter().filter(|t| t.is_some()).count();
    info!(requested = workout_ids.len(), loaded, "Workout traces loaded");
    traces
}

/// Missing or empty records are expected in a partial library; anything
/// else points at a corrupt file or a failing disk
fn log_load_failure(e: LoadError) {
    let workout_id = e.workout_id().to_string();
    let error = PlannerError::from(e);
    match error.severity() {
        ErrorSeverity::Warning => warn!(workout_id = %workout_id, error = %error, "Failed to load workout trace"),
        ErrorSeverity::Error => error!(workout_id = %workout_id, error = %error, "Failed to load workout trace"),
    }
}

/// Load every workout's trace, compute its metrics against `profile`, and
/// aggregate. Workouts that fail to load are excluded; if all fail the
/// result is all zeros.
pub async fn calculate_combined_metrics_dynamic<L>(
    loader: &L,
    workout_ids: &[String],
    profile: &PowerProfile,
    config: &PlannerConfig,
) -> ScenarioMetrics
where
    L: TraceLoader + ?Sized,
{
    let traces = load_traces(loader, workout_ids, config.loading.max_concurrent_loads).await;
    let metrics = TssCalculator::from_settings(&config.calculation).calculate_batch(&traces, profile);

    let selections: Vec<WorkoutSelection> = workout_ids
        .iter()
        .zip(metrics)
        .map(|(id, metrics)| WorkoutSelection::new(id.clone(), metrics))
        .collect();

    ScenarioAggregator::from_settings(&config.calculation).calculate_combined_metrics(&selections)
}
