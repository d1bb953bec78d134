//! Scenario-level aggregation of workout metrics

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::CalculationSettings;
use crate::models::{ScenarioMetrics, WorkoutSelection};

/// Recovery break between consecutive workouts, seconds
pub const DEFAULT_REST_BETWEEN_WORKOUTS: f64 = 600.0;

/// Folds per-workout metrics into [`ScenarioMetrics`]
#[derive(Debug, Clone, Copy)]
pub struct ScenarioAggregator {
    rest_between_workouts: f64,
}

impl Default for ScenarioAggregator {
    fn default() -> Self {
        Self {
            rest_between_workouts: DEFAULT_REST_BETWEEN_WORKOUTS,
        }
    }
}

impl ScenarioAggregator {
    pub fn new(rest_between_workouts_secs: u32) -> Self {
        Self {
            rest_between_workouts: f64::from(rest_between_workouts_secs),
        }
    }

    pub fn from_settings(settings: &CalculationSettings) -> Self {
        Self::new(settings.rest_between_workouts_secs)
    }

    /// Aggregate the valid entries of `workouts`.
    ///
    /// Entries without metrics, or with any non-finite field, are skipped
    /// entirely. IF and NP are duration-weighted means. Rest is counted
    /// between consecutive valid workouts, never after the last.
    pub fn calculate_combined_metrics(&self, workouts: &[WorkoutSelection]) -> ScenarioMetrics {
        let mut total_duration = 0.0;
        let mut total_tss = 0.0;
        let mut weighted_if = 0.0;
        let mut weighted_np = 0.0;
        let mut valid_count = 0usize;

        for selection in workouts {
            let metrics = match selection.metrics {
                Some(metrics) if metrics.is_valid() => metrics,
                Some(_) => {
                    warn!(workout_id = %selection.workout_id, "Excluding workout with non-finite metrics");
                    continue;
                }
                None => {
                    debug!(workout_id = %selection.workout_id, "Excluding workout without metrics");
                    continue;
                }
            };

            total_duration += metrics.duration;
            total_tss += metrics.training_stress_score;
            weighted_if += metrics.intensity_factor * metrics.duration;
            weighted_np += metrics.normalized_power * metrics.duration;
            valid_count += 1;
        }

        let (average_if, average_np) = if total_duration > 0.0 {
            (weighted_if / total_duration, weighted_np / total_duration)
        } else {
            (0.0, 0.0)
        };

        let rest = self.rest_between_workouts * valid_count.saturating_sub(1) as f64;

        ScenarioMetrics {
            total_duration,
            total_elapsed_duration: total_duration + rest,
            total_tss,
            average_if,
            average_np,
            workout_count: valid_count,
        }
    }
}

/// [`ScenarioAggregator::calculate_combined_metrics`] with the default
/// 10-minute rest
pub fn calculate_combined_metrics(workouts: &[WorkoutSelection]) -> ScenarioMetrics {
    ScenarioAggregator::default().calculate_combined_metrics(workouts)
}

/// Field-by-field difference between two scenarios (`other − base`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioComparison {
    pub duration_delta: f64,
    pub elapsed_duration_delta: f64,
    pub tss_delta: f64,
    pub average_if_delta: f64,
    pub average_np_delta: f64,
}

impl ScenarioComparison {
    pub fn between(base: &ScenarioMetrics, other: &ScenarioMetrics) -> Self {
        Self {
            duration_delta: other.total_duration - base.total_duration,
            elapsed_duration_delta: other.total_elapsed_duration - base.total_elapsed_duration,
            tss_delta: other.total_tss - base.total_tss,
            average_if_delta: other.average_if - base.average_if,
            average_np_delta: other.average_np - base.average_np,
        }
    }

    /// True when the other scenario carries more training stress
    pub fn is_harder(&self) -> bool {
        self.tss_delta > 0.0
    }
}
