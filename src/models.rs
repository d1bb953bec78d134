use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{PlannerError, Result};

/// Effort type tag on a workout segment, selecting which power-profile
/// reference value the segment intensity is relative to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum EffortType {
    /// Functional threshold power
    #[serde(rename = "FTP")]
    Ftp,
    /// Neuromuscular (sprint) power
    #[serde(rename = "NM")]
    Nm,
    /// Anaerobic capacity power
    #[serde(rename = "AC")]
    Ac,
    /// Maximal aerobic power
    #[serde(rename = "MAP")]
    Map,
}

impl EffortType {
    /// Parse a segment tag. Unknown tags are relative to FTP.
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_uppercase().as_str() {
            "NM" => EffortType::Nm,
            "AC" => EffortType::Ac,
            "MAP" => EffortType::Map,
            _ => EffortType::Ftp,
        }
    }
}

impl From<String> for EffortType {
    fn from(tag: String) -> Self {
        Self::parse(&tag)
    }
}

impl Default for EffortType {
    fn default() -> Self {
        EffortType::Ftp
    }
}

/// A rider's four physiological reference powers, in watts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawPowerProfile", rename_all = "camelCase")]
pub struct PowerProfile {
    /// Functional threshold power
    pub ftp: f64,
    /// Neuromuscular power
    pub nm: f64,
    /// Anaerobic capacity power
    pub ac: f64,
    /// Maximal aerobic power
    pub map: f64,
    /// Target effort as a percentage (0-200), if the rider chose one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_intensity: Option<f64>,
}

impl PowerProfile {
    pub fn new(ftp: f64, nm: f64, ac: f64, map: f64) -> Self {
        Self {
            ftp,
            nm,
            ac,
            map,
            target_intensity: None,
        }
    }

    pub fn with_target_intensity(mut self, target_intensity: f64) -> Self {
        self.target_intensity = Some(target_intensity);
        self
    }

    /// Reference power for a segment of the given effort type
    pub fn reference_power(&self, effort: EffortType) -> f64 {
        match effort {
            EffortType::Nm => self.nm,
            EffortType::Ac => self.ac,
            EffortType::Map => self.map,
            EffortType::Ftp => self.ftp,
        }
    }

    /// FTP usable as a divisor: finite and strictly positive
    pub fn valid_ftp(&self) -> Option<f64> {
        (self.ftp.is_finite() && self.ftp > 0.0).then_some(self.ftp)
    }
}

impl Default for PowerProfile {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

/// Wire shape accepted for a profile: either flat fields or the legacy
/// nested `powerProfile` object. Both collapse into [`PowerProfile`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawPowerProfile {
    ftp: Option<f64>,
    nm: Option<f64>,
    ac: Option<f64>,
    map: Option<f64>,
    target_intensity: Option<f64>,
    power_profile: Option<LegacyPowerProfile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LegacyPowerProfile {
    ftp: Option<f64>,
    nm: Option<f64>,
    ac: Option<f64>,
    map: Option<f64>,
    target_intensity: Option<f64>,
}

impl From<RawPowerProfile> for PowerProfile {
    fn from(raw: RawPowerProfile) -> Self {
        let legacy = raw.power_profile.unwrap_or_default();
        let pick = |flat: Option<f64>, nested: Option<f64>| -> f64 {
            flat.filter(|v| v.is_finite())
                .or(nested.filter(|v| v.is_finite()))
                .unwrap_or(0.0)
        };

        PowerProfile {
            ftp: pick(raw.ftp, legacy.ftp),
            nm: pick(raw.nm, legacy.nm),
            ac: pick(raw.ac, legacy.ac),
            map: pick(raw.map, legacy.map),
            target_intensity: raw
                .target_intensity
                .filter(|v| is_valid_target_intensity(*v))
                .or(legacy.target_intensity.filter(|v| is_valid_target_intensity(*v))),
        }
    }
}

/// A target intensity is usable when finite and strictly positive
pub fn is_valid_target_intensity(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Longest trace accepted as well formed, seconds
pub const MAX_TRACE_SECS: f64 = 86_400.0;

/// One workout's raw power shape.
///
/// Segment `i` spans `[time[i], time[i+1])` at intensity `value[i]`, relative
/// to the profile power selected by `effort[i]`. The last breakpoint is the
/// total duration in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutTrace {
    pub time: Vec<f64>,
    pub value: Vec<f64>,
    #[serde(rename = "type", default)]
    pub effort: Vec<EffortType>,
}

impl WorkoutTrace {
    pub fn new(time: Vec<f64>, value: Vec<f64>, effort: Vec<EffortType>) -> Self {
        Self { time, value, effort }
    }

    /// Single-effort trace relative to FTP
    pub fn ftp_relative(time: Vec<f64>, value: Vec<f64>) -> Self {
        let effort = vec![EffortType::Ftp; value.len()];
        Self { time, value, effort }
    }

    /// Total duration in seconds, 0 for a malformed trace
    pub fn duration(&self) -> f64 {
        match self.time.last() {
            Some(&last) if last.is_finite() && last > 0.0 => last,
            _ => 0.0,
        }
    }

    /// True when the trace has breakpoints, intensities, finite strictly
    /// increasing times and a total duration in `(0, MAX_TRACE_SECS]`
    pub fn is_well_formed(&self) -> bool {
        let duration = self.duration();
        !self.time.is_empty()
            && !self.value.is_empty()
            && self.time.iter().all(|t| t.is_finite())
            && self.time.windows(2).all(|w| w[0] < w[1])
            && duration > 0.0
            && duration <= MAX_TRACE_SECS
    }

    /// True when every intensity is zero (an unrecorded variant)
    pub fn is_all_zero(&self) -> bool {
        self.value.iter().all(|&v| v == 0.0)
    }

    pub fn effort_at(&self, index: usize) -> EffortType {
        self.effort.get(index).copied().unwrap_or_default()
    }
}

/// Indoor and outdoor variants of the same workout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceVariants {
    #[serde(default)]
    pub indoor: Option<WorkoutTrace>,
    #[serde(default)]
    pub outdoor: Option<WorkoutTrace>,
}

impl TraceVariants {
    /// Prefer the indoor trace unless it is missing or entirely zero-valued
    pub fn select(self) -> Option<WorkoutTrace> {
        match self.indoor {
            Some(indoor) if !indoor.is_all_zero() => Some(indoor),
            indoor => self.outdoor.or(indoor),
        }
    }
}

/// A stored workout record: a bare trace or an indoor/outdoor pair
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TraceRecord {
    Single(WorkoutTrace),
    Variants(TraceVariants),
}

impl TraceRecord {
    pub fn select(self) -> Option<WorkoutTrace> {
        match self {
            TraceRecord::Single(trace) => Some(trace),
            TraceRecord::Variants(variants) => variants.select(),
        }
    }
}

/// Training metrics derived from one trace and one profile.
///
/// Values are `f64` so that stored, possibly corrupt, metrics can be carried
/// into aggregation and rejected there.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutMetrics {
    /// Duration in whole seconds
    pub duration: f64,
    /// Normalized Power in whole watts
    pub normalized_power: f64,
    /// NP / FTP, two decimals
    pub intensity_factor: f64,
    /// IF² × hours × 100, whole points
    pub training_stress_score: f64,
}

impl WorkoutMetrics {
    /// All four fields finite
    pub fn is_valid(&self) -> bool {
        self.duration.is_finite()
            && self.normalized_power.is_finite()
            && self.intensity_factor.is_finite()
            && self.training_stress_score.is_finite()
    }
}

/// A workout slot in a scenario. `metrics` is `None` when the trace failed
/// to load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSelection {
    pub workout_id: String,
    pub metrics: Option<WorkoutMetrics>,
}

impl WorkoutSelection {
    pub fn new(workout_id: impl Into<String>, metrics: Option<WorkoutMetrics>) -> Self {
        Self {
            workout_id: workout_id.into(),
            metrics,
        }
    }
}

/// Aggregate metrics over the valid workouts of a scenario
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioMetrics {
    /// Sum of workout durations, seconds
    pub total_duration: f64,
    /// Total duration plus rest between consecutive workouts, seconds
    pub total_elapsed_duration: f64,
    pub total_tss: f64,
    /// Duration-weighted mean IF
    pub average_if: f64,
    /// Duration-weighted mean NP, watts
    pub average_np: f64,
    /// Number of workouts that contributed
    pub workout_count: usize,
}

/// Scenario metrics rescaled to a target effort
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetProjection {
    /// Resolved target, percent
    pub target_intensity: f64,
    pub target_if: f64,
    pub target_tss: f64,
    pub target_np: f64,
}

/// A named, ordered selection of workouts from the library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub name: String,
    pub workouts: Vec<String>,
    /// Metrics saved with the scenario; superseded by recomputation
    #[serde(default)]
    pub stored_metrics: HashMap<String, WorkoutMetrics>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            workouts: Vec::new(),
            stored_metrics: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Append a workout, enforcing the size limit and uniqueness
    pub fn add_workout(&mut self, workout_id: impl Into<String>, max_workouts: usize) -> Result<()> {
        let workout_id = workout_id.into();
        if self.workouts.len() >= max_workouts {
            return Err(PlannerError::Validation(format!(
                "Scenario '{}' already holds the maximum of {} workouts",
                self.name, max_workouts
            )));
        }
        if self.workouts.contains(&workout_id) {
            return Err(PlannerError::Validation(format!(
                "Workout '{}' is already in scenario '{}'",
                workout_id, self.name
            )));
        }
        self.workouts.push(workout_id);
        Ok(())
    }

    pub fn remove_workout(&mut self, workout_id: &str) -> bool {
        let before = self.workouts.len();
        self.workouts.retain(|id| id != workout_id);
        self.stored_metrics.remove(workout_id);
        self.workouts.len() != before
    }

    /// Move the workout at `from` so that it ends up at index `to`
    pub fn move_workout(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.workouts.len();
        if from >= len || to >= len {
            return Err(PlannerError::Validation(format!(
                "Cannot move workout {} -> {} in a scenario of {} workouts",
                from, to, len
            )));
        }
        let workout = self.workouts.remove(from);
        self.workouts.insert(to, workout);
        Ok(())
    }

    pub fn validate(&self, max_workouts: usize) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PlannerError::Validation("Scenario name cannot be empty".to_string()));
        }
        if self.workouts.len() > max_workouts {
            return Err(PlannerError::Validation(format!(
                "Scenario '{}' has {} workouts, limit is {}",
                self.name,
                self.workouts.len(),
                max_workouts
            )));
        }
        for (i, id) in self.workouts.iter().enumerate() {
            if self.workouts[..i].contains(id) {
                return Err(PlannerError::Validation(format!(
                    "Workout '{}' appears more than once in scenario '{}'",
                    id, self.name
                )));
            }
        }
        Ok(())
    }

    /// Selections built from the stored metrics, in scenario order
    pub fn stored_selections(&self) -> Vec<WorkoutSelection> {
        self.workouts
            .iter()
            .map(|id| WorkoutSelection::new(id.clone(), self.stored_metrics.get(id).copied()))
            .collect()
    }
}
