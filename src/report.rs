//! Human-readable scenario reports

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::{self, Write};

use crate::config::PlannerConfig;
use crate::models::{PowerProfile, ScenarioMetrics, TargetProjection, WorkoutSelection, WorkoutTrace};
use crate::projection::TargetIntensityProjector;
use crate::scenario::ScenarioAggregator;
use crate::tss::TssCalculator;
use crate::zones::{build_timeline, TimeBucketer, TimelinePoint, ZoneClassifier, ZoneDistribution};

/// Format seconds as `HH:MM:SS` from one hour up, `MM:SS` below.
///
/// Missing, non-finite or negative input formats as `00:00`.
pub fn format_duration(seconds: impl Into<Option<f64>>) -> String {
    let seconds = match seconds.into() {
        Some(s) if s.is_finite() && s >= 0.0 => s.floor() as u64,
        _ => return "00:00".to_string(),
    };

    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Everything shown for one evaluated scenario
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
    pub name: String,
    pub generated_at: DateTime<Utc>,
    /// Per-workout metrics in scenario order; `None` where loading failed
    pub workouts: Vec<WorkoutSelection>,
    pub metrics: ScenarioMetrics,
    pub projection: TargetProjection,
    pub zones: ZoneDistribution,
    /// Bucketed combined timeline at the target intensity
    pub timeline: Vec<TimelinePoint>,
}

impl ScenarioReport {
    /// Evaluate a scenario from its loaded traces. `traces` is aligned with
    /// `workout_ids`; `requested_target` overrides the profile's target.
    pub fn build(
        name: impl Into<String>,
        workout_ids: &[String],
        traces: &[Option<WorkoutTrace>],
        profile: &PowerProfile,
        requested_target: Option<f64>,
        config: &PlannerConfig,
    ) -> Self {
        let per_workout = TssCalculator::from_settings(&config.calculation).calculate_batch(traces, profile);
        let workouts: Vec<WorkoutSelection> = workout_ids
            .iter()
            .zip(per_workout)
            .map(|(id, metrics)| WorkoutSelection::new(id.clone(), metrics))
            .collect();

        let metrics = ScenarioAggregator::from_settings(&config.calculation).calculate_combined_metrics(&workouts);

        let projector = TargetIntensityProjector::from_settings(&config.calculation);
        let target = projector.resolve_target_intensity(requested_target, Some(profile));
        let projection = projector.project(&metrics, target);

        let loaded: Vec<WorkoutTrace> = traces.iter().flatten().cloned().collect();
        let classifier = ZoneClassifier::new(target);
        let zones = classifier.classify_traces(&loaded);

        let points = build_timeline(&loaded, classifier.scale());
        let timeline = TimeBucketer::new(config.analytics.bucket_size_secs)
            .buckets(&points)
            .collect();

        Self {
            name: name.into(),
            generated_at: Utc::now(),
            workouts,
            metrics,
            projection,
            zones,
            timeline,
        }
    }

    /// Evaluate from metrics saved with a scenario when no traces are
    /// available. Zones and timeline stay empty.
    pub fn from_stored(
        name: impl Into<String>,
        workouts: Vec<WorkoutSelection>,
        profile: &PowerProfile,
        requested_target: Option<f64>,
        config: &PlannerConfig,
    ) -> Self {
        let metrics = ScenarioAggregator::from_settings(&config.calculation).calculate_combined_metrics(&workouts);
        let projector = TargetIntensityProjector::from_settings(&config.calculation);
        let target = projector.resolve_target_intensity(requested_target, Some(profile));

        Self {
            name: name.into(),
            generated_at: Utc::now(),
            workouts,
            metrics,
            projection: projector.project(&metrics, target),
            zones: ZoneDistribution::default(),
            timeline: Vec::new(),
        }
    }

    /// Write the report as plain text
    pub fn write_text<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{:=<60}", "")?;
        writeln!(out, "SCENARIO: {}", self.name)?;
        writeln!(out, "{:=<60}", "")?;
        writeln!(out, "Generated: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(out)?;

        writeln!(out, "WORKOUTS")?;
        writeln!(out, "{:-<60}", "")?;
        writeln!(out, "{:<4} {:<20} {:>10} {:>6} {:>6} {:>6}", "#", "Workout", "Duration", "NP", "IF", "TSS")?;
        for (i, workout) in self.workouts.iter().enumerate() {
            match &workout.metrics {
                Some(m) => writeln!(
                    out,
                    "{:<4} {:<20} {:>10} {:>6.0} {:>6.2} {:>6.0}",
                    i + 1,
                    workout.workout_id,
                    format_duration(m.duration),
                    m.normalized_power,
                    m.intensity_factor,
                    m.training_stress_score
                )?,
                None => writeln!(out, "{:<4} {:<20} {:>10}", i + 1, workout.workout_id, "unavailable")?,
            }
        }
        writeln!(out)?;

        writeln!(out, "TOTALS")?;
        writeln!(out, "{:-<60}", "")?;
        writeln!(out, "Workouts counted: {}", self.metrics.workout_count)?;
        writeln!(out, "Moving time: {}", format_duration(self.metrics.total_duration))?;
        writeln!(out, "Elapsed time (with rest): {}", format_duration(self.metrics.total_elapsed_duration))?;
        writeln!(out, "Total TSS: {:.0}", self.metrics.total_tss)?;
        writeln!(out, "Average IF: {:.2}", self.metrics.average_if)?;
        writeln!(out, "Average NP: {:.0} W", self.metrics.average_np)?;
        writeln!(out)?;

        writeln!(out, "TARGET @ {:.0}%", self.projection.target_intensity)?;
        writeln!(out, "{:-<60}", "")?;
        writeln!(out, "Target IF: {:.2}", self.projection.target_if)?;
        writeln!(out, "Target NP: {:.0} W", self.projection.target_np)?;
        writeln!(out, "Target TSS: {:.0}", self.projection.target_tss)?;
        writeln!(out)?;

        if self.zones.total_seconds() > 0.0 {
            writeln!(out, "TIME IN ZONE")?;
            writeln!(out, "{:-<60}", "")?;
            for (zone, seconds) in self.zones.iter() {
                let (min, max) = zone.range();
                writeln!(
                    out,
                    "{:<12} {:>4.0}-{:<4.0}% {:>10} {:>6.1}%",
                    zone.name(),
                    min,
                    max,
                    format_duration(seconds),
                    self.zones.percent_in(zone)
                )?;
            }
            writeln!(out)?;
        }

        if !self.timeline.is_empty() {
            writeln!(out, "TIMELINE")?;
            writeln!(out, "{:-<60}", "")?;
            for point in &self.timeline {
                writeln!(out, "{:>10}  {:>5.0}%", format_duration(point.time), point.power_percent)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zones::PowerZone;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "00:00");
        assert_eq!(format_duration(f64::NAN), "00:00");
        assert_eq!(format_duration(-5.0), "00:00");
        assert_eq!(format_duration(None::<f64>), "00:00");
        assert_eq!(format_duration(3661.0), "01:01:01");
        assert_eq!(format_duration(90.0), "01:30");
        assert_eq!(format_duration(59.9), "00:59");
        assert_eq!(format_duration(f64::INFINITY), "00:00");
        assert_eq!(format_duration(36000.0), "10:00:00");
    }

    fn build_report() -> ScenarioReport {
        let ids = vec!["steady".to_string(), "missing".to_string(), "tempo".to_string()];
        let traces = vec![
            Some(WorkoutTrace::ftp_relative(vec![0.0, 3600.0], vec![0.5])),
            None,
            Some(WorkoutTrace::ftp_relative(vec![0.0, 1800.0], vec![1.0])),
        ];
        let profile = PowerProfile::new(250.0, 1000.0, 500.0, 350.0).with_target_intensity(80.0);

        ScenarioReport::build("Week 1", &ids, &traces, &profile, None, &PlannerConfig::default())
    }

    #[test]
    fn test_build_report() {
        let report = build_report();

        assert_eq!(report.workouts.len(), 3);
        assert!(report.workouts[1].metrics.is_none());
        assert_eq!(report.metrics.workout_count, 2);
        assert_eq!(report.metrics.total_duration, 5400.0);
        assert_eq!(report.projection.target_intensity, 80.0);

        // 0.5 × 0.8 = 40% and 1.0 × 0.8 = 80%
        assert_eq!(report.zones.seconds_in(PowerZone::Recovery), 3600.0);
        assert_eq!(report.zones.seconds_in(PowerZone::Tempo), 1800.0);

        // One point per segment start: 40% at 0s, 80% at 3600s
        assert_eq!(report.timeline.len(), 2);
        assert_eq!(report.timeline[0].time, 0.0);
        assert_eq!(report.timeline[1].time, 3600.0);
    }

    #[test]
    fn test_requested_target_overrides_profile() {
        let ids = vec!["a".to_string()];
        let traces = vec![Some(WorkoutTrace::ftp_relative(vec![0.0, 3600.0], vec![0.8]))];
        let profile = PowerProfile::new(250.0, 0.0, 0.0, 0.0).with_target_intensity(80.0);

        let report = ScenarioReport::build("x", &ids, &traces, &profile, Some(100.0), &PlannerConfig::default());
        assert_eq!(report.projection.target_intensity, 100.0);
        assert!((report.projection.target_tss - 64.0).abs() < 1e-9);
    }

    #[test]
    fn test_report_from_stored_metrics() {
        let workouts = vec![
            WorkoutSelection::new(
                "a",
                Some(crate::models::WorkoutMetrics {
                    duration: 3600.0,
                    normalized_power: 200.0,
                    intensity_factor: 0.8,
                    training_stress_score: 64.0,
                }),
            ),
            WorkoutSelection::new("b", None),
        ];

        let report = ScenarioReport::from_stored("saved", workouts, &PowerProfile::default(), None, &PlannerConfig::default());
        assert_eq!(report.metrics.total_tss, 64.0);
        assert_eq!(report.projection.target_intensity, 70.0);
        assert!(report.timeline.is_empty());

        let mut buffer = Vec::new();
        report.write_text(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(!text.contains("TIME IN ZONE"));
    }

    #[test]
    fn test_write_text() {
        let report = build_report();
        let mut buffer = Vec::new();
        report.write_text(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains("SCENARIO: Week 1"));
        assert!(text.contains("unavailable"));
        assert!(text.contains("Moving time: 01:30:00"));
        assert!(text.contains("Elapsed time (with rest): 01:40:00"));
        assert!(text.contains("TARGET @ 80%"));
        assert!(text.contains("TIME IN ZONE"));
        assert!(text.contains("TIMELINE"));
    }
}
