use rayon::prelude::*;
use tracing::debug;

use crate::config::CalculationSettings;
use crate::models::{PowerProfile, WorkoutMetrics, WorkoutTrace};
use crate::sampler::PowerSeriesSampler;

/// Rolling window for Normalized Power, seconds
pub const DEFAULT_NP_WINDOW: usize = 30;

/// Core NP / IF / TSS calculation engine
#[derive(Debug, Clone, Copy)]
pub struct TssCalculator {
    sampler: PowerSeriesSampler,
    np_window: usize,
}

impl Default for TssCalculator {
    fn default() -> Self {
        Self {
            sampler: PowerSeriesSampler::default(),
            np_window: DEFAULT_NP_WINDOW,
        }
    }
}

impl TssCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &CalculationSettings) -> Self {
        Self {
            sampler: PowerSeriesSampler::new(settings.empty_trace_policy),
            np_window: (settings.np_window_secs as usize).max(1),
        }
    }

    /// Calculate Normalized Power with the standard 30-second window
    pub fn calculate_normalized_power(power: &[f64]) -> f64 {
        Self::calculate_normalized_power_with_window(power, DEFAULT_NP_WINDOW)
    }

    /// Calculate Normalized Power over a dense per-second series.
    ///
    /// Each index contributes the mean of the up-to-`window` samples ending
    /// there; the window shrinks near the start instead of skipping it. The
    /// fourth powers of those means are averaged and the fourth root taken.
    /// Returns 0 when the series is shorter than one full window.
    pub fn calculate_normalized_power_with_window(power: &[f64], window: usize) -> f64 {
        let window = window.max(1);
        if power.len() < window {
            return 0.0;
        }

        let mut rolling_sum = 0.0;
        let mut sum_fourth_powers = 0.0;

        for (i, &sample) in power.iter().enumerate() {
            rolling_sum += sample;
            if i >= window {
                rolling_sum -= power[i - window];
            }
            let count = (i + 1).min(window) as f64;
            sum_fourth_powers += (rolling_sum / count).powi(4);
        }

        let avg_fourth_power = sum_fourth_powers / power.len() as f64;

        // Take fourth root (sqrt of sqrt)
        let normalized_power = avg_fourth_power.sqrt().sqrt().round();
        if normalized_power.is_finite() {
            normalized_power
        } else {
            0.0
        }
    }

    /// IF = NP / FTP, rounded to two decimals. 0 when FTP is unusable or NP
    /// is not finite.
    pub fn calculate_intensity_factor(normalized_power: f64, profile: &PowerProfile) -> f64 {
        let Some(ftp) = profile.valid_ftp() else {
            return 0.0;
        };
        if !normalized_power.is_finite() {
            return 0.0;
        }

        let intensity_factor = (normalized_power / ftp * 100.0).round() / 100.0;
        if intensity_factor.is_finite() {
            intensity_factor
        } else {
            0.0
        }
    }

    /// TSS = IF² × hours × 100, rounded to a whole point
    pub fn calculate_training_stress_score(intensity_factor: f64, duration_seconds: f64) -> f64 {
        if !intensity_factor.is_finite() || intensity_factor == 0.0 {
            return 0.0;
        }
        if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
            return 0.0;
        }

        let duration_hours = duration_seconds / 3600.0;
        let tss = (intensity_factor * intensity_factor * duration_hours * 100.0).round();
        if tss.is_finite() {
            tss
        } else {
            0.0
        }
    }

    /// Full pipeline for one workout: sample, NP, IF, TSS
    pub fn calculate_all_training_metrics(
        &self,
        trace: &WorkoutTrace,
        profile: &PowerProfile,
    ) -> WorkoutMetrics {
        let series = self.sampler.sample(trace, Some(profile));

        let duration = if trace.is_well_formed() {
            trace.duration().round()
        } else {
            series.len() as f64
        };

        let normalized_power = Self::calculate_normalized_power_with_window(&series, self.np_window);
        let intensity_factor = Self::calculate_intensity_factor(normalized_power, profile);
        let training_stress_score = Self::calculate_training_stress_score(intensity_factor, duration);

        debug!(
            duration,
            normalized_power, intensity_factor, training_stress_score, "Workout metrics calculated"
        );

        WorkoutMetrics {
            duration,
            normalized_power,
            intensity_factor,
            training_stress_score,
        }
    }

    /// Metrics for a batch of optionally-loaded traces, computed in
    /// parallel. Output order matches input order; missing traces stay
    /// `None`.
    pub fn calculate_batch(
        &self,
        traces: &[Option<WorkoutTrace>],
        profile: &PowerProfile,
    ) -> Vec<Option<WorkoutMetrics>> {
        traces
            .par_iter()
            .map(|trace| {
                trace
                    .as_ref()
                    .map(|trace| self.calculate_all_training_metrics(trace, profile))
            })
            .collect()
    }
}

/// [`TssCalculator::calculate_all_training_metrics`] with default settings
pub fn calculate_all_training_metrics(trace: &WorkoutTrace, profile: &PowerProfile) -> WorkoutMetrics {
    TssCalculator::default().calculate_all_training_metrics(trace, profile)
}
