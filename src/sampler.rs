//! Dense power series from segment-based workout traces
//!
//! A trace stores breakpoints and per-segment intensities. Metric
//! calculations need one absolute power value per second, so the sampler
//! walks the breakpoints with a cursor and converts each second's intensity
//! to watts using the rider's power profile.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{PowerProfile, WorkoutTrace};

/// Length of the placeholder series, seconds
pub const PLACEHOLDER_DURATION_SECS: usize = 3600;

/// Placeholder intensity as a fraction of FTP
pub const PLACEHOLDER_INTENSITY: f64 = 0.5;

/// What the sampler produces for an empty or malformed trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyTracePolicy {
    /// Flat hour at 50% FTP
    Placeholder,
    /// Empty series; every downstream metric becomes 0
    NoData,
}

impl Default for EmptyTracePolicy {
    fn default() -> Self {
        EmptyTracePolicy::Placeholder
    }
}

/// Resamples workout traces into one-sample-per-second power series
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerSeriesSampler {
    pub policy: EmptyTracePolicy,
}

impl PowerSeriesSampler {
    pub fn new(policy: EmptyTracePolicy) -> Self {
        Self { policy }
    }

    /// Sample `trace` at every integer second from 0 to `floor(duration)`.
    ///
    /// With a profile, each second is `value × reference power` for the
    /// segment's effort type. Without one the raw intensity is returned, as
    /// preview rendering expects.
    pub fn sample(&self, trace: &WorkoutTrace, profile: Option<&PowerProfile>) -> Vec<f64> {
        if !trace.is_well_formed() {
            return self.empty_series(profile);
        }

        let last_second = trace.duration().floor() as usize;
        let Some(capacity) = last_second.checked_add(1) else {
            return self.empty_series(profile);
        };
        let last_segment = trace.value.len() - 1;
        let mut series = Vec::with_capacity(capacity);
        let mut cursor = 0usize;

        for t in 0..=last_second {
            let t = t as f64;
            while cursor + 1 < trace.time.len() && trace.time[cursor + 1] <= t {
                cursor += 1;
            }
            let segment = cursor.min(last_segment);
            let intensity = trace.value[segment];

            let power = match profile {
                Some(profile) => intensity * profile.reference_power(trace.effort_at(segment)),
                None => intensity,
            };
            series.push(power);
        }

        series
    }

    fn empty_series(&self, profile: Option<&PowerProfile>) -> Vec<f64> {
        match self.policy {
            EmptyTracePolicy::Placeholder => {
                let ftp = profile.map(|p| p.ftp).unwrap_or(1.0);
                debug!(ftp, "Trace has no usable data, sampling placeholder");
                vec![PLACEHOLDER_INTENSITY * ftp; PLACEHOLDER_DURATION_SECS]
            }
            EmptyTracePolicy::NoData => {
                debug!("Trace has no usable data");
                Vec::new()
            }
        }
    }
}
