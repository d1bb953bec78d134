use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::models::WorkoutTrace;

/// Timeline bucket width used by charts, seconds
pub const DEFAULT_BUCKET_SIZE: f64 = 1800.0;

/// Six-band power zone model on percent of FTP.
///
/// Each band is `[min, max)`:
/// - Recovery: < 55%
/// - Endurance: 55-75%
/// - Tempo: 75-90%
/// - Threshold: 90-105%
/// - VO2max: 105-120%
/// - Anaerobic: 120-200%
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerZone {
    Recovery,
    Endurance,
    Tempo,
    Threshold,
    Vo2Max,
    Anaerobic,
}

impl PowerZone {
    pub const ALL: [PowerZone; 6] = [
        PowerZone::Recovery,
        PowerZone::Endurance,
        PowerZone::Tempo,
        PowerZone::Threshold,
        PowerZone::Vo2Max,
        PowerZone::Anaerobic,
    ];

    /// `[min, max)` bounds in percent of FTP
    pub fn range(&self) -> (f64, f64) {
        match self {
            PowerZone::Recovery => (0.0, 55.0),
            PowerZone::Endurance => (55.0, 75.0),
            PowerZone::Tempo => (75.0, 90.0),
            PowerZone::Threshold => (90.0, 105.0),
            PowerZone::Vo2Max => (105.0, 120.0),
            PowerZone::Anaerobic => (120.0, 200.0),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PowerZone::Recovery => "Recovery",
            PowerZone::Endurance => "Endurance",
            PowerZone::Tempo => "Tempo",
            PowerZone::Threshold => "Threshold",
            PowerZone::Vo2Max => "VO2max",
            PowerZone::Anaerobic => "Anaerobic",
        }
    }

    fn index(&self) -> usize {
        match self {
            PowerZone::Recovery => 0,
            PowerZone::Endurance => 1,
            PowerZone::Tempo => 2,
            PowerZone::Threshold => 3,
            PowerZone::Vo2Max => 4,
            PowerZone::Anaerobic => 5,
        }
    }

    /// First zone whose range contains `percent_ftp`; None outside all bands
    pub fn classify(percent_ftp: f64) -> Option<PowerZone> {
        Self::ALL.into_iter().find(|zone| {
            let (min, max) = zone.range();
            percent_ftp >= min && percent_ftp < max
        })
    }
}

impl fmt::Display for PowerZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Cumulative seconds spent in each zone
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneDistribution {
    seconds: [f64; 6],
}

impl ZoneDistribution {
    pub fn add(&mut self, zone: PowerZone, seconds: f64) {
        self.seconds[zone.index()] += seconds;
    }

    pub fn seconds_in(&self, zone: PowerZone) -> f64 {
        self.seconds[zone.index()]
    }

    pub fn total_seconds(&self) -> f64 {
        self.seconds.iter().sum()
    }

    /// Share of classified time in `zone`, 0-100
    pub fn percent_in(&self, zone: PowerZone) -> f64 {
        let total = self.total_seconds();
        if total > 0.0 {
            self.seconds_in(zone) / total * 100.0
        } else {
            0.0
        }
    }

    /// `(zone, seconds)` pairs in zone order
    pub fn iter(&self) -> impl Iterator<Item = (PowerZone, f64)> + '_ {
        PowerZone::ALL.into_iter().map(move |zone| (zone, self.seconds_in(zone)))
    }

    pub fn merge(&mut self, other: &ZoneDistribution) {
        for (total, add) in self.seconds.iter_mut().zip(other.seconds.iter()) {
            *total += add;
        }
    }
}

/// Classifies time-weighted trace samples into zones after scaling by a
/// target intensity
#[derive(Debug, Clone, Copy)]
pub struct ZoneClassifier {
    scale: f64,
}

impl Default for ZoneClassifier {
    fn default() -> Self {
        Self { scale: 1.0 }
    }
}

impl ZoneClassifier {
    /// Scale samples by `target_intensity` percent. An invalid target leaves
    /// samples unscaled.
    pub fn new(target_intensity: f64) -> Self {
        let scale = if target_intensity.is_finite() && target_intensity > 0.0 {
            target_intensity / 100.0
        } else {
            1.0
        };
        Self { scale }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Seconds in each zone for one trace.
    ///
    /// Sample `i` lasts until the next breakpoint; a sample with no following
    /// breakpoint counts as one second. Malformed traces contribute nothing.
    pub fn classify_trace(&self, trace: &WorkoutTrace) -> ZoneDistribution {
        let mut distribution = ZoneDistribution::default();
        if !trace.is_well_formed() {
            debug!("Skipping malformed trace in zone classification");
            return distribution;
        }
        let mut dropped = 0usize;

        for (i, &value) in trace.value.iter().enumerate() {
            let Some(&start) = trace.time.get(i) else {
                break;
            };
            let duration = match trace.time.get(i + 1) {
                Some(&end) => end - start,
                None => 1.0,
            };
            if !duration.is_finite() || duration <= 0.0 {
                continue;
            }

            match PowerZone::classify(value * 100.0 * self.scale) {
                Some(zone) => distribution.add(zone, duration),
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            debug!(dropped, "Samples outside all power zones");
        }
        distribution
    }

    /// Combined distribution across a scenario's traces
    pub fn classify_traces<'a, I>(&self, traces: I) -> ZoneDistribution
    where
        I: IntoIterator<Item = &'a WorkoutTrace>,
    {
        let mut combined = ZoneDistribution::default();
        for trace in traces {
            combined.merge(&self.classify_trace(trace));
        }
        combined
    }
}

/// A `(time, power %)` point on a scenario timeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePoint {
    /// Seconds from the start of the scenario
    pub time: f64,
    /// Percent of FTP
    pub power_percent: f64,
}

impl TimelinePoint {
    pub fn new(time: f64, power_percent: f64) -> Self {
        Self { time, power_percent }
    }
}

/// Concatenate traces into one timeline, each offset by the durations of
/// the traces before it. Intensities become percent of FTP, scaled by
/// `scale`. Malformed traces contribute nothing.
pub fn build_timeline(traces: &[WorkoutTrace], scale: f64) -> Vec<TimelinePoint> {
    let mut points = Vec::new();
    let mut offset = 0.0;

    for trace in traces.iter().filter(|t| t.is_well_formed()) {
        points.extend(
            trace
                .time
                .iter()
                .zip(trace.value.iter())
                .map(|(&time, &value)| TimelinePoint::new(offset + time, value * 100.0 * scale)),
        );
        offset += trace.duration();
    }

    points
}

/// Groups timeline points into fixed-width buckets
#[derive(Debug, Clone, Copy)]
pub struct TimeBucketer {
    bucket_size: f64,
}

impl Default for TimeBucketer {
    fn default() -> Self {
        Self {
            bucket_size: DEFAULT_BUCKET_SIZE,
        }
    }
}

impl TimeBucketer {
    /// A non-positive or non-finite size falls back to 1800 seconds
    pub fn new(bucket_size: f64) -> Self {
        let bucket_size = if bucket_size.is_finite() && bucket_size > 0.0 {
            bucket_size
        } else {
            DEFAULT_BUCKET_SIZE
        };
        Self { bucket_size }
    }

    pub fn bucket_size(&self) -> f64 {
        self.bucket_size
    }

    /// Lazily yield one point per non-empty bucket:
    /// `(bucket index × size, mean power of the bucket)`.
    ///
    /// `points` must be time-ordered. Points with a non-finite time or power
    /// are ignored. Calling again restarts from the beginning.
    pub fn buckets<'a>(&self, points: &'a [TimelinePoint]) -> Buckets<'a> {
        Buckets {
            points,
            position: 0,
            bucket_size: self.bucket_size,
        }
    }
}

/// Iterator returned by [`TimeBucketer::buckets`]
#[derive(Debug, Clone)]
pub struct Buckets<'a> {
    points: &'a [TimelinePoint],
    position: usize,
    bucket_size: f64,
}

impl<'a> Buckets<'a> {
    fn bucket_of(&self, point: &TimelinePoint) -> Option<i64> {
        if point.time.is_finite() && point.power_percent.is_finite() {
            Some((point.time / self.bucket_size).floor() as i64)
        } else {
            None
        }
    }
}

impl<'a> Iterator for Buckets<'a> {
    type Item = TimelinePoint;

    fn next(&mut self) -> Option<Self::Item> {
        let mut current: Option<i64> = None;
        let mut sum = 0.0;
        let mut count = 0usize;

        while let Some(point) = self.points.get(self.position) {
            let Some(bucket) = self.bucket_of(point) else {
                self.position += 1;
                continue;
            };
            match current {
                None => current = Some(bucket),
                Some(open) if open != bucket => break,
                Some(_) => {}
            }
            sum += point.power_percent;
            count += 1;
            self.position += 1;
        }

        current.map(|bucket| TimelinePoint::new(bucket as f64 * self.bucket_size, sum / count as f64))
    }
}
