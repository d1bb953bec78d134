//! Target-intensity projection of scenario metrics
//!
//! Answers "what if I rode the whole scenario at N%": IF and NP scale by the
//! target ratio, TSS follows from the configured [`TargetTssRule`].

use serde::{Deserialize, Serialize};

use crate::config::CalculationSettings;
use crate::models::{is_valid_target_intensity, PowerProfile, ScenarioMetrics, TargetProjection};

/// Target effort used when nothing valid is configured
pub const DEFAULT_TARGET_INTENSITY: f64 = 70.0;

/// How target TSS is derived from the target ratio `r`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetTssRule {
    /// `(IF × r)² × hours × 100`, i.e. TSS scales by `r²`
    FromTargetIf,
    /// `TSS × r`
    Linear,
}

impl Default for TargetTssRule {
    fn default() -> Self {
        TargetTssRule::FromTargetIf
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TargetIntensityProjector {
    default_target_intensity: f64,
    tss_rule: TargetTssRule,
}

impl Default for TargetIntensityProjector {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_INTENSITY, TargetTssRule::default())
    }
}

impl TargetIntensityProjector {
    /// An invalid `default_target_intensity` falls back to 70%
    pub fn new(default_target_intensity: f64, tss_rule: TargetTssRule) -> Self {
        let default_target_intensity = if is_valid_target_intensity(default_target_intensity) {
            default_target_intensity
        } else {
            DEFAULT_TARGET_INTENSITY
        };
        Self {
            default_target_intensity,
            tss_rule,
        }
    }

    pub fn from_settings(settings: &CalculationSettings) -> Self {
        Self::new(settings.default_target_intensity, settings.target_tss_rule)
    }

    pub fn tss_rule(&self) -> TargetTssRule {
        self.tss_rule
    }

    /// Resolve the effective target: an explicit request if valid, else the
    /// profile's own target (flat or legacy nested, already collapsed at
    /// deserialization), else the configured default.
    pub fn resolve_target_intensity(&self, requested: Option<f64>, profile: Option<&PowerProfile>) -> f64 {
        requested
            .filter(|v| is_valid_target_intensity(*v))
            .or_else(|| {
                profile
                    .and_then(|p| p.target_intensity)
                    .filter(|v| is_valid_target_intensity(*v))
            })
            .unwrap_or(self.default_target_intensity)
    }

    /// Rescale `metrics` to `target_intensity` percent. An invalid target
    /// resolves to the default; every output is finite.
    pub fn project(&self, metrics: &ScenarioMetrics, target_intensity: f64) -> TargetProjection {
        let target_intensity = self.resolve_target_intensity(Some(target_intensity), None);
        let ratio = target_intensity / 100.0;

        let target_if = finite_or_zero(metrics.average_if * ratio);
        let target_np = finite_or_zero(metrics.average_np * ratio);
        let target_tss = match self.tss_rule {
            TargetTssRule::FromTargetIf => {
                let duration_hours = finite_or_zero(metrics.total_duration / 3600.0);
                finite_or_zero(target_if * target_if * duration_hours * 100.0)
            }
            TargetTssRule::Linear => finite_or_zero(metrics.total_tss * ratio),
        };

        TargetProjection {
            target_intensity,
            target_if,
            target_tss,
            target_np,
        }
    }

    /// Project using the target resolved from `profile`
    pub fn project_for_profile(&self, metrics: &ScenarioMetrics, profile: &PowerProfile) -> TargetProjection {
        let target = self.resolve_target_intensity(None, Some(profile));
        self.project(metrics, target)
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
