use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PlannerError;
use crate::logging::LogConfig;
use crate::projection::TargetTssRule;
use crate::sampler::EmptyTracePolicy;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Metric calculation parameters
    pub calculation: CalculationSettings,

    /// Zone and timeline analytics
    pub analytics: AnalyticsSettings,

    /// Trace loading
    pub loading: LoadingSettings,

    /// Scenario limits
    pub scenario: ScenarioSettings,

    /// Logging output
    pub logging: LogConfig,
}

/// Parameters of the metrics pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculationSettings {
    /// Target effort percentage used when the profile carries none
    pub default_target_intensity: f64,

    /// Recovery break between consecutive workouts, seconds
    pub rest_between_workouts_secs: u32,

    /// Rolling window for Normalized Power, seconds
    pub np_window_secs: u32,

    /// What to sample for an empty or malformed trace
    pub empty_trace_policy: EmptyTracePolicy,

    /// How target TSS is derived from a target intensity
    pub target_tss_rule: TargetTssRule,
}

impl Default for CalculationSettings {
    fn default() -> Self {
        Self {
            default_target_intensity: 70.0,
            rest_between_workouts_secs: 600,
            np_window_secs: 30,
            empty_trace_policy: EmptyTracePolicy::Placeholder,
            target_tss_rule: TargetTssRule::FromTargetIf,
        }
    }
}

/// Charting analytics settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsSettings {
    /// Width of a timeline bucket, seconds
    pub bucket_size_secs: f64,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            bucket_size_secs: 1800.0,
        }
    }
}

/// Trace loading settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadingSettings {
    /// Upper bound on in-flight trace loads
    pub max_concurrent_loads: usize,

    /// Directory of per-workout JSON trace files
    pub library_dir: Option<PathBuf>,
}

impl Default for LoadingSettings {
    fn default() -> Self {
        Self {
            max_concurrent_loads: 4,
            library_dir: None,
        }
    }
}

/// Scenario limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioSettings {
    /// Maximum workouts in one scenario
    pub max_workouts: usize,
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self { max_workouts: 10 }
    }
}

/// Configuration management implementation
impl PlannerConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: PlannerConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".trainplan")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!(
                    path = %config_path.display(),
                    error = %e,
                    "Config not loaded, using defaults"
                );
                Self::default()
            }
        }
    }

    /// Check that every setting is usable
    pub fn validate(&self) -> std::result::Result<(), PlannerError> {
        let calc = &self.calculation;
        if !(calc.default_target_intensity.is_finite()
            && calc.default_target_intensity > 0.0
            && calc.default_target_intensity <= 200.0)
        {
            return Err(PlannerError::Configuration(format!(
                "default_target_intensity must be in (0, 200], got {}",
                calc.default_target_intensity
            )));
        }
        if calc.np_window_secs == 0 || calc.np_window_secs > 3600 {
            return Err(PlannerError::Configuration(format!(
                "np_window_secs must be between 1 and 3600, got {}",
                calc.np_window_secs
            )));
        }
        if !(self.analytics.bucket_size_secs.is_finite() && self.analytics.bucket_size_secs > 0.0) {
            return Err(PlannerError::Configuration(format!(
                "bucket_size_secs must be positive, got {}",
                self.analytics.bucket_size_secs
            )));
        }
        if self.loading.max_concurrent_loads == 0 {
            return Err(PlannerError::Configuration(
                "max_concurrent_loads must be at least 1".to_string(),
            ));
        }
        if self.scenario.max_workouts == 0 {
            return Err(PlannerError::Configuration(
                "max_workouts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
