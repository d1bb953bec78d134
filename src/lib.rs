// Library interface for trainplan modules
// This allows the CLI, integration tests and benchmarks to share the core

pub mod config;
pub mod error;
pub mod loader;
pub mod logging;
pub mod models;
pub mod projection;
pub mod report;
pub mod sampler;
pub mod scenario;
pub mod tss;
pub mod zones;

// Re-export commonly used types for convenience
pub use models::*;
pub use config::PlannerConfig;
pub use error::{LoadError, PlannerError, Result};
pub use loader::{calculate_combined_metrics_dynamic, load_traces, FileTraceLoader, InMemoryTraceLoader, TraceLoader};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use projection::{TargetIntensityProjector, TargetTssRule};
pub use report::{format_duration, ScenarioReport};
pub use sampler::{EmptyTracePolicy, PowerSeriesSampler};
pub use scenario::{calculate_combined_metrics, ScenarioAggregator, ScenarioComparison};
pub use tss::{calculate_all_training_metrics, TssCalculator};
pub use zones::{build_timeline, PowerZone, TimeBucketer, ZoneClassifier, ZoneDistribution};
