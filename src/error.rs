//! Unified error hierarchy for trainplan
//!
//! Metric calculations never fail; they degrade to zero. Errors only arise
//! from loading workout traces, reading configuration and validating
//! scenarios.

use thiserror::Error;

/// Top-level error type for trainplan operations
#[derive(Debug, Error)]
pub enum PlannerError {
    /// Workout trace loading errors
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Scenario or input validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors loading a single workout trace
#[derive(Debug, Error)]
pub enum LoadError {
    /// No trace exists for the workout id
    #[error("Workout not found: {workout_id}")]
    NotFound { workout_id: String },

    /// The stored record is not a valid trace
    #[error("Invalid trace for {workout_id}: {reason}")]
    Parse { workout_id: String, reason: String },

    /// Reading the record failed
    #[error("Failed to read trace for {workout_id}: {source}")]
    Io {
        workout_id: String,
        #[source]
        source: std::io::Error,
    },

    /// The record holds no usable variant
    #[error("No usable trace variant for {workout_id}")]
    Empty { workout_id: String },
}

impl LoadError {
    pub fn workout_id(&self) -> &str {
        match self {
            LoadError::NotFound { workout_id }
            | LoadError::Parse { workout_id, .. }
            | LoadError::Io { workout_id, .. }
            | LoadError::Empty { workout_id } => workout_id,
        }
    }
}

/// Result type alias for trainplan operations
pub type Result<T> = std::result::Result<T, PlannerError>;

impl PlannerError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PlannerError::Load(LoadError::NotFound { .. }) => ErrorSeverity::Warning,
            PlannerError::Load(LoadError::Empty { .. }) => ErrorSeverity::Warning,
            PlannerError::Validation(_) => ErrorSeverity::Warning,
            PlannerError::Configuration(_) => ErrorSeverity::Error,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            PlannerError::Load(LoadError::NotFound { workout_id }) => {
                format!("Workout '{}' is not in the library", workout_id)
            }
            PlannerError::Load(LoadError::Parse { workout_id, .. }) => {
                format!("Workout '{}' has a corrupted trace file", workout_id)
            }
            PlannerError::Configuration(reason) => {
                format!("Configuration problem: {}. Check your config.toml.", reason)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Error that prevents the operation
    Error,
    /// Warning that doesn't prevent the operation
    Warning,
}
