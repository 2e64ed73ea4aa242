// src/error.rs
//! Unified error handling for the force-learning pipeline
//!
//! Every stage reports failures through [`ForceError`]. Errors carry enough
//! identity (file path, subject/day, combination) to be logged where they are
//! contained, and [`ForceError::scope`] tells the caller how far a failure is
//! allowed to propagate:
//!
//! - [`ErrorScope::Recording`] skips one recording, the batch continues
//! - [`ErrorScope::Group`] skips one (subject, day) group
//! - [`ErrorScope::Run`] leaves a gap for one sweep combination
//! - [`ErrorScope::Global`] aborts before any work starts

use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Unified error type for the experiment pipeline
#[derive(Error, Debug)]
pub enum ForceError {
    /// Recording filename does not follow the expected token structure
    #[error("[IDENTITY] Malformed recording name '{path}': {reason}")]
    MalformedName { path: String, reason: String },

    /// Conflicting or invalid configuration
    #[error("[CONFIG] Configuration error in {component}: {reason}")]
    Config { component: String, reason: String },

    /// MVC recording unusable for calibration
    #[error("[CALIBRATION] {reason}")]
    Calibration { reason: String },

    /// A force channel has no entry in the calibration profile
    #[error("[CALIBRATION] No calibration for force channel {channel}")]
    MissingCalibration { channel: usize },

    /// Fewer trials in a (subject, day) group than requested folds
    #[error("[SPLIT] Subject {subject} day {day}: {trials} trial(s) cannot form {splits} split(s)")]
    InsufficientTrials {
        subject: String,
        day: String,
        trials: usize,
        splits: usize,
    },

    /// One side of a split produced no rows
    #[error("[ASSEMBLY] {side} side of split {split} has no rows")]
    EmptySplit { side: SplitSide, split: usize },

    /// Matrix dimensions disagree
    #[error("[SHAPE] {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: String,
        actual: String,
    },

    /// Predictor identifier not in the recognized set
    #[error("[PIPELINE] Unknown predictor '{0}'")]
    UnknownPredictor(String),

    /// Requested column is absent from a feature table
    #[error("[ASSEMBLY] Column '{column}' missing from {recording}")]
    MissingColumn { column: String, recording: String },

    /// Input data violates a table invariant
    #[error("[DATA] Invalid {data_type}: {reason}")]
    InvalidData { data_type: String, reason: String },

    /// Numerical failure while fitting a regressor
    #[error("[PIPELINE] {predictor} fit failed: {reason}")]
    Fit { predictor: String, reason: String },

    /// Iterative fit overran its wall-clock budget
    #[error("[PIPELINE] {predictor} fit exceeded budget of {budget_ms} ms")]
    FitBudgetExceeded { predictor: String, budget_ms: u64 },

    /// Table or artifact could not be read or written
    #[error("[STORAGE] {path}: {reason}")]
    Storage { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Train or test side of a split
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitSide {
    Train,
    Test,
}

impl fmt::Display for SplitSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitSide::Train => write!(f, "train"),
            SplitSide::Test => write!(f, "test"),
        }
    }
}

/// How far an error is allowed to propagate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    /// Contained to a single recording
    Recording,
    /// Contained to a single (subject, day) group
    Group,
    /// Contained to a single sweep combination
    Run,
    /// Aborts the whole invocation
    Global,
}

impl ForceError {
    /// Propagation scope of this error
    pub fn scope(&self) -> ErrorScope {
        match self {
            ForceError::MalformedName { .. }
            | ForceError::Calibration { .. }
            | ForceError::MissingCalibration { .. }
            | ForceError::InvalidData { .. }
            | ForceError::Storage { .. } => ErrorScope::Recording,
            ForceError::InsufficientTrials { .. } => ErrorScope::Group,
            ForceError::EmptySplit { .. }
            | ForceError::ShapeMismatch { .. }
            | ForceError::UnknownPredictor(_)
            | ForceError::MissingColumn { .. }
            | ForceError::Fit { .. }
            | ForceError::FitBudgetExceeded { .. } => ErrorScope::Run,
            ForceError::Config { .. }
            | ForceError::Io(_)
            | ForceError::Json(_)
            | ForceError::Toml(_) => ErrorScope::Global,
        }
    }

    /// Whether processing may continue past this error
    pub fn is_contained(&self) -> bool {
        self.scope() != ErrorScope::Global
    }

    pub fn config(component: &str, reason: impl Into<String>) -> Self {
        ForceError::Config {
            component: component.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_data(data_type: &str, reason: impl Into<String>) -> Self {
        ForceError::InvalidData {
            data_type: data_type.to_string(),
            reason: reason.into(),
        }
    }

    pub fn shape_mismatch(
        context: &str,
        expected: impl fmt::Display,
        actual: impl fmt::Display,
    ) -> Self {
        ForceError::ShapeMismatch {
            context: context.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

/// Result type alias for pipeline operations
pub type ForceResult<T> = Result<T, ForceError>;

/// Convenience trait for attaching a path to foreign errors
pub trait IntoForceError<T> {
    fn storage_err(self, path: &Path) -> ForceResult<T>;
}

impl<T, E> IntoForceError<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn storage_err(self, path: &Path) -> ForceResult<T> {
        self.map_err(|err| ForceError::Storage {
            path: path.display().to_string(),
            reason: err.to_string(),
        })
    }
}
