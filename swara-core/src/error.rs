//! Error types shared by the swara core.
//!
//! Loss of signal is never an error here: the estimator reports it as `None`
//! and calibration reports it through its outcome. These variants cover
//! inputs a caller can get wrong.

use thiserror::Error;

/// Errors surfaced by the analysis core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SwaraError {
    /// The tonic reference is zero, negative or not finite.
    #[error("invalid tonic reference: {0} Hz (must be a positive, finite frequency)")]
    InvalidReference(f32),

    /// A frequency to classify is zero, negative or not finite.
    #[error("invalid frequency: {0} Hz")]
    InvalidFrequency(f32),

    /// A degree label that the canonical degree table cannot resolve.
    #[error("unknown degree label: {0:?}")]
    UnknownDegree(String),

    /// `start` was called while a calibration was already collecting samples.
    #[error("calibration is already running")]
    CalibrationActive,

    /// Calibration needs a live estimate source.
    #[error("no active audio input; start capture before calibrating")]
    NoActiveInput,

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, SwaraError>;
