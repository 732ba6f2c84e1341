//! # Analyzer Configuration
//!
//! Tunable constants for the analysis pipeline. Every section falls back to
//! its defaults, so a config file only needs the values it changes:
//!
//! ```json
//! { "default_tonic_hz": 146.83, "calibration": { "duration_ms": 4000 } }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Result, SwaraError};

/// Default tonic: C3, a common shruti for male voices.
pub const DEFAULT_TONIC_HZ: f32 = 130.81;

/// How the autocorrelation in the pitch estimator is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutocorrelationMethod {
    /// Direct O(n²) sum over every lag.
    #[default]
    Direct,
    /// Zero-padded FFT (Wiener-Khinchin); same values, O(n log n).
    Fft,
}

/// Settings for [`crate::pitch::PitchEstimator`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Frames with RMS below this are treated as silence.
    pub silence_rms: f32,
    /// Edge samples louder than this are trimmed before correlation.
    pub trim_threshold: f32,
    pub method: AutocorrelationMethod,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            silence_rms: 0.01,
            trim_threshold: 0.2,
            method: AutocorrelationMethod::Direct,
        }
    }
}

/// Settings for [`crate::calibration::CalibrationSession`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Length of the sampling window in milliseconds.
    pub duration_ms: u64,
    /// Samples further than this from the median are discarded.
    pub outlier_cents: f32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            duration_ms: 3000,
            outlier_cents: 50.0,
        }
    }
}

/// Settings for [`crate::tracker::NoteDurationTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Minimum tracked time before a raga summary is reported.
    pub min_analysis_ms: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            min_analysis_ms: 5000,
        }
    }
}

/// Top-level configuration for a [`crate::session::SwaraSession`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub default_tonic_hz: f32,
    /// Estimates above `tonic * noise_band_multiplier` are treated as noise.
    pub noise_band_multiplier: f32,
    /// Number of estimates kept for the frequency graph.
    pub history_len: usize,
    pub estimator: EstimatorConfig,
    pub calibration: CalibrationConfig,
    pub tracking: TrackingConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            default_tonic_hz: DEFAULT_TONIC_HZ,
            noise_band_multiplier: 3.0,
            history_len: 300,
            estimator: EstimatorConfig::default(),
            calibration: CalibrationConfig::default(),
            tracking: TrackingConfig::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Checks that every value is usable by the pipeline.
    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, value: f32) -> Result<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(SwaraError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )))
            }
        }

        positive("default_tonic_hz", self.default_tonic_hz)?;
        positive("noise_band_multiplier", self.noise_band_multiplier)?;
        positive("estimator.silence_rms", self.estimator.silence_rms)?;
        positive("estimator.trim_threshold", self.estimator.trim_threshold)?;
        positive("calibration.outlier_cents", self.calibration.outlier_cents)?;

        if self.history_len == 0 {
            return Err(SwaraError::InvalidConfig(
                "history_len must be at least 1".into(),
            ));
        }
        if self.calibration.duration_ms == 0 {
            return Err(SwaraError::InvalidConfig(
                "calibration.duration_ms must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AnalyzerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.calibration.duration_ms, 3000);
        assert_eq!(config.tracking.min_analysis_ms, 5000);
        assert_eq!(config.history_len, 300);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{ "default_tonic_hz": 146.83, "estimator": { "method": "fft" } }"#;
        let config: AnalyzerConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.default_tonic_hz, 146.83);
        assert_eq!(config.estimator.method, AutocorrelationMethod::Fft);
        assert_eq!(config.estimator.silence_rms, 0.01);
        assert_eq!(config.calibration, CalibrationConfig::default());
    }

    #[test]
    fn rejects_non_positive_values() {
        let config = AnalyzerConfig {
            noise_band_multiplier: 0.0,
            ..AnalyzerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SwaraError::InvalidConfig(_))
        ));

        let config = AnalyzerConfig {
            history_len: 0,
            ..AnalyzerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
