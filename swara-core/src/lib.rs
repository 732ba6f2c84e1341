// swara-core/src/lib.rs

//! The core logic for the swara tracker.
//! This crate estimates pitch, classifies it against a movable Sa,
//! calibrates the Sa from live input and tracks time spent on each
//! scale degree for raga analysis. It is completely headless and does
//! no audio I/O of its own.

pub mod calibration;
pub mod clock;
pub mod config;
pub mod error;
pub mod fft;
pub mod history;
pub mod pitch;
pub mod session;
pub mod swara;
pub mod tracker;
pub mod tuning;

pub use calibration::{CalibrationOutcome, CalibrationProgress, CalibrationReport, CalibrationSession};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AnalyzerConfig;
pub use error::{Result, SwaraError};
pub use pitch::PitchEstimator;
pub use session::{FrameReport, SwaraSession};
pub use swara::{BaseDegree, Color};
pub use tracker::{NoteDurationTracker, RagaAnalysis, RagaSummary, VariantUsage};
pub use tuning::{SwaraClassification, ToneReference, WesternNote};

/// One block of captured audio.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Mono samples in [-1, 1].
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl AudioFrame {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }
}
