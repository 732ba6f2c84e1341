//! # Swara Session
//!
//! Owns every piece of mutable analysis state for one run: the tonic, the
//! calibration session, the duration tracker and the frequency history.
//! The orchestrator hands it one frame at a time and reads typed results
//! back; nothing else mutates the state.

use log::{debug, info};
use serde::Serialize;

use crate::calibration::{CalibrationOutcome, CalibrationProgress, CalibrationSession};
use crate::clock::{Clock, SystemClock};
use crate::config::AnalyzerConfig;
use crate::error::{Result, SwaraError};
use crate::history::{self, FrequencyHistory, GuideLine};
use crate::pitch::PitchEstimator;
use crate::tracker::{NoteDurationTracker, RagaAnalysis};
use crate::tuning::{self, SwaraClassification, ToneReference, WesternNote};
use crate::AudioFrame;

/// Everything derived from one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameReport {
    pub timestamp_ms: u64,
    /// Estimate inside the noise band, if any.
    pub frequency: Option<f32>,
    pub swara: Option<SwaraClassification>,
    pub western: Option<WesternNote>,
    /// Set on the frame that ended a calibration run.
    pub calibration: Option<CalibrationOutcome>,
}

/// Analysis state for one capture run.
pub struct SwaraSession<C: Clock = SystemClock> {
    config: AnalyzerConfig,
    clock: C,
    estimator: PitchEstimator,
    tonic: ToneReference,
    calibration: CalibrationSession,
    tracker: NoteDurationTracker,
    history: FrequencyHistory,
    capturing: bool,
}

impl SwaraSession<SystemClock> {
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock::new())
    }
}

impl<C: Clock> SwaraSession<C> {
    /// # Errors
    /// * `InvalidConfig` / `InvalidReference` - the configuration is unusable
    pub fn with_clock(config: AnalyzerConfig, clock: C) -> Result<Self> {
        config.validate()?;
        let tonic = ToneReference::new(config.default_tonic_hz)?;
        let now = clock.now_ms();

        Ok(Self {
            estimator: PitchEstimator::new(config.estimator),
            tonic,
            calibration: CalibrationSession::new(config.calibration, config.noise_band_multiplier),
            tracker: NoteDurationTracker::new(config.tracking, now),
            history: FrequencyHistory::new(config.history_len),
            capturing: false,
            clock,
            config,
        })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn tonic(&self) -> ToneReference {
        self.tonic
    }

    /// User override of the tonic.
    ///
    /// # Errors
    /// * `InvalidReference` - not a positive, finite frequency; the tonic is kept
    pub fn set_tonic(&mut self, frequency: f32) -> Result<()> {
        self.tonic = ToneReference::new(frequency)?;
        info!("Sa set to {}", self.tonic);
        Ok(())
    }

    /// Estimates above this are treated as noise.
    pub fn noise_ceiling(&self) -> f32 {
        self.tonic.hz() * self.config.noise_band_multiplier
    }

    /// Marks the estimate source as live and restarts note tracking.
    pub fn begin_capture(&mut self) {
        self.capturing = true;
        self.history.clear();
        self.tracker.reset(self.clock.now_ms());
    }

    /// Marks the estimate source as gone. A running calibration is stopped.
    pub fn end_capture(&mut self) -> Option<CalibrationOutcome> {
        self.capturing = false;
        self.tracker.close_segment(self.clock.now_ms());
        self.stop_calibration()
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    /// # Errors
    /// * `NoActiveInput` - capture has not been started
    /// * `CalibrationActive` - a calibration is already running
    pub fn start_calibration(&mut self) -> Result<()> {
        if !self.capturing {
            return Err(SwaraError::NoActiveInput);
        }
        self.calibration.start(self.clock.now_ms())
    }

    /// Ends a running calibration now, applying a completed result.
    pub fn stop_calibration(&mut self) -> Option<CalibrationOutcome> {
        let outcome = self.calibration.stop()?;
        self.apply_calibration(&outcome);
        Some(outcome)
    }

    /// Starts a calibration, or stops the one that is running.
    pub fn toggle_calibration(&mut self) -> Result<Option<CalibrationOutcome>> {
        if self.calibration.is_running() {
            Ok(self.stop_calibration())
        } else {
            self.start_calibration().map(|()| None)
        }
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibration.is_running()
    }

    pub fn calibration_progress(&self) -> Option<CalibrationProgress> {
        self.calibration.progress(self.clock.now_ms())
    }

    /// Finalizes a calibration whose window has run out while no frames
    /// arrived.
    pub fn poll_calibration(&mut self) -> Option<CalibrationOutcome> {
        let outcome = self.calibration.poll(self.clock.now_ms())?;
        self.apply_calibration(&outcome);
        Some(outcome)
    }

    fn apply_calibration(&mut self, outcome: &CalibrationOutcome) {
        if let CalibrationOutcome::Completed(report) = outcome {
            match ToneReference::new(report.tonic_hz) {
                Ok(tonic) => {
                    self.tonic = tonic;
                    self.tracker.reset(self.clock.now_ms());
                }
                Err(e) => debug!("calibrated tonic rejected: {e}"),
            }
        }
    }

    /// Runs the full pipeline on one frame.
    pub fn process_frame(&mut self, frame: &AudioFrame) -> FrameReport {
        let now = self.clock.now_ms();

        let frequency = self
            .estimator
            .estimate(&frame.samples, frame.sample_rate)
            .filter(|&f| f <= self.noise_ceiling());

        let calibration = self.calibration.feed(frequency, self.tonic.hz(), now);
        if let Some(outcome) = &calibration {
            self.apply_calibration(outcome);
        }

        let swara = frequency.and_then(|f| tuning::classify_against(f, self.tonic).ok());
        let western = frequency.and_then(|f| tuning::western_note(f).ok());

        // Only the middle octave is tracked; anything else closes the segment.
        let tracked = swara.filter(|s| s.octave_offset == 0).map(|s| s.label);
        if self.tracker.current_label() != tracked {
            match tracked {
                Some(label) => self.tracker.record_resolved(label, now),
                None => self.tracker.close_segment(now),
            }
        }

        self.history.push(frequency);

        FrameReport {
            timestamp_ms: now,
            frequency,
            swara,
            western,
            calibration,
        }
    }

    pub fn raga_analysis(&self) -> RagaAnalysis {
        self.tracker.summarize(self.clock.now_ms())
    }

    pub fn tracker(&self) -> &NoteDurationTracker {
        &self.tracker
    }

    pub fn history(&self) -> &FrequencyHistory {
        &self.history
    }

    /// Swara guide lines for the current tonic, capped at the noise ceiling.
    pub fn guide_lines(&self) -> Vec<GuideLine> {
        history::guide_lines(self.tonic.hz(), self.noise_ceiling())
    }
}
