//! # Tonic Calibration
//!
//! Derives a new Sa from a few seconds of sung or played tonic. Estimates
//! are collected for a fixed window; the result is the average of the
//! samples close to their median, snapped to the nearest A440 semitone.
//!
//! ```text
//! Idle --start--> Calibrating --(window elapsed | stop)--> outcome --> Idle
//! ```
//!
//! The session never touches the tonic itself. A `Completed` outcome carries
//! the new frequency and the owner decides what to do with it.

use std::fmt;

use log::{debug, info};
use serde::Serialize;

use crate::config::CalibrationConfig;
use crate::error::{Result, SwaraError};
use crate::tuning;

/// Result of a successful calibration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationReport {
    /// New tonic: the snapped equal-tempered frequency, to two decimals.
    pub tonic_hz: f32,
    pub note_number: i32,
    pub note_name: &'static str,
    pub octave: i32,
    /// Average of the samples that survived outlier rejection.
    pub average_hz: f32,
    /// How far the average was from the snapped note, rounded.
    pub cents_off: i32,
    pub samples_used: usize,
    pub samples_collected: usize,
}

/// How a calibration run ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CalibrationOutcome {
    Completed(CalibrationReport),
    /// Samples were collected but none formed a stable pitch.
    Failed { samples_collected: usize },
    /// Nothing usable was heard.
    Cancelled,
}

impl CalibrationOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, CalibrationOutcome::Completed(_))
    }
}

impl fmt::Display for CalibrationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationOutcome::Completed(report) => {
                write!(
                    f,
                    "Calibration complete! Sa Shruti: {}{} ({} Hz)",
                    report.note_name, report.octave, report.tonic_hz
                )?;
                if report.cents_off != 0 {
                    write!(f, " (detected {:+} cents off)", report.cents_off)?;
                }
                Ok(())
            }
            CalibrationOutcome::Failed { .. } => {
                f.write_str("Calibration failed: no stable pitch detected. Please try again.")
            }
            CalibrationOutcome::Cancelled => f.write_str("Calibration cancelled"),
        }
    }
}

/// Snapshot of a running calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalibrationProgress {
    pub elapsed_ms: u64,
    pub remaining_ms: u64,
    pub samples_collected: usize,
}

impl CalibrationProgress {
    /// Remaining time in whole seconds, rounded up.
    pub fn remaining_secs(&self) -> u64 {
        self.remaining_ms.div_ceil(1000)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum State {
    Idle,
    Calibrating { started_at: u64, samples: Vec<f32> },
}

/// Collects tonic estimates over a fixed window.
#[derive(Debug, Clone)]
pub struct CalibrationSession {
    config: CalibrationConfig,
    noise_band_multiplier: f32,
    state: State,
}

impl CalibrationSession {
    /// # Arguments
    /// * `config` - Window length and outlier tolerance
    /// * `noise_band_multiplier` - Estimates above `tonic * multiplier` are ignored
    pub fn new(config: CalibrationConfig, noise_band_multiplier: f32) -> Self {
        Self {
            config,
            noise_band_multiplier,
            state: State::Idle,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Calibrating { .. })
    }

    /// Begins collecting samples.
    ///
    /// # Errors
    /// * `CalibrationActive` - a run is already in progress
    pub fn start(&mut self, now: u64) -> Result<()> {
        if self.is_running() {
            return Err(SwaraError::CalibrationActive);
        }
        debug!("calibration started at {now} ms");
        self.state = State::Calibrating {
            started_at: now,
            samples: Vec::new(),
        };
        Ok(())
    }

    /// Offers one estimate to a running calibration.
    ///
    /// Once the window has elapsed the run finalizes and its outcome is
    /// returned; the estimate passed in that call is not collected. Absent
    /// estimates and estimates above the noise band are ignored.
    pub fn feed(&mut self, estimate: Option<f32>, tonic: f32, now: u64) -> Option<CalibrationOutcome> {
        let started_at = match &self.state {
            State::Calibrating { started_at, .. } => *started_at,
            State::Idle => return None,
        };

        if now.saturating_sub(started_at) >= self.config.duration_ms {
            return self.finalize();
        }

        let ceiling = tonic * self.noise_band_multiplier;
        if let (Some(frequency), State::Calibrating { samples, .. }) = (estimate, &mut self.state) {
            if frequency.is_finite() && frequency > 0.0 && frequency <= ceiling {
                samples.push(frequency);
            }
        }
        None
    }

    /// Finalizes the run if its window has elapsed.
    pub fn poll(&mut self, now: u64) -> Option<CalibrationOutcome> {
        let due = matches!(
            &self.state,
            State::Calibrating { started_at, .. }
                if now.saturating_sub(*started_at) >= self.config.duration_ms
        );
        if due { self.finalize() } else { None }
    }

    /// Ends a running calibration early, accepting what was collected.
    ///
    /// Returns `None` if nothing was running, so a second call is harmless.
    pub fn stop(&mut self) -> Option<CalibrationOutcome> {
        self.finalize()
    }

    /// Computes the outcome from the collected samples and returns to idle.
    pub fn finalize(&mut self) -> Option<CalibrationOutcome> {
        let State::Calibrating { samples, .. } = std::mem::replace(&mut self.state, State::Idle)
        else {
            return None;
        };

        let outcome = evaluate(&samples, self.config.outlier_cents);
        info!("{outcome}");
        Some(outcome)
    }

    pub fn progress(&self, now: u64) -> Option<CalibrationProgress> {
        match &self.state {
            State::Idle => None,
            State::Calibrating {
                started_at,
                samples,
            } => {
                let elapsed_ms = now.saturating_sub(*started_at);
                Some(CalibrationProgress {
                    elapsed_ms,
                    remaining_ms: self.config.duration_ms.saturating_sub(elapsed_ms),
                    samples_collected: samples.len(),
                })
            }
        }
    }
}

/// Turns a set of tonic estimates into a calibration outcome.
///
/// Samples more than `outlier_cents` away from the median are discarded
/// before averaging.
pub fn evaluate(samples: &[f32], outlier_cents: f32) -> CalibrationOutcome {
    if samples.is_empty() {
        return CalibrationOutcome::Cancelled;
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(f32::total_cmp);
    let median = sorted[sorted.len() / 2] as f64;

    let stable: Vec<f64> = samples
        .iter()
        .map(|&s| s as f64)
        .filter(|&s| (1200.0 * (s / median).log2()).abs() < outlier_cents as f64)
        .collect();

    if stable.is_empty() {
        return CalibrationOutcome::Failed {
            samples_collected: samples.len(),
        };
    }

    let average = stable.iter().sum::<f64>() / stable.len() as f64;
    let note_number = tuning::note_from_pitch(average as f32);
    let exact = tuning::frequency_from_note_number(note_number);
    let (note_name, octave) = tuning::note_name(note_number);

    CalibrationOutcome::Completed(CalibrationReport {
        tonic_hz: ((exact * 100.0).round() / 100.0) as f32,
        note_number,
        note_name,
        octave,
        average_hz: average as f32,
        cents_off: (1200.0 * (average / exact).log2()).round() as i32,
        samples_used: stable.len(),
        samples_collected: samples.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TONIC: f32 = 130.81;

    fn session() -> CalibrationSession {
        CalibrationSession::new(CalibrationConfig::default(), 3.0)
    }

    fn completed(outcome: CalibrationOutcome) -> CalibrationReport {
        match outcome {
            CalibrationOutcome::Completed(report) => report,
            other => panic!("expected completed calibration, got {other:?}"),
        }
    }

    #[test]
    fn steady_a3_calibrates_to_220() {
        let mut calibration = session();
        calibration.start(0).unwrap();
        for i in 0..100 {
            assert_eq!(calibration.feed(Some(220.0), TONIC, i * 20), None);
        }

        let report = completed(calibration.finalize().unwrap());
        assert_eq!(report.tonic_hz, 220.0);
        assert_eq!(report.cents_off, 0);
        assert_eq!(report.note_number, 57);
        assert_eq!((report.note_name, report.octave), ("A", 3));
        assert_eq!(report.samples_used, 100);
        assert!(!calibration.is_running());
    }

    #[test]
    fn no_samples_is_cancelled() {
        let mut calibration = session();
        calibration.start(0).unwrap();
        calibration.feed(None, TONIC, 100);
        assert_eq!(calibration.stop(), Some(CalibrationOutcome::Cancelled));
    }

    #[test]
    fn non_finite_samples_fail() {
        assert_eq!(
            evaluate(&[f32::NAN], 50.0),
            CalibrationOutcome::Failed {
                samples_collected: 1
            }
        );
    }

    #[test]
    fn outliers_are_discarded() {
        let mut samples = vec![146.83; 10];
        samples.extend([300.0, 75.0, 160.0]);

        let report = completed(evaluate(&samples, 50.0));
        assert_eq!(report.samples_used, 10);
        assert_eq!(report.samples_collected, 13);
        assert_eq!(report.tonic_hz, 146.83);
        assert_eq!((report.note_name, report.octave), ("D", 3));
    }

    #[test]
    fn sharp_average_snaps_and_reports_cents() {
        let report = completed(evaluate(&[225.0; 20], 50.0));
        assert_eq!(report.tonic_hz, 220.0);
        assert_eq!(report.cents_off, 39);
        assert_eq!(report.average_hz, 225.0);
    }

    #[test]
    fn window_elapsing_finalizes_on_feed() {
        let mut calibration = session();
        calibration.start(1_000).unwrap();
        assert_eq!(calibration.feed(Some(220.0), TONIC, 1_500), None);
        assert_eq!(calibration.feed(Some(221.0), TONIC, 3_999), None);

        let report = completed(calibration.feed(Some(500.0), TONIC, 4_000).unwrap());
        assert_eq!(report.samples_collected, 2);
        assert!(!calibration.is_running());
    }

    #[test]
    fn poll_finalizes_without_estimates() {
        let mut calibration = session();
        calibration.start(0).unwrap();
        assert_eq!(calibration.poll(2_999), None);
        assert_eq!(calibration.poll(3_000), Some(CalibrationOutcome::Cancelled));
        assert_eq!(calibration.poll(3_100), None);
    }

    #[test]
    fn estimates_above_noise_band_are_ignored() {
        let mut calibration = session();
        calibration.start(0).unwrap();
        calibration.feed(Some(TONIC * 3.0 + 1.0), TONIC, 10);
        calibration.feed(Some(-1.0), TONIC, 20);
        assert_eq!(calibration.progress(20).unwrap().samples_collected, 0);
        calibration.feed(Some(TONIC * 3.0), TONIC, 30);
        assert_eq!(calibration.progress(30).unwrap().samples_collected, 1);
    }

    #[test]
    fn start_while_running_is_rejected() {
        let mut calibration = session();
        calibration.start(0).unwrap();
        assert_eq!(calibration.start(10), Err(SwaraError::CalibrationActive));
    }

    #[test]
    fn stop_is_idempotent() {
        let mut calibration = session();
        assert_eq!(calibration.stop(), None);
        calibration.start(0).unwrap();
        calibration.feed(Some(220.0), TONIC, 5);
        assert!(calibration.stop().unwrap().is_completed());
        assert_eq!(calibration.stop(), None);
        assert_eq!(calibration.feed(Some(220.0), TONIC, 10), None);
    }

    #[test]
    fn progress_counts_down() {
        let mut calibration = session();
        assert_eq!(calibration.progress(0), None);
        calibration.start(500).unwrap();
        let progress = calibration.progress(1_700).unwrap();
        assert_eq!(progress.elapsed_ms, 1_200);
        assert_eq!(progress.remaining_ms, 1_800);
        assert_eq!(progress.remaining_secs(), 2);
    }

    #[test]
    fn outcome_messages() {
        let report = completed(evaluate(&[225.0], 50.0));
        assert_eq!(
            CalibrationOutcome::Completed(report).to_string(),
            "Calibration complete! Sa Shruti: A3 (220 Hz) (detected +39 cents off)"
        );
        assert_eq!(CalibrationOutcome::Cancelled.to_string(), "Calibration cancelled");
    }
}
