//! # Pitch Detection Module
//!
//! Monophonic fundamental-frequency estimation with the ACF2+ algorithm:
//! an unnormalized autocorrelation over an edge-trimmed frame, a search for
//! the strongest peak past the zero-lag lobe, and parabolic interpolation for
//! sub-sample lag precision.
//!
//! The estimator is a pure function of its input. Silence, frames that trim
//! down to almost nothing and correlations without a usable peak all come
//! back as `None`.

use crate::config::{AutocorrelationMethod, EstimatorConfig};
use crate::fft;

/// Estimates the pitch of a frame with the default settings.
///
/// # Returns
/// * `Some(frequency)` - Detected frequency in Hz
/// * `None` - No discernible pitch
pub fn estimate_pitch(signal: &[f32], sample_rate: u32) -> Option<f32> {
    PitchEstimator::default().estimate(signal, sample_rate)
}

/// ACF2+ pitch estimator.
#[derive(Debug, Clone, Copy, Default)]
pub struct PitchEstimator {
    config: EstimatorConfig,
}

impl PitchEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Estimates the fundamental frequency of one frame.
    ///
    /// # Arguments
    /// * `signal` - Samples in [-1, 1]
    /// * `sample_rate` - Sample rate in Hz
    ///
    /// # Returns
    /// * `Some(frequency)` - Detected frequency in Hz
    /// * `None` - Silence, or no usable correlation peak
    pub fn estimate(&self, signal: &[f32], sample_rate: u32) -> Option<f32> {
        if signal.is_empty() || sample_rate == 0 {
            return None;
        }

        // --- Noise gate ---
        if rms(signal) < self.config.silence_rms {
            return None;
        }

        // --- Trim attack/release edges ---
        let trimmed = trim_edges(signal, self.config.trim_threshold);
        if trimmed.len() <= 2 {
            return None;
        }

        let c = match self.config.method {
            AutocorrelationMethod::Direct => fft::autocorrelate_direct(trimmed),
            AutocorrelationMethod::Fft => fft::autocorrelate_fft(trimmed),
        };

        let period = find_period(&c)?;
        let frequency = (sample_rate as f64 / period) as f32;

        if frequency.is_finite() && frequency > 0.0 {
            Some(frequency)
        } else {
            None
        }
    }
}

/// Root-mean-square amplitude of a frame.
pub fn rms(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    let sum: f64 = signal.iter().map(|&s| s as f64 * s as f64).sum();
    (sum / signal.len() as f64).sqrt() as f32
}

/// Drops the loud edges of a frame.
///
/// The first quiet sample in the leading half becomes the start; the first
/// quiet sample scanning back through the trailing half becomes the
/// (exclusive) end. Without a quiet sample the respective edge is kept.
fn trim_edges(signal: &[f32], threshold: f32) -> &[f32] {
    let size = signal.len();
    let half = size.div_ceil(2);

    let start = (0..half)
        .find(|&i| signal[i].abs() < threshold)
        .unwrap_or(0);
    let end = (1..half)
        .map(|i| size - i)
        .find(|&i| signal[i].abs() < threshold)
        .unwrap_or(size - 1);

    if start >= end {
        &[]
    } else {
        &signal[start..end]
    }
}

/// Finds the fundamental period, in fractional samples, from an
/// autocorrelation.
fn find_period(c: &[f64]) -> Option<f64> {
    let n = c.len();

    // Walk down the zero-lag lobe. A correlation that never rises again has
    // no period.
    let mut d = 0;
    while d + 1 < n && c[d] > c[d + 1] {
        d += 1;
    }
    if d + 1 >= n {
        return None;
    }

    let mut t0 = d;
    for (lag, &value) in c.iter().enumerate().skip(d) {
        if value > c[t0] {
            t0 = lag;
        }
    }
    if t0 == 0 {
        return None;
    }

    // Parabolic interpolation around the peak. Needs a neighbour on each side.
    let mut period = t0 as f64;
    if t0 + 1 < n {
        let (x1, x2, x3) = (c[t0 - 1], c[t0], c[t0 + 1]);
        let a = (x1 + x3 - 2.0 * x2) / 2.0;
        let b = (x3 - x1) / 2.0;
        if a != 0.0 {
            period -= b / (2.0 * a);
        }
    }

    if period.is_finite() && period > 0.0 {
        Some(period)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 44_100;

    fn sine(frequency: f32, amplitude: f32, len: usize) -> Vec<f32> {
        sine_at(frequency, amplitude, len, SAMPLE_RATE)
    }

    fn sine_at(frequency: f32, amplitude: f32, len: usize, sample_rate: u32) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
            })
            .collect()
    }

    fn assert_within_one_percent(expected: f32, actual: Option<f32>) {
        let actual = actual.unwrap_or_else(|| panic!("no pitch for {expected} Hz"));
        let error = (actual - expected).abs() / expected;
        assert!(
            error < 0.01,
            "expected {expected} Hz, got {actual} Hz ({:.3}% off)",
            error * 100.0
        );
    }

    #[test]
    fn detects_sines_across_vocal_range() {
        for &frequency in &[80.0, 130.81, 220.0, 440.0, 660.0, 1000.0] {
            let signal = sine(frequency, 0.5, 4096);
            assert_within_one_percent(frequency, estimate_pitch(&signal, SAMPLE_RATE));
        }
    }

    #[test]
    fn two_periods_are_enough() {
        for &sample_rate in &[44_100u32, 48_000] {
            for &frequency in &[80.0f32, 220.0, 1000.0] {
                let len = (2.0 * sample_rate as f32 / frequency).ceil() as usize;
                let signal = sine_at(frequency, 0.5, len, sample_rate);
                assert_within_one_percent(frequency, estimate_pitch(&signal, sample_rate));
            }
        }
    }

    #[test]
    fn detects_quiet_sine() {
        let signal = sine(261.63, 0.1, 2048);
        assert_within_one_percent(261.63, estimate_pitch(&signal, SAMPLE_RATE));
    }

    #[test]
    fn fft_method_agrees_with_direct() {
        let direct = PitchEstimator::default();
        let fft = PitchEstimator::new(EstimatorConfig {
            method: AutocorrelationMethod::Fft,
            ..EstimatorConfig::default()
        });

        for &frequency in &[146.83, 293.66, 587.33] {
            let signal = sine(frequency, 0.4, 2048);
            let a = direct.estimate(&signal, SAMPLE_RATE).unwrap();
            let b = fft.estimate(&signal, SAMPLE_RATE).unwrap();
            assert!((a - b).abs() / a < 1e-3, "direct {a} vs fft {b}");
        }
    }

    #[test]
    fn silence_has_no_pitch() {
        assert_eq!(estimate_pitch(&[0.0; 2048], SAMPLE_RATE), None);
        assert_eq!(estimate_pitch(&sine(220.0, 0.005, 2048), SAMPLE_RATE), None);
    }

    #[test]
    fn empty_or_tiny_frames_have_no_pitch() {
        assert_eq!(estimate_pitch(&[], SAMPLE_RATE), None);
        assert_eq!(estimate_pitch(&[0.5, 0.5, 0.5], SAMPLE_RATE), None);
        assert_eq!(estimate_pitch(&sine(220.0, 0.5, 2048), 0), None);
    }

    #[test]
    fn monotonic_correlation_has_no_pitch() {
        // A constant offset correlates less at every lag: no peak to lock onto.
        assert_eq!(estimate_pitch(&[0.1; 1024], SAMPLE_RATE), None);
    }

    #[test]
    fn loud_edges_are_trimmed() {
        let signal = [0.9, 0.8, 0.1, 0.0, -0.1, 0.0, 0.1, 0.9];
        assert_eq!(trim_edges(&signal, 0.2), &signal[2..6]);
    }

    #[test]
    fn period_search_refines_between_lags() {
        // Symmetric peak at lag 4 stays put; a skewed one moves toward the
        // larger neighbour.
        let symmetric = [10.0, 4.0, 1.0, 5.0, 8.0, 5.0, 1.0];
        assert_eq!(find_period(&symmetric), Some(4.0));

        let skewed = [10.0, 4.0, 1.0, 5.0, 8.0, 7.0, 1.0];
        let period = find_period(&skewed).unwrap();
        assert!(period > 4.0 && period < 5.0);
    }

    #[test]
    fn rms_of_constant_signal() {
        assert!((rms(&[0.5; 16]) - 0.5).abs() < 1e-6);
        assert_eq!(rms(&[]), 0.0);
    }
}
