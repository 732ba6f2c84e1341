//! # Autocorrelation Module
//!
//! Computes the unnormalized linear autocorrelation used by the pitch
//! estimator, either directly or through RustFFT.
//!
//! Both functions return `c[lag] = Σ x[j]·x[j+lag]` for every lag in
//! `0..signal.len()`, summed over the overlapping region only.

use rustfft::{FftPlanner, num_complex::Complex};

/// Direct O(n²) autocorrelation.
pub fn autocorrelate_direct(signal: &[f32]) -> Vec<f64> {
    let n = signal.len();
    (0..n)
        .map(|lag| {
            signal[..n - lag]
                .iter()
                .zip(&signal[lag..])
                .map(|(&a, &b)| a as f64 * b as f64)
                .sum()
        })
        .collect()
}

/// Autocorrelation via the Wiener-Khinchin theorem.
///
/// The signal is zero-padded to at least twice its length so the circular
/// correlation computed by the FFT equals the linear one.
pub fn autocorrelate_fft(signal: &[f32]) -> Vec<f64> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }
    let padded_len = (2 * n).next_power_of_two();

    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(padded_len);
    let inverse = planner.plan_fft_inverse(padded_len);

    let mut buffer: Vec<Complex<f64>> = signal
        .iter()
        .map(|&s| Complex { re: s as f64, im: 0.0 })
        .chain(std::iter::repeat(Complex { re: 0.0, im: 0.0 }))
        .take(padded_len)
        .collect();

    forward.process(&mut buffer);
    for bin in buffer.iter_mut() {
        // Power spectrum: |X|²
        *bin = Complex {
            re: bin.norm_sqr(),
            im: 0.0,
        };
    }
    inverse.process(&mut buffer);

    // RustFFT does not normalize the inverse transform.
    let scale = padded_len as f64;
    buffer.iter().take(n).map(|c| c.re / scale).collect()
}
