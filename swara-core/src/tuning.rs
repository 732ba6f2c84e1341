//! # Tuning Module
//!
//! Maps frequencies onto scale degrees. Two references are supported:
//!
//! - the movable tonic (Sa), for Carnatic swara classification;
//! - A4 = 440 Hz equal temperament, for the Western note readout and for
//!   snapping a calibrated tonic onto a standard pitch.

use std::fmt;

use serde::Serialize;

use crate::error::{Result, SwaraError};
use crate::swara::{self, BaseDegree};

/// Note names by pitch class, starting at C.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// MIDI note number of A4.
const A4_NOTE: i32 = 69;
const A4_FREQUENCY: f64 = 440.0;

/// A validated tonic frequency.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct ToneReference(f32);

impl ToneReference {
    pub fn new(frequency: f32) -> Result<Self> {
        if frequency.is_finite() && frequency > 0.0 {
            Ok(Self(frequency))
        } else {
            Err(SwaraError::InvalidReference(frequency))
        }
    }

    pub fn hz(self) -> f32 {
        self.0
    }
}

impl fmt::Display for ToneReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz", self.0)
    }
}

/// Where a frequency sits relative to the tonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SwaraClassification {
    /// Degree label; composite for shared pitch classes (e.g. `"R2/G1"`).
    pub label: &'static str,
    pub base: BaseDegree,
    /// Octaves above (positive) or below (negative) the reference octave.
    pub octave_offset: i32,
    /// Rounded distance from Sa in semitones.
    pub semitones_from_sa: i32,
    /// Pitch class above Sa, 0-11.
    pub note_in_octave: u8,
    /// Deviation from the rounded semitone, `floor(1200 * fraction)`. Twelve
    /// times the musical cent, so the range is [-600, 600).
    pub cents_off: i32,
}

impl fmt::Display for SwaraClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.octave_offset {
            0 => f.write_str(self.label),
            o if o > 0 => write!(f, "{} (+{})", self.label, o),
            o => write!(f, "{} ({})", self.label, o),
        }
    }
}

/// Rounds to the nearest integer, halves toward positive infinity.
fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

fn validate_frequency(frequency: f32) -> Result<()> {
    if frequency.is_finite() && frequency > 0.0 {
        Ok(())
    } else {
        Err(SwaraError::InvalidFrequency(frequency))
    }
}

/// Classifies a frequency against a tonic.
///
/// # Errors
/// * `InvalidReference` - `tonic` is not a positive, finite frequency
/// * `InvalidFrequency` - `frequency` is not a positive, finite frequency
pub fn classify(frequency: f32, tonic: f32) -> Result<SwaraClassification> {
    let tonic = ToneReference::new(tonic)?;
    classify_against(frequency, tonic)
}

/// Classifies a frequency against an already validated tonic.
pub fn classify_against(frequency: f32, tonic: ToneReference) -> Result<SwaraClassification> {
    validate_frequency(frequency)?;

    let exact = 12.0 * (frequency as f64 / tonic.hz() as f64).log2();
    let semitones = round_half_up(exact);

    let mut octave_offset = (semitones / 12.0).floor() as i32;
    let mut note_in_octave = (semitones as i32).rem_euclid(12) as u8;

    // A position this close under the next octave's Sa is reported as that Sa.
    let position = exact - 12.0 * octave_offset as f64;
    if note_in_octave >= 11 && 12.0 - position < 0.5 {
        octave_offset += 1;
        note_in_octave = 0;
    }

    let label = swara::label_for_semitone(note_in_octave);
    let base = swara::base_degree(label).unwrap_or(BaseDegree::Sa);

    Ok(SwaraClassification {
        label,
        base,
        octave_offset,
        semitones_from_sa: semitones as i32,
        note_in_octave,
        cents_off: (1200.0 * (exact - semitones)).floor() as i32,
    })
}

/// Calculates the deviation from a target frequency in cents.
///
/// Positive values are sharp, negative values flat.
pub fn cents_deviation(freq: f32, target_freq: f32) -> f32 {
    (1200.0 * (freq as f64 / target_freq as f64).log2()) as f32
}

/// Nearest equal-tempered MIDI note number (A4 = 69).
pub fn note_from_pitch(frequency: f32) -> i32 {
    let note = 12.0 * (frequency as f64 / A4_FREQUENCY).log2();
    round_half_up(note) as i32 + A4_NOTE
}

/// Exact equal-tempered frequency of a MIDI note number.
pub fn frequency_from_note_number(note: i32) -> f64 {
    A4_FREQUENCY * 2.0_f64.powf((note - A4_NOTE) as f64 / 12.0)
}

/// Name and octave of a MIDI note number, e.g. `("A", 3)` for 57.
pub fn note_name(note: i32) -> (&'static str, i32) {
    (
        NOTE_NAMES[note.rem_euclid(12) as usize],
        note.div_euclid(12) - 1,
    )
}

/// Western readout of a frequency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WesternNote {
    pub note_number: i32,
    pub name: &'static str,
    pub octave: i32,
    /// Detune from the nearest note, floored to whole cents.
    pub cents: i32,
}

impl fmt::Display for WesternNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.octave)
    }
}

/// Finds the nearest A440 note to a frequency.
pub fn western_note(frequency: f32) -> Result<WesternNote> {
    validate_frequency(frequency)?;
    let note_number = note_from_pitch(frequency);
    let (name, octave) = note_name(note_number);
    let exact = frequency_from_note_number(note_number);
    let cents = (1200.0 * (frequency as f64 / exact).log2()).floor() as i32;
    Ok(WesternNote {
        note_number,
        name,
        octave,
        cents,
    })
}
