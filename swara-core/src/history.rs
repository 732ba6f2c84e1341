//! # Frequency History
//!
//! The recent pitch trace behind the frequency graph, and the swara guide
//! lines drawn across it. Only data lives here; drawing is the caller's job.

use std::collections::VecDeque;

use serde::Serialize;

use crate::swara::{self, Color};

/// Tolerance drawn around each guide line.
const GUIDE_BAND_CENTS: f32 = 50.0;

/// Bounded trace of recent estimates. `None` marks frames without a usable
/// pitch.
#[derive(Debug, Clone)]
pub struct FrequencyHistory {
    capacity: usize,
    entries: VecDeque<Option<f32>>,
}

impl FrequencyHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, frequency: Option<f32>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(frequency);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = Option<f32>> + '_ {
        self.entries.iter().copied()
    }

    pub fn latest(&self) -> Option<f32> {
        self.entries.back().copied().flatten()
    }

    /// Lowest and highest recorded frequency, if any.
    pub fn range(&self) -> Option<(f32, f32)> {
        self.entries.iter().flatten().fold(None, |acc, &f| match acc {
            None => Some((f, f)),
            Some((lo, hi)) => Some((lo.min(f), hi.max(f))),
        })
    }
}

/// One swara reference line on the frequency graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuideLine {
    pub label: &'static str,
    pub semitone: u8,
    pub octave_offset: i32,
    pub frequency: f32,
    /// Band edges, `GUIDE_BAND_CENTS` either side.
    pub lower: f32,
    pub upper: f32,
    pub color: Option<Color>,
    /// Drawn as a labelled line, not just a band: the middle octave and
    /// every Sa.
    pub labelled: bool,
}

impl GuideLine {
    pub fn is_sa(&self) -> bool {
        self.semitone == 0
    }
}

/// Semitone bands for the octave below, at and above the tonic, up to
/// `ceiling`.
///
/// Every semitone gets a band; outside the middle octave only Sa is
/// `labelled`.
pub fn guide_lines(tonic: f32, ceiling: f32) -> Vec<GuideLine> {
    let lower_ratio = 2.0_f32.powf(-GUIDE_BAND_CENTS / 1200.0);
    let upper_ratio = 2.0_f32.powf(GUIDE_BAND_CENTS / 1200.0);

    let mut lines = Vec::new();
    for octave_offset in -1..=1 {
        for semitone in 0..12u8 {
            let frequency =
                tonic * 2.0_f32.powi(octave_offset) * 2.0_f32.powf(semitone as f32 / 12.0);
            if frequency > ceiling {
                continue;
            }
            let label = swara::label_for_semitone(semitone);
            lines.push(GuideLine {
                label,
                semitone,
                octave_offset,
                frequency,
                lower: frequency * lower_ratio,
                upper: frequency * upper_ratio,
                color: swara::label_to_color(label),
                labelled: octave_offset == 0 || semitone == 0,
            });
        }
    }
    lines
}
