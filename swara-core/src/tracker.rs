//! # Note Duration Tracking
//!
//! Accumulates how long each scale degree is held and summarizes which
//! variant of every base degree dominates, the raw material for guessing
//! the raga being sung.

use std::collections::BTreeMap;

use log::{debug, warn};
use serde::Serialize;

use crate::config::TrackingConfig;
use crate::error::{Result, SwaraError};
use crate::swara::{self, BaseDegree, Color};

/// Most-used variant of one base degree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantUsage {
    pub base: BaseDegree,
    pub variant: &'static str,
    pub variant_ms: u64,
    /// Time spent on every variant of this base degree.
    pub group_total_ms: u64,
    /// Share of the group total, rounded to a whole percent.
    pub percentage: u32,
    pub color: Option<Color>,
}

/// Raga usage once enough audio has been tracked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RagaSummary {
    pub elapsed_ms: u64,
    /// One entry per base degree that was heard, in sargam order.
    pub groups: Vec<VariantUsage>,
}

impl RagaSummary {
    pub fn group(&self, base: BaseDegree) -> Option<&VariantUsage> {
        self.groups.iter().find(|g| g.base == base)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RagaAnalysis {
    /// Less than the minimum analysis window has elapsed.
    InsufficientData { elapsed_ms: u64, remaining_ms: u64 },
    Ready(RagaSummary),
}

/// Time-in-note bookkeeping for octave-0 classifications.
#[derive(Debug, Clone)]
pub struct NoteDurationTracker {
    min_analysis_ms: u64,
    durations: BTreeMap<&'static str, u64>,
    /// Label being held and when it started.
    current: Option<(&'static str, u64)>,
    started_at: u64,
}

impl NoteDurationTracker {
    pub fn new(config: TrackingConfig, now: u64) -> Self {
        Self {
            min_analysis_ms: config.min_analysis_ms,
            durations: BTreeMap::new(),
            current: None,
            started_at: now,
        }
    }

    /// Clears all accumulated time and restarts the analysis window.
    pub fn reset(&mut self, now: u64) {
        debug!("note tracking reset at {now} ms");
        self.durations.clear();
        self.current = None;
        self.started_at = now;
    }

    /// Closes the segment of the label being held and starts a new one.
    ///
    /// `None` means the signal was lost: the open segment is closed and
    /// nothing new is tracked.
    ///
    /// # Errors
    /// * `UnknownDegree` - the label is not in the degree table; the tracker
    ///   is left untouched
    pub fn record_transition(&mut self, label: Option<&str>, now: u64) -> Result<()> {
        match label {
            Some(label) => {
                let Some(resolved) = swara::resolve_label(label) else {
                    warn!("ignoring unknown degree label {label:?}");
                    return Err(SwaraError::UnknownDegree(label.to_owned()));
                };
                self.record_resolved(resolved, now);
            }
            None => self.close_segment(now),
        }
        Ok(())
    }

    /// Closes the open segment, if any, and tracks nothing until the next
    /// label.
    pub fn close_segment(&mut self, now: u64) {
        if let Some((held, since)) = self.current.take() {
            *self.durations.entry(held).or_insert(0) += now.saturating_sub(since);
        }
    }

    /// Starts a segment for a label taken from the degree table.
    pub(crate) fn record_resolved(&mut self, label: &'static str, now: u64) {
        self.close_segment(now);
        self.current = Some((label, now));
    }

    /// Accumulated time for a label, not counting an open segment.
    pub fn duration_of(&self, label: &str) -> u64 {
        self.durations.get(label).copied().unwrap_or(0)
    }

    pub fn current_label(&self) -> Option<&'static str> {
        self.current.map(|(label, _)| label)
    }

    pub fn started_at(&self) -> u64 {
        self.started_at
    }

    /// Summarizes variant usage as of `now`.
    ///
    /// The segment still being held counts up to `now`; the tracker itself
    /// is not modified.
    pub fn summarize(&self, now: u64) -> RagaAnalysis {
        let elapsed_ms = now.saturating_sub(self.started_at);
        if elapsed_ms < self.min_analysis_ms {
            return RagaAnalysis::InsufficientData {
                elapsed_ms,
                remaining_ms: self.min_analysis_ms - elapsed_ms,
            };
        }

        let mut durations = self.durations.clone();
        if let Some((held, since)) = self.current {
            *durations.entry(held).or_insert(0) += now.saturating_sub(since);
        }

        let mut groups: BTreeMap<BaseDegree, Vec<(&'static str, u64)>> = BTreeMap::new();
        for (label, ms) in durations {
            if let Some(base) = swara::base_degree(label) {
                groups.entry(base).or_default().push((label, ms));
            }
        }

        let groups = groups
            .into_iter()
            .filter_map(|(base, variants)| {
                let group_total_ms: u64 = variants.iter().map(|(_, ms)| ms).sum();
                let (variant, variant_ms) = variants.into_iter().min_by(|a, b| {
                    b.1.cmp(&a.1)
                        .then_with(|| swara::canonical_index(a.0).cmp(&swara::canonical_index(b.0)))
                        .then_with(|| a.0.cmp(b.0))
                })?;
                let percentage = if group_total_ms > 0 {
                    (variant_ms as f64 / group_total_ms as f64 * 100.0).round() as u32
                } else {
                    0
                };
                Some(VariantUsage {
                    base,
                    variant,
                    variant_ms,
                    group_total_ms,
                    percentage,
                    color: swara::label_to_color(variant),
                })
            })
            .collect();

        RagaAnalysis::Ready(RagaSummary { elapsed_ms, groups })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> NoteDurationTracker {
        NoteDurationTracker::new(TrackingConfig::default(), 0)
    }

    fn ready(analysis: RagaAnalysis) -> RagaSummary {
        match analysis {
            RagaAnalysis::Ready(summary) => summary,
            other => panic!("expected a summary, got {other:?}"),
        }
    }

    #[test]
    fn groups_time_by_base_degree() {
        let mut t = tracker();
        t.record_transition(Some("S"), 0).unwrap();
        t.record_transition(Some("R1"), 1_000).unwrap();
        t.record_transition(Some("S"), 4_000).unwrap();

        let summary = ready(t.summarize(5_000));
        assert_eq!(summary.elapsed_ms, 5_000);
        assert_eq!(summary.groups.len(), 2);

        let sa = summary.group(BaseDegree::Sa).unwrap();
        assert_eq!((sa.variant, sa.group_total_ms, sa.percentage), ("S", 2_000, 100));

        let ri = summary.group(BaseDegree::Ri).unwrap();
        assert_eq!((ri.variant, ri.group_total_ms, ri.percentage), ("R1", 3_000, 100));
    }

    #[test]
    fn signal_loss_closes_segment() {
        let mut t = tracker();
        t.record_transition(Some("P"), 0).unwrap();
        t.record_transition(None, 1_500).unwrap();
        assert_eq!(t.duration_of("P"), 1_500);
        assert_eq!(t.current_label(), None);

        // Silence does not count toward anything.
        t.record_transition(Some("P"), 4_000).unwrap();
        t.record_transition(None, 4_500).unwrap();
        assert_eq!(t.duration_of("P"), 2_000);
    }

    #[test]
    fn summary_is_withheld_before_window() {
        let mut t = tracker();
        t.record_transition(Some("G3"), 0).unwrap();
        t.record_transition(None, 4_900).unwrap();
        assert_eq!(
            t.summarize(4_999),
            RagaAnalysis::InsufficientData {
                elapsed_ms: 4_999,
                remaining_ms: 1
            }
        );
    }

    #[test]
    fn dominant_variant_and_percentage() {
        let mut t = tracker();
        t.record_transition(Some("G3"), 0).unwrap();
        t.record_transition(Some("G2/R3"), 3_000).unwrap();
        t.record_transition(Some("M1"), 4_000).unwrap();
        t.record_transition(None, 6_000).unwrap();

        let summary = ready(t.summarize(6_000));
        let ga = summary.group(BaseDegree::Ga).unwrap();
        assert_eq!(ga.variant, "G3");
        assert_eq!(ga.group_total_ms, 4_000);
        assert_eq!(ga.percentage, 75);
        assert_eq!(ga.color, swara::label_to_color("G3"));

        assert!(summary.group(BaseDegree::Ri).is_none());
        assert_eq!(summary.group(BaseDegree::Ma).unwrap().variant_ms, 2_000);
    }

    #[test]
    fn ties_prefer_canonical_order() {
        let mut t = tracker();
        t.record_transition(Some("D3"), 0).unwrap();
        t.record_transition(Some("D1"), 1_000).unwrap();
        t.record_transition(None, 2_000).unwrap();

        let summary = ready(t.summarize(5_000));
        let dha = summary.group(BaseDegree::Dha).unwrap();
        assert_eq!(dha.variant, "D1");
        assert_eq!(dha.percentage, 50);
    }

    #[test]
    fn reset_clears_everything() {
        let mut t = tracker();
        t.record_transition(Some("N3"), 0).unwrap();
        t.record_transition(None, 2_000).unwrap();
        t.reset(10_000);

        assert_eq!(t.duration_of("N3"), 0);
        assert_eq!(t.started_at(), 10_000);
        assert!(matches!(
            t.summarize(12_000),
            RagaAnalysis::InsufficientData { .. }
        ));
        assert_eq!(ready(t.summarize(15_000)).groups, vec![]);
    }

    #[test]
    fn close_segment_is_idempotent() {
        let mut t = tracker();
        t.record_resolved("M1", 1_000);
        t.close_segment(1_800);
        t.close_segment(2_500);
        assert_eq!(t.duration_of("M1"), 800);
        assert_eq!(t.current_label(), None);
    }

    #[test]
    fn unknown_labels_are_rejected() {
        let mut t = tracker();
        t.record_transition(Some("S"), 0).unwrap();
        assert_eq!(
            t.record_transition(Some("X1"), 500),
            Err(SwaraError::UnknownDegree("X1".into()))
        );
        assert_eq!(t.current_label(), Some("S"));
        assert_eq!(t.duration_of("S"), 0);
    }
}
