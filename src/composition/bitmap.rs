// Copyright (c) 2024 The tactus authors

//! Step bitmaps for the metronome and ostinato voices, and the persisted
//! form they reconcile from.

use crate::types::TimeSignatureContext;
use bit_vec::BitVec;
use derivative::Derivative;
use serde::{Deserialize, Serialize};

/// The live, shape-checked step pattern. One bit per step; a set bit sounds.
/// The shape (steps per bar) is always derived from the current meter, so a
/// [PatternBitmap] can never be inconsistent with the measure it drives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatternBitmap {
    /// Steps per main beat, 1..=4.
    subdivision: usize,
    /// Pattern length in bars before it repeats: 1, 2, or 4.
    bars: usize,
    steps_per_bar: usize,
    steps: BitVec,
}
impl PatternBitmap {
    /// The default pattern for a shape: one sounding step at the start of
    /// each subdivision group (one click per main beat).
    pub fn default_for(steps_per_bar: usize, subdivision: usize, bars: usize) -> Self {
        let len = steps_per_bar * bars;
        let mut steps = BitVec::from_elem(len, false);
        let mut i = 0;
        while i < len {
            steps.set(i, true);
            i += subdivision;
        }
        Self {
            subdivision,
            bars,
            steps_per_bar,
            steps,
        }
    }

    #[allow(missing_docs)]
    pub fn subdivision(&self) -> usize {
        self.subdivision
    }

    #[allow(missing_docs)]
    pub fn bars(&self) -> usize {
        self.bars
    }

    #[allow(missing_docs)]
    pub fn steps_per_bar(&self) -> usize {
        self.steps_per_bar
    }

    /// Total steps before the pattern repeats.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Whether the given step sounds. Steps past the pattern length cycle.
    pub fn is_active(&self, step: usize) -> bool {
        if self.steps.is_empty() {
            return false;
        }
        self.steps.get(step % self.steps.len()).unwrap_or(false)
    }

    /// Whether the given step starts a subdivision group (an accented click).
    pub fn is_group_start(&self, step: usize) -> bool {
        step % self.subdivision == 0
    }

    /// The persistable form of this pattern.
    pub fn to_stored(&self, enabled: bool) -> StoredPattern {
        StoredPattern {
            enabled,
            subdivision: self.subdivision,
            bars: self.bars,
            steps: self.steps.iter().map(|b| b as u8).collect(),
            version: StoredPattern::VERSION,
        }
    }
}

/// The versioned persisted form of a step pattern. Reconciliation against the
/// current meter happens on load, never lazily.
#[derive(Clone, Debug, Derivative, PartialEq, Eq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(rename_all = "kebab-case")]
pub struct StoredPattern {
    #[allow(missing_docs)]
    pub enabled: bool,
    /// Steps per main beat; valid values 1..=4.
    #[derivative(Default(value = "1"))]
    pub subdivision: usize,
    /// Bars before the pattern repeats; valid values 1, 2, 4.
    #[derivative(Default(value = "1"))]
    pub bars: usize,
    /// One byte per step, nonzero = sounding.
    pub steps: Vec<u8>,
    #[allow(missing_docs)]
    #[derivative(Default(value = "StoredPattern::VERSION"))]
    pub version: u32,
}
impl StoredPattern {
    /// The current schema version.
    pub const VERSION: u32 = 1;
}

/// Turns a persisted pattern into a live one, or regenerates the default when
/// the stored shape doesn't fit the current meter. A stale pattern is never
/// left at an inconsistent size.
pub fn reconcile(stored: &StoredPattern, context: &TimeSignatureContext) -> PatternBitmap {
    let subdivision = if (1..=4).contains(&stored.subdivision) {
        stored.subdivision
    } else {
        1
    };
    let bars = if matches!(stored.bars, 1 | 2 | 4) {
        stored.bars
    } else {
        1
    };
    let steps_per_bar = context.steps_per_bar(subdivision);
    let expected_len = steps_per_bar * bars;

    if stored.version != StoredPattern::VERSION
        || subdivision != stored.subdivision
        || bars != stored.bars
        || stored.steps.len() != expected_len
    {
        return PatternBitmap::default_for(steps_per_bar, subdivision, bars);
    }

    let mut steps = BitVec::from_elem(expected_len, false);
    for (i, byte) in stored.steps.iter().enumerate() {
        if *byte != 0 {
            steps.set(i, true);
        }
    }
    PatternBitmap {
        subdivision,
        bars,
        steps_per_bar,
        steps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Divisions, TimeSignature};

    fn ctx(top: usize, bottom: usize) -> TimeSignatureContext {
        TimeSignatureContext::new_with(
            TimeSignature::new_with(top, bottom).unwrap(),
            Divisions::default(),
            0,
        )
    }

    #[test]
    fn default_pattern_clicks_on_each_beat() {
        let p = PatternBitmap::default_for(8, 2, 1);
        assert_eq!(p.len(), 8);
        for step in 0..8 {
            assert_eq!(
                p.is_active(step),
                step % 2 == 0,
                "subdivision-group starts sound, off-steps don't (step {step})"
            );
        }
        // Cycling past the end repeats the bar.
        assert!(p.is_active(8));
        assert!(!p.is_active(9));
    }

    #[test]
    fn matching_stored_pattern_round_trips() {
        let context = ctx(4, 4);
        let original = PatternBitmap::default_for(context.steps_per_bar(2), 2, 1);
        let stored = original.to_stored(true);
        assert_eq!(reconcile(&stored, &context), original);
    }

    #[test]
    fn shape_mismatch_regenerates_the_default() {
        // A 3/4 pattern (6 steps at subdivision 2) loaded
        // under 4/4 (8 steps) must come back as the 4/4 default.
        let saved_under = ctx(3, 4);
        let stored = PatternBitmap::default_for(saved_under.steps_per_bar(2), 2, 1).to_stored(true);
        assert_eq!(stored.steps.len(), 6);

        let loaded_under = ctx(4, 4);
        let reconciled = reconcile(&stored, &loaded_under);
        assert_eq!(reconciled.len(), 8);
        assert_eq!(
            reconciled,
            PatternBitmap::default_for(8, 2, 1),
            "mismatched length must regenerate the default"
        );
    }

    #[test]
    fn invalid_fields_fall_back_to_defaults() {
        let context = ctx(4, 4);
        let stored = StoredPattern {
            enabled: true,
            subdivision: 9,
            bars: 3,
            steps: vec![1; 12],
            version: StoredPattern::VERSION,
        };
        let reconciled = reconcile(&stored, &context);
        assert_eq!(reconciled.subdivision(), 1);
        assert_eq!(reconciled.bars(), 1);
        assert_eq!(reconciled.len(), 4);
    }

    #[test]
    fn version_mismatch_regenerates() {
        let context = ctx(4, 4);
        let mut stored = PatternBitmap::default_for(4, 1, 1).to_stored(true);
        stored.version = 99;
        stored.steps = vec![0, 0, 0, 1];
        assert_eq!(
            reconcile(&stored, &context),
            PatternBitmap::default_for(4, 1, 1)
        );
    }
}
