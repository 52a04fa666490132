// Copyright (c) 2024 The tactus authors

//! Measure and voice containers.

use super::Event;
use crate::types::TimeSignatureContext;
use serde::{Deserialize, Serialize};

/// A [Measure] is one voice's ordered events for one measure. The events'
/// tick durations must sum exactly to the measure's tick length; generation,
/// normalization, and beaming all preserve that sum.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Measure {
    #[allow(missing_docs)]
    pub events: Vec<Event>,
}
impl Measure {
    #[allow(missing_docs)]
    pub fn new_with(events: Vec<Event>) -> Self {
        Self { events }
    }

    /// The sum of the events' tick durations.
    pub fn total_ticks(&self) -> usize {
        self.events.iter().map(|e| e.duration_ticks).sum()
    }

    /// Whether this measure's events exactly fill the given meter.
    pub fn is_tick_conserving(&self, context: &TimeSignatureContext) -> bool {
        self.total_ticks() == context.measure_ticks()
    }

    /// The measure-relative start tick of each event, in order.
    pub fn onsets(&self) -> Vec<usize> {
        let mut onsets = Vec::with_capacity(self.events.len());
        let mut at = 0;
        for event in &self.events {
            onsets.push(at);
            at += event.duration_ticks;
        }
        onsets
    }

    /// The tick length of the finest written value present, or the whole
    /// measure's length when empty. Drives critical-beat density.
    pub fn finest_ticks(&self, fallback: usize) -> usize {
        self.events
            .iter()
            .map(|e| e.duration_ticks)
            .min()
            .unwrap_or(fallback)
    }

    /// Whether any event sounds (is a note rather than a rest).
    pub fn has_onset(&self) -> bool {
        self.events.iter().any(|e| !e.is_rest)
    }
}

/// A [Voice] is an ordered sequence of measures, one per generated measure
/// index. Two voices may coexist in one exercise.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Voice {
    /// 1 or 2; matches [Event::voice] in every contained event.
    pub number: u8,
    #[allow(missing_docs)]
    pub measures: Vec<Measure>,
}
impl Voice {
    #[allow(missing_docs)]
    pub fn new_with(number: u8, measures: Vec<Measure>) -> Self {
        Self { number, measures }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Divisions, DurationSpec, NoteValue, TimeSignature};

    #[test]
    fn tick_conservation_is_checked_against_the_meter() {
        let d = Divisions::default();
        let ctx = TimeSignatureContext::new_with(TimeSignature::COMMON_TIME, d, 0);
        let full = Measure::new_with(vec![
            Event::note(DurationSpec::plain(NoteValue::Half), d, 1),
            Event::rest(DurationSpec::plain(NoteValue::Half), d, 1),
        ]);
        assert!(full.is_tick_conserving(&ctx));
        assert_eq!(full.onsets(), vec![0, 48]);

        let short = Measure::new_with(vec![Event::note(
            DurationSpec::plain(NoteValue::Half),
            d,
            1,
        )]);
        assert!(!short.is_tick_conserving(&ctx));
    }

    #[test]
    fn finest_ticks_reports_the_densest_value() {
        let d = Divisions::default();
        let m = Measure::new_with(vec![
            Event::note(DurationSpec::plain(NoteValue::Quarter), d, 1),
            Event::note(DurationSpec::plain(NoteValue::Sixteenth), d, 1),
        ]);
        assert_eq!(m.finest_ticks(96), 6);
        assert_eq!(Measure::default().finest_ticks(96), 96);
    }
}
