// Copyright (c) 2024 The tactus authors

//! The calibration matcher: judges real-time input against the expected
//! onset timeline within tempo-adaptive tolerance windows.

use super::{PlaybackEvent, ScoreRef};
use crate::{
    composition::VoiceMode,
    types::{Seconds, Tempo},
};
use midly::MidiMessage;
use rustc_hash::FxHashMap;

/// Window width as a fraction of one beat.
pub const WINDOW_BEAT_FRACTION: f64 = 0.22;
/// Window floor in seconds, so fast tempos stay playable.
pub const WINDOW_MIN: f64 = 0.07;
/// Window ceiling in seconds, so slow tempos stay demanding.
pub const WINDOW_MAX: f64 = 0.26;
/// The session's first event absorbs startup latency, so its late bound is
/// doubled. The early bound stays at the base window.
pub const FIRST_EVENT_SCALE: f64 = 2.0;
/// Multi-target (two-voice) events get extra late slack.
pub const CHORD_SCALE: f64 = 1.5;

/// Which MIDI key splits the keyboard into the two logical voices.
const VOICE_SPLIT_KEY: u8 = 60;

/// The verdict on one expected onset.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Judgment {
    #[allow(missing_docs)]
    Correct,
    #[allow(missing_docs)]
    Wrong,
}

/// One judgable expected onset for one voice. Judgment is monotonic: once
/// set, it never changes and is never set twice.
#[derive(Clone, Debug)]
pub struct CalibrationTarget {
    /// Seconds from the playback start anchor.
    pub expected_time: Seconds,
    #[allow(missing_docs)]
    pub voice: u8,
    /// The rendered elements this verdict annotates: the struck note plus
    /// every member of its tied chain.
    pub score_refs: Vec<ScoreRef>,
    judgment: Option<Judgment>,
}
impl CalibrationTarget {
    #[allow(missing_docs)]
    pub fn judgment(&self) -> Option<Judgment> {
        self.judgment
    }

    fn judge(&mut self, judgment: Judgment) {
        if self.judgment.is_none() {
            self.judgment = Some(judgment);
        }
    }
}

/// One judgable instant: every target that shares an onset time. A two-voice
/// simultaneous onset is one event with two targets.
#[derive(Clone, Debug)]
pub struct CalibrationEvent {
    #[allow(missing_docs)]
    pub time: Seconds,
    #[allow(missing_docs)]
    pub targets: Vec<CalibrationTarget>,
}
impl CalibrationEvent {
    fn is_judged(&self) -> bool {
        self.targets.iter().all(|t| t.judgment.is_some())
    }
}

/// [CalibrationMatcher] consumes asynchronous input events and matches each
/// to the nearest unjudged expected onset. It always makes forward progress:
/// an onset whose window has elapsed is judged wrong by the overdue sweep,
/// never left pending.
#[derive(Debug)]
pub struct CalibrationMatcher {
    events: Vec<CalibrationEvent>,
    cursor: usize,
    window: f64,
    voice_mode: VoiceMode,
}
impl CalibrationMatcher {
    /// Builds the expected timeline from the flattened playback events.
    /// Expected times are relative to the playback start anchor; callers feed
    /// `handle_input`/`sweep_overdue` timestamps on the same scale.
    pub fn new_with(
        playback: &[PlaybackEvent],
        tempo: Tempo,
        seconds_per_tick: Seconds,
        voice_mode: VoiceMode,
    ) -> Self {
        let mut targets: Vec<CalibrationTarget> = Vec::new();
        let mut group_index: FxHashMap<usize, usize> = FxHashMap::default();
        for event in playback {
            if event.is_chain_start() {
                if let Some(id) = event.tie_group_id {
                    group_index.insert(id, targets.len());
                }
                targets.push(CalibrationTarget {
                    expected_time: Seconds(event.tick_offset as f64 * seconds_per_tick.0),
                    voice: event.voice,
                    score_refs: vec![event.score_ref],
                    judgment: None,
                });
            } else if let Some(index) = event.tie_group_id.and_then(|id| group_index.get(&id)) {
                // A held continuation is judged with its chain's strike.
                targets[*index].score_refs.push(event.score_ref);
            }
        }
        targets.sort_by(|a, b| {
            a.expected_time
                .partial_cmp(&b.expected_time)
                .unwrap_or(core::cmp::Ordering::Equal)
        });

        let mut events: Vec<CalibrationEvent> = Vec::new();
        for target in targets {
            match events.last_mut() {
                Some(event) if (event.time.0 - target.expected_time.0).abs() < 1e-9 => {
                    event.targets.push(target);
                }
                _ => events.push(CalibrationEvent {
                    time: target.expected_time,
                    targets: vec![target],
                }),
            }
        }

        let window = (tempo.beat_seconds().0 * WINDOW_BEAT_FRACTION).clamp(WINDOW_MIN, WINDOW_MAX);
        Self {
            events,
            cursor: 0,
            window,
            voice_mode,
        }
    }

    /// The base window half-width in seconds. Inputs earlier than this are
    /// always rejected; the late bound may be wider per event.
    pub fn window(&self) -> f64 {
        self.window
    }

    #[allow(missing_docs)]
    pub fn events(&self) -> &[CalibrationEvent] {
        &self.events
    }

    /// Whether every expected event has been judged.
    pub fn is_complete(&self) -> bool {
        self.events.iter().all(|e| e.is_judged())
    }

    /// The late bound for one event. First-event and chord widening apply
    /// here only, never to the early side.
    fn late_window(&self, index: usize) -> f64 {
        let mut window = self.window;
        if index == 0 {
            window *= FIRST_EVENT_SCALE;
        }
        if self.events[index].targets.len() > 1 {
            window *= CHORD_SCALE;
        }
        window
    }

    /// Maps an input message to a logical voice. In single-voice mode every
    /// strike is voice 1; in double mode the keyboard splits at middle C,
    /// low keys driving voice 2.
    fn voice_for(&self, message: &MidiMessage) -> Option<u8> {
        match message {
            MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => match self.voice_mode {
                VoiceMode::Single => Some(1),
                VoiceMode::Double => {
                    if key.as_int() < VOICE_SPLIT_KEY {
                        Some(2)
                    } else {
                        Some(1)
                    }
                }
            },
            _ => None,
        }
    }

    /// Marks every event whose late window has fully elapsed as wrong and
    /// advances past it.
    pub fn sweep_overdue(&mut self, now: Seconds) {
        while self.cursor < self.events.len() {
            let index = self.cursor;
            if self.events[index].is_judged() {
                self.cursor += 1;
                continue;
            }
            let late = self.late_window(index);
            if now.0 > self.events[index].time.0 + late {
                for target in &mut self.events[index].targets {
                    target.judge(Judgment::Wrong);
                }
                self.cursor += 1;
            } else {
                break;
            }
        }
    }

    /// Handles one real-time input. Returns true when the input matched an
    /// expected target and judged it correct.
    pub fn handle_input(&mut self, message: &MidiMessage, now: Seconds) -> bool {
        let Some(voice) = self.voice_for(message) else {
            return false;
        };
        self.sweep_overdue(now);
        let index = self.cursor;
        if index >= self.events.len() {
            return false;
        }
        let late = self.late_window(index);
        let early = self.window;
        let event = &mut self.events[index];
        let offset = now.0 - event.time.0;
        if offset < -early || offset > late {
            return false;
        }
        let Some(target) = event
            .targets
            .iter_mut()
            .find(|t| t.judgment.is_none() && t.voice == voice)
        else {
            return false;
        };
        target.judge(Judgment::Correct);
        if self.events[index].is_judged() {
            self.cursor += 1;
        }
        true
    }

    /// Every judged score element, for annotating the rendered exercise.
    pub fn results(&self) -> Vec<(ScoreRef, Judgment)> {
        let mut results = Vec::new();
        for event in &self.events {
            for target in &event.targets {
                if let Some(judgment) = target.judgment {
                    for score_ref in &target.score_refs {
                        results.push((*score_ref, judgment));
                    }
                }
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::TieRole;
    use midly::num::u7;

    fn playback(tick_offset: usize, voice: u8) -> PlaybackEvent {
        PlaybackEvent {
            tick_offset,
            voice,
            accent: false,
            tie_group_id: None,
            tie_role: None,
            score_ref: ScoreRef {
                measure: 0,
                event: tick_offset,
            },
        }
    }

    fn strike(key: u8) -> MidiMessage {
        MidiMessage::NoteOn {
            key: u7::from(key),
            vel: u7::from(100),
        }
    }

    // 80 BPM at divisions 24: 0.03125 s/tick, window 0.165 s.
    const SPT: f64 = 0.03125;

    fn matcher(events: &[PlaybackEvent], mode: VoiceMode) -> CalibrationMatcher {
        CalibrationMatcher::new_with(events, Tempo(80.0), Seconds(SPT), mode)
    }

    #[test]
    fn window_is_tempo_adaptive_and_clamped() {
        let m = matcher(&[playback(0, 1)], VoiceMode::Single);
        assert!((m.window() - 0.165).abs() < 1e-9, "80 BPM gives 0.165 s");
        let fast = CalibrationMatcher::new_with(
            &[playback(0, 1)],
            Tempo(300.0),
            Seconds(SPT),
            VoiceMode::Single,
        );
        assert!((fast.window() - WINDOW_MIN).abs() < 1e-9);
        let slow = CalibrationMatcher::new_with(
            &[playback(0, 1)],
            Tempo(20.0),
            Seconds(SPT),
            VoiceMode::Single,
        );
        assert!((slow.window() - WINDOW_MAX).abs() < 1e-9);
    }

    #[test]
    fn input_inside_the_window_is_correct() {
        // 0.10 s late is inside the window; 0.40 s late is beyond even the
        // first event's widened window.
        let mut m = matcher(&[playback(0, 1), playback(24, 1)], VoiceMode::Single);
        assert!(m.handle_input(&strike(72), Seconds(0.10)));
        assert_eq!(
            m.events()[0].targets[0].judgment(),
            Some(Judgment::Correct)
        );

        let mut late = matcher(&[playback(0, 1), playback(24, 1)], VoiceMode::Single);
        assert!(!late.handle_input(&strike(72), Seconds(0.40)));
        late.sweep_overdue(Seconds(0.40));
        assert_eq!(
            late.events()[0].targets[0].judgment(),
            Some(Judgment::Wrong),
            "0.40 s late is outside 0.165 x 2.0 = 0.33 s"
        );
    }

    #[test]
    fn first_event_window_is_widened() {
        let mut m = matcher(&[playback(0, 1), playback(96, 1)], VoiceMode::Single);
        // 0.30 s late would miss a normal window but hits the first event's
        // doubled one.
        assert!(m.handle_input(&strike(72), Seconds(0.30)));
        // The second event's window is not widened: 0.30 s late misses.
        let second_time = 96.0 * SPT;
        assert!(!m.handle_input(&strike(72), Seconds(second_time + 0.30)));
    }

    #[test]
    fn widening_applies_only_to_the_late_side() {
        // 0.30 s early is outside the base 0.165 s window even on the first
        // event; the doubling covers lateness, not anticipation.
        let mut m = matcher(&[playback(0, 1), playback(96, 1)], VoiceMode::Single);
        assert!(!m.handle_input(&strike(72), Seconds(-0.30)));
        assert_eq!(m.events()[0].targets[0].judgment(), None);
        // Inside the base window the same strike lands.
        assert!(m.handle_input(&strike(72), Seconds(-0.10)));

        // Chord slack is late-only too: 0.20 s early misses a two-target
        // event whose late bound is 0.165 x 1.5 = 0.2475 s. The first strike
        // arrives after event 0's window, so the sweep has already judged it
        // and the chord is current.
        let mut chord = matcher(
            &[playback(0, 1), playback(96, 1), playback(96, 2), playback(192, 1)],
            VoiceMode::Double,
        );
        let chord_time = 96.0 * SPT;
        assert!(!chord.handle_input(&strike(72), Seconds(chord_time - 0.20)));
        assert!(chord.handle_input(&strike(72), Seconds(chord_time + 0.20)));
    }

    #[test]
    fn overdue_sweep_always_makes_progress() {
        let mut m = matcher(
            &[playback(0, 1), playback(24, 1), playback(48, 1)],
            VoiceMode::Single,
        );
        m.sweep_overdue(Seconds(100.0));
        assert!(m.is_complete());
        assert!(m
            .results()
            .iter()
            .all(|(_, judgment)| *judgment == Judgment::Wrong));
    }

    #[test]
    fn judgment_is_idempotent() {
        let mut m = matcher(&[playback(0, 1), playback(24, 1)], VoiceMode::Single);
        assert!(m.handle_input(&strike(72), Seconds(0.0)));
        // A second strike can't re-judge the same target; it falls into the
        // next event's consideration and misses.
        assert!(!m.handle_input(&strike(72), Seconds(0.05)));
        assert_eq!(
            m.events()[0].targets[0].judgment(),
            Some(Judgment::Correct)
        );
        m.sweep_overdue(Seconds(100.0));
        assert_eq!(
            m.events()[0].targets[0].judgment(),
            Some(Judgment::Correct),
            "a judged target never flips"
        );
    }

    #[test]
    fn two_voice_events_need_both_strikes() {
        let mut m = matcher(
            &[playback(0, 1), playback(0, 2), playback(24, 1)],
            VoiceMode::Double,
        );
        assert_eq!(m.events()[0].targets.len(), 2, "simultaneous onsets group");
        assert!(m.handle_input(&strike(72), Seconds(0.0)), "high key, voice 1");
        assert!(
            !m.events()[0].is_judged(),
            "event stays current until every target is judged"
        );
        assert!(m.handle_input(&strike(48), Seconds(0.05)), "low key, voice 2");
        assert!(m.events()[0].is_judged());
    }

    #[test]
    fn tie_chains_propagate_to_every_member() {
        let mut start = playback(0, 1);
        start.tie_group_id = Some(7);
        start.tie_role = Some(TieRole::Start);
        let mut held = playback(12, 1);
        held.tie_group_id = Some(7);
        held.tie_role = Some(TieRole::Stop);
        let mut m = CalibrationMatcher::new_with(
            &[start, held, playback(24, 1)],
            Tempo(80.0),
            Seconds(SPT),
            VoiceMode::Single,
        );
        assert_eq!(
            m.events().len(),
            2,
            "the held continuation is not separately judgable"
        );
        assert!(m.handle_input(&strike(72), Seconds(0.0)));
        let results = m.results();
        assert!(results.contains(&(ScoreRef { measure: 0, event: 0 }, Judgment::Correct)));
        assert!(
            results.contains(&(ScoreRef { measure: 0, event: 12 }, Judgment::Correct)),
            "the verdict annotates the whole tied chain"
        );
    }
}
