// Copyright (c) 2024 The tactus authors

//! The lookahead performance scheduler: turns a tick timeline plus a tempo
//! into absolute-timestamped audio triggers for count-in clicks, metronome
//! steps, and note onsets.

use super::PlaybackEvent;
use crate::{
    composition::PatternBitmap,
    types::{Seconds, Tempo, TimeSignatureContext},
};

/// Events due within this many seconds of a pump are scheduled now.
pub const LOOKAHEAD_SECONDS: f64 = 0.120;

/// How often the driver should call [PerformanceScheduler::pump]. Well under
/// the horizon, so nothing can slip through between wakes.
pub const WAKE_SECONDS: f64 = 0.025;

/// The transport's state. All timer callbacks dispatch transitions through
/// [PerformanceScheduler::pump]; nothing mutates flags on the side.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum TransportState {
    #[allow(missing_docs)]
    #[default]
    Idle,
    /// Clicking off one measure of main beats before playback.
    CountIn {
        /// Clicks still to schedule.
        remaining: usize,
        /// Absolute time of the next click.
        next_click: Seconds,
        /// One main beat.
        interval: Seconds,
    },
    /// Playback underway. All trigger times are offsets from `start_time`.
    Playing {
        #[allow(missing_docs)]
        start_time: Seconds,
    },
}

/// What a trigger should sound like.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerKind {
    #[allow(missing_docs)]
    CountInClick,
    /// A metronome step; the bar-start step is accented.
    MetronomeClick {
        #[allow(missing_docs)]
        accent: bool,
    },
    /// A played note onset for one voice.
    Note {
        #[allow(missing_docs)]
        voice: u8,
        #[allow(missing_docs)]
        accent: bool,
    },
}

/// One scheduled audio trigger at an absolute monotonic-clock time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Trigger {
    #[allow(missing_docs)]
    pub time: Seconds,
    #[allow(missing_docs)]
    pub kind: TriggerKind,
}

/// The callback that receives scheduled triggers from a pump.
pub type TriggerFn<'a> = dyn FnMut(Trigger) + 'a;

/// One sounding onset of the playback timeline, precomputed at session start.
#[derive(Clone, Copy, Debug)]
struct Onset {
    tick_offset: usize,
    voice: u8,
    accent: bool,
}

/// [PerformanceScheduler] owns the `Idle → CountIn → Playing → Idle` state
/// machine. The driver calls [PerformanceScheduler::pump] on every wake with
/// the current monotonic clock; the scheduler emits every trigger whose time
/// falls within the lookahead horizon, as an absolute timestamp. Because the
/// timestamps are computed from a shared start anchor rather than accumulated
/// wake-to-wake, timer jitter never turns into drift.
#[derive(Debug)]
pub struct PerformanceScheduler {
    tempo: Tempo,
    context: TimeSignatureContext,
    metronome: Option<PatternBitmap>,
    onsets: Vec<Onset>,
    total_ticks: usize,
    state: TransportState,
    // Session-scoped values, fixed at start() so a tempo change never
    // reschedules a running session.
    seconds_per_tick: f64,
    step_ticks: Vec<usize>,
    next_onset: usize,
    next_step: usize,
}
impl PerformanceScheduler {
    /// Creates a scheduler for one exercise. Only tie-chain starts become
    /// note triggers; held continuations don't re-strike.
    pub fn new_with(
        context: TimeSignatureContext,
        tempo: Tempo,
        events: &[PlaybackEvent],
        total_ticks: usize,
        metronome: Option<PatternBitmap>,
    ) -> Self {
        let onsets = events
            .iter()
            .filter(|e| e.is_chain_start())
            .map(|e| Onset {
                tick_offset: e.tick_offset,
                voice: e.voice,
                accent: e.accent,
            })
            .collect();
        Self {
            tempo,
            context,
            metronome,
            onsets,
            total_ticks,
            state: TransportState::Idle,
            seconds_per_tick: 0.0,
            step_ticks: Vec::default(),
            next_onset: 0,
            next_step: 0,
        }
    }

    #[allow(missing_docs)]
    pub fn state(&self) -> &TransportState {
        &self.state
    }

    #[allow(missing_docs)]
    pub fn is_idle(&self) -> bool {
        self.state == TransportState::Idle
    }

    /// The tempo for the next session. A session already underway keeps the
    /// tempo it started with.
    pub fn set_tempo(&mut self, tempo: Tempo) {
        self.tempo = tempo;
    }

    /// Begins the count-in: one measure of main beats, never fewer than two
    /// clicks, the first due immediately.
    pub fn start(&mut self, now: Seconds) {
        self.seconds_per_tick = self.context.seconds_per_tick(self.tempo).0;
        self.step_ticks = self
            .metronome
            .as_ref()
            .map(|pattern| Self::measure_step_ticks(&self.context, pattern.subdivision()))
            .unwrap_or_default();
        self.next_onset = 0;
        self.next_step = 0;
        self.state = TransportState::CountIn {
            remaining: self.context.count_in_clicks(),
            next_click: now,
            interval: self.context.main_beat_seconds(self.tempo),
        };
    }

    /// Cancels the session completely: no trigger scheduled after a stop, no
    /// matter which channel it belonged to.
    pub fn stop(&mut self) {
        self.state = TransportState::Idle;
        self.next_onset = 0;
        self.next_step = 0;
    }

    // The tick position of every metronome step within one measure.
    fn measure_step_ticks(context: &TimeSignatureContext, subdivision: usize) -> Vec<usize> {
        let mut ticks = Vec::new();
        let mut at = 0;
        for len in context.group_lengths() {
            for s in 0..subdivision {
                ticks.push(at + s * len / subdivision);
            }
            at += len;
        }
        ticks
    }

    /// Schedules everything due within the lookahead horizon, in
    /// non-decreasing time order, and advances the state machine. Returns the
    /// suggested next wake time, or `None` once the transport is idle.
    pub fn pump(&mut self, now: Seconds, trigger_fn: &mut TriggerFn) -> Option<Seconds> {
        let horizon = now.0 + LOOKAHEAD_SECONDS;
        let mut triggers: Vec<Trigger> = Vec::new();

        if let TransportState::CountIn {
            mut remaining,
            mut next_click,
            interval,
        } = self.state
        {
            while remaining > 0 && next_click.0 <= horizon {
                triggers.push(Trigger {
                    time: next_click,
                    kind: TriggerKind::CountInClick,
                });
                remaining -= 1;
                next_click = Seconds(next_click.0 + interval.0);
            }
            self.state = if remaining == 0 {
                // One beat after the last click, playback begins.
                TransportState::Playing {
                    start_time: next_click,
                }
            } else {
                TransportState::CountIn {
                    remaining,
                    next_click,
                    interval,
                }
            };
        }

        if let TransportState::Playing { start_time } = self.state {
            let end_time = start_time.0 + self.total_ticks as f64 * self.seconds_per_tick;

            if let Some(pattern) = &self.metronome {
                let steps_per_bar = self.step_ticks.len().max(1);
                loop {
                    let bar = self.next_step / steps_per_bar;
                    let pos = self.next_step % steps_per_bar;
                    let tick = bar * self.context.measure_ticks() + self.step_ticks[pos];
                    if tick >= self.total_ticks {
                        break;
                    }
                    let time = start_time.0 + tick as f64 * self.seconds_per_tick;
                    if time > horizon {
                        break;
                    }
                    if pattern.is_active(self.next_step) {
                        triggers.push(Trigger {
                            time: Seconds(time),
                            kind: TriggerKind::MetronomeClick { accent: pos == 0 },
                        });
                    }
                    self.next_step += 1;
                }
            }

            while let Some(onset) = self.onsets.get(self.next_onset) {
                let time = start_time.0 + onset.tick_offset as f64 * self.seconds_per_tick;
                if time > horizon {
                    break;
                }
                triggers.push(Trigger {
                    time: Seconds(time),
                    kind: TriggerKind::Note {
                        voice: onset.voice,
                        accent: onset.accent,
                    },
                });
                self.next_onset += 1;
            }

            if self.next_onset >= self.onsets.len() && now.0 >= end_time {
                self.state = TransportState::Idle;
            }
        }

        triggers.sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap_or(core::cmp::Ordering::Equal));
        for trigger in triggers {
            trigger_fn(trigger);
        }

        match self.state {
            TransportState::Idle => None,
            _ => Some(Seconds(now.0 + WAKE_SECONDS)),
        }
    }
}
