// Copyright (c) 2024 The tactus authors

//! Handles musical and wall-clock time: tempo, time signatures, and the
//! per-measure beat structure that the generator and normalizer consult.

use crate::types::{Divisions, NoteValue};
use anyhow::{anyhow, Error};
use core::fmt::{self, Display};
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use strum_macros::IntoStaticStr;
use synonym::Synonym;

/// Beats per minute. The tempo always counts the meter's written beat unit
/// (quarters in x/4, eighths in x/8).
#[derive(Synonym, Serialize, Deserialize, Derivative)]
#[derivative(Default)]
#[synonym(skip(Default, Display))]
#[serde(rename_all = "kebab-case")]
pub struct Tempo(#[derivative(Default(value = "80.0"))] pub f64);
impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{:0.2} BPM", self.0))
    }
}
impl Tempo {
    /// The largest value we'll allow.
    pub const MAX_VALUE: f64 = 300.0;

    /// The smallest value we'll allow.
    pub const MIN_VALUE: f64 = 20.0;

    /// Beats per second.
    pub fn bps(&self) -> f64 {
        self.0 / 60.0
    }

    /// The duration of one written beat.
    pub fn beat_seconds(&self) -> Seconds {
        Seconds(60.0 / self.0)
    }

    /// MIN..=MAX
    pub const fn range() -> core::ops::RangeInclusive<f64> {
        Self::MIN_VALUE..=Self::MAX_VALUE
    }
}

/// Represents the [seconds](https://en.wikipedia.org/wiki/Second) unit of
/// time. All scheduler timestamps are [Seconds] on a monotonic audio clock.
#[derive(Synonym, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Seconds(pub f64);
impl Seconds {
    /// Zero seconds.
    pub const fn zero() -> Seconds {
        Seconds(0.0)
    }
}
impl From<f32> for Seconds {
    fn from(value: f32) -> Self {
        Self(value as f64)
    }
}

/// How a meter's beats group, which decides where critical beats fall.
#[derive(
    Clone, Copy, Debug, Default, Eq, IntoStaticStr, PartialEq, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum MeterClass {
    /// 2/4, 3/4, 4/4: the written beat is the structural beat.
    #[default]
    Simple,
    /// x/8 with x a multiple of 3, x ≥ 6: the dotted quarter is the
    /// structural (main) beat.
    Compound,
    /// Everything else: beats group asymmetrically per a fixed table.
    Irregular,
}

/// [TimeSignature] represents a music [time
/// signature](https://en.wikipedia.org/wiki/Time_signature).
///
/// The top number tells how many beats are in a measure; the bottom number
/// tells the value of a beat as a reciprocal (4 = quarter note).
#[derive(Clone, Copy, Debug, Derivative, Eq, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(rename_all = "kebab-case")]
pub struct TimeSignature {
    /// The number of beats in a measure.
    #[derivative(Default(value = "4"))]
    pub top: usize,

    /// The value of a beat, expressed as a reciprocal; for example, if it's 4,
    /// then the beat value is 1/4 or a quarter note.
    #[derivative(Default(value = "4"))]
    pub bottom: usize,
}
impl Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{}/{}", self.top, self.bottom))
    }
}
impl TimeSignature {
    /// C time = common time = 4/4.
    pub const COMMON_TIME: Self = TimeSignature { top: 4, bottom: 4 };

    /// The signatures offered directly by the settings surface. Anything else
    /// goes through [TimeSignature::new_with] as a custom meter.
    pub const BUILT_IN: [TimeSignature; 4] = [
        TimeSignature { top: 2, bottom: 4 },
        TimeSignature { top: 3, bottom: 4 },
        TimeSignature { top: 4, bottom: 4 },
        TimeSignature { top: 6, bottom: 8 },
    ];

    /// Creates a validated [TimeSignature]. The numerator may be anything in
    /// 1..=15 (custom meters are welcome); the denominator must be a note
    /// value this system can write.
    pub fn new_with(top: usize, bottom: usize) -> anyhow::Result<Self, Error> {
        if top == 0 || top > 15 {
            Err(anyhow!("Time signature top {top} is out of range."))
        } else if matches!(bottom, 2 | 4 | 8 | 16) {
            Ok(Self { top, bottom })
        } else {
            Err(anyhow!("Time signature bottom {bottom} was out of range."))
        }
    }

    /// The top value.
    pub fn top(&self) -> usize {
        self.top
    }

    /// The bottom value.
    pub fn bottom(&self) -> usize {
        self.bottom
    }

    /// Which [MeterClass] this signature belongs to.
    pub fn meter_class(&self) -> MeterClass {
        if self.bottom == 8 && self.top >= 6 && self.top % 3 == 0 {
            MeterClass::Compound
        } else if self.bottom == 4 && (2..=4).contains(&self.top) {
            MeterClass::Simple
        } else {
            MeterClass::Irregular
        }
    }
}

/// The beat structure of one measure: beat groups, main-beat positions, and
/// the critical-beat set that the normalizer must keep visually exposed.
///
/// A context is cheap to build and is rebuilt per measure, because irregular
/// meters alternate their grouping between measures and because the critical
/// set depends on the finest rhythm actually present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeSignatureContext {
    time_signature: TimeSignature,
    divisions: Divisions,
    meter_class: MeterClass,
    ticks_per_beat: usize,
    measure_ticks: usize,
    /// Length in ticks of each beat group, in order. Simple meters have one
    /// group per beat; compound meters one per dotted-quarter main beat;
    /// irregular meters follow the grouping table.
    group_ticks: Vec<usize>,
}
impl TimeSignatureContext {
    /// Builds the context for the measure at `measure_index`. The index
    /// matters only for irregular meters, whose grouping alternates to vary
    /// emphasis (5/4 is [3,2] on even measures and [2,3] on odd ones).
    pub fn new_with(
        time_signature: TimeSignature,
        divisions: Divisions,
        measure_index: usize,
    ) -> Self {
        let ticks_per_beat = divisions.0 * 4 / time_signature.bottom();
        let measure_ticks = ticks_per_beat * time_signature.top();
        let meter_class = time_signature.meter_class();
        let group_ticks = match meter_class {
            MeterClass::Simple => vec![ticks_per_beat; time_signature.top()],
            MeterClass::Compound => vec![ticks_per_beat * 3; time_signature.top() / 3],
            MeterClass::Irregular => Self::irregular_groups(time_signature.top(), measure_index)
                .iter()
                .map(|beats| beats * ticks_per_beat)
                .collect(),
        };
        Self {
            time_signature,
            divisions,
            meter_class,
            ticks_per_beat,
            measure_ticks,
            group_ticks,
        }
    }

    // The asymmetric grouping table: greedy threes with a two/four tail,
    // reversed on odd measures. 5 -> [3,2]/[2,3], 7 -> [3,2,2]/[2,2,3].
    fn irregular_groups(top: usize, measure_index: usize) -> Vec<usize> {
        let mut groups = Vec::new();
        let mut remaining = top;
        while remaining > 4 {
            groups.push(3);
            remaining -= 3;
        }
        match remaining {
            4 => groups.extend([2, 2]),
            0 => {}
            n => groups.push(n),
        }
        if measure_index % 2 == 1 {
            groups.reverse();
        }
        groups
    }

    #[allow(missing_docs)]
    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    #[allow(missing_docs)]
    pub fn divisions(&self) -> Divisions {
        self.divisions
    }

    #[allow(missing_docs)]
    pub fn meter_class(&self) -> MeterClass {
        self.meter_class
    }

    /// Ticks in one written beat.
    pub fn ticks_per_beat(&self) -> usize {
        self.ticks_per_beat
    }

    /// Ticks in the whole measure.
    pub fn measure_ticks(&self) -> usize {
        self.measure_ticks
    }

    /// Ticks in one main beat (the dotted quarter for compound meters). For
    /// irregular meters the groups differ in length, so this is the length of
    /// the first group; use [TimeSignatureContext::group_starts] when exact
    /// positions matter.
    pub fn main_beat_ticks(&self) -> usize {
        self.group_ticks[0]
    }

    /// The per-group tick lengths, in order.
    pub fn group_lengths(&self) -> &[usize] {
        &self.group_ticks
    }

    /// The tick position where each beat group starts.
    pub fn group_starts(&self) -> Vec<usize> {
        let mut starts = Vec::with_capacity(self.group_ticks.len());
        let mut at = 0;
        for len in &self.group_ticks {
            starts.push(at);
            at += len;
        }
        starts
    }

    /// Whether a tick position is the onset of a beat group (a main beat).
    pub fn is_main_beat(&self, tick: usize) -> bool {
        self.group_starts().contains(&tick)
    }

    /// The `[start, end)` tick range of the beat group containing `tick`.
    pub fn group_of(&self, tick: usize) -> core::ops::Range<usize> {
        let mut at = 0;
        for len in &self.group_ticks {
            if tick < at + len {
                return at..at + len;
            }
            at += len;
        }
        // Past the last group: clamp to it.
        (self.measure_ticks - self.group_ticks[self.group_ticks.len() - 1])..self.measure_ticks
    }

    /// The ordered critical-beat positions for a measure whose finest present
    /// rhythmic value lasts `finest_ticks`. Denser rhythms expose more
    /// critical beats.
    pub fn critical_beats(&self, finest_ticks: usize) -> Vec<usize> {
        let sixteenth = NoteValue::Sixteenth.ticks(self.divisions);
        let has_sixteenths = finest_ticks <= sixteenth;
        let mut beats = match self.meter_class {
            MeterClass::Simple => {
                if has_sixteenths {
                    (0..self.time_signature.top())
                        .map(|beat| beat * self.ticks_per_beat)
                        .collect()
                } else if self.time_signature.top() % 2 == 0 {
                    vec![0, self.measure_ticks / 2]
                } else {
                    vec![0]
                }
            }
            MeterClass::Compound => {
                if has_sixteenths {
                    // Half-main-beat boundaries include the main beats.
                    let half_main = self.main_beat_ticks() / 2;
                    (0..self.measure_ticks / half_main)
                        .map(|i| i * half_main)
                        .collect()
                } else {
                    self.group_starts()
                }
            }
            MeterClass::Irregular => {
                let mut beats = self.group_starts();
                if has_sixteenths {
                    beats.extend(
                        (0..self.time_signature.top()).map(|beat| beat * self.ticks_per_beat),
                    );
                }
                beats
            }
        };
        beats.sort_unstable();
        beats.dedup();
        beats
    }

    /// The structural weight of a tick position: the tick length of the
    /// largest unit that starts there. Stronger boundaries can "expose" a
    /// beat that a note spans, letting the normalizer skip an unnecessary
    /// split.
    pub fn strength(&self, tick: usize) -> usize {
        if tick == 0 || tick == self.measure_ticks {
            return self.measure_ticks;
        }
        match self.meter_class {
            MeterClass::Simple => {
                if tick % self.ticks_per_beat == 0 {
                    let beat = tick / self.ticks_per_beat;
                    if self.time_signature.top() % 2 == 0 && beat == self.time_signature.top() / 2 {
                        self.measure_ticks / 2
                    } else {
                        self.ticks_per_beat
                    }
                } else {
                    self.subbeat_strength(tick)
                }
            }
            MeterClass::Compound => {
                let main = self.main_beat_ticks();
                if tick % main == 0 {
                    main
                } else if tick % (main / 2) == 0 {
                    main / 2
                } else if tick % self.ticks_per_beat == 0 {
                    self.ticks_per_beat
                } else {
                    self.subbeat_strength(tick)
                }
            }
            MeterClass::Irregular => {
                if let Some(position) = self.group_starts().iter().position(|start| *start == tick)
                {
                    self.group_ticks[position]
                } else if tick % self.ticks_per_beat == 0 {
                    self.ticks_per_beat
                } else {
                    self.subbeat_strength(tick)
                }
            }
        }
    }

    fn subbeat_strength(&self, tick: usize) -> usize {
        let half_beat = self.ticks_per_beat / 2;
        if half_beat > 0 && tick % half_beat == 0 {
            half_beat
        } else {
            let quarter_beat = self.ticks_per_beat / 4;
            if quarter_beat > 0 && tick % quarter_beat == 0 {
                quarter_beat
            } else {
                1
            }
        }
    }

    /// Seconds of one tick at the given tempo.
    pub fn seconds_per_tick(&self, tempo: Tempo) -> Seconds {
        Seconds(tempo.beat_seconds().0 / self.ticks_per_beat as f64)
    }

    /// Seconds of one main beat at the given tempo.
    pub fn main_beat_seconds(&self, tempo: Tempo) -> Seconds {
        Seconds(self.seconds_per_tick(tempo).0 * self.main_beat_ticks() as f64)
    }

    /// How many count-in clicks a session should play: one full measure of
    /// main beats, but never fewer than two clicks.
    pub fn count_in_clicks(&self) -> usize {
        self.group_ticks.len().max(2)
    }

    /// How many metronome/ostinato steps one bar holds at the given
    /// subdivision (steps per main beat).
    pub fn steps_per_bar(&self, subdivision: usize) -> usize {
        self.group_ticks.len() * subdivision
    }
}
