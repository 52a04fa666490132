// Copyright (c) 2024 The tactus authors

//! The event record: one written note or rest, with everything the exporter
//! and performer need to know about it.

use crate::types::{Divisions, DurationSpec, NoteValue};
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use strum_macros::IntoStaticStr;

/// Stem direction. Voice 1 stems up, voice 2 stems down, so two voices can
/// share a staff without colliding.
#[derive(Clone, Copy, Debug, Default, Eq, IntoStaticStr, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "lowercase")]
pub enum Stem {
    #[allow(missing_docs)]
    #[default]
    Up,
    #[allow(missing_docs)]
    Down,
}

/// A note's position in a tied chain.
#[derive(Clone, Copy, Debug, Eq, IntoStaticStr, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "lowercase")]
pub enum TieRole {
    /// First note of the chain; sounds.
    Start,
    /// Interior note; held, not re-struck.
    Continue,
    /// Last note of the chain.
    Stop,
}

/// Marks the first and last member of a tuplet group for notation purposes.
#[derive(Clone, Copy, Debug, Eq, IntoStaticStr, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "lowercase")]
pub enum TupletRole {
    #[allow(missing_docs)]
    Start,
    #[allow(missing_docs)]
    Stop,
}

/// One beam level's state on a note. Index 0 of [Event::beams] is the eighth
/// (primary) level, index 1 the sixteenth (secondary) level.
#[derive(Clone, Copy, Debug, Eq, IntoStaticStr, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BeamState {
    #[allow(missing_docs)]
    #[strum(serialize = "begin")]
    Begin,
    #[allow(missing_docs)]
    #[strum(serialize = "continue")]
    Continue,
    #[allow(missing_docs)]
    #[strum(serialize = "end")]
    End,
    /// A partial beam pointing right, on a lone sixteenth at the start of its
    /// neighborhood.
    #[strum(serialize = "forward hook")]
    ForwardHook,
    /// A partial beam pointing left.
    #[strum(serialize = "backward hook")]
    BackwardHook,
}

/// A tuplet's ratio: `actual` notes in the written time of `normal`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TimeModification {
    #[allow(missing_docs)]
    pub actual: u8,
    #[allow(missing_docs)]
    pub normal: u8,
}
impl TimeModification {
    /// Three in the time of two.
    pub const TRIPLET: Self = Self::new(3, 2);
    /// Two in the time of three (compound meters).
    pub const DUPLET: Self = Self::new(2, 3);
    /// Four in the time of three (compound meters).
    pub const QUADRUPLET: Self = Self::new(4, 3);

    #[allow(missing_docs)]
    pub const fn new(actual: u8, normal: u8) -> Self {
        Self { actual, normal }
    }
}

/// An [Event] is one written note or rest. Its tick duration normally follows
/// from `(value, dotted)`, but tuplet members carry a modified tick length
/// alongside their written shape.
///
/// Invariant: a rest never carries an accent, a tie role, or beams.
#[derive(Clone, Debug, Derivative, PartialEq, Eq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(rename_all = "kebab-case")]
pub struct Event {
    /// Sounding length in ticks.
    #[derivative(Default(value = "24"))]
    pub duration_ticks: usize,
    /// The written note shape.
    pub value: NoteValue,
    /// Whether the shape carries an augmentation dot.
    pub dotted: bool,
    /// 1 or 2.
    #[derivative(Default(value = "1"))]
    pub voice: u8,
    #[allow(missing_docs)]
    pub stem: Stem,
    #[allow(missing_docs)]
    pub is_rest: bool,
    #[allow(missing_docs)]
    pub accent: bool,
    /// Present only on tuplet members.
    pub time_modification: Option<TimeModification>,
    #[allow(missing_docs)]
    pub tuplet_role: Option<TupletRole>,
    #[allow(missing_docs)]
    pub tie_role: Option<TieRole>,
    /// One entry per beam level, primary first. Empty for unbeamed notes and
    /// all rests.
    pub beams: Vec<BeamState>,
}
impl Event {
    /// Creates a sounding note of the given written duration.
    pub fn note(spec: DurationSpec, divisions: Divisions, voice: u8) -> Self {
        Self {
            duration_ticks: spec.ticks(divisions),
            value: spec.value,
            dotted: spec.dotted,
            voice,
            stem: Self::stem_for(voice),
            ..Default::default()
        }
    }

    /// Creates a rest of the given written duration.
    pub fn rest(spec: DurationSpec, divisions: Divisions, voice: u8) -> Self {
        Self {
            is_rest: true,
            ..Self::note(spec, divisions, voice)
        }
    }

    /// Creates one member of a tuplet group: a written shape whose sounding
    /// tick length is scaled by the group's ratio.
    pub fn tuplet_member(
        value: NoteValue,
        duration_ticks: usize,
        modification: TimeModification,
        voice: u8,
    ) -> Self {
        Self {
            duration_ticks,
            value,
            voice,
            stem: Self::stem_for(voice),
            time_modification: Some(modification),
            ..Default::default()
        }
    }

    fn stem_for(voice: u8) -> Stem {
        if voice == 2 {
            Stem::Down
        } else {
            Stem::Up
        }
    }

    /// The written duration, when it is canonical. Tuplet members still
    /// report their written shape here.
    pub fn duration_spec(&self) -> DurationSpec {
        DurationSpec {
            value: self.value,
            dotted: self.dotted,
        }
    }

    #[allow(missing_docs)]
    pub fn is_tuplet(&self) -> bool {
        self.time_modification.is_some()
    }

    /// Whether this event can join a beam group.
    pub fn is_beamable(&self) -> bool {
        !self.is_rest && self.value.is_beamable()
    }

    /// Sets the tie role, quietly refusing for rests (a rest breaks a tie
    /// chain rather than joining it).
    pub fn set_tie_role(&mut self, role: Option<TieRole>) {
        if !self.is_rest {
            self.tie_role = role;
        }
    }

    /// Marks the onset accented. No-op for rests.
    pub fn set_accent(&mut self, accent: bool) {
        if !self.is_rest {
            self.accent = accent;
        }
    }

    /// Whether this event sounds a new onset (a note that isn't the
    /// continuation of a tie).
    pub fn is_onset(&self) -> bool {
        !self.is_rest && !matches!(self.tie_role, Some(TieRole::Continue) | Some(TieRole::Stop))
    }
}
