// Copyright (c) 2024 The tactus authors

//! The tick-exact duration model.

use derivative::Derivative;
use serde::{Deserialize, Serialize};
use strum_macros::{EnumIter, FromRepr, IntoStaticStr};
use synonym::Synonym;

/// The number of ticks in one quarter note. Every duration in the system is an
/// integer multiple of a tick, so one [Divisions] value fixes the resolution of
/// a whole score.
#[derive(Synonym, Serialize, Deserialize, Derivative)]
#[derivative(Default)]
#[synonym(skip(Default))]
#[serde(rename_all = "kebab-case")]
pub struct Divisions(#[derivative(Default(value = "24"))] pub usize);
#[allow(missing_docs)]
impl Divisions {
    pub const DEFAULT_DIVISIONS: usize = 24;
    pub const DEFAULT: Divisions = Divisions(Self::DEFAULT_DIVISIONS);

    /// A sixteenth is `divisions / 4` ticks, so any value that isn't a
    /// positive multiple of four would give some canonical duration a
    /// truncated or zero tick length. Such values fall back to the default.
    pub const fn new(value: usize) -> Self {
        if value != 0 && value % 4 == 0 {
            Self(value)
        } else {
            Self(Self::DEFAULT_DIVISIONS)
        }
    }
}

/// [NoteValue] enumerates the written note shapes this system generates. The
/// discriminant is the duration expressed in sixteenths, which makes tick
/// arithmetic a pure function of the enum value.
#[derive(
    Clone, Copy, Debug, Default, EnumIter, Eq, FromRepr, Hash, IntoStaticStr, PartialEq, Serialize,
    Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum NoteValue {
    /// semibreve
    #[strum(serialize = "whole")]
    Whole = 16,
    /// minim
    #[strum(serialize = "half")]
    Half = 8,
    /// crotchet
    #[default]
    #[strum(serialize = "quarter")]
    Quarter = 4,
    /// quaver
    #[strum(serialize = "eighth")]
    Eighth = 2,
    /// semiquaver
    #[strum(serialize = "16th")]
    Sixteenth = 1,
}
impl NoteValue {
    /// The duration of this plain (undotted) value in ticks.
    pub const fn ticks(&self, divisions: Divisions) -> usize {
        divisions.0 * (*self as usize) / 4
    }

    /// Whether this value can carry a beam (eighth level or finer).
    pub const fn is_beamable(&self) -> bool {
        matches!(self, NoteValue::Eighth | NoteValue::Sixteenth)
    }
}

/// A [DurationSpec] is a written duration: a [NoteValue] plus at most one
/// augmentation dot. Its tick length is a pure function of the pair, so two
/// specs with the same fields are always the same amount of musical time.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DurationSpec {
    /// The written note shape.
    pub value: NoteValue,
    /// Whether the shape carries an augmentation dot (duration × 3/2).
    pub dotted: bool,
}
impl DurationSpec {
    /// All specs in descending tick order. This is the greedy-decomposition
    /// table: any splittable remainder is consumed largest-first from here.
    pub const CANONICAL: [DurationSpec; 8] = [
        DurationSpec::plain(NoteValue::Whole),
        DurationSpec::dotted(NoteValue::Half),
        DurationSpec::plain(NoteValue::Half),
        DurationSpec::dotted(NoteValue::Quarter),
        DurationSpec::plain(NoteValue::Quarter),
        DurationSpec::dotted(NoteValue::Eighth),
        DurationSpec::plain(NoteValue::Eighth),
        DurationSpec::plain(NoteValue::Sixteenth),
    ];

    #[allow(missing_docs)]
    pub const fn plain(value: NoteValue) -> Self {
        Self {
            value,
            dotted: false,
        }
    }

    #[allow(missing_docs)]
    pub const fn dotted(value: NoteValue) -> Self {
        Self {
            value,
            dotted: true,
        }
    }

    /// This duration's length in ticks.
    pub const fn ticks(&self, divisions: Divisions) -> usize {
        let base = self.value.ticks(divisions);
        if self.dotted {
            base + base / 2
        } else {
            base
        }
    }

    /// Returns the spec whose tick length equals `ticks` exactly, if one
    /// exists. A dotted sixteenth is deliberately absent; nothing in the
    /// generated vocabulary produces one.
    pub fn from_ticks(ticks: usize, divisions: Divisions) -> Option<Self> {
        Self::CANONICAL
            .iter()
            .find(|spec| spec.ticks(divisions) == ticks)
            .copied()
    }

    /// Decomposes an arbitrary tick length into a canonical chain, largest
    /// value first. Returns `None` when the length cannot be expressed as a
    /// sum of canonical durations (for example, the interior of a tuplet).
    pub fn decompose(mut ticks: usize, divisions: Divisions) -> Option<Vec<Self>> {
        let mut chain = Vec::new();
        while ticks > 0 {
            let spec = Self::CANONICAL
                .iter()
                .find(|spec| spec.ticks(divisions) <= ticks)?;
            chain.push(*spec);
            ticks -= spec.ticks(divisions);
        }
        if chain.is_empty() {
            None
        } else {
            Some(chain)
        }
    }
}
