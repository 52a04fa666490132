// Copyright (c) 2024 The tactus authors

//! Representation and generation of rhythmic exercises: events, measures,
//! the pattern generator, the beat-clarity normalizer, and the beaming
//! assigner.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{
        assign_beams, generate_measure, generate_ostinato_measure, normalize, reconcile,
        BeamState, Event, GenerationHistory, GeneratorSettings, GeneratorSettingsBuilder, Measure,
        PatternBitmap, Stem, StoredPattern, TieRole, TimeModification, TupletRole, Voice,
        VoiceMode,
    };
}

pub use {
    beaming::assign_beams,
    bitmap::{reconcile, PatternBitmap, StoredPattern},
    event::{BeamState, Event, Stem, TieRole, TimeModification, TupletRole},
    generator::{
        generate_measure, generate_ostinato_measure, GeneratorSettings, GeneratorSettingsBuilder,
        VoiceMode,
    },
    history::{GenerationHistory, HISTORY_LEN},
    measure::{Measure, Voice},
    normalizer::{normalize, MAX_PASSES},
};

mod beaming;
mod bitmap;
mod event;
mod generator;
mod history;
mod measure;
mod normalizer;
