// Copyright (c) 2024 The tactus authors

//! Common data types used throughout the system.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{
        Divisions, DurationSpec, MeterClass, NoteValue, Seconds, Tempo, TimeSignature,
        TimeSignatureContext,
    };
}

pub use {
    duration::{Divisions, DurationSpec, NoteValue},
    time::{MeterClass, Seconds, Tempo, TimeSignature, TimeSignatureContext},
};

mod duration;
mod time;
