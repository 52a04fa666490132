// Copyright (c) 2024 The tactus authors

#![deny(missing_docs, unused_imports, unused_variables)]

//! Tactus generates rhythmic sight-reading exercises and performs them.
//!
//! The pipeline has two halves that share one tick-exact event model:
//!
//! * *Notation*: [generate_measure](composition::generate_measure) rolls a
//! measure of events from weighted settings,
//! [normalize](composition::normalize) splits and re-merges them so no event
//! obscures a critical beat, [assign_beams](composition::assign_beams) joins
//! eighths and sixteenths into beams, and
//! [to_musicxml](export::to_musicxml) serializes the result for a renderer.
//! * *Performance*: [playback_events](performance::playback_events) flattens
//! the same events into a timeline, a
//! [PerformanceScheduler](performance::PerformanceScheduler) turns it into
//! drift-free audio triggers, and a
//! [CalibrationMatcher](performance::CalibrationMatcher) judges live input
//! against it.
//!
//! A [Session] ties both halves together with settings and history.

/// A collection of imports that are useful to users of this crate. `use
/// tactus::prelude::*;` for easier onboarding.
pub mod prelude {
    pub use super::{
        composition::prelude::*, export::prelude::*, performance::prelude::*, traits::*,
        types::prelude::*, util::prelude::*, Session,
    };
}

// Fundamental structures that are important enough to re-export at top level.
pub use session::Session;

pub mod composition;
pub mod export;
pub mod performance;
pub mod traits;
pub mod types;
pub mod util;

mod session;
