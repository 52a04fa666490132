// Copyright (c) 2024 The tactus authors

//! Turning a generated exercise into a timed performance: timeline
//! flattening, lookahead scheduling, and input-timing calibration.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{
        playback_events, total_ticks, CalibrationEvent, CalibrationMatcher, CalibrationTarget,
        Judgment, PerformanceScheduler, PlaybackEvent, ScoreRef, TransportState, Trigger,
        TriggerFn, TriggerKind,
    };
}

pub use {
    calibration::{CalibrationEvent, CalibrationMatcher, CalibrationTarget, Judgment},
    scheduler::{
        PerformanceScheduler, TransportState, Trigger, TriggerFn, TriggerKind,
        LOOKAHEAD_SECONDS, WAKE_SECONDS,
    },
    timeline::{playback_events, total_ticks, PlaybackEvent, ScoreRef},
};

mod calibration;
mod scheduler;
mod timeline;
