// Copyright (c) 2024 The tactus authors

//! Flattening a generated exercise into a playback timeline.

use crate::composition::{TieRole, Voice};
use serde::{Deserialize, Serialize};

/// A pointer back into the generated score, for annotating judgment results
/// onto rendered elements.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScoreRef {
    #[allow(missing_docs)]
    pub measure: usize,
    #[allow(missing_docs)]
    pub event: usize,
}

/// One sounding event of the flattened timeline: a non-rest event at a
/// measure-absolute tick offset. Members of one tied chain share a
/// `tie_group_id`; only the chain's first member is struck.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlaybackEvent {
    #[allow(missing_docs)]
    pub tick_offset: usize,
    #[allow(missing_docs)]
    pub voice: u8,
    #[allow(missing_docs)]
    pub accent: bool,
    #[allow(missing_docs)]
    pub tie_group_id: Option<usize>,
    /// The event's place in its tied chain, if any.
    pub tie_role: Option<TieRole>,
    #[allow(missing_docs)]
    pub score_ref: ScoreRef,
}
impl PlaybackEvent {
    /// Whether this event is actually struck (not held over from a tie).
    pub fn is_chain_start(&self) -> bool {
        matches!(self.tie_role, None | Some(TieRole::Start))
    }
}

/// Flattens one or two voices into a single timeline ordered by tick offset
/// (voice 1 first on simultaneous onsets). Rests are dropped; tied chains are
/// threaded into shared group ids.
pub fn playback_events(voices: &[Voice], measure_ticks: usize) -> Vec<PlaybackEvent> {
    let mut events = Vec::new();
    let mut next_group_id = 0;
    for voice in voices {
        let mut open_group: Option<usize> = None;
        for (measure_index, measure) in voice.measures.iter().enumerate() {
            let mut position = measure_index * measure_ticks;
            for (event_index, event) in measure.events.iter().enumerate() {
                let tick_offset = position;
                position += event.duration_ticks;
                if event.is_rest {
                    open_group = None;
                    continue;
                }
                let (tie_group_id, tie_role) = match event.tie_role {
                    None => (None, None),
                    Some(TieRole::Start) => {
                        let id = next_group_id;
                        next_group_id += 1;
                        open_group = Some(id);
                        (Some(id), Some(TieRole::Start))
                    }
                    Some(role) => {
                        // A continuation without an open chain shouldn't
                        // happen; treat it as a fresh strike.
                        let id = open_group;
                        if role == TieRole::Stop {
                            open_group = None;
                        }
                        match id {
                            Some(id) => (Some(id), Some(role)),
                            None => (None, None),
                        }
                    }
                };
                events.push(PlaybackEvent {
                    tick_offset,
                    voice: voice.number,
                    accent: event.accent,
                    tie_group_id,
                    tie_role,
                    score_ref: ScoreRef {
                        measure: measure_index,
                        event: event_index,
                    },
                });
            }
        }
    }
    events.sort_by_key(|e| (e.tick_offset, e.voice));
    events
}

/// The timeline's total length in ticks.
pub fn total_ticks(voices: &[Voice], measure_ticks: usize) -> usize {
    voices
        .iter()
        .map(|v| v.measures.len() * measure_ticks)
        .max()
        .unwrap_or_default()
}
