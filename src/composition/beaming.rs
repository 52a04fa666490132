// Copyright (c) 2024 The tactus authors

//! The beaming assigner: joins consecutive eighth/sixteenth notes within a
//! beat or tuplet group into primary and secondary beams.

use super::{BeamState, Event, Measure, TupletRole};
use crate::types::{NoteValue, TimeSignatureContext};

/// Returns a copy of the measure with beam states assigned. Beam groups
/// never cross a beat-group or tuplet boundary, and rests or non-beamable
/// values terminate a run. Lone beamable notes stay flagged (no beams).
pub fn assign_beams(measure: &Measure, context: &TimeSignatureContext) -> Measure {
    let onsets = measure.onsets();
    let mut events = measure.events.clone();
    for event in &mut events {
        event.beams.clear();
    }
    for group in beam_groups(&events, &onsets, context) {
        for run in beamable_runs(&events, &group) {
            if run.len() < 2 {
                continue;
            }
            assign_primary(&mut events, &run);
            assign_secondary(&mut events, &run);
        }
    }
    Measure::new_with(events)
}

/// Partitions event indices into beam groups: each tuplet is its own group,
/// and everything else groups by the beat group its onset falls in.
fn beam_groups(
    events: &[Event],
    onsets: &[usize],
    context: &TimeSignatureContext,
) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    let mut current_beat_start: Option<usize> = None;
    let mut i = 0;
    while i < events.len() {
        if events[i].is_tuplet() {
            if !current.is_empty() {
                groups.push(core::mem::take(&mut current));
                current_beat_start = None;
            }
            let mut tuplet: Vec<usize> = Vec::new();
            while i < events.len() && events[i].is_tuplet() {
                tuplet.push(i);
                let last = events[i].tuplet_role == Some(TupletRole::Stop);
                i += 1;
                if last {
                    break;
                }
            }
            groups.push(tuplet);
            continue;
        }
        let beat_start = context.group_of(onsets[i]).start;
        if current_beat_start != Some(beat_start) && !current.is_empty() {
            groups.push(core::mem::take(&mut current));
        }
        current_beat_start = Some(beat_start);
        current.push(i);
        i += 1;
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

/// Maximal runs of consecutive beamable events within one group.
fn beamable_runs(events: &[Event], group: &[usize]) -> Vec<Vec<usize>> {
    let mut runs: Vec<Vec<usize>> = Vec::new();
    let mut run: Vec<usize> = Vec::new();
    for &i in group {
        if events[i].is_beamable() {
            if let Some(&last) = run.last() {
                if i != last + 1 {
                    runs.push(core::mem::take(&mut run));
                }
            }
            run.push(i);
        } else if !run.is_empty() {
            runs.push(core::mem::take(&mut run));
        }
    }
    if !run.is_empty() {
        runs.push(run);
    }
    runs
}

fn assign_primary(events: &mut [Event], run: &[usize]) {
    let last = run.len() - 1;
    for (pos, &i) in run.iter().enumerate() {
        let state = if pos == 0 {
            BeamState::Begin
        } else if pos == last {
            BeamState::End
        } else {
            BeamState::Continue
        };
        events[i].beams.push(state);
    }
}

/// Secondary (sixteenth-level) beams: full beams over sixteenth sub-runs,
/// hooks on lone sixteenths.
fn assign_secondary(events: &mut [Event], run: &[usize]) {
    let mut pos = 0;
    while pos < run.len() {
        if events[run[pos]].value != NoteValue::Sixteenth {
            pos += 1;
            continue;
        }
        let start = pos;
        while pos < run.len() && events[run[pos]].value == NoteValue::Sixteenth {
            pos += 1;
        }
        let len = pos - start;
        if len == 1 {
            let state = if start == 0 {
                BeamState::ForwardHook
            } else {
                BeamState::BackwardHook
            };
            events[run[start]].beams.push(state);
        } else {
            for sub in start..pos {
                let state = if sub == start {
                    BeamState::Begin
                } else if sub + 1 == pos {
                    BeamState::End
                } else {
                    BeamState::Continue
                };
                events[run[sub]].beams.push(state);
            }
        }
    }
}
