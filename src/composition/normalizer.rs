// Copyright (c) 2024 The tactus authors

//! The beat-clarity normalizer: splits events that obscure a critical beat
//! into tied chains, then merges adjacent rests and tied notes back into the
//! largest legible duration. Pure functions over immutable event lists.

use super::{Event, Measure, TieRole};
use crate::types::{DurationSpec, MeterClass, NoteValue, TimeSignatureContext};

/// Split and merge must converge; this bounds the iteration so a pathological
/// measure degrades to a best-effort result instead of looping.
pub const MAX_PASSES: usize = 10;

/// Rewrites a measure so that no single event obscures a critical beat, and
/// no split survives that the meter doesn't require. Total ticks, onset
/// positions, and rest/note content are preserved; running the normalizer on
/// its own output is a no-op.
pub fn normalize(measure: &Measure, context: &TimeSignatureContext) -> Measure {
    let mut events = measure.events.clone();
    for _ in 0..MAX_PASSES {
        // The critical set depends on the finest value currently present, so
        // it is recomputed every pass.
        let finest = events
            .iter()
            .map(|e| e.duration_ticks)
            .min()
            .unwrap_or(context.measure_ticks());
        let has_sixteenths = finest <= NoteValue::Sixteenth.ticks(context.divisions());
        let critical = context.critical_beats(finest);

        let split = split_pass(&events, context, &critical, has_sixteenths);
        let merged = merge_rest_pass(&split, context, &critical, has_sixteenths);
        let merged = merge_tie_pass(&merged, context, &critical, has_sixteenths);
        if merged == events {
            break;
        }
        events = merged;
    }
    Measure::new_with(events)
}

/// Finds the first critical boundary inside `(start, end)` that the event is
/// not allowed to cross. Rests may never cross one. Notes may, when the
/// crossing is already clear:
/// - the note starts at a boundary structurally stronger than the one it
///   crosses (a dotted half from the downbeat of 4/4 exposes beat 3), or
/// - in a simple meter without sixteenths, the note sits symmetrically
///   around the boundary on the half-beat grid (classic syncopation).
///
/// Irregular meters give their grouping boundaries absolute priority: no
/// exception lets a note cross one.
fn first_unclear_crossing(
    context: &TimeSignatureContext,
    critical: &[usize],
    has_sixteenths: bool,
    start: usize,
    end: usize,
    is_rest: bool,
) -> Option<usize> {
    for &boundary in critical.iter().filter(|&&b| start < b && b < end) {
        if is_rest {
            return Some(boundary);
        }
        if context.meter_class() == MeterClass::Irregular && context.is_main_beat(boundary) {
            return Some(boundary);
        }
        if context.strength(start) > context.strength(boundary) {
            continue;
        }
        if context.meter_class() == MeterClass::Simple && !has_sixteenths {
            let half_beat = context.ticks_per_beat() / 2;
            if boundary - start == end - boundary
                && half_beat > 0
                && start % half_beat == 0
                && end % half_beat == 0
            {
                continue;
            }
        }
        return Some(boundary);
    }
    None
}

fn tied_backward(role: Option<TieRole>) -> bool {
    matches!(role, Some(TieRole::Continue) | Some(TieRole::Stop))
}

fn tied_forward(role: Option<TieRole>) -> bool {
    matches!(role, Some(TieRole::Start) | Some(TieRole::Continue))
}

fn role_for(backward: bool, forward: bool) -> Option<TieRole> {
    match (backward, forward) {
        (false, false) => None,
        (false, true) => Some(TieRole::Start),
        (true, true) => Some(TieRole::Continue),
        (true, false) => Some(TieRole::Stop),
    }
}

/// Respells one event as a chain of canonical durations, threading ties
/// through the chain (and out to the event's existing neighbors). Rest chains
/// stay untied; an accent lands only on the chain's sounding onset.
fn respell(event: &Event, chain: &[DurationSpec], context: &TimeSignatureContext) -> Vec<Event> {
    let divisions = context.divisions();
    let backward = tied_backward(event.tie_role);
    let forward = tied_forward(event.tie_role);
    chain
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            let mut part = if event.is_rest {
                Event::rest(*spec, divisions, event.voice)
            } else {
                Event::note(*spec, divisions, event.voice)
            };
            part.stem = event.stem;
            part.set_tie_role(role_for(backward || i > 0, forward || i + 1 < chain.len()));
            part.set_accent(event.accent && i == 0 && !backward);
            part
        })
        .collect()
}

/// One splitting sweep: each event that crosses a critical beat without
/// clarity is cut at the first violated boundary and respelled greedily on
/// both sides. Tuplet members are opaque and never split.
fn split_pass(
    events: &[Event],
    context: &TimeSignatureContext,
    critical: &[usize],
    has_sixteenths: bool,
) -> Vec<Event> {
    let mut out = Vec::with_capacity(events.len());
    let mut position = 0;
    for event in events {
        let start = position;
        let end = position + event.duration_ticks;
        position = end;
        if event.is_tuplet() {
            out.push(event.clone());
            continue;
        }
        let Some(boundary) =
            first_unclear_crossing(context, critical, has_sixteenths, start, end, event.is_rest)
        else {
            out.push(event.clone());
            continue;
        };
        let divisions = context.divisions();
        match (
            DurationSpec::decompose(boundary - start, divisions),
            DurationSpec::decompose(end - boundary, divisions),
        ) {
            (Some(mut chain), Some(rest_of)) => {
                chain.extend(rest_of);
                out.extend(respell(event, &chain, context));
            }
            // Not expressible as canonical durations; leave it alone.
            _ => out.push(event.clone()),
        }
    }
    out
}

/// Merges adjacent rests whose union is one canonical duration and crosses
/// no critical beat.
fn merge_rest_pass(
    events: &[Event],
    context: &TimeSignatureContext,
    critical: &[usize],
    has_sixteenths: bool,
) -> Vec<Event> {
    let divisions = context.divisions();
    let mut out: Vec<Event> = Vec::with_capacity(events.len());
    let mut out_onsets: Vec<usize> = Vec::with_capacity(events.len());
    let mut position = 0;
    for event in events {
        let end = position + event.duration_ticks;
        if let (Some(last), Some(&last_onset)) = (out.last(), out_onsets.last()) {
            if last.is_rest
                && event.is_rest
                && !last.is_tuplet()
                && !event.is_tuplet()
                && first_unclear_crossing(context, critical, has_sixteenths, last_onset, end, true)
                    .is_none()
            {
                if let Some(spec) = DurationSpec::from_ticks(end - last_onset, divisions) {
                    let mut merged = Event::rest(spec, divisions, event.voice);
                    merged.stem = event.stem;
                    *out.last_mut().unwrap() = merged;
                    position = end;
                    continue;
                }
            }
        }
        out.push(event.clone());
        out_onsets.push(position);
        position = end;
    }
    out
}

/// Merges a tied pair back into one note when the union is canonical, stays
/// inside one beat group, and crosses no critical beat. This undoes splits
/// the generator produced incidentally rather than ones the meter demanded.
fn merge_tie_pass(
    events: &[Event],
    context: &TimeSignatureContext,
    critical: &[usize],
    has_sixteenths: bool,
) -> Vec<Event> {
    let divisions = context.divisions();
    let mut out: Vec<Event> = Vec::with_capacity(events.len());
    let mut out_onsets: Vec<usize> = Vec::with_capacity(events.len());
    let mut position = 0;
    for event in events {
        let end = position + event.duration_ticks;
        if let (Some(last), Some(&last_onset)) = (out.last(), out_onsets.last()) {
            let chained = !last.is_rest
                && !event.is_rest
                && !last.is_tuplet()
                && !event.is_tuplet()
                && tied_forward(last.tie_role)
                && tied_backward(event.tie_role);
            let group = context.group_of(last_onset);
            if chained
                && end <= group.end
                && first_unclear_crossing(context, critical, has_sixteenths, last_onset, end, false)
                    .is_none()
            {
                if let Some(spec) = DurationSpec::from_ticks(end - last_onset, divisions) {
                    let mut merged = Event::note(spec, divisions, event.voice);
                    merged.stem = event.stem;
                    merged.set_tie_role(role_for(
                        tied_backward(last.tie_role),
                        tied_forward(event.tie_role),
                    ));
                    merged.set_accent(last.accent);
                    *out.last_mut().unwrap() = merged;
                    position = end;
                    continue;
                }
            }
        }
        out.push(event.clone());
        out_onsets.push(position);
        position = end;
    }
    out
}
