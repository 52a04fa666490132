// Copyright (c) 2024 The tactus authors

//! End-to-end checks of the notation pipeline: generate, normalize, beam,
//! export.

use tactus::prelude::*;
use tactus::util::Rng;

fn context_for(top: usize, bottom: usize, measure_index: usize) -> TimeSignatureContext {
    TimeSignatureContext::new_with(
        TimeSignature::new_with(top, bottom).unwrap(),
        Divisions::default(),
        measure_index,
    )
}

/// Walks every tie chain and confirms it is well-formed: a start eventually
/// reaches a stop, and no continuation appears without an open chain.
fn assert_tie_closure(measure: &Measure) {
    let mut open = false;
    for event in &measure.events {
        match event.tie_role {
            Some(TieRole::Start) => {
                assert!(!open, "a new tie chain can't start inside another");
                open = true;
            }
            Some(TieRole::Continue) => {
                assert!(open, "continue without a preceding start");
            }
            Some(TieRole::Stop) => {
                assert!(open, "stop without a preceding start");
                open = false;
            }
            None => {
                assert!(!open, "an untied event can't interrupt an open chain");
            }
        }
    }
    assert!(!open, "every tie chain must close within the measure");
}

#[test]
fn pipeline_holds_its_invariants_across_meters() {
    let mut rng = Rng::new_with_seed(2024);
    for (top, bottom) in [(2, 4), (3, 4), (4, 4), (6, 8), (9, 8), (5, 4), (7, 8)] {
        let settings = GeneratorSettingsBuilder::default()
            .time_signature(TimeSignature::new_with(top, bottom).unwrap())
            .dotted_enabled(true)
            .triplet_frequency(30)
            .duplet_frequency(30)
            .quadruplet_frequency(15)
            .build()
            .unwrap();
        for measure_index in 0..20 {
            let context = context_for(top, bottom, measure_index);
            let raw = generate_measure(&settings, &context, 1, &mut rng);
            assert_eq!(raw.total_ticks(), context.measure_ticks());

            let normalized = normalize(&raw, &context);
            assert_eq!(
                normalized.total_ticks(),
                context.measure_ticks(),
                "{top}/{bottom}: normalization must conserve ticks"
            );
            assert_eq!(
                normalize(&normalized, &context),
                normalized,
                "{top}/{bottom}: normalization must be idempotent"
            );
            assert!(normalized.has_onset());
            assert_tie_closure(&normalized);

            // A rest may never span a critical beat, whatever the meter.
            let finest = normalized.finest_ticks(context.measure_ticks());
            let critical = context.critical_beats(finest);
            let starts = normalized.onsets();
            for (event, &start) in normalized.events.iter().zip(&starts) {
                if event.is_rest {
                    let end = start + event.duration_ticks;
                    assert!(
                        !critical.iter().any(|&b| start < b && b < end),
                        "{top}/{bottom}: rest {start}..{end} spans a critical beat"
                    );
                }
            }

            let beamed = assign_beams(&normalized, &context);
            assert_eq!(beamed.total_ticks(), context.measure_ticks());
            for event in &beamed.events {
                if event.is_rest {
                    assert!(event.tie_role.is_none(), "rests never tie");
                    assert!(event.beams.is_empty(), "rests never beam");
                    assert!(!event.accent, "rests never accent");
                }
                if !event.is_beamable() {
                    assert!(event.beams.is_empty());
                }
            }
        }
    }
}

#[test]
fn exported_document_reflects_the_generated_events() {
    let mut rng = Rng::new_with_seed(7);
    let context = context_for(4, 4, 0);
    let settings = GeneratorSettingsBuilder::default().build().unwrap();
    let raw = generate_measure(&settings, &context, 1, &mut rng);
    let measure = assign_beams(&normalize(&raw, &context), &context);
    let voices = vec![Voice::new_with(1, vec![measure.clone()])];
    let xml = to_musicxml(
        &voices,
        TimeSignature::COMMON_TIME,
        Divisions::default(),
        Some("Sight Reading"),
    )
    .unwrap();

    assert!(xml.contains("<divisions>24</divisions>"));
    assert_eq!(
        xml.matches("<note>").count(),
        measure.events.len(),
        "one <note> element per event"
    );
    let rest_count = measure.events.iter().filter(|e| e.is_rest).count();
    assert_eq!(xml.matches("<rest>").count(), rest_count);
}

#[test]
fn session_generates_navigates_and_exports() {
    let settings = GeneratorSettingsBuilder::default()
        .voice_mode(VoiceMode::Double)
        .measures(2)
        .build()
        .unwrap();
    let mut session = Session::new_with(settings);
    session.generate();
    let first = session.voices().to_vec();
    session.generate();
    assert!(session.back());
    assert_eq!(session.voices(), &first[..]);

    let xml = session.export_musicxml(None).unwrap();
    assert!(xml.contains("<backup>"), "two voices interleave via backup");
    assert_eq!(xml.matches("<measure number=").count(), 2);
}
