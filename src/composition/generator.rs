// Copyright (c) 2024 The tactus authors

//! The pattern generator: turns settings into one measure's worth of events
//! per voice via frequency-weighted random selection.

use super::{Event, Measure, PatternBitmap, StoredPattern, TimeModification, TupletRole};
use crate::{
    types::{Divisions, DurationSpec, MeterClass, NoteValue, TimeSignature, TimeSignatureContext},
    util::Rng,
};
use derivative::Derivative;
use derive_builder::Builder;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Whether an exercise uses one or two voices.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VoiceMode {
    #[allow(missing_docs)]
    #[default]
    Single,
    #[allow(missing_docs)]
    Double,
}

/// Everything the generator consults. An invalid or missing field degrades to
/// a documented default rather than failing; generation never errors.
#[derive(Clone, Debug, Derivative, Builder, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(rename_all = "kebab-case")]
pub struct GeneratorSettings {
    #[allow(missing_docs)]
    #[builder(default)]
    pub time_signature: TimeSignature,
    #[allow(missing_docs)]
    #[builder(default)]
    pub divisions: Divisions,
    /// Measures produced per generate action.
    #[derivative(Default(value = "4"))]
    #[builder(default = "4")]
    pub measures: usize,
    /// The duration vocabulary. An empty pool degrades to `[quarter]`.
    #[derivative(Default(value = "GeneratorSettings::default_pool()"))]
    #[builder(default = "GeneratorSettings::default_pool()")]
    pub allowed: Vec<NoteValue>,
    /// Per-duration frequency, 0..=100. Missing entries count as 50.
    #[derivative(Default(value = "GeneratorSettings::default_weights()"))]
    #[builder(default = "GeneratorSettings::default_weights()")]
    pub weights: FxHashMap<NoteValue, u8>,
    /// Whether dotted variants of the allowed values may appear.
    #[builder(default)]
    pub dotted_enabled: bool,
    /// Triplet frequency, 0..=100; 0 disables. Simple meters only.
    #[builder(default)]
    pub triplet_frequency: u8,
    /// Duplet frequency, 0..=100; 0 disables. Compound meters only.
    #[builder(default)]
    pub duplet_frequency: u8,
    /// Quadruplet frequency, 0..=100; 0 disables. Compound meters only.
    #[builder(default)]
    pub quadruplet_frequency: u8,
    /// Note density, 0..=100. Higher means fewer rests.
    #[derivative(Default(value = "70"))]
    #[builder(default = "70")]
    pub density: u8,
    #[allow(missing_docs)]
    #[builder(default)]
    pub voice_mode: VoiceMode,
    /// Note density for the second voice.
    #[derivative(Default(value = "50"))]
    #[builder(default = "50")]
    pub secondary_density: u8,
    /// When set, that voice tiles its step pattern instead of being randomly
    /// generated.
    #[builder(default)]
    pub ostinato_voice: Option<u8>,
    /// The ostinato voice's persisted step pattern.
    #[builder(default)]
    pub ostinato_pattern: StoredPattern,
}
impl GeneratorSettings {
    fn default_pool() -> Vec<NoteValue> {
        vec![
            NoteValue::Half,
            NoteValue::Quarter,
            NoteValue::Eighth,
            NoteValue::Sixteenth,
        ]
    }

    fn default_weights() -> FxHashMap<NoteValue, u8> {
        let mut weights = FxHashMap::default();
        weights.insert(NoteValue::Whole, 15);
        weights.insert(NoteValue::Half, 50);
        weights.insert(NoteValue::Quarter, 100);
        weights.insert(NoteValue::Eighth, 85);
        weights.insert(NoteValue::Sixteenth, 45);
        weights
    }

    /// The frequency for one written value, 0..=100.
    pub fn weight_of(&self, value: NoteValue) -> u8 {
        self.weights.get(&value).copied().unwrap_or(50).min(100)
    }

    /// The density for the given voice.
    pub fn density_for(&self, voice: u8) -> u8 {
        if voice == 2 {
            self.secondary_density
        } else {
            self.density
        }
    }
}

/// The perceptual curve from a 0..=100 frequency slider to a sampling weight.
/// The exponent makes low settings rarer than a linear mapping would.
fn frequency_weight(percent: u8) -> f64 {
    (percent.min(100) as f64 / 100.0).powf(1.6)
}

/// Meter-specific bias: compound meters favor eighths over quarters, since an
/// eighth is the compound subdivision unit.
fn meter_bias(context: &TimeSignatureContext, value: NoteValue) -> f64 {
    if context.meter_class() == MeterClass::Compound {
        match value {
            NoteValue::Eighth => 1.5,
            NoteValue::Quarter => 0.7,
            _ => 1.0,
        }
    } else {
        1.0
    }
}

/// Per-event rest probability: floored at 0.05, scaled by how much density
/// the user gave up, and slightly elevated on main-beat onsets.
fn rest_probability(density: u8, on_main_beat: bool) -> f64 {
    let scaled = 0.05 + 0.8 * (1.0 - density.min(100) as f64 / 100.0);
    if on_main_beat {
        (scaled * 1.15).min(0.95)
    } else {
        scaled
    }
}

/// The candidate vocabulary in canonical (largest-first) order: the allowed
/// plain values, plus their dotted variants when enabled.
fn duration_pool(settings: &GeneratorSettings) -> Vec<DurationSpec> {
    let allowed: &[NoteValue] = if settings.allowed.is_empty() {
        &[NoteValue::Quarter]
    } else {
        &settings.allowed
    };
    DurationSpec::CANONICAL
        .iter()
        .filter(|spec| allowed.contains(&spec.value) && (!spec.dotted || settings.dotted_enabled))
        .copied()
        .collect()
}

/// Picks one duration for the current position. Candidates must fit the
/// remaining ticks and must not leave an unfillable remainder; if nothing
/// qualifies, the generator falls back to the largest duration that fits,
/// searching the pool first and then the full canonical table. The fallback
/// ignores the pool's configured order: an arbitrary pool entry could exceed
/// the remainder and overflow the measure, and the canonical sixteenth
/// guarantees any leftover even remainder is still fillable.
fn choose_duration(
    pool: &[DurationSpec],
    settings: &GeneratorSettings,
    context: &TimeSignatureContext,
    remaining: usize,
    rng: &mut Rng,
) -> DurationSpec {
    let divisions = context.divisions();
    let smallest = pool
        .iter()
        .map(|spec| spec.ticks(divisions))
        .min()
        .unwrap_or(NoteValue::Quarter.ticks(divisions));
    let candidates: Vec<DurationSpec> = pool
        .iter()
        .filter(|spec| {
            let ticks = spec.ticks(divisions);
            ticks <= remaining && (remaining - ticks == 0 || remaining - ticks >= smallest)
        })
        .copied()
        .collect();
    if candidates.is_empty() {
        return pool
            .iter()
            .chain(DurationSpec::CANONICAL.iter())
            .find(|spec| spec.ticks(divisions) <= remaining)
            .copied()
            .unwrap_or(DurationSpec::plain(NoteValue::Sixteenth));
    }
    let weights: Vec<f64> = candidates
        .iter()
        .map(|spec| frequency_weight(settings.weight_of(spec.value)) * meter_bias(context, spec.value))
        .collect();
    match rng.pick_weighted(&weights) {
        Some(index) => candidates[index],
        None => candidates[0],
    }
}

/// One tuplet shape a meter offers. Every kind spans exactly one beat; the
/// written value is chosen so that `written x ratio` reproduces the sounding
/// member duration, which is what a renderer recomputes from the ratio.
struct TupletKind {
    modification: TimeModification,
    written: NoteValue,
    count: usize,
    member_ticks: usize,
    weight: f64,
}

/// The tuplet kinds a meter offers: duplets and quadruplets against the
/// compound beat, triplets against the simple (or irregular) beat.
fn tuplet_kinds(settings: &GeneratorSettings, context: &TimeSignatureContext) -> Vec<TupletKind> {
    let divisions = context.divisions();
    let written_for = |ticks: usize| {
        use strum::IntoEnumIterator;
        NoteValue::iter().find(|v| v.ticks(divisions) == ticks)
    };
    let mut kinds = Vec::new();
    match context.meter_class() {
        MeterClass::Compound => {
            // The written value is the compound subdivision unit.
            let main = context.main_beat_ticks();
            let Some(written) = written_for(main / 3) else {
                return kinds;
            };
            if settings.duplet_frequency > 0 && main % 2 == 0 {
                kinds.push(TupletKind {
                    modification: TimeModification::DUPLET,
                    written,
                    count: 2,
                    member_ticks: main / 2,
                    weight: frequency_weight(settings.duplet_frequency),
                });
            }
            if settings.quadruplet_frequency > 0 && main % 4 == 0 {
                kinds.push(TupletKind {
                    modification: TimeModification::QUADRUPLET,
                    written,
                    count: 4,
                    member_ticks: main / 4,
                    weight: frequency_weight(settings.quadruplet_frequency),
                });
            }
        }
        MeterClass::Simple | MeterClass::Irregular => {
            let beat = context.ticks_per_beat();
            if settings.triplet_frequency > 0 && beat % 3 == 0 {
                if let Some(written) = written_for(beat / 2) {
                    kinds.push(TupletKind {
                        modification: TimeModification::TRIPLET,
                        written,
                        count: 3,
                        member_ticks: beat / 3,
                        weight: frequency_weight(settings.triplet_frequency),
                    });
                }
            }
        }
    }
    kinds
}

/// Rolls for a tuplet group at a main-beat position. Returns the whole group
/// when the roll fires.
fn maybe_tuplet(
    settings: &GeneratorSettings,
    context: &TimeSignatureContext,
    remaining: usize,
    voice: u8,
    rng: &mut Rng,
) -> Option<Vec<Event>> {
    let kinds = tuplet_kinds(settings, context);
    if kinds.is_empty() {
        return None;
    }
    let fire: f64 = kinds.iter().map(|k| k.weight).sum::<f64>().min(1.0) * 0.4;
    if !rng.roll(fire) {
        return None;
    }
    let weights: Vec<f64> = kinds.iter().map(|k| k.weight).collect();
    let kind = &kinds[rng.pick_weighted(&weights)?];
    if kind.member_ticks * kind.count > remaining {
        return None;
    }
    let mut group: Vec<Event> = (0..kind.count)
        .map(|_| Event::tuplet_member(kind.written, kind.member_ticks, kind.modification, voice))
        .collect();
    group.first_mut().unwrap().tuplet_role = Some(TupletRole::Start);
    group.last_mut().unwrap().tuplet_role = Some(TupletRole::Stop);
    Some(group)
}

/// Generates one measure for one randomly driven voice. Tick totals always
/// come out exact, and the measure always contains at least one onset.
pub fn generate_measure(
    settings: &GeneratorSettings,
    context: &TimeSignatureContext,
    voice: u8,
    rng: &mut Rng,
) -> Measure {
    let divisions = context.divisions();
    let pool = duration_pool(settings);
    let density = settings.density_for(voice);
    let measure_ticks = context.measure_ticks();
    let mut events = Vec::new();
    let mut position = 0;
    while position < measure_ticks {
        let remaining = measure_ticks - position;
        let on_main_beat = context.is_main_beat(position);
        if on_main_beat {
            if let Some(group) = maybe_tuplet(settings, context, remaining, voice, rng) {
                let span: usize = group.iter().map(|e| e.duration_ticks).sum();
                events.extend(group);
                position += span;
                continue;
            }
        }
        let spec = choose_duration(&pool, settings, context, remaining, rng);
        let event = if rng.roll(rest_probability(density, on_main_beat)) {
            Event::rest(spec, divisions, voice)
        } else {
            Event::note(spec, divisions, voice)
        };
        position += event.duration_ticks;
        events.push(event);
    }
    // Every measure must contain at least one onset.
    if !events.iter().any(|e| !e.is_rest) {
        if let Some(first) = events.first_mut() {
            first.is_rest = false;
        }
    }
    Measure::new_with(events)
}

/// Generates one measure for an ostinato voice by tiling its step pattern,
/// cycling across measures. Steps sound as notes, silent steps as rests;
/// subdivision-group starts are accented.
pub fn generate_ostinato_measure(
    context: &TimeSignatureContext,
    pattern: &PatternBitmap,
    voice: u8,
    measure_index: usize,
) -> Measure {
    let divisions = context.divisions();
    let mut events = Vec::new();
    let mut step = measure_index * pattern.steps_per_bar();
    for group_len in context.group_lengths() {
        // Fall back to a coarser subdivision when the requested one doesn't
        // divide this group into writable values. The stored pattern still
        // allots the group its full run of slots, so sample the first ones
        // and keep later groups reading their own bits.
        let subdivision = (1..=pattern.subdivision())
            .rev()
            .find(|s| {
                group_len % s == 0 && DurationSpec::from_ticks(group_len / s, divisions).is_some()
            })
            .unwrap_or(1);
        let step_ticks = group_len / subdivision;
        let spec = DurationSpec::from_ticks(step_ticks, divisions)
            .unwrap_or(DurationSpec::plain(NoteValue::Quarter));
        for s in 0..subdivision {
            let event = if pattern.is_active(step + s) {
                let mut event = Event::note(spec, divisions, voice);
                event.set_accent(s == 0);
                event
            } else {
                Event::rest(spec, divisions, voice)
            };
            events.push(event);
        }
        step += pattern.subdivision();
    }
    let mut measure = Measure::new_with(events);
    if !measure.has_onset() {
        if let Some(first) = measure.events.first_mut() {
            first.is_rest = false;
        }
    }
    measure
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::reconcile;

    fn ctx(top: usize, bottom: usize) -> TimeSignatureContext {
        TimeSignatureContext::new_with(
            TimeSignature::new_with(top, bottom).unwrap(),
            Divisions::default(),
            0,
        )
    }

    #[test]
    fn generated_measures_conserve_ticks() {
        let mut rng = Rng::new_with_seed(1);
        for (top, bottom) in [(2, 4), (3, 4), (4, 4), (6, 8), (5, 4), (7, 8)] {
            let context = ctx(top, bottom);
            let settings = GeneratorSettingsBuilder::default()
                .time_signature(context.time_signature())
                .dotted_enabled(true)
                .triplet_frequency(50)
                .duplet_frequency(50)
                .build()
                .unwrap();
            for _ in 0..50 {
                let m = generate_measure(&settings, &context, 1, &mut rng);
                assert!(
                    m.is_tick_conserving(&context),
                    "{top}/{bottom}: got {} ticks, wanted {}",
                    m.total_ticks(),
                    context.measure_ticks()
                );
            }
        }
    }

    #[test]
    fn every_measure_has_an_onset() {
        let mut rng = Rng::new_with_seed(2);
        let context = ctx(4, 4);
        let settings = GeneratorSettingsBuilder::default()
            .density(0)
            .build()
            .unwrap();
        for _ in 0..100 {
            let m = generate_measure(&settings, &context, 1, &mut rng);
            assert!(m.has_onset(), "zero density must still force one onset");
        }
    }

    #[test]
    fn empty_pool_degrades_to_quarters() {
        let mut rng = Rng::new_with_seed(3);
        let context = ctx(4, 4);
        let settings = GeneratorSettingsBuilder::default()
            .allowed(Vec::default())
            .build()
            .unwrap();
        let m = generate_measure(&settings, &context, 1, &mut rng);
        assert!(m.is_tick_conserving(&context));
        assert!(m
            .events
            .iter()
            .all(|e| e.value == NoteValue::Quarter && !e.dotted));
    }

    #[test]
    fn zero_weight_values_never_appear() {
        let mut rng = Rng::new_with_seed(4);
        let context = ctx(4, 4);
        let mut weights = FxHashMap::default();
        weights.insert(NoteValue::Quarter, 100);
        weights.insert(NoteValue::Eighth, 0);
        weights.insert(NoteValue::Half, 0);
        weights.insert(NoteValue::Sixteenth, 0);
        let settings = GeneratorSettingsBuilder::default()
            .weights(weights)
            .build()
            .unwrap();
        for _ in 0..20 {
            let m = generate_measure(&settings, &context, 1, &mut rng);
            // The remainder-fill fallback may produce non-quarters, but a
            // zero-weight value should essentially never win a roll; with a
            // quarter-only winner the measure divides evenly, so no fallback
            // is needed at all.
            assert!(m.events.iter().all(|e| e.value == NoteValue::Quarter));
        }
    }

    #[test]
    fn compound_meters_produce_duplets_when_enabled() {
        let mut rng = Rng::new_with_seed(5);
        let context = ctx(6, 8);
        let settings = GeneratorSettingsBuilder::default()
            .time_signature(context.time_signature())
            .duplet_frequency(100)
            .build()
            .unwrap();
        let mut saw_duplet = false;
        for _ in 0..100 {
            let m = generate_measure(&settings, &context, 1, &mut rng);
            assert!(m.is_tick_conserving(&context));
            for e in &m.events {
                if let Some(modification) = e.time_modification {
                    assert_eq!(modification, TimeModification::DUPLET);
                    assert_eq!(e.duration_ticks, 18, "duplet member spans half a main beat");
                    saw_duplet = true;
                }
            }
        }
        assert!(saw_duplet, "100% duplet frequency should fire at least once");
    }

    #[test]
    fn triplets_span_exactly_one_beat() {
        let mut rng = Rng::new_with_seed(6);
        let context = ctx(4, 4);
        let settings = GeneratorSettingsBuilder::default()
            .triplet_frequency(100)
            .build()
            .unwrap();
        let mut saw_triplet = false;
        for _ in 0..100 {
            let m = generate_measure(&settings, &context, 1, &mut rng);
            let onsets = m.onsets();
            for (i, e) in m.events.iter().enumerate() {
                if e.tuplet_role == Some(TupletRole::Start) {
                    assert!(context.is_main_beat(onsets[i]), "tuplets start on beats");
                    assert_eq!(e.duration_ticks, 8);
                    saw_triplet = true;
                }
            }
        }
        assert!(saw_triplet);
    }

    #[test]
    fn ostinato_tiles_and_cycles() {
        let context = ctx(4, 4);
        let stored = StoredPattern {
            enabled: true,
            subdivision: 1,
            bars: 1,
            steps: vec![1, 0, 1, 0],
            version: StoredPattern::VERSION,
        };
        let pattern = reconcile(&stored, &context);
        for measure_index in 0..3 {
            let m = generate_ostinato_measure(&context, &pattern, 2, measure_index);
            assert!(m.is_tick_conserving(&context));
            let rests: Vec<bool> = m.events.iter().map(|e| e.is_rest).collect();
            assert_eq!(rests, vec![false, true, false, true], "pattern cycles");
            assert!(m.events[0].accent);
        }
    }

    #[test]
    fn ostinato_subdivision_fallback_keeps_bar_alignment() {
        // 6/8 groups are 36 ticks; subdivision 4 doesn't divide them into
        // writable values (9 ticks has no written form), so each group
        // degrades to 3 eighth-note steps while the stored bar keeps its
        // 2 x 4 slot layout.
        let context = ctx(6, 8);
        let stored = StoredPattern {
            enabled: true,
            subdivision: 4,
            bars: 1,
            steps: vec![1, 0, 0, 1, 1, 0, 0, 1],
            version: StoredPattern::VERSION,
        };
        let pattern = reconcile(&stored, &context);
        assert_eq!(pattern.steps_per_bar(), 8);

        let m = generate_ostinato_measure(&context, &pattern, 2, 0);
        assert!(m.is_tick_conserving(&context));
        assert_eq!(m.events.len(), 6);
        let rests: Vec<bool> = m.events.iter().map(|e| e.is_rest).collect();
        assert_eq!(
            rests,
            vec![false, true, true, false, true, true],
            "the second group samples the bar's fifth stored slot, not its fourth"
        );
    }
}
