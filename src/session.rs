// Copyright (c) 2024 The tactus authors

//! The top-level session: settings, the current exercise, and navigation
//! through past generations.

use crate::{
    composition::{
        assign_beams, generate_measure, generate_ostinato_measure, normalize, reconcile,
        GenerationHistory, GeneratorSettings, StoredPattern, Voice, VoiceMode,
    },
    export::{to_musicxml, ExportError},
    performance::{playback_events, CalibrationMatcher, PerformanceScheduler},
    traits::{Configurable, HasSettings, Serializable},
    types::{Tempo, TimeSignature, TimeSignatureContext},
    util::Rng,
};
use derivative::Derivative;
use serde::{Deserialize, Serialize};

/// Parts of [Session] that shouldn't be serialized.
#[derive(Debug, Default)]
pub struct SessionEphemerals {
    history: GenerationHistory,
    rng: Rng,
    settings_have_been_saved: bool,
}

/// A [Session] owns everything one practice sitting needs: the generator
/// settings, the current exercise, the metronome pattern, and a bounded
/// history of past generations. Generation runs through pure functions; the
/// session only holds the results.
#[derive(Debug, Derivative, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(rename_all = "kebab-case")]
pub struct Session {
    settings: GeneratorSettings,
    tempo: Tempo,
    metronome_pattern: StoredPattern,
    calibration_enabled: bool,
    voices: Vec<Voice>,

    #[serde(skip)]
    #[derivative(Default(value = "SessionEphemerals::default()"))]
    e: SessionEphemerals,
}
impl Session {
    /// Creates a session with the given settings and a random seed.
    pub fn new_with(settings: GeneratorSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    #[allow(missing_docs)]
    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    /// Replaces the generator settings.
    pub fn set_settings(&mut self, settings: GeneratorSettings) {
        self.settings = settings;
        self.needs_save();
    }

    #[allow(missing_docs)]
    pub fn metronome_pattern(&self) -> &StoredPattern {
        &self.metronome_pattern
    }

    #[allow(missing_docs)]
    pub fn set_metronome_pattern(&mut self, pattern: StoredPattern) {
        self.metronome_pattern = pattern;
        self.needs_save();
    }

    #[allow(missing_docs)]
    pub fn calibration_enabled(&self) -> bool {
        self.calibration_enabled
    }

    #[allow(missing_docs)]
    pub fn set_calibration_enabled(&mut self, enabled: bool) {
        self.calibration_enabled = enabled;
        self.needs_save();
    }

    /// The current exercise, one [Voice] per active voice.
    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// The context for one measure of the current meter.
    pub fn context_for(&self, measure_index: usize) -> TimeSignatureContext {
        TimeSignatureContext::new_with(
            self.settings.time_signature,
            self.settings.divisions,
            measure_index,
        )
    }

    /// Generates a fresh exercise: random (or ostinato) events per measure
    /// and voice, normalized for beat clarity and beamed, then recorded in
    /// the history.
    pub fn generate(&mut self) -> &[Voice] {
        let voice_numbers: &[u8] = match self.settings.voice_mode {
            VoiceMode::Single => &[1],
            VoiceMode::Double => &[1, 2],
        };
        let measure_count = self.settings.measures.max(1);
        let mut voices = Vec::with_capacity(voice_numbers.len());
        for &number in voice_numbers {
            let mut measures = Vec::with_capacity(measure_count);
            for measure_index in 0..measure_count {
                let context = self.context_for(measure_index);
                let raw = if self.settings.ostinato_voice == Some(number) {
                    let pattern = reconcile(&self.settings.ostinato_pattern, &context);
                    generate_ostinato_measure(&context, &pattern, number, measure_index)
                } else {
                    generate_measure(&self.settings, &context, number, &mut self.e.rng)
                };
                let normalized = normalize(&raw, &context);
                measures.push(assign_beams(&normalized, &context));
            }
            voices.push(Voice::new_with(number, measures));
        }
        self.e.history.push(voices.clone());
        self.voices = voices;
        &self.voices
    }

    /// Steps to the previous generation, if any.
    pub fn back(&mut self) -> bool {
        if let Some(voices) = self.e.history.back() {
            self.voices = voices.clone();
            true
        } else {
            false
        }
    }

    /// Steps to the next generation, if any.
    pub fn forward(&mut self) -> bool {
        if let Some(voices) = self.e.history.forward() {
            self.voices = voices.clone();
            true
        } else {
            false
        }
    }

    /// Exports the current exercise for an external renderer.
    pub fn export_musicxml(&self, title: Option<&str>) -> Result<String, ExportError> {
        to_musicxml(
            &self.voices,
            self.settings.time_signature,
            self.settings.divisions,
            title,
        )
    }

    /// Builds a scheduler for the current exercise at the current tempo.
    pub fn make_scheduler(&self) -> PerformanceScheduler {
        let context = self.context_for(0);
        let measure_ticks = context.measure_ticks();
        let events = playback_events(&self.voices, measure_ticks);
        let total_ticks = crate::performance::total_ticks(&self.voices, measure_ticks);
        let metronome = if self.metronome_pattern.enabled {
            Some(reconcile(&self.metronome_pattern, &context))
        } else {
            None
        };
        PerformanceScheduler::new_with(context, self.tempo, &events, total_ticks, metronome)
    }

    /// Serializes the session for persistence.
    pub fn to_json(&mut self) -> anyhow::Result<String> {
        self.before_ser();
        Ok(serde_json::to_string(self)?)
    }

    /// Restores a persisted session. The restored exercise seeds the
    /// generation history.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let mut session: Self = serde_json::from_str(json)?;
        session.after_deser();
        Ok(session)
    }

    /// Builds a calibration matcher for the current exercise, when
    /// calibration is enabled.
    pub fn make_matcher(&self) -> Option<CalibrationMatcher> {
        if !self.calibration_enabled {
            return None;
        }
        let context = self.context_for(0);
        let events = playback_events(&self.voices, context.measure_ticks());
        Some(CalibrationMatcher::new_with(
            &events,
            self.tempo,
            context.seconds_per_tick(self.tempo),
            self.settings.voice_mode,
        ))
    }
}
impl Configurable for Session {
    fn tempo(&self) -> Tempo {
        self.tempo
    }

    fn update_tempo(&mut self, tempo: Tempo) {
        self.tempo = Tempo(tempo.0.clamp(Tempo::MIN_VALUE, Tempo::MAX_VALUE));
        self.needs_save();
    }

    fn time_signature(&self) -> TimeSignature {
        self.settings.time_signature
    }

    fn update_time_signature(&mut self, time_signature: TimeSignature) {
        self.settings.time_signature = time_signature;
        self.needs_save();
    }
}
impl HasSettings for Session {
    fn has_been_saved(&self) -> bool {
        self.e.settings_have_been_saved
    }

    fn needs_save(&mut self) {
        self.e.settings_have_been_saved = false;
    }

    fn mark_clean(&mut self) {
        self.e.settings_have_been_saved = true;
    }
}
impl Serializable for Session {
    fn after_deser(&mut self) {
        // The loaded exercise becomes the first history entry.
        if !self.voices.is_empty() {
            self.e.history.push(self.voices.clone());
        }
        self.mark_clean();
    }
}
