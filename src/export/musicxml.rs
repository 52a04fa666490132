// Copyright (c) 2024 The tactus authors

//! Serializes a normalized, beamed exercise as a MusicXML score-partwise
//! document for an external renderer.

use crate::{
    composition::{Event, Stem, TieRole, TupletRole, Voice},
    types::{Divisions, TimeSignature},
};
use thiserror::Error;

/// Ways an export can fail. Generation never produces these shapes, but the
/// adapter accepts arbitrary voices.
#[derive(Debug, Error, PartialEq)]
pub enum ExportError {
    /// No voices were provided.
    #[error("nothing to export: no voices")]
    Empty,
    /// Voices must agree on measure count to interleave.
    #[error("voices disagree on measure count: {0} vs {1}")]
    MeasureCountMismatch(usize, usize),
}

/// Rhythm is displayed on fixed pitches: voice 1 rides the middle staff line,
/// voice 2 below it.
fn display_pitch(voice: u8) -> (&'static str, u8) {
    if voice == 2 {
        ("D", 4)
    } else {
        ("B", 4)
    }
}

/// Renders the exercise as a complete MusicXML document: one part, one
/// `<note>` per event, with ties, tuplet ratios, stems, and beams carried
/// through. Two voices interleave within each measure via `<backup>`.
pub fn to_musicxml(
    voices: &[Voice],
    time_signature: TimeSignature,
    divisions: Divisions,
    title: Option<&str>,
) -> Result<String, ExportError> {
    let Some(first) = voices.first() else {
        return Err(ExportError::Empty);
    };
    for voice in &voices[1..] {
        if voice.measures.len() != first.measures.len() {
            return Err(ExportError::MeasureCountMismatch(
                first.measures.len(),
                voice.measures.len(),
            ));
        }
    }

    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(r#"<!DOCTYPE score-partwise PUBLIC "-//Recordare//DTD MusicXML 4.0 Partwise//EN" "http://www.musicxml.org/dtds/partwise.dtd">"#);
    xml.push('\n');
    xml.push_str(r#"<score-partwise version="4.0">"#);
    xml.push('\n');

    if let Some(title) = title {
        xml.push_str("  <work>\n");
        xml.push_str(&format!(
            "    <work-title>{}</work-title>\n",
            escape_xml(title)
        ));
        xml.push_str("  </work>\n");
    }

    xml.push_str("  <part-list>\n");
    xml.push_str("    <score-part id=\"P1\">\n");
    xml.push_str("      <part-name>Rhythm</part-name>\n");
    xml.push_str("    </score-part>\n");
    xml.push_str("  </part-list>\n");
    xml.push_str("  <part id=\"P1\">\n");

    let ticks_per_measure: usize = divisions.0 * 4 * time_signature.top() / time_signature.bottom();
    for measure_index in 0..first.measures.len() {
        xml.push_str(&format!("    <measure number=\"{}\">\n", measure_index + 1));
        if measure_index == 0 {
            xml.push_str("      <attributes>\n");
            xml.push_str(&format!(
                "        <divisions>{}</divisions>\n",
                divisions.0
            ));
            xml.push_str("        <time>\n");
            xml.push_str(&format!("          <beats>{}</beats>\n", time_signature.top()));
            xml.push_str(&format!(
                "          <beat-type>{}</beat-type>\n",
                time_signature.bottom()
            ));
            xml.push_str("        </time>\n");
            xml.push_str("        <clef>\n");
            xml.push_str("          <sign>G</sign>\n");
            xml.push_str("          <line>2</line>\n");
            xml.push_str("        </clef>\n");
            xml.push_str("      </attributes>\n");
        }
        for (voice_index, voice) in voices.iter().enumerate() {
            if voice_index > 0 {
                xml.push_str("      <backup>\n");
                xml.push_str(&format!(
                    "        <duration>{ticks_per_measure}</duration>\n"
                ));
                xml.push_str("      </backup>\n");
            }
            for event in &voice.measures[measure_index].events {
                xml.push_str(&note_to_xml(event));
            }
        }
        xml.push_str("    </measure>\n");
    }

    xml.push_str("  </part>\n");
    xml.push_str("</score-partwise>\n");
    Ok(xml)
}

fn note_to_xml(event: &Event) -> String {
    let mut xml = String::new();
    xml.push_str("      <note>\n");

    let (step, octave) = display_pitch(event.voice);
    if event.is_rest {
        xml.push_str("        <rest>\n");
        xml.push_str(&format!("          <display-step>{step}</display-step>\n"));
        xml.push_str(&format!(
            "          <display-octave>{octave}</display-octave>\n"
        ));
        xml.push_str("        </rest>\n");
    } else {
        xml.push_str("        <pitch>\n");
        xml.push_str(&format!("          <step>{step}</step>\n"));
        xml.push_str(&format!("          <octave>{octave}</octave>\n"));
        xml.push_str("        </pitch>\n");
    }

    xml.push_str(&format!(
        "        <duration>{}</duration>\n",
        event.duration_ticks
    ));

    match event.tie_role {
        Some(TieRole::Start) => xml.push_str("        <tie type=\"start\"/>\n"),
        Some(TieRole::Stop) => xml.push_str("        <tie type=\"stop\"/>\n"),
        Some(TieRole::Continue) => {
            xml.push_str("        <tie type=\"stop\"/>\n");
            xml.push_str("        <tie type=\"start\"/>\n");
        }
        None => {}
    }

    xml.push_str(&format!("        <voice>{}</voice>\n", event.voice));
    let type_name: &'static str = event.value.into();
    xml.push_str(&format!("        <type>{type_name}</type>\n"));
    if event.dotted {
        xml.push_str("        <dot/>\n");
    }

    if let Some(modification) = event.time_modification {
        xml.push_str("        <time-modification>\n");
        xml.push_str(&format!(
            "          <actual-notes>{}</actual-notes>\n",
            modification.actual
        ));
        xml.push_str(&format!(
            "          <normal-notes>{}</normal-notes>\n",
            modification.normal
        ));
        xml.push_str("        </time-modification>\n");
    }

    if !event.is_rest {
        let stem = match event.stem {
            Stem::Up => "up",
            Stem::Down => "down",
        };
        xml.push_str(&format!("        <stem>{stem}</stem>\n"));
        for (level, state) in event.beams.iter().enumerate() {
            let state_name: &'static str = (*state).into();
            xml.push_str(&format!(
                "        <beam number=\"{}\">{state_name}</beam>\n",
                level + 1
            ));
        }
    }

    let mut notations = String::new();
    match event.tie_role {
        Some(TieRole::Start) => notations.push_str("          <tied type=\"start\"/>\n"),
        Some(TieRole::Stop) => notations.push_str("          <tied type=\"stop\"/>\n"),
        Some(TieRole::Continue) => {
            notations.push_str("          <tied type=\"stop\"/>\n");
            notations.push_str("          <tied type=\"start\"/>\n");
        }
        None => {}
    }
    match event.tuplet_role {
        Some(TupletRole::Start) => {
            notations.push_str("          <tuplet type=\"start\" number=\"1\"/>\n")
        }
        Some(TupletRole::Stop) => {
            notations.push_str("          <tuplet type=\"stop\" number=\"1\"/>\n")
        }
        None => {}
    }
    if event.accent {
        notations.push_str("          <articulations>\n");
        notations.push_str("            <accent/>\n");
        notations.push_str("          </articulations>\n");
    }
    if !notations.is_empty() {
        xml.push_str("        <notations>\n");
        xml.push_str(&notations);
        xml.push_str("        </notations>\n");
    }

    xml.push_str("      </note>\n");
    xml
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
