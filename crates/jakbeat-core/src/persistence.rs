use std::{fmt::Write as _, fs, io::Write as _, path::Path};

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::{
    builder::{OUTPUT_KEY, WHAT_SECTION, WHO_SECTION, build_song},
    document::parse_document,
    model::{Song, format_beats},
    value::Value,
};

fn needs_quotes(text: &str) -> bool {
    text.is_empty()
        || text
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '[' | ']' | '(' | ')' | '='))
}

fn push_token(out: &mut String, text: &str) {
    if needs_quotes(text) {
        let _ = write!(out, "\"{text}\"");
    } else {
        out.push_str(text);
    }
}

fn push_value(out: &mut String, value: &Value) {
    match value {
        Value::Scalar(text) => push_token(out, text),
        Value::List(items) => {
            out.push('(');
            for item in items {
                out.push(' ');
                push_value(out, item);
            }
            out.push_str(" )");
        }
        Value::Option(option) => {
            push_token(out, &option.name);
            out.push_str(" = ");
            push_value(out, &option.value);
        }
    }
}

fn push_section_header(out: &mut String, name: &str) {
    if !out.is_empty() {
        out.push('\n');
    }
    out.push('[');
    push_token(out, name);
    out.push_str("]\n");
}

/// Emits `song` as a beat document. Compiling the result yields an equal
/// [`Song`], with two exceptions: a scalar that needs quoting and contains `"`
/// is written as is, and a phrase named `Output` gets no bpm line (that key
/// holds the output list), so it compiles back with the default bpm.
#[must_use]
pub fn write_document(song: &Song) -> String {
    let mut out = String::new();

    push_section_header(&mut out, WHO_SECTION);
    for (name, sample) in &song.samples {
        push_token(&mut out, name);
        out.push_str(" = ( path = ");
        push_token(&mut out, &sample.path);
        let _ = write!(out, " volume = {} stereo = ", sample.volume);
        push_token(&mut out, &sample.effect.name);
        if let Some(params) = &sample.effect.params {
            out.push_str(" params = ");
            push_value(&mut out, params);
        }
        out.push_str(" )\n");
    }

    push_section_header(&mut out, WHAT_SECTION);
    out.push_str(OUTPUT_KEY);
    out.push_str(" = (");
    for phrase in &song.output {
        out.push(' ');
        push_token(&mut out, phrase);
    }
    out.push_str(" )\n");
    for (name, phrase) in song.phrases.iter().filter(|(name, _)| *name != OUTPUT_KEY) {
        push_token(&mut out, name);
        let _ = writeln!(out, " = ( bpm = {} )", phrase.bpm);
    }

    for (name, phrase) in song.phrases.iter().filter(|(_, phrase)| !phrase.beats.is_empty()) {
        push_section_header(&mut out, name);
        for (track, beats) in &phrase.beats {
            push_token(&mut out, track);
            let _ = writeln!(out, " = \"{}\"", format_beats(beats));
        }
    }

    out
}

#[instrument(skip(song), fields(samples = song.samples.len(), phrases = song.phrases.len(), path = %path.display()))]
pub fn save_song(path: &Path, song: &Song) -> Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create directory: {}", parent.display()))?;

    let document = write_document(song);
    let mut temp_file =
        tempfile::NamedTempFile::new_in(parent).context("failed to create temp document file")?;
    temp_file
        .write_all(document.as_bytes())
        .context("failed to write temp document file")?;
    temp_file
        .persist(path)
        .map_err(|error| anyhow::anyhow!(error.error))
        .with_context(|| format!("failed to persist document: {}", path.display()))?;

    info!(bytes = document.len(), "song saved");
    Ok(())
}

#[instrument(fields(path = %path.display()))]
pub fn load_song(path: &Path) -> Result<Song> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read document: {}", path.display()))?;
    let sections = parse_document(&source)
        .with_context(|| format!("invalid document: {}", path.display()))?;
    let song = build_song(&sections)
        .with_context(|| format!("invalid song model: {}", path.display()))?;

    debug!(sections = sections.len(), "document compiled");
    info!(samples = song.samples.len(), phrases = song.phrases.len(), "song loaded");
    Ok(song)
}
