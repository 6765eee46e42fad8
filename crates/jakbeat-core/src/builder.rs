use thiserror::Error;
use tracing::{debug, instrument};

use crate::{
    effects::EffectBinding,
    model::{Song, parse_beats},
    value::{OptionNode, Section, Value, parse_int_lenient},
};

pub const WHO_SECTION: &str = "WHO";
pub const WHAT_SECTION: &str = "WHAT";
pub const OUTPUT_KEY: &str = "Output";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("[{section}] {key}: expected {expected}, found {found}")]
    UnexpectedKind {
        section: String,
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("[{section}] unknown key `{key}`")]
    UnknownKey { section: String, key: String },
    #[error("[{section}] {track}: unknown beat character {glyph:?}")]
    UnknownBeat {
        section: String,
        track: String,
        glyph: char,
    },
    #[error("[{section}] {track}: beat grids given as {found} are not implemented")]
    NotImplemented {
        section: String,
        track: String,
        found: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind<'a> {
    Who,
    What,
    Phrase(&'a str),
}

impl<'a> SectionKind<'a> {
    #[must_use]
    pub fn of(name: &'a str) -> Self {
        match name {
            WHO_SECTION => Self::Who,
            WHAT_SECTION => Self::What,
            phrase => Self::Phrase(phrase),
        }
    }
}

enum WhatEntry<'a> {
    Output(&'a Value),
    Phrase(&'a str, &'a Value),
}

impl<'a> WhatEntry<'a> {
    fn of(option: &'a OptionNode) -> Self {
        if option.name == OUTPUT_KEY {
            Self::Output(&option.value)
        } else {
            Self::Phrase(&option.name, &option.value)
        }
    }
}

/// Folds parsed sections into a [`Song`], one section at a time. Cross
/// references are not checked here; the renderer treats dangling output
/// entries as silence.
#[derive(Debug, Default)]
pub struct SongBuilder {
    song: Song,
}

impl SongBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_song(song: Song) -> Self {
        Self { song }
    }

    #[must_use]
    pub fn song(&self) -> &Song {
        &self.song
    }

    #[must_use]
    pub fn finish(self) -> Song {
        self.song
    }

    #[instrument(skip(self, section), fields(section = %section.name, options = section.options.len()))]
    pub fn add(&mut self, section: &Section) -> Result<(), ValidationError> {
        match SectionKind::of(&section.name) {
            SectionKind::Who => self.add_who(section)?,
            SectionKind::What => self.add_what(section)?,
            SectionKind::Phrase(phrase) => self.add_beats(phrase, section)?,
        }
        debug!("section accepted");
        Ok(())
    }

    pub fn add_all<'a>(
        &mut self,
        sections: impl IntoIterator<Item = &'a Section>,
    ) -> Result<(), ValidationError> {
        sections
            .into_iter()
            .try_for_each(|section| self.add(section))
    }

    fn add_who(&mut self, section: &Section) -> Result<(), ValidationError> {
        for entry in &section.options {
            let fields = expect_list(WHO_SECTION, &entry.name, &entry.value)?;
            let sample = self.song.samples.entry(entry.name.clone()).or_default();

            for field in fields {
                let field = expect_option(WHO_SECTION, &entry.name, field)?;
                match field.name.as_str() {
                    "path" => {
                        sample.path = expect_scalar(WHO_SECTION, &field.name, &field.value)?
                            .to_string();
                    }
                    "volume" => {
                        sample.volume = parse_int_lenient(expect_scalar(
                            WHO_SECTION,
                            &field.name,
                            &field.value,
                        )?);
                    }
                    "stereo" => {
                        let name = expect_scalar(WHO_SECTION, &field.name, &field.value)?;
                        sample.effect = EffectBinding::new(name, sample.effect.params.take());
                    }
                    "params" => {
                        let name = std::mem::take(&mut sample.effect.name);
                        sample.effect = EffectBinding::new(name, Some((*field.value).clone()));
                    }
                    _ => {
                        return Err(ValidationError::UnknownKey {
                            section: WHO_SECTION.to_string(),
                            key: field.name.clone(),
                        });
                    }
                }
            }

            debug!(
                sample = %entry.name,
                path = %sample.path,
                volume = sample.volume,
                effect = %sample.effect.name,
                "sample declared"
            );
        }
        Ok(())
    }

    fn add_what(&mut self, section: &Section) -> Result<(), ValidationError> {
        for entry in &section.options {
            match WhatEntry::of(entry) {
                WhatEntry::Output(Value::Scalar(phrase)) => self.song.output.push(phrase.clone()),
                WhatEntry::Output(Value::List(phrases)) => {
                    for phrase in phrases {
                        let phrase = expect_scalar(WHAT_SECTION, OUTPUT_KEY, phrase)?;
                        self.song.output.push(phrase.to_string());
                    }
                }
                WhatEntry::Output(other) => {
                    return Err(unexpected(WHAT_SECTION, OUTPUT_KEY, "scalar or list", other));
                }
                WhatEntry::Phrase(name, value) => {
                    let fields = expect_list(WHAT_SECTION, name, value)?;
                    let phrase = self.song.phrases.entry(name.to_string()).or_default();
                    for field in fields {
                        let field = expect_option(WHAT_SECTION, name, field)?;
                        if field.name != "bpm" {
                            return Err(ValidationError::UnknownKey {
                                section: WHAT_SECTION.to_string(),
                                key: field.name.clone(),
                            });
                        }
                        phrase.bpm =
                            parse_int_lenient(expect_scalar(WHAT_SECTION, "bpm", &field.value)?);
                    }
                    debug!(phrase = name, bpm = phrase.bpm, "phrase declared");
                }
            }
        }
        Ok(())
    }

    fn add_beats(&mut self, phrase_name: &str, section: &Section) -> Result<(), ValidationError> {
        let phrase = self
            .song
            .phrases
            .entry(phrase_name.to_string())
            .or_default();

        for entry in &section.options {
            let Value::Scalar(glyphs) = entry.value.as_ref() else {
                return Err(ValidationError::NotImplemented {
                    section: phrase_name.to_string(),
                    track: entry.name.clone(),
                    found: entry.value.kind(),
                });
            };
            let beats = parse_beats(glyphs).map_err(|glyph| ValidationError::UnknownBeat {
                section: phrase_name.to_string(),
                track: entry.name.clone(),
                glyph,
            })?;

            debug!(phrase = phrase_name, track = %entry.name, beats = beats.len(), "beat grid added");
            phrase
                .beats
                .entry(entry.name.clone())
                .or_default()
                .extend(beats);
        }
        Ok(())
    }
}

/// Builds a song from a full sequence of sections.
pub fn build_song<'a>(
    sections: impl IntoIterator<Item = &'a Section>,
) -> Result<Song, ValidationError> {
    let mut builder = SongBuilder::new();
    builder.add_all(sections)?;
    Ok(builder.finish())
}

fn unexpected(section: &str, key: &str, expected: &'static str, found: &Value) -> ValidationError {
    ValidationError::UnexpectedKind {
        section: section.to_string(),
        key: key.to_string(),
        expected,
        found: found.kind(),
    }
}

fn expect_scalar<'v>(section: &str, key: &str, value: &'v Value) -> Result<&'v str, ValidationError> {
    value
        .as_scalar()
        .ok_or_else(|| unexpected(section, key, "scalar", value))
}

fn expect_list<'v>(
    section: &str,
    key: &str,
    value: &'v Value,
) -> Result<&'v [Value], ValidationError> {
    match value {
        Value::List(values) => Ok(values),
        Value::Scalar(_) | Value::Option(_) => Err(unexpected(section, key, "list", value)),
    }
}

fn expect_option<'v>(
    section: &str,
    key: &str,
    value: &'v Value,
) -> Result<&'v OptionNode, ValidationError> {
    match value {
        Value::Option(option) => Ok(option),
        Value::Scalar(_) | Value::List(_) => Err(unexpected(section, key, "option", value)),
    }
}
