use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{effects::EffectBinding, time::beats_to_samples};

pub const DEFAULT_BPM: i32 = 120;
/// A sample declared without `volume` is silent.
pub const DEFAULT_VOLUME: i32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Beat {
    Rest,
    Half,
    Full,
    Stop,
}

impl Beat {
    pub const ALL: [Self; 4] = [Self::Rest, Self::Half, Self::Full, Self::Stop];

    #[must_use]
    pub const fn from_glyph(glyph: char) -> Option<Self> {
        match glyph {
            '.' => Some(Self::Rest),
            '-' | '/' => Some(Self::Half),
            '!' => Some(Self::Full),
            ':' | '_' => Some(Self::Stop),
            _ => None,
        }
    }

    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::Rest => '.',
            Self::Half => '-',
            Self::Full => '!',
            Self::Stop => ':',
        }
    }

    /// Trigger gain for beats that restart playback.
    #[must_use]
    pub const fn trigger_gain(self) -> Option<f32> {
        match self {
            Self::Half => Some(0.5),
            Self::Full => Some(1.0),
            Self::Rest | Self::Stop => None,
        }
    }
}

/// Converts a glyph string into beats, skipping whitespace. Returns the first
/// character that is not a beat glyph.
pub fn parse_beats(glyphs: &str) -> Result<Vec<Beat>, char> {
    glyphs
        .chars()
        .filter(|glyph| !matches!(glyph, ' ' | '\t' | '\r' | '\n'))
        .map(|glyph| Beat::from_glyph(glyph).ok_or(glyph))
        .collect()
}

#[must_use]
pub fn format_beats(beats: &[Beat]) -> String {
    beats.iter().map(|beat| beat.glyph()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub path: String,
    pub volume: i32,
    #[serde(default)]
    pub effect: EffectBinding,
}

impl Default for Sample {
    fn default() -> Self {
        Self {
            path: String::new(),
            volume: DEFAULT_VOLUME,
            effect: EffectBinding::default(),
        }
    }
}

impl Sample {
    #[must_use]
    pub fn new(path: impl Into<String>, volume: i32) -> Self {
        Self {
            path: path.into(),
            volume,
            effect: EffectBinding::default(),
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: EffectBinding) -> Self {
        self.effect = effect;
        self
    }

    #[must_use]
    pub fn volume_scale(&self) -> f32 {
        self.volume as f32 / 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phrase {
    pub bpm: i32,
    pub beats: BTreeMap<String, Vec<Beat>>,
}

impl Default for Phrase {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            beats: BTreeMap::new(),
        }
    }
}

impl Phrase {
    #[must_use]
    pub fn beat_count(&self) -> usize {
        self.beats.values().map(Vec::len).max().unwrap_or_default()
    }

    #[must_use]
    pub fn span_samples(&self) -> usize {
        beats_to_samples(self.beat_count(), self.bpm)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub samples: BTreeMap<String, Sample>,
    pub phrases: BTreeMap<String, Phrase>,
    pub output: Vec<String>,
}

impl Song {
    #[must_use]
    pub fn phrase(&self, name: &str) -> Option<&Phrase> {
        self.phrases.get(name)
    }

    /// Samples covered by one output step; unknown phrases cover nothing.
    #[must_use]
    pub fn phrase_span_samples(&self, name: &str) -> usize {
        self.phrase(name).map_or(0, Phrase::span_samples)
    }

    #[must_use]
    pub fn total_samples(&self) -> usize {
        self.output
            .iter()
            .map(|name| self.phrase_span_samples(name))
            .sum()
    }

    pub fn dangling_references(&self) -> impl Iterator<Item = &str> {
        self.output
            .iter()
            .filter(|name| !self.phrases.contains_key(name.as_str()))
            .map(String::as_str)
    }
}
