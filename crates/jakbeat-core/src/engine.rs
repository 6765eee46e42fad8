use std::{
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::{
    assets::{FormatError, load_song_waveforms},
    builder::{SongBuilder, ValidationError},
    document::{DocumentError, parse_document},
    export::{RenderOptions, RenderSummary, render_song},
    model::Song,
    persistence,
    report::{RenderReport, generate_render_report},
    value::Section,
};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("io error: {0}")]
    Io(String),
}

impl From<anyhow::Error> for EngineError {
    fn from(value: anyhow::Error) -> Self {
        match value.downcast::<FormatError>() {
            Ok(error) => Self::Format(error),
            Err(value) => Self::Io(format!("{value:#}")),
        }
    }
}

/// Parses and builds a document in one step.
pub fn compile_document(source: &str) -> Result<Song, EngineError> {
    let sections = parse_document(source)?;
    let mut builder = SongBuilder::new();
    builder.add_all(&sections)?;
    Ok(builder.finish())
}

/// A song plus the directory its relative sample paths are resolved against.
#[derive(Debug, Clone)]
pub struct Engine {
    song: Song,
    base_dir: PathBuf,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Song::default(), ".")
    }
}

impl Engine {
    #[must_use]
    pub fn new(song: Song, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            song,
            base_dir: base_dir.into(),
        }
    }

    #[instrument(skip(source, base_dir), fields(bytes = source.len(), base_dir = %base_dir.as_ref().display()))]
    pub fn from_document(source: &str, base_dir: impl AsRef<Path>) -> Result<Self, EngineError> {
        let song = compile_document(source)?;
        for phrase in song.dangling_references() {
            warn!(%phrase, "output references a phrase that is never declared");
        }
        info!(
            samples = song.samples.len(),
            phrases = song.phrases.len(),
            "document compiled"
        );
        Ok(Self::new(song, base_dir.as_ref()))
    }

    /// Reads a document from disk; its directory becomes the sample base.
    #[instrument(fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self, EngineError> {
        let source = fs::read_to_string(path)
            .map_err(|error| EngineError::Io(format!("{}: {error}", path.display())))?;
        let base_dir = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Self::from_document(&source, base_dir)
    }

    #[must_use]
    pub fn song(&self) -> &Song {
        &self.song
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Folds one more section into the song. A failed section leaves the
    /// song as it was.
    #[instrument(skip(self, section), fields(section = %section.name))]
    pub fn add_section(&mut self, section: &Section) -> Result<(), EngineError> {
        let mut builder = SongBuilder::from_song(self.song.clone());
        builder.add(section)?;
        self.song = builder.finish();
        Ok(())
    }

    #[instrument(skip(self, options), fields(output = %options.output.display()))]
    pub fn render(&self, options: &RenderOptions) -> Result<RenderSummary, EngineError> {
        Ok(render_song(&self.song, &self.base_dir, options)?)
    }

    #[instrument(skip(self))]
    pub fn fingerprint(&self) -> Result<RenderReport, EngineError> {
        let waveforms = load_song_waveforms(&self.song, &self.base_dir, true)?;
        Ok(generate_render_report(&self.song, &waveforms))
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn save(&self, path: &Path) -> Result<(), EngineError> {
        persistence::save_song(path, &self.song)?;
        Ok(())
    }

    #[must_use]
    pub fn document(&self) -> String {
        persistence::write_document(&self.song)
    }
}
