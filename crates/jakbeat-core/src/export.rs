use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::{
    assets::load_song_waveforms,
    model::Song,
    render::{TrackRender, render_tracks},
    time::{SAMPLE_RATE, samples_to_seconds},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WavEncoding {
    #[default]
    Float32,
    Int16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixMode {
    #[default]
    Unified,
    Split,
}

/// Soft-clipped stereo program material.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StereoBuffer {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

impl StereoBuffer {
    #[must_use]
    pub fn frames(&self) -> usize {
        self.left.len()
    }

    #[must_use]
    pub fn interleaved(&self) -> Vec<f32> {
        self.left
            .iter()
            .zip(&self.right)
            .flat_map(|(left, right)| [*left, *right])
            .collect()
    }

    fn soft_clip(mut self) -> Self {
        for sample in self.left.iter_mut().chain(self.right.iter_mut()) {
            *sample = sample.tanh();
        }
        self
    }
}

fn longest(tracks: &[TrackRender]) -> usize {
    tracks.iter().map(TrackRender::len).max().unwrap_or_default()
}

fn padded(channel: &[f32], frames: usize) -> Vec<f32> {
    let mut out = channel.to_vec();
    out.resize(frames, 0.0);
    out
}

/// Sums every track per channel, zero-padded to the longest track, then
/// applies `tanh`.
#[must_use]
pub fn mix_unified(tracks: &[TrackRender]) -> StereoBuffer {
    let frames = longest(tracks);
    let mut mix = StereoBuffer {
        left: vec![0.0; frames],
        right: vec![0.0; frames],
    };

    for track in tracks {
        for (out, sample) in mix.left.iter_mut().zip(&track.left) {
            *out += sample;
        }
        for (out, sample) in mix.right.iter_mut().zip(&track.right) {
            *out += sample;
        }
    }

    debug!(tracks = tracks.len(), frames, "unified mixdown");
    mix.soft_clip()
}

/// One buffer per track, each padded to the longest track and clipped on its
/// own.
#[must_use]
pub fn mix_split(tracks: &[TrackRender]) -> Vec<(String, StereoBuffer)> {
    let frames = longest(tracks);
    debug!(tracks = tracks.len(), frames, "split mixdown");
    tracks
        .iter()
        .map(|track| {
            let buffer = StereoBuffer {
                left: padded(&track.left, frames),
                right: padded(&track.right, frames),
            };
            (track.name.clone(), buffer.soft_clip())
        })
        .collect()
}

/// `song.wav` + `kick` becomes `songkick.wav`.
#[must_use]
pub fn split_track_path(base: &Path, track: &str) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match base.extension() {
        Some(extension) => format!("{stem}{track}.{}", extension.to_string_lossy()),
        None => format!("{stem}{track}"),
    };
    base.with_file_name(file_name)
}

#[instrument(skip(buffer), fields(path = %path.display(), frames = buffer.frames()))]
pub fn write_wav(path: &Path, buffer: &StereoBuffer, encoding: WavEncoding) -> Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create wav output directory: {}", parent.display()))?;

    let spec = match encoding {
        WavEncoding::Float32 => hound::WavSpec {
            channels: 2,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        },
        WavEncoding::Int16 => hound::WavSpec {
            channels: 2,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        },
    };

    let temp_file = tempfile::NamedTempFile::new_in(parent)
        .context("failed to create temp wav file")?;
    {
        let mut writer = hound::WavWriter::new(std::io::BufWriter::new(temp_file.as_file()), spec)
            .with_context(|| format!("failed to start wav stream: {}", path.display()))?;
        for sample in buffer.interleaved() {
            match encoding {
                WavEncoding::Float32 => writer.write_sample(sample),
                WavEncoding::Int16 => {
                    writer.write_sample((sample * f32::from(i16::MAX)).round() as i16)
                }
            }
            .context("failed to write wav sample")?;
        }
        writer.finalize().context("failed to finalize wav file")?;
    }

    temp_file
        .persist(path)
        .map_err(|error| anyhow::anyhow!(error.error))
        .with_context(|| format!("failed to persist wav file: {}", path.display()))?;

    info!("wav export completed");
    Ok(())
}

/// Writes the mix (or one file per track in split mode) and returns the paths
/// written.
#[instrument(skip(tracks), fields(tracks = tracks.len(), path = %path.display()))]
pub fn export_tracks(
    tracks: &[TrackRender],
    path: &Path,
    mode: MixMode,
    encoding: WavEncoding,
) -> Result<Vec<PathBuf>> {
    match mode {
        MixMode::Unified => {
            write_wav(path, &mix_unified(tracks), encoding)?;
            Ok(vec![path.to_path_buf()])
        }
        MixMode::Split => mix_split(tracks)
            .into_iter()
            .map(|(name, buffer)| {
                let track_path = split_track_path(path, &name);
                write_wav(&track_path, &buffer, encoding)?;
                Ok(track_path)
            })
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    pub output: PathBuf,
    pub mode: MixMode,
    pub parallel: bool,
    pub encoding: WavEncoding,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            output: PathBuf::from("test.wav"),
            mode: MixMode::Unified,
            parallel: true,
            encoding: WavEncoding::Float32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSummary {
    pub tracks: usize,
    pub frames: usize,
    pub files: Vec<PathBuf>,
}

/// Loads every waveform (relative paths against `base_dir`), renders, mixes
/// and writes. A waveform that fails to load aborts before anything is
/// written.
#[instrument(skip(song, options), fields(tracks = song.samples.len(), output = %options.output.display(), mode = ?options.mode))]
pub fn render_song(song: &Song, base_dir: &Path, options: &RenderOptions) -> Result<RenderSummary> {
    let waveforms = load_song_waveforms(song, base_dir, options.parallel)?;
    let tracks = render_tracks(song, &waveforms, options.parallel);
    let files = export_tracks(&tracks, &options.output, options.mode, options.encoding)?;

    let summary = RenderSummary {
        tracks: tracks.len(),
        frames: longest(&tracks),
        files,
    };
    info!(
        frames = summary.frames,
        seconds = samples_to_seconds(summary.frames),
        files = summary.files.len(),
        "song rendered"
    );
    Ok(summary)
}
