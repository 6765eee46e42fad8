use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::{model::Song, time::SAMPLE_RATE};

const I16_SCALE: f32 = 32_767.0;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("failed to open waveform {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
    #[error("failed to decode waveform {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
    #[error("{path}: sample rate {rate} Hz is not supported, expected 44100 Hz")]
    SampleRate { path: PathBuf, rate: u32 },
    #[error("{path}: {channels} channels are not supported, expected mono")]
    Channels { path: PathBuf, channels: u16 },
    #[error(
        "{path}: {bits}-bit {format} samples are not supported, expected 32-bit float or 16-bit int"
    )]
    SampleFormat {
        path: PathBuf,
        format: &'static str,
        bits: u16,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceEncoding {
    Float32,
    Int16,
}

/// Mono PCM at 44100 Hz, normalized to roughly [-1, 1].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
}

impl Waveform {
    #[must_use]
    pub fn new(samples: Vec<f32>) -> Self {
        Self { samples }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<f32> {
        self.samples.get(index).copied()
    }
}

#[instrument(fields(path = %path.display()))]
pub fn load_waveform(path: &Path) -> Result<Waveform, FormatError> {
    let reader = hound::WavReader::open(path).map_err(|source| FormatError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let spec = reader.spec();

    if spec.sample_rate != SAMPLE_RATE {
        return Err(FormatError::SampleRate {
            path: path.to_path_buf(),
            rate: spec.sample_rate,
        });
    }
    if spec.channels != 1 {
        return Err(FormatError::Channels {
            path: path.to_path_buf(),
            channels: spec.channels,
        });
    }
    let encoding = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Float, 32) => SourceEncoding::Float32,
        (hound::SampleFormat::Int, 16) => SourceEncoding::Int16,
        (format, bits) => {
            return Err(FormatError::SampleFormat {
                path: path.to_path_buf(),
                format: match format {
                    hound::SampleFormat::Float => "float",
                    hound::SampleFormat::Int => "int",
                },
                bits,
            });
        }
    };

    let decode_error = |source: hound::Error| FormatError::Decode {
        path: path.to_path_buf(),
        source,
    };
    let samples = match encoding {
        SourceEncoding::Float32 => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(decode_error)?,
        SourceEncoding::Int16 => reader
            .into_samples::<i16>()
            .map(|sample| sample.map(|value| f32::from(value) / I16_SCALE))
            .collect::<Result<Vec<_>, _>>()
            .map_err(decode_error)?,
    };

    debug!(?encoding, frames = samples.len(), "waveform decoded");
    Ok(Waveform::new(samples))
}

/// Relative sample paths are taken from the document's directory.
#[must_use]
pub fn resolve_sample_path(base_dir: &Path, sample_path: &str) -> PathBuf {
    let path = Path::new(sample_path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

#[instrument(skip(song), fields(samples = song.samples.len(), base_dir = %base_dir.display()))]
pub fn load_song_waveforms(
    song: &Song,
    base_dir: &Path,
    parallel: bool,
) -> Result<BTreeMap<String, Waveform>, FormatError> {
    let jobs: Vec<(String, PathBuf)> = song
        .samples
        .iter()
        .map(|(name, sample)| (name.clone(), resolve_sample_path(base_dir, &sample.path)))
        .collect();
    let load = |(name, path): (String, PathBuf)| load_waveform(&path).map(|wave| (name, wave));

    let waveforms: BTreeMap<String, Waveform> = if parallel {
        jobs.into_par_iter().map(load).collect::<Result<_, _>>()?
    } else {
        jobs.into_iter().map(load).collect::<Result<_, _>>()?
    };

    info!(
        loaded = waveforms.len(),
        frames = waveforms.values().map(Waveform::len).sum::<usize>(),
        "waveforms loaded"
    );
    Ok(waveforms)
}
