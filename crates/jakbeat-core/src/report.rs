use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::instrument;

use crate::{
    assets::Waveform, export::mix_unified, model::Song, persistence::write_document,
    render::render_tracks,
};

const REPORT_SCHEMA_VERSION: u32 = 1;

/// Stable identity of a render: same song and waveforms, same hashes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenderReport {
    pub schema_version: u32,
    pub track_count: usize,
    pub phrase_count: usize,
    pub output_len: usize,
    pub frames: usize,
    pub song_hash: String,
    pub audio_hash: String,
}

#[instrument(skip(song, waveforms), fields(tracks = song.samples.len(), phrases = song.phrases.len()))]
pub fn generate_render_report(
    song: &Song,
    waveforms: &BTreeMap<String, Waveform>,
) -> RenderReport {
    let tracks = render_tracks(song, waveforms, false);
    let mix = mix_unified(&tracks);

    let audio_bytes: Vec<u8> = mix
        .interleaved()
        .iter()
        .flat_map(|sample| sample.to_le_bytes())
        .collect();

    RenderReport {
        schema_version: REPORT_SCHEMA_VERSION,
        track_count: song.samples.len(),
        phrase_count: song.phrases.len(),
        output_len: song.output.len(),
        frames: mix.frames(),
        song_hash: hash_hex(write_document(song).as_bytes()),
        audio_hash: hash_hex(&audio_bytes),
    }
}

pub fn read_render_report(path: &Path) -> Result<RenderReport> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read render report: {}", path.display()))?;
    let report: RenderReport =
        serde_json::from_slice(&bytes).context("failed to parse render report json")?;
    Ok(report)
}

pub fn write_render_report(path: &Path, report: &RenderReport) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create report directory: {}", parent.display()))?;
    }

    let json = serde_json::to_vec_pretty(report).context("failed to encode render report json")?;
    fs::write(path, json)
        .with_context(|| format!("failed to write render report: {}", path.display()))?;
    Ok(())
}

fn hash_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{digest:x}")
}
