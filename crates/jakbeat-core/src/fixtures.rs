use std::{
    f32::consts::TAU,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::time::SAMPLE_RATE;

pub const DEMO_DOCUMENT_NAME: &str = "demo.jakbeat";

/// A two-phrase groove over the synthesized kit from [`write_demo_samples`].
#[must_use]
pub fn demo_document() -> &'static str {
    r#"[WHO]
kick = ( path = kick.wav volume = 100 )
snare = ( path = snare.wav volume = 80 stereo = reverb params = ( delay = 10 level = 25 decay = 40 ) )
hat = ( path = hat.wav volume = 60 stereo = chorus params = ( pan = 30 amount = 40 ) )

[WHAT]
Output = ( intro groove groove )
intro = ( bpm = 120 )
groove = ( bpm = 120 )

[intro]
kick = "!... !... !... !..."
hat = "-.-. -.-. -.-. -.-:"

[groove]
kick = "!..! ..!. !..! ..!."
snare = "..!. ..!. ..!. ..-!"
hat = "-!-! -!-! -!-! -!-:"
"#
}

#[derive(Debug, Clone, Copy)]
enum DemoEncoding {
    Float32,
    Int16,
}

/// Deterministic xorshift noise in [-1, 1].
fn noise(len: usize, mut state: u32) -> Vec<f32> {
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state as f32 / u32::MAX as f32) * 2.0 - 1.0
        })
        .collect()
}

fn kick_samples() -> Vec<f32> {
    let len = SAMPLE_RATE as usize * 3 / 10;
    let mut phase = 0.0_f32;
    (0..len)
        .map(|n| {
            let t = n as f32 / SAMPLE_RATE as f32;
            let freq = 45.0 + 110.0 * (-t * 30.0).exp();
            phase = (phase + TAU * freq / SAMPLE_RATE as f32) % TAU;
            phase.sin() * (-t * 9.0).exp() * 0.9
        })
        .collect()
}

fn snare_samples() -> Vec<f32> {
    let len = SAMPLE_RATE as usize / 5;
    noise(len, 0x5eed_1234)
        .into_iter()
        .enumerate()
        .map(|(n, grain)| {
            let t = n as f32 / SAMPLE_RATE as f32;
            let body = (TAU * 190.0 * t).sin() * 0.4;
            (grain * 0.6 + body) * (-t * 22.0).exp() * 0.8
        })
        .collect()
}

fn hat_samples() -> Vec<f32> {
    let len = SAMPLE_RATE as usize / 20;
    let raw = noise(len, 0x0bad_cafe);
    let mut previous = 0.0;
    raw.into_iter()
        .enumerate()
        .map(|(n, grain)| {
            // first difference keeps the top end
            let bright = grain - previous;
            previous = grain;
            let t = n as f32 / SAMPLE_RATE as f32;
            bright * 0.35 * (-t * 80.0).exp()
        })
        .collect()
}

fn write_mono(path: &Path, samples: &[f32], encoding: DemoEncoding) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: match encoding {
            DemoEncoding::Float32 => 32,
            DemoEncoding::Int16 => 16,
        },
        sample_format: match encoding {
            DemoEncoding::Float32 => hound::SampleFormat::Float,
            DemoEncoding::Int16 => hound::SampleFormat::Int,
        },
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("failed to create fixture wav: {}", path.display()))?;
    for sample in samples {
        match encoding {
            DemoEncoding::Float32 => writer.write_sample(*sample),
            DemoEncoding::Int16 => writer.write_sample((sample * 32_767.0).round() as i16),
        }
        .context("failed to write fixture sample")?;
    }
    writer.finalize().context("failed to finalize fixture wav")?;
    Ok(())
}

/// Writes `kick.wav` and `hat.wav` as 32-bit float and `snare.wav` as 16-bit
/// int, all mono 44100 Hz.
#[instrument(fields(dir = %dir.display()))]
pub fn write_demo_samples(dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create sample directory: {}", dir.display()))?;

    let kit = [
        ("kick.wav", kick_samples(), DemoEncoding::Float32),
        ("snare.wav", snare_samples(), DemoEncoding::Int16),
        ("hat.wav", hat_samples(), DemoEncoding::Float32),
    ];

    let mut paths = Vec::with_capacity(kit.len());
    for (name, samples, encoding) in kit {
        let path = dir.join(name);
        write_mono(&path, &samples, encoding)?;
        paths.push(path);
    }

    info!(files = paths.len(), "demo samples written");
    Ok(paths)
}

/// Demo document plus its kit, ready to render from `dir`.
pub fn write_demo_project(dir: &Path) -> Result<PathBuf> {
    write_demo_samples(dir)?;
    let path = dir.join(DEMO_DOCUMENT_NAME);
    fs::write(&path, demo_document())
        .with_context(|| format!("failed to write demo document: {}", path.display()))?;
    Ok(path)
}
