use std::path::Path;

use jakbeat_core::{FormatError, Sample, Song, load_song_waveforms, load_waveform};
use tempfile::tempdir;

fn write_wav(path: &Path, spec: hound::WavSpec, frames: usize) {
    let mut writer = hound::WavWriter::create(path, spec).expect("test wav should be creatable");
    for _ in 0..frames * usize::from(spec.channels) {
        match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Float, _) => writer.write_sample(0.25_f32),
            (hound::SampleFormat::Int, 8) => writer.write_sample(10_i8),
            (hound::SampleFormat::Int, 16) => writer.write_sample(16_384_i16),
            (hound::SampleFormat::Int, _) => writer.write_sample(1_000_i32),
        }
        .expect("test wav sample write should succeed");
    }
    writer.finalize().expect("test wav finalize should succeed");
}

fn spec(channels: u16, sample_rate: u32, bits: u16, format: hound::SampleFormat) -> hound::WavSpec {
    hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: bits,
        sample_format: format,
    }
}

#[test]
fn float_and_int16_mono_load() {
    let temp = tempdir().expect("tempdir should be creatable");
    let float_path = temp.path().join("float.wav");
    let int_path = temp.path().join("int.wav");
    write_wav(&float_path, spec(1, 44_100, 32, hound::SampleFormat::Float), 64);
    write_wav(&int_path, spec(1, 44_100, 16, hound::SampleFormat::Int), 64);

    let float = load_waveform(&float_path).expect("float wav should load");
    assert_eq!(float.len(), 64);
    assert_eq!(float.get(0), Some(0.25));

    let int = load_waveform(&int_path).expect("int16 wav should load");
    assert_eq!(int.len(), 64);
    assert_eq!(int.get(63), Some(16_384.0 / 32_767.0));
}

#[test]
fn unsupported_sources_report_what_is_wrong() {
    let temp = tempdir().expect("tempdir should be creatable");

    let high_rate = temp.path().join("48k.wav");
    write_wav(&high_rate, spec(1, 48_000, 16, hound::SampleFormat::Int), 8);
    let error = load_waveform(&high_rate).expect_err("48 kHz must be rejected");
    assert!(matches!(error, FormatError::SampleRate { rate: 48_000, .. }));
    assert!(error.to_string().contains("48000"));

    let stereo = temp.path().join("stereo.wav");
    write_wav(&stereo, spec(2, 44_100, 32, hound::SampleFormat::Float), 8);
    assert!(matches!(
        load_waveform(&stereo),
        Err(FormatError::Channels { channels: 2, .. })
    ));

    let deep = temp.path().join("24bit.wav");
    write_wav(&deep, spec(1, 44_100, 24, hound::SampleFormat::Int), 8);
    let error = load_waveform(&deep).expect_err("24-bit must be rejected");
    assert!(matches!(
        error,
        FormatError::SampleFormat {
            format: "int",
            bits: 24,
            ..
        }
    ));

    let narrow = temp.path().join("8bit.wav");
    write_wav(&narrow, spec(1, 44_100, 8, hound::SampleFormat::Int), 8);
    assert!(matches!(
        load_waveform(&narrow),
        Err(FormatError::SampleFormat { bits: 8, .. })
    ));
}

#[test]
fn missing_and_corrupt_files_fail_to_open() {
    let temp = tempdir().expect("tempdir should be creatable");
    assert!(matches!(
        load_waveform(&temp.path().join("absent.wav")),
        Err(FormatError::Open { .. })
    ));

    let garbage = temp.path().join("garbage.wav");
    std::fs::write(&garbage, b"not a riff file").expect("write should succeed");
    assert!(matches!(
        load_waveform(&garbage),
        Err(FormatError::Open { .. })
    ));
}

#[test]
fn song_waveforms_resolve_relative_paths_and_abort_on_failure() {
    let temp = tempdir().expect("tempdir should be creatable");
    let kit = temp.path().join("kit");
    std::fs::create_dir_all(&kit).expect("kit dir");
    write_wav(&kit.join("kick.wav"), spec(1, 44_100, 32, hound::SampleFormat::Float), 4);
    let absolute = temp.path().join("hat.wav");
    write_wav(&absolute, spec(1, 44_100, 16, hound::SampleFormat::Int), 2);

    let mut song = Song::default();
    song.samples.insert("kick".to_string(), Sample::new("kick.wav", 100));
    song.samples.insert(
        "hat".to_string(),
        Sample::new(absolute.to_string_lossy(), 100),
    );

    for parallel in [false, true] {
        let waves = load_song_waveforms(&song, &kit, parallel).expect("kit should load");
        assert_eq!(waves["kick"].len(), 4);
        assert_eq!(waves["hat"].len(), 2);
    }

    song.samples.insert("snare".to_string(), Sample::new("snare.wav", 100));
    assert!(matches!(
        load_song_waveforms(&song, &kit, true),
        Err(FormatError::Open { .. })
    ));
}
