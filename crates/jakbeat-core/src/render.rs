use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::{
    assets::Waveform,
    effects::{EffectBinding, StereoFrame},
    model::{Beat, Phrase, Sample, Song},
    time::samples_per_beat,
};

/// One track's stereo accumulation buffers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackRender {
    pub name: String,
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

impl TrackRender {
    #[must_use]
    pub fn len(&self) -> usize {
        self.left.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }
}

/// One step of the output sequence, resolved against the phrase table.
#[derive(Debug, Clone, Copy)]
pub struct PhraseStep<'a> {
    pub name: &'a str,
    pub phrase: Option<&'a Phrase>,
}

impl PhraseStep<'_> {
    #[must_use]
    pub fn samples_per_beat(&self) -> usize {
        self.phrase.map_or(0, |phrase| samples_per_beat(phrase.bpm))
    }

    #[must_use]
    pub fn span(&self) -> usize {
        self.phrase
            .map_or(0, |phrase| phrase.beat_count() * samples_per_beat(phrase.bpm))
    }
}

/// Resolves the output order once so dangling names are reported a single time
/// rather than once per track.
#[must_use]
pub fn resolve_steps(song: &Song) -> Vec<PhraseStep<'_>> {
    song.output
        .iter()
        .map(|name| {
            let phrase = song.phrase(name);
            match phrase {
                None => warn!(phrase = %name, "output references a missing phrase, rendering it as empty"),
                Some(phrase) if phrase.bpm <= 0 => {
                    warn!(phrase = %name, bpm = phrase.bpm, "non-positive bpm, rendering phrase as empty");
                }
                Some(_) => {}
            }
            PhraseStep { name, phrase }
        })
        .collect()
}

struct TrackCursor<'a> {
    track: &'a str,
    waveform: &'a [f32],
    volume: f32,
    effect: EffectBinding,
    pointer: Option<usize>,
    gain: f32,
    cursor: usize,
    left: Vec<f32>,
    right: Vec<f32>,
}

impl<'a> TrackCursor<'a> {
    fn new(track: &'a str, sample: &Sample, waveform: &'a [f32]) -> Self {
        Self {
            track,
            waveform,
            volume: sample.volume_scale(),
            effect: sample.effect.unbound(),
            pointer: None,
            gain: 0.0,
            cursor: 0,
            left: Vec::new(),
            right: Vec::new(),
        }
    }

    fn play(&mut self, step: &PhraseStep<'_>) {
        let Some(phrase) = step.phrase else {
            return;
        };
        let beat_len = step.samples_per_beat();
        let phrase_start = self.cursor;

        match phrase.beats.get(self.track) {
            None => self.emit(step.span()),
            Some(beats) => {
                for beat in beats {
                    self.strike(*beat);
                    self.emit(beat_len);
                }
            }
        }

        // tracks with shorter grids jump to the phrase boundary
        self.cursor = phrase_start + step.span();
    }

    fn strike(&mut self, beat: Beat) {
        match beat {
            Beat::Rest => {}
            Beat::Stop => {
                self.pointer = None;
                self.gain = 0.0;
            }
            Beat::Half | Beat::Full => {
                self.gain = beat.trigger_gain().unwrap_or_default();
                self.pointer = Some(0);
            }
        }
    }

    fn emit(&mut self, frames: usize) {
        let end = self.cursor + frames;
        if self.left.len() < end {
            self.left.resize(end, 0.0);
            self.right.resize(end, 0.0);
        }

        for slot in self.cursor..end {
            let frame = match self.pointer {
                Some(position) if position < self.waveform.len() => {
                    self.pointer = Some(position + 1);
                    let mono = self.gain * self.waveform[position] * self.volume;
                    self.effect.apply(mono)
                }
                _ => StereoFrame::default(),
            };
            self.left[slot] = frame.left;
            self.right[slot] = frame.right;
        }
        self.cursor = end;
    }

    fn finish(self) -> TrackRender {
        TrackRender {
            name: self.track.to_string(),
            left: self.left,
            right: self.right,
        }
    }
}

/// Renders a single track across the resolved output sequence. The track gets
/// its own effect instance, so repeated renders start from identical state.
#[must_use]
pub fn render_track(
    name: &str,
    sample: &Sample,
    waveform: &Waveform,
    steps: &[PhraseStep<'_>],
) -> TrackRender {
    let mut cursor = TrackCursor::new(name, sample, &waveform.samples);
    for step in steps {
        cursor.play(step);
    }
    debug!(track = name, frames = cursor.left.len(), end = cursor.cursor, "track rendered");
    cursor.finish()
}

/// Renders every sample of the song, in name order. Tracks only share
/// read-only phrase data, so `parallel` spreads them over the rayon pool with
/// output identical to the serial path.
#[instrument(skip(song, waveforms), fields(tracks = song.samples.len(), steps = song.output.len(), parallel))]
pub fn render_tracks(
    song: &Song,
    waveforms: &BTreeMap<String, Waveform>,
    parallel: bool,
) -> Vec<TrackRender> {
    let steps = resolve_steps(song);
    let silent = Waveform::default();
    let waveform_for = |name: &str| {
        waveforms.get(name).unwrap_or_else(|| {
            warn!(track = name, "no waveform loaded for track, rendering silence");
            &silent
        })
    };

    let tracks: Vec<TrackRender> = if parallel {
        song.samples
            .par_iter()
            .map(|(name, sample)| render_track(name, sample, waveform_for(name), &steps))
            .collect()
    } else {
        song.samples
            .iter()
            .map(|(name, sample)| render_track(name, sample, waveform_for(name), &steps))
            .collect()
    };

    info!(
        tracks = tracks.len(),
        longest = tracks.iter().map(TrackRender::len).max().unwrap_or_default(),
        "tracks rendered"
    );
    tracks
}

#[cfg(test)]
mod tests {
    use super::*;

    const BEAT: usize = 22_050;

    fn song_with(grids: &[(&str, &str, &[Beat])], output: &[&str]) -> Song {
        let mut song = Song::default();
        for (phrase, track, beats) in grids {
            song.samples
                .entry((*track).to_string())
                .or_insert_with(|| Sample::new(format!("{track}.wav"), 100));
            song.phrases
                .entry((*phrase).to_string())
                .or_default()
                .beats
                .insert((*track).to_string(), beats.to_vec());
        }
        song.output = output.iter().map(ToString::to_string).collect();
        song
    }

    #[test]
    fn full_beat_plays_waveform_then_silence() {
        let song = song_with(&[("A", "kick", &[Beat::Full, Beat::Rest, Beat::Rest])], &["A"]);
        let waves = BTreeMap::from([("kick".to_string(), Waveform::new(vec![0.5, -0.25, 1.0]))]);

        let tracks = render_tracks(&song, &waves, false);
        let kick = &tracks[0];
        assert_eq!(kick.len(), 3 * BEAT);
        assert_eq!(&kick.left[..4], &[0.5, -0.25, 1.0, 0.0]);
        assert_eq!(kick.left, kick.right);
        assert!(kick.left[3..].iter().all(|sample| *sample == 0.0));
    }

    #[test]
    fn half_beat_and_volume_scale_the_signal() {
        let mut song = song_with(&[("A", "snare", &[Beat::Half])], &["A"]);
        if let Some(snare) = song.samples.get_mut("snare") {
            snare.volume = 50;
        }
        let waves = BTreeMap::from([("snare".to_string(), Waveform::new(vec![1.0]))]);

        let tracks = render_tracks(&song, &waves, false);
        assert_eq!(tracks[0].left[0], 0.25);
    }

    #[test]
    fn retrigger_restarts_from_the_top() {
        let song = song_with(&[("A", "hat", &[Beat::Full, Beat::Full])], &["A"]);
        let long: Vec<f32> = (0..(BEAT + 10)).map(|i| i as f32 / 100_000.0).collect();
        let waves = BTreeMap::from([("hat".to_string(), Waveform::new(long.clone()))]);

        let tracks = render_tracks(&song, &waves, false);
        assert_eq!(tracks[0].left[BEAT], long[0]);
        assert_eq!(tracks[0].left[BEAT - 1], long[BEAT - 1]);
    }

    #[test]
    fn rest_sustains_and_stop_cuts() {
        let song = song_with(&[("A", "pad", &[Beat::Full, Beat::Rest, Beat::Stop])], &["A"]);
        let waves = BTreeMap::from([("pad".to_string(), Waveform::new(vec![0.1; 3 * BEAT]))]);

        let tracks = render_tracks(&song, &waves, false);
        let pad = &tracks[0];
        assert!(pad.left[..2 * BEAT].iter().all(|sample| *sample == 0.1));
        assert!(pad.left[2 * BEAT..].iter().all(|sample| *sample == 0.0));
    }

    #[test]
    fn undeclared_track_keeps_playing_across_phrases() {
        let song = song_with(
            &[
                ("A", "pad", &[Beat::Full]),
                ("B", "kick", &[Beat::Rest, Beat::Rest]),
            ],
            &["A", "B"],
        );
        let waves = BTreeMap::from([
            ("pad".to_string(), Waveform::new(vec![0.2; 2 * BEAT])),
            ("kick".to_string(), Waveform::new(vec![1.0])),
        ]);

        let tracks = render_tracks(&song, &waves, false);
        let pad = tracks.iter().find(|track| track.name == "pad").expect("pad rendered");
        assert_eq!(pad.len(), 3 * BEAT);
        assert!(pad.left[..2 * BEAT].iter().all(|sample| *sample == 0.2));
        assert!(pad.left[2 * BEAT..].iter().all(|sample| *sample == 0.0));
    }

    #[test]
    fn short_grids_snap_to_phrase_boundary() {
        let song = song_with(
            &[
                ("A", "kick", &[Beat::Full, Beat::Rest, Beat::Rest, Beat::Rest]),
                ("A", "snare", &[Beat::Rest, Beat::Full]),
                ("B", "snare", &[Beat::Full]),
            ],
            &["A", "B"],
        );
        let waves = BTreeMap::from([
            ("kick".to_string(), Waveform::new(vec![1.0])),
            ("snare".to_string(), Waveform::new(vec![0.5])),
        ]);

        let tracks = render_tracks(&song, &waves, false);
        let snare = tracks.iter().find(|track| track.name == "snare").expect("snare rendered");
        assert_eq!(snare.left[BEAT], 0.5);
        assert_eq!(snare.left[4 * BEAT], 0.5);
        assert_eq!(snare.len(), 5 * BEAT);

        let kick = tracks.iter().find(|track| track.name == "kick").expect("kick rendered");
        // kick has no grid in B, so it fills B's span with its (exhausted) tail
        assert_eq!(kick.len(), 5 * BEAT);
    }

    #[test]
    fn trailing_short_grid_leaves_shorter_buffer() {
        let song = song_with(
            &[
                ("A", "kick", &[Beat::Full, Beat::Rest, Beat::Rest]),
                ("A", "snare", &[Beat::Full]),
            ],
            &["A"],
        );
        let waves = BTreeMap::from([
            ("kick".to_string(), Waveform::new(vec![1.0])),
            ("snare".to_string(), Waveform::new(vec![1.0])),
        ]);

        let tracks = render_tracks(&song, &waves, false);
        assert_eq!(tracks[0].len(), 3 * BEAT);
        assert_eq!(tracks[1].len(), BEAT);
    }

    #[test]
    fn missing_phrase_is_zero_length() {
        let song = song_with(&[("A", "kick", &[Beat::Full])], &["nope", "A", "nope"]);
        let waves = BTreeMap::from([("kick".to_string(), Waveform::new(vec![1.0]))]);

        let tracks = render_tracks(&song, &waves, false);
        assert_eq!(tracks[0].len(), BEAT);
        assert_eq!(tracks[0].left[0], 1.0);
    }

    #[test]
    fn parallel_matches_serial() {
        let song = song_with(
            &[
                ("A", "kick", &[Beat::Full, Beat::Rest, Beat::Half, Beat::Stop]),
                ("A", "snare", &[Beat::Rest, Beat::Full]),
                ("B", "hat", &[Beat::Half, Beat::Half, Beat::Half]),
            ],
            &["A", "B", "A"],
        );
        let waves: BTreeMap<String, Waveform> = ["kick", "snare", "hat"]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let samples = (0..500).map(|n| ((n * (i + 1)) as f32).sin()).collect();
                ((*name).to_string(), Waveform::new(samples))
            })
            .collect();

        assert_eq!(
            render_tracks(&song, &waves, true),
            render_tracks(&song, &waves, false)
        );
    }
}
