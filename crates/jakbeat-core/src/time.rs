pub const SAMPLE_RATE: u32 = 44_100;

/// Whole samples per beat, truncated the same way for every track so phrase
/// boundaries line up exactly. Non-positive tempos yield zero.
#[must_use]
pub fn samples_per_beat(bpm: i32) -> usize {
    let Ok(bpm) = usize::try_from(bpm) else {
        return 0;
    };
    if bpm == 0 {
        return 0;
    }

    SAMPLE_RATE as usize * 60 / bpm
}

#[must_use]
pub fn beats_to_samples(beats: usize, bpm: i32) -> usize {
    beats.saturating_mul(samples_per_beat(bpm))
}

#[must_use]
pub fn samples_to_seconds(samples: usize) -> f64 {
    samples as f64 / f64::from(SAMPLE_RATE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beat_length_at_common_tempos() {
        assert_eq!(samples_per_beat(120), 22_050);
        assert_eq!(samples_per_beat(60), 44_100);
        assert_eq!(samples_per_beat(140), 18_900);
        assert_eq!(samples_per_beat(7), 378_000);
    }

    #[test]
    fn beat_length_truncates() {
        assert_eq!(samples_per_beat(97), 27_278);
        assert_eq!(beats_to_samples(4, 97), 4 * 27_278);
    }

    #[test]
    fn degenerate_tempo_is_silent() {
        assert_eq!(samples_per_beat(0), 0);
        assert_eq!(samples_per_beat(-120), 0);
        assert_eq!(beats_to_samples(16, 0), 0);
    }

    #[test]
    fn seconds_conversion() {
        assert!((samples_to_seconds(22_050) - 0.5).abs() < f64::EPSILON);
    }
}
