use super::{PluginKind, StereoFrame, pan_gains, percent, read_params};
use crate::value::Value;

pub const REVERB_BUFFER_LEN: usize = 512;

const CROSS_TAP_LONG: usize = 220;
const CROSS_TAP_SHORT: usize = 75;
const MAX_DECAY: f32 = 0.99;
const LEFT: usize = 0;
const RIGHT: usize = 1;

#[derive(Debug, Clone)]
struct DelayLine {
    data: Vec<f32>,
}

impl DelayLine {
    fn new() -> Self {
        Self {
            data: vec![0.0; REVERB_BUFFER_LEN],
        }
    }

    /// `offset` samples behind `head`; an offset of the full length reads the
    /// slot about to be overwritten.
    fn read(&self, head: usize, offset: usize) -> f32 {
        self.data[(head + REVERB_BUFFER_LEN - offset.min(REVERB_BUFFER_LEN)) % REVERB_BUFFER_LEN]
    }

    fn write(&mut self, head: usize, value: f32) {
        self.data[head] = value;
    }
}

#[derive(Debug, Clone)]
pub struct Reverb {
    predelay: DelayLine,
    predelay_samples: usize,
    allpass: [[DelayLine; 2]; 2],
    comb: [[DelayLine; 2]; 2],
    head: usize,
    pan: i32,
    level: f32,
    decay: f32,
}

impl Reverb {
    #[must_use]
    pub fn new(delay: i32, pan: i32, level: i32, decay: i32) -> Self {
        let delay_percent = usize::try_from(delay.clamp(0, 100)).unwrap_or_default();
        Self {
            predelay: DelayLine::new(),
            predelay_samples: delay_percent * (REVERB_BUFFER_LEN - 1) / 100,
            allpass: std::array::from_fn(|_| [DelayLine::new(), DelayLine::new()]),
            comb: std::array::from_fn(|_| [DelayLine::new(), DelayLine::new()]),
            head: 0,
            pan: pan.clamp(-100, 100),
            level: percent(level),
            decay: percent(decay).min(MAX_DECAY),
        }
    }

    #[must_use]
    pub fn from_params(params: Option<&Value>) -> Self {
        let (mut delay, mut pan, mut level, mut decay) = (0, 0, 30, 50);
        read_params(PluginKind::Reverb, params, |key, value| {
            let slot = match key {
                Some("delay") => &mut delay,
                Some("pan") => &mut pan,
                Some("level") => &mut level,
                Some("decay") => &mut decay,
                _ => return false,
            };
            *slot = value;
            true
        });
        Self::new(delay, pan, level, decay)
    }

    #[must_use]
    pub const fn predelay_samples(&self) -> usize {
        self.predelay_samples
    }

    pub fn process(&mut self, mono: f32) -> StereoFrame {
        let head = self.head;
        self.predelay.write(head, mono);
        let input = self.predelay.read(head, self.predelay_samples);

        let mut wet = [input; 2];
        for stage in &mut self.allpass {
            for (channel, line) in stage.iter_mut().enumerate() {
                let delayed = line.read(head, REVERB_BUFFER_LEN);
                let out = delayed - self.decay * wet[channel];
                line.write(head, wet[channel] + self.decay * out);
                wet[channel] = out;
            }
        }

        // each channel's comb feeds back from the opposite channel's history
        for (stage, offset) in [CROSS_TAP_LONG, CROSS_TAP_SHORT].into_iter().enumerate() {
            let fed = [
                self.comb[stage][RIGHT].read(head, offset),
                self.comb[stage][LEFT].read(head, offset),
            ];
            for channel in [LEFT, RIGHT] {
                wet[channel] += self.decay * fed[channel];
                self.comb[stage][channel].write(head, wet[channel]);
            }
        }

        let (left_gain, right_gain) = pan_gains(self.pan);
        let dry = 1.0 - self.level;
        self.head = (head + 1) % REVERB_BUFFER_LEN;

        StereoFrame::new(
            self.level * wet[LEFT] + dry * left_gain * mono,
            self.level * wet[RIGHT] + dry * right_gain * mono,
        )
    }
}
