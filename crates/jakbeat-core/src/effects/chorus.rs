use std::f32::consts::TAU;

use super::{PluginKind, StereoFrame, pan_gains, percent, read_params};
use crate::{time::SAMPLE_RATE, value::Value};

pub const CHORUS_BUFFER_LEN: usize = 4_096;

const MAX_DELAY: usize = CHORUS_BUFFER_LEN / 2 - 1;
const NEAR_TAP_WEIGHT: f32 = 0.67;
const FAR_TAP_WEIGHT: f32 = 0.33;

#[derive(Debug, Clone)]
pub struct Chorus {
    buffer: Vec<f32>,
    head: usize,
    delay: usize,
    pan: i32,
    amount: f32,
    depth: f32,
    steps: u32,
    phase: u32,
    modulated_delay: f32,
}

impl Chorus {
    /// `delay` is a percentage of half the circular buffer so the second tap
    /// (twice the delay) never wraps onto the write head.
    #[must_use]
    pub fn new(delay: i32, pan: i32, amount: i32, speed: i32, depth: i32) -> Self {
        let delay_percent = usize::try_from(delay.clamp(0, 100)).unwrap_or_default();
        Self {
            buffer: vec![0.0; CHORUS_BUFFER_LEN],
            head: 0,
            delay: delay_percent * MAX_DELAY / 100,
            pan: pan.clamp(-100, 100),
            amount: percent(amount),
            depth: percent(depth),
            steps: u32::try_from(speed.clamp(0, 100)).unwrap_or_default(),
            phase: 0,
            modulated_delay: 0.0,
        }
    }

    #[must_use]
    pub fn from_params(params: Option<&Value>) -> Self {
        let (mut delay, mut pan, mut amount, mut speed, mut depth) = (10, 0, 50, 10, 10);
        read_params(PluginKind::Chorus, params, |key, value| {
            let slot = match key {
                Some("delay") => &mut delay,
                Some("pan") => &mut pan,
                Some("amount") => &mut amount,
                Some("speed") => &mut speed,
                Some("depth") => &mut depth,
                _ => return false,
            };
            *slot = value;
            true
        });
        Self::new(delay, pan, amount, speed, depth)
    }

    #[must_use]
    pub const fn delay_samples(&self) -> usize {
        self.delay
    }

    /// The LFO-swept delay for the current phase. The taps read at the fixed
    /// delay, so this value does not reach the output.
    #[must_use]
    pub const fn modulated_delay(&self) -> f32 {
        self.modulated_delay
    }

    pub fn process(&mut self, mono: f32) -> StereoFrame {
        self.buffer[self.head] = mono;
        let tap1 = self.buffer[(self.head + CHORUS_BUFFER_LEN - self.delay) % CHORUS_BUFFER_LEN];
        let tap2 =
            self.buffer[(self.head + CHORUS_BUFFER_LEN - 2 * self.delay) % CHORUS_BUFFER_LEN];

        let direct = (1.0 - self.amount / 2.0) * mono;
        let (left_gain, right_gain) = pan_gains(self.pan);
        let near = self.amount * NEAR_TAP_WEIGHT;
        let far = self.amount * FAR_TAP_WEIGHT;
        let half = self.amount / 2.0;

        let frame = match self.pan.signum() {
            -1 => StereoFrame::new(
                left_gain * direct + near * tap1 + far * tap2,
                right_gain * direct + far * tap1 + near * tap2,
            ),
            1 => StereoFrame::new(
                left_gain * direct + far * tap1 + near * tap2,
                right_gain * direct + near * tap1 + far * tap2,
            ),
            _ => StereoFrame::mono(direct + half * tap1 + half * tap2),
        };

        self.advance_lfo();
        self.head = (self.head + 1) % CHORUS_BUFFER_LEN;
        frame
    }

    fn advance_lfo(&mut self) {
        self.phase = (self.phase + self.steps) % SAMPLE_RATE;
        let lfo = self.depth * (TAU * self.phase as f32 / SAMPLE_RATE as f32).sin();
        self.modulated_delay = self.delay as f32 * (1.0 + lfo);
    }
}
