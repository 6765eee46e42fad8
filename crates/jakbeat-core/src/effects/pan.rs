use super::{PluginKind, StereoFrame, read_params};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pan {
    pan: i32,
}

impl Pan {
    #[must_use]
    pub fn new(pan: i32) -> Self {
        Self {
            pan: pan.clamp(-100, 100),
        }
    }

    /// Accepts `pan = N` or a bare scalar.
    #[must_use]
    pub fn from_params(params: Option<&Value>) -> Self {
        let mut pan = 0;
        read_params(PluginKind::Pan, params, |key, value| match key {
            None | Some("pan") => {
                pan = value;
                true
            }
            Some(_) => false,
        });
        Self::new(pan)
    }

    #[must_use]
    pub const fn pan(&self) -> i32 {
        self.pan
    }

    pub fn process(&mut self, mono: f32) -> StereoFrame {
        let attenuated = mono * (100 - self.pan.abs()) as f32 / 100.0;
        match self.pan.signum() {
            -1 => StereoFrame::new(mono, attenuated),
            1 => StereoFrame::new(attenuated, mono),
            _ => StereoFrame::mono(mono),
        }
    }
}
