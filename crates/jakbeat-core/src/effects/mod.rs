mod chorus;
mod pan;
mod reverb;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::value::{Value, parse_int_lenient};

pub use chorus::{CHORUS_BUFFER_LEN, Chorus};
pub use pan::Pan;
pub use reverb::{REVERB_BUFFER_LEN, Reverb};

pub const DEFAULT_PLUGIN: &str = "pan";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

impl StereoFrame {
    #[must_use]
    pub const fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }

    #[must_use]
    pub const fn mono(sample: f32) -> Self {
        Self::new(sample, sample)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown stereo plugin: {0}")]
pub struct UnknownPlugin(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginKind {
    Pan,
    Chorus,
    Reverb,
}

impl PluginKind {
    pub const ALL: [Self; 3] = [Self::Pan, Self::Chorus, Self::Reverb];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pan => "pan",
            Self::Chorus => "chorus",
            Self::Reverb => "reverb",
        }
    }

    #[must_use]
    pub fn instantiate(self, params: Option<&Value>) -> StereoEffect {
        match self {
            Self::Pan => StereoEffect::Pan(Pan::from_params(params)),
            Self::Chorus => StereoEffect::Chorus(Box::new(Chorus::from_params(params))),
            Self::Reverb => StereoEffect::Reverb(Box::new(Reverb::from_params(params))),
        }
    }
}

impl FromStr for PluginKind {
    type Err = UnknownPlugin;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| UnknownPlugin(name.to_string()))
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
pub enum StereoEffect {
    Pan(Pan),
    Chorus(Box<Chorus>),
    Reverb(Box<Reverb>),
}

impl StereoEffect {
    #[must_use]
    pub const fn kind(&self) -> PluginKind {
        match self {
            Self::Pan(_) => PluginKind::Pan,
            Self::Chorus(_) => PluginKind::Chorus,
            Self::Reverb(_) => PluginKind::Reverb,
        }
    }

    pub fn process(&mut self, mono: f32) -> StereoFrame {
        match self {
            Self::Pan(pan) => pan.process(mono),
            Self::Chorus(chorus) => chorus.process(mono),
            Self::Reverb(reverb) => reverb.process(mono),
        }
    }
}

/// Builds a plugin instance by name. Unknown names fall back to a neutral pan
/// so a typo degrades the track instead of aborting the song.
#[must_use]
pub fn instantiate(name: &str, params: Option<&Value>) -> StereoEffect {
    match name.parse::<PluginKind>() {
        Ok(kind) => {
            debug!(plugin = %kind, has_params = params.is_some(), "stereo plugin instantiated");
            kind.instantiate(params)
        }
        Err(error) => {
            warn!(%error, "falling back to neutral pan");
            StereoEffect::Pan(Pan::new(0))
        }
    }
}

/// A sample's stereo effect: the plugin name and raw parameter block, plus the
/// instance built from them on first use.
#[derive(Clone, Serialize, Deserialize)]
pub struct EffectBinding {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip)]
    instance: Option<StereoEffect>,
}

impl Default for EffectBinding {
    fn default() -> Self {
        Self::new(DEFAULT_PLUGIN, None)
    }
}

impl fmt::Debug for EffectBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectBinding")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("instantiated", &self.instance.is_some())
            .finish()
    }
}

impl PartialEq for EffectBinding {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.params == other.params
    }
}

impl EffectBinding {
    #[must_use]
    pub fn new(name: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            name: name.into(),
            params,
            instance: None,
        }
    }

    #[must_use]
    pub fn is_instantiated(&self) -> bool {
        self.instance.is_some()
    }

    /// Same name and parameters, no instance: the next `apply` starts from
    /// freshly initialized plugin state.
    #[must_use]
    pub fn unbound(&self) -> Self {
        Self::new(self.name.clone(), self.params.clone())
    }

    pub fn apply(&mut self, mono: f32) -> StereoFrame {
        self.instance
            .get_or_insert_with(|| instantiate(&self.name, self.params.as_ref()))
            .process(mono)
    }
}

/// Walks a parameter block and hands each integer to `assign`. Scalars outside
/// any option arrive with `None` as their key.
pub(crate) fn read_params<'a, F>(plugin: PluginKind, params: Option<&'a Value>, mut assign: F)
where
    F: FnMut(Option<&'a str>, i32) -> bool,
{
    let Some(params) = params else {
        return;
    };

    params.walk(None, &mut |key, text| {
        if !assign(key, parse_int_lenient(text)) {
            debug!(%plugin, key = key.unwrap_or("<positional>"), text, "ignoring plugin parameter");
        }
    });
}

/// Channel gains shared by every plugin that pans: the far side is attenuated
/// by the pan percentage, the near side stays at unity.
#[must_use]
pub(crate) fn pan_gains(pan: i32) -> (f32, f32) {
    let attenuation = (100 - pan.abs()) as f32 / 100.0;
    match pan.signum() {
        -1 => (1.0, attenuation),
        1 => (attenuation, 1.0),
        _ => (1.0, 1.0),
    }
}

pub(crate) fn percent(value: i32) -> f32 {
    value.clamp(0, 100) as f32 / 100.0
}
