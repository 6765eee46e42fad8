pub mod assets;
pub mod builder;
pub mod config;
pub mod diagnostics;
pub mod document;
pub mod effects;
pub mod engine;
pub mod export;
pub mod fixtures;
pub mod model;
pub mod persistence;
pub mod render;
pub mod report;
pub mod time;
pub mod value;

pub use assets::{FormatError, Waveform, load_song_waveforms, load_waveform};
pub use builder::{SongBuilder, ValidationError, build_song};
pub use config::AppConfig;
pub use diagnostics::{TelemetryGuard, init_tracing};
pub use document::{DocumentError, parse_document};
pub use effects::{EffectBinding, PluginKind, StereoEffect, StereoFrame};
pub use engine::{Engine, EngineError, compile_document};
pub use export::{MixMode, RenderOptions, RenderSummary, WavEncoding, render_song};
pub use model::{Beat, Phrase, Sample, Song};
pub use render::{TrackRender, render_tracks};
pub use report::{RenderReport, generate_render_report};
pub use value::{OptionNode, Section, Value};
