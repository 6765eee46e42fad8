use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::export::{MixMode, RenderOptions, WavEncoding};

pub const CONFIG_FILE_NAME: &str = "jakbeat.config.toml";
pub const CONFIG_PATH_ENV: &str = "JAKBEAT_CONFIG_PATH";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub render: RenderConfig,
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub output: PathBuf,
    pub split: bool,
    pub parallel: bool,
    pub encoding: WavEncoding,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub log_dir: PathBuf,
    pub rust_log_filter: String,
    pub trace_file_prefix: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("test.wav"),
            split: false,
            parallel: true,
            encoding: WavEncoding::Float32,
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            rust_log_filter: crate::diagnostics::DEFAULT_FILTER.to_string(),
            trace_file_prefix: "jakbeat".to_string(),
        }
    }
}

impl RenderConfig {
    #[must_use]
    pub fn options(&self) -> RenderOptions {
        RenderOptions {
            output: self.output.clone(),
            mode: if self.split {
                MixMode::Split
            } else {
                MixMode::Unified
            },
            parallel: self.parallel,
            encoding: self.encoding,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let config_path = discover_config_path().with_context(|| {
            format!("failed to locate {CONFIG_FILE_NAME}; looked in cwd and parent directory")
        })?;
        Self::from_path(&config_path)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config TOML from {}", path.display()))?;

        Ok(config)
    }

    /// Like [`AppConfig::load`], but a missing file means defaults. A file
    /// that exists and fails to parse is still an error.
    pub fn load_or_default() -> Result<Self> {
        match discover_config_path() {
            Ok(path) => Self::from_path(&path),
            Err(error) => {
                debug!(%error, "no config file, using defaults");
                Ok(Self::default())
            }
        }
    }
}

fn discover_config_path() -> Result<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.is_file() {
            return Ok(path);
        }
    }

    let cwd = env::current_dir().context("failed to resolve current directory")?;
    let candidates = [
        cwd.join(CONFIG_FILE_NAME),
        cwd.join("..").join(CONFIG_FILE_NAME),
    ];

    candidates
        .into_iter()
        .find(|path| path.is_file())
        .ok_or_else(|| anyhow::anyhow!("{CONFIG_FILE_NAME} not found"))
}
