//! Process-wide tracing. Human-readable events go to stderr so stdout stays
//! clean for `fmt` and `fingerprint`; every session also gets its own JSON log
//! file under `diagnostics.log_dir`.

use std::{fs, io, path::PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::config::DiagnosticsConfig;

pub const DEFAULT_FILTER: &str = "info,jakbeat_core=debug";

/// Keep alive for the whole run; dropping it flushes the JSON log.
pub struct TelemetryGuard {
    pub session_id: Uuid,
    pub log_file: PathBuf,
    _flush: WorkerGuard,
}

fn session_log_name(prefix: &str, started: DateTime<Utc>) -> String {
    format!("{prefix}-{}.log", started.format("%Y%m%d-%H%M%S"))
}

/// `RUST_LOG` wins over the configured filter.
fn env_filter(configured: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(configured))
}

pub fn init_tracing(config: &DiagnosticsConfig) -> anyhow::Result<TelemetryGuard> {
    fs::create_dir_all(&config.log_dir).with_context(|| {
        format!("failed to create log directory: {}", config.log_dir.display())
    })?;

    let session_id = Uuid::new_v4();
    let file_name = session_log_name(&config.trace_file_prefix, Utc::now());
    let log_file = config.log_dir.join(&file_name);
    let (json_writer, flush) = tracing_appender::non_blocking(
        tracing_appender::rolling::never(&config.log_dir, &file_name),
    );

    let installed = tracing_subscriber::registry()
        .with(env_filter(&config.rust_log_filter))
        .with(
            fmt::layer()
                .compact()
                .with_writer(io::stderr)
                .with_target(true),
        )
        .with(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_span_list(true)
                .with_writer(json_writer),
        )
        .try_init();

    match installed {
        Ok(()) => info!(%session_id, log_file = %log_file.display(), "tracing initialized"),
        Err(error) => warn!(?error, "a global tracing subscriber is already installed"),
    }

    Ok(TelemetryGuard {
        session_id,
        log_file,
        _flush: flush,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn log_name_carries_prefix_and_start_time() {
        let started = Utc
            .with_ymd_and_hms(2024, 3, 9, 7, 5, 1)
            .single()
            .expect("valid timestamp");
        assert_eq!(
            session_log_name("jakbeat", started),
            "jakbeat-20240309-070501.log"
        );
    }

    #[test]
    fn init_creates_the_log_directory() {
        let temp = tempfile::tempdir().expect("tempdir should be creatable");
        let config = DiagnosticsConfig {
            log_dir: temp.path().join("logs/nested"),
            trace_file_prefix: "session".to_string(),
            ..DiagnosticsConfig::default()
        };

        let guard = init_tracing(&config).expect("tracing setup should succeed");
        assert!(config.log_dir.is_dir());
        assert_eq!(guard.log_file.parent(), Some(config.log_dir.as_path()));
        assert!(
            guard
                .log_file
                .file_name()
                .is_some_and(|name| name.to_string_lossy().starts_with("session-"))
        );
    }
}
