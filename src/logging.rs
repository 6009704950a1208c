//! Console + build-log output.
//!
//! Every run truncates `<output_dir>/build_log.txt` and mirrors the stderr
//! stream into it without ANSI colors, so the published site carries the log
//! of the run that produced it. `RUST_LOG` overrides the default `info` filter.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

pub const BUILD_LOG_FILE: &str = "build_log.txt";

pub fn build_log_path(output_dir: &Path) -> PathBuf {
    output_dir.join(BUILD_LOG_FILE)
}

pub fn init_logging(output_dir: &Path) -> Result<()> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed creating {}", output_dir.display()))?;
    let log_path = build_log_path(output_dir);
    let file = File::create(&log_path)
        .with_context(|| format!("failed creating {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false);
    let file_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_target(false)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")
}
