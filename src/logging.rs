use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs the global subscriber: stderr plus one log file per invocation.
pub fn init(log_dir: &Path, command: &str) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("creating log folder {}", log_dir.display()))?;

    let path = log_file_path(log_dir, command, &jiff::Zoned::now());
    let file = std::fs::File::create(&path)
        .with_context(|| format!("creating log file {}", path.display()))?;

    let filter = EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,movieload=debug,sqlx=warn".to_string()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_target(false).with_writer(Arc::new(file)))
        .try_init()?;

    Ok(path)
}

fn log_file_path(log_dir: &Path, command: &str, now: &jiff::Zoned) -> PathBuf {
    let stem = command.replace('-', "_");
    log_dir.join(format!("{stem}_{}.log", now.strftime("%Y-%m-%d_%H-%M-%S")))
}
