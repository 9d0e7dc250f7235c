use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Log file path: `$STILLPOINT_LOG`, else `stillpoint.log` in the temp dir.
pub fn log_path() -> PathBuf {
    env::var_os("STILLPOINT_LOG")
        .map(PathBuf::from)
        .unwrap_or_else(|| env::temp_dir().join("stillpoint.log"))
}

/// Install the global subscriber. Output goes to a file so it cannot
/// corrupt the alternate screen.
pub fn init() -> anyhow::Result<PathBuf> {
    let path = log_path();
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_thread_names(true)
                .with_writer(Mutex::new(file)),
        )
        .try_init()?;

    Ok(path)
}
