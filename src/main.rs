mod app;
mod audio;
mod catalog;
mod config;
mod error;
mod runtime;
mod ui;

fn main() -> anyhow::Result<()> {
    let log_path = runtime::logging::init()?;
    tracing::info!(log = %log_path.display(), "stillpoint starting");
    runtime::run()
}
