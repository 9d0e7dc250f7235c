use anyhow::Context;
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::app::App;
use crate::audio::AudioPlayer;
use crate::catalog::TrackCatalog;

mod event_loop;
pub mod logging;
mod settings;
mod startup;

pub fn run() -> anyhow::Result<()> {
    let settings = settings::load_settings();

    let catalog = TrackCatalog::from_entries(&settings.catalog.tracks);
    tracing::info!(tracks = catalog.len(), "catalog ready");

    let audio_player =
        AudioPlayer::new(catalog.clone(), &settings).context("failed to start audio engine")?;
    let mut app = App::new(catalog, &settings.ui);

    startup::apply_playback_defaults(&mut app, &audio_player, &settings);

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result = event_loop::run(&mut terminal, &settings, &mut app, &audio_player);

    audio_player.shutdown();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    run_result
}
