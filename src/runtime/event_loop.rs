use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::app::App;
use crate::audio::{AudioPlayer, PlaybackSession};
use crate::config;
use crate::error::ControlError;
use crate::ui;

/// Main terminal event loop: handles input, drawing and snapshot updates
/// pushed by the audio engine. Returns `Ok(())` when the user quits.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut App,
    audio_player: &AudioPlayer,
) -> anyhow::Result<()> {
    let mut updates = audio_player.subscribe().ok();

    loop {
        if let Some(rx) = updates.as_ref() {
            if drain_updates(rx, app) {
                // Engine is gone; keep showing the last snapshot.
                tracing::warn!("audio engine stopped publishing");
                updates = None;
            }
        } else {
            app.sync_session(audio_player.snapshot());
        }

        app.rotate_quotes(Instant::now());
        app.advance_frame();

        terminal.draw(|f| ui::draw(f, app, &settings.ui))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, app, audio_player) {
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Apply every pending snapshot. Returns true once the engine hung up.
fn drain_updates(rx: &Receiver<PlaybackSession>, app: &mut App) -> bool {
    loop {
        match rx.try_recv() {
            Ok(session) => app.sync_session(session),
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => return true,
        }
    }
}

fn report(result: Result<(), ControlError>) {
    if let Err(e) = result {
        tracing::warn!(error = %e, "playback command failed");
    }
}

/// Handle one key press. Returns true when the user asked to quit.
fn handle_key_event(key: KeyEvent, app: &mut App, audio_player: &AudioPlayer) -> bool {
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('j') | KeyCode::Down => {
            app.next();
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.prev();
        }
        KeyCode::Enter => {
            if app.has_tracks() {
                report(audio_player.select_track(app.selected));
            }
        }
        KeyCode::Char(' ') | KeyCode::Char('p') => {
            report(audio_player.toggle_play());
        }
        KeyCode::Char('l') => {
            report(audio_player.next());
        }
        KeyCode::Char('h') => {
            report(audio_player.previous());
        }
        KeyCode::Char('m') => {
            report(audio_player.toggle_mute());
        }
        _ => {}
    }
    false
}
