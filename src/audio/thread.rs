use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::catalog::TrackCatalog;
use crate::config::Settings;
use crate::error::{AudioError, ControlError};

use super::backend::{AudioBackend, RodioBackend};
use super::controller::{ControllerSettings, PlaybackController};
use super::types::{AudioCmd, EngineMsg, SnapshotHandle};

/// Spawn the engine thread: the single control thread that owns the
/// controller and the audio output.
pub(super) fn spawn_engine_thread(
    catalog: TrackCatalog,
    settings: Settings,
    tx: Sender<EngineMsg>,
    rx: Receiver<EngineMsg>,
    snapshot: SnapshotHandle,
) -> Result<JoinHandle<()>, AudioError> {
    let handle = thread::Builder::new()
        .name("audio-engine".to_string())
        .spawn(move || {
            let backend = match RodioBackend::new(&settings.audio) {
                Ok(b) => b,
                Err(e) => {
                    tracing::error!(error = %e, "audio engine failed to start");
                    return;
                }
            };
            let controller = PlaybackController::new(
                catalog,
                backend,
                ControllerSettings::from_settings(&settings),
                tx,
                snapshot,
            );
            run_engine(controller, &rx);
        })?;
    Ok(handle)
}

/// Drive `controller` from `rx` until `Quit` arrives.
///
/// The controller keeps a sender to `rx` for its sources, so the inbox never
/// disconnects on its own; `Quit` is the only way out. The receive timeout
/// doubles as the progress tick and load watchdog.
pub(super) fn run_engine<B: AudioBackend>(
    mut controller: PlaybackController<B>,
    rx: &Receiver<EngineMsg>,
) {
    if let Err(e) = controller.mount() {
        tracing::error!(error = %e, "could not mount playback controller");
    }

    let tick = controller.tick_interval();
    loop {
        match rx.recv_timeout(tick) {
            Ok(EngineMsg::Command(AudioCmd::Quit)) => break,
            Ok(EngineMsg::Command(cmd)) => {
                if let Err(e) = apply_command(&mut controller, cmd) {
                    tracing::warn!(error = %e, "command rejected");
                }
            }
            Ok(EngineMsg::Source(event)) => {
                controller.handle_event(event);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                tracing::error!("engine inbox closed without Quit");
                break;
            }
        }
        controller.tick(Instant::now());
    }

    if let Err(e) = controller.dispose() {
        tracing::error!(error = %e, "engine shutdown failed");
    }
    tracing::info!("audio engine stopped");
}

/// Wait for the engine thread. Returns false when it panicked.
pub(super) fn join_engine(handle: JoinHandle<()>) -> bool {
    match handle.join() {
        Ok(()) => true,
        Err(_) => {
            tracing::error!("audio engine thread panicked");
            false
        }
    }
}

fn apply_command<B: AudioBackend>(
    controller: &mut PlaybackController<B>,
    cmd: AudioCmd,
) -> Result<(), ControlError> {
    match cmd {
        AudioCmd::SelectTrack(i) => controller.select_track(i),
        AudioCmd::Next => controller.next(),
        AudioCmd::Previous => controller.previous(),
        AudioCmd::TogglePlay => controller.toggle_play(),
        AudioCmd::ToggleMute => controller.toggle_mute(),
        AudioCmd::SetMuted(m) => controller.set_muted(m),
        AudioCmd::Subscribe(tx) => {
            controller.add_subscriber(tx);
            Ok(())
        }
        AudioCmd::Quit => Ok(()),
    }
}
