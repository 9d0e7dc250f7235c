use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::catalog::TrackCatalog;
use crate::config::Settings;
use crate::error::{AudioError, ControlError};

use super::thread::{join_engine, spawn_engine_thread};
use super::types::{AudioCmd, EngineMsg, PlaybackSession, SnapshotHandle};

/// Handle the UI uses to drive the engine thread and observe its session.
pub struct AudioPlayer {
    tx: Sender<EngineMsg>,
    snapshot: SnapshotHandle,
    track_count: usize,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl AudioPlayer {
    pub fn new(catalog: TrackCatalog, settings: &Settings) -> Result<Self, AudioError> {
        let (tx, rx) = mpsc::channel::<EngineMsg>();
        let snapshot: SnapshotHandle = Arc::new(Mutex::new(PlaybackSession::default()));
        let track_count = catalog.len();

        let engine = spawn_engine_thread(
            catalog,
            settings.clone(),
            tx.clone(),
            rx,
            snapshot.clone(),
        )?;

        Ok(Self {
            tx,
            snapshot,
            track_count,
            join: Mutex::new(Some(engine)),
        })
    }

    /// Latest published session.
    pub fn snapshot(&self) -> PlaybackSession {
        self.snapshot
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    pub fn send(&self, cmd: AudioCmd) -> Result<(), ControlError> {
        self.tx
            .send(EngineMsg::Command(cmd))
            .map_err(|_| ControlError::Disposed)
    }

    /// Select a track; out-of-bounds indices are rejected here, before reaching the engine.
    pub fn select_track(&self, index: usize) -> Result<(), ControlError> {
        if index >= self.track_count {
            return Err(ControlError::InvalidTrackIndex {
                index,
                len: self.track_count,
            });
        }
        self.send(AudioCmd::SelectTrack(index))
    }

    pub fn next(&self) -> Result<(), ControlError> {
        self.send(AudioCmd::Next)
    }

    pub fn previous(&self) -> Result<(), ControlError> {
        self.send(AudioCmd::Previous)
    }

    pub fn toggle_play(&self) -> Result<(), ControlError> {
        self.send(AudioCmd::TogglePlay)
    }

    pub fn toggle_mute(&self) -> Result<(), ControlError> {
        self.send(AudioCmd::ToggleMute)
    }

    pub fn set_muted(&self, muted: bool) -> Result<(), ControlError> {
        self.send(AudioCmd::SetMuted(muted))
    }

    /// Receive every changed session, starting with the current one.
    pub fn subscribe(&self) -> Result<Receiver<PlaybackSession>, ControlError> {
        let (tx, rx) = mpsc::channel();
        self.send(AudioCmd::Subscribe(tx))?;
        Ok(rx)
    }

    /// Dispose the engine and wait for its thread. Safe to call more than once.
    pub fn shutdown(&self) {
        let Ok(mut join) = self.join.lock() else {
            return;
        };
        if let Some(handle) = join.take() {
            let _ = self.send(AudioCmd::Quit);
            join_engine(handle);
        }
    }
}

impl Drop for AudioPlayer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
