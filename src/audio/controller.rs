//! The playback controller: single authority over which source is active.
//!
//! Every transition goes through this type. At most one of the remote
//! source and the fallback tone holds a live resource at a time; every
//! switch disposes the old producer before a new one is created.
//!
//! Each load attempt carries a generation tag. Events whose tag does not
//! match the current load come from a superseded attempt and are dropped.

use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use crate::catalog::TrackCatalog;
use crate::config::Settings;
use crate::error::ControlError;

use super::backend::{AudioBackend, RemoteSource, SourceEvents, ToneSource};
use super::progress::ProgressClock;
use super::types::{
    EngineMsg, ErrorKind, Mode, PlaybackSession, SnapshotHandle, SourceEvent, SourceEventKind,
};

/// Controller knobs, distilled from `Settings`.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Watchdog bound for `Loading`.
    pub load_timeout: Duration,
    /// Minimum interval between position samples.
    pub tick: Duration,
    pub mute_affects_tone: bool,
    pub autoplay_on_skip: bool,
    pub initial_track: usize,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            load_timeout: Duration::from_millis(15_000),
            tick: Duration::from_millis(250),
            mute_affects_tone: false,
            autoplay_on_skip: false,
            initial_track: 0,
        }
    }
}

impl ControllerSettings {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            load_timeout: Duration::from_millis(settings.audio.load_timeout_ms),
            tick: Duration::from_millis(settings.progress.tick_ms),
            mute_affects_tone: settings.audio.mute_affects_tone,
            autoplay_on_skip: settings.playback.autoplay_on_skip,
            initial_track: settings.playback.initial_track,
        }
    }
}

/// Whether a source event changed the session.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Applied,
    Discarded,
}

pub struct PlaybackController<B: AudioBackend> {
    catalog: TrackCatalog,
    backend: B,
    settings: ControllerSettings,
    session: PlaybackSession,
    clock: ProgressClock,
    generation: u64,
    /// Whether the user wants sound; survives loading and fallback switches.
    play_intent: bool,
    /// The playing mode `Paused` returns to.
    resume_mode: Mode,
    loading_since: Option<Instant>,
    remote: Option<Box<dyn RemoteSource>>,
    tone: Option<Box<dyn ToneSource>>,
    events: Sender<EngineMsg>,
    snapshot: SnapshotHandle,
    subscribers: Vec<Sender<PlaybackSession>>,
    mounted: bool,
}

impl<B: AudioBackend> PlaybackController<B> {
    pub fn new(
        catalog: TrackCatalog,
        backend: B,
        settings: ControllerSettings,
        events: Sender<EngineMsg>,
        snapshot: SnapshotHandle,
    ) -> Self {
        let clock = ProgressClock::new(settings.tick);
        Self {
            catalog,
            backend,
            settings,
            session: PlaybackSession::default(),
            clock,
            generation: 0,
            play_intent: false,
            resume_mode: Mode::PlayingRemote,
            loading_since: None,
            remote: None,
            tone: None,
            events,
            snapshot,
            subscribers: Vec::new(),
            mounted: false,
        }
    }

    /// Enter the view: start loading the initial track without playing it.
    pub fn mount(&mut self) -> Result<(), ControlError> {
        self.ensure_live()?;
        if self.mounted {
            tracing::debug!("controller already mounted");
            return Ok(());
        }
        if self.catalog.is_empty() {
            return Err(ControlError::EmptyCatalog);
        }
        self.mounted = true;
        let index = self.settings.initial_track.min(self.catalog.len() - 1);
        self.begin_load(index, false);
        Ok(())
    }

    /// Load the track at `index` and play it once ready.
    pub fn select_track(&mut self, index: usize) -> Result<(), ControlError> {
        self.ensure_live()?;
        if index >= self.catalog.len() {
            tracing::warn!(index, len = self.catalog.len(), "ignoring out-of-bounds track");
            return Err(ControlError::InvalidTrackIndex {
                index,
                len: self.catalog.len(),
            });
        }
        self.begin_load(index, true);
        Ok(())
    }

    pub fn next(&mut self) -> Result<(), ControlError> {
        self.ensure_live()?;
        let index = self
            .catalog
            .wrap_next(self.session.current_track_index)
            .ok_or(ControlError::EmptyCatalog)?;
        self.begin_load(index, self.settings.autoplay_on_skip);
        Ok(())
    }

    pub fn previous(&mut self) -> Result<(), ControlError> {
        self.ensure_live()?;
        let index = self
            .catalog
            .wrap_prev(self.session.current_track_index)
            .ok_or(ControlError::EmptyCatalog)?;
        self.begin_load(index, self.settings.autoplay_on_skip);
        Ok(())
    }

    /// Pause the active source, or resume it. Never creates a remote source.
    pub fn toggle_play(&mut self) -> Result<(), ControlError> {
        self.ensure_live()?;
        match self.session.mode {
            Mode::Idle => {
                tracing::debug!("toggle_play with nothing loaded");
            }
            Mode::Loading => {
                self.play_intent = !self.play_intent;
                tracing::debug!(play_intent = self.play_intent, "play intent changed while loading");
            }
            Mode::PlayingRemote => {
                if let Some(remote) = self.remote.as_mut() {
                    remote.pause();
                }
                self.pause_in(Mode::PlayingRemote);
            }
            Mode::PlayingFallback | Mode::Stalled => {
                if let Some(tone) = self.tone.as_mut() {
                    tone.stop();
                }
                self.pause_in(self.session.mode);
            }
            Mode::Paused => {
                self.play_intent = true;
                match self.resume_mode {
                    Mode::PlayingFallback | Mode::Stalled => {
                        self.start_tone();
                    }
                    _ => {
                        if let Some(remote) = self.remote.as_mut() {
                            remote.play();
                        }
                    }
                }
                self.transition(self.resume_mode);
            }
        }
        self.publish();
        Ok(())
    }

    pub fn toggle_mute(&mut self) -> Result<(), ControlError> {
        self.set_muted(!self.session.muted)
    }

    pub fn set_muted(&mut self, muted: bool) -> Result<(), ControlError> {
        self.ensure_live()?;
        self.session.muted = muted;
        if let Some(remote) = self.remote.as_mut() {
            remote.set_muted(muted);
        }
        if self.settings.mute_affects_tone {
            if let Some(tone) = self.tone.as_mut() {
                tone.set_muted(muted);
            }
        }
        self.publish();
        Ok(())
    }

    /// An immutable copy of the session. Never blocks.
    pub fn snapshot(&self) -> PlaybackSession {
        self.session.clone()
    }

    pub fn tick_interval(&self) -> Duration {
        self.settings.tick
    }

    /// Receive every changed snapshot from now on.
    #[cfg(test)]
    pub fn subscribe(&mut self) -> std::sync::mpsc::Receiver<PlaybackSession> {
        let (tx, rx) = std::sync::mpsc::channel();
        self.add_subscriber(tx);
        rx
    }

    pub fn add_subscriber(&mut self, tx: Sender<PlaybackSession>) {
        let _ = tx.send(self.session.clone());
        self.subscribers.push(tx);
    }

    /// Apply a source event. Events from superseded loads are discarded.
    pub fn handle_event(&mut self, event: SourceEvent) -> EventOutcome {
        if self.session.disposed {
            return EventOutcome::Discarded;
        }
        if event.generation != self.generation || self.remote.is_none() {
            tracing::trace!(
                event_generation = event.generation,
                current = self.generation,
                kind = ?event.kind,
                "discarding stale source event"
            );
            return EventOutcome::Discarded;
        }

        match event.kind {
            SourceEventKind::MetadataReady(duration) => {
                self.clock.set_duration(duration);
                self.sync_progress();
                if self.session.mode == Mode::Loading {
                    self.on_ready();
                }
            }
            SourceEventKind::CanPlay => {
                if self.session.mode == Mode::Loading {
                    self.on_ready();
                }
            }
            SourceEventKind::TimeUpdate(elapsed) => {
                self.clock.update(elapsed);
                self.sync_progress();
            }
            SourceEventKind::Error(kind) => {
                self.on_error(kind);
            }
        }
        self.publish();
        EventOutcome::Applied
    }

    /// Periodic housekeeping: load watchdog, drained streams and position sampling.
    pub fn tick(&mut self, now: Instant) {
        if self.session.disposed {
            return;
        }

        if self.session.mode == Mode::Loading {
            if let Some(since) = self.loading_since {
                if now.saturating_duration_since(since) >= self.settings.load_timeout {
                    tracing::warn!(
                        track = self.session.current_track_index,
                        timeout_ms = self.settings.load_timeout.as_millis() as u64,
                        "track load timed out"
                    );
                    self.on_error(ErrorKind::LoadTimeout);
                }
            }
        }

        if self.session.mode == Mode::PlayingRemote && self.clock.due(now) {
            let drained = self.remote.as_ref().is_some_and(|r| r.is_drained());
            if drained {
                tracing::warn!(track = self.session.current_track_index, "remote stream ended unexpectedly");
                self.on_error(ErrorKind::NetworkOrDecode);
            } else if let Some(remote) = self.remote.as_ref() {
                // Arrives back through the inbox as a generation-tagged TimeUpdate.
                remote.report_position();
            }
        }

        self.publish();
    }

    /// Leave the view. Releases every source and the output; a second call is a bug.
    pub fn dispose(&mut self) -> Result<(), ControlError> {
        if self.session.disposed {
            tracing::error!("dispose called on an already disposed controller");
            return Err(ControlError::Disposed);
        }
        self.release_sources();
        self.backend.shutdown();
        self.generation += 1;
        self.play_intent = false;
        self.loading_since = None;
        self.clock.reset();
        self.session.mode = Mode::Idle;
        self.session.elapsed_seconds = 0.0;
        self.session.duration_seconds = 0.0;
        self.session.generation = self.generation;
        self.session.disposed = true;
        tracing::debug!("playback controller disposed");
        self.publish();
        self.subscribers.clear();
        Ok(())
    }

    fn ensure_live(&self) -> Result<(), ControlError> {
        if self.session.disposed {
            tracing::error!("operation on a disposed playback controller");
            return Err(ControlError::Disposed);
        }
        Ok(())
    }

    fn begin_load(&mut self, index: usize, autoplay: bool) {
        self.release_sources();

        self.generation += 1;
        self.play_intent = autoplay;
        self.resume_mode = Mode::PlayingRemote;
        self.clock.reset();
        self.session.current_track_index = index;
        self.session.elapsed_seconds = 0.0;
        self.session.duration_seconds = 0.0;
        self.session.last_error = None;
        self.session.on_fallback = false;
        self.session.generation = self.generation;
        self.transition(Mode::Loading);
        self.loading_since = Some(Instant::now());

        let uri = self
            .catalog
            .get(index)
            .map(|t| t.source_uri.clone())
            .unwrap_or_default();
        let events = SourceEvents::new(self.events.clone(), self.generation);
        let mut remote = self.backend.load_remote(&uri, events);
        remote.set_muted(self.session.muted);
        self.remote = Some(remote);

        tracing::info!(
            track = index,
            generation = self.generation,
            autoplay,
            "loading track"
        );
        self.publish();
    }

    fn on_ready(&mut self) {
        self.loading_since = None;
        self.resume_mode = Mode::PlayingRemote;
        if self.play_intent {
            if let Some(remote) = self.remote.as_mut() {
                remote.play();
            }
            self.transition(Mode::PlayingRemote);
        } else {
            self.transition(Mode::Paused);
        }
    }

    fn on_error(&mut self, kind: ErrorKind) {
        tracing::warn!(
            track = self.session.current_track_index,
            error = kind.label(),
            "remote playback failed, switching to calming tone"
        );
        self.session.last_error = Some(kind);
        let fallback = match kind {
            ErrorKind::LoadTimeout | ErrorKind::InvalidLocator => Mode::Stalled,
            ErrorKind::NetworkOrDecode | ErrorKind::PlaybackRejected => Mode::PlayingFallback,
        };
        self.engage_fallback(fallback);
    }

    fn engage_fallback(&mut self, mode: Mode) {
        if let Some(mut remote) = self.remote.take() {
            remote.dispose();
        }
        self.loading_since = None;
        self.clock.reset();
        self.sync_progress();
        self.session.on_fallback = true;
        self.resume_mode = mode;

        if self.play_intent {
            self.start_tone();
            self.transition(mode);
        } else {
            self.transition(Mode::Paused);
        }
    }

    fn start_tone(&mut self) {
        if self.tone.is_none() {
            let mut tone = self.backend.create_tone();
            if self.settings.mute_affects_tone {
                tone.set_muted(self.session.muted);
            }
            self.tone = Some(tone);
        }
        if let Some(tone) = self.tone.as_mut() {
            if let Err(e) = tone.start() {
                tracing::warn!(error = %e, "fallback tone could not start");
                self.session.last_error = Some(ErrorKind::PlaybackRejected);
            }
        }
    }

    fn pause_in(&mut self, mode: Mode) {
        self.play_intent = false;
        self.resume_mode = mode;
        self.transition(Mode::Paused);
    }

    fn release_sources(&mut self) {
        if let Some(mut remote) = self.remote.take() {
            remote.dispose();
        }
        if let Some(mut tone) = self.tone.take() {
            tone.dispose();
        }
    }

    fn sync_progress(&mut self) {
        self.session.elapsed_seconds = self.clock.elapsed();
        self.session.duration_seconds = self.clock.duration();
    }

    fn transition(&mut self, mode: Mode) {
        if self.session.mode != mode {
            tracing::debug!(from = ?self.session.mode, to = ?mode, "playback transition");
            self.session.mode = mode;
        }
    }

    fn publish(&mut self) {
        let changed = match self.snapshot.lock() {
            Ok(mut shared) => {
                if *shared != self.session {
                    *shared = self.session.clone();
                    true
                } else {
                    false
                }
            }
            Err(_) => true,
        };
        if changed {
            let session = &self.session;
            self.subscribers.retain(|tx| tx.send(session.clone()).is_ok());
        }
    }
}
