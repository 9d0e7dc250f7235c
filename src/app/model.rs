//! Application model: `App`.
//!
//! The `App` struct holds the catalog, the playlist cursor, the last session
//! snapshot received from the engine and the rotating quote state.

use std::time::{Duration, Instant};

use crate::audio::{Mode, PlaybackSession};
use crate::catalog::{Track, TrackCatalog};
use crate::config::UiSettings;

/// The main application model.
pub struct App {
    pub catalog: TrackCatalog,
    pub selected: usize,
    pub session: PlaybackSession,

    /// Cursor follows the current track when the engine switches tracks.
    pub follow_playback: bool,

    quotes: Vec<String>,
    quote_index: usize,
    quote_interval: Option<Duration>,
    quote_changed_at: Instant,

    /// Animation frame for the loading and calming-tone indicators.
    pub frame: usize,
}

impl App {
    /// Create a new `App` over `catalog`, taking quotes from `ui`.
    pub fn new(catalog: TrackCatalog, ui: &UiSettings) -> Self {
        let quote_interval = match ui.quote_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Self {
            catalog,
            selected: 0,
            session: PlaybackSession::default(),
            follow_playback: true,
            quotes: ui.quotes.clone(),
            quote_index: 0,
            quote_interval,
            quote_changed_at: Instant::now(),
            frame: 0,
        }
    }

    /// Return true if the catalog contains any tracks.
    pub fn has_tracks(&self) -> bool {
        !self.catalog.is_empty()
    }

    /// The track the engine currently has loaded.
    pub fn current_track(&self) -> Option<&Track> {
        if self.session.generation == 0 {
            return None;
        }
        self.catalog.get(self.session.current_track_index)
    }

    /// Move the cursor to the next track, wrapping to the first.
    pub fn next(&mut self) {
        if let Some(next) = self.catalog.wrap_next(self.selected) {
            self.selected = next;
        }
    }

    /// Move the cursor to the previous track, wrapping to the last.
    pub fn prev(&mut self) {
        if let Some(prev) = self.catalog.wrap_prev(self.selected) {
            self.selected = prev;
        }
    }

    pub fn set_selected(&mut self, idx: usize) {
        if idx < self.catalog.len() {
            self.selected = idx;
        }
    }

    /// Store a fresh snapshot. When the engine moved to another track and
    /// `follow_playback` is on, the cursor follows it.
    pub fn sync_session(&mut self, session: PlaybackSession) {
        let switched = session.generation != self.session.generation
            && session.current_track_index != self.session.current_track_index;
        if switched && self.follow_playback {
            self.set_selected(session.current_track_index);
        }
        self.session = session;
    }

    pub fn current_quote(&self) -> Option<&str> {
        self.quotes.get(self.quote_index).map(String::as_str)
    }

    /// Advance to the next quote once the interval elapsed. Returns whether it changed.
    pub fn rotate_quotes(&mut self, now: Instant) -> bool {
        let Some(interval) = self.quote_interval else {
            return false;
        };
        if self.quotes.len() < 2 {
            return false;
        }
        if now.saturating_duration_since(self.quote_changed_at) < interval {
            return false;
        }
        self.quote_index = (self.quote_index + 1) % self.quotes.len();
        self.quote_changed_at = now;
        true
    }

    pub fn advance_frame(&mut self) {
        self.frame = self.frame.wrapping_add(1);
    }

    /// Short label for the session mode shown in the now-playing box.
    pub fn status_label(&self) -> &'static str {
        match self.session.mode {
            Mode::Idle => "Idle",
            Mode::Loading => "Loading",
            Mode::PlayingRemote => "Playing",
            Mode::PlayingFallback => "Playing calming tone",
            Mode::Paused => "Paused",
            Mode::Stalled => "Track unavailable, calming tone",
        }
    }
}
