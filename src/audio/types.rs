//! Audio-related small types and handles.
//!
//! This module defines the session model shared with the UI, the commands the
//! engine thread accepts and the generation-tagged events sources report.

use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use super::progress::percentage;

/// Which producer (if any) the controller is driving.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Mode {
    /// Not mounted yet, or disposed.
    #[default]
    Idle,
    /// A remote load is in flight.
    Loading,
    PlayingRemote,
    PlayingFallback,
    Paused,
    /// The load timed out or the locator was unusable; the tone plays instead.
    Stalled,
}

impl Mode {
    pub fn is_playing(self) -> bool {
        matches!(self, Mode::PlayingRemote | Mode::PlayingFallback | Mode::Stalled)
    }
}

/// Advisory error recorded in the session. Every kind is recovered locally.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Locator unreachable, non-2xx answer or undecodable payload.
    NetworkOrDecode,
    /// The output refused to play.
    PlaybackRejected,
    /// No "ready" or "error" arrived within the watchdog interval.
    LoadTimeout,
    /// Empty, unparsable or unsupported locator.
    InvalidLocator,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::NetworkOrDecode => "track unavailable",
            ErrorKind::PlaybackRejected => "playback refused",
            ErrorKind::LoadTimeout => "load timed out",
            ErrorKind::InvalidLocator => "invalid track locator",
        }
    }
}

/// Immutable read of the controller state handed to the UI.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaybackSession {
    pub current_track_index: usize,
    pub mode: Mode,
    pub muted: bool,
    pub elapsed_seconds: f64,
    /// Zero while unknown, and always zero while the fallback tone is active.
    pub duration_seconds: f64,
    pub last_error: Option<ErrorKind>,
    /// True once the fallback tone has replaced the requested track.
    pub on_fallback: bool,
    /// Tag of the current load attempt.
    pub generation: u64,
    pub disposed: bool,
}

impl PlaybackSession {
    pub fn is_playing(&self) -> bool {
        self.mode.is_playing()
    }

    pub fn is_loading(&self) -> bool {
        self.mode == Mode::Loading
    }

    /// Progress in percent, 0 when the duration is unknown.
    pub fn progress_percentage(&self) -> f64 {
        percentage(self.elapsed_seconds, self.duration_seconds)
    }
}

#[derive(Debug)]
pub enum AudioCmd {
    /// Load the track at the given index and play it once ready.
    SelectTrack(usize),
    /// Skip to the next track, wrapping around.
    Next,
    /// Go to the previous track, wrapping around.
    Previous,
    /// Pause or resume whichever source is active.
    TogglePlay,
    ToggleMute,
    SetMuted(bool),
    /// Register a channel that receives every changed snapshot.
    Subscribe(Sender<PlaybackSession>),
    /// Dispose the controller and stop the engine thread.
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceEventKind {
    /// Duration in seconds; `None` when the stream does not report one.
    MetadataReady(Option<f64>),
    CanPlay,
    /// Native playback position in seconds.
    TimeUpdate(f64),
    Error(ErrorKind),
}

/// Lifecycle event from a remote source, tagged with its load generation.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEvent {
    pub generation: u64,
    pub kind: SourceEventKind,
}

/// Everything the engine thread receives on its single inbox.
#[derive(Debug)]
pub enum EngineMsg {
    Command(AudioCmd),
    Source(SourceEvent),
}

pub type SnapshotHandle = Arc<Mutex<PlaybackSession>>;
