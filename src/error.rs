//! Error types for the meditation player.
//!
//! Recoverable playback problems never surface here; they are folded into the
//! advisory `last_error` field of the session. These types cover caller
//! mistakes, the audio output and the remote fetch path.

use thiserror::Error;

use crate::audio::ErrorKind;

/// Errors returned by transport operations on the playback controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error("track index {index} is out of bounds for a catalog of {len} tracks")]
    InvalidTrackIndex { index: usize, len: usize },

    #[error("the playback engine has been disposed")]
    Disposed,

    #[error("the track catalog is empty")]
    EmptyCatalog,
}

/// Audio output errors.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("no audio output device: {0}")]
    OutputUnavailable(String),

    #[error("failed to decode audio: {0}")]
    Decode(String),

    #[error("failed to build http client: {0}")]
    HttpClient(String),

    #[error("failed to spawn audio thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Errors raised while resolving and fetching a track locator.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("empty locator")]
    EmptyLocator,

    #[error("invalid locator {locator:?}: {reason}")]
    InvalidLocator { locator: String, reason: String },

    #[error("unsupported locator scheme: {0}")]
    UnsupportedScheme(String),

    #[error("server answered with status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Map a fetch failure onto the advisory session error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::EmptyLocator
            | FetchError::InvalidLocator { .. }
            | FetchError::UnsupportedScheme(_) => ErrorKind::InvalidLocator,
            FetchError::Status(_) | FetchError::Transport(_) | FetchError::Io(_) => {
                ErrorKind::NetworkOrDecode
            }
        }
    }
}
