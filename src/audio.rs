//! The meditation playback engine.
//!
//! A `PlaybackController` owns at most one live producer: a remote track
//! streamed through `rodio`, or a synthesized tone used when the remote
//! track cannot be loaded or played. It runs on a single engine thread; the
//! UI talks to it through `AudioPlayer`.

mod backend;
mod controller;
mod fetch;
mod player;
mod progress;
mod remote;
mod thread;
mod tone;
mod types;

pub use player::AudioPlayer;
pub use progress::format_time;
pub use types::*;

#[cfg(test)]
mod tests;
