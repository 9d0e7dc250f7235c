//! Seams between the playback controller and the audio producers.
//!
//! The controller only talks to these traits so it can be driven without an
//! output device. `RodioBackend` is the real implementation.

use std::sync::mpsc::Sender;

use rodio::mixer::Mixer;
use rodio::{OutputStream, OutputStreamBuilder};

use crate::config::AudioSettings;
use crate::error::AudioError;

use super::remote::{RemoteAudioSource, build_client};
use super::tone::SynthesizedToneSource;
use super::types::{EngineMsg, SourceEvent, SourceEventKind};

/// Posts events for one load attempt back to the engine thread.
#[derive(Clone)]
pub struct SourceEvents {
    tx: Sender<EngineMsg>,
    generation: u64,
}

impl SourceEvents {
    pub fn new(tx: Sender<EngineMsg>, generation: u64) -> Self {
        Self { tx, generation }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Send an event; a closed engine inbox means nobody cares any more.
    pub fn emit(&self, kind: SourceEventKind) {
        let _ = self.tx.send(EngineMsg::Source(SourceEvent {
            generation: self.generation,
            kind,
        }));
    }
}

/// One attempt to load and play a remote locator.
///
/// `load` happens at construction; its outcome arrives later through
/// `SourceEvents`. `dispose` must be idempotent and safe while loading.
pub trait RemoteSource {
    fn play(&mut self);
    fn pause(&mut self);
    fn set_muted(&mut self, muted: bool);
    /// Post the native playback position as a `TimeUpdate` event, once the
    /// stream is ready. Nothing is posted while loading.
    fn report_position(&self);
    /// True when a ready stream has run out of samples. Tracks loop, so this
    /// only happens when decoding died mid-stream.
    fn is_drained(&self) -> bool;
    fn dispose(&mut self);
}

/// The locally synthesized fallback tone.
pub trait ToneSource {
    /// Start the tone. Restarts the oscillator when already running.
    fn start(&mut self) -> Result<(), AudioError>;
    fn stop(&mut self);
    fn set_muted(&mut self, muted: bool);
    #[cfg(test)]
    fn is_active(&self) -> bool;
    fn dispose(&mut self);
}

pub trait AudioBackend {
    /// Begin loading `uri`, reporting progress through `events`.
    fn load_remote(&mut self, uri: &str, events: SourceEvents) -> Box<dyn RemoteSource>;
    fn create_tone(&mut self) -> Box<dyn ToneSource>;
    /// Release the shared output. Called once when the controller is disposed.
    fn shutdown(&mut self);
}

/// Backend over `rodio` for output and `reqwest` for fetching.
///
/// The output stream is opened lazily on first use and shared by every
/// source until `shutdown`.
pub struct RodioBackend {
    stream: Option<OutputStream>,
    client: reqwest::blocking::Client,
    settings: AudioSettings,
}

impl RodioBackend {
    pub fn new(settings: &AudioSettings) -> Result<Self, AudioError> {
        Ok(Self {
            stream: None,
            client: build_client(settings)?,
            settings: settings.clone(),
        })
    }

    fn mixer(&mut self) -> Result<Mixer, AudioError> {
        if self.stream.is_none() {
            let mut stream = OutputStreamBuilder::open_default_stream()
                .map_err(|e| AudioError::OutputUnavailable(e.to_string()))?;
            // rodio logs to stderr when OutputStream is dropped, which tears the TUI.
            stream.log_on_drop(false);
            tracing::info!("opened default audio output");
            self.stream = Some(stream);
        }
        match self.stream.as_ref() {
            Some(stream) => Ok(stream.mixer().clone()),
            None => Err(AudioError::OutputUnavailable("stream not open".to_string())),
        }
    }
}

impl AudioBackend for RodioBackend {
    fn load_remote(&mut self, uri: &str, events: SourceEvents) -> Box<dyn RemoteSource> {
        let mixer = self.mixer();
        if let Err(e) = &mixer {
            tracing::warn!(error = %e, "audio output unavailable for remote track");
        }
        Box::new(RemoteAudioSource::load(
            uri,
            mixer.ok(),
            self.client.clone(),
            events,
        ))
    }

    fn create_tone(&mut self) -> Box<dyn ToneSource> {
        let mixer = match self.mixer() {
            Ok(m) => Some(m),
            Err(e) => {
                tracing::warn!(error = %e, "audio output unavailable for fallback tone");
                None
            }
        };
        Box::new(SynthesizedToneSource::new(
            mixer,
            self.settings.tone_frequency_hz,
            self.settings.tone_gain,
        ))
    }

    fn shutdown(&mut self) {
        if self.stream.take().is_some() {
            tracing::info!("closed audio output");
        }
    }
}
