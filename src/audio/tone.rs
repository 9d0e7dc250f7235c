//! The synthesized fallback tone.

use rodio::mixer::Mixer;
use rodio::source::SineWave;
use rodio::{Sink, Source};

use crate::error::AudioError;

use super::backend::ToneSource;

/// A continuous low-amplitude sine tone on the shared output.
///
/// At most one oscillator sink exists at a time: `start` tears down any
/// running one before connecting a fresh one.
pub struct SynthesizedToneSource {
    mixer: Option<Mixer>,
    sink: Option<Sink>,
    frequency_hz: f32,
    gain: f32,
    muted: bool,
    disposed: bool,
}

impl SynthesizedToneSource {
    pub fn new(mixer: Option<Mixer>, frequency_hz: f32, gain: f32) -> Self {
        Self {
            mixer,
            sink: None,
            frequency_hz,
            gain,
            muted: false,
            disposed: false,
        }
    }

    fn volume(&self) -> f32 {
        if self.muted { 0.0 } else { 1.0 }
    }
}

impl ToneSource for SynthesizedToneSource {
    fn start(&mut self) -> Result<(), AudioError> {
        if self.disposed {
            return Ok(());
        }
        self.stop();

        let Some(mixer) = self.mixer.as_ref() else {
            return Err(AudioError::OutputUnavailable(
                "no output for fallback tone".to_string(),
            ));
        };

        let sink = Sink::connect_new(mixer);
        sink.append(SineWave::new(self.frequency_hz).amplify(self.gain));
        sink.set_volume(self.volume());
        sink.play();
        self.sink = Some(sink);
        tracing::debug!(frequency_hz = self.frequency_hz, "fallback tone started");
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
            tracing::debug!("fallback tone stopped");
        }
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        let volume = self.volume();
        if let Some(sink) = self.sink.as_ref() {
            sink.set_volume(volume);
        }
    }

    #[cfg(test)]
    fn is_active(&self) -> bool {
        self.sink.is_some()
    }

    fn dispose(&mut self) {
        self.stop();
        self.mixer = None;
        self.disposed = true;
    }
}

impl Drop for SynthesizedToneSource {
    fn drop(&mut self) {
        self.dispose();
    }
}
