//! Remote track playback over a `rodio` sink.
//!
//! Loading runs on a short-lived thread that fetches and decodes the payload
//! and then installs a paused sink. The sink is only installed under the
//! shared lock and only if the source was not disposed meanwhile, so a
//! superseded load never becomes audible.

use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rodio::mixer::Mixer;
use rodio::{Decoder, Sink, Source};

use crate::config::AudioSettings;
use crate::error::AudioError;

use super::backend::{RemoteSource, SourceEvents};
use super::fetch::{fetch_bytes, parse_locator};
use super::types::{ErrorKind, SourceEventKind};

pub(super) fn build_client(settings: &AudioSettings) -> Result<reqwest::blocking::Client, AudioError> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_millis(settings.fetch_timeout_ms))
        .user_agent(concat!("stillpoint/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AudioError::HttpClient(e.to_string()))
}

/// Create a paused, looping `Sink` for an encoded payload.
///
/// Returns the sink and the stream duration when the container reports one.
fn create_looping_sink(mixer: &Mixer, bytes: Vec<u8>) -> Result<(Sink, Option<Duration>), AudioError> {
    let decoder = Decoder::new(Cursor::new(bytes)).map_err(|e| AudioError::Decode(e.to_string()))?;
    let duration = decoder.total_duration();

    let sink = Sink::connect_new(mixer);
    sink.pause();
    sink.append(decoder.repeat_infinite());
    Ok((sink, duration))
}

#[derive(Default)]
struct Shared {
    sink: Option<Sink>,
    /// Length of one loop, when the container reports it.
    duration: Option<Duration>,
    disposed: bool,
    want_play: bool,
    muted: bool,
}

impl Shared {
    fn volume(&self) -> f32 {
        if self.muted { 0.0 } else { 1.0 }
    }
}

pub struct RemoteAudioSource {
    shared: Arc<Mutex<Shared>>,
    events: SourceEvents,
}

/// The fetch-and-decode job of one `RemoteAudioSource`.
pub(super) struct Loader {
    uri: String,
    mixer: Option<Mixer>,
    client: reqwest::blocking::Client,
    shared: Arc<Mutex<Shared>>,
    events: SourceEvents,
}

impl Loader {
    /// Blocks until the payload is fetched and decoded, or the load failed.
    pub(super) fn run(self) {
        run_load(&self.uri, self.mixer, &self.client, &self.shared, &self.events);
    }
}

impl RemoteAudioSource {
    /// Start loading `uri`. Returns immediately; the outcome arrives as events.
    pub fn load(
        uri: &str,
        mixer: Option<Mixer>,
        client: reqwest::blocking::Client,
        events: SourceEvents,
    ) -> Self {
        let source = Self::pending(events);
        let loader = source.loader(uri, mixer, client);

        let spawned = thread::Builder::new()
            .name(format!("remote-load-{}", source.events.generation()))
            .spawn(move || loader.run());

        if let Err(e) = spawned {
            tracing::warn!(error = %e, "failed to spawn loader thread");
            source
                .events
                .emit(SourceEventKind::Error(ErrorKind::NetworkOrDecode));
        }

        source
    }

    /// A source whose load has not started.
    pub(super) fn pending(events: SourceEvents) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared::default())),
            events,
        }
    }

    pub(super) fn loader(
        &self,
        uri: &str,
        mixer: Option<Mixer>,
        client: reqwest::blocking::Client,
    ) -> Loader {
        Loader {
            uri: uri.to_string(),
            mixer,
            client,
            shared: self.shared.clone(),
            events: self.events.clone(),
        }
    }

    fn with_shared<R>(&self, f: impl FnOnce(&mut Shared) -> R) -> Option<R> {
        self.shared.lock().ok().map(|mut s| f(&mut s))
    }

    fn position(&self) -> Option<f64> {
        self.with_shared(|s| {
            let pos = s.sink.as_ref()?.get_pos().as_secs_f64();
            // The sink repeats forever; report the position inside the current loop.
            match s.duration.map(|d| d.as_secs_f64()) {
                Some(len) if len > 0.0 => Some(pos % len),
                _ => Some(pos),
            }
        })
        .flatten()
    }
}

fn run_load(
    uri: &str,
    mixer: Option<Mixer>,
    client: &reqwest::blocking::Client,
    shared: &Arc<Mutex<Shared>>,
    events: &SourceEvents,
) {
    let generation = events.generation();

    let url = match parse_locator(uri) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(generation, uri, error = %e, "rejected track locator");
            events.emit(SourceEventKind::Error(e.kind()));
            return;
        }
    };

    let Some(mixer) = mixer else {
        events.emit(SourceEventKind::Error(ErrorKind::PlaybackRejected));
        return;
    };

    let is_disposed = || shared.lock().map(|s| s.disposed).unwrap_or(true);

    let bytes = match fetch_bytes(client, &url) {
        Ok(b) => b,
        Err(e) => {
            if !is_disposed() {
                tracing::warn!(generation, %url, error = %e, "failed to fetch track");
                events.emit(SourceEventKind::Error(e.kind()));
            }
            return;
        }
    };
    if is_disposed() {
        tracing::trace!(generation, "load superseded after fetch");
        return;
    }

    let (sink, duration) = match create_looping_sink(&mixer, bytes) {
        Ok(v) => v,
        Err(e) => {
            if !is_disposed() {
                tracing::warn!(generation, %url, error = %e, "failed to decode track");
                events.emit(SourceEventKind::Error(ErrorKind::NetworkOrDecode));
            }
            return;
        }
    };

    {
        let Ok(mut s) = shared.lock() else {
            sink.stop();
            return;
        };
        if s.disposed {
            sink.stop();
            tracing::trace!(generation, "load superseded after decode");
            return;
        }
        sink.set_volume(s.volume());
        if s.want_play {
            sink.play();
        }
        s.sink = Some(sink);
        s.duration = duration;
    }

    tracing::debug!(generation, %url, ?duration, "remote track ready");
    events.emit(SourceEventKind::MetadataReady(duration.map(|d| d.as_secs_f64())));
    events.emit(SourceEventKind::CanPlay);
}

impl RemoteSource for RemoteAudioSource {
    fn play(&mut self) {
        self.with_shared(|s| {
            s.want_play = true;
            if let Some(sink) = s.sink.as_ref() {
                sink.play();
            }
        });
    }

    fn pause(&mut self) {
        self.with_shared(|s| {
            s.want_play = false;
            if let Some(sink) = s.sink.as_ref() {
                sink.pause();
            }
        });
    }

    fn set_muted(&mut self, muted: bool) {
        self.with_shared(|s| {
            s.muted = muted;
            let volume = s.volume();
            if let Some(sink) = s.sink.as_ref() {
                sink.set_volume(volume);
            }
        });
    }

    fn report_position(&self) {
        if let Some(pos) = self.position() {
            self.events.emit(SourceEventKind::TimeUpdate(pos));
        }
    }

    fn is_drained(&self) -> bool {
        self.with_shared(|s| s.sink.as_ref().is_some_and(Sink::empty))
            .unwrap_or(false)
    }

    fn dispose(&mut self) {
        self.with_shared(|s| {
            s.disposed = true;
            s.want_play = false;
            if let Some(sink) = s.sink.take() {
                sink.stop();
            }
        });
    }
}

impl Drop for RemoteAudioSource {
    fn drop(&mut self) {
        self.dispose();
    }
}
